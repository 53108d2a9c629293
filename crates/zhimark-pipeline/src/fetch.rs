//! HTTP fetcher for remote images.

use std::time::Duration;

use ureq::Agent;

use crate::services::{FetchError, Fetcher};

/// Default `User-Agent` header.
pub const DEFAULT_USER_AGENT: &str = concat!("zhimark/", env!("CARGO_PKG_VERSION"));

/// Create an HTTP agent with the given timeout.
///
/// Status codes are checked by the caller so error bodies can be reported.
pub fn create_agent(timeout: Duration) -> Agent {
    Agent::config_builder()
        .timeout_global(Some(timeout))
        .http_status_as_error(false)
        .build()
        .into()
}

/// [`Fetcher`] doing plain HTTP GET requests.
pub struct HttpFetcher {
    agent: Agent,
    user_agent: String,
}

impl HttpFetcher {
    #[must_use]
    pub fn new(user_agent: impl Into<String>, timeout: Duration) -> Self {
        Self {
            agent: create_agent(timeout),
            user_agent: user_agent.into(),
        }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new(DEFAULT_USER_AGENT, Duration::from_secs(30))
    }
}

impl Fetcher for HttpFetcher {
    fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        tracing::debug!(url, "fetching");
        let response = self
            .agent
            .get(url)
            .header("User-Agent", &self.user_agent)
            .header("Accept", "image/*,*/*;q=0.8")
            .call()
            .map_err(|e| FetchError::Http(e.to_string()))?;

        let status = response.status().as_u16();
        if status >= 400 {
            return Err(FetchError::Status {
                url: url.to_owned(),
                status,
            });
        }

        response
            .into_body()
            .with_config()
            .limit(64 * 1024 * 1024)
            .read_to_vec()
            .map_err(|e| FetchError::Io(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_user_agent() {
        assert!(DEFAULT_USER_AGENT.starts_with("zhimark/"));
    }

    #[test]
    fn test_unreachable_host_is_error() {
        let fetcher = HttpFetcher::new(DEFAULT_USER_AGENT, Duration::from_secs(2));
        let result = fetcher.fetch_bytes("http://127.0.0.1:1/none.png");
        assert!(matches!(result, Err(FetchError::Http(_))));
    }
}
