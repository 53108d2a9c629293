//! Kroki diagram rendering over HTTP.

use std::time::Duration;

use ureq::Agent;

use crate::fetch::create_agent;
use crate::services::{DiagramError, DiagramRenderer};

/// Default Kroki server.
pub const DEFAULT_KROKI_URL: &str = "https://kroki.io";

/// [`DiagramRenderer`] that POSTs diagram source to a Kroki server and
/// returns the SVG response.
pub struct KrokiRenderer {
    agent: Agent,
    server_url: String,
    endpoint: String,
}

impl KrokiRenderer {
    /// Renderer for `endpoint` diagrams (`mermaid`, `plantuml`, ...).
    #[must_use]
    pub fn new(server_url: &str, endpoint: &str, timeout: Duration) -> Self {
        Self {
            agent: create_agent(timeout),
            server_url: server_url.trim_end_matches('/').to_owned(),
            endpoint: endpoint.to_owned(),
        }
    }

    /// Mermaid renderer, the diagram type of fenced `mermaid` blocks.
    #[must_use]
    pub fn mermaid(server_url: &str, timeout: Duration) -> Self {
        Self::new(server_url, "mermaid", timeout)
    }

    fn url(&self) -> String {
        format!("{}/{}/svg", self.server_url, self.endpoint)
    }
}

impl DiagramRenderer for KrokiRenderer {
    fn render_to_vector(&self, source: &str) -> Result<String, DiagramError> {
        let url = self.url();
        let response = self
            .agent
            .post(&url)
            .header("Content-Type", "text/plain")
            .send(source.as_bytes())
            .map_err(|e| DiagramError::Http(e.to_string()))?;

        let status = response.status().as_u16();
        let mut body = response.into_body();

        if status >= 400 {
            let error_body = body
                .read_to_string()
                .unwrap_or_else(|_| String::from("(unable to read error body)"));
            return Err(DiagramError::Http(format!("HTTP {status}: {error_body}")));
        }

        let svg = body
            .read_to_string()
            .map_err(|e| DiagramError::Io(e.to_string()))?;
        if !svg.contains("<svg") {
            return Err(DiagramError::InvalidSvg("response has no <svg> element".to_owned()));
        }
        Ok(svg)
    }
}
