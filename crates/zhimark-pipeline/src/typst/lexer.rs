//! Tokenizer for Typst math markup.

use super::ConversionError;

/// Multi-character shorthands and their TeX, longest first.
const SHORTHANDS: &[(&str, &str)] = &[
    ("<==>", r"\Longleftrightarrow"),
    ("==>", r"\Longrightarrow"),
    ("<==", r"\Longleftarrow"),
    ("-->", r"\longrightarrow"),
    ("<--", r"\longleftarrow"),
    ("<=>", r"\Leftrightarrow"),
    ("<->", r"\leftrightarrow"),
    ("|->", r"\mapsto"),
    ("->>", r"\twoheadrightarrow"),
    ("...", r"\ldots"),
    ("->", r"\to"),
    ("=>", r"\Rightarrow"),
    ("<-", r"\leftarrow"),
    ("<=", r"\le"),
    (">=", r"\ge"),
    ("!=", r"\ne"),
    (":=", r"\coloneqq"),
    ("<<", r"\ll"),
    (">>", r"\gg"),
    ("||", r"\|"),
];

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum TokenKind {
    /// Letters, possibly with dotted modifiers (`arrow.r.double`).
    Ident(String),
    Number(String),
    Str(String),
    /// Shorthand, already translated to TeX.
    Shorthand(&'static str),
    Open(char),
    Close(char),
    Underscore,
    Caret,
    Slash,
    Comma,
    Semicolon,
    Colon,
    Amp,
    LineBreak,
    /// `\x` for a non-space character `x`.
    Escaped(char),
    Punct(char),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Token {
    pub kind: TokenKind,
    /// Byte offset in the source.
    pub offset: usize,
    /// Whitespace directly precedes the token.
    pub spaced: bool,
}

pub(crate) fn tokenize(source: &str) -> Result<Vec<Token>, ConversionError> {
    let mut tokens = Vec::new();
    let mut rest = source;
    let mut spaced = false;

    while let Some(c) = rest.chars().next() {
        let offset = source.len() - rest.len();

        if c.is_whitespace() {
            spaced = true;
            rest = &rest[c.len_utf8()..];
            continue;
        }
        if rest.starts_with("//") {
            rest = rest.find('\n').map_or("", |end| &rest[end..]);
            spaced = true;
            continue;
        }
        if rest.starts_with("/*") {
            rest = rest.find("*/").map_or("", |end| &rest[end + 2..]);
            spaced = true;
            continue;
        }

        let (kind, len) = if let Some((text, tex)) =
            SHORTHANDS.iter().find(|(text, _)| rest.starts_with(text))
        {
            (TokenKind::Shorthand(tex), text.len())
        } else if c.is_ascii_alphabetic() {
            let len = ident_len(rest);
            (TokenKind::Ident(rest[..len].to_owned()), len)
        } else if c.is_ascii_digit() {
            let len = number_len(rest);
            (TokenKind::Number(rest[..len].to_owned()), len)
        } else {
            match c {
                '"' => {
                    let (value, len) = string(rest, offset)?;
                    (TokenKind::Str(value), len)
                }
                '\\' => {
                    let next = rest[1..].chars().next();
                    match next {
                        Some(n) if !n.is_whitespace() => (TokenKind::Escaped(n), 1 + n.len_utf8()),
                        _ => (TokenKind::LineBreak, 1),
                    }
                }
                '#' => return Err(ConversionError::EmbeddedCode { offset }),
                '$' => return Err(ConversionError::UnexpectedChar { ch: c, offset }),
                '(' | '[' | '{' => (TokenKind::Open(c), 1),
                ')' | ']' | '}' => (TokenKind::Close(c), 1),
                '_' => (TokenKind::Underscore, 1),
                '^' => (TokenKind::Caret, 1),
                '/' => (TokenKind::Slash, 1),
                ',' => (TokenKind::Comma, 1),
                ';' => (TokenKind::Semicolon, 1),
                ':' => (TokenKind::Colon, 1),
                '&' => (TokenKind::Amp, 1),
                _ => (TokenKind::Punct(c), c.len_utf8()),
            }
        };

        tokens.push(Token {
            kind,
            offset,
            spaced,
        });
        spaced = false;
        rest = &rest[len..];
    }
    Ok(tokens)
}

/// Letters, then `.letters` modifiers.
fn ident_len(text: &str) -> usize {
    let bytes = text.as_bytes();
    let mut len = 0;
    while len < bytes.len() && bytes[len].is_ascii_alphabetic() {
        len += 1;
    }
    while len + 1 < bytes.len() && bytes[len] == b'.' && bytes[len + 1].is_ascii_alphabetic() {
        len += 1;
        while len < bytes.len() && bytes[len].is_ascii_alphabetic() {
            len += 1;
        }
    }
    len
}

fn number_len(text: &str) -> usize {
    let bytes = text.as_bytes();
    let mut len = 0;
    while len < bytes.len() && bytes[len].is_ascii_digit() {
        len += 1;
    }
    if len + 1 < bytes.len() && bytes[len] == b'.' && bytes[len + 1].is_ascii_digit() {
        len += 1;
        while len < bytes.len() && bytes[len].is_ascii_digit() {
            len += 1;
        }
    }
    len
}

/// Parse a string literal at the start of `text`. Returns the unescaped
/// value and the byte length including quotes.
fn string(text: &str, offset: usize) -> Result<(String, usize), ConversionError> {
    let mut value = String::new();
    let mut chars = text.char_indices().skip(1);
    while let Some((index, c)) = chars.next() {
        match c {
            '"' => return Ok((value, index + 1)),
            '\\' => match chars.next() {
                Some((_, 'n')) => value.push('\n'),
                Some((_, escaped)) => value.push(escaped),
                None => break,
            },
            _ => value.push(c),
        }
    }
    Err(ConversionError::UnterminatedString { offset })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_idents_and_numbers() {
        assert_eq!(
            kinds("alpha x 3.14 arrow.r.double"),
            vec![
                TokenKind::Ident("alpha".to_owned()),
                TokenKind::Ident("x".to_owned()),
                TokenKind::Number("3.14".to_owned()),
                TokenKind::Ident("arrow.r.double".to_owned()),
            ]
        );
    }

    #[test]
    fn test_trailing_dot_not_modifier() {
        assert_eq!(
            kinds("x."),
            vec![TokenKind::Ident("x".to_owned()), TokenKind::Punct('.')]
        );
    }

    #[test]
    fn test_shorthands_longest_first() {
        assert_eq!(
            kinds("a <=> b -> c"),
            vec![
                TokenKind::Ident("a".to_owned()),
                TokenKind::Shorthand(r"\Leftrightarrow"),
                TokenKind::Ident("b".to_owned()),
                TokenKind::Shorthand(r"\to"),
                TokenKind::Ident("c".to_owned()),
            ]
        );
    }

    #[test]
    fn test_spacing_flag() {
        let tokens = tokenize("f(x) g (y)").unwrap();
        assert!(!tokens[1].spaced);
        assert!(tokens[5].spaced);
    }

    #[test]
    fn test_string_with_escape() {
        assert_eq!(
            kinds(r#""say \"hi\"""#),
            vec![TokenKind::Str("say \"hi\"".to_owned())]
        );
    }

    #[test]
    fn test_line_break_and_escape() {
        assert_eq!(
            kinds("a \\\nb \\_"),
            vec![
                TokenKind::Ident("a".to_owned()),
                TokenKind::LineBreak,
                TokenKind::Ident("b".to_owned()),
                TokenKind::Escaped('_'),
            ]
        );
    }

    #[test]
    fn test_comments_skipped() {
        assert_eq!(
            kinds("a // note\n+ /* x */ b"),
            vec![
                TokenKind::Ident("a".to_owned()),
                TokenKind::Punct('+'),
                TokenKind::Ident("b".to_owned()),
            ]
        );
    }

    #[test]
    fn test_errors() {
        assert_eq!(
            tokenize("\"open"),
            Err(ConversionError::UnterminatedString { offset: 0 })
        );
        assert_eq!(
            tokenize("x + #calc.pow(2)"),
            Err(ConversionError::EmbeddedCode { offset: 4 })
        );
    }
}
