//! Parser from Typst math tokens to an expression tree.
//!
//! Precedence, loosest first: sequence, fraction (`/`), attachment
//! (`_`, `^`), primary.

use super::ConversionError;
use super::lexer::{Token, TokenKind};
use super::symbols;

/// Functions that take a parenthesized argument list when the `(`
/// directly follows the name.
const FUNCTIONS: &[&str] = &[
    "frac", "sqrt", "root", "binom", "vec", "mat", "cases", "abs", "norm", "floor", "ceil",
    "hat", "tilde", "bar", "overline", "underline", "dot", "dot.double", "arrow", "bold",
    "italic", "upright", "cal", "bb", "frak", "sans", "mono", "op", "lr", "underbrace",
    "overbrace", "cancel",
];

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Expr {
    Seq(Vec<Expr>),
    /// Already-translated TeX.
    Atom(String),
    /// String literal, rendered as upright text.
    Text(String),
    Group {
        open: char,
        close: char,
        body: Box<Expr>,
    },
    Frac(Box<Expr>, Box<Expr>),
    Attach {
        base: Box<Expr>,
        sub: Option<Box<Expr>>,
        sup: Option<Box<Expr>>,
    },
    Call {
        name: String,
        /// Positional arguments, split into rows by `;`.
        rows: Vec<Vec<Expr>>,
        named: Vec<(String, Expr)>,
        offset: usize,
    },
}

impl Expr {
    fn is_empty(&self) -> bool {
        match self {
            Self::Seq(items) => items.is_empty(),
            Self::Atom(tex) => tex.is_empty(),
            _ => false,
        }
    }

    /// Drop the parentheses of a `( ... )` group.
    pub(crate) fn unparen(self) -> Self {
        match self {
            Self::Group {
                open: '(',
                close: ')',
                body,
            } => *body,
            other => other,
        }
    }

    /// Text of a string literal argument, if that is all the expression is.
    pub(crate) fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Seq(items) if items.len() == 1 => items[0].as_text(),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Until {
    End,
    Close,
    Arg,
}

pub(crate) struct Parser<'t> {
    tokens: &'t [Token],
    pos: usize,
    end: usize,
}

impl<'t> Parser<'t> {
    pub(crate) fn new(tokens: &'t [Token], source_len: usize) -> Self {
        Self {
            tokens,
            pos: 0,
            end: source_len,
        }
    }

    pub(crate) fn parse(mut self) -> Result<Expr, ConversionError> {
        self.seq(Until::End)
    }

    fn peek(&self) -> Option<&'t Token> {
        self.tokens.get(self.pos)
    }

    fn peek_kind(&self, ahead: usize) -> Option<&'t TokenKind> {
        self.tokens.get(self.pos + ahead).map(|t| &t.kind)
    }

    fn next(&mut self) -> Option<&'t Token> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn offset(&self) -> usize {
        self.peek().map_or(self.end, |t| t.offset)
    }

    fn seq(&mut self, until: Until) -> Result<Expr, ConversionError> {
        let mut items = Vec::new();
        while let Some(token) = self.peek() {
            match token.kind {
                TokenKind::Close(close) if until == Until::End => {
                    return Err(ConversionError::UnexpectedClose {
                        close,
                        offset: token.offset,
                    });
                }
                TokenKind::Close(_) => break,
                TokenKind::Comma | TokenKind::Semicolon if until == Until::Arg => break,
                _ => items.push(self.frac()?),
            }
        }
        Ok(Expr::Seq(items))
    }

    fn frac(&mut self) -> Result<Expr, ConversionError> {
        let mut lhs = self.attach()?;
        while matches!(self.peek_kind(0), Some(TokenKind::Slash)) {
            self.pos += 1;
            let rhs = self.operand('/')?;
            lhs = Expr::Frac(Box::new(lhs.unparen()), Box::new(rhs.unparen()));
        }
        Ok(lhs)
    }

    fn attach(&mut self) -> Result<Expr, ConversionError> {
        let base = match self.peek_kind(0) {
            Some(TokenKind::Underscore | TokenKind::Caret) => Expr::Atom(String::new()),
            _ => self.primary()?,
        };

        let mut sub = None;
        let mut sup = None;
        loop {
            let op = match self.peek_kind(0) {
                Some(TokenKind::Underscore) => '_',
                Some(TokenKind::Caret) => '^',
                _ => break,
            };
            self.pos += 1;
            let operand = Some(Box::new(self.attachment(op)?.unparen()));
            if op == '_' {
                sub = operand;
            } else {
                sup = operand;
            }
        }

        if sub.is_none() && sup.is_none() {
            return Ok(base);
        }
        Ok(Expr::Attach {
            base: Box::new(base),
            sub,
            sup,
        })
    }

    /// Operand of `_` or `^`. A sign directly followed by a number binds
    /// with it, so `x^-1` is `x^{-1}`.
    fn attachment(&mut self, op: char) -> Result<Expr, ConversionError> {
        if let (Some(TokenKind::Punct(sign @ ('-' | '+'))), Some(number)) =
            (self.peek_kind(0), self.tokens.get(self.pos + 1))
            && let TokenKind::Number(digits) = &number.kind
            && !number.spaced
        {
            self.pos += 2;
            return Ok(Expr::Atom(format!("{sign}{digits}")));
        }
        self.operand(op)
    }

    fn operand(&mut self, op: char) -> Result<Expr, ConversionError> {
        match self.peek_kind(0) {
            None
            | Some(
                TokenKind::Close(_) | TokenKind::Slash | TokenKind::Underscore | TokenKind::Caret,
            ) => Err(ConversionError::MissingOperand {
                op,
                offset: self.offset(),
            }),
            _ => self.primary(),
        }
    }

    fn primary(&mut self) -> Result<Expr, ConversionError> {
        let offset = self.offset();
        let Some(token) = self.next() else {
            return Err(ConversionError::UnexpectedEnd { offset });
        };

        let expr = match &token.kind {
            TokenKind::Ident(name) => {
                let is_call = FUNCTIONS.contains(&name.as_str())
                    && matches!(self.peek(), Some(t) if t.kind == TokenKind::Open('(') && !t.spaced);
                if is_call {
                    return self.call(name, token.offset);
                }
                Expr::Atom(symbols::ident_to_tex(name))
            }
            TokenKind::Number(digits) => Expr::Atom(digits.clone()),
            TokenKind::Str(text) => Expr::Text(text.clone()),
            TokenKind::Shorthand(tex) => Expr::Atom((*tex).to_owned()),
            TokenKind::Open(open) => {
                let body = self.seq(Until::Close)?;
                match self.next().map(|t| &t.kind) {
                    Some(TokenKind::Close(close)) => Expr::Group {
                        open: *open,
                        close: *close,
                        body: Box::new(body),
                    },
                    _ => {
                        return Err(ConversionError::Unclosed {
                            open: *open,
                            offset: token.offset,
                        });
                    }
                }
            }
            TokenKind::Close(close) => {
                return Err(ConversionError::UnexpectedClose {
                    close: *close,
                    offset: token.offset,
                });
            }
            TokenKind::Slash => {
                return Err(ConversionError::MissingOperand {
                    op: '/',
                    offset: token.offset,
                });
            }
            TokenKind::Underscore | TokenKind::Caret => {
                return Err(ConversionError::MissingOperand {
                    op: if token.kind == TokenKind::Caret { '^' } else { '_' },
                    offset: token.offset,
                });
            }
            TokenKind::Comma => Expr::Atom(",".to_owned()),
            TokenKind::Semicolon => Expr::Atom(";".to_owned()),
            TokenKind::Colon => Expr::Atom(":".to_owned()),
            TokenKind::Amp => Expr::Atom("&".to_owned()),
            TokenKind::LineBreak => Expr::Atom(r"\\".to_owned()),
            TokenKind::Escaped(c) => Expr::Atom(symbols::escaped_to_tex(*c)),
            TokenKind::Punct(c) => Expr::Atom(symbols::punct_to_tex(*c)),
        };
        Ok(expr)
    }

    /// Argument list of `name(`, positioned on the `(`.
    fn call(&mut self, name: &str, offset: usize) -> Result<Expr, ConversionError> {
        let open = self.next().map_or(offset, |t| t.offset);
        let mut rows: Vec<Vec<Expr>> = vec![Vec::new()];
        let mut named = Vec::new();

        loop {
            if let (Some(TokenKind::Ident(key)), Some(TokenKind::Colon)) =
                (self.peek_kind(0), self.peek_kind(1))
            {
                self.pos += 2;
                named.push((key.clone(), self.seq(Until::Arg)?));
            } else {
                let arg = self.seq(Until::Arg)?;
                if let Some(row) = rows.last_mut() {
                    row.push(arg);
                }
            }

            match self.next().map(|t| &t.kind) {
                Some(TokenKind::Comma) => {}
                Some(TokenKind::Semicolon) => rows.push(Vec::new()),
                Some(TokenKind::Close(_)) => break,
                _ => return Err(ConversionError::Unclosed { open: '(', offset: open }),
            }
        }

        for row in &mut rows {
            row.retain(|arg| !arg.is_empty());
        }
        rows.retain(|row| !row.is_empty());

        Ok(Expr::Call {
            name: name.to_owned(),
            rows,
            named,
            offset,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::lexer::tokenize;
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(source: &str) -> Result<Expr, ConversionError> {
        let tokens = tokenize(source)?;
        Parser::new(&tokens, source.len()).parse()
    }

    fn atom(tex: &str) -> Expr {
        Expr::Atom(tex.to_owned())
    }

    #[test]
    fn test_fraction_binds_looser_than_attach() {
        assert_eq!(
            parse("x^2/y").unwrap(),
            Expr::Seq(vec![Expr::Frac(
                Box::new(Expr::Attach {
                    base: Box::new(atom("x")),
                    sub: None,
                    sup: Some(Box::new(atom("2"))),
                }),
                Box::new(atom("y")),
            )])
        );
    }

    #[test]
    fn test_call_requires_adjacent_paren() {
        let Expr::Seq(items) = parse("sqrt (x)").unwrap() else {
            panic!("expected sequence");
        };
        assert_eq!(items[0], atom(r"\sqrt"));
        assert!(matches!(items[1], Expr::Group { open: '(', .. }));
    }

    #[test]
    fn test_call_rows_and_named_args() {
        let Expr::Seq(items) = parse(r#"mat(delim: "[", 1, 2; 3, 4)"#).unwrap() else {
            panic!("expected sequence");
        };
        let Expr::Call { name, rows, named, .. } = &items[0] else {
            panic!("expected call");
        };
        assert_eq!(name, "mat");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].len(), 2);
        assert_eq!(named[0].0, "delim");
        assert_eq!(named[0].1.as_text(), Some("["));
    }

    #[test]
    fn test_mismatched_brackets_form_interval() {
        let Expr::Seq(items) = parse("[0, 1)").unwrap() else {
            panic!("expected sequence");
        };
        assert!(matches!(
            items[0],
            Expr::Group {
                open: '[',
                close: ')',
                ..
            }
        ));
    }

    #[test]
    fn test_signed_exponent() {
        let Expr::Seq(items) = parse("x^-1").unwrap() else {
            panic!("expected sequence");
        };
        assert_eq!(
            items[0],
            Expr::Attach {
                base: Box::new(atom("x")),
                sub: None,
                sup: Some(Box::new(atom("-1"))),
            }
        );
    }

    #[test]
    fn test_errors() {
        assert_eq!(
            parse("(a + b"),
            Err(ConversionError::Unclosed { open: '(', offset: 0 })
        );
        assert_eq!(
            parse("a)"),
            Err(ConversionError::UnexpectedClose { close: ')', offset: 1 })
        );
        assert_eq!(
            parse("x^"),
            Err(ConversionError::MissingOperand { op: '^', offset: 2 })
        );
        assert_eq!(
            parse("a / )"),
            Err(ConversionError::MissingOperand { op: '/', offset: 4 })
        );
        assert!(matches!(
            parse("sqrt(x"),
            Err(ConversionError::Unclosed { open: '(', .. })
        ));
    }
}
