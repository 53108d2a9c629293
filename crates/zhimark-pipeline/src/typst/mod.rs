//! Typst math to TeX conversion.
//!
//! Covers the math subset used in notes: symbols and shorthands,
//! attachments, fractions, delimiters, string literals, alignment and
//! line breaks, and the common math functions (`frac`, `sqrt`, `mat`,
//! `vec`, `cases`, accents, font styles, ...). Embedded code (`#`) is
//! rejected.
//!
//! ```
//! use zhimark_pipeline::typst_to_tex;
//!
//! assert_eq!(typst_to_tex("(a+b)/2").unwrap(), r"\frac{a + b}{2}");
//! ```

mod lexer;
mod parser;
mod symbols;
mod tex;

/// Why a Typst formula could not be converted. Offsets are byte offsets
/// into the formula source.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConversionError {
    #[error("unexpected character '{ch}' at {offset}")]
    UnexpectedChar { ch: char, offset: usize },
    #[error("unterminated string starting at {offset}")]
    UnterminatedString { offset: usize },
    #[error("unclosed '{open}' at {offset}")]
    Unclosed { open: char, offset: usize },
    #[error("unexpected '{close}' at {offset}")]
    UnexpectedClose { close: char, offset: usize },
    #[error("missing operand for '{op}' at {offset}")]
    MissingOperand { op: char, offset: usize },
    #[error("unexpected end of formula at {offset}")]
    UnexpectedEnd { offset: usize },
    #[error("embedded code is not supported (at {offset})")]
    EmbeddedCode { offset: usize },
    #[error("{name} takes {expected} argument(s), found {found} (at {offset})")]
    InvalidArguments {
        name: String,
        expected: usize,
        found: usize,
        offset: usize,
    },
}

/// Convert Typst math markup (without the surrounding `$`) to TeX.
///
/// # Errors
///
/// Returns [`ConversionError`] for markup outside the supported subset or
/// with unbalanced structure.
pub fn typst_to_tex(source: &str) -> Result<String, ConversionError> {
    let tokens = lexer::tokenize(source)?;
    let expr = parser::Parser::new(&tokens, source.len()).parse()?;
    tex::write(&expr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn tex(source: &str) -> String {
        typst_to_tex(source).unwrap()
    }

    #[test]
    fn test_attachments() {
        assert_eq!(tex("x^2 + y^2 = z^2"), "x^{2} + y^{2} = z^{2}");
        assert_eq!(tex("a_(i j)^n"), "a_{i j}^{n}");
        assert_eq!(tex("e^(-x^2)"), "e^{- x^{2}}");
    }

    #[test]
    fn test_fractions() {
        assert_eq!(tex("(a+b)/c"), r"\frac{a + b}{c}");
        assert_eq!(tex("1/2 x"), r"\frac{1}{2} x");
        assert_eq!(tex("frac(1, n)"), r"\frac{1}{n}");
    }

    #[test]
    fn test_big_operators() {
        assert_eq!(tex("sum_(i=1)^n i"), r"\sum_{i = 1}^{n} i");
        assert_eq!(
            tex("integral_0^infinity e^(-t) dif t"),
            r"\int_{0}^{\infty} e^{- t} \mathrm{d} t"
        );
        assert_eq!(tex("lim_(x -> 0) f(x)"), r"\lim_{x \to 0} f (x)");
    }

    #[test]
    fn test_symbols_and_shorthands() {
        assert_eq!(tex("alpha -> beta"), r"\alpha \to \beta");
        assert_eq!(tex("x in RR"), r"x \in \mathbb{R}");
        assert_eq!(tex("a != b <= c"), r"a \ne b \le c");
        assert_eq!(tex("a dot b"), r"a \cdot b");
        assert_eq!(tex("arrow.r.double"), r"\Rightarrow");
    }

    #[test]
    fn test_functions() {
        assert_eq!(tex("sqrt(x)"), r"\sqrt{x}");
        assert_eq!(tex("root(3, x)"), r"\sqrt[3]{x}");
        assert_eq!(tex("hat(x) + arrow(v)"), r"\hat{x} + \vec{v}");
        assert_eq!(tex("bb(F)"), r"\mathbb{F}");
        assert_eq!(tex("abs(x)"), r"\left| x \right|");
        assert_eq!(tex(r#"op("tr") A"#), r"\operatorname{tr} A");
        assert_eq!(tex("lr(( a/b ))"), r"\left( \frac{a}{b} \right)");
    }

    #[test]
    fn test_matrices_and_cases() {
        assert_eq!(
            tex("mat(1, 2; 3, 4)"),
            r"\begin{pmatrix} 1 & 2 \\ 3 & 4 \end{pmatrix}"
        );
        assert_eq!(
            tex(r#"mat(delim: "[", a, b)"#),
            r"\begin{bmatrix} a & b \end{bmatrix}"
        );
        assert_eq!(tex("vec(x, y)"), r"\begin{pmatrix} x \\ y \end{pmatrix}");
        assert_eq!(
            tex(r#"f(x) = cases(1 & "if" x > 0, 0 & "otherwise")"#),
            r"f (x) = \begin{cases} 1 & \text{if} x > 0 \\ 0 & \text{otherwise} \end{cases}"
        );
    }

    #[test]
    fn test_alignment_and_line_breaks() {
        assert_eq!(tex("a &= b \\\n &= c"), r"a & = b \\ & = c");
    }

    #[test]
    fn test_braces_escaped() {
        assert_eq!(tex("{x}"), r"\{x\}");
    }

    #[test]
    fn test_wrong_arity() {
        assert_eq!(
            typst_to_tex("frac(1)"),
            Err(ConversionError::InvalidArguments {
                name: "frac".to_owned(),
                expected: 2,
                found: 1,
                offset: 0,
            })
        );
    }

    #[test]
    fn test_errors_are_reported() {
        assert!(matches!(
            typst_to_tex("(a + b"),
            Err(ConversionError::Unclosed { .. })
        ));
        assert!(matches!(
            typst_to_tex("#sym.pi"),
            Err(ConversionError::EmbeddedCode { offset: 0 })
        ));
        assert!(matches!(
            typst_to_tex("$x$"),
            Err(ConversionError::UnexpectedChar { ch: '$', .. })
        ));
    }
}
