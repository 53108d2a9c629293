//! TeX output for parsed Typst math.

use super::ConversionError;
use super::parser::Expr;
use super::symbols::escape_text;

pub(crate) fn write(expr: &Expr) -> Result<String, ConversionError> {
    let tex = match expr {
        Expr::Seq(items) => {
            let mut parts = Vec::with_capacity(items.len());
            for item in items {
                let part = write(item)?;
                if !part.is_empty() {
                    parts.push(part);
                }
            }
            parts.join(" ")
        }
        Expr::Atom(tex) => tex.clone(),
        Expr::Text(text) => format!(r"\text{{{}}}", escape_text(text)),
        Expr::Group { open, close, body } => {
            format!("{}{}{}", delimiter(*open), write(body)?, delimiter(*close))
        }
        Expr::Frac(num, den) => format!(r"\frac{{{}}}{{{}}}", write(num)?, write(den)?),
        Expr::Attach { base, sub, sup } => {
            let mut tex = write(base)?;
            if tex.is_empty() {
                tex.push_str("{}");
            }
            if let Some(sub) = sub {
                tex.push_str(&format!("_{{{}}}", write(sub)?));
            }
            if let Some(sup) = sup {
                tex.push_str(&format!("^{{{}}}", write(sup)?));
            }
            tex
        }
        Expr::Call {
            name,
            rows,
            named,
            offset,
        } => call(name, rows, named, *offset)?,
    };
    Ok(tex)
}

fn delimiter(c: char) -> String {
    match c {
        '{' => r"\{".to_owned(),
        '}' => r"\}".to_owned(),
        _ => c.to_string(),
    }
}

fn call(
    name: &str,
    rows: &[Vec<Expr>],
    named: &[(String, Expr)],
    offset: usize,
) -> Result<String, ConversionError> {
    let args: Vec<&Expr> = rows.iter().flatten().collect();
    let arity = |expected: usize| {
        if args.len() == expected {
            Ok(())
        } else {
            Err(ConversionError::InvalidArguments {
                name: name.to_owned(),
                expected,
                found: args.len(),
                offset,
            })
        }
    };

    let tex = match name {
        "frac" | "binom" => {
            arity(2)?;
            format!(r"\{name}{{{}}}{{{}}}", write(args[0])?, write(args[1])?)
        }
        "sqrt" => {
            arity(1)?;
            format!(r"\sqrt{{{}}}", write(args[0])?)
        }
        "root" => {
            arity(2)?;
            format!(r"\sqrt[{}]{{{}}}", write(args[0])?, write(args[1])?)
        }
        "vec" => {
            let cells = args.iter().map(|arg| write(arg)).collect::<Result<Vec<_>, _>>()?;
            environment(matrix_environment(named), &cells.join(r" \\ "))
        }
        "mat" => {
            let mut lines = Vec::with_capacity(rows.len());
            for row in rows {
                let cells = row.iter().map(write).collect::<Result<Vec<_>, _>>()?;
                lines.push(cells.join(" & "));
            }
            environment(matrix_environment(named), &lines.join(r" \\ "))
        }
        "cases" => {
            let cells = args.iter().map(|arg| write(arg)).collect::<Result<Vec<_>, _>>()?;
            environment("cases", &cells.join(r" \\ "))
        }
        "abs" | "norm" | "floor" | "ceil" => {
            arity(1)?;
            let (left, right) = match name {
                "abs" => ("|", "|"),
                "norm" => (r"\|", r"\|"),
                "floor" => (r"\lfloor", r"\rfloor"),
                _ => (r"\lceil", r"\rceil"),
            };
            format!(r"\left{left} {} \right{right}", write(args[0])?)
        }
        "lr" => {
            arity(1)?;
            match args[0] {
                Expr::Seq(items) if items.len() == 1 => lr(&items[0])?,
                other => lr(other)?,
            }
        }
        "underbrace" | "overbrace" => {
            let script = if name == "underbrace" { '_' } else { '^' };
            match args.as_slice() {
                [body] => format!(r"\{name}{{{}}}", write(body)?),
                [body, label] => {
                    format!(r"\{name}{{{}}}{script}{{{}}}", write(body)?, write(label)?)
                }
                _ => {
                    return Err(ConversionError::InvalidArguments {
                        name: name.to_owned(),
                        expected: 2,
                        found: args.len(),
                        offset,
                    });
                }
            }
        }
        "op" => {
            arity(1)?;
            let text = match args[0].as_text() {
                Some(text) => escape_text(text),
                None => write(args[0])?,
            };
            format!(r"\operatorname{{{text}}}")
        }
        _ => {
            arity(1)?;
            let command = match name {
                "hat" => "hat",
                "tilde" => "tilde",
                "bar" | "overline" => "overline",
                "underline" => "underline",
                "dot" => "dot",
                "dot.double" => "ddot",
                "arrow" => "vec",
                "bold" => "mathbf",
                "italic" => "mathit",
                "upright" => "mathrm",
                "cal" => "mathcal",
                "bb" => "mathbb",
                "frak" => "mathfrak",
                "sans" => "mathsf",
                "mono" => "mathtt",
                "cancel" => "cancel",
                _ => name,
            };
            format!(r"\{command}{{{}}}", write(args[0])?)
        }
    };
    Ok(tex)
}

fn lr(expr: &Expr) -> Result<String, ConversionError> {
    Ok(match expr {
        Expr::Group { open, close, body } => format!(
            r"\left{} {} \right{}",
            delimiter(*open),
            write(body)?,
            delimiter(*close)
        ),
        other => format!(r"\left. {} \right.", write(other)?),
    })
}

fn matrix_environment(named: &[(String, Expr)]) -> &'static str {
    let delim = named
        .iter()
        .find(|(key, _)| key == "delim")
        .and_then(|(_, value)| value.as_text());
    match delim {
        Some("[") => "bmatrix",
        Some("{") => "Bmatrix",
        Some("|") => "vmatrix",
        Some("||") => "Vmatrix",
        _ => "pmatrix",
    }
}

fn environment(name: &str, body: &str) -> String {
    format!(r"\begin{{{name}}} {body} \end{{{name}}}")
}
