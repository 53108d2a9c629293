//! Typst symbol names and their TeX equivalents.

/// TeX for a named symbol, including dotted variants.
pub(crate) fn lookup(name: &str) -> Option<&'static str> {
    let tex = match name {
        // Greek, following Typst's choice of glyph for the plain name.
        "alpha" => r"\alpha",
        "beta" => r"\beta",
        "gamma" => r"\gamma",
        "delta" => r"\delta",
        "epsilon" => r"\varepsilon",
        "epsilon.alt" => r"\epsilon",
        "zeta" => r"\zeta",
        "eta" => r"\eta",
        "theta" => r"\theta",
        "theta.alt" => r"\vartheta",
        "iota" => r"\iota",
        "kappa" => r"\kappa",
        "lambda" => r"\lambda",
        "mu" => r"\mu",
        "nu" => r"\nu",
        "xi" => r"\xi",
        "omicron" => "o",
        "pi" => r"\pi",
        "pi.alt" => r"\varpi",
        "rho" => r"\rho",
        "rho.alt" => r"\varrho",
        "sigma" => r"\sigma",
        "sigma.alt" => r"\varsigma",
        "tau" => r"\tau",
        "upsilon" => r"\upsilon",
        "phi" => r"\varphi",
        "phi.alt" => r"\phi",
        "chi" => r"\chi",
        "psi" => r"\psi",
        "omega" => r"\omega",
        "Gamma" => r"\Gamma",
        "Delta" => r"\Delta",
        "Theta" => r"\Theta",
        "Lambda" => r"\Lambda",
        "Xi" => r"\Xi",
        "Pi" => r"\Pi",
        "Sigma" => r"\Sigma",
        "Upsilon" => r"\Upsilon",
        "Phi" => r"\Phi",
        "Psi" => r"\Psi",
        "Omega" => r"\Omega",

        // Blackboard sets.
        "NN" => r"\mathbb{N}",
        "ZZ" => r"\mathbb{Z}",
        "QQ" => r"\mathbb{Q}",
        "RR" => r"\mathbb{R}",
        "CC" => r"\mathbb{C}",

        // Operators and relations.
        "plus" => "+",
        "minus" => "-",
        "plus.minus" => r"\pm",
        "minus.plus" => r"\mp",
        "times" => r"\times",
        "div" => r"\div",
        "dot" | "dot.op" | "dot.c" => r"\cdot",
        "ast" => r"\ast",
        "star" => r"\star",
        "compose" | "circle.small" => r"\circ",
        "eq" => "=",
        "eq.not" => r"\ne",
        "equiv" => r"\equiv",
        "approx" => r"\approx",
        "tilde.op" => r"\sim",
        "tilde.eq" => r"\simeq",
        "prop" => r"\propto",
        "lt" => "<",
        "gt" => ">",
        "lt.eq" => r"\le",
        "gt.eq" => r"\ge",
        "lt.double" => r"\ll",
        "gt.double" => r"\gg",
        "prec" => r"\prec",
        "succ" => r"\succ",
        "in" => r"\in",
        "in.not" => r"\notin",
        "subset" => r"\subset",
        "subset.eq" => r"\subseteq",
        "supset" => r"\supset",
        "supset.eq" => r"\supseteq",
        "union" => r"\cup",
        "union.big" => r"\bigcup",
        "sect" => r"\cap",
        "sect.big" => r"\bigcap",
        "without" => r"\setminus",
        "emptyset" | "nothing" => r"\emptyset",
        "forall" => r"\forall",
        "exists" => r"\exists",
        "exists.not" => r"\nexists",
        "not" => r"\neg",
        "and" => r"\land",
        "or" => r"\lor",
        "perp" => r"\perp",
        "parallel" => r"\parallel",
        "divides" | "mid" => r"\mid",
        "therefore" => r"\therefore",
        "because" => r"\because",
        "top" => r"\top",
        "bot" => r"\bot",

        // Big operators.
        "sum" => r"\sum",
        "product" => r"\prod",
        "product.co" => r"\coprod",
        "integral" => r"\int",
        "integral.double" => r"\iint",
        "integral.triple" => r"\iiint",
        "integral.cont" => r"\oint",

        // Arrows.
        "arrow.r" => r"\rightarrow",
        "arrow.l" => r"\leftarrow",
        "arrow.t" => r"\uparrow",
        "arrow.b" => r"\downarrow",
        "arrow.l.r" => r"\leftrightarrow",
        "arrow.r.double" => r"\Rightarrow",
        "arrow.l.double" => r"\Leftarrow",
        "arrow.l.r.double" => r"\Leftrightarrow",
        "arrow.r.long" => r"\longrightarrow",
        "arrow.l.long" => r"\longleftarrow",
        "arrow.r.bar" => r"\mapsto",
        "arrow.r.hook" => r"\hookrightarrow",
        "arrow.r.squiggly" => r"\rightsquigarrow",
        "harpoon.rt" => r"\rightharpoonup",

        // Miscellaneous.
        "infinity" | "oo" => r"\infty",
        "partial" => r"\partial",
        "dif" => r"\mathrm{d}",
        "Dif" => r"\mathrm{D}",
        "nabla" => r"\nabla",
        "aleph" => r"\aleph",
        "hbar" | "planck.reduce" => r"\hbar",
        "ell" => r"\ell",
        "Re" => r"\Re",
        "Im" => r"\Im",
        "angle" => r"\angle",
        "degree" => r"^{\circ}",
        "prime" => "'",
        "dots" | "dots.h" => r"\ldots",
        "dots.c" | "dots.h.c" => r"\cdots",
        "dots.v" => r"\vdots",
        "dots.down" => r"\ddots",
        "bar.v" => "|",
        "bar.v.double" => r"\|",
        "angle.l" => r"\langle",
        "angle.r" => r"\rangle",

        // Spacing.
        "thin" => r"\,",
        "med" => r"\:",
        "thick" => r"\;",
        "quad" => r"\quad",
        "wide" => r"\qquad",
        "space" => r"\ ",

        // Upright operator names with a TeX command of their own.
        "sin" => r"\sin",
        "cos" => r"\cos",
        "tan" => r"\tan",
        "cot" => r"\cot",
        "sec" => r"\sec",
        "csc" => r"\csc",
        "arcsin" => r"\arcsin",
        "arccos" => r"\arccos",
        "arctan" => r"\arctan",
        "sinh" => r"\sinh",
        "cosh" => r"\cosh",
        "tanh" => r"\tanh",
        "coth" => r"\coth",
        "exp" => r"\exp",
        "log" => r"\log",
        "ln" => r"\ln",
        "lg" => r"\lg",
        "lim" => r"\lim",
        "liminf" => r"\liminf",
        "limsup" => r"\limsup",
        "max" => r"\max",
        "min" => r"\min",
        "sup" => r"\sup",
        "inf" => r"\inf",
        "det" => r"\det",
        "dim" => r"\dim",
        "ker" => r"\ker",
        "deg" => r"\deg",
        "gcd" => r"\gcd",
        "hom" => r"\hom",
        "arg" => r"\arg",
        "Pr" => r"\Pr",
        "mod" => r"\bmod",
        "lcm" => r"\operatorname{lcm}",
        "tr" => r"\operatorname{tr}",
        "sgn" => r"\operatorname{sgn}",
        "id" => r"\operatorname{id}",
        _ => return None,
    };
    Some(tex)
}

/// TeX for an identifier token.
///
/// Single letters are variables. Dotted names with an unknown modifier
/// fall back to their base symbol. Other unknown names become a control
/// word of the same name.
pub(crate) fn ident_to_tex(name: &str) -> String {
    if let Some(tex) = lookup(name) {
        return tex.to_owned();
    }
    if name.len() == 1 {
        return name.to_owned();
    }
    let base = name.split('.').next().unwrap_or(name);
    if base != name {
        if let Some(tex) = lookup(base) {
            tracing::debug!(symbol = name, "unknown symbol modifier, using base symbol");
            return tex.to_owned();
        }
        if base.len() == 1 {
            return name.to_owned();
        }
    }
    format!("\\{}", base)
}

/// TeX for a single punctuation or operator character.
pub(crate) fn punct_to_tex(c: char) -> String {
    match c {
        '*' => r"\ast".to_owned(),
        '%' | '$' | '#' => format!("\\{c}"),
        '~' => r"\sim".to_owned(),
        _ => c.to_string(),
    }
}

/// TeX for a `\x` escape.
pub(crate) fn escaped_to_tex(c: char) -> String {
    match c {
        '{' | '}' | '$' | '#' | '%' | '&' | '_' => format!("\\{c}"),
        '\\' => r"\backslash".to_owned(),
        _ => c.to_string(),
    }
}

/// Escape text for use inside `\text{...}`.
pub(crate) fn escape_text(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '{' | '}' | '$' | '#' | '%' | '&' | '_' => {
                escaped.push('\\');
                escaped.push(c);
            }
            '\\' => escaped.push_str(r"\textbackslash{}"),
            '^' => escaped.push_str(r"\^{}"),
            '~' => escaped.push_str(r"\~{}"),
            _ => escaped.push(c),
        }
    }
    escaped
}
