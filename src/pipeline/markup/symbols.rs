//! Unicode symbol substitutions.
//!
//! pdflatex with `inputenc` cannot typeset most symbols that appear in
//! worksheet text. This table maps the ones seen in practice; extend it when
//! a new symbol breaks a build.

const SYMBOLS: &[(char, &str)] = &[
    ('\u{00A0}', " "),
    ('€', "\\euro{}"),
    ('→', "$\\rightarrow$"),
    ('↦', "$\\mapsto$"),
    ('−', "$-$"),
    ('–', "$-$"),
    ('⊥', "$\\perp$"),
    ('°', "\\degree{}"),
    ('▶', "$\\blacktriangleright$"),
    ('∢', "$\\angle$"),
    ('≤', "$\\leq$"),
    ('◊', "$\\lozenge$"),
    ('↶', "$\\curvearrowleft$"),
    ('∙', "$\\bullet$"),
    ('⊕', "$\\oplus$"),
    ('⊖', "$\\ominus$"),
];

/// Greek letters typeset through babel's greek option.
const GREEK: &str = "αβΓγΔδεζηΘθΙικΛλμνΞξΟοΠπρΣσςτυΦφχΨψΩω";

/// Replace every known symbol in one pass.
pub fn substitute(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if GREEK.contains(c) {
            out.push_str("\\textgreek{");
            out.push(c);
            out.push('}');
        } else if let Some((_, latex)) = SYMBOLS.iter().find(|(sym, _)| *sym == c) {
            out.push_str(latex);
        } else {
            out.push(c);
        }
    }
    out
}
