//! Equation text normalization
//!
//! Text pasted from documents often carries invisible characters or
//! identifiers written with a combining overline (`x̄`). Both are rewritten
//! into plain text the expression parser understands.

/// Invisible characters removed outright
const ZERO_WIDTH: [char; 5] = ['\u{200B}', '\u{200C}', '\u{200D}', '\u{2060}', '\u{FEFF}'];

/// Combining macron / overline, rendered as a bar over the previous letter
const COMBINING_BARS: [char; 2] = ['\u{0304}', '\u{0305}'];

/// Normalize a whole equation string
///
/// Zero-width characters are stripped, non-breaking and ideographic spaces
/// become ASCII spaces and barred identifiers get the `_bar` suffix.
pub fn normalize_equation_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_bar = false;

    for c in text.chars() {
        if ZERO_WIDTH.contains(&c) {
            continue;
        }
        if COMBINING_BARS.contains(&c) {
            pending_bar = true;
            continue;
        }
        if is_combining_mark(c) {
            continue;
        }

        // The suffix goes at the end of the identifier, not right after the
        // barred letter, so `x̄1` becomes `x1_bar`.
        if pending_bar && !is_identifier_char(c) {
            out.push_str("_bar");
            pending_bar = false;
        }

        match c {
            '\u{00A0}' | '\u{3000}' => out.push(' '),
            other => out.push(other),
        }
    }

    if pending_bar {
        out.push_str("_bar");
    }
    out
}

/// Normalize a single variable name (trims surrounding whitespace too)
pub fn normalize_variable_name(name: &str) -> String {
    normalize_equation_text(name).trim().to_string()
}

/// Characters allowed inside an identifier after the first one
pub fn is_identifier_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Characters allowed to start an identifier
pub fn is_identifier_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_combining_mark(c: char) -> bool {
    matches!(c as u32, 0x0300..=0x036F | 0x1AB0..=0x1AFF | 0x20D0..=0x20FF)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_zero_width_characters() {
        assert_eq!(normalize_equation_text("W\u{200B} = V\u{FEFF}*I"), "W = V*I");
    }

    #[test]
    fn test_maps_wide_spaces() {
        assert_eq!(normalize_equation_text("a\u{00A0}=\u{3000}b"), "a = b");
    }

    #[test]
    fn test_bar_identifier_gets_suffix() {
        assert_eq!(normalize_equation_text("y = x\u{0304} + 1"), "y = x_bar + 1");
        assert_eq!(normalize_equation_text("x\u{0305}1*2"), "x1_bar*2");
    }

    #[test]
    fn test_bar_at_end_of_text() {
        assert_eq!(normalize_variable_name(" x\u{0304} "), "x_bar");
    }

    #[test]
    fn test_plain_text_unchanged() {
        let text = "W = V * I, V = VMEAS + VCAL";
        assert_eq!(normalize_equation_text(text), text);
    }
}
