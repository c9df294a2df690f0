//! HL7 escape sequences for text that contains one of the separators.
//!
//! `\F\` field, `\S\` component, `\T\` sub-component, `\R\` repetition and
//! `\E\` escape.  Other sequences (highlighting, hex, locally defined) are
//! left as written.
//!
//! A component still holds its sub-components, so [`unescape_component`] and
//! [`escape_component`] treat the sub-component separator as structure: it
//! passes through untouched, and so does `\T\`, the escaped form of a
//! literal separator character.

use std::borrow::Cow;

use crate::delimiters::Delimiters;

/// Replaces escape sequences in a leaf value with the characters they stand for.
pub fn unescape<'a>(value: &'a str, d: &Delimiters) -> Cow<'a, str> {
    unescape_with(value, d, false)
}

/// [`unescape`] for a component that may still contain sub-components.
pub fn unescape_component<'a>(value: &'a str, d: &Delimiters) -> Cow<'a, str> {
    unescape_with(value, d, true)
}

fn unescape_with<'a>(value: &'a str, d: &Delimiters, keep_subcomponents: bool) -> Cow<'a, str> {
    if !value.contains(d.escape) {
        return Cow::Borrowed(value);
    }

    let mut out = String::with_capacity(value.len());
    let mut rest = value;
    while let Some(start) = rest.find(d.escape) {
        out.push_str(&rest[..start]);
        let after = &rest[start + d.escape.len_utf8()..];
        match after.find(d.escape) {
            Some(end) => {
                let sequence = &after[..end];
                match sequence {
                    "F" => out.push(d.field),
                    "S" => out.push(d.component),
                    "T" if !keep_subcomponents => out.push(d.subcomponent),
                    "R" => out.push(d.repetition),
                    "E" => out.push(d.escape),
                    _ => {
                        out.push(d.escape);
                        out.push_str(sequence);
                        out.push(d.escape);
                    }
                }
                rest = &after[end + d.escape.len_utf8()..];
            }
            None => {
                // unterminated, keep it verbatim
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);

    Cow::Owned(out)
}

/// Escapes any separator characters inside a leaf value.
pub fn escape<'a>(value: &'a str, d: &Delimiters) -> Cow<'a, str> {
    escape_with(value, d, false)
}

/// [`escape`] for a component that may still contain sub-components.
pub fn escape_component<'a>(value: &'a str, d: &Delimiters) -> Cow<'a, str> {
    escape_with(value, d, true)
}

fn escape_with<'a>(value: &'a str, d: &Delimiters, keep_subcomponents: bool) -> Cow<'a, str> {
    let special = [d.field, d.component, d.subcomponent, d.repetition, d.escape];
    if !value.contains(&special[..]) {
        return Cow::Borrowed(value);
    }

    let literal_subcomponent = format!("{}T{}", d.escape, d.escape);
    let mut out = String::with_capacity(value.len() + 8);
    let mut chars = value.char_indices();
    while let Some((i, c)) = chars.next() {
        if keep_subcomponents {
            if c == d.subcomponent {
                out.push(c);
                continue;
            }
            if value[i..].starts_with(&literal_subcomponent) {
                out.push_str(&literal_subcomponent);
                // the `T` and the closing escape
                chars.nth(1);
                continue;
            }
        }
        let code = if c == d.escape {
            Some('E')
        } else if c == d.field {
            Some('F')
        } else if c == d.component {
            Some('S')
        } else if c == d.subcomponent {
            Some('T')
        } else if c == d.repetition {
            Some('R')
        } else {
            None
        };
        match code {
            Some(code) => {
                out.push(d.escape);
                out.push(code);
                out.push(d.escape);
            }
            None => out.push(c),
        }
    }

    Cow::Owned(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_borrowed() {
        let d = Delimiters::default();
        assert!(matches!(unescape("Smith", &d), Cow::Borrowed(_)));
        assert!(matches!(escape("Smith", &d), Cow::Borrowed(_)));
    }

    #[test]
    fn separators_are_unescaped() {
        let d = Delimiters::default();
        assert_eq!(unescape("A\\F\\B\\S\\C\\T\\D\\R\\E\\E\\", &d), "A|B^C&D~E\\");
    }

    #[test]
    fn unknown_and_unterminated_sequences_are_kept() {
        let d = Delimiters::default();
        assert_eq!(unescape("\\H\\bold\\N\\", &d), "\\H\\bold\\N\\");
        assert_eq!(unescape("trailing \\F", &d), "trailing \\F");
    }

    #[test]
    fn escape_reverses_unescape() {
        let d = Delimiters::default();
        let text = "Fish & Chips | 2^3 ~ C:\\temp";
        let escaped = escape(text, &d);
        assert_eq!(escaped, "Fish \\T\\ Chips \\F\\ 2\\S\\3 \\R\\ C:\\E\\temp");
        assert_eq!(unescape(&escaped, &d), text);
    }

    #[test]
    fn component_level_leaves_subcomponents_alone() {
        let d = Delimiters::default();
        assert_eq!(unescape_component("de&Vries", &d), "de&Vries");
        assert_eq!(escape_component("de&Vries", &d), "de&Vries");

        let wire = "R\\T\\D&Lab\\F\\1";
        let text = unescape_component(wire, &d);
        assert_eq!(text, "R\\T\\D&Lab|1");
        assert_eq!(escape_component(&text, &d), wire);

        assert_eq!(escape_component("C:\\temp^x", &d), "C:\\E\\temp\\S\\x");
    }
}
