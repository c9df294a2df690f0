//! The separator characters of one message, read from its MSH segment.

use crate::error::ParseError;

/// Tag of the header segment every message starts with.
pub const HEADER_TAG: &str = "MSH";

/// HL7 segment terminator.
pub const SEGMENT_TERMINATOR: char = '\r';

/// The five HL7 separators.  Each message carries its own set in MSH-1/MSH-2,
/// so a table is derived per message and passed by reference into every
/// segment decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delimiters {
    pub field: char,
    pub component: char,
    pub repetition: char,
    pub escape: char,
    pub subcomponent: char,
}

impl Default for Delimiters {
    fn default() -> Self {
        Delimiters {
            field: '|',
            component: '^',
            repetition: '~',
            escape: '\\',
            subcomponent: '&',
        }
    }
}

impl Delimiters {
    /// Reads the separators from an MSH line: the field separator is the fourth
    /// character and the next four are component, repetition, escape and
    /// sub-component in that order.
    pub fn from_header(line: &str) -> Result<Self, ParseError> {
        if !line.starts_with(HEADER_TAG) {
            return Err(ParseError::MalformedHeader(format!(
                "expected the message to start with {}",
                HEADER_TAG
            )));
        }

        let chars: Vec<char> = line.chars().take(8).collect();
        if chars.len() < 8 {
            return Err(ParseError::MalformedHeader(format!(
                "header is {} characters, at least 8 are needed for the encoding characters",
                line.chars().count()
            )));
        }

        let separators = &chars[3..8];
        if let Some(c) = separators.iter().find(|c| !c.is_ascii()) {
            return Err(ParseError::MalformedHeader(format!(
                "separator '{}' is not an ASCII character",
                c
            )));
        }
        for (i, c) in separators.iter().enumerate() {
            if separators[i + 1..].contains(c) {
                return Err(ParseError::MalformedHeader(format!(
                    "separator '{}' is used for more than one level",
                    c
                )));
            }
        }

        Ok(Delimiters {
            field: chars[3],
            component: chars[4],
            repetition: chars[5],
            escape: chars[6],
            subcomponent: chars[7],
        })
    }

    /// The field separator as the single byte it occupies in the header.
    /// `None` only for a hand-built table with a non-ASCII separator.
    pub fn field_byte(&self) -> Option<u8> {
        u8::try_from(self.field).ok()
    }

    /// The MSH-2 value for this table, e.g. `^~\&`.
    pub fn encoding_characters(&self) -> String {
        [self.component, self.repetition, self.escape, self.subcomponent]
            .iter()
            .collect()
    }
}
