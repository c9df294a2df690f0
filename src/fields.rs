//! Splitting a segment line into fields, repetitions, components and
//! sub-components, and the reverse for encoding.
//!
//! Field numbers follow HL7 numbering: `PID-3` is `fields.composites(3)`.
//! Anything missing reads as its empty value.

use crate::datetime::{format_timestamp, parse_timestamp, Timestamp};
use crate::delimiters::Delimiters;
use crate::error::ParseError;
use crate::escape::{escape, escape_component, unescape, unescape_component};

/// A structured value made of components, e.g. a person name or coded element.
pub trait Composite: Default {
    fn decode(c: &Components<'_>) -> Self;
    fn encode(&self, out: &mut ComponentWriter<'_>);
}

/// The components (or sub-components) of one value.
pub struct Components<'a> {
    parts: Vec<&'a str>,
    separator: char,
    d: &'a Delimiters,
}

impl<'a> Components<'a> {
    fn split(value: &'a str, separator: char, d: &'a Delimiters) -> Self {
        Components {
            parts: value.split(separator).collect(),
            separator,
            d,
        }
    }

    /// The unescaped text of component `i` (0-based).
    ///
    /// A component read as text keeps any sub-components it has, joined by
    /// the sub-component separator, so it encodes back to the same wire text.
    pub fn text(&self, i: usize) -> String {
        let value = self.parts.get(i).copied().unwrap_or("");
        if self.separator == self.d.subcomponent {
            unescape(value, self.d).into_owned()
        } else {
            unescape_component(value, self.d).into_owned()
        }
    }

    /// Component `i` read as a nested composite over sub-components.
    pub fn nested<T: Composite>(&self, i: usize) -> T {
        let value = self.parts.get(i).copied().unwrap_or("");
        if value.is_empty() {
            return T::default();
        }
        T::decode(&Components::split(value, self.d.subcomponent, self.d))
    }

    pub fn timestamp(&self, i: usize) -> Option<Timestamp> {
        parse_timestamp(self.parts.get(i).copied().unwrap_or(""))
    }
}

/// Builds the wire text for one composite value.
pub struct ComponentWriter<'a> {
    parts: Vec<String>,
    separator: char,
    d: &'a Delimiters,
}

impl<'a> ComponentWriter<'a> {
    fn new(separator: char, d: &'a Delimiters) -> Self {
        ComponentWriter {
            parts: Vec::new(),
            separator,
            d,
        }
    }

    fn put(&mut self, i: usize, value: String) {
        if self.parts.len() <= i {
            self.parts.resize(i + 1, String::new());
        }
        self.parts[i] = value;
    }

    pub fn text(&mut self, i: usize, value: &str) {
        if value.is_empty() {
            return;
        }
        let text = if self.separator == self.d.subcomponent {
            escape(value, self.d)
        } else {
            escape_component(value, self.d)
        };
        self.put(i, text.into_owned());
    }

    pub fn nested<T: Composite>(&mut self, i: usize, value: &T) {
        let mut inner = ComponentWriter::new(self.d.subcomponent, self.d);
        value.encode(&mut inner);
        let text = inner.finish();
        if !text.is_empty() {
            self.put(i, text);
        }
    }

    pub fn timestamp(&mut self, i: usize, value: Option<&Timestamp>) {
        if let Some(ts) = value {
            self.put(i, format_timestamp(ts));
        }
    }

    fn finish(mut self) -> String {
        while self.parts.last().map_or(false, |p| p.is_empty()) {
            self.parts.pop();
        }
        self.parts.join(&self.separator.to_string())
    }
}

/// Read access to the fields of one segment line.
pub struct Fields<'a> {
    values: Vec<&'a str>,
    d: &'a Delimiters,
}

impl<'a> Fields<'a> {
    /// Splits a non-header segment on the field separator.
    pub fn split(line: &'a str, d: &'a Delimiters) -> Self {
        Fields {
            values: line.split(d.field).collect(),
            d,
        }
    }

    /// Splits an MSH line.  MSH-1 is the field separator itself, so the
    /// numbering is shifted by one against every other segment.
    pub fn split_header(line: &'a str, d: &'a Delimiters) -> Self {
        let sep_len = d.field.len_utf8();
        let mut values: Vec<&'a str> = Vec::new();
        values.push(line.get(..3).unwrap_or(""));
        values.push(line.get(3..3 + sep_len).unwrap_or(""));
        if let Some(rest) = line.get(3 + sep_len..) {
            values.extend(rest.split(d.field));
        }
        Fields { values, d }
    }

    pub fn tag(&self) -> &'a str {
        self.values.first().copied().unwrap_or("")
    }

    pub fn delimiters(&self) -> &Delimiters {
        self.d
    }

    /// The number of fields after the tag.
    pub fn len(&self) -> usize {
        self.values.len().saturating_sub(1)
    }

    /// The field exactly as it appears on the wire.
    pub fn raw(&self, n: usize) -> &'a str {
        self.values.get(n).copied().unwrap_or("")
    }

    fn repetitions(&self, n: usize) -> impl Iterator<Item = &'a str> {
        let raw = self.raw(n);
        raw.split(self.d.repetition).filter(|r| !r.is_empty())
    }

    /// The unescaped first component of the first repetition.
    pub fn text(&self, n: usize) -> String {
        self.repetitions(n)
            .next()
            .map(|r| Components::split(r, self.d.component, self.d).text(0))
            .unwrap_or_default()
    }

    /// The unescaped first component of every repetition.
    pub fn texts(&self, n: usize) -> Vec<String> {
        self.repetitions(n)
            .map(|r| Components::split(r, self.d.component, self.d).text(0))
            .collect()
    }

    /// Every repetition verbatim, escapes and components intact.
    pub fn raw_repetitions(&self, n: usize) -> Vec<String> {
        self.repetitions(n).map(str::to_string).collect()
    }

    pub fn composite<T: Composite>(&self, n: usize) -> T {
        self.repetitions(n)
            .next()
            .map(|r| T::decode(&Components::split(r, self.d.component, self.d)))
            .unwrap_or_default()
    }

    pub fn composites<T: Composite>(&self, n: usize) -> Vec<T> {
        self.repetitions(n)
            .map(|r| T::decode(&Components::split(r, self.d.component, self.d)))
            .collect()
    }

    /// A date/time field.  The value is in the first component, HL7 v2.3 TS
    /// carries a precision indicator in the second.
    pub fn timestamp(&self, n: usize) -> Option<Timestamp> {
        self.repetitions(n)
            .next()
            .and_then(|r| Components::split(r, self.d.component, self.d).timestamp(0))
    }

    /// A numeric field such as a set ID.  Empty is `None`; anything that isn't
    /// a number fails the segment.
    pub fn number(&self, n: usize) -> Result<Option<u32>, ParseError> {
        let value = self.text(n);
        let value = value.trim();
        if value.is_empty() {
            return Ok(None);
        }
        value.parse::<u32>().map(Some).map_err(|_| {
            ParseError::segment(
                self.tag(),
                format!("{}-{} is not a number: '{}'", self.tag(), n, value),
            )
        })
    }
}

/// Builds the wire text of one segment.
pub struct FieldWriter<'a> {
    tag: &'a str,
    values: Vec<String>,
    header: bool,
    d: &'a Delimiters,
}

impl<'a> FieldWriter<'a> {
    pub fn new(tag: &'a str, d: &'a Delimiters) -> Self {
        FieldWriter {
            tag,
            values: vec![String::new()],
            header: false,
            d,
        }
    }

    /// A writer for MSH, where MSH-1 is the separator written after the tag.
    pub fn header(tag: &'a str, d: &'a Delimiters) -> Self {
        FieldWriter {
            header: true,
            ..FieldWriter::new(tag, d)
        }
    }

    pub fn delimiters(&self) -> &Delimiters {
        self.d
    }

    fn put(&mut self, n: usize, value: String) {
        if self.values.len() <= n {
            self.values.resize(n + 1, String::new());
        }
        self.values[n] = value;
    }

    /// Writes a value that is already in wire form.
    pub fn raw(&mut self, n: usize, value: &str) {
        self.put(n, value.to_string());
    }

    pub fn text(&mut self, n: usize, value: &str) {
        self.put(n, escape_component(value, self.d).into_owned());
    }

    pub fn texts(&mut self, n: usize, values: &[String]) {
        let joined = values
            .iter()
            .map(|v| escape_component(v, self.d).into_owned())
            .collect::<Vec<_>>()
            .join(&self.d.repetition.to_string());
        self.put(n, joined);
    }

    pub fn raw_repetitions(&mut self, n: usize, values: &[String]) {
        self.put(n, values.join(&self.d.repetition.to_string()));
    }

    pub fn composite<T: Composite>(&mut self, n: usize, value: &T) {
        let mut out = ComponentWriter::new(self.d.component, self.d);
        value.encode(&mut out);
        self.put(n, out.finish());
    }

    pub fn composites<T: Composite>(&mut self, n: usize, values: &[T]) {
        let joined = values
            .iter()
            .map(|v| {
                let mut out = ComponentWriter::new(self.d.component, self.d);
                v.encode(&mut out);
                out.finish()
            })
            .collect::<Vec<_>>()
            .join(&self.d.repetition.to_string());
        self.put(n, joined);
    }

    pub fn timestamp(&mut self, n: usize, value: Option<&Timestamp>) {
        if let Some(ts) = value {
            self.put(n, format_timestamp(ts));
        }
    }

    pub fn number(&mut self, n: usize, value: Option<u32>) {
        if let Some(v) = value {
            self.put(n, v.to_string());
        }
    }

    /// Joins the fields, dropping trailing empty ones.
    pub fn finish(mut self) -> String {
        let keep = if self.header { 3 } else { 1 };
        while self.values.len() > keep && self.values.last().map_or(false, |v| v.is_empty()) {
            self.values.pop();
        }

        let sep = self.d.field.to_string();
        let mut line = String::from(self.tag);
        let first = if self.header {
            // MSH-1 is the separator that follows the tag
            line.push(self.d.field);
            line.push_str(self.values.get(2).map(String::as_str).unwrap_or(""));
            3
        } else {
            1
        };
        for value in self.values.iter().skip(first) {
            line.push_str(&sep);
            line.push_str(value);
        }
        line
    }
}
