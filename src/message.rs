//! A whole HL7 v2.x message: the MSH header followed by the other segments.

use bytes::Bytes;
use log::{debug, warn};

use crate::ack::AckCode;
use crate::datetime::Timestamp;
use crate::delimiters::{Delimiters, SEGMENT_TERMINATOR};
use crate::error::ParseError;
use crate::segments::{encode_with, Msa, Msh, Segment, SegmentVariant};
use crate::types::HierarchicDesignator;

/// How [`Message::parse_with`] treats a segment that fails to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ParseMode {
    /// Skip the segment, record it in [`Message::dropped_segments`] and carry on.
    #[default]
    Lenient,
    /// Fail the whole parse.
    Strict,
}

/// A segment that lenient parsing skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedSegment {
    /// 1-based line number within the message.
    pub line_number: usize,
    pub line: String,
    pub error: ParseError,
}

/// An assembled message.  Always starts with a header; immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    delimiters: Delimiters,
    header: Msh,
    segments: Vec<Segment>,
    dropped: Vec<DroppedSegment>,
    raw: Option<Bytes>,
}

impl Message {
    /// Assembles a message from a header and its following segments.
    pub fn new(header: Msh, segments: Vec<Segment>, delimiters: Delimiters) -> Self {
        Message {
            delimiters,
            header,
            segments,
            dropped: Vec::new(),
            raw: None,
        }
    }

    /// Parses one de-framed message, skipping segments that fail to decode.
    pub fn parse(bytes: &[u8]) -> Result<Message, ParseError> {
        Message::parse_with(bytes, ParseMode::Lenient)
    }

    /// Parses one de-framed message.
    ///
    /// `\r\n` and `\n` are accepted as segment terminators.  The delimiters
    /// come from this message's own MSH.  Only a bad header fails a lenient
    /// parse.
    pub fn parse_with(bytes: &[u8], mode: ParseMode) -> Result<Message, ParseError> {
        let text = String::from_utf8_lossy(bytes);
        let normalized = text.replace("\r\n", "\r").replace('\n', "\r");

        let mut lines = normalized
            .split(SEGMENT_TERMINATOR)
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty());

        let header_line = match lines.next() {
            Some((_, line)) => line,
            None => return Err(ParseError::MalformedHeader("message is empty".to_string())),
        };

        let delimiters = Delimiters::from_header(header_line)?;
        let header = match Segment::decode(header_line, &delimiters) {
            Ok(Segment::Msh(header)) => header,
            Ok(other) => {
                return Err(ParseError::MalformedHeader(format!(
                    "first segment decoded as {}",
                    other.tag()
                )))
            }
            Err(e) => return Err(ParseError::MalformedHeader(e.to_string())),
        };

        let mut segments = Vec::new();
        let mut dropped = Vec::new();
        for (index, line) in lines {
            match Segment::decode(line, &delimiters) {
                Ok(segment) => segments.push(segment),
                Err(e) if mode == ParseMode::Strict => return Err(e),
                Err(e) => {
                    warn!(
                        "Dropping line {} of message {}: {}",
                        index + 1,
                        header.control_id,
                        e
                    );
                    dropped.push(DroppedSegment {
                        line_number: index + 1,
                        line: line.to_string(),
                        error: e,
                    });
                }
            }
        }

        debug!(
            "Parsed {}^{} message {} with {} segments",
            header.message_type.code,
            header.message_type.trigger_event,
            header.control_id,
            segments.len() + 1
        );

        Ok(Message {
            delimiters,
            header,
            segments,
            dropped,
            raw: Some(Bytes::copy_from_slice(bytes)),
        })
    }

    pub fn delimiters(&self) -> &Delimiters {
        &self.delimiters
    }

    pub fn header(&self) -> &Msh {
        &self.header
    }

    /// The segments after the header, in message order.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Segments with the given tag, excluding the header.
    pub fn segments_with_tag<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Segment> {
        self.segments.iter().filter(move |s| s.tag() == tag)
    }

    /// The first segment of type `T` after the header.
    pub fn first<T: SegmentVariant>(&self) -> Option<&T> {
        self.segments.iter().find_map(T::from_segment)
    }

    /// Every segment of type `T` after the header.
    pub fn all<'a, T: SegmentVariant + 'a>(&'a self) -> impl Iterator<Item = &'a T> + 'a {
        self.segments.iter().filter_map(T::from_segment)
    }

    /// Lines skipped by a lenient parse.
    pub fn dropped_segments(&self) -> &[DroppedSegment] {
        &self.dropped
    }

    /// The bytes this message was parsed from, if it was parsed.
    pub fn raw(&self) -> Option<&Bytes> {
        self.raw.as_ref()
    }

    /// MSH-9.1, e.g. `ADT`.
    pub fn message_type(&self) -> &str {
        &self.header.message_type.code
    }

    /// MSH-9.2, e.g. `A01`.
    pub fn trigger_event(&self) -> &str {
        &self.header.message_type.trigger_event
    }

    /// MSH-10, echoed back in the acknowledgment's MSA-2.
    pub fn control_id(&self) -> &str {
        &self.header.control_id
    }

    pub fn timestamp(&self) -> Option<Timestamp> {
        self.header.timestamp
    }

    pub fn version(&self) -> &str {
        &self.header.version_id
    }

    pub fn sending_application(&self) -> &HierarchicDesignator {
        &self.header.sending_application
    }

    pub fn sending_facility(&self) -> &HierarchicDesignator {
        &self.header.sending_facility
    }

    pub fn receiving_application(&self) -> &HierarchicDesignator {
        &self.header.receiving_application
    }

    pub fn receiving_facility(&self) -> &HierarchicDesignator {
        &self.header.receiving_facility
    }

    pub fn msa(&self) -> Option<&Msa> {
        self.first::<Msa>()
    }

    /// MSA-1 when this message is an acknowledgment.
    pub fn ack_code(&self) -> Option<AckCode> {
        self.msa().map(|msa| msa.ack_code)
    }

    /// MSA-2, the control ID this message acknowledges.
    pub fn acknowledged_control_id(&self) -> Option<&str> {
        self.msa().map(|msa| msa.control_id.as_str())
    }

    /// The wire text: every segment joined by the segment terminator.
    pub fn encode(&self) -> String {
        let mut out = encode_with(&self.header, &self.delimiters);
        for segment in &self.segments {
            out.push(SEGMENT_TERMINATOR);
            out.push_str(&segment.encode(&self.delimiters));
        }
        out
    }

    pub fn to_bytes(&self) -> Bytes {
        Bytes::from(self.encode())
    }
}
