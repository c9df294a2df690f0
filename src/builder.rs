//! Construction of outbound messages.
//!
//! [`MessageBuilder`] assembles a header and body; [`adt`], [`orm`], [`oru`]
//! and [`ack`] pre-fill it for the common message families.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::ack::AckCode;
use crate::datetime::{self, Timestamp};
use crate::delimiters::Delimiters;
use crate::message::Message;
use crate::segments::{Evn, Msa, Msh, Obr, Obx, Orc, Pid, Pv1, Segment};
use crate::types::{HierarchicDesignator, MessageType};

pub const DEFAULT_VERSION: &str = "2.5";
pub const DEFAULT_PROCESSING_ID: &str = "P";

/// Monotonic source of MSH-10 control IDs.
#[derive(Debug, Default)]
pub struct ControlIds {
    prefix: String,
    next: AtomicU64,
}

impl ControlIds {
    pub fn new(prefix: impl Into<String>) -> Self {
        ControlIds {
            prefix: prefix.into(),
            next: AtomicU64::new(0),
        }
    }

    /// The next ID: the prefix followed by a counter starting at 1.
    pub fn next_id(&self) -> String {
        let n = self.next.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{}{}", self.prefix, n)
    }
}

/// Builder for a [`Message`].
///
/// Defaults to version 2.5, processing ID `P`, the standard delimiters and
/// the current time in MSH-7.
#[derive(Debug, Clone)]
pub struct MessageBuilder {
    header: Msh,
    delimiters: Delimiters,
    segments: Vec<Segment>,
}

impl MessageBuilder {
    pub fn new(code: impl Into<String>, trigger_event: impl Into<String>) -> Self {
        let header = Msh {
            message_type: MessageType::new(code, trigger_event),
            timestamp: Some(datetime::now()),
            processing_id: DEFAULT_PROCESSING_ID.to_string(),
            version_id: DEFAULT_VERSION.to_string(),
            ..Default::default()
        };
        MessageBuilder {
            header,
            delimiters: Delimiters::default(),
            segments: Vec::new(),
        }
    }

    /// MSH-3 and MSH-4.
    pub fn sending(mut self, application: impl Into<String>, facility: impl Into<String>) -> Self {
        self.header.sending_application = HierarchicDesignator::new(application);
        self.header.sending_facility = HierarchicDesignator::new(facility);
        self
    }

    /// MSH-5 and MSH-6.
    pub fn receiving(mut self, application: impl Into<String>, facility: impl Into<String>) -> Self {
        self.header.receiving_application = HierarchicDesignator::new(application);
        self.header.receiving_facility = HierarchicDesignator::new(facility);
        self
    }

    pub fn control_id(mut self, control_id: impl Into<String>) -> Self {
        self.header.control_id = control_id.into();
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.header.version_id = version.into();
        self
    }

    pub fn processing_id(mut self, processing_id: impl Into<String>) -> Self {
        self.header.processing_id = processing_id.into();
        self
    }

    pub fn timestamp(mut self, timestamp: Option<Timestamp>) -> Self {
        self.header.timestamp = timestamp;
        self
    }

    /// MSH-9.3, e.g. `ADT_A01`.
    pub fn structure(mut self, structure: impl Into<String>) -> Self {
        self.header.message_type.structure = structure.into();
        self
    }

    pub fn delimiters(mut self, delimiters: Delimiters) -> Self {
        self.delimiters = delimiters;
        self
    }

    pub fn segment(mut self, segment: impl Into<Segment>) -> Self {
        self.segments.push(segment.into());
        self
    }

    pub fn segments<I>(mut self, segments: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Segment>,
    {
        self.segments.extend(segments.into_iter().map(Into::into));
        self
    }

    pub fn build(self) -> Message {
        Message::new(self.header, self.segments, self.delimiters)
    }
}

fn event(trigger_event: &str) -> Evn {
    Evn {
        event_type_code: trigger_event.to_string(),
        recorded_at: Some(datetime::now()),
        ..Default::default()
    }
}

/// ADT (admit/discharge/transfer): MSH, EVN, PID and an optional PV1.
pub fn adt(trigger_event: &str, patient: Pid, visit: Option<Pv1>) -> MessageBuilder {
    let mut builder = MessageBuilder::new("ADT", trigger_event)
        .segment(event(trigger_event))
        .segment(patient);
    if let Some(visit) = visit {
        builder = builder.segment(visit);
    }
    builder
}

/// ORM^O01 general order: MSH, EVN, PID, ORC, OBR.
pub fn orm(patient: Pid, order: Orc, request: Obr) -> MessageBuilder {
    MessageBuilder::new("ORM", "O01")
        .segment(event("O01"))
        .segment(patient)
        .segment(order)
        .segment(request)
}

/// ORU^R01 observation result: MSH, EVN, PID, OBR, then each OBX.
pub fn oru(patient: Pid, request: Obr, results: Vec<Obx>) -> MessageBuilder {
    MessageBuilder::new("ORU", "R01")
        .segment(event("R01"))
        .segment(patient)
        .segment(request)
        .segments(results)
}

/// Acknowledgment of `original`.
///
/// Sender and receiver are swapped, version, processing ID and delimiters
/// are copied, and MSA-2 carries the original control ID.  MSH-10 is left
/// empty; set it with [`MessageBuilder::control_id`], typically from a
/// [`ControlIds`] counter.
pub fn ack(original: &Message, code: AckCode, text: impl Into<String>) -> MessageBuilder {
    let source = original.header();
    let header = Msh {
        sending_application: source.receiving_application.clone(),
        sending_facility: source.receiving_facility.clone(),
        receiving_application: source.sending_application.clone(),
        receiving_facility: source.sending_facility.clone(),
        timestamp: Some(datetime::now()),
        message_type: MessageType {
            code: "ACK".to_string(),
            trigger_event: source.message_type.trigger_event.clone(),
            structure: "ACK".to_string(),
        },
        processing_id: source.processing_id.clone(),
        version_id: source.version_id.clone(),
        ..Default::default()
    };

    MessageBuilder {
        header,
        delimiters: *original.delimiters(),
        segments: vec![Msa::new(code, source.control_id.clone(), text).into()],
    }
}
