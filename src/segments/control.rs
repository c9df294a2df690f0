//! Message control segments: MSH, EVN and MSA.

use super::SegmentCodec;
use crate::datetime::Timestamp;
use crate::ack::AckCode;
use crate::error::ParseError;
use crate::fields::{FieldWriter, Fields};
use crate::types::{CodedElement, HierarchicDesignator, MessageType, Provider};

/// MSH message header.
///
/// MSH-1 and MSH-2 are the separators, they live in the message's
/// [`Delimiters`](crate::Delimiters) and are written from there.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Msh {
    pub sending_application: HierarchicDesignator,
    pub sending_facility: HierarchicDesignator,
    pub receiving_application: HierarchicDesignator,
    pub receiving_facility: HierarchicDesignator,
    pub timestamp: Option<Timestamp>,
    pub security: String,
    pub message_type: MessageType,
    pub control_id: String,
    pub processing_id: String,
    pub version_id: String,
    pub sequence_number: String,
    pub continuation_pointer: String,
    pub accept_ack_type: String,
    pub application_ack_type: String,
    pub country_code: String,
    pub character_sets: Vec<String>,
    pub principal_language: CodedElement,
}

impl SegmentCodec for Msh {
    const TAG: &'static str = "MSH";

    fn decode(f: &Fields<'_>) -> Result<Self, ParseError> {
        Ok(Msh {
            sending_application: f.composite(3),
            sending_facility: f.composite(4),
            receiving_application: f.composite(5),
            receiving_facility: f.composite(6),
            timestamp: f.timestamp(7),
            security: f.text(8),
            message_type: f.composite(9),
            control_id: f.text(10),
            processing_id: f.text(11),
            version_id: f.text(12),
            sequence_number: f.text(13),
            continuation_pointer: f.text(14),
            accept_ack_type: f.text(15),
            application_ack_type: f.text(16),
            country_code: f.text(17),
            character_sets: f.texts(18),
            principal_language: f.composite(19),
        })
    }

    fn encode(&self, out: &mut FieldWriter<'_>) {
        let encoding = out.delimiters().encoding_characters();
        out.raw(2, &encoding);
        out.composite(3, &self.sending_application);
        out.composite(4, &self.sending_facility);
        out.composite(5, &self.receiving_application);
        out.composite(6, &self.receiving_facility);
        out.timestamp(7, self.timestamp.as_ref());
        out.text(8, &self.security);
        out.composite(9, &self.message_type);
        out.text(10, &self.control_id);
        out.text(11, &self.processing_id);
        out.text(12, &self.version_id);
        out.text(13, &self.sequence_number);
        out.text(14, &self.continuation_pointer);
        out.text(15, &self.accept_ack_type);
        out.text(16, &self.application_ack_type);
        out.text(17, &self.country_code);
        out.texts(18, &self.character_sets);
        out.composite(19, &self.principal_language);
    }
}

/// EVN event type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Evn {
    pub event_type_code: String,
    pub recorded_at: Option<Timestamp>,
    pub planned_at: Option<Timestamp>,
    pub reason_code: String,
    pub operators: Vec<Provider>,
    pub occurred_at: Option<Timestamp>,
    pub event_facility: HierarchicDesignator,
}

impl SegmentCodec for Evn {
    const TAG: &'static str = "EVN";

    fn decode(f: &Fields<'_>) -> Result<Self, ParseError> {
        Ok(Evn {
            event_type_code: f.text(1),
            recorded_at: f.timestamp(2),
            planned_at: f.timestamp(3),
            reason_code: f.text(4),
            operators: f.composites(5),
            occurred_at: f.timestamp(6),
            event_facility: f.composite(7),
        })
    }

    fn encode(&self, out: &mut FieldWriter<'_>) {
        out.text(1, &self.event_type_code);
        out.timestamp(2, self.recorded_at.as_ref());
        out.timestamp(3, self.planned_at.as_ref());
        out.text(4, &self.reason_code);
        out.composites(5, &self.operators);
        out.timestamp(6, self.occurred_at.as_ref());
        out.composite(7, &self.event_facility);
    }
}

/// MSA message acknowledgment.
#[derive(Debug, Clone, PartialEq)]
pub struct Msa {
    pub ack_code: AckCode,
    /// MSH-10 of the message being acknowledged.
    pub control_id: String,
    pub text_message: String,
    pub expected_sequence_number: Option<u32>,
    pub delayed_ack_type: String,
    pub error_condition: CodedElement,
}

impl Msa {
    pub fn new(ack_code: AckCode, control_id: impl Into<String>, text: impl Into<String>) -> Self {
        Msa {
            ack_code,
            control_id: control_id.into(),
            text_message: text.into(),
            expected_sequence_number: None,
            delayed_ack_type: String::new(),
            error_condition: CodedElement::default(),
        }
    }
}

impl SegmentCodec for Msa {
    const TAG: &'static str = "MSA";

    fn decode(f: &Fields<'_>) -> Result<Self, ParseError> {
        let ack_code = f
            .text(1)
            .parse::<AckCode>()
            .map_err(|e| ParseError::segment(Self::TAG, e.to_string()))?;

        Ok(Msa {
            ack_code,
            control_id: f.text(2),
            text_message: f.text(3),
            expected_sequence_number: f.number(4)?,
            delayed_ack_type: f.text(5),
            error_condition: f.composite(6),
        })
    }

    fn encode(&self, out: &mut FieldWriter<'_>) {
        out.text(1, self.ack_code.as_str());
        out.text(2, &self.control_id);
        out.text(3, &self.text_message);
        out.number(4, self.expected_sequence_number);
        out.text(5, &self.delayed_ack_type);
        out.composite(6, &self.error_condition);
    }
}
