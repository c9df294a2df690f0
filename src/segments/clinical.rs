//! Clinical detail segments: DG1, PR1, AL1 and RXA.

use super::SegmentCodec;
use crate::datetime::Timestamp;
use crate::error::ParseError;
use crate::fields::{FieldWriter, Fields};
use crate::types::{CodedElement, Provider};

/// DG1 diagnosis.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dg1 {
    pub set_id: Option<u32>,
    pub coding_method: String,
    pub diagnosis_code: CodedElement,
    pub description: String,
    pub diagnosed_at: Option<Timestamp>,
    pub diagnosis_type: String,
    pub priority: Option<u32>,
    pub clinicians: Vec<Provider>,
}

impl SegmentCodec for Dg1 {
    const TAG: &'static str = "DG1";

    fn decode(f: &Fields<'_>) -> Result<Self, ParseError> {
        Ok(Dg1 {
            set_id: f.number(1)?,
            coding_method: f.text(2),
            diagnosis_code: f.composite(3),
            description: f.text(4),
            diagnosed_at: f.timestamp(5),
            diagnosis_type: f.text(6),
            priority: f.number(15)?,
            clinicians: f.composites(16),
        })
    }

    fn encode(&self, out: &mut FieldWriter<'_>) {
        out.number(1, self.set_id);
        out.text(2, &self.coding_method);
        out.composite(3, &self.diagnosis_code);
        out.text(4, &self.description);
        out.timestamp(5, self.diagnosed_at.as_ref());
        out.text(6, &self.diagnosis_type);
        out.number(15, self.priority);
        out.composites(16, &self.clinicians);
    }
}

/// PR1 procedure.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pr1 {
    pub set_id: Option<u32>,
    pub coding_method: String,
    pub procedure_code: CodedElement,
    pub description: String,
    pub performed_at: Option<Timestamp>,
    pub functional_type: String,
    pub minutes: Option<u32>,
    pub anesthesiologists: Vec<Provider>,
    pub surgeons: Vec<Provider>,
}

impl SegmentCodec for Pr1 {
    const TAG: &'static str = "PR1";

    fn decode(f: &Fields<'_>) -> Result<Self, ParseError> {
        Ok(Pr1 {
            set_id: f.number(1)?,
            coding_method: f.text(2),
            procedure_code: f.composite(3),
            description: f.text(4),
            performed_at: f.timestamp(5),
            functional_type: f.text(6),
            minutes: f.number(7)?,
            anesthesiologists: f.composites(8),
            surgeons: f.composites(11),
        })
    }

    fn encode(&self, out: &mut FieldWriter<'_>) {
        out.number(1, self.set_id);
        out.text(2, &self.coding_method);
        out.composite(3, &self.procedure_code);
        out.text(4, &self.description);
        out.timestamp(5, self.performed_at.as_ref());
        out.text(6, &self.functional_type);
        out.number(7, self.minutes);
        out.composites(8, &self.anesthesiologists);
        out.composites(11, &self.surgeons);
    }
}

/// AL1 patient allergy.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Al1 {
    pub set_id: Option<u32>,
    pub allergen_type: CodedElement,
    pub allergen: CodedElement,
    pub severity: CodedElement,
    pub reactions: Vec<String>,
    pub identified_at: Option<Timestamp>,
}

impl SegmentCodec for Al1 {
    const TAG: &'static str = "AL1";

    fn decode(f: &Fields<'_>) -> Result<Self, ParseError> {
        Ok(Al1 {
            set_id: f.number(1)?,
            allergen_type: f.composite(2),
            allergen: f.composite(3),
            severity: f.composite(4),
            reactions: f.texts(5),
            identified_at: f.timestamp(6),
        })
    }

    fn encode(&self, out: &mut FieldWriter<'_>) {
        out.number(1, self.set_id);
        out.composite(2, &self.allergen_type);
        out.composite(3, &self.allergen);
        out.composite(4, &self.severity);
        out.texts(5, &self.reactions);
        out.timestamp(6, self.identified_at.as_ref());
    }
}

/// RXA pharmacy/treatment administration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Rxa {
    pub give_sub_id_counter: Option<u32>,
    pub administration_sub_id_counter: Option<u32>,
    pub started_at: Option<Timestamp>,
    pub ended_at: Option<Timestamp>,
    pub administered_code: CodedElement,
    pub administered_amount: String,
    pub administered_units: CodedElement,
    pub dosage_form: CodedElement,
    pub administering_providers: Vec<Provider>,
    pub lot_numbers: Vec<String>,
    pub expires_at: Option<Timestamp>,
    pub manufacturer: CodedElement,
    pub completion_status: String,
    pub action_code: String,
}

impl SegmentCodec for Rxa {
    const TAG: &'static str = "RXA";

    fn decode(f: &Fields<'_>) -> Result<Self, ParseError> {
        Ok(Rxa {
            give_sub_id_counter: f.number(1)?,
            administration_sub_id_counter: f.number(2)?,
            started_at: f.timestamp(3),
            ended_at: f.timestamp(4),
            administered_code: f.composite(5),
            administered_amount: f.text(6),
            administered_units: f.composite(7),
            dosage_form: f.composite(8),
            administering_providers: f.composites(10),
            lot_numbers: f.texts(15),
            expires_at: f.timestamp(16),
            manufacturer: f.composite(17),
            completion_status: f.text(20),
            action_code: f.text(21),
        })
    }

    fn encode(&self, out: &mut FieldWriter<'_>) {
        out.number(1, self.give_sub_id_counter);
        out.number(2, self.administration_sub_id_counter);
        out.timestamp(3, self.started_at.as_ref());
        out.timestamp(4, self.ended_at.as_ref());
        out.composite(5, &self.administered_code);
        out.text(6, &self.administered_amount);
        out.composite(7, &self.administered_units);
        out.composite(8, &self.dosage_form);
        out.composites(10, &self.administering_providers);
        out.texts(15, &self.lot_numbers);
        out.timestamp(16, self.expires_at.as_ref());
        out.composite(17, &self.manufacturer);
        out.text(20, &self.completion_status);
        out.text(21, &self.action_code);
    }
}
