//! Order and result segments: ORC, OBR and OBX.

use super::SegmentCodec;
use crate::datetime::Timestamp;
use crate::error::ParseError;
use crate::fields::{FieldWriter, Fields};
use crate::types::{CodedElement, EntityIdentifier, Provider};

/// ORC common order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Orc {
    pub order_control: String,
    pub placer_order_number: EntityIdentifier,
    pub filler_order_number: EntityIdentifier,
    pub placer_group_number: EntityIdentifier,
    pub order_status: String,
    pub response_flag: String,
    pub transaction_at: Option<Timestamp>,
    pub entered_by: Vec<Provider>,
    pub verified_by: Vec<Provider>,
    pub ordering_providers: Vec<Provider>,
    pub order_effective_at: Option<Timestamp>,
    pub order_control_reason: CodedElement,
}

impl SegmentCodec for Orc {
    const TAG: &'static str = "ORC";

    fn decode(f: &Fields<'_>) -> Result<Self, ParseError> {
        Ok(Orc {
            order_control: f.text(1),
            placer_order_number: f.composite(2),
            filler_order_number: f.composite(3),
            placer_group_number: f.composite(4),
            order_status: f.text(5),
            response_flag: f.text(6),
            transaction_at: f.timestamp(9),
            entered_by: f.composites(10),
            verified_by: f.composites(11),
            ordering_providers: f.composites(12),
            order_effective_at: f.timestamp(15),
            order_control_reason: f.composite(16),
        })
    }

    fn encode(&self, out: &mut FieldWriter<'_>) {
        out.text(1, &self.order_control);
        out.composite(2, &self.placer_order_number);
        out.composite(3, &self.filler_order_number);
        out.composite(4, &self.placer_group_number);
        out.text(5, &self.order_status);
        out.text(6, &self.response_flag);
        out.timestamp(9, self.transaction_at.as_ref());
        out.composites(10, &self.entered_by);
        out.composites(11, &self.verified_by);
        out.composites(12, &self.ordering_providers);
        out.timestamp(15, self.order_effective_at.as_ref());
        out.composite(16, &self.order_control_reason);
    }
}

/// OBR observation request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Obr {
    pub set_id: Option<u32>,
    pub placer_order_number: EntityIdentifier,
    pub filler_order_number: EntityIdentifier,
    pub universal_service_id: CodedElement,
    pub priority: String,
    pub requested_at: Option<Timestamp>,
    pub observed_at: Option<Timestamp>,
    pub observation_end_at: Option<Timestamp>,
    pub specimen_action_code: String,
    pub relevant_clinical_info: String,
    pub specimen_received_at: Option<Timestamp>,
    pub ordering_providers: Vec<Provider>,
    pub results_reported_at: Option<Timestamp>,
    pub diagnostic_service: String,
    pub result_status: String,
}

impl SegmentCodec for Obr {
    const TAG: &'static str = "OBR";

    fn decode(f: &Fields<'_>) -> Result<Self, ParseError> {
        Ok(Obr {
            set_id: f.number(1)?,
            placer_order_number: f.composite(2),
            filler_order_number: f.composite(3),
            universal_service_id: f.composite(4),
            priority: f.text(5),
            requested_at: f.timestamp(6),
            observed_at: f.timestamp(7),
            observation_end_at: f.timestamp(8),
            specimen_action_code: f.text(11),
            relevant_clinical_info: f.text(13),
            specimen_received_at: f.timestamp(14),
            ordering_providers: f.composites(16),
            results_reported_at: f.timestamp(22),
            diagnostic_service: f.text(24),
            result_status: f.text(25),
        })
    }

    fn encode(&self, out: &mut FieldWriter<'_>) {
        out.number(1, self.set_id);
        out.composite(2, &self.placer_order_number);
        out.composite(3, &self.filler_order_number);
        out.composite(4, &self.universal_service_id);
        out.text(5, &self.priority);
        out.timestamp(6, self.requested_at.as_ref());
        out.timestamp(7, self.observed_at.as_ref());
        out.timestamp(8, self.observation_end_at.as_ref());
        out.text(11, &self.specimen_action_code);
        out.text(13, &self.relevant_clinical_info);
        out.timestamp(14, self.specimen_received_at.as_ref());
        out.composites(16, &self.ordering_providers);
        out.timestamp(22, self.results_reported_at.as_ref());
        out.text(24, &self.diagnostic_service);
        out.text(25, &self.result_status);
    }
}

/// OBX observation result.
///
/// OBX-5 is typed by OBX-2, so each repetition is kept in wire form and
/// interpreted by the caller.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Obx {
    pub set_id: Option<u32>,
    pub value_type: String,
    pub observation_id: CodedElement,
    pub sub_id: String,
    pub values: Vec<String>,
    pub units: CodedElement,
    pub reference_range: String,
    pub abnormal_flags: Vec<String>,
    pub result_status: String,
    pub observed_at: Option<Timestamp>,
    pub producer_id: CodedElement,
    pub responsible_observers: Vec<Provider>,
}

impl Obx {
    /// The first value parsed as a number, for `NM` observations.
    pub fn numeric_value(&self) -> Option<f64> {
        self.values.first().and_then(|v| v.trim().parse().ok())
    }
}

impl SegmentCodec for Obx {
    const TAG: &'static str = "OBX";

    fn decode(f: &Fields<'_>) -> Result<Self, ParseError> {
        Ok(Obx {
            set_id: f.number(1)?,
            value_type: f.text(2),
            observation_id: f.composite(3),
            sub_id: f.text(4),
            values: f.raw_repetitions(5),
            units: f.composite(6),
            reference_range: f.text(7),
            abnormal_flags: f.texts(8),
            result_status: f.text(11),
            observed_at: f.timestamp(14),
            producer_id: f.composite(15),
            responsible_observers: f.composites(16),
        })
    }

    fn encode(&self, out: &mut FieldWriter<'_>) {
        out.number(1, self.set_id);
        out.text(2, &self.value_type);
        out.composite(3, &self.observation_id);
        out.text(4, &self.sub_id);
        out.raw_repetitions(5, &self.values);
        out.composite(6, &self.units);
        out.text(7, &self.reference_range);
        out.texts(8, &self.abnormal_flags);
        out.text(11, &self.result_status);
        out.timestamp(14, self.observed_at.as_ref());
        out.composite(15, &self.producer_id);
        out.composites(16, &self.responsible_observers);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delimiters::Delimiters;
    use crate::segments::Segment;

    #[test]
    fn obx_numeric_result() {
        let d = Delimiters::default();
        let line = "OBX|1|NM|8867-4^Heart rate^LN||72|/min^beats per minute|60-100|N|||F|||20230615143000";
        let obx = match Segment::decode(line, &d).unwrap() {
            Segment::Obx(obx) => obx,
            other => panic!("expected OBX, got {:?}", other),
        };

        assert_eq!(obx.set_id, Some(1));
        assert_eq!(obx.value_type, "NM");
        assert_eq!(obx.observation_id.identifier, "8867-4");
        assert_eq!(obx.observation_id.coding_system, "LN");
        assert_eq!(obx.numeric_value(), Some(72.0));
        assert_eq!(obx.units.text, "beats per minute");
        assert_eq!(obx.reference_range, "60-100");
        assert_eq!(obx.abnormal_flags, vec!["N"]);
        assert_eq!(obx.result_status, "F");
        assert!(obx.observed_at.is_some());
        assert_eq!(Segment::Obx(obx).encode(&d), line);
    }

    #[test]
    fn obx_coded_value_stays_in_wire_form() {
        let d = Delimiters::default();
        match Segment::decode("OBX|2|CE|88040-1||Y^Yes^HL70136~N^No^HL70136", &d).unwrap() {
            Segment::Obx(obx) => {
                assert_eq!(obx.values, vec!["Y^Yes^HL70136", "N^No^HL70136"]);
                assert_eq!(obx.numeric_value(), None);
            }
            other => panic!("expected OBX, got {:?}", other),
        }
    }

    #[test]
    fn orc_and_obr() {
        let d = Delimiters::default();
        match Segment::decode("ORC|NW|ORD123^EPIC|||SC||||20230615|||1234^Welby^Marcus", &d).unwrap() {
            Segment::Orc(orc) => {
                assert_eq!(orc.order_control, "NW");
                assert_eq!(orc.placer_order_number.entity_id, "ORD123");
                assert_eq!(orc.placer_order_number.namespace_id, "EPIC");
                assert_eq!(orc.order_status, "SC");
                assert!(orc.transaction_at.is_some());
                assert_eq!(orc.ordering_providers[0].family_name, "Welby");
            }
            other => panic!("expected ORC, got {:?}", other),
        }

        match Segment::decode("OBR|1|ORD123||CBC^Complete blood count^L|R|20230615", &d).unwrap() {
            Segment::Obr(obr) => {
                assert_eq!(obr.set_id, Some(1));
                assert_eq!(obr.universal_service_id.text, "Complete blood count");
                assert_eq!(obr.priority, "R");
                assert!(obr.requested_at.is_some());
            }
            other => panic!("expected OBR, got {:?}", other),
        }
    }
}
