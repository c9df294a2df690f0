//! Patient administration segments: PID, PV1, NK1 and IN1.

use super::SegmentCodec;
use crate::datetime::Timestamp;
use crate::error::ParseError;
use crate::fields::{FieldWriter, Fields};
use crate::types::{Address, CodedElement, ExtendedId, Location, PersonName, Provider};

/// PID patient identification.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pid {
    pub set_id: Option<u32>,
    pub patient_id: ExtendedId,
    pub identifiers: Vec<ExtendedId>,
    pub alternate_ids: Vec<ExtendedId>,
    pub names: Vec<PersonName>,
    pub mothers_maiden_name: Vec<PersonName>,
    pub birth_date: Option<Timestamp>,
    pub sex: String,
    pub aliases: Vec<PersonName>,
    pub race: Vec<CodedElement>,
    pub addresses: Vec<Address>,
    pub county_code: String,
    pub home_phones: Vec<String>,
    pub business_phones: Vec<String>,
    pub primary_language: CodedElement,
    pub marital_status: CodedElement,
    pub religion: CodedElement,
    pub account_number: ExtendedId,
    pub ssn: String,
    pub ethnic_groups: Vec<CodedElement>,
    pub birth_place: String,
    pub death_date: Option<Timestamp>,
    pub death_indicator: String,
}

impl Pid {
    /// The first identifier of the given type (e.g. `MR`) from PID-3.
    pub fn identifier(&self, identifier_type: &str) -> Option<&ExtendedId> {
        self.identifiers
            .iter()
            .find(|id| id.identifier_type == identifier_type)
    }
}

impl SegmentCodec for Pid {
    const TAG: &'static str = "PID";

    fn decode(f: &Fields<'_>) -> Result<Self, ParseError> {
        Ok(Pid {
            set_id: f.number(1)?,
            patient_id: f.composite(2),
            identifiers: f.composites(3),
            alternate_ids: f.composites(4),
            names: f.composites(5),
            mothers_maiden_name: f.composites(6),
            birth_date: f.timestamp(7),
            sex: f.text(8),
            aliases: f.composites(9),
            race: f.composites(10),
            addresses: f.composites(11),
            county_code: f.text(12),
            home_phones: f.texts(13),
            business_phones: f.texts(14),
            primary_language: f.composite(15),
            marital_status: f.composite(16),
            religion: f.composite(17),
            account_number: f.composite(18),
            ssn: f.text(19),
            ethnic_groups: f.composites(22),
            birth_place: f.text(23),
            death_date: f.timestamp(29),
            death_indicator: f.text(30),
        })
    }

    fn encode(&self, out: &mut FieldWriter<'_>) {
        out.number(1, self.set_id);
        out.composite(2, &self.patient_id);
        out.composites(3, &self.identifiers);
        out.composites(4, &self.alternate_ids);
        out.composites(5, &self.names);
        out.composites(6, &self.mothers_maiden_name);
        out.timestamp(7, self.birth_date.as_ref());
        out.text(8, &self.sex);
        out.composites(9, &self.aliases);
        out.composites(10, &self.race);
        out.composites(11, &self.addresses);
        out.text(12, &self.county_code);
        out.texts(13, &self.home_phones);
        out.texts(14, &self.business_phones);
        out.composite(15, &self.primary_language);
        out.composite(16, &self.marital_status);
        out.composite(17, &self.religion);
        out.composite(18, &self.account_number);
        out.text(19, &self.ssn);
        out.composites(22, &self.ethnic_groups);
        out.text(23, &self.birth_place);
        out.timestamp(29, self.death_date.as_ref());
        out.text(30, &self.death_indicator);
    }
}

/// PV1 patient visit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pv1 {
    pub set_id: Option<u32>,
    pub patient_class: String,
    pub assigned_location: Location,
    pub admission_type: String,
    pub preadmit_number: ExtendedId,
    pub prior_location: Location,
    pub attending_doctors: Vec<Provider>,
    pub referring_doctors: Vec<Provider>,
    pub consulting_doctors: Vec<Provider>,
    pub hospital_service: String,
    pub admit_source: String,
    pub admitting_doctors: Vec<Provider>,
    pub patient_type: String,
    pub visit_number: ExtendedId,
    pub discharge_disposition: String,
    pub admitted_at: Option<Timestamp>,
    pub discharged_at: Option<Timestamp>,
}

impl SegmentCodec for Pv1 {
    const TAG: &'static str = "PV1";

    fn decode(f: &Fields<'_>) -> Result<Self, ParseError> {
        Ok(Pv1 {
            set_id: f.number(1)?,
            patient_class: f.text(2),
            assigned_location: f.composite(3),
            admission_type: f.text(4),
            preadmit_number: f.composite(5),
            prior_location: f.composite(6),
            attending_doctors: f.composites(7),
            referring_doctors: f.composites(8),
            consulting_doctors: f.composites(9),
            hospital_service: f.text(10),
            admit_source: f.text(14),
            admitting_doctors: f.composites(17),
            patient_type: f.text(18),
            visit_number: f.composite(19),
            discharge_disposition: f.text(36),
            admitted_at: f.timestamp(44),
            discharged_at: f.timestamp(45),
        })
    }

    fn encode(&self, out: &mut FieldWriter<'_>) {
        out.number(1, self.set_id);
        out.text(2, &self.patient_class);
        out.composite(3, &self.assigned_location);
        out.text(4, &self.admission_type);
        out.composite(5, &self.preadmit_number);
        out.composite(6, &self.prior_location);
        out.composites(7, &self.attending_doctors);
        out.composites(8, &self.referring_doctors);
        out.composites(9, &self.consulting_doctors);
        out.text(10, &self.hospital_service);
        out.text(14, &self.admit_source);
        out.composites(17, &self.admitting_doctors);
        out.text(18, &self.patient_type);
        out.composite(19, &self.visit_number);
        out.text(36, &self.discharge_disposition);
        out.timestamp(44, self.admitted_at.as_ref());
        out.timestamp(45, self.discharged_at.as_ref());
    }
}

/// NK1 next of kin / associated party.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Nk1 {
    pub set_id: Option<u32>,
    pub names: Vec<PersonName>,
    pub relationship: CodedElement,
    pub addresses: Vec<Address>,
    pub phones: Vec<String>,
    pub business_phones: Vec<String>,
    pub contact_role: CodedElement,
    pub start_date: Option<Timestamp>,
    pub end_date: Option<Timestamp>,
}

impl SegmentCodec for Nk1 {
    const TAG: &'static str = "NK1";

    fn decode(f: &Fields<'_>) -> Result<Self, ParseError> {
        Ok(Nk1 {
            set_id: f.number(1)?,
            names: f.composites(2),
            relationship: f.composite(3),
            addresses: f.composites(4),
            phones: f.texts(5),
            business_phones: f.texts(6),
            contact_role: f.composite(7),
            start_date: f.timestamp(8),
            end_date: f.timestamp(9),
        })
    }

    fn encode(&self, out: &mut FieldWriter<'_>) {
        out.number(1, self.set_id);
        out.composites(2, &self.names);
        out.composite(3, &self.relationship);
        out.composites(4, &self.addresses);
        out.texts(5, &self.phones);
        out.texts(6, &self.business_phones);
        out.composite(7, &self.contact_role);
        out.timestamp(8, self.start_date.as_ref());
        out.timestamp(9, self.end_date.as_ref());
    }
}

/// IN1 insurance.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct In1 {
    pub set_id: Option<u32>,
    pub plan_id: CodedElement,
    pub company_ids: Vec<ExtendedId>,
    pub company_name: String,
    pub company_addresses: Vec<Address>,
    pub group_number: String,
    pub group_name: String,
    pub plan_effective_date: Option<Timestamp>,
    pub plan_expiration_date: Option<Timestamp>,
    pub plan_type: String,
    pub insured_names: Vec<PersonName>,
    pub insured_relationship: CodedElement,
    pub insured_birth_date: Option<Timestamp>,
    pub policy_number: String,
}

impl SegmentCodec for In1 {
    const TAG: &'static str = "IN1";

    fn decode(f: &Fields<'_>) -> Result<Self, ParseError> {
        Ok(In1 {
            set_id: f.number(1)?,
            plan_id: f.composite(2),
            company_ids: f.composites(3),
            company_name: f.text(4),
            company_addresses: f.composites(5),
            group_number: f.text(8),
            group_name: f.text(9),
            plan_effective_date: f.timestamp(12),
            plan_expiration_date: f.timestamp(13),
            plan_type: f.text(15),
            insured_names: f.composites(16),
            insured_relationship: f.composite(17),
            insured_birth_date: f.timestamp(18),
            policy_number: f.text(36),
        })
    }

    fn encode(&self, out: &mut FieldWriter<'_>) {
        out.number(1, self.set_id);
        out.composite(2, &self.plan_id);
        out.composites(3, &self.company_ids);
        out.text(4, &self.company_name);
        out.composites(5, &self.company_addresses);
        out.text(8, &self.group_number);
        out.text(9, &self.group_name);
        out.timestamp(12, self.plan_effective_date.as_ref());
        out.timestamp(13, self.plan_expiration_date.as_ref());
        out.text(15, &self.plan_type);
        out.composites(16, &self.insured_names);
        out.composite(17, &self.insured_relationship);
        out.timestamp(18, self.insured_birth_date.as_ref());
        out.text(36, &self.policy_number);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delimiters::Delimiters;
    use crate::segments::Segment;
    use chrono::NaiveDate;

    #[test]
    fn pid_from_a_real_feed() {
        let d = Delimiters::default();
        let line = "PID||0493575^^^2^ID 1|454721||DOE^JOHN^^^^|DOE^JOHN^^^^|19480203|M||B|254 MYSTREET AVE^^MYTOWN^OH^44123^USA||(216)123-4567|||M|NON|400003403~1129086|";
        let pid = match Segment::decode(line, &d).unwrap() {
            Segment::Pid(pid) => pid,
            other => panic!("expected PID, got {:?}", other),
        };

        assert_eq!(pid.set_id, None);
        assert_eq!(pid.patient_id.id, "0493575");
        assert_eq!(pid.patient_id.assigning_authority.namespace_id, "2");
        assert_eq!(pid.patient_id.identifier_type, "ID 1");
        assert_eq!(pid.identifiers[0].id, "454721");
        assert_eq!(pid.names[0].family_name, "DOE");
        assert_eq!(pid.names[0].given_name, "JOHN");
        assert_eq!(
            pid.birth_date.map(|t| t.local),
            NaiveDate::from_ymd_opt(1948, 2, 3).unwrap().and_hms_opt(0, 0, 0)
        );
        assert_eq!(pid.sex, "M");
        assert_eq!(pid.race[0].identifier, "B");
        assert_eq!(pid.addresses[0].city, "MYTOWN");
        assert_eq!(pid.addresses[0].postal_code, "44123");
        assert_eq!(pid.home_phones, vec!["(216)123-4567"]);
        assert_eq!(pid.marital_status.identifier, "M");
        assert_eq!(pid.religion.identifier, "NON");
        assert_eq!(pid.account_number.id, "400003403");
    }

    #[test]
    fn pid_lookup_by_identifier_type() {
        let pid = Pid {
            identifiers: vec![ExtendedId::new("1", "PI"), ExtendedId::new("2", "MR")],
            ..Default::default()
        };
        assert_eq!(pid.identifier("MR").map(|id| id.id.as_str()), Some("2"));
        assert!(pid.identifier("SS").is_none());
    }

    #[test]
    fn non_numeric_set_id_fails() {
        let d = Delimiters::default();
        assert!(matches!(
            Segment::decode("PID|first", &d),
            Err(ParseError::SegmentDecode { .. })
        ));
    }

    #[test]
    fn pv1_with_timestamps() {
        let d = Delimiters::default();
        let line = "PV1|1|I|3W^301^B|E||||||MED|||||||||V123|||||||||||||||||||||||||20230615143000|";
        let pv1 = match Segment::decode(line, &d).unwrap() {
            Segment::Pv1(pv1) => pv1,
            other => panic!("expected PV1, got {:?}", other),
        };

        assert_eq!(pv1.set_id, Some(1));
        assert_eq!(pv1.patient_class, "I");
        assert_eq!(pv1.assigned_location.room, "301");
        assert_eq!(pv1.admission_type, "E");
        assert_eq!(pv1.hospital_service, "MED");
        assert_eq!(pv1.visit_number.id, "V123");
        assert!(pv1.admitted_at.is_some());
        assert_eq!(pv1.discharged_at, None);
    }

    #[test]
    fn nk1_round_trip() {
        let d = Delimiters::default();
        let line = "NK1|1|ROE^MARIE|SPO^Spouse||(216)123-4567||EC";
        let seg = Segment::decode(line, &d).unwrap();
        match &seg {
            Segment::Nk1(nk1) => {
                assert_eq!(nk1.names[0].family_name, "ROE");
                assert_eq!(nk1.relationship.text, "Spouse");
                assert_eq!(nk1.contact_role.identifier, "EC");
            }
            other => panic!("expected NK1, got {:?}", other),
        }
        assert_eq!(seg.encode(&d), line);
    }

    #[test]
    fn in1_plan_and_policy() {
        let d = Delimiters::default();
        let line = "IN1|1|BCBS^Blue Cross||Blue Cross Blue Shield||||GRP01||||||||DOE^JOHN|SEL";
        match Segment::decode(line, &d).unwrap() {
            Segment::In1(in1) => {
                assert_eq!(in1.plan_id.identifier, "BCBS");
                assert_eq!(in1.company_name, "Blue Cross Blue Shield");
                assert_eq!(in1.group_number, "GRP01");
                assert_eq!(in1.insured_names[0].given_name, "JOHN");
                assert_eq!(in1.insured_relationship.identifier, "SEL");
            }
            other => panic!("expected IN1, got {:?}", other),
        }
    }
}
