//! HL7 composite data types used inside segments.
//!
//! These are plain data: decoding never fails, missing components are empty.

use crate::fields::{ComponentWriter, Components, Composite};

/// HD, e.g. a sending application or assigning authority.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HierarchicDesignator {
    pub namespace_id: String,
    pub universal_id: String,
    pub universal_id_type: String,
}

impl HierarchicDesignator {
    pub fn new(namespace_id: impl Into<String>) -> Self {
        HierarchicDesignator {
            namespace_id: namespace_id.into(),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.namespace_id.is_empty() && self.universal_id.is_empty()
    }
}

impl Composite for HierarchicDesignator {
    fn decode(c: &Components<'_>) -> Self {
        HierarchicDesignator {
            namespace_id: c.text(0),
            universal_id: c.text(1),
            universal_id_type: c.text(2),
        }
    }

    fn encode(&self, out: &mut ComponentWriter<'_>) {
        out.text(0, &self.namespace_id);
        out.text(1, &self.universal_id);
        out.text(2, &self.universal_id_type);
    }
}

/// MSG, the message code / trigger event / structure triple of MSH-9.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageType {
    pub code: String,
    pub trigger_event: String,
    pub structure: String,
}

impl MessageType {
    pub fn new(code: impl Into<String>, trigger_event: impl Into<String>) -> Self {
        MessageType {
            code: code.into(),
            trigger_event: trigger_event.into(),
            structure: String::new(),
        }
    }
}

impl Composite for MessageType {
    fn decode(c: &Components<'_>) -> Self {
        MessageType {
            code: c.text(0),
            trigger_event: c.text(1),
            structure: c.text(2),
        }
    }

    fn encode(&self, out: &mut ComponentWriter<'_>) {
        out.text(0, &self.code);
        out.text(1, &self.trigger_event);
        out.text(2, &self.structure);
    }
}

/// EI, used for placer and filler order numbers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityIdentifier {
    pub entity_id: String,
    pub namespace_id: String,
    pub universal_id: String,
    pub universal_id_type: String,
}

impl EntityIdentifier {
    pub fn new(entity_id: impl Into<String>) -> Self {
        EntityIdentifier {
            entity_id: entity_id.into(),
            ..Default::default()
        }
    }
}

impl Composite for EntityIdentifier {
    fn decode(c: &Components<'_>) -> Self {
        EntityIdentifier {
            entity_id: c.text(0),
            namespace_id: c.text(1),
            universal_id: c.text(2),
            universal_id_type: c.text(3),
        }
    }

    fn encode(&self, out: &mut ComponentWriter<'_>) {
        out.text(0, &self.entity_id);
        out.text(1, &self.namespace_id);
        out.text(2, &self.universal_id);
        out.text(3, &self.universal_id_type);
    }
}

/// CE / CWE coded element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodedElement {
    pub identifier: String,
    pub text: String,
    pub coding_system: String,
    pub alternate_identifier: String,
    pub alternate_text: String,
    pub alternate_coding_system: String,
}

impl CodedElement {
    pub fn new(
        identifier: impl Into<String>,
        text: impl Into<String>,
        coding_system: impl Into<String>,
    ) -> Self {
        CodedElement {
            identifier: identifier.into(),
            text: text.into(),
            coding_system: coding_system.into(),
            ..Default::default()
        }
    }
}

impl Composite for CodedElement {
    fn decode(c: &Components<'_>) -> Self {
        CodedElement {
            identifier: c.text(0),
            text: c.text(1),
            coding_system: c.text(2),
            alternate_identifier: c.text(3),
            alternate_text: c.text(4),
            alternate_coding_system: c.text(5),
        }
    }

    fn encode(&self, out: &mut ComponentWriter<'_>) {
        out.text(0, &self.identifier);
        out.text(1, &self.text);
        out.text(2, &self.coding_system);
        out.text(3, &self.alternate_identifier);
        out.text(4, &self.alternate_text);
        out.text(5, &self.alternate_coding_system);
    }
}

/// XPN extended person name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersonName {
    pub family_name: String,
    pub given_name: String,
    pub middle_name: String,
    pub suffix: String,
    pub prefix: String,
    pub degree: String,
    pub name_type: String,
}

impl PersonName {
    pub fn new(family_name: impl Into<String>, given_name: impl Into<String>) -> Self {
        PersonName {
            family_name: family_name.into(),
            given_name: given_name.into(),
            ..Default::default()
        }
    }
}

impl Composite for PersonName {
    fn decode(c: &Components<'_>) -> Self {
        PersonName {
            family_name: c.text(0),
            given_name: c.text(1),
            middle_name: c.text(2),
            suffix: c.text(3),
            prefix: c.text(4),
            degree: c.text(5),
            name_type: c.text(6),
        }
    }

    fn encode(&self, out: &mut ComponentWriter<'_>) {
        out.text(0, &self.family_name);
        out.text(1, &self.given_name);
        out.text(2, &self.middle_name);
        out.text(3, &self.suffix);
        out.text(4, &self.prefix);
        out.text(5, &self.degree);
        out.text(6, &self.name_type);
    }
}

/// XAD extended address.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Address {
    pub street: String,
    pub other_designation: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
    pub address_type: String,
}

impl Composite for Address {
    fn decode(c: &Components<'_>) -> Self {
        Address {
            street: c.text(0),
            other_designation: c.text(1),
            city: c.text(2),
            state: c.text(3),
            postal_code: c.text(4),
            country: c.text(5),
            address_type: c.text(6),
        }
    }

    fn encode(&self, out: &mut ComponentWriter<'_>) {
        out.text(0, &self.street);
        out.text(1, &self.other_designation);
        out.text(2, &self.city);
        out.text(3, &self.state);
        out.text(4, &self.postal_code);
        out.text(5, &self.country);
        out.text(6, &self.address_type);
    }
}

/// CX extended identifier, e.g. a medical record number.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtendedId {
    pub id: String,
    pub check_digit: String,
    pub check_digit_scheme: String,
    pub assigning_authority: HierarchicDesignator,
    pub identifier_type: String,
    pub assigning_facility: HierarchicDesignator,
}

impl ExtendedId {
    pub fn new(id: impl Into<String>, identifier_type: impl Into<String>) -> Self {
        ExtendedId {
            id: id.into(),
            identifier_type: identifier_type.into(),
            ..Default::default()
        }
    }
}

impl Composite for ExtendedId {
    fn decode(c: &Components<'_>) -> Self {
        ExtendedId {
            id: c.text(0),
            check_digit: c.text(1),
            check_digit_scheme: c.text(2),
            assigning_authority: c.nested(3),
            identifier_type: c.text(4),
            assigning_facility: c.nested(5),
        }
    }

    fn encode(&self, out: &mut ComponentWriter<'_>) {
        out.text(0, &self.id);
        out.text(1, &self.check_digit);
        out.text(2, &self.check_digit_scheme);
        out.nested(3, &self.assigning_authority);
        out.text(4, &self.identifier_type);
        out.nested(5, &self.assigning_facility);
    }
}

/// XCN, a provider or other staff member with an ID.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Provider {
    pub id: String,
    pub family_name: String,
    pub given_name: String,
    pub middle_name: String,
    pub suffix: String,
    pub prefix: String,
    pub degree: String,
    pub source_table: String,
    pub assigning_authority: HierarchicDesignator,
}

impl Provider {
    pub fn new(
        id: impl Into<String>,
        family_name: impl Into<String>,
        given_name: impl Into<String>,
    ) -> Self {
        Provider {
            id: id.into(),
            family_name: family_name.into(),
            given_name: given_name.into(),
            ..Default::default()
        }
    }
}

impl Composite for Provider {
    fn decode(c: &Components<'_>) -> Self {
        Provider {
            id: c.text(0),
            family_name: c.text(1),
            given_name: c.text(2),
            middle_name: c.text(3),
            suffix: c.text(4),
            prefix: c.text(5),
            degree: c.text(6),
            source_table: c.text(7),
            assigning_authority: c.nested(8),
        }
    }

    fn encode(&self, out: &mut ComponentWriter<'_>) {
        out.text(0, &self.id);
        out.text(1, &self.family_name);
        out.text(2, &self.given_name);
        out.text(3, &self.middle_name);
        out.text(4, &self.suffix);
        out.text(5, &self.prefix);
        out.text(6, &self.degree);
        out.text(7, &self.source_table);
        out.nested(8, &self.assigning_authority);
    }
}

/// PL, a physical location such as ward/room/bed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Location {
    pub point_of_care: String,
    pub room: String,
    pub bed: String,
    pub facility: HierarchicDesignator,
    pub location_status: String,
    pub person_location_type: String,
    pub building: String,
    pub floor: String,
    pub description: String,
}

impl Composite for Location {
    fn decode(c: &Components<'_>) -> Self {
        Location {
            point_of_care: c.text(0),
            room: c.text(1),
            bed: c.text(2),
            facility: c.nested(3),
            location_status: c.text(4),
            person_location_type: c.text(5),
            building: c.text(6),
            floor: c.text(7),
            description: c.text(8),
        }
    }

    fn encode(&self, out: &mut ComponentWriter<'_>) {
        out.text(0, &self.point_of_care);
        out.text(1, &self.room);
        out.text(2, &self.bed);
        out.nested(3, &self.facility);
        out.text(4, &self.location_status);
        out.text(5, &self.person_location_type);
        out.text(6, &self.building);
        out.text(7, &self.floor);
        out.text(8, &self.description);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delimiters::Delimiters;
    use crate::fields::{FieldWriter, Fields};

    #[test]
    fn extended_id_reads_sub_components() {
        let d = Delimiters::default();
        let f = Fields::split("PID|||12345^^^HOSP&1.2.3&ISO^MR", &d);
        let id: ExtendedId = f.composite(3);

        assert_eq!(id.id, "12345");
        assert_eq!(id.assigning_authority.namespace_id, "HOSP");
        assert_eq!(id.assigning_authority.universal_id, "1.2.3");
        assert_eq!(id.assigning_authority.universal_id_type, "ISO");
        assert_eq!(id.identifier_type, "MR");
    }

    #[test]
    fn extended_id_writes_sub_components() {
        let d = Delimiters::default();
        let mut id = ExtendedId::new("12345", "MR");
        id.assigning_authority = HierarchicDesignator {
            namespace_id: "HOSP".into(),
            universal_id: "1.2.3".into(),
            universal_id_type: "ISO".into(),
        };

        let mut w = FieldWriter::new("PID", &d);
        w.composite(3, &id);
        assert_eq!(w.finish(), "PID|||12345^^^HOSP&1.2.3&ISO^MR");
    }

    #[test]
    fn provider_and_location() {
        let d = Delimiters::default();
        let f = Fields::split("PV1||I|3W^301^B^WEST||||100^van den Berg^Anna^^^dr", &d);

        let loc: Location = f.composite(3);
        assert_eq!(loc.point_of_care, "3W");
        assert_eq!(loc.room, "301");
        assert_eq!(loc.bed, "B");
        assert_eq!(loc.facility.namespace_id, "WEST");

        let docs: Vec<Provider> = f.composites(7);
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, "100");
        assert_eq!(docs[0].family_name, "van den Berg");
        assert_eq!(docs[0].prefix, "dr");
    }

    #[test]
    fn name_repetitions() {
        let d = Delimiters::default();
        let f = Fields::split("PID|||||Doe^Jane^Q~Smith^Jane^^^^^M", &d);
        let names: Vec<PersonName> = f.composites(5);

        assert_eq!(names.len(), 2);
        assert_eq!(names[0].middle_name, "Q");
        assert_eq!(names[1].family_name, "Smith");
        assert_eq!(names[1].name_type, "M");
    }
}
