//! Typed HL7 segments and the tag dispatch used to decode them.
//!
//! Every known tag maps to one [`Segment`] variant through a fixed table;
//! any other tag becomes [`Segment::Generic`], which keeps the line verbatim.

mod clinical;
mod control;
mod order;
mod patient;

pub use clinical::{Al1, Dg1, Pr1, Rxa};
pub use control::{Evn, Msa, Msh};
pub use order::{Obr, Obx, Orc};
pub use patient::{In1, Nk1, Pid, Pv1};

use crate::delimiters::{Delimiters, HEADER_TAG};
use crate::error::ParseError;
use crate::fields::{FieldWriter, Fields};

/// Decode and encode for one segment type.
pub trait SegmentCodec: Sized {
    /// The three-character segment tag.
    const TAG: &'static str;

    fn decode(fields: &Fields<'_>) -> Result<Self, ParseError>;

    fn encode(&self, out: &mut FieldWriter<'_>);
}

/// Access to a typed segment held inside a [`Segment`].
pub trait SegmentVariant: SegmentCodec {
    fn from_segment(segment: &Segment) -> Option<&Self>;
}

/// A segment whose tag has no typed decoder, kept exactly as received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenericSegment {
    pub tag: String,
    pub line: String,
}

impl GenericSegment {
    /// Field access over the stored line.
    pub fn fields<'a>(&'a self, d: &'a Delimiters) -> Fields<'a> {
        Fields::split(&self.line, d)
    }
}

type DecodeFn = for<'a, 'b> fn(&'a Fields<'b>) -> Result<Segment, ParseError>;

fn decode_as<S>(fields: &Fields<'_>) -> Result<Segment, ParseError>
where
    S: SegmentCodec + Into<Segment>,
{
    S::decode(fields).map(Into::into)
}

pub(crate) fn encode_with<S: SegmentCodec>(segment: &S, d: &Delimiters) -> String {
    let mut out = if S::TAG == HEADER_TAG {
        FieldWriter::header(S::TAG, d)
    } else {
        FieldWriter::new(S::TAG, d)
    };
    segment.encode(&mut out);
    out.finish()
}

macro_rules! segments {
    ($($variant:ident($ty:ty),)+) => {
        /// One decoded segment.
        #[derive(Debug, Clone, PartialEq)]
        pub enum Segment {
            $($variant($ty),)+
            Generic(GenericSegment),
        }

        impl Segment {
            /// The segment's three-character tag.
            pub fn tag(&self) -> &str {
                match self {
                    $(Segment::$variant(_) => <$ty as SegmentCodec>::TAG,)+
                    Segment::Generic(g) => g.tag.as_str(),
                }
            }

            /// The segment's wire text, without the segment terminator.
            pub fn encode(&self, d: &Delimiters) -> String {
                match self {
                    $(Segment::$variant(s) => encode_with(s, d),)+
                    Segment::Generic(g) => g.line.clone(),
                }
            }
        }

        $(
            impl From<$ty> for Segment {
                fn from(segment: $ty) -> Self {
                    Segment::$variant(segment)
                }
            }

            impl SegmentVariant for $ty {
                fn from_segment(segment: &Segment) -> Option<&Self> {
                    match segment {
                        Segment::$variant(s) => Some(s),
                        _ => None,
                    }
                }
            }
        )+

        const DECODERS: &[(&str, DecodeFn)] = &[
            $((<$ty as SegmentCodec>::TAG, decode_as::<$ty> as DecodeFn),)+
        ];
    };
}

segments! {
    Msh(Msh),
    Evn(Evn),
    Pid(Pid),
    Pv1(Pv1),
    Nk1(Nk1),
    In1(In1),
    Orc(Orc),
    Obr(Obr),
    Obx(Obx),
    Dg1(Dg1),
    Pr1(Pr1),
    Al1(Al1),
    Rxa(Rxa),
    Msa(Msa),
}

impl From<GenericSegment> for Segment {
    fn from(segment: GenericSegment) -> Self {
        Segment::Generic(segment)
    }
}

impl Segment {
    /// Decodes one segment line (no terminator) with the message's delimiters.
    pub fn decode(line: &str, d: &Delimiters) -> Result<Segment, ParseError> {
        let split = line.char_indices().nth(3).map_or(line.len(), |(i, _)| i);
        let (tag, rest) = line.split_at(split);
        if tag.chars().count() < 3 {
            return Err(ParseError::segment(line, "line is shorter than a segment tag"));
        }

        match DECODERS.iter().find(|(known, _)| *known == tag) {
            Some((_, decode)) => {
                if !rest.is_empty() && !rest.starts_with(d.field) {
                    return Err(ParseError::segment(tag, "tag is not followed by the field separator"));
                }
                let fields = if tag == HEADER_TAG {
                    Fields::split_header(line, d)
                } else {
                    Fields::split(line, d)
                };
                decode(&fields)
            }
            // site-defined and otherwise unrecognised tags are kept as received
            None => Ok(Segment::Generic(GenericSegment {
                tag: tag.to_string(),
                line: line.to_string(),
            })),
        }
    }

    /// Tags with a typed decoder.
    pub fn known_tags() -> impl Iterator<Item = &'static str> {
        DECODERS.iter().map(|(tag, _)| *tag)
    }

    /// The typed segment if this is one of `T`.
    pub fn as_type<T: SegmentVariant>(&self) -> Option<&T> {
        T::from_segment(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_tags_cover_the_sample_set() {
        let tags: Vec<_> = Segment::known_tags().collect();
        for tag in ["MSH", "PID", "PV1", "OBR", "OBX", "ORC", "EVN", "NK1", "DG1", "AL1"] {
            assert!(tags.contains(&tag), "{} has no decoder", tag);
        }
    }

    #[test]
    fn unknown_tag_is_kept_verbatim() {
        let d = Delimiters::default();
        let line = "ZZZ|custom^data|x";
        let seg = Segment::decode(line, &d).unwrap();

        assert_eq!(seg.tag(), "ZZZ");
        assert_eq!(seg.encode(&d), line);
        match seg {
            Segment::Generic(g) => assert_eq!(g.fields(&d).text(1), "custom"),
            other => panic!("expected a generic segment, got {:?}", other),
        }
    }

    #[test]
    fn bad_tags_fail() {
        let d = Delimiters::default();
        assert!(Segment::decode("PI", &d).is_err());
        assert!(Segment::decode("", &d).is_err());
        assert!(Segment::decode("PIDX|1", &d).is_err());
    }

    #[test]
    fn any_other_three_character_tag_is_generic() {
        let d = Delimiters::default();
        for line in ["zpd|custom", "pid|1", "Z-1|x", "ZZZ", "ABCD|odd"] {
            match Segment::decode(line, &d).unwrap() {
                Segment::Generic(g) => {
                    assert_eq!(g.tag, line.chars().take(3).collect::<String>());
                    assert_eq!(g.line, line);
                }
                other => panic!("{} decoded as {:?}", line, other),
            }
        }
    }

    #[test]
    fn typed_dispatch() {
        let d = Delimiters::default();
        let seg = Segment::decode("PID|1||123^^^HOSP^MR||Doe^John", &d).unwrap();

        let pid = seg.as_type::<Pid>().expect("PID decodes to Pid");
        assert_eq!(pid.set_id, Some(1));
        assert!(seg.as_type::<Pv1>().is_none());
        assert_eq!(seg.encode(&d), "PID|1||123^^^HOSP^MR||Doe^John");
    }

    #[test]
    fn tag_without_fields_decodes() {
        let d = Delimiters::default();
        let seg = Segment::decode("PV1", &d).unwrap();
        assert_eq!(seg, Segment::Pv1(Pv1::default()));
    }
}
