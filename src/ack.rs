use std::fmt;
use std::str::FromStr;

/// MSA-1 acknowledgment code.
///
/// The original-mode codes `AA`/`AE`/`AR` are what a listener normally
/// returns; the enhanced-mode commit codes are accepted when decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AckCode {
    /// AA, the message was accepted and processed.
    Accept,
    /// AE, processing failed.
    Error,
    /// AR, the message was rejected outright.
    Reject,
    /// CA
    CommitAccept,
    /// CE
    CommitError,
    /// CR
    CommitReject,
}

impl AckCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AckCode::Accept => "AA",
            AckCode::Error => "AE",
            AckCode::Reject => "AR",
            AckCode::CommitAccept => "CA",
            AckCode::CommitError => "CE",
            AckCode::CommitReject => "CR",
        }
    }

    pub fn is_accept(&self) -> bool {
        matches!(self, AckCode::Accept | AckCode::CommitAccept)
    }
}

impl fmt::Display for AckCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An acknowledgment code that isn't one of the six defined values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownAckCode(pub String);

impl fmt::Display for UnknownAckCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown acknowledgment code '{}'", self.0)
    }
}

impl std::error::Error for UnknownAckCode {}

impl FromStr for AckCode {
    type Err = UnknownAckCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "AA" => Ok(AckCode::Accept),
            "AE" => Ok(AckCode::Error),
            "AR" => Ok(AckCode::Reject),
            "CA" => Ok(AckCode::CommitAccept),
            "CE" => Ok(AckCode::CommitError),
            "CR" => Ok(AckCode::CommitReject),
            other => Err(UnknownAckCode(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_round_trip_through_text() {
        for code in [AckCode::Accept, AckCode::Error, AckCode::Reject] {
            assert_eq!(code.as_str().parse::<AckCode>(), Ok(code));
        }
        assert_eq!(" CA ".parse::<AckCode>(), Ok(AckCode::CommitAccept));
    }

    #[test]
    fn unknown_code() {
        assert_eq!("ZZ".parse::<AckCode>(), Err(UnknownAckCode("ZZ".into())));
        assert!("".parse::<AckCode>().is_err());
    }
}
