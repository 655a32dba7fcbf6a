use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("`{input}` is not a valid {kind}")]
pub struct ParseIdError {
    kind: &'static str,
    input: String,
}

impl ParseIdError {
    fn new(kind: &'static str, input: &str) -> Self {
        Self {
            kind,
            input: input.to_owned(),
        }
    }

    #[must_use]
    pub fn kind(&self) -> &'static str {
        self.kind
    }
}

/// Integer keys assigned by the question bank.
macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            #[must_use]
            pub const fn new(id: u64) -> Self {
                Self(id)
            }

            #[must_use]
            pub const fn value(&self) -> u64 {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim()
                    .parse()
                    .map(Self)
                    .map_err(|_| ParseIdError::new(stringify!($name), s))
            }
        }
    };
}

numeric_id!(
    /// Bank key of a single question.
    QuestionId
);

numeric_id!(
    /// Key of an authored exam set. Sessions without one draw from the whole bank.
    ExamSetId
);

/// One attempt at an exam, minted when its questions resolve.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    #[must_use]
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Debug for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SessionId").field(&self.0).finish()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.hyphenated().fmt(f)
    }
}

impl FromStr for SessionId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::try_parse(s.trim())
            .map(Self)
            .map_err(|_| ParseIdError::new("SessionId", s))
    }
}

/// Label of shared listening or reading material. Questions with equal
/// labels form one passage group and are always kept together.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PassageId(String);

impl PassageId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PassageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_ids_parse_with_surrounding_space() {
        assert_eq!(" 17 ".parse::<QuestionId>(), Ok(QuestionId::new(17)));
        assert_eq!("3".parse::<ExamSetId>().map(|id| id.value()), Ok(3));
    }

    #[test]
    fn parse_error_names_the_id_kind() {
        let err = "-1".parse::<ExamSetId>().unwrap_err();
        assert_eq!(err.kind(), "ExamSetId");
        assert_eq!(err.to_string(), "`-1` is not a valid ExamSetId");
    }

    #[test]
    fn session_id_survives_text_form() {
        let id = SessionId::generate();
        assert_eq!(id.to_string().parse::<SessionId>(), Ok(id));
        assert!("not-a-uuid".parse::<SessionId>().is_err());
    }

    #[test]
    fn ids_serialize_as_bare_values() {
        assert_eq!(serde_json::to_string(&QuestionId::new(9)).unwrap(), "9");
        assert_eq!(
            serde_json::to_string(&PassageId::new("p6-memo")).unwrap(),
            "\"p6-memo\""
        );
        assert_eq!(format!("{:?}", QuestionId::new(9)), "QuestionId(9)");
    }
}
