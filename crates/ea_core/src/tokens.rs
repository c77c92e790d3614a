//! crates/ea_core/src/tokens.rs
//! Name tokens for political units and candidates.
//! Names come from uploaded documents, so the charset is permissive (accents,
//! spaces), but they must be trimmed, non-empty, and free of control characters.

use core::fmt;
use core::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::errors::EngineError;

pub const TOKEN_MAX_CHARS: usize = 128;

/// Trimmed, 1..=128 chars, no control characters.
#[inline]
pub fn is_valid_name(s: &str) -> bool {
    let n = s.chars().count();
    (1..=TOKEN_MAX_CHARS).contains(&n)
        && s.trim() == s
        && !s.chars().any(char::is_control)
}

macro_rules! def_name_token {
    ($(#[$m:meta])* $name:ident, $kind:expr) => {
        $(#[$m])*
        #[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
        #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
        #[cfg_attr(feature = "serde", serde(try_from = "String", into = "String"))]
        pub struct $name(String);

        impl $name {
            /// Validate and wrap. Surrounding whitespace is rejected, not trimmed.
            pub fn new(s: impl Into<String>) -> Result<Self, EngineError> {
                let s = s.into();
                if is_valid_name(&s) {
                    Ok(Self(s))
                } else {
                    Err(EngineError::InvalidToken { kind: $kind, value: s })
                }
            }

            #[inline]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            #[inline]
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = EngineError;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl TryFrom<String> for $name {
            type Error = EngineError;
            fn try_from(s: String) -> Result<Self, Self::Error> {
                Self::new(s)
            }
        }

        impl From<$name> for String {
            fn from(t: $name) -> String {
                t.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

def_name_token!(
    /// Political unit (party, list, coalition).
    UnitId,
    "unit name"
);
def_name_token!(
    /// Named candidate on a unit's list.
    CandidateId,
    "candidate name"
);

/// Who a tally belongs to: a named candidate or the list itself ("list-only" vote).
///
/// On the wire this is `"name"` or `null`.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(from = "Option<CandidateId>", into = "Option<CandidateId>")
)]
pub enum CandidateRef {
    ListOnly,
    Named(CandidateId),
}

impl CandidateRef {
    pub fn named(s: impl Into<String>) -> Result<Self, EngineError> {
        CandidateId::new(s).map(CandidateRef::Named)
    }

    pub fn is_list_only(&self) -> bool {
        matches!(self, CandidateRef::ListOnly)
    }
}

impl From<Option<CandidateId>> for CandidateRef {
    fn from(o: Option<CandidateId>) -> Self {
        match o {
            Some(id) => CandidateRef::Named(id),
            None => CandidateRef::ListOnly,
        }
    }
}

impl From<CandidateRef> for Option<CandidateId> {
    fn from(c: CandidateRef) -> Self {
        match c {
            CandidateRef::Named(id) => Some(id),
            CandidateRef::ListOnly => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_accented_names_with_spaces() {
        assert!(CandidateId::new("María José Peña").is_ok());
        assert!(UnitId::new("Partido Liberal").is_ok());
    }

    #[test]
    fn rejects_blank_padded_and_control() {
        assert!(UnitId::new("").is_err());
        assert!(UnitId::new(" A").is_err());
        assert!(UnitId::new("A\n").is_err());
        assert!(UnitId::new("x".repeat(129)).is_err());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn list_only_is_null_on_the_wire() {
        let c: CandidateRef = serde_json::from_str("null").unwrap();
        assert!(c.is_list_only());
        let n: CandidateRef = serde_json::from_str("\"Ana\"").unwrap();
        assert_eq!(n, CandidateRef::named("Ana").unwrap());
        assert_eq!(serde_json::to_string(&CandidateRef::ListOnly).unwrap(), "null");
    }

    #[cfg(feature = "serde")]
    #[test]
    fn invalid_names_fail_deserialization() {
        assert!(serde_json::from_str::<UnitId>("\"  \"").is_err());
    }
}
