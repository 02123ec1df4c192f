//! Shared identifier wrappers for Tabula detail tables.
//!
//! Schema elements are identified by UUIDs rather than names so that identity
//! survives renaming and cloning.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Error returned when parsing a UUID-backed identifier fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdParseError {
    message: String,
}

impl IdParseError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for IdParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for IdParseError {}

macro_rules! define_uuid_id {
    ($name:ident, $label:expr) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4().to_string())
            }

            /// Well-known identifier built from a fixed number. Used for
            /// predefined elements that must compare equal across sessions.
            pub fn well_known(value: u128) -> Self {
                Self(Uuid::from_u128(value).to_string())
            }

            pub fn parse(value: &str) -> Result<Self, IdParseError> {
                let uuid = Uuid::parse_str(value)
                    .map_err(|e| IdParseError::new(format!("Invalid {}: {}", $label, e)))?;
                Ok(Self(uuid.to_string()))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = IdParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }
    };
}

define_uuid_id!(DataTypeId, "data type ID");
define_uuid_id!(FieldId, "field ID");
define_uuid_id!(TableDefinitionId, "table definition ID");
define_uuid_id!(TableId, "table ID");
define_uuid_id!(RecordId, "record ID");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_well_known_ids_are_stable() {
        assert_eq!(DataTypeId::well_known(1), DataTypeId::well_known(1));
        assert_ne!(DataTypeId::well_known(1), DataTypeId::well_known(2));
        assert_eq!(
            DataTypeId::well_known(1).as_str(),
            "00000000-0000-0000-0000-000000000001"
        );
    }

    #[test]
    fn test_parse_normalizes_and_rejects() {
        let id = FieldId::parse("A0B1C2D3-0000-0000-0000-000000000000").unwrap();
        assert_eq!(id.as_str(), "a0b1c2d3-0000-0000-0000-000000000000");

        let err = RecordId::parse("not-a-uuid").unwrap_err();
        assert!(err.to_string().contains("record ID"));
    }

    #[test]
    fn test_new_ids_are_unique() {
        assert_ne!(TableId::new(), TableId::new());
    }
}
