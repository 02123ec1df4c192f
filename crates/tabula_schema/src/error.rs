//! Error channels.
//!
//! Two disjoint channels:
//!
//! - [`Violation`]: the data is not acceptable (wrong type, out of range,
//!   required but missing, unparseable text). Returned as a value; the caller
//!   decides whether to reject the edit or log and continue.
//! - [`SchemaError`]: the caller used the API incorrectly (unknown field, field
//!   without a storage slot, stale snapshot). Returned as `Err`.

use crate::value::ContainerType;
use tabula_ids::{FieldId, RecordId, TableDefinitionId, TableId};
use thiserror::Error;

/// Usage errors raised by schema, table and record operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SchemaError {
    #[error("Unknown field: {0}")]
    UnknownField(String),

    #[error("Field index {index} out of range (table has {len} fields)")]
    FieldIndexOutOfRange { index: usize, len: usize },

    #[error("Field '{0}' has no storage slot; run a structural alteration first")]
    NoStorageSlot(String),

    #[error("Field already declared: {0}")]
    DuplicateField(FieldId),

    #[error("Selection references a field not declared by the schema: {0}")]
    UndeclaredSelection(FieldId),

    #[error("Table definition not found: {0}")]
    UnknownDefinition(TableDefinitionId),

    #[error("Table not found: {0}")]
    UnknownTable(TableId),

    #[error("Record not found: {0}")]
    UnknownRecord(RecordId),

    #[error("Table definition {0} is still used by {1} table(s)")]
    DefinitionInUse(TableDefinitionId, usize),

    #[error("Table definition {definition} is the type of a field in {by}")]
    DefinitionReferenced {
        definition: TableDefinitionId,
        by: TableDefinitionId,
    },

    #[error("Table {table} follows definition {follows}, not {given}")]
    DefinitionMismatch {
        table: TableId,
        follows: TableDefinitionId,
        given: TableDefinitionId,
    },

    #[error("Storage snapshot belongs to {snapshot}, not {definition}")]
    StaleSnapshot {
        snapshot: TableDefinitionId,
        definition: TableDefinitionId,
    },
}

/// A data validity failure with a human-readable reason.
#[derive(Debug, Clone, PartialEq)]
pub struct Violation {
    /// Type of violation
    pub kind: ViolationKind,

    /// Field the value was written to (if known)
    pub field: Option<String>,

    /// Row number where the violation occurred (0-indexed, imports only)
    pub row: Option<usize>,

    /// Column index where the violation occurred (imports only)
    pub column: Option<usize>,

    /// Why the value was refused
    pub reason: String,
}

impl Violation {
    pub fn new(kind: ViolationKind, reason: impl Into<String>) -> Self {
        Self {
            kind,
            field: None,
            row: None,
            column: None,
            reason: reason.into(),
        }
    }

    /// Value container doesn't match the type's container.
    pub fn type_mismatch(expected: ContainerType, got: Option<ContainerType>) -> Self {
        let got = got.map(|c| c.to_string()).unwrap_or_else(|| "null".to_string());
        Self::new(
            ViolationKind::TypeMismatch,
            format!("expected {} value, got {}", expected, got),
        )
    }

    pub fn parse_failure(type_name: &str, text: &str) -> Self {
        Self::new(
            ViolationKind::ParseFailure,
            format!("'{}' cannot be read as {}", text, type_name),
        )
    }

    pub fn out_of_range(reason: impl Into<String>) -> Self {
        Self::new(ViolationKind::OutOfRange, reason)
    }

    pub fn required_missing(field_name: &str) -> Self {
        Self::new(
            ViolationKind::RequiredMissing,
            format!("a value is required for '{}'", field_name),
        )
    }

    pub fn format_mismatch(reason: impl Into<String>) -> Self {
        Self::new(ViolationKind::FormatMismatch, reason)
    }

    pub fn with_field(mut self, name: impl Into<String>) -> Self {
        self.field = Some(name.into());
        self
    }

    pub fn with_row(mut self, row: usize) -> Self {
        self.row = Some(row);
        self
    }

    pub fn with_column(mut self, column: usize) -> Self {
        self.column = Some(column);
        self
    }
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind, self.reason)?;
        if let Some(ref field) = self.field {
            write!(f, " (field '{}')", field)?;
        }
        if let Some(col) = self.column {
            write!(f, " (column {})", col)?;
        }
        if let Some(row) = self.row {
            write!(f, " at row {}", row)?;
        }
        Ok(())
    }
}

impl std::error::Error for Violation {}

/// Types of data validity failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViolationKind {
    /// Value kind doesn't match the field's container type
    TypeMismatch,

    /// Text could not be parsed into the field's type
    ParseFailure,

    /// Number/date outside bounds, too many digits, text too long
    OutOfRange,

    /// Null written to a required field
    RequiredMissing,

    /// Value carries a component its type excludes (e.g. a time on a date-only type)
    FormatMismatch,

    /// Value not among the field's allowed values
    NotInValuesSource,

    /// Imported row carries more cells than the schema has fields
    ColumnCountMismatch,
}

impl std::fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ViolationKind::TypeMismatch => write!(f, "Type mismatch"),
            ViolationKind::ParseFailure => write!(f, "Parse failure"),
            ViolationKind::OutOfRange => write!(f, "Out of range"),
            ViolationKind::RequiredMissing => write!(f, "Required value missing"),
            ViolationKind::FormatMismatch => write!(f, "Format mismatch"),
            ViolationKind::NotInValuesSource => write!(f, "Not an allowed value"),
            ViolationKind::ColumnCountMismatch => write!(f, "Column count mismatch"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_violation_display() {
        let v = Violation::parse_failure("DateTime", "bad-date")
            .with_field("Born")
            .with_column(1)
            .with_row(2);

        let msg = v.to_string();
        assert!(msg.contains("Parse failure"));
        assert!(msg.contains("bad-date"));
        assert!(msg.contains("field 'Born'"));
        assert!(msg.contains("column 1"));
        assert!(msg.contains("row 2"));
    }

    #[test]
    fn test_type_mismatch_names_both_sides() {
        let v = Violation::type_mismatch(ContainerType::Number, Some(ContainerType::Text));
        assert_eq!(v.kind, ViolationKind::TypeMismatch);
        assert!(v.reason.contains("number"));
        assert!(v.reason.contains("text"));

        let v = Violation::type_mismatch(ContainerType::DateTime, None);
        assert!(v.reason.contains("null"));
    }
}
