//! Detail Tables
//!
//! # Philosophy: Schema First, Data Follows
//!
//! The lifecycle of a details table:
//!
//! 1. **Declare**: A designer builds a [`TableDefinition`]: fields, types, keys
//! 2. **Fill**: Users write values into [`TableRecord`]s through the definition
//! 3. **Alter**: The definition changes (fields added, removed, retyped)
//! 4. **Migrate**: Every dependent [`Table`] is reconciled in place
//!
//! Migration is minimal. A value survives as long as its field keeps its
//! identity and its data type; only values that can no longer be trusted are
//! reinitialized. Reordering fields never moves data.
//!
//! Bad data is never an `Err`: validation returns a [`Violation`] the caller
//! can show or log. `Err(SchemaError)` means the API was misused.
//!
//! # Modules
//!
//! - [`data_type`]: The DataType hierarchy, parsing, validation, type inference
//! - [`value`]: [`TaggedValue`], the closed set of storable values
//! - [`registry`]: Storage converters and initializers, keyed by data type id
//! - [`field`] / [`definition`]: Schemas, storage order vs logical order
//! - [`table`] / [`record`]: Record sets and dynamic value access
//! - [`alteration`] / [`catalog`]: Structural migration across tables
//! - [`import`] / [`export`] / [`delimited`]: Text in, text out

pub mod alteration;
pub mod catalog;
pub mod config;
pub mod data_type;
pub mod date_formats;
pub mod defaults;
pub mod definition;
pub mod delimited;
pub mod error;
pub mod export;
pub mod field;
pub mod import;
pub mod record;
pub mod registry;
pub mod table;
pub mod value;

pub use alteration::{AlterationPlan, AlterationReport, DuplicateKey, SlotAction};
pub use catalog::{Catalog, CatalogLabels};
pub use config::{ConfigError, DetailsConfig, DisplayOptions, ExportOptions, ImportOptions};
pub use data_type::{
    convert_to_most_suited_basic_type, get_resource_type, wider_basic_data_type, DataType,
    DataTypeKind, ResourceType,
};
pub use definition::{FieldKey, StorageDelta, StorageSnapshot, TableDefinition};
pub use delimited::{read_delimited, write_delimited, DelimitedError, DelimitedFormat};
pub use error::{SchemaError, Violation, ViolationKind};
pub use export::{export_table, export_value, LinkLabelResolver, NoLinkLabels};
pub use field::{FieldDefinition, ValuesSource};
pub use import::{
    build_definition_from_inferred, generate_typed_records_list, import_rows_into, CellFailure,
    ImportReport, TypedImport,
};
pub use record::{TableRecord, WriteOutcome};
pub use registry::{StorageConverter, TypeRegistry};
pub use table::{DesignatorMode, Table, TableDesignator};
pub use value::{ContainerType, LinkValue, RecordRef, TaggedValue};

pub use tabula_ids::{DataTypeId, FieldId, RecordId, TableDefinitionId, TableId};
