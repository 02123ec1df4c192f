//! Field definitions: one named, typed column of a table definition.

use crate::data_type::DataType;
use crate::error::{Violation, ViolationKind};
use crate::registry::TypeRegistry;
use crate::value::TaggedValue;
use std::cmp::Ordering;
use tabula_ids::{FieldId, TableId};

/// Bounded set of values a field may reference.
#[derive(Debug, Clone, PartialEq)]
pub enum ValuesSource {
    /// Records of a table (for record links)
    Table(TableId),
    /// An explicit list of allowed values
    Fixed(Vec<TaggedValue>),
}

/// A column descriptor owned by exactly one table definition.
///
/// The storage index is assigned by the owning definition during storage
/// reconciliation; a field never picks its own slot.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDefinition {
    id: FieldId,
    pub name: String,
    pub tech_name: String,
    field_type: DataType,
    storage_index: Option<usize>,
    pub is_required: bool,
    /// Value written into new or reset slots (storage form)
    pub initial_store_value: Option<TaggedValue>,
    /// Written values equal to this are stored as null (storage form)
    pub default_empty_value: Option<TaggedValue>,
    pub min_value: Option<TaggedValue>,
    pub max_value: Option<TaggedValue>,
    pub values_source: Option<ValuesSource>,
}

impl FieldDefinition {
    pub fn new(name: impl Into<String>, field_type: DataType) -> Self {
        let name = name.into();
        Self {
            id: FieldId::new(),
            tech_name: tech_name_for(&name),
            name,
            field_type,
            storage_index: None,
            is_required: false,
            initial_store_value: None,
            default_empty_value: None,
            min_value: None,
            max_value: None,
            values_source: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.is_required = true;
        self
    }

    pub fn with_tech_name(mut self, tech_name: impl Into<String>) -> Self {
        self.tech_name = tech_name.into();
        self
    }

    pub fn with_initial_value(mut self, value: TaggedValue) -> Self {
        self.initial_store_value = Some(value);
        self
    }

    pub fn with_default_empty(mut self, value: TaggedValue) -> Self {
        self.default_empty_value = Some(value);
        self
    }

    pub fn with_range(mut self, min: Option<TaggedValue>, max: Option<TaggedValue>) -> Self {
        self.min_value = min;
        self.max_value = max;
        self
    }

    pub fn with_values_source(mut self, source: ValuesSource) -> Self {
        self.values_source = Some(source);
        self
    }

    /// Copy with a fresh identity and no storage slot. The data type is
    /// shared by id.
    pub fn derive_copy(&self) -> Self {
        Self {
            id: FieldId::new(),
            storage_index: None,
            ..self.clone()
        }
    }

    pub fn id(&self) -> &FieldId {
        &self.id
    }

    pub fn field_type(&self) -> &DataType {
        &self.field_type
    }

    /// Retype the field. Existing values are migrated by the next structural
    /// alteration of the owning definition.
    pub fn set_field_type(&mut self, field_type: DataType) {
        self.field_type = field_type;
    }

    pub fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn storage_index(&self) -> Option<usize> {
        self.storage_index
    }

    pub(crate) fn assign_storage_index(&mut self, index: Option<usize>) {
        self.storage_index = index;
    }

    /// Initializer for fresh or reset slots: the field's own initial value,
    /// else the registry's, else the data type's.
    pub fn explicit_initializer(&self, registry: &TypeRegistry) -> Option<TaggedValue> {
        self.initial_store_value
            .clone()
            .or_else(|| registry.initializer(&self.field_type))
    }

    /// Validate a storage-form value against the type and the field's own
    /// constraints.
    pub fn validate(&self, value: &TaggedValue) -> Result<(), Violation> {
        if value.is_null() {
            return if self.is_required {
                Err(Violation::required_missing(&self.name))
            } else {
                Ok(())
            };
        }

        self.field_type
            .validate(value)
            .map_err(|v| v.with_field(&self.name))?;

        if let Some(ref min) = self.min_value {
            if value.compare(min) == Some(Ordering::Less) {
                return Err(Violation::out_of_range(format!(
                    "{} is below the minimum {}",
                    value, min
                ))
                .with_field(&self.name));
            }
        }
        if let Some(ref max) = self.max_value {
            if value.compare(max) == Some(Ordering::Greater) {
                return Err(Violation::out_of_range(format!(
                    "{} is above the maximum {}",
                    value, max
                ))
                .with_field(&self.name));
            }
        }

        if let Some(ValuesSource::Fixed(ref allowed)) = self.values_source {
            if !allowed.contains(value) {
                return Err(Violation::new(
                    ViolationKind::NotInValuesSource,
                    format!("{} is not one of the allowed values", value),
                )
                .with_field(&self.name));
            }
        }
        Ok(())
    }
}

/// Technical name derived from a display name.
pub fn tech_name_for(name: &str) -> String {
    let tech: String = name
        .trim()
        .chars()
        .map(|ch| if ch.is_alphanumeric() { ch } else { '_' })
        .collect();
    if tech.is_empty() {
        "_".to_string()
    } else {
        tech
    }
}
