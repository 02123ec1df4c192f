//! Table records and dynamic value access.
//!
//! A record stores one value per storage slot. The slot vector is sized
//! lazily: it only grows when a non-null value has to be written past its end,
//! and only the structural alteration removes slots.

use crate::config::DisplayOptions;
use crate::definition::{FieldKey, TableDefinition};
use crate::error::{SchemaError, Violation};
use crate::field::FieldDefinition;
use crate::registry::TypeRegistry;
use crate::value::{ContainerType, TaggedValue};
use tabula_ids::RecordId;

/// Result of a value write.
#[must_use]
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOutcome {
    Stored,
    /// The value was not acceptable; the slot is unchanged
    Rejected(Violation),
}

impl WriteOutcome {
    pub fn is_stored(&self) -> bool {
        matches!(self, WriteOutcome::Stored)
    }

    pub fn violation(&self) -> Option<&Violation> {
        match self {
            WriteOutcome::Stored => None,
            WriteOutcome::Rejected(v) => Some(v),
        }
    }

    pub fn into_result(self) -> Result<(), Violation> {
        match self {
            WriteOutcome::Stored => Ok(()),
            WriteOutcome::Rejected(v) => Err(v),
        }
    }
}

/// One row of a table.
#[derive(Debug, Clone, PartialEq)]
pub struct TableRecord {
    id: RecordId,
    values: Vec<TaggedValue>,
}

impl Default for TableRecord {
    fn default() -> Self {
        Self::new()
    }
}

impl TableRecord {
    /// Empty record; every slot reads as its default.
    pub fn new() -> Self {
        Self {
            id: RecordId::new(),
            values: Vec::new(),
        }
    }

    /// Record whose slots hold each field's initializer.
    pub fn initialized(definition: &TableDefinition, registry: &TypeRegistry) -> Self {
        let mut record = Self::new();
        for field in definition.storage_fields() {
            if let (Some(index), Some(initial)) =
                (field.storage_index(), field.explicit_initializer(registry))
            {
                record.write_slot(index, initial);
            }
        }
        record
    }

    /// Same values under a fresh identity.
    pub(crate) fn with_values(values: Vec<TaggedValue>) -> Self {
        Self {
            id: RecordId::new(),
            values,
        }
    }

    pub fn id(&self) -> &RecordId {
        &self.id
    }

    /// Raw slot contents, storage form.
    pub fn raw_values(&self) -> &[TaggedValue] {
        &self.values
    }

    pub(crate) fn values_mut(&mut self) -> &mut Vec<TaggedValue> {
        &mut self.values
    }

    // ------------------------------------------------------------------
    // Typed access
    // ------------------------------------------------------------------

    /// Logical value of `field`.
    ///
    /// A null slot falls back to the field's default-empty value, then to the
    /// container default. The read converter is applied last.
    pub fn get_stored_value(
        &self,
        field: &FieldDefinition,
        registry: &TypeRegistry,
    ) -> Result<TaggedValue, SchemaError> {
        let index = slot_of(field)?;
        let raw = match self.values.get(index) {
            Some(value) if !value.is_null() => value.clone(),
            _ => field
                .default_empty_value
                .clone()
                .unwrap_or_else(|| field.field_type().container_type().default_value()),
        };
        Ok(registry.to_logical(field.field_type(), raw))
    }

    /// Write a logical value into `field`'s slot.
    ///
    /// Text aimed at a non-text field is parsed first; blank text becomes
    /// null. A value equal to the field's default-empty value is stored as
    /// null.
    pub fn set_stored_value(
        &mut self,
        field: &FieldDefinition,
        value: TaggedValue,
        registry: &TypeRegistry,
    ) -> Result<WriteOutcome, SchemaError> {
        let index = slot_of(field)?;
        let field_type = field.field_type();

        let value = match value {
            TaggedValue::Text(text) if field_type.container_type() != ContainerType::Text => {
                if text.trim().is_empty() {
                    TaggedValue::Null
                } else {
                    match field_type.try_parse_value_from(&text) {
                        Some(parsed) => parsed,
                        None => {
                            return Ok(WriteOutcome::Rejected(
                                Violation::parse_failure(field_type.name(), &text)
                                    .with_field(&field.name),
                            ))
                        }
                    }
                }
            }
            other => other,
        };

        let stored = registry.to_storage(field_type, value);
        if let Err(violation) = field.validate(&stored) {
            return Ok(WriteOutcome::Rejected(violation));
        }

        let stored = match field.default_empty_value {
            Some(ref empty) if *empty == stored => TaggedValue::Null,
            _ => stored,
        };
        self.write_slot(index, stored);
        Ok(WriteOutcome::Stored)
    }

    /// Read by dynamic key.
    pub fn get(
        &self,
        definition: &TableDefinition,
        registry: &TypeRegistry,
        key: FieldKey<'_>,
    ) -> Result<TaggedValue, SchemaError> {
        let field = definition.field(key)?;
        self.get_stored_value(field, registry)
    }

    /// Write by dynamic key.
    pub fn set(
        &mut self,
        definition: &TableDefinition,
        registry: &TypeRegistry,
        key: FieldKey<'_>,
        value: TaggedValue,
    ) -> Result<WriteOutcome, SchemaError> {
        let field = definition.field(key)?;
        self.set_stored_value(field, value, registry)
    }

    /// Values of a subset of fields, in the order asked.
    pub fn get_values(
        &self,
        definition: &TableDefinition,
        registry: &TypeRegistry,
        keys: &[FieldKey<'_>],
    ) -> Result<Vec<TaggedValue>, SchemaError> {
        keys.iter()
            .map(|key| self.get(definition, registry, *key))
            .collect()
    }

    /// Write a subset of fields. Every key is resolved before anything is
    /// written, so an unknown key leaves the record untouched.
    pub fn set_values<'k>(
        &mut self,
        definition: &TableDefinition,
        registry: &TypeRegistry,
        values: impl IntoIterator<Item = (FieldKey<'k>, TaggedValue)>,
    ) -> Result<Vec<WriteOutcome>, SchemaError> {
        let resolved = values
            .into_iter()
            .map(|(key, value)| {
                let field = definition.field(key)?;
                slot_of(field)?;
                Ok((field, value))
            })
            .collect::<Result<Vec<_>, SchemaError>>()?;

        resolved
            .into_iter()
            .map(|(field, value)| self.set_stored_value(field, value, registry))
            .collect()
    }

    // ------------------------------------------------------------------
    // Projections
    // ------------------------------------------------------------------

    /// Unique-key fields (else every field), raw values.
    pub fn unique_key(
        &self,
        definition: &TableDefinition,
        registry: &TypeRegistry,
        display: &DisplayOptions,
    ) -> Result<String, SchemaError> {
        let fields = non_empty_or(definition.unique_key_fields(), || all_fields(definition));
        self.join_raw(&fields, registry, &display.key_separator)
    }

    /// Label fields, else unique-key fields, else every field, display
    /// formatted.
    pub fn label(
        &self,
        definition: &TableDefinition,
        registry: &TypeRegistry,
        display: &DisplayOptions,
    ) -> Result<String, SchemaError> {
        let fields = non_empty_or(definition.label_fields(), || {
            non_empty_or(definition.unique_key_fields(), || all_fields(definition))
        });
        let parts = fields
            .iter()
            .map(|field| {
                self.get_stored_value(field, registry)
                    .map(|value| field.field_type().format_value(&value))
            })
            .collect::<Result<Vec<_>, SchemaError>>()?;
        Ok(parts.join(&display.label_separator))
    }

    /// Every field, raw values.
    pub fn whole_record(
        &self,
        definition: &TableDefinition,
        registry: &TypeRegistry,
        display: &DisplayOptions,
    ) -> Result<String, SchemaError> {
        self.join_raw(&all_fields(definition), registry, &display.record_separator)
    }

    fn join_raw(
        &self,
        fields: &[&FieldDefinition],
        registry: &TypeRegistry,
        separator: &str,
    ) -> Result<String, SchemaError> {
        let parts = fields
            .iter()
            .map(|field| self.get_stored_value(field, registry).map(|v| v.to_string()))
            .collect::<Result<Vec<_>, SchemaError>>()?;
        Ok(parts.join(separator))
    }

    // ------------------------------------------------------------------
    // Slot maintenance (structural alteration only)
    // ------------------------------------------------------------------

    /// Store at `index`, growing the vector only for non-null values.
    pub(crate) fn write_slot(&mut self, index: usize, value: TaggedValue) {
        if index >= self.values.len() {
            if value.is_null() {
                return;
            }
            self.values.resize(index + 1, TaggedValue::Null);
        }
        self.values[index] = value;
    }

    pub(crate) fn remove_slot(&mut self, index: usize) {
        if index < self.values.len() {
            self.values.remove(index);
        }
    }

    pub(crate) fn clear_values(&mut self) {
        self.values.clear();
    }
}

fn slot_of(field: &FieldDefinition) -> Result<usize, SchemaError> {
    field
        .storage_index()
        .ok_or_else(|| SchemaError::NoStorageSlot(field.name.clone()))
}

fn all_fields(definition: &TableDefinition) -> Vec<&FieldDefinition> {
    definition.field_definitions().iter().collect()
}

fn non_empty_or<'a>(
    fields: Vec<&'a FieldDefinition>,
    fallback: impl FnOnce() -> Vec<&'a FieldDefinition>,
) -> Vec<&'a FieldDefinition> {
    if fields.is_empty() {
        fallback()
    } else {
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_type::DataType;
    use crate::error::ViolationKind;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    fn setup() -> (TableDefinition, TypeRegistry) {
        let definition = TableDefinition::with_fields(
            "Person",
            vec![
                FieldDefinition::new("Name", DataType::text()),
                FieldDefinition::new("Age", DataType::number()),
                FieldDefinition::new("Born", DataType::date()),
                FieldDefinition::new("Member", DataType::yes_no()),
            ],
        )
        .unwrap();
        (definition, TypeRegistry::with_predefined())
    }

    #[test]
    fn test_text_is_parsed_for_typed_fields() {
        let (def, reg) = setup();
        let mut record = TableRecord::initialized(&def, &reg);

        assert!(record
            .set(&def, &reg, FieldKey::Name("Age"), TaggedValue::from("42"))
            .unwrap()
            .is_stored());
        assert_eq!(
            record.get(&def, &reg, FieldKey::Name("Age")).unwrap(),
            TaggedValue::Number(Decimal::from(42))
        );

        assert!(record
            .set(&def, &reg, FieldKey::Name("Born"), TaggedValue::from("2020-01-01"))
            .unwrap()
            .is_stored());
        let born = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        assert_eq!(
            record.get(&def, &reg, FieldKey::Name("Born")).unwrap(),
            TaggedValue::DateTime(born)
        );
    }

    #[test]
    fn test_unparseable_text_is_rejected_and_slot_kept() {
        let (def, reg) = setup();
        let mut record = TableRecord::initialized(&def, &reg);
        record
            .set(&def, &reg, FieldKey::Name("Born"), TaggedValue::from("2020-01-01"))
            .unwrap()
            .into_result()
            .unwrap();

        let outcome = record
            .set(&def, &reg, FieldKey::Name("Born"), TaggedValue::from("bad-date"))
            .unwrap();
        let violation = outcome.violation().unwrap();
        assert_eq!(violation.kind, ViolationKind::ParseFailure);
        assert_eq!(violation.field.as_deref(), Some("Born"));
        assert!(!record.get(&def, &reg, FieldKey::Name("Born")).unwrap().is_null());
    }

    #[test]
    fn test_boolean_choice_round_trip() {
        let (def, reg) = setup();
        let mut record = TableRecord::new();
        record
            .set(&def, &reg, FieldKey::Name("Member"), TaggedValue::Boolean(true))
            .unwrap()
            .into_result()
            .unwrap();

        let member = def.field(FieldKey::Name("Member")).unwrap();
        let slot = member.storage_index().unwrap();
        assert_eq!(record.raw_values()[slot], TaggedValue::Choice(1));
        assert_eq!(
            record.get(&def, &reg, FieldKey::Name("Member")).unwrap(),
            TaggedValue::Boolean(true)
        );
    }

    #[test]
    fn test_reads_fall_back_to_defaults() {
        let (def, reg) = setup();
        let record = TableRecord::new();
        assert_eq!(
            record.get(&def, &reg, FieldKey::Name("Name")).unwrap(),
            TaggedValue::from("")
        );
        assert!(record.get(&def, &reg, FieldKey::Name("Age")).unwrap().is_null());
    }

    #[test]
    fn test_default_empty_collapses_to_null() {
        let definition = TableDefinition::with_fields(
            "Stock",
            vec![FieldDefinition::new("Qty", DataType::number())
                .with_default_empty(TaggedValue::from(0))],
        )
        .unwrap();
        let reg = TypeRegistry::with_predefined();
        let mut record = TableRecord::new();

        record
            .set(&definition, &reg, FieldKey::Index(0), TaggedValue::from(0))
            .unwrap()
            .into_result()
            .unwrap();
        assert!(record.raw_values().is_empty());
        assert_eq!(
            record.get(&definition, &reg, FieldKey::Index(0)).unwrap(),
            TaggedValue::from(0)
        );

        record
            .set(&definition, &reg, FieldKey::Index(0), TaggedValue::from(7))
            .unwrap()
            .into_result()
            .unwrap();
        assert_eq!(record.raw_values(), &[TaggedValue::from(7)]);
    }

    #[test]
    fn test_lazy_growth() {
        let (def, reg) = setup();
        let mut record = TableRecord::new();
        record
            .set(&def, &reg, FieldKey::Name("Born"), TaggedValue::Null)
            .unwrap()
            .into_result()
            .unwrap();
        assert!(record.raw_values().is_empty());

        record
            .set(&def, &reg, FieldKey::Name("Age"), TaggedValue::from(3))
            .unwrap()
            .into_result()
            .unwrap();
        assert_eq!(record.raw_values().len(), 2);
    }

    #[test]
    fn test_field_without_slot_is_usage_error() {
        let (mut def, reg) = setup();
        def.add_field(FieldDefinition::new("Email", DataType::text())).unwrap();
        let record = TableRecord::new();
        assert_eq!(
            record.get(&def, &reg, FieldKey::Name("Email")).unwrap_err(),
            SchemaError::NoStorageSlot("Email".to_string())
        );
    }

    #[test]
    fn test_set_values_resolves_before_writing() {
        let (def, reg) = setup();
        let mut record = TableRecord::initialized(&def, &reg);
        let result = record.set_values(
            &def,
            &reg,
            vec![
                (FieldKey::Name("Name"), TaggedValue::from("Ann")),
                (FieldKey::Name("Missing"), TaggedValue::from("x")),
            ],
        );
        assert!(result.is_err());
        assert_eq!(
            record.get(&def, &reg, FieldKey::Name("Name")).unwrap(),
            TaggedValue::from("")
        );

        let outcomes = record
            .set_values(
                &def,
                &reg,
                vec![
                    (FieldKey::Name("Name"), TaggedValue::from("Ann")),
                    (FieldKey::Name("Age"), TaggedValue::from("old")),
                ],
            )
            .unwrap();
        assert!(outcomes[0].is_stored());
        assert!(!outcomes[1].is_stored());

        let values = record
            .get_values(&def, &reg, &[FieldKey::Name("Age"), FieldKey::Name("Name")])
            .unwrap();
        assert_eq!(values, vec![TaggedValue::Null, TaggedValue::from("Ann")]);
    }

    #[test]
    fn test_projection_precedence() {
        let (mut def, reg) = setup();
        let display = DisplayOptions::default();
        let mut record = TableRecord::initialized(&def, &reg);
        record
            .set_values(
                &def,
                &reg,
                vec![
                    (FieldKey::Name("Name"), TaggedValue::from("Ann")),
                    (FieldKey::Name("Age"), TaggedValue::from(30)),
                    (FieldKey::Name("Member"), TaggedValue::Boolean(true)),
                ],
            )
            .unwrap();

        // Nothing designated: every field
        let whole = record.whole_record(&def, &reg, &display).unwrap();
        assert_eq!(record.unique_key(&def, &reg, &display).unwrap(), whole);

        let name = def.field(FieldKey::Name("Name")).unwrap().id().clone();
        let member = def.field(FieldKey::Name("Member")).unwrap().id().clone();
        def.set_unique_key(vec![name]).unwrap();
        assert_eq!(record.unique_key(&def, &reg, &display).unwrap(), "Ann");
        assert_eq!(record.label(&def, &reg, &display).unwrap(), "Ann");

        def.set_label_fields(vec![member]).unwrap();
        assert_eq!(record.label(&def, &reg, &display).unwrap(), "Yes");
    }

    #[test]
    fn test_slot_maintenance() {
        let mut record = TableRecord::new();
        record.write_slot(2, TaggedValue::from("c"));
        assert_eq!(record.raw_values().len(), 3);
        record.remove_slot(0);
        assert_eq!(record.raw_values(), &[TaggedValue::Null, TaggedValue::from("c")]);
        record.remove_slot(9);
        assert_eq!(record.raw_values().len(), 2);
        record.clear_values();
        assert!(record.raw_values().is_empty());
    }
}
