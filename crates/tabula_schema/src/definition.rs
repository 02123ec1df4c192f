//! Table definitions: the schema authority.
//!
//! A definition keeps two parallel orderings of its fields:
//!
//! - the **logical** order (`field_definitions`): display/editing order, freely
//!   reorderable;
//! - the **storage** order (`storage_structure`): the physical slot order of
//!   every record. It only grows (new fields are appended) or shrinks (removed
//!   fields drop out); it is never reshuffled, so a pure display reorder never
//!   touches record data.
//!
//! Storage indices are reassigned only by [`TableDefinition::reconcile_storage_structure`],
//! which the structural alteration runs after an edit.

use crate::data_type::DataType;
use crate::error::SchemaError;
use crate::field::FieldDefinition;
use std::collections::{HashMap, HashSet};
use tabula_ids::{FieldId, TableDefinitionId};

/// Dynamic field address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKey<'a> {
    /// Display name or tech name
    Name(&'a str),
    /// Position in the logical order
    Index(usize),
    Id(&'a FieldId),
}

impl<'a> From<&'a str> for FieldKey<'a> {
    fn from(value: &'a str) -> Self {
        FieldKey::Name(value)
    }
}

impl From<usize> for FieldKey<'_> {
    fn from(value: usize) -> Self {
        FieldKey::Index(value)
    }
}

impl<'a> From<&'a FieldId> for FieldKey<'a> {
    fn from(value: &'a FieldId) -> Self {
        FieldKey::Id(value)
    }
}

/// One field as it was laid out in storage when a snapshot was taken.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSnapshot {
    pub field_id: FieldId,
    pub name: String,
    pub field_type: DataType,
    pub storage_index: usize,
}

/// Pre-edit storage layout, handed to the structural alteration.
#[derive(Debug, Clone, PartialEq)]
pub struct StorageSnapshot {
    definition_id: TableDefinitionId,
    fields: Vec<FieldSnapshot>,
    unique_key: Vec<FieldId>,
}

impl StorageSnapshot {
    pub fn definition_id(&self) -> &TableDefinitionId {
        &self.definition_id
    }

    /// Fields in storage order.
    pub fn fields(&self) -> &[FieldSnapshot] {
        &self.fields
    }

    pub fn unique_key(&self) -> &[FieldId] {
        &self.unique_key
    }

    pub fn find(&self, id: &FieldId) -> Option<&FieldSnapshot> {
        self.fields.iter().find(|f| &f.field_id == id)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Outcome of a storage reconciliation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StorageDelta {
    pub removed: Vec<FieldId>,
    pub added: Vec<FieldId>,
}

impl StorageDelta {
    pub fn is_empty(&self) -> bool {
        self.removed.is_empty() && self.added.is_empty()
    }
}

/// The declared fields, types and key/label selections of a table.
///
/// `Clone` keeps every identity (definition and fields); use
/// [`TableDefinition::derive_copy`] for an independent schema.
#[derive(Debug, Clone, PartialEq)]
pub struct TableDefinition {
    id: TableDefinitionId,
    pub name: String,
    field_definitions: Vec<FieldDefinition>,
    storage_structure: Vec<FieldId>,
    unique_key_fields: Vec<FieldId>,
    label_fields: Vec<FieldId>,
    dominant_ref_fields: Vec<FieldId>,
}

impl TableDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: TableDefinitionId::new(),
            name: name.into(),
            field_definitions: Vec::new(),
            storage_structure: Vec::new(),
            unique_key_fields: Vec::new(),
            label_fields: Vec::new(),
            dominant_ref_fields: Vec::new(),
        }
    }

    /// Definition with its fields already laid out in storage.
    pub fn with_fields(
        name: impl Into<String>,
        fields: Vec<FieldDefinition>,
    ) -> Result<Self, SchemaError> {
        let mut definition = Self::new(name);
        for field in fields {
            definition.add_field(field)?;
        }
        definition.reconcile_storage_structure();
        Ok(definition)
    }

    /// Independent copy: fresh definition and field identities, selections
    /// remapped, storage laid out anew. Data types are shared by id.
    pub fn derive_copy(&self, name: impl Into<String>) -> Self {
        let mut mapping: HashMap<&FieldId, FieldId> = HashMap::new();
        let mut copy = Self::new(name);
        for field in &self.field_definitions {
            let derived = field.derive_copy();
            mapping.insert(field.id(), derived.id().clone());
            copy.field_definitions.push(derived);
        }
        let remap = |ids: &[FieldId]| -> Vec<FieldId> {
            ids.iter().filter_map(|id| mapping.get(id).cloned()).collect()
        };
        copy.unique_key_fields = remap(&self.unique_key_fields);
        copy.label_fields = remap(&self.label_fields);
        copy.dominant_ref_fields = remap(&self.dominant_ref_fields);
        copy.reconcile_storage_structure();
        copy
    }

    pub fn id(&self) -> &TableDefinitionId {
        &self.id
    }

    /// Fields in logical order.
    pub fn field_definitions(&self) -> &[FieldDefinition] {
        &self.field_definitions
    }

    pub fn len(&self) -> usize {
        self.field_definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.field_definitions.is_empty()
    }

    /// Field ids in storage order.
    pub fn storage_structure(&self) -> &[FieldId] {
        &self.storage_structure
    }

    /// Fields in storage order.
    pub fn storage_fields(&self) -> Vec<&FieldDefinition> {
        self.storage_structure
            .iter()
            .filter_map(|id| self.field_by_id(id))
            .collect()
    }

    pub fn field_by_id(&self, id: &FieldId) -> Option<&FieldDefinition> {
        self.field_definitions.iter().find(|f| f.id() == id)
    }

    /// Logical position of a field.
    pub fn position_of(&self, id: &FieldId) -> Option<usize> {
        self.field_definitions.iter().position(|f| f.id() == id)
    }

    pub fn field(&self, key: FieldKey<'_>) -> Result<&FieldDefinition, SchemaError> {
        let index = self.resolve(key)?;
        Ok(&self.field_definitions[index])
    }

    pub fn field_mut(&mut self, key: FieldKey<'_>) -> Result<&mut FieldDefinition, SchemaError> {
        let index = self.resolve(key)?;
        Ok(&mut self.field_definitions[index])
    }

    fn resolve(&self, key: FieldKey<'_>) -> Result<usize, SchemaError> {
        match key {
            FieldKey::Index(index) => {
                if index < self.field_definitions.len() {
                    Ok(index)
                } else {
                    Err(SchemaError::FieldIndexOutOfRange {
                        index,
                        len: self.field_definitions.len(),
                    })
                }
            }
            FieldKey::Id(id) => self
                .position_of(id)
                .ok_or_else(|| SchemaError::UnknownField(id.to_string())),
            FieldKey::Name(name) => self
                .field_definitions
                .iter()
                .position(|f| f.name == name)
                .or_else(|| self.field_definitions.iter().position(|f| f.tech_name == name))
                .ok_or_else(|| SchemaError::UnknownField(name.to_string())),
        }
    }

    // ------------------------------------------------------------------
    // Logical list edits
    // ------------------------------------------------------------------

    /// Append a field to the logical order. It gets a storage slot at the
    /// next structural alteration.
    pub fn add_field(&mut self, field: FieldDefinition) -> Result<FieldId, SchemaError> {
        let at = self.field_definitions.len();
        self.insert_field(at, field)
    }

    pub fn insert_field(
        &mut self,
        index: usize,
        mut field: FieldDefinition,
    ) -> Result<FieldId, SchemaError> {
        if self.position_of(field.id()).is_some() {
            return Err(SchemaError::DuplicateField(field.id().clone()));
        }
        if index > self.field_definitions.len() {
            return Err(SchemaError::FieldIndexOutOfRange {
                index,
                len: self.field_definitions.len(),
            });
        }
        // Slots are handed out by reconciliation only
        field.assign_storage_index(None);
        let id = field.id().clone();
        self.field_definitions.insert(index, field);
        Ok(id)
    }

    /// Remove a field from the logical order and from every selection.
    pub fn remove_field(&mut self, id: &FieldId) -> Result<FieldDefinition, SchemaError> {
        let index = self
            .position_of(id)
            .ok_or_else(|| SchemaError::UnknownField(id.to_string()))?;
        self.unique_key_fields.retain(|f| f != id);
        self.label_fields.retain(|f| f != id);
        self.dominant_ref_fields.retain(|f| f != id);
        Ok(self.field_definitions.remove(index))
    }

    /// Reorder the logical list. Storage is untouched.
    pub fn move_field(&mut self, from: usize, to: usize) -> Result<(), SchemaError> {
        let len = self.field_definitions.len();
        for index in [from, to] {
            if index >= len {
                return Err(SchemaError::FieldIndexOutOfRange { index, len });
            }
        }
        let field = self.field_definitions.remove(from);
        self.field_definitions.insert(to, field);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Selections
    // ------------------------------------------------------------------

    pub fn set_unique_key(&mut self, ids: Vec<FieldId>) -> Result<(), SchemaError> {
        self.unique_key_fields = self.checked_selection(ids)?;
        Ok(())
    }

    pub fn set_label_fields(&mut self, ids: Vec<FieldId>) -> Result<(), SchemaError> {
        self.label_fields = self.checked_selection(ids)?;
        Ok(())
    }

    pub fn set_dominant_ref_fields(&mut self, ids: Vec<FieldId>) -> Result<(), SchemaError> {
        self.dominant_ref_fields = self.checked_selection(ids)?;
        Ok(())
    }

    fn checked_selection(&self, ids: Vec<FieldId>) -> Result<Vec<FieldId>, SchemaError> {
        let mut seen = HashSet::new();
        let mut selection = Vec::with_capacity(ids.len());
        for id in ids {
            if self.position_of(&id).is_none() {
                return Err(SchemaError::UndeclaredSelection(id));
            }
            if seen.insert(id.clone()) {
                selection.push(id);
            }
        }
        Ok(selection)
    }

    pub fn unique_key_ids(&self) -> &[FieldId] {
        &self.unique_key_fields
    }

    pub fn unique_key_fields(&self) -> Vec<&FieldDefinition> {
        self.select(&self.unique_key_fields)
    }

    pub fn label_fields(&self) -> Vec<&FieldDefinition> {
        self.select(&self.label_fields)
    }

    pub fn dominant_ref_fields(&self) -> Vec<&FieldDefinition> {
        self.select(&self.dominant_ref_fields)
    }

    fn select(&self, ids: &[FieldId]) -> Vec<&FieldDefinition> {
        ids.iter().filter_map(|id| self.field_by_id(id)).collect()
    }

    // ------------------------------------------------------------------
    // Storage structure
    // ------------------------------------------------------------------

    /// Capture the current storage layout before an edit.
    pub fn storage_snapshot(&self) -> StorageSnapshot {
        let fields = self
            .storage_fields()
            .into_iter()
            .filter_map(|f| {
                f.storage_index().map(|storage_index| FieldSnapshot {
                    field_id: f.id().clone(),
                    name: f.name.clone(),
                    field_type: f.field_type().clone(),
                    storage_index,
                })
            })
            .collect();
        StorageSnapshot {
            definition_id: self.id.clone(),
            fields,
            unique_key: self.unique_key_fields.clone(),
        }
    }

    /// Bring the storage order in line with the logical field list.
    ///
    /// Fields no longer declared drop out, newly declared fields are
    /// appended in logical order, survivors keep their relative order. Storage
    /// indices are then reassigned sequentially.
    pub fn reconcile_storage_structure(&mut self) -> StorageDelta {
        let declared: HashSet<FieldId> =
            self.field_definitions.iter().map(|f| f.id().clone()).collect();

        let mut delta = StorageDelta::default();
        let mut storage = Vec::with_capacity(self.field_definitions.len());
        for id in std::mem::take(&mut self.storage_structure) {
            if declared.contains(&id) {
                storage.push(id);
            } else {
                delta.removed.push(id);
            }
        }

        let mut placed: HashSet<FieldId> = storage.iter().cloned().collect();
        for field in &self.field_definitions {
            if placed.insert(field.id().clone()) {
                storage.push(field.id().clone());
                delta.added.push(field.id().clone());
            }
        }

        let slots: HashMap<&FieldId, usize> =
            storage.iter().enumerate().map(|(i, id)| (id, i)).collect();
        for field in &mut self.field_definitions {
            let slot = slots.get(field.id()).copied();
            field.assign_storage_index(slot);
        }
        drop(slots);
        self.storage_structure = storage;
        delta
    }

    // ------------------------------------------------------------------
    // Compatibility
    // ------------------------------------------------------------------

    /// Field types in logical order.
    pub fn structure_types(&self) -> Vec<DataType> {
        self.field_definitions
            .iter()
            .map(|f| f.field_type().clone())
            .collect()
    }

    /// Whether a structure described by `other` can populate this schema
    /// positionally, without remapping.
    ///
    /// Container types must match over the overlapping prefix. A longer
    /// `other` needs `allow_larger`, a shorter one needs `allow_shorter`.
    pub fn is_compatible_with(&self, other: &[DataType], allow_larger: bool, allow_shorter: bool) -> bool {
        let len = self.field_definitions.len();
        if other.len() > len && !allow_larger {
            return false;
        }
        if other.len() < len && !allow_shorter {
            return false;
        }
        self.field_definitions
            .iter()
            .zip(other)
            .all(|(field, data_type)| field.field_type().container_type() == data_type.container_type())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn person() -> TableDefinition {
        TableDefinition::with_fields(
            "Person",
            vec![
                FieldDefinition::new("Name", DataType::text()),
                FieldDefinition::new("Age", DataType::number()),
                FieldDefinition::new("Born", DataType::date()),
            ],
        )
        .unwrap()
    }

    fn indices(def: &TableDefinition) -> Vec<(String, Option<usize>)> {
        def.field_definitions()
            .iter()
            .map(|f| (f.name.clone(), f.storage_index()))
            .collect()
    }

    #[test]
    fn test_initial_layout() {
        let def = person();
        assert_eq!(
            indices(&def),
            vec![
                ("Name".to_string(), Some(0)),
                ("Age".to_string(), Some(1)),
                ("Born".to_string(), Some(2)),
            ]
        );
    }

    #[test]
    fn test_reorder_keeps_storage_indices() {
        let mut def = person();
        def.move_field(2, 0).unwrap();
        let delta = def.reconcile_storage_structure();
        assert!(delta.is_empty());

        let born = def.field(FieldKey::Index(0)).unwrap();
        assert_eq!(born.name, "Born");
        assert_eq!(born.storage_index(), Some(2));
        assert_eq!(def.field(FieldKey::Name("Name")).unwrap().storage_index(), Some(0));
    }

    #[test]
    fn test_remove_and_add_reconcile() {
        let mut def = person();
        let age = def.field(FieldKey::Name("Age")).unwrap().id().clone();
        def.remove_field(&age).unwrap();
        let email = def
            .insert_field(0, FieldDefinition::new("Email", DataType::text()))
            .unwrap();
        assert_eq!(def.field(FieldKey::Id(&email)).unwrap().storage_index(), None);

        let delta = def.reconcile_storage_structure();
        assert_eq!(delta.removed, vec![age]);
        assert_eq!(delta.added, vec![email.clone()]);

        // Born slides down to fill Age's slot, Email is appended
        assert_eq!(def.field(FieldKey::Name("Name")).unwrap().storage_index(), Some(0));
        assert_eq!(def.field(FieldKey::Name("Born")).unwrap().storage_index(), Some(1));
        assert_eq!(def.field(FieldKey::Id(&email)).unwrap().storage_index(), Some(2));
        assert_eq!(def.storage_structure().len(), 3);
    }

    #[test]
    fn test_field_lookup() {
        let def = person();
        assert!(def.field(FieldKey::Name("Born")).is_ok());
        assert!(matches!(
            def.field(FieldKey::Name("Missing")),
            Err(SchemaError::UnknownField(_))
        ));
        assert_eq!(
            def.field(FieldKey::Index(9)).unwrap_err(),
            SchemaError::FieldIndexOutOfRange { index: 9, len: 3 }
        );
    }

    #[test]
    fn test_lookup_by_tech_name() {
        let def = TableDefinition::with_fields(
            "Person",
            vec![FieldDefinition::new("Date of Birth", DataType::date())],
        )
        .unwrap();
        assert!(def.field(FieldKey::Name("Date_of_Birth")).is_ok());
    }

    #[test]
    fn test_duplicate_field_rejected() {
        let mut def = person();
        let existing = def.field_definitions()[0].clone();
        assert!(matches!(def.add_field(existing), Err(SchemaError::DuplicateField(_))));
    }

    #[test]
    fn test_selections_are_checked_and_pruned() {
        let mut def = person();
        let name = def.field_definitions()[0].id().clone();
        let age = def.field_definitions()[1].id().clone();

        def.set_unique_key(vec![name.clone(), name.clone()]).unwrap();
        assert_eq!(def.unique_key_ids(), &[name.clone()]);

        let foreign = FieldId::new();
        assert_eq!(
            def.set_label_fields(vec![foreign.clone()]).unwrap_err(),
            SchemaError::UndeclaredSelection(foreign)
        );

        def.set_label_fields(vec![age.clone(), name.clone()]).unwrap();
        def.remove_field(&age).unwrap();
        let labels: Vec<_> = def.label_fields().iter().map(|f| f.name.clone()).collect();
        assert_eq!(labels, vec!["Name".to_string()]);
    }

    #[test]
    fn test_snapshot_captures_types() {
        let mut def = person();
        let snapshot = def.storage_snapshot();
        def.field_mut(FieldKey::Name("Age"))
            .unwrap()
            .set_field_type(DataType::text());

        let age = snapshot.fields().iter().find(|f| f.name == "Age").unwrap();
        assert_eq!(age.field_type, DataType::number());
        assert_eq!(age.storage_index, 1);
        assert_eq!(snapshot.definition_id(), def.id());
    }

    #[test]
    fn test_compatibility() {
        let def = person();
        let same = vec![DataType::text(), DataType::number(), DataType::date_time()];
        assert!(def.is_compatible_with(&same, false, false));

        let longer = vec![
            DataType::text(),
            DataType::number(),
            DataType::date(),
            DataType::text(),
        ];
        assert!(!def.is_compatible_with(&longer, false, true));
        assert!(def.is_compatible_with(&longer, true, false));

        let shorter = vec![DataType::text()];
        assert!(!def.is_compatible_with(&shorter, true, false));
        assert!(def.is_compatible_with(&shorter, false, true));

        let mismatched = vec![DataType::number(), DataType::number(), DataType::date()];
        assert!(!def.is_compatible_with(&mismatched, true, true));
    }

    #[test]
    fn test_derive_copy() {
        let mut def = person();
        let name = def.field_definitions()[0].id().clone();
        def.set_unique_key(vec![name.clone()]).unwrap();

        let copy = def.derive_copy("Person (copy)");
        assert_ne!(copy.id(), def.id());
        assert_eq!(copy.len(), 3);
        assert_ne!(copy.field_definitions()[0].id(), &name);
        assert_eq!(copy.unique_key_fields()[0].name, "Name");
        assert_eq!(copy.field_definitions()[2].storage_index(), Some(2));
    }
}
