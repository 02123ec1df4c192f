//! Table instances: an ordered record set bound to a definition through a
//! designator.

use crate::config::DisplayOptions;
use crate::data_type::DataType;
use crate::definition::TableDefinition;
use crate::error::SchemaError;
use crate::record::TableRecord;
use crate::registry::TypeRegistry;
use crate::value::{LinkValue, TaggedValue};
use tabula_ids::{RecordId, TableDefinitionId, TableId};

/// How a table relates to the definition it follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DesignatorMode {
    /// The definition lives and dies with this table
    Owned,
    /// The definition is shared with other tables
    Referenced,
}

/// Binding from a table to its definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDesignator {
    definition_id: TableDefinitionId,
    mode: DesignatorMode,
}

impl TableDesignator {
    pub fn owned(definition_id: TableDefinitionId) -> Self {
        Self {
            definition_id,
            mode: DesignatorMode::Owned,
        }
    }

    pub fn referencing(definition_id: TableDefinitionId) -> Self {
        Self {
            definition_id,
            mode: DesignatorMode::Referenced,
        }
    }

    pub fn definition_id(&self) -> &TableDefinitionId {
        &self.definition_id
    }

    pub fn mode(&self) -> DesignatorMode {
        self.mode
    }

    pub fn is_owned(&self) -> bool {
        self.mode == DesignatorMode::Owned
    }
}

/// Records following one definition.
///
/// `Clone` keeps every identity; [`Table::derive_copy`] and
/// [`Table::copy_records_into`] hand out fresh ones.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    id: TableId,
    designator: TableDesignator,
    records: Vec<TableRecord>,
}

impl Table {
    pub fn new(designator: TableDesignator) -> Self {
        Self {
            id: TableId::new(),
            designator,
            records: Vec::new(),
        }
    }

    pub fn owned(definition: &TableDefinition) -> Self {
        Self::new(TableDesignator::owned(definition.id().clone()))
    }

    pub fn referencing(definition: &TableDefinition) -> Self {
        Self::new(TableDesignator::referencing(definition.id().clone()))
    }

    /// Deep copy: fresh table and record identities, nested tables included.
    pub fn derive_copy(&self) -> Self {
        let mut copy = Self::new(self.designator.clone());
        copy.records = self.records.iter().map(derive_record).collect();
        copy
    }

    pub fn id(&self) -> &TableId {
        &self.id
    }

    pub fn designator(&self) -> &TableDesignator {
        &self.designator
    }

    pub fn definition_id(&self) -> &TableDefinitionId {
        self.designator.definition_id()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[TableRecord] {
        &self.records
    }

    pub fn record(&self, id: &RecordId) -> Option<&TableRecord> {
        self.records.iter().find(|r| r.id() == id)
    }

    pub fn record_mut(&mut self, id: &RecordId) -> Option<&mut TableRecord> {
        self.records.iter_mut().find(|r| r.id() == id)
    }

    pub(crate) fn records_mut(&mut self) -> &mut Vec<TableRecord> {
        &mut self.records
    }

    pub(crate) fn replace_records(&mut self, records: Vec<TableRecord>) {
        self.records = records;
    }

    /// Err unless `definition` is the one this table follows.
    pub fn ensure_follows(&self, definition: &TableDefinition) -> Result<(), SchemaError> {
        if self.definition_id() == definition.id() {
            Ok(())
        } else {
            Err(SchemaError::DefinitionMismatch {
                table: self.id.clone(),
                follows: self.definition_id().clone(),
                given: definition.id().clone(),
            })
        }
    }

    /// Append a record holding each field's initializer.
    pub fn add_record(
        &mut self,
        definition: &TableDefinition,
        registry: &TypeRegistry,
    ) -> Result<&mut TableRecord, SchemaError> {
        self.ensure_follows(definition)?;
        let index = self.records.len();
        self.records.push(TableRecord::initialized(definition, registry));
        Ok(&mut self.records[index])
    }

    pub fn push_record(&mut self, record: TableRecord) -> RecordId {
        let id = record.id().clone();
        self.records.push(record);
        id
    }

    pub fn remove_record(&mut self, id: &RecordId) -> Result<TableRecord, SchemaError> {
        let index = self
            .records
            .iter()
            .position(|r| r.id() == id)
            .ok_or_else(|| SchemaError::UnknownRecord(id.clone()))?;
        Ok(self.records.remove(index))
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Whether rows shaped by `other` can fill this table without remapping.
    pub fn is_compatible_with(
        &self,
        definition: &TableDefinition,
        other: &[DataType],
        allow_larger: bool,
        allow_shorter: bool,
    ) -> Result<bool, SchemaError> {
        self.ensure_follows(definition)?;
        Ok(definition.is_compatible_with(other, allow_larger, allow_shorter))
    }

    /// Copy every record into `target` under fresh identities.
    pub fn copy_records_into(&self, target: &mut Table) -> Result<usize, SchemaError> {
        if target.definition_id() != self.definition_id() {
            return Err(SchemaError::DefinitionMismatch {
                table: target.id.clone(),
                follows: target.definition_id().clone(),
                given: self.definition_id().clone(),
            });
        }
        target.records.extend(self.records.iter().map(derive_record));
        Ok(self.records.len())
    }

    /// First record of this table referenced by one of `record`'s dominant
    /// reference fields.
    pub fn dominant_record(
        &self,
        record: &TableRecord,
        definition: &TableDefinition,
        registry: &TypeRegistry,
    ) -> Result<Option<&TableRecord>, SchemaError> {
        self.ensure_follows(definition)?;
        for field in definition.dominant_ref_fields() {
            if let TaggedValue::Link(LinkValue::Record(target)) =
                record.get_stored_value(field, registry)?
            {
                if target.table == self.id {
                    if let Some(found) = self.record(&target.record) {
                        return Ok(Some(found));
                    }
                }
            }
        }
        Ok(None)
    }

    /// Records whose dominant record is `parent`.
    pub fn children_of(
        &self,
        parent: &RecordId,
        definition: &TableDefinition,
        registry: &TypeRegistry,
    ) -> Result<Vec<&TableRecord>, SchemaError> {
        let mut children = Vec::new();
        for record in &self.records {
            if let Some(dominant) = self.dominant_record(record, definition, registry)? {
                if dominant.id() == parent {
                    children.push(record);
                }
            }
        }
        Ok(children)
    }

    /// Linear scan for a record by unique key rendering.
    pub fn find_by_unique_key(
        &self,
        definition: &TableDefinition,
        registry: &TypeRegistry,
        display: &DisplayOptions,
        key: &str,
    ) -> Result<Option<&TableRecord>, SchemaError> {
        self.ensure_follows(definition)?;
        for record in &self.records {
            if record.unique_key(definition, registry, display)? == key {
                return Ok(Some(record));
            }
        }
        Ok(None)
    }
}

fn derive_record(record: &TableRecord) -> TableRecord {
    let values = record
        .raw_values()
        .iter()
        .map(|value| match value {
            TaggedValue::Table(nested) => TaggedValue::Table(Box::new(nested.derive_copy())),
            other => other.clone(),
        })
        .collect();
    TableRecord::with_values(values)
}
