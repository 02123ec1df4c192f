//! The catalog: owner of every definition and top-level table of a document.
//!
//! Schema edits go through the catalog because a definition change has to
//! reach every table that follows it, including tables nested inside record
//! values.

use crate::alteration::{AlterationPlan, AlterationReport};
use crate::config::DisplayOptions;
use crate::data_type::DataTypeKind;
use crate::definition::{StorageSnapshot, TableDefinition};
use crate::error::SchemaError;
use crate::export::LinkLabelResolver;
use crate::field::{FieldDefinition, ValuesSource};
use crate::record::TableRecord;
use crate::registry::TypeRegistry;
use crate::table::{DesignatorMode, Table, TableDesignator};
use crate::value::{LinkValue, RecordRef, TaggedValue};
use std::collections::BTreeMap;
use tabula_ids::{TableDefinitionId, TableId};
use tracing::{debug, info};

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    definitions: BTreeMap<TableDefinitionId, TableDefinition>,
    tables: Vec<Table>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // Definitions
    // ------------------------------------------------------------------

    pub fn add_definition(&mut self, definition: TableDefinition) -> TableDefinitionId {
        let id = definition.id().clone();
        debug!(definition = %definition.name, id = %id, "definition added");
        self.definitions.insert(id.clone(), definition);
        id
    }

    pub fn definition(&self, id: &TableDefinitionId) -> Result<&TableDefinition, SchemaError> {
        self.definitions
            .get(id)
            .ok_or_else(|| SchemaError::UnknownDefinition(id.clone()))
    }

    /// Mutable access for property edits. Structural edits should go through
    /// [`Catalog::edit_definition`] so the tables follow.
    pub fn definition_mut(
        &mut self,
        id: &TableDefinitionId,
    ) -> Result<&mut TableDefinition, SchemaError> {
        self.definitions
            .get_mut(id)
            .ok_or_else(|| SchemaError::UnknownDefinition(id.clone()))
    }

    pub fn definitions(&self) -> impl Iterator<Item = &TableDefinition> {
        self.definitions.values()
    }

    /// Remove a definition no table follows any more.
    pub fn remove_definition(
        &mut self,
        id: &TableDefinitionId,
    ) -> Result<TableDefinition, SchemaError> {
        let dependents = self.dependent_table_count(id);
        if dependents > 0 {
            return Err(SchemaError::DefinitionInUse(id.clone(), dependents));
        }
        if let Some(by) = self.referencing_definitions(id).next() {
            return Err(SchemaError::DefinitionReferenced {
                definition: id.clone(),
                by: by.id().clone(),
            });
        }
        self.definitions
            .remove(id)
            .ok_or_else(|| SchemaError::UnknownDefinition(id.clone()))
    }

    /// Tables following `id`, nested ones included.
    pub fn dependent_table_count(&self, id: &TableDefinitionId) -> usize {
        fn count(table: &Table, id: &TableDefinitionId) -> usize {
            let own = usize::from(table.definition_id() == id);
            own + table
                .records()
                .iter()
                .flat_map(|r| r.raw_values())
                .filter_map(TaggedValue::as_table)
                .map(|nested| count(nested, id))
                .sum::<usize>()
        }
        self.tables.iter().map(|t| count(t, id)).sum()
    }

    /// Other definitions with a nested-table field of type `id`.
    pub fn referencing_definitions<'a>(
        &'a self,
        id: &'a TableDefinitionId,
    ) -> impl Iterator<Item = &'a TableDefinition> + 'a {
        self.definitions.values().filter(move |definition| {
            definition.id() != id
                && definition.field_definitions().iter().any(|field| {
                    matches!(field.field_type().kind(), DataTypeKind::Table(nested) if nested == id)
                })
        })
    }

    // ------------------------------------------------------------------
    // Tables
    // ------------------------------------------------------------------

    /// New empty table following `definition_id`.
    pub fn create_table(
        &mut self,
        definition_id: &TableDefinitionId,
        mode: DesignatorMode,
    ) -> Result<TableId, SchemaError> {
        self.definition(definition_id)?;
        let designator = match mode {
            DesignatorMode::Owned => TableDesignator::owned(definition_id.clone()),
            DesignatorMode::Referenced => TableDesignator::referencing(definition_id.clone()),
        };
        self.add_table(Table::new(designator))
    }

    pub fn add_table(&mut self, table: Table) -> Result<TableId, SchemaError> {
        self.definition(table.definition_id())?;
        let id = table.id().clone();
        self.tables.push(table);
        Ok(id)
    }

    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    pub fn table(&self, id: &TableId) -> Result<&Table, SchemaError> {
        self.tables
            .iter()
            .find(|t| t.id() == id)
            .ok_or_else(|| SchemaError::UnknownTable(id.clone()))
    }

    pub fn table_mut(&mut self, id: &TableId) -> Result<&mut Table, SchemaError> {
        self.tables
            .iter_mut()
            .find(|t| t.id() == id)
            .ok_or_else(|| SchemaError::UnknownTable(id.clone()))
    }

    /// Table together with the definition it follows.
    pub fn table_with_definition(
        &mut self,
        id: &TableId,
    ) -> Result<(&mut Table, &TableDefinition), SchemaError> {
        let table = self
            .tables
            .iter_mut()
            .find(|t| t.id() == id)
            .ok_or_else(|| SchemaError::UnknownTable(id.clone()))?;
        let definition = self
            .definitions
            .get(table.definition_id())
            .ok_or_else(|| SchemaError::UnknownDefinition(table.definition_id().clone()))?;
        Ok((table, definition))
    }

    /// Remove a table. An owned definition goes with it once no other table
    /// follows it.
    pub fn remove_table(&mut self, id: &TableId) -> Result<Table, SchemaError> {
        let index = self
            .tables
            .iter()
            .position(|t| t.id() == id)
            .ok_or_else(|| SchemaError::UnknownTable(id.clone()))?;
        let table = self.tables.remove(index);

        let definition_id = table.definition_id();
        if table.designator().is_owned()
            && self.dependent_table_count(definition_id) == 0
            && self.referencing_definitions(definition_id).next().is_none()
        {
            self.definitions.remove(definition_id);
            debug!(definition_id = %definition_id, "owned definition removed with its table");
        }
        Ok(table)
    }

    /// Record addressed by a table-record link.
    pub fn find_record(&self, reference: &RecordRef) -> Option<&TableRecord> {
        self.table(&reference.table)
            .ok()
            .and_then(|t| t.record(&reference.record))
    }

    // ------------------------------------------------------------------
    // Structural alteration
    // ------------------------------------------------------------------

    /// Migrate every table following `definition_id` to its current field
    /// list. `original` is the storage snapshot taken before the edit.
    pub fn alter_structure(
        &mut self,
        definition_id: &TableDefinitionId,
        preserve_compatible_values: bool,
        original: &StorageSnapshot,
        registry: &TypeRegistry,
    ) -> Result<AlterationReport, SchemaError> {
        if original.definition_id() != definition_id {
            return Err(SchemaError::StaleSnapshot {
                snapshot: original.definition_id().clone(),
                definition: definition_id.clone(),
            });
        }
        let definition = self
            .definitions
            .get_mut(definition_id)
            .ok_or_else(|| SchemaError::UnknownDefinition(definition_id.clone()))?;
        let delta = definition.reconcile_storage_structure();
        let definition = &*definition;

        let plan = AlterationPlan::build(original, definition, preserve_compatible_values, registry);
        let mut report = AlterationReport::default();
        if plan.is_noop() {
            debug!(definition = %definition.name, "structure unchanged, nothing to migrate");
            return Ok(report);
        }

        for table in &mut self.tables {
            if table.definition_id() == definition_id {
                report.absorb(plan.apply(table, definition, registry)?);
            }
            report.absorb(plan.apply_nested(table, definition, registry)?);
        }

        info!(
            definition = %definition.name,
            added = delta.added.len(),
            removed = delta.removed.len(),
            tables = report.tables_altered,
            values_reset = report.values_reset,
            duplicates = report.duplicate_keys.len(),
            "structure altered"
        );
        Ok(report)
    }

    /// Edit a definition and migrate its tables in one step.
    ///
    /// The edit runs on a copy; if it fails, neither the definition nor any
    /// table changes.
    pub fn edit_definition<F>(
        &mut self,
        definition_id: &TableDefinitionId,
        preserve_compatible_values: bool,
        registry: &TypeRegistry,
        edit: F,
    ) -> Result<AlterationReport, SchemaError>
    where
        F: FnOnce(&mut TableDefinition) -> Result<(), SchemaError>,
    {
        let current = self.definition(definition_id)?;
        let snapshot = current.storage_snapshot();
        let mut edited = current.clone();
        edit(&mut edited)?;
        self.definitions.insert(definition_id.clone(), edited);
        self.alter_structure(definition_id, preserve_compatible_values, &snapshot, registry)
    }

    // ------------------------------------------------------------------
    // Lookups for editors and export
    // ------------------------------------------------------------------

    /// Values a field may take from its values source.
    pub fn values_source_candidates(
        &self,
        field: &FieldDefinition,
    ) -> Result<Vec<TaggedValue>, SchemaError> {
        match &field.values_source {
            None => Ok(Vec::new()),
            Some(ValuesSource::Fixed(values)) => Ok(values.clone()),
            Some(ValuesSource::Table(table_id)) => {
                let table = self.table(table_id)?;
                Ok(table
                    .records()
                    .iter()
                    .map(|record| {
                        TaggedValue::Link(LinkValue::Record(RecordRef {
                            table: table_id.clone(),
                            record: record.id().clone(),
                        }))
                    })
                    .collect())
            }
        }
    }

    /// Label resolver over this catalog's records.
    pub fn labels<'a>(
        &'a self,
        registry: &'a TypeRegistry,
        display: &'a DisplayOptions,
    ) -> CatalogLabels<'a> {
        CatalogLabels {
            catalog: self,
            registry,
            display,
        }
    }
}

/// Resolves record links through a [`Catalog`].
#[derive(Debug, Clone, Copy)]
pub struct CatalogLabels<'a> {
    catalog: &'a Catalog,
    registry: &'a TypeRegistry,
    display: &'a DisplayOptions,
}

impl LinkLabelResolver for CatalogLabels<'_> {
    fn record_label(&self, reference: &RecordRef) -> Option<String> {
        let table = self.catalog.table(&reference.table).ok()?;
        let definition = self.catalog.definition(table.definition_id()).ok()?;
        let record = table.record(&reference.record)?;
        record.label(definition, self.registry, self.display).ok()
    }
}
