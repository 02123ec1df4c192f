//! Structural alteration: migrating record data to an edited definition.
//!
//! An [`AlterationPlan`] is computed once per definition edit from the
//! pre-edit [`StorageSnapshot`] and the reconciled definition, then applied to
//! every table following that definition:
//!
//! 1. an empty storage structure deletes every record;
//! 2. slots of fields gone from storage are removed, highest original index
//!    first, so earlier removals never shift a pending one;
//! 3. a slot is preserved when the same field (by identity, at any position)
//!    existed before with an unchanged data type;
//! 4. every other slot is overwritten with the field's initializer, or null;
//! 5. when the unique key changed, duplicate keys are reported.
//!
//! Each table is migrated on a working copy of its records and committed only
//! when the whole table succeeded.

use crate::config::DisplayOptions;
use crate::definition::{StorageSnapshot, TableDefinition};
use crate::error::SchemaError;
use crate::record::TableRecord;
use crate::registry::TypeRegistry;
use crate::table::Table;
use crate::value::TaggedValue;
use std::collections::{BTreeMap, HashSet};
use tabula_ids::{FieldId, RecordId, TableId};
use tracing::{debug, warn};

/// What happens to one slot of the new storage layout.
#[derive(Debug, Clone, PartialEq)]
pub enum SlotAction {
    Preserve,
    /// Overwrite with this value; `None` stores null
    Initialize(Option<TaggedValue>),
}

/// Records sharing one unique key after an alteration.
#[derive(Debug, Clone, PartialEq)]
pub struct DuplicateKey {
    pub table_id: TableId,
    pub key: String,
    pub records: Vec<RecordId>,
}

/// Summary of one structural alteration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlterationReport {
    pub tables_altered: usize,
    pub records_deleted: usize,
    pub slots_removed: usize,
    pub values_reset: usize,
    pub duplicate_keys: Vec<DuplicateKey>,
}

impl AlterationReport {
    pub(crate) fn absorb(&mut self, other: AlterationReport) {
        self.tables_altered += other.tables_altered;
        self.records_deleted += other.records_deleted;
        self.slots_removed += other.slots_removed;
        self.values_reset += other.values_reset;
        self.duplicate_keys.extend(other.duplicate_keys);
    }
}

/// Per-definition migration plan, shared by every dependent table.
#[derive(Debug, Clone, PartialEq)]
pub struct AlterationPlan {
    /// Original storage indices to drop, descending
    removed_slots: Vec<usize>,
    /// One action per new storage index
    actions: Vec<SlotAction>,
    preserve_compatible_values: bool,
    field_set_changed: bool,
    unique_key_changed: bool,
    unique_key: Vec<FieldId>,
}

impl AlterationPlan {
    /// Plan the migration from `original` to the (already reconciled)
    /// `definition`.
    pub fn build(
        original: &StorageSnapshot,
        definition: &TableDefinition,
        preserve_compatible_values: bool,
        registry: &TypeRegistry,
    ) -> Self {
        let new_fields = definition.storage_fields();
        let kept: HashSet<&FieldId> = new_fields.iter().map(|f| f.id()).collect();

        let mut removed_slots: Vec<usize> = original
            .fields()
            .iter()
            .filter(|f| !kept.contains(&f.field_id))
            .map(|f| f.storage_index)
            .collect();
        removed_slots.sort_unstable_by(|a, b| b.cmp(a));

        let actions: Vec<SlotAction> = new_fields
            .iter()
            .map(|field| {
                let unchanged = original
                    .find(field.id())
                    .map(|before| before.field_type == *field.field_type())
                    .unwrap_or(false);
                if preserve_compatible_values && unchanged {
                    SlotAction::Preserve
                } else {
                    SlotAction::Initialize(field.explicit_initializer(registry))
                }
            })
            .collect();

        let field_set_changed = !removed_slots.is_empty()
            || original.len() != new_fields.len()
            || actions.iter().any(|a| *a != SlotAction::Preserve)
            || new_fields.iter().any(|f| {
                original
                    .find(f.id())
                    .map(|before| Some(before.storage_index) != f.storage_index())
                    .unwrap_or(true)
            });
        let unique_key_changed = original.unique_key() != definition.unique_key_ids();

        Self {
            removed_slots,
            actions,
            preserve_compatible_values,
            field_set_changed,
            unique_key_changed,
            unique_key: definition.unique_key_ids().to_vec(),
        }
    }

    pub fn actions(&self) -> &[SlotAction] {
        &self.actions
    }

    pub fn removed_slots(&self) -> &[usize] {
        &self.removed_slots
    }

    pub fn field_set_changed(&self) -> bool {
        self.field_set_changed
    }

    pub fn unique_key_changed(&self) -> bool {
        self.unique_key_changed
    }

    /// Neither the fields nor the unique key changed.
    pub fn is_noop(&self) -> bool {
        !self.field_set_changed && !self.unique_key_changed
    }

    /// Migrate one table. On error the table is left as it was.
    pub fn apply(
        &self,
        table: &mut Table,
        definition: &TableDefinition,
        registry: &TypeRegistry,
    ) -> Result<AlterationReport, SchemaError> {
        table.ensure_follows(definition)?;
        let mut report = AlterationReport::default();
        if self.is_noop() {
            return Ok(report);
        }
        report.tables_altered = 1;

        if self.actions.is_empty() {
            report.records_deleted = table.len();
            table.clear();
            debug!(table_id = %table.id(), records = report.records_deleted, "storage is empty, records deleted");
            return Ok(report);
        }

        let mut records: Vec<TableRecord> = table.records().to_vec();
        if self.field_set_changed {
            for record in &mut records {
                self.migrate_record(record, &mut report);
            }
        }

        if self.unique_key_changed && !self.unique_key.is_empty() {
            report.duplicate_keys =
                find_duplicate_keys(table.id(), &records, definition, registry)?;
            for duplicate in &report.duplicate_keys {
                warn!(
                    table_id = %duplicate.table_id,
                    key = %duplicate.key,
                    records = duplicate.records.len(),
                    "duplicate unique key after alteration"
                );
            }
        }

        table.replace_records(records);
        debug!(
            table_id = %table.id(),
            slots_removed = report.slots_removed,
            values_reset = report.values_reset,
            "table altered"
        );
        Ok(report)
    }

    fn migrate_record(&self, record: &mut TableRecord, report: &mut AlterationReport) {
        if !self.preserve_compatible_values {
            record.clear_values();
        } else {
            for &index in &self.removed_slots {
                record.remove_slot(index);
                report.slots_removed += 1;
            }
        }

        for (index, action) in self.actions.iter().enumerate() {
            if let SlotAction::Initialize(initial) = action {
                record.write_slot(index, initial.clone().unwrap_or_default());
                report.values_reset += 1;
            }
        }
    }

    /// Apply to every table nested in the values of `table`'s records,
    /// at any depth, that follows `definition`.
    pub fn apply_nested(
        &self,
        table: &mut Table,
        definition: &TableDefinition,
        registry: &TypeRegistry,
    ) -> Result<AlterationReport, SchemaError> {
        let mut report = AlterationReport::default();
        for record in table.records_mut() {
            for value in record.values_mut() {
                if let TaggedValue::Table(nested) = value {
                    if nested.definition_id() == definition.id() {
                        report.absorb(self.apply(nested, definition, registry)?);
                    }
                    report.absorb(self.apply_nested(nested, definition, registry)?);
                }
            }
        }
        Ok(report)
    }
}

fn find_duplicate_keys(
    table_id: &TableId,
    records: &[TableRecord],
    definition: &TableDefinition,
    registry: &TypeRegistry,
) -> Result<Vec<DuplicateKey>, SchemaError> {
    let display = DisplayOptions::default();
    let mut groups: BTreeMap<String, Vec<RecordId>> = BTreeMap::new();
    for record in records {
        let key = record.unique_key(definition, registry, &display)?;
        groups.entry(key).or_default().push(record.id().clone());
    }
    Ok(groups
        .into_iter()
        .filter(|(_, ids)| ids.len() > 1)
        .map(|(key, records)| DuplicateKey {
            table_id: table_id.clone(),
            key,
            records,
        })
        .collect())
}
