//! Record values to text cells.

use crate::config::ExportOptions;
use crate::data_type::{DataType, DataTypeKind};
use crate::definition::{FieldKey, TableDefinition};
use crate::error::SchemaError;
use crate::record::TableRecord;
use crate::registry::TypeRegistry;
use crate::table::Table;
use crate::value::{IdeaRef, LinkValue, RecordRef, TaggedValue};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// Renders references by their display label instead of raw identifiers.
pub trait LinkLabelResolver {
    /// Label of a referenced record, if it can be found.
    fn record_label(&self, reference: &RecordRef) -> Option<String>;

    fn idea_label(&self, idea: &IdeaRef) -> String {
        idea.label.clone()
    }
}

/// Resolver that knows no records; record links export as their id.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLinkLabels;

impl LinkLabelResolver for NoLinkLabels {
    fn record_label(&self, _reference: &RecordRef) -> Option<String> {
        None
    }
}

/// One logical value as an export cell.
pub fn export_value(
    field_type: &DataType,
    value: &TaggedValue,
    options: &ExportOptions,
    labels: &dyn LinkLabelResolver,
) -> String {
    match value {
        TaggedValue::Null => String::new(),
        TaggedValue::Text(text) => text.clone(),
        TaggedValue::DateTime(dt) => {
            let pattern = match field_type.kind() {
                DataTypeKind::DateTime(parts) => match (parts.has_date, parts.has_time) {
                    (true, false) => &options.date_format,
                    (false, true) => &options.time_format,
                    _ => &options.date_time_format,
                },
                _ => &options.date_time_format,
            };
            dt.format(pattern).to_string()
        }
        TaggedValue::Link(LinkValue::Record(reference)) => labels
            .record_label(reference)
            .unwrap_or_else(|| reference.record.to_string()),
        TaggedValue::Link(LinkValue::Idea(idea)) => labels.idea_label(idea),
        TaggedValue::Picture(picture) => STANDARD.encode(&picture.bytes),
        _ => field_type.format_value(value),
    }
}

impl TableRecord {
    /// Export cells for a subset of fields, in the order asked.
    pub fn get_values_for_export(
        &self,
        definition: &TableDefinition,
        registry: &TypeRegistry,
        keys: &[FieldKey<'_>],
        options: &ExportOptions,
        labels: &dyn LinkLabelResolver,
    ) -> Result<Vec<String>, SchemaError> {
        keys.iter()
            .map(|key| {
                let field = definition.field(*key)?;
                let value = self.get_stored_value(field, registry)?;
                Ok(export_value(field.field_type(), &value, options, labels))
            })
            .collect()
    }
}

/// Every record of `table` as rows of cells, fields in logical order,
/// optionally preceded by a header row of field names.
pub fn export_table(
    table: &Table,
    definition: &TableDefinition,
    registry: &TypeRegistry,
    options: &ExportOptions,
    labels: &dyn LinkLabelResolver,
    include_header: bool,
) -> Result<Vec<Vec<String>>, SchemaError> {
    table.ensure_follows(definition)?;
    let keys: Vec<FieldKey<'_>> = (0..definition.len()).map(FieldKey::Index).collect();

    let mut rows = Vec::with_capacity(table.len() + 1);
    if include_header {
        rows.push(
            definition
                .field_definitions()
                .iter()
                .map(|f| f.name.clone())
                .collect(),
        );
    }
    for record in table.records() {
        rows.push(record.get_values_for_export(definition, registry, &keys, options, labels)?);
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delimited::{read_delimited, write_delimited, DelimitedFormat};
    use crate::field::FieldDefinition;
    use crate::value::PictureData;
    use chrono::NaiveDate;
    use tabula_ids::{RecordId, TableId};

    struct FixedLabels(RecordRef);

    impl LinkLabelResolver for FixedLabels {
        fn record_label(&self, reference: &RecordRef) -> Option<String> {
            (*reference == self.0).then(|| "Ann".to_string())
        }
    }

    #[test]
    fn test_dates_follow_export_formats() {
        let options = ExportOptions {
            date_format: "%d.%m.%Y".to_string(),
            ..ExportOptions::default()
        };
        let dt = NaiveDate::from_ymd_opt(2024, 5, 31).unwrap().and_hms_opt(0, 0, 0).unwrap();
        let value = TaggedValue::DateTime(dt);

        assert_eq!(export_value(&DataType::date(), &value, &options, &NoLinkLabels), "31.05.2024");
        assert_eq!(
            export_value(&DataType::date_time(), &value, &options, &NoLinkLabels),
            "2024-05-31 00:00:00"
        );
        assert_eq!(export_value(&DataType::time(), &value, &options, &NoLinkLabels), "00:00:00");
    }

    #[test]
    fn test_text_cells_quoted_once() {
        let options = ExportOptions {
            quote_text: true,
            ..ExportOptions::default()
        };
        let text = TaggedValue::from("say \"hi\"");
        assert_eq!(
            export_value(&DataType::text(), &text, &options, &NoLinkLabels),
            "say \"hi\""
        );

        let definition = TableDefinition::with_fields(
            "Person",
            vec![FieldDefinition::new("Name", DataType::text())],
        )
        .unwrap();
        let registry = TypeRegistry::with_predefined();
        let mut table = Table::owned(&definition);
        for name in ["Ann", "say \"hi\""] {
            let outcome = table
                .add_record(&definition, &registry)
                .unwrap()
                .set(&definition, &registry, FieldKey::Index(0), TaggedValue::from(name))
                .unwrap();
            assert!(outcome.is_stored());
        }

        let rows = export_table(&table, &definition, &registry, &options, &NoLinkLabels, false)
            .unwrap();
        let csv = write_delimited(&rows, DelimitedFormat::Comma, &options).unwrap();
        assert_eq!(csv, "\"Ann\"\n\"say \"\"hi\"\"\"\n");
        let back = read_delimited(&csv, DelimitedFormat::Comma).unwrap();
        assert_eq!(back[0][0], "Ann");
        assert_eq!(back[1][0], "say \"hi\"");
    }

    #[test]
    fn test_links_render_by_label() {
        let reference = RecordRef {
            table: TableId::new(),
            record: RecordId::new(),
        };
        let labels = FixedLabels(reference.clone());
        let options = ExportOptions::default();
        let value = TaggedValue::Link(LinkValue::Record(reference.clone()));
        assert_eq!(export_value(&DataType::record_link(), &value, &options, &labels), "Ann");
        assert_eq!(
            export_value(&DataType::record_link(), &value, &options, &NoLinkLabels),
            reference.record.to_string()
        );

        let idea = TaggedValue::Link(LinkValue::Idea(IdeaRef {
            id: "n1".to_string(),
            label: "Root idea".to_string(),
        }));
        assert_eq!(export_value(&DataType::idea_link(), &idea, &options, &labels), "Root idea");
    }

    #[test]
    fn test_picture_as_base64() {
        let value = TaggedValue::Picture(PictureData {
            format: "png".to_string(),
            bytes: vec![1, 2, 3],
        });
        assert_eq!(
            export_value(&DataType::picture(), &value, &ExportOptions::default(), &NoLinkLabels),
            "AQID"
        );
    }

    #[test]
    fn test_export_table() {
        let definition = TableDefinition::with_fields(
            "Person",
            vec![
                FieldDefinition::new("Name", DataType::text()),
                FieldDefinition::new("Member", DataType::yes_no()),
            ],
        )
        .unwrap();
        let registry = TypeRegistry::with_predefined();
        let mut table = Table::owned(&definition);
        table
            .add_record(&definition, &registry)
            .unwrap()
            .set_values(
                &definition,
                &registry,
                vec![
                    (FieldKey::Index(0), TaggedValue::from("Ann")),
                    (FieldKey::Index(1), TaggedValue::from("yes")),
                ],
            )
            .unwrap();

        let rows = export_table(
            &table,
            &definition,
            &registry,
            &ExportOptions::default(),
            &NoLinkLabels,
            true,
        )
        .unwrap();
        assert_eq!(rows[0], vec!["Name".to_string(), "Member".to_string()]);
        assert_eq!(rows[1], vec!["Ann".to_string(), "Yes".to_string()]);
    }
}
