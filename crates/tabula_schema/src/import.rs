//! Raw text rows to typed values.
//!
//! Imports are best effort: a cell that cannot be converted is reported as a
//! [`CellFailure`] and logged, and the rest of the batch carries on.

use crate::data_type::{convert_to_most_suited_basic_type, wider_basic_data_type, DataType};
use crate::definition::{FieldKey, TableDefinition};
use crate::error::{SchemaError, Violation, ViolationKind};
use crate::field::FieldDefinition;
use crate::record::{TableRecord, WriteOutcome};
use crate::registry::TypeRegistry;
use crate::table::Table;
use crate::value::TaggedValue;
use tracing::{info, warn};

/// A cell that could not be converted.
#[derive(Debug, Clone, PartialEq)]
pub struct CellFailure {
    /// Data row index, header excluded
    pub row: usize,
    pub column: usize,
    pub text: String,
    pub violation: Violation,
}

/// Rows typed column by column.
#[derive(Debug, Clone, PartialEq)]
pub struct TypedImport {
    pub headers: Option<Vec<String>>,
    /// One predefined basic type per column
    pub column_types: Vec<DataType>,
    pub rows: Vec<Vec<TaggedValue>>,
    pub failures: Vec<CellFailure>,
}

/// Outcome of populating an existing table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportReport {
    pub records_added: usize,
    pub failures: Vec<CellFailure>,
}

/// Type every column of `rows`.
///
/// The first pass picks the most suited basic type per cell (Number, then
/// DateTime, else Text). Each column then settles on the common type of its
/// cells, and cells whose provisional type differs are re-parsed. Blank cells
/// are null and do not take part in the choice. A cell that fails to re-parse
/// keeps its provisional value.
pub fn generate_typed_records_list(rows: &[Vec<String>], has_header: bool) -> TypedImport {
    let (headers, data) = match rows.split_first() {
        Some((first, rest)) if has_header => (Some(first.clone()), rest),
        _ => (None, rows),
    };
    let width = data
        .iter()
        .map(Vec::len)
        .chain(headers.iter().map(Vec::len))
        .max()
        .unwrap_or(0);

    // Pass 1
    let provisional: Vec<Vec<Option<(DataType, TaggedValue)>>> = data
        .iter()
        .map(|row| {
            (0..width)
                .map(|column| {
                    row.get(column)
                        .filter(|text| !text.trim().is_empty())
                        .map(|text| convert_to_most_suited_basic_type(text))
                })
                .collect()
        })
        .collect();

    let column_types: Vec<DataType> = (0..width)
        .map(|column| {
            provisional
                .iter()
                .filter_map(|row| row[column].as_ref().map(|(t, _)| t))
                .fold(None, |acc: Option<DataType>, t| match acc {
                    None => Some(t.clone()),
                    Some(wider) => Some(wider_basic_data_type(&wider, t)),
                })
                .unwrap_or_else(DataType::text)
        })
        .collect();

    // Pass 2
    let mut failures = Vec::new();
    let mut typed_rows = Vec::with_capacity(provisional.len());
    for (row_index, row) in provisional.into_iter().enumerate() {
        let mut typed = Vec::with_capacity(width);
        for (column, cell) in row.into_iter().enumerate() {
            let column_type = &column_types[column];
            let value = match cell {
                None => TaggedValue::Null,
                Some((cell_type, value)) if cell_type == *column_type => value,
                Some((_, value)) => {
                    let text = data[row_index][column].as_str();
                    match column_type.try_parse_value_from(text) {
                        Some(reparsed) => reparsed,
                        None => {
                            let violation = Violation::parse_failure(column_type.name(), text)
                                .with_row(row_index)
                                .with_column(column);
                            warn!(row = row_index, column, text, "cell kept unconverted");
                            failures.push(CellFailure {
                                row: row_index,
                                column,
                                text: text.to_string(),
                                violation,
                            });
                            value
                        }
                    }
                }
            };
            typed.push(value);
        }
        typed_rows.push(typed);
    }

    TypedImport {
        headers,
        column_types,
        rows: typed_rows,
        failures,
    }
}

/// New definition with one field per inferred column. Fields are named after
/// the headers when present, else "Column N".
pub fn build_definition_from_inferred(
    name: &str,
    headers: Option<&[String]>,
    column_types: &[DataType],
) -> Result<TableDefinition, SchemaError> {
    let fields = column_types
        .iter()
        .enumerate()
        .map(|(column, data_type)| {
            let field_name = headers
                .and_then(|h| h.get(column))
                .map(|h| h.trim())
                .filter(|h| !h.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| format!("Column {}", column + 1));
            FieldDefinition::new(field_name, data_type.clone())
        })
        .collect();
    TableDefinition::with_fields(name, fields)
}

/// Append one record per row, cell `i` going to the field at logical
/// position `i`. Rejected cells keep the field's initializer; cells beyond
/// the last field are reported.
pub fn import_rows_into(
    table: &mut Table,
    definition: &TableDefinition,
    registry: &TypeRegistry,
    rows: &[Vec<String>],
) -> Result<ImportReport, SchemaError> {
    table.ensure_follows(definition)?;
    let mut report = ImportReport::default();

    let mut records = Vec::with_capacity(rows.len());
    for (row_index, row) in rows.iter().enumerate() {
        let mut record = TableRecord::initialized(definition, registry);
        for (column, text) in row.iter().enumerate() {
            if column >= definition.len() {
                let violation = Violation::new(
                    ViolationKind::ColumnCountMismatch,
                    format!("row has {} cells, the table has {} fields", row.len(), definition.len()),
                )
                .with_row(row_index)
                .with_column(column);
                warn!(row = row_index, column, "extra cell ignored");
                report.failures.push(CellFailure {
                    row: row_index,
                    column,
                    text: text.clone(),
                    violation,
                });
                break;
            }
            let field = definition.field(FieldKey::Index(column))?;
            let outcome =
                record.set_stored_value(field, TaggedValue::Text(text.clone()), registry)?;
            if let WriteOutcome::Rejected(violation) = outcome {
                let violation = violation.with_row(row_index).with_column(column);
                warn!(
                    row = row_index,
                    field = %field.name,
                    text = %text,
                    reason = %violation,
                    "cell rejected during import"
                );
                report.failures.push(CellFailure {
                    row: row_index,
                    column,
                    text: text.clone(),
                    violation,
                });
            }
        }
        records.push(record);
    }

    // Every row is parsed before anything is appended
    report.records_added = records.len();
    for record in records {
        table.push_record(record);
    }
    info!(
        table_id = %table.id(),
        records = report.records_added,
        failures = report.failures.len(),
        "import finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn rows(data: &[&[&str]]) -> Vec<Vec<String>> {
        data.iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    #[test]
    fn test_column_typing() {
        let typed = generate_typed_records_list(
            &rows(&[&["id", "when", "what"], &["1", "2020-01-01", "x"], &["2", "2021-06-30", "7"]]),
            true,
        );
        assert_eq!(typed.headers.as_ref().unwrap()[1], "when");
        assert_eq!(
            typed.column_types,
            vec![DataType::number(), DataType::date_time(), DataType::text()]
        );
        assert_eq!(typed.rows[1][0], TaggedValue::Number(Decimal::from(2)));
        // Provisionally a number, widened to text
        assert_eq!(typed.rows[1][2], TaggedValue::from("7"));
        assert!(typed.failures.is_empty());
    }

    #[test]
    fn test_blank_cells_do_not_widen() {
        let typed = generate_typed_records_list(&rows(&[&["1", ""], &["", ""], &["3"]]), false);
        assert_eq!(typed.column_types, vec![DataType::number(), DataType::text()]);
        assert_eq!(typed.rows[1][0], TaggedValue::Null);
        assert_eq!(typed.rows[2].len(), 2);
    }

    #[test]
    fn test_build_definition() {
        let headers = vec!["Name".to_string(), " ".to_string()];
        let definition = build_definition_from_inferred(
            "Imported",
            Some(&headers),
            &[DataType::text(), DataType::number(), DataType::date_time()],
        )
        .unwrap();
        let names: Vec<_> = definition.field_definitions().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["Name", "Column 2", "Column 3"]);
        assert_eq!(definition.field_definitions()[2].storage_index(), Some(2));
    }

    #[test]
    fn test_import_rows_reports_bad_cells() {
        let definition = build_definition_from_inferred(
            "Events",
            None,
            &[DataType::number(), DataType::date_time()],
        )
        .unwrap();
        let registry = TypeRegistry::with_predefined();
        let mut table = Table::owned(&definition);

        let report = import_rows_into(
            &mut table,
            &definition,
            &registry,
            &rows(&[&["1", "2020-01-01"], &["2", "bad-date", "extra"]]),
        )
        .unwrap();

        assert_eq!(report.records_added, 2);
        assert_eq!(report.failures.len(), 2);
        assert_eq!(report.failures[0].violation.kind, ViolationKind::ParseFailure);
        assert_eq!((report.failures[0].row, report.failures[0].column), (1, 1));
        assert_eq!(report.failures[1].violation.kind, ViolationKind::ColumnCountMismatch);

        let bad = table.records()[1]
            .get(&definition, &registry, FieldKey::Index(1))
            .unwrap();
        assert!(bad.is_null());
    }
}
