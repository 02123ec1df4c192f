//! `tabula infer`: guess a column type for every column of a file.

use super::output::{print_json, print_table, truncate};
use super::{config, read_input, resolve_format};
use anyhow::Result;
use serde::Serialize;
use std::path::PathBuf;
use tabula_schema::{generate_typed_records_list, read_delimited, DelimitedFormat, TypedImport};
use tracing::info;

const SAMPLE_WIDTH: usize = 30;

#[derive(Debug, clap::Args)]
pub struct InferArgs {
    /// Delimited text file to inspect
    pub file: PathBuf,

    /// Input format (csv, tsv, lines); guessed from the extension if omitted
    #[arg(long)]
    pub format: Option<DelimitedFormat>,

    /// Treat the first row as column names
    #[arg(long)]
    pub header: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnSummary {
    pub index: usize,
    pub name: String,
    pub data_type: String,
    /// Cells with any content
    pub non_empty: usize,
    /// First non-blank cell
    pub sample: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InferSummary {
    pub file: String,
    pub format: DelimitedFormat,
    pub has_header: bool,
    pub rows: usize,
    pub columns: Vec<ColumnSummary>,
    /// Cells that kept their provisional value
    pub unconverted: usize,
}

pub fn run(args: InferArgs) -> Result<()> {
    let config = config::load_details_config()?;
    let format = resolve_format(&args.file, args.format, &config);
    let has_header = args.header || config.import.has_header;

    let text = read_input(&args.file)?;
    let rows = read_delimited(&text, format)?;
    let typed = generate_typed_records_list(&rows, has_header);
    let data = if has_header { rows.get(1..).unwrap_or(&[]) } else { &rows[..] };

    let summary = InferSummary {
        file: args.file.display().to_string(),
        format,
        has_header,
        rows: data.len(),
        columns: summarize_columns(&typed, data),
        unconverted: typed.failures.len(),
    };
    info!(
        file = %summary.file,
        rows = summary.rows,
        columns = summary.columns.len(),
        "inferred column types"
    );

    if args.json {
        return print_json(&summary);
    }

    print_table(
        &["#", "COLUMN", "TYPE", "FILLED", "SAMPLE"],
        summary
            .columns
            .iter()
            .map(|c| {
                vec![
                    (c.index + 1).to_string(),
                    c.name.clone(),
                    c.data_type.clone(),
                    format!("{}/{}", c.non_empty, summary.rows),
                    c.sample
                        .as_deref()
                        .map(|s| truncate(s, SAMPLE_WIDTH))
                        .unwrap_or_default(),
                ]
            })
            .collect(),
    );
    if summary.unconverted > 0 {
        eprintln!(
            "{} cell(s) could not be converted to their column type",
            summary.unconverted
        );
    }
    Ok(())
}

/// One summary per typed column, `data` being the rows without the header.
pub fn summarize_columns(typed: &TypedImport, data: &[Vec<String>]) -> Vec<ColumnSummary> {
    typed
        .column_types
        .iter()
        .enumerate()
        .map(|(index, data_type)| {
            let mut cells = data
                .iter()
                .filter_map(|row| row.get(index))
                .filter(|cell| !cell.trim().is_empty());
            let sample = cells.next().cloned();
            let non_empty = cells.count() + usize::from(sample.is_some());
            ColumnSummary {
                index,
                name: typed
                    .headers
                    .as_ref()
                    .and_then(|h| h.get(index))
                    .map(|h| h.trim().to_string())
                    .filter(|h| !h.is_empty())
                    .unwrap_or_else(|| format!("Column {}", index + 1)),
                data_type: data_type.name().to_string(),
                non_empty,
                sample,
            }
        })
        .collect()
}
