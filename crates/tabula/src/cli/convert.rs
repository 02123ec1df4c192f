//! `tabula convert`: load a file into a typed table and write it back out
//! in another delimited format.

use super::error::HelpfulError;
use super::{config, read_input, resolve_format, table_name_for};
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::str::FromStr;
use tabula_schema::{
    build_definition_from_inferred, export_table, generate_typed_records_list, import_rows_into,
    read_delimited, write_delimited, DataType, DelimitedFormat, DetailsConfig, ImportReport,
    NoLinkLabels, Table, TypeRegistry,
};
use tracing::info;

#[derive(Debug, clap::Args)]
pub struct ConvertArgs {
    /// Delimited text file to convert
    pub file: PathBuf,

    /// Output format (csv, tsv, lines)
    #[arg(long)]
    pub to: DelimitedFormat,

    /// Input format; guessed from the extension if omitted
    #[arg(long)]
    pub format: Option<DelimitedFormat>,

    /// Treat the first row as column names and write them back out
    #[arg(long)]
    pub header: bool,

    /// Comma separated column types overriding inference; empty keeps the guess
    #[arg(long)]
    pub types: Option<String>,

    /// Write here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Everything `convert_text` needs besides the text itself.
#[derive(Debug, Clone)]
pub struct ConvertPlan {
    pub table_name: String,
    pub from: DelimitedFormat,
    pub to: DelimitedFormat,
    pub has_header: bool,
    /// One entry per column; `None` keeps the inferred type
    pub type_overrides: Option<Vec<Option<DataType>>>,
}

pub fn run(args: ConvertArgs) -> Result<()> {
    let config = config::load_details_config()?;
    let plan = ConvertPlan {
        table_name: table_name_for(&args.file),
        from: resolve_format(&args.file, args.format, &config),
        to: args.to,
        has_header: args.header || config.import.has_header,
        type_overrides: args.types.as_deref().map(parse_type_list).transpose()?,
    };

    let text = read_input(&args.file)?;
    let (converted, report) = convert_text(&text, &plan, &config)?;

    for failure in &report.failures {
        eprintln!(
            "row {}, column {}: {}",
            failure.row + 1,
            failure.column + 1,
            failure.violation
        );
    }

    match &args.output {
        Some(path) => {
            std::fs::write(path, converted)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!(
                output = %path.display(),
                records = report.records_added,
                "conversion written"
            );
        }
        None => print!("{}", converted),
    }
    Ok(())
}

/// Parse `--types`: comma separated type names, blanks keep the inferred type.
pub fn parse_type_list(list: &str) -> Result<Vec<Option<DataType>>, HelpfulError> {
    list.split(',')
        .map(|entry| {
            let entry = entry.trim();
            if entry.is_empty() {
                return Ok(None);
            }
            DataType::from_str(entry)
                .map(Some)
                .map_err(|reason| HelpfulError::invalid_type_list(entry, &reason))
        })
        .collect()
}

/// Type `text`, import it into a fresh table and export it in `plan.to`.
pub fn convert_text(
    text: &str,
    plan: &ConvertPlan,
    config: &DetailsConfig,
) -> Result<(String, ImportReport)> {
    let rows = read_delimited(text, plan.from)?;
    let typed = generate_typed_records_list(&rows, plan.has_header);

    let mut column_types = typed.column_types;
    if let Some(overrides) = &plan.type_overrides {
        if overrides.len() != column_types.len() {
            return Err(
                HelpfulError::column_count_mismatch(overrides.len(), column_types.len()).into(),
            );
        }
        for (column_type, chosen) in column_types.iter_mut().zip(overrides) {
            if let Some(chosen) = chosen {
                *column_type = chosen.clone();
            }
        }
    }

    let registry = TypeRegistry::with_predefined();
    let definition =
        build_definition_from_inferred(&plan.table_name, typed.headers.as_deref(), &column_types)?;
    let mut table = Table::owned(&definition);
    let data = if plan.has_header { rows.get(1..).unwrap_or(&[]) } else { &rows[..] };
    let report = import_rows_into(&mut table, &definition, &registry, data)?;

    let exported = export_table(
        &table,
        &definition,
        &registry,
        &config.export,
        &NoLinkLabels,
        plan.has_header,
    )?;
    let converted = write_delimited(&exported, plan.to, &config.export)?;
    Ok((converted, report))
}
