//! Command line interface for Tabula
//!
//! Every command works on a single delimited text file and never needs a
//! saved catalog: the file is typed, loaded into an in-memory table and
//! reported on or written back out.

pub mod config;
pub mod convert;
pub mod error;
pub mod infer;
pub mod output;

use error::HelpfulError;
use std::path::Path;
use tabula_schema::{DelimitedFormat, DetailsConfig};

/// Read a whole input file as UTF-8 text.
pub fn read_input(path: &Path) -> anyhow::Result<String> {
    if !path.exists() {
        return Err(HelpfulError::file_not_found(path).into());
    }
    if !path.is_file() {
        return Err(HelpfulError::not_a_file(path).into());
    }
    std::fs::read_to_string(path)
        .map_err(|e| HelpfulError::cannot_read_file(path, &e.to_string()).into())
}

/// Pick the input format: explicit flag, then file extension, then config.
pub fn resolve_format(
    path: &Path,
    explicit: Option<DelimitedFormat>,
    config: &DetailsConfig,
) -> DelimitedFormat {
    if let Some(format) = explicit {
        return format;
    }
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .as_deref()
    {
        Some("csv") => DelimitedFormat::Comma,
        Some("tsv") | Some("tab") => DelimitedFormat::Tab,
        Some("txt") => DelimitedFormat::Lines,
        _ => config.import.format,
    }
}

/// Table name for a file: its stem, or "Imported".
pub fn table_name_for(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("Imported")
        .to_string()
}
