//! In-memory delimited text transforms.
//!
//! - comma-separated: quotes doubled, every cell quoted unless
//!   `ExportOptions::quote_text` is off;
//! - tab-separated: never quoted, tabs and line breaks inside a cell are
//!   replaced;
//! - lines: one single-column row per non-blank line.
//!
//! File access stays with the caller.

use crate::config::ExportOptions;
use csv::{QuoteStyle, ReaderBuilder, WriterBuilder};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DelimitedError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Output is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DelimitedFormat {
    #[default]
    #[serde(rename = "csv")]
    Comma,
    #[serde(rename = "tsv")]
    Tab,
    #[serde(rename = "lines")]
    Lines,
}

impl fmt::Display for DelimitedFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DelimitedFormat::Comma => write!(f, "csv"),
            DelimitedFormat::Tab => write!(f, "tsv"),
            DelimitedFormat::Lines => write!(f, "lines"),
        }
    }
}

impl FromStr for DelimitedFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "csv" | "comma" => Ok(DelimitedFormat::Comma),
            "tsv" | "tab" => Ok(DelimitedFormat::Tab),
            "lines" | "txt" => Ok(DelimitedFormat::Lines),
            _ => Err(format!(
                "Invalid format: '{}'. Expected: csv, tsv, lines.",
                s
            )),
        }
    }
}

/// Split text into rows of cells. Rows may differ in length.
pub fn read_delimited(text: &str, format: DelimitedFormat) -> Result<Vec<Vec<String>>, DelimitedError> {
    let delimiter = match format {
        DelimitedFormat::Lines => {
            return Ok(text
                .lines()
                .filter(|line| !line.trim().is_empty())
                .map(|line| vec![line.to_string()])
                .collect());
        }
        DelimitedFormat::Comma => b',',
        DelimitedFormat::Tab => b'\t',
    };

    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .quoting(format == DelimitedFormat::Comma)
        .from_reader(text.as_bytes());

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok(rows)
}

/// Join rows of cells into text, one row per line. Cells are written as
/// given; quoting is done here only.
pub fn write_delimited(
    rows: &[Vec<String>],
    format: DelimitedFormat,
    options: &ExportOptions,
) -> Result<String, DelimitedError> {
    let (delimiter, quote_style) = match format {
        DelimitedFormat::Lines => {
            let mut out = String::new();
            for row in rows {
                out.push_str(&row.join(" "));
                out.push('\n');
            }
            return Ok(out);
        }
        DelimitedFormat::Comma if options.quote_text => (b',', QuoteStyle::Always),
        DelimitedFormat::Comma => (b',', QuoteStyle::Necessary),
        DelimitedFormat::Tab => (b'\t', QuoteStyle::Never),
    };

    let mut writer = WriterBuilder::new()
        .delimiter(delimiter)
        .quote_style(quote_style)
        .flexible(true)
        .from_writer(Vec::new());

    for row in rows {
        if format == DelimitedFormat::Tab {
            writer.write_record(row.iter().map(|cell| flatten_tab_cell(cell, &options.tab_replacement)))?;
        } else {
            writer.write_record(row)?;
        }
    }

    let bytes = writer.into_inner().map_err(|e| DelimitedError::Io(e.into_error()))?;
    Ok(String::from_utf8(bytes)?)
}

fn flatten_tab_cell(cell: &str, tab_replacement: &str) -> String {
    cell.replace('\t', tab_replacement)
        .replace("\r\n", " ")
        .replace(&['\r', '\n'][..], " ")
}
