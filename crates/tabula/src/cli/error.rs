//! Helpful error types for CLI commands
//!
//! Every error includes:
//! - What went wrong
//! - Context about the situation
//! - Suggestions for how to fix it

use std::fmt;
use std::path::Path;

/// An error with helpful context and suggestions
#[derive(Debug)]
pub struct HelpfulError {
    /// The main error message
    pub message: String,
    /// Additional context about what was happening
    pub context: Option<String>,
    /// Suggestions for how to fix the error
    pub suggestions: Vec<String>,
}

impl HelpfulError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            context: None,
            suggestions: Vec::new(),
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    pub fn with_suggestions(
        mut self,
        suggestions: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.suggestions.extend(suggestions.into_iter().map(|s| s.into()));
        self
    }

    // === Common error constructors ===

    pub fn file_not_found(path: &Path) -> Self {
        Self::new(format!("File not found: {}", path.display()))
            .with_context("The specified file does not exist")
            .with_suggestions([
                format!("TRY: Check if the file exists: ls -la {}", path.display()),
                format!(
                    "TRY: Look for similar files: ls {}",
                    path.parent()
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|| ".".to_string())
                ),
            ])
    }

    pub fn not_a_file(path: &Path) -> Self {
        Self::new(format!("Not a file: {}", path.display()))
            .with_context("Tabula reads one delimited text file at a time")
            .with_suggestion(format!("TRY: List the directory: ls {}", path.display()))
    }

    /// File cannot be read (permission or encoding error)
    pub fn cannot_read_file(path: &Path, reason: &str) -> Self {
        Self::new(format!("Cannot read file: {}", path.display()))
            .with_context(reason.to_string())
            .with_suggestions([
                format!("TRY: Check file permissions: ls -la {}", path.display()),
                "TRY: Make sure the file is UTF-8 text".to_string(),
            ])
    }

    pub fn invalid_type_list(entry: &str, reason: &str) -> Self {
        Self::new(format!("Invalid column type: '{}'", entry))
            .with_context(reason.to_string())
            .with_suggestions([
                "TRY: Valid types: text, number, datetime, date, time, yesno".to_string(),
                "TRY: Leave an entry empty to keep the inferred type: --types text,,date"
                    .to_string(),
            ])
    }

    pub fn column_count_mismatch(given: usize, columns: usize) -> Self {
        Self::new(format!(
            "{} column types given, the file has {} columns",
            given, columns
        ))
        .with_context("--types assigns one type per column, left to right")
        .with_suggestion("TRY: Run 'tabula infer FILE' to see the columns")
    }
}

impl fmt::Display for HelpfulError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ERROR: {}", self.message)?;

        if let Some(ctx) = &self.context {
            writeln!(f, "CONTEXT: {}", ctx)?;
        }

        if !self.suggestions.is_empty() {
            writeln!(f)?;
            for suggestion in &self.suggestions {
                writeln!(f, "  {}", suggestion)?;
            }
        }

        Ok(())
    }
}

impl std::error::Error for HelpfulError {}
