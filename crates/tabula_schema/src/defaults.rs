//! Default values for the details configuration.

/// Separator between unique-key values.
pub const DEFAULT_KEY_SEPARATOR: &str = "|";

/// Separator between label values.
pub const DEFAULT_LABEL_SEPARATOR: &str = " ";

/// Separator between the values of a whole-record rendering.
pub const DEFAULT_RECORD_SEPARATOR: &str = ", ";

/// Export format for date-and-time values.
pub const DEFAULT_EXPORT_DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Export format for date-only values.
pub const DEFAULT_EXPORT_DATE_FORMAT: &str = "%Y-%m-%d";

/// Export format for time-only values.
pub const DEFAULT_EXPORT_TIME_FORMAT: &str = "%H:%M:%S";

/// Stand-in for tab characters inside tab-separated cells.
pub const DEFAULT_TAB_REPLACEMENT: &str = "    ";

/// Config file name under the tabula home directory.
pub const CONFIG_FILE_NAME: &str = "config.toml";
