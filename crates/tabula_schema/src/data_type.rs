//! Data types: what a field value *is* and how it parses, validates and formats.
//!
//! A [`DataType`] is a named, identified instance of a [`DataTypeKind`]. Two
//! data types are equal iff their [`DataTypeId`]s match, regardless of name or
//! kind parameters, so cloned schemas keep comparing equal to the originals.
//!
//! # Basic vs. structured types
//!
//! Text, Number, DateTime and Choice are *basic*: they hold a primitive value
//! that can be read from and written to plain text. Picture, File, the link
//! variants and nested Table reference or embed other structures.

use crate::date_formats::{base_date, parse_date, parse_date_time, parse_time};
use crate::error::{Violation, ViolationKind};
use crate::value::{ContainerType, LinkValue, TaggedValue, RAW_DATE_TIME_FORMAT};
use chrono::{NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::Path;
use std::str::FromStr;
use tabula_ids::{DataTypeId, TableDefinitionId};
use url::Url;

// ============================================================================
// Predefined type identifiers
// ============================================================================

const TEXT_ID: u128 = 1;
const NUMBER_ID: u128 = 2;
const DATE_TIME_ID: u128 = 3;
const DATE_ID: u128 = 4;
const TIME_ID: u128 = 5;
const YES_NO_ID: u128 = 6;
const PICTURE_ID: u128 = 7;
const FILE_ID: u128 = 8;
const INTERNAL_LINK_ID: u128 = 9;
const RESOURCE_LINK_ID: u128 = 10;
const IDEA_LINK_ID: u128 = 11;
const RECORD_LINK_ID: u128 = 12;

/// Digits of the predefined Number type.
pub const DEFAULT_INTEGER_DIGITS: u8 = 20;
pub const DEFAULT_DECIMAL_DIGITS: u8 = 8;

// ============================================================================
// Kind parameters
// ============================================================================

/// Text constraints.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TextFormat {
    /// Maximum length in characters; `None` is unlimited
    pub max_length: Option<usize>,
}

/// Number constraints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberFormat {
    /// Maximum digits before the decimal point
    pub integer_digits: u8,
    /// Maximum digits after the decimal point
    pub decimal_digits: u8,
    pub min: Option<Decimal>,
    pub max: Option<Decimal>,
}

impl Default for NumberFormat {
    fn default() -> Self {
        Self {
            integer_digits: DEFAULT_INTEGER_DIGITS,
            decimal_digits: DEFAULT_DECIMAL_DIGITS,
            min: None,
            max: None,
        }
    }
}

/// Which components a DateTime type carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateTimeParts {
    pub has_date: bool,
    pub has_time: bool,
}

impl DateTimeParts {
    pub const DATE_TIME: DateTimeParts = DateTimeParts { has_date: true, has_time: true };
    pub const DATE: DateTimeParts = DateTimeParts { has_date: true, has_time: false };
    pub const TIME: DateTimeParts = DateTimeParts { has_date: false, has_time: true };

    /// strftime pattern used for display.
    pub fn display_format(&self) -> &'static str {
        match (self.has_date, self.has_time) {
            (true, true) => RAW_DATE_TIME_FORMAT,
            (true, false) => "%Y-%m-%d",
            (false, true) => "%H:%M:%S",
            (false, false) => "",
        }
    }
}

/// One enumerated choice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceOption {
    pub code: u8,
    pub text: String,
}

impl ChoiceOption {
    pub fn new(code: u8, text: impl Into<String>) -> Self {
        Self {
            code,
            text: text.into(),
        }
    }
}

/// Choice constraints: the declared options, in display order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChoiceFormat {
    pub options: Vec<ChoiceOption>,
}

impl ChoiceFormat {
    pub fn option(&self, code: u8) -> Option<&ChoiceOption> {
        self.options.iter().find(|o| o.code == code)
    }

    /// Two-valued choices can be exposed to callers as booleans.
    pub fn is_two_valued(&self) -> bool {
        self.options.len() == 2
    }

    /// Codes representing (false, true) for a two-valued choice.
    pub fn boolean_codes(&self) -> Option<(u8, u8)> {
        match self.options.as_slice() {
            [no, yes] => Some((no.code, yes.code)),
            _ => None,
        }
    }
}

/// What a link data type points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkKind {
    /// A property of the owning entity
    Internal,
    /// A file, folder or web address
    Resource,
    /// A node of the host graph model
    Idea,
    /// A record of a table
    TableRecord,
}

impl LinkKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkKind::Internal => "internal_link",
            LinkKind::Resource => "resource_link",
            LinkKind::Idea => "idea_link",
            LinkKind::TableRecord => "record_link",
        }
    }

    fn accepts(&self, link: &LinkValue) -> bool {
        matches!(
            (self, link),
            (LinkKind::Internal, LinkValue::Internal { .. })
                | (LinkKind::Resource, LinkValue::Resource { .. })
                | (LinkKind::Idea, LinkValue::Idea(_))
                | (LinkKind::TableRecord, LinkValue::Record(_))
        )
    }
}

/// The closed set of data type variants.
#[derive(Debug, Clone, PartialEq)]
pub enum DataTypeKind {
    Text(TextFormat),
    Number(NumberFormat),
    DateTime(DateTimeParts),
    Choice(ChoiceFormat),
    Picture,
    File,
    Link(LinkKind),
    /// Nested table following the given definition
    Table(TableDefinitionId),
}

impl DataTypeKind {
    pub fn kind_name(&self) -> &'static str {
        match self {
            DataTypeKind::Text(_) => "text",
            DataTypeKind::Number(_) => "number",
            DataTypeKind::DateTime(parts) => match (parts.has_date, parts.has_time) {
                (true, false) => "date",
                (false, true) => "time",
                _ => "datetime",
            },
            DataTypeKind::Choice(_) => "choice",
            DataTypeKind::Picture => "picture",
            DataTypeKind::File => "file",
            DataTypeKind::Link(kind) => kind.as_str(),
            DataTypeKind::Table(_) => "table",
        }
    }
}

// ============================================================================
// DataType
// ============================================================================

/// A named data type instance.
#[derive(Debug, Clone)]
pub struct DataType {
    id: DataTypeId,
    name: String,
    kind: DataTypeKind,
}

impl PartialEq for DataType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for DataType {}

impl Hash for DataType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl DataType {
    /// Create a new data type with a fresh identity.
    pub fn new(name: impl Into<String>, kind: DataTypeKind) -> Self {
        Self::with_id(DataTypeId::new(), name, kind)
    }

    /// Create a data type with a known identity (e.g. when the host restores
    /// a document).
    pub fn with_id(id: DataTypeId, name: impl Into<String>, kind: DataTypeKind) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
        }
    }

    pub fn text() -> Self {
        Self::predefined(TEXT_ID, "Text", DataTypeKind::Text(TextFormat::default()))
    }

    pub fn number() -> Self {
        Self::predefined(NUMBER_ID, "Number", DataTypeKind::Number(NumberFormat::default()))
    }

    pub fn date_time() -> Self {
        Self::predefined(DATE_TIME_ID, "DateTime", DataTypeKind::DateTime(DateTimeParts::DATE_TIME))
    }

    pub fn date() -> Self {
        Self::predefined(DATE_ID, "Date", DataTypeKind::DateTime(DateTimeParts::DATE))
    }

    pub fn time() -> Self {
        Self::predefined(TIME_ID, "Time", DataTypeKind::DateTime(DateTimeParts::TIME))
    }

    /// Two-valued choice (code 0 = No, code 1 = Yes).
    pub fn yes_no() -> Self {
        Self::predefined(
            YES_NO_ID,
            "YesNo",
            DataTypeKind::Choice(ChoiceFormat {
                options: vec![ChoiceOption::new(0, "No"), ChoiceOption::new(1, "Yes")],
            }),
        )
    }

    pub fn picture() -> Self {
        Self::predefined(PICTURE_ID, "Picture", DataTypeKind::Picture)
    }

    pub fn file() -> Self {
        Self::predefined(FILE_ID, "File", DataTypeKind::File)
    }

    pub fn internal_link() -> Self {
        Self::predefined(INTERNAL_LINK_ID, "InternalLink", DataTypeKind::Link(LinkKind::Internal))
    }

    pub fn resource_link() -> Self {
        Self::predefined(RESOURCE_LINK_ID, "ResourceLink", DataTypeKind::Link(LinkKind::Resource))
    }

    pub fn idea_link() -> Self {
        Self::predefined(IDEA_LINK_ID, "IdeaLink", DataTypeKind::Link(LinkKind::Idea))
    }

    pub fn record_link() -> Self {
        Self::predefined(RECORD_LINK_ID, "RecordLink", DataTypeKind::Link(LinkKind::TableRecord))
    }

    /// Nested table type following `definition`.
    pub fn table_of(name: impl Into<String>, definition: TableDefinitionId) -> Self {
        Self::new(name, DataTypeKind::Table(definition))
    }

    /// All predefined types.
    pub fn predefined_types() -> Vec<DataType> {
        vec![
            DataType::text(),
            DataType::number(),
            DataType::date_time(),
            DataType::date(),
            DataType::time(),
            DataType::yes_no(),
            DataType::picture(),
            DataType::file(),
            DataType::internal_link(),
            DataType::resource_link(),
            DataType::idea_link(),
            DataType::record_link(),
        ]
    }

    fn predefined(id: u128, name: &str, kind: DataTypeKind) -> Self {
        Self::with_id(DataTypeId::well_known(id), name, kind)
    }

    pub fn id(&self) -> &DataTypeId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &DataTypeKind {
        &self.kind
    }

    /// Runtime value kind this type accepts (storage form).
    pub fn container_type(&self) -> ContainerType {
        match self.kind {
            DataTypeKind::Text(_) => ContainerType::Text,
            DataTypeKind::Number(_) => ContainerType::Number,
            DataTypeKind::DateTime(_) => ContainerType::DateTime,
            DataTypeKind::Choice(_) => ContainerType::Choice,
            DataTypeKind::Picture => ContainerType::Picture,
            DataTypeKind::File => ContainerType::File,
            DataTypeKind::Link(_) => ContainerType::Link,
            DataTypeKind::Table(_) => ContainerType::Table,
        }
    }

    /// Returns true for Text, Number, DateTime and Choice.
    pub fn is_basic(&self) -> bool {
        matches!(
            self.kind,
            DataTypeKind::Text(_)
                | DataTypeKind::Number(_)
                | DataTypeKind::DateTime(_)
                | DataTypeKind::Choice(_)
        )
    }

    pub fn is_link(&self) -> bool {
        matches!(self.kind, DataTypeKind::Link(_))
    }

    /// Value a fresh slot of this type starts with (storage form).
    pub fn initializer(&self) -> Option<TaggedValue> {
        match self.kind {
            DataTypeKind::Text(_) => Some(TaggedValue::Text(String::new())),
            _ => None,
        }
    }

    /// Parse text into a value of this type. Never panics; unreadable text
    /// yields `None`.
    pub fn try_parse_value_from(&self, text: &str) -> Option<TaggedValue> {
        match &self.kind {
            DataTypeKind::Text(_) => Some(TaggedValue::Text(text.to_string())),
            DataTypeKind::Number(_) => parse_number(text).map(TaggedValue::Number),
            DataTypeKind::DateTime(parts) => parse_with_parts(text, *parts).map(TaggedValue::DateTime),
            DataTypeKind::Choice(choice) => parse_choice(text, choice).map(TaggedValue::Choice),
            DataTypeKind::Link(LinkKind::Internal) => non_blank(text)
                .map(|property| TaggedValue::Link(LinkValue::Internal { property })),
            DataTypeKind::Link(LinkKind::Resource) => non_blank(text)
                .map(|address| TaggedValue::Link(LinkValue::Resource { address })),
            DataTypeKind::Link(LinkKind::Idea | LinkKind::TableRecord)
            | DataTypeKind::Picture
            | DataTypeKind::File
            | DataTypeKind::Table(_) => None,
        }
    }

    /// Check a storage-form value against this type.
    ///
    /// Null is always acceptable here; required-ness is a field concern.
    pub fn validate(&self, value: &TaggedValue) -> Result<(), Violation> {
        if value.is_null() {
            return Ok(());
        }
        let expected = self.container_type();
        if value.container_type() != Some(expected) {
            return Err(Violation::type_mismatch(expected, value.container_type()));
        }

        match (&self.kind, value) {
            (DataTypeKind::Text(format), TaggedValue::Text(text)) => {
                if let Some(max) = format.max_length {
                    let len = text.chars().count();
                    if len > max {
                        return Err(Violation::out_of_range(format!(
                            "text is {} characters long, at most {} allowed",
                            len, max
                        )));
                    }
                }
                Ok(())
            }
            (DataTypeKind::Number(format), TaggedValue::Number(n)) => validate_number(*n, format),
            (DataTypeKind::DateTime(parts), TaggedValue::DateTime(dt)) => validate_date_time(*dt, *parts),
            (DataTypeKind::Choice(choice), TaggedValue::Choice(code)) => {
                if choice.option(*code).is_some() {
                    Ok(())
                } else {
                    Err(Violation::out_of_range(format!(
                        "choice code {} is not declared by '{}'",
                        code, self.name
                    )))
                }
            }
            (DataTypeKind::Link(kind), TaggedValue::Link(link)) => {
                if !kind.accepts(link) {
                    return Err(Violation::format_mismatch(format!(
                        "'{}' expects a {} reference",
                        self.name,
                        kind.as_str()
                    )));
                }
                match link {
                    LinkValue::Resource { address } if address.trim().is_empty() => {
                        Err(Violation::format_mismatch("resource address is empty"))
                    }
                    _ => Ok(()),
                }
            }
            (DataTypeKind::Table(definition), TaggedValue::Table(table)) => {
                if table.definition_id() == definition {
                    Ok(())
                } else {
                    Err(Violation::format_mismatch(format!(
                        "nested table follows {}, expected {}",
                        table.definition_id(),
                        definition
                    )))
                }
            }
            _ => Ok(()),
        }
    }

    /// Display-formatted rendering of a value of this type.
    pub fn format_value(&self, value: &TaggedValue) -> String {
        match (&self.kind, value) {
            (_, TaggedValue::Null) => String::new(),
            (DataTypeKind::Number(format), TaggedValue::Number(n)) => {
                n.round_dp(u32::from(format.decimal_digits)).normalize().to_string()
            }
            (DataTypeKind::DateTime(parts), TaggedValue::DateTime(dt)) => {
                dt.format(parts.display_format()).to_string()
            }
            (DataTypeKind::Choice(choice), TaggedValue::Choice(code)) => choice
                .option(*code)
                .map(|o| o.text.clone())
                .unwrap_or_else(|| code.to_string()),
            (DataTypeKind::Choice(choice), TaggedValue::Boolean(b)) => {
                match (choice.boolean_codes(), *b) {
                    (Some((_, yes)), true) => self.format_value(&TaggedValue::Choice(yes)),
                    (Some((no, _)), false) => self.format_value(&TaggedValue::Choice(no)),
                    (None, _) => b.to_string(),
                }
            }
            _ => value.to_string(),
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

impl FromStr for DataType {
    type Err = String;

    /// Resolve a predefined type by name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "text" | "string" => Ok(DataType::text()),
            "number" | "decimal" | "integer" | "int" | "float" => Ok(DataType::number()),
            "datetime" | "timestamp" => Ok(DataType::date_time()),
            "date" => Ok(DataType::date()),
            "time" => Ok(DataType::time()),
            "yesno" | "yes_no" | "boolean" | "bool" => Ok(DataType::yes_no()),
            "picture" | "image" => Ok(DataType::picture()),
            "file" => Ok(DataType::file()),
            "internal_link" => Ok(DataType::internal_link()),
            "resource_link" => Ok(DataType::resource_link()),
            "idea_link" => Ok(DataType::idea_link()),
            "record_link" => Ok(DataType::record_link()),
            _ => Err(format!(
                "Invalid data type: '{}'. Expected: text, number, datetime, date, time, yesno, picture, file, internal_link, resource_link, idea_link, record_link.",
                s
            )),
        }
    }
}

// ============================================================================
// Basic type inference
// ============================================================================

/// Common type for two basic types: identical types are kept, anything else
/// widens to Text.
pub fn wider_basic_data_type(a: &DataType, b: &DataType) -> DataType {
    if a == b {
        a.clone()
    } else {
        DataType::text()
    }
}

/// Pick the most specific predefined basic type for a piece of text:
/// Number, then Time for a bare time of day, then DateTime, else Text.
pub fn convert_to_most_suited_basic_type(text: &str) -> (DataType, TaggedValue) {
    let number = DataType::number();
    if let Some(value) = number.try_parse_value_from(text) {
        if number.validate(&value).is_ok() {
            return (number, value);
        }
    }
    if let Some(time) = parse_time(text) {
        return (DataType::time(), TaggedValue::DateTime(time));
    }
    let date_time = DataType::date_time();
    if let Some(value) = date_time.try_parse_value_from(text) {
        return (date_time, value);
    }
    (DataType::text(), TaggedValue::Text(text.to_string()))
}

// ============================================================================
// Resource classification
// ============================================================================

/// What a resource link address designates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceType {
    WebAddress,
    Email,
    Folder,
    File,
    Unknown,
}

/// Classify a resource address using URL parsing and path heuristics.
pub fn get_resource_type(address: &str) -> ResourceType {
    let address = address.trim();
    if address.is_empty() {
        return ResourceType::Unknown;
    }
    if address.to_lowercase().starts_with("www.") {
        return ResourceType::WebAddress;
    }

    // Single-letter schemes are drive letters ("C:\docs")
    if let Ok(url) = Url::parse(address) {
        match url.scheme() {
            "http" | "https" | "ftp" | "ftps" => return ResourceType::WebAddress,
            "mailto" => return ResourceType::Email,
            "file" => return classify_path(url.path()),
            scheme if scheme.len() > 1 => return ResourceType::Unknown,
            _ => {}
        }
    }

    if address.contains('@') && !address.contains(&['/', '\\', ' '][..]) {
        return ResourceType::Email;
    }
    classify_path(address)
}

fn classify_path(path: &str) -> ResourceType {
    if path.ends_with('/') || path.ends_with('\\') {
        return ResourceType::Folder;
    }
    let last = path.rsplit(&['/', '\\'][..]).next().unwrap_or(path);
    if Path::new(last).extension().is_some() {
        ResourceType::File
    } else {
        ResourceType::Folder
    }
}

// ============================================================================
// Parsing and validation helpers
// ============================================================================

fn non_blank(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn parse_number(text: &str) -> Option<Decimal> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    // Digit separators are not part of a number's text form
    if trimmed.contains('_') {
        return None;
    }
    match Decimal::from_str_exact(trimmed) {
        Ok(n) => Some(n),
        Err(_) if trimmed.contains(&['e', 'E'][..]) => Decimal::from_scientific(trimmed).ok(),
        Err(_) => None,
    }
}

/// (integer digits, decimal digits) of a number, ignoring trailing zeros.
fn digit_counts(n: Decimal) -> (u32, u32) {
    let n = n.normalize();
    let integral = n.trunc().abs();
    let integer_digits = if integral.is_zero() {
        0
    } else {
        integral.to_string().len() as u32
    };
    (integer_digits, n.scale())
}

fn validate_number(n: Decimal, format: &NumberFormat) -> Result<(), Violation> {
    let (integer_digits, decimal_digits) = digit_counts(n);
    if integer_digits > u32::from(format.integer_digits) {
        return Err(Violation::out_of_range(format!(
            "{} has {} integer digits, at most {} allowed",
            n, integer_digits, format.integer_digits
        )));
    }
    if decimal_digits > u32::from(format.decimal_digits) {
        return Err(Violation::out_of_range(format!(
            "{} has {} decimal digits, at most {} allowed",
            n, decimal_digits, format.decimal_digits
        )));
    }
    if let Some(min) = format.min {
        if n < min {
            return Err(Violation::out_of_range(format!("{} is below the minimum {}", n, min)));
        }
    }
    if let Some(max) = format.max {
        if n > max {
            return Err(Violation::out_of_range(format!("{} is above the maximum {}", n, max)));
        }
    }
    Ok(())
}

fn parse_with_parts(text: &str, parts: DateTimeParts) -> Option<NaiveDateTime> {
    match (parts.has_date, parts.has_time) {
        (true, true) => parse_date_time(text)
            .or_else(|| parse_date(text))
            .or_else(|| parse_time(text)),
        (true, false) => parse_date(text)
            .or_else(|| parse_date_time(text).filter(|dt| dt.time() == NaiveTime::MIN)),
        (false, true) => parse_time(text)
            .or_else(|| parse_date_time(text).filter(|dt| dt.date() == base_date())),
        (false, false) => None,
    }
}

fn validate_date_time(dt: NaiveDateTime, parts: DateTimeParts) -> Result<(), Violation> {
    if !parts.has_time && dt.time() != NaiveTime::MIN {
        return Err(Violation::new(
            ViolationKind::FormatMismatch,
            format!("{} carries a time, but the type is date-only", dt),
        ));
    }
    if !parts.has_date && dt.date() != base_date() {
        return Err(Violation::new(
            ViolationKind::FormatMismatch,
            format!("{} carries a date, but the type is time-only", dt),
        ));
    }
    Ok(())
}

fn parse_choice(text: &str, choice: &ChoiceFormat) -> Option<u8> {
    let trimmed = text.trim();
    if let Some(option) = choice
        .options
        .iter()
        .find(|o| o.text.eq_ignore_ascii_case(trimmed))
    {
        return Some(option.code);
    }
    if let Ok(code) = trimmed.parse::<u8>() {
        if choice.option(code).is_some() {
            return Some(code);
        }
    }
    let (no, yes) = choice.boolean_codes()?;
    match trimmed.to_lowercase().as_str() {
        "true" | "yes" | "t" | "y" => Some(yes),
        "false" | "no" | "f" | "n" => Some(no),
        _ => None,
    }
}
