//! Tagged values stored in record slots.

use crate::table::Table;
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use std::cmp::Ordering;
use std::fmt;
use tabula_ids::{RecordId, TableId};

/// Display format used for raw date-time rendering.
pub const RAW_DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// The runtime kind of value a data type accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerType {
    Text,
    Number,
    DateTime,
    Choice,
    Boolean,
    Picture,
    File,
    Link,
    Table,
}

impl ContainerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContainerType::Text => "text",
            ContainerType::Number => "number",
            ContainerType::DateTime => "datetime",
            ContainerType::Choice => "choice",
            ContainerType::Boolean => "boolean",
            ContainerType::Picture => "picture",
            ContainerType::File => "file",
            ContainerType::Link => "link",
            ContainerType::Table => "table",
        }
    }

    /// Value returned for an empty slot when the field declares no
    /// default-empty value.
    pub fn default_value(&self) -> TaggedValue {
        match self {
            ContainerType::Text => TaggedValue::Text(String::new()),
            _ => TaggedValue::Null,
        }
    }
}

impl fmt::Display for ContainerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Embedded image content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PictureData {
    /// Image format tag (e.g. "png")
    pub format: String,
    pub bytes: Vec<u8>,
}

/// Embedded file content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileData {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Reference to a node of the host graph model.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdeaRef {
    /// Host-assigned node identifier
    pub id: String,
    /// Label as last seen by the host
    pub label: String,
}

/// Reference to a record of another (or the same) table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordRef {
    pub table: TableId,
    pub record: RecordId,
}

/// Reference payloads for the link data types.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LinkValue {
    /// Property of the owning entity, by name
    Internal { property: String },
    /// File, folder or web address
    Resource { address: String },
    Idea(IdeaRef),
    Record(RecordRef),
}

/// A value held in (or read from) a record slot.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum TaggedValue {
    #[default]
    Null,
    Text(String),
    Number(Decimal),
    DateTime(NaiveDateTime),
    /// Stored code of an enumerated choice
    Choice(u8),
    /// Logical form of a two-valued choice
    Boolean(bool),
    Picture(PictureData),
    File(FileData),
    Link(LinkValue),
    Table(Box<Table>),
}

impl TaggedValue {
    pub fn is_null(&self) -> bool {
        matches!(self, TaggedValue::Null)
    }

    /// Container kind of this value; `None` for null.
    pub fn container_type(&self) -> Option<ContainerType> {
        match self {
            TaggedValue::Null => None,
            TaggedValue::Text(_) => Some(ContainerType::Text),
            TaggedValue::Number(_) => Some(ContainerType::Number),
            TaggedValue::DateTime(_) => Some(ContainerType::DateTime),
            TaggedValue::Choice(_) => Some(ContainerType::Choice),
            TaggedValue::Boolean(_) => Some(ContainerType::Boolean),
            TaggedValue::Picture(_) => Some(ContainerType::Picture),
            TaggedValue::File(_) => Some(ContainerType::File),
            TaggedValue::Link(_) => Some(ContainerType::Link),
            TaggedValue::Table(_) => Some(ContainerType::Table),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            TaggedValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<Decimal> {
        match self {
            TaggedValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_date_time(&self) -> Option<NaiveDateTime> {
        match self {
            TaggedValue::DateTime(dt) => Some(*dt),
            _ => None,
        }
    }

    pub fn as_table(&self) -> Option<&Table> {
        match self {
            TaggedValue::Table(t) => Some(t),
            _ => None,
        }
    }

    /// Ordering between two values of the same comparable kind.
    ///
    /// Only numbers, date-times, text and choice codes are ordered; anything
    /// else (including mixed kinds) yields `None`.
    pub fn compare(&self, other: &TaggedValue) -> Option<Ordering> {
        match (self, other) {
            (TaggedValue::Number(a), TaggedValue::Number(b)) => Some(a.cmp(b)),
            (TaggedValue::DateTime(a), TaggedValue::DateTime(b)) => Some(a.cmp(b)),
            (TaggedValue::Text(a), TaggedValue::Text(b)) => Some(a.cmp(b)),
            (TaggedValue::Choice(a), TaggedValue::Choice(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl fmt::Display for TaggedValue {
    /// Raw rendering, without type-specific display formatting.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaggedValue::Null => Ok(()),
            TaggedValue::Text(s) => write!(f, "{}", s),
            TaggedValue::Number(n) => write!(f, "{}", n),
            TaggedValue::DateTime(dt) => write!(f, "{}", dt.format(RAW_DATE_TIME_FORMAT)),
            TaggedValue::Choice(code) => write!(f, "{}", code),
            TaggedValue::Boolean(b) => write!(f, "{}", b),
            TaggedValue::Picture(p) => write!(f, "[{} picture, {} bytes]", p.format, p.bytes.len()),
            TaggedValue::File(file) => write!(f, "{}", file.name),
            TaggedValue::Link(LinkValue::Internal { property }) => write!(f, "{}", property),
            TaggedValue::Link(LinkValue::Resource { address }) => write!(f, "{}", address),
            TaggedValue::Link(LinkValue::Idea(idea)) => write!(f, "{}", idea.label),
            TaggedValue::Link(LinkValue::Record(r)) => write!(f, "{}", r.record),
            TaggedValue::Table(t) => write!(f, "[{} records]", t.len()),
        }
    }
}

impl From<&str> for TaggedValue {
    fn from(value: &str) -> Self {
        TaggedValue::Text(value.to_string())
    }
}

impl From<String> for TaggedValue {
    fn from(value: String) -> Self {
        TaggedValue::Text(value)
    }
}

impl From<Decimal> for TaggedValue {
    fn from(value: Decimal) -> Self {
        TaggedValue::Number(value)
    }
}

impl From<i64> for TaggedValue {
    fn from(value: i64) -> Self {
        TaggedValue::Number(Decimal::from(value))
    }
}

impl From<NaiveDateTime> for TaggedValue {
    fn from(value: NaiveDateTime) -> Self {
        TaggedValue::DateTime(value)
    }
}

impl From<bool> for TaggedValue {
    fn from(value: bool) -> Self {
        TaggedValue::Boolean(value)
    }
}

impl From<LinkValue> for TaggedValue {
    fn from(value: LinkValue) -> Self {
        TaggedValue::Link(value)
    }
}

impl From<Table> for TaggedValue {
    fn from(value: Table) -> Self {
        TaggedValue::Table(Box::new(value))
    }
}
