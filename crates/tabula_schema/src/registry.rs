//! Session-owned registry of data types, storage converters and initializers.
//!
//! Everything is keyed by [`DataTypeId`], the same key [`DataType`] equality
//! uses, so two equal data types always resolve to the same converter and
//! initializer even when they are distinct clones.

use crate::data_type::{DataType, DataTypeKind};
use crate::value::TaggedValue;
use std::collections::HashMap;
use std::fmt;
use tabula_ids::DataTypeId;
use tracing::debug;

/// Translates between the value callers see and the value a slot stores.
pub trait StorageConverter: fmt::Debug {
    /// Storage form to logical form.
    fn read(&self, stored: TaggedValue) -> TaggedValue;

    /// Logical form to storage form.
    fn write(&self, logical: TaggedValue) -> TaggedValue;
}

/// Exposes a two-valued choice as a boolean while storing its byte code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BooleanChoiceConverter {
    pub false_code: u8,
    pub true_code: u8,
}

impl StorageConverter for BooleanChoiceConverter {
    fn read(&self, stored: TaggedValue) -> TaggedValue {
        match stored {
            TaggedValue::Choice(code) => TaggedValue::Boolean(code == self.true_code),
            other => other,
        }
    }

    fn write(&self, logical: TaggedValue) -> TaggedValue {
        match logical {
            TaggedValue::Boolean(true) => TaggedValue::Choice(self.true_code),
            TaggedValue::Boolean(false) => TaggedValue::Choice(self.false_code),
            other => other,
        }
    }
}

/// Registry passed by reference to every operation that needs converters or
/// initializers.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    types: HashMap<DataTypeId, DataType>,
    converters: HashMap<DataTypeId, Box<dyn StorageConverter>>,
    initializers: HashMap<DataTypeId, TaggedValue>,
}

impl TypeRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every predefined data type.
    pub fn with_predefined() -> Self {
        let mut registry = Self::new();
        for data_type in DataType::predefined_types() {
            registry.register(data_type);
        }
        registry
    }

    /// Register (or replace) a data type.
    ///
    /// Two-valued choices get a [`BooleanChoiceConverter`] unless a converter
    /// is already registered for the id.
    pub fn register(&mut self, data_type: DataType) {
        if let DataTypeKind::Choice(choice) = data_type.kind() {
            if let Some((false_code, true_code)) = choice.boolean_codes() {
                self.converters
                    .entry(data_type.id().clone())
                    .or_insert_with(|| Box::new(BooleanChoiceConverter { false_code, true_code }));
            }
        }
        debug!(data_type = %data_type.name(), id = %data_type.id(), "registering data type");
        self.types.insert(data_type.id().clone(), data_type);
    }

    pub fn get(&self, id: &DataTypeId) -> Option<&DataType> {
        self.types.get(id)
    }

    /// Look a type up by name (case-insensitive).
    pub fn find_by_name(&self, name: &str) -> Option<&DataType> {
        self.types
            .values()
            .find(|t| t.name().eq_ignore_ascii_case(name))
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn set_converter(&mut self, id: DataTypeId, converter: Box<dyn StorageConverter>) {
        self.converters.insert(id, converter);
    }

    pub fn remove_converter(&mut self, id: &DataTypeId) -> Option<Box<dyn StorageConverter>> {
        self.converters.remove(id)
    }

    pub fn converter(&self, id: &DataTypeId) -> Option<&dyn StorageConverter> {
        self.converters.get(id).map(|c| c.as_ref())
    }

    /// Override the initializer of a type (storage form).
    pub fn set_initializer(&mut self, id: DataTypeId, value: TaggedValue) {
        self.initializers.insert(id, value);
    }

    /// Registered initializer, falling back to the type's own.
    pub fn initializer(&self, data_type: &DataType) -> Option<TaggedValue> {
        self.initializers
            .get(data_type.id())
            .cloned()
            .or_else(|| data_type.initializer())
    }

    /// Apply the read converter of `data_type`, if any.
    pub fn to_logical(&self, data_type: &DataType, stored: TaggedValue) -> TaggedValue {
        match self.converter(data_type.id()) {
            Some(converter) => converter.read(stored),
            None => stored,
        }
    }

    /// Apply the write converter of `data_type`, if any.
    pub fn to_storage(&self, data_type: &DataType, logical: TaggedValue) -> TaggedValue {
        match self.converter(data_type.id()) {
            Some(converter) => converter.write(logical),
            None => logical,
        }
    }
}
