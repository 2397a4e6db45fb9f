//! Computed form records
//!
//! A `FormRecord` is the flat, fully computed view of one form: logical field
//! keys mapped to values, plus the ordered rows of each repeating section.
//! Template field names never appear here; see `mapping` for that.

use crate::model::{FormKind, Section};
use serde::Serialize;
use std::collections::BTreeMap;

/// A value destined for one template widget
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "value")]
pub enum FieldValue {
    Text(String),
    /// Checkbox state; the widget decides its own "on" appearance name
    Checkbox(bool),
    /// Radio group option, identified by its appearance state label
    Radio(String),
}

impl FieldValue {
    pub fn text(value: impl Into<String>) -> Self {
        FieldValue::Text(value.into())
    }
}

/// One line-item row: column key to cell text
pub type Row = BTreeMap<&'static str, String>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormRecord {
    pub form: FormKind,
    pub fields: BTreeMap<&'static str, FieldValue>,
    pub sections: BTreeMap<Section, Vec<Row>>,
}

impl FormRecord {
    pub fn new(form: FormKind) -> Self {
        Self {
            form,
            fields: BTreeMap::new(),
            sections: BTreeMap::new(),
        }
    }

    pub fn set(&mut self, key: &'static str, value: FieldValue) {
        self.fields.insert(key, value);
    }

    pub fn set_text(&mut self, key: &'static str, value: impl Into<String>) {
        self.set(key, FieldValue::text(value));
    }

    pub fn set_checkbox(&mut self, key: &'static str, checked: bool) {
        self.set(key, FieldValue::Checkbox(checked));
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    /// Text of a field, if it is a text field
    pub fn text(&self, key: &str) -> Option<&str> {
        match self.fields.get(key) {
            Some(FieldValue::Text(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn push_row(&mut self, section: Section, row: Row) {
        self.sections.entry(section).or_default().push(row);
    }

    pub fn rows(&self, section: Section) -> &[Row] {
        self.sections
            .get(&section)
            .map(|rows| rows.as_slice())
            .unwrap_or(&[])
    }
}

/// Build a row from column/value pairs
pub fn row<const N: usize>(cells: [(&'static str, String); N]) -> Row {
    cells.into_iter().collect()
}
