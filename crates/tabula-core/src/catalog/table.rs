//! Table definitions.

use super::field::{FieldSpec, IndexSpec, MAX_INDEX_COLUMNS};
use super::types::{FieldSize, TypeTag};
use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Canonical definition of one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSpec {
    /// Table name.
    pub name: String,
    /// Table description.
    #[serde(default)]
    pub description: String,
    /// Columns ordered by sequence.
    pub fields: Vec<FieldSpec>,
    /// Indexes ordered by sequence.
    #[serde(default)]
    pub indexes: Vec<IndexSpec>,
}

impl TableSpec {
    /// Create an empty table definition.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            fields: Vec::new(),
            indexes: Vec::new(),
        }
    }

    /// Append a column; its sequence is the next free position.
    pub fn with_field(
        mut self,
        name: &str,
        type_tag: TypeTag,
        size: FieldSize,
        description: &str,
        heading: &str,
    ) -> Self {
        let sequence = self.fields.len() as u32;
        self.fields.push(
            FieldSpec::new(&self.name, sequence, name, type_tag, size)
                .with_description(description)
                .with_heading(heading),
        );
        self
    }

    /// Append an index; its sequence is the next free number.
    pub fn with_index(mut self, unique: bool, columns: &[&str]) -> Self {
        let sequence = self.indexes.len() as u32;
        self.indexes
            .push(IndexSpec::new(&self.name, sequence, unique, columns.iter().copied()));
        self
    }

    /// Look up a column by name.
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Column names in sequence order.
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    /// Stamp the table name onto every field and index.
    pub(crate) fn normalize(&mut self) {
        for field in &mut self.fields {
            field.table = self.name.clone();
        }
        for index in &mut self.indexes {
            index.table = self.name.clone();
        }
        self.fields.sort_by_key(|f| f.sequence);
        self.indexes.sort_by_key(|i| i.sequence);
    }

    /// Check the structural invariants of the definition.
    pub fn validate(&self) -> Result<(), Error> {
        let invalid = |msg: String| Err(Error::InvalidCatalog(format!("{}: {}", self.name, msg)));

        if self.name.is_empty() || !is_identifier(&self.name) {
            return invalid("table name is not a plain identifier".to_string());
        }
        if self.fields.is_empty() {
            return invalid("table has no fields".to_string());
        }

        let mut names = HashSet::new();
        for (position, field) in self.fields.iter().enumerate() {
            if field.sequence as usize != position {
                return invalid(format!(
                    "field {} has sequence {}, expected {}",
                    field.name, field.sequence, position
                ));
            }
            if !is_identifier(&field.name) {
                return invalid(format!("field name {:?} is not a plain identifier", field.name));
            }
            if !names.insert(field.name.as_str()) {
                return invalid(format!("duplicate field {}", field.name));
            }
        }

        let mut sequences = HashSet::new();
        for index in &self.indexes {
            if !sequences.insert(index.sequence) {
                return invalid(format!("duplicate index sequence {}", index.sequence));
            }
            if index.columns.is_empty() || index.columns.len() > MAX_INDEX_COLUMNS {
                return invalid(format!(
                    "index {} has {} columns, expected 1..={}",
                    index.sequence,
                    index.columns.len(),
                    MAX_INDEX_COLUMNS
                ));
            }
            if let Some(missing) = index.columns.iter().find(|c| !names.contains(c.as_str())) {
                return invalid(format!(
                    "index {} references unknown field {}",
                    index.sequence, missing
                ));
            }
        }

        Ok(())
    }
}

/// Names are interpolated into DDL, so only `[A-Za-z_][A-Za-z0-9_]*` is accepted.
pub(crate) fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
