//! The schema catalog: every managed table in migration order.

use super::system;
use super::TableSpec;
use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// On-disk catalog document.
#[derive(Debug, Serialize, Deserialize)]
struct CatalogFile {
    tables: Vec<TableSpec>,
}

/// Authoritative definition of every managed table.
///
/// Immutable once built. The bookkeeping tables are always present and
/// always first, so the engine can reconcile its own metadata before any
/// other table.
#[derive(Debug, Clone)]
pub struct SchemaCatalog {
    tables: Vec<TableSpec>,
    by_name: HashMap<String, usize>,
}

impl SchemaCatalog {
    /// Build a catalog from table definitions, validating each one.
    pub fn new(tables: Vec<TableSpec>) -> Result<Self, Error> {
        let system_names: HashSet<String> =
            system::tables().into_iter().map(|t| t.name).collect();
        let (mut supplied_system, rest): (Vec<_>, Vec<_>) = tables
            .into_iter()
            .partition(|t| system_names.contains(&t.name));

        let mut ordered = Vec::with_capacity(supplied_system.len() + rest.len() + 3);
        for default in system::tables() {
            match supplied_system.iter().position(|t| t.name == default.name) {
                Some(i) => ordered.push(supplied_system.remove(i)),
                None => ordered.push(default),
            }
        }
        // Anything left over is a duplicate of a bookkeeping table.
        ordered.extend(supplied_system);
        ordered.extend(rest);

        let mut by_name = HashMap::with_capacity(ordered.len());
        for (position, table) in ordered.iter_mut().enumerate() {
            table.normalize();
            table.validate()?;
            if by_name.insert(table.name.clone(), position).is_some() {
                return Err(Error::InvalidCatalog(format!("duplicate table {}", table.name)));
            }
        }

        for required in system::tables() {
            let table = &ordered[by_name[&required.name]];
            if let Some(missing) = required
                .fields
                .iter()
                .find(|f| table.field(&f.name).is_none())
            {
                return Err(Error::InvalidCatalog(format!(
                    "{} must keep field {}",
                    table.name, missing.name
                )));
            }
        }

        Ok(Self {
            tables: ordered,
            by_name,
        })
    }

    /// The compiled-in catalog.
    pub fn builtin() -> Result<Self, Error> {
        Self::new(super::builtin::tables())
    }

    /// Parse a catalog from JSON text.
    pub fn from_json(text: &str) -> Result<Self, Error> {
        let file: CatalogFile = serde_json::from_str(text)?;
        Self::new(file.tables)
    }

    /// Load a catalog from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let load_error = |reason: String| Error::CatalogLoad {
            path: path.to_path_buf(),
            reason,
        };
        let text = std::fs::read_to_string(path).map_err(|e| load_error(e.to_string()))?;
        Self::from_json(&text).map_err(|e| load_error(e.to_string()))
    }

    /// Serialize the catalog to pretty JSON.
    pub fn to_json(&self) -> Result<String, Error> {
        let file = CatalogFile {
            tables: self.tables.clone(),
        };
        Ok(serde_json::to_string_pretty(&file)?)
    }

    /// Look up a table by name.
    pub fn get(&self, name: &str) -> Option<&TableSpec> {
        self.by_name.get(name).map(|&i| &self.tables[i])
    }

    /// Whether the catalog manages `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// All tables in migration order.
    pub fn tables(&self) -> &[TableSpec] {
        &self.tables
    }

    /// All table names in migration order.
    pub fn table_names(&self) -> Vec<&str> {
        self.tables.iter().map(|t| t.name.as_str()).collect()
    }

    /// Number of tables.
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Whether the catalog is empty (never true: the bookkeeping tables are always present).
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
