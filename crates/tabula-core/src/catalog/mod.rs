//! Schema catalog for Tabula.
//!
//! The catalog is the authoritative, versioned definition of every managed
//! table: its columns (with logical type tags) and its indexes.

mod builtin;
mod catalog;
mod field;
pub mod system;
mod table;
mod types;

pub use catalog::SchemaCatalog;
pub use field::{index_name, FieldSpec, IndexSpec, MAX_INDEX_COLUMNS};
pub use table::TableSpec;
pub use types::{DefaultPolicy, FieldSize, TypeKind, TypeTag};
