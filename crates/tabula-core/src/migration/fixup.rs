//! Legacy per-field fixups applied while rebuilding a table.
//!
//! Each entry supplies the value of one newly added field of one table from
//! the old row. The registry is closed and keyed by `(table, field)`; it is
//! consulted once per new field when a rebuild's column plan is built, never
//! per row.

use rusqlite::types::Value;
use std::collections::HashMap;

/// Read access to a row in its old layout.
pub struct OldRow<'a> {
    positions: &'a HashMap<String, usize>,
    values: &'a [Value],
}

impl<'a> OldRow<'a> {
    /// Wrap a row whose column positions are given by `positions`.
    pub fn new(positions: &'a HashMap<String, usize>, values: &'a [Value]) -> Self {
        Self { positions, values }
    }

    /// The old value of `column`, if the old layout had it.
    pub fn get(&self, column: &str) -> Option<&'a Value> {
        self.positions.get(column).and_then(|&i| self.get_at(i))
    }

    pub(crate) fn get_at(&self, position: usize) -> Option<&'a Value> {
        self.values.get(position)
    }
}

/// Computes a field's value from the old row. `None` falls back to the type default.
pub type FixupFn = fn(&OldRow<'_>) -> Option<Value>;

/// One named exception.
#[derive(Clone, Copy)]
pub struct LegacyFixup {
    /// Table the fixup applies to.
    pub table: &'static str,
    /// Newly added field it populates.
    pub field: &'static str,
    /// What it does, for logs.
    pub description: &'static str,
    /// The rule itself.
    pub apply: FixupFn,
}

impl std::fmt::Debug for LegacyFixup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LegacyFixup")
            .field("table", &self.table)
            .field("field", &self.field)
            .field("description", &self.description)
            .finish()
    }
}

fn company_one(_: &OldRow<'_>) -> Option<Value> {
    Some(Value::Integer(1))
}

fn normal_status(_: &OldRow<'_>) -> Option<Value> {
    Some(Value::Text("N".to_string()))
}

fn thirty_days(_: &OldRow<'_>) -> Option<Value> {
    Some(Value::Integer(30))
}

fn gl_capture_date(row: &OldRow<'_>) -> Option<Value> {
    row.get("glt_trdt").cloned()
}

fn debtors_capture_date(row: &OldRow<'_>) -> Option<Value> {
    row.get("drt_trdt").cloned()
}

fn creditors_capture_date(row: &OldRow<'_>) -> Option<Value> {
    row.get("crt_trdt").cloned()
}

static FIXUPS: &[LegacyFixup] = &[
    LegacyFixup {
        table: "ctlynd",
        field: "cye_cono",
        description: "financial periods predate multi-company support; assign company 1",
        apply: company_one,
    },
    LegacyFixup {
        table: "gentrn",
        field: "glt_capdt",
        description: "capture date taken from transaction date",
        apply: gl_capture_date,
    },
    LegacyFixup {
        table: "drstrn",
        field: "drt_capdt",
        description: "capture date taken from transaction date",
        apply: debtors_capture_date,
    },
    LegacyFixup {
        table: "crstrn",
        field: "crt_capdt",
        description: "capture date taken from transaction date",
        apply: creditors_capture_date,
    },
    LegacyFixup {
        table: "drsmst",
        field: "drm_stat",
        description: "existing accounts are normal status",
        apply: normal_status,
    },
    LegacyFixup {
        table: "crsmst",
        field: "crm_stat",
        description: "existing accounts are normal status",
        apply: normal_status,
    },
    LegacyFixup {
        table: "crsmst",
        field: "crm_terms",
        description: "existing suppliers default to 30 day terms",
        apply: thirty_days,
    },
];

/// Lookup table over the registered fixups, keyed by table then field.
#[derive(Debug, Clone)]
pub struct FixupRegistry {
    by_table: HashMap<&'static str, HashMap<&'static str, LegacyFixup>>,
}

impl FixupRegistry {
    /// The standard registry.
    pub fn standard() -> Self {
        Self::from_fixups(FIXUPS.iter().copied())
    }

    /// A registry with no fixups.
    pub fn empty() -> Self {
        Self::from_fixups(std::iter::empty())
    }

    /// Build a registry from explicit entries.
    pub fn from_fixups(fixups: impl IntoIterator<Item = LegacyFixup>) -> Self {
        let mut by_table: HashMap<&'static str, HashMap<&'static str, LegacyFixup>> =
            HashMap::new();
        for fixup in fixups {
            by_table
                .entry(fixup.table)
                .or_default()
                .insert(fixup.field, fixup);
        }
        Self { by_table }
    }

    /// The fixup for `table.field`, if one is registered.
    pub fn lookup(&self, table: &str, field: &str) -> Option<&LegacyFixup> {
        self.by_table.get(table)?.get(field)
    }

    /// Number of registered fixups.
    pub fn len(&self) -> usize {
        self.by_table.values().map(HashMap::len).sum()
    }

    /// Whether no fixups are registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for FixupRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(columns: &[(&str, Value)]) -> (HashMap<String, usize>, Vec<Value>) {
        let positions = columns
            .iter()
            .enumerate()
            .map(|(i, (name, _))| (name.to_string(), i))
            .collect();
        let values = columns.iter().map(|(_, v)| v.clone()).collect();
        (positions, values)
    }

    #[test]
    fn test_standard_registry_lookup() {
        let registry = FixupRegistry::standard();
        assert_eq!(registry.len(), FIXUPS.len());
        assert!(registry.lookup("ctlynd", "cye_cono").is_some());
        assert!(registry.lookup("ctlynd", "cye_period").is_none());
        assert!(registry.lookup("gentrn", "cye_cono").is_none());
    }

    #[test]
    fn test_constant_fixup() {
        let (positions, values) = row(&[("cye_period", Value::Integer(1))]);
        let old = OldRow::new(&positions, &values);
        let fixup = FixupRegistry::standard().lookup("ctlynd", "cye_cono").copied().unwrap();
        assert_eq!((fixup.apply)(&old), Some(Value::Integer(1)));
    }

    #[test]
    fn test_cross_column_fixup() {
        let (positions, values) = row(&[
            ("glt_cono", Value::Integer(1)),
            ("glt_trdt", Value::Integer(20240131)),
        ]);
        let old = OldRow::new(&positions, &values);
        let fixup = FixupRegistry::standard().lookup("gentrn", "glt_capdt").copied().unwrap();
        assert_eq!((fixup.apply)(&old), Some(Value::Integer(20240131)));
    }

    #[test]
    fn test_cross_column_fixup_without_source() {
        let (positions, values) = row(&[("glt_cono", Value::Integer(1))]);
        let old = OldRow::new(&positions, &values);
        let fixup = FixupRegistry::standard().lookup("gentrn", "glt_capdt").copied().unwrap();
        assert_eq!((fixup.apply)(&old), None);
    }

    #[test]
    fn test_lookup_with_borrowed_names() {
        let table = String::from("crsmst");
        let registry = FixupRegistry::standard();
        let stat = registry.lookup(&table, &String::from("crm_stat")).unwrap();
        assert_eq!(stat.field, "crm_stat");
        let terms = registry.lookup(&table, "crm_terms").unwrap();
        assert_eq!(terms.field, "crm_terms");
        assert!(registry.lookup(&table, "drm_stat").is_none());
    }

    #[test]
    fn test_later_entry_replaces_earlier() {
        let first = FIXUPS[0];
        let mut second = first;
        second.description = "replacement";
        let registry = FixupRegistry::from_fixups([first, second]);
        assert_eq!(registry.len(), 1);
        assert_eq!(
            registry.lookup(first.table, first.field).unwrap().description,
            "replacement"
        );
    }

    #[test]
    fn test_empty_registry() {
        let registry = FixupRegistry::empty();
        assert!(registry.is_empty());
        assert!(registry.lookup("ctlynd", "cye_cono").is_none());
    }
}
