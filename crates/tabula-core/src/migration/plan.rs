//! Migration planning: choose a strategy per table by diffing the catalog
//! against the live metadata.

use crate::catalog::{FieldSpec, IndexSpec};
use std::fmt;

/// How a table is brought in line with the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// Nothing to do.
    NoChange,
    /// Only descriptions or headings differ; rewrite them in place.
    MetadataOnly,
    /// The physical layout changes; rebuild the table and transform every row.
    Rebuild,
    /// Only the index set differs.
    IndexOnly,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::NoChange => write!(f, "NO_CHANGE"),
            Strategy::MetadataOnly => write!(f, "METADATA_ONLY"),
            Strategy::Rebuild => write!(f, "REBUILD"),
            Strategy::IndexOnly => write!(f, "INDEX_ONLY"),
        }
    }
}

/// Why a strategy was chosen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanReason {
    /// No field metadata is recorded for the table.
    MissingMetadata,
    /// A full rebuild was requested.
    Forced,
    /// The number of fields differs.
    FieldCount {
        /// Fields recorded live.
        live: usize,
        /// Fields in the catalog.
        catalog: usize,
    },
    /// A field's type, size or sequence differs.
    FieldChanged {
        /// The catalog field name.
        field: String,
    },
    /// A registered historical layout shift applies.
    LegacyShapeShift {
        /// The field whose insertion shifted the layout.
        field: String,
    },
    /// A field was renamed in place.
    FieldRenamed {
        /// Name recorded live.
        from: String,
        /// Name in the catalog.
        to: String,
    },
    /// Only descriptions or headings differ.
    Descriptive,
    /// The recorded index set differs.
    IndexesChanged,
    /// The table does not physically exist yet.
    TableMissing,
    /// Live metadata already matches the catalog.
    Unchanged,
}

impl fmt::Display for PlanReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanReason::MissingMetadata => write!(f, "no live metadata"),
            PlanReason::Forced => write!(f, "forced rebuild"),
            PlanReason::FieldCount { live, catalog } => {
                write!(f, "field count {} -> {}", live, catalog)
            }
            PlanReason::FieldChanged { field } => write!(f, "field {} changed", field),
            PlanReason::LegacyShapeShift { field } => {
                write!(f, "legacy layout shift at {}", field)
            }
            PlanReason::FieldRenamed { from, to } => write!(f, "field {} renamed to {}", from, to),
            PlanReason::Descriptive => write!(f, "descriptions changed"),
            PlanReason::IndexesChanged => write!(f, "indexes changed"),
            PlanReason::TableMissing => write!(f, "table missing"),
            PlanReason::Unchanged => write!(f, "unchanged"),
        }
    }
}

/// A historical layout change that predates field-by-field comparison.
///
/// Applies when the catalog holds `field` at `sequence` but the live layout
/// does not. This set is closed; do not add general rules here.
///
/// A shift never changes the chosen strategy. It is checked after the count
/// and storage rules, so by then the layouts differ only by name at
/// `sequence`, which the rename rule would rebuild anyway. It only labels
/// the rebuild with [`PlanReason::LegacyShapeShift`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShapeShift {
    /// Table the shift applies to.
    pub table: &'static str,
    /// The field that was inserted mid-layout.
    pub field: &'static str,
    /// Its sequence in the current layout.
    pub sequence: u32,
}

/// Registered layout shifts.
pub const LEGACY_SHAPE_SHIFTS: &[ShapeShift] = &[ShapeShift {
    table: "ctlynd",
    field: "cye_cono",
    sequence: 0,
}];

/// The plan for one table. Built fresh per table per run and never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct MigrationPlan {
    /// Table name.
    pub table: String,
    /// Chosen strategy.
    pub strategy: Strategy,
    /// Why the strategy was chosen.
    pub reason: PlanReason,
    /// Live field metadata, if any.
    pub old_fields: Option<Vec<FieldSpec>>,
    /// Catalog fields.
    pub new_fields: Vec<FieldSpec>,
    /// Live index metadata.
    pub old_indexes: Vec<IndexSpec>,
    /// Catalog indexes.
    pub new_indexes: Vec<IndexSpec>,
}

impl MigrationPlan {
    /// Upgrade the plan to a rebuild when the table does not physically exist.
    pub fn require_table(mut self, exists: bool) -> Self {
        if !exists && self.strategy != Strategy::Rebuild {
            self.strategy = Strategy::Rebuild;
            self.reason = PlanReason::TableMissing;
        }
        self
    }

    /// Upgrade a no-change plan to a metadata rewrite when the recorded
    /// table description differs from the catalog's. A table with no
    /// recorded description is not compared.
    pub fn require_description(mut self, live: Option<&str>, catalog: &str) -> Self {
        if self.strategy == Strategy::NoChange && live.is_some_and(|d| d != catalog) {
            self.strategy = Strategy::MetadataOnly;
            self.reason = PlanReason::Descriptive;
        }
        self
    }

    /// Whether the recorded index metadata differs from the catalog.
    pub fn indexes_changed(&self) -> bool {
        self.old_indexes != self.new_indexes
    }
}

/// Chooses a [`Strategy`] per table.
pub struct MigrationPlanner;

impl MigrationPlanner {
    /// Plan one table. The first matching rule wins:
    ///
    /// 1. no live metadata, or `force` → rebuild
    /// 2. different field count → rebuild
    /// 3. any field pair differing in type, size or sequence → rebuild
    /// 4. a registered legacy shape shift → rebuild
    /// 5. a field renamed in place → rebuild
    /// 6. only descriptions or headings differ → metadata only
    /// 7. only indexes differ → index only
    /// 8. otherwise no change
    pub fn plan(
        table: &str,
        old_fields: Option<&[FieldSpec]>,
        new_fields: &[FieldSpec],
        old_indexes: &[IndexSpec],
        new_indexes: &[IndexSpec],
        force: bool,
    ) -> MigrationPlan {
        let (strategy, reason) =
            Self::decide(table, old_fields, new_fields, old_indexes, new_indexes, force);
        MigrationPlan {
            table: table.to_string(),
            strategy,
            reason,
            old_fields: old_fields.map(<[FieldSpec]>::to_vec),
            new_fields: new_fields.to_vec(),
            old_indexes: old_indexes.to_vec(),
            new_indexes: new_indexes.to_vec(),
        }
    }

    fn decide(
        table: &str,
        old_fields: Option<&[FieldSpec]>,
        new_fields: &[FieldSpec],
        old_indexes: &[IndexSpec],
        new_indexes: &[IndexSpec],
        force: bool,
    ) -> (Strategy, PlanReason) {
        let old_fields = match old_fields {
            None => return (Strategy::Rebuild, PlanReason::MissingMetadata),
            Some(_) if force => return (Strategy::Rebuild, PlanReason::Forced),
            Some(fields) => fields,
        };

        if old_fields.len() != new_fields.len() {
            return (
                Strategy::Rebuild,
                PlanReason::FieldCount {
                    live: old_fields.len(),
                    catalog: new_fields.len(),
                },
            );
        }

        for (old, new) in old_fields.iter().zip(new_fields) {
            if old.sequence != new.sequence || !old.same_storage(new) {
                return (
                    Strategy::Rebuild,
                    PlanReason::FieldChanged {
                        field: new.name.clone(),
                    },
                );
            }
        }

        if let Some(shift) = Self::legacy_shift(table, old_fields, new_fields) {
            return (
                Strategy::Rebuild,
                PlanReason::LegacyShapeShift {
                    field: shift.field.to_string(),
                },
            );
        }

        if let Some((old, new)) = old_fields
            .iter()
            .zip(new_fields)
            .find(|(old, new)| old.name != new.name)
        {
            return (
                Strategy::Rebuild,
                PlanReason::FieldRenamed {
                    from: old.name.clone(),
                    to: new.name.clone(),
                },
            );
        }

        let descriptive = old_fields
            .iter()
            .zip(new_fields)
            .any(|(old, new)| !old.same_descriptions(new));
        if descriptive {
            return (Strategy::MetadataOnly, PlanReason::Descriptive);
        }

        if old_indexes != new_indexes {
            return (Strategy::IndexOnly, PlanReason::IndexesChanged);
        }

        (Strategy::NoChange, PlanReason::Unchanged)
    }

    fn legacy_shift(
        table: &str,
        old_fields: &[FieldSpec],
        new_fields: &[FieldSpec],
    ) -> Option<&'static ShapeShift> {
        LEGACY_SHAPE_SHIFTS.iter().find(|shift| {
            shift.table == table
                && new_fields
                    .iter()
                    .any(|f| f.sequence == shift.sequence && f.name == shift.field)
                && !old_fields
                    .iter()
                    .any(|f| f.sequence == shift.sequence && f.name == shift.field)
        })
    }
}
