//! Per-table outcomes and the run summary.

use super::cleanup::CleanupReport;
use super::plan::{PlanReason, Strategy};
use std::fmt;

/// Why a table was not migrated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Live table with no catalog entry.
    Unmanaged,
    /// The run was stopped before reaching it.
    Cancelled,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Unmanaged => write!(f, "unmanaged"),
            SkipReason::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// What happened to one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableStatus {
    /// Already matched the catalog.
    Unchanged,
    /// Descriptions rewritten in place.
    MetadataUpdated,
    /// Only indexes changed.
    IndexesUpdated,
    /// Rebuilt with this many rows.
    Rebuilt {
        /// Rows carried over.
        rows: u64,
    },
    /// Dry run: planned, nothing written.
    Planned,
    /// Not migrated.
    Skipped(SkipReason),
    /// Rolled back.
    Failed {
        /// The error message.
        reason: String,
    },
}

impl fmt::Display for TableStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableStatus::Unchanged => write!(f, "unchanged"),
            TableStatus::MetadataUpdated => write!(f, "metadata updated"),
            TableStatus::IndexesUpdated => write!(f, "indexes updated"),
            TableStatus::Rebuilt { rows } => write!(f, "rebuilt ({} rows)", rows),
            TableStatus::Planned => write!(f, "planned"),
            TableStatus::Skipped(reason) => write!(f, "skipped ({})", reason),
            TableStatus::Failed { reason } => write!(f, "FAILED: {}", reason),
        }
    }
}

/// One table's line in the report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableOutcome {
    /// Table name.
    pub table: String,
    /// Strategy chosen, if the table was planned.
    pub strategy: Option<Strategy>,
    /// Why the strategy was chosen.
    pub reason: Option<PlanReason>,
    /// Result.
    pub status: TableStatus,
}

impl fmt::Display for TableOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.strategy, &self.reason) {
            (Some(strategy), Some(reason)) => write!(
                f,
                "{:<10} {:<14} {} [{}]",
                self.table,
                strategy.to_string(),
                self.status,
                reason
            ),
            _ => write!(f, "{:<10} {:<14} {}", self.table, "-", self.status),
        }
    }
}

/// Everything a run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Target version.
    pub version: String,
    /// Per-table outcomes in processing order.
    pub tables: Vec<TableOutcome>,
    /// Cleanup result, when cleanup ran.
    pub cleanup: Option<CleanupReport>,
    /// Whether the version marker was written.
    pub version_recorded: bool,
    /// Whether the run was stopped early.
    pub cancelled: bool,
    /// Whether nothing was written.
    pub dry_run: bool,
}

impl RunReport {
    /// Outcome for `table`.
    pub fn outcome(&self, table: &str) -> Option<&TableOutcome> {
        self.tables.iter().find(|o| o.table == table)
    }

    /// Tables that failed.
    pub fn failed(&self) -> Vec<&TableOutcome> {
        self.tables
            .iter()
            .filter(|o| matches!(o.status, TableStatus::Failed { .. }))
            .collect()
    }

    /// Tables that were skipped.
    pub fn skipped(&self) -> Vec<&TableOutcome> {
        self.tables
            .iter()
            .filter(|o| matches!(o.status, TableStatus::Skipped(_)))
            .collect()
    }

    /// Whether every managed table made it.
    pub fn is_success(&self) -> bool {
        self.failed().is_empty() && !self.cancelled
    }

    /// Tables to pass to `--tables` on a re-run: failures, then cancelled.
    pub fn rerun_tables(&self) -> Vec<&str> {
        self.tables
            .iter()
            .filter(|o| {
                matches!(
                    o.status,
                    TableStatus::Failed { .. } | TableStatus::Skipped(SkipReason::Cancelled)
                )
            })
            .map(|o| o.table.as_str())
            .collect()
    }

    /// Count of tables per strategy, in display order.
    pub fn strategy_counts(&self) -> Vec<(Strategy, usize)> {
        [
            Strategy::NoChange,
            Strategy::MetadataOnly,
            Strategy::IndexOnly,
            Strategy::Rebuild,
        ]
        .into_iter()
        .map(|s| (s, self.tables.iter().filter(|o| o.strategy == Some(s)).count()))
        .filter(|(_, n)| *n > 0)
        .collect()
    }

    /// Multi-line summary for operators.
    pub fn summary(&self) -> String {
        let mut lines = Vec::new();
        let counts = self
            .strategy_counts()
            .into_iter()
            .map(|(s, n)| format!("{} {}", n, s))
            .collect::<Vec<_>>()
            .join(", ");
        lines.push(format!(
            "version {}: {} tables ({}){}",
            self.version,
            self.tables.len(),
            if counts.is_empty() { "none planned".to_string() } else { counts },
            if self.dry_run { ", dry run" } else { "" }
        ));

        let skipped = self.skipped();
        if !skipped.is_empty() {
            let names = skipped
                .iter()
                .map(|o| match &o.status {
                    TableStatus::Skipped(reason) => format!("{} ({})", o.table, reason),
                    _ => o.table.clone(),
                })
                .collect::<Vec<_>>()
                .join(", ");
            lines.push(format!("skipped: {}", names));
        }
        let failed = self.failed();
        if !failed.is_empty() {
            let names = failed.iter().map(|o| o.table.as_str()).collect::<Vec<_>>().join(", ");
            lines.push(format!("failed: {}", names));
        }
        let rerun = self.rerun_tables();
        if !rerun.is_empty() {
            lines.push(format!("re-run with: --tables {}", rerun.join(",")));
        }
        if self.version_recorded {
            lines.push(format!("recorded version {}", self.version));
        } else if !self.dry_run {
            lines.push("version not recorded".to_string());
        }
        lines.join("\n")
    }
}
