//! Cooperative progress reporting.

use super::plan::Strategy;

/// A unit of progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent<'a> {
    /// A table is about to be migrated.
    TableStarted {
        /// Table name.
        table: &'a str,
        /// Position in the run, from 1.
        position: usize,
        /// Tables in the run.
        total: usize,
        /// Chosen strategy.
        strategy: Strategy,
    },
    /// A rebuild batch was written.
    Batch {
        /// Table name.
        table: &'a str,
        /// Rows written so far.
        rows: u64,
        /// Batch number, from 1.
        batch: usize,
    },
    /// A table's transaction has ended.
    TableFinished {
        /// Table name.
        table: &'a str,
        /// Whether it committed.
        succeeded: bool,
    },
}

/// The callback's answer.
///
/// `Stop` in answer to [`ProgressEvent::TableStarted`] skips that table.
/// Given for any other event, it lets the table in flight finish and skips
/// every table after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProgressSignal {
    /// Keep going.
    #[default]
    Continue,
    /// Start no further tables.
    Stop,
}
