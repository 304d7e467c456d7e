//! Benchmark fixtures for Tabula.

pub mod fixtures;
