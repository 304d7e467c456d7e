//! Test data generation for benchmarks.
//!
//! Builds databases in an older layout so the current catalog has real
//! rebuild work to do. Generation is seeded for reproducibility.

use rand::distributions::Alphanumeric;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rusqlite::{params, Connection};
use tabula_core::migration::{MigrationConfig, MigrationEngine, MigrationRequest};
use tabula_core::{FieldSize, SchemaCatalog, TableSpec, TypeTag};

/// Scale factor for benchmark data generation.
#[derive(Clone, Copy, Debug, Default)]
pub enum Scale {
    /// ~1,000 ledger rows.
    Small,
    /// ~20,000 ledger rows.
    #[default]
    Medium,
    /// ~100,000 ledger rows.
    Large,
}

impl Scale {
    /// Ledger rows at this scale.
    pub fn count(&self) -> usize {
        match self {
            Scale::Small => 1_000,
            Scale::Medium => 20_000,
            Scale::Large => 100_000,
        }
    }

    /// Debtor accounts at this scale.
    pub fn accounts(&self) -> usize {
        (self.count() / 20).max(1)
    }
}

/// The ledger and debtor tables as they were before capture dates and
/// account status existed.
pub fn legacy_catalog() -> SchemaCatalog {
    use TypeTag::*;

    let gentrn = TableSpec::new("gentrn", "General Ledger Transactions")
        .with_field("glt_cono", UnsignedInteger, FieldSize::new(7), "Company Number", "Coy")
        .with_field("glt_acno", SignedInteger, FieldSize::new(7), "Account Number", "Acc-Num")
        .with_field("glt_trdt", Date, FieldSize::new(10), "Transaction Date", "Trans-Date")
        .with_field("glt_type", UnsignedInteger, FieldSize::new(2), "Transaction Type", "TT")
        .with_field("glt_refno", Alpha, FieldSize::new(9), "Reference Number", "Reference")
        .with_field("glt_batch", Alpha, FieldSize::new(7), "Batch Number", "Batch")
        .with_field("glt_tramt", SignedDecimal, FieldSize::decimal(13, 2), "Amount", "Amount")
        .with_field("glt_desc", Alpha, FieldSize::new(20), "Details", "Details")
        .with_field("glt_seq", UnsignedInteger, FieldSize::new(10), "Sequence", "Sequence")
        .with_index(true, &["glt_seq"]);
    let drsmst = TableSpec::new("drsmst", "Debtors Master")
        .with_field("drm_cono", UnsignedInteger, FieldSize::new(7), "Company Number", "Coy")
        .with_field("drm_chain", UnsignedInteger, FieldSize::new(3), "Chain Store", "Chn")
        .with_field("drm_acno", UpperAlpha, FieldSize::new(7), "Account Number", "Acc-Num")
        .with_field("drm_name", Alpha, FieldSize::new(30), "Name", "Name")
        .with_field("drm_limit", UnsignedInteger, FieldSize::new(7), "Credit Limit", "Limit")
        .with_index(true, &["drm_cono", "drm_chain", "drm_acno"]);

    SchemaCatalog::new(vec![gentrn, drsmst]).expect("Failed to build legacy catalog")
}

fn random_text(rng: &mut StdRng, len: usize) -> String {
    rng.sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// An in-memory database in the legacy layout, populated at `scale`.
pub fn legacy_database(scale: Scale, seed: u64) -> Connection {
    let mut conn = Connection::open_in_memory().expect("Failed to open SQLite in-memory database");
    let engine = MigrationEngine::new(legacy_catalog(), MigrationConfig::default());
    engine
        .run(&mut conn, &MigrationRequest::new("legacy"))
        .expect("Failed to create legacy layout");

    let mut rng = StdRng::seed_from_u64(seed);
    let tx = conn.transaction().expect("Failed to begin transaction");
    {
        let mut insert = tx
            .prepare(
                "INSERT INTO gentrn (glt_cono, glt_acno, glt_trdt, glt_type, glt_refno, \
                 glt_batch, glt_tramt, glt_desc, glt_seq) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )
            .expect("Failed to prepare");
        for seq in 0..scale.count() {
            let date = 20_200_000
                + rng.gen_range(0..4) * 10_000
                + rng.gen_range(1..13) * 100
                + rng.gen_range(1..29);
            insert
                .execute(params![
                    1,
                    rng.gen_range(1000..9999),
                    date,
                    rng.gen_range(1..8),
                    random_text(&mut rng, 9),
                    random_text(&mut rng, 7),
                    rng.gen_range(-100_000.0..100_000.0f64),
                    random_text(&mut rng, 20),
                    seq as i64,
                ])
                .expect("Failed to insert");
        }

        let mut insert = tx
            .prepare(
                "INSERT INTO drsmst (drm_cono, drm_chain, drm_acno, drm_name, drm_limit) \
                 VALUES (1, 0, ?1, ?2, ?3)",
            )
            .expect("Failed to prepare");
        for account in 0..scale.accounts() {
            insert
                .execute(params![
                    format!("A{:06}", account),
                    random_text(&mut rng, 30),
                    rng.gen_range(0..50_000),
                ])
                .expect("Failed to insert");
        }
    }
    tx.commit().expect("Failed to commit");
    conn
}
