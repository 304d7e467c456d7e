//! Integration tests for the migration engine.

use rusqlite::{params, Connection};
use tabula_core::migration::{
    MigrationConfig, MigrationEngine, MigrationRequest, PlanReason, SkipReason, Strategy,
    TableStatus, VersionTracker,
};
use tabula_core::{sql, FieldSize, SchemaCatalog, TableSpec, TypeTag};

struct TestContext {
    conn: Connection,
    _dir: tempfile::TempDir,
}

impl TestContext {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let conn = Connection::open(dir.path().join("tabula.db")).unwrap();
        Self { conn, _dir: dir }
    }

    fn migrate(&mut self, catalog: &SchemaCatalog, request: &MigrationRequest) -> tabula_core::RunReport {
        self.migrate_with(catalog, MigrationConfig::default(), request)
    }

    fn migrate_with(
        &mut self,
        catalog: &SchemaCatalog,
        config: MigrationConfig,
        request: &MigrationRequest,
    ) -> tabula_core::RunReport {
        MigrationEngine::new(catalog.clone(), config)
            .run(&mut self.conn, request)
            .unwrap()
    }

    fn count(&self, table: &str) -> u64 {
        sql::count_rows(&self.conn, table).unwrap()
    }

    fn strings(&self, query: &str) -> Vec<String> {
        let mut stmt = self.conn.prepare(query).unwrap();
        stmt.query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap()
    }

    fn integers(&self, query: &str) -> Vec<i64> {
        let mut stmt = self.conn.prepare(query).unwrap();
        stmt.query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap()
    }

    fn index_set(&self, table: &str) -> Vec<(String, bool, Vec<String>)> {
        sql::live_indexes(&self.conn, table)
            .unwrap()
            .into_iter()
            .map(|i| (i.name, i.unique, i.columns))
            .collect()
    }
}

fn table_t(b_width: u16, b_type: TypeTag) -> TableSpec {
    TableSpec::new("t", "Test Table")
        .with_field("a", TypeTag::SignedInteger, FieldSize::new(7), "Number", "Num")
        .with_field("b", b_type, FieldSize::new(b_width), "Name", "Name")
        .with_index(true, &["a"])
}

fn catalog(tables: Vec<TableSpec>) -> SchemaCatalog {
    SchemaCatalog::new(tables).unwrap()
}

fn seed_business_rows(ctx: &TestContext) {
    ctx.conn
        .execute_batch(
            "INSERT INTO drsmst (drm_cono, drm_chain, drm_acno, drm_name, drm_stat) \
                 VALUES (1, 0, 'A001', 'Acme Stores', 'N'); \
             INSERT INTO drsage (dra_cono, dra_chain, dra_acno, dra_amt) VALUES (1, 0, 'A001', 150.25); \
             INSERT INTO gentrn (glt_cono, glt_acno, glt_trdt, glt_tramt, glt_capdt, glt_seq) \
                 VALUES (1, 1000, 20240105, 99.99, 20240106, 1); \
             INSERT INTO gentrn (glt_cono, glt_acno, glt_trdt, glt_tramt, glt_capdt, glt_seq) \
                 VALUES (1, 2000, 20240101, -99.99, 20240102, 2);",
        )
        .unwrap();
}

#[test]
fn test_builtin_catalog_is_idempotent() {
    let mut ctx = TestContext::new();
    let catalog = SchemaCatalog::builtin().unwrap();
    let request = MigrationRequest::new("6.15").with_cleanup(true);

    let first = ctx.migrate(&catalog, &request);
    assert!(first.is_success(), "{}", first.summary());
    assert!(first.version_recorded);
    seed_business_rows(&ctx);

    let counts: Vec<u64> = catalog.table_names().iter().map(|t| ctx.count(t)).collect();
    let indexes: Vec<_> = catalog.table_names().iter().map(|t| ctx.index_set(t)).collect();

    let second = ctx.migrate(&catalog, &MigrationRequest::new("6.15"));
    assert!(second.is_success());
    for outcome in &second.tables {
        assert_eq!(outcome.strategy, Some(Strategy::NoChange), "{}", outcome);
        assert_eq!(outcome.status, TableStatus::Unchanged);
    }
    let counts_after: Vec<u64> = catalog.table_names().iter().map(|t| ctx.count(t)).collect();
    let indexes_after: Vec<_> = catalog.table_names().iter().map(|t| ctx.index_set(t)).collect();
    assert_eq!(counts, counts_after);
    assert_eq!(indexes, indexes_after);
}

#[test]
fn test_forced_rebuild_preserves_row_counts() {
    let mut ctx = TestContext::new();
    let catalog = SchemaCatalog::builtin().unwrap();
    ctx.migrate(&catalog, &MigrationRequest::new("6.15").with_cleanup(true));
    seed_business_rows(&ctx);
    let before: Vec<u64> = catalog.table_names().iter().map(|t| ctx.count(t)).collect();

    let report = ctx.migrate_with(
        &catalog,
        MigrationConfig::default().with_max_parameters(25),
        &MigrationRequest::new("6.15").with_force_rebuild(true),
    );
    assert!(report.is_success(), "{}", report.summary());
    assert!(report
        .tables
        .iter()
        .all(|o| o.strategy == Some(Strategy::Rebuild)));

    let after: Vec<u64> = catalog.table_names().iter().map(|t| ctx.count(t)).collect();
    assert_eq!(before, after);
    assert_eq!(
        ctx.integers("SELECT glt_seq FROM gentrn ORDER BY rowid"),
        vec![2, 1],
        "transactions replay in capture-date order"
    );
}

#[test]
fn test_widened_text_is_preserved_and_garbage_defaults() {
    let mut ctx = TestContext::new();
    let old = catalog(vec![table_t(10, TypeTag::Alpha).with_field(
        "c",
        TypeTag::Blob,
        FieldSize::new(0),
        "Raw",
        "Raw",
    )]);
    ctx.migrate(&old, &MigrationRequest::new("1"));
    ctx.conn
        .execute_batch(
            "INSERT INTO t (a, b, c) VALUES (1, 'fifteen chars!!', X'FFFE'); \
             INSERT INTO t (a, b, c) VALUES (2, 'short', X'6869');",
        )
        .unwrap();

    let new = catalog(vec![table_t(20, TypeTag::Alpha).with_field(
        "c",
        TypeTag::Alpha,
        FieldSize::new(20),
        "Raw",
        "Raw",
    )]);
    let report = ctx.migrate(&new, &MigrationRequest::new("2"));
    let outcome = report.outcome("t").unwrap();
    assert_eq!(outcome.strategy, Some(Strategy::Rebuild));
    assert_eq!(
        outcome.reason,
        Some(PlanReason::FieldChanged {
            field: "b".to_string()
        })
    );
    assert_eq!(outcome.status, TableStatus::Rebuilt { rows: 2 });

    assert_eq!(
        ctx.strings("SELECT b FROM t ORDER BY a"),
        vec!["fifteen chars!!", "short"]
    );
    assert_eq!(ctx.strings("SELECT c FROM t ORDER BY a"), vec!["", "hi"]);
    assert_eq!(
        ctx.strings("SELECT ff_size FROM ffield WHERE ff_tabl = 't' ORDER BY ff_seq"),
        vec!["7", "20", "20"]
    );
}

#[test]
fn test_description_change_rewrites_metadata_only() {
    let mut ctx = TestContext::new();
    ctx.migrate(&catalog(vec![table_t(10, TypeTag::Alpha)]), &MigrationRequest::new("1"));
    ctx.conn
        .execute_batch(
            "INSERT INTO t (a, b) VALUES (1, 'x'); \
             INSERT INTO t (a, b) VALUES (2, 'y'); \
             INSERT INTO t (a, b) VALUES (3, 'z'); \
             DELETE FROM t WHERE a = 1;",
        )
        .unwrap();

    let mut changed = table_t(10, TypeTag::Alpha);
    changed.fields[0].description = "Account Number".to_string();
    let report = ctx.migrate(&catalog(vec![changed]), &MigrationRequest::new("2"));

    let outcome = report.outcome("t").unwrap();
    assert_eq!(outcome.strategy, Some(Strategy::MetadataOnly));
    assert_eq!(outcome.status, TableStatus::MetadataUpdated);
    // A rebuild would have renumbered the rows.
    assert_eq!(ctx.integers("SELECT rowid FROM t ORDER BY rowid"), vec![2, 3]);
    assert_eq!(
        ctx.strings("SELECT ff_desc FROM ffield WHERE ff_tabl = 't' ORDER BY ff_seq"),
        vec!["Account Number", "Name"]
    );
}

#[test]
fn test_indexes_converge_on_catalog() {
    let mut ctx = TestContext::new();
    ctx.migrate(&catalog(vec![table_t(10, TypeTag::Alpha)]), &MigrationRequest::new("1"));

    let new = TableSpec::new("t", "Test Table")
        .with_field("a", TypeTag::SignedInteger, FieldSize::new(7), "Number", "Num")
        .with_field("b", TypeTag::Alpha, FieldSize::new(10), "Name", "Name")
        .with_index(false, &["b", "a"])
        .with_index(false, &["a"]);
    let report = ctx.migrate(&catalog(vec![new]), &MigrationRequest::new("2"));
    assert_eq!(report.outcome("t").unwrap().strategy, Some(Strategy::IndexOnly));

    assert_eq!(
        ctx.index_set("t"),
        vec![
            ("t_key0".to_string(), false, vec!["b".to_string(), "a".to_string()]),
            ("t_key1".to_string(), false, vec!["a".to_string()]),
        ]
    );
    assert_eq!(
        ctx.integers("SELECT COUNT(*) FROM ftable WHERE ft_tabl = 't'"),
        vec![2]
    );
}

#[test]
fn test_large_text_indexes_are_skipped() {
    let mut ctx = TestContext::new();
    let catalog = SchemaCatalog::builtin().unwrap();
    ctx.migrate(&catalog, &MigrationRequest::new("6.15").with_tables(["drsmst"]));

    let names: Vec<String> = ctx.index_set("drsmst").into_iter().map(|i| i.0).collect();
    assert_eq!(names, vec!["drsmst_key0", "drsmst_key1"]);
}

#[test]
fn test_failed_table_is_isolated_and_rerunnable() {
    let mut ctx = TestContext::new();
    let t1 = table_t(10, TypeTag::Alpha);
    let t2 = TableSpec::new("t2", "Second").with_field(
        "k",
        TypeTag::UnsignedInteger,
        FieldSize::new(5),
        "Key",
        "Key",
    );
    ctx.migrate(&catalog(vec![t1.clone(), t2.clone()]), &MigrationRequest::new("1"));
    ctx.conn
        .execute_batch("INSERT INTO t2 (k) VALUES (7); INSERT INTO t2 (k) VALUES (7);")
        .unwrap();

    let mut t1_new = t1;
    t1_new.description = "Renamed".to_string();
    t1_new.fields[1].heading = "Full Name".to_string();
    let v2 = catalog(vec![t1_new, t2.with_index(true, &["k"])]);
    let report = ctx.migrate(&v2, &MigrationRequest::new("2"));

    assert_eq!(report.outcome("t").unwrap().status, TableStatus::MetadataUpdated);
    assert!(matches!(
        report.outcome("t2").unwrap().status,
        TableStatus::Failed { .. }
    ));
    assert!(!report.version_recorded);
    assert!(report.summary().contains("re-run with: --tables t2"));
    assert!(ctx.index_set("t2").is_empty());
    assert_eq!(ctx.count("t2"), 2);
    let version = VersionTracker::new(&v2).current_version(&ctx.conn).unwrap().unwrap();
    assert_eq!(version.version, "1");

    ctx.conn.execute("DELETE FROM t2 WHERE rowid = 2", []).unwrap();
    let rerun: Vec<String> = report.rerun_tables().iter().map(|t| t.to_string()).collect();
    let report = ctx.migrate(&v2, &MigrationRequest::new("2").with_tables(rerun));
    assert!(report.is_success());
    assert_eq!(report.outcome("t2").unwrap().status, TableStatus::IndexesUpdated);
    let version = VersionTracker::new(&v2).current_version(&ctx.conn).unwrap().unwrap();
    assert_eq!(version.version, "2");
}

#[test]
fn test_unmanaged_tables_left_alone_until_cleanup() {
    let mut ctx = TestContext::new();
    let catalog = catalog(vec![table_t(10, TypeTag::Alpha)]);
    ctx.conn
        .execute_batch("CREATE TABLE legacy (x INTEGER); INSERT INTO legacy VALUES (1);")
        .unwrap();

    let report = ctx.migrate(&catalog, &MigrationRequest::new("1"));
    assert_eq!(
        report.outcome("legacy").unwrap().status,
        TableStatus::Skipped(SkipReason::Unmanaged)
    );
    assert!(report.is_success());
    assert_eq!(ctx.count("legacy"), 1);

    let report = ctx.migrate(&catalog, &MigrationRequest::new("1").with_cleanup(true));
    let cleanup = report.cleanup.as_ref().unwrap();
    assert_eq!(cleanup.dropped_tables, vec!["legacy"]);
    assert!(report.outcome("legacy").is_none());
    assert!(!sql::table_exists(&ctx.conn, "legacy").unwrap());

    let mut live = sql::live_tables(&ctx.conn).unwrap();
    live.sort();
    let mut expected: Vec<String> = catalog.table_names().iter().map(|t| t.to_string()).collect();
    expected.sort();
    assert_eq!(live, expected);
}

#[test]
fn test_legacy_fixups_fill_new_fields() {
    let mut ctx = TestContext::new();
    let old = catalog(vec![
        TableSpec::new("ctlynd", "Financial Periods")
            .with_field("cye_period", TypeTag::UnsignedInteger, FieldSize::new(3), "Period", "Per")
            .with_field("cye_start", TypeTag::Date, FieldSize::new(10), "Start", "Start")
            .with_field("cye_end", TypeTag::Date, FieldSize::new(10), "End", "End")
            .with_field("cye_final", TypeTag::UpperAlpha, FieldSize::new(1), "Final", "F"),
        TableSpec::new("gentrn", "General Ledger Transactions")
            .with_field("glt_cono", TypeTag::UnsignedInteger, FieldSize::new(7), "Coy", "Coy")
            .with_field("glt_trdt", TypeTag::Date, FieldSize::new(10), "Date", "Date")
            .with_field("glt_seq", TypeTag::UnsignedInteger, FieldSize::new(10), "Seq", "Seq"),
    ]);
    ctx.migrate(&old, &MigrationRequest::new("5.0"));
    ctx.conn
        .execute_batch(
            "INSERT INTO ctlynd (cye_period, cye_start, cye_end, cye_final) \
                 VALUES (0, 20230301, 20240229, 'Y'); \
             INSERT INTO ctlynd (cye_period, cye_start, cye_end, cye_final) \
                 VALUES (1, 20240301, 20250228, 'N');",
        )
        .unwrap();
    for (seq, date) in [(1, 20240110), (2, 20240105)] {
        ctx.conn
            .execute(
                "INSERT INTO gentrn (glt_cono, glt_trdt, glt_seq) VALUES (1, ?1, ?2)",
                params![date, seq],
            )
            .unwrap();
    }

    let catalog = SchemaCatalog::builtin().unwrap();
    let report = ctx.migrate(
        &catalog,
        &MigrationRequest::new("6.15").with_tables(["ctlynd", "gentrn"]),
    );
    assert!(report.is_success(), "{}", report.summary());
    assert_eq!(
        report.outcome("ctlynd").unwrap().status,
        TableStatus::Rebuilt { rows: 2 }
    );

    assert_eq!(ctx.integers("SELECT cye_cono FROM ctlynd"), vec![1, 1]);
    assert_eq!(
        ctx.integers("SELECT glt_capdt FROM gentrn ORDER BY glt_seq"),
        vec![20240110, 20240105]
    );
}

#[test]
fn test_catalog_file_round_trip() {
    let mut ctx = TestContext::new();
    let original = catalog(vec![table_t(10, TypeTag::Alpha)]);
    let file = tempfile::NamedTempFile::new().unwrap();
    std::fs::write(file.path(), original.to_json().unwrap()).unwrap();

    let loaded = SchemaCatalog::load(file.path()).unwrap();
    assert_eq!(loaded.table_names(), original.table_names());
    let report = ctx.migrate(&loaded, &MigrationRequest::new("1"));
    assert!(report.is_success());
    let second = ctx.migrate(&original, &MigrationRequest::new("1"));
    assert!(second
        .tables
        .iter()
        .all(|o| o.strategy == Some(Strategy::NoChange)));
}

fn create_older_field_table(ctx: &TestContext) {
    ctx.conn
        .execute_batch(
            "CREATE TABLE ffield (ff_tabl TEXT, ff_seq INTEGER, ff_name TEXT, \
                 ff_type TEXT, ff_size TEXT, ff_desc TEXT); \
             INSERT INTO ffield VALUES ('gentrn', 0, 'glt_cono', 'UI', '7', 'Company Number');",
        )
        .unwrap();
}

#[test]
fn test_older_field_table_layout_is_migrated() {
    let mut ctx = TestContext::new();
    create_older_field_table(&ctx);
    let catalog = SchemaCatalog::builtin().unwrap();

    let report = ctx.migrate(&catalog, &MigrationRequest::new("6.15"));
    assert!(report.is_success(), "{}", report.summary());
    assert!(report.failed().is_empty());
    assert!(report.version_recorded);
    assert!(sql::table_columns(&ctx.conn, "ffield")
        .unwrap()
        .contains(&"ff_head".to_string()));
    assert_eq!(
        ctx.strings("SELECT ff_head FROM ffield WHERE ff_tabl = 'gentrn' AND ff_seq = 0"),
        vec!["Coy"]
    );

    let second = ctx.migrate(&catalog, &MigrationRequest::new("6.15"));
    assert!(second
        .tables
        .iter()
        .all(|o| o.strategy == Some(Strategy::NoChange)));
}

#[test]
fn test_dry_run_over_older_field_table_plans_every_table() {
    let mut ctx = TestContext::new();
    create_older_field_table(&ctx);
    let catalog = SchemaCatalog::builtin().unwrap();

    let report = ctx.migrate_with(
        &catalog,
        MigrationConfig::default().with_dry_run(true),
        &MigrationRequest::new("6.15"),
    );
    assert!(report.failed().is_empty(), "{}", report.summary());
    assert!(report.tables.iter().all(|o| o.status == TableStatus::Planned));
    assert!(!sql::table_columns(&ctx.conn, "ffield")
        .unwrap()
        .contains(&"ff_head".to_string()));
}

#[test]
fn test_table_description_change_rewrites_metadata_only() {
    let mut ctx = TestContext::new();
    ctx.migrate(&catalog(vec![table_t(10, TypeTag::Alpha)]), &MigrationRequest::new("1"));
    ctx.conn
        .execute_batch("INSERT INTO t (a, b) VALUES (1, 'x'); INSERT INTO t (a, b) VALUES (2, 'y');")
        .unwrap();
    let rowids = ctx.integers("SELECT rowid FROM t ORDER BY rowid");

    let mut renamed = table_t(10, TypeTag::Alpha);
    renamed.description = "Renamed Table".to_string();
    let renamed = catalog(vec![renamed]);
    let report = ctx.migrate(&renamed, &MigrationRequest::new("2"));
    let outcome = report.outcome("t").unwrap();
    assert_eq!(outcome.strategy, Some(Strategy::MetadataOnly));
    assert_eq!(outcome.reason, Some(PlanReason::Descriptive));
    assert_eq!(
        ctx.strings("SELECT ft_desc FROM ftable WHERE ft_tabl = 't'"),
        vec!["Renamed Table"]
    );
    assert_eq!(ctx.integers("SELECT rowid FROM t ORDER BY rowid"), rowids);

    let again = ctx.migrate(&renamed, &MigrationRequest::new("2"));
    assert_eq!(again.outcome("t").unwrap().strategy, Some(Strategy::NoChange));
}
