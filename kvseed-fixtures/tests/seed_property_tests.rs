//! End-to-end fixture tests against both store backends.

use kvseed_core::{QualifiedColumn, SeedConfig, SeedError, StoreConfig, StoreError};
use kvseed_fixtures::{
    digest, verify, FixtureSeeder, LookupTable, DATA_FAMILY, LOOKUP_FAMILY, LOOKUP_TABLE,
};
use kvseed_storage::{LmdbStore, MockStore, StoreClient};
use proptest::prelude::*;
use tempfile::TempDir;

fn col(s: &str) -> QualifiedColumn {
    QualifiedColumn::parse(s).expect("valid column")
}

fn value(store: &dyn StoreClient, table: &str, row: &str, column: &str) -> Option<String> {
    store
        .get(table, row, &col(column))
        .expect("get should succeed")
        .map(|c| c.value_lossy())
}

fn open_lmdb(dir: &TempDir) -> LmdbStore {
    LmdbStore::open(dir.path(), 16, 8).expect("store open should succeed")
}

#[test]
fn test_end_to_end_scenario_lmdb() {
    let dir = TempDir::new().expect("TempDir creation should succeed");
    let store = open_lmdb(&dir);
    let config = SeedConfig::canonical("e2e", StoreConfig::lmdb(dir.path()));
    FixtureSeeder::new(&store, &config)
        .seed()
        .expect("seed should succeed");

    let t = "e2e_table";
    assert_eq!(value(&store, t, "row_1", "col:name").as_deref(), Some("row_1"));
    assert_eq!(value(&store, t, "row_1", "col:number").as_deref(), Some("1"));
    assert_eq!(value(&store, t, "row_1", "col:doub").as_deref(), Some("1.001"));
    assert_eq!(
        value(&store, t, "row_1", "col:longnum").as_deref(),
        Some("100000000000")
    );
    assert_eq!(value(&store, t, "row_1", "col:bool").as_deref(), Some("false"));

    assert_eq!(value(&store, t, "row_2", "col:name").as_deref(), Some("row_2"));
    assert_eq!(value(&store, t, "row_2", "col:number").as_deref(), Some("2"));
    assert_eq!(value(&store, t, "row_2", "col:doub").as_deref(), Some("2.002"));
    assert_eq!(
        value(&store, t, "row_2", "col:longnum").as_deref(),
        Some("200000000000")
    );
    assert_eq!(value(&store, t, "row_2", "col:bool").as_deref(), Some("true"));

    assert_eq!(
        value(&store, t, "row_100", "col:longnum").as_deref(),
        Some("10000000000000")
    );
    assert_eq!(value(&store, t, "row_100", "col:bool").as_deref(), Some("true"));
    assert!(value(&store, t, "row_0", "col:name").is_none());
    assert!(value(&store, t, "row_101", "col:name").is_none());
}

#[test]
fn test_data_table_schema_and_row_count() {
    let store = MockStore::new();
    let config = SeedConfig::canonical("schema", StoreConfig::memory());
    FixtureSeeder::new(&store, &config)
        .seed()
        .expect("seed should succeed");

    let desc = store
        .describe("schema_table")
        .expect("describe should succeed")
        .expect("table should exist");
    assert_eq!(desc.families, vec![DATA_FAMILY.to_string()]);

    let rows = store.scan("schema_table").expect("scan should succeed");
    assert_eq!(rows.len(), 100);
    assert!(rows.iter().all(|r| r.cells.len() == 5));
}

#[test]
fn test_mapping_row_is_exact() {
    let store = MockStore::new();
    let config = SeedConfig::canonical("mapped", StoreConfig::memory());
    FixtureSeeder::new(&store, &config)
        .seed()
        .expect("seed should succeed");

    let desc = store
        .describe(LOOKUP_TABLE)
        .expect("describe should succeed")
        .expect("lookup table should exist");
    assert!(desc.has_family(LOOKUP_FAMILY));

    let row = store
        .row(LOOKUP_TABLE, "mapped_table")
        .expect("row should succeed");
    assert_eq!(row.len(), 5);
    for (logical, source) in [
        ("name", "col:name"),
        ("num", "col:number"),
        ("dub", "col:doub"),
        ("longnum", "col:longnum"),
        ("bool", "col:bool"),
    ] {
        let cell = &row[&col(&format!("mapping:{}", logical))];
        assert_eq!(cell.as_str(), Some(source));
    }

    let mappings = LookupTable::new(&store)
        .mappings("mapped_table")
        .expect("mappings should succeed")
        .expect("mappings should exist");
    assert_eq!(mappings["num"], col("col:number"));
    assert_eq!(mappings["dub"], col("col:doub"));
}

#[test]
fn test_rerun_fails_with_table_exists() {
    let dir = TempDir::new().expect("TempDir creation should succeed");
    let store = open_lmdb(&dir);
    let config = SeedConfig::canonical("rerun", StoreConfig::lmdb(dir.path()));
    let seeder = FixtureSeeder::new(&store, &config);
    seeder.seed().expect("first seed should succeed");

    let err = seeder.seed().expect_err("second seed should fail");
    assert!(matches!(
        err,
        SeedError::Store(StoreError::TableExists { ref table }) if table == "rerun_table"
    ));
}

#[test]
fn test_two_fixtures_share_lookup_table() {
    let store = MockStore::new();
    let a = SeedConfig::canonical("first", StoreConfig::memory());
    let b = SeedConfig::canonical("second", StoreConfig::memory());
    let ra = FixtureSeeder::new(&store, &a).seed().expect("seed a");
    let rb = FixtureSeeder::new(&store, &b).seed().expect("seed b");
    assert!(ra.lookup_table_created);
    assert!(!rb.lookup_table_created);

    FixtureSeeder::new(&store, &a).teardown().expect("teardown a");
    let lookup = LookupTable::new(&store);
    assert!(lookup.mappings("first_table").expect("lookup").is_none());
    assert!(lookup.mappings("second_table").expect("lookup").is_some());
    assert!(verify(&store, &b).expect("verify b").is_ok());
}

#[test]
fn test_seed_then_verify_after_reopen() {
    let dir = TempDir::new().expect("TempDir creation should succeed");
    let config = SeedConfig::canonical("reopen", StoreConfig::lmdb(dir.path()));
    {
        let store = open_lmdb(&dir);
        FixtureSeeder::new(&store, &config)
            .seed()
            .expect("seed should succeed");
    }

    let store = open_lmdb(&dir);
    let report = verify(&store, &config).expect("verify should succeed");
    assert!(report.is_ok(), "{:?}", report.mismatches);
}

#[test]
fn test_backends_produce_identical_digests() {
    let dir = TempDir::new().expect("TempDir creation should succeed");
    let lmdb = open_lmdb(&dir);
    let mock = MockStore::new();
    let config = SeedConfig::canonical("same", StoreConfig::memory());

    FixtureSeeder::new(&lmdb, &config).seed().expect("seed lmdb");
    FixtureSeeder::new(&mock, &config).seed().expect("seed mock");

    assert_eq!(
        digest(&lmdb, "same_table").expect("digest lmdb"),
        digest(&mock, "same_table").expect("digest mock")
    );
    assert_eq!(
        digest(&lmdb, LOOKUP_TABLE).expect("digest lmdb"),
        digest(&mock, LOOKUP_TABLE).expect("digest mock")
    );
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(20))]

    /// Any valid test name seeds a table named from the template, and the
    /// seeded store verifies cleanly.
    #[test]
    fn prop_any_test_name_seeds_and_verifies(name in "[a-z][a-z0-9_]{0,20}") {
        let store = MockStore::new();
        let config = SeedConfig::canonical(name.clone(), StoreConfig::memory());
        let report = FixtureSeeder::new(&store, &config).seed().unwrap();

        prop_assert_eq!(&report.data_table, &format!("{}_table", name));
        prop_assert!(verify(&store, &config).unwrap().is_ok());
    }

    /// Every seeded row obeys the column formulas.
    #[test]
    fn prop_seeded_rows_follow_index(i in 1u64..=100) {
        let store = MockStore::new();
        let config = SeedConfig::canonical("formula", StoreConfig::memory());
        FixtureSeeder::new(&store, &config).seed().unwrap();

        let row = format!("row_{}", i);
        let get = |c: &str| value(&store, "formula_table", &row, c).unwrap();
        prop_assert_eq!(get("col:name"), row.clone());
        prop_assert_eq!(get("col:number"), i.to_string());
        prop_assert_eq!(get("col:doub").parse::<f64>().unwrap(), 1.001 * i as f64);
        prop_assert_eq!(get("col:longnum"), (i as i64 * 100_000_000_000).to_string());
        prop_assert_eq!(get("col:bool"), (i % 2 == 0).to_string());
    }
}
