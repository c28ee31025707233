use std::fs;
use std::path::Path;

use tempfile::tempdir;
use watm_core::{ParamValue, SeriesSource, WatmError};
use watm_io::DatasetStore;

fn write(dir: &Path, name: &str, body: &str) {
    fs::write(dir.join(name), body).unwrap();
}

fn seed(dir: &Path) {
    write(
        dir,
        "scenarios.csv",
        "scenario_name,P1,P2\nsc_0,1,A\nsc_1,1,B\nsc_2,2,A\nsc_3,2,B\n",
    );
    write(dir, "time.csv", "step,time\n0,2020\n1,2025\n2,2030\n");
    write(
        dir,
        "yrb_wsi.csv",
        "scenario_name,step,value\nsc_0,0,0.1\nsc_0,1,0.2\nsc_3,0,0.4\nsc_9,0,9.9\n",
    );
    write(dir, "gdp.csv", "scenario_id,step,value\nsc_1,0,10.0\n");
    write(dir, "variables_map.json", r#"{"YRB WSI": "yrb_wsi"}"#);
}

#[test]
fn loads_catalog_with_legacy_id_column() {
    let dir = tempdir().unwrap();
    seed(dir.path());
    let store = DatasetStore::open(dir.path()).unwrap();
    let catalog = store.load_catalog().unwrap();

    assert_eq!(catalog.scenarios.len(), 4);
    assert_eq!(catalog.scenarios.param_names(), ["P1", "P2"]);
    assert_eq!(
        catalog.scenarios.params_of("sc_2").unwrap(),
        [ParamValue::from(2.0), ParamValue::from("A")]
    );
    assert_eq!(catalog.time.time_of(1), Some(2025.0));
    assert_eq!(catalog.names.storage_key("YRB WSI"), "yrb_wsi");
}

#[test]
fn lists_variable_tables_only() {
    let dir = tempdir().unwrap();
    seed(dir.path());
    let store = DatasetStore::open(dir.path()).unwrap();
    assert_eq!(store.storage_keys().unwrap(), vec!["gdp", "yrb_wsi"]);
    assert!(store.has_series("gdp"));
    assert!(!store.has_series("time"));
    assert!(!store.has_series("missing"));
}

#[test]
fn load_series_applies_predicate_while_reading() {
    let dir = tempdir().unwrap();
    seed(dir.path());
    let store = DatasetStore::open(dir.path()).unwrap();
    let series = store
        .load_series("yrb_wsi", &|id| id == "sc_0" || id == "sc_3")
        .unwrap();
    let ids: Vec<&str> = series
        .points()
        .iter()
        .map(|p| p.scenario_id.as_str())
        .collect();
    assert_eq!(ids, vec!["sc_0", "sc_0", "sc_3"]);
    assert_eq!(series.points()[1].step, 1);
}

#[test]
fn missing_variable_table_is_variable_not_found() {
    let dir = tempdir().unwrap();
    seed(dir.path());
    let store = DatasetStore::open(dir.path()).unwrap();
    assert!(matches!(
        store.load_series("nope", &|_| true),
        Err(WatmError::VariableNotFound { .. })
    ));
}

#[test]
fn missing_directory_is_a_storage_error() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("absent");
    assert!(matches!(
        DatasetStore::open(&missing),
        Err(WatmError::Storage(_))
    ));
}

#[test]
fn inconsistent_name_map_is_rejected() {
    let dir = tempdir().unwrap();
    seed(dir.path());
    write(
        dir.path(),
        "variables_map.json",
        r#"{"YRB WSI": "yrb_wsi", "YRB-WSI": "yrb_wsi"}"#,
    );
    let store = DatasetStore::open(dir.path()).unwrap();
    assert!(matches!(
        store.load_name_map(),
        Err(WatmError::DataIntegrity(_))
    ));
}

#[test]
fn duplicate_steps_are_a_data_integrity_error() {
    let dir = tempdir().unwrap();
    seed(dir.path());
    write(dir.path(), "time.csv", "step,time\n0,2020\n0,2021\n");
    let store = DatasetStore::open(dir.path()).unwrap();
    assert!(matches!(
        store.load_time(),
        Err(WatmError::DataIntegrity(_))
    ));
}

#[test]
fn upper_case_extensions_are_listed_and_loadable() {
    let dir = tempdir().unwrap();
    seed(dir.path());
    write(dir.path(), "Flow.CSV", "scenario_id,step,value\nsc_2,1,3.5\n");
    let store = DatasetStore::open(dir.path()).unwrap();

    assert_eq!(store.storage_keys().unwrap(), vec!["Flow", "gdp", "yrb_wsi"]);
    assert!(store.has_series("Flow"));
    let series = store.load_series("Flow", &|_| true).unwrap();
    assert_eq!(series.points()[0].value, 3.5);
}
