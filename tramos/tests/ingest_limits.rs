use serde_json::json;
use tramos::limits::MAX_RECORDS;
use tramos::{DashboardConfig, DataStore, DatasetError, FilterEngine, FilterError};

#[test]
fn dataset_cap_exceeded() {
    let rows: Vec<_> = (0..MAX_RECORDS + 1).map(|_| json!({})).collect();
    let err = DataStore::from_json_value(json!(rows)).unwrap_err();
    assert!(matches!(err, DatasetError::TooManyRecords { count, .. } if count == MAX_RECORDS + 1));
}

#[test]
fn dataset_must_be_an_array() {
    assert!(matches!(
        DataStore::from_json_value(json!({"tramos": []})),
        Err(DatasetError::NotAnArray)
    ));
    assert!(matches!(DataStore::from_json_str("[{"), Err(DatasetError::Json(_))));
}

#[test]
fn loose_values_are_tolerated() {
    let store = DataStore::from_json_value(json!([
        {"ID": "7", "SUBREGION_1": "Norte", "Avance": "0,25", "Longitud(m)": null},
        {"SUBREGION": "", "MPIO_NOMBRE": 12, "VALOR_CTO": "abc"},
        "not a row",
        {"Avance": "1e999"}
    ]))
    .unwrap();
    assert_eq!(store.len(), 4);
    let first = store.get(0).unwrap();
    assert_eq!(first.id, Some(7.0));
    assert_eq!(first.subregion.as_deref(), Some("Norte"));
    assert_eq!(first.longitud_tramo_km, None);
    let second = store.get(1).unwrap();
    assert_eq!(second.municipio.as_deref(), Some("12"));
    assert_eq!(second.valor_contrato, None);
    assert_eq!(store.get(2).unwrap(), &tramos::Record::default());
    assert_eq!(store.get(3).unwrap().avance, None);
}

#[test]
fn bad_filter_values_are_rejected() {
    let e = FilterEngine::new(DataStore::default());
    let err = e.set_filter_named("minAvance", &json!("mucho")).unwrap_err();
    assert!(matches!(err, FilterError::InvalidValue { .. }));
    assert!(e.set_filter_named("subregion", &json!(3)).is_err());
    assert!(e.set_filter_named("minAvance", &json!("40")).is_ok());
    assert_eq!(e.state().min_avance, Some(40.0));
    assert!(e.set_filter_named("maxAvance", &json!(null)).is_ok());
}

#[test]
fn overlong_search_is_truncated() {
    let e = FilterEngine::new(DataStore::default());
    let long = "ñ".repeat(10_000);
    e.set_filter_named("search", &json!(long)).unwrap();
    let search = e.state().search;
    assert!(search.len() <= tramos::limits::MAX_SEARCH_LEN);
    assert!(search.chars().all(|c| c == 'ñ'));
}

#[test]
fn config_rejects_wrong_types() {
    assert!(DashboardConfig::from_json_value(json!({"nominalMunicipios": "muchos"})).is_err());
    assert_eq!(
        DashboardConfig::from_json_value(json!({"nominalMunicipios": null}))
            .unwrap()
            .nominal_municipios,
        None
    );
}
