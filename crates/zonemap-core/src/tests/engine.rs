use crate::*;
use futures::executor::block_on;
use serde_json::json;

#[test]
fn default_engine_reads_csv_and_joins() {
    let engine = Engine::new();
    let reg = block_on(engine.build_registry(
        "Zona ID,Estado,PDF ID,Descripción\n007,Activo,abc,Parque\n12.0,En proceso,,\n,Pendiente,,",
    ))
    .unwrap();

    assert_eq!(reg.generation(), 0);
    assert_eq!(reg.len(), 2);
    assert_eq!(reg.report().rows_without_id, 1);
    assert_eq!(reg.keys().collect::<Vec<_>>(), vec!["007", "12"]);

    let (res, status) = reg.lookup(Some("7")).unwrap();
    assert_eq!(res.key, "007");
    assert_eq!(status.state, "Activo");
    assert_eq!(status.linked_document_id.as_deref(), Some("abc"));
    assert_eq!(status.description.as_deref(), Some("Parque"));

    let style = engine.zone_style(Some(status));
    assert_eq!(style.fill_color, "#008000");
    assert_eq!(engine.zone_style(None).fill_color, "#808080");
}

#[test]
fn default_engine_reads_json_envelope() {
    let engine = Engine::new();
    let text = r#"{"rows":[{"id":3,"estado":"Expirado"},{"id":"4","estado":"Pendiente"}]}"#;
    let reg = engine.build_registry_sync(text).unwrap();
    assert_eq!(reg.keys().collect::<Vec<_>>(), vec!["3", "4"]);
    assert_eq!(reg.get("3").unwrap().state, "Expirado");
}

#[test]
fn whitespace_only_feed_is_an_error() {
    let engine = Engine::new();
    let err = engine.build_registry_sync(" \n\t ").unwrap_err();
    assert!(matches!(err, Error::EmptyFeed));
}

#[test]
fn missing_id_column_is_reported() {
    let engine = Engine::new();
    let err = engine.build_registry_sync("color,estado\nx,activo").unwrap_err();
    assert!(matches!(err, Error::MissingIdColumn { .. }), "{err}");
}

#[test]
fn with_config_merges_and_rebuilds() {
    let overrides = ZoneMapConfig::from_value(json!({
        "feed": { "delimiter": "tab" },
        "fields": { "id": ["codigo"] },
        "polygons": { "keyProperty": "zone" },
        "refresh": { "intervalSecs": 60 },
        "palette": { "states": { "cerrado": "#000000" } }
    }));
    let engine = Engine::new().with_config(&overrides).unwrap();

    assert_eq!(engine.feed_options().delimiter, '\t');
    assert_eq!(engine.key_property(), "zone");
    assert_eq!(engine.refresh_interval(), std::time::Duration::from_secs(60));
    assert_eq!(engine.palette().color_for(Some("Cerrado")), "#000000");
    // Untouched defaults survive the merge.
    assert_eq!(engine.palette().color_for(Some("activo")), "#008000");
    assert_eq!(engine.config().get_str("polygons.keyProperty"), Some("zone"));

    let reg = engine
        .build_registry_sync("codigo\testado\n9\tcerrado")
        .unwrap();
    assert_eq!(reg.get("9").unwrap().state, "cerrado");
}

#[test]
fn invalid_config_values_are_rejected() {
    let cases = [
        json!({ "feed": { "format": "xml" } }),
        json!({ "feed": { "rowPolicy": "guess" } }),
        json!({ "feed": { "delimiter": ";;" } }),
        json!({ "feed": { "delimiter": "¦" } }),
        json!({ "polygons": { "keyProperty": " " } }),
        json!({ "refresh": { "intervalSecs": 0 } }),
        json!({ "documents": { "urlTemplate": "https://example.org/" } }),
    ];
    for case in cases {
        let overrides = ZoneMapConfig::from_value(case.clone());
        let err = Engine::new().with_config(&overrides).unwrap_err();
        assert!(matches!(err, Error::Config { .. }), "{case}: {err}");
    }
}

#[test]
fn pad_row_policy_keeps_short_rows() {
    let overrides = ZoneMapConfig::from_value(json!({ "feed": { "rowPolicy": "pad" } }));
    let engine = Engine::new().with_config(&overrides).unwrap();
    let reg = engine
        .build_registry_sync("id,estado,descripcion\n1,activo\n2,pendiente,ok")
        .unwrap();
    assert_eq!(reg.len(), 2);
    assert_eq!(reg.get("1").unwrap().description, None);

    let reg = Engine::new()
        .build_registry_sync("id,estado,descripcion\n1,activo\n2,pendiente,ok")
        .unwrap();
    assert_eq!(reg.len(), 1);
    assert_eq!(reg.report().mismatched_rows, 1);
}
