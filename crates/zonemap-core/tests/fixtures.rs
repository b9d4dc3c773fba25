use futures::executor::block_on;
use zonemap_core::{Engine, MatchKind, Registry};
use std::path::{Path, PathBuf};

fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("..").join("..")
}

fn fixtures_root() -> PathBuf {
    workspace_root().join("fixtures")
}

fn load(name: &str) -> Registry {
    let path = fixtures_root().join(name);
    let text = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("failed to read {}: {e}", path.display()));
    block_on(Engine::new().build_registry(&text))
        .unwrap_or_else(|e| panic!("failed to build registry from {name}: {e}"))
}

#[test]
fn csv_export_builds_registry() {
    let reg = load("estado.csv");
    assert_eq!(reg.keys().collect::<Vec<_>>(), vec!["001", "7", "12", "Zona Norte"]);
    assert_eq!(reg.report().rows_seen, 5);
    assert_eq!(reg.report().rows_without_id, 1);

    let first = reg.get("001").unwrap();
    assert_eq!(first.state, "Activo");
    assert_eq!(first.linked_document_id.as_deref(), Some("1AbCdEf"));
    assert_eq!(first.image_url.as_deref(), Some("https://example.org/zona1.png"));
    assert_eq!(first.description.as_deref(), Some("Plaza central, etapa 1"));

    let columns = reg.columns().unwrap();
    assert_eq!(columns.id, "id_geojson");
    assert_eq!(columns.description.as_deref(), Some("descripción"));
}

#[test]
fn list_feed_json_builds_registry() {
    let reg = load("feed.json");
    assert_eq!(reg.keys().collect::<Vec<_>>(), vec!["001", "7", "12"]);
    assert_eq!(reg.get("7").unwrap().state, "en proceso");
    assert_eq!(reg.get("7").unwrap().linked_document_id, None);
    assert_eq!(
        reg.get("001").unwrap().linked_document_id.as_deref(),
        Some("1AbCdEf")
    );
}

#[test]
fn visualization_jsonp_builds_registry() {
    let reg = load("gviz.jsonp");
    assert_eq!(reg.keys().collect::<Vec<_>>(), vec!["1", "7", "12"]);
    assert_eq!(reg.report().rows_without_id, 1);
    assert_eq!(reg.get("7").unwrap().state, "Expirado");
    assert_eq!(reg.get("7").unwrap().linked_document_id, None);
}

#[test]
fn row_envelope_builds_registry() {
    let reg = load("rows.json");
    assert_eq!(reg.keys().collect::<Vec<_>>(), vec!["001", "7", "12"]);
    assert_eq!(
        reg.get("12").unwrap().image_url.as_deref(),
        Some("https://example.org/12.jpg")
    );
}

#[test]
fn every_feed_shape_resolves_the_same_polygons() {
    for name in ["estado.csv", "feed.json", "gviz.jsonp", "rows.json"] {
        let reg = load(name);
        for polygon in ["1", "007", "12", "12.0", "01"] {
            assert!(
                reg.resolve(Some(polygon)).is_some(),
                "{name}: polygon {polygon} did not resolve"
            );
        }
        assert_eq!(reg.resolve(Some("99")), None, "{name}");
    }
}

#[test]
fn named_zone_resolves_by_stripped_match() {
    let reg = load("estado.csv");
    let res = reg.resolve(Some("ZONA NORTE")).unwrap();
    assert_eq!(res.key, "Zona Norte");
    assert_eq!(res.kind, MatchKind::Stripped);
}
