use std::path::PathBuf;
use std::sync::Arc;

use hn_case::*;
use hn_model::Catalogue;

fn demo_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../cases/demo.yaml")
}

fn catalogue() -> Arc<Catalogue> {
    Arc::new(Catalogue::builtin().unwrap())
}

#[test]
fn demo_case_builds_a_complete_network() {
    let case = load_yaml(&demo_path()).unwrap();
    let net = build_network(&case, catalogue()).unwrap();
    assert_eq!(net.len(), 10);
    assert!(!net.is_modified());

    let report = net.validate().unwrap();
    assert!(report.is_complete(), "{report:?}");

    let pipe = net.named("PIPE.P1").unwrap();
    let n2 = net.named("NODE.N2").unwrap();
    assert_eq!(net.connected_node(pipe, 2).unwrap(), n2);
    let item = net.item(pipe).unwrap();
    assert_eq!(item.get_scalar("Diameter").unwrap(), 0.3);
    assert_eq!(item.property("Geometry Type").unwrap().selection(), Some(2));
    assert_eq!(item.keywords(), ["supply", "main"]);
}

#[test]
fn snapshot_survives_yaml_and_json() {
    let case = load_yaml(&demo_path()).unwrap();
    let net = build_network(&case, catalogue()).unwrap();
    let snap = snapshot(&net, &case.name);
    assert_eq!(snap.items.len(), case.items.len());
    assert_eq!(snap.connections.len(), case.connections.len());

    let dir = tempfile::tempdir().unwrap();
    let yaml = dir.path().join("case.yaml");
    save_yaml(&yaml, &snap).unwrap();
    assert_eq!(load_yaml(&yaml).unwrap(), snap);

    let json = dir.path().join("case.json");
    save(&json, &snap).unwrap();
    assert_eq!(load(&json).unwrap(), snap);

    let rebuilt = build_network(&snap, catalogue()).unwrap();
    assert_eq!(snapshot(&rebuilt, &case.name), snap);
}

#[test]
fn snapshot_keeps_only_supplied_inputs() {
    let case = load_yaml(&demo_path()).unwrap();
    let net = build_network(&case, catalogue()).unwrap();
    let snap = snapshot(&net, "demo");
    let pipe = snap.items.iter().find(|i| i.name == "P1").unwrap();
    assert!(pipe.values.contains_key("Diameter"));
    assert!(!pipe.values.contains_key("Length"));
    assert!(!pipe.values.contains_key("Friction Model"));
    assert!(!pipe.values.contains_key("Velocity"));
    match &pipe.values["Profile"] {
        ValueDef::Table { columns } => {
            assert_eq!(columns.len(), 2);
            assert_eq!(columns[1].values, vec![10.0, 11.5, 13.0]);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn invalid_values_fail_to_build() {
    let mut case = load_yaml(&demo_path()).unwrap();
    let pipe = case.items.iter_mut().find(|i| i.name == "P1").unwrap();
    pipe.values
        .insert("Diameter".into(), ValueDef::Scalar { value: -1.0 });
    let err = build_network(&case, catalogue()).unwrap_err();
    assert!(matches!(
        err,
        CaseError::Model(hn_model::ModelError::BelowMinimum { .. })
    ));
    assert!(err.to_string().contains("PIPE.P1"));
}

#[test]
fn bad_connection_point_fails_to_build() {
    let mut case = load_yaml(&demo_path()).unwrap();
    case.connections.push(ConnectionDef::Node {
        component: 4,
        node: 2,
        point: 2,
    });
    assert!(matches!(
        build_network(&case, catalogue()),
        Err(CaseError::Model(hn_model::ModelError::InvalidArgument { .. }))
    ));
}
