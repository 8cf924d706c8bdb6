use std::path::PathBuf;
use std::sync::Arc;

use hn_case::persist::case_digest;
use hn_case::*;
use hn_model::Catalogue;
use hn_record::RecordFile;

fn demo() -> CaseDef {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../cases/demo.yaml");
    load_yaml(&path).unwrap()
}

fn catalogue() -> Arc<Catalogue> {
    Arc::new(Catalogue::builtin().unwrap())
}

fn without_values(case: &CaseDef) -> CaseDef {
    let mut bare = case.clone();
    for item in &mut bare.items {
        item.values.clear();
    }
    bare
}

#[test]
fn values_round_trip_through_a_record_file() {
    let case = demo();
    let net = build_network(&case, catalogue()).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("demo.hnr");
    let mut file = RecordFile::create(&path).unwrap();
    let header = write_network(&net, &case.name, &mut file).unwrap();
    assert_eq!(header.item_count, 10);
    assert_eq!(header.digest, case_digest(&snapshot(&net, &case.name)));

    let file = RecordFile::open(&path).unwrap();
    assert_eq!(read_header(&file).unwrap(), header);

    let mut bare = build_network(&without_values(&case), catalogue()).unwrap();
    assert!(!bare.validate().unwrap().is_complete());
    assert_eq!(read_network(&mut bare, &file).unwrap(), 10);
    assert_eq!(snapshot(&bare, &case.name), snapshot(&net, &case.name));
    assert!(bare.validate().unwrap().is_complete());
}

#[test]
fn stored_keys_missing_from_the_network_are_skipped() {
    let case = demo();
    let net = build_network(&case, catalogue()).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let mut file = RecordFile::create(dir.path().join("demo.hnr")).unwrap();
    write_network(&net, &case.name, &mut file).unwrap();

    let mut partial = without_values(&case);
    partial.connections.clear();
    partial.items.retain(|i| i.type_name == "Junction");
    let mut small = build_network(&partial, catalogue()).unwrap();
    assert_eq!(read_network(&mut small, &file).unwrap(), 3);
    let n2 = small.named("NODE.N2").unwrap();
    assert_eq!(small.item(n2).unwrap().get_scalar("Elevation").unwrap(), 13.0);
}

#[test]
fn rewriting_replaces_item_payloads() {
    let case = demo();
    let mut net = build_network(&case, catalogue()).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let mut file = RecordFile::create(dir.path().join("demo.hnr")).unwrap();
    write_network(&net, &case.name, &mut file).unwrap();

    let pipe = net.named("PIPE.P1").unwrap();
    net.item_mut(pipe).unwrap().set_scalar("Diameter", 0.45).unwrap();
    write_network(&net, &case.name, &mut file).unwrap();

    let mut bare = build_network(&without_values(&case), catalogue()).unwrap();
    read_network(&mut bare, &file).unwrap();
    let pipe = bare.named("PIPE.P1").unwrap();
    assert_eq!(bare.item(pipe).unwrap().get_scalar("Diameter").unwrap(), 0.45);
}

#[test]
fn stored_unspecified_scalars_clear_the_target() {
    let case = demo();
    let mut net = build_network(&case, catalogue()).unwrap();
    let n2 = net.named("NODE.N2").unwrap();
    net.item_mut(n2).unwrap().property_mut("Elevation").unwrap().unspecify();
    let dir = tempfile::tempdir().unwrap();
    let mut file = RecordFile::create(dir.path().join("demo.hnr")).unwrap();
    write_network(&net, &case.name, &mut file).unwrap();

    let mut full = build_network(&case, catalogue()).unwrap();
    let n2 = full.named("NODE.N2").unwrap();
    assert_eq!(full.item(n2).unwrap().get_scalar("Elevation").unwrap(), 13.0);
    read_network(&mut full, &file).unwrap();
    let err = full.item(n2).unwrap().get_scalar("Elevation").unwrap_err();
    assert!(matches!(err, hn_model::ModelError::NotSpecified { .. }));
    assert!(!full.validate().unwrap().is_complete());
}
