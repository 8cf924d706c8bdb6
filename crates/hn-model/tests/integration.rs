//! Integration tests for hn-model.

use hn_model::geometry::{COORDINATES, GEOMETRY_TYPE, INCREMENTS, LENGTH, PATH_LENGTH, PROFILE};
use hn_model::{
    ConnectivityIssue, GeometryRepr, ModelError, Network, SeriesBuffer, SignalDirection,
};
use std::sync::Arc;

fn two_node_pipe() -> (Network, hn_core::ItemId, hn_core::ItemId, hn_core::ItemId) {
    let mut net = Network::with_builtin().unwrap();
    let n1 = net.add_node("Junction", "N1").unwrap();
    let n2 = net.add_node("Junction", "N2").unwrap();
    let pipe = net.add_component("Pipe", "P1").unwrap();
    net.connect_node(pipe, n1, 1).unwrap();
    net.connect_node(pipe, n2, 2).unwrap();
    (net, pipe, n1, n2)
}

#[test]
fn geometry_gate_moves_requirement_between_tables() {
    let (mut net, pipe, _, _) = two_node_pipe();
    let missing = |net: &Network| {
        net.validate()
            .unwrap()
            .items
            .into_iter()
            .find(|r| r.id == pipe)
            .map(|r| r.missing)
            .unwrap_or_default()
    };
    assert!(missing(&net).contains(&LENGTH.to_string()));

    let item = net.item_mut(pipe).unwrap();
    item.set_scalar_text(GEOMETRY_TYPE, "Distance/Height").unwrap();
    let m = missing(&net);
    assert!(m.contains(&PROFILE.to_string()));
    assert!(!m.contains(&LENGTH.to_string()));
    assert!(!m.contains(&COORDINATES.to_string()));
}

#[test]
fn length_elevation_switch_uses_node_elevations() {
    let (mut net, pipe, n1, n2) = two_node_pipe();
    net.item_mut(n1).unwrap().set_scalar("Elevation", 10.0).unwrap();
    net.item_mut(n2).unwrap().set_scalar("Elevation", 13.0).unwrap();
    net.item_mut(pipe).unwrap().set_scalar(LENGTH, 5.0).unwrap();

    assert!(net.switch_pipe_geometry(pipe, GeometryRepr::Absolute).unwrap());
    let item = net.item(pipe).unwrap();
    assert_eq!(
        item.property(GEOMETRY_TYPE).unwrap().selection(),
        Some(GeometryRepr::Absolute.selection())
    );
    let coords = item.property(COORDINATES).unwrap().table().unwrap();
    assert_eq!(coords.floats("X").unwrap(), &[0.0, 4.0]);
    assert_eq!(coords.floats("Y").unwrap(), &[0.0, 0.0]);
    assert_eq!(coords.floats("Z").unwrap(), &[10.0, 13.0]);
    assert_eq!(coords.floats(PATH_LENGTH).unwrap(), &[0.0, 5.0]);

    let inc = item.property(INCREMENTS).unwrap().table().unwrap();
    // row 0 carries the start point
    assert_eq!(inc.floats("dX").unwrap(), &[0.0, 4.0]);
    assert_eq!(inc.floats("dZ").unwrap(), &[10.0, 3.0]);
    assert!(coords.check());
}

#[test]
fn length_shorter_than_rise_is_rejected() {
    let (mut net, pipe, n1, n2) = two_node_pipe();
    net.item_mut(n1).unwrap().set_scalar("Elevation", 0.0).unwrap();
    net.item_mut(n2).unwrap().set_scalar("Elevation", 30.0).unwrap();
    net.item_mut(pipe).unwrap().set_scalar(LENGTH, 5.0).unwrap();
    let err = net
        .switch_pipe_geometry(pipe, GeometryRepr::DistanceHeight)
        .unwrap_err();
    assert!(matches!(err, ModelError::InvalidArgument { .. }));
    assert!(err.to_string().contains("PIPE.P1"));
}

#[test]
fn single_row_table_is_not_switched() {
    let (mut net, pipe, _, _) = two_node_pipe();
    let item = net.item_mut(pipe).unwrap();
    item.set_scalar_text(GEOMETRY_TYPE, "XYZ").unwrap();
    {
        let t = item.property_mut(COORDINATES).unwrap().table_mut().unwrap();
        t.set_floats("X", vec![1.0]).unwrap();
        t.set_floats("Y", vec![2.0]).unwrap();
        t.set_floats("Z", vec![3.0]).unwrap();
    }
    assert!(!net.switch_pipe_geometry(pipe, GeometryRepr::DistanceHeight).unwrap());
}

#[test]
fn rejected_length_leaves_pipe_untouched() {
    let (mut net, pipe, _, _) = two_node_pipe();
    let item = net.item_mut(pipe).unwrap();
    item.set_scalar_text(GEOMETRY_TYPE, "XYZ").unwrap();
    {
        let t = item.property_mut(COORDINATES).unwrap().table_mut().unwrap();
        t.set_floats("X", vec![0.0, 0.0005]).unwrap();
        t.set_floats("Y", vec![0.0, 0.0]).unwrap();
        t.set_floats("Z", vec![0.0, 0.0]).unwrap();
    }

    let err = net
        .switch_pipe_geometry(pipe, GeometryRepr::DistanceHeight)
        .unwrap_err();
    assert!(matches!(err, ModelError::BelowMinimum { .. }));
    assert!(err.to_string().contains("PIPE.P1"));

    let item = net.item(pipe).unwrap();
    assert_eq!(
        item.property(GEOMETRY_TYPE).unwrap().selection(),
        Some(GeometryRepr::Absolute.selection())
    );
    let profile = item.property(PROFILE).unwrap().table().unwrap();
    assert!(profile.floats("Distance").unwrap().is_empty());
    let inc = item.property(INCREMENTS).unwrap().table().unwrap();
    assert!(inc.floats("dX").unwrap().is_empty());
    let coords = item.property(COORDINATES).unwrap().table().unwrap();
    assert!(coords.floats(PATH_LENGTH).is_err());
}

#[test]
fn template_fills_pipe() {
    let (mut net, pipe, _, _) = two_node_pipe();
    let text = "Diameter\t0.3\n\
                Friction Model\tHazen-Williams\n\
                Hazen-Williams Coefficient\t130\n\
                Geometry Type\tDistance/Height\n\
                Profile TABLE\n\
                Distance\tHeight\n\
                0\t0\n\
                50\t2\n\
                120\t1\n\
                END_TABLE\n\
                Colour\tred\n\
                garbage\n";
    let item = net.item_mut(pipe).unwrap();
    let report = item.add_data_from_template(text);
    assert_eq!(report.applied, 5);
    assert_eq!(report.skipped, 2);
    assert_eq!(item.messages().len(), 2);
    assert_eq!(item.property("Friction Model").unwrap().selection(), Some(2));

    assert!(net.switch_pipe_geometry(pipe, GeometryRepr::Absolute).unwrap());
    let length = net.item(pipe).unwrap().get_scalar(LENGTH).unwrap();
    let expected = (50.0f64.powi(2) + 4.0).sqrt() + (70.0f64.powi(2) + 1.0).sqrt();
    assert!((length - expected).abs() < 1e-9);
}

#[test]
fn signal_wiring_completes_controller() {
    let mut net = Network::with_builtin().unwrap();
    let pic = net.add_component("PI Controller", "C1").unwrap();
    let report = net.validate().unwrap();
    assert!(report.connectivity.contains(&ConnectivityIssue::UnwiredInput {
        item: "PIC.C1".into(),
        channel: 2,
    }));

    let sensor = net.add_component("Sensor", "S1").unwrap();
    let node = net.add_node("Junction", "N1").unwrap();
    let line = net.add_signal_line("Signal", "L1").unwrap();
    net.connect_node(sensor, node, 1).unwrap();
    net.connect_signal(sensor, line, 1, SignalDirection::Output).unwrap();
    net.connect_signal(pic, line, 1, SignalDirection::Input).unwrap();
    assert_eq!(net.connect_point(pic, line).unwrap(), 1);

    let report = net.validate().unwrap();
    assert!(!report
        .connectivity
        .iter()
        .any(|i| matches!(i, ConnectivityIssue::OpenSignalLine { .. })));
}

#[test]
fn series_bound_then_dropped() {
    let (mut net, pipe, _, _) = two_node_pipe();
    let times = Arc::new(vec![0.0, 1.0, 2.0]);
    let buf = Arc::new(SeriesBuffer::new(times, vec![1.0, 2.0, 3.0]));
    {
        let p = net.item_mut(pipe).unwrap().property_mut("Pressure").unwrap();
        p.bind_series(4, Arc::downgrade(&buf)).unwrap();
    }
    let item = net.item(pipe).unwrap();
    assert_eq!(item.series("Pressure", 4).unwrap().value_at(1.5), Some(2.5));
    assert!(matches!(
        item.series("Pressure", 3),
        Err(ModelError::DataNotLoaded { .. })
    ));
    assert!(matches!(
        item.series("Pressure", 11),
        Err(ModelError::IndexOutOfRange { .. })
    ));
    drop(buf);
    let err = item.series("Pressure", 4).unwrap_err();
    assert!(err.is_domain());
}
