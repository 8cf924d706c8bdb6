use std::collections::BTreeMap;
use std::path::Path;

use hn_core::ItemKey;
use hn_engine::{
    Engine, EngineCall, EngineError, EngineSession, OutputStore, SessionState, Status,
};
use hn_model::{ModelError, Network};

/// Solver stand-in: every output reads `key + time`, elements add their index.
#[derive(Default)]
struct FakeEngine {
    time: f64,
    inputs: BTreeMap<(i32, String), f64>,
    fail_steps_after: Option<usize>,
    steps: usize,
}

impl Engine for FakeEngine {
    fn initialize(&mut self, case_path: &Path) -> EngineCall<()> {
        if case_path.as_os_str().is_empty() {
            return Err(Status::new(2, "no case file"));
        }
        Ok(())
    }

    fn run_steady(&mut self) -> EngineCall<()> {
        Ok(())
    }

    fn advance_time_step(&mut self) -> EngineCall<()> {
        if self.fail_steps_after.is_some_and(|n| self.steps >= n) {
            return Err(Status::new(7, "solution diverged"));
        }
        self.steps += 1;
        self.time += 0.5;
        Ok(())
    }

    fn finalize_unsteady(&mut self) -> EngineCall<()> {
        Ok(())
    }

    fn close(&mut self) -> EngineCall<()> {
        Ok(())
    }

    fn get_value(&self, item: ItemKey, _property: &str) -> EngineCall<f64> {
        Ok(f64::from(item.value()) + self.time)
    }

    fn set_value(&mut self, item: ItemKey, property: &str, value: f64) -> EngineCall<()> {
        self.inputs.insert((item.value(), property.to_string()), value);
        Ok(())
    }

    fn get_vector(&self, item: ItemKey, _property: &str) -> EngineCall<Vec<f64>> {
        let base = f64::from(item.value()) + self.time;
        Ok((1..=10).map(|i| base + f64::from(i)).collect())
    }

    fn start_time(&self) -> EngineCall<f64> {
        Ok(0.0)
    }

    fn end_time(&self) -> EngineCall<f64> {
        Ok(1.5)
    }

    fn current_time(&self) -> EngineCall<f64> {
        Ok(self.time)
    }

    fn time_step(&self) -> EngineCall<f64> {
        Ok(0.5)
    }
}

fn session() -> EngineSession<FakeEngine> {
    EngineSession::open(FakeEngine::default(), "case.yaml").unwrap()
}

fn network() -> Network {
    let mut net = Network::with_builtin().unwrap();
    let n1 = net.add_node("Junction", "N1").unwrap();
    let n2 = net.add_node("Junction", "N2").unwrap();
    let pipe = net.add_component("Pipe", "P1").unwrap();
    net.connect_node(pipe, n1, 1).unwrap();
    net.connect_node(pipe, n2, 2).unwrap();
    let valve = net.add_component("Valve", "V1").unwrap();
    net.item_mut(valve).unwrap().set_scalar("Opening", 0.4).unwrap();
    net.item_mut(pipe).unwrap().set_scalar("Diameter", 0.3).unwrap();
    net
}

#[test]
fn initialize_failure_is_backend_error() {
    let err = EngineSession::open(FakeEngine::default(), "").err().unwrap();
    assert!(matches!(err, EngineError::Backend { operation: "initialize", code: 2, .. }));
}

#[test]
fn transient_calls_follow_the_session_state() {
    let mut s = session();
    assert_eq!(s.state(), SessionState::Ready);
    assert!(matches!(
        s.finalize_unsteady(),
        Err(EngineError::InvalidState { operation: "finalize_unsteady", state: SessionState::Ready })
    ));

    s.run_steady().unwrap();
    s.advance_time_step().unwrap();
    assert_eq!(s.state(), SessionState::Transient);
    assert!(matches!(s.run_steady(), Err(EngineError::InvalidState { .. })));

    while !s.is_finished().unwrap() {
        s.advance_time_step().unwrap();
    }
    assert_eq!(s.steps(), 3);
    s.finalize_unsteady().unwrap();
    assert_eq!(s.state(), SessionState::Finalized);

    // values stay readable after finalize, inputs do not
    assert_eq!(s.current_time().unwrap(), 1.5);
    assert!(matches!(
        s.set_value(ItemKey(1), "Opening", 0.5),
        Err(EngineError::InvalidState { .. })
    ));

    s.close().unwrap();
    assert!(matches!(
        s.close(),
        Err(EngineError::InvalidState { state: SessionState::Closed, .. })
    ));
    assert!(s.get_value(ItemKey(1), "Flow").is_err());
}

#[test]
fn failed_step_keeps_status_code() {
    let engine = FakeEngine {
        fail_steps_after: Some(1),
        ..FakeEngine::default()
    };
    let mut s = EngineSession::open(engine, "case.yaml").unwrap();
    s.advance_time_step().unwrap();
    let err = s.advance_time_step().unwrap_err();
    match err {
        EngineError::Backend { operation, code, message } => {
            assert_eq!(operation, "advance_time_step");
            assert_eq!(code, 7);
            assert_eq!(message, "solution diverged");
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(s.steps(), 1);
}

#[test]
fn commit_pushes_specified_inputs_only() {
    let net = network();
    let mut s = session();
    let store = OutputStore::new();
    let pushed = store.commit_inputs(&net, &mut s).unwrap();
    assert_eq!(pushed, 2);

    let pipe = net.item(net.named("PIPE.P1").unwrap()).unwrap().key();
    let valve = net.item(net.named("VALVE.V1").unwrap()).unwrap().key();
    let inputs = &s.engine().inputs;
    assert_eq!(inputs[&(pipe.value(), "Diameter".to_string())], 0.3);
    assert_eq!(inputs[&(valve.value(), "Opening".to_string())], 0.4);
}

#[test]
fn recorded_series_bind_to_outputs() {
    let mut net = network();
    let mut s = session();
    let mut store = OutputStore::new();
    store.record(&mut net, &s).unwrap();
    while !s.is_finished().unwrap() {
        s.advance_time_step().unwrap();
        store.record(&mut net, &s).unwrap();
    }
    assert_eq!(store.times(), &[0.0, 0.5, 1.0, 1.5]);
    let bound = store.bind(&mut net).unwrap();
    // pipe: Pressure and Flow with 11 slots each; valve Flow; two junction pressures
    assert_eq!(bound, 25);

    let pipe_id = net.named("PIPE.P1").unwrap();
    let pipe = net.item(pipe_id).unwrap();
    let k = f64::from(pipe.key().value());

    let whole = pipe.series("Pressure", 0).unwrap();
    assert_eq!(whole.values, vec![k, k + 0.5, k + 1.0, k + 1.5]);
    assert_eq!(whole.value_at(0.25), Some(k + 0.25));

    let last = pipe.series("Flow", 10).unwrap();
    assert_eq!(last.last(), Some(k + 11.5));

    let ext = pipe.extremes("Pressure", 3).unwrap();
    assert_eq!(ext.min, k + 3.0);
    assert_eq!(ext.time_of_max, 1.5);

    // plain outputs carry the latest value
    assert_eq!(pipe.get_scalar("Velocity").unwrap(), k + 1.5);
}

#[test]
fn cleared_store_unloads_bound_series() {
    let mut net = network();
    let s = session();
    let mut store = OutputStore::new();
    store.record(&mut net, &s).unwrap();
    store.bind(&mut net).unwrap();

    let valve = net.named("VALVE.V1").unwrap();
    assert!(net.item(valve).unwrap().series("Flow", 0).is_ok());

    store.clear();
    assert!(store.is_empty());
    let err = net.item(valve).unwrap().series("Flow", 0).unwrap_err();
    assert!(matches!(err, ModelError::DataNotLoaded { element: 0, .. }));
    assert!(err.to_string().contains("VALVE.V1"));
}

#[test]
fn disused_items_are_not_recorded() {
    let mut net = network();
    let valve = net.named("VALVE.V1").unwrap();
    net.item_mut(valve).unwrap().set_disused(true);
    let s = session();
    let mut store = OutputStore::new();
    store.record(&mut net, &s).unwrap();
    let key = net.item(valve).unwrap().key();
    assert!(store.values(&(key, "Flow".to_string(), 0)).is_none());
}
