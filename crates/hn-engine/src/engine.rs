//! Call/response contract of an external solver.

use std::fmt;
use std::path::Path;

use hn_core::ItemKey;

/// Nonzero status returned by a failed engine call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub code: i32,
    pub message: String,
}

impl Status {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "status {}: {}", self.code, self.message)
    }
}

pub type EngineCall<T> = Result<T, Status>;

/// A solver that computes steady and transient states of a case.
///
/// Items are addressed by their persistent key. Values cross the boundary
/// in SI units.
pub trait Engine {
    fn initialize(&mut self, case_path: &Path) -> EngineCall<()>;
    fn run_steady(&mut self) -> EngineCall<()>;
    fn advance_time_step(&mut self) -> EngineCall<()>;
    fn finalize_unsteady(&mut self) -> EngineCall<()>;
    fn close(&mut self) -> EngineCall<()>;

    fn get_value(&self, item: ItemKey, property: &str) -> EngineCall<f64>;
    fn set_value(&mut self, item: ItemKey, property: &str, value: f64) -> EngineCall<()>;
    /// One value per discretised element, element 1 first.
    fn get_vector(&self, item: ItemKey, property: &str) -> EngineCall<Vec<f64>>;

    fn start_time(&self) -> EngineCall<f64>;
    fn end_time(&self) -> EngineCall<f64>;
    fn current_time(&self) -> EngineCall<f64>;
    fn time_step(&self) -> EngineCall<f64>;
}
