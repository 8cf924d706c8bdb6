//! hn-engine: boundary to an external network solver.
//!
//! Provides:
//! - the `Engine` call/response trait
//! - `EngineSession`, an explicit handle tracking the run state
//! - `OutputStore`, owner of the result series bound to output properties

pub mod engine;
pub mod error;
pub mod outputs;
pub mod session;

pub use engine::{Engine, EngineCall, Status};
pub use error::{EngineError, EngineResult};
pub use outputs::{OutputStore, SeriesKey};
pub use session::{EngineSession, SessionState};
