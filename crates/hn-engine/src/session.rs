//! Caller-owned handle on an initialised engine.

use std::fmt;
use std::path::{Path, PathBuf};

use hn_core::ItemKey;
use tracing::{debug, info, warn};

use crate::engine::{Engine, EngineCall};
use crate::error::{EngineError, EngineResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Initialised; steady runs and the first time step are allowed.
    Ready,
    Transient,
    Finalized,
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionState::Ready => "ready",
            SessionState::Transient => "in a transient run",
            SessionState::Finalized => "finalized",
            SessionState::Closed => "closed",
        };
        f.write_str(s)
    }
}

pub struct EngineSession<E: Engine> {
    engine: E,
    case_path: PathBuf,
    state: SessionState,
    steps: usize,
}

fn call<T>(operation: &'static str, r: EngineCall<T>) -> EngineResult<T> {
    r.map_err(|s| EngineError::Backend {
        operation,
        code: s.code,
        message: s.message,
    })
}

impl<E: Engine> EngineSession<E> {
    /// Initialise `engine` on a case file.
    pub fn open(mut engine: E, case_path: impl AsRef<Path>) -> EngineResult<Self> {
        let case_path = case_path.as_ref().to_path_buf();
        call("initialize", engine.initialize(&case_path))?;
        info!(case = %case_path.display(), "engine session opened");
        Ok(Self {
            engine,
            case_path,
            state: SessionState::Ready,
            steps: 0,
        })
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn case_path(&self) -> &Path {
        &self.case_path
    }

    /// Time steps taken in the current transient run.
    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    fn require(&self, operation: &'static str, allowed: &[SessionState]) -> EngineResult<()> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(EngineError::InvalidState {
                operation,
                state: self.state,
            })
        }
    }

    fn open_states() -> &'static [SessionState] {
        &[
            SessionState::Ready,
            SessionState::Transient,
            SessionState::Finalized,
        ]
    }

    fn transition(&mut self, to: SessionState) {
        if self.state != to {
            debug!(from = %self.state, to = %to, "engine session state");
            self.state = to;
        }
    }

    pub fn run_steady(&mut self) -> EngineResult<()> {
        self.require("run_steady", &[SessionState::Ready])?;
        call("run_steady", self.engine.run_steady())
    }

    pub fn advance_time_step(&mut self) -> EngineResult<()> {
        self.require(
            "advance_time_step",
            &[SessionState::Ready, SessionState::Transient],
        )?;
        call("advance_time_step", self.engine.advance_time_step())?;
        self.steps += 1;
        self.transition(SessionState::Transient);
        Ok(())
    }

    /// Whether the transient run has reached the end time.
    pub fn is_finished(&self) -> EngineResult<bool> {
        let now = self.current_time()?;
        let end = self.end_time()?;
        let dt = self.time_step()?;
        Ok(now >= end - 0.5 * dt.abs())
    }

    pub fn finalize_unsteady(&mut self) -> EngineResult<()> {
        self.require("finalize_unsteady", &[SessionState::Transient])?;
        call("finalize_unsteady", self.engine.finalize_unsteady())?;
        self.transition(SessionState::Finalized);
        info!(steps = self.steps, "transient run finalized");
        Ok(())
    }

    /// Release the engine. Closing twice is an error.
    pub fn close(&mut self) -> EngineResult<()> {
        self.require("close", Self::open_states())?;
        let result = call("close", self.engine.close());
        self.transition(SessionState::Closed);
        result
    }

    pub fn get_value(&self, item: ItemKey, property: &str) -> EngineResult<f64> {
        self.require("get_value", Self::open_states())?;
        call("get_value", self.engine.get_value(item, property))
    }

    pub fn set_value(&mut self, item: ItemKey, property: &str, value: f64) -> EngineResult<()> {
        self.require("set_value", &[SessionState::Ready, SessionState::Transient])?;
        call("set_value", self.engine.set_value(item, property, value))
    }

    pub fn get_vector(&self, item: ItemKey, property: &str) -> EngineResult<Vec<f64>> {
        self.require("get_vector", Self::open_states())?;
        call("get_vector", self.engine.get_vector(item, property))
    }

    pub fn start_time(&self) -> EngineResult<f64> {
        self.require("start_time", Self::open_states())?;
        call("start_time", self.engine.start_time())
    }

    pub fn end_time(&self) -> EngineResult<f64> {
        self.require("end_time", Self::open_states())?;
        call("end_time", self.engine.end_time())
    }

    pub fn current_time(&self) -> EngineResult<f64> {
        self.require("current_time", Self::open_states())?;
        call("current_time", self.engine.current_time())
    }

    pub fn time_step(&self) -> EngineResult<f64> {
        self.require("time_step", Self::open_states())?;
        call("time_step", self.engine.time_step())
    }
}

impl<E: Engine> Drop for EngineSession<E> {
    fn drop(&mut self) {
        if self.state != SessionState::Closed
            && let Err(e) = self.engine.close()
        {
            warn!(case = %self.case_path.display(), error = %e, "engine close on drop failed");
        }
    }
}
