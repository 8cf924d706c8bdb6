//! hn-core: stable foundation for hydronet.
//!
//! Contains:
//! - ids (arena slots and persistent item keys)
//! - numeric (Real + tolerances + sequence helpers)
//! - units (dimensions and the case-wide unit table)
//! - error (shared error types)

pub mod error;
pub mod ids;
pub mod numeric;
pub mod units;

pub use error::{CoreError, CoreResult};
pub use ids::*;
pub use numeric::*;
pub use units::*;
