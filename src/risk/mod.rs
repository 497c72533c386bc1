//! Position awareness and request admission.
//!
//! - Recent position lookup and aggregation
//! - Per-instrument single-flight gate for concurrent requests

mod gate;
mod position_tracker;

pub use gate::{GateGuard, InstrumentGate};
pub use position_tracker::{PositionTracker, POSITION_WINDOW_MS};
