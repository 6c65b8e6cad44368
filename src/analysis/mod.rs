//! Threshold-crossing analysis: the windowed period counter and the
//! two-state gate built from a pair of them.

mod gate;
mod threshold_counter;

pub use gate::{Gate, GateState};
pub use threshold_counter::ThresholdCounter;
