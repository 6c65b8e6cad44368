// Gating switch collaborator.
//
// Keypress, DIO-line, and trigger-audio-channel switches are out of
// scope (spec §1); every concrete source satisfies this same small
// capability set, so a trait object is enough — no class hierarchy.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Polled, edge-triggered gating input: `get_state()` reads true for one
/// poll following an off→on transition.
pub trait Switch {
    fn initialize(&mut self) {}
    fn finalize(&mut self) {}
    fn get_state(&mut self) -> bool;
}

/// Always reports off. Used when no gating input is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSwitch;

impl Switch for NullSwitch {
    fn get_state(&mut self) -> bool {
        false
    }
}

/// Edge-triggered switch driven by an `AtomicBool`, set externally (CLI,
/// test harness, or a future keypress/DIO adapter).
#[derive(Debug, Clone)]
pub struct ManualSwitch {
    raised: Arc<AtomicBool>,
}

impl ManualSwitch {
    pub fn new() -> Self {
        ManualSwitch {
            raised: Arc::new(AtomicBool::new(false)),
        }
    }

    /// A handle that can be used to raise the switch from another thread.
    pub fn handle(&self) -> ManualSwitchHandle {
        ManualSwitchHandle {
            raised: Arc::clone(&self.raised),
        }
    }
}

impl Default for ManualSwitch {
    fn default() -> Self {
        Self::new()
    }
}

impl Switch for ManualSwitch {
    fn get_state(&mut self) -> bool {
        // Consuming swap: a raise() is reported on exactly one poll.
        self.raised.swap(false, Ordering::SeqCst)
    }
}

/// A cheap, cloneable handle used to raise a [`ManualSwitch`] from
/// another thread (CLI input, test code).
#[derive(Debug, Clone)]
pub struct ManualSwitchHandle {
    raised: Arc<AtomicBool>,
}

impl ManualSwitchHandle {
    pub fn raise(&self) {
        self.raised.store(true, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_switch_never_fires() {
        let mut sw = NullSwitch;
        assert!(!sw.get_state());
        assert!(!sw.get_state());
    }

    #[test]
    fn manual_switch_fires_once_per_raise() {
        let mut sw = ManualSwitch::new();
        let handle = sw.handle();
        assert!(!sw.get_state());

        handle.raise();
        assert!(sw.get_state());
        assert!(!sw.get_state());

        handle.raise();
        assert!(sw.get_state());
    }
}
