// Two-state gate built from a pair of ThresholdCounters.
//
// One subtlety lives here. The close counter must be fed its own
// threshold pre-negated (so its "sum < threshold" test reads as "sum <
// close_count_thresh", a positive bound on a falling count) — fed with
// the positive open threshold instead, the close counter cannot fire
// on the first block after an Open transition. The threshold is
// negated once, at construction, so every caller of `push` downstream
// only ever sees the positive `close_count_thresh` the operator
// configured.

use super::ThresholdCounter;

/// Gate state; `Closed` is the only valid starting state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Closed,
    Open,
}

pub struct Gate {
    state: GateState,
    open_counter: ThresholdCounter,
    close_counter: ThresholdCounter,
    open_count_thresh: i64,
    /// Pre-negated: always `<= 0`.
    close_count_thresh_negated: i64,
}

impl Gate {
    pub fn new(
        open_thresh: f32,
        open_count_thresh: i64,
        open_window_periods: usize,
        close_thresh: f32,
        close_count_thresh: i64,
        close_window_periods: usize,
        period_size: usize,
    ) -> Self {
        assert!(open_count_thresh > 0, "open_count_thresh must be positive");
        assert!(
            close_count_thresh > 0,
            "close_count_thresh must be positive"
        );
        Gate {
            state: GateState::Closed,
            open_counter: ThresholdCounter::new(open_thresh, period_size, open_window_periods),
            close_counter: ThresholdCounter::new(close_thresh, period_size, close_window_periods),
            open_count_thresh,
            close_count_thresh_negated: -close_count_thresh,
        }
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    /// Administrative override used by the writer when a segment must be
    /// torn down outside the normal crossing-driven transition (a write
    /// failure, a failed open, or an explicit `close_entry`/disable).
    /// No-op when already Closed.
    pub fn force_close(&mut self) {
        if self.state == GateState::Open {
            self.state = GateState::Closed;
            self.close_counter.reset();
            self.open_counter.reset();
        }
    }

    /// Analyze a block of samples. Returns the sample offset (0..n)
    /// within `samples` at which the gate transitioned, or `None` if it
    /// did not transition during this call.
    pub fn push(&mut self, samples: &[f32]) -> Option<usize> {
        match self.state {
            GateState::Closed => {
                let period = self.open_counter.push(samples, self.open_count_thresh)?;
                let offset = period * self.open_counter.period_size();
                self.state = GateState::Open;
                self.open_counter.reset();
                self.close_counter
                    .push(&samples[offset..], self.close_count_thresh_negated);
                Some(offset)
            }
            GateState::Open => {
                let period = self
                    .close_counter
                    .push(samples, self.close_count_thresh_negated)?;
                let offset = period * self.close_counter.period_size();
                self.state = GateState::Closed;
                self.close_counter.reset();
                self.open_counter
                    .push(&samples[offset..], self.open_count_thresh);
                Some(offset)
            }
        }
    }
}
