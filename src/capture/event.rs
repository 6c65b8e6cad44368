// Transition and playback events.
//
// Ephemeral: produced by the writer during one `flush` call and handed
// straight to the event logger; nothing retains them.

use chrono::{DateTime, Local};

/// What happened.
#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    GateOpen,
    GateClose,
    /// Emitted by the switch/quota tracker, not the gate. Distinct from
    /// the two gate transitions above.
    Playback { output_name: String, song_name: String },
}

/// A single transition or playback record.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub kind: EventKind,
    pub sample_time: u64,
    pub wall_time: Option<DateTime<Local>>,
}

impl Event {
    pub fn gate_open(sample_time: u64, wall_time: Option<DateTime<Local>>) -> Self {
        Event {
            kind: EventKind::GateOpen,
            sample_time,
            wall_time,
        }
    }

    pub fn gate_close(sample_time: u64, wall_time: Option<DateTime<Local>>) -> Self {
        Event {
            kind: EventKind::GateClose,
            sample_time,
            wall_time,
        }
    }

    pub fn playback(
        output_name: impl Into<String>,
        song_name: impl Into<String>,
        sample_time: u64,
        wall_time: Option<DateTime<Local>>,
    ) -> Self {
        Event {
            kind: EventKind::Playback {
                output_name: output_name.into(),
                song_name: song_name.into(),
            },
            sample_time,
            wall_time,
        }
    }

    /// Format as `[program] wall_time frame_time EVENT_KIND details`, the
    /// line shape the logger collaborator accepts.
    pub fn format_line(&self, program: &str) -> String {
        let wall = self
            .wall_time
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "_".to_string());
        match &self.kind {
            EventKind::GateOpen => {
                format!("[{program}] {wall} {} GATE_OPEN", self.sample_time)
            }
            EventKind::GateClose => {
                format!("[{program}] {wall} {} GATE_CLOSE", self.sample_time)
            }
            EventKind::Playback {
                output_name,
                song_name,
            } => format!(
                "[{program}] {wall} {} PLAYBACK output={output_name} song={song_name}",
                self.sample_time
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gate_open_line_has_no_details() {
        let ev = Event::gate_open(1000, None);
        let line = ev.format_line("fieldrec");
        assert!(line.contains("GATE_OPEN"));
        assert!(line.contains("1000"));
    }

    #[test]
    fn playback_line_includes_names() {
        let ev = Event::playback("out1", "robin.wav", 42, None);
        let line = ev.format_line("fieldrec");
        assert!(line.contains("out1"));
        assert!(line.contains("robin.wav"));
    }
}
