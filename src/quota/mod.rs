//! Switch/quota tracker: a parallel trigger source with time-of-day
//! quota intervals and a refractory period. Gates a one-shot playback
//! rather than capture, but shares the same event-driven shape as the
//! gate and is kept for completeness of the gating model.

use chrono::{DateTime, Local, Timelike};

use crate::capture::{Event, EventKind};
use crate::error::CaptureError;
use crate::io::Switch;

/// A time-of-day window (seconds since local midnight) with a cap on how
/// many times it may fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaInterval {
    pub start_sec: u32,
    pub end_sec: u32,
    pub quota: u32,
}

/// Parse `HH:MM HH:MM N` lines; `#`-prefixed comments and blank lines are
/// ignored. Unparseable lines are skipped with a warning, not fatal.
pub fn parse_quota_file(contents: &str) -> Vec<QuotaInterval> {
    let mut intervals = Vec::new();
    for line in contents.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        match parse_quota_line(trimmed) {
            Some(interval) => intervals.push(interval),
            None => {
                let err = CaptureError::BadQuotaLine {
                    line: trimmed.to_string(),
                };
                crate::error::log_capture_error(&err, "parse_quota_file");
            }
        }
    }
    intervals
}

fn parse_quota_line(line: &str) -> Option<QuotaInterval> {
    let mut fields = line.split_whitespace();
    let start = fields.next()?;
    let end = fields.next()?;
    let quota: u32 = fields.next()?.parse().ok()?;
    if fields.next().is_some() {
        return None;
    }
    Some(QuotaInterval {
        start_sec: parse_hhmm(start)?,
        end_sec: parse_hhmm(end)?,
        quota,
    })
}

fn parse_hhmm(text: &str) -> Option<u32> {
    let (h, m) = text.split_once(':')?;
    let h: u32 = h.parse().ok()?;
    let m: u32 = m.parse().ok()?;
    Some(h * 3600 + m * 60)
}

/// A one-shot playback collaborator invoked when the tracker fires.
pub trait PlaybackListener {
    fn playback(&mut self, output_name: &str, song_name: &str, now: DateTime<Local>);
    fn is_running(&self) -> bool;
}

/// Tracks switch-initiated playback against time-of-day quotas and a
/// refractory period.
pub struct SwitchTracker<S, P> {
    switch: S,
    listener: P,
    quotas: Vec<QuotaInterval>,
    refractory_sec: i64,
    output_name: String,
    song_name: String,

    triggering_interval: Option<usize>,
    triggering_count: u32,
    end_refractory: i64,
}

impl<S: Switch, P: PlaybackListener> SwitchTracker<S, P> {
    pub fn new(
        switch: S,
        listener: P,
        quotas: Vec<QuotaInterval>,
        refractory_sec: i64,
        output_name: impl Into<String>,
        song_name: impl Into<String>,
    ) -> Self {
        SwitchTracker {
            switch,
            listener,
            quotas,
            refractory_sec,
            output_name: output_name.into(),
            song_name: song_name.into(),
            triggering_interval: None,
            triggering_count: 1,
            end_refractory: 0,
        }
    }

    fn time_of_day_sec(now: DateTime<Local>) -> u32 {
        now.hour() * 3600 + now.minute() * 60 + now.second()
    }

    /// Attempt a trigger at wall-clock time `now`. Returns the emitted
    /// [`Event`] on success, or `None` with the reason logged.
    pub fn try_trigger(&mut self, now: DateTime<Local>) -> Option<Event> {
        if !self.switch.get_state() {
            return None;
        }

        let now_epoch = now.timestamp();
        let time_of_day = Self::time_of_day_sec(now);

        if self.end_refractory != 0 && now_epoch < self.end_refractory {
            log::info!("switch tracker: no playback, in refraction");
            return None;
        }

        if self.listener.is_running() {
            log::info!("switch tracker: no playback, previous playback still running");
            return None;
        }

        let found = self
            .quotas
            .iter()
            .enumerate()
            .find(|(_, q)| time_of_day > q.start_sec && time_of_day < q.end_sec);

        let (index, interval) = match found {
            Some((i, q)) => (i, *q),
            None => {
                log::info!("switch tracker: no playback, outside quota intervals");
                return None;
            }
        };

        if self.triggering_interval == Some(index) {
            if self.triggering_count < interval.quota {
                self.triggering_count += 1;
            } else {
                log::info!("switch tracker: no playback, exceeded quota for this interval");
                return None;
            }
        } else {
            self.triggering_interval = Some(index);
            self.triggering_count = 1;
        }

        self.listener.playback(&self.output_name, &self.song_name, now);
        self.end_refractory = now_epoch + self.refractory_sec;

        Some(Event {
            kind: EventKind::Playback {
                output_name: self.output_name.clone(),
                song_name: self.song_name.clone(),
            },
            sample_time: 0,
            wall_time: Some(now),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[derive(Default)]
    struct AlwaysOn;
    impl Switch for AlwaysOn {
        fn get_state(&mut self) -> bool {
            true
        }
    }

    #[derive(Default)]
    struct RecordingListener {
        calls: Vec<(String, String)>,
        running: bool,
    }
    impl PlaybackListener for RecordingListener {
        fn playback(&mut self, output_name: &str, song_name: &str, _now: DateTime<Local>) {
            self.calls.push((output_name.to_string(), song_name.to_string()));
        }
        fn is_running(&self) -> bool {
            self.running
        }
    }

    fn at(hour: u32, min: u32, sec: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 6, 1, hour, min, sec).unwrap()
    }

    #[test]
    fn parses_quota_file_skipping_comments_and_blanks() {
        let text = "# comment\n\n08:00 10:00 3\nbad line\n12:00 13:00 1\n";
        let intervals = parse_quota_file(text);
        assert_eq!(intervals.len(), 2);
        assert_eq!(intervals[0].start_sec, 8 * 3600);
        assert_eq!(intervals[0].quota, 3);
    }

    #[test]
    fn boundary_times_are_exclusive() {
        let quotas = vec![QuotaInterval {
            start_sec: 8 * 3600,
            end_sec: 10 * 3600,
            quota: 3,
        }];
        let mut tracker = SwitchTracker::new(
            AlwaysOn,
            RecordingListener::default(),
            quotas,
            30,
            "out1",
            "song.wav",
        );
        // exactly on the boundary: strict inequality means no fire
        assert!(tracker.try_trigger(at(8, 0, 0)).is_none());
        assert!(tracker.try_trigger(at(10, 0, 0)).is_none());
    }

    #[test]
    fn fires_up_to_quota_then_stops() {
        let quotas = vec![QuotaInterval {
            start_sec: 8 * 3600,
            end_sec: 10 * 3600,
            quota: 3,
        }];
        let mut tracker = SwitchTracker::new(
            AlwaysOn,
            RecordingListener::default(),
            quotas,
            0,
            "out1",
            "song.wav",
        );
        let times = [
            at(9, 0, 0),
            at(9, 5, 0),
            at(9, 10, 0),
            at(9, 15, 0),
            at(9, 20, 0),
            at(9, 25, 0),
        ];
        let fired: Vec<bool> = times.iter().map(|t| tracker.try_trigger(*t).is_some()).collect();
        assert_eq!(fired, vec![true, true, true, false, false, false]);
    }

    #[test]
    fn refractory_period_blocks_immediate_retrigger() {
        let quotas = vec![QuotaInterval {
            start_sec: 8 * 3600,
            end_sec: 10 * 3600,
            quota: 10,
        }];
        let mut tracker = SwitchTracker::new(
            AlwaysOn,
            RecordingListener::default(),
            quotas,
            60,
            "out1",
            "song.wav",
        );
        assert!(tracker.try_trigger(at(9, 0, 0)).is_some());
        assert!(tracker.try_trigger(at(9, 0, 30)).is_none());
        assert!(tracker.try_trigger(at(9, 2, 0)).is_some());
    }

    #[test]
    fn outside_any_interval_never_fires() {
        let quotas = vec![QuotaInterval {
            start_sec: 8 * 3600,
            end_sec: 10 * 3600,
            quota: 3,
        }];
        let mut tracker = SwitchTracker::new(
            AlwaysOn,
            RecordingListener::default(),
            quotas,
            0,
            "out1",
            "song.wav",
        );
        assert!(tracker.try_trigger(at(12, 0, 0)).is_none());
    }
}
