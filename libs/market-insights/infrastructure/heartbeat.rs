//! Periodic status logging for the long-running sync process

use chrono::{DateTime, Utc};
use std::time::Duration;

pub struct Heartbeat {
    interval: Duration,
    last_beat: DateTime<Utc>,
}

impl Heartbeat {
    pub fn new(interval_secs: u64) -> Self {
        Self {
            interval: Duration::from_secs(interval_secs),
            last_beat: Utc::now(),
        }
    }

    pub fn should_beat(&self) -> bool {
        let elapsed = Utc::now().signed_duration_since(self.last_beat);
        elapsed.to_std().unwrap_or_default() >= self.interval
    }

    pub fn beat(&mut self) {
        self.last_beat = Utc::now();
    }

    pub fn last_beat(&self) -> DateTime<Utc> {
        self.last_beat
    }
}
