/// Broadcast periodically so clients can reconcile local time-of-day/weather and
/// scale their delta by `gameSpeed`. See spec.md 4.8 "Time sync".
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeSync {
    pub server_tick: u64,
    pub time_of_day: f32,
    pub weather: u8,
    pub game_speed: f32,
}

/// Tracks elapsed wall-clock seconds since the last broadcast and reports whether
/// `timeSyncIntervalSeconds` has elapsed. See spec.md 4.8 / 6 "timeSyncIntervalSeconds".
pub struct TimeSyncScheduler {
    interval_seconds: u64,
    elapsed_seconds: f64,
}

impl TimeSyncScheduler {
    pub fn new(interval_seconds: u64) -> Self {
        Self {
            interval_seconds,
            elapsed_seconds: 0.0,
        }
    }

    /// Advances the scheduler by `dt` seconds; returns `true` at most once per call
    /// when the interval has elapsed, resetting the accumulator.
    pub fn tick(&mut self, dt: f64) -> bool {
        self.elapsed_seconds += dt;
        if self.elapsed_seconds >= self.interval_seconds as f64 {
            self.elapsed_seconds = 0.0;
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_once_interval_elapses() {
        let mut scheduler = TimeSyncScheduler::new(5);
        assert!(!scheduler.tick(3.0));
        assert!(scheduler.tick(2.5));
        assert!(!scheduler.tick(1.0));
    }
}
