use std::collections::VecDeque;
use std::time::Duration;

use crate::config::TickConfig;
use crate::types::Tick;

/// Fixed-rate tick clock. Advances by exactly one tick per `advance()` call; the caller
/// (the coordinator's `run_tick`) is responsible for calling it at `tickRateHz`.
/// Holds a short rolling history of observed tick wall-clock durations to serve
/// `average_tick_duration()` (naia's `Server::average_tick_duration`, spec.md
/// "SUPPLEMENTED FROM ORIGINAL SOURCE").
pub struct Clock {
    current_tick: Tick,
    config: TickConfig,
    recent_durations: VecDeque<Duration>,
}

const DURATION_HISTORY_LEN: usize = 64;

impl Clock {
    pub fn new(config: TickConfig) -> Self {
        Self {
            current_tick: 0,
            config,
            recent_durations: VecDeque::with_capacity(DURATION_HISTORY_LEN),
        }
    }

    pub fn current_tick(&self) -> Tick {
        self.current_tick
    }

    pub fn tick_duration(&self) -> Duration {
        self.config.tick_duration()
    }

    /// Advance to the next tick, recording how long the prior tick's processing took.
    pub fn advance(&mut self, elapsed: Duration) {
        self.current_tick += 1;
        if self.recent_durations.len() == DURATION_HISTORY_LEN {
            self.recent_durations.pop_front();
        }
        self.recent_durations.push_back(elapsed);
    }

    pub fn average_tick_duration(&self) -> Duration {
        if self.recent_durations.is_empty() {
            return Duration::ZERO;
        }
        let total: Duration = self.recent_durations.iter().sum();
        total / (self.recent_durations.len() as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advances_one_tick_at_a_time() {
        let mut clock = Clock::new(TickConfig::default());
        assert_eq!(clock.current_tick(), 0);
        clock.advance(Duration::from_millis(5));
        assert_eq!(clock.current_tick(), 1);
        clock.advance(Duration::from_millis(15));
        assert_eq!(clock.current_tick(), 2);
    }

    #[test]
    fn averages_recent_tick_durations() {
        let mut clock = Clock::new(TickConfig::default());
        clock.advance(Duration::from_millis(10));
        clock.advance(Duration::from_millis(20));
        assert_eq!(clock.average_tick_duration(), Duration::from_millis(15));
    }
}
