/// Structured per-tick counters surfaced in log lines. See spec.md 7 "User-visible
/// behavior": "console-visible log messages carry structured counters".
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Stats {
    pub commits_generated: u64,
    pub info_pending: usize,
    pub extrapolation_ratio: f32,
    pub bus_read_hit_rate: f32,
    pub packets_sent: u64,
    pub packets_dropped: u64,
}

impl Stats {
    pub fn log(&self) {
        log::info!(
            "tick stats: commitsGenerated={} infoPending={} extrapolationRatio={:.3} busReadHitRate={:.3} packetsSent={} packetsDropped={}",
            self.commits_generated,
            self.info_pending,
            self.extrapolation_ratio,
            self.bus_read_hit_rate,
            self.packets_sent,
            self.packets_dropped,
        );
    }
}

/// Rolling sample-mode tally used to compute `extrapolationRatio` over a window of
/// recent `AttributeRing::sample` calls.
#[derive(Debug, Clone, Copy, Default)]
pub struct SampleModeTally {
    pub total: u64,
    pub extrapolated: u64,
}

impl SampleModeTally {
    pub fn record(&mut self, mode: crate::rings::SampleMode) {
        self.total += 1;
        if mode == crate::rings::SampleMode::Extrapolate {
            self.extrapolated += 1;
        }
    }

    pub fn ratio(&self) -> f32 {
        if self.total == 0 {
            return 0.0;
        }
        self.extrapolated as f32 / self.total as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rings::SampleMode;

    #[test]
    fn extrapolation_ratio_tracks_extrapolated_fraction() {
        let mut tally = SampleModeTally::default();
        tally.record(SampleMode::Exact);
        tally.record(SampleMode::Extrapolate);
        tally.record(SampleMode::Extrapolate);
        tally.record(SampleMode::Interpolate);
        assert_eq!(tally.ratio(), 0.5);
    }
}
