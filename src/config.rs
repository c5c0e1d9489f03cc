use std::time::Duration;

/// Tick loop timing, spec.md 6 "Config surface".
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickConfig {
    pub tick_rate_hz: u32,
    pub entity_ttl_ticks: u64,
    pub max_infos_per_cycle: usize,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: 20,
            entity_ttl_ticks: 200,
            max_infos_per_cycle: 1000,
        }
    }
}

impl TickConfig {
    pub fn tick_duration(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.tick_rate_hz as f64)
    }
}

/// InfoRing acceptance bands and lag tolerance, spec.md 4.3 / 6.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InfoGateConfig {
    pub accept_threshold: f32,
    pub reject_threshold: f32,
    pub verification_threshold: f32,
    pub max_lag_ticks: u64,
}

impl Default for InfoGateConfig {
    fn default() -> Self {
        Self {
            accept_threshold: 0.8,
            reject_threshold: 0.2,
            verification_threshold: 0.5,
            max_lag_ticks: 8,
        }
    }
}

/// AuthorityRing sanity gate, spec.md 4.4 / 6.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SanityGateConfig {
    pub max_velocity: f32,
    pub max_acceleration: f32,
    pub allowed_health_delta: f32,
}

impl Default for SanityGateConfig {
    fn default() -> Self {
        Self {
            max_velocity: 15.0,
            max_acceleration: 30.0,
            allowed_health_delta: 0.5,
        }
    }
}

/// DataBus queueing/coalescing/read-cache config, spec.md 4.6 / 6.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BusConfig {
    pub max_queued_writes: usize,
    pub enable_coalescing: bool,
    pub enable_read_cache: bool,
    pub read_cache_ttl_ticks: u64,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            max_queued_writes: 10_000,
            enable_coalescing: true,
            enable_read_cache: true,
            read_cache_ttl_ticks: 2,
        }
    }
}

/// AttributeRing interpolation buffer config, spec.md 4.5 / 6.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BufferConfig {
    pub capacity: usize,
    pub initial_delay_ticks: u64,
    pub min_delay_ticks: u64,
    pub max_delay_ticks: u64,
    pub extrapolation_cap_ticks: u64,
    pub decay_rate: f32,
    pub snap_threshold: f32,
    pub blend_rate: f32,
    pub jitter_sample_window: usize,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            capacity: 32,
            initial_delay_ticks: 2,
            min_delay_ticks: 1,
            max_delay_ticks: 6,
            extrapolation_cap_ticks: 10,
            decay_rate: 0.35,
            snap_threshold: 5.0,
            blend_rate: 0.15,
            jitter_sample_window: 64,
        }
    }
}

/// Wire/network queueing, spec.md 4.7 / 6.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NetworkConfig {
    pub max_queued_packets: usize,
    pub flush_interval_ms: u64,
    pub max_packet_size: usize,
    pub protocol_version: u32,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            max_queued_packets: 1000,
            flush_interval_ms: 50,
            max_packet_size: 4096,
            protocol_version: 1,
        }
    }
}

/// Server-side authoritative-state config, spec.md 4.8 / 6.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub max_players: u32,
    pub save_path: String,
    pub time_sync_interval_seconds: u64,
    pub rng_seed: u64,
    pub ko_threshold: f32,
    pub death_threshold: f32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            max_players: 64,
            save_path: "world.save".to_string(),
            time_sync_interval_seconds: 5,
            rng_seed: 0,
            ko_threshold: 15.0,
            death_threshold: 0.0,
        }
    }
}

/// The full config surface, spec.md 6.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RingConfig {
    pub tick: TickConfig,
    pub info_gate: InfoGateConfig,
    pub sanity_gate: SanityGateConfig,
    pub bus: BusConfig,
    pub buffer: BufferConfig,
    pub network: NetworkConfig,
    pub server: ServerConfig,
}
