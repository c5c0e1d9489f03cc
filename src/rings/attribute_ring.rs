use std::collections::{HashMap, VecDeque};

use crate::commit::Commit;
use crate::config::BufferConfig;
use crate::payload::{Payload, Quat, Vec3};
use crate::types::{NetId, Tick};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleMode {
    Exact,
    Interpolate,
    Extrapolate,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PresentationState {
    pub position: Vec3,
    pub rotation: Quat,
    pub velocity: Vec3,
    pub sample_mode: SampleMode,
    /// Residual correction error not yet fully decayed into the output. See spec.md
    /// 4.5 "Correction on new commit".
    pub residual_error: Vec3,
}

impl PresentationState {
    fn none() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            velocity: Vec3::ZERO,
            sample_mode: SampleMode::None,
            residual_error: Vec3::ZERO,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Sample {
    tick: Tick,
    position: Vec3,
    rotation: Quat,
    velocity: Vec3,
}

/// Per-entity decaying correction applied on top of the raw interpolated/extrapolated
/// value. See spec.md 4.5 "Correction on new commit".
#[derive(Default)]
struct CorrectionTracker {
    position_error: Vec3,
    rotation_error: Quat,
    last_sample_time: Option<f64>,
}

impl CorrectionTracker {
    fn new() -> Self {
        Self {
            position_error: Vec3::ZERO,
            rotation_error: Quat::IDENTITY,
            last_sample_time: None,
        }
    }

    fn snap(&mut self) {
        self.position_error = Vec3::ZERO;
        self.rotation_error = Quat::IDENTITY;
    }

    fn push_error(&mut self, position_error: Vec3, rotation_error: Quat) {
        self.position_error = position_error;
        self.rotation_error = rotation_error;
    }

    /// Frame-rate-independent decay factor `1 - (1 - blendRate)^(dt*60)`.
    fn decay_towards_zero(&mut self, time: f64, blend_rate: f32) -> (Vec3, Quat) {
        let dt = match self.last_sample_time {
            Some(last) => (time - last).max(0.0),
            None => 0.0,
        };
        self.last_sample_time = Some(time);

        let decay = 1.0 - (1.0 - blend_rate).powf((dt * 60.0) as f32);
        let decay = decay.clamp(0.0, 1.0);

        let applied_position = self.position_error;
        let applied_rotation = self.rotation_error;

        self.position_error = self.position_error.scale(1.0 - decay);
        self.rotation_error = Quat::IDENTITY.slerp(&self.rotation_error, 1.0 - decay);

        (applied_position, applied_rotation)
    }
}

struct EntityBuffer {
    samples: VecDeque<Sample>,
    capacity: usize,
    inter_arrival_ticks: VecDeque<u64>,
    last_insert_tick: Option<Tick>,
    correction: CorrectionTracker,
    snap_next: bool,
}

impl EntityBuffer {
    fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
            inter_arrival_ticks: VecDeque::new(),
            last_insert_tick: None,
            correction: CorrectionTracker::new(),
            snap_next: false,
        }
    }

    fn push(&mut self, sample: Sample, jitter_window: usize) {
        if let Some(last) = self.last_insert_tick {
            let gap = sample.tick.saturating_sub(last);
            if self.inter_arrival_ticks.len() == jitter_window {
                self.inter_arrival_ticks.pop_front();
            }
            self.inter_arrival_ticks.push_back(gap);
        }
        self.last_insert_tick = Some(sample.tick);

        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    /// 90th-percentile of observed inter-arrival jitter, clamped to `[min, max]`
    /// ticks. See spec.md 4.5.
    fn adaptive_delay(&self, config: &BufferConfig) -> u64 {
        if self.inter_arrival_ticks.is_empty() {
            return config.initial_delay_ticks.clamp(config.min_delay_ticks, config.max_delay_ticks);
        }
        let mut sorted: Vec<u64> = self.inter_arrival_ticks.iter().copied().collect();
        sorted.sort_unstable();
        let idx = ((sorted.len() as f64) * 0.9).floor() as usize;
        let idx = idx.min(sorted.len() - 1);
        sorted[idx].clamp(config.min_delay_ticks, config.max_delay_ticks)
    }
}

/// Maintains the interpolation buffer per entity and produces render-time (sub-tick)
/// states. See spec.md 4.5.
pub struct AttributeRing {
    config: BufferConfig,
    buffers: HashMap<NetId, EntityBuffer>,
}

impl AttributeRing {
    pub fn new(config: BufferConfig) -> Self {
        Self {
            config,
            buffers: HashMap::new(),
        }
    }

    /// Inserted when a `Transform` commit arrives. Non-Transform commits don't carry
    /// positional data and are ignored here. See spec.md 4.5.
    pub fn on_commit(&mut self, commit: &Commit) {
        let Payload::Transform(transform) = &commit.payload else {
            return;
        };

        let buffer = self
            .buffers
            .entry(commit.subject_id)
            .or_insert_with(|| EntityBuffer::new(self.config.capacity));

        let velocity = buffer
            .samples
            .back()
            .map(|prev| {
                let dt = (commit.tick.saturating_sub(prev.tick)).max(1) as f32;
                transform.position.sub(&prev.position).scale(1.0 / dt)
            })
            .unwrap_or(Vec3::ZERO);

        let predicted = self.sample_raw(commit.subject_id, commit.tick as f64);
        if let Some(predicted) = predicted {
            let position_error = transform.position.sub(&predicted.position);
            let rotation_error = predicted.rotation.conjugate().mul(&transform.rotation);

            let buffer = self.buffers.get_mut(&commit.subject_id).unwrap();
            if position_error.length() > self.config.snap_threshold {
                buffer.correction.snap();
                buffer.snap_next = true;
            } else {
                buffer.correction.push_error(position_error, rotation_error);
            }
        }

        let buffer = self.buffers.get_mut(&commit.subject_id).unwrap();
        buffer.push(
            Sample {
                tick: commit.tick,
                position: transform.position,
                rotation: transform.rotation,
                velocity,
            },
            self.config.jitter_sample_window,
        );
    }

    /// Raw interpolated/extrapolated sample with no correction blending applied; used
    /// internally to compute the residual error on new commits.
    fn sample_raw(&self, entity: NetId, time: f64) -> Option<PresentationState> {
        let buffer = self.buffers.get(&entity)?;
        if buffer.samples.is_empty() {
            return None;
        }

        let delay = buffer.adaptive_delay(&self.config) as f64;
        let target = time - delay;

        let earliest = buffer.samples.front().unwrap();
        if target <= earliest.tick as f64 {
            return Some(PresentationState {
                position: earliest.position,
                rotation: earliest.rotation,
                velocity: earliest.velocity,
                sample_mode: SampleMode::Exact,
                residual_error: Vec3::ZERO,
            });
        }

        let latest = buffer.samples.back().unwrap();
        if target > latest.tick as f64 {
            let dt = ((target - latest.tick as f64) as f32).min(self.config.extrapolation_cap_ticks as f32);
            let position = latest.position.add(&latest.velocity.scale(dt));
            let confidence = (-self.config.decay_rate * dt).exp();
            return Some(PresentationState {
                position,
                rotation: latest.rotation,
                velocity: latest.velocity.scale(confidence),
                sample_mode: SampleMode::Extrapolate,
                residual_error: Vec3::ZERO,
            });
        }

        for window in buffer.samples.iter().collect::<Vec<_>>().windows(2) {
            let (s0, s1) = (window[0], window[1]);
            if (s0.tick as f64) <= target && target <= (s1.tick as f64) {
                let dt = (s1.tick - s0.tick).max(1) as f32;
                let s = ((target - s0.tick as f64) / dt as f64) as f32;

                let h00 = 2.0 * s.powi(3) - 3.0 * s.powi(2) + 1.0;
                let h10 = s.powi(3) - 2.0 * s.powi(2) + s;
                let h01 = -2.0 * s.powi(3) + 3.0 * s.powi(2);
                let h11 = s.powi(3) - s.powi(2);

                let position = s0
                    .position
                    .scale(h00)
                    .add(&s0.velocity.scale(dt).scale(h10))
                    .add(&s1.position.scale(h01))
                    .add(&s1.velocity.scale(dt).scale(h11));

                let rotation = s0.rotation.slerp(&s1.rotation, s);
                let velocity = s0.velocity.add(&s1.velocity.sub(&s0.velocity).scale(s));

                return Some(PresentationState {
                    position,
                    rotation,
                    velocity,
                    sample_mode: SampleMode::Interpolate,
                    residual_error: Vec3::ZERO,
                });
            }
        }

        None
    }

    /// Produce a render-time presentation state for `entity` at sub-tick `time`
    /// (fractional tick units). See spec.md 4.5 "sample(time) semantics".
    pub fn sample(&mut self, entity: NetId, time: f64) -> PresentationState {
        let Some(mut state) = self.sample_raw(entity, time) else {
            return PresentationState::none();
        };

        let buffer = self.buffers.get_mut(&entity).unwrap();
        if buffer.snap_next {
            buffer.snap_next = false;
            state.sample_mode = SampleMode::Exact;
            return state;
        }

        let (position_correction, rotation_correction) =
            buffer.correction.decay_towards_zero(time, self.config.blend_rate);
        state.position = state.position.add(&position_correction);
        state.rotation = rotation_correction.mul(&state.rotation);
        state.residual_error = position_correction;
        state
    }

    pub fn has_buffer(&self, entity: NetId) -> bool {
        self.buffers.contains_key(&entity)
    }
}
