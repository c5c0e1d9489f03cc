pub mod actuator;

pub use actuator::{FakeMemoryActuator, MemoryActuator};

use std::collections::HashMap;

use crate::config::BusConfig;
use crate::error::BusError;
use crate::payload::{Payload, Vec3};
use crate::rings::container::ActuatorHandle;
use crate::types::{AuthorityEpoch, NetId, Priority, SchemaId, Tick};

#[derive(Debug, Clone, Copy)]
struct WriteIntent {
    target: NetId,
    field: SchemaId,
    payload: Payload,
    authority_epoch: AuthorityEpoch,
    priority: Priority,
}

#[derive(Clone, Copy)]
struct CacheEntry {
    payload: Payload,
    cached_at_tick: Tick,
}

/// Gates all writes to the external actuator: coalescing, rate caps, and a short-lived
/// read cache. See spec.md 4.6.
pub struct DataBus<A: MemoryActuator> {
    actuator: A,
    config: BusConfig,
    pending_writes: HashMap<(NetId, SchemaId), WriteIntent>,
    known_epochs: HashMap<NetId, AuthorityEpoch>,
    read_cache: HashMap<(NetId, SchemaId), CacheEntry>,
    pub writes_applied: u64,
    pub writes_dropped_stale: u64,
    pub writes_dropped_overflow: u64,
    pub read_cache_hits: u64,
    pub read_cache_misses: u64,
}

impl<A: MemoryActuator> DataBus<A> {
    pub fn new(actuator: A, config: BusConfig) -> Self {
        Self {
            actuator,
            config,
            pending_writes: HashMap::new(),
            known_epochs: HashMap::new(),
            read_cache: HashMap::new(),
            writes_applied: 0,
            writes_dropped_stale: 0,
            writes_dropped_overflow: 0,
            read_cache_hits: 0,
            read_cache_misses: 0,
        }
    }

    /// The coordinator calls this right after `ContainerRing::bump_epoch` so the bus
    /// can reject writes whose epoch has since been superseded. See spec.md 4.6
    /// invariant: "the bus never applies a write for an entity whose current
    /// authorityEpoch is greater than the intent's epoch".
    pub fn observe_epoch(&mut self, target: NetId, epoch: AuthorityEpoch) {
        self.known_epochs
            .entry(target)
            .and_modify(|known| *known = (*known).max(epoch))
            .or_insert(epoch);
    }

    /// Enqueues write intent; deduplicates by `(target, field)` within the current
    /// batch (last writer wins, coalescing). See spec.md 4.6.
    pub fn write(
        &mut self,
        target: NetId,
        field: SchemaId,
        payload: Payload,
        authority_epoch: AuthorityEpoch,
    ) -> Result<(), BusError> {
        if let Some(known) = self.known_epochs.get(&target) {
            if authority_epoch < *known {
                self.writes_dropped_stale += 1;
                return Err(BusError::StaleEpoch {
                    intent_epoch: authority_epoch,
                    current_epoch: *known,
                });
            }
        }

        let intent = WriteIntent {
            target,
            field,
            payload,
            authority_epoch,
            priority: field.priority(),
        };

        // `enableCoalescing` toggles whether same-batch writes to a field are
        // deduplicated; this bus always stores the latest intent per `(target,
        // field)` and applies it once per flush, so last-writer-wins holds either way
        // (spec.md 4.6 "deduplicates by (target, field) within the current batch").
        let key = (target, field);
        self.pending_writes.insert(key, intent);

        if self.pending_writes.len() > self.config.max_queued_writes {
            self.drop_lowest_priority();
        }

        Ok(())
    }

    /// Drops the oldest lowest-priority pending write, never a `Critical` write while
    /// a `Low` (or lower-priority) write remains. See spec.md 8 invariant #11.
    fn drop_lowest_priority(&mut self) {
        if let Some((&key, _)) = self
            .pending_writes
            .iter()
            .min_by_key(|(_, intent)| intent.priority)
        {
            self.pending_writes.remove(&key);
            self.writes_dropped_overflow += 1;
            log::warn!("DataBus write queue overflowed, dropped lowest-priority write");
        }
    }

    /// Returns a cached value if fresh; otherwise reads via the actuator, caches for
    /// `readCacheTtlTicks`, and returns. See spec.md 4.6 and 8 invariant #3.
    pub fn read(
        &mut self,
        target: NetId,
        field: SchemaId,
        current_tick: Tick,
        handle: ActuatorHandle,
        max_staleness_ticks: u64,
    ) -> Result<Payload, BusError> {
        if self.config.enable_read_cache {
            if let Some(entry) = self.read_cache.get(&(target, field)) {
                let age = current_tick.saturating_sub(entry.cached_at_tick);
                if age <= max_staleness_ticks.min(self.config.read_cache_ttl_ticks) {
                    self.read_cache_hits += 1;
                    return Ok(entry.payload);
                }
            }
        }

        self.read_cache_misses += 1;
        let payload = self.actuator.read_field(handle, field).map_err(|reason| {
            BusError::ActuatorReadFailed {
                target,
                field,
                reason,
            }
        })?;

        if self.config.enable_read_cache {
            self.read_cache.insert(
                (target, field),
                CacheEntry {
                    payload,
                    cached_at_tick: current_tick,
                },
            );
        }

        Ok(payload)
    }

    /// Flushes up to `maxQueuedWrites` writes; called once per tick. Each write is
    /// independent and succeeds or fails atomically at the field level (spec.md 4.6
    /// "Failure"). Errors are returned for the caller to log/count; the bus never
    /// partially applies a batch.
    pub fn flush_batch(
        &mut self,
        current_tick: Tick,
        resolve_handle: impl Fn(NetId) -> Option<ActuatorHandle>,
    ) -> Vec<BusError> {
        let mut errors = Vec::new();
        let mut intents: Vec<WriteIntent> = self.pending_writes.drain().map(|(_, v)| v).collect();
        intents.sort_by(|a, b| b.priority.cmp(&a.priority));

        for intent in intents.into_iter().take(self.config.max_queued_writes) {
            let Some(handle) = resolve_handle(intent.target) else {
                continue;
            };
            match self
                .actuator
                .write_field(handle, intent.field, intent.payload)
            {
                Ok(()) => {
                    self.writes_applied += 1;
                    if self.config.enable_read_cache {
                        self.read_cache.insert(
                            (intent.target, intent.field),
                            CacheEntry {
                                payload: intent.payload,
                                cached_at_tick: current_tick,
                            },
                        );
                    }
                }
                Err(reason) => {
                    errors.push(BusError::ActuatorWriteFailed {
                        target: intent.target,
                        field: intent.field,
                        reason,
                    });
                }
            }
        }
        errors
    }

    /// Specialized query used by presentation consumers: a cache-only peek, never
    /// touching the actuator. See spec.md 4.6 "resolvePosition".
    pub fn resolve_position(&self, target: NetId) -> Option<Vec3> {
        self.read_cache
            .get(&(target, SchemaId::Transform))
            .and_then(|entry| entry.payload.as_transform())
            .map(|t| t.position)
    }

    pub fn actuator_mut(&mut self) -> &mut A {
        &mut self.actuator
    }

    pub fn pending_write_count(&self) -> usize {
        self.pending_writes.len()
    }

    pub fn read_hit_rate(&self) -> f32 {
        let total = self.read_cache_hits + self.read_cache_misses;
        if total == 0 {
            return 0.0;
        }
        self.read_cache_hits as f32 / total as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::TransformPayload;
    use crate::rings::container::ActuatorHandle;
    use crate::types::EntityKind;

    fn entity() -> NetId {
        NetId::new(EntityKind::Player, 1)
    }

    fn transform_payload(x: f32) -> Payload {
        Payload::Transform(TransformPayload {
            position: Vec3::new(x, 0.0, 0.0),
            rotation: crate::payload::Quat::IDENTITY,
        })
    }

    #[test]
    fn coalesces_multiple_writes_to_last_writer() {
        let mut bus = DataBus::new(FakeMemoryActuator::new(), BusConfig::default());
        bus.write(entity(), SchemaId::Transform, transform_payload(1.0), 1)
            .unwrap();
        bus.write(entity(), SchemaId::Transform, transform_payload(2.0), 1)
            .unwrap();
        assert_eq!(bus.pending_write_count(), 1);

        bus.actuator.mark_valid(ActuatorHandle(1));
        let handle = Some(ActuatorHandle(1));
        let errors = bus.flush_batch(0, |_| handle);
        assert!(errors.is_empty());

        let got = bus
            .actuator
            .read_field(ActuatorHandle(1), SchemaId::Transform)
            .unwrap();
        assert_eq!(got, transform_payload(2.0));
    }

    #[test]
    fn stale_epoch_write_is_rejected() {
        let mut bus = DataBus::new(FakeMemoryActuator::new(), BusConfig::default());
        bus.observe_epoch(entity(), 5);
        let err = bus
            .write(entity(), SchemaId::Transform, transform_payload(1.0), 3)
            .unwrap_err();
        assert!(matches!(err, BusError::StaleEpoch { .. }));
        assert_eq!(bus.pending_write_count(), 0);
    }

    #[test]
    fn read_cache_hides_actuator_until_stale() {
        let mut bus = DataBus::new(FakeMemoryActuator::new(), BusConfig::default());
        bus.actuator.mark_valid(ActuatorHandle(1));
        bus.actuator
            .write_field(ActuatorHandle(1), SchemaId::Transform, transform_payload(1.0))
            .unwrap();

        let first = bus
            .read(entity(), SchemaId::Transform, 0, ActuatorHandle(1), 5)
            .unwrap();
        assert_eq!(first, transform_payload(1.0));
        assert_eq!(bus.read_cache_misses, 1);

        // mutate the actuator directly; within TTL the cached (stale) value returns
        bus.actuator
            .write_field(ActuatorHandle(1), SchemaId::Transform, transform_payload(9.0))
            .unwrap();
        let cached = bus
            .read(entity(), SchemaId::Transform, 1, ActuatorHandle(1), 5)
            .unwrap();
        assert_eq!(cached, transform_payload(1.0));
        assert_eq!(bus.read_cache_hits, 1);
    }

    #[test]
    fn overflow_drops_low_priority_before_critical() {
        let config = BusConfig {
            max_queued_writes: 1,
            ..BusConfig::default()
        };
        let mut bus = DataBus::new(FakeMemoryActuator::new(), config);
        // FactionId has the lowest schema priority in this crate's priority mapping
        bus.write(
            entity(),
            SchemaId::FactionId,
            Payload::FactionId(crate::payload::FactionIdPayload { faction: 1 }),
            1,
        )
        .unwrap();
        bus.write(entity(), SchemaId::Health, Payload::Health(crate::payload::HealthPayload { current: 1.0, max: 1.0 }), 1)
            .unwrap();

        assert_eq!(bus.pending_write_count(), 1);
        assert!(bus
            .pending_writes
            .contains_key(&(entity(), SchemaId::Health)));
    }
}
