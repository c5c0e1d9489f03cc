use std::collections::HashMap;

use crate::error::ContainerError;
use crate::types::{AuthorityEpoch, EntityKind, FrameType, NetId, Tick};

/// Opaque handle into the external simulation. `None` for remote-only entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActuatorHandle(pub u64);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntityRecord {
    pub id: NetId,
    pub kind: EntityKind,
    pub frame: FrameType,
    pub actuator_handle: Option<ActuatorHandle>,
    pub authority_epoch: AuthorityEpoch,
    pub owner_player_id: Option<u64>,
    pub zone: Option<(i32, i32)>,
    pub created_tick: Tick,
    pub last_live_tick: Tick,
}

/// Entity registry: owns the mapping from `NetId` to metadata. See spec.md 4.2.
#[derive(Default)]
pub struct ContainerRing {
    entities: HashMap<NetId, EntityRecord>,
    insertion_order: Vec<NetId>,
    unknown_lookup_count: u64,
}

impl ContainerRing {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        id: NetId,
        kind: EntityKind,
        frame: FrameType,
        actuator_handle: Option<ActuatorHandle>,
        current_tick: Tick,
    ) -> Result<(), ContainerError> {
        if self.entities.contains_key(&id) {
            return Err(ContainerError::AlreadyRegistered(id));
        }
        self.entities.insert(
            id,
            EntityRecord {
                id,
                kind,
                frame,
                actuator_handle,
                authority_epoch: 0,
                owner_player_id: None,
                zone: None,
                created_tick: current_tick,
                last_live_tick: current_tick,
            },
        );
        self.insertion_order.push(id);
        Ok(())
    }

    /// Idempotent; orphaned pending Infos are dropped next tick by the caller
    /// (InfoRing checks `lookup` before accepting).
    pub fn unregister(&mut self, id: NetId) {
        if self.entities.remove(&id).is_some() {
            self.insertion_order.retain(|existing| *existing != id);
        }
    }

    pub fn lookup(&mut self, id: NetId) -> Option<&EntityRecord> {
        let found = self.entities.get(&id);
        if found.is_none() {
            self.unknown_lookup_count += 1;
        }
        found
    }

    pub fn lookup_unchecked(&self, id: NetId) -> Option<&EntityRecord> {
        self.entities.get(&id)
    }

    pub fn live_entities(&self) -> impl Iterator<Item = NetId> + '_ {
        self.insertion_order.iter().copied()
    }

    pub fn unknown_lookup_count(&self) -> u64 {
        self.unknown_lookup_count
    }

    /// Called by AuthorityRing on every commit. Monotonic; no-op for unregistered ids.
    pub fn bump_epoch(&mut self, id: NetId) -> Option<AuthorityEpoch> {
        let record = self.entities.get_mut(&id)?;
        record.authority_epoch += 1;
        Some(record.authority_epoch)
    }

    pub fn mark_live(&mut self, id: NetId, tick: Tick) {
        if let Some(record) = self.entities.get_mut(&id) {
            record.last_live_tick = tick;
        }
    }

    pub fn set_owner(&mut self, id: NetId, owner: Option<u64>) {
        if let Some(record) = self.entities.get_mut(&id) {
            record.owner_player_id = owner;
        }
    }

    pub fn set_zone(&mut self, id: NetId, zone: Option<(i32, i32)>) {
        if let Some(record) = self.entities.get_mut(&id) {
            record.zone = zone;
        }
    }

    /// ContainerRing maintenance: time out entities whose `lastLiveTick` is older than
    /// `entityTtlTicks`. See spec.md 4.1 step 2.
    pub fn expire_stale(&mut self, current_tick: Tick, entity_ttl_ticks: u64) -> Vec<NetId> {
        let mut expired = Vec::new();
        for id in self.insertion_order.clone() {
            if let Some(record) = self.entities.get(&id) {
                if current_tick.saturating_sub(record.last_live_tick) > entity_ttl_ticks {
                    expired.push(id);
                }
            }
        }
        for id in &expired {
            self.unregister(*id);
        }
        expired
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(handle: u64) -> NetId {
        NetId::new(EntityKind::Player, handle)
    }

    #[test]
    fn register_then_double_unregister_is_idempotent() {
        let mut ring = ContainerRing::new();
        ring.register(id(1), EntityKind::Player, FrameType::World, None, 0)
            .unwrap();
        ring.unregister(id(1));
        // second call must succeed with no observable side effect (spec.md 8 #7)
        ring.unregister(id(1));
        assert!(ring.lookup_unchecked(id(1)).is_none());
        assert_eq!(ring.len(), 0);
    }

    #[test]
    fn register_twice_is_an_error() {
        let mut ring = ContainerRing::new();
        ring.register(id(1), EntityKind::Player, FrameType::World, None, 0)
            .unwrap();
        let err = ring
            .register(id(1), EntityKind::Player, FrameType::World, None, 0)
            .unwrap_err();
        assert_eq!(err, ContainerError::AlreadyRegistered(id(1)));
    }

    #[test]
    fn lookup_of_unknown_id_never_panics_and_counts() {
        let mut ring = ContainerRing::new();
        assert!(ring.lookup(id(99)).is_none());
        assert_eq!(ring.unknown_lookup_count(), 1);
    }

    #[test]
    fn epoch_is_monotonic_per_entity() {
        let mut ring = ContainerRing::new();
        ring.register(id(1), EntityKind::Player, FrameType::World, None, 0)
            .unwrap();
        assert_eq!(ring.bump_epoch(id(1)), Some(1));
        assert_eq!(ring.bump_epoch(id(1)), Some(2));
    }

    #[test]
    fn expires_entities_past_ttl() {
        let mut ring = ContainerRing::new();
        ring.register(id(1), EntityKind::Player, FrameType::World, None, 0)
            .unwrap();
        let expired = ring.expire_stale(300, 200);
        assert_eq!(expired, vec![id(1)]);
        assert!(ring.lookup_unchecked(id(1)).is_none());
    }
}
