use std::time::Duration;

use crate::bus::{DataBus, MemoryActuator};
use crate::clock::Clock;
use crate::commit::Commit;
use crate::config::RingConfig;
use crate::info::Info;
use crate::payload::{HealthPayload, Payload, TransformPayload};
use crate::rings::container::ActuatorHandle;
use crate::rings::{AttributeRing, AuthorityRing, ContainerRing, InfoRing};
use crate::stats::{SampleModeTally, Stats};
use crate::transport::{Broadcaster, NetworkTransport, PeerId};
use crate::types::{AuthoritySource, EntityKind, FrameType, NetId, Tick};
use crate::wire::packet::{decode_health_update, decode_position_update, packet_for_commit, Packet, PacketKind};

/// Ties the four rings, the DataBus, and the broadcaster into the per-tick cycle. See
/// spec.md 4.1. No hidden module-level state: every collaborator is constructed by the
/// caller and owned here explicitly (spec.md 9 "Global singletons / static facades").
pub struct RingCoordinator<A: MemoryActuator, T: NetworkTransport> {
    clock: Clock,
    config: RingConfig,
    container: ContainerRing,
    info_ring: InfoRing,
    authority_ring: AuthorityRing,
    attribute_ring: AttributeRing,
    bus: DataBus<A>,
    broadcaster: Broadcaster<T>,
    sample_tally: SampleModeTally,
    designated_server: Option<PeerId>,
}

impl<A: MemoryActuator, T: NetworkTransport> RingCoordinator<A, T> {
    pub fn new(config: RingConfig, actuator: A, transport: T) -> Self {
        Self {
            clock: Clock::new(config.tick),
            container: ContainerRing::new(),
            info_ring: InfoRing::new(config.info_gate),
            authority_ring: AuthorityRing::new(),
            attribute_ring: AttributeRing::new(config.buffer),
            bus: DataBus::new(actuator, config.bus),
            broadcaster: Broadcaster::new(transport, config.network),
            sample_tally: SampleModeTally::default(),
            config,
            designated_server: None,
        }
    }

    pub fn set_designated_server(&mut self, peer: Option<PeerId>) {
        self.designated_server = peer;
    }

    pub fn current_tick(&self) -> Tick {
        self.clock.current_tick()
    }

    pub fn register_entity(
        &mut self,
        id: NetId,
        kind: EntityKind,
        frame: FrameType,
        actuator_handle: Option<ActuatorHandle>,
    ) -> Result<(), crate::error::ContainerError> {
        self.container
            .register(id, kind, frame, actuator_handle, self.clock.current_tick())
    }

    pub fn unregister_entity(&mut self, id: NetId) {
        self.container.unregister(id);
    }

    /// Observer-facing intake; may be called from other threads between ticks (spec.md
    /// 5 "InfoRing.submit(info) — MPSC").
    pub fn submit_info(&mut self, info: Info) {
        self.info_ring.submit(info);
    }

    /// Cache-only presentation query; safe to call off the tick thread (spec.md 4.6
    /// "resolvePosition").
    pub fn resolve_position(&self, target: NetId) -> Option<crate::payload::Vec3> {
        self.bus.resolve_position(target)
    }

    pub fn sample(&mut self, entity: NetId, time: f64) -> crate::rings::PresentationState {
        let state = self.attribute_ring.sample(entity, time);
        self.sample_tally.record(state.sample_mode);
        state
    }

    /// Converts a decoded inbound packet into an `Info` addressed to its subject. The
    /// sender's authority is `ServerCommit` when `peer` is the designated server,
    /// `PeerReport` otherwise. See spec.md 4.7 "Inbound".
    fn packet_to_info(&self, peer: PeerId, packet: &Packet, current_tick: Tick) -> Option<Info> {
        let authority = if self.designated_server == Some(peer) {
            AuthoritySource::ServerCommit
        } else {
            AuthoritySource::PeerReport
        };

        let payload = match packet.kind {
            PacketKind::PositionUpdate => {
                let (position, rotation) = decode_position_update(&packet.data).ok()?;
                Payload::Transform(TransformPayload { position, rotation })
            }
            PacketKind::HealthUpdate => {
                let (current, max) = decode_health_update(&packet.data).ok()?;
                Payload::Health(HealthPayload { current, max })
            }
            _ => return None,
        };

        Some(Info {
            tick: packet.tick,
            subject: packet.entity_id,
            authority,
            source: NetId::from_packed(peer),
            frame: FrameType::World,
            payload,
            confidence: 0.7,
            observed_at_tick: current_tick,
        })
    }

    /// Emits a commit to the bus write-intent, the broadcaster, and the AttributeRing
    /// buffer, in that order. See spec.md 4.4 "Every commit is dispatched to three
    /// sinks in this order".
    fn dispatch_commit(&mut self, commit: &Commit) {
        self.bus.observe_epoch(commit.subject_id, commit.authority_epoch);
        if let Err(err) = self.bus.write(
            commit.subject_id,
            commit.schema(),
            commit.payload,
            commit.authority_epoch,
        ) {
            log::debug!("bus rejected write for commit {}: {err}", commit.commit_id);
        }
        self.broadcaster.enqueue(packet_for_commit(commit));
        self.attribute_ring.on_commit(commit);
    }

    /// Runs one full tick per spec.md 4.1:
    /// 1. Drain inbound frames into InfoRing.
    /// 2. ContainerRing maintenance.
    /// 3. InfoRing arbitration.
    /// 4. AuthorityRing commit, dispatched to DataBus/NetworkTransport/AttributeRing.
    /// 5. (folded into step 4's dispatch)
    /// 6. DataBus flush.
    pub fn run_tick(&mut self, elapsed: Duration) -> Stats {
        let current_tick = self.clock.current_tick();

        for (peer, frame) in self.broadcaster.poll_frames() {
            for packet in &frame.packets {
                if let Some(info) = self.packet_to_info(peer, packet, current_tick) {
                    self.info_ring.submit(info);
                }
            }
        }

        self.container
            .expire_stale(current_tick, self.config.tick.entity_ttl_ticks);

        let winners = self.info_ring.process_tick(
            current_tick,
            &mut self.container,
            self.authority_ring.last_commits(),
            &self.config.sanity_gate,
        );

        let commits = self.authority_ring.process_tick(
            current_tick,
            winners,
            &mut self.container,
            &self.config.sanity_gate,
        );

        for commit in &commits {
            self.dispatch_commit(commit);
        }

        let timestamp_ms = 0; // wall-clock stamping is the embedder's responsibility
        if let Err(err) = self.broadcaster.flush(current_tick as i64, timestamp_ms) {
            log::warn!("broadcaster flush failed: {err}");
        }

        let resolve_handle = |id: NetId| self.container.lookup_unchecked(id).and_then(|r| r.actuator_handle);
        let bus_errors = self.bus.flush_batch(current_tick, resolve_handle);
        for err in bus_errors {
            log::warn!("bus write failed: {err}");
        }

        self.clock.advance(elapsed);

        Stats {
            commits_generated: commits.len() as u64,
            info_pending: self.info_ring.pending_len(),
            extrapolation_ratio: self.sample_tally.ratio(),
            bus_read_hit_rate: self.bus.read_hit_rate(),
            packets_sent: self.broadcaster.packets_sent,
            packets_dropped: self.broadcaster.packets_dropped,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::FakeMemoryActuator;
    use crate::payload::Vec3;
    use crate::transport::FakeNetworkTransport;
    use crate::types::AuthoritySource;
    use crate::wire::{decode_frame, PacketKind};

    fn coordinator() -> RingCoordinator<FakeMemoryActuator, FakeNetworkTransport> {
        RingCoordinator::new(RingConfig::default(), FakeMemoryActuator::new(), FakeNetworkTransport::new())
    }

    #[test]
    fn commit_broadcast_produces_one_commit_and_one_position_update() {
        // S1: register NetId(Player,1) in World, submit a LocalOwned Transform info,
        // expect exactly one commit with epoch 1 and one PositionUpdate packet.
        let mut coordinator = coordinator();
        let subject = NetId::new(EntityKind::Player, 1);
        coordinator
            .register_entity(subject, EntityKind::Player, FrameType::World, Some(ActuatorHandle(1)))
            .unwrap();
        coordinator.bus.actuator_mut().mark_valid(ActuatorHandle(1));

        coordinator.submit_info(Info {
            tick: 0,
            subject,
            authority: AuthoritySource::LocalOwned,
            source: subject,
            frame: FrameType::World,
            payload: Payload::Transform(TransformPayload {
                position: Vec3::new(1.0, 0.0, 0.0),
                rotation: crate::payload::Quat::IDENTITY,
            }),
            confidence: 0.9,
            observed_at_tick: 0,
        });

        let stats = coordinator.run_tick(Duration::from_millis(50));
        assert_eq!(stats.commits_generated, 1);

        let (_, bytes) = &coordinator.broadcaster.transport().outbox[0];
        let frame = decode_frame(bytes).unwrap();
        assert_eq!(frame.packets.len(), 1);
        assert_eq!(frame.packets[0].kind, PacketKind::PositionUpdate);
        assert_eq!(frame.packets[0].entity_id, subject);
        assert_eq!(frame.packets[0].tick, 0);
    }

    #[test]
    fn sanity_gate_rejection_produces_no_commit_or_broadcast() {
        // S2: previous commit at (0,0,0); next tick jumps far past maxVelocity.
        let mut coordinator = coordinator();
        let subject = NetId::new(EntityKind::Player, 1);
        coordinator
            .register_entity(subject, EntityKind::Player, FrameType::World, Some(ActuatorHandle(1)))
            .unwrap();
        coordinator.bus.actuator_mut().mark_valid(ActuatorHandle(1));

        let info_at = |tick: Tick, x: f32| Info {
            tick,
            subject,
            authority: AuthoritySource::LocalOwned,
            source: subject,
            frame: FrameType::World,
            payload: Payload::Transform(TransformPayload {
                position: Vec3::new(x, 0.0, 0.0),
                rotation: crate::payload::Quat::IDENTITY,
            }),
            confidence: 0.9,
            observed_at_tick: tick,
        };

        coordinator.submit_info(info_at(0, 0.0));
        coordinator.run_tick(Duration::from_millis(50));

        coordinator.submit_info(info_at(1, 1000.0));
        let stats = coordinator.run_tick(Duration::from_millis(50));
        assert_eq!(stats.commits_generated, 0);

        // only the first tick's PositionUpdate should have gone out
        assert_eq!(coordinator.broadcaster.transport().outbox.len(), 1);
    }
}
