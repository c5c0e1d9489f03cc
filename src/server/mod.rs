pub mod combat;
pub mod entity;
pub mod handshake;
pub mod interest;
pub mod player;
pub mod time_sync;

use std::collections::HashMap;

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::server::combat::{resolve_attack, CombatHit, CombatOutcome, WeaponType};
use crate::server::entity::ServerEntity;
use crate::server::handshake::{negotiate_handshake, Handshake, HandshakeResult};
use crate::server::interest::{entities_of_interest, zone_for_position};
use crate::server::player::ConnectedPlayer;
use crate::server::time_sync::{TimeSync, TimeSyncScheduler};
use crate::payload::Vec3;
use crate::transport::PeerId;
use crate::types::{EntityKind, NetId, Tick, ZONE_SIZE};
use crate::wire::packet::{encode_entity_spawn, encode_player_joined, Packet, PacketKind};

/// Opaque-to-the-core persistence snapshot. See spec.md 6 "Server persistence":
/// `{entities[], timeOfDay, weather, nextEntityId}`. Serialization format is left to
/// the embedder; this struct only names the shape.
#[derive(Debug, Clone)]
pub struct WorldSnapshot {
    pub entities: Vec<ServerEntity>,
    pub time_of_day: f32,
    pub weather: u8,
    pub next_entity_id: u64,
}

/// Server-authoritative state: entities, connected players, combat RNG, and the
/// time-sync schedule. See spec.md 4.8.
pub struct ServerState {
    config: ServerConfig,
    entities: HashMap<NetId, ServerEntity>,
    players: HashMap<u64, ConnectedPlayer>,
    next_entity_id: u64,
    next_player_id: u64,
    rng: fastrand::Rng,
    time_of_day: f32,
    weather: u8,
    game_speed: f32,
    time_sync: TimeSyncScheduler,
}

impl ServerState {
    pub fn new(config: ServerConfig) -> Self {
        let rng = fastrand::Rng::with_seed(config.rng_seed);
        let time_sync = TimeSyncScheduler::new(config.time_sync_interval_seconds);
        Self {
            config,
            entities: HashMap::new(),
            players: HashMap::new(),
            next_entity_id: 1,
            next_player_id: 1,
            rng,
            time_of_day: 0.0,
            weather: 0,
            game_speed: 1.0,
            time_sync,
        }
    }

    /// Restores state from a `WorldSnapshot` loaded by the (out-of-scope) persistence
    /// layer. See spec.md 6 "Server persistence".
    pub fn load_snapshot(&mut self, snapshot: WorldSnapshot) {
        self.entities.clear();
        for entity in snapshot.entities {
            self.entities.insert(entity.id, entity);
        }
        self.time_of_day = snapshot.time_of_day;
        self.weather = snapshot.weather;
        self.next_entity_id = snapshot.next_entity_id;
    }

    pub fn snapshot(&self) -> WorldSnapshot {
        WorldSnapshot {
            entities: self.entities.values().cloned().collect(),
            time_of_day: self.time_of_day,
            weather: self.weather,
            next_entity_id: self.next_entity_id,
        }
    }

    pub fn spawn_entity(&mut self, entity: ServerEntity) {
        self.entities.insert(entity.id, entity);
    }

    pub fn entities(&self) -> impl Iterator<Item = &ServerEntity> {
        self.entities.values()
    }

    pub fn entity(&self, id: NetId) -> Option<&ServerEntity> {
        self.entities.get(&id)
    }

    pub fn entity_mut(&mut self, id: NetId) -> Option<&mut ServerEntity> {
        self.entities.get_mut(&id)
    }

    /// Moves an entity and recomputes its zone. See spec.md 4.8 "Zone = fixed grid".
    pub fn move_entity(&mut self, id: NetId, position: [f32; 3]) {
        if let Some(entity) = self.entities.get_mut(&id) {
            entity.position = position;
            entity.zone = zone_for_position(position, ZONE_SIZE);
        }
    }

    /// Handles the first `Handshake` from a new peer: negotiates protocol version and
    /// capacity, assigns a player id, and registers the `ConnectedPlayer` on success.
    /// See spec.md 4.8 "Handshake".
    pub fn handle_handshake(
        &mut self,
        peer: PeerId,
        request: &Handshake,
        expected_protocol_version: u32,
        server_tick: Tick,
    ) -> HandshakeResult {
        let assigned_id = self.next_player_id;
        let result = negotiate_handshake(
            request,
            expected_protocol_version,
            assigned_id,
            server_tick,
            self.time_of_day,
            self.weather,
            self.config.max_players,
            self.players.len() as u32,
        );
        if let HandshakeResult::Ack(_) = &result {
            self.next_player_id += 1;
            self.players
                .insert(assigned_id, ConnectedPlayer::new(assigned_id, request.player_name.clone(), peer));
        }
        result
    }

    /// Turns a successful handshake into the world-sync dissemination spec.md 4.8
    /// describes for the newly joined peer: one `EntitySpawn` per currently known
    /// entity, plus a `PlayerJoined` packet for the rest of the table. See spec.md 4.8
    /// "streams a world snapshot (one EntitySpawn per known entity) ... Existing peers
    /// are told of the new player via PlayerJoined".
    pub fn on_player_joined(&self, joined: &ConnectedPlayer, current_tick: Tick) -> Vec<Packet> {
        let mut packets: Vec<Packet> = self
            .entities
            .values()
            .map(|entity| Packet {
                kind: PacketKind::EntitySpawn,
                entity_id: entity.id,
                tick: current_tick,
                data: encode_entity_spawn(
                    entity.kind,
                    Vec3::new(entity.position[0], entity.position[1], entity.position[2]),
                    &entity.template_name,
                ),
            })
            .collect();
        packets.push(Packet {
            kind: PacketKind::PlayerJoined,
            entity_id: NetId::new(EntityKind::Player, joined.id),
            tick: current_tick,
            data: encode_player_joined(joined.id, &joined.name),
        });
        packets
    }

    pub fn disconnect_player(&mut self, player_id: u64) -> Vec<NetId> {
        let Some(player) = self.players.remove(&player_id) else {
            return Vec::new();
        };
        for owned in &player.owned_entities {
            self.entities.remove(owned);
        }
        player.owned_entities
    }

    pub fn player(&self, player_id: u64) -> Option<&ConnectedPlayer> {
        self.players.get(&player_id)
    }

    pub fn players(&self) -> impl Iterator<Item = &ConnectedPlayer> {
        self.players.values()
    }

    /// Builds the `PositionUpdate` bundle for one player: entities whose zone is
    /// adjacent to the player's zone and not owned by the player. See spec.md 4.8
    /// "Interest filtering" / 8 scenario S5.
    pub fn interest_bundle(&self, player_id: u64) -> Vec<&ServerEntity> {
        let Some(player) = self.players.get(&player_id) else {
            return Vec::new();
        };
        entities_of_interest(self.entities.values(), player.zone, player_id)
    }

    /// Validates ownership/liveness then resolves a seeded combat roll. See spec.md
    /// 4.8 "Combat resolution" / 8 scenario S6.
    pub fn resolve_attack_intent(
        &mut self,
        attacking_player: u64,
        attacker_entity: NetId,
        target_entity: NetId,
        weapon: WeaponType,
        base_damage: f32,
    ) -> Result<(CombatHit, Option<CombatOutcome>), ServerError> {
        let owns_attacker = self
            .players
            .get(&attacking_player)
            .map(|player| player.owned_entities.contains(&attacker_entity))
            .unwrap_or(false);
        if !owns_attacker {
            return Err(ServerError::AttackerNotOwned(attacker_entity));
        }

        // defense mitigation is equipment-derived in a full implementation; the
        // equipment/armor model is out of scope here, so targets take base damage.
        let defense = 0.0;

        let target = self
            .entities
            .get_mut(&target_entity)
            .filter(|entity| entity.alive)
            .ok_or(ServerError::TargetInvalid(target_entity))?;

        Ok(resolve_attack(
            &mut self.rng,
            attacker_entity,
            target,
            weapon,
            base_damage,
            defense,
            self.config.ko_threshold,
            self.config.death_threshold,
        ))
    }

    /// Advances the time-sync schedule; returns a `TimeSync` message when the
    /// interval has elapsed. See spec.md 4.8 "Time sync".
    pub fn advance_time_sync(&mut self, dt_seconds: f64) -> Option<TimeSync> {
        if !self.time_sync.tick(dt_seconds) {
            return None;
        }
        Some(TimeSync {
            server_tick: 0,
            time_of_day: self.time_of_day,
            weather: self.weather,
            game_speed: self.game_speed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::combat::WeaponType;
    use crate::server::entity::ServerEntity;
    use crate::types::EntityKind;

    fn server() -> ServerState {
        ServerState::new(ServerConfig {
            rng_seed: 42,
            ..ServerConfig::default()
        })
    }

    #[test]
    fn attack_from_unowned_entity_is_rejected() {
        let mut server = server();
        let target_id = NetId::new(EntityKind::NPC, 1);
        server.spawn_entity(ServerEntity::new(target_id, EntityKind::NPC, 0, "dummy".to_string()));
        server.players.insert(1, ConnectedPlayer::new(1, "a".to_string(), 1));

        let err = server
            .resolve_attack_intent(1, NetId::new(EntityKind::Player, 9), target_id, WeaponType::Melee, 10.0)
            .unwrap_err();
        assert!(matches!(err, ServerError::AttackerNotOwned(_)));
    }

    #[test]
    fn player_joined_streams_a_spawn_per_entity_plus_a_joined_packet() {
        let mut server = server();
        server.spawn_entity(ServerEntity::new(
            NetId::new(EntityKind::NPC, 1),
            EntityKind::NPC,
            0,
            "dummy".to_string(),
        ));
        let joined = ConnectedPlayer::new(1, "newcomer".to_string(), 7);

        let packets = server.on_player_joined(&joined, 5);
        assert_eq!(packets.len(), 2);
        assert_eq!(packets[0].kind, PacketKind::EntitySpawn);
        assert_eq!(packets[1].kind, PacketKind::PlayerJoined);
        assert_eq!(
            crate::wire::packet::decode_player_joined(&packets[1].data).unwrap(),
            (1, "newcomer".to_string())
        );
    }

    #[test]
    fn attack_against_dead_target_is_rejected() {
        let mut server = server();
        let attacker_id = NetId::new(EntityKind::Player, 1);
        let target_id = NetId::new(EntityKind::NPC, 2);
        let mut target = ServerEntity::new(target_id, EntityKind::NPC, 0, "dummy".to_string());
        target.alive = false;
        server.spawn_entity(target);
        server.players.insert(
            1,
            ConnectedPlayer {
                owned_entities: vec![attacker_id],
                ..ConnectedPlayer::new(1, "a".to_string(), 1)
            },
        );

        let err = server
            .resolve_attack_intent(1, attacker_id, target_id, WeaponType::Melee, 10.0)
            .unwrap_err();
        assert!(matches!(err, ServerError::TargetInvalid(_)));
    }
}
