use crate::commit::{Commit, Operation};
use crate::payload::{Payload, Quat, TransformPayload, Vec3};
use crate::types::{AuthorityEpoch, CommitId, EntityKind, NetId, Priority, SchemaId, Tick};
use crate::wire::codec::{ByteReader, ByteWriter};
use crate::wire::quat_compress::{compress_quat, decompress_quat};
use crate::error::TransportError;

/// Wire message codes. See spec.md 4.7. The spec notes two source copies disagreed on
/// spawn/despawn codes; we fix one assignment here and document it, since it only
/// matters that peers agree (spec.md 9 "Open questions").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PacketKind {
    PositionUpdate = 1,
    EntitySpawn = 2,
    EntityDespawn = 3,
    HealthUpdate = 4,
    FactionUpdate = 5,
    AnimUpdate = 6,
    AuthorityCommit = 7,
    WorldSync = 8,
    Ack = 9,
    Handshake = 10,
    HandshakeAck = 11,
    HandshakeReject = 12,
    PlayerJoined = 13,
    AttackIntent = 14,
    CombatHit = 15,
    CombatKO = 16,
    CombatDeath = 17,
    TimeSync = 18,
}

impl PacketKind {
    pub fn from_u8(tag: u8) -> Option<Self> {
        use PacketKind::*;
        Some(match tag {
            1 => PositionUpdate,
            2 => EntitySpawn,
            3 => EntityDespawn,
            4 => HealthUpdate,
            5 => FactionUpdate,
            6 => AnimUpdate,
            7 => AuthorityCommit,
            8 => WorldSync,
            9 => Ack,
            10 => Handshake,
            11 => HandshakeAck,
            12 => HandshakeReject,
            13 => PlayerJoined,
            14 => AttackIntent,
            15 => CombatHit,
            16 => CombatKO,
            17 => CombatDeath,
            18 => TimeSync,
            _ => return None,
        })
    }

    /// `WorldSync=Critical`, `Spawn/Despawn/AuthorityCommit=High`, default `Normal`.
    /// See spec.md 4.7 "Priorities".
    pub fn priority(&self) -> Priority {
        match self {
            PacketKind::WorldSync => Priority::Critical,
            PacketKind::EntitySpawn
            | PacketKind::EntityDespawn
            | PacketKind::AuthorityCommit => Priority::High,
            _ => Priority::Normal,
        }
    }
}

/// A fully framed outbound/inbound packet: kind, addressed entity, source tick, and a
/// pre-serialized body. See spec.md 4.7 frame layout.
#[derive(Debug, Clone)]
pub struct Packet {
    pub kind: PacketKind,
    pub entity_id: NetId,
    pub tick: Tick,
    pub data: Vec<u8>,
}

impl Packet {
    pub fn priority(&self) -> Priority {
        self.kind.priority()
    }

    pub fn encode(&self, writer: &mut ByteWriter) {
        writer.write_u8(self.kind as u8);
        writer.write_u64(self.entity_id.packed());
        writer.write_i64(self.tick as i64);
        writer.write_u32(self.data.len() as u32);
        writer.write_bytes(&self.data);
    }

    pub fn decode(reader: &mut ByteReader) -> Result<Self, TransportError> {
        let tag = reader.read_u8()?;
        let kind = PacketKind::from_u8(tag)
            .ok_or_else(|| TransportError::MalformedFrame(format!("unknown packet kind {tag}")))?;
        let entity_id = NetId::from_packed(reader.read_u64()?);
        let tick = reader.read_i64()? as Tick;
        let len = reader.read_u32()? as usize;
        let data = reader.read_bytes(len)?.to_vec();
        Ok(Packet {
            kind,
            entity_id,
            tick,
            data,
        })
    }
}

/// Builds a `PositionUpdate` packet body: position f32x3, rotation as a compressed
/// quaternion (spec.md 3 "TransformPayload ... the wire format transmits a compressed
/// ... quaternion"). See `wire::quat_compress` for the packing used.
pub fn encode_position_update(position: Vec3, rotation: Quat) -> Vec<u8> {
    let mut writer = ByteWriter::new();
    writer.write_f32(position.x);
    writer.write_f32(position.y);
    writer.write_f32(position.z);
    writer.write_u64(compress_quat(&rotation));
    writer.into_bytes()
}

pub fn decode_position_update(bytes: &[u8]) -> Result<(Vec3, Quat), TransportError> {
    let mut reader = ByteReader::new(bytes);
    let position = Vec3::new(
        reader.read_f32()?,
        reader.read_f32()?,
        reader.read_f32()?,
    );
    let packed = reader.read_u64()?;
    Ok((position, decompress_quat(packed)))
}

pub fn encode_entity_spawn(kind: EntityKind, position: Vec3, name: &str) -> Vec<u8> {
    let mut writer = ByteWriter::new();
    writer.write_u32(kind as u32);
    writer.write_f32(position.x);
    writer.write_f32(position.y);
    writer.write_f32(position.z);
    let name_bytes = name.as_bytes();
    writer.write_u32(name_bytes.len() as u32);
    writer.write_bytes(name_bytes);
    writer.into_bytes()
}

pub fn decode_entity_spawn(bytes: &[u8]) -> Result<(EntityKind, Vec3, String), TransportError> {
    let mut reader = ByteReader::new(bytes);
    let kind_tag = reader.read_u32()?;
    let kind = EntityKind::from_u8_checked(kind_tag as u8)
        .ok_or_else(|| TransportError::MalformedFrame(format!("unknown entity kind {kind_tag}")))?;
    let position = Vec3::new(
        reader.read_f32()?,
        reader.read_f32()?,
        reader.read_f32()?,
    );
    let name_len = reader.read_u32()? as usize;
    let name_bytes = reader.read_bytes(name_len)?;
    let name = String::from_utf8_lossy(name_bytes).into_owned();
    Ok((kind, position, name))
}

/// Builds a `PlayerJoined` packet body: the new player's id and display name. See
/// spec.md 4.8 "Existing peers are told of the new player via PlayerJoined".
pub fn encode_player_joined(player_id: u64, player_name: &str) -> Vec<u8> {
    let mut writer = ByteWriter::new();
    writer.write_u64(player_id);
    let name_bytes = player_name.as_bytes();
    writer.write_u32(name_bytes.len() as u32);
    writer.write_bytes(name_bytes);
    writer.into_bytes()
}

pub fn decode_player_joined(bytes: &[u8]) -> Result<(u64, String), TransportError> {
    let mut reader = ByteReader::new(bytes);
    let player_id = reader.read_u64()?;
    let name_len = reader.read_u32()? as usize;
    let name_bytes = reader.read_bytes(name_len)?;
    let name = String::from_utf8_lossy(name_bytes).into_owned();
    Ok((player_id, name))
}

pub fn encode_health_update(current: f32, max: f32) -> Vec<u8> {
    let mut writer = ByteWriter::new();
    writer.write_f32(current);
    writer.write_f32(max);
    writer.into_bytes()
}

pub fn decode_health_update(bytes: &[u8]) -> Result<(f32, f32), TransportError> {
    let mut reader = ByteReader::new(bytes);
    Ok((reader.read_f32()?, reader.read_f32()?))
}

/// Binary serialization of the commit header: commitId, subjectId, opcode, tick,
/// authorityEpoch. See spec.md 4.7 "AuthorityCommit".
pub fn encode_authority_commit(commit: &Commit) -> Vec<u8> {
    let mut writer = ByteWriter::new();
    writer.write_u64(commit.commit_id);
    writer.write_u64(commit.subject_id.packed());
    writer.write_u8(operation_tag(commit.operation));
    writer.write_i64(commit.tick as i64);
    writer.write_u64(commit.authority_epoch);
    writer.write_u8(commit.schema().to_wire());
    writer.into_bytes()
}

pub fn decode_authority_commit(
    bytes: &[u8],
) -> Result<(CommitId, NetId, Operation, Tick, AuthorityEpoch, SchemaId), TransportError> {
    let mut reader = ByteReader::new(bytes);
    let commit_id = reader.read_u64()?;
    let subject_id = NetId::from_packed(reader.read_u64()?);
    let operation = operation_from_tag(reader.read_u8()?)?;
    let tick = reader.read_i64()? as Tick;
    let epoch = reader.read_u64()?;
    let schema_tag = reader.read_u8()?;
    let schema = SchemaId::from_wire(schema_tag)
        .ok_or_else(|| TransportError::MalformedFrame(format!("unknown schema tag {schema_tag}")))?;
    Ok((commit_id, subject_id, operation, tick, epoch, schema))
}

fn operation_tag(op: Operation) -> u8 {
    match op {
        Operation::Set => 0,
        Operation::Delta => 1,
        Operation::Clear => 2,
    }
}

fn operation_from_tag(tag: u8) -> Result<Operation, TransportError> {
    match tag {
        0 => Ok(Operation::Set),
        1 => Ok(Operation::Delta),
        2 => Ok(Operation::Clear),
        _ => Err(TransportError::MalformedFrame(format!(
            "unknown operation tag {tag}"
        ))),
    }
}

/// Builds a `Packet` carrying a commit's wire representation, addressed to the
/// commit's subject. Schema-specific packets (PositionUpdate/HealthUpdate) are used
/// for the payload types that have a dedicated wire form; everything else falls back
/// to the generic `AuthorityCommit` header plus schema-tagged payload bytes.
pub fn packet_for_commit(commit: &Commit) -> Packet {
    let (kind, data) = match &commit.payload {
        Payload::Transform(TransformPayload { position, rotation }) => (
            PacketKind::PositionUpdate,
            encode_position_update(*position, *rotation),
        ),
        Payload::Health(h) => (
            PacketKind::HealthUpdate,
            encode_health_update(h.current, h.max),
        ),
        _ => (PacketKind::AuthorityCommit, encode_authority_commit(commit)),
    };
    Packet {
        kind,
        entity_id: commit.subject_id,
        tick: commit.tick,
        data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_update_round_trips() {
        let position = Vec3::new(1.5, -2.0, 3.25);
        let rotation = Quat([0.0, 0.0, 0.70710677, 0.70710677]);
        let bytes = encode_position_update(position, rotation);
        let (decoded_position, decoded_rotation) = decode_position_update(&bytes).unwrap();
        assert_eq!(decoded_position, position);
        let dot = decoded_rotation.dot(&rotation).abs();
        assert!(dot > 0.999);
    }

    #[test]
    fn packet_round_trips_through_codec() {
        let packet = Packet {
            kind: PacketKind::HealthUpdate,
            entity_id: NetId::new(EntityKind::Player, 4),
            tick: 12,
            data: encode_health_update(50.0, 100.0),
        };
        let mut writer = ByteWriter::new();
        packet.encode(&mut writer);
        let bytes = writer.into_bytes();
        let mut reader = ByteReader::new(&bytes);
        let decoded = Packet::decode(&mut reader).unwrap();
        assert_eq!(decoded.kind, PacketKind::HealthUpdate);
        assert_eq!(decoded.entity_id, packet.entity_id);
        assert_eq!(decoded.tick, packet.tick);
        assert_eq!(decoded.data, packet.data);
    }

    #[test]
    fn truncated_packet_is_malformed_not_a_panic() {
        let bytes = [1u8, 2, 3];
        let mut reader = ByteReader::new(&bytes);
        assert!(Packet::decode(&mut reader).is_err());
    }
}
