use crate::error::TransportError;
use crate::wire::codec::{ByteReader, ByteWriter};
use crate::wire::packet::Packet;

/// A tick-stamped envelope of packets. See spec.md 4.7 frame layout.
#[derive(Debug, Clone)]
pub struct Frame {
    pub tick: i64,
    pub timestamp_ms: i64,
    pub packets: Vec<Packet>,
}

/// `tick:i64, timestampMs:i64, packetCount:u32, then each packet`. See spec.md 4.7.
pub fn encode_frame(frame: &Frame) -> Vec<u8> {
    let mut writer = ByteWriter::new();
    writer.write_i64(frame.tick);
    writer.write_i64(frame.timestamp_ms);
    writer.write_u32(frame.packets.len() as u32);
    for packet in &frame.packets {
        packet.encode(&mut writer);
    }
    writer.into_bytes()
}

/// Defensive, bounds-checked parse; never panics on truncated or malformed input. See
/// spec.md 4.7 "Inbound".
pub fn decode_frame(bytes: &[u8]) -> Result<Frame, TransportError> {
    let mut reader = ByteReader::new(bytes);
    let tick = reader.read_i64()?;
    let timestamp_ms = reader.read_i64()?;
    let packet_count = reader.read_u32()?;

    // every packet needs at least one byte on the wire, so a declared count above the
    // remaining buffer is already malformed; reject it before reserving capacity for an
    // attacker/peer-controlled packet_count (spec.md 4.7 "parsed defensively").
    if packet_count as usize > reader.remaining() {
        return Err(TransportError::MalformedFrame(format!(
            "declared packet_count {packet_count} exceeds {} remaining bytes",
            reader.remaining()
        )));
    }

    let mut packets = Vec::with_capacity(packet_count as usize);
    for _ in 0..packet_count {
        packets.push(Packet::decode(&mut reader)?);
    }

    Ok(Frame {
        tick,
        timestamp_ms,
        packets,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EntityKind, NetId};
    use crate::wire::packet::{encode_health_update, PacketKind};

    #[test]
    fn frame_round_trips_with_multiple_packets() {
        let frame = Frame {
            tick: 10,
            timestamp_ms: 123_456,
            packets: vec![
                Packet {
                    kind: PacketKind::HealthUpdate,
                    entity_id: NetId::new(EntityKind::Player, 1),
                    tick: 10,
                    data: encode_health_update(75.0, 100.0),
                },
                Packet {
                    kind: PacketKind::Ack,
                    entity_id: NetId::new(EntityKind::Player, 1),
                    tick: 10,
                    data: Vec::new(),
                },
            ],
        };

        let bytes = encode_frame(&frame);
        let decoded = decode_frame(&bytes).unwrap();
        assert_eq!(decoded.tick, 10);
        assert_eq!(decoded.timestamp_ms, 123_456);
        assert_eq!(decoded.packets.len(), 2);
        assert_eq!(decoded.packets[0].kind, PacketKind::HealthUpdate);
        assert_eq!(decoded.packets[1].kind, PacketKind::Ack);
    }

    #[test]
    fn truncated_frame_header_is_malformed() {
        let bytes = [0u8; 4];
        assert!(decode_frame(&bytes).is_err());
    }

    #[test]
    fn declared_packet_count_beyond_buffer_is_malformed_not_a_panic() {
        let mut writer = ByteWriter::new();
        writer.write_i64(0);
        writer.write_i64(0);
        writer.write_u32(5); // claims 5 packets, none present
        assert!(decode_frame(&writer.into_bytes()).is_err());
    }

    #[test]
    fn huge_declared_packet_count_is_rejected_before_allocating() {
        let mut writer = ByteWriter::new();
        writer.write_i64(0);
        writer.write_i64(0);
        writer.write_u32(u32::MAX); // would be a multi-gigabyte Vec::with_capacity
        assert!(decode_frame(&writer.into_bytes()).is_err());
    }
}
