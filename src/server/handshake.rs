use crate::error::TransportError;

/// Inbound request to join. See spec.md 4.8 "Handshake".
#[derive(Debug, Clone, PartialEq)]
pub struct Handshake {
    pub protocol_version: u32,
    pub player_name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HandshakeAck {
    pub assigned_player_id: u64,
    pub server_tick: u64,
    pub time_of_day: f32,
    pub weather: u8,
    pub max_players: u32,
    pub current_players: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HandshakeReject {
    pub code: u32,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum HandshakeResult {
    Ack(HandshakeAck),
    Reject(HandshakeReject),
}

/// Validates protocol version and capacity, then builds the appropriate response. See
/// spec.md 4.8 "the server replies to the first Handshake with either HandshakeAck ...
/// or HandshakeReject ... when protocol versions mismatch".
#[allow(clippy::too_many_arguments)]
pub fn negotiate_handshake(
    handshake: &Handshake,
    expected_protocol_version: u32,
    assigned_player_id: u64,
    server_tick: u64,
    time_of_day: f32,
    weather: u8,
    max_players: u32,
    current_players: u32,
) -> HandshakeResult {
    if handshake.protocol_version != expected_protocol_version {
        let reason = TransportError::ProtocolVersionMismatch {
            peer_version: handshake.protocol_version,
            expected_version: expected_protocol_version,
        };
        return HandshakeResult::Reject(HandshakeReject {
            code: 2,
            text: reason.to_string(),
        });
    }
    if current_players >= max_players {
        return HandshakeResult::Reject(HandshakeReject {
            code: 1,
            text: "server is full".to_string(),
        });
    }
    HandshakeResult::Ack(HandshakeAck {
        assigned_player_id,
        server_tick,
        time_of_day,
        weather,
        max_players,
        current_players,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mismatched_protocol_version_is_rejected() {
        let handshake = Handshake {
            protocol_version: 2,
            player_name: "alice".to_string(),
        };
        let result = negotiate_handshake(&handshake, 1, 1, 0, 0.0, 0, 64, 0);
        assert!(matches!(result, HandshakeResult::Reject(_)));
    }

    #[test]
    fn matching_protocol_version_under_capacity_is_acked() {
        let handshake = Handshake {
            protocol_version: 1,
            player_name: "alice".to_string(),
        };
        let result = negotiate_handshake(&handshake, 1, 7, 100, 0.5, 1, 64, 3);
        match result {
            HandshakeResult::Ack(ack) => assert_eq!(ack.assigned_player_id, 7),
            _ => panic!("expected ack"),
        }
    }

    #[test]
    fn full_server_is_rejected() {
        let handshake = Handshake {
            protocol_version: 1,
            player_name: "alice".to_string(),
        };
        let result = negotiate_handshake(&handshake, 1, 1, 0, 0.0, 0, 2, 2);
        assert!(matches!(result, HandshakeResult::Reject(_)));
    }
}
