use crate::transport::PeerId;
use crate::types::{NetId, Tick};

/// Server-side record of a connected client. See spec.md 4.8.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectedPlayer {
    pub id: u64,
    pub name: String,
    pub peer: PeerId,
    pub zone: (i32, i32),
    pub ping: u32,
    pub last_update_tick: Tick,
    pub owned_entities: Vec<NetId>,
}

impl ConnectedPlayer {
    pub fn new(id: u64, name: String, peer: PeerId) -> Self {
        Self {
            id,
            name,
            peer,
            zone: (0, 0),
            ping: 0,
            last_update_tick: 0,
            owned_entities: Vec::new(),
        }
    }
}
