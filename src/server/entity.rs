use crate::types::{EntityKind, NetId};

/// Server-authoritative record for one simulated entity. See spec.md 4.8.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerEntity {
    pub id: NetId,
    pub kind: EntityKind,
    pub owner: Option<u64>,
    pub position: [f32; 3],
    pub rotation: [f32; 4],
    pub zone: (i32, i32),
    pub template_id: u32,
    pub faction_id: u32,
    /// Per-body-part health: chest, stomach, head, left/right arm, left/right leg.
    pub health: [f32; 7],
    pub anim_state: u32,
    pub move_speed: f32,
    pub flags: u32,
    pub alive: bool,
    pub equipment: [u32; 14],
    pub template_name: String,
}

impl ServerEntity {
    pub fn new(id: NetId, kind: EntityKind, template_id: u32, template_name: String) -> Self {
        Self {
            id,
            kind,
            owner: None,
            position: [0.0; 3],
            rotation: [0.0, 0.0, 0.0, 1.0],
            zone: (0, 0),
            template_id,
            faction_id: 0,
            health: [100.0; 7],
            anim_state: 0,
            move_speed: 1.0,
            flags: 0,
            alive: true,
            equipment: [0; 14],
            template_name,
        }
    }
}

/// Indexes into `ServerEntity::health`. See spec.md 4.8 "weighted table".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyPart {
    Chest = 0,
    Stomach = 1,
    Head = 2,
    LeftArm = 3,
    RightArm = 4,
    LeftLeg = 5,
    RightLeg = 6,
}

impl BodyPart {
    pub fn index(self) -> usize {
        self as usize
    }
}
