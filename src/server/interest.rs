use crate::server::entity::ServerEntity;

/// Zone = fixed grid over world position. See spec.md 4.8 "Zone = fixed grid over
/// world position" and GLOSSARY "Zone".
pub fn zone_for_position(position: [f32; 3], zone_size: f32) -> (i32, i32) {
    (
        (position[0] / zone_size).floor() as i32,
        (position[2] / zone_size).floor() as i32,
    )
}

fn is_adjacent(a: (i32, i32), b: (i32, i32)) -> bool {
    (a.0 - b.0).abs() <= 1 && (a.1 - b.1).abs() <= 1
}

/// For a connected player, selects entities whose zone is adjacent to the player's
/// zone and whose owner is not the player themselves. See spec.md 4.8 "Interest
/// filtering" and 8 scenario S5.
pub fn entities_of_interest<'a>(
    entities: impl Iterator<Item = &'a ServerEntity>,
    player_zone: (i32, i32),
    player_id: u64,
) -> Vec<&'a ServerEntity> {
    entities
        .filter(|entity| is_adjacent(entity.zone, player_zone))
        .filter(|entity| entity.owner != Some(player_id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EntityKind, NetId};

    fn entity_at(zone: (i32, i32), owner: Option<u64>) -> ServerEntity {
        let mut entity = ServerEntity::new(
            NetId::new(EntityKind::NPC, 1),
            EntityKind::NPC,
            0,
            "npc".to_string(),
        );
        entity.zone = zone;
        entity.owner = owner;
        entity
    }

    #[test]
    fn excludes_non_adjacent_then_includes_after_move() {
        // S5: P1 at zone (0,1), P2 at zone (4,4) — not adjacent, excluded.
        let mut entity = entity_at((0, 1), Some(1));
        let p2_zone = (4, 4);
        let interest = entities_of_interest(std::iter::once(&entity), p2_zone, 2);
        assert!(interest.is_empty());

        // entity moves to zone (3,4), now adjacent to P2's (4,4).
        entity.zone = (3, 4);
        let interest = entities_of_interest(std::iter::once(&entity), p2_zone, 2);
        assert_eq!(interest.len(), 1);
    }

    #[test]
    fn excludes_entities_owned_by_the_requesting_player() {
        let entity = entity_at((4, 4), Some(2));
        let interest = entities_of_interest(std::iter::once(&entity), (4, 4), 2);
        assert!(interest.is_empty());
    }
}
