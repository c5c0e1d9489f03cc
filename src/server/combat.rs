use crate::server::entity::{BodyPart, ServerEntity};
use crate::types::NetId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeaponType {
    Melee,
    Ranged,
}

/// Result of one resolved attack. See spec.md 4.8 "Combat resolution".
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CombatHit {
    pub attacker: NetId,
    pub target: NetId,
    pub part: BodyPart,
    pub cut_damage: f32,
    pub blunt_damage: f32,
    pub blocked: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombatOutcome {
    Hit,
    Ko(BodyPart),
    Death(BodyPart),
}

/// Fixed weighted body-part table: chest 30, stomach 20, head 10, each arm/leg 10.
/// See spec.md 4.8.
const BODY_PART_TABLE: [(BodyPart, u32); 7] = [
    (BodyPart::Chest, 30),
    (BodyPart::Stomach, 20),
    (BodyPart::Head, 10),
    (BodyPart::LeftArm, 10),
    (BodyPart::RightArm, 10),
    (BodyPart::LeftLeg, 10),
    (BodyPart::RightLeg, 10),
];

fn pick_body_part(rng: &mut fastrand::Rng) -> BodyPart {
    let total: u32 = BODY_PART_TABLE.iter().map(|(_, weight)| weight).sum();
    let mut roll = rng.u32(0..total);
    for (part, weight) in BODY_PART_TABLE {
        if roll < weight {
            return part;
        }
        roll -= weight;
    }
    BODY_PART_TABLE[0].0
}

/// Base damage before weapon split, per spec.md 4.8:
/// `base · rand(0.8..1.2) · (1 − min(defense/100, 0.9))`.
fn base_damage(rng: &mut fastrand::Rng, base: f32, defense: f32) -> f32 {
    let variance = 0.8 + rng.f32() * 0.4;
    let mitigation = 1.0 - (defense / 100.0).min(0.9);
    base * variance * mitigation
}

/// Resolves one `AttackIntent` deterministically against a seeded `fastrand::Rng`. The
/// caller is responsible for validating ownership/liveness before calling this (spec.md
/// 4.8 "Validate"). See spec.md 8 scenario S6.
pub fn resolve_attack(
    rng: &mut fastrand::Rng,
    attacker: NetId,
    target: &mut ServerEntity,
    weapon: WeaponType,
    base_damage_value: f32,
    defense: f32,
    ko_threshold: f32,
    death_threshold: f32,
) -> (CombatHit, Option<CombatOutcome>) {
    let part = pick_body_part(rng);
    let damage = base_damage(rng, base_damage_value, defense);

    let (mut cut, mut blunt) = match weapon {
        WeaponType::Melee => (damage * 0.5, damage * 0.5),
        WeaponType::Ranged => (damage, 0.0),
    };

    // 20% block chance applies a 0.7 reduction to both components.
    let blocked = rng.f32() < 0.2;
    if blocked {
        cut *= 0.7;
        blunt *= 0.7;
    }

    let total = cut + blunt;
    target.health[part.index()] -= total;

    let hit = CombatHit {
        attacker,
        target: target.id,
        part,
        cut_damage: cut,
        blunt_damage: blunt,
        blocked,
    };

    let mut outcome = None;
    if target.health[part.index()] <= ko_threshold {
        outcome = Some(CombatOutcome::Ko(part));
    }
    let is_vital = matches!(part, BodyPart::Chest | BodyPart::Head);
    if is_vital && target.health[part.index()] <= death_threshold {
        target.alive = false;
        outcome = Some(CombatOutcome::Death(part));
    }

    (hit, outcome)
}
