pub type Tick = u64;
pub type CommitId = u64;
pub type AuthorityEpoch = u64;

/// Packed identifier carrying (EntityKind, local handle). Globally stable within a
/// session; hashing-stable across peers. Equality and ordering are on the packed value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NetId(u64);

impl NetId {
    const KIND_BITS: u32 = 8;
    const HANDLE_MASK: u64 = (1 << (64 - Self::KIND_BITS)) - 1;

    pub fn new(kind: EntityKind, handle: u64) -> Self {
        let kind_bits = (kind as u64) << (64 - Self::KIND_BITS);
        Self(kind_bits | (handle & Self::HANDLE_MASK))
    }

    pub fn kind(&self) -> EntityKind {
        EntityKind::from_u8((self.0 >> (64 - Self::KIND_BITS)) as u8)
    }

    pub fn handle(&self) -> u64 {
        self.0 & Self::HANDLE_MASK
    }

    pub fn packed(&self) -> u64 {
        self.0
    }

    pub fn from_packed(value: u64) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum EntityKind {
    Player = 0,
    NPC = 1,
    Building = 2,
    Item = 3,
    Projectile = 4,
    Zone = 5,
    World = 6,
}

impl EntityKind {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => EntityKind::Player,
            1 => EntityKind::NPC,
            2 => EntityKind::Building,
            3 => EntityKind::Item,
            4 => EntityKind::Projectile,
            5 => EntityKind::Zone,
            _ => EntityKind::World,
        }
    }

    /// Checked decode for wire-facing contexts (e.g. `EntitySpawn`), where an
    /// out-of-range tag should be dropped with a diagnostic rather than silently
    /// coerced to `World`.
    pub fn from_u8_checked(value: u8) -> Option<Self> {
        match value {
            0 => Some(EntityKind::Player),
            1 => Some(EntityKind::NPC),
            2 => Some(EntityKind::Building),
            3 => Some(EntityKind::Item),
            4 => Some(EntityKind::Projectile),
            5 => Some(EntityKind::Zone),
            6 => Some(EntityKind::World),
            _ => None,
        }
    }
}

/// World-units-per-cell used to place a `Zone(x, y)` origin in world space. See
/// `server::interest::zone_for_position`, which buckets a world position into a zone
/// with the same constant.
pub const ZONE_SIZE: f32 = 32.0;

/// Coordinate frame in which a positional fact is expressed. Required on every
/// positional fact; InfoRing rejects facts whose frame is not convertible to the
/// subject's registered frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FrameType {
    World,
    Zone(i32, i32),
    AttachedTo(NetId),
    Screen,
}

impl FrameType {
    /// Whether `self` can be converted into `target` without more context than the
    /// container ring can supply. See `FrameType::convert` for the transform InfoRing
    /// applies when this returns `true` for a pair of differing frames.
    pub fn is_convertible_to(&self, target: &FrameType) -> bool {
        use FrameType::*;
        match (self, target) {
            (World, World) => true,
            (Zone(..), Zone(..)) => true,
            (World, Zone(..)) | (Zone(..), World) => true,
            (AttachedTo(a), AttachedTo(b)) => a == b,
            (Screen, Screen) => true,
            _ => false,
        }
    }

    /// Converts `position`, expressed in `self`, into the equivalent position expressed
    /// in `target`. `Zone(x, y)` places its origin at `(x, y) * ZONE_SIZE` in world space
    /// (x/z plane, per `zone_for_position`); `World` <-> `Zone` and `Zone` <-> `Zone`
    /// conversions offset by that origin. `AttachedTo`/`Screen` carry no world placement
    /// of their own, so they only convert to themselves (`is_convertible_to` already
    /// requires the handles/variant to match) and pass the position through unchanged.
    /// Returns `None` when `self` is not convertible to `target`.
    pub fn convert(&self, target: &FrameType, position: crate::payload::Vec3) -> Option<crate::payload::Vec3> {
        use FrameType::*;
        if !self.is_convertible_to(target) {
            return None;
        }
        let zone_origin = |zx: i32, zy: i32| {
            crate::payload::Vec3::new(zx as f32 * ZONE_SIZE, 0.0, zy as f32 * ZONE_SIZE)
        };
        match (self, target) {
            (World, World) | (AttachedTo(_), AttachedTo(_)) | (Screen, Screen) => Some(position),
            (Zone(zx, zy), Zone(tx, ty)) => {
                Some(position.add(&zone_origin(*zx, *zy)).sub(&zone_origin(*tx, *ty)))
            }
            (World, Zone(tx, ty)) => Some(position.sub(&zone_origin(*tx, *ty))),
            (Zone(zx, zy), World) => Some(position.add(&zone_origin(*zx, *zy))),
            _ => None,
        }
    }
}

/// A typed slot name. Each schema has a validator, a merge policy, a wire serializer,
/// and a staleness budget (in ticks). Enumerated at build time; unknown schemas are
/// dropped with a diagnostic (see `SchemaId::from_wire`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaId {
    Transform,
    Health,
    FactionId,
    AnimState,
}

impl SchemaId {
    /// Staleness budget in ticks, per spec.md 3 "SchemaId".
    pub fn staleness_budget_ticks(&self) -> u64 {
        match self {
            SchemaId::Transform => 4,
            SchemaId::Health => 8,
            SchemaId::FactionId => 600,
            SchemaId::AnimState => 2,
        }
    }

    pub fn merge_policy(&self) -> MergePolicy {
        match self {
            SchemaId::Transform => MergePolicy::Set,
            SchemaId::Health => MergePolicy::Delta,
            SchemaId::FactionId => MergePolicy::Set,
            SchemaId::AnimState => MergePolicy::Set,
        }
    }

    pub fn from_wire(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(SchemaId::Transform),
            1 => Some(SchemaId::Health),
            2 => Some(SchemaId::FactionId),
            3 => Some(SchemaId::AnimState),
            _ => None,
        }
    }

    pub fn to_wire(&self) -> u8 {
        match self {
            SchemaId::Transform => 0,
            SchemaId::Health => 1,
            SchemaId::FactionId => 2,
            SchemaId::AnimState => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergePolicy {
    Set,
    Delta,
    Clear,
}

/// Ranked source of a fact. Fixed priority order, highest wins on ties:
/// `ServerCommit > LocalOwned > PeerReport > DerivedCalculation > CachedLastKnown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AuthoritySource {
    CachedLastKnown = 0,
    DerivedCalculation = 1,
    PeerReport = 2,
    LocalOwned = 3,
    ServerCommit = 4,
}

impl AuthoritySource {
    /// Deterministic confidence modifier, spec.md 4.3 "Confidence / Authority bonus".
    pub fn confidence_bonus(&self) -> f32 {
        match self {
            AuthoritySource::ServerCommit => 0.25,
            AuthoritySource::LocalOwned => 0.15,
            AuthoritySource::PeerReport => 0.0,
            AuthoritySource::DerivedCalculation => -0.1,
            AuthoritySource::CachedLastKnown => -0.2,
        }
    }
}

/// Shared priority scale used by both the DataBus write queue and the outbound wire
/// queue. See spec.md 4.7 "Priorities" and 8 invariant #11 (open question: the spec
/// names priorities for the wire queue and also requires priority-ordered drop for
/// "the Bus"; we resolve that by giving write intents the same four-level scale,
/// documented in DESIGN.md).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Priority {
    Low = 0,
    Normal = 1,
    High = 2,
    Critical = 3,
}

impl SchemaId {
    pub fn priority(&self) -> Priority {
        match self {
            SchemaId::Health => Priority::High,
            SchemaId::Transform => Priority::Normal,
            SchemaId::AnimState => Priority::Normal,
            SchemaId::FactionId => Priority::Low,
        }
    }
}
