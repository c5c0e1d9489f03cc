use crate::types::SchemaId;

/// Unit quaternion, stored as `[x, y, z, w]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quat(pub [f32; 4]);

impl Quat {
    pub const IDENTITY: Quat = Quat([0.0, 0.0, 0.0, 1.0]);

    pub fn dot(&self, other: &Quat) -> f32 {
        self.0[0] * other.0[0]
            + self.0[1] * other.0[1]
            + self.0[2] * other.0[2]
            + self.0[3] * other.0[3]
    }

    /// Hamilton product `self * other`.
    pub fn mul(&self, other: &Quat) -> Quat {
        let [x1, y1, z1, w1] = self.0;
        let [x2, y2, z2, w2] = other.0;
        Quat([
            w1 * x2 + x1 * w2 + y1 * z2 - z1 * y2,
            w1 * y2 - x1 * z2 + y1 * w2 + z1 * x2,
            w1 * z2 + x1 * y2 - y1 * x2 + z1 * w2,
            w1 * w2 - x1 * x2 - y1 * y2 - z1 * z2,
        ])
    }

    /// Conjugate (inverse for a unit quaternion).
    pub fn conjugate(&self) -> Quat {
        Quat([-self.0[0], -self.0[1], -self.0[2], self.0[3]])
    }

    pub fn normalize(&self) -> Quat {
        let len = (self.dot(self)).sqrt();
        if len <= f32::EPSILON {
            return Quat::IDENTITY;
        }
        Quat([
            self.0[0] / len,
            self.0[1] / len,
            self.0[2] / len,
            self.0[3] / len,
        ])
    }

    /// Spherical linear interpolation. `t` in `[0, 1]`.
    pub fn slerp(&self, other: &Quat, t: f32) -> Quat {
        let mut b = *other;
        let mut cos_theta = self.dot(&b);
        if cos_theta < 0.0 {
            b = Quat([-b.0[0], -b.0[1], -b.0[2], -b.0[3]]);
            cos_theta = -cos_theta;
        }

        if cos_theta > 0.9995 {
            let lerp = Quat([
                self.0[0] + (b.0[0] - self.0[0]) * t,
                self.0[1] + (b.0[1] - self.0[1]) * t,
                self.0[2] + (b.0[2] - self.0[2]) * t,
                self.0[3] + (b.0[3] - self.0[3]) * t,
            ]);
            return lerp.normalize();
        }

        let theta_0 = cos_theta.acos();
        let theta = theta_0 * t;
        let sin_theta = theta.sin();
        let sin_theta_0 = theta_0.sin();

        let s0 = (theta_0 - theta).sin() / sin_theta_0;
        let s1 = sin_theta / sin_theta_0;

        Quat([
            self.0[0] * s0 + b.0[0] * s1,
            self.0[1] * s0 + b.0[1] * s1,
            self.0[2] * s0 + b.0[2] * s1,
            self.0[3] * s0 + b.0[3] * s1,
        ])
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 { x: 0.0, y: 0.0, z: 0.0 };

    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn add(&self, other: &Vec3) -> Vec3 {
        Vec3::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }

    pub fn sub(&self, other: &Vec3) -> Vec3 {
        Vec3::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }

    pub fn scale(&self, s: f32) -> Vec3 {
        Vec3::new(self.x * s, self.y * s, self.z * s)
    }

    pub fn length(&self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformPayload {
    pub position: Vec3,
    pub rotation: Quat,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HealthPayload {
    pub current: f32,
    pub max: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FactionIdPayload {
    pub faction: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimStatePayload {
    pub state: u32,
}

/// The schema-tagged union crossing the InfoRing and AuthorityRing. `schema()` must
/// always agree with the variant for `schema.validator(payload) = ok` (spec.md 3
/// "Info") to be well-formed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Payload {
    Transform(TransformPayload),
    Health(HealthPayload),
    FactionId(FactionIdPayload),
    AnimState(AnimStatePayload),
}

impl Payload {
    pub fn schema(&self) -> SchemaId {
        match self {
            Payload::Transform(_) => SchemaId::Transform,
            Payload::Health(_) => SchemaId::Health,
            Payload::FactionId(_) => SchemaId::FactionId,
            Payload::AnimState(_) => SchemaId::AnimState,
        }
    }

    /// `schema.validator(payload) = ok` per spec.md 3 "Info" invariants.
    pub fn validate(&self) -> bool {
        match self {
            Payload::Transform(t) => {
                t.position.x.is_finite()
                    && t.position.y.is_finite()
                    && t.position.z.is_finite()
                    && t.rotation.0.iter().all(|c| c.is_finite())
            }
            Payload::Health(h) => h.current.is_finite() && h.max.is_finite() && h.max >= 0.0,
            Payload::FactionId(_) => true,
            Payload::AnimState(_) => true,
        }
    }

    pub fn as_transform(&self) -> Option<&TransformPayload> {
        match self {
            Payload::Transform(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_health(&self) -> Option<&HealthPayload> {
        match self {
            Payload::Health(h) => Some(h),
            _ => None,
        }
    }
}
