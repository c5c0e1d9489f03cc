use crate::payload::Payload;
use crate::types::{AuthoritySource, FrameType, NetId, Tick};

/// The unit crossing the InfoRing. See spec.md 3 "Info (fact)".
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Info {
    pub tick: Tick,
    pub subject: NetId,
    pub authority: AuthoritySource,
    /// Who produced it.
    pub source: NetId,
    pub frame: FrameType,
    pub payload: Payload,
    pub confidence: f32,
    pub observed_at_tick: Tick,
}

impl Info {
    pub fn schema(&self) -> crate::types::SchemaId {
        self.payload.schema()
    }

    pub fn clamp_confidence(&mut self) {
        self.confidence = self.confidence.clamp(0.0, 1.0);
    }
}
