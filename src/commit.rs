use crate::payload::Payload;
use crate::types::{AuthorityEpoch, CommitId, NetId, Tick};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Set,
    Delta,
    Clear,
}

/// Produced by AuthorityRing for a `(subject, schema)` in a given tick. See spec.md 3
/// "Commit". Handed by value to the bus, the broadcaster, and the AttributeRing buffer
/// (spec.md 3 "Lifecycle & ownership").
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Commit {
    pub commit_id: CommitId,
    pub subject_id: NetId,
    pub tick: Tick,
    pub operation: Operation,
    pub payload: Payload,
    pub authority_epoch: AuthorityEpoch,
}

impl Commit {
    pub fn schema(&self) -> crate::types::SchemaId {
        self.payload.schema()
    }
}
