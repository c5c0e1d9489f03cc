use thiserror::Error;

use crate::types::{NetId, SchemaId};

/// Pipeline rejections: counted, logged at debug, dropped. Never fatal to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ContainerError {
    #[error("entity {0:?} is already registered")]
    AlreadyRegistered(NetId),
}

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum InfoError {
    #[error("subject {0:?} is not registered")]
    UnknownEntity(NetId),
    #[error("schema tag {0} is not a known SchemaId")]
    UnknownSchema(u8),
    #[error("payload failed validation for schema {0:?}")]
    PayloadInvalid(SchemaId),
    #[error("frame is not convertible to the subject's registered frame")]
    FrameMismatch,
    #[error("tick is outside [currentTick - maxLagTicks, currentTick + 1]")]
    StaleTick,
    #[error("intake queue is full, oldest low-priority entry was dropped")]
    QueueOverflow,
}

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum AuthorityError {
    #[error("commit rejected by the sanity gate for schema {0:?}")]
    SanityGateRejected(SchemaId),
    #[error("entity {0:?} is not registered, commit dropped")]
    UnknownEntity(NetId),
}

#[derive(Debug, Clone, Error)]
pub enum BusError {
    #[error("actuator read failed for target {target:?} field {field:?}: {reason}")]
    ActuatorReadFailed {
        target: NetId,
        field: SchemaId,
        reason: String,
    },
    #[error("actuator write failed for target {target:?} field {field:?}: {reason}")]
    ActuatorWriteFailed {
        target: NetId,
        field: SchemaId,
        reason: String,
    },
    #[error("write intent epoch {intent_epoch} is stale against current epoch {current_epoch}")]
    StaleEpoch {
        intent_epoch: u64,
        current_epoch: u64,
    },
    #[error("write queue is full ({max_queued_writes} writes), oldest low-priority write dropped")]
    QueueOverflow { max_queued_writes: usize },
}

#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("transport failure for peer {peer}: {reason}")]
    PeerFailure { peer: u64, reason: String },
    #[error("outbound packet queue overflowed, lowest-priority packets dropped")]
    QueueOverflow,
    #[error("inbound frame failed defensive bounds checking: {0}")]
    MalformedFrame(String),
    #[error("protocol version mismatch: peer={peer_version} expected={expected_version}")]
    ProtocolVersionMismatch {
        peer_version: u32,
        expected_version: u32,
    },
}

#[derive(Debug, Clone, Error)]
pub enum ServerError {
    #[error("attacker {0:?} does not own the attacking entity")]
    AttackerNotOwned(NetId),
    #[error("target {0:?} does not exist or is not alive")]
    TargetInvalid(NetId),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Unrecoverable invariant violation. The tick loop stops cleanly, triggers shutdown,
/// and the process exits non-zero. Never returned from a data-path operation; only
/// raised at the coordinator boundary. See spec.md 7 "Propagation rule".
#[derive(Debug, Clone, Error)]
#[error("fatal invariant violation: {0}")]
pub struct Fatal(pub String);
