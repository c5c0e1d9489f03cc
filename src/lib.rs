//! # ring-coordinator
//!
//! A tick-driven, multi-ring coordination pipeline for replicating an external,
//! single-process simulation: fact ingestion (`InfoRing`), confidence arbitration,
//! authority commit (`AuthorityRing`), gated writes through a `DataBus`, and
//! presentation-time interpolation/extrapolation (`AttributeRing`). A `ServerState`
//! layers combat resolution, zone-based interest filtering, and handshake/world-sync
//! on top of the core pipeline for deployments with one canonical authority.

pub mod bus;
pub mod clock;
pub mod commit;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod info;
pub mod payload;
pub mod rings;
pub mod server;
pub mod stats;
pub mod transport;
pub mod types;
pub mod wire;

pub use bus::{DataBus, FakeMemoryActuator, MemoryActuator};
pub use clock::Clock;
pub use commit::{Commit, Operation};
pub use config::RingConfig;
pub use coordinator::RingCoordinator;
pub use error::Fatal;
pub use info::Info;
pub use payload::{Payload, Quat, Vec3};
pub use rings::{AttributeRing, AuthorityRing, ContainerRing, InfoRing, PresentationState, SampleMode};
pub use stats::Stats;
pub use transport::{FakeNetworkTransport, NetworkTransport};
pub use types::{AuthoritySource, EntityKind, FrameType, NetId, SchemaId};
