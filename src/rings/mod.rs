pub mod attribute_ring;
pub mod authority_ring;
pub mod container;
pub mod info_ring;

pub use attribute_ring::{AttributeRing, PresentationState, SampleMode};
pub use authority_ring::AuthorityRing;
pub use container::{ActuatorHandle, ContainerRing, EntityRecord};
pub use info_ring::InfoRing;
