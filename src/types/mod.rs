//! Core type definitions using newtype patterns for type safety.
//!
//! These types prevent common logic errors by making invalid states unrepresentable
//! at compile time.

mod port;
mod socket;
mod target;

pub use port::{
    Port, PortError, PortItem, PortPreset, PortSpec, DEFAULT_PORTS_1, DEFAULT_PORTS_2,
    DEFAULT_PORTS_3,
};
pub use socket::{HostIdentity, Socket};
pub use target::{ClassifiedTarget, TargetError, UrlTarget};
