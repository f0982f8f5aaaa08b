//! Connection capability negotiation.
//!
//! Before authenticating, a client may ask for the server's capabilities
//! (`CapabilitiesGet`) and propose values of its own (`CapabilitiesSet`).
//! The registry answers both from a fixed, ordered set of descriptors.

pub mod descriptor;
pub mod error;
pub mod registry;

pub use descriptor::{CapabilityDescriptor, CapabilityValue};
pub use error::CapabilityError;
pub use registry::CapabilityRegistry;
