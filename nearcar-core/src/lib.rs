//! Core types and service wiring for the nearcar nearest-vehicle ETA service.

/// Result cache implementations.
pub mod cache;
/// Directories of upstream base addresses.
pub mod directory;
/// Domain models shared by the client and the service.
pub mod model;
/// Traits describing the upstream interfaces and their collaborators.
pub mod ports;
/// Rotating start offsets for failover walks.
pub mod rotation;
/// High-level service facade used by the transport.
pub mod service;

pub use cache::*;
pub use directory::*;
pub use model::*;
pub use ports::*;
pub use rotation::*;
pub use service::*;
