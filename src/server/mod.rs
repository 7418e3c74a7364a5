//! Server module for building the HTTP server
//!
//! The `ServerBuilder` assembles a `ServerHost` from a datastore and the
//! configured permission tables, then exposes it over REST.

pub mod builder;
pub mod entity_registry;
pub mod exposure;
pub mod host;
pub mod router;

pub use builder::ServerBuilder;
pub use entity_registry::{EntityDescriptor, EntityRegistry};
pub use exposure::RestExposure;
pub use host::ServerHost;
