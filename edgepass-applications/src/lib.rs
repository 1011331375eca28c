//! Edgepass Applications - grant issuance over the storage boundaries
//!
//! Three components, each built from an immutable configuration and the
//! collaborator traits in `edgepass-core`:
//!
//! - [`TierResolver`]: identity to tier, never silently downgrading
//! - [`UploadIssuer`]: one presigned PUT per request
//! - [`ContentGateway`]: tier-scoped listing with a signed read grant per object
//!
//! [`EdgepassApplication`] composes them for the web layer.

pub mod application;
pub mod auth;
pub mod content;
pub mod upload;

pub use application::{EdgepassApplication, EdgepassApplicationBuilder};
pub use auth::{MemoryIdentityStore, TierResolver};
pub use content::ContentGateway;
pub use upload::{UploadIssuer, MAX_OBJECT_NAME_BYTES};
