//! Edgepass Core - shared data model, collaborator traits and ambient plumbing
//!
//! Everything the grant-issuing components agree on lives here: access tiers,
//! grant shapes, the boundary traits they are written against, the error
//! taxonomy, configuration and logging.

pub mod config;
pub mod error;
pub mod logging;
pub mod traits;
pub mod types;

pub use config::*;
pub use error::*;
pub use logging::*;
pub use traits::*;
pub use types::*;

// Re-export commonly used external types
pub use async_trait::async_trait;
pub use tokio;
pub use tracing;
