//! Tier resolution
//!
//! Authentication happens upstream; this module only maps an already
//! authenticated identity to the tier that gates content prefixes.

pub mod identity;
pub mod tier;

pub use identity::MemoryIdentityStore;
pub use tier::TierResolver;
