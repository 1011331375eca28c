//! HTTP request handlers

pub mod content;
pub mod health;
pub mod types;
pub mod uploads;

pub use content::*;
pub use health::*;
pub use types::*;
pub use uploads::*;
