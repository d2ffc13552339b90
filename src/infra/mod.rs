//! Infrastructure adapters and runtime bootstrap.

pub mod document;
pub mod error;
pub mod files;
pub(crate) mod lock;
pub mod telemetry;
