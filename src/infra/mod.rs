//! Infrastructure adapters and runtime bootstrap.

pub mod archive;
pub mod comments;
pub mod error;
pub mod telemetry;
