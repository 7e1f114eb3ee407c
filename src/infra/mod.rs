//! Infrastructure adapters and runtime bootstrap.

pub mod error;
pub mod lifecycle;
pub mod store;
pub mod telemetry;
