//! Domain layer types and invariants.

pub mod artifact;
pub mod naming;
pub mod styles;
