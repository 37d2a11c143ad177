//! Domain layer: evaluation models, agent tasks, scores and the ports the
//! services depend on.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{DomainError, DomainResult};
