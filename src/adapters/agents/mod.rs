//! Agent implementations.

pub mod simulated;

pub use simulated::{simulated_catalog, SimulatedAgent, SimulatedResponse};
