//! Adapters: persistence, agents and delivery transports.

pub mod agents;
pub mod memory;
pub mod sqlite;
pub mod transports;
