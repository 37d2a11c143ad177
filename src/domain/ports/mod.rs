//! Ports (traits) implemented by adapters.

pub mod agent;
pub mod execution_repository;
pub mod transport;

pub use agent::{Agent, AgentError};
pub use execution_repository::ExecutionRepository;
pub use transport::{DispatchRequest, Transport, TransportError};
