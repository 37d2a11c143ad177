//! In-memory adapters.

pub mod execution_repository;

pub use execution_repository::InMemoryExecutionRepository;
