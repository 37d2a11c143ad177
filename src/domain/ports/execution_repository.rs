use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::ExecutionRecord;

/// Repository port for durable execution records.
#[async_trait]
pub trait ExecutionRepository: Send + Sync {
    /// Insert a new record
    async fn insert(&self, record: &ExecutionRecord) -> DomainResult<()>;

    /// Get a record by ID
    async fn get(&self, id: Uuid) -> DomainResult<Option<ExecutionRecord>>;

    /// Overwrite the mutable fields of an existing record
    async fn update(&self, record: &ExecutionRecord) -> DomainResult<()>;

    /// All records of an evaluation, oldest first
    async fn list_by_evaluation(&self, evaluation_id: &str) -> DomainResult<Vec<ExecutionRecord>>;
}
