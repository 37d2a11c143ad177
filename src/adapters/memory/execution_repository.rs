//! In-memory ExecutionRepository for tests and ephemeral runs.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::ExecutionRecord;
use crate::domain::ports::ExecutionRepository;

#[derive(Default)]
struct Store {
    records: HashMap<Uuid, ExecutionRecord>,
    order: Vec<Uuid>,
}

/// Process-local execution store. Clones share the same data.
#[derive(Clone, Default)]
pub struct InMemoryExecutionRepository {
    store: Arc<RwLock<Store>>,
}

impl InMemoryExecutionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.store.read().await.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl ExecutionRepository for InMemoryExecutionRepository {
    async fn insert(&self, record: &ExecutionRecord) -> DomainResult<()> {
        let mut store = self.store.write().await;
        if store.records.contains_key(&record.id) {
            return Err(DomainError::DatabaseError(format!(
                "execution {} already exists",
                record.id
            )));
        }
        store.order.push(record.id);
        store.records.insert(record.id, record.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> DomainResult<Option<ExecutionRecord>> {
        Ok(self.store.read().await.records.get(&id).cloned())
    }

    async fn update(&self, record: &ExecutionRecord) -> DomainResult<()> {
        let mut store = self.store.write().await;
        match store.records.get_mut(&record.id) {
            Some(existing) => {
                *existing = record.clone();
                Ok(())
            }
            None => Err(DomainError::ExecutionNotFound(record.id)),
        }
    }

    async fn list_by_evaluation(&self, evaluation_id: &str) -> DomainResult<Vec<ExecutionRecord>> {
        let store = self.store.read().await;
        Ok(store
            .order
            .iter()
            .filter_map(|id| store.records.get(id))
            .filter(|r| r.evaluation_id == evaluation_id)
            .cloned()
            .collect())
    }
}
