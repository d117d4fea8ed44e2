mod local;
pub mod remote;

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::config::{AppConfig, Backend};
use crate::error::TaskResult;
use crate::model::{NewTask, SortKey, StatusFilter, Task, TaskId, TaskPatch};

pub use local::LocalTaskStore;
pub use remote::RemoteTaskStore;

/// Durable owner of the task collection.
///
/// Every method may suspend on I/O. Returned tasks are authoritative: callers
/// replace their copies with them instead of trusting what they sent.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Snapshot of every task in store order.
    async fn get_all(&self) -> TaskResult<Vec<Task>>;

    /// `Ok(None)` when no task has this id.
    async fn get_by_id(&self, id: TaskId) -> TaskResult<Option<Task>>;

    /// Assigns the id and creation timestamp; fails with a validation error on a blank title.
    async fn create(&self, data: NewTask) -> TaskResult<Task>;

    async fn update(&self, id: TaskId, patch: TaskPatch) -> TaskResult<Task>;

    /// Hard delete. Returns the removed record.
    async fn delete(&self, id: TaskId) -> TaskResult<Task>;

    async fn search(&self, query: &str) -> TaskResult<Vec<Task>>;

    async fn filter(&self, status: StatusFilter, sort: SortKey) -> TaskResult<Vec<Task>>;
}

/// Build the backend selected by configuration.
pub fn open_store(config: &AppConfig) -> Result<Arc<dyn TaskStore>> {
    match config.backend() {
        Backend::Local => {
            let store = LocalTaskStore::open(config.store_path(), config.latency());
            Ok(Arc::new(store))
        }
        Backend::Remote(remote) => {
            let store = RemoteTaskStore::new(remote.clone())
                .context("failed to initialize remote task store")?;
            Ok(Arc::new(store))
        }
    }
}
