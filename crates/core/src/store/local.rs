use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;

use crate::config::Latency;
use crate::error::{StoreError, TaskError, TaskResult, ValidationErrors};
use crate::form::TITLE_FIELD;
use crate::model::{NewTask, SortKey, StatusFilter, Task, TaskId, TaskPatch};
use crate::pipeline::{self, TaskQuery};
use crate::seed;

use super::TaskStore;

/// Task store kept in memory and mirrored to a single JSON file.
///
/// The file holds a bare JSON array of tasks and is rewritten on every
/// mutation. A missing or unreadable file means "no prior state" and the
/// store starts from the sample tasks.
pub struct LocalTaskStore {
    path: PathBuf,
    latency: Latency,
    state: Mutex<LocalState>,
}

struct LocalState {
    tasks: Vec<Task>,
    next_id: TaskId,
}

impl LocalTaskStore {
    pub fn open(path: impl Into<PathBuf>, latency: Latency) -> Self {
        let path = path.into();
        let tasks = load_or_seed(&path);
        Self::with_tasks(path, tasks, latency)
    }

    /// Start from an explicit collection instead of reading `path`.
    pub fn with_tasks(path: impl Into<PathBuf>, tasks: Vec<Task>, latency: Latency) -> Self {
        let next_id = tasks.iter().map(|task| task.id).max().unwrap_or(0) + 1;
        Self {
            path: path.into(),
            latency,
            state: Mutex::new(LocalState { tasks, next_id }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn snapshot(&self) -> Vec<Task> {
        self.state.lock().tasks.clone()
    }

    /// Run `change` against a working copy and keep it only if it was persisted.
    fn commit<T, F>(&self, change: F) -> TaskResult<T>
    where
        F: FnOnce(&mut Vec<Task>, &mut TaskId) -> TaskResult<T>,
    {
        let mut state = self.state.lock();
        let mut tasks = state.tasks.clone();
        let mut next_id = state.next_id;
        let outcome = change(&mut tasks, &mut next_id)?;
        save_tasks(&self.path, &tasks)?;
        state.tasks = tasks;
        state.next_id = next_id;
        Ok(outcome)
    }
}

#[async_trait]
impl TaskStore for LocalTaskStore {
    async fn get_all(&self) -> TaskResult<Vec<Task>> {
        pause(self.latency.read).await;
        Ok(self.snapshot())
    }

    async fn get_by_id(&self, id: TaskId) -> TaskResult<Option<Task>> {
        pause(self.latency.read).await;
        Ok(self
            .state
            .lock()
            .tasks
            .iter()
            .find(|task| task.id == id)
            .cloned())
    }

    async fn create(&self, data: NewTask) -> TaskResult<Task> {
        pause(self.latency.write).await;
        if data.title.trim().is_empty() {
            return Err(ValidationErrors::single(TITLE_FIELD, "Task title is required").into());
        }

        let task = self.commit(|tasks, next_id| {
            let task = Task::from_new(*next_id, data, Utc::now());
            *next_id += 1;
            tasks.push(task.clone());
            Ok(task)
        })?;
        tracing::debug!(task_id = task.id, "created task");
        Ok(task)
    }

    async fn update(&self, id: TaskId, patch: TaskPatch) -> TaskResult<Task> {
        pause(self.latency.write).await;
        if matches!(&patch.title, Some(title) if title.trim().is_empty()) {
            return Err(ValidationErrors::single(TITLE_FIELD, "Task title is required").into());
        }

        let task = self.commit(|tasks, _| {
            let task = tasks
                .iter_mut()
                .find(|task| task.id == id)
                .ok_or(TaskError::NotFound(id))?;
            task.apply_patch(&patch, Utc::now());
            Ok(task.clone())
        })?;
        tracing::debug!(task_id = id, completed = task.completed, "updated task");
        Ok(task)
    }

    async fn delete(&self, id: TaskId) -> TaskResult<Task> {
        pause(self.latency.write).await;
        let removed = self.commit(|tasks, _| {
            let index = tasks
                .iter()
                .position(|task| task.id == id)
                .ok_or(TaskError::NotFound(id))?;
            Ok(tasks.remove(index))
        })?;
        tracing::debug!(task_id = id, "deleted task");
        Ok(removed)
    }

    async fn search(&self, query: &str) -> TaskResult<Vec<Task>> {
        pause(self.latency.read).await;
        let needle = query.trim().to_lowercase();
        Ok(self
            .snapshot()
            .into_iter()
            .filter(|task| pipeline::matches_search(task, &needle))
            .collect())
    }

    async fn filter(&self, status: StatusFilter, sort: SortKey) -> TaskResult<Vec<Task>> {
        pause(self.latency.read).await;
        let query = TaskQuery::new("", status, sort);
        Ok(pipeline::apply(&self.snapshot(), &query))
    }
}

async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

fn load_or_seed(path: &Path) -> Vec<Task> {
    match load_tasks(path) {
        Ok(Some(tasks)) => {
            tracing::debug!(path = %path.display(), count = tasks.len(), "loaded tasks");
            tasks
        }
        Ok(None) => {
            tracing::info!(path = %path.display(), "no saved tasks, starting from samples");
            seed::sample_tasks(Utc::now())
        }
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "ignoring unreadable task file");
            seed::sample_tasks(Utc::now())
        }
    }
}

fn load_tasks(path: &Path) -> Result<Option<Vec<Task>>, StoreError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let tasks = serde_json::from_str(&content)?;
    Ok(Some(tasks))
}

fn save_tasks(path: &Path, tasks: &[Task]) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let content = serde_json::to_string_pretty(tasks)?;
    let staging = path.with_extension("json.tmp");
    fs::write(&staging, content)?;
    fs::rename(&staging, path)?;
    Ok(())
}
