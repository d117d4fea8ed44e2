use std::sync::Arc;

use chrono::{Local, NaiveDate};

use crate::error::{TaskError, TaskResult};
use crate::form::TaskForm;
use crate::model::{NewTask, SortKey, StatusFilter, Task, TaskId, TaskPatch, TaskStats};
use crate::notify::{Notice, Notifier};
use crate::pipeline::{self, TaskQuery};
use crate::store::TaskStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    Idle,
    Loading,
    Ready,
    Error(String),
}

impl LoadState {
    pub fn is_ready(&self) -> bool {
        matches!(self, LoadState::Ready)
    }
}

/// Draft being edited. `target` is `None` when the draft creates a new task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditSession {
    pub target: Option<TaskId>,
    pub form: TaskForm,
}

pub struct TaskListController {
    store: Arc<dyn TaskStore>,
    notifier: Arc<dyn Notifier>,
    tasks: Vec<Task>,
    state: LoadState,
    query: TaskQuery,
    editing: Option<EditSession>,
}

impl TaskListController {
    pub fn new(store: Arc<dyn TaskStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            store,
            notifier,
            tasks: Vec::new(),
            state: LoadState::Idle,
            query: TaskQuery::default(),
            editing: None,
        }
    }

    pub fn state(&self) -> &LoadState {
        &self.state
    }

    /// Session collection in store order, newest creations first.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn query(&self) -> &TaskQuery {
        &self.query
    }

    pub fn editing(&self) -> Option<&EditSession> {
        self.editing.as_ref()
    }

    pub async fn load(&mut self) -> TaskResult<()> {
        self.state = LoadState::Loading;
        tracing::debug!("loading tasks");
        match self.store.get_all().await {
            Ok(tasks) => {
                tracing::debug!(count = tasks.len(), "tasks loaded");
                self.tasks = tasks;
                self.state = LoadState::Ready;
                Ok(())
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to load tasks");
                self.state = LoadState::Error(err.to_string());
                self.notifier.notify(Notice::error("Failed to load tasks"));
                Err(err)
            }
        }
    }

    /// Re-enter `Loading` after a failed load. A ready list is reloaded too.
    pub async fn retry(&mut self) -> TaskResult<()> {
        if matches!(self.state, LoadState::Loading) {
            return Ok(());
        }
        self.load().await
    }

    pub async fn create(&mut self, data: NewTask) -> TaskResult<Task> {
        self.ensure_ready()?;
        match self.store.create(data).await {
            Ok(task) => {
                self.tasks.insert(0, task.clone());
                self.notifier
                    .notify(Notice::success("Task created successfully"));
                Ok(task)
            }
            Err(err) => Err(self.report("Failed to save task", err)),
        }
    }

    pub async fn update(&mut self, id: TaskId, patch: TaskPatch) -> TaskResult<Task> {
        self.update_reporting(id, patch, "Failed to update task")
            .await
    }

    async fn update_reporting(
        &mut self,
        id: TaskId,
        patch: TaskPatch,
        failure: &str,
    ) -> TaskResult<Task> {
        self.ensure_ready()?;
        match self.store.update(id, patch).await {
            Ok(task) => {
                self.replace(task.clone());
                self.notifier
                    .notify(Notice::success("Task updated successfully"));
                Ok(task)
            }
            Err(err) => Err(self.report(failure, err)),
        }
    }

    /// Flip completion for `id` based on the session copy.
    pub async fn toggle_complete(&mut self, id: TaskId) -> TaskResult<Task> {
        self.ensure_ready()?;
        let completed = match self.tasks.iter().find(|task| task.id == id) {
            Some(task) => !task.completed,
            None => return Err(self.report("Failed to update task", TaskError::NotFound(id))),
        };

        match self.store.update(id, TaskPatch::completion(completed)).await {
            Ok(task) => {
                self.replace(task.clone());
                let message = if task.completed {
                    "Task completed!"
                } else {
                    "Task marked as active"
                };
                self.notifier.notify(Notice::success(message));
                Ok(task)
            }
            Err(err) => Err(self.report("Failed to update task", err)),
        }
    }

    pub async fn delete(&mut self, id: TaskId) -> TaskResult<Task> {
        self.ensure_ready()?;
        match self.store.delete(id).await {
            Ok(removed) => {
                self.tasks.retain(|task| task.id != id);
                let editing_removed = self
                    .editing
                    .as_ref()
                    .is_some_and(|session| session.target == Some(id));
                if editing_removed {
                    self.editing = None;
                }
                self.notifier.notify(Notice::success("Task deleted"));
                Ok(removed)
            }
            Err(err) => Err(self.report("Failed to delete task", err)),
        }
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query.query = query.into();
    }

    pub fn set_status(&mut self, status: StatusFilter) {
        self.query.status = status;
    }

    pub fn set_sort(&mut self, sort: SortKey) {
        self.query.sort = sort;
    }

    /// Reset search and status. The sort order is kept.
    pub fn clear_filters(&mut self) {
        self.query.query.clear();
        self.query.status = StatusFilter::All;
    }

    pub fn visible(&self) -> Vec<Task> {
        pipeline::apply(&self.tasks, &self.query)
    }

    /// Counts over the whole session collection, ignoring filters.
    pub fn stats(&self) -> TaskStats {
        TaskStats::from_tasks(&self.tasks)
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// False when the active search or status hides every task.
    pub fn has_filtered_results(&self) -> bool {
        !self.query.is_filtered() || !self.visible().is_empty()
    }

    pub fn open_create(&mut self) {
        self.editing = Some(EditSession {
            target: None,
            form: TaskForm::default(),
        });
    }

    pub fn open_edit(&mut self, id: TaskId) -> TaskResult<&EditSession> {
        let task = self
            .tasks
            .iter()
            .find(|task| task.id == id)
            .ok_or(TaskError::NotFound(id))?;
        let session = EditSession {
            target: Some(id),
            form: TaskForm::from(task),
        };
        Ok(self.editing.insert(session))
    }

    pub fn cancel_edit(&mut self) {
        self.editing = None;
    }

    /// Validate `form` against the local calendar date and send it as a
    /// create or a full-field patch, depending on the open session.
    /// The session closes on success.
    pub async fn submit(&mut self, form: TaskForm) -> TaskResult<Task> {
        self.submit_as_of(form, Local::now().date_naive()).await
    }

    /// [`submit`](Self::submit) with an explicit "today" for due date checks.
    pub async fn submit_as_of(&mut self, form: TaskForm, today: NaiveDate) -> TaskResult<Task> {
        if let Err(errors) = form.validate(today) {
            self.notifier
                .notify(Notice::error("Please fix the errors in the form"));
            return Err(errors.into());
        }

        let target = self.editing.as_ref().and_then(|session| session.target);
        let result = match target {
            Some(id) => {
                self.update_reporting(id, form.into_patch(), "Failed to save task")
                    .await
            }
            None => self.create(form.into_new_task()).await,
        };
        if result.is_ok() {
            self.editing = None;
        }
        result
    }

    fn ensure_ready(&self) -> TaskResult<()> {
        if self.state.is_ready() {
            Ok(())
        } else {
            Err(TaskError::NotLoaded)
        }
    }

    fn replace(&mut self, task: Task) {
        if let Some(slot) = self.tasks.iter_mut().find(|current| current.id == task.id) {
            *slot = task;
        }
    }

    fn report(&self, message: &str, err: TaskError) -> TaskError {
        tracing::warn!(error = %err, code = err.code(), "{}", message);
        self.notifier.notify(Notice::error(message));
        err
    }
}
