use chrono::NaiveDate;

use crate::error::ValidationErrors;
use crate::model::{NewTask, Priority, Task, TaskPatch};

pub const TITLE_FIELD: &str = "title";
pub const DUE_DATE_FIELD: &str = "dueDate";

/// Editing draft shared by every client that creates or edits tasks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskForm {
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub due_date: Option<NaiveDate>,
}

impl TaskForm {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self, today: NaiveDate) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if self.title.trim().is_empty() {
            errors.push(TITLE_FIELD, "Task title is required");
        }
        if let Some(due_date) = self.due_date {
            if due_date < today {
                errors.push(DUE_DATE_FIELD, "Due date cannot be in the past");
            }
        }
        errors.into_result()
    }

    pub fn into_new_task(self) -> NewTask {
        NewTask {
            title: self.title.trim().to_string(),
            description: self.description.trim().to_string(),
            priority: self.priority,
            due_date: self.due_date,
        }
    }

    /// Full-field patch: submitting an edit overwrites every editable field.
    pub fn into_patch(self) -> TaskPatch {
        TaskPatch {
            title: Some(self.title.trim().to_string()),
            description: Some(self.description.trim().to_string()),
            priority: Some(self.priority),
            due_date: Some(self.due_date),
            completed: None,
        }
    }
}

impl From<&Task> for TaskForm {
    fn from(task: &Task) -> Self {
        Self {
            title: task.title.clone(),
            description: task.description.clone(),
            priority: task.priority,
            due_date: task.due_date,
        }
    }
}
