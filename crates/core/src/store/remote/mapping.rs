use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::StoreError;
use crate::model::{NewTask, Priority, SortKey, Task, TaskId, TaskPatch};

pub(crate) const ID: &str = "Id";
pub(crate) const TITLE: &str = "title";
pub(crate) const DESCRIPTION: &str = "description";
pub(crate) const PRIORITY: &str = "priority";
pub(crate) const DUE_DATE: &str = "due_date";
pub(crate) const COMPLETED: &str = "completed";
pub(crate) const CREATED_AT: &str = "created_at";
pub(crate) const COMPLETED_AT: &str = "completed_at";

pub(crate) const TASK_FIELDS: &[&str] = &[
    ID,
    TITLE,
    DESCRIPTION,
    PRIORITY,
    DUE_DATE,
    COMPLETED,
    CREATED_AT,
    COMPLETED_AT,
];

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct TaskRecord {
    #[serde(rename = "Id")]
    id: TaskId,
    title: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    priority: Option<Priority>,
    #[serde(default)]
    due_date: Option<NaiveDate>,
    #[serde(default)]
    completed: bool,
    created_at: DateTime<Utc>,
    #[serde(default)]
    completed_at: Option<DateTime<Utc>>,
}

impl From<TaskRecord> for Task {
    fn from(record: TaskRecord) -> Self {
        Self {
            id: record.id,
            title: record.title,
            description: record.description.unwrap_or_default(),
            priority: record.priority.unwrap_or_default(),
            due_date: record.due_date,
            completed: record.completed,
            created_at: record.created_at,
            completed_at: record.completed_at,
        }
    }
}

pub(crate) fn decode_task(value: Value) -> Result<Task, StoreError> {
    let record: TaskRecord = serde_json::from_value(value)
        .map_err(|err| StoreError::Protocol(format!("malformed task record: {}", err)))?;
    Ok(record.into())
}

pub(crate) fn decode_tasks(values: Vec<Value>) -> Result<Vec<Task>, StoreError> {
    values.into_iter().map(decode_task).collect()
}

/// Record for a new row. The table assigns `Id`.
pub(crate) fn new_record(data: &NewTask, now: DateTime<Utc>) -> Value {
    let mut record = Map::new();
    record.insert(TITLE.into(), Value::from(data.title.trim()));
    record.insert(DESCRIPTION.into(), Value::from(data.description.trim()));
    record.insert(PRIORITY.into(), Value::from(data.priority.as_str()));
    record.insert(DUE_DATE.into(), date_value(data.due_date));
    record.insert(COMPLETED.into(), Value::Bool(false));
    record.insert(CREATED_AT.into(), Value::from(now.to_rfc3339()));
    record.insert(COMPLETED_AT.into(), Value::Null);
    Value::Object(record)
}

/// Sparse update record holding only the patched columns.
///
/// `completed_at` is derived from `current` so it only moves on a real
/// completion transition.
pub(crate) fn patch_record(current: &Task, patch: &TaskPatch, now: DateTime<Utc>) -> Value {
    let mut record = Map::new();
    record.insert(ID.into(), Value::from(current.id));
    if let Some(title) = &patch.title {
        record.insert(TITLE.into(), Value::from(title.trim()));
    }
    if let Some(description) = &patch.description {
        record.insert(DESCRIPTION.into(), Value::from(description.trim()));
    }
    if let Some(priority) = patch.priority {
        record.insert(PRIORITY.into(), Value::from(priority.as_str()));
    }
    if let Some(due_date) = patch.due_date {
        record.insert(DUE_DATE.into(), date_value(due_date));
    }
    if let Some(completed) = patch.completed {
        record.insert(COMPLETED.into(), Value::Bool(completed));
        if completed != current.completed {
            let completed_at = if completed {
                Value::from(now.to_rfc3339())
            } else {
                Value::Null
            };
            record.insert(COMPLETED_AT.into(), completed_at);
        }
    }
    Value::Object(record)
}

pub(crate) fn sort_field(key: SortKey) -> &'static str {
    match key {
        SortKey::CreatedAt => CREATED_AT,
        SortKey::Title => TITLE,
        SortKey::DueDate => DUE_DATE,
        SortKey::Priority => PRIORITY,
    }
}

fn date_value(date: Option<NaiveDate>) -> Value {
    date.map(|date| Value::from(date.format("%Y-%m-%d").to_string()))
        .unwrap_or(Value::Null)
}
