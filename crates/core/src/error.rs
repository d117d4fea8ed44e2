use std::fmt;

use thiserror::Error;

use crate::model::TaskId;

pub type TaskResult<T> = Result<T, TaskError>;

#[derive(Debug, Error)]
pub enum TaskError {
    #[error(transparent)]
    Validation(#[from] ValidationErrors),
    #[error("Task {0} not found")]
    NotFound(TaskId),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("Task list has not been loaded")]
    NotLoaded,
}

impl TaskError {
    pub fn code(&self) -> &'static str {
        match self {
            TaskError::Validation(_) => "validation",
            TaskError::NotFound(_) => "not_found",
            TaskError::Store(_) => "store",
            TaskError::NotLoaded => "not_loaded",
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Task backend unavailable: {0}")]
    Unavailable(String),
    #[error("Failed to persist tasks: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to encode or decode task data: {0}")]
    Codec(#[from] serde_json::Error),
    #[error("Request to task backend failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{} record(s) rejected by task backend", .0.len())]
    Batch(Vec<RecordFailure>),
    #[error("Unexpected response from task backend: {0}")]
    Protocol(String),
}

/// One rejected record from a batch write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordFailure {
    pub index: usize,
    pub message: Option<String>,
    pub fields: Vec<FieldError>,
}

impl fmt::Display for RecordFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "record {}", self.index)?;
        if let Some(message) = &self.message {
            write!(f, ": {}", message)?;
        }
        for field in &self.fields {
            write!(f, "; {}", field)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Input problems caught before any store call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.push(field, message);
        errors
    }

    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(FieldError::new(field, message));
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.errors
            .iter()
            .find(|error| error.field == field)
            .map(|error| error.message.as_str())
    }

    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self
            .errors
            .iter()
            .map(|error| error.message.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "{}", joined)
    }
}

impl std::error::Error for ValidationErrors {}
