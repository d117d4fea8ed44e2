use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

use crate::config::BackendKind;
use crate::core::form::TaskForm;
use crate::model::{Priority, SortKey, StatusFilter, TaskId};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "taskflow",
    version,
    about = "Keep a task list in a local file or a hosted record table.",
    after_help = "Examples:\n  taskflow                          List tasks (same as `taskflow list`)\n  taskflow add Buy milk --priority high --due 2030-01-31\n  taskflow list --status active --sort due-date\n  taskflow done 3\n  taskflow --backend remote --remote-url https://records.example.com stats"
)]
pub struct Cli {
    /// Override the data directory (defaults to platform-specific app dir)
    #[arg(long, value_name = "PATH", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Task backend (defaults to TASKFLOW_BACKEND or local)
    #[arg(long, value_enum, global = true)]
    pub backend: Option<BackendKind>,

    /// Base URL of the record API used by the remote backend
    #[arg(long = "remote-url", value_name = "URL", global = true)]
    pub remote_url: Option<String>,

    /// Bearer token for the record API (defaults to TASKFLOW_API_KEY)
    #[arg(long = "api-key", value_name = "KEY", global = true)]
    pub api_key: Option<String>,

    /// Tracing filter written to stderr (e.g. "info", "taskflow_core=debug")
    #[arg(long = "log", value_name = "DIRECTIVE", global = true)]
    pub log_filter: Option<String>,

    #[command(subcommand)]
    pub command: Option<CliCommand>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum CliCommand {
    /// List tasks with optional search, status filter and sort (default command)
    List(ListArgs),
    /// Create a task
    Add(AddArgs),
    /// Change fields of an existing task
    Edit(EditArgs),
    /// Mark a task as completed
    Done(TaskRef),
    /// Mark a completed task as active again
    Reopen(TaskRef),
    /// Delete a task permanently
    Delete(TaskRef),
    /// Print every field of one task
    Show(TaskRef),
    /// Print completion statistics
    Stats,
}

impl Default for CliCommand {
    fn default() -> Self {
        CliCommand::List(ListArgs::default())
    }
}

#[derive(Args, Debug, Clone, Default)]
pub struct ListArgs {
    /// Case-insensitive text matched against title and description
    #[arg(long, short = 's', value_name = "TEXT")]
    pub search: Option<String>,

    /// Only show active or completed tasks
    #[arg(long, value_enum)]
    pub status: Option<StatusFilter>,

    /// Ordering of the listed tasks (defaults to newest first)
    #[arg(long, value_enum)]
    pub sort: Option<SortKey>,
}

#[derive(Args, Debug, Clone)]
pub struct AddArgs {
    /// Task title
    #[arg(value_name = "TITLE", required = true)]
    pub title: Vec<String>,

    /// Longer notes shown with the task
    #[arg(long)]
    pub description: Option<String>,

    /// Priority (defaults to medium)
    #[arg(long, value_enum)]
    pub priority: Option<Priority>,

    /// Due date (YYYY-MM-DD)
    #[arg(long = "due", value_name = "DATE")]
    pub due_date: Option<NaiveDate>,
}

#[derive(Args, Debug, Clone)]
pub struct EditArgs {
    #[arg(value_name = "ID")]
    pub id: TaskId,

    #[arg(long)]
    pub title: Option<String>,

    #[arg(long)]
    pub description: Option<String>,

    #[arg(long, value_enum)]
    pub priority: Option<Priority>,

    /// New due date (YYYY-MM-DD)
    #[arg(long = "due", value_name = "DATE", conflicts_with = "clear_due")]
    pub due_date: Option<NaiveDate>,

    /// Remove the due date
    #[arg(long = "clear-due")]
    pub clear_due: bool,
}

impl EditArgs {
    /// Overlay the supplied flags on the task's current draft.
    pub fn apply_to(&self, form: &mut TaskForm) {
        if let Some(title) = &self.title {
            form.title = title.clone();
        }
        if let Some(description) = &self.description {
            form.description = description.clone();
        }
        if let Some(priority) = self.priority {
            form.priority = priority;
        }
        if self.clear_due {
            form.due_date = None;
        } else if let Some(due_date) = self.due_date {
            form.due_date = Some(due_date);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.priority.is_none()
            && self.due_date.is_none()
            && !self.clear_due
    }
}

#[derive(Args, Debug, Clone, Copy)]
pub struct TaskRef {
    #[arg(value_name = "ID")]
    pub id: TaskId,
}

impl From<&AddArgs> for TaskForm {
    fn from(args: &AddArgs) -> Self {
        TaskForm {
            title: args.title.join(" "),
            description: args.description.clone().unwrap_or_default(),
            priority: args.priority.unwrap_or_default(),
            due_date: args.due_date,
        }
    }
}
