pub mod config;
pub mod controller;
pub mod error;
pub mod form;
pub mod model;
pub mod notify;
pub mod pipeline;
pub mod seed;
pub mod store;

pub use config::AppConfig;
pub use controller::{EditSession, LoadState, TaskListController};
pub use error::{StoreError, TaskError, TaskResult, ValidationErrors};
pub use form::TaskForm;
pub use model::*;
pub use notify::{LogNotifier, MemoryNotifier, Notice, NoticeLevel, Notifier};
pub use pipeline::TaskQuery;
pub use store::{open_store, LocalTaskStore, RemoteTaskStore, TaskStore};
