pub use taskflow_cli::cli;
pub use taskflow_cli::commands;
pub use taskflow_cli::config;
pub use taskflow_cli::init_tracing;
pub use taskflow_cli::AppConfig;

pub use taskflow_core as core;
pub use taskflow_core::controller;
pub use taskflow_core::model;
pub use taskflow_core::pipeline;
pub use taskflow_core::store;
