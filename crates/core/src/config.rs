use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::ValueEnum;
use directories::{BaseDirs, ProjectDirs};
use once_cell::sync::Lazy;

static DEFAULT_STORE_NAME: &str = "tasks.json";
static DEFAULT_TABLE: &str = "task";
static ENV_DATA_DIR: &str = "TASKFLOW_DATA_DIR";
static ENV_BACKEND: &str = "TASKFLOW_BACKEND";
static ENV_REMOTE_URL: &str = "TASKFLOW_REMOTE_URL";
static ENV_API_KEY: &str = "TASKFLOW_API_KEY";
static ENV_TABLE: &str = "TASKFLOW_TABLE";
static ENV_LATENCY_MS: &str = "TASKFLOW_LATENCY_MS";

static PROJECT_DIRS: Lazy<Option<ProjectDirs>> =
    Lazy::new(|| ProjectDirs::from("dev", "taskflow", "taskflow"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "lowercase")]
pub enum BackendKind {
    Local,
    Remote,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub table: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backend {
    Local,
    Remote(RemoteConfig),
}

/// Artificial delay applied by the local backend so it behaves like a network store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Latency {
    pub read: Duration,
    pub write: Duration,
}

impl Latency {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn simulated() -> Self {
        Self {
            read: Duration::from_millis(200),
            write: Duration::from_millis(300),
        }
    }

    pub fn uniform(delay: Duration) -> Self {
        Self {
            read: delay,
            write: delay,
        }
    }
}

/// Values supplied on the command line; each takes precedence over the environment.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub data_dir: Option<PathBuf>,
    pub backend: Option<BackendKind>,
    pub remote_url: Option<String>,
    pub api_key: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    data_dir: PathBuf,
    store_path: PathBuf,
    backend: Backend,
    latency: Latency,
}

impl AppConfig {
    /// Construct [`AppConfig`] by resolving the data directory and backend from the
    /// provided overrides, environment variables, and platform defaults.
    pub fn discover(overrides: ConfigOverrides) -> Result<Self> {
        let lookup = |key: &str| env::var(key).ok().filter(|value| !value.trim().is_empty());
        let data_dir = resolve_data_dir(overrides.data_dir.clone())?;
        if !data_dir.exists() {
            fs::create_dir_all(&data_dir).with_context(|| {
                format!("Failed to create data directory at {}", data_dir.display())
            })?;
        }
        let backend = resolve_backend(&overrides, lookup)?;
        let latency = resolve_latency(lookup)?;

        Ok(Self::from_data_dir(data_dir)?
            .with_backend(backend)
            .with_latency(latency))
    }

    /// Construct a local-backend [`AppConfig`] directly from a resolved data directory.
    pub fn from_data_dir(data_dir: PathBuf) -> Result<Self> {
        let store_path = data_dir.join(DEFAULT_STORE_NAME);
        Ok(Self {
            data_dir,
            store_path,
            backend: Backend::Local,
            latency: Latency::none(),
        })
    }

    pub fn with_backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_latency(mut self, latency: Latency) -> Self {
        self.latency = latency;
        self
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn store_path(&self) -> &Path {
        &self.store_path
    }

    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    pub fn latency(&self) -> Latency {
        self.latency
    }
}

fn resolve_data_dir(data_dir_override: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(dir) = data_dir_override {
        return Ok(dir);
    }

    if let Ok(env_dir) = env::var(ENV_DATA_DIR) {
        return Ok(PathBuf::from(env_dir));
    }

    if let Some(project) = &*PROJECT_DIRS {
        return Ok(project.data_dir().to_path_buf());
    }

    if let Some(base) = BaseDirs::new() {
        return Ok(base.home_dir().join(".taskflow"));
    }

    Ok(env::current_dir()?.join(".taskflow"))
}

fn resolve_backend<F>(overrides: &ConfigOverrides, lookup: F) -> Result<Backend>
where
    F: Fn(&str) -> Option<String>,
{
    let kind = match overrides.backend {
        Some(kind) => kind,
        None => match lookup(ENV_BACKEND) {
            Some(raw) => BackendKind::from_str(&raw, true)
                .map_err(|_| anyhow!("Unknown backend '{}': expected local|remote", raw))?,
            None => BackendKind::Local,
        },
    };

    match kind {
        BackendKind::Local => Ok(Backend::Local),
        BackendKind::Remote => {
            let base_url = overrides
                .remote_url
                .clone()
                .or_else(|| lookup(ENV_REMOTE_URL))
                .ok_or_else(|| {
                    anyhow!(
                        "Remote backend selected but no URL given (use --remote-url or {})",
                        ENV_REMOTE_URL
                    )
                })?;
            Ok(Backend::Remote(RemoteConfig {
                base_url,
                api_key: overrides.api_key.clone().or_else(|| lookup(ENV_API_KEY)),
                table: lookup(ENV_TABLE).unwrap_or_else(|| DEFAULT_TABLE.to_string()),
            }))
        }
    }
}

fn resolve_latency<F>(lookup: F) -> Result<Latency>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(ENV_LATENCY_MS) {
        Some(raw) => {
            let millis: u64 = raw
                .trim()
                .parse()
                .with_context(|| format!("{} must be a number of milliseconds", ENV_LATENCY_MS))?;
            Ok(Latency::uniform(Duration::from_millis(millis)))
        }
        None => Ok(Latency::simulated()),
    }
}
