pub use taskflow_core::config::*;

use crate::cli::Cli;

pub fn from_cli(cli: &Cli) -> anyhow::Result<AppConfig> {
    AppConfig::discover(ConfigOverrides {
        data_dir: cli.data_dir.clone(),
        backend: cli.backend,
        remote_url: cli.remote_url.clone(),
        api_key: cli.api_key.clone(),
    })
}
