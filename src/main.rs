use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = taskflow::cli::Cli::parse();
    taskflow::init_tracing(cli.log_filter.clone())?;

    let config = taskflow::config::from_cli(&cli)?;
    let command = cli.command.clone().unwrap_or_default();
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    taskflow::commands::execute(&config, command, &mut handle)?;

    Ok(())
}
