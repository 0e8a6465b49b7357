use clap::Parser;
use tracing_subscriber::EnvFilter;

use vl_cli::cli::{self, Cli, Command, ConfigCommand};
use vl_domain::config::{LogFormat, ObservabilityConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        // Default to serve when no subcommand is given.
        None | Some(Command::Serve) => {
            let (config, config_path) = cli::load_config()?;
            init_tracing(&config.observability);
            cli::serve::run(&config, &config_path).await
        }
        Some(Command::Status { subject }) => {
            init_cli_tracing();
            let (config, _config_path) = cli::load_config()?;
            cli::lease::status(&config, subject).await?;
            Ok(())
        }
        Some(Command::Acquire { subject }) => {
            init_cli_tracing();
            let (config, _config_path) = cli::load_config()?;
            cli::lease::acquire(&config, subject).await
        }
        Some(Command::Release { subject }) => {
            init_cli_tracing();
            let (config, _config_path) = cli::load_config()?;
            cli::lease::release(&config, subject).await
        }
        Some(Command::Sweep) => {
            init_cli_tracing();
            let (config, _config_path) = cli::load_config()?;
            if !cli::lease::sweep(&config).await? {
                std::process::exit(1);
            }
            Ok(())
        }
        Some(Command::Doctor) => {
            init_cli_tracing();
            let (config, config_path) = cli::load_config()?;
            let passed = cli::doctor::run(&config, &config_path).await?;
            if !passed {
                std::process::exit(1);
            }
            Ok(())
        }
        Some(Command::Config(ConfigCommand::Validate)) => {
            let (config, config_path) = cli::load_config()?;
            let valid = cli::config::validate(&config, &config_path);
            if !valid {
                std::process::exit(1);
            }
            Ok(())
        }
        Some(Command::Config(ConfigCommand::Show)) => {
            let (config, _config_path) = cli::load_config()?;
            cli::config::show(&config)
        }
        Some(Command::Version) => {
            println!("vaultlock {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn init_tracing(obs: &ObservabilityConfig) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&obs.filter));

    let builder = tracing_subscriber::fmt().with_env_filter(env_filter);
    match obs.log_format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Compact => builder.compact().init(),
    }
}

/// Lightweight tracing for one-shot CLI commands (no JSON, warn level).
fn init_cli_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .compact()
        .init();
}
