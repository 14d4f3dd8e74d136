//! meshaudit CLI - integrity audit for service-mesh topology snapshots

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use meshaudit::config::{default_config_path, load_config};
use meshaudit::output::{OutputMode, error_envelope};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "meshaudit")]
#[command(version)]
#[command(about = "Integrity audit for service-mesh topology snapshots")]
#[command(long_about = r#"
meshaudit loads a snapshot of services, gateways, virtual services and
destination rules into a private relational store and reports:
  • References to gateways or services that do not exist
  • Services sharing a host:port or a host
  • Virtual services claiming the same host on one gateway

Example usage:
  meshaudit audit --model snapshot.json
  meshaudit audit --model snapshot.json --format json --strict
  meshaudit schema
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the config file (defaults to ./meshaudit.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Audit a topology snapshot
    Audit {
        /// Path to the snapshot JSON file
        #[arg(short, long)]
        model: PathBuf,

        /// Output format (human, json)
        #[arg(short, long)]
        format: Option<String>,

        /// Fail on warning-level violations too
        #[arg(long)]
        strict: bool,

        /// Cluster DNS suffix used to derive service hosts
        #[arg(long)]
        cluster_domain: Option<String>,
    },

    /// Print the relational schema used for the audit
    Schema {
        /// Output format (human, json)
        #[arg(short, long)]
        format: Option<String>,
    },

    /// Write a starter config file
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Show version information
    Version {
        /// Output format (human, json)
        #[arg(short, long)]
        format: Option<String>,
    },
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(code) => code,
        Err((mode, command, err)) => {
            if mode.is_human() {
                meshaudit::ui::error(&format!("{:#}", err));
            } else {
                println!("{}", error_envelope(command, &format!("{:#}", err)));
            }
            ExitCode::FAILURE
        }
    }
}

type CommandError = (OutputMode, &'static str, anyhow::Error);

fn run(cli: Cli) -> Result<ExitCode, CommandError> {
    let config_path = cli.config.clone();

    // init must work even when the existing file does not parse
    if let Commands::Init { force } = cli.command {
        let path = config_path.unwrap_or_else(default_config_path);
        return commands::run_init(&path, force, OutputMode::Human)
            .map(|_| ExitCode::SUCCESS)
            .map_err(|e| (OutputMode::Human, "init", e));
    }

    let config = load_config(config_path.as_deref())
        .map_err(|e| (OutputMode::Human, "config", e))?
        .unwrap_or_default();

    let resolve_mode = |flag: Option<String>| -> anyhow::Result<OutputMode> {
        match flag.or_else(|| config.format.clone()) {
            Some(format) => Ok(format.parse()?),
            None => Ok(OutputMode::default()),
        }
    };

    match cli.command {
        Commands::Audit { model, format, strict, cluster_domain } => {
            let mode = resolve_mode(format).map_err(|e| (OutputMode::Human, "audit", e))?;
            let strict = strict || config.strict();
            let domain = cluster_domain.as_deref().unwrap_or_else(|| config.cluster_domain());
            tracing::debug!(model = %model.display(), strict, domain, "Starting audit");
            commands::run_audit_command(&model, mode, strict, domain)
                .map_err(|e| (mode, "audit", e))
        }

        Commands::Schema { format } => {
            let mode = resolve_mode(format).map_err(|e| (OutputMode::Human, "schema", e))?;
            commands::run_schema(mode)
                .map(|_| ExitCode::SUCCESS)
                .map_err(|e| (mode, "schema", e))
        }

        Commands::Init { .. } => Ok(ExitCode::SUCCESS),

        Commands::Version { format } => {
            let mode = resolve_mode(format).map_err(|e| (OutputMode::Human, "version", e))?;
            commands::run_version(mode)
                .map(|_| ExitCode::SUCCESS)
                .map_err(|e| (mode, "version", e))
        }
    }
}
