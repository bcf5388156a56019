mod config;
mod prompt_cmd;
mod repl_cmd;

use std::path::PathBuf;

use anyhow::bail;
use clap::{Parser, Subcommand};

use config::{Overrides, RelayConfig};

#[derive(Parser)]
#[command(
    name = "relay",
    about = "Drive a coding-agent worker process over line-delimited JSON"
)]
struct Cli {
    /// Worker program (overrides RELAY_WORKER_PROGRAM and the config file)
    #[arg(long, global = true)]
    program: Option<String>,

    /// Extra worker argument (repeatable)
    #[arg(long = "arg", global = true)]
    args: Vec<String>,

    /// Worker working directory
    #[arg(long, global = true)]
    dir: Option<PathBuf>,

    /// Per-turn timeout in seconds (capped at 5 minutes)
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a relay config file
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
    /// Send one prompt and print the turn's output
    Prompt {
        /// The prompt text
        text: String,
        /// Echo every raw worker line to stderr as it arrives
        #[arg(long)]
        stream: bool,
    },
    /// Interactive loop: one prompt per line, reusing one worker process
    Repl {
        /// Echo every raw worker line to stderr as it arrives
        #[arg(long)]
        stream: bool,
    },
}

/// Execute `relay init`: write the config file from the CLI overrides.
fn cmd_init(overrides: &Overrides, force: bool) -> anyhow::Result<()> {
    let path = config::config_path();

    if path.exists() && !force {
        bail!(
            "config file already exists at {}\nUse --force to overwrite.",
            path.display()
        );
    }

    let Some(program) = overrides.program.clone() else {
        bail!("relay init requires --program <path-to-worker>");
    };

    let cfg = config::ConfigFile {
        worker: config::WorkerSection {
            program,
            args: overrides.args.clone(),
            working_dir: overrides.working_dir.clone(),
        },
        limits: config::LimitsSection {
            timeout_secs: overrides.timeout_secs.unwrap_or(120),
        },
    };
    config::save_config(&cfg)?;

    println!("Config written to {}", path.display());
    println!("  worker.program = {}", cfg.worker.program);
    println!("  limits.timeout_secs = {}", cfg.limits.timeout_secs);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let overrides = Overrides {
        program: cli.program,
        args: cli.args,
        working_dir: cli.dir,
        timeout_secs: cli.timeout_secs,
    };

    match cli.command {
        Commands::Init { force } => {
            cmd_init(&overrides, force)?;
        }
        Commands::Prompt { text, stream } => {
            let resolved = RelayConfig::resolve(&overrides)?;
            prompt_cmd::run_prompt(&resolved, &text, stream).await?;
        }
        Commands::Repl { stream } => {
            let resolved = RelayConfig::resolve(&overrides)?;
            repl_cmd::run_repl(&resolved, stream).await?;
        }
    }

    Ok(())
}
