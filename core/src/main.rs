//! Sandycode CLI
//!
//! Interactive assistant that writes new scripts or modifies an existing
//! project, running every result in a sandbox before accepting it.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use sandycode::config::Config;
use sandycode::workflow::{Mode, ModifyWorkflow, NewCodeWorkflow, StdTerminal, Terminal};
use sandycode::{AnthropicClient, Isolation, ProjectWalker, Result, Validate};

#[derive(Parser, Debug)]
#[command(name = "sandycode", version, about)]
struct Cli {
    /// Workflow to run: "new" or "modify". Asked interactively if omitted.
    mode: Option<String>,

    /// Path to a TOML config file (default: ./sandycode.toml if present).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Project root for modify mode (default: current directory).
    #[arg(long)]
    project_dir: Option<PathBuf>,

    /// Run interpreters without the user/mount namespace wrapper.
    #[arg(long)]
    no_isolation: bool,

    /// Enable debug logging on stderr.
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("\n❌ {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Runs one interactive session. Returns false if the workflow aborted.
async fn run(cli: Cli) -> Result<bool> {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            tracing::warn!(error = %e, "failed to load .env file");
        }
    }

    let cwd = std::env::current_dir()?;
    let mut config = Config::load(cli.config.as_deref(), &cwd)?;
    if cli.no_isolation {
        config.sandbox.isolation = Isolation::None;
    }
    for warning in config.validate().into_result()? {
        tracing::warn!("{}", warning);
    }

    let mut terminal = StdTerminal::new();
    println!("\n┌──────────────────────────────────┐");
    println!("│ Welcome to Sandycode             │");
    println!("└──────────────────────────────────┘");

    let mode = match cli.mode {
        Some(mode) => mode,
        None => {
            let answer = terminal
                .ask("Enter \"new\" to generate new code or \"modify\" to modify existing code")
                .await?;
            match answer {
                Some(answer) => answer,
                None => return Ok(true),
            }
        }
    };
    let mode: Mode = mode.parse()?;

    let generator = AnthropicClient::new(&config.generator, config.api_key()?);
    let sandbox = config.sandbox.build();
    let max_attempts = config.workflow.max_attempts;

    tracing::info!(%mode, model = generator.model(), "starting session");

    match mode {
        Mode::New => {
            let outcome = NewCodeWorkflow::new(generator, sandbox, cwd)
                .with_max_attempts(max_attempts)
                .run(&mut terminal)
                .await?;
            Ok(outcome.is_success())
        }
        Mode::Modify => {
            let root = cli.project_dir.unwrap_or(cwd);
            let project = ProjectWalker::with_policy(root, &config.project);
            let outcome = ModifyWorkflow::new(generator, sandbox, project)
                .with_max_attempts(max_attempts)
                .run(&mut terminal)
                .await?;
            Ok(outcome.is_success())
        }
    }
}
