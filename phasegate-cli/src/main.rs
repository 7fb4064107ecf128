mod cli;

use anyhow::Result;
use clap::{Parser, Subcommand};
use cli::context::AppContext;
use cli::handlers;
use phasegate_core::models::workflow::GateAction;
use phasegate_core::models::LogLevel;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "phasegate")]
#[command(version = "0.1.0")]
#[command(about = "Gated phase workflow for exploring venture idea variants")]
#[command(
    help_template = "{name} - {version}\n{about}\n\n{usage-heading}\n  {usage}\n\n{all-args}{options}\n"
)]
struct Cli {
    /// Workspace directory holding one folder per variant
    #[arg(long, global = true)]
    workspace: Option<PathBuf>,

    /// Log level (overridden by RUST_LOG)
    #[arg(long, global = true, value_enum)]
    log_level: Option<LogLevel>,

    /// Path to configuration file (default: ~/.config/phasegate/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start exploring a variant, or continue one that already exists
    ///
    /// Runs the interactive loop: show the phase prompt, collect the answer,
    /// then ask for a gate decision (confirm, revise, park or quit).
    ///
    /// Examples:
    ///   phasegate start dental-scheduling
    ///   phasegate start v1 --answer-file idea.json
    Start {
        /// Variant name
        variant: String,

        /// Read the first answer from a file instead of the terminal (stdin stays reserved for gate choices)
        #[arg(long)]
        answer_file: Option<PathBuf>,
    },

    /// Re-enter a saved variant at its current phase
    ///
    /// A parked variant goes back to in progress.
    Resume {
        /// Variant name
        variant: String,

        /// Read the first answer from a file instead of the terminal (stdin stays reserved for gate choices)
        #[arg(long)]
        answer_file: Option<PathBuf>,

        /// Only re-enter the variant, without starting the interactive loop
        #[arg(long)]
        no_interactive: bool,
    },

    /// Record one gate decision non-interactively
    ///
    /// Examples:
    ///   phasegate gate v1 confirm --input idea.json
    ///   cat scope.yaml | phasegate gate v1 revise --input - --notes "narrower market"
    ///   phasegate gate v1 park --notes "waiting on interviews"
    Gate {
        /// Variant name
        variant: String,

        /// Gate decision
        #[arg(value_enum)]
        decision: GateAction,

        /// Answer file for confirm/revise ("-" for stdin)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Free-text notes stored in the audit trail
        #[arg(short, long)]
        notes: Option<String>,

        /// Phase the decision is for; must equal the current phase
        #[arg(short, long)]
        phase: Option<u8>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Show a variant's position and decision history
    Status {
        /// Variant name
        variant: String,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// List the workflow phases
    Phases {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Print the rendered prompt for a variant's current phase
    Prompt {
        /// Variant name
        variant: String,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Compare progress across all variants in the workspace
    Compare {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Classify an opportunity score into a go/hold decision
    ///
    /// Examples:
    ///   phasegate decide 72.5
    ///   phasegate decide 130 --variant v1 --json
    Decide {
        /// Opportunity score
        #[arg(allow_negative_numbers = true)]
        score: f64,

        /// Record the decision in this variant's folder
        #[arg(long)]
        variant: Option<String>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Configure phasegate settings interactively
    Config {
        /// Start interactive configuration setup
        #[arg(long)]
        init: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let ctx = AppContext::load(cli.config, cli.workspace)?;
    let level = cli.log_level.unwrap_or(ctx.config.log_level);
    if let Err(e) = phasegate_core::services::logging::init_logging(level) {
        eprintln!("Warning: failed to initialise logging: {}", e);
    }

    if let Err(problems) = phasegate_core::workflow::validate_registry() {
        return Err(anyhow::anyhow!(
            "Phase registry is invalid:\n  {}",
            problems.join("\n  ")
        ));
    }

    tracing::debug!(
        workspace = %ctx.workspace.display(),
        source = ?ctx.workspace_source,
        "Resolved workspace"
    );

    match cli.command {
        Commands::Start {
            variant,
            answer_file,
        } => {
            handlers::handle_start(&ctx, variant, answer_file).await?;
        }
        Commands::Resume {
            variant,
            answer_file,
            no_interactive,
        } => {
            handlers::handle_resume(&ctx, variant, answer_file, no_interactive).await?;
        }
        Commands::Gate {
            variant,
            decision,
            input,
            notes,
            phase,
            json,
        } => {
            handlers::handle_gate(&ctx, variant, decision, input, notes, phase, json).await?;
        }
        Commands::Status { variant, json } => {
            handlers::handle_status(&ctx, variant, json)?;
        }
        Commands::Phases { json } => {
            handlers::handle_phases(json)?;
        }
        Commands::Prompt { variant, json } => {
            handlers::handle_prompt(&ctx, variant, json)?;
        }
        Commands::Compare { json } => {
            handlers::handle_compare(&ctx, json)?;
        }
        Commands::Decide {
            score,
            variant,
            json,
        } => {
            handlers::handle_decide(&ctx, score, variant, json)?;
        }
        Commands::Config { init } => {
            if init {
                handlers::handle_config_init(&ctx)?;
            } else {
                println!("Config command requires --init flag");
                println!("Usage: phasegate config --init [--config PATH]");
            }
        }
    }

    Ok(())
}
