//! Command handlers

use crate::cli::context::AppContext;
use crate::cli::input::{self, GateChoice, TerminalAnswer};
use anyhow::{Context, Result};
use crossterm::style::Stylize;
use phasegate_core::models::workflow::{GateAction, PhaseId, VariantStatus};
use phasegate_core::models::{Configuration, LogLevel};
use phasegate_core::strategy::decide;
use phasegate_core::validation::ensure_variant_name;
use phasegate_core::workflow::{
    compare_variants, phase, phases, FileAnswer, Orchestrator, PhaseDefinition, Transition,
};
use phasegate_core::WorkflowError;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Open a locked session on a variant
fn open_session(ctx: &AppContext, variant: &str) -> Result<Orchestrator> {
    let store = ctx.store()?;
    Orchestrator::open(store, ctx.prompts(), variant)
        .with_context(|| format!("Failed to open variant '{}'", variant))
}

/// Interactive sessions read gate choices from stdin, so the first answer cannot come from there too
fn ensure_answer_file_not_stdin(answer_file: Option<&Path>) -> Result<()> {
    if answer_file.is_some_and(|path| path == Path::new("-")) {
        return Err(anyhow::anyhow!(
            "--answer-file - is not supported for interactive sessions; \
             use 'phasegate gate <variant> <decision> --input -' to feed an answer on stdin"
        ));
    }
    Ok(())
}

/// Handle the 'start' command
pub async fn handle_start(
    ctx: &AppContext,
    variant: String,
    answer_file: Option<PathBuf>,
) -> Result<()> {
    ensure_answer_file_not_stdin(answer_file.as_deref())?;
    let mut session = open_session(ctx, &variant)?;
    let existed = session.store().exists(&variant);
    let state = session.resume()?;

    if existed {
        println!(
            "Variant '{}' already exists, continuing at phase {} ({})",
            variant, state.current_phase, state.status
        );
    } else {
        println!("✨ Started variant '{}'", variant);
        println!("   Workspace: {}", ctx.workspace.display());
    }

    run_interactive(&mut session, answer_file).await
}

/// Handle the 'resume' command
pub async fn handle_resume(
    ctx: &AppContext,
    variant: String,
    answer_file: Option<PathBuf>,
    no_interactive: bool,
) -> Result<()> {
    ensure_answer_file_not_stdin(answer_file.as_deref())?;
    ensure_variant_name(&variant)?;
    let store = ctx.store()?;
    if !store.exists(&variant) {
        return Err(anyhow::anyhow!(
            "Variant '{}' not found. Use 'phasegate start {}' to create it.",
            variant,
            variant
        ));
    }

    let mut session = open_session(ctx, &variant)?;
    let state = session.resume()?;
    println!(
        "▶️  Resumed '{}' at phase {} ({})",
        variant, state.current_phase, state.status
    );

    if no_interactive {
        return Ok(());
    }
    run_interactive(&mut session, answer_file).await
}

/// Prompt, answer and gate until the variant is parked, complete or the user quits
async fn run_interactive(session: &mut Orchestrator, answer_file: Option<PathBuf>) -> Result<()> {
    let mut first_answer = answer_file.map(FileAnswer::new);

    loop {
        if session.is_complete() {
            println!(
                "🏁 Variant '{}' is complete. Use 'phasegate compare' to review all variants.",
                session.variant()
            );
            return Ok(());
        }

        let current = session.current_phase();
        print_phase_header(current);
        println!("{}", session.prompt()?);
        println!();

        let answer = match first_answer.take() {
            Some(source) => session.collect_answer(&source).await?,
            None => session.collect_answer(&TerminalAnswer).await?,
        };

        let action = match input::prompt_gate_choice().await? {
            GateChoice::Quit => {
                println!(
                    "Leaving '{}' at phase {} without recording a decision",
                    session.variant(),
                    current.id
                );
                return Ok(());
            }
            GateChoice::Decide(action) => action,
        };
        let notes = input::prompt_notes().await?;

        let content = (action != GateAction::Park).then_some(answer.as_str());
        match session.apply(current.id, action, content, notes) {
            Ok(transition) => {
                print_transition(&transition);
                if action == GateAction::Park {
                    return Ok(());
                }
            }
            Err(WorkflowError::EmptyAnswer(phase)) => {
                println!("⚠️  Phase {} needs an answer before it can be recorded", phase);
            }
            Err(e) => return Err(e.into()),
        }
    }
}

fn print_phase_header(definition: &PhaseDefinition) {
    let title = format!(
        "Phase {}/{}: {}",
        definition.id,
        PhaseId::LAST,
        definition.name
    );
    println!();
    println!("{}", title.bold().cyan());
    println!(
        "{}",
        format!("Output: {} ({})", definition.output_file, definition.format).dark_grey()
    );
    println!();
}

fn print_transition(transition: &Transition) {
    let decision = &transition.decision;
    let definition = phase(decision.phase);

    if let Some(output) = &transition.output {
        if output.is_quarantined() {
            println!(
                "⚠️  Answer was not valid {}; saved with a provenance wrapper in {}",
                definition.format, definition.output_file
            );
        }
    }

    match decision.decision {
        GateAction::Confirm => match transition.to {
            (_, VariantStatus::Complete) => {
                println!("✅ Confirmed phase {} ({})", decision.phase, definition.name);
                println!("🏁 All phases confirmed for '{}'", decision.variant);
            }
            (next, _) => {
                println!("✅ Confirmed phase {} ({})", decision.phase, definition.name);
                println!("   Next: phase {} ({})", next, phase(next).name);
            }
        },
        GateAction::Revise => {
            println!(
                "✏️  Revised phase {} ({}); {} rewritten",
                decision.phase, definition.name, definition.output_file
            );
        }
        GateAction::Park => {
            println!("⏸️  Parked '{}' at phase {}", decision.variant, decision.phase);
            println!(
                "   Use 'phasegate resume {}' to continue",
                decision.variant
            );
        }
    }
}

/// Handle the 'gate' command
pub async fn handle_gate(
    ctx: &AppContext,
    variant: String,
    decision: GateAction,
    input: Option<PathBuf>,
    notes: Option<String>,
    phase_id: Option<u8>,
    json: bool,
) -> Result<()> {
    let mut session = open_session(ctx, &variant)?;

    let requested = match phase_id {
        Some(id) => PhaseId::new(id).ok_or(WorkflowError::PhaseNotFound(id))?,
        None => session.state().current_phase,
    };

    let content = match (decision, input) {
        (GateAction::Park, Some(path)) => {
            tracing::warn!(input = %path.display(), "Ignoring --input for park");
            None
        }
        (GateAction::Park, None) => None,
        (_, Some(path)) => Some(session.collect_answer(&FileAnswer::new(path)).await?),
        (_, None) => {
            return Err(anyhow::anyhow!(
                "--input is required for {} (use '-' to read from stdin)",
                decision.as_str().to_lowercase()
            ));
        }
    };

    let transition = session
        .apply(requested, decision, content.as_deref(), notes)
        .with_context(|| format!("Failed to record {} for '{}'", decision, variant))?;

    if json {
        let output = serde_json::json!({
            "id": transition.decision.id.to_string(),
            "variant": transition.decision.variant,
            "phase": transition.decision.phase,
            "decision": transition.decision.decision,
            "from_phase": transition.from.0,
            "to_phase": transition.to.0,
            "status": transition.to.1,
            "output_file": transition.decision.output_file,
            "quarantined": transition.output.as_ref().is_some_and(|o| o.is_quarantined()),
            "timestamp": transition.decision.timestamp.to_rfc3339(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_transition(&transition);
    }

    Ok(())
}

/// Handle the 'status' command
pub fn handle_status(ctx: &AppContext, variant: String, json: bool) -> Result<()> {
    ensure_variant_name(&variant)?;
    let store = ctx.store()?;
    if !store.exists(&variant) {
        return Err(anyhow::anyhow!(
            "Variant '{}' not found in {}",
            variant,
            ctx.workspace.display()
        ));
    }

    let state = store.load(&variant)?;
    let history = store.audit_trail_for(&variant)?;
    let strategic = store.read_strategic_decision(&variant)?;

    let mut outputs = Vec::new();
    for definition in phases() {
        if store.output_path(&variant, definition.id).is_file() {
            outputs.push(definition);
        }
    }

    if json {
        let output = serde_json::json!({
            "variant": state.variant,
            "current_phase": state.current_phase,
            "phase_name": phase(state.current_phase).name,
            "status": state.status,
            "last_updated": state.last_updated.to_rfc3339(),
            "outputs": outputs.iter().map(|d| d.output_file).collect::<Vec<_>>(),
            "decisions": history,
            "strategic_decision": strategic,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("Variant Status");
    println!("==============");
    println!("Variant:        {}", state.variant);
    println!(
        "Current Phase:  {} ({})",
        state.current_phase,
        phase(state.current_phase).name
    );
    println!("Status:         {}", state.status);
    println!(
        "Last Updated:   {}",
        state.last_updated.format("%Y-%m-%d %H:%M:%S")
    );
    if let Some(strategic) = strategic {
        println!(
            "Strategy:       {} (score {:.2}, confidence {:.1})",
            if strategic.proceed { "proceed" } else { "hold" },
            strategic.score,
            strategic.confidence
        );
    }

    if !outputs.is_empty() {
        println!();
        println!("Outputs:");
        println!("--------");
        for definition in outputs {
            println!("  {:>2}  {}", definition.id, definition.output_file);
        }
    }

    if !history.is_empty() {
        println!();
        println!("Gate Decisions:");
        println!("---------------");
        for entry in history {
            print!(
                "  phase {:>2}  {:<8} at {}",
                entry.phase,
                entry.decision,
                entry.timestamp.format("%Y-%m-%d %H:%M:%S")
            );
            match entry.notes {
                Some(notes) => println!("  ({})", notes),
                None => println!(),
            }
        }
    }

    Ok(())
}

/// Handle the 'phases' command
pub fn handle_phases(json: bool) -> Result<()> {
    let all = phases();

    if json {
        let list: Vec<_> = all
            .iter()
            .map(|d| {
                serde_json::json!({
                    "id": d.id,
                    "name": d.name,
                    "output_file": d.output_file,
                    "format": d.format,
                })
            })
            .collect();
        let output = serde_json::json!({
            "phases": list,
            "count": all.len()
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("Workflow Phases:");
        println!("================");
        for definition in all {
            println!(
                "  {:>2}  {:<26} {}",
                definition.id, definition.name, definition.output_file
            );
        }
    }

    Ok(())
}

/// Handle the 'prompt' command
pub fn handle_prompt(ctx: &AppContext, variant: String, json: bool) -> Result<()> {
    ensure_variant_name(&variant)?;
    let store = ctx.store()?;
    let state = store.load(&variant)?;
    let definition = phase(state.current_phase);

    let previous = store.collect_context(&variant, definition.id)?;
    let prompt = ctx
        .prompts()
        .render_phase(&variant, definition, &previous)
        .with_context(|| format!("Failed to render prompt for phase {}", definition.id))?;

    if json {
        let output = serde_json::json!({
            "variant": variant,
            "phase": definition.id,
            "phase_name": definition.name,
            "status": state.status,
            "output_file": definition.output_file,
            "format": definition.format,
            "prompt": prompt,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("{}", prompt);
    }

    Ok(())
}

/// Handle the 'compare' command
pub fn handle_compare(ctx: &AppContext, json: bool) -> Result<()> {
    let store = ctx.store()?;
    let summaries = compare_variants(&store)?;

    if json {
        let output = serde_json::json!({
            "variants": summaries,
            "count": summaries.len()
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else if summaries.is_empty() {
        println!("No variants in {}", ctx.workspace.display());
        println!();
        println!("Use 'phasegate start <variant>' to begin exploring an idea.");
    } else {
        println!("Variant Comparison:");
        println!("===================");
        println!(
            "  {:<20} {:>5}  {:<26} {:<12} {:>4} {:>4} {:>4}  {}",
            "variant", "phase", "name", "status", "conf", "rev", "park", "strategy"
        );
        for row in summaries {
            let strategy = match &row.strategic_decision {
                Some(d) if d.proceed => format!("proceed ({})", d.band),
                Some(d) => format!("hold ({})", d.band),
                None => "-".to_string(),
            };
            println!(
                "  {:<20} {:>5}  {:<26} {:<12} {:>4} {:>4} {:>4}  {}",
                row.variant,
                row.current_phase,
                row.phase_name,
                row.status,
                row.confirms,
                row.revisions,
                row.parks,
                strategy
            );
        }
    }

    Ok(())
}

/// Handle the 'decide' command
pub fn handle_decide(
    ctx: &AppContext,
    score: f64,
    variant: Option<String>,
    json: bool,
) -> Result<()> {
    let decision = decide(score);

    let recorded = match &variant {
        Some(name) => {
            ensure_variant_name(name)?;
            if !score.is_finite() {
                return Err(anyhow::anyhow!(
                    "Refusing to record a non-finite score ({}) for '{}'",
                    score,
                    name
                ));
            }
            let store = ctx.store()?;
            if !store.exists(name) {
                return Err(anyhow::anyhow!(
                    "Variant '{}' not found. Use 'phasegate start {}' to create it.",
                    name,
                    name
                ));
            }
            Some(store.write_strategic_decision(name, &decision)?)
        }
        None => None,
    };

    if json {
        let mut output = serde_json::to_value(&decision)?;
        if let Some(path) = &recorded {
            output["recorded_to"] = serde_json::json!(path.display().to_string());
        }
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        let verdict = if decision.proceed { "PROCEED" } else { "HOLD" };
        println!("Decision:    {}", verdict);
        println!("Band:        {}", decision.band);
        println!("Confidence:  {:.1}", decision.confidence);
        println!("Reasoning:   {}", decision.reasoning);
        if let Some(path) = recorded {
            println!();
            println!("💾 Recorded to {}", path.display());
        }
    }

    Ok(())
}

/// Synchronous line read for the configuration wizard
fn read_user_input_sync() -> Result<String> {
    let mut buffer = String::new();
    io::stdin()
        .read_line(&mut buffer)
        .context("Failed to read from stdin")?;
    Ok(buffer)
}

fn parse_log_level(input: &str) -> Option<LogLevel> {
    match input.trim().to_lowercase().as_str() {
        "error" => Some(LogLevel::Error),
        "warn" => Some(LogLevel::Warn),
        "info" => Some(LogLevel::Info),
        "debug" => Some(LogLevel::Debug),
        "trace" => Some(LogLevel::Trace),
        _ => None,
    }
}

fn log_level_name(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    }
}

/// Handle the 'config --init' command
pub fn handle_config_init(ctx: &AppContext) -> Result<()> {
    let config_path = &ctx.config_path;

    println!("⚙️  Initializing phasegate configuration");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("📄 Config file: {}", config_path.display());

    let mut config = if config_path.exists() {
        println!("⚠️  Configuration file already exists. Loading existing values...");
        ctx.config.clone()
    } else {
        println!("✨ Creating new configuration with defaults...");
        Configuration::default()
    };

    println!("\n📝 Please answer the following questions (press Enter to use default):\n");

    print!("Workspace directory [{}]: ", config.workspace_dir.display());
    io::stdout().flush()?;
    let workspace_input = read_user_input_sync()?;
    if !workspace_input.trim().is_empty() {
        config.workspace_dir = PathBuf::from(workspace_input.trim());
    }

    print!(
        "Prompt templates directory (\"none\" for built-in) [{}]: ",
        prompts_label(&config)
    );
    io::stdout().flush()?;
    let prompts_input = read_user_input_sync()?;
    match prompts_input.trim() {
        "" => {}
        "none" => config.prompts_dir = None,
        dir => config.prompts_dir = Some(PathBuf::from(dir)),
    }

    print!(
        "Log level (error/warn/info/debug/trace) [{}]: ",
        log_level_name(config.log_level)
    );
    io::stdout().flush()?;
    let log_level_input = read_user_input_sync()?;
    if !log_level_input.trim().is_empty() {
        match parse_log_level(&log_level_input) {
            Some(level) => config.log_level = level,
            None => println!("⚠️  Invalid log level, using default"),
        }
    }

    println!("\n🔍 Validating configuration...");
    match config.validate() {
        Ok(()) => {
            println!("✅ Configuration is valid");
        }
        Err(errors) => {
            println!("❌ Configuration validation failed:");
            for error in &errors {
                println!("   - {}", error);
            }
            return Err(anyhow::anyhow!("Configuration validation failed"));
        }
    }

    println!("\n💾 Saving configuration to {}...", config_path.display());
    config
        .save_to_file(config_path)
        .map_err(|e| anyhow::anyhow!("Failed to save configuration: {}", e))?;

    println!("✅ Configuration saved successfully!");
    println!("\n📋 Configuration summary:");
    println!("   Workspace: {}", config.workspace_dir.display());
    println!("   Prompts: {}", prompts_label(&config));
    println!("   Log level: {}", log_level_name(config.log_level));

    Ok(())
}

fn prompts_label(config: &Configuration) -> String {
    config
        .prompts_dir
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "built-in".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use phasegate_core::models::WorkspaceSource;
    use tempfile::{tempdir, TempDir};

    fn context(dir: &TempDir) -> AppContext {
        AppContext {
            config: Configuration::default(),
            config_path: dir.path().join("config.toml"),
            workspace: dir.path().join("ventures"),
            workspace_source: WorkspaceSource::Flag,
        }
    }

    #[test]
    fn test_parse_log_level() {
        assert_eq!(parse_log_level("DEBUG\n"), Some(LogLevel::Debug));
        assert_eq!(parse_log_level("loud"), None);
        assert_eq!(log_level_name(LogLevel::Warn), "warn");
    }

    #[tokio::test]
    async fn test_start_rejects_answer_file_on_stdin() {
        let dir = tempdir().unwrap();
        let ctx = context(&dir);

        let result = handle_start(&ctx, "v1".to_string(), Some(PathBuf::from("-"))).await;
        let message = result.unwrap_err().to_string();
        assert!(message.contains("--input -"), "{}", message);
        assert!(!ctx.workspace.join("v1").exists());

        let result = handle_resume(&ctx, "v1".to_string(), Some(PathBuf::from("-")), false).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_gate_requires_input_for_confirm() {
        let dir = tempdir().unwrap();
        let ctx = context(&dir);

        let result = handle_gate(
            &ctx,
            "v1".to_string(),
            GateAction::Confirm,
            None,
            None,
            None,
            true,
        )
        .await;
        assert!(result.is_err());
        assert!(!ctx.store().unwrap().exists("v1"));
        assert!(!ctx.workspace.join("v1").exists());
    }

    #[tokio::test]
    async fn test_gate_confirm_then_status() {
        let dir = tempdir().unwrap();
        let ctx = context(&dir);
        let answer = dir.path().join("idea.json");
        std::fs::write(&answer, r#"{"idea": "test"}"#).unwrap();

        handle_gate(
            &ctx,
            "v1".to_string(),
            GateAction::Confirm,
            Some(answer),
            Some("first pass".to_string()),
            Some(0),
            true,
        )
        .await
        .unwrap();

        let state = ctx.store().unwrap().load("v1").unwrap();
        assert_eq!(state.current_phase, PhaseId::new(1).unwrap());
        assert!(handle_status(&ctx, "v1".to_string(), true).is_ok());
    }

    #[test]
    fn test_status_of_unknown_variant_fails() {
        let dir = tempdir().unwrap();
        let ctx = context(&dir);
        assert!(handle_status(&ctx, "ghost".to_string(), false).is_err());
    }

    #[test]
    fn test_decide_records_only_for_existing_variant() {
        let dir = tempdir().unwrap();
        let ctx = context(&dir);

        assert!(handle_decide(&ctx, 75.0, Some("ghost".to_string()), true).is_err());
        assert!(handle_decide(&ctx, 75.0, None, false).is_ok());
    }
}
