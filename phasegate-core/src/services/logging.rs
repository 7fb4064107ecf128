//! Logging service

use crate::models::workflow::{GateDecision, PhaseId};
use crate::models::LogLevel;
use tracing_subscriber::EnvFilter;

/// Initialize logging with the specified level; `RUST_LOG` takes precedence
pub fn init_logging(level: LogLevel) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let default_filter = match level {
        LogLevel::Error => "phasegate=error,phasegate_core=error",
        LogLevel::Warn => "phasegate=warn,phasegate_core=warn",
        LogLevel::Info => "phasegate=info,phasegate_core=info",
        LogLevel::Debug => "phasegate=debug,phasegate_core=debug",
        LogLevel::Trace => "phasegate=trace,phasegate_core=trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()?;

    Ok(())
}

/// Log a recorded gate decision
pub fn log_gate_decision(decision: &GateDecision, from_phase: PhaseId, to_phase: PhaseId) {
    tracing::info!(
        variant = %decision.variant,
        decision = %decision.decision,
        from_phase = from_phase.value(),
        to_phase = to_phase.value(),
        notes = decision.notes.as_deref().unwrap_or(""),
        "Gate decision recorded"
    );
}

/// Log a malformed structured answer that was quarantined instead of rejected
pub fn log_quarantine(variant: &str, phase: PhaseId, parse_error: &str) {
    tracing::warn!(
        variant = variant,
        phase = phase.value(),
        parse_error = parse_error,
        "Malformed phase output wrapped with provenance"
    );
}
