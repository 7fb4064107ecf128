//! Workflow data models: phases, variants, gate decisions and phase outputs

use chrono::{DateTime, Utc};
use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Number of phases in the exploration workflow
pub const PHASE_COUNT: usize = 14;

/// Identifier of a phase, always within `0..PHASE_COUNT`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct PhaseId(pub(crate) u8);

impl PhaseId {
    /// First phase of every variant
    pub const FIRST: PhaseId = PhaseId(0);
    /// Final phase; confirming it completes the variant
    pub const LAST: PhaseId = PhaseId(PHASE_COUNT as u8 - 1);

    /// Build a phase id, returning `None` when out of range
    pub fn new(id: u8) -> Option<Self> {
        if (id as usize) < PHASE_COUNT {
            Some(Self(id))
        } else {
            None
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn is_last(self) -> bool {
        self == Self::LAST
    }

    /// The following phase, or `None` at the last phase
    pub fn next(self) -> Option<Self> {
        Self::new(self.0 + 1)
    }
}

impl TryFrom<u8> for PhaseId {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        PhaseId::new(value)
            .ok_or_else(|| format!("phase {} is outside 0-{}", value, PHASE_COUNT - 1))
    }
}

impl From<PhaseId> for u8 {
    fn from(id: PhaseId) -> Self {
        id.0
    }
}

impl fmt::Display for PhaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Expected syntax of a phase's output file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Must parse as JSON, otherwise quarantined
    Json,
    /// Must parse as YAML, otherwise quarantined
    Yaml,
    /// Free text, only checked for emptiness
    Markdown,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Yaml => "yaml",
            OutputFormat::Markdown => "markdown",
        }
    }

    pub fn is_structured(&self) -> bool {
        !matches!(self, OutputFormat::Markdown)
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status of a variant
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum VariantStatus {
    /// Phases are being worked on
    #[default]
    InProgress,
    /// Halted by a Park decision until resumed
    Parked,
    /// Final phase confirmed (terminal)
    Complete,
}

impl VariantStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VariantStatus::InProgress => "in_progress",
            VariantStatus::Parked => "parked",
            VariantStatus::Complete => "complete",
        }
    }
}

impl fmt::Display for VariantStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted progress of one variant (`state.json`)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VariantState {
    /// Variant name, also its directory name
    pub variant: String,
    /// Phase currently awaiting a decision
    pub current_phase: PhaseId,
    /// Lifecycle status
    pub status: VariantStatus,
    /// Time of the last persisted change
    pub last_updated: DateTime<Utc>,
}

impl VariantState {
    /// State of a variant that has never been saved
    pub fn new(variant: impl Into<String>) -> Self {
        Self {
            variant: variant.into(),
            current_phase: PhaseId::FIRST,
            status: VariantStatus::InProgress,
            last_updated: Utc::now(),
        }
    }

    /// The `(current_phase, status)` pair that defines the visible state
    pub fn position(&self) -> (PhaseId, VariantStatus) {
        (self.current_phase, self.status)
    }
}

/// Explicit choice made at a phase gate
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, clap::ValueEnum)]
pub enum GateAction {
    /// Accept the output and move to the next phase
    Confirm,
    /// Replace the output and stay on the same phase
    Revise,
    /// Halt the variant at its current phase
    Park,
}

impl GateAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            GateAction::Confirm => "Confirm",
            GateAction::Revise => "Revise",
            GateAction::Park => "Park",
        }
    }
}

impl fmt::Display for GateAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Audit trail entry; never modified once written
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GateDecision {
    /// Unique entry identifier
    pub id: Uuid,
    /// Variant the decision belongs to
    pub variant: String,
    /// Phase the decision concerns
    pub phase: PhaseId,
    /// Decision taken
    pub decision: GateAction,
    /// When the decision was recorded
    pub timestamp: DateTime<Utc>,
    /// Free-text notes from the decider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Output file written alongside the decision
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_file: Option<String>,
}

impl GateDecision {
    pub fn new(
        variant: impl Into<String>,
        phase: PhaseId,
        decision: GateAction,
        notes: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            variant: variant.into(),
            phase,
            decision,
            timestamp: Utc::now(),
            notes,
            output_file: None,
        }
    }

    pub fn with_output_file(mut self, output_file: impl Into<String>) -> Self {
        self.output_file = Some(output_file.into());
        self
    }
}

/// Provenance wrapper for structured input that failed to parse
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RawEnvelope {
    /// Phase the input was submitted for
    pub phase: PhaseId,
    /// Input exactly as received
    pub raw_input: String,
    /// When the input was quarantined
    pub timestamp: DateTime<Utc>,
    /// Parser message explaining the rejection
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parse_error: Option<String>,
}

/// A phase answer after superficial validation
#[derive(Debug, Clone, PartialEq)]
pub enum PhaseOutput {
    /// Well-formed JSON or YAML, kept exactly as submitted
    Structured(String),
    /// Free-form markdown document
    Document(String),
    /// Malformed structured input kept with provenance
    Quarantined(RawEnvelope),
}

impl PhaseOutput {
    /// Classify an answer according to the phase's expected format
    ///
    /// Structured input is only checked against its own grammar; the text
    /// itself is never rewritten.
    pub fn parse(phase: PhaseId, format: OutputFormat, content: &str) -> Self {
        let checked = match format {
            OutputFormat::Markdown => return PhaseOutput::Document(content.to_string()),
            OutputFormat::Json => serde_json::from_str::<IgnoredAny>(content)
                .map(|_| ())
                .map_err(|e| e.to_string()),
            OutputFormat::Yaml => serde_yaml::from_str::<serde_yaml::Value>(content)
                .map(|_| ())
                .map_err(|e| e.to_string()),
        };

        match checked {
            Ok(()) => PhaseOutput::Structured(content.to_string()),
            Err(error) => PhaseOutput::Quarantined(RawEnvelope {
                phase,
                raw_input: content.to_string(),
                timestamp: Utc::now(),
                parse_error: Some(error),
            }),
        }
    }

    pub fn is_quarantined(&self) -> bool {
        matches!(self, PhaseOutput::Quarantined(_))
    }

    /// Contents of the on-disk file; only the quarantine envelope is serialized
    pub fn render(&self, format: OutputFormat) -> Result<String, String> {
        match (self, format) {
            (PhaseOutput::Structured(text) | PhaseOutput::Document(text), _) => Ok(text.clone()),
            (PhaseOutput::Quarantined(envelope), OutputFormat::Yaml) => {
                serde_yaml::to_string(envelope).map_err(|e| e.to_string())
            }
            (PhaseOutput::Quarantined(envelope), _) => {
                serde_json::to_string_pretty(envelope).map_err(|e| e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variant_status_serialization() {
        let json = serde_json::to_string(&VariantStatus::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");
    }

    #[test]
    fn test_gate_action_serialization() {
        let json = serde_json::to_string(&GateAction::Confirm).unwrap();
        assert_eq!(json, "\"Confirm\"");
    }

    #[test]
    fn test_phase_id_bounds() {
        assert!(PhaseId::new(13).is_some());
        assert!(PhaseId::new(14).is_none());
        assert_eq!(PhaseId::LAST.next(), None);
        assert_eq!(PhaseId::FIRST.next(), PhaseId::new(1));
    }

    #[test]
    fn test_phase_id_rejects_out_of_range_json() {
        let result: Result<PhaseId, _> = serde_json::from_str("14");
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_valid_json_is_structured() {
        let output = PhaseOutput::parse(PhaseId::FIRST, OutputFormat::Json, r#"{"idea": "x"}"#);
        assert_eq!(output, PhaseOutput::Structured(r#"{"idea": "x"}"#.to_string()));
    }

    #[test]
    fn test_json_out_of_range_number_is_still_structured() {
        let content = r#"{"zeta": 1, "alpha": 2, "big": 1e400}"#;
        let output = PhaseOutput::parse(PhaseId::FIRST, OutputFormat::Json, content);
        assert!(!output.is_quarantined());
        assert_eq!(output.render(OutputFormat::Json).unwrap(), content);
    }

    #[test]
    fn test_yaml_complex_keys_are_structured() {
        let output =
            PhaseOutput::parse(PhaseId::new(1).unwrap(), OutputFormat::Yaml, "? [a, b]\n: c\n");
        assert!(!output.is_quarantined());
    }

    #[test]
    fn test_yaml_is_written_verbatim() {
        let content = "# target: dentists only\nzeta: 1\nalpha: 2\n2024: launch\n";
        let output = PhaseOutput::parse(PhaseId::new(1).unwrap(), OutputFormat::Yaml, content);
        assert_eq!(output.render(OutputFormat::Yaml).unwrap(), content);
    }

    #[test]
    fn test_parse_invalid_json_is_quarantined() {
        let output = PhaseOutput::parse(PhaseId::FIRST, OutputFormat::Json, "{not json");
        match output {
            PhaseOutput::Quarantined(envelope) => {
                assert_eq!(envelope.raw_input, "{not json");
                assert!(envelope.parse_error.is_some());
            }
            other => panic!("expected quarantine, got {:?}", other),
        }
    }

    #[test]
    fn test_markdown_is_never_quarantined() {
        let output = PhaseOutput::parse(PhaseId::new(2).unwrap(), OutputFormat::Markdown, "{");
        assert_eq!(output, PhaseOutput::Document("{".to_string()));
    }

    #[test]
    fn test_yaml_scope_renders_back_as_yaml() {
        let phase = PhaseId::new(1).unwrap();
        let output = PhaseOutput::parse(phase, OutputFormat::Yaml, "market: b2b\nregion: eu\n");
        let rendered = output.render(OutputFormat::Yaml).unwrap();
        assert!(rendered.contains("market: b2b"));
    }
}
