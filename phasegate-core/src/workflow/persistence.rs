//! Variant state persistence using flat JSON files
//!
//! Every variant owns a directory under the workspace root holding its
//! `state.json` and phase outputs. Gate decisions for all variants go to a
//! single append-only `audit_trail.json` at the workspace root.

use crate::error::{Result, WorkflowError};
use crate::models::workflow::{GateDecision, PhaseId, PhaseOutput, VariantState};
use crate::strategy::StrategicDecision;
use crate::validation::ensure_variant_name;
use crate::workflow::registry::{self, PhaseDefinition};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// File holding a variant's current phase and status
pub const STATE_FILE: &str = "state.json";
/// Workspace-wide append-only decision log
pub const AUDIT_TRAIL_FILE: &str = "audit_trail.json";
/// Sidecar file serialising audit trail appends
pub const AUDIT_LOCK_FILE: &str = "audit_trail.json.lock";
/// Side-effect file written by the strategic decision step
pub const STRATEGIC_DECISION_FILE: &str = "strategic_decision.json";

/// File-backed store for variant state, phase outputs and the audit trail
#[derive(Debug, Clone)]
pub struct VariantStore {
    /// Workspace root directory
    root: PathBuf,
}

impl VariantStore {
    /// Create a store rooted at `root`, creating the directory if needed
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).map_err(|e| WorkflowError::io(&root, e))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory owned by a variant
    pub fn variant_dir(&self, variant: &str) -> PathBuf {
        self.root.join(variant)
    }

    pub fn state_path(&self, variant: &str) -> PathBuf {
        self.variant_dir(variant).join(STATE_FILE)
    }

    pub fn audit_path(&self) -> PathBuf {
        self.root.join(AUDIT_TRAIL_FILE)
    }

    /// Path of a phase's output file for a variant
    pub fn output_path(&self, variant: &str, phase: PhaseId) -> PathBuf {
        registry::output_path(&self.variant_dir(variant), phase)
    }

    /// Whether the variant has ever been saved
    pub fn exists(&self, variant: &str) -> bool {
        self.state_path(variant).is_file()
    }

    /// Load a variant's state; a missing or corrupt file yields a fresh state
    pub fn load(&self, variant: &str) -> Result<VariantState> {
        ensure_variant_name(variant)?;
        let path = self.state_path(variant);

        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(variant = variant, "No saved state, starting new variant");
                return Ok(VariantState::new(variant));
            }
            Err(e) => return Err(WorkflowError::io(&path, e)),
        };

        match serde_json::from_str::<VariantState>(&contents) {
            Ok(mut state) => {
                state.variant = variant.to_string();
                Ok(state)
            }
            Err(e) => {
                tracing::warn!(
                    variant = variant,
                    path = %path.display(),
                    error = %e,
                    "State file is unreadable, treating variant as new"
                );
                Ok(VariantState::new(variant))
            }
        }
    }

    /// Persist a variant's state atomically (temp file, fsync, rename)
    pub fn save(&self, variant: &str, state: &VariantState) -> Result<()> {
        ensure_variant_name(variant)?;
        let dir = self.variant_dir(variant);
        fs::create_dir_all(&dir).map_err(|e| WorkflowError::io(&dir, e))?;

        let json = serde_json::to_string_pretty(state)?;
        write_atomic(&self.state_path(variant), json.as_bytes())?;

        tracing::debug!(
            variant = variant,
            phase = state.current_phase.value(),
            status = %state.status,
            "Saved variant state"
        );
        Ok(())
    }

    /// Append one decision to the audit trail, keeping every prior entry
    pub fn append_decision(&self, decision: &GateDecision) -> Result<()> {
        let _guard = self.lock_audit_trail()?;

        let mut entries = self.read_audit_trail()?;
        entries.push(decision.clone());

        let json = serde_json::to_string_pretty(&entries)?;
        write_atomic(&self.audit_path(), json.as_bytes())?;

        tracing::debug!(
            variant = %decision.variant,
            phase = decision.phase.value(),
            decision = %decision.decision,
            entries = entries.len(),
            "Appended gate decision"
        );
        Ok(())
    }

    /// Every recorded decision, oldest first
    pub fn audit_trail(&self) -> Result<Vec<GateDecision>> {
        self.read_audit_trail()
    }

    /// Recorded decisions for one variant, oldest first
    pub fn audit_trail_for(&self, variant: &str) -> Result<Vec<GateDecision>> {
        Ok(self
            .read_audit_trail()?
            .into_iter()
            .filter(|d| d.variant == variant)
            .collect())
    }

    /// Validate and write a phase answer, quarantining malformed structured input
    pub fn write_output(&self, variant: &str, phase: PhaseId, content: &str) -> Result<PhaseOutput> {
        ensure_variant_name(variant)?;
        let definition = registry::phase(phase);
        let output = PhaseOutput::parse(phase, definition.format, content);

        if let PhaseOutput::Quarantined(envelope) = &output {
            crate::services::logging::log_quarantine(
                variant,
                phase,
                envelope.parse_error.as_deref().unwrap_or("unknown parse error"),
            );
        }

        let rendered = output
            .render(definition.format)
            .map_err(WorkflowError::Serialization)?;

        let dir = self.variant_dir(variant);
        fs::create_dir_all(&dir).map_err(|e| WorkflowError::io(&dir, e))?;
        write_atomic(&self.output_path(variant, phase), rendered.as_bytes())?;

        tracing::info!(
            variant = variant,
            phase = phase.value(),
            file = definition.output_file,
            "Wrote phase output"
        );
        Ok(output)
    }

    /// Raw contents of a phase's output file, if it has been written
    pub fn read_output(&self, variant: &str, phase: PhaseId) -> Result<Option<String>> {
        let path = self.output_path(variant, phase);
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(WorkflowError::io(&path, e)),
        }
    }

    /// Outputs of all phases before `phase` that have been written
    pub fn collect_context(
        &self,
        variant: &str,
        phase: PhaseId,
    ) -> Result<Vec<(&'static PhaseDefinition, String)>> {
        let mut context = Vec::new();
        for definition in registry::phases()
            .iter()
            .take_while(|definition| definition.id < phase)
        {
            if let Some(contents) = self.read_output(variant, definition.id)? {
                context.push((definition, contents));
            }
        }
        Ok(context)
    }

    /// Names of all variants with a saved state, sorted
    pub fn list_variants(&self) -> Result<Vec<String>> {
        let entries = fs::read_dir(&self.root).map_err(|e| WorkflowError::io(&self.root, e))?;

        let mut variants = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| WorkflowError::io(&self.root, e))?;
            if !entry.path().join(STATE_FILE).is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                variants.push(name.to_string());
            }
        }
        variants.sort();
        Ok(variants)
    }

    /// Record the outcome of the strategic decision step for a variant
    pub fn write_strategic_decision(
        &self,
        variant: &str,
        decision: &StrategicDecision,
    ) -> Result<PathBuf> {
        ensure_variant_name(variant)?;
        let dir = self.variant_dir(variant);
        fs::create_dir_all(&dir).map_err(|e| WorkflowError::io(&dir, e))?;

        let path = dir.join(STRATEGIC_DECISION_FILE);
        let json = serde_json::to_string_pretty(decision)?;
        write_atomic(&path, json.as_bytes())?;
        Ok(path)
    }

    pub fn read_strategic_decision(&self, variant: &str) -> Result<Option<StrategicDecision>> {
        let path = self.variant_dir(variant).join(STRATEGIC_DECISION_FILE);
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(serde_json::from_str(&contents)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(WorkflowError::io(&path, e)),
        }
    }

    fn read_audit_trail(&self) -> Result<Vec<GateDecision>> {
        let path = self.audit_path();
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(WorkflowError::io(&path, e)),
        };

        if contents.trim().is_empty() {
            return Ok(Vec::new());
        }

        serde_json::from_str(&contents).map_err(|e| {
            WorkflowError::Serialization(format!(
                "audit trail {} is corrupt: {}",
                path.display(),
                e
            ))
        })
    }

    /// Exclusive lock held for the duration of an append
    fn lock_audit_trail(&self) -> Result<File> {
        let path = self.root.join(AUDIT_LOCK_FILE);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| WorkflowError::io(&path, e))?;

        file.lock_exclusive()
            .map_err(|e| WorkflowError::io(&path, e))?;

        // Released when the returned file is dropped
        Ok(file)
    }
}

/// Replace `path` with `contents` without ever exposing a partial file
fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("output");
    let tmp_path = path.with_file_name(format!(".{}.tmp", file_name));

    {
        let mut file = File::create(&tmp_path).map_err(|e| WorkflowError::io(&tmp_path, e))?;
        file.write_all(contents)
            .map_err(|e| WorkflowError::io(&tmp_path, e))?;
        file.sync_all()
            .map_err(|e| WorkflowError::io(&tmp_path, e))?;
    }

    fs::rename(&tmp_path, path).map_err(|e| WorkflowError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::workflow::{GateAction, VariantStatus};
    use tempfile::tempdir;

    #[test]
    fn test_load_missing_variant_returns_default() {
        let dir = tempdir().unwrap();
        let store = VariantStore::new(dir.path()).unwrap();

        let state = store.load("fresh").unwrap();
        assert_eq!(state.position(), (PhaseId::FIRST, VariantStatus::InProgress));
        assert!(!store.exists("fresh"));
    }

    #[test]
    fn test_save_and_reload_state() {
        let dir = tempdir().unwrap();
        let store = VariantStore::new(dir.path()).unwrap();

        let mut state = VariantState::new("v1");
        state.current_phase = PhaseId::new(4).unwrap();
        state.status = VariantStatus::Parked;
        store.save("v1", &state).unwrap();

        let loaded = store.load("v1").unwrap();
        assert_eq!(loaded, state);
        assert!(!dir.path().join("v1").join(".state.json.tmp").exists());
    }

    #[test]
    fn test_corrupt_state_is_treated_as_new() {
        let dir = tempdir().unwrap();
        let store = VariantStore::new(dir.path()).unwrap();
        fs::create_dir_all(dir.path().join("broken")).unwrap();
        fs::write(dir.path().join("broken").join(STATE_FILE), "{\"current_phase\": 3,").unwrap();

        let state = store.load("broken").unwrap();
        assert_eq!(state.current_phase, PhaseId::FIRST);
    }

    #[test]
    fn test_out_of_range_phase_in_state_is_treated_as_new() {
        let dir = tempdir().unwrap();
        let store = VariantStore::new(dir.path()).unwrap();
        fs::create_dir_all(dir.path().join("v9")).unwrap();
        fs::write(
            dir.path().join("v9").join(STATE_FILE),
            r#"{"variant":"v9","current_phase":20,"status":"in_progress","last_updated":"2024-01-01T00:00:00Z"}"#,
        )
        .unwrap();

        let state = store.load("v9").unwrap();
        assert_eq!(state.current_phase, PhaseId::FIRST);
    }

    #[test]
    fn test_invalid_variant_name_is_rejected() {
        let dir = tempdir().unwrap();
        let store = VariantStore::new(dir.path()).unwrap();
        assert!(matches!(
            store.load("../outside"),
            Err(WorkflowError::InvalidVariantName { .. })
        ));
    }

    #[test]
    fn test_append_decision_preserves_prior_entries() {
        let dir = tempdir().unwrap();
        let store = VariantStore::new(dir.path()).unwrap();

        let first = GateDecision::new("v1", PhaseId::FIRST, GateAction::Confirm, None);
        store.append_decision(&first).unwrap();
        let before = store.audit_trail().unwrap();

        let second = GateDecision::new(
            "v2",
            PhaseId::FIRST,
            GateAction::Park,
            Some("waiting on data".to_string()),
        );
        store.append_decision(&second).unwrap();
        let after = store.audit_trail().unwrap();

        assert_eq!(after.len(), 2);
        assert_eq!(&after[..before.len()], &before[..]);
        assert_eq!(store.audit_trail_for("v2").unwrap(), vec![second]);
    }

    #[test]
    fn test_write_output_quarantines_invalid_json() {
        let dir = tempdir().unwrap();
        let store = VariantStore::new(dir.path()).unwrap();

        let output = store
            .write_output("v1", PhaseId::FIRST, "{\"idea\": oops")
            .unwrap();
        assert!(output.is_quarantined());

        let written = store.read_output("v1", PhaseId::FIRST).unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&written).unwrap();
        assert_eq!(value["raw_input"], "{\"idea\": oops");
        assert_eq!(value["phase"], 0);
        assert!(value["timestamp"].is_string());
    }

    #[test]
    fn test_write_output_keeps_markdown_verbatim() {
        let dir = tempdir().unwrap();
        let store = VariantStore::new(dir.path()).unwrap();
        let phase = PhaseId::new(2).unwrap();

        store.write_output("v1", phase, "# Plan\n- interview 5 dentists\n").unwrap();
        assert_eq!(
            store.read_output("v1", phase).unwrap().unwrap(),
            "# Plan\n- interview 5 dentists\n"
        );
    }

    #[test]
    fn test_write_output_keeps_structured_answers_verbatim() {
        let dir = tempdir().unwrap();
        let store = VariantStore::new(dir.path()).unwrap();

        let scope = "# target: dentists only\nzeta: 1\nalpha: 2\n2024: launch\n";
        let scope_phase = PhaseId::new(1).unwrap();
        let output = store.write_output("v1", scope_phase, scope).unwrap();
        assert!(!output.is_quarantined());
        assert_eq!(store.read_output("v1", scope_phase).unwrap().unwrap(), scope);

        let intake = r#"{"zeta":1,"alpha":2,"big":1e400}"#;
        let output = store.write_output("v1", PhaseId::FIRST, intake).unwrap();
        assert!(!output.is_quarantined());
        assert_eq!(store.read_output("v1", PhaseId::FIRST).unwrap().unwrap(), intake);
    }

    #[test]
    fn test_collect_context_only_includes_earlier_phases() {
        let dir = tempdir().unwrap();
        let store = VariantStore::new(dir.path()).unwrap();

        store.write_output("v1", PhaseId::FIRST, r#"{"idea": "x"}"#).unwrap();
        store
            .write_output("v1", PhaseId::new(2).unwrap(), "plan")
            .unwrap();

        let context = store.collect_context("v1", PhaseId::new(2).unwrap()).unwrap();
        assert_eq!(context.len(), 1);
        assert_eq!(context[0].0.id, PhaseId::FIRST);
    }

    #[test]
    fn test_list_variants_only_returns_saved_variants() {
        let dir = tempdir().unwrap();
        let store = VariantStore::new(dir.path()).unwrap();

        store.save("beta", &VariantState::new("beta")).unwrap();
        store.save("alpha", &VariantState::new("alpha")).unwrap();
        fs::create_dir_all(dir.path().join("scratch")).unwrap();

        assert_eq!(store.list_variants().unwrap(), vec!["alpha", "beta"]);
    }
}
