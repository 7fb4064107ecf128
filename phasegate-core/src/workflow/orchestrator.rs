//! Gated phase orchestration for a single variant
//!
//! The orchestrator owns a variant's state for the duration of a session.
//! Its position only changes through an explicit gate decision, and every
//! decision is appended to the audit trail before the new state is saved.

use crate::error::{Result, WorkflowError};
use crate::models::workflow::{
    GateAction, GateDecision, PhaseId, PhaseOutput, VariantState, VariantStatus,
};
use crate::services::logging::log_gate_decision;
use crate::validation::ensure_variant_name;
use crate::workflow::answer_source::{AnswerSource, PhaseRequest};
use crate::workflow::lock::VariantLock;
use crate::workflow::persistence::VariantStore;
use crate::workflow::prompts::PromptLibrary;
use crate::workflow::registry::{self, PhaseDefinition};
use chrono::Utc;

/// Result of applying one gate decision
#[derive(Debug, Clone)]
pub struct Transition {
    /// The audit trail entry that was appended
    pub decision: GateDecision,
    /// Position before the decision
    pub from: (PhaseId, VariantStatus),
    /// Position after the decision
    pub to: (PhaseId, VariantStatus),
    /// Output written by the decision (absent for Park)
    pub output: Option<PhaseOutput>,
}

impl Transition {
    pub fn advanced(&self) -> bool {
        self.to.0 > self.from.0
    }
}

/// Drives one variant through the phase workflow
pub struct Orchestrator {
    store: VariantStore,
    prompts: PromptLibrary,
    state: VariantState,
    _lock: VariantLock,
}

impl Orchestrator {
    /// Open a session on a variant, taking its session lock
    ///
    /// Opening never changes the persisted state; call [`Orchestrator::resume`]
    /// to re-enter a parked variant.
    pub fn open(store: VariantStore, prompts: PromptLibrary, variant: &str) -> Result<Self> {
        ensure_variant_name(variant)?;
        let lock = VariantLock::acquire(&store.variant_dir(variant), variant)?;
        let state = store.load(variant)?;

        tracing::info!(
            variant = variant,
            phase = state.current_phase.value(),
            status = %state.status,
            "Opened variant session"
        );

        Ok(Self {
            store,
            prompts,
            state,
            _lock: lock,
        })
    }

    /// Re-enter the variant at its saved phase
    ///
    /// Parked variants return to `in_progress`; complete variants stay complete.
    pub fn resume(&mut self) -> Result<&VariantState> {
        match self.state.status {
            VariantStatus::Parked => {
                let mut next = self.state.clone();
                next.status = VariantStatus::InProgress;
                next.last_updated = Utc::now();
                self.store.save(&self.state.variant, &next)?;
                self.state = next;
                tracing::info!(
                    variant = %self.state.variant,
                    phase = self.state.current_phase.value(),
                    "Resumed parked variant"
                );
            }
            VariantStatus::InProgress => {
                if !self.store.exists(&self.state.variant) {
                    self.store.save(&self.state.variant, &self.state)?;
                    tracing::info!(variant = %self.state.variant, "Created new variant");
                }
            }
            VariantStatus::Complete => {
                tracing::info!(variant = %self.state.variant, "Variant is already complete");
            }
        }
        Ok(&self.state)
    }

    pub fn variant(&self) -> &str {
        &self.state.variant
    }

    pub fn state(&self) -> &VariantState {
        &self.state
    }

    pub fn store(&self) -> &VariantStore {
        &self.store
    }

    /// Definition of the phase awaiting a decision
    pub fn current_phase(&self) -> &'static PhaseDefinition {
        registry::phase(self.state.current_phase)
    }

    pub fn is_complete(&self) -> bool {
        self.state.status == VariantStatus::Complete
    }

    /// Rendered prompt for the current phase, including previous outputs
    pub fn prompt(&self) -> Result<String> {
        let phase = self.current_phase();
        let previous = self.store.collect_context(self.variant(), phase.id)?;
        self.prompts.render_phase(self.variant(), phase, &previous)
    }

    /// Request describing the current phase for an answer source
    pub fn request(&self) -> Result<PhaseRequest> {
        let phase = self.current_phase();
        Ok(PhaseRequest {
            variant: self.variant().to_string(),
            phase: phase.id,
            phase_name: phase.name,
            prompt: self.prompt()?,
        })
    }

    /// Ask a source for the current phase's answer; nothing is persisted
    pub async fn collect_answer(&self, source: &dyn AnswerSource) -> anyhow::Result<String> {
        let request = self.request()?;
        source.answer(&request).await
    }

    /// Confirm the current phase with its answer
    pub fn confirm(&mut self, content: &str, notes: Option<String>) -> Result<Transition> {
        self.apply(self.state.current_phase, GateAction::Confirm, Some(content), notes)
    }

    /// Replace the current phase's answer and stay on the phase
    pub fn revise(&mut self, content: &str, notes: Option<String>) -> Result<Transition> {
        self.apply(self.state.current_phase, GateAction::Revise, Some(content), notes)
    }

    /// Halt the variant at its current phase
    pub fn park(&mut self, notes: Option<String>) -> Result<Transition> {
        self.apply(self.state.current_phase, GateAction::Park, None, notes)
    }

    /// Apply a gate decision for `phase`
    ///
    /// Order of effects: output file, audit trail entry, state file. A
    /// failure at any step leaves the previously saved state authoritative.
    pub fn apply(
        &mut self,
        phase: PhaseId,
        action: GateAction,
        content: Option<&str>,
        notes: Option<String>,
    ) -> Result<Transition> {
        let current = self.state.current_phase;
        if phase != current {
            return Err(WorkflowError::PhaseOutOfOrder {
                variant: self.state.variant.clone(),
                requested: phase,
                current,
            });
        }

        match (self.state.status, action) {
            (VariantStatus::Parked, _) => {
                return Err(WorkflowError::VariantParked(self.state.variant.clone()));
            }
            (VariantStatus::Complete, GateAction::Revise | GateAction::Park) => {
                return Err(WorkflowError::VariantComplete(self.state.variant.clone()));
            }
            _ => {}
        }

        let definition = registry::phase(phase);
        let output = match action {
            GateAction::Confirm | GateAction::Revise => {
                let content = content
                    .filter(|text| !text.trim().is_empty())
                    .ok_or(WorkflowError::EmptyAnswer(phase))?;
                Some(self.store.write_output(&self.state.variant, phase, content)?)
            }
            GateAction::Park => None,
        };

        let mut decision = GateDecision::new(self.state.variant.clone(), phase, action, notes);
        if output.is_some() {
            decision = decision.with_output_file(definition.output_file);
        }
        self.store.append_decision(&decision)?;

        let mut next = self.state.clone();
        match action {
            GateAction::Confirm => match phase.next() {
                Some(following) => {
                    next.current_phase = following;
                    next.status = VariantStatus::InProgress;
                }
                None => next.status = VariantStatus::Complete,
            },
            GateAction::Revise => {}
            GateAction::Park => next.status = VariantStatus::Parked,
        }
        next.last_updated = Utc::now();
        self.store.save(&self.state.variant, &next)?;

        let from = self.state.position();
        self.state = next;
        let to = self.state.position();
        log_gate_decision(&decision, from.0, to.0);

        Ok(Transition {
            decision,
            from,
            to,
            output,
        })
    }
}
