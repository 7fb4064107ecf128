//! Cross-variant comparison (read-only)

use crate::error::Result;
use crate::models::workflow::{GateAction, PhaseId, VariantStatus};
use crate::strategy::StrategicDecision;
use crate::workflow::persistence::VariantStore;
use crate::workflow::registry;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// One row of the comparison table
#[derive(Debug, Clone, Serialize)]
pub struct VariantSummary {
    pub variant: String,
    pub current_phase: PhaseId,
    pub phase_name: &'static str,
    pub status: VariantStatus,
    pub last_updated: DateTime<Utc>,
    /// Number of Confirm decisions recorded
    pub confirms: usize,
    /// Number of Revise decisions recorded
    pub revisions: usize,
    /// Number of Park decisions recorded
    pub parks: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategic_decision: Option<StrategicDecision>,
}

/// Summarise every saved variant in the workspace
pub fn compare_variants(store: &VariantStore) -> Result<Vec<VariantSummary>> {
    let trail = store.audit_trail()?;
    let mut summaries = Vec::new();

    for variant in store.list_variants()? {
        let state = store.load(&variant)?;
        let count = |action: GateAction| {
            trail
                .iter()
                .filter(|d| d.variant == variant && d.decision == action)
                .count()
        };

        summaries.push(VariantSummary {
            current_phase: state.current_phase,
            phase_name: registry::phase(state.current_phase).name,
            status: state.status,
            last_updated: state.last_updated,
            confirms: count(GateAction::Confirm),
            revisions: count(GateAction::Revise),
            parks: count(GateAction::Park),
            strategic_decision: store.read_strategic_decision(&variant)?,
            variant,
        });
    }

    Ok(summaries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::orchestrator::Orchestrator;
    use crate::workflow::prompts::PromptLibrary;
    use tempfile::tempdir;

    #[test]
    fn test_compare_counts_decisions_per_variant() {
        let dir = tempdir().unwrap();
        let store = VariantStore::new(dir.path()).unwrap();

        {
            let mut a = Orchestrator::open(store.clone(), PromptLibrary::default(), "alpha").unwrap();
            a.confirm(r#"{"idea": "a"}"#, None).unwrap();
            a.revise("market: smb", None).unwrap();
            a.confirm("market: smb\nregion: us", None).unwrap();
        }
        {
            let mut b = Orchestrator::open(store.clone(), PromptLibrary::default(), "beta").unwrap();
            b.park(None).unwrap();
        }
        store
            .write_strategic_decision("alpha", &crate::strategy::decide(120.0))
            .unwrap();

        let rows = compare_variants(&store).unwrap();
        assert_eq!(rows.len(), 2);

        let alpha = &rows[0];
        assert_eq!(alpha.variant, "alpha");
        assert_eq!(alpha.current_phase, PhaseId::new(2).unwrap());
        assert_eq!(alpha.phase_name, "Research Planning");
        assert_eq!((alpha.confirms, alpha.revisions, alpha.parks), (2, 1, 0));
        assert!(alpha.strategic_decision.as_ref().unwrap().proceed);

        let beta = &rows[1];
        assert_eq!(beta.status, VariantStatus::Parked);
        assert_eq!(beta.parks, 1);
        assert!(beta.strategic_decision.is_none());
    }

    #[test]
    fn test_compare_empty_workspace() {
        let dir = tempdir().unwrap();
        let store = VariantStore::new(dir.path()).unwrap();
        assert!(compare_variants(&store).unwrap().is_empty());
    }
}
