//! Integration tests for the gated phase workflow invariants

use phasegate_core::models::workflow::{GateAction, PhaseId, VariantStatus};
use phasegate_core::strategy::decide;
use phasegate_core::workflow::{Orchestrator, PromptLibrary, VariantStore};
use phasegate_core::WorkflowError;
use tempfile::{tempdir, TempDir};

fn open(dir: &TempDir, variant: &str) -> Orchestrator {
    let store = VariantStore::new(dir.path()).unwrap();
    Orchestrator::open(store, PromptLibrary::default(), variant).unwrap()
}

fn answer_for(phase: PhaseId) -> String {
    match phase.value() {
        1 => "market: b2b\n".to_string(),
        0 | 3..=6 | 8 | 12 => format!("{{\"phase\": {}}}", phase),
        _ => format!("# Notes for phase {}\n", phase),
    }
}

/// Phase never decreases and only moves by one on a Confirm at the current phase
#[test]
fn test_monotonic_advance() {
    let dir = tempdir().unwrap();
    let mut session = open(&dir, "mono");

    let script = [
        GateAction::Revise,
        GateAction::Confirm,
        GateAction::Park,
        GateAction::Confirm,
        GateAction::Revise,
        GateAction::Confirm,
    ];

    let mut last_phase = session.state().current_phase;
    for action in script {
        if session.state().status == VariantStatus::Parked {
            session.resume().unwrap();
        }
        let phase = session.state().current_phase;
        let content = answer_for(phase);
        let transition = session
            .apply(phase, action, Some(&content), None)
            .unwrap();

        let now = session.state().current_phase;
        assert!(now >= last_phase);
        if now > last_phase {
            assert_eq!(action, GateAction::Confirm);
            assert_eq!(now.value(), last_phase.value() + 1);
        }
        assert_eq!(transition.decision.phase, phase);
        last_phase = now;
    }

    assert_eq!(last_phase, PhaseId::new(3).unwrap());
}

/// Earlier reads of the audit trail are always a prefix of later reads
#[test]
fn test_audit_trail_is_append_only() {
    let dir = tempdir().unwrap();
    let mut session = open(&dir, "audit");
    let store = session.store().clone();

    let mut snapshots = vec![store.audit_trail().unwrap()];
    session.confirm(r#"{"idea": "x"}"#, None).unwrap();
    snapshots.push(store.audit_trail().unwrap());
    session.revise("market: a", Some("first pass".into())).unwrap();
    snapshots.push(store.audit_trail().unwrap());
    session.park(None).unwrap();
    snapshots.push(store.audit_trail().unwrap());

    for pair in snapshots.windows(2) {
        let (earlier, later) = (&pair[0], &pair[1]);
        assert_eq!(later.len(), earlier.len() + 1);
        assert_eq!(&later[..earlier.len()], &earlier[..]);
    }
}

/// Loading without operating yields the same position
#[test]
fn test_resume_idempotence() {
    let dir = tempdir().unwrap();
    {
        let mut session = open(&dir, "idem");
        session.confirm(r#"{"idea": "x"}"#, None).unwrap();
        session.park(None).unwrap();
    }

    let store = VariantStore::new(dir.path()).unwrap();
    let first = store.load("idem").unwrap();
    let second = store.load("idem").unwrap();
    assert_eq!(first.position(), second.position());
    assert_eq!(
        first.position(),
        (PhaseId::new(1).unwrap(), VariantStatus::Parked)
    );
}

/// Reading prompts and collecting answers never moves the variant
#[tokio::test]
async fn test_no_silent_auto_advance() {
    let dir = tempdir().unwrap();
    let mut session = open(&dir, "quiet");
    session.confirm(r#"{"idea": "x"}"#, None).unwrap();
    let before = session.state().position();

    let _ = session.prompt().unwrap();
    let _ = session.request().unwrap();
    let source = phasegate_core::workflow::StaticAnswer::new("market: b2b");
    let _ = session.collect_answer(&source).await.unwrap();

    assert_eq!(session.state().position(), before);
    assert_eq!(
        session.store().load("quiet").unwrap().position(),
        before
    );
}

/// Invalid JSON is written as a JSON envelope holding the raw input
#[test]
fn test_malformed_input_tolerance() {
    let dir = tempdir().unwrap();
    let mut session = open(&dir, "messy");

    let raw = "idea: not json at all {";
    let transition = session.confirm(raw, None).unwrap();
    assert!(transition.output.unwrap().is_quarantined());

    let written = session
        .store()
        .read_output("messy", PhaseId::FIRST)
        .unwrap()
        .unwrap();
    let value: serde_json::Value = serde_json::from_str(&written).unwrap();
    assert_eq!(value["raw_input"], raw);
    assert_eq!(value["phase"], 0);
}

/// Threshold classifier boundaries
#[test]
fn test_threshold_classifier_boundaries() {
    assert!(!decide(49.99).proceed);
    assert!(decide(50.0).proceed);
    assert_eq!(decide(50.0).confidence, 0.6);
    assert_eq!(decide(99.99).confidence, 0.6);
    assert!(decide(100.0).proceed);
    assert_eq!(decide(100.0).confidence, 0.8);
}

/// Confirm at the last phase completes the variant and never goes past it
#[test]
fn test_terminal_state() {
    let dir = tempdir().unwrap();
    let mut session = open(&dir, "full");

    while !session.is_complete() {
        let phase = session.state().current_phase;
        session.confirm(&answer_for(phase), None).unwrap();
    }
    assert_eq!(
        session.state().position(),
        (PhaseId::LAST, VariantStatus::Complete)
    );

    let again = session.confirm("# Final comparison, take two\n", None).unwrap();
    assert_eq!(again.to, (PhaseId::LAST, VariantStatus::Complete));
    assert!(matches!(
        session.park(None),
        Err(WorkflowError::VariantComplete(_))
    ));

    let confirms = session
        .store()
        .audit_trail_for("full")
        .unwrap()
        .iter()
        .filter(|d| d.decision == GateAction::Confirm)
        .count();
    assert_eq!(confirms, 15);
}

/// A second session on the same variant fails fast
#[test]
fn test_concurrent_session_is_rejected() {
    let dir = tempdir().unwrap();
    let _first = open(&dir, "shared");

    let store = VariantStore::new(dir.path()).unwrap();
    let second = Orchestrator::open(store, PromptLibrary::default(), "shared");
    assert!(matches!(second, Err(WorkflowError::VariantLocked { .. })));
}
