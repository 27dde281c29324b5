//! Rule and session feedback flows

mod common;

use std::sync::Arc;

use anyhow::Result;
use arc_trainer::feedback::{FeedbackError, FeedbackService};
use arc_trainer::ids;
use arc_trainer_kg::{Domain, FeedbackStatus, KnowledgeStore, MemoryStore, OntologyRule, SessionFeedback};
use common::ScriptedModel;

async fn store_with_rule() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    store
        .upsert_ontology_rule(&OntologyRule {
            id: "rule_contract".to_string(),
            cnl_rule: "A minor cannot sign a contract.".to_string(),
            prolog_rule: "cannot_sign(X) :- minor(X).".to_string(),
            domain: Domain::Legal,
        })
        .await
        .unwrap();
    store
}

// ============================================================================
// Rule feedback
// ============================================================================

#[tokio::test]
async fn test_feedback_id_is_derived_from_text() -> Result<()> {
    let store = store_with_rule().await;
    let service = FeedbackService::new(Arc::new(ScriptedModel::new(&[])), store.clone());

    let text = "Emancipated minors can sign.";
    let feedback = service
        .store_feedback("rule_contract", text, "user-1", Domain::Legal)
        .await?;
    assert_eq!(feedback.id, ids::feedback_id(text));
    assert_eq!(feedback.status, FeedbackStatus::Pending);
    assert_eq!(store.feedback_status(&feedback.id).await, Some(FeedbackStatus::Pending));
    Ok(())
}

#[tokio::test]
async fn test_empty_feedback_is_rejected() {
    let store = store_with_rule().await;
    let service = FeedbackService::new(Arc::new(ScriptedModel::new(&[])), store);

    let err = service
        .store_feedback("rule_contract", "   ", "user-1", Domain::Legal)
        .await
        .unwrap_err();
    assert_eq!(err.downcast_ref::<FeedbackError>(), Some(&FeedbackError::EmptyFeedback));
}

#[tokio::test]
async fn test_feedback_on_unknown_rule_fails() {
    let store = store_with_rule().await;
    let service = FeedbackService::new(Arc::new(ScriptedModel::new(&[])), store);

    assert!(service
        .store_feedback("rule_missing", "Too strict", "user-1", Domain::Legal)
        .await
        .is_err());
}

#[tokio::test]
async fn test_refinement_rewrites_rule_and_processes_feedback() -> Result<()> {
    let store = store_with_rule().await;
    let llm = Arc::new(ScriptedModel::new(&[
        "A minor cannot sign a contract unless emancipated.",
        "cannot_sign(X) :- minor(X), \\+ emancipated(X).",
    ]));
    let service = FeedbackService::new(llm.clone(), store.clone());

    let feedback = service
        .store_feedback("rule_contract", "Emancipated minors can sign.", "user-1", Domain::Legal)
        .await?;
    let refinement = service.refine_rule("rule_contract", Domain::Legal).await?;

    assert_eq!(refinement.feedback_processed, 1);
    assert_eq!(
        refinement.updated_prolog_rule,
        "cannot_sign(X) :- minor(X), \\+ emancipated(X)."
    );

    let prompts = llm.prompts();
    assert!(prompts[0].starts_with("Improve this ontology rule based on user feedback: Emancipated minors can sign."));
    assert!(prompts[0].contains("Current rule: A minor cannot sign a contract."));
    assert_eq!(
        prompts[1],
        "Convert this refined rule into Prolog: A minor cannot sign a contract unless emancipated."
    );

    let rule = store.get_ontology_rule("rule_contract").await?.unwrap();
    assert_eq!(rule.cnl_rule, "A minor cannot sign a contract unless emancipated.");
    assert_eq!(store.feedback_status(&feedback.id).await, Some(FeedbackStatus::Processed));
    Ok(())
}

#[tokio::test]
async fn test_refinement_without_pending_feedback() {
    let store = store_with_rule().await;
    let llm = Arc::new(ScriptedModel::always("unused"));
    let service = FeedbackService::new(llm.clone(), store);

    let err = service.refine_rule("rule_contract", Domain::Legal).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<FeedbackError>(),
        Some(FeedbackError::NoPendingFeedback { .. })
    ));
    assert!(llm.prompts().is_empty());
}

#[tokio::test]
async fn test_feedback_in_other_domain_is_not_pending() -> Result<()> {
    let store = store_with_rule().await;
    let service = FeedbackService::new(Arc::new(ScriptedModel::always("x")), store);

    service
        .store_feedback("rule_contract", "Clarify wording", "user-2", Domain::Legal)
        .await?;
    assert!(service.refine_rule("rule_contract", Domain::Finance).await.is_err());
    Ok(())
}

// ============================================================================
// Session feedback and corrections
// ============================================================================

#[tokio::test]
async fn test_task_corrections_validate_matching_rules() -> Result<()> {
    let store = Arc::new(MemoryStore::new());
    store
        .store_validated_rule("rule_swap", "swap(X, Y) :- colour(X, 0), colour(Y, 1).")
        .await?;
    store
        .store_validated_rule("rule_other", "rotate(G, R) :- turn(G, R).")
        .await?;
    let service = FeedbackService::new(Arc::new(ScriptedModel::new(&[])), store.clone());

    let feedback = SessionFeedback::new("Colours were swapped")
        .for_task("invert")
        .with_rating(4)
        .with_correction("colour(X, 0)");
    service.submit_session_feedback("session-1", &feedback).await?;

    assert_eq!(service.integrate_corrections("invert").await?, 1);
    assert_eq!(service.update_from_session("session-1").await?, 1);

    let dashboard = store.dashboard_report().await?;
    assert_eq!(dashboard.causal_validation.get("rule_swap"), Some(&true));
    assert_eq!(dashboard.causal_validation.get("rule_other"), None);
    Ok(())
}

#[tokio::test]
async fn test_unknown_session_validates_nothing() -> Result<()> {
    let store = Arc::new(MemoryStore::new());
    let service = FeedbackService::new(Arc::new(ScriptedModel::new(&[])), store);

    assert_eq!(service.update_from_session("nobody").await?, 0);
    assert_eq!(service.integrate_corrections("nothing").await?, 0);
    Ok(())
}
