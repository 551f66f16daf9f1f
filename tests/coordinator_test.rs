use contract_drafter::llm::mock::RoutedModel;
use contract_drafter::llm::MemoryPromptStore;
use contract_drafter::{Coordinator, Document, RetryPolicy, SectionKind, Session, SessionState};
use serde_json::json;
use std::sync::Arc;

fn prompts() -> MemoryPromptStore {
    MemoryPromptStore::new()
        .with("classify", "CLASSIFY SECTIONS")
        .with("post_response", "ACKNOWLEDGE TURN")
        .with("metainfo", "DRAFT METAINFO")
        .with("data_models", "DRAFT DATA MODELS")
        .with("terms", "DRAFT TERMS")
        .with("servicelevels", "DRAFT SERVICE LEVELS")
        .with("definitions", "DRAFT DEFINITIONS")
        .with("server_type", "CLASSIFY SERVER TYPES")
        .with("s3_server", "DRAFT S3 SERVER")
        .with("redshift_server", "DRAFT REDSHIFT SERVER")
}

const CUSTOMERS: &str = r#"{"data_models": {"customers": {
    "type": "table",
    "description": "Customer demographics",
    "fields": {
        "customer_id": {"type": "string", "description": "id", "primaryKey": true},
        "age": {"type": "integer", "description": "age in years"}
    }
}}}"#;

#[tokio::test]
async fn test_customer_table_request_fills_models_and_metainfo() {
    let model = Arc::new(
        RoutedModel::new()
            .route("CLASSIFY SECTIONS", "data_models, metainfo")
            .route("DRAFT DATA MODELS", CUSTOMERS)
            .route("DRAFT METAINFO", r#"{"metainfo": {"title": "Customer contract", "owner": "crm"}}"#)
            .route("ACKNOWLEDGE TURN", "I drafted the customer table and the contract info."),
    );
    let coordinator = Coordinator::new(model.clone(), &prompts(), RetryPolicy::fast());
    let mut session = Session::new(coordinator);

    let state = session
        .invoke("Create a data contract for a customer table with demographic fields")
        .await;

    assert_eq!(state.selected, vec![SectionKind::DataModels, SectionKind::MetaInfo]);
    assert!(state.error.is_none(), "unexpected error: {:?}", state.error);
    let models = state.document.data_models.as_ref().unwrap();
    assert!(models["customers"].fields.len() >= 1);
    assert_eq!(state.document.metainfo.as_ref().unwrap().title, "Customer contract");
    assert_eq!(
        state.last_reply(),
        Some("I drafted the customer table and the contract info.")
    );
    // one user turn and one acknowledgment
    assert_eq!(state.messages.len(), 2);
}

#[tokio::test]
async fn test_unselected_sections_are_left_untouched() {
    let model = Arc::new(
        RoutedModel::new()
            .route("CLASSIFY SECTIONS", "metainfo")
            .route("DRAFT METAINFO", r#"{"metainfo": {"title": "Orders", "version": "1.0.0"}}"#)
            .route("ACKNOWLEDGE TURN", "Updated the title."),
    );
    let seed: serde_json::Value = serde_json::from_str(CUSTOMERS).unwrap();
    let document = Document::from_seed(&seed);
    let before = serde_json::to_string(&document.data_models).unwrap();

    let coordinator = Coordinator::new(model.clone(), &prompts(), RetryPolicy::fast());
    let state = coordinator
        .run_turn(SessionState::with_document(document), "call it Orders, version 1.0.0")
        .await;

    assert_eq!(serde_json::to_string(&state.document.data_models).unwrap(), before);
    let info = state.document.metainfo.as_ref().unwrap();
    assert_eq!(info.title, "Orders");
    assert_eq!(info.version.as_deref(), Some("1.0.0"));
    assert!(model.requests_for("DRAFT DATA MODELS").is_empty());
}

#[tokio::test]
async fn test_unknown_section_is_reported_but_known_ones_run() {
    let model = Arc::new(
        RoutedModel::new()
            .route("CLASSIFY SECTIONS", "data_model, unknown_section")
            .route("DRAFT DATA MODELS", CUSTOMERS)
            .route("ACKNOWLEDGE TURN", "Done."),
    );
    let coordinator = Coordinator::new(model.clone(), &prompts(), RetryPolicy::fast());
    let state = coordinator.run_turn(SessionState::new(), "add a customers table").await;

    assert_eq!(state.selected, vec![SectionKind::DataModels]);
    assert!(state.error.as_deref().unwrap().contains("unknown_section"));
    assert!(state.document.data_models.as_ref().unwrap().contains_key("customers"));
    assert!(state.document.metainfo.is_none());
}

#[tokio::test]
async fn test_prior_section_is_sent_with_the_latest_turn() {
    let model = Arc::new(
        RoutedModel::new()
            .route("CLASSIFY SECTIONS", "terms")
            .route("DRAFT TERMS", r#"{"terms": {"usage": "analytics", "billing": "free"}}"#)
            .route("ACKNOWLEDGE TURN", "Billing added."),
    );
    let mut document = Document::with_id("urn:datacontract:orders");
    document.set(contract_drafter::SectionData::normalize(
        SectionKind::Terms,
        &json!({"usage": "analytics"}),
    ));

    let coordinator = Coordinator::new(model.clone(), &prompts(), RetryPolicy::fast());
    let state = coordinator
        .run_turn(SessionState::with_document(document), "billing is free")
        .await;

    let requests = model.requests_for("DRAFT TERMS");
    assert_eq!(requests.len(), 1);
    let last = requests[0].last().unwrap();
    assert!(last.content.starts_with("billing is free"));
    assert!(last.content.contains("Update the contract based on this existing data:"));
    assert!(last.content.contains("\"usage\": \"analytics\""));
    assert_eq!(state.document.terms.as_ref().unwrap().billing.as_deref(), Some("free"));
}

#[tokio::test]
async fn test_failed_worker_keeps_existing_section() {
    let model = Arc::new(
        RoutedModel::new()
            .route("CLASSIFY SECTIONS", "terms")
            .route_error("DRAFT TERMS", "429 too many requests")
            .route("ACKNOWLEDGE TURN", "Sorry, terms unchanged."),
    );
    let mut document = Document::with_id("urn:datacontract:orders");
    document.set(contract_drafter::SectionData::normalize(
        SectionKind::Terms,
        &json!({"usage": "internal only"}),
    ));

    let coordinator = Coordinator::new(model.clone(), &prompts(), RetryPolicy::fast());
    let state = coordinator
        .run_turn(SessionState::with_document(document), "change the terms")
        .await;

    assert_eq!(model.requests_for("DRAFT TERMS").len(), 3);
    assert_eq!(
        state.document.terms.as_ref().unwrap().usage.as_deref(),
        Some("internal only")
    );
    assert!(state.error.as_deref().unwrap().contains("could not be updated"));
}

#[tokio::test]
async fn test_failed_worker_on_empty_slot_uses_default() {
    let model = Arc::new(
        RoutedModel::new()
            .route("CLASSIFY SECTIONS", "data_models")
            .route("DRAFT DATA MODELS", "I cannot produce JSON today")
            .route("ACKNOWLEDGE TURN", "Placeholder models added."),
    );
    let coordinator = Coordinator::new(model.clone(), &prompts(), RetryPolicy::fast());
    let state = coordinator.run_turn(SessionState::new(), "a table please").await;

    let models = state.document.data_models.as_ref().unwrap();
    assert!(!models.is_empty());
    assert!(state.error.as_deref().unwrap().contains("default content"));
}

#[tokio::test]
async fn test_acknowledgment_failure_falls_back_to_summary() {
    let model = Arc::new(
        RoutedModel::new()
            .route("CLASSIFY SECTIONS", "metainfo")
            .route("DRAFT METAINFO", r#"{"metainfo": {"title": "Orders"}}"#)
            .route_error("ACKNOWLEDGE TURN", "connection reset"),
    );
    let coordinator = Coordinator::new(model, &prompts(), RetryPolicy::fast());
    let state = coordinator.run_turn(SessionState::new(), "title is Orders").await;

    assert_eq!(state.last_reply(), Some("Updated contract sections: metainfo."));
    assert_eq!(state.document.metainfo.as_ref().unwrap().title, "Orders");
    assert!(state.error.as_deref().unwrap().contains("acknowledgment failed"));
}

#[tokio::test]
async fn test_acknowledgment_sees_recent_user_turns_only() {
    let model = Arc::new(
        RoutedModel::new()
            .route("CLASSIFY SECTIONS", "")
            .route("ACKNOWLEDGE TURN", "Noted."),
    );
    let coordinator = Coordinator::new(model.clone(), &prompts(), RetryPolicy::fast());
    let mut session = Session::new(coordinator);
    for turn in ["one", "two", "three", "four"] {
        session.invoke(turn).await;
    }

    let acks = model.requests_for("ACKNOWLEDGE TURN");
    let last = acks.last().unwrap();
    let contents: Vec<&str> = last.iter().skip(1).map(|m| m.content.as_str()).collect();
    assert_eq!(contents, vec!["two", "three", "four"]);
    assert_eq!(session.state().messages.len(), 8);
    assert!(session.document().is_blank());
}

#[tokio::test]
async fn test_error_slot_resets_each_turn() {
    let model = Arc::new(
        RoutedModel::new()
            .route("CLASSIFY SECTIONS", "metainfo")
            .route("DRAFT METAINFO", r#"{"metainfo": {"title": "Orders"}}"#)
            .route("ACKNOWLEDGE TURN", "Done."),
    );
    let coordinator = Coordinator::new(model, &prompts(), RetryPolicy::fast());
    let mut session = Session::new(coordinator);

    assert!(session.invoke("  ").await.error.is_some());
    assert!(session.invoke("title is Orders").await.error.is_none());
}

#[tokio::test]
async fn test_reply_without_usable_content_keeps_existing_sections() {
    let model = Arc::new(
        RoutedModel::new()
            .route("CLASSIFY SECTIONS", "terms, data_models")
            .route("DRAFT TERMS", r#"{"terms": "n/a"}"#)
            .route("DRAFT DATA MODELS", r#"{"data_models": [{"type": "table"}]}"#)
            .route("ACKNOWLEDGE TURN", "Nothing changed."),
    );
    let seed: serde_json::Value = serde_json::from_str(CUSTOMERS).unwrap();
    let mut document = Document::from_seed(&seed);
    document.set(contract_drafter::SectionData::normalize(
        SectionKind::Terms,
        &json!({"usage": "internal only"}),
    ));

    let coordinator = Coordinator::new(model.clone(), &prompts(), RetryPolicy::fast());
    let state = coordinator
        .run_turn(SessionState::with_document(document), "tweak terms and models")
        .await;

    assert_eq!(model.requests_for("DRAFT TERMS").len(), 3);
    assert_eq!(model.requests_for("DRAFT DATA MODELS").len(), 3);
    assert_eq!(
        state.document.terms.as_ref().unwrap().usage.as_deref(),
        Some("internal only")
    );
    assert!(state.document.data_models.as_ref().unwrap().contains_key("customers"));
    let error = state.error.as_deref().unwrap();
    assert!(error.contains("section 'terms' could not be updated"));
    assert!(error.contains("section 'data_models' could not be updated"));
}
