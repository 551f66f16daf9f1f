// Contract-Drafter: The Coordinator Agent
// Each user turn runs three fixed stages: classify the turn into document
// sections, run the matching workers one after another, and acknowledge.
// Only this type writes to the document or the conversation.

use super::parse::parse_list;
use super::worker::call_model;
use super::{user_turns, Agent, SchemaWorker, SectionWorker, ServerWorker, SessionState};
use crate::contract::{
    DataModels, Definitions, Document, MetaInfo, SectionKind, ServiceLevels, Terms,
};
use crate::llm::prompts::{CLASSIFY, POST_RESPONSE};
use crate::llm::{prompt_or_empty, ChatModel, Message, PromptStore, RetryPolicy, Throttled};
use std::collections::BTreeMap;
use std::sync::Arc;

/// User turns shown to the acknowledgment prompt
const ACK_CONTEXT_TURNS: usize = 3;

pub struct Coordinator {
    model: Arc<dyn ChatModel>,
    classify_prompt: String,
    acknowledge_prompt: String,
    workers: BTreeMap<SectionKind, Box<dyn SectionWorker>>,
    policy: RetryPolicy,
}

impl Agent for Coordinator {
    fn name(&self) -> &str {
        "coordinator"
    }

    fn prompt_name(&self) -> &str {
        CLASSIFY
    }
}

impl Coordinator {
    /// Coordinator with a worker for every section. All calls, from all
    /// workers, go through one throttled handle so the cooldown holds
    /// across the whole turn.
    pub fn new(model: Arc<dyn ChatModel>, prompts: &dyn PromptStore, policy: RetryPolicy) -> Self {
        let model: Arc<dyn ChatModel> = Arc::new(Throttled::from_policy(model, &policy));
        let mut coordinator = Self::without_workers(model.clone(), prompts, policy.clone());

        coordinator.register(Box::new(SchemaWorker::<MetaInfo>::new(
            model.clone(),
            prompts,
            policy.clone(),
        )));
        coordinator.register(Box::new(ServerWorker::new(model.clone(), prompts, policy.clone())));
        coordinator.register(Box::new(SchemaWorker::<Terms>::new(
            model.clone(),
            prompts,
            policy.clone(),
        )));
        coordinator.register(Box::new(SchemaWorker::<DataModels>::new(
            model.clone(),
            prompts,
            policy.clone(),
        )));
        coordinator.register(Box::new(SchemaWorker::<ServiceLevels>::new(
            model.clone(),
            prompts,
            policy.clone(),
        )));
        coordinator.register(Box::new(SchemaWorker::<Definitions>::new(model, prompts, policy)));
        coordinator
    }

    /// Coordinator with an empty worker table; see [`Coordinator::register`]
    pub fn without_workers(
        model: Arc<dyn ChatModel>,
        prompts: &dyn PromptStore,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            model,
            classify_prompt: prompt_or_empty(prompts, CLASSIFY),
            acknowledge_prompt: prompt_or_empty(prompts, POST_RESPONSE),
            workers: BTreeMap::new(),
            policy,
        }
    }

    /// Install a worker for its section, returning the one it replaces
    pub fn register(&mut self, worker: Box<dyn SectionWorker>) -> Option<Box<dyn SectionWorker>> {
        log::debug!("Registering worker '{}' for section {}", worker.name(), worker.kind());
        self.workers.insert(worker.kind(), worker)
    }

    pub fn has_worker(&self, kind: SectionKind) -> bool {
        self.workers.contains_key(&kind)
    }

    /// Run one user turn and hand back the updated state
    pub async fn run_turn(&self, mut state: SessionState, user_input: &str) -> SessionState {
        state.error = None;
        state.selected.clear();

        if user_input.trim().is_empty() {
            state.push_error("empty input, nothing to do");
            return state;
        }
        state.messages.push(Message::user(user_input));

        let selected = self.classify(&mut state).await;
        state.selected = selected.clone();

        let updated = self.generate(&mut state, &selected).await;

        self.acknowledge(&mut state, &updated).await;
        state
    }

    /// Stage 1: which sections does the latest turn concern
    async fn classify(&self, state: &mut SessionState) -> Vec<SectionKind> {
        let Some(latest) = state.messages.iter().rev().find(|m| m.is_user()).cloned() else {
            return Vec::new();
        };
        let request = vec![Message::system(&self.classify_prompt), latest];

        let answer = match call_model(self.model.as_ref(), &request, self.policy.call_timeout()).await {
            Ok(answer) => answer,
            Err(e) => {
                log::error!("Section classification failed: {}", e);
                state.push_error(format!("classification failed: {}", e));
                return Vec::new();
            }
        };

        let mut selected = Vec::new();
        for token in parse_list(&answer) {
            match token.parse::<SectionKind>() {
                Ok(kind) if !selected.contains(&kind) => selected.push(kind),
                Ok(_) => {}
                Err(e) => {
                    log::warn!("Classifier returned {}", e);
                    state.push_error(e.to_string());
                }
            }
        }
        log::info!(
            "Classified turn into sections: [{}]",
            selected.iter().map(|k| k.as_str()).collect::<Vec<_>>().join(", ")
        );
        selected
    }

    /// Stage 2: run the selected workers in order and merge their results.
    /// Returns the sections whose slot was replaced.
    async fn generate(&self, state: &mut SessionState, selected: &[SectionKind]) -> Vec<SectionKind> {
        let mut updated = Vec::new();

        for &kind in selected {
            let Some(worker) = self.workers.get(&kind) else {
                log::error!("No worker registered for section {}", kind);
                state.push_error(format!("no worker for section '{}'", kind));
                continue;
            };

            let prior = state.document.prior(kind);
            let outcome = worker.generate(&state.messages, prior.as_ref()).await;

            if outcome.fallback {
                if state.document.has_content(kind) {
                    log::warn!(
                        "Section {} fell back after {} attempts, keeping existing content",
                        kind,
                        outcome.attempts
                    );
                    state.push_error(format!("section '{}' could not be updated", kind));
                    continue;
                }
                state.push_error(format!("section '{}' was filled with default content", kind));
            }

            log::info!("Merging section {} into document {}", kind, state.document.id);
            state.document.set(outcome.section);
            updated.push(kind);
        }
        updated
    }

    /// Stage 3: append a conversational acknowledgment. Never touches the
    /// document.
    async fn acknowledge(&self, state: &mut SessionState, updated: &[SectionKind]) {
        let turns = user_turns(&state.messages);
        let recent = &turns[turns.len().saturating_sub(ACK_CONTEXT_TURNS)..];

        let mut request = vec![Message::system(&self.acknowledge_prompt)];
        request.extend(recent.iter().cloned());

        let reply = match call_model(self.model.as_ref(), &request, self.policy.call_timeout()).await {
            Ok(reply) if !reply.trim().is_empty() => reply.trim().to_string(),
            Ok(_) => {
                state.push_error("acknowledgment was empty");
                fallback_acknowledgment(updated)
            }
            Err(e) => {
                log::warn!("Acknowledgment failed: {}", e);
                state.push_error(format!("acknowledgment failed: {}", e));
                fallback_acknowledgment(updated)
            }
        };
        state.messages.push(Message::assistant(&reply));
    }
}

fn fallback_acknowledgment(updated: &[SectionKind]) -> String {
    if updated.is_empty() {
        return "No contract sections were updated this turn.".to_string();
    }
    let names: Vec<&str> = updated.iter().map(|k| k.as_str()).collect();
    format!("Updated contract sections: {}.", names.join(", "))
}

/// A coordinator paired with its running state
pub struct Session {
    coordinator: Coordinator,
    state: SessionState,
}

impl Session {
    pub fn new(coordinator: Coordinator) -> Self {
        Self::with_document(coordinator, Document::new())
    }

    /// Start from a caller-supplied document
    pub fn with_document(coordinator: Coordinator, document: Document) -> Self {
        Self {
            coordinator,
            state: SessionState::with_document(document),
        }
    }

    pub async fn invoke(&mut self, user_input: &str) -> &SessionState {
        let state = std::mem::take(&mut self.state);
        self.state = self.coordinator.run_turn(state, user_input).await;
        &self.state
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn document(&self) -> &Document {
        &self.state.document
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::mock::{FailingModel, RoutedModel};
    use crate::llm::MemoryPromptStore;

    fn prompts() -> MemoryPromptStore {
        MemoryPromptStore::new()
            .with(CLASSIFY, "CLASSIFY")
            .with(POST_RESPONSE, "ACKNOWLEDGE")
            .with("terms", "DRAFT TERMS")
    }

    #[test]
    fn test_fallback_acknowledgment_lists_sections() {
        assert_eq!(
            fallback_acknowledgment(&[SectionKind::MetaInfo, SectionKind::DataModels]),
            "Updated contract sections: metainfo, data_models."
        );
        assert!(fallback_acknowledgment(&[]).starts_with("No contract sections"));
    }

    #[test]
    fn test_default_table_covers_every_section() {
        let model = Arc::new(FailingModel::new("unused"));
        let coordinator = Coordinator::new(model, &prompts(), RetryPolicy::fast());
        for kind in SectionKind::ALL {
            assert!(coordinator.has_worker(kind), "missing worker for {}", kind);
        }
    }

    #[tokio::test]
    async fn test_empty_input_is_a_no_op() {
        let model = Arc::new(FailingModel::new("unused"));
        let coordinator = Coordinator::new(model.clone(), &prompts(), RetryPolicy::fast());
        let state = coordinator.run_turn(SessionState::new(), "   ").await;
        assert!(state.messages.is_empty());
        assert!(state.error.is_some());
        assert_eq!(model.call_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_worker_is_reported_and_skipped() {
        let model = Arc::new(
            RoutedModel::new()
                .route("CLASSIFY", "terms, metainfo")
                .route("DRAFT TERMS", r#"{"terms": {"usage": "internal"}}"#)
                .route("ACKNOWLEDGE", "Terms drafted."),
        );
        let store = prompts();
        let shared: Arc<dyn ChatModel> = model.clone();
        let mut coordinator =
            Coordinator::without_workers(shared.clone(), &store, RetryPolicy::fast());
        coordinator.register(Box::new(SchemaWorker::<Terms>::new(
            shared,
            &store,
            RetryPolicy::fast(),
        )));

        let state = coordinator.run_turn(SessionState::new(), "terms only").await;
        assert_eq!(state.selected, vec![SectionKind::Terms, SectionKind::MetaInfo]);
        assert!(state.document.terms.is_some());
        assert!(state.document.metainfo.is_none());
        assert!(state.error.as_deref().unwrap_or_default().contains("metainfo"));
        assert_eq!(state.last_reply(), Some("Terms drafted."));
    }

    #[tokio::test]
    async fn test_failed_classification_still_acknowledges() {
        let model = Arc::new(FailingModel::new("connection reset"));
        let coordinator = Coordinator::new(model.clone(), &prompts(), RetryPolicy::fast());
        let state = coordinator.run_turn(SessionState::new(), "hello").await;

        assert!(state.selected.is_empty());
        assert!(state.document.is_blank());
        assert_eq!(state.messages.len(), 2);
        assert!(state.last_reply().unwrap().starts_with("No contract sections"));
        let error = state.error.unwrap();
        assert!(error.contains("classification failed"));
        assert!(error.contains("acknowledgment failed"));
        assert_eq!(model.call_count(), 2);
    }
}
