// Contract-Drafter: Section worker
// One worker per section. A call replays the user's turns under the
// section's system prompt, parses the reply as JSON, and normalizes the
// section body. Failed attempts are retried up to the policy's budget,
// after which the section's default instance is returned.

use super::parse::parse_json_object;
use super::{user_turns, Agent, SectionWorker, WorkerOutcome};
use crate::contract::normalize::is_blank;
use crate::contract::{normalize, Section, SectionKind};
use crate::error::WorkerError;
use crate::llm::{prompt_or_empty, ChatModel, Message, PromptStore, RetryPolicy};
use async_trait::async_trait;
use serde_json::Value;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

const UPDATE_INSTRUCTION: &str = "\nUpdate the contract based on this existing data:\n";

/// Append the prior section to a user turn so the model edits instead of
/// starting over
pub fn frame_update(content: &str, prior: &Value) -> String {
    let prior_json = serde_json::to_string_pretty(prior).unwrap_or_else(|_| prior.to_string());
    format!("{}{}{}", content, UPDATE_INSTRUCTION, prior_json)
}

/// `[system] + user turns`, with update framing on the last user turn
pub fn build_request(system: &str, messages: &[Message], prior: Option<&Value>) -> Vec<Message> {
    let mut turns = user_turns(messages);
    if let Some(prior) = prior {
        match turns.last_mut() {
            Some(last) => last.content = frame_update(&last.content, prior),
            None => turns.push(Message::user(&frame_update("", prior))),
        }
    }

    let mut request = Vec::with_capacity(turns.len() + 1);
    request.push(Message::system(system));
    request.extend(turns);
    request
}

/// The section body: under one of `keys`, under one of them one level
/// down (`{"data_contract": {"terms": ...}}`), or the whole object.
pub fn section_body<'a>(parsed: &'a Value, keys: &[&str]) -> &'a Value {
    if let Some(body) = keys.iter().find_map(|k| parsed.get(*k)) {
        return body;
    }
    if let Some(map) = parsed.as_object() {
        for nested in map.values() {
            if let Some(body) = keys.iter().find_map(|k| nested.get(*k)) {
                return body;
            }
        }
    }
    parsed
}

/// One model call under a deadline. The deadline starts once the model is
/// ready, after any cooldown.
pub(crate) async fn call_model(
    model: &dyn ChatModel,
    request: &[Message],
    deadline: Duration,
) -> Result<String, WorkerError> {
    model.ready().await;
    match tokio::time::timeout(deadline, model.complete(request.to_vec())).await {
        Ok(Ok(response)) => Ok(response.content),
        Ok(Err(e)) => Err(WorkerError::Llm(e.to_string())),
        Err(_) => Err(WorkerError::Timeout(deadline)),
    }
}

async fn attempt<T>(
    model: &dyn ChatModel,
    request: &[Message],
    kind: SectionKind,
    deadline: Duration,
    read: &(dyn Fn(&Value) -> Result<T, WorkerError> + Send + Sync),
) -> Result<T, WorkerError> {
    let response = call_model(model, request, deadline).await?;
    let parsed = parse_json_object(&response)?;
    let body = section_body(&parsed, kind.body_keys());
    if is_blank(body) {
        return Err(WorkerError::EmptyBody(kind.to_string()));
    }
    read(body)
}

/// Bounded retry loop shared by all workers.
/// Returns the value read from the first good response and the number of
/// calls made, or `None` once the budget is spent.
pub(crate) async fn run_attempts<T>(
    model: &dyn ChatModel,
    request: &[Message],
    kind: SectionKind,
    policy: &RetryPolicy,
    read: &(dyn Fn(&Value) -> Result<T, WorkerError> + Send + Sync),
) -> (Option<T>, u32) {
    let max_attempts = policy.attempts();
    for n in 1..=max_attempts {
        match attempt(model, request, kind, policy.call_timeout(), read).await {
            Ok(value) => {
                log::info!("Generated section {} on attempt {}/{}", kind, n, max_attempts);
                return (Some(value), n);
            }
            Err(e) => {
                log::warn!("Section {} attempt {}/{} failed: {}", kind, n, max_attempts, e);
            }
        }
    }
    log::error!(
        "Section {} failed after {} attempts, falling back to default",
        kind,
        max_attempts
    );
    (None, max_attempts)
}

/// Worker for any section whose whole body is one schema instance
pub struct SchemaWorker<S> {
    model: Arc<dyn ChatModel>,
    prompt: String,
    policy: RetryPolicy,
    section: PhantomData<fn() -> S>,
}

impl<S: Section> SchemaWorker<S> {
    /// Loads the section's system prompt once, from `prompts`
    pub fn new(model: Arc<dyn ChatModel>, prompts: &dyn PromptStore, policy: RetryPolicy) -> Self {
        let prompt = prompt_or_empty(prompts, S::KIND.prompt_name());
        Self::with_prompt(model, prompt, policy)
    }

    pub fn with_prompt(model: Arc<dyn ChatModel>, prompt: String, policy: RetryPolicy) -> Self {
        Self {
            model,
            prompt,
            policy,
            section: PhantomData,
        }
    }
}

impl<S: Section> Agent for SchemaWorker<S> {
    fn name(&self) -> &str {
        S::KIND.as_str()
    }

    fn prompt_name(&self) -> &str {
        S::KIND.prompt_name()
    }
}

#[async_trait]
impl<S: Section + 'static> SectionWorker for SchemaWorker<S> {
    fn kind(&self) -> SectionKind {
        S::KIND
    }

    async fn generate(&self, messages: &[Message], prior: Option<&Value>) -> WorkerOutcome {
        let request = build_request(&self.prompt, messages, prior);
        let read = |body: &Value| -> Result<S, WorkerError> {
            let section = normalize::<S>(body);
            if section.is_empty() {
                return Err(WorkerError::EmptyBody(format!("{} (nothing usable)", S::KIND)));
            }
            Ok(section)
        };
        let (section, attempts) =
            run_attempts(self.model.as_ref(), &request, S::KIND, &self.policy, &read).await;

        match section {
            Some(section) => WorkerOutcome::generated(section.into_data(), attempts),
            None => WorkerOutcome::fallback(S::KIND, attempts),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{DataModels, SectionData, Terms};
    use crate::llm::mock::{FailingModel, ScriptedModel};
    use crate::llm::{Role, Throttled};
    use serde_json::json;

    fn terms_worker(model: Arc<dyn ChatModel>) -> SchemaWorker<Terms> {
        SchemaWorker::with_prompt(model, "terms prompt".to_string(), RetryPolicy::fast())
    }

    #[test]
    fn test_build_request_replays_user_turns_only() {
        let messages = vec![
            Message::user("first"),
            Message::assistant("ack"),
            Message::system("other agent prompt"),
            Message::user("second"),
        ];
        let request = build_request("section prompt", &messages, None);
        assert_eq!(request.len(), 3);
        assert_eq!(request[0].role, Role::System);
        assert_eq!(request[0].content, "section prompt");
        assert_eq!(request[1].content, "first");
        assert_eq!(request[2].content, "second");
    }

    #[test]
    fn test_update_framing_goes_on_last_user_turn() {
        let messages = vec![Message::user("first"), Message::user("add billing")];
        let prior = json!({"usage": "internal"});
        let request = build_request("p", &messages, Some(&prior));
        assert_eq!(request[1].content, "first");
        assert!(request[2].content.starts_with("add billing\nUpdate the contract based on this existing data:\n"));
        assert!(request[2].content.contains("\"usage\": \"internal\""));
    }

    #[test]
    fn test_section_body_lookup() {
        let direct = json!({"terms": {"usage": "a"}});
        assert_eq!(section_body(&direct, &["terms"]), &json!({"usage": "a"}));

        let nested = json!({"data_contract": {"terms": {"usage": "b"}}});
        assert_eq!(section_body(&nested, &["terms"]), &json!({"usage": "b"}));

        let bare = json!({"usage": "c"});
        assert_eq!(section_body(&bare, &["terms"]), &bare);

        let alias = json!({"data_model": {"t": {}}});
        assert_eq!(section_body(&alias, SectionKind::DataModels.body_keys()), &json!({"t": {}}));
    }

    #[tokio::test]
    async fn test_generate_parses_fenced_response() {
        let model = Arc::new(ScriptedModel::new(vec![
            "```json\n{\"terms\": {\"usage\": \"reporting\", \"noticePeriod\": \"P1M\"}}\n```",
        ]));
        let worker = terms_worker(model.clone());
        let outcome = worker.generate(&[Message::user("terms please")], None).await;

        assert!(!outcome.fallback);
        assert_eq!(outcome.attempts, 1);
        match outcome.section {
            SectionData::Terms(terms) => {
                assert_eq!(terms.usage.as_deref(), Some("reporting"));
                assert_eq!(terms.notice_period.as_deref(), Some("P1M"));
            }
            other => panic!("expected terms, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_retries_then_succeeds() {
        let model = Arc::new(ScriptedModel::with_results(vec![
            Err("rate limited".to_string()),
            Ok("not json at all".to_string()),
            Ok("{\"terms\": {\"usage\": \"third time\"}}".to_string()),
        ]));
        let worker = terms_worker(model.clone());
        let outcome = worker.generate(&[Message::user("terms")], None).await;

        assert!(!outcome.fallback);
        assert_eq!(outcome.attempts, 3);
        assert_eq!(model.call_count(), 3);
    }

    #[tokio::test]
    async fn test_always_failing_model_yields_default_after_three_calls() {
        let model = Arc::new(FailingModel::new("503 service unavailable"));
        let worker: SchemaWorker<DataModels> =
            SchemaWorker::with_prompt(model.clone(), String::new(), RetryPolicy::fast());
        let outcome = worker.generate(&[Message::user("models")], None).await;

        assert!(outcome.fallback);
        assert_eq!(outcome.attempts, 3);
        assert_eq!(model.call_count(), 3);
        assert_eq!(outcome.section, SectionData::default_for(SectionKind::DataModels));
    }

    #[tokio::test]
    async fn test_empty_body_is_retried() {
        let model = Arc::new(ScriptedModel::new(vec![
            "{\"terms\": {}}",
            "{\"terms\": null}",
            "{\"terms\": {\"billing\": \"free\"}}",
        ]));
        let worker = terms_worker(model.clone());
        let outcome = worker.generate(&[Message::user("terms")], None).await;
        assert_eq!(outcome.attempts, 3);
        assert!(!outcome.fallback);
    }

    #[tokio::test]
    async fn test_reply_with_nothing_usable_is_retried() {
        let model = Arc::new(ScriptedModel::new(vec![
            r#"{"terms": "n/a"}"#,
            r#"{"terms": {"noticePeriod": "soon"}}"#,
            r#"{"terms": {"usage": "reporting"}}"#,
        ]));
        let outcome = terms_worker(model.clone()).generate(&[Message::user("terms")], None).await;
        assert!(!outcome.fallback);
        assert_eq!(outcome.attempts, 3);
        match outcome.section {
            SectionData::Terms(terms) => assert_eq!(terms.usage.as_deref(), Some("reporting")),
            other => panic!("expected terms, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unnamed_models_fall_back() {
        let model = Arc::new(ScriptedModel::new(vec![
            r#"{"data_models": [{"type": "table"}]}"#,
            r#"{"data_models": [{"type": "table"}]}"#,
            r#"{"data_models": [{"type": "table"}]}"#,
        ]));
        let worker: SchemaWorker<DataModels> =
            SchemaWorker::with_prompt(model.clone(), String::new(), RetryPolicy::fast());
        let outcome = worker.generate(&[Message::user("models")], None).await;
        assert!(outcome.fallback);
        assert_eq!(model.call_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cooldown_does_not_eat_the_call_deadline() {
        let policy = RetryPolicy {
            max_attempts: 3,
            cooldown_ms: 40_000,
            call_timeout_ms: 30_000,
        };
        let scripted = ScriptedModel::new(vec![
            "not json",
            r#"{"terms": {"usage": "u2"}}"#,
            r#"{"terms": {"usage": "u3"}}"#,
        ]);
        let model: Arc<dyn ChatModel> = Arc::new(Throttled::from_policy(scripted, &policy));
        let worker = SchemaWorker::<Terms>::with_prompt(model, "terms".to_string(), policy);
        let outcome = worker.generate(&[Message::user("terms")], None).await;

        assert!(!outcome.fallback);
        assert_eq!(outcome.attempts, 2);
        match outcome.section {
            SectionData::Terms(terms) => assert_eq!(terms.usage.as_deref(), Some("u2")),
            other => panic!("expected terms, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_model_times_out() {
        struct Stalled;

        #[async_trait]
        impl ChatModel for Stalled {
            async fn complete(
                &self,
                _messages: Vec<Message>,
            ) -> Result<crate::llm::LlmResponse, anyhow::Error> {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(crate::llm::LlmResponse::text("{}", "stalled"))
            }
        }

        let result = call_model(&Stalled, &[Message::user("x")], Duration::from_millis(50)).await;
        assert!(matches!(result, Err(WorkerError::Timeout(_))));
    }
}
