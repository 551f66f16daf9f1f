// Contract-Drafter: Server worker
// Asks the model which backends the user means, then drafts each matched
// backend with its own prompt and merges the results into one server map.

use super::parse::parse_list;
use super::worker::{build_request, call_model, run_attempts};
use super::{user_turns, Agent, SectionWorker, WorkerOutcome};
use crate::contract::schema::server::servers_from_raw;
use crate::contract::{Section, SectionKind, ServerKind, ServerMap};
use crate::error::WorkerError;
use crate::llm::prompts::SERVER_TYPE;
use crate::llm::{prompt_or_empty, ChatModel, Message, PromptStore, RetryPolicy};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

pub struct ServerWorker {
    model: Arc<dyn ChatModel>,
    classify_prompt: String,
    /// Generation prompt per backend; `None` when the store has none
    type_prompts: BTreeMap<ServerKind, Option<String>>,
    policy: RetryPolicy,
}

impl ServerWorker {
    pub fn new(model: Arc<dyn ChatModel>, prompts: &dyn PromptStore, policy: RetryPolicy) -> Self {
        let type_prompts = ServerKind::ALL
            .into_iter()
            .map(|kind| (kind, prompts.get_prompt(kind.prompt_name())))
            .collect();
        Self {
            model,
            classify_prompt: prompt_or_empty(prompts, SERVER_TYPE),
            type_prompts,
            policy,
        }
    }

    /// Backends named by the classifier, deduplicated in answer order.
    /// A failed call counts as no backend.
    async fn classify(&self, messages: &[Message]) -> Vec<ServerKind> {
        let latest = user_turns(messages)
            .pop()
            .unwrap_or_else(|| Message::user(""));
        let request = vec![Message::system(&self.classify_prompt), latest];

        let answer = match call_model(self.model.as_ref(), &request, self.policy.call_timeout()).await {
            Ok(answer) => answer,
            Err(e) => {
                log::warn!("Server type classification failed: {}", e);
                return Vec::new();
            }
        };

        let mut kinds = Vec::new();
        for token in parse_list(&answer) {
            match token.parse::<ServerKind>() {
                Ok(kind) if !kinds.contains(&kind) => kinds.push(kind),
                Ok(_) => {}
                Err(e) => log::warn!("Ignoring server type from classifier: {}", e),
            }
        }
        kinds
    }
}

/// Entries of `prior` whose type is `kind`
fn prior_of_kind(prior: Option<&Value>, kind: ServerKind) -> Option<Value> {
    let entries: Map<String, Value> = prior?
        .as_object()?
        .iter()
        .filter(|(_, server)| server.get("type").and_then(Value::as_str) == Some(kind.as_str()))
        .map(|(name, server)| (name.clone(), server.clone()))
        .collect();
    (!entries.is_empty()).then_some(Value::Object(entries))
}

impl Agent for ServerWorker {
    fn name(&self) -> &str {
        "server"
    }

    fn prompt_name(&self) -> &str {
        SERVER_TYPE
    }
}

#[async_trait]
impl SectionWorker for ServerWorker {
    fn kind(&self) -> SectionKind {
        SectionKind::Server
    }

    async fn generate(&self, messages: &[Message], prior: Option<&Value>) -> WorkerOutcome {
        let kinds = self.classify(messages).await;
        let mut attempts = 1;
        if kinds.is_empty() {
            log::info!("No supported server type requested, using default server section");
            return WorkerOutcome::fallback(SectionKind::Server, attempts);
        }

        let mut merged = ServerMap::new();
        for kind in kinds {
            let Some(prompt) = self.type_prompts.get(&kind).cloned().flatten() else {
                log::warn!("No prompt '{}' for server type {}, skipping", kind.prompt_name(), kind);
                continue;
            };

            let kind_prior = prior_of_kind(prior, kind);
            let request = build_request(&prompt, messages, kind_prior.as_ref());
            let read = move |body: &Value| -> Result<ServerMap, WorkerError> {
                let (mut servers, issues) = servers_from_raw(body, Some(kind));
                for issue in issues.into_iter().chain(servers.validate()) {
                    log::warn!("Server {} output: {}", kind, issue);
                }
                if servers.is_empty() {
                    return Err(WorkerError::EmptyBody(format!("server ({})", kind)));
                }
                Ok(servers)
            };

            let (servers, used) =
                run_attempts(self.model.as_ref(), &request, SectionKind::Server, &self.policy, &read)
                    .await;
            attempts += used;
            if let Some(servers) = servers {
                merged.extend(servers);
            }
        }

        if merged.is_empty() {
            return WorkerOutcome::fallback(SectionKind::Server, attempts);
        }
        WorkerOutcome::generated(merged.into_data(), attempts)
    }
}
