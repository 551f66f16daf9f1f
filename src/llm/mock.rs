// Contract-Drafter: Test doubles for the model boundary
// Every request is recorded so tests can assert on exactly what was sent.

use super::{ChatModel, LlmResponse, Message, Role};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

const MOCK_MODEL: &str = "mock-model";

/// Replays a fixed sequence of responses, one per call.
/// `Err` entries are raised as model failures; an exhausted script fails too.
pub struct ScriptedModel {
    responses: Mutex<VecDeque<Result<String, String>>>,
    requests: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedModel {
    pub fn new<S: Into<String>>(responses: Vec<S>) -> Self {
        Self::with_results(responses.into_iter().map(|r| Ok(r.into())).collect())
    }

    pub fn with_results(responses: Vec<Result<String, String>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<Vec<Message>> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn complete(&self, messages: Vec<Message>) -> Result<LlmResponse, anyhow::Error> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(messages);
        }
        let next = self.responses.lock().ok().and_then(|mut r| r.pop_front());
        match next {
            Some(Ok(text)) => Ok(LlmResponse::text(text, MOCK_MODEL)),
            Some(Err(e)) => Err(anyhow::anyhow!(e)),
            None => Err(anyhow::anyhow!("scripted model has no responses left")),
        }
    }
}

/// Answers according to the system prompt of each request: the first route
/// whose marker appears in the system prompt wins.
pub struct RoutedModel {
    routes: Vec<(String, Result<String, String>)>,
    requests: Mutex<Vec<Vec<Message>>>,
}

impl Default for RoutedModel {
    fn default() -> Self {
        Self::new()
    }
}

impl RoutedModel {
    pub fn new() -> Self {
        Self {
            routes: Vec::new(),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn route(mut self, marker: &str, response: &str) -> Self {
        self.routes.push((marker.to_string(), Ok(response.to_string())));
        self
    }

    pub fn route_error(mut self, marker: &str, error: &str) -> Self {
        self.routes.push((marker.to_string(), Err(error.to_string())));
        self
    }

    pub fn requests(&self) -> Vec<Vec<Message>> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    /// Requests whose system prompt contains `marker`
    pub fn requests_for(&self, marker: &str) -> Vec<Vec<Message>> {
        self.requests()
            .into_iter()
            .filter(|req| system_prompt(req).contains(marker))
            .collect()
    }
}

fn system_prompt(messages: &[Message]) -> String {
    messages
        .iter()
        .filter(|m| m.role == Role::System)
        .map(|m| m.content.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

#[async_trait]
impl ChatModel for RoutedModel {
    async fn complete(&self, messages: Vec<Message>) -> Result<LlmResponse, anyhow::Error> {
        let system = system_prompt(&messages);
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(messages);
        }
        let route = self.routes.iter().find(|(marker, _)| system.contains(marker.as_str()));
        match route {
            Some((_, Ok(text))) => Ok(LlmResponse::text(text.clone(), MOCK_MODEL)),
            Some((_, Err(e))) => Err(anyhow::anyhow!(e.clone())),
            None => Err(anyhow::anyhow!("no route for system prompt")),
        }
    }
}

/// Fails every call, e.g. with a rate-limit error
pub struct FailingModel {
    error: String,
    calls: Mutex<usize>,
}

impl FailingModel {
    pub fn new(error: &str) -> Self {
        Self {
            error: error.to_string(),
            calls: Mutex::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| *c).unwrap_or(0)
    }
}

#[async_trait]
impl ChatModel for FailingModel {
    async fn complete(&self, _messages: Vec<Message>) -> Result<LlmResponse, anyhow::Error> {
        if let Ok(mut calls) = self.calls.lock() {
            *calls += 1;
        }
        Err(anyhow::anyhow!(self.error.clone()))
    }
}
