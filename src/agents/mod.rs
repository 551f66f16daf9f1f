// Contract-Drafter: Agent System
// A coordinator classifies each user turn and dispatches one worker per
// selected section; a translator turns finished quality checks into DQDL.

pub mod coordinator;
pub mod parse;
pub mod quality;
pub mod server;
pub mod worker;

// Re-exports
pub use coordinator::{Coordinator, Session};
pub use quality::QualityTranslator;
pub use server::ServerWorker;
pub use worker::SchemaWorker;

use crate::contract::{Document, SectionData, SectionKind};
use crate::llm::{Message, Role};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Base trait for all agents
pub trait Agent: Send + Sync {
    /// Get the agent's name
    fn name(&self) -> &str;

    /// Name of the system prompt this agent sends
    fn prompt_name(&self) -> &str;
}

/// Result of one worker invocation. Always carries a usable section.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerOutcome {
    pub section: SectionData,
    /// Model calls made, including the one that succeeded
    pub attempts: u32,
    /// The section is the hand-authored default, not generated content
    pub fallback: bool,
}

impl WorkerOutcome {
    pub fn generated(section: SectionData, attempts: u32) -> Self {
        Self {
            section,
            attempts,
            fallback: false,
        }
    }

    pub fn fallback(kind: SectionKind, attempts: u32) -> Self {
        Self {
            section: SectionData::default_for(kind),
            attempts,
            fallback: true,
        }
    }
}

/// Generates exactly one document section
#[async_trait]
pub trait SectionWorker: Agent {
    fn kind(&self) -> SectionKind;

    /// Draft the section from the conversation so far. `prior` is the
    /// section's current content, when there is any. Never fails.
    async fn generate(&self, messages: &[Message], prior: Option<&Value>) -> WorkerOutcome;
}

/// Coordinator state, handed back to the caller after every turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    /// Every user and assistant turn, in order
    pub messages: Vec<Message>,
    /// Sections selected by the latest classification
    pub selected: Vec<SectionKind>,
    pub document: Document,
    /// Informational; set when something was skipped or degraded this turn
    pub error: Option<String>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {
    pub fn new() -> Self {
        Self::with_document(Document::new())
    }

    pub fn with_document(document: Document) -> Self {
        Self {
            messages: Vec::new(),
            selected: Vec::new(),
            document,
            error: None,
        }
    }

    /// Latest acknowledgment
    pub fn last_reply(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::Assistant)
            .map(|m| m.content.as_str())
    }

    pub fn push_error(&mut self, message: impl Into<String>) {
        let message = message.into();
        self.error = Some(match self.error.take() {
            Some(existing) => format!("{}; {}", existing, message),
            None => message,
        });
    }
}

/// User-authored turns only, oldest first
pub fn user_turns(messages: &[Message]) -> Vec<Message> {
    messages.iter().filter(|m| m.is_user()).cloned().collect()
}
