// Contract-Drafter: Conversational data contract drafting
// A coordinator classifies each user turn into contract sections, section
// workers draft them with a language model, and the results are merged into
// one document. A separate translator turns quality checks into DQDL.

// Agent system - coordinator, section workers, quality translator
pub mod agents;

// Settings file
pub mod config;

// Data contract document, section schemas and normalization
pub mod contract;

// Error types
pub mod error;

// LLM abstraction layer - providers, throttling, prompts, test doubles
pub mod llm;

// Re-export agent types
pub use agents::{
    Agent, Coordinator, QualityTranslator, SchemaWorker, SectionWorker, ServerWorker, Session,
    SessionState, WorkerOutcome,
};

// Re-export contract types
pub use contract::{normalize, Document, FromRaw, Section, SectionData, SectionKind};

pub use config::DrafterConfig;
pub use error::{DrafterError, Result, WorkerError};

// Re-export LLM types
pub use llm::{
    ChatModel, EmbeddedPrompts, LayeredPromptStore, LlmConfig, LlmProvider, Message,
    PromptStore, RetryPolicy, Role,
};
