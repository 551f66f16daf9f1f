// Contract-Drafter: LLM layer
// The agents only see the `ChatModel` trait; `LlmProvider` is the
// production implementation and `mock` holds the test doubles.

pub mod mock;
pub mod prompts;
pub mod provider;
pub mod throttle;

pub use prompts::{
    prompt_or_empty, DirPromptStore, EmbeddedPrompts, LayeredPromptStore, MemoryPromptStore,
    PromptStore,
};
pub use provider::{LlmConfig, LlmProvider, LlmResponse, Message, ProviderType, Role};
pub use throttle::{CallStats, RetryPolicy, Throttled};

use async_trait::async_trait;
use std::sync::Arc;

/// The model invocation capability.
///
/// Calls are fallible (transport errors, rate limits) and non-deterministic,
/// which is why everything downstream treats the output as untrusted.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, messages: Vec<Message>) -> Result<LlmResponse, anyhow::Error>;

    /// Resolves once the next call may start. Call deadlines begin after
    /// this, so pacing never counts against them.
    async fn ready(&self) {}
}

#[async_trait]
impl<T: ChatModel + ?Sized> ChatModel for Arc<T> {
    async fn complete(&self, messages: Vec<Message>) -> Result<LlmResponse, anyhow::Error> {
        (**self).complete(messages).await
    }

    async fn ready(&self) {
        (**self).ready().await
    }
}
