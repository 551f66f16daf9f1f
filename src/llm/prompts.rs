// Contract-Drafter: Prompt store
// System prompts are looked up by name. The built-in set is embedded from
// `prompts/`; a directory of `<name>.md` files can override any of them.

use rust_embed::RustEmbed;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Coordinator classification prompt
pub const CLASSIFY: &str = "classify";
/// Coordinator acknowledgment prompt
pub const POST_RESPONSE: &str = "post_response";
/// Server worker backend classification prompt
pub const SERVER_TYPE: &str = "server_type";

#[derive(RustEmbed)]
#[folder = "prompts/"]
#[include = "*.md"]
struct PromptAssets;

/// Read-only lookup of system prompts by name
pub trait PromptStore: Send + Sync {
    fn get_prompt(&self, name: &str) -> Option<String>;
}

/// Look a prompt up, degrading to an empty prompt when it is missing.
pub fn prompt_or_empty(store: &dyn PromptStore, name: &str) -> String {
    match store.get_prompt(name) {
        Some(prompt) => prompt,
        None => {
            log::warn!("No system prompt found for '{}', using an empty prompt", name);
            String::new()
        }
    }
}

/// Prompts compiled into the binary
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddedPrompts;

impl PromptStore for EmbeddedPrompts {
    fn get_prompt(&self, name: &str) -> Option<String> {
        PromptAssets::get(&format!("{}.md", name)).and_then(|file| {
            std::str::from_utf8(file.data.as_ref())
                .ok()
                .map(|s| s.to_string())
        })
    }
}

/// Prompts read from `<dir>/<name>.md` on every lookup
#[derive(Debug, Clone)]
pub struct DirPromptStore {
    dir: PathBuf,
}

impl DirPromptStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self { dir: dir.as_ref().to_path_buf() }
    }
}

impl PromptStore for DirPromptStore {
    fn get_prompt(&self, name: &str) -> Option<String> {
        let path = self.dir.join(format!("{}.md", name));
        match std::fs::read_to_string(&path) {
            Ok(prompt) => Some(prompt),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                log::warn!("Cannot read prompt file {}: {}", path.display(), e);
                None
            }
        }
    }
}

/// In-memory prompts, mostly for tests
#[derive(Debug, Clone, Default)]
pub struct MemoryPromptStore {
    prompts: HashMap<String, String>,
}

impl MemoryPromptStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, prompt: &str) -> Self {
        self.prompts.insert(name.to_string(), prompt.to_string());
        self
    }

    pub fn insert(&mut self, name: &str, prompt: &str) {
        self.prompts.insert(name.to_string(), prompt.to_string());
    }
}

impl PromptStore for MemoryPromptStore {
    fn get_prompt(&self, name: &str) -> Option<String> {
        self.prompts.get(name).cloned()
    }
}

/// Consults each layer in order; the first hit wins.
#[derive(Default)]
pub struct LayeredPromptStore {
    layers: Vec<Box<dyn PromptStore>>,
}

impl LayeredPromptStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn layer(mut self, store: impl PromptStore + 'static) -> Self {
        self.layers.push(Box::new(store));
        self
    }

    /// Optional override directory on top of the embedded prompts
    pub fn with_overrides(dir: Option<&Path>) -> Self {
        let mut store = Self::new();
        if let Some(dir) = dir {
            store = store.layer(DirPromptStore::new(dir));
        }
        store.layer(EmbeddedPrompts)
    }
}

impl PromptStore for LayeredPromptStore {
    fn get_prompt(&self, name: &str) -> Option<String> {
        self.layers.iter().find_map(|layer| layer.get_prompt(name))
    }
}
