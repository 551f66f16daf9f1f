// Contract-Drafter: Quality rule translator
// Turns the quality checks of finished data models into an AWS Glue DQDL
// ruleset with a single model call. The output is returned as-is.

use super::worker::call_model;
use super::Agent;
use crate::contract::{DataModels, FieldDef, ModelDef};
use crate::error::{DrafterError, Result, WorkerError};
use crate::llm::{prompt_or_empty, ChatModel, EmbeddedPrompts, Message, PromptStore};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// Embedded one-shot prompt with worked DQDL examples
pub const DQDL_PROMPT: &str = "dqdl";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

pub struct QualityTranslator {
    model: Arc<dyn ChatModel>,
    prompt: String,
    timeout: Duration,
}

impl Agent for QualityTranslator {
    fn name(&self) -> &str {
        "quality_translator"
    }

    fn prompt_name(&self) -> &str {
        DQDL_PROMPT
    }
}

impl QualityTranslator {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self::with_prompts(model, &EmbeddedPrompts)
    }

    pub fn with_prompts(model: Arc<dyn ChatModel>, prompts: &dyn PromptStore) -> Self {
        Self {
            model,
            prompt: prompt_or_empty(prompts, DQDL_PROMPT),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Translate a textual (YAML or JSON) quality excerpt into DQDL
    pub async fn translate(&self, quality_text: &str) -> Result<String> {
        if quality_text.trim().is_empty() {
            return Err(DrafterError::Parse("no quality checks to translate".to_string()));
        }
        if self.prompt.trim().is_empty() {
            return Err(DrafterError::Prompt(DQDL_PROMPT.to_string()));
        }
        let request = vec![Message::system(&self.prompt), Message::user(quality_text)];
        match call_model(self.model.as_ref(), &request, self.timeout).await {
            Ok(rules) => Ok(rules),
            Err(WorkerError::Timeout(after)) => Err(DrafterError::Timeout(after)),
            Err(e) => Err(DrafterError::Llm(e.to_string())),
        }
    }

    /// Excerpt the models' quality checks and translate them
    pub async fn translate_models(&self, models: &DataModels) -> Result<String> {
        let excerpt = quality_excerpt(models)?;
        log::info!("Translating quality checks of {} bytes to DQDL", excerpt.len());
        self.translate(&excerpt).await
    }
}

/// YAML rendering of only the models and fields that declare `quality`.
/// Empty when nothing does.
pub fn quality_excerpt(models: &DataModels) -> Result<String> {
    let mut excerpt = Map::new();
    for (name, model) in models {
        if let Some(pruned) = prune_model(model)? {
            excerpt.insert(name.clone(), pruned);
        }
    }
    if excerpt.is_empty() {
        return Ok(String::new());
    }
    Ok(serde_yaml::to_string(&Value::Object(excerpt))?)
}

fn prune_model(model: &ModelDef) -> Result<Option<Value>> {
    if !model.has_quality() {
        return Ok(None);
    }
    let mut out = Map::new();
    out.insert("type".to_string(), Value::String(model.model_type.clone()));
    if !model.quality.is_empty() {
        out.insert("quality".to_string(), serde_json::to_value(&model.quality)?);
    }
    let fields = prune_fields(&model.fields)?;
    if !fields.is_empty() {
        out.insert("fields".to_string(), Value::Object(fields));
    }
    Ok(Some(Value::Object(out)))
}

fn prune_fields(fields: &BTreeMap<String, FieldDef>) -> Result<Map<String, Value>> {
    let mut out = Map::new();
    for (name, field) in fields.iter().filter(|(_, f)| f.has_quality()) {
        let mut entry = Map::new();
        entry.insert("type".to_string(), Value::String(field.field_type.clone()));
        if !field.quality.is_empty() {
            entry.insert("quality".to_string(), serde_json::to_value(&field.quality)?);
        }
        let nested = prune_fields(&field.fields)?;
        if !nested.is_empty() {
            entry.insert("fields".to_string(), Value::Object(nested));
        }
        if let Some(items) = field.items.as_ref().filter(|i| i.has_quality()) {
            let mut item = Map::new();
            item.insert("type".to_string(), Value::String(items.field_type.clone()));
            item.insert("quality".to_string(), serde_json::to_value(&items.quality)?);
            entry.insert("items".to_string(), Value::Object(item));
        }
        out.insert(name.clone(), Value::Object(entry));
    }
    Ok(out)
}
