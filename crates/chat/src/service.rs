//! Per-request chat pipeline.
//!
//! Each call runs retrieve → compose → generate → extract and, for
//! [`ChatService::answer`], persists the exchange. Upstream failures are
//! logged and folded into the reply so the caller always gets a response.

use crate::extract::{extract, ExtractMode};
use crate::history::{ChatEntry, HistoryStore};
use crate::repair::parse_json_blob;
use ragchat_core::{AppConfig, AppResult};
use ragchat_knowledge::{EmbeddingProvider, ScoredMatch, VectorIndex};
use ragchat_llm::{LlmClient, LlmRequest};
use ragchat_prompt::{
    compose, resolve_prompt, BuiltPrompt, PromptDefinition, CHAT_FILTERS_PROMPT,
    CHAT_STRUCTURED_PROMPT,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Pipeline tuning taken from configuration.
#[derive(Debug, Clone)]
pub struct ChatSettings {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_k: usize,
    pub structured_top_k: usize,
    pub extract_mode: ExtractMode,
}

impl ChatSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            model: config.llm.resolved_model().to_string(),
            max_tokens: config.llm.max_tokens,
            temperature: config.llm.resolved_temperature(),
            top_k: config.vector.top_k,
            structured_top_k: config.vector.structured_top_k,
            extract_mode: ExtractMode::from_strict(config.extraction.strict),
        }
    }
}

/// Prompt definitions used by the pipeline.
#[derive(Debug, Clone)]
pub struct ChatPrompts {
    pub filters: PromptDefinition,
    pub structured: PromptDefinition,
}

impl ChatPrompts {
    /// Resolve both prompts, preferring workspace overrides.
    pub fn resolve(workspace: &Path) -> AppResult<Self> {
        Ok(Self {
            filters: resolve_prompt(workspace, CHAT_FILTERS_PROMPT)?,
            structured: resolve_prompt(workspace, CHAT_STRUCTURED_PROMPT)?,
        })
    }
}

/// Reply to one chat query: the stored entry plus retrieval diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatReply {
    #[serde(flatten)]
    pub entry: ChatEntry,

    /// Set when retrieval failed and the answer was generated without context.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retrieval_error: Option<String>,
}

/// Result of the structured query endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredAnswer {
    pub summary: String,
    pub validated_output: Value,
    pub elasticsearch_query: Value,
}

impl StructuredAnswer {
    fn message(summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            validated_output: json!({}),
            elasticsearch_query: json!({}),
        }
    }
}

/// Retrieval-augmented chat over the company-data index.
pub struct ChatService {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    llm: Arc<dyn LlmClient>,
    history: Arc<dyn HistoryStore>,
    prompts: ChatPrompts,
    settings: ChatSettings,
}

impl ChatService {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
        llm: Arc<dyn LlmClient>,
        history: Arc<dyn HistoryStore>,
        prompts: ChatPrompts,
        settings: ChatSettings,
    ) -> Self {
        Self {
            embedder,
            index,
            llm,
            history,
            prompts,
            settings,
        }
    }

    pub fn settings(&self) -> &ChatSettings {
        &self.settings
    }

    /// Answer a query with a short summary and extracted filters.
    #[instrument(skip(self), fields(provider = self.llm.provider_name()))]
    pub async fn answer(&self, query: &str) -> ChatReply {
        let (context, retrieval_error) = match self.retrieve(query, self.settings.top_k).await {
            Ok(matches) => (context_json(&matches), None),
            Err(e) => {
                warn!("Retrieval failed, answering without context: {}", e);
                (json!([]), Some(e.to_string()))
            }
        };

        let (answer, filters) = match self.generate(&self.prompts.filters, &context, query).await {
            Ok(raw) => match extract(&raw, self.settings.extract_mode) {
                Ok(extracted) => (extracted.human_text, extracted.filters),
                Err(e) => {
                    warn!("Extraction failed: {}", e);
                    (format!("Error parsing model output: {}", e), Map::new())
                }
            },
            Err(e) => {
                warn!("Generation failed: {}", e);
                (format!("Error generating answer: {}", e), Map::new())
            }
        };

        let mut entry = ChatEntry::new(query, &answer, filters);
        match self.history.append(&entry).await {
            Ok(id) => entry.id = Some(id),
            Err(e) => warn!("Failed to save chat history: {}", e),
        }

        info!(filters = entry.filters.len(), "Answered query");
        ChatReply {
            entry,
            retrieval_error,
        }
    }

    /// Validate retrieved records, summarize them and propose a search query.
    ///
    /// Not persisted. `validated_output` always echoes the retrieved records
    /// grouped by source file.
    #[instrument(skip(self), fields(provider = self.llm.provider_name()))]
    pub async fn structured(&self, query: &str) -> StructuredAnswer {
        if query.trim().is_empty() {
            return StructuredAnswer::message("Please enter a query.");
        }

        let matches = match self.retrieve(query, self.settings.structured_top_k).await {
            Ok(matches) => matches,
            Err(e) => {
                warn!("Retrieval failed: {}", e);
                return StructuredAnswer::message(format!("Error connecting to database: {}", e));
            }
        };

        let grouped = Value::Object(group_by_source(&matches));

        let parsed = match self.generate(&self.prompts.structured, &grouped, query).await {
            Ok(raw) => parse_json_blob(&raw),
            Err(e) => Err(e),
        };

        match parsed {
            Ok(value) => {
                let summary = match value.get("summary") {
                    Some(Value::String(s)) => s.clone(),
                    Some(other) => other.to_string(),
                    None => "No summary generated.".to_string(),
                };
                let elasticsearch_query = value
                    .get("elasticsearch_query")
                    .cloned()
                    .unwrap_or_else(|| json!({}));
                StructuredAnswer {
                    summary,
                    validated_output: grouped,
                    elasticsearch_query,
                }
            }
            Err(e) => {
                warn!("Structured generation failed: {}", e);
                StructuredAnswer {
                    summary: format!("Error validating or generating query: {}", e),
                    validated_output: grouped,
                    elasticsearch_query: json!({}),
                }
            }
        }
    }

    /// Most recent history entries, newest first.
    pub async fn recent(&self, limit: usize) -> AppResult<Vec<ChatEntry>> {
        self.history.recent(limit).await
    }

    async fn retrieve(&self, query: &str, top_k: usize) -> AppResult<Vec<ScoredMatch>> {
        let vector = self.embedder.embed(query).await?;
        let matches = self.index.search(&vector, top_k).await?;
        debug!(count = matches.len(), index = self.index.name(), "Retrieved matches");
        Ok(matches)
    }

    async fn generate(
        &self,
        prompt: &PromptDefinition,
        context: &Value,
        query: &str,
    ) -> AppResult<String> {
        let built: BuiltPrompt = compose(prompt, context, query)?;
        let built_id = built.metadata.source_prompt_id;

        let mut request = LlmRequest::new(built.user, &self.settings.model)
            .with_max_tokens(self.settings.max_tokens)
            .with_temperature(self.settings.temperature);
        if let Some(system) = built.system {
            request = request.with_system(system);
        }

        let response = self.llm.complete(&request).await?;
        debug!(
            prompt = %built_id,
            model = %response.model,
            tokens = response.usage.total_tokens,
            "Generated response"
        );
        Ok(response.content)
    }
}

/// Retrieved context as sent to the model.
fn context_json(matches: &[ScoredMatch]) -> Value {
    Value::Array(
        matches
            .iter()
            .map(|m| {
                json!({
                    "source": m.source(),
                    "key": m.key(),
                    "text": m.text,
                    "score": m.score,
                })
            })
            .collect(),
    )
}

/// Match texts grouped by source file; JSON texts are embedded as values.
fn group_by_source(matches: &[ScoredMatch]) -> Map<String, Value> {
    let mut grouped = Map::new();
    for m in matches {
        if m.text.is_empty() {
            continue;
        }
        let item = serde_json::from_str::<Value>(&m.text).unwrap_or_else(|_| json!({"text": m.text}));
        let entry = grouped
            .entry(m.source().to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        if let Value::Array(items) = entry {
            items.push(item);
        }
    }
    grouped
}
