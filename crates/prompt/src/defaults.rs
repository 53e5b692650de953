//! Built-in prompt definitions shipped with the binary.

use crate::types::PromptDefinition;
use ragchat_core::{AppError, AppResult};

/// Summary plus fenced filter block, used by `POST /get`.
pub const CHAT_FILTERS_PROMPT: &str = "chat.filters";

/// Single JSON object with validated data and a search query, used by `POST /structured`.
pub const CHAT_STRUCTURED_PROMPT: &str = "chat.structured";

const CHAT_FILTERS_YAML: &str = include_str!("../prompts/chat.filters.yml");
const CHAT_STRUCTURED_YAML: &str = include_str!("../prompts/chat.structured.yml");

/// Look up a built-in prompt definition by ID.
///
/// Returns `Ok(None)` when no built-in prompt has that ID.
pub fn builtin_prompt(prompt_id: &str) -> AppResult<Option<PromptDefinition>> {
    let yaml = match prompt_id {
        CHAT_FILTERS_PROMPT => CHAT_FILTERS_YAML,
        CHAT_STRUCTURED_PROMPT => CHAT_STRUCTURED_YAML,
        _ => return Ok(None),
    };

    let definition: PromptDefinition = serde_yaml::from_str(yaml).map_err(|e| {
        AppError::Prompt(format!("Built-in prompt '{}' is invalid: {}", prompt_id, e))
    })?;

    Ok(Some(definition))
}
