//! Prompt builder for rendering templates with retrieved context.

use crate::types::{BuiltPrompt, PromptDefinition};
use handlebars::Handlebars;
use ragchat_core::{AppError, AppResult};
use std::collections::HashMap;

/// Compose the prompt for a query from its retrieved context.
///
/// The context is serialized as pretty-printed JSON into the `context`
/// variable; the raw query goes into `input`. Output is a pure function of
/// the definition, context and query.
///
/// # Example
/// ```no_run
/// use ragchat_prompt::{builtin_prompt, compose, CHAT_FILTERS_PROMPT};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let def = builtin_prompt(CHAT_FILTERS_PROMPT)?.expect("built-in prompt");
/// let context = serde_json::json!([{"source": "industry.json", "text": "Fintech"}]);
/// let built = compose(&def, &context, "fintech companies in Berlin")?;
/// println!("{}", built.user);
/// # Ok(())
/// # }
/// ```
pub fn compose(
    definition: &PromptDefinition,
    context: &serde_json::Value,
    query: &str,
) -> AppResult<BuiltPrompt> {
    let context_json = serde_json::to_string_pretty(context)?;

    let mut variables = HashMap::new();
    variables.insert("context".to_string(), context_json);
    variables.insert("input".to_string(), query.to_string());

    build_prompt(definition, variables)
}

/// Build a prompt from a definition and input variables.
///
/// Renders both the system instruction (if any) and the user template.
pub fn build_prompt(
    definition: &PromptDefinition,
    variables: HashMap<String, String>,
) -> AppResult<BuiltPrompt> {
    tracing::debug!("Building prompt: {}", definition.id);

    let system = match definition.system {
        Some(ref system) => Some(render_template(system, &variables)?),
        None => None,
    };
    let user = render_template(&definition.template, &variables)?;

    Ok(BuiltPrompt::new(system, user, definition.id.clone()))
}

/// Render a Handlebars template with variables.
fn render_template(template: &str, variables: &HashMap<String, String>) -> AppResult<String> {
    let mut handlebars = Handlebars::new();

    // Prompts are plain text, never HTML
    handlebars.register_escape_fn(handlebars::no_escape);

    handlebars
        .register_template_string("prompt", template)
        .map_err(|e| AppError::Prompt(format!("Failed to register template: {}", e)))?;

    let rendered = handlebars
        .render("prompt", variables)
        .map_err(|e| AppError::Prompt(format!("Failed to render template: {}", e)))?;

    Ok(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults::{builtin_prompt, CHAT_FILTERS_PROMPT, CHAT_STRUCTURED_PROMPT};

    fn create_test_definition(system: Option<&str>) -> PromptDefinition {
        PromptDefinition {
            id: "test.prompt".to_string(),
            title: "Test".to_string(),
            api_version: "1.0".to_string(),
            system: system.map(str::to_string),
            template: "Context: {{context}}\nQuestion: {{input}}".to_string(),
        }
    }

    #[test]
    fn test_render_simple_template() {
        let mut vars = HashMap::new();
        vars.insert("input".to_string(), "Hello, world!".to_string());

        let result = render_template("Question: {{input}}", &vars).unwrap();
        assert_eq!(result, "Question: Hello, world!");
    }

    #[test]
    fn test_render_does_not_escape_html() {
        let mut vars = HashMap::new();
        vars.insert("input".to_string(), "R&D <labs> \"quoted\"".to_string());

        let result = render_template("{{input}}", &vars).unwrap();
        assert_eq!(result, "R&D <labs> \"quoted\"");
    }

    #[test]
    fn test_compose_injects_context_and_query() {
        let def = create_test_definition(Some("System rules"));
        let context = serde_json::json!([{"source": "industry.json", "text": "Fintech"}]);

        let built = compose(&def, &context, "fintech startups").unwrap();
        assert_eq!(built.system.as_deref(), Some("System rules"));
        assert!(built.user.contains("\"source\": \"industry.json\""));
        assert!(built.user.ends_with("Question: fintech startups"));
        assert_eq!(built.metadata.source_prompt_id, "test.prompt");
    }

    #[test]
    fn test_compose_is_deterministic() {
        let def = builtin_prompt(CHAT_FILTERS_PROMPT).unwrap().unwrap();
        let context = serde_json::json!([{"source": "a.json", "text": "x"}]);

        let first = compose(&def, &context, "query").unwrap();
        let second = compose(&def, &context, "query").unwrap();
        assert_eq!(first.user, second.user);
        assert_eq!(first.system, second.system);
    }

    #[test]
    fn test_builtin_templates_render() {
        let context = serde_json::json!({"company_type.json": [{"text": "Private Limited Company"}]});
        for id in [CHAT_FILTERS_PROMPT, CHAT_STRUCTURED_PROMPT] {
            let def = builtin_prompt(id).unwrap().unwrap();
            let built = compose(&def, &context, "private companies").unwrap();
            assert!(built.user.contains("private companies"));
            assert!(built.user.contains("Private Limited Company"));
        }
    }

    #[test]
    fn test_render_template_missing_variable() {
        let vars = HashMap::new();
        let result = render_template("Question: {{missing}}", &vars).unwrap();
        assert_eq!(result, "Question: ");
    }
}
