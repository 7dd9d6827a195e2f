//! Prompt builder for rendering templates and injecting answer policies.

use crate::types::{BuiltPrompt, PromptDefinition};
use askpolicy_core::config::AnswerPolicyConfig;
use askpolicy_core::{AppError, AppResult};
use handlebars::Handlebars;
use std::collections::HashMap;

/// Build a prompt from a definition and input variables.
///
/// # Example
/// ```no_run
/// use askpolicy_prompt::{build_prompt, default_answer_prompt};
/// use std::collections::HashMap;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let mut vars = HashMap::new();
/// vars.insert("question".to_string(), "How many leave days do I get?".to_string());
///
/// let built = build_prompt(&default_answer_prompt(), vars)?;
/// println!("User prompt: {}", built.user);
/// # Ok(())
/// # }
/// ```
pub fn build_prompt(
    definition: &PromptDefinition,
    variables: HashMap<String, String>,
) -> AppResult<BuiltPrompt> {
    tracing::debug!("Building prompt: {}", definition.id);

    let rendered = render_template(&definition.template, &variables)?;
    let system = definition
        .system
        .as_deref()
        .map(|system| render_template(system, &variables))
        .transpose()?;
    let context_included = variables
        .get("context")
        .is_some_and(|context| !context.trim().is_empty());

    Ok(BuiltPrompt::new(
        system,
        rendered,
        definition.id.clone(),
        context_included,
        variables,
    ))
}

/// Build the constrained answer prompt.
///
/// Injects the three answer policies (greeting reply, context-only answering,
/// not-specified phrase) alongside the assembled context and the question.
/// The definition's behavior supplies `tone` and `style`.
pub fn build_answer_prompt(
    definition: &PromptDefinition,
    question: &str,
    context: &str,
    policy: &AnswerPolicyConfig,
) -> AppResult<BuiltPrompt> {
    let greetings = policy
        .greetings
        .iter()
        .map(|g| format!("\"{}\"", g))
        .collect::<Vec<_>>()
        .join(", ");

    let mut variables = HashMap::new();
    variables.insert("question".to_string(), question.trim().to_string());
    variables.insert("context".to_string(), context.to_string());
    variables.insert("greetings".to_string(), greetings);
    variables.insert("tone".to_string(), definition.behavior.tone.clone());
    variables.insert("style".to_string(), definition.behavior.style.clone());
    variables.insert(
        "greetingResponse".to_string(),
        policy.greeting_response.clone(),
    );
    variables.insert(
        "notSpecifiedResponse".to_string(),
        policy.not_specified_response.clone(),
    );

    build_prompt(definition, variables)
}

/// Render a Handlebars template with variables.
fn render_template(template: &str, variables: &HashMap<String, String>) -> AppResult<String> {
    let mut handlebars = Handlebars::new();

    // Plain text output
    handlebars.register_escape_fn(handlebars::no_escape);

    handlebars
        .register_template_string("prompt", template)
        .map_err(|e| AppError::Prompt(format!("Failed to register template: {}", e)))?;

    handlebars
        .render("prompt", &variables)
        .map_err(|e| AppError::Prompt(format!("Failed to render template: {}", e)))
}
