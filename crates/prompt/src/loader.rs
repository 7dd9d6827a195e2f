//! Prompt loader for YAML prompt definitions.

use crate::types::{PromptBehavior, PromptDefinition};
use askpolicy_core::config::STATE_DIR;
use askpolicy_core::{AppError, AppResult};
use std::path::{Path, PathBuf};

/// Identifier of the constrained answer prompt.
pub const ANSWER_PROMPT_ID: &str = "answer";

/// Built-in answer template.
///
/// The `Context:`, `Question:` and `Answer:` lines must stay on lines of
/// their own. A bare prompt with no attached context is split on them.
const DEFAULT_ANSWER_TEMPLATE: &str = r#"You are an HR assistant answering employee questions about company policy.

Follow these rules:
1. If the question is only a greeting such as {{greetings}}, reply exactly: "{{greetingResponse}}"
2. Answer strictly from the context below. Do not use any outside knowledge.
3. If the context does not contain the answer, reply exactly: "{{notSpecifiedResponse}}"
4. Keep the answer {{style}} and factual, in a {{tone}} tone.

Context:
{{context}}

Question:
{{question}}

Answer:
"#;

fn prompts_dir(workspace_path: &Path) -> PathBuf {
    workspace_path.join(STATE_DIR).join("prompts")
}

/// The built-in constrained answer prompt.
pub fn default_answer_prompt() -> PromptDefinition {
    PromptDefinition {
        id: ANSWER_PROMPT_ID.to_string(),
        title: "Policy answer".to_string(),
        api_version: "1.0".to_string(),
        created_by: "askpolicy".to_string(),
        behavior: PromptBehavior::default(),
        system: None,
        template: DEFAULT_ANSWER_TEMPLATE.to_string(),
    }
}

/// Load a prompt definition by ID from the workspace.
///
/// This function searches for a prompt file named `<id>.yml` in the
/// `.askpolicy/prompts/` directory.
///
/// # Example
/// ```no_run
/// use askpolicy_prompt::load_prompt;
/// use std::path::Path;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let prompt = load_prompt(Path::new("."), "answer")?;
/// println!("Loaded prompt: {}", prompt.title);
/// # Ok(())
/// # }
/// ```
pub fn load_prompt(workspace_path: &Path, prompt_id: &str) -> AppResult<PromptDefinition> {
    let prompt_file = prompts_dir(workspace_path).join(format!("{}.yml", prompt_id));

    tracing::debug!("Loading prompt from: {:?}", prompt_file);

    if !prompt_file.exists() {
        return Err(AppError::Prompt(format!(
            "Prompt file not found: {:?}",
            prompt_file
        )));
    }

    let contents = std::fs::read_to_string(&prompt_file).map_err(|e| {
        AppError::Prompt(format!(
            "Failed to read prompt file {:?}: {}",
            prompt_file, e
        ))
    })?;

    let definition: PromptDefinition = serde_yaml::from_str(&contents).map_err(|e| {
        AppError::Prompt(format!(
            "Failed to parse prompt YAML {:?}: {}",
            prompt_file, e
        ))
    })?;

    validate_prompt(&definition)?;

    tracing::info!("Loaded prompt: {} ({})", definition.id, definition.title);

    Ok(definition)
}

/// Load the workspace override for `prompt_id`, or the built-in prompt when
/// no override file exists.
///
/// A present but invalid override file is an error rather than silently
/// ignored.
pub fn resolve_prompt(workspace_path: &Path, prompt_id: &str) -> AppResult<PromptDefinition> {
    let override_file = prompts_dir(workspace_path).join(format!("{}.yml", prompt_id));
    if override_file.exists() {
        return load_prompt(workspace_path, prompt_id);
    }

    if prompt_id == ANSWER_PROMPT_ID {
        tracing::debug!("Using built-in answer prompt");
        return Ok(default_answer_prompt());
    }

    Err(AppError::Prompt(format!("Unknown prompt: {}", prompt_id)))
}

fn validate_prompt(def: &PromptDefinition) -> AppResult<()> {
    if def.id.is_empty() {
        return Err(AppError::Prompt("Prompt ID cannot be empty".to_string()));
    }

    if def.title.is_empty() {
        return Err(AppError::Prompt("Prompt title cannot be empty".to_string()));
    }

    if def.template.trim().is_empty() {
        return Err(AppError::Prompt(
            "Prompt template cannot be empty".to_string(),
        ));
    }

    if !def.api_version.contains('.') {
        return Err(AppError::Prompt(format!(
            "Invalid apiVersion format: {}. Expected format: 'x.y'",
            def.api_version
        )));
    }

    // The answer prompt must carry both retrieval inputs.
    if def.id == ANSWER_PROMPT_ID
        && !(def.template.contains("{{context}}") && def.template.contains("{{question}}"))
    {
        return Err(AppError::Prompt(
            "Answer prompt template must reference {{context}} and {{question}}".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_prompt(dir: &Path, id: &str, content: &str) -> PathBuf {
        let prompts_dir = prompts_dir(dir);
        fs::create_dir_all(&prompts_dir).unwrap();

        let file_path = prompts_dir.join(format!("{}.yml", id));
        fs::write(&file_path, content).unwrap();
        file_path
    }

    fn valid_prompt(id: &str) -> String {
        format!(
            r#"
id: {}
title: "Custom answer"
apiVersion: "1.0"
createdBy: hr-team
template: "Context:\n{{{{context}}}}\n\nQuestion:\n{{{{question}}}}\n"
"#,
            id
        )
    }

    #[test]
    fn test_load_valid_prompt() {
        let temp_dir = TempDir::new().unwrap();
        write_prompt(temp_dir.path(), "answer", &valid_prompt("answer"));

        let prompt = load_prompt(temp_dir.path(), "answer").unwrap();
        assert_eq!(prompt.id, "answer");
        assert_eq!(prompt.title, "Custom answer");
    }

    #[test]
    fn test_load_nonexistent_prompt() {
        let temp_dir = TempDir::new().unwrap();
        assert!(load_prompt(temp_dir.path(), "nonexistent").is_err());
    }

    #[test]
    fn test_load_invalid_yaml() {
        let temp_dir = TempDir::new().unwrap();
        write_prompt(temp_dir.path(), "invalid", "invalid: yaml: content:");

        assert!(load_prompt(temp_dir.path(), "invalid").is_err());
    }

    #[test]
    fn test_answer_prompt_requires_inputs() {
        let temp_dir = TempDir::new().unwrap();
        write_prompt(
            temp_dir.path(),
            "answer",
            "id: answer\ntitle: Broken\napiVersion: \"1.0\"\ntemplate: \"{{question}}\"\n",
        );

        assert!(matches!(
            load_prompt(temp_dir.path(), "answer"),
            Err(AppError::Prompt(_))
        ));
    }

    #[test]
    fn test_resolve_falls_back_to_builtin() {
        let temp_dir = TempDir::new().unwrap();
        let prompt = resolve_prompt(temp_dir.path(), ANSWER_PROMPT_ID).unwrap();
        assert_eq!(prompt.template, DEFAULT_ANSWER_TEMPLATE);

        assert!(resolve_prompt(temp_dir.path(), "summary").is_err());
    }

    #[test]
    fn test_resolve_prefers_override() {
        let temp_dir = TempDir::new().unwrap();
        write_prompt(temp_dir.path(), "answer", &valid_prompt("answer"));

        let prompt = resolve_prompt(temp_dir.path(), ANSWER_PROMPT_ID).unwrap();
        assert_eq!(prompt.title, "Custom answer");
    }

    #[test]
    fn test_builtin_prompt_is_valid() {
        assert!(validate_prompt(&default_answer_prompt()).is_ok());
    }
}
