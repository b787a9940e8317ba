//! Prompt loading utilities
//!
//! Each prompt file is a markdown document with Usage and Prompt sections,
//! embedded at compile time using `include_str!`. Placeholders are written as
//! `{{name}}` and filled by [`render`].

use crate::{Error, Result};

const CLASSIFICATION_MD: &str = include_str!("../../../../prompts/classification.md");
const GENERATION_MD: &str = include_str!("../../../../prompts/generation.md");
const REFLEXION_MD: &str = include_str!("../../../../prompts/reflexion.md");

/// Loads a prompt by name
///
/// # Errors
/// Returns an error if the prompt name is unknown or the prompt section cannot be extracted
pub fn load_prompt(name: &str) -> Result<String> {
    let content = match name {
        "classification" => CLASSIFICATION_MD,
        "generation" => GENERATION_MD,
        "reflexion" => REFLEXION_MD,
        _ => return Err(Error::Config(format!("Unknown prompt: {name}"))),
    };

    extract_prompt_section(content)
}

/// Replaces every `{{key}}` placeholder with its value.
pub fn render(template: &str, values: &[(&str, &str)]) -> String {
    values
        .iter()
        .fold(template.to_owned(), |rendered, (key, value)| {
            rendered.replace(&format!("{{{{{key}}}}}"), value)
        })
}

/// Extracts the Prompt section from a markdown file
///
/// # Errors
/// Returns an error if the Prompt section cannot be found
fn extract_prompt_section(content: &str) -> Result<String> {
    let prompt_start = content
        .find("## Prompt")
        .ok_or_else(|| Error::Config("Prompt section not found".to_owned()))?;

    let prompt_content_start = content[prompt_start..]
        .find('\n')
        .ok_or_else(|| Error::Config("Invalid prompt format".to_owned()))?
        + prompt_start
        + 1;

    // ## Prompt is always the last top-level section
    Ok(content[prompt_content_start..].trim().to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_prompt_section() -> Result<()> {
        let markdown = r"# Test Prompt

## Usage

This is usage info.

## Prompt

This is the actual prompt content.

It can have multiple lines.
";

        let result = extract_prompt_section(markdown)?;
        assert_eq!(
            result,
            "This is the actual prompt content.\n\nIt can have multiple lines."
        );
        Ok(())
    }

    #[test]
    fn test_embedded_prompts_load() -> Result<()> {
        for name in ["classification", "generation", "reflexion"] {
            let prompt = load_prompt(name)?;
            assert!(!prompt.contains("## Usage"), "{name} leaked its usage section");
            assert!(!prompt.is_empty());
        }
        load_prompt("nonexistent").unwrap_err();
        Ok(())
    }

    #[test]
    fn test_render_placeholders() {
        let rendered = render(
            "Allowed: {{imports}}. Max {{max_lines}} lines, {{max_lines}} tops.",
            &[("imports", "react"), ("max_lines", "500")],
        );
        assert_eq!(rendered, "Allowed: react. Max 500 lines, 500 tops.");
    }
}
