//! Intent and complexity classification of component requests.

use forge_core::prompts::load_prompt;
use forge_core::{
    ChatMessage, Complexity, ForgeConfig, Intent, ModelProvider, ModelRequest, Result, TokenUsage,
};
use serde::{Deserialize, Serialize};
use serde_json::from_str;
use std::sync::Arc;
use tracing::{debug, warn};

/// Structured reading of a component request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    /// Component category
    pub intent: Intent,
    /// Complexity tier
    pub complexity: Complexity,
    /// Features the request asks for
    pub key_features: Vec<String>,
    /// Packages the model expects to need
    pub suggested_dependencies: Vec<String>,
    /// Model's guess at the component size
    pub estimated_lines: Option<u32>,
}

impl Default for Classification {
    fn default() -> Self {
        Self {
            intent: Intent::Custom,
            complexity: Complexity::Moderate,
            key_features: Vec::new(),
            suggested_dependencies: Vec::new(),
            estimated_lines: None,
        }
    }
}

/// Wire shape of the classification reply; every field is optional.
#[derive(Deserialize)]
struct RawClassification {
    #[serde(default)]
    intent: String,
    #[serde(default)]
    complexity: String,
    #[serde(default)]
    key_features: Vec<String>,
    #[serde(default)]
    suggested_dependencies: Vec<String>,
    #[serde(default)]
    estimated_lines: Option<u32>,
}

/// Parses the first JSON object in a model reply.
///
/// The object spans from the first `{` to the last `}`. Returns `None` when no
/// such span exists or it is not valid JSON of the expected shape.
pub fn parse_classification(response_text: &str) -> Option<Classification> {
    let json_str = match (response_text.find('{'), response_text.rfind('}')) {
        (Some(start), Some(end)) if start < end => &response_text[start..=end],
        _ => return None,
    };

    let raw: RawClassification = from_str(json_str).ok()?;
    Some(Classification {
        intent: Intent::from_label(&raw.intent),
        complexity: Complexity::from_label(&raw.complexity),
        key_features: raw.key_features,
        suggested_dependencies: raw.suggested_dependencies,
        estimated_lines: raw.estimated_lines,
    })
}

/// Result of one classification call.
#[derive(Debug, Clone)]
pub struct ClassificationOutcome {
    /// Parsed classification, or the default when the reply was unusable
    pub classification: Classification,
    /// Tokens spent on the call
    pub usage: TokenUsage,
    /// Model that served the call
    pub model_id: String,
}

/// Classifies requests with a single low-temperature model call.
pub struct IntentClassifier {
    provider: Arc<dyn ModelProvider>,
    system_prompt: String,
    model_id: String,
    temperature: f32,
    max_tokens: u32,
}

impl IntentClassifier {
    /// Creates a classifier using the fast model from `config`.
    ///
    /// # Errors
    /// Returns an error if the embedded classification prompt cannot be loaded.
    pub fn new(provider: Arc<dyn ModelProvider>, config: &ForgeConfig) -> Result<Self> {
        Ok(Self {
            provider,
            system_prompt: load_prompt("classification")?,
            model_id: config.models.fast_model.clone(),
            temperature: config.pipeline.classification_temperature,
            max_tokens: config.pipeline.classification_max_tokens,
        })
    }

    /// Classifies `prompt`.
    ///
    /// An unparseable reply yields [`Classification::default`].
    ///
    /// # Errors
    /// Returns an error if the model call fails.
    pub async fn classify(&self, prompt: &str) -> Result<ClassificationOutcome> {
        let request = ModelRequest::new(self.model_id.clone())
            .with_message(ChatMessage::system(self.system_prompt.clone()))
            .with_message(ChatMessage::user(prompt))
            .with_temperature(self.temperature)
            .with_max_tokens(self.max_tokens);

        let response = self.provider.invoke(&request).await?;

        let classification = parse_classification(&response.content).unwrap_or_else(|| {
            warn!(
                "Could not parse classification, using default: {}",
                response.content
            );
            Classification::default()
        });

        debug!(
            "Classified request as {} ({})",
            classification.intent, classification.complexity
        );

        Ok(ClassificationOutcome {
            classification,
            usage: response.usage,
            model_id: response.model_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_wrapped_json() {
        let text = r#"Sure! Here you go:
{"intent": "chart", "complexity": "simple", "key_features": ["bar chart"],
 "suggested_dependencies": ["recharts"], "estimated_lines": 80}
Let me know if you need anything else."#;

        let parsed = parse_classification(text);
        assert_eq!(
            parsed,
            Some(Classification {
                intent: Intent::Chart,
                complexity: Complexity::Simple,
                key_features: vec!["bar chart".to_owned()],
                suggested_dependencies: vec!["recharts".to_owned()],
                estimated_lines: Some(80),
            })
        );
    }

    #[test]
    fn test_unknown_labels_fall_back() {
        let reply = r#"{"intent": "spreadsheet", "complexity": "epic", "key_features": ["grid"]}"#;
        let classification = parse_classification(reply).unwrap();
        assert_eq!(classification.key_features, vec!["grid"]);
        assert_eq!(classification.intent, Intent::Custom);
        assert_eq!(classification.complexity, Complexity::Moderate);
    }

    #[test]
    fn test_unparseable_replies() {
        assert_eq!(parse_classification("no json here"), None);
        assert_eq!(parse_classification("} backwards {"), None);
        assert_eq!(parse_classification("{intent: chart}"), None);
    }
}
