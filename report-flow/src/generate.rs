//! Report generation: one prompt, one provider call, one raw reply.
//!
//! The generator does not guarantee valid JSON (that is the normalizer's
//! job), but it does perform first-pass extraction of the JSON span from
//! replies that wrap the object in prose.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use tracing::info;

use crate::config::{GeneratorConfig, Provider};
use crate::error::{ReportError, Result};
use crate::extract::ExtractedText;

const GROQ_API_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Document text is excerpted to this many characters before prompting.
pub const MAX_DOCUMENT_CHARS: usize = 3000;

const REPORT_PROMPT: &str = r##"You are a senior UI/UX designer producing a structured design report
for an e-commerce product brief.

Reply with a SINGLE JSON object and nothing else: no markdown fences,
no commentary before or after. The object must have exactly this shape:

{
  "project_name": "name taken from the document",
  "summary": "what this application does",
  "screens": [
    {
      "name": "Home",
      "layout": [
        {
          "component": "gradient_banner",
          "title": "text for the banner",
          "height": 280
        },
        {
          "component": "filter_chips",
          "items": ["Category1", "Category2"]
        }
      ],
      "description": "what this screen is for"
    }
  ],
  "styles": {
    "colors": {
      "primary": "#0055FF",
      "secondary": "#FFFFFF",
      "accent": "#111111"
    },
    "typography": {
      "heading": "Inter 700",
      "body": "Inter 400"
    },
    "components": ["gradient_banner", "filter_chips"]
  }
}

Component kinds to draw from: gradient_banner, elevated_container,
rounded_card, filter_chips, event_cards, section_heading, bottom_sheet,
floating_action_button. Each layout section is an object whose "component"
names the kind; all other keys are free-form style/content attributes.
Include the screens the document calls for, with content taken from the
document rather than generic filler.

Document:
"{DOCUMENT_TEXT}"
"##;

/// A language-model backend: one prompt in, one raw text reply out.
///
/// Implementations differ only in their request/response envelope; the
/// variant in use is picked by [`Provider`] configuration.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Single attempt, no retry. Transport, auth, quota, and reply-shape
    /// failures all surface as [`ReportError::Generation`].
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// Groq's OpenAI-compatible chat-completions envelope.
pub struct GroqProvider {
    client: Client,
    api_key: String,
    model: String,
}

impl GroqProvider {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }
}

#[async_trait]
impl CompletionProvider for GroqProvider {
    fn name(&self) -> &str {
        "groq"
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let payload = json!({
            "model": self.model,
            "temperature": 0.2,
            "max_tokens": 3000,
            "messages": [
                {"role": "user", "content": prompt}
            ]
        });

        let response = self
            .client
            .post(GROQ_API_URL)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| ReportError::generation(self.name(), e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ReportError::generation(
                self.name(),
                format!("HTTP {status}: {body}"),
            ));
        }

        let reply: Value = response
            .json()
            .await
            .map_err(|e| ReportError::generation(self.name(), e.to_string()))?;
        reply["choices"][0]["message"]["content"]
            .as_str()
            .map(|content| content.trim().to_string())
            .ok_or_else(|| ReportError::generation(self.name(), "reply carried no message content"))
    }
}

/// Gemini's `generateContent` envelope.
pub struct GeminiProvider {
    client: Client,
    api_key: String,
    model: String,
}

impl GeminiProvider {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }
}

#[async_trait]
impl CompletionProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let url = format!("{GEMINI_API_URL}/{}:generateContent", self.model);
        let payload = json!({
            "contents": [{"parts": [{"text": prompt}]}],
            "generationConfig": {"temperature": 0.2, "maxOutputTokens": 3000}
        });

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&payload)
            .send()
            .await
            .map_err(|e| ReportError::generation(self.name(), e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ReportError::generation(
                self.name(),
                format!("HTTP {status}: {body}"),
            ));
        }

        let reply: Value = response
            .json()
            .await
            .map_err(|e| ReportError::generation(self.name(), e.to_string()))?;
        reply["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .map(|content| content.trim().to_string())
            .ok_or_else(|| ReportError::generation(self.name(), "reply carried no candidate text"))
    }
}

/// Turns extracted document text into a raw (hopefully-JSON) model reply.
pub struct ReportGenerator {
    provider: Arc<dyn CompletionProvider>,
}

impl ReportGenerator {
    pub fn new(provider: Arc<dyn CompletionProvider>) -> Self {
        Self { provider }
    }

    /// Select the provider variant by configuration.
    pub fn from_config(config: &GeneratorConfig) -> Self {
        let provider: Arc<dyn CompletionProvider> = match config.provider {
            Provider::Groq => Arc::new(GroqProvider::new(&config.api_key, &config.model)),
            Provider::Gemini => Arc::new(GeminiProvider::new(&config.api_key, &config.model)),
        };
        Self::new(provider)
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Embed the (length-capped) document text into the fixed JSON-only
    /// instruction prompt.
    pub fn build_prompt(&self, document_text: &str) -> String {
        let excerpt: String = document_text.chars().take(MAX_DOCUMENT_CHARS).collect();
        REPORT_PROMPT.replace("{DOCUMENT_TEXT}", &excerpt)
    }

    /// One provider call; the reply is narrowed to its first JSON object span
    /// but not validated further.
    pub async fn generate(&self, extracted: &ExtractedText) -> Result<String> {
        let prompt = self.build_prompt(&extracted.text);
        let raw = self.provider.complete(&prompt).await?;
        info!(provider = self.provider.name(), reply_chars = raw.len(), "completion received");
        Ok(extract_json_span(&raw).to_string())
    }
}

/// Locate the first top-level `{…}` span via a balanced-brace scan.
///
/// No `{` at all returns the input unchanged. A `{` that never balances
/// returns everything from the first `{` on, leaving truncation repair to the
/// normalizer. Best-effort: a balanced span is found correctly even around
/// string-embedded braces, but pathological replies stay the normalizer's
/// problem.
pub fn extract_json_span(raw: &str) -> &str {
    let Some(start) = raw.find('{') else {
        return raw;
    };

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, c) in raw[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return raw[start..start + i + c.len_utf8()].trim();
                }
            }
            _ => {}
        }
    }
    raw[start..].trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_json_span_from_prose_wrapped_reply() {
        assert_eq!(
            extract_json_span(r#"Here is your JSON: {"a":1} Thanks!"#),
            r#"{"a":1}"#
        );
    }

    #[test]
    fn reply_without_brace_is_returned_unchanged() {
        assert_eq!(extract_json_span("no json here"), "no json here");
    }

    #[test]
    fn nested_and_string_embedded_braces_stay_inside_the_span() {
        let raw = r#"note {"a": {"b": "} tricky {"}, "c": 2} trailing"#;
        assert_eq!(extract_json_span(raw), r#"{"a": {"b": "} tricky {"}, "c": 2}"#);
    }

    #[test]
    fn unbalanced_reply_keeps_suffix_from_first_brace() {
        assert_eq!(
            extract_json_span(r#"partial: {"a": {"b": 1}"#),
            r#"{"a": {"b": 1}"#
        );
    }

    #[test]
    fn prompt_embeds_capped_document_text() {
        let generator = ReportGenerator::from_config(&GeneratorConfig::new(
            Provider::Groq,
            "test-key",
            "llama-3.1-8b-instant",
        ));
        let long_text = "x".repeat(MAX_DOCUMENT_CHARS + 500);
        let prompt = generator.build_prompt(&long_text);
        assert!(prompt.contains("SINGLE JSON object"));
        assert!(prompt.contains(&"x".repeat(MAX_DOCUMENT_CHARS)));
        assert!(!prompt.contains(&"x".repeat(MAX_DOCUMENT_CHARS + 1)));
    }

    #[test]
    fn provider_variant_follows_configuration() {
        let groq = ReportGenerator::from_config(&GeneratorConfig::new(Provider::Groq, "k", "m"));
        assert_eq!(groq.provider_name(), "groq");
        let gemini = ReportGenerator::from_config(&GeneratorConfig::new(Provider::Gemini, "k", "m"));
        assert_eq!(gemini.provider_name(), "gemini");
    }

    /// Live smoke test against the real Groq endpoint.
    /// Usage: GROQ_API_KEY=key cargo test live_groq_completion
    #[tokio::test]
    async fn live_groq_completion() -> anyhow::Result<()> {
        let Ok(api_key) = std::env::var("GROQ_API_KEY") else {
            println!("Skipping test - set GROQ_API_KEY environment variable");
            return Ok(());
        };
        let provider = GroqProvider::new(api_key, "llama-3.1-8b-instant");
        let reply = provider
            .complete("Reply with the JSON object {\"ok\": true} and nothing else.")
            .await?;
        assert!(!reply.trim().is_empty());
        Ok(())
    }
}
