//! LM backend speaking the OpenAI-compatible chat completions API.
use super::LmBackend;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Default API root when the config does not name one.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
/// Default model, overridable through `OPENAI_MODEL`.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
/// Default environment variable holding the API key.
pub const DEFAULT_API_KEY_ENV: &str = "OPENAI_API_KEY";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Backend posting each prompt as a single user message.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

impl HttpBackend {
    pub fn new(base_url: &str, model: &str, api_key: Option<String>) -> Self {
        Self {
            endpoint: chat_endpoint(base_url),
            model: model.to_string(),
            api_key,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl LmBackend for HttpBackend {
    fn complete(&self, prompt: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: 0.0,
        };

        let start = Instant::now();
        let mut call =
            ureq::post(self.endpoint.as_str()).header("Content-Type", "application/json");
        if let Some(key) = &self.api_key {
            call = call.header("Authorization", format!("Bearer {key}"));
        }
        let mut response = match call.send_json(&request) {
            Ok(response) => response,
            Err(ureq::Error::StatusCode(code)) => {
                return Err(anyhow!("LM endpoint {} returned HTTP {code}", self.endpoint))
            }
            Err(err) => {
                return Err(err).with_context(|| format!("POST {}", self.endpoint));
            }
        };
        let body: ChatResponse = response
            .body_mut()
            .read_json()
            .context("decode chat completion response")?;

        let answer = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| anyhow!("chat completion response has no message content"))?;

        tracing::info!(
            elapsed_ms = start.elapsed().as_millis(),
            model = %self.model,
            prompt_bytes = prompt.len(),
            response_bytes = answer.len(),
            "lm invoke complete"
        );
        Ok(answer)
    }
}

fn chat_endpoint(base_url: &str) -> String {
    let base = base_url.trim_end_matches('/');
    if base.ends_with("/chat/completions") {
        base.to_string()
    } else {
        format!("{base}/chat/completions")
    }
}
