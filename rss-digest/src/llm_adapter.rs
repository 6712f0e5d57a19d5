//! OpenAI-compatible chat-completions adapter for theme extraction.
//!
//! Works against api.openai.com, Azure OpenAI, Ollama, or anything else that
//! speaks the chat-completions wire format.

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use interfaces::defs::{ThemeModel, ThemeReport};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

const MAX_INPUT_CHARS: usize = 24_000;

pub struct OpenAiThemeModel {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
}

impl OpenAiThemeModel {
    pub fn new(api_url: String, api_key: String, model: String, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("building chat-completions client")?;
        Ok(Self {
            client,
            api_url,
            api_key,
            model,
        })
    }

    fn system_prompt() -> &'static str {
        r#"You are the editor of a daily technology reading digest.
You receive the titles, sources and excerpts of today's articles.

1. List 1-5 core themes that run through the articles, each a short label of at most six words.
2. Write one short editorial observation (2-3 sentences) about what stands out today.

Respond with valid JSON only, no markdown:
{"themes": ["theme one", "theme two"], "observation": "..."}"#
    }

    /// LLMs sometimes wrap JSON in markdown fences or prose; keep just the object.
    fn sanitize_json(raw_text: &str) -> &str {
        let trimmed = raw_text.trim();
        match (trimmed.find('{'), trimmed.rfind('}')) {
            (Some(start), Some(end)) if start < end => &trimmed[start..=end],
            _ => trimmed,
        }
    }

    fn parse_report(raw_text: &str) -> anyhow::Result<ThemeReport> {
        let json = Self::sanitize_json(raw_text);
        serde_json::from_str(json).with_context(|| format!("model returned unparsable JSON: {}", json))
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: MessageContent,
}

#[derive(Deserialize)]
struct MessageContent {
    content: String,
}

#[async_trait]
impl ThemeModel for OpenAiThemeModel {
    fn model_name(&self) -> String {
        format!("openai-compatible ({})", self.model)
    }

    async fn summarize(&self, text: &str) -> anyhow::Result<ThemeReport> {
        let input = crate::rss_utils::text::truncate_chars(text, MAX_INPUT_CHARS);
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage { role: "system", content: Self::system_prompt() },
                ChatMessage { role: "user", content: &input },
            ],
            temperature: 0.2,
            response_format: ResponseFormat { format_type: "json_object" },
        };

        info!("Requesting themes from {}", self.model_name());
        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .context("chat-completions request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("chat-completions API error {}: {}", status, body));
        }

        let chat: ChatResponse = response.json().await.context("decoding chat-completions response")?;
        let content = chat
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| anyhow!("chat-completions response had no choices"))?;

        debug!("Theme model raw response: {}", content);
        Self::parse_report(&content)
    }
}
