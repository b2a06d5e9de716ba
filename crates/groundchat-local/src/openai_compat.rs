use groundchat_core::{Completer, Error, ModelRequest, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::Settings;

/// Chat-completions client for OpenAI and API-compatible hosts.
#[derive(Debug, Clone)]
pub struct OpenAiChatClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl OpenAiChatClient {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key: None,
            timeout: Settings::default().model_timeout,
        }
    }

    pub fn from_settings(client: reqwest::Client, s: &Settings) -> Self {
        Self {
            api_key: s.openai_api_key.clone(),
            timeout: s.model_timeout,
            ..Self::new(client, s.openai_base_url.clone())
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint_chat_completions(&self) -> String {
        format!(
            "{}/v1/chat/completions",
            self.base_url.trim_end_matches('/')
        )
    }
}

#[async_trait::async_trait]
impl Completer for OpenAiChatClient {
    async fn complete(&self, req: &ModelRequest) -> Result<String> {
        let body = ChatCompletionsRequest {
            model: &req.model,
            messages: req
                .messages
                .iter()
                .map(|m| Message {
                    role: &m.role,
                    content: &m.content,
                })
                .collect(),
            max_tokens: req.max_tokens,
            temperature: req.temperature,
            stream: false,
        };

        let mut rb = self
            .client
            .post(self.endpoint_chat_completions())
            .timeout(self.timeout)
            .header(reqwest::header::CONTENT_TYPE, "application/json");
        if let Some(k) = &self.api_key {
            rb = rb.header(reqwest::header::AUTHORIZATION, format!("Bearer {k}"));
        }

        let t0 = std::time::Instant::now();
        let resp = rb
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Llm(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            let detail = resp.text().await.unwrap_or_default();
            let detail: String = detail.chars().take(300).collect();
            return Err(Error::Llm(format!(
                "chat.completions HTTP {status}: {}",
                detail.trim()
            )));
        }

        let parsed: ChatCompletionsResponse =
            resp.json().await.map_err(|e| Error::Llm(e.to_string()))?;
        tracing::debug!(
            messages = req.messages.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "chat completion done"
        );
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| Error::Llm("chat.completions returned no choices".to_string()))
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionsRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    max_tokens: u64,
    temperature: f64,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionsResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}
