//! Chat over a user's documents.
//!
//! [`chat_with_documents`] gathers every document the caller owns, folds
//! them into a single prompt and hands it to a [`ChatModel`]. The only
//! real backend is [`GeminiClient`], which streams the completion over
//! server-sent events and accumulates the fragments into one reply.
//!
//! # Provider Selection
//!
//! | `chat.provider` | Backend |
//! |-----------------|---------|
//! | `gemini` | [`GeminiClient`] (key read from `chat.api_key_env`) |
//! | `disabled` | [`DisabledChat`], every call fails with an upstream error |
//!
//! Nothing is retried and no conversation state is kept server-side.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use docvault_core::models::{Document, DocumentQuery};
use docvault_core::store::DocumentStore;
use docvault_core::{VaultError, VaultResult};

use crate::config::ChatConfig;

/// A text-completion backend.
#[async_trait]
pub trait ChatModel: Send + Sync {
    fn model_name(&self) -> &str;

    /// Sends `prompt` and returns the complete reply.
    async fn complete(&self, prompt: &str) -> VaultResult<String>;
}

/// Instantiates the backend named by `chat.provider`.
pub fn create_chat_model(config: &ChatConfig) -> anyhow::Result<Arc<dyn ChatModel>> {
    match config.provider.as_str() {
        "disabled" => Ok(Arc::new(DisabledChat)),
        "gemini" => Ok(Arc::new(GeminiClient::from_config(config)?)),
        other => anyhow::bail!("Unknown chat provider: {}", other),
    }
}

pub struct DisabledChat;

#[async_trait]
impl ChatModel for DisabledChat {
    fn model_name(&self) -> &str {
        "disabled"
    }

    async fn complete(&self, _prompt: &str) -> VaultResult<String> {
        Err(VaultError::Upstream("chat disabled".to_string()))
    }
}

/// Streaming client for the Gemini `streamGenerateContent` endpoint.
pub struct GeminiClient {
    client: reqwest::Client,
    api_base: String,
    model: String,
    api_key: String,
}

impl GeminiClient {
    pub fn new(
        api_base: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key: api_key.into(),
        })
    }

    /// # Errors
    ///
    /// Fails if the API key environment variable is not set.
    pub fn from_config(config: &ChatConfig) -> anyhow::Result<Self> {
        let api_key = std::env::var(&config.api_key_env)
            .map_err(|_| anyhow::anyhow!("{} environment variable not set", config.api_key_env))?;
        Self::new(
            &config.api_base,
            &config.model,
            api_key,
            Duration::from_secs(config.timeout_secs),
        )
    }

    fn stream_url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:streamGenerateContent?alt=sse",
            self.api_base, self.model
        )
    }
}

#[async_trait]
impl ChatModel for GeminiClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> VaultResult<String> {
        let body = serde_json::json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
        });

        let mut response = self
            .client
            .post(self.stream_url())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| VaultError::Upstream(format!("Gemini request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(VaultError::Upstream(format!(
                "Gemini API error {}: {}",
                status, body_text
            )));
        }

        let mut stream = SseAccumulator::default();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| VaultError::Upstream(format!("Gemini stream failed: {}", e)))?
        {
            stream.push(&chunk)?;
        }
        let reply = stream.finish()?;
        debug!(model = %self.model, chars = reply.len(), "gemini reply received");
        Ok(reply)
    }
}

/// Collects the text fragments of a Gemini SSE response.
///
/// Bytes may be split anywhere, including inside a UTF-8 sequence, so
/// input is buffered until a full line is available.
#[derive(Debug, Default)]
pub struct SseAccumulator {
    pending: Vec<u8>,
    reply: String,
}

impl SseAccumulator {
    pub fn push(&mut self, bytes: &[u8]) -> VaultResult<()> {
        self.pending.extend_from_slice(bytes);
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            self.consume_line(&line)?;
        }
        Ok(())
    }

    pub fn finish(mut self) -> VaultResult<String> {
        if !self.pending.is_empty() {
            let rest = std::mem::take(&mut self.pending);
            self.consume_line(&rest)?;
        }
        Ok(self.reply)
    }

    fn consume_line(&mut self, line: &[u8]) -> VaultResult<()> {
        let line = String::from_utf8_lossy(line);
        let Some(data) = line.trim_end_matches(['\r', '\n']).strip_prefix("data:") else {
            return Ok(());
        };
        let data = data.trim();
        if data.is_empty() || data == "[DONE]" {
            return Ok(());
        }

        let event: serde_json::Value = serde_json::from_str(data)
            .map_err(|e| VaultError::Upstream(format!("malformed stream event: {}", e)))?;
        if let Some(err) = event.get("error") {
            let message = err
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("unknown error");
            return Err(VaultError::Upstream(format!("Gemini error: {}", message)));
        }

        let parts = event
            .pointer("/candidates/0/content/parts")
            .and_then(|p| p.as_array());
        for part in parts.into_iter().flatten() {
            if let Some(text) = part.get("text").and_then(|t| t.as_str()) {
                self.reply.push_str(text);
            }
        }
        Ok(())
    }
}

/// Folds every document into one prompt, followed by the question and a
/// brevity instruction.
pub fn build_prompt(documents: &[Document], question: &str) -> String {
    let context = documents
        .iter()
        .map(|d| format!("Title: {}, Content: {}", d.filename, d.content))
        .collect::<Vec<_>>()
        .join(" ");
    format!(
        "Using the following PDFs: {}, answer the question: {}.Give the response in not more than 5 lines.Keep it direct.",
        context, question
    )
}

pub async fn chat_with_documents(
    documents: &dyn DocumentStore,
    model: &dyn ChatModel,
    caller_id: &str,
    question: &str,
) -> VaultResult<String> {
    if question.trim().is_empty() {
        return Err(VaultError::Validation("question is required".to_string()));
    }

    let docs = documents
        .search_documents(caller_id, &DocumentQuery::all())
        .await?;
    if docs.is_empty() {
        return Err(VaultError::NotFound(
            "No PDFs found for the user.".to_string(),
        ));
    }

    let prompt = build_prompt(&docs, question);
    info!(
        caller_id = %caller_id,
        documents = docs.len(),
        prompt_chars = prompt.len(),
        model = model.model_name(),
        "chat request"
    );
    model.complete(&prompt).await
}
