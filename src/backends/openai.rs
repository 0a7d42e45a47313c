// src/backends/openai.rs
//! OpenAI Chat Completions client used for both the quote and the narrative.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{check_status, http_client, require, CompletionRequest, TextGenerator};
use crate::config::AiConfig;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

pub struct OpenAiGenerator {
    http: reqwest::Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
}

impl OpenAiGenerator {
    pub fn from_config(cfg: &AiConfig) -> Result<Self> {
        Ok(Self {
            http: http_client()?,
            api_key: cfg.api_key.clone(),
            model: cfg.model.clone(),
            base_url: cfg
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
        })
    }
}

#[derive(Serialize)]
struct Msg<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct Req<'a> {
    model: &'a str,
    messages: Vec<Msg<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct Resp {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMsg,
}

#[derive(Deserialize)]
struct ChoiceMsg {
    #[serde(default)]
    content: Option<String>,
}

/// First choice's content, trimmed. Empty content is an error.
pub fn extract_content(body: &str) -> Result<String> {
    let resp: Resp = serde_json::from_str(body).context("parse chat completion")?;
    let content = resp
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .map(|s| s.trim().to_string())
        .unwrap_or_default();
    if content.is_empty() {
        return Err(anyhow!("chat completion returned no content"));
    }
    Ok(content)
}

#[async_trait]
impl TextGenerator for OpenAiGenerator {
    async fn complete(&self, req: &CompletionRequest) -> Result<String> {
        let api_key = require(&self.api_key, "OPENAI_API_KEY")?;
        let body = Req {
            model: &self.model,
            messages: vec![
                Msg {
                    role: "system",
                    content: &req.system,
                },
                Msg {
                    role: "user",
                    content: &req.user,
                },
            ],
            temperature: req.temperature,
            max_tokens: req.max_tokens,
        };

        let resp = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .context("openai request")?;
        let resp = check_status(resp, "openai").await?;
        let text = resp.text().await.context("openai body")?;
        extract_content(&text)
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_first_choice() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"  Dzień dobry!  "}}]}"#;
        assert_eq!(extract_content(body).unwrap(), "Dzień dobry!");
    }

    #[test]
    fn empty_choices_is_error() {
        assert!(extract_content(r#"{"choices":[]}"#).is_err());
        assert!(extract_content(r#"{"choices":[{"message":{"content":null}}]}"#).is_err());
        assert!(extract_content("<html>").is_err());
    }
}
