//! Vision-to-text over an OpenAI-compatible Chat Completions API.
//!
//! Sends the image URL and the prompt in one user message.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{check_status, join_url, Describer};
use crate::error::{TaskError, TaskResult};

pub struct ChatDescriber {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl ChatDescriber {
    pub fn new(client: reqwest::Client, base_url: &str, api_key: &str, model: &str) -> Self {
        Self {
            client,
            endpoint: join_url(base_url, "chat/completions"),
            api_key: api_key.to_string(),
            model: model.to_string(),
        }
    }
}

// --- Request types ---

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: Vec<ChatContent<'a>>,
}

#[derive(Serialize)]
#[serde(tag = "type")]
enum ChatContent<'a> {
    #[serde(rename = "text")]
    Text { text: &'a str },
    #[serde(rename = "image_url")]
    ImageUrl { image_url: ImageUrl<'a> },
}

#[derive(Serialize)]
struct ImageUrl<'a> {
    url: &'a str,
}

// --- Response types ---

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Value,
}

/// Flatten a message `content` into plain text.
///
/// Strings are trimmed. Arrays of parts are joined with newlines, taking the
/// `text` field of object parts and the raw value of anything else; empty
/// parts are dropped.
pub fn normalize_description(content: &Value) -> String {
    match content {
        Value::Null => String::new(),
        Value::String(s) => s.trim().to_string(),
        Value::Array(parts) => parts
            .iter()
            .map(|part| match part {
                Value::Object(map) => match map.get("text") {
                    Some(Value::String(s)) => s.clone(),
                    Some(other) => other.to_string(),
                    None => part.to_string(),
                },
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .map(|part| part.trim().to_string())
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
            .trim()
            .to_string(),
        other => other.to_string(),
    }
}

#[async_trait]
impl Describer for ChatDescriber {
    async fn describe(&self, image_url: &str, prompt: &str) -> TaskResult<String> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: vec![
                    ChatContent::Text { text: prompt },
                    ChatContent::ImageUrl {
                        image_url: ImageUrl { url: image_url },
                    },
                ],
            }],
        };

        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| TaskError::from_transport("describe", e))?;
        let resp = check_status("describe", resp).await?;

        let chat: ChatResponse = resp.json().await.map_err(|e| {
            TaskError::collaborator("describe", format!("failed to parse response: {e}"))
        })?;

        let content = chat
            .choices
            .first()
            .map(|c| &c.message.content)
            .ok_or_else(|| TaskError::collaborator("describe", "response has no choices"))?;

        let text = normalize_description(content);
        if text.is_empty() {
            return Err(TaskError::collaborator("describe", "model returned an empty description"));
        }
        Ok(text)
    }
}
