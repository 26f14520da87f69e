//! Text-to-image over an OpenAI-compatible image generation API.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{check_status, join_url, ImageGenerator};
use crate::config::GenerationConfig;
use crate::error::{TaskError, TaskResult};
use crate::sizing::GenerationSize;

pub struct ArkGenerator {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    sequential_mode: String,
    max_images: u32,
    watermark: bool,
}

impl ArkGenerator {
    pub fn new(client: reqwest::Client, api_key: &str, config: &GenerationConfig) -> Self {
        Self {
            client,
            endpoint: join_url(&config.endpoint, "images/generations"),
            api_key: api_key.to_string(),
            model: config.model.clone(),
            sequential_mode: config.sequential_mode.clone(),
            max_images: config.max_images,
            watermark: config.watermark,
        }
    }

    fn request<'a>(&'a self, prompt: &'a str, size: String) -> GenerationRequest<'a> {
        GenerationRequest {
            model: &self.model,
            prompt,
            size,
            sequential_image_generation: &self.sequential_mode,
            sequential_image_generation_options: SequentialOptions {
                max_images: self.max_images,
            },
            response_format: "url",
            watermark: self.watermark,
        }
    }
}

#[derive(Serialize)]
struct GenerationRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    size: String,
    sequential_image_generation: &'a str,
    sequential_image_generation_options: SequentialOptions,
    response_format: &'static str,
    watermark: bool,
}

#[derive(Serialize)]
struct SequentialOptions {
    max_images: u32,
}

#[derive(Deserialize)]
struct GenerationResponse {
    #[serde(default)]
    data: Vec<GeneratedImage>,
}

#[derive(Deserialize)]
struct GeneratedImage {
    url: Option<String>,
}

#[async_trait]
impl ImageGenerator for ArkGenerator {
    async fn generate(&self, prompt: &str, size: &GenerationSize) -> TaskResult<String> {
        let body = self.request(prompt, size.to_string());

        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| TaskError::from_transport("generate", e))?;
        let resp = check_status("generate", resp).await?;

        let parsed: GenerationResponse = resp.json().await.map_err(|e| {
            TaskError::collaborator("generate", format!("failed to parse response: {e}"))
        })?;

        parsed
            .data
            .into_iter()
            .find_map(|image| image.url.filter(|u| !u.is_empty()))
            .ok_or_else(|| TaskError::collaborator("generate", "response has no image url"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_body_shape() {
        let generator =
            ArkGenerator::new(reqwest::Client::new(), "key", &GenerationConfig::default());
        let size = GenerationSize::Pixels {
            width: 1280,
            height: 720,
        };
        let value = serde_json::to_value(generator.request("a deer", size.to_string())).unwrap();

        assert_eq!(value["model"], "doubao-seedream-4-0-250828");
        assert_eq!(value["prompt"], "a deer");
        assert_eq!(value["size"], "1280x720");
        assert_eq!(value["sequential_image_generation"], "auto");
        assert_eq!(value["sequential_image_generation_options"]["max_images"], 1);
        assert_eq!(value["response_format"], "url");
        assert_eq!(value["watermark"], false);
    }

    #[test]
    fn test_response_without_url_parses_empty() {
        let parsed: GenerationResponse =
            serde_json::from_value(json!({"data": [{"b64_json": "..."}]})).unwrap();
        assert!(parsed.data[0].url.is_none());

        let parsed: GenerationResponse = serde_json::from_value(json!({})).unwrap();
        assert!(parsed.data.is_empty());
    }

    #[test]
    fn test_endpoint_is_joined() {
        let generator =
            ArkGenerator::new(reqwest::Client::new(), "key", &GenerationConfig::default());
        assert_eq!(
            generator.endpoint,
            "https://ark.cn-beijing.volces.com/api/v3/images/generations"
        );
    }
}
