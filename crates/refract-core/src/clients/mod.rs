//! External collaborators: object store, describer, generator, fetcher.
//!
//! Stages only see the traits below. A [`ClientFactory`] builds fresh
//! handles and is called once per executor worker, so no handle is ever
//! shared between concurrent workers. [`HttpClientFactory`] is the
//! production implementation; tests plug in their own.

mod ark;
mod chat;
mod data_url;
mod fetch;
mod http_put;

pub use ark::ArkGenerator;
pub use chat::{normalize_description, ChatDescriber};
pub use data_url::DataUrlStore;
pub use fetch::HttpFetcher;
pub use http_put::HttpPutStore;

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{resolve_env_var, Config, StoreKind};
use crate::error::{TaskError, TaskResult};
use crate::sizing::GenerationSize;

/// Makes a local file reachable by URL.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    fn name(&self) -> &str;

    async fn upload(&self, path: &Path) -> TaskResult<String>;
}

/// Vision-to-text model.
#[async_trait]
pub trait Describer: Send + Sync {
    async fn describe(&self, image_url: &str, prompt: &str) -> TaskResult<String>;
}

/// Text-to-image model.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate(&self, prompt: &str, size: &GenerationSize) -> TaskResult<String>;
}

/// Downloads a generated image to its final location.
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn fetch(&self, url: &str, dest: &Path) -> TaskResult<()>;
}

/// Builds one set of collaborator handles per worker.
pub trait ClientFactory: Send + Sync {
    fn store(&self) -> TaskResult<Box<dyn ObjectStore>>;
    fn describer(&self) -> TaskResult<Box<dyn Describer>>;
    fn generator(&self) -> TaskResult<Box<dyn ImageGenerator>>;
    fn fetcher(&self) -> TaskResult<Box<dyn ImageFetcher>>;
}

/// Builds reqwest-backed clients from the frozen configuration.
pub struct HttpClientFactory {
    config: Arc<Config>,
}

impl HttpClientFactory {
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }

    fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.config.limits.request_timeout_ms)
    }
}

impl ClientFactory for HttpClientFactory {
    fn store(&self) -> TaskResult<Box<dyn ObjectStore>> {
        let upload = &self.config.upload;
        match upload.store {
            StoreKind::DataUrl => Ok(Box::new(DataUrlStore)),
            StoreKind::HttpPut => {
                if upload.endpoint.trim().is_empty() {
                    return Err(TaskError::collaborator(
                        "upload",
                        "upload.endpoint must be set for the http-put store",
                    ));
                }
                let client = build_client("upload", self.request_timeout())?;
                let public_base = if upload.public_base.trim().is_empty() {
                    upload.endpoint.clone()
                } else {
                    upload.public_base.clone()
                };
                Ok(Box::new(HttpPutStore::new(
                    client,
                    &upload.endpoint,
                    &public_base,
                    resolve_env_var(&upload.api_key),
                )))
            }
        }
    }

    fn describer(&self) -> TaskResult<Box<dyn Describer>> {
        let describe = &self.config.describe;
        let api_key = require_key("describe", &describe.api_key)?;
        let client = build_client("describe", self.request_timeout())?;
        Ok(Box::new(ChatDescriber::new(
            client,
            &describe.endpoint,
            &api_key,
            &describe.model,
        )))
    }

    fn generator(&self) -> TaskResult<Box<dyn ImageGenerator>> {
        let generation = &self.config.generation;
        let api_key = require_key("generate", &generation.api_key)?;
        let client = build_client("generate", self.request_timeout())?;
        Ok(Box::new(ArkGenerator::new(client, &api_key, generation)))
    }

    fn fetcher(&self) -> TaskResult<Box<dyn ImageFetcher>> {
        let timeout = Duration::from_millis(self.config.limits.download_timeout_ms);
        let client = build_client("download", timeout)?;
        Ok(Box::new(HttpFetcher::new(client)))
    }
}

fn build_client(service: &str, timeout: Duration) -> TaskResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| TaskError::collaborator(service, format!("failed to build HTTP client: {e}")))
}

fn require_key(service: &str, configured: &str) -> TaskResult<String> {
    resolve_env_var(configured).ok_or_else(|| {
        TaskError::collaborator(
            service,
            format!("API key not configured (set {service} api_key or {configured})"),
        )
    })
}

/// Join a base URL and a path segment with exactly one slash.
pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Turn a non-2xx response into a collaborator error carrying its status.
pub(crate) async fn check_status(
    service: &str,
    resp: reqwest::Response,
) -> TaskResult<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(TaskError::Collaborator {
        service: service.to_string(),
        message: format!("HTTP {status}: {}", body.trim()),
        status_code: Some(status.as_u16()),
    })
}

/// MIME type guessed from a file extension.
pub(crate) fn media_type(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .as_deref()
    {
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("bmp") => "image/bmp",
        Some("gif") => "image/gif",
        _ => "image/jpeg",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_url() {
        assert_eq!(join_url("https://a/v3/", "/chat/completions"), "https://a/v3/chat/completions");
        assert_eq!(join_url("https://a/v3", "images/generations"), "https://a/v3/images/generations");
    }

    #[test]
    fn test_media_type() {
        assert_eq!(media_type(Path::new("a.PNG")), "image/png");
        assert_eq!(media_type(Path::new("a.jpeg")), "image/jpeg");
        assert_eq!(media_type(Path::new("noext")), "image/jpeg");
    }

    #[test]
    fn test_default_factory_uses_data_url_store() {
        let factory = HttpClientFactory::new(Arc::new(Config::default()));
        assert_eq!(factory.store().unwrap().name(), "data-url");
    }

    #[test]
    fn test_http_put_requires_endpoint() {
        let mut config = Config::default();
        config.upload.store = StoreKind::HttpPut;
        let factory = HttpClientFactory::new(Arc::new(config));
        let err = factory.store().err().unwrap();
        assert!(err.to_string().contains("upload.endpoint"));
    }

    #[test]
    fn test_missing_api_key_fails_handle_creation() {
        let mut config = Config::default();
        config.describe.api_key = "${REFRACT_TEST_UNSET_KEY_42}".to_string();
        let factory = HttpClientFactory::new(Arc::new(config));
        let err = factory.describer().err().unwrap();
        assert!(err.to_string().contains("API key not configured"));
    }
}
