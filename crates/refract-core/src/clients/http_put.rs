//! HTTP PUT object store.

use async_trait::async_trait;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use super::{check_status, join_url, media_type, ObjectStore};
use crate::error::{TaskError, TaskResult};

/// Uploads with `PUT {endpoint}/{folder}/{file}` and returns the matching
/// public URL.
///
/// Each handle picks its folder when created (`run-<unix seconds>`), so one
/// run's uploads are grouped together.
pub struct HttpPutStore {
    client: reqwest::Client,
    endpoint: String,
    public_base: String,
    token: Option<String>,
    folder: String,
}

impl HttpPutStore {
    pub fn new(
        client: reqwest::Client,
        endpoint: &str,
        public_base: &str,
        token: Option<String>,
    ) -> Self {
        let started = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        Self {
            client,
            endpoint: endpoint.to_string(),
            public_base: public_base.to_string(),
            token,
            folder: format!("run-{started}"),
        }
    }

    fn object_key(&self, path: &Path) -> TaskResult<String> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| TaskError::unreadable(path, "file name is not valid UTF-8"))?;
        Ok(format!("{}/{file_name}", self.folder))
    }
}

#[async_trait]
impl ObjectStore for HttpPutStore {
    fn name(&self) -> &str {
        "http-put"
    }

    async fn upload(&self, path: &Path) -> TaskResult<String> {
        let key = self.object_key(path)?;
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| TaskError::unreadable(path, e))?;

        let mut request = self
            .client
            .put(join_url(&self.endpoint, &key))
            .header("Content-Type", media_type(path))
            .body(bytes);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let resp = request
            .send()
            .await
            .map_err(|e| TaskError::from_transport("upload", e))?;
        check_status("upload", resp).await?;

        tracing::debug!("Uploaded {:?} as {key}", path);
        Ok(join_url(&self.public_base, &key))
    }
}
