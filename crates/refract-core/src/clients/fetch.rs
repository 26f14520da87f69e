//! Streaming download of generated images.

use async_trait::async_trait;
use futures_util::StreamExt;
use std::path::Path;
use tokio::io::AsyncWriteExt;

use super::{check_status, ImageFetcher};
use crate::error::{TaskError, TaskResult};
use crate::output;

/// Streams the response body into a temp file beside `dest`, then renames
/// it into place.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ImageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, dest: &Path) -> TaskResult<()> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| TaskError::from_transport("download", e))?;
        let resp = check_status("download", resp).await?;

        let temp = output::temp_sibling(dest)?;
        let std_file = temp
            .as_file()
            .try_clone()
            .map_err(|e| TaskError::write(dest, e))?;
        let mut file = tokio::fs::File::from_std(std_file);

        let mut stream = resp.bytes_stream();
        let mut downloaded: u64 = 0;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| TaskError::from_transport("download", e))?;
            file.write_all(&chunk)
                .await
                .map_err(|e| TaskError::write(dest, e))?;
            downloaded += chunk.len() as u64;
        }
        file.flush().await.map_err(|e| TaskError::write(dest, e))?;
        drop(file);

        if downloaded == 0 {
            return Err(TaskError::collaborator(
                "download",
                format!("empty response body from {url}"),
            ));
        }

        output::persist(temp, dest)?;
        tracing::debug!("Downloaded {downloaded} bytes to {:?}", dest);
        Ok(())
    }
}
