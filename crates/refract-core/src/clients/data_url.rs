//! Inline "upload": encodes the file as a base64 `data:` URL.

use async_trait::async_trait;
use base64::Engine;
use std::path::Path;

use super::{media_type, ObjectStore};
use crate::error::{TaskError, TaskResult};

/// Object store that never touches the network.
///
/// OpenAI-compatible vision endpoints accept `data:` URLs wherever an image
/// URL is expected, so this is the zero-setup default.
#[derive(Debug, Default, Clone, Copy)]
pub struct DataUrlStore;

#[async_trait]
impl ObjectStore for DataUrlStore {
    fn name(&self) -> &str {
        "data-url"
    }

    async fn upload(&self, path: &Path) -> TaskResult<String> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| TaskError::unreadable(path, e))?;
        Ok(format!(
            "data:{};base64,{}",
            media_type(path),
            base64::engine::general_purpose::STANDARD.encode(bytes)
        ))
    }
}
