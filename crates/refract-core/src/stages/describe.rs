//! Images -> Text: upload each source image and ask the vision model to
//! describe it.

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;

use super::{blocking, run_stage, StageContext, StageReport};
use crate::clients::{ClientFactory, Describer, ObjectStore};
use crate::codec::{ImageCodec, UploadBudget};
use crate::error::{TaskError, TaskResult};
use crate::executor::TaskHandler;
use crate::output;
use crate::retry::{with_retries, RetryPolicy};
use crate::types::{Stage, TaskItem};

/// Handles owned by one worker.
struct DescribeClients {
    store: Box<dyn ObjectStore>,
    describer: Box<dyn Describer>,
}

struct DescribeHandler {
    clients: Arc<dyn ClientFactory>,
    codec: Arc<dyn ImageCodec>,
    budget: UploadBudget,
    prompt: String,
    retry: RetryPolicy,
}

impl DescribeHandler {
    async fn upload_and_describe(
        &self,
        clients: &DescribeClients,
        upload_path: &std::path::Path,
    ) -> TaskResult<String> {
        let store = clients.store.as_ref();
        let describer = clients.describer.as_ref();
        let prompt = self.prompt.as_str();

        let url = with_retries(self.retry, "upload", move || store.upload(upload_path)).await?;
        let url = url.as_str();
        with_retries(self.retry, "describe", move || describer.describe(url, prompt)).await
    }
}

#[async_trait]
impl TaskHandler for DescribeHandler {
    type Resources = DescribeClients;

    fn create_resources(&self) -> TaskResult<DescribeClients> {
        Ok(DescribeClients {
            store: self.clients.store()?,
            describer: self.clients.describer()?,
        })
    }

    async fn handle(&self, item: &TaskItem, clients: &mut DescribeClients) -> TaskResult<PathBuf> {
        let codec = self.codec.clone();
        let input = item.input.clone();
        let budget = self.budget;
        let prepared = blocking(&item.input, move || codec.prepare_upload(&input, &budget)).await?;

        let result = self.upload_and_describe(clients, prepared.path()).await;
        prepared.cleanup();

        let description = result?;
        let description = description.trim();
        if description.is_empty() {
            return Err(TaskError::collaborator(
                "describe",
                "model returned an empty description",
            ));
        }
        output::write_bytes(&item.output, description.as_bytes())?;
        Ok(item.output.clone())
    }
}

/// Write `<text>/<rel>/<stem>.txt` for every pending source image.
pub async fn run(ctx: &StageContext) -> StageReport {
    let config = &ctx.config;
    let text_root = config.text_dir();
    let handler = DescribeHandler {
        clients: ctx.clients.clone(),
        codec: ctx.codec.clone(),
        budget: UploadBudget::from(&config.upload),
        prompt: config.describe.prompt.clone(),
        retry: RetryPolicy::from(&config.retry),
    };
    run_stage(
        ctx,
        Stage::Describe,
        &config.source_dir(),
        &config.processing.image_extensions,
        config.overwrite.text,
        |entry| TaskItem::new(&entry.path, entry.mirrored(&text_root, "txt")),
        handler,
    )
    .await
}
