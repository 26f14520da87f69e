//! Text -> Images: generate an image from each description and download it.
//!
//! An output counts as done when either `<stem>.jpg` or its finalized
//! `F_<stem>.jpg` twin exists, so the prefix pass never triggers
//! regeneration.

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;

use super::{run_stage, StageContext, StageReport, FINAL_PREFIX};
use crate::clients::{ClientFactory, ImageFetcher, ImageGenerator};
use crate::config::GenerationConfig;
use crate::error::{TaskError, TaskResult};
use crate::executor::TaskHandler;
use crate::retry::{with_retries, RetryPolicy};
use crate::sizing::resolve_generation_size;
use crate::types::{Stage, TaskItem};

struct RenderClients {
    generator: Box<dyn ImageGenerator>,
    fetcher: Box<dyn ImageFetcher>,
}

struct RenderHandler {
    clients: Arc<dyn ClientFactory>,
    generation: GenerationConfig,
    retry: RetryPolicy,
}

#[async_trait]
impl TaskHandler for RenderHandler {
    type Resources = RenderClients;

    fn create_resources(&self) -> TaskResult<RenderClients> {
        Ok(RenderClients {
            generator: self.clients.generator()?,
            fetcher: self.clients.fetcher()?,
        })
    }

    async fn handle(&self, item: &TaskItem, clients: &mut RenderClients) -> TaskResult<PathBuf> {
        let content = tokio::fs::read_to_string(&item.input)
            .await
            .map_err(|e| TaskError::unreadable(&item.input, e))?;
        let prompt = content.trim();
        if prompt.is_empty() {
            return Err(TaskError::EmptyInput(item.input.clone()));
        }

        let size = match &item.sidecar {
            Some(meta) => resolve_generation_size(&self.generation, meta),
            None => self.generation.fallback_size(),
        };
        let size = &size;

        let generator = clients.generator.as_ref();
        let url = with_retries(self.retry, "generate", move || {
            generator.generate(prompt, size)
        })
        .await?;

        let fetcher = clients.fetcher.as_ref();
        let url = url.as_str();
        let dest = item.output.as_path();
        with_retries(self.retry, "download", move || fetcher.fetch(url, dest)).await?;

        Ok(item.output.clone())
    }
}

/// Write `<output>/<rel>/<stem>.jpg` for every pending text description.
pub async fn run(ctx: &StageContext) -> StageReport {
    let config = &ctx.config;
    let output_root = config.output_dir();
    let meta_root = config.metadata_dir();
    let handler = RenderHandler {
        clients: ctx.clients.clone(),
        generation: config.generation.clone(),
        retry: RetryPolicy::from(&config.retry),
    };
    run_stage(
        ctx,
        Stage::Render,
        &config.text_dir(),
        &["txt".to_string()],
        config.overwrite.images,
        |entry| {
            let mut item = TaskItem::new(&entry.path, entry.mirrored(&output_root, "jpg"))
                .with_sidecar(entry.mirrored(&meta_root, "json"));
            if !entry.stem.starts_with(FINAL_PREFIX) {
                item = item.with_marker(entry.mirrored_with_prefix(&output_root, FINAL_PREFIX, "jpg"));
            }
            item
        },
        handler,
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SizeMode;
    use crate::stages::mock::{context, write_text};
    use std::sync::atomic::Ordering;

    #[tokio::test(flavor = "multi_thread")]
    async fn test_generates_mirrored_outputs() {
        let (ctx, fx) = context(|_| {});
        write_text(&fx.text.join("a.txt"), "a red fox\n");
        write_text(&fx.text.join("sub/b.txt"), "a blue jay");

        let report = run(&ctx).await;
        assert_eq!(report.processed(), 2);
        assert!(fx.output.join("a.jpg").exists());
        assert!(fx.output.join("sub/b.jpg").exists());

        // Fixed mode sends the configured token.
        let sizes = fx.stats.sizes.lock().unwrap().clone();
        assert!(sizes.iter().all(|s| s == "2K"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_prefixed_output_counts_as_done() {
        let (ctx, fx) = context(|_| {});
        write_text(&fx.text.join("a.txt"), "done already");
        write_text(&fx.text.join("b.txt"), "pending");
        std::fs::create_dir_all(&fx.output).unwrap();
        std::fs::write(fx.output.join("F_a.jpg"), b"final").unwrap();

        let report = run(&ctx).await;
        assert_eq!(report.skipped, 1);
        assert_eq!(report.processed(), 1);
        assert!(!fx.output.join("a.jpg").exists());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_empty_prompt_is_a_failure() {
        let (ctx, fx) = context(|_| {});
        write_text(&fx.text.join("blank.txt"), "   \n");

        let report = run(&ctx).await;
        assert_eq!(report.failed(), 1);
        let msg = report.run.failures[0].message.clone().unwrap();
        assert!(msg.contains("empty"), "{msg}");
        assert_eq!(fx.stats.generations.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_metadata_mode_sizes_from_sidecar() {
        let (ctx, fx) = context(|c| c.generation.size_mode = SizeMode::Metadata);
        write_text(&fx.text.join("a.txt"), "with metadata");
        write_text(&fx.text.join("b.txt"), "without metadata");
        write_text(&fx.metadata.join("a.json"), r#"{"width": 640, "height": 480}"#);

        let report = run(&ctx).await;
        assert!(report.is_success());

        let mut sizes = fx.stats.sizes.lock().unwrap().clone();
        sizes.sort();
        assert_eq!(sizes, vec!["1280x960".to_string(), "2K".to_string()]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_generation_failure_isolated_and_retried() {
        let (ctx, fx) = context(|c| c.processing.parallel_workers = 1);
        write_text(&fx.text.join("a.txt"), "flaky prompt");
        write_text(&fx.text.join("b.txt"), "fail prompt");

        let report = run(&ctx).await;
        assert_eq!(report.processed(), 1);
        assert_eq!(report.failed(), 1);
        assert!(report.run.failures[0].identifier.ends_with("b.txt"));
        // flaky: 503 then success; fail: one permanent 400
        assert_eq!(fx.stats.generations.load(Ordering::SeqCst), 3);
        assert_eq!(fx.stats.fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_idempotence_and_overwrite() {
        let (ctx, fx) = context(|_| {});
        write_text(&fx.text.join("a.txt"), "a prompt");
        assert_eq!(run(&ctx).await.run.total, 1);
        let before = std::fs::read(fx.output.join("a.jpg")).unwrap();
        assert_eq!(run(&ctx).await.run.total, 0);
        assert_eq!(std::fs::read(fx.output.join("a.jpg")).unwrap(), before);

        let (ctx, fx) = context(|c| c.overwrite.images = true);
        write_text(&fx.text.join("a.txt"), "a prompt");
        assert_eq!(run(&ctx).await.run.total, 1);
        assert_eq!(run(&ctx).await.run.total, 1);
    }
}
