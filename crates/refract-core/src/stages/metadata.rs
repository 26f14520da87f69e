//! Images -> Metadata: record each source image's pixel dimensions.

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;

use super::{blocking, run_stage, StageContext, StageReport};
use crate::codec::ImageCodec;
use crate::error::TaskResult;
use crate::executor::TaskHandler;
use crate::output;
use crate::types::{MetadataRecord, Stage, TaskItem};

struct MetadataHandler {
    codec: Arc<dyn ImageCodec>,
}

#[async_trait]
impl TaskHandler for MetadataHandler {
    type Resources = ();

    fn create_resources(&self) -> TaskResult<()> {
        Ok(())
    }

    async fn handle(&self, item: &TaskItem, _resources: &mut ()) -> TaskResult<PathBuf> {
        let codec = self.codec.clone();
        let input = item.input.clone();
        let dims = blocking(&item.input, move || codec.dimensions(&input)).await?;

        let record = MetadataRecord {
            width: i64::from(dims.width),
            height: i64::from(dims.height),
        };
        output::write_json(&item.output, &record, false)?;
        Ok(item.output.clone())
    }
}

/// Write `<metadata>/<rel>/<stem>.json` for every pending source image.
pub async fn run(ctx: &StageContext) -> StageReport {
    let config = &ctx.config;
    let meta_root = config.metadata_dir();
    run_stage(
        ctx,
        Stage::Metadata,
        &config.source_dir(),
        &config.processing.image_extensions,
        config.overwrite.metadata,
        |entry| TaskItem::new(&entry.path, entry.mirrored(&meta_root, "json")),
        MetadataHandler {
            codec: ctx.codec.clone(),
        },
    )
    .await
}
