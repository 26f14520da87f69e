//! In-memory collaborators and a temp-dir fixture for stage tests.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use super::StageContext;
use crate::clients::{ClientFactory, Describer, ImageFetcher, ImageGenerator, ObjectStore};
use crate::config::Config;
use crate::error::{TaskError, TaskResult};
use crate::executor::TaskExecutor;
use crate::output;
use crate::progress::SilentProgress;
use crate::sizing::GenerationSize;

/// Call counters shared by every handle a [`MockFactory`] builds.
#[derive(Default)]
pub(crate) struct MockStats {
    pub handle_sets: AtomicU32,
    pub uploads: AtomicU32,
    pub describes: AtomicU32,
    pub generations: AtomicU32,
    pub fetches: AtomicU32,
    /// Whether each uploaded file existed at upload time
    pub uploaded: Mutex<Vec<(PathBuf, bool)>>,
    /// Size strings passed to the generator
    pub sizes: Mutex<Vec<String>>,
}

/// Builds mock handles. Inputs containing `fail` fail permanently (HTTP 400);
/// inputs containing `flaky` fail once with HTTP 503 and then succeed.
pub(crate) struct MockFactory {
    pub stats: Arc<MockStats>,
}

impl ClientFactory for MockFactory {
    fn store(&self) -> TaskResult<Box<dyn ObjectStore>> {
        self.stats.handle_sets.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockStore(self.stats.clone())))
    }

    fn describer(&self) -> TaskResult<Box<dyn Describer>> {
        Ok(Box::new(MockDescriber(self.stats.clone())))
    }

    fn generator(&self) -> TaskResult<Box<dyn ImageGenerator>> {
        self.stats.handle_sets.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockGenerator(self.stats.clone())))
    }

    fn fetcher(&self) -> TaskResult<Box<dyn ImageFetcher>> {
        Ok(Box::new(MockFetcher(self.stats.clone())))
    }
}

fn permanent(service: &str) -> TaskError {
    TaskError::Collaborator {
        service: service.to_string(),
        message: "HTTP 400: rejected".to_string(),
        status_code: Some(400),
    }
}

fn transient(service: &str) -> TaskError {
    TaskError::Collaborator {
        service: service.to_string(),
        message: "HTTP 503: busy".to_string(),
        status_code: Some(503),
    }
}

struct MockStore(Arc<MockStats>);

#[async_trait]
impl ObjectStore for MockStore {
    fn name(&self) -> &str {
        "mock"
    }

    async fn upload(&self, path: &Path) -> TaskResult<String> {
        self.0.uploads.fetch_add(1, Ordering::SeqCst);
        self.0
            .uploaded
            .lock()
            .unwrap()
            .push((path.to_path_buf(), path.exists()));
        let name = path.file_name().unwrap().to_string_lossy();
        Ok(format!("mock://upload/{name}"))
    }
}

struct MockDescriber(Arc<MockStats>);

#[async_trait]
impl Describer for MockDescriber {
    async fn describe(&self, image_url: &str, _prompt: &str) -> TaskResult<String> {
        let call = self.0.describes.fetch_add(1, Ordering::SeqCst);
        if image_url.contains("fail") {
            return Err(permanent("describe"));
        }
        if image_url.contains("flaky") && call == 0 {
            return Err(transient("describe"));
        }
        Ok(format!("  a description of {image_url}\n"))
    }
}

struct MockGenerator(Arc<MockStats>);

#[async_trait]
impl ImageGenerator for MockGenerator {
    async fn generate(&self, prompt: &str, size: &GenerationSize) -> TaskResult<String> {
        let call = self.0.generations.fetch_add(1, Ordering::SeqCst);
        self.0.sizes.lock().unwrap().push(size.to_string());
        if prompt.contains("fail") {
            return Err(permanent("generate"));
        }
        if prompt.contains("flaky") && call == 0 {
            return Err(transient("generate"));
        }
        Ok(format!("mock://generated/{}", prompt.len()))
    }
}

struct MockFetcher(Arc<MockStats>);

#[async_trait]
impl ImageFetcher for MockFetcher {
    async fn fetch(&self, url: &str, dest: &Path) -> TaskResult<()> {
        self.0.fetches.fetch_add(1, Ordering::SeqCst);
        output::write_bytes(dest, format!("jpeg:{url}").as_bytes())
    }
}

/// Temp roots for the four trees plus the mock counters.
pub(crate) struct Fixture {
    _root: tempfile::TempDir,
    pub source: PathBuf,
    pub text: PathBuf,
    pub output: PathBuf,
    pub metadata: PathBuf,
    pub stats: Arc<MockStats>,
}

/// A stage context over fresh temp directories with mock collaborators.
pub(crate) fn context(configure: impl FnOnce(&mut Config)) -> (StageContext, Fixture) {
    let root = tempfile::tempdir().unwrap();
    let source = root.path().join("real");
    let text = root.path().join("text");
    let output = root.path().join("output");
    let metadata = root.path().join("meta");
    std::fs::create_dir_all(&source).unwrap();
    std::fs::create_dir_all(&text).unwrap();

    let mut config = Config::default();
    config.paths.source = source.clone();
    config.paths.text = text.clone();
    config.paths.output = output.clone();
    config.paths.metadata = metadata.clone();
    config.processing.parallel_workers = 2;
    config.retry.delay_ms = 1;
    configure(&mut config);

    let stats = Arc::new(MockStats::default());
    let ctx = StageContext {
        executor: TaskExecutor::new(config.processing.parallel_workers)
            .with_progress(Arc::new(SilentProgress)),
        config: Arc::new(config),
        clients: Arc::new(MockFactory {
            stats: stats.clone(),
        }),
        codec: crate::codec::detect(),
    };

    let fixture = Fixture {
        _root: root,
        source,
        text,
        output,
        metadata,
        stats,
    };
    (ctx, fixture)
}

/// Write a small PNG, creating parent directories.
#[cfg(feature = "codec")]
pub(crate) fn write_png(path: &Path, width: u32, height: u32) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([120, 80, 40]));
    img.save(path).unwrap();
}

/// Write a text file, creating parent directories.
pub(crate) fn write_text(path: &Path, content: &str) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}
