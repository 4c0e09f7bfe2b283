//! Flattens the visible preview surface into a PNG and hands it to a sink.
//!
//! Export runs in two phases:
//!
//! 1. [`ExportPipeline::capture_surface`] rasterizes a [`SurfaceSnapshot`] on
//!    a blocking worker and yields the flat image, or a [`CaptureError`]
//!    explaining why there is nothing to save.
//! 2. [`ExportPipeline::save_artifact`] encodes the image as PNG and delivers
//!    it under the fixed name [`EXPORT_FILE_NAME`].
//!
//! [`ExportPipeline::export`] chains both and turns the capture preconditions
//! into [`ExportOutcome::NotCaptured`] instead of an error.

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use image::{ImageFormat, RgbaImage};
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info, warn};

use crate::error::{CaptureError, ExportError};
use crate::preview::SurfaceSnapshot;

/// Name of every exported file. Repeated exports overwrite it.
pub const EXPORT_FILE_NAME: &str = "custom_hat.png";

/// MIME type of every exported file.
pub const EXPORT_MIME_TYPE: &str = "image/png";

// ============================================================================
// Artifacts & Sinks
// ============================================================================

/// An encoded image ready for download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub file_name: &'static str,
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

/// Where a delivered artifact ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub file_name: &'static str,
    /// Filesystem location, for sinks that write files.
    pub path: Option<PathBuf>,
    pub size: usize,
}

/// The "save as" step: receives finished artifacts.
pub trait ArtifactSink: Send + Sync {
    fn deliver(&self, artifact: &Artifact) -> std::io::Result<Delivery>;
}

/// Writes artifacts into a download directory, overwriting same-named files.
#[derive(Debug, Clone)]
pub struct DownloadDir {
    dir: PathBuf,
}

impl DownloadDir {
    /// Creates a sink writing into `dir`, created on first delivery.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Returns the download directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ArtifactSink for DownloadDir {
    fn deliver(&self, artifact: &Artifact) -> std::io::Result<Delivery> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(artifact.file_name);
        std::fs::write(&path, &artifact.bytes)?;
        Ok(Delivery {
            file_name: artifact.file_name,
            path: Some(path),
            size: artifact.bytes.len(),
        })
    }
}

/// Keeps delivered artifacts in memory, for embedders with their own download UI.
#[derive(Debug, Default)]
pub struct MemorySink {
    artifacts: Mutex<Vec<Artifact>>,
}

impl MemorySink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// All artifacts delivered so far, oldest first.
    pub fn artifacts(&self) -> Vec<Artifact> {
        self.artifacts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ArtifactSink for MemorySink {
    fn deliver(&self, artifact: &Artifact) -> std::io::Result<Delivery> {
        self.artifacts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(artifact.clone());
        Ok(Delivery {
            file_name: artifact.file_name,
            path: None,
            size: artifact.bytes.len(),
        })
    }
}

// ============================================================================
// ExportPipeline
// ============================================================================

/// Result of an export that did not hit an I/O or encoding failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    Delivered(Delivery),
    /// Nothing was captured, so no file was produced.
    NotCaptured(CaptureError),
}

/// Captures surfaces and delivers them as PNG files.
///
/// Cloning is cheap; clones share the sink and the export lock, so exports
/// started from any clone run one at a time in the order they acquire it.
#[derive(Clone)]
pub struct ExportPipeline {
    sink: Arc<dyn ArtifactSink>,
    in_flight: Arc<AsyncMutex<()>>,
}

impl ExportPipeline {
    /// Creates a pipeline delivering to `sink`.
    pub fn new(sink: impl ArtifactSink + 'static) -> Self {
        Self::with_shared_sink(Arc::new(sink))
    }

    /// Creates a pipeline delivering to a sink the caller keeps a handle to.
    pub fn with_shared_sink(sink: Arc<dyn ArtifactSink>) -> Self {
        Self {
            sink,
            in_flight: Arc::new(AsyncMutex::new(())),
        }
    }

    /// Rasterizes `snapshot` off the async thread.
    ///
    /// `None` means no surface is mounted.
    pub async fn capture_surface(
        snapshot: Option<SurfaceSnapshot>,
    ) -> Result<RgbaImage, CaptureError> {
        let snapshot = snapshot.ok_or(CaptureError::NoSurface)?;

        let started = Instant::now();
        let image = tokio::task::spawn_blocking(move || snapshot.rasterize())
            .await
            .map_err(|err| {
                warn!(%err, "rasterizer task failed");
                CaptureError::Rasterizer
            })?;
        debug!(elapsed = ?started.elapsed(), "surface rasterized");

        image
            .filter(|image| image.width() > 0 && image.height() > 0)
            .ok_or(CaptureError::EmptyCapture)
    }

    /// Encodes `image` as PNG and delivers it under [`EXPORT_FILE_NAME`].
    pub fn save_artifact(&self, image: &RgbaImage) -> Result<Delivery, ExportError> {
        let mut bytes = Vec::new();
        image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;

        let artifact = Artifact {
            file_name: EXPORT_FILE_NAME,
            mime_type: EXPORT_MIME_TYPE,
            bytes,
        };
        let delivery = self.sink.deliver(&artifact)?;
        info!(
            file = delivery.file_name,
            path = ?delivery.path,
            bytes = delivery.size,
            "exported hat image"
        );
        Ok(delivery)
    }

    /// Captures and saves, one export at a time.
    ///
    /// A missing surface or an empty capture produces no file and is
    /// reported as [`ExportOutcome::NotCaptured`].
    pub async fn export(
        &self,
        snapshot: Option<SurfaceSnapshot>,
    ) -> Result<ExportOutcome, ExportError> {
        let _guard = self.in_flight.lock().await;

        match Self::capture_surface(snapshot).await {
            Ok(image) => Ok(ExportOutcome::Delivered(self.save_artifact(&image)?)),
            Err(reason) if reason.is_precondition() => {
                debug!(%reason, "export skipped");
                Ok(ExportOutcome::NotCaptured(reason))
            }
            Err(err) => Err(err.into()),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preview::PreviewSurface;
    use crate::settings::SurfaceSettings;
    use image::Rgba;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn surface(width: u32, height: u32) -> PreviewSurface {
        PreviewSurface::new(&SurfaceSettings::new().with_size(width, height).with_reference(None))
    }

    struct FailingSink;

    /// Holds every delivery open for a while and records how many overlap.
    #[derive(Default)]
    struct SlowSink {
        active: AtomicUsize,
        max_active: AtomicUsize,
        widths: Mutex<Vec<u32>>,
    }

    impl ArtifactSink for SlowSink {
        fn deliver(&self, artifact: &Artifact) -> std::io::Result<Delivery> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(100));

            let width = image::load_from_memory(&artifact.bytes)
                .map_err(std::io::Error::other)?
                .width();
            self.widths.lock().unwrap().push(width);
            self.active.fetch_sub(1, Ordering::SeqCst);

            Ok(Delivery {
                file_name: artifact.file_name,
                path: None,
                size: artifact.bytes.len(),
            })
        }
    }

    impl ArtifactSink for FailingSink {
        fn deliver(&self, _artifact: &Artifact) -> std::io::Result<Delivery> {
            Err(std::io::Error::other("disk full"))
        }
    }

    #[tokio::test]
    async fn no_surface_is_a_silent_no_op() {
        let sink = Arc::new(MemorySink::new());
        let pipeline = ExportPipeline::with_shared_sink(sink.clone());

        let outcome = pipeline.export(None).await.unwrap();
        assert_eq!(outcome, ExportOutcome::NotCaptured(CaptureError::NoSurface));
        assert!(sink.artifacts().is_empty());
    }

    #[tokio::test]
    async fn empty_capture_is_a_silent_no_op() {
        let sink = Arc::new(MemorySink::new());
        let pipeline = ExportPipeline::with_shared_sink(sink.clone());

        let outcome = pipeline.export(Some(surface(0, 50).snapshot())).await.unwrap();
        assert_eq!(outcome, ExportOutcome::NotCaptured(CaptureError::EmptyCapture));
        assert!(sink.artifacts().is_empty());
    }

    #[tokio::test]
    async fn capture_returns_surface_pixels() {
        let image = ExportPipeline::capture_surface(Some(surface(16, 8).snapshot()))
            .await
            .unwrap();
        assert_eq!(image.dimensions(), (16, 8));
    }

    #[tokio::test]
    async fn delivers_png_under_fixed_name() {
        let sink = Arc::new(MemorySink::new());
        let pipeline = ExportPipeline::with_shared_sink(sink.clone());

        let outcome = pipeline.export(Some(surface(32, 24).snapshot())).await.unwrap();
        let ExportOutcome::Delivered(delivery) = outcome else {
            panic!("expected a delivery, got {outcome:?}");
        };
        assert_eq!(delivery.file_name, "custom_hat.png");
        assert!(delivery.path.is_none());

        let artifacts = sink.artifacts();
        assert_eq!(artifacts.len(), 1);
        assert_eq!(artifacts[0].mime_type, "image/png");
        assert_eq!(artifacts[0].bytes.len(), delivery.size);

        let decoded = image::load_from_memory(&artifacts[0].bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (32, 24));
    }

    #[tokio::test]
    async fn download_dir_overwrites_the_same_file() {
        let dir = std::env::temp_dir().join(format!("hat-export-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        let pipeline = ExportPipeline::new(DownloadDir::new(&dir));

        for size in [10, 20] {
            let outcome = pipeline.export(Some(surface(size, size).snapshot())).await.unwrap();
            assert!(matches!(outcome, ExportOutcome::Delivered(_)));
        }

        let entries: Vec<_> = std::fs::read_dir(&dir).unwrap().collect();
        assert_eq!(entries.len(), 1);
        let saved = image::open(dir.join(EXPORT_FILE_NAME)).unwrap();
        assert_eq!(saved.width(), 20);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn sink_failure_is_reported() {
        let pipeline = ExportPipeline::new(FailingSink);
        let err = pipeline.export(Some(surface(4, 4).snapshot())).await.unwrap_err();
        assert!(matches!(err, ExportError::Deliver(_)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_exports_run_one_at_a_time() {
        let sink = Arc::new(SlowSink::default());
        let pipeline = ExportPipeline::with_shared_sink(sink.clone());

        let spawn_export = |width: u32| {
            let pipeline = pipeline.clone();
            let snapshot = surface(width, width).snapshot();
            tokio::spawn(async move { pipeline.export(Some(snapshot)).await })
        };

        let first = spawn_export(8);
        // Let the first export take the lock before the second one starts.
        tokio::time::sleep(Duration::from_millis(30)).await;
        let second = spawn_export(16);

        let (a, b) = tokio::join!(first, second);
        assert!(matches!(a.unwrap().unwrap(), ExportOutcome::Delivered(_)));
        assert!(matches!(b.unwrap().unwrap(), ExportOutcome::Delivered(_)));

        assert_eq!(sink.max_active.load(Ordering::SeqCst), 1, "deliveries overlapped");
        assert_eq!(*sink.widths.lock().unwrap(), vec![8, 16]);
    }

    #[test]
    fn only_missing_or_empty_captures_are_no_ops() {
        assert!(CaptureError::NoSurface.is_precondition());
        assert!(CaptureError::EmptyCapture.is_precondition());
        assert!(!CaptureError::Rasterizer.is_precondition());

        let err = ExportError::from(CaptureError::Rasterizer);
        assert!(matches!(err, ExportError::Capture(CaptureError::Rasterizer)));
    }

    #[tokio::test]
    async fn capture_without_surface_reports_no_surface() {
        let err = ExportPipeline::capture_surface(None).await.unwrap_err();
        assert_eq!(err, CaptureError::NoSurface);
    }

    #[test]
    fn save_artifact_encodes_png() {
        let sink = Arc::new(MemorySink::new());
        let pipeline = ExportPipeline::with_shared_sink(sink.clone());
        let image = RgbaImage::from_pixel(3, 2, Rgba([1, 2, 3, 255]));

        let delivery = pipeline.save_artifact(&image).unwrap();
        assert_eq!(delivery.file_name, EXPORT_FILE_NAME);

        let bytes = &sink.artifacts()[0].bytes;
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
    }
}
