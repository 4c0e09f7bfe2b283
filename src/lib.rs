//! hat-designer: a parametric 3D hat configurator
//!
//! This crate holds the state and rendering core of a single-session hat
//! configurator: a draft of user choices, an explicit commit step, a catalog
//! mapping hat styles to 3D primitives, a layered software preview surface
//! and an export pipeline that flattens that surface into `custom_hat.png`.
//!
//! # Example
//!
//! ```
//! use hat_designer::{
//!     ExportOutcome, ExportPipeline, HatDesigner, MemorySink, PreviewSurface, SurfaceSettings,
//! };
//!
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! let mut designer = HatDesigner::new(ExportPipeline::new(MemorySink::new()));
//! designer.mount_surface(PreviewSurface::new(
//!     &SurfaceSettings::new().with_size(200, 150).with_reference(None),
//! ));
//!
//! // Edits only touch the draft
//! designer.set_color("#336699");
//! designer.set_style("Bucket");
//! designer.set_material("canvas");
//! designer.set_text("Rex");
//!
//! // Commit and redraw
//! let shown = designer.generate();
//! assert_eq!(shown.caption.as_ref().unwrap().text, "canvas - Bucket");
//!
//! match designer.export().await.unwrap() {
//!     ExportOutcome::Delivered(delivery) => assert_eq!(delivery.file_name, "custom_hat.png"),
//!     ExportOutcome::NotCaptured(reason) => panic!("nothing captured: {reason}"),
//! }
//! # });
//! ```
//!
//! # Pure Building Blocks
//!
//! The style dispatch and scene composition are plain functions and can be
//! used without a surface:
//!
//! ```
//! use hat_designer::{ColorValue, GeometryCatalog, HatConfiguration, SceneComposer, ShapeKind};
//!
//! let red = ColorValue::new("#ff0000");
//! assert_eq!(GeometryCatalog::resolve("FEDORA", &red), GeometryCatalog::resolve("fedora", &red));
//! assert_eq!(GeometryCatalog::resolve("top hat", &red)[0].shape, ShapeKind::Sphere);
//!
//! let mut config = HatConfiguration::new();
//! assert!(SceneComposer::compose(config.committed()).primitives.is_empty());
//!
//! config.set_style("bucket");
//! let scene = SceneComposer::compose(Some(config.commit()));
//! assert_eq!(scene.primitives.len(), 2);
//! ```

mod color;
mod config;
mod designer;
mod error;
mod export;
mod geometry;
mod layer;
mod preview;
mod scene;
mod settings;
mod style;

pub use color::ColorValue;
pub use config::{CommittedHat, HatConfiguration, HatDraft};
pub use designer::HatDesigner;
pub use error::{CaptureError, ExportError, ReferenceError, SettingsError};
pub use export::{
    Artifact, ArtifactSink, Delivery, DownloadDir, EXPORT_FILE_NAME, EXPORT_MIME_TYPE,
    ExportOutcome, ExportPipeline, MemorySink,
};
pub use geometry::{GeometryCatalog, PrimitiveDescriptor, ShapeKind, Vec3};
pub use layer::{
    CacheKey, CaptionConfig, Layer, LayerConfig, LayerPipeline, LayerVersions, ModelConfig,
    ReferenceConfig, RenderContext,
};
pub use preview::{Configurable, PreviewSurface, SurfaceSnapshot};
pub use scene::{OverlayAnchor, OverlayRole, OverlayText, RenderDescriptor, SceneComposer};
pub use settings::{
    CameraSettings, CaptionSettings, LightingSettings, MAX_SURFACE_DIMENSION, ReferenceSettings,
    SurfaceSettings,
};
pub use style::HatStyle;
