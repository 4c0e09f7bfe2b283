//! Layer infrastructure for the preview surface.
//!
//! The surface is built from three stacked layers, each holding an optional
//! configuration, a version counter for cache invalidation and a per-size
//! frame cache.
//!
//! Each layer config implements [`LayerEffect`], which declares the upstream
//! layers its output depends on and draws itself onto the frame carried by
//! [`RenderContext`].

pub mod caption;
pub mod model;
pub mod reference;
pub mod svg;

pub use caption::CaptionConfig;
pub use model::ModelConfig;
pub use reference::ReferenceConfig;

use std::collections::HashMap;

use image::{Rgba, RgbaImage};

// ============================================================================
// Render Context
// ============================================================================

/// The frame as it flows through the pipeline.
pub struct RenderContext {
    pub image: RgbaImage,
}

impl RenderContext {
    /// Starts a frame filled with the background color.
    pub fn new(width: u32, height: u32, background: Rgba<u8>) -> Self {
        Self {
            image: RgbaImage::from_pixel(width, height, background),
        }
    }

    /// Returns the frame width in pixels.
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Returns the frame height in pixels.
    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

// ============================================================================
// Layer Traits
// ============================================================================

/// Trait for layer configuration types.
///
/// Implementations report whether a new configuration would draw
/// differently, which drives cache invalidation.
pub trait LayerConfig: Clone {
    fn differs_from(&self, other: &Self) -> bool;
}

/// A layer configuration that knows how to draw itself.
pub trait LayerEffect: LayerConfig {
    /// Combined version of the upstream layers this layer draws on top of.
    fn dependencies(versions: &LayerVersions) -> DependencyVersion;

    /// Draws onto `ctx.image`.
    fn transform(&self, ctx: &mut RenderContext);
}

// ============================================================================
// Layer Dependencies
// ============================================================================

/// Combined version of upstream layers, stored alongside cached frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DependencyVersion(u64);

impl DependencyVersion {
    /// No dependencies (root layer).
    pub const NONE: Self = Self(0);

    /// Depends on a single upstream layer.
    pub fn from_version(version: u64) -> Self {
        Self(version)
    }

    /// Combines several upstream versions into one.
    ///
    /// Versions only ever grow, so the sum changes whenever any input does.
    pub fn combine(versions: &[u64]) -> Self {
        Self(versions.iter().fold(0u64, |acc, v| acc.wrapping_add(*v)))
    }
}

/// Snapshot of all layer versions in the pipeline.
#[derive(Debug, Clone, Copy, Default)]
pub struct LayerVersions {
    pub model: u64,
    pub reference: u64,
    pub caption: u64,
}

// ============================================================================
// CacheKey
// ============================================================================

/// Frames are cached per surface size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    width: u32,
    height: u32,
}

impl CacheKey {
    /// Creates a cache key for a frame size.
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

// ============================================================================
// Generic Layer
// ============================================================================

/// A layer with optional configuration, version and cache.
#[derive(Clone)]
pub struct Layer<C: LayerConfig> {
    config: Option<C>,
    version: u64,
    cache: HashMap<CacheKey, (RgbaImage, u64)>,
}

impl<C: LayerConfig> Default for Layer<C> {
    fn default() -> Self {
        Self {
            config: None,
            version: 0,
            cache: HashMap::new(),
        }
    }
}

impl<C: LayerConfig> Layer<C> {
    /// Returns the current configuration, if any.
    pub fn config(&self) -> Option<&C> {
        self.config.as_ref()
    }

    /// Returns true if this layer draws anything.
    pub fn has_config(&self) -> bool {
        self.config.is_some()
    }

    /// Returns the current version number.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Replaces the configuration. Returns true if it changed.
    pub fn set_config(&mut self, config: Option<C>) -> bool {
        let differs = match (&self.config, &config) {
            (None, None) => false,
            (Some(_), None) | (None, Some(_)) => true,
            (Some(old), Some(new)) => old.differs_from(new),
        };

        if differs {
            self.config = config;
            self.invalidate();
        }
        differs
    }

    /// Drops cached frames and bumps the version.
    pub fn invalidate(&mut self) {
        self.version = self.version.wrapping_add(1);
        self.cache.clear();
    }

    /// Returns the cached frame for `key` if it was drawn over `deps`.
    pub fn get_cached(&self, key: CacheKey, deps: DependencyVersion) -> Option<&RgbaImage> {
        self.cache
            .get(&key)
            .and_then(|(img, stored)| (*stored == deps.0).then_some(img))
    }

    /// Caches a frame drawn over `deps`.
    pub fn store(&mut self, key: CacheKey, image: RgbaImage, deps: DependencyVersion) {
        self.cache.insert(key, (image, deps.0));
    }
}

impl<C: LayerEffect> Layer<C> {
    /// Draws this layer onto the context, reusing a cached frame when valid.
    ///
    /// A layer without config leaves the context untouched.
    pub fn apply(&mut self, ctx: &mut RenderContext, key: CacheKey, versions: &LayerVersions) {
        let Some(config) = self.config.as_ref() else {
            return;
        };

        let deps = C::dependencies(versions);
        if let Some(cached) = self.get_cached(key, deps) {
            ctx.image = cached.clone();
            return;
        }

        config.transform(ctx);
        self.store(key, ctx.image.clone(), deps);
    }
}

// ============================================================================
// Composite Layer
// ============================================================================

/// Cache of finished frames. Has no configuration of its own.
#[derive(Clone, Default)]
pub struct CompositeLayer {
    cache: HashMap<CacheKey, (RgbaImage, u64)>,
}

impl CompositeLayer {
    /// Drops all cached frames.
    pub fn invalidate(&mut self) {
        self.cache.clear();
    }

    /// Returns the finished frame for `key` if no layer changed since.
    pub fn get_cached(&self, key: CacheKey, deps: DependencyVersion) -> Option<&RgbaImage> {
        self.cache
            .get(&key)
            .and_then(|(img, stored)| (*stored == deps.0).then_some(img))
    }

    /// Caches a finished frame.
    pub fn store(&mut self, key: CacheKey, image: RgbaImage, deps: DependencyVersion) {
        self.cache.insert(key, (image, deps.0));
    }
}

// ============================================================================
// Layer Pipeline
// ============================================================================

/// The surface's layers in drawing order.
///
/// ```text
/// Background
///     │
///     ▼
/// ┌───────────┐
/// │   Model   │ ◄── root
/// └─────┬─────┘
///       ▼
/// ┌───────────┐
/// │ Reference │ ◄── depends on: Model
/// └─────┬─────┘
///       ▼
/// ┌───────────┐
/// │  Caption  │ ◄── depends on: Model + Reference
/// └─────┬─────┘
///       ▼
/// ┌───────────┐
/// │ Composite │ ◄── depends on: all
/// └───────────┘
/// ```
#[derive(Clone, Default)]
pub struct LayerPipeline {
    /// Shaded hat primitives.
    pub model: Layer<ModelConfig>,

    /// Translucent fitting guide.
    pub reference: Layer<ReferenceConfig>,

    /// Corner text overlays.
    pub caption: Layer<CaptionConfig>,

    pub composite: CompositeLayer,
}

impl LayerPipeline {
    /// Returns the current version of every layer.
    pub fn layer_versions(&self) -> LayerVersions {
        LayerVersions {
            model: self.model.version(),
            reference: self.reference.version(),
            caption: self.caption.version(),
        }
    }

    /// Clears every layer cache and bumps every version.
    pub fn invalidate_all(&mut self) {
        self.model.invalidate();
        self.reference.invalidate();
        self.caption.invalidate();
        self.composite.invalidate();
    }

    fn composite_dependencies(&self) -> DependencyVersion {
        DependencyVersion::combine(&[
            self.model.version(),
            self.reference.version(),
            self.caption.version(),
        ])
    }

    /// Renders a `width` x `height` frame over `background`.
    ///
    /// Returns `None` for a zero-area frame.
    pub fn render(&mut self, width: u32, height: u32, background: Rgba<u8>) -> Option<RgbaImage> {
        if width == 0 || height == 0 {
            return None;
        }

        let key = CacheKey::new(width, height);
        let composite_deps = self.composite_dependencies();
        if let Some(cached) = self.composite.get_cached(key, composite_deps) {
            return Some(cached.clone());
        }

        let mut ctx = RenderContext::new(width, height, background);
        let versions = self.layer_versions();
        self.model.apply(&mut ctx, key, &versions);
        self.reference.apply(&mut ctx, key, &versions);
        self.caption.apply(&mut ctx, key, &versions);

        self.composite.store(key, ctx.image.clone(), composite_deps);
        Some(ctx.image)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::OverlayText;
    use crate::settings::CaptionSettings;

    fn caption(text: &str) -> CaptionConfig {
        CaptionConfig::new(vec![OverlayText::label(text)], CaptionSettings::default())
    }

    #[test]
    fn layer_set_config_tracks_versions() {
        let mut layer: Layer<CaptionConfig> = Layer::default();
        assert!(!layer.has_config());
        assert_eq!(layer.version(), 0);

        assert!(layer.set_config(Some(caption("a"))));
        assert!(layer.has_config());
        assert_eq!(layer.version(), 1);

        // Equal config is not a change.
        assert!(!layer.set_config(Some(caption("a"))));
        assert_eq!(layer.version(), 1);

        assert!(layer.set_config(Some(caption("b"))));
        assert_eq!(layer.version(), 2);

        assert!(layer.set_config(None));
        assert!(!layer.has_config());
        assert_eq!(layer.version(), 3);
    }

    #[test]
    fn clearing_config_stops_drawing() {
        let mut pipeline = LayerPipeline::default();
        let white = Rgba([255, 255, 255, 255]);
        pipeline.reference.set_config(Some(ReferenceConfig::new(
            RgbaImage::from_pixel(2, 2, Rgba([0, 0, 0, 255])),
            1.0,
        )));
        assert_eq!(pipeline.render(4, 4, white).unwrap().get_pixel(2, 2).0, [0, 0, 0, 255]);

        pipeline.reference.set_config(None);
        assert_eq!(pipeline.render(4, 4, white).unwrap().get_pixel(2, 2).0, white.0);
    }

    #[test]
    fn cache_is_keyed_by_dependency_version() {
        let mut layer: Layer<CaptionConfig> = Layer::default();
        let key = CacheKey::new(4, 4);
        layer.store(key, RgbaImage::new(4, 4), DependencyVersion::from_version(7));

        assert!(layer.get_cached(key, DependencyVersion::from_version(7)).is_some());
        assert!(layer.get_cached(key, DependencyVersion::from_version(8)).is_none());
        assert!(layer.get_cached(CacheKey::new(2, 2), DependencyVersion::from_version(7)).is_none());

        layer.invalidate();
        assert!(layer.get_cached(key, DependencyVersion::from_version(7)).is_none());
    }

    #[test]
    fn empty_pipeline_renders_background() {
        let mut pipeline = LayerPipeline::default();
        let frame = pipeline.render(8, 6, Rgba([255, 255, 255, 255])).unwrap();
        assert_eq!(frame.dimensions(), (8, 6));
        assert!(frame.pixels().all(|p| p.0 == [255, 255, 255, 255]));
    }

    #[test]
    fn zero_area_renders_nothing() {
        let mut pipeline = LayerPipeline::default();
        assert!(pipeline.render(0, 10, Rgba([0, 0, 0, 255])).is_none());
        assert!(pipeline.render(10, 0, Rgba([0, 0, 0, 255])).is_none());
    }

    #[test]
    fn composite_cache_invalidates_on_layer_change() {
        let mut pipeline = LayerPipeline::default();
        let white = Rgba([255, 255, 255, 255]);

        pipeline.render(8, 8, white);
        let before = pipeline.composite_dependencies();
        pipeline.reference.set_config(Some(ReferenceConfig::new(
            RgbaImage::from_pixel(2, 2, Rgba([0, 0, 0, 255])),
            1.0,
        )));
        assert_ne!(before, pipeline.composite_dependencies());

        let frame = pipeline.render(8, 8, white).unwrap();
        assert_eq!(frame.get_pixel(4, 4).0, [0, 0, 0, 255]);
    }
}
