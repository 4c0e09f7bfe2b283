//! The live preview surface.

use image::{Rgba, RgbaImage};
use tracing::{debug, warn};

use crate::color::ColorValue;
use crate::layer::{CaptionConfig, LayerPipeline, ModelConfig, ReferenceConfig};
use crate::scene::RenderDescriptor;
use crate::settings::{MAX_SURFACE_DIMENSION, ReferenceSettings, SurfaceSettings};

// ============================================================================
// Configurable Trait
// ============================================================================

/// Trait for types that can be configured from [`SurfaceSettings`].
pub trait Configurable {
    /// Applies the settings to this instance.
    fn apply_settings(&mut self, settings: &SurfaceSettings);

    /// Exports the current settings.
    fn export_settings(&self) -> SurfaceSettings;
}

// ============================================================================
// PreviewSurface
// ============================================================================

/// The composed view the user sees: background, shaded model, translucent
/// reference image and corner captions.
///
/// # Layer Pipeline
///
/// 1. **Model** (`pipeline.model`) - The hat primitives seen through the fixed camera
/// 2. **Reference** (`pipeline.reference`) - The fitting guide at low opacity
/// 3. **Caption** (`pipeline.caption`) - Text label and material caption
///
/// [`display`](Self::display) replaces what is shown wholesale;
/// [`present`](Self::present) returns the current frame, reusing cached
/// layers when nothing changed.
///
/// # Example
///
/// ```
/// use hat_designer::{PreviewSurface, RenderDescriptor, SurfaceSettings};
///
/// let settings = SurfaceSettings::new().with_size(64, 48).with_reference(None);
/// let mut surface = PreviewSurface::new(&settings);
/// surface.display(&RenderDescriptor::empty());
///
/// let frame = surface.present().unwrap();
/// assert_eq!(frame.dimensions(), (64, 48));
/// ```
pub struct PreviewSurface {
    settings: SurfaceSettings,
    background: Rgba<u8>,
    descriptor: RenderDescriptor,

    /// The layer pipeline. See [`LayerPipeline`] for the drawing order.
    pub pipeline: LayerPipeline,
}

impl PreviewSurface {
    /// Creates a surface showing the base scene (no hat yet).
    ///
    /// An unreadable reference image is logged and left out.
    pub fn new(settings: &SurfaceSettings) -> Self {
        let mut surface = Self {
            settings: settings.clone(),
            background: Rgba([255, 255, 255, 255]),
            descriptor: RenderDescriptor::empty(),
            pipeline: LayerPipeline::default(),
        };
        surface.apply_settings(settings);
        surface
    }

    /// Replaces the reference layer with an in-memory image.
    pub fn set_reference_image(&mut self, image: RgbaImage, opacity: f32) {
        self.pipeline
            .reference
            .set_config(Some(ReferenceConfig::new(image, opacity)));
    }

    /// Shows `descriptor`, replacing whatever was shown before.
    pub fn display(&mut self, descriptor: &RenderDescriptor) {
        self.descriptor = descriptor.clone();
        let model_changed = self.pipeline.model.set_config(Some(self.model_config()));
        let caption_changed = self.pipeline.caption.set_config(Some(self.caption_config()));
        debug!(
            primitives = descriptor.primitives.len(),
            model_changed, caption_changed, "surface updated"
        );
    }

    /// The descriptor currently shown.
    pub fn descriptor(&self) -> &RenderDescriptor {
        &self.descriptor
    }

    /// Returns the surface size in pixels.
    pub fn size(&self) -> (u32, u32) {
        (self.settings.width, self.settings.height)
    }

    /// Renders the current frame. Returns `None` for a zero-area surface.
    pub fn present(&mut self) -> Option<RgbaImage> {
        let (width, height) = self.size();
        self.pipeline.render(width, height, self.background)
    }

    /// Takes an owned copy of what is currently shown, for capture on another thread.
    pub fn snapshot(&self) -> SurfaceSnapshot {
        SurfaceSnapshot {
            pipeline: self.pipeline.clone(),
            width: self.settings.width,
            height: self.settings.height,
            background: self.background,
        }
    }

    /// Clears all layer caches.
    pub fn clear_cache(&mut self) {
        self.pipeline.invalidate_all();
    }

    fn model_config(&self) -> ModelConfig {
        ModelConfig::new(
            self.descriptor.primitives.clone(),
            self.settings.camera.clone(),
            self.settings.lighting.clone(),
        )
    }

    fn caption_config(&self) -> CaptionConfig {
        CaptionConfig::new(
            self.descriptor.overlays().cloned().collect(),
            self.settings.captions.clone(),
        )
    }

    fn load_reference(&mut self, reference: Option<&ReferenceSettings>) {
        let Some(reference) = reference.filter(|r| r.enabled) else {
            self.pipeline.reference.set_config(None);
            return;
        };

        match ReferenceConfig::load(&reference.path, reference.opacity) {
            Ok(config) => {
                self.pipeline.reference.set_config(Some(config));
            }
            Err(err) => {
                warn!(%err, "reference image unavailable, drawing without it");
                self.pipeline.reference.set_config(None);
            }
        }
    }
}

impl Configurable for PreviewSurface {
    /// Applies settings, reloading the reference image only when its source changed.
    fn apply_settings(&mut self, settings: &SurfaceSettings) {
        let reference_changed = self.settings.reference.as_ref().map(|r| (&r.path, r.enabled))
            != settings.reference.as_ref().map(|r| (&r.path, r.enabled))
            || !self.pipeline.reference.has_config();

        self.settings = settings.clone();
        if let Err(err) = settings.validate() {
            warn!(%err, "clamping surface size");
            self.settings.width = settings.width.min(MAX_SURFACE_DIMENSION);
            self.settings.height = settings.height.min(MAX_SURFACE_DIMENSION);
        }
        self.background = ColorValue::new(settings.background.as_str())
            .to_srgb()
            .map(|c| Rgba([c.red, c.green, c.blue, 255]))
            .unwrap_or_else(|| {
                warn!(background = %settings.background, "unparseable background, using white");
                Rgba([255, 255, 255, 255])
            });

        if reference_changed {
            self.load_reference(settings.reference.as_ref());
        } else if let (Some(current), Some(reference)) =
            (self.pipeline.reference.config().cloned(), settings.reference.as_ref())
        {
            self.pipeline
                .reference
                .set_config(Some(ReferenceConfig::new(current.image, reference.opacity)));
        }

        self.pipeline.model.set_config(Some(self.model_config()));
        self.pipeline.caption.set_config(Some(self.caption_config()));
        // The background is not tracked by any layer version.
        self.pipeline.invalidate_all();
    }

    fn export_settings(&self) -> SurfaceSettings {
        self.settings.clone()
    }
}

// ============================================================================
// SurfaceSnapshot
// ============================================================================

/// An owned, sendable copy of a surface's layers at one moment.
///
/// Later changes to the surface do not affect an existing snapshot.
#[derive(Clone)]
pub struct SurfaceSnapshot {
    pipeline: LayerPipeline,
    width: u32,
    height: u32,
    background: Rgba<u8>,
}

impl SurfaceSnapshot {
    /// Flattens the snapshot into one image. `None` if it has no area.
    pub fn rasterize(mut self) -> Option<RgbaImage> {
        self.pipeline.render(self.width, self.height, self.background)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{HatConfiguration, HatDraft};
    use crate::scene::SceneComposer;

    fn settings(width: u32, height: u32) -> SurfaceSettings {
        SurfaceSettings::new().with_size(width, height).with_reference(None)
    }

    fn fedora() -> RenderDescriptor {
        let mut config = HatConfiguration::with_draft(HatDraft {
            color: ColorValue::new("#ff0000"),
            material: "wool".into(),
            style: "fedora".into(),
            text: "hi".into(),
        });
        SceneComposer::compose(Some(config.commit()))
    }

    #[test]
    fn base_scene_is_plain_background() {
        let mut surface = PreviewSurface::new(&settings(40, 30));
        let frame = surface.present().unwrap();
        assert!(frame.pixels().all(|p| p.0 == [255, 255, 255, 255]));
    }

    #[test]
    fn custom_background() {
        let mut s = settings(10, 10);
        s.background = "#000000".into();
        let mut surface = PreviewSurface::new(&s);
        assert_eq!(surface.present().unwrap().get_pixel(5, 5).0, [0, 0, 0, 255]);
    }

    #[test]
    fn display_replaces_layers() {
        let mut surface = PreviewSurface::new(&settings(300, 200));
        surface.display(&fedora());
        assert_eq!(surface.descriptor().primitives.len(), 2);
        assert_eq!(surface.pipeline.caption.config().unwrap().overlays.len(), 2);

        surface.display(&RenderDescriptor::empty());
        assert!(surface.pipeline.model.config().unwrap().primitives.is_empty());
        assert!(surface.pipeline.caption.config().unwrap().overlays.is_empty());

        let frame = surface.present().unwrap();
        assert!(frame.pixels().all(|p| p.0 == [255, 255, 255, 255]));
    }

    #[test]
    fn displaying_same_descriptor_keeps_versions() {
        let mut surface = PreviewSurface::new(&settings(30, 20));
        surface.display(&fedora());
        let versions = surface.pipeline.layer_versions();
        surface.display(&fedora());
        let again = surface.pipeline.layer_versions();
        assert_eq!(versions.model, again.model);
        assert_eq!(versions.caption, again.caption);
    }

    #[test]
    fn snapshot_is_independent_of_later_changes() {
        let mut surface = PreviewSurface::new(&settings(300, 200));
        surface.display(&fedora());
        let snapshot = surface.snapshot();

        surface.display(&RenderDescriptor::empty());

        let captured = snapshot.rasterize().unwrap();
        let live = surface.present().unwrap();
        assert_ne!(captured, live);
    }

    #[test]
    fn zero_area_surface_has_no_pixels() {
        let mut surface = PreviewSurface::new(&settings(0, 0));
        assert!(surface.present().is_none());
        assert!(surface.snapshot().rasterize().is_none());
    }

    #[test]
    fn missing_reference_is_skipped() {
        let s = SurfaceSettings::new().with_size(20, 20).with_reference(Some(ReferenceSettings {
            path: "/no/such/dog_hat_base.png".into(),
            ..ReferenceSettings::default()
        }));
        let mut surface = PreviewSurface::new(&s);
        assert!(!surface.pipeline.reference.has_config());
        assert!(surface.present().is_some());
    }

    #[test]
    fn in_memory_reference_is_composited() {
        let mut surface = PreviewSurface::new(&settings(10, 10));
        surface.set_reference_image(RgbaImage::from_pixel(2, 2, Rgba([0, 0, 0, 255])), 0.3);
        let p = *surface.present().unwrap().get_pixel(5, 5);
        assert!(p[0] < 255 && p[0] > 150, "got {:?}", p);
    }

    #[test]
    fn settings_round_trip() {
        let s = settings(123, 45);
        let surface = PreviewSurface::new(&s);
        assert_eq!(surface.export_settings(), s);
        assert_eq!(surface.size(), (123, 45));
    }

    #[test]
    fn oversized_settings_are_clamped() {
        let surface = PreviewSurface::new(&settings(100_000, 12));
        assert_eq!(surface.size(), (MAX_SURFACE_DIMENSION, 12));
    }

    #[test]
    fn disabling_reference_drops_image() {
        let mut surface = PreviewSurface::new(&settings(10, 10));
        surface.set_reference_image(RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 255])), 0.3);

        let mut s = settings(10, 10);
        s.reference = Some(ReferenceSettings {
            opacity: 0.3,
            enabled: false,
            ..ReferenceSettings::default()
        });
        surface.apply_settings(&s);
        assert!(!surface.pipeline.reference.has_config());
    }
}
