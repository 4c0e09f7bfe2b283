//! Reference layer: the translucent fitting guide drawn over the model.

use std::path::Path;
use std::sync::Arc;

use image::imageops::{self, FilterType};
use image::RgbaImage;

use super::svg::composite_over;
use super::{DependencyVersion, LayerConfig, LayerEffect, LayerVersions, RenderContext};
use crate::error::ReferenceError;

/// A static image stretched to cover the surface at a fixed opacity.
#[derive(Debug, Clone)]
pub struct ReferenceConfig {
    pub image: Arc<RgbaImage>,
    /// Clamped to 0.0-1.0.
    pub opacity: f32,
}

impl ReferenceConfig {
    /// Creates a config, clamping `opacity` to 0.0-1.0.
    pub fn new(image: impl Into<Arc<RgbaImage>>, opacity: f32) -> Self {
        Self {
            image: image.into(),
            opacity: opacity.clamp(0.0, 1.0),
        }
    }

    /// Decodes the reference image from disk.
    pub fn load(path: &Path, opacity: f32) -> Result<Self, ReferenceError> {
        let image = image::open(path)
            .map_err(|source| ReferenceError::Load {
                path: path.to_path_buf(),
                source,
            })?
            .to_rgba8();
        Ok(Self::new(image, opacity))
    }
}

impl LayerConfig for ReferenceConfig {
    fn differs_from(&self, other: &Self) -> bool {
        !Arc::ptr_eq(&self.image, &other.image) || (self.opacity - other.opacity).abs() > 0.0001
    }
}

impl LayerEffect for ReferenceConfig {
    /// Drawn on top of the model.
    fn dependencies(versions: &LayerVersions) -> DependencyVersion {
        DependencyVersion::from_version(versions.model)
    }

    fn transform(&self, ctx: &mut RenderContext) {
        let Some(covered) = cover(&self.image, ctx.width(), ctx.height()) else {
            return;
        };
        composite_over(&mut ctx.image, &covered, 0, 0, self.opacity);
    }
}

/// Scales `image` to fill `width` x `height`, cropping the overflow evenly.
///
/// Returns `None` if either image has no area.
pub fn cover(image: &RgbaImage, width: u32, height: u32) -> Option<RgbaImage> {
    let (src_w, src_h) = image.dimensions();
    if src_w == 0 || src_h == 0 || width == 0 || height == 0 {
        return None;
    }

    let scale = (width as f32 / src_w as f32).max(height as f32 / src_h as f32);
    let scaled_w = ((src_w as f32 * scale).ceil() as u32).max(width);
    let scaled_h = ((src_h as f32 * scale).ceil() as u32).max(height);
    let scaled = imageops::resize(image, scaled_w, scaled_h, FilterType::Triangle);

    let x = (scaled_w - width) / 2;
    let y = (scaled_h - height) / 2;
    Some(imageops::crop_imm(&scaled, x, y, width, height).to_image())
}
