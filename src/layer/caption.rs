//! Caption layer: corner text overlays.

use std::fmt::Write as _;

use super::svg::{composite_over, escape_xml, render_svg};
use super::{DependencyVersion, LayerConfig, LayerEffect, LayerVersions, RenderContext};
use crate::scene::{OverlayAnchor, OverlayRole, OverlayText};
use crate::settings::CaptionSettings;

// ============================================================================
// CaptionConfig
// ============================================================================

/// Overlays to draw, with their typography.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionConfig {
    pub overlays: Vec<OverlayText>,
    pub style: CaptionSettings,
}

impl CaptionConfig {
    /// Creates a config from overlays and their typography.
    pub fn new(overlays: Vec<OverlayText>, style: CaptionSettings) -> Self {
        Self { overlays, style }
    }

    /// Builds the SVG document for a `width` x `height` surface.
    pub fn to_svg(&self, width: u32, height: u32) -> String {
        let style = &self.style;
        let mut svg = format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" viewBox="0 0 {width} {height}">"#
        );

        let filter = if style.drop_shadow {
            svg.push_str(
                r##"<defs><filter id="shadow" x="-10%" y="-50%" width="120%" height="200%"><feDropShadow dx="0" dy="1" stdDeviation="1" flood-color="#000000" flood-opacity="0.35"/></filter></defs>"##,
            );
            r#" filter="url(#shadow)""#
        } else {
            ""
        };

        for overlay in &self.overlays {
            let (font_size, weight) = match overlay.role {
                OverlayRole::Label => (style.label_font_size, 700),
                OverlayRole::Caption => (style.caption_font_size, 500),
            };
            let (x, anchor) = match overlay.anchor {
                OverlayAnchor::BottomLeft => (style.inset, "start"),
                OverlayAnchor::BottomRight => (width as f32 - style.inset, "end"),
            };
            // Baseline sits a quarter em above the inset so descenders stay inside.
            let y = height as f32 - style.inset - font_size * 0.25;

            let _ = write!(
                svg,
                r#"<text x="{x:.1}" y="{y:.1}" font-family="{family}" font-size="{font_size}" font-weight="{weight}" fill="{fill}" text-anchor="{anchor}"{filter}>{text}</text>"#,
                family = escape_xml(&style.font_family),
                fill = escape_xml(&style.color),
                text = escape_xml(&overlay.text),
            );
        }

        svg.push_str("</svg>");
        svg
    }
}

impl LayerConfig for CaptionConfig {
    fn differs_from(&self, other: &Self) -> bool {
        self != other
    }
}

impl LayerEffect for CaptionConfig {
    /// Captions are drawn last, over the model and the reference image.
    fn dependencies(versions: &LayerVersions) -> DependencyVersion {
        DependencyVersion::combine(&[versions.model, versions.reference])
    }

    fn transform(&self, ctx: &mut RenderContext) {
        if self.overlays.is_empty() {
            return;
        }

        let (width, height) = (ctx.width(), ctx.height());
        let Some(rendered) = render_svg(&self.to_svg(width, height), width, height) else {
            return;
        };
        composite_over(&mut ctx.image, &rendered, 0, 0, 1.0);
    }
}

// ============================================================================
// Tests
// ============================================================================
