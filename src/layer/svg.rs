//! SVG rasterization and compositing using resvg/usvg.
//!
//! Both the model layer (projected polygons) and the caption layer (text)
//! describe their drawing as SVG sized to the surface and rasterize it here.

use std::sync::{Arc, OnceLock};

use image::{Rgba, RgbaImage};
use resvg::tiny_skia::{Pixmap, Transform};
use resvg::usvg::{fontdb, Options, Tree};

// ============================================================================
// SVG Rendering
// ============================================================================

/// Families tried, in order, when a generic family maps to a face that is not installed.
const FALLBACK_FAMILIES: &[&str] = &[
    "DejaVu Sans",
    "Liberation Sans",
    "Noto Sans",
    "Helvetica",
    "Arial",
];

/// System fonts, loaded once per process for caption text.
///
/// fontdb maps `sans-serif` to Arial by default. When that face is missing,
/// the mapping is pointed at an installed family instead, so generic
/// families always resolve while any font is available.
pub fn shared_fontdb() -> Arc<fontdb::Database> {
    static FONTS: OnceLock<Arc<fontdb::Database>> = OnceLock::new();
    FONTS
        .get_or_init(|| {
            let mut db = fontdb::Database::new();
            db.load_system_fonts();
            if db.is_empty() {
                tracing::warn!("no system fonts found, captions will not be drawn");
            } else if !resolves(&db, fontdb::Family::SansSerif) {
                if let Some(family) = installed_fallback(&db) {
                    tracing::debug!(%family, "mapping sans-serif to installed family");
                    db.set_sans_serif_family(family);
                }
            }
            tracing::debug!(faces = db.len(), "loaded system fonts");
            Arc::new(db)
        })
        .clone()
}

fn resolves(db: &fontdb::Database, family: fontdb::Family<'_>) -> bool {
    let families = [family];
    let query = fontdb::Query {
        families: &families,
        ..fontdb::Query::default()
    };
    db.query(&query).is_some()
}

/// The first preferred family that is installed, else the first loaded one.
fn installed_fallback(db: &fontdb::Database) -> Option<String> {
    FALLBACK_FAMILIES
        .iter()
        .find(|&&name| resolves(db, fontdb::Family::Name(name)))
        .map(|name| name.to_string())
        .or_else(|| {
            db.faces()
                .find_map(|face| face.families.first())
                .map(|(name, _)| name.clone())
        })
}

/// Renders an SVG document onto a transparent `width` x `height` image.
///
/// The document is scaled so its own size maps onto the target size.
/// Returns `None` if the SVG cannot be parsed or the target is empty.
pub fn render_svg(svg_data: &str, width: u32, height: u32) -> Option<RgbaImage> {
    let mut opts = Options::default();
    opts.fontdb = shared_fontdb();

    let tree = match Tree::from_str(svg_data, &opts) {
        Ok(tree) => tree,
        Err(err) => {
            tracing::warn!(%err, "failed to parse generated SVG");
            return None;
        }
    };

    let mut pixmap = Pixmap::new(width, height)?;
    let size = tree.size();
    let transform = Transform::from_scale(
        width as f32 / size.width(),
        height as f32 / size.height(),
    );
    resvg::render(&tree, transform, &mut pixmap.as_mut());

    Some(pixmap_to_rgba_image(&pixmap))
}

/// Converts a tiny_skia Pixmap to an image::RgbaImage.
fn pixmap_to_rgba_image(pixmap: &Pixmap) -> RgbaImage {
    let mut img = RgbaImage::new(pixmap.width(), pixmap.height());

    for (dst, src) in img.pixels_mut().zip(pixmap.pixels()) {
        // tiny_skia stores premultiplied alpha.
        let c = src.demultiply();
        *dst = Rgba([c.red(), c.green(), c.blue(), c.alpha()]);
    }

    img
}

/// Escapes text for use inside SVG character data or attribute values.
pub fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}

// ============================================================================
// Compositing
// ============================================================================

/// Composites `src` onto `dest` at `(x, y)` with an extra opacity factor.
///
/// Uses standard source-over blending. Pixels falling outside `dest` are skipped.
pub fn composite_over(dest: &mut RgbaImage, src: &RgbaImage, x: i32, y: i32, opacity: f32) {
    let opacity = opacity.clamp(0.0, 1.0);
    if opacity == 0.0 {
        return;
    }

    let dest_width = dest.width() as i32;
    let dest_height = dest.height() as i32;

    for (sx, sy, src_pixel) in src.enumerate_pixels() {
        let dx = x + sx as i32;
        let dy = y + sy as i32;
        if dx < 0 || dy < 0 || dx >= dest_width || dy >= dest_height {
            continue;
        }

        let dst_pixel = dest.get_pixel(dx as u32, dy as u32);
        let blended = alpha_blend(*src_pixel, *dst_pixel, opacity);
        dest.put_pixel(dx as u32, dy as u32, blended);
    }
}

/// Source-over blend of two RGBA pixels, scaling the source alpha by `opacity`.
fn alpha_blend(src: Rgba<u8>, dst: Rgba<u8>, opacity: f32) -> Rgba<u8> {
    let sa = src[3] as f32 / 255.0 * opacity;
    let da = dst[3] as f32 / 255.0;
    let out_a = sa + da * (1.0 - sa);

    if out_a == 0.0 {
        return Rgba([0, 0, 0, 0]);
    }

    let blend = |s: u8, d: u8| -> u8 {
        let sf = s as f32 / 255.0;
        let df = d as f32 / 255.0;
        let out = (sf * sa + df * da * (1.0 - sa)) / out_a;
        (out * 255.0).round() as u8
    };

    Rgba([
        blend(src[0], dst[0]),
        blend(src[1], dst[1]),
        blend(src[2], dst[2]),
        (out_a * 255.0).round() as u8,
    ])
}

// ============================================================================
// Tests
// ============================================================================
