//! Model layer: the hat primitives, shaded and projected through the fixed camera.
//!
//! Each primitive is tessellated into flat faces using its own segment
//! counts, rotated (XYZ Euler order) and translated into scene space. Faces
//! pointing away from the camera are culled, the rest are lit with ambient
//! plus one directional light and drawn far-to-near as SVG polygons.

use std::f32::consts::{PI, TAU};
use std::fmt::Write as _;

use palette::Srgb;
use tracing::warn;

use super::svg::{composite_over, render_svg};
use super::{DependencyVersion, LayerConfig, LayerEffect, LayerVersions, RenderContext};
use crate::color::{shade, to_hex};
use crate::geometry::{PrimitiveDescriptor, ShapeKind, Vec3};
use crate::settings::{CameraSettings, LightingSettings};

/// Upper bound on segments per axis, whatever the descriptor asks for.
const MAX_SEGMENTS: usize = 256;

// ============================================================================
// ModelConfig
// ============================================================================

/// What the model layer draws: primitives seen through a camera under lights.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelConfig {
    pub primitives: Vec<PrimitiveDescriptor>,
    pub camera: CameraSettings,
    pub lighting: LightingSettings,
}

impl ModelConfig {
    /// Creates a config from primitives, camera and lighting.
    pub fn new(
        primitives: Vec<PrimitiveDescriptor>,
        camera: CameraSettings,
        lighting: LightingSettings,
    ) -> Self {
        Self {
            primitives,
            camera,
            lighting,
        }
    }

    /// Builds the SVG document for a `width` x `height` surface.
    pub fn to_svg(&self, width: u32, height: u32) -> String {
        let projector = Projector::new(&self.camera, width, height);
        let light = Vec3::from_array(self.lighting.directional_position).normalize();

        let mut faces: Vec<ProjectedFace> = Vec::new();
        for primitive in &self.primitives {
            let base = primitive.color.to_srgb().unwrap_or_else(|| {
                warn!(color = %primitive.color, "unparseable color, drawing white");
                Srgb::new(255, 255, 255)
            });

            for face in tessellate(primitive) {
                let face = face.place(primitive.position, primitive.rotation);
                let centroid = face.centroid();
                if face.normal.dot(centroid.sub(projector.eye)) >= 0.0 {
                    continue;
                }

                let Some(points) = face
                    .points
                    .iter()
                    .map(|p| projector.project(*p))
                    .collect::<Option<Vec<_>>>()
                else {
                    continue;
                };

                let lambert = face.normal.dot(light).max(0.0);
                let factor = self.lighting.ambient_intensity
                    + self.lighting.directional_intensity * lambert;

                faces.push(ProjectedFace {
                    points,
                    depth: projector.depth(centroid),
                    fill: to_hex(shade(base, factor)),
                });
            }
        }

        // Painter's algorithm: far faces first.
        faces.sort_by(|a, b| b.depth.total_cmp(&a.depth));

        let mut svg = format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" viewBox="0 0 {width} {height}">"#
        );
        for face in &faces {
            let points = face
                .points
                .iter()
                .map(|(x, y)| format!("{x:.2},{y:.2}"))
                .collect::<Vec<_>>()
                .join(" ");
            let _ = write!(
                svg,
                r#"<polygon points="{points}" fill="{fill}" stroke="{fill}" stroke-width="0.6" stroke-linejoin="round"/>"#,
                fill = face.fill
            );
        }
        svg.push_str("</svg>");
        svg
    }
}

impl LayerConfig for ModelConfig {
    fn differs_from(&self, other: &Self) -> bool {
        self != other
    }
}

impl LayerEffect for ModelConfig {
    /// The model is drawn straight onto the background.
    fn dependencies(_versions: &LayerVersions) -> DependencyVersion {
        DependencyVersion::NONE
    }

    fn transform(&self, ctx: &mut RenderContext) {
        if self.primitives.is_empty() {
            return;
        }

        let (width, height) = (ctx.width(), ctx.height());
        let svg = self.to_svg(width, height);
        let Some(rendered) = render_svg(&svg, width, height) else {
            return;
        };
        composite_over(&mut ctx.image, &rendered, 0, 0, 1.0);
    }
}

// ============================================================================
// Projection
// ============================================================================

struct ProjectedFace {
    points: Vec<(f32, f32)>,
    depth: f32,
    fill: String,
}

/// Perspective projection from scene space to surface pixels.
struct Projector {
    eye: Vec3,
    right: Vec3,
    up: Vec3,
    forward: Vec3,
    tan_half_fov: f32,
    aspect: f32,
    near: f32,
    width: f32,
    height: f32,
}

impl Projector {
    fn new(camera: &CameraSettings, width: u32, height: u32) -> Self {
        let eye = Vec3::from_array(camera.position);
        let forward = Vec3::from_array(camera.target).sub(eye).normalize();
        let mut right = forward.cross(Vec3::new(0.0, 1.0, 0.0)).normalize();
        if right == Vec3::ZERO {
            // Looking straight up or down.
            right = Vec3::new(1.0, 0.0, 0.0);
        }
        let up = right.cross(forward);

        Self {
            eye,
            right,
            up,
            forward,
            tan_half_fov: (camera.fov_degrees.to_radians() / 2.0).tan(),
            aspect: width as f32 / height.max(1) as f32,
            near: camera.near,
            width: width as f32,
            height: height as f32,
        }
    }

    fn depth(&self, point: Vec3) -> f32 {
        point.sub(self.eye).dot(self.forward)
    }

    /// Returns pixel coordinates, or `None` for points in front of the near plane.
    fn project(&self, point: Vec3) -> Option<(f32, f32)> {
        let d = point.sub(self.eye);
        let z = d.dot(self.forward);
        if z < self.near {
            return None;
        }
        let ndc_x = d.dot(self.right) / (z * self.tan_half_fov * self.aspect);
        let ndc_y = d.dot(self.up) / (z * self.tan_half_fov);
        Some((
            (ndc_x + 1.0) * 0.5 * self.width,
            (1.0 - ndc_y) * 0.5 * self.height,
        ))
    }
}

// ============================================================================
// Tessellation
// ============================================================================

/// A flat polygon with an outward normal.
#[derive(Debug, Clone)]
struct Face {
    points: Vec<Vec3>,
    normal: Vec3,
}

impl Face {
    /// Rotates (XYZ Euler) then translates the face into scene space.
    fn place(self, position: Vec3, rotation: Vec3) -> Self {
        Self {
            points: self
                .points
                .into_iter()
                .map(|p| rotate_xyz(p, rotation).add(position))
                .collect(),
            normal: rotate_xyz(self.normal, rotation),
        }
    }

    fn centroid(&self) -> Vec3 {
        let sum = self.points.iter().fold(Vec3::ZERO, |acc, p| acc.add(*p));
        sum.scale(1.0 / self.points.len().max(1) as f32)
    }
}

/// Applies an XYZ-order Euler rotation (`Rx * Ry * Rz`).
fn rotate_xyz(v: Vec3, r: Vec3) -> Vec3 {
    let (sz, cz) = r.z.sin_cos();
    let v = Vec3::new(v.x * cz - v.y * sz, v.x * sz + v.y * cz, v.z);
    let (sy, cy) = r.y.sin_cos();
    let v = Vec3::new(v.x * cy + v.z * sy, v.y, -v.x * sy + v.z * cy);
    let (sx, cx) = r.x.sin_cos();
    Vec3::new(v.x, v.y * cx - v.z * sx, v.y * sx + v.z * cx)
}

fn dimension(primitive: &PrimitiveDescriptor, index: usize, default: f32) -> f32 {
    primitive.dimensions.get(index).copied().unwrap_or(default)
}

fn segments(value: f32, min: usize) -> usize {
    (value.max(0.0) as usize).clamp(min, MAX_SEGMENTS)
}

/// Local-space faces for one primitive.
///
/// Missing dimensions take the three.js constructor defaults.
fn tessellate(primitive: &PrimitiveDescriptor) -> Vec<Face> {
    match primitive.shape {
        ShapeKind::Sphere => sphere(
            dimension(primitive, 0, 1.0),
            segments(dimension(primitive, 1, 32.0), 3),
            segments(dimension(primitive, 2, 16.0), 2),
        ),
        ShapeKind::Cone => cylinder(
            0.0,
            dimension(primitive, 0, 1.0),
            dimension(primitive, 1, 1.0),
            segments(dimension(primitive, 2, 32.0), 3),
        ),
        ShapeKind::Cylinder => cylinder(
            dimension(primitive, 0, 1.0),
            dimension(primitive, 1, 1.0),
            dimension(primitive, 2, 1.0),
            segments(dimension(primitive, 3, 32.0), 3),
        ),
    }
}

fn sphere(radius: f32, width_segments: usize, height_segments: usize) -> Vec<Face> {
    let point = |ix: usize, iy: usize| {
        let phi = ix as f32 / width_segments as f32 * TAU;
        let theta = iy as f32 / height_segments as f32 * PI;
        Vec3::new(
            -radius * phi.cos() * theta.sin(),
            radius * theta.cos(),
            radius * phi.sin() * theta.sin(),
        )
    };

    let mut faces = Vec::with_capacity(width_segments * height_segments);
    for iy in 0..height_segments {
        for ix in 0..width_segments {
            let points = vec![
                point(ix, iy),
                point(ix + 1, iy),
                point(ix + 1, iy + 1),
                point(ix, iy + 1),
            ];
            let center = points.iter().fold(Vec3::ZERO, |acc, p| acc.add(*p));
            faces.push(Face {
                normal: center.normalize(),
                points,
            });
        }
    }
    faces
}

/// Open-ended frustum with caps. A zero radius means no cap on that end.
fn cylinder(radius_top: f32, radius_bottom: f32, height: f32, radial_segments: usize) -> Vec<Face> {
    let half = height / 2.0;
    let slope = if height > 0.0 {
        (radius_bottom - radius_top) / height
    } else {
        0.0
    };
    let angle = |i: usize| i as f32 / radial_segments as f32 * TAU;
    let ring = |radius: f32, y: f32, i: usize| {
        let (s, c) = angle(i).sin_cos();
        Vec3::new(radius * s, y, radius * c)
    };

    let mut faces = Vec::with_capacity(radial_segments + 2);
    for i in 0..radial_segments {
        let mid = (angle(i) + angle(i + 1)) / 2.0;
        let mut points = vec![ring(radius_top, half, i)];
        if radius_top > 0.0 {
            points.push(ring(radius_top, half, i + 1));
        }
        points.push(ring(radius_bottom, -half, i + 1));
        points.push(ring(radius_bottom, -half, i));
        faces.push(Face {
            points,
            normal: Vec3::new(mid.sin(), slope, mid.cos()).normalize(),
        });
    }

    if radius_top > 0.0 {
        faces.push(Face {
            points: (0..radial_segments).map(|i| ring(radius_top, half, i)).collect(),
            normal: Vec3::new(0.0, 1.0, 0.0),
        });
    }
    if radius_bottom > 0.0 {
        faces.push(Face {
            points: (0..radial_segments).rev().map(|i| ring(radius_bottom, -half, i)).collect(),
            normal: Vec3::new(0.0, -1.0, 0.0),
        });
    }
    faces
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::ColorValue;
    use crate::geometry::GeometryCatalog;
    use crate::style::HatStyle;
    use image::Rgba;

    fn model(style: HatStyle, color: &str) -> ModelConfig {
        ModelConfig::new(
            GeometryCatalog::composition(style, &ColorValue::new(color)),
            CameraSettings::default(),
            LightingSettings::default(),
        )
    }

    #[test]
    fn target_projects_to_center() {
        let projector = Projector::new(&CameraSettings::default(), 300, 200);
        let (x, y) = projector.project(Vec3::ZERO).unwrap();
        assert!((x - 150.0).abs() < 0.01);
        assert!((y - 100.0).abs() < 0.01);
    }

    #[test]
    fn points_behind_camera_are_not_projected() {
        let projector = Projector::new(&CameraSettings::default(), 300, 200);
        assert!(projector.project(Vec3::new(0.0, 1.6, 4.0)).is_none());
    }

    #[test]
    fn rotation_order_is_xyz() {
        let r = rotate_xyz(Vec3::new(0.0, 1.0, 0.0), Vec3::new(PI / 2.0, 0.0, 0.0));
        assert!((r.z - 1.0).abs() < 1e-5);
        assert!(r.y.abs() < 1e-5);
    }

    #[test]
    fn tessellation_uses_segment_counts() {
        let color = ColorValue::new("#fff");
        let beanie = &GeometryCatalog::composition(HatStyle::Beanie, &color)[0];
        assert_eq!(tessellate(beanie).len(), 32 * 32);

        let fedora = GeometryCatalog::composition(HatStyle::Fedora, &color);
        // Cone: sides plus a bottom cap, no top cap.
        assert_eq!(tessellate(&fedora[0]).len(), 32 + 1);
        // Brim: sides plus both caps.
        assert_eq!(tessellate(&fedora[1]).len(), 32 + 2);
    }

    #[test]
    fn sphere_normals_point_outward() {
        for face in sphere(1.0, 8, 6) {
            assert!(face.normal.dot(face.centroid()) > 0.0);
        }
    }

    #[test]
    fn svg_contains_only_visible_faces() {
        let config = model(HatStyle::Beanie, "#d48fa7");
        let svg = config.to_svg(300, 200);
        let drawn = svg.matches("<polygon").count();
        assert!(drawn > 0);
        assert!(drawn < 32 * 32, "back faces should be culled");
    }

    #[test]
    fn empty_model_draws_nothing() {
        let config = ModelConfig::new(Vec::new(), CameraSettings::default(), LightingSettings::default());
        let mut ctx = RenderContext::new(30, 20, Rgba([255, 255, 255, 255]));
        config.transform(&mut ctx);
        assert!(ctx.image.pixels().all(|p| p.0 == [255, 255, 255, 255]));
    }

    #[test]
    fn beanie_is_drawn_near_the_top_center() {
        let config = model(HatStyle::Beanie, "#ff0000");
        let mut ctx = RenderContext::new(300, 200, Rgba([255, 255, 255, 255]));
        config.transform(&mut ctx);

        let hat = ctx.image.get_pixel(150, 39);
        assert!(hat[0] > hat[1] + 50, "expected red hat pixel, got {:?}", hat);
        assert_eq!(ctx.image.get_pixel(0, 199).0, [255, 255, 255, 255]);
    }

    #[test]
    fn unparseable_color_draws_white() {
        let config = model(HatStyle::Beanie, "definitely-not-a-color");
        let mut ctx = RenderContext::new(300, 200, Rgba([0, 0, 0, 255]));
        config.transform(&mut ctx);

        let hat = ctx.image.get_pixel(150, 39);
        assert!(hat[0] > 100 && hat[0] == hat[1] && hat[1] == hat[2], "got {:?}", hat);
    }

    #[test]
    fn differs_on_primitive_change() {
        let a = model(HatStyle::Beanie, "#ff0000");
        let b = model(HatStyle::Fedora, "#ff0000");
        let c = model(HatStyle::Beanie, "#00ff00");
        assert!(a.differs_from(&b));
        assert!(a.differs_from(&c));
        assert!(!a.differs_from(&a.clone()));
    }
}
