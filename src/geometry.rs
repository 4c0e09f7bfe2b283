//! Style-to-primitive catalog.
//!
//! Each [`HatStyle`] maps to a fixed, hand-tuned list of primitives. The
//! `dimensions` of a primitive follow the argument order of the matching
//! three.js geometry constructor so the numbers can be compared directly:
//!
//! | Shape      | `dimensions`                                         |
//! |------------|------------------------------------------------------|
//! | `Sphere`   | `[radius, width_segments, height_segments]`          |
//! | `Cone`     | `[radius, height, radial_segments]`                  |
//! | `Cylinder` | `[radius_top, radius_bottom, height, radial_segments]` |

use crate::color::ColorValue;
use crate::style::HatStyle;

/// Kind of primitive shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    Sphere,
    Cone,
    Cylinder,
}

/// A point or Euler rotation (radians, XYZ order) in scene space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Builds a vector from `[x, y, z]`.
    pub fn from_array([x, y, z]: [f32; 3]) -> Self {
        Self { x, y, z }
    }

    pub fn add(self, other: Self) -> Self {
        Self::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }

    pub fn sub(self, other: Self) -> Self {
        Self::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }

    pub fn scale(self, s: f32) -> Self {
        Self::new(self.x * s, self.y * s, self.z * s)
    }

    pub fn dot(self, other: Self) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// Right-handed cross product.
    pub fn cross(self, other: Self) -> Self {
        Self::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }

    /// Returns the Euclidean length.
    pub fn length(self) -> f32 {
        self.dot(self).sqrt()
    }

    /// Returns the unit vector, or zero for a degenerate input.
    pub fn normalize(self) -> Self {
        let len = self.length();
        if len <= f32::EPSILON {
            Self::ZERO
        } else {
            self.scale(1.0 / len)
        }
    }
}

/// One primitive of a hat composition.
#[derive(Debug, Clone, PartialEq)]
pub struct PrimitiveDescriptor {
    pub shape: ShapeKind,
    pub dimensions: Vec<f32>,
    pub position: Vec3,
    pub rotation: Vec3,
    pub color: ColorValue,
}

impl PrimitiveDescriptor {
    fn new(
        shape: ShapeKind,
        dimensions: &[f32],
        position: Vec3,
        rotation: Vec3,
        color: &ColorValue,
    ) -> Self {
        Self {
            shape,
            dimensions: dimensions.to_vec(),
            position,
            rotation,
            color: color.clone(),
        }
    }
}

const CROWN_TILT: Vec3 = Vec3::new(0.3, 0.0, 0.0);
const RADIAL_SEGMENTS: f32 = 32.0;

/// Stateless lookup from style to primitives.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeometryCatalog;

impl GeometryCatalog {
    /// Resolves a free-text style label to its composition.
    ///
    /// Labels are matched case-insensitively; unknown or empty labels yield
    /// the beanie composition.
    pub fn resolve(style_label: &str, color: &ColorValue) -> Vec<PrimitiveDescriptor> {
        Self::composition(HatStyle::parse(style_label), color)
    }

    /// Returns the composition for an already parsed style.
    ///
    /// Every primitive carries the same `color`.
    pub fn composition(style: HatStyle, color: &ColorValue) -> Vec<PrimitiveDescriptor> {
        match style {
            HatStyle::Beanie => vec![PrimitiveDescriptor::new(
                ShapeKind::Sphere,
                &[0.5, RADIAL_SEGMENTS, RADIAL_SEGMENTS],
                Vec3::new(0.0, 1.45, 0.0),
                CROWN_TILT,
                color,
            )],
            HatStyle::Fedora => vec![
                PrimitiveDescriptor::new(
                    ShapeKind::Cone,
                    &[0.5, 0.7, RADIAL_SEGMENTS],
                    Vec3::new(0.0, 1.5, 0.0),
                    CROWN_TILT,
                    color,
                ),
                brim(color),
            ],
            HatStyle::Bucket => vec![
                PrimitiveDescriptor::new(
                    ShapeKind::Cylinder,
                    &[0.5, 0.6, 0.4, RADIAL_SEGMENTS],
                    Vec3::new(0.0, 1.5, 0.0),
                    CROWN_TILT,
                    color,
                ),
                brim(color),
            ],
        }
    }
}

/// Flat disc shared by the fedora and bucket styles.
fn brim(color: &ColorValue) -> PrimitiveDescriptor {
    PrimitiveDescriptor::new(
        ShapeKind::Cylinder,
        &[0.8, 0.8, 0.05, RADIAL_SEGMENTS],
        Vec3::new(0.0, 1.2, 0.0),
        Vec3::ZERO,
        color,
    )
}
