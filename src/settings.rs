//! Serializable preview surface settings.
//!
//! [`SurfaceSettings`] describes everything about the preview surface that is
//! not derived from the hat itself: its size, background, fixed camera,
//! lighting, caption typography and the translucent reference image.
//!
//! # Example
//!
//! ```
//! use hat_designer::SurfaceSettings;
//!
//! let settings = SurfaceSettings::from_json(r#"{ "width": 320, "height": 240 }"#).unwrap();
//! assert_eq!(settings.width, 320);
//! // Everything not given keeps its default.
//! assert_eq!(settings.camera.fov_degrees, 75.0);
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::SettingsError;

// ============================================================================
// Camera & Lighting
// ============================================================================

/// Fixed perspective camera. The surface offers no orbit, pan or zoom.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CameraSettings {
    pub position: [f32; 3],
    /// Point the camera looks at.
    pub target: [f32; 3],
    /// Vertical field of view.
    pub fov_degrees: f32,
    /// Geometry closer than this to the camera is not drawn.
    pub near: f32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            position: [0.0, 1.6, 3.0],
            target: [0.0, 0.0, 0.0],
            fov_degrees: 75.0,
            near: 0.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LightingSettings {
    pub ambient_intensity: f32,
    pub directional_intensity: f32,
    /// The directional light shines from here towards the origin.
    pub directional_position: [f32; 3],
}

impl Default for LightingSettings {
    fn default() -> Self {
        Self {
            ambient_intensity: 0.5,
            directional_intensity: 1.0,
            directional_position: [5.0, 5.0, 5.0],
        }
    }
}

// ============================================================================
// Overlays
// ============================================================================

/// Typography for the corner overlays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CaptionSettings {
    /// Distance from the surface edges, in pixels.
    pub inset: f32,
    pub font_family: String,
    pub label_font_size: f32,
    pub caption_font_size: f32,
    pub color: String,
    pub drop_shadow: bool,
}

impl Default for CaptionSettings {
    fn default() -> Self {
        Self {
            inset: 16.0,
            font_family: "sans-serif".into(),
            label_font_size: 18.0,
            caption_font_size: 14.0,
            color: "#ffffff".into(),
            drop_shadow: true,
        }
    }
}

/// The static fitting guide drawn over the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReferenceSettings {
    pub path: PathBuf,
    /// 0.0 (invisible) to 1.0 (opaque).
    pub opacity: f32,
    pub enabled: bool,
}

impl Default for ReferenceSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("dog_hat_base.png"),
            opacity: 0.3,
            enabled: true,
        }
    }
}

// ============================================================================
// SurfaceSettings
// ============================================================================

/// Largest accepted surface width or height, in pixels.
pub const MAX_SURFACE_DIMENSION: u32 = 8192;

/// All preview surface settings.
///
/// # JSON Format
///
/// ```json
/// {
///   "width": 600,
///   "height": 400,
///   "background": "#ffffff",
///   "camera": { "position": [0.0, 1.6, 3.0], "target": [0.0, 0.0, 0.0], "fovDegrees": 75.0, "near": 0.1 },
///   "lighting": { "ambientIntensity": 0.5, "directionalIntensity": 1.0, "directionalPosition": [5.0, 5.0, 5.0] },
///   "captions": { "inset": 16.0, "fontFamily": "sans-serif", "labelFontSize": 18.0, "captionFontSize": 14.0, "color": "#ffffff", "dropShadow": true },
///   "reference": { "path": "dog_hat_base.png", "opacity": 0.3, "enabled": true }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SurfaceSettings {
    pub width: u32,
    pub height: u32,
    pub background: String,
    pub camera: CameraSettings,
    pub lighting: LightingSettings,
    pub captions: CaptionSettings,
    /// `None` means no reference image at all.
    pub reference: Option<ReferenceSettings>,
}

impl Default for SurfaceSettings {
    fn default() -> Self {
        Self {
            width: 600,
            height: 400,
            background: "#ffffff".into(),
            camera: CameraSettings::default(),
            lighting: LightingSettings::default(),
            captions: CaptionSettings::default(),
            reference: Some(ReferenceSettings::default()),
        }
    }
}

impl SurfaceSettings {
    /// Creates settings with every default.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the surface size in pixels.
    ///
    /// Sizes above [`MAX_SURFACE_DIMENSION`] are rejected by
    /// [`validate`](Self::validate) and clamped by the preview surface.
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Sets or clears the reference image.
    pub fn with_reference(mut self, reference: Option<ReferenceSettings>) -> Self {
        self.reference = reference;
        self
    }

    /// Reads settings from a JSON file.
    ///
    /// A relative reference image path is resolved against the file's directory.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut settings = Self::from_json(&json)?;

        if let (Some(reference), Some(dir)) = (settings.reference.as_mut(), path.parent()) {
            if reference.path.is_relative() {
                reference.path = dir.join(&reference.path);
            }
        }

        Ok(settings)
    }

    /// Checks the values a surface cannot be built from.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.width > MAX_SURFACE_DIMENSION || self.height > MAX_SURFACE_DIMENSION {
            return Err(SettingsError::SurfaceTooLarge {
                width: self.width,
                height: self.height,
                max: MAX_SURFACE_DIMENSION,
            });
        }
        Ok(())
    }

    /// Serializes to compact JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serializes to indented JSON.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Parses and validates settings from JSON.
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }
}

// ============================================================================
// Tests
// ============================================================================
