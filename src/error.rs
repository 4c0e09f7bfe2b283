//! Error types.

use std::path::PathBuf;

use thiserror::Error;

/// Why a surface capture produced no image.
///
/// [`NoSurface`](Self::NoSurface) and [`EmptyCapture`](Self::EmptyCapture)
/// are preconditions, not failures: the export pipeline turns them into a
/// no-op outcome rather than an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CaptureError {
    #[error("no preview surface is mounted")]
    NoSurface,
    #[error("rasterization produced no pixels")]
    EmptyCapture,
    #[error("rasterizer task did not complete")]
    Rasterizer,
}

impl CaptureError {
    /// Returns true for the outcomes that mean "nothing to export".
    pub fn is_precondition(self) -> bool {
        matches!(self, Self::NoSurface | Self::EmptyCapture)
    }
}

/// Failures while turning a captured image into a delivered file.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to capture surface: {0}")]
    Capture(#[from] CaptureError),
    #[error("failed to encode PNG: {0}")]
    Encode(#[from] image::ImageError),
    #[error("failed to deliver artifact: {0}")]
    Deliver(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings from {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid settings JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("surface {width}x{height} exceeds the {max} pixel limit")]
    SurfaceTooLarge { width: u32, height: u32, max: u32 },
}

/// Failure to load the reference image.
#[derive(Debug, Error)]
pub enum ReferenceError {
    #[error("failed to load reference image {}: {source}", path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}
