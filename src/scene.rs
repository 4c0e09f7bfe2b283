//! Derives what the preview surface should draw from a committed hat.

use tracing::debug;

use crate::config::CommittedHat;
use crate::geometry::{GeometryCatalog, PrimitiveDescriptor};

/// Corner of the surface an overlay is pinned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OverlayAnchor {
    BottomLeft,
    BottomRight,
}

/// What an overlay represents. Drives its typography on the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OverlayRole {
    /// The user's free-text label.
    Label,
    /// The `"{material} - {style}"` caption.
    Caption,
}

/// A piece of text composited over the rendered scene.
///
/// Overlays live in surface space, not in the 3D scene.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OverlayText {
    pub text: String,
    pub anchor: OverlayAnchor,
    pub role: OverlayRole,
}

impl OverlayText {
    /// Creates the bottom-left free-text label.
    pub fn label(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            anchor: OverlayAnchor::BottomLeft,
            role: OverlayRole::Label,
        }
    }

    /// Creates the bottom-right material caption.
    pub fn caption(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            anchor: OverlayAnchor::BottomRight,
            role: OverlayRole::Caption,
        }
    }
}

/// Everything the surface needs for one committed configuration.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RenderDescriptor {
    pub primitives: Vec<PrimitiveDescriptor>,
    pub label: Option<OverlayText>,
    pub caption: Option<OverlayText>,
}

impl RenderDescriptor {
    /// The base scene drawn before anything has been generated.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Overlays in drawing order.
    pub fn overlays(&self) -> impl Iterator<Item = &OverlayText> {
        self.label.iter().chain(self.caption.iter())
    }
}

/// Stateless composer from [`CommittedHat`] to [`RenderDescriptor`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SceneComposer;

impl SceneComposer {
    /// Composes the scene for `committed`, or the empty base scene for `None`.
    pub fn compose(committed: Option<&CommittedHat>) -> RenderDescriptor {
        let Some(hat) = committed else {
            return RenderDescriptor::empty();
        };

        let primitives = GeometryCatalog::resolve(hat.style(), hat.color());
        let label = (!hat.text().is_empty()).then(|| OverlayText::label(hat.text()));
        let caption = (!hat.material().is_empty())
            .then(|| OverlayText::caption(format!("{} - {}", hat.material(), hat.style())));

        debug!(
            primitives = primitives.len(),
            label = label.is_some(),
            caption = caption.is_some(),
            "composed scene"
        );

        RenderDescriptor {
            primitives,
            label,
            caption,
        }
    }
}
