//! The single-user configurator session.

use std::future::Future;

use tracing::debug;

use crate::color::ColorValue;
use crate::config::{CommittedHat, HatConfiguration, HatDraft};
use crate::error::ExportError;
use crate::export::{ExportOutcome, ExportPipeline};
use crate::preview::PreviewSurface;
use crate::scene::{RenderDescriptor, SceneComposer};

// ============================================================================
// HatDesigner
// ============================================================================

/// Owns all mutable state of one configurator session.
///
/// Field edits go to the draft. [`generate`](Self::generate) commits the
/// draft and replaces what the surface shows. [`export`](Self::export)
/// captures the surface as it is at the moment of the call.
///
/// # Example
///
/// ```
/// use hat_designer::{ExportPipeline, HatDesigner, MemorySink, PreviewSurface, SurfaceSettings};
///
/// let mut designer = HatDesigner::new(ExportPipeline::new(MemorySink::new()));
/// designer.mount_surface(PreviewSurface::new(
///     &SurfaceSettings::new().with_size(120, 80).with_reference(None),
/// ));
///
/// designer.set_style("Fedora");
/// designer.set_material("felt");
/// designer.generate();
///
/// assert_eq!(designer.displayed().primitives.len(), 2);
/// ```
pub struct HatDesigner {
    config: HatConfiguration,
    displayed: RenderDescriptor,
    surface: Option<PreviewSurface>,
    exporter: ExportPipeline,
}

impl HatDesigner {
    /// Starts a session with the default draft and no surface mounted.
    pub fn new(exporter: ExportPipeline) -> Self {
        Self::with_configuration(HatConfiguration::new(), exporter)
    }

    /// Starts a session from existing configuration state.
    pub fn with_configuration(config: HatConfiguration, exporter: ExportPipeline) -> Self {
        let displayed = SceneComposer::compose(config.committed());
        Self {
            config,
            displayed,
            surface: None,
            exporter,
        }
    }

    /// Mounts `surface` and shows the current scene on it.
    ///
    /// Returns the previously mounted surface, if any.
    pub fn mount_surface(&mut self, mut surface: PreviewSurface) -> Option<PreviewSurface> {
        surface.display(&self.displayed);
        self.surface.replace(surface)
    }

    /// Removes the surface. Later exports capture nothing.
    pub fn unmount_surface(&mut self) -> Option<PreviewSurface> {
        self.surface.take()
    }

    /// Returns the mounted surface, if any.
    pub fn surface(&self) -> Option<&PreviewSurface> {
        self.surface.as_ref()
    }

    /// Returns the mounted surface mutably, if any.
    pub fn surface_mut(&mut self) -> Option<&mut PreviewSurface> {
        self.surface.as_mut()
    }

    /// Returns the draft being edited.
    pub fn draft(&self) -> &HatDraft {
        self.config.draft()
    }

    /// Returns the last committed configuration, if any.
    pub fn committed(&self) -> Option<&CommittedHat> {
        self.config.committed()
    }

    /// What the surface currently shows.
    pub fn displayed(&self) -> &RenderDescriptor {
        &self.displayed
    }

    /// Sets the draft color.
    pub fn set_color(&mut self, color: impl Into<ColorValue>) {
        self.config.set_color(color);
    }

    /// Sets the draft material label.
    pub fn set_material(&mut self, material: impl Into<String>) {
        self.config.set_material(material);
    }

    /// Sets the draft style label.
    pub fn set_style(&mut self, style: impl Into<String>) {
        self.config.set_style(style);
    }

    /// Sets the draft free-text label.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.config.set_text(text);
    }

    /// Commits the draft and rebuilds the displayed scene from scratch.
    pub fn generate(&mut self) -> &RenderDescriptor {
        let committed = self.config.commit();
        self.displayed = SceneComposer::compose(Some(committed));

        if let Some(surface) = self.surface.as_mut() {
            surface.display(&self.displayed);
        }
        debug!(mounted = self.surface.is_some(), "generated hat");
        &self.displayed
    }

    /// Starts an export of the surface as currently shown.
    ///
    /// The surface is sampled before this returns, so the session can keep
    /// editing (or even generate again) while the returned future runs.
    pub fn export(
        &self,
    ) -> impl Future<Output = Result<ExportOutcome, ExportError>> + Send + use<> {
        let snapshot = self.surface.as_ref().map(PreviewSurface::snapshot);
        let exporter = self.exporter.clone();
        async move { exporter.export(snapshot).await }
    }
}

// ============================================================================
// Tests
// ============================================================================
