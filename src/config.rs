//! Draft and committed hat parameters.

use tracing::debug;

use crate::color::ColorValue;

/// The in-progress parameters the user is editing.
///
/// No field is validated. Empty strings and unknown styles are accepted as-is.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HatDraft {
    pub color: ColorValue,
    pub material: String,
    pub style: String,
    pub text: String,
}

/// An immutable snapshot of a [`HatDraft`], taken by [`HatConfiguration::commit`].
///
/// This is the only value the scene composer reads. Its fields are private
/// and it has no public constructor, so `commit` is the only way to get one:
///
/// ```compile_fail
/// let hat: hat_designer::CommittedHat =
///     serde_json::from_str(r##"{"color":"#fff","material":"m","style":"fedora","text":"t"}"##)
///         .unwrap();
/// ```
///
/// ```compile_fail
/// use hat_designer::{CommittedHat, HatDraft};
///
/// let hat = CommittedHat::from(&HatDraft::default());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommittedHat {
    color: ColorValue,
    material: String,
    style: String,
    text: String,
}

impl CommittedHat {
    /// Returns the committed color.
    pub fn color(&self) -> &ColorValue {
        &self.color
    }

    /// Returns the committed material label.
    pub fn material(&self) -> &str {
        &self.material
    }

    /// The raw style label, exactly as the user typed it.
    pub fn style(&self) -> &str {
        &self.style
    }

    /// Returns the committed free-text label.
    pub fn text(&self) -> &str {
        &self.text
    }

    fn snapshot(draft: &HatDraft) -> Self {
        Self {
            color: draft.color.clone(),
            material: draft.material.clone(),
            style: draft.style.clone(),
            text: draft.text.clone(),
        }
    }
}

/// Session state: the draft being edited plus the last committed snapshot.
///
/// Setters touch the draft only. [`commit`](Self::commit) is the single
/// transition that produces a new [`CommittedHat`].
#[derive(Debug, Clone, Default)]
pub struct HatConfiguration {
    draft: HatDraft,
    committed: Option<CommittedHat>,
}

impl HatConfiguration {
    /// Creates a session with the default draft.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a session from an existing draft, with nothing committed yet.
    pub fn with_draft(draft: HatDraft) -> Self {
        Self {
            draft,
            committed: None,
        }
    }

    /// Returns the draft being edited.
    pub fn draft(&self) -> &HatDraft {
        &self.draft
    }

    /// The last committed snapshot, or `None` before the first commit.
    pub fn committed(&self) -> Option<&CommittedHat> {
        self.committed.as_ref()
    }

    /// Sets the draft color.
    pub fn set_color(&mut self, color: impl Into<ColorValue>) {
        self.draft.color = color.into();
    }

    /// Sets the draft material label.
    pub fn set_material(&mut self, material: impl Into<String>) {
        self.draft.material = material.into();
    }

    /// Sets the draft style label.
    pub fn set_style(&mut self, style: impl Into<String>) {
        self.draft.style = style.into();
    }

    /// Sets the draft free-text label.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.draft.text = text.into();
    }

    /// Snapshots the draft, replacing any previous commit.
    pub fn commit(&mut self) -> &CommittedHat {
        debug!(
            color = %self.draft.color,
            style = %self.draft.style,
            "committing hat configuration"
        );
        self.committed.insert(CommittedHat::snapshot(&self.draft))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_with_picker_default_and_nothing_committed() {
        let config = HatConfiguration::new();
        assert_eq!(config.draft().color.as_str(), "#d48fa7");
        assert!(config.draft().material.is_empty());
        assert!(config.draft().style.is_empty());
        assert!(config.draft().text.is_empty());
        assert!(config.committed().is_none());
    }

    #[test]
    fn setters_only_touch_the_draft() {
        let mut config = HatConfiguration::new();
        config.set_color("#000000");
        config.set_material("wool");
        config.set_style("Fedora");
        config.set_text("Doggo Vibes");

        assert!(config.committed().is_none());
        assert_eq!(config.draft().material, "wool");
        assert_eq!(config.draft().style, "Fedora");
    }

    #[test]
    fn commit_snapshots_the_draft() {
        let mut config = HatConfiguration::new();
        config.set_style("bucket");
        config.set_text("hi");
        let committed = config.commit().clone();

        assert_eq!(committed.style(), "bucket");
        assert_eq!(committed.text(), "hi");

        // Later edits do not leak into the snapshot.
        config.set_style("fedora");
        assert_eq!(config.committed().unwrap().style(), "bucket");
    }

    #[test]
    fn commit_replaces_previous_snapshot() {
        let mut config = HatConfiguration::new();
        config.set_material("cotton");
        config.commit();
        config.set_material("");
        config.commit();

        assert_eq!(config.committed().unwrap().material(), "");
    }

    #[test]
    fn arbitrary_strings_are_accepted() {
        let mut config = HatConfiguration::with_draft(HatDraft {
            color: ColorValue::new("???"),
            material: "\u{1F9F6}".into(),
            style: "".into(),
            text: "   ".into(),
        });
        let committed = config.commit();
        assert_eq!(committed.color().as_str(), "???");
        assert_eq!(committed.text(), "   ");
    }
}
