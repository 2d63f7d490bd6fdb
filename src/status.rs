//! Status classification - decides whether `git status` output warrants a commit.

/// Markers covering unstaged modifications and untracked files in git's
/// human-readable status output.
pub const DEFAULT_CHANGE_MARKERS: [&str; 2] =
    ["Changes not staged for commit", "Untracked files"];

/// Decides from status text whether uncommitted work exists.
///
/// Markers are matched as case-sensitive substrings. A wording change in
/// the underlying status output breaks the match, which is why the marker
/// set comes from configuration instead of being baked in here.
#[derive(Debug, Clone)]
pub struct StatusClassifier {
    markers: Vec<String>,
}

impl StatusClassifier {
    pub fn new(markers: Vec<String>) -> Self {
        Self { markers }
    }

    /// True if any configured marker occurs in the status text.
    pub fn needs_commit(&self, status_text: &str) -> bool {
        self.markers
            .iter()
            .any(|marker| status_text.contains(marker.as_str()))
    }
}

impl Default for StatusClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_CHANGE_MARKERS.iter().map(|m| m.to_string()).collect())
    }
}
