//! Game Content Dataset
//!
//! The content boundary: themes (target names + matching decoys + signal
//! posts), filler posts for the background feed, and the flat noise pools.
//! Authored upstream by the spreadsheet import pipeline; this module only
//! validates the compiled form and refuses malformed sets at load time, so
//! round generation never has to filter per-round.

mod builtin;

use std::path::Path;

use serde::{Deserialize, Serialize};

/// A short narrative post naming (directly or by theme keyword) the target.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalPost {
    /// Post body. Must end up referencing the theme keyword or target name;
    /// the generator appends a keyword suffix when it does not.
    pub text: String,
    /// Display name of the author.
    pub author: String,
    /// Author handle, e.g. `@degen_alpha`.
    pub handle: String,
    /// Relative age label, e.g. `2m`.
    pub age: String,
}

/// A decorative background post with no gameplay meaning.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FillerPost {
    /// Post body.
    pub text: String,
    /// Display name of the author.
    pub author: String,
    /// Author handle.
    pub handle: String,
    /// Relative age label.
    pub age: String,
}

/// One thematically grouped family: a target identity, decoys that stay in
/// the same narrative register, and the posts that can announce the target.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Theme {
    /// Theme keyword, used for signal-post alignment.
    pub keyword: String,
    /// The target's visual marker (emoji).
    pub marker: String,
    /// Target names: `names[0]` is the display name, `names[1]` (when
    /// present) the ticker. Requires at least one entry.
    pub names: Vec<String>,
    /// Decoy names drawn from the same family.
    pub decoys: Vec<String>,
    /// Marker variants assigned to decoys.
    pub decoy_markers: Vec<String>,
    /// Candidate signal posts for this theme.
    pub posts: Vec<SignalPost>,
}

impl Theme {
    /// Display name of the target.
    pub fn display_name(&self) -> &str {
        &self.names[0]
    }

    /// Ticker of the target. Falls back to the display name.
    pub fn ticker(&self) -> &str {
        self.names.get(1).unwrap_or(&self.names[0])
    }
}

/// The full validated dataset consumed by the round generator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentSet {
    /// Theme families. At least one.
    pub themes: Vec<Theme>,
    /// Background filler posts. At least one.
    pub fillers: Vec<FillerPost>,
    /// Ticker-like strings for noise items and decoy fallback.
    pub noise_tickers: Vec<String>,
    /// Marker glyphs for noise items.
    pub noise_markers: Vec<String>,
}

/// Content loading/validation errors. All fatal: a malformed dataset never
/// reaches the generator.
#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    /// Failed to read the dataset file.
    #[error("failed to read content file: {0}")]
    Io(#[from] std::io::Error),

    /// Dataset is not valid JSON.
    #[error("failed to parse content file: {0}")]
    Parse(#[from] serde_json::Error),

    /// No themes present.
    #[error("content set has no themes")]
    NoThemes,

    /// A theme is missing a required field.
    #[error("theme {index} ({keyword:?}) is malformed: {reason}")]
    MalformedTheme {
        /// Index of the offending theme.
        index: usize,
        /// Theme keyword, for the error message.
        keyword: String,
        /// What is missing.
        reason: &'static str,
    },

    /// No filler posts present.
    #[error("content set has no filler posts")]
    NoFillers,

    /// A noise pool is empty.
    #[error("content set has an empty noise pool: {0}")]
    EmptyNoisePool(&'static str),
}

impl ContentSet {
    /// Load and validate a dataset from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ContentError> {
        let raw = std::fs::read_to_string(path)?;
        let set: ContentSet = serde_json::from_str(&raw)?;
        set.validate()?;
        Ok(set)
    }

    /// The compiled-in default dataset, used when no content file is given.
    pub fn builtin() -> Self {
        let set = builtin::content_set();
        debug_assert!(set.validate().is_ok());
        set
    }

    /// Validate the whole set. Fail fast: the first defect aborts the load.
    pub fn validate(&self) -> Result<(), ContentError> {
        if self.themes.is_empty() {
            return Err(ContentError::NoThemes);
        }
        for (index, theme) in self.themes.iter().enumerate() {
            let malformed = |reason| ContentError::MalformedTheme {
                index,
                keyword: theme.keyword.clone(),
                reason,
            };
            if theme.keyword.trim().is_empty() {
                return Err(malformed("empty keyword"));
            }
            if theme.marker.trim().is_empty() {
                return Err(malformed("empty marker"));
            }
            if theme.names.iter().all(|n| n.trim().is_empty()) {
                return Err(malformed("no target name"));
            }
            if theme.decoys.iter().all(|d| d.trim().is_empty()) {
                return Err(malformed("no decoys"));
            }
            if theme.decoy_markers.iter().all(|m| m.trim().is_empty()) {
                return Err(malformed("no decoy markers"));
            }
            if theme.posts.iter().all(|p| p.text.trim().is_empty()) {
                return Err(malformed("no signal posts"));
            }
        }
        if self.fillers.is_empty() {
            return Err(ContentError::NoFillers);
        }
        if self.noise_tickers.is_empty() {
            return Err(ContentError::EmptyNoisePool("noise_tickers"));
        }
        if self.noise_markers.is_empty() {
            return Err(ContentError::EmptyNoisePool("noise_markers"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_is_valid() {
        let set = ContentSet::builtin();
        assert!(set.validate().is_ok());
        assert!(!set.themes.is_empty());
    }

    #[test]
    fn test_empty_themes_rejected() {
        let mut set = ContentSet::builtin();
        set.themes.clear();
        assert!(matches!(set.validate(), Err(ContentError::NoThemes)));
    }

    #[test]
    fn test_theme_without_decoys_rejected() {
        let mut set = ContentSet::builtin();
        set.themes[0].decoys.clear();
        assert!(matches!(
            set.validate(),
            Err(ContentError::MalformedTheme { index: 0, .. })
        ));
    }

    #[test]
    fn test_theme_without_posts_rejected() {
        let mut set = ContentSet::builtin();
        set.themes[1].posts.clear();
        assert!(matches!(
            set.validate(),
            Err(ContentError::MalformedTheme { index: 1, .. })
        ));
    }

    #[test]
    fn test_empty_noise_pool_rejected() {
        let mut set = ContentSet::builtin();
        set.noise_markers.clear();
        assert!(matches!(
            set.validate(),
            Err(ContentError::EmptyNoisePool("noise_markers"))
        ));
    }

    #[test]
    fn test_json_round_trip() {
        let set = ContentSet::builtin();
        let json = serde_json::to_string(&set).unwrap();
        let back: ContentSet = serde_json::from_str(&json).unwrap();
        assert_eq!(set, back);
    }

    #[test]
    fn test_ticker_falls_back_to_display_name() {
        let theme = Theme {
            keyword: "dog".into(),
            marker: "🐕".into(),
            names: vec!["Dogwifcoin".into()],
            decoys: vec!["DOGE2".into()],
            decoy_markers: vec!["🦴".into()],
            posts: vec![SignalPost {
                text: "dog szn".into(),
                author: "Degen".into(),
                handle: "@degen_alpha".into(),
                age: "1m".into(),
            }],
        };
        assert_eq!(theme.ticker(), "Dogwifcoin");
        assert_eq!(theme.display_name(), "Dogwifcoin");
    }
}
