// SPDX-License-Identifier: MIT OR Apache-2.0
//! Merge settings.
//!
//! Settings select the merge strategy and the policy variants for
//! channel-less clips and vector properties. They load from RON files:
//!
//! ```ron
//! (
//!     strategy: Resample,
//!     empty_sources: Participate,
//!     expand_vector_components: false,
//!     output_name: "Merged",
//!     min_clips: 2,
//! )
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Smallest selection a merge accepts
pub const MIN_MERGE_CLIPS: usize = 2;

/// Default name of the new source, track and clip
pub const DEFAULT_OUTPUT_NAME: &str = "Merged";

/// Settings file errors
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// Reading or writing the file failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization failed
    #[error("Serialization error: {0}")]
    Serialize(#[from] ron::Error),

    /// Parsing failed
    #[error("Parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),
}

/// How selected clips become one clip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum MergeStrategy {
    /// Sample the layered result at every frame and re-key it
    #[default]
    Resample,
    /// Copy keyframes clip after clip with a running time offset
    Concatenate,
}

impl MergeStrategy {
    /// Get the display name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Resample => "Resample",
            Self::Concatenate => "Concatenate",
        }
    }
}

/// What to do with selected clips that animate nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum EmptySourcePolicy {
    /// Still widen the range, vote on the blend mode and count as eligible
    #[default]
    Participate,
    /// Leave them out of the merge entirely
    Skip,
}

/// Merge configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeSettings {
    /// Merge strategy
    pub strategy: MergeStrategy,
    /// Policy for channel-less clips
    pub empty_sources: EmptySourcePolicy,
    /// Bake every component of a vector property once any one is animated
    pub expand_vector_components: bool,
    /// Name of the new source, track and clip
    pub output_name: String,
    /// Minimum number of eligible clips
    pub min_clips: usize,
}

impl Default for MergeSettings {
    fn default() -> Self {
        Self {
            strategy: MergeStrategy::Resample,
            empty_sources: EmptySourcePolicy::Participate,
            expand_vector_components: false,
            output_name: DEFAULT_OUTPUT_NAME.to_string(),
            min_clips: MIN_MERGE_CLIPS,
        }
    }
}

impl MergeSettings {
    /// Minimum clip count, never below [`MIN_MERGE_CLIPS`]
    pub fn required_clips(&self) -> usize {
        self.min_clips.max(MIN_MERGE_CLIPS)
    }

    /// Output name, falling back to the default when blank
    pub fn output_name(&self) -> &str {
        let name = self.output_name.trim();
        if name.is_empty() {
            DEFAULT_OUTPUT_NAME
        } else {
            name
        }
    }

    /// Serialize to RON format
    pub fn to_ron(&self) -> Result<String, ron::Error> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
    }

    /// Deserialize from RON format
    pub fn from_ron(s: &str) -> Result<Self, ron::error::SpannedError> {
        ron::from_str(s)
    }

    /// Save settings to a file
    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        let ron_str = self.to_ron()?;
        std::fs::write(path, ron_str)?;
        Ok(())
    }

    /// Load settings from a file
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let contents = std::fs::read_to_string(path)?;
        let settings = Self::from_ron(&contents)?;
        tracing::debug!("Loaded merge settings from {}", path.display());
        Ok(settings)
    }
}
