// SPDX-License-Identifier: MIT OR Apache-2.0
//! Clips (strips): time-bounded references to an animation source.

use crate::source::SourceId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a clip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClipId(pub Uuid);

impl ClipId {
    /// Create a new random clip ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ClipId {
    fn default() -> Self {
        Self::new()
    }
}

/// How a clip's values combine with the layers evaluated before it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(Default)]
pub enum BlendMode {
    /// Overwrite the accumulated value
    #[default]
    Replace,
    /// Layer on top relative to the property default
    Combine,
    /// Add to the accumulated value
    Add,
    /// Subtract from the accumulated value
    Subtract,
    /// Multiply the accumulated value
    Multiply,
}

impl BlendMode {
    /// Get the display name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Replace => "Replace",
            Self::Combine => "Combine",
            Self::Add => "Add",
            Self::Subtract => "Subtract",
            Self::Multiply => "Multiply",
        }
    }

    /// Blend `value` onto `lower`; `default` is the property's rest value
    pub fn blend(&self, lower: f32, value: f32, default: f32) -> f32 {
        match self {
            Self::Replace => value,
            Self::Combine => lower + (value - default),
            Self::Add => lower + value,
            Self::Subtract => lower - value,
            Self::Multiply => lower * value,
        }
    }
}

/// A clip placed on a track
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Clip {
    /// Unique clip ID
    pub id: ClipId,
    /// Clip name
    pub name: String,
    /// First frame covered
    pub start: f32,
    /// End frame (exclusive)
    pub end: f32,
    /// Blend mode
    pub blend_mode: BlendMode,
    /// Whether the clip is selected in the host
    pub selected: bool,
    /// Whether the clip is muted
    pub muted: bool,
    /// Referenced animation source
    pub source: Option<SourceId>,
    /// Source frame shown at `start`
    pub source_start: f32,
}

impl Clip {
    /// Create a new clip over `[start, end)`; the source is read in place
    pub fn new(name: impl Into<String>, start: f32, end: f32) -> Self {
        Self {
            id: ClipId::new(),
            name: name.into(),
            start,
            end,
            blend_mode: BlendMode::Replace,
            selected: false,
            muted: false,
            source: None,
            source_start: start,
        }
    }

    /// Set the animation source
    pub fn with_source(mut self, source: SourceId) -> Self {
        self.source = Some(source);
        self
    }

    /// Set the source frame shown at the clip start
    pub fn with_source_start(mut self, source_start: f32) -> Self {
        self.source_start = source_start;
        self
    }

    /// Set blend mode
    pub fn with_blend_mode(mut self, mode: BlendMode) -> Self {
        self.blend_mode = mode;
        self
    }

    /// Mark as selected
    pub fn selected(mut self) -> Self {
        self.selected = true;
        self
    }

    /// Whether the clip covers `frame`
    pub fn contains(&self, frame: f32) -> bool {
        frame >= self.start && frame < self.end
    }

    /// Whether two clips share any frame
    pub fn overlaps(&self, other: &Clip) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Map an actor frame to the source's frame
    pub fn source_frame(&self, frame: f32) -> f32 {
        frame - self.start + self.source_start
    }
}
