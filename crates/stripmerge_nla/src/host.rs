// SPDX-License-Identifier: MIT OR Apache-2.0
//! Host collaborator interface.
//!
//! The merge engine never touches an object model directly. It reads,
//! evaluates and writes through [`NlaHost`], which a host editor implements
//! for one animated actor. [`crate::Actor`] is the in-memory implementation.

use crate::channel::ChannelKey;
use crate::clip::{BlendMode, ClipId};
use crate::keyframe::{Extrapolation, Keyframe};
use crate::source::SourceId;
use crate::track::TrackId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Half-open integer frame interval `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameRange {
    /// First frame
    pub start: i32,
    /// One past the last frame
    pub end: i32,
}

impl FrameRange {
    /// Create a range
    pub fn new(start: i32, end: i32) -> Self {
        Self { start, end }
    }

    /// Number of frames
    pub fn len(&self) -> usize {
        usize::try_from(i64::from(self.end) - i64::from(self.start)).unwrap_or(0)
    }

    /// Whether the range holds no frame
    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Whether `frame` lies inside
    pub fn contains(&self, frame: i32) -> bool {
        frame >= self.start && frame < self.end
    }

    /// Iterate frames in order
    pub fn frames(&self) -> std::ops::Range<i32> {
        self.start..self.end
    }

    /// Smallest range covering both
    pub fn union(&self, other: &FrameRange) -> FrameRange {
        FrameRange::new(self.start.min(other.start), self.end.max(other.end))
    }
}

impl fmt::Display for FrameRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// Snapshot of a clip's properties
#[derive(Debug, Clone, PartialEq)]
pub struct ClipInfo {
    /// Clip ID
    pub id: ClipId,
    /// Clip name
    pub name: String,
    /// First frame covered
    pub start: f32,
    /// End frame (exclusive)
    pub end: f32,
    /// Blend mode
    pub blend_mode: BlendMode,
    /// Selected in the host
    pub selected: bool,
    /// Muted
    pub muted: bool,
    /// Referenced source
    pub source: Option<SourceId>,
    /// Source frame shown at `start`
    pub source_start: f32,
}

/// A channel inside a specific source
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChannelRef {
    /// Owning source
    pub source: SourceId,
    /// Channel key
    pub key: ChannelKey,
}

/// Errors raised by a host
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum HostError {
    /// Track not found
    #[error("Track not found: {0:?}")]
    TrackNotFound(TrackId),

    /// Clip not found
    #[error("Clip not found: {0:?}")]
    ClipNotFound(ClipId),

    /// Source not found
    #[error("Animation source not found: {0:?}")]
    SourceNotFound(SourceId),

    /// Channel not found in a source
    #[error("Channel {key} not found in source {source_id:?}")]
    ChannelNotFound {
        /// Source searched
        source_id: SourceId,
        /// Missing channel
        key: ChannelKey,
    },

    /// Channel already exists in a source
    #[error("Channel {0} already exists")]
    DuplicateChannel(ChannelKey),

    /// Channel path rejected
    #[error("Invalid channel path: {0:?}")]
    InvalidChannelPath(String),

    /// Property unknown to the actor
    #[error("Unknown property: {0}")]
    UnknownProperty(String),

    /// Component index past the property's width
    #[error("Component {index} out of range for {path} (width {width})")]
    ComponentOutOfRange {
        /// Property path
        path: String,
        /// Requested component
        index: usize,
        /// Property width
        width: usize,
    },

    /// Value read before any evaluation
    #[error("Actor has not been evaluated")]
    NotEvaluated,

    /// Clip would overlap another clip on the same track
    #[error("Clip {clip:?} overlaps {other:?}")]
    ClipOverlap {
        /// Clip being added
        clip: String,
        /// Clip already on the track
        other: String,
    },

    /// Clip with `end <= start`
    #[error("Invalid clip range [{start}, {end})")]
    InvalidClipRange {
        /// Start frame
        start: f32,
        /// End frame
        end: f32,
    },
}

/// Read/evaluate/write access to one animated actor.
///
/// Implementations are driven by a single merge at a time; the engine takes
/// `&mut self` for every mutating call and never shares the host.
pub trait NlaHost {
    /// Tracks in evaluation order (index 0 first)
    fn list_tracks(&self) -> Vec<TrackId>;

    /// Clips of a track in order
    fn list_clips(&self, track: TrackId) -> Result<Vec<ClipId>, HostError>;

    /// Snapshot of a clip
    fn clip_info(&self, clip: ClipId) -> Result<ClipInfo, HostError>;

    /// Whether a track is muted
    fn track_muted(&self, track: TrackId) -> Result<bool, HostError>;

    /// Mute or unmute a track
    fn set_track_muted(&mut self, track: TrackId, muted: bool) -> Result<(), HostError>;

    /// Channels animated by a source
    fn source_channels(&self, source: SourceId) -> Result<Vec<ChannelKey>, HostError>;

    /// Keyframes of one channel of a source
    fn channel_keyframes(&self, source: SourceId, key: &ChannelKey) -> Result<Vec<Keyframe>, HostError>;

    /// Number of components of a property, `None` if the path is unknown
    fn property_width(&self, path: &str) -> Option<usize>;

    /// Frame the actor was last evaluated at
    fn current_frame(&self) -> i32;

    /// Evaluate all layers at `frame`
    fn evaluate(&mut self, frame: i32) -> Result<(), HostError>;

    /// Read an evaluated component
    fn read_channel(&self, path: &str, index: usize) -> Result<f32, HostError>;

    /// Create an empty source
    fn create_source(&mut self, name: &str) -> SourceId;

    /// Add an empty channel to a source
    fn add_channel(&mut self, source: SourceId, key: ChannelKey) -> Result<ChannelRef, HostError>;

    /// Insert (or replace) a keyframe
    fn insert_keyframe(&mut self, channel: &ChannelRef, keyframe: Keyframe) -> Result<(), HostError>;

    /// Set a channel's extrapolation
    fn set_extrapolation(&mut self, channel: &ChannelRef, mode: Extrapolation) -> Result<(), HostError>;

    /// Delete a source created by [`NlaHost::create_source`]
    fn remove_source(&mut self, source: SourceId) -> Result<(), HostError>;

    /// Create a track right after `after` (at the bottom when `None`)
    fn create_track(&mut self, after: Option<TrackId>, name: &str) -> Result<TrackId, HostError>;

    /// Create a clip spanning `range` that reads `source` in place
    fn create_clip(
        &mut self,
        track: TrackId,
        name: &str,
        range: FrameRange,
        source: SourceId,
    ) -> Result<ClipId, HostError>;

    /// Delete a track and its clips
    fn remove_track(&mut self, track: TrackId) -> Result<(), HostError>;

    /// Set a clip's blend mode
    fn set_blend_mode(&mut self, clip: ClipId, mode: BlendMode) -> Result<(), HostError>;

    /// Mute or unmute a clip
    fn set_clip_muted(&mut self, clip: ClipId, muted: bool) -> Result<(), HostError>;
}
