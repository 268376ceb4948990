// SPDX-License-Identifier: MIT OR Apache-2.0
//! Track definitions: precedence-ranked containers of clips.

use crate::clip::{Clip, ClipId};
use crate::host::HostError;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use uuid::Uuid;

/// Unique identifier for a track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrackId(pub Uuid);

impl TrackId {
    /// Create a new random track ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TrackId {
    fn default() -> Self {
        Self::new()
    }
}

/// A track of non-overlapping clips
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Track {
    /// Unique track ID
    pub id: TrackId,
    /// Track name
    pub name: String,
    /// Clips sorted by start frame
    clips: Vec<Clip>,
    /// Whether the track is muted
    pub muted: bool,
}

impl Track {
    /// Create a new track
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: TrackId::new(),
            name: name.into(),
            clips: Vec::new(),
            muted: false,
        }
    }

    /// Builder: add a clip
    pub fn with_clip(mut self, clip: Clip) -> Result<Self, HostError> {
        self.add_clip(clip)?;
        Ok(self)
    }

    /// Add a clip, keeping clips sorted and non-overlapping
    pub fn add_clip(&mut self, clip: Clip) -> Result<ClipId, HostError> {
        if clip.end.partial_cmp(&clip.start) != Some(Ordering::Greater) {
            return Err(HostError::InvalidClipRange {
                start: clip.start,
                end: clip.end,
            });
        }
        if let Some(other) = self.clips.iter().find(|c| c.overlaps(&clip)) {
            return Err(HostError::ClipOverlap {
                clip: clip.name,
                other: other.name.clone(),
            });
        }
        let id = clip.id;
        let idx = self.clips.partition_point(|c| c.start < clip.start);
        self.clips.insert(idx, clip);
        Ok(id)
    }

    /// Get a clip by ID
    pub fn clip(&self, clip_id: ClipId) -> Option<&Clip> {
        self.clips.iter().find(|c| c.id == clip_id)
    }

    /// Get a mutable clip by ID
    pub fn clip_mut(&mut self, clip_id: ClipId) -> Option<&mut Clip> {
        self.clips.iter_mut().find(|c| c.id == clip_id)
    }

    /// Get all clips
    pub fn clips(&self) -> &[Clip] {
        &self.clips
    }

    /// Get the clip covering a frame
    pub fn clip_at(&self, frame: f32) -> Option<&Clip> {
        self.clips.iter().find(|c| c.contains(frame))
    }

    /// Re-check a deserialized clip list: sorts by start and rejects
    /// overlapping or empty clips
    pub(crate) fn normalize(&mut self) -> Result<(), HostError> {
        for clip in std::mem::take(&mut self.clips) {
            self.add_clip(clip)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clips_sorted() {
        let mut track = Track::new("Base");
        track.add_clip(Clip::new("B", 20.0, 30.0)).unwrap();
        track.add_clip(Clip::new("A", 0.0, 10.0)).unwrap();
        assert_eq!(track.clips()[0].name, "A");
        assert_eq!(track.clip_at(25.0).map(|c| c.name.as_str()), Some("B"));
        assert!(track.clip_at(15.0).is_none());
    }

    #[test]
    fn test_overlap_rejected() {
        let mut track = Track::new("Base");
        track.add_clip(Clip::new("A", 0.0, 10.0)).unwrap();
        let err = track.add_clip(Clip::new("B", 5.0, 12.0)).unwrap_err();
        assert!(matches!(err, HostError::ClipOverlap { .. }));
        assert_eq!(track.clips().len(), 1);
    }

    #[test]
    fn test_invalid_range_rejected() {
        let mut track = Track::new("Base");
        let err = track.add_clip(Clip::new("A", 4.0, 4.0)).unwrap_err();
        assert!(matches!(err, HostError::InvalidClipRange { .. }));
    }

    #[test]
    fn test_normalize() {
        let mut track = Track::new("Base");
        track.clips = vec![Clip::new("B", 20.0, 30.0), Clip::new("A", 0.0, 10.0)];
        track.normalize().unwrap();
        assert_eq!(track.clips()[0].name, "A");

        track.clips.push(Clip::new("C", 25.0, 40.0));
        assert!(matches!(track.normalize(), Err(HostError::ClipOverlap { .. })));
    }
}
