// SPDX-License-Identifier: MIT OR Apache-2.0
//! Actors: the animated entity owning tracks, sources and a property schema.
//!
//! [`Actor`] is the in-memory reference host. Its evaluator walks tracks in
//! ascending index order; every unmuted clip covering the frame blends its
//! channel values onto the accumulated pose with the clip's [`BlendMode`].
//! The pose starts from the property defaults.

use crate::channel::ChannelKey;
use crate::clip::{BlendMode, Clip, ClipId};
use crate::host::{ChannelRef, ClipInfo, FrameRange, HostError, NlaHost};
use crate::keyframe::{Extrapolation, Keyframe};
use crate::source::{AnimationSource, SourceId};
use crate::track::{Track, TrackId};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Scene file errors
#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    /// Reading or writing the file failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization failed
    #[error("Serialization error: {0}")]
    Serialize(#[from] ron::Error),

    /// Parsing failed
    #[error("Parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// A track's clips overlap or have an empty range
    #[error("Track '{track}': {cause}")]
    InvalidTrack {
        /// Track name
        track: String,
        /// Layout violation
        #[source]
        cause: HostError,
    },

    /// A source holds two channels for the same key
    #[error("Source '{source_name}' has more than one {key} channel")]
    DuplicateChannel {
        /// Source name
        source_name: String,
        /// Repeated key
        key: ChannelKey,
    },

    /// A channel holds two keyframes on the same frame
    #[error("Channel {key} has more than one keyframe on frame {frame}")]
    DuplicateKeyframe {
        /// Channel key
        key: ChannelKey,
        /// Repeated frame
        frame: i32,
    },
}

/// Evaluated property values at one frame
#[derive(Debug, Clone, Default)]
struct Pose {
    values: HashMap<String, Vec<f32>>,
}

/// An animated entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Actor {
    /// Actor name
    pub name: String,
    /// Animatable properties and their default values (length = width)
    properties: IndexMap<String, Vec<f32>>,
    /// Tracks in evaluation order
    tracks: Vec<Track>,
    /// Animation sources
    sources: IndexMap<SourceId, AnimationSource>,
    /// Frame of the last evaluation
    #[serde(default)]
    current_frame: i32,
    #[serde(skip)]
    pose: Option<Pose>,
}

impl Actor {
    /// Create an actor with no properties
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: IndexMap::new(),
            tracks: Vec::new(),
            sources: IndexMap::new(),
            current_frame: 0,
            pose: None,
        }
    }

    /// Builder: declare an animatable property with its default values
    pub fn with_property(mut self, path: impl Into<String>, defaults: &[f32]) -> Self {
        self.properties.insert(path.into(), defaults.to_vec());
        self
    }

    /// Add a track on top of the stack
    pub fn add_track(&mut self, track: Track) -> TrackId {
        let id = track.id;
        self.tracks.push(track);
        id
    }

    /// Get a track
    pub fn track(&self, track_id: TrackId) -> Option<&Track> {
        self.tracks.iter().find(|t| t.id == track_id)
    }

    /// Get a mutable track
    pub fn track_mut(&mut self, track_id: TrackId) -> Option<&mut Track> {
        self.tracks.iter_mut().find(|t| t.id == track_id)
    }

    /// Position of a track in evaluation order
    pub fn track_index(&self, track_id: TrackId) -> Option<usize> {
        self.tracks.iter().position(|t| t.id == track_id)
    }

    /// Get all tracks
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// Get track count
    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    /// Add an animation source
    pub fn add_source(&mut self, source: AnimationSource) -> SourceId {
        let id = source.id;
        self.sources.insert(id, source);
        id
    }

    /// Get a source
    pub fn source(&self, source_id: SourceId) -> Option<&AnimationSource> {
        self.sources.get(&source_id)
    }

    /// Get all sources
    pub fn sources(&self) -> impl Iterator<Item = &AnimationSource> {
        self.sources.values()
    }

    /// Find a clip and its track
    pub fn clip(&self, clip_id: ClipId) -> Option<(&Track, &Clip)> {
        self.tracks
            .iter()
            .find_map(|t| t.clip(clip_id).map(|c| (t, c)))
    }

    /// Find a mutable clip
    pub fn clip_mut(&mut self, clip_id: ClipId) -> Option<&mut Clip> {
        self.tracks.iter_mut().find_map(|t| t.clip_mut(clip_id))
    }

    /// All selected clips in scan order
    pub fn selected_clips(&self) -> impl Iterator<Item = &Clip> {
        self.tracks
            .iter()
            .flat_map(|t| t.clips().iter())
            .filter(|c| c.selected)
    }

    /// Evaluated value of a property component at a frame, without touching
    /// the actor's current evaluation state
    pub fn sample(&self, key: &ChannelKey, frame: i32) -> Option<f32> {
        self.compute_pose(frame)
            .values
            .get(&key.path)
            .and_then(|v| v.get(key.index))
            .copied()
    }

    fn compute_pose(&self, frame: i32) -> Pose {
        let mut values: HashMap<String, Vec<f32>> = self
            .properties
            .iter()
            .map(|(path, defaults)| (path.clone(), defaults.clone()))
            .collect();
        let time = frame as f32;

        for track in self.tracks.iter().filter(|t| !t.muted) {
            let Some(clip) = track.clip_at(time) else {
                continue;
            };
            if clip.muted {
                continue;
            }
            let Some(source) = clip.source.and_then(|id| self.sources.get(&id)) else {
                continue;
            };

            let local = clip.source_frame(time);
            for channel in source.channels() {
                let Some(value) = channel.evaluate(local) else {
                    continue;
                };
                let Some(defaults) = self.properties.get(&channel.key.path) else {
                    continue;
                };
                let (Some(&default), Some(slot)) = (
                    defaults.get(channel.key.index),
                    values
                        .get_mut(&channel.key.path)
                        .and_then(|v| v.get_mut(channel.key.index)),
                ) else {
                    continue;
                };
                *slot = clip.blend_mode.blend(*slot, value, default);
            }
        }

        Pose { values }
    }

    /// Serialize to RON format
    pub fn to_ron(&self) -> Result<String, ron::Error> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
    }

    /// Deserialize from RON format, sorting keyframes and clips and
    /// rejecting layouts the editing operations could never produce
    pub fn from_ron(s: &str) -> Result<Self, SceneError> {
        let mut actor: Self = ron::from_str(s)?;
        actor.normalize()?;
        Ok(actor)
    }

    fn normalize(&mut self) -> Result<(), SceneError> {
        for track in &mut self.tracks {
            track.normalize().map_err(|cause| SceneError::InvalidTrack {
                track: track.name.clone(),
                cause,
            })?;
        }
        for source in self.sources.values_mut() {
            source.normalize()?;
        }
        Ok(())
    }

    /// Save the actor to a scene file
    pub fn save(&self, path: &Path) -> Result<(), SceneError> {
        let ron_str = self.to_ron()?;
        std::fs::write(path, ron_str)?;
        Ok(())
    }

    /// Load an actor from a scene file
    pub fn load(path: &Path) -> Result<Self, SceneError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_ron(&contents)
    }

    fn source_mut(&mut self, source_id: SourceId) -> Result<&mut AnimationSource, HostError> {
        self.sources
            .get_mut(&source_id)
            .ok_or(HostError::SourceNotFound(source_id))
    }

    fn existing_clip_mut(&mut self, clip_id: ClipId) -> Result<&mut Clip, HostError> {
        self.clip_mut(clip_id).ok_or(HostError::ClipNotFound(clip_id))
    }
}

impl Default for Actor {
    fn default() -> Self {
        Self::new("Actor")
    }
}

impl NlaHost for Actor {
    fn list_tracks(&self) -> Vec<TrackId> {
        self.tracks.iter().map(|t| t.id).collect()
    }

    fn list_clips(&self, track: TrackId) -> Result<Vec<ClipId>, HostError> {
        let track = self.track(track).ok_or(HostError::TrackNotFound(track))?;
        Ok(track.clips().iter().map(|c| c.id).collect())
    }

    fn clip_info(&self, clip: ClipId) -> Result<ClipInfo, HostError> {
        let (_, clip) = self.clip(clip).ok_or(HostError::ClipNotFound(clip))?;
        Ok(ClipInfo {
            id: clip.id,
            name: clip.name.clone(),
            start: clip.start,
            end: clip.end,
            blend_mode: clip.blend_mode,
            selected: clip.selected,
            muted: clip.muted,
            source: clip.source,
            source_start: clip.source_start,
        })
    }

    fn track_muted(&self, track: TrackId) -> Result<bool, HostError> {
        self.track(track)
            .map(|t| t.muted)
            .ok_or(HostError::TrackNotFound(track))
    }

    fn set_track_muted(&mut self, track: TrackId, muted: bool) -> Result<(), HostError> {
        let track = self.track_mut(track).ok_or(HostError::TrackNotFound(track))?;
        track.muted = muted;
        Ok(())
    }

    fn source_channels(&self, source: SourceId) -> Result<Vec<ChannelKey>, HostError> {
        let source = self.source(source).ok_or(HostError::SourceNotFound(source))?;
        Ok(source.channels().iter().map(|c| c.key.clone()).collect())
    }

    fn channel_keyframes(&self, source: SourceId, key: &ChannelKey) -> Result<Vec<Keyframe>, HostError> {
        let channel = self
            .source(source)
            .ok_or(HostError::SourceNotFound(source))?
            .channel(key)
            .ok_or_else(|| HostError::ChannelNotFound {
                source_id: source,
                key: key.clone(),
            })?;
        Ok(channel.keyframes().to_vec())
    }

    fn property_width(&self, path: &str) -> Option<usize> {
        self.properties.get(path).map(Vec::len)
    }

    fn current_frame(&self) -> i32 {
        self.current_frame
    }

    fn evaluate(&mut self, frame: i32) -> Result<(), HostError> {
        self.pose = Some(self.compute_pose(frame));
        self.current_frame = frame;
        Ok(())
    }

    fn read_channel(&self, path: &str, index: usize) -> Result<f32, HostError> {
        let width = self
            .property_width(path)
            .ok_or_else(|| HostError::UnknownProperty(path.to_string()))?;
        if index >= width {
            return Err(HostError::ComponentOutOfRange {
                path: path.to_string(),
                index,
                width,
            });
        }
        let pose = self.pose.as_ref().ok_or(HostError::NotEvaluated)?;
        pose.values
            .get(path)
            .and_then(|v| v.get(index))
            .copied()
            .ok_or_else(|| HostError::UnknownProperty(path.to_string()))
    }

    fn create_source(&mut self, name: &str) -> SourceId {
        self.add_source(AnimationSource::new(name))
    }

    fn add_channel(&mut self, source: SourceId, key: ChannelKey) -> Result<ChannelRef, HostError> {
        if key.path.trim().is_empty() {
            return Err(HostError::InvalidChannelPath(key.path));
        }
        let target = self.source_mut(source)?;
        if !target.add_channel(key.clone()) {
            return Err(HostError::DuplicateChannel(key));
        }
        Ok(ChannelRef { source, key })
    }

    fn insert_keyframe(&mut self, channel: &ChannelRef, keyframe: Keyframe) -> Result<(), HostError> {
        let source = self.source_mut(channel.source)?;
        let target = source
            .channel_mut(&channel.key)
            .ok_or_else(|| HostError::ChannelNotFound {
                source_id: channel.source,
                key: channel.key.clone(),
            })?;
        target.insert(keyframe);
        Ok(())
    }

    fn set_extrapolation(&mut self, channel: &ChannelRef, mode: Extrapolation) -> Result<(), HostError> {
        let source = self.source_mut(channel.source)?;
        let target = source
            .channel_mut(&channel.key)
            .ok_or_else(|| HostError::ChannelNotFound {
                source_id: channel.source,
                key: channel.key.clone(),
            })?;
        target.extrapolation = mode;
        Ok(())
    }

    fn remove_source(&mut self, source: SourceId) -> Result<(), HostError> {
        self.sources
            .shift_remove(&source)
            .map(|_| ())
            .ok_or(HostError::SourceNotFound(source))
    }

    fn create_track(&mut self, after: Option<TrackId>, name: &str) -> Result<TrackId, HostError> {
        let idx = match after {
            Some(after) => self.track_index(after).ok_or(HostError::TrackNotFound(after))? + 1,
            None => 0,
        };
        let track = Track::new(name);
        let id = track.id;
        self.tracks.insert(idx, track);
        Ok(id)
    }

    fn create_clip(
        &mut self,
        track: TrackId,
        name: &str,
        range: FrameRange,
        source: SourceId,
    ) -> Result<ClipId, HostError> {
        if !self.sources.contains_key(&source) {
            return Err(HostError::SourceNotFound(source));
        }
        let target = self.track_mut(track).ok_or(HostError::TrackNotFound(track))?;
        let clip = Clip::new(name, range.start as f32, range.end as f32).with_source(source);
        target.add_clip(clip)
    }

    fn remove_track(&mut self, track: TrackId) -> Result<(), HostError> {
        let idx = self.track_index(track).ok_or(HostError::TrackNotFound(track))?;
        self.tracks.remove(idx);
        Ok(())
    }

    fn set_blend_mode(&mut self, clip: ClipId, mode: BlendMode) -> Result<(), HostError> {
        self.existing_clip_mut(clip)?.blend_mode = mode;
        Ok(())
    }

    fn set_clip_muted(&mut self, clip: ClipId, muted: bool) -> Result<(), HostError> {
        self.existing_clip_mut(clip)?.muted = muted;
        Ok(())
    }
}
