// SPDX-License-Identifier: MIT OR Apache-2.0
//! Animation channels: one scalar component of an animatable property.

use crate::keyframe::{Extrapolation, Interpolation, Keyframe};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies one scalar component of a property.
///
/// Ordering is by path, then component index.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ChannelKey {
    /// Property path (e.g. `location`, `pose.bones["Arm"].rotation_euler`)
    pub path: String,
    /// Component index (0 for scalar properties)
    pub index: usize,
}

impl ChannelKey {
    /// Create a channel key
    pub fn new(path: impl Into<String>, index: usize) -> Self {
        Self {
            path: path.into(),
            index,
        }
    }
}

impl fmt::Display for ChannelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.path, self.index)
    }
}

/// A keyframed curve driving one [`ChannelKey`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Channel {
    /// Animated component
    pub key: ChannelKey,
    /// Keyframes sorted by frame, at most one per frame
    keyframes: Vec<Keyframe>,
    /// Behaviour outside the keyed range
    pub extrapolation: Extrapolation,
}

impl Channel {
    /// Create an empty channel
    pub fn new(key: ChannelKey) -> Self {
        Self {
            key,
            keyframes: Vec::new(),
            extrapolation: Extrapolation::Constant,
        }
    }

    /// Builder: add a keyframe
    pub fn with_keyframe(mut self, keyframe: Keyframe) -> Self {
        self.insert(keyframe);
        self
    }

    /// Insert a keyframe, replacing any existing keyframe on the same frame
    pub fn insert(&mut self, keyframe: Keyframe) {
        match self.keyframes.binary_search_by_key(&keyframe.frame, |k| k.frame) {
            Ok(idx) => self.keyframes[idx] = keyframe,
            Err(idx) => self.keyframes.insert(idx, keyframe),
        }
    }

    /// Get all keyframes
    pub fn keyframes(&self) -> &[Keyframe] {
        &self.keyframes
    }

    /// Get keyframe at an exact frame
    pub fn keyframe_at(&self, frame: i32) -> Option<&Keyframe> {
        self.keyframes
            .binary_search_by_key(&frame, |k| k.frame)
            .ok()
            .map(|idx| &self.keyframes[idx])
    }

    /// Sort deserialized keyframes; returns the first frame keyed twice
    pub(crate) fn normalize(&mut self) -> Option<i32> {
        self.keyframes.sort_by_key(|k| k.frame);
        self.keyframes
            .windows(2)
            .find(|pair| pair[0].frame == pair[1].frame)
            .map(|pair| pair[0].frame)
    }

    /// Evaluate the curve at a (possibly fractional) frame
    pub fn evaluate(&self, frame: f32) -> Option<f32> {
        let first = self.keyframes.first()?;
        let last = self.keyframes.last()?;

        if frame <= first.frame as f32 {
            return Some(self.extrapolate(first, self.keyframes.get(1), frame));
        }
        if frame >= last.frame as f32 {
            let before = self.keyframes.len().checked_sub(2).map(|i| &self.keyframes[i]);
            return Some(self.extrapolate(last, before, frame));
        }

        // First keyframe strictly after `frame`; both bounds checks above
        // guarantee 0 < next < len.
        let next = self.keyframes.partition_point(|k| k.frame as f32 <= frame);
        let a = &self.keyframes[next - 1];
        let b = &self.keyframes[next];
        let t = (frame - a.frame as f32) / (b.frame - a.frame) as f32;
        Some(Interpolation::segment(a, b, t))
    }

    fn extrapolate(&self, edge: &Keyframe, neighbour: Option<&Keyframe>, frame: f32) -> f32 {
        match (self.extrapolation, neighbour) {
            (Extrapolation::Linear, Some(n)) if n.frame != edge.frame => {
                let slope = (n.value - edge.value) / (n.frame - edge.frame) as f32;
                edge.value + slope * (frame - edge.frame as f32)
            }
            _ => edge.value,
        }
    }
}
