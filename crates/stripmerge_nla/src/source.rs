// SPDX-License-Identifier: MIT OR Apache-2.0
//! Animation sources: named collections of channels referenced by clips.

use crate::actor::SceneError;
use crate::channel::{Channel, ChannelKey};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for an animation source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceId(pub Uuid);

impl SourceId {
    /// Create a new random source ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SourceId {
    fn default() -> Self {
        Self::new()
    }
}

/// A named collection of channels (an "action")
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnimationSource {
    /// Unique source ID
    pub id: SourceId,
    /// Source name
    pub name: String,
    /// Channels, at most one per key
    channels: Vec<Channel>,
}

impl AnimationSource {
    /// Create an empty source
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: SourceId::new(),
            name: name.into(),
            channels: Vec::new(),
        }
    }

    /// Builder: add a channel, replacing one with the same key
    pub fn with_channel(mut self, channel: Channel) -> Self {
        match self.channel_mut(&channel.key) {
            Some(existing) => *existing = channel,
            None => self.channels.push(channel),
        }
        self
    }

    /// Add an empty channel; returns `false` if the key already exists
    pub fn add_channel(&mut self, key: ChannelKey) -> bool {
        if self.channel(&key).is_some() {
            return false;
        }
        self.channels.push(Channel::new(key));
        true
    }

    /// Get a channel by key
    pub fn channel(&self, key: &ChannelKey) -> Option<&Channel> {
        self.channels.iter().find(|c| &c.key == key)
    }

    /// Get a mutable channel by key
    pub fn channel_mut(&mut self, key: &ChannelKey) -> Option<&mut Channel> {
        self.channels.iter_mut().find(|c| &c.key == key)
    }

    /// Get all channels
    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    /// Whether the source animates nothing
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Re-check deserialized channels: keyframes sorted, one channel per key
    pub(crate) fn normalize(&mut self) -> Result<(), SceneError> {
        for channel in &mut self.channels {
            if let Some(frame) = channel.normalize() {
                return Err(SceneError::DuplicateKeyframe {
                    key: channel.key.clone(),
                    frame,
                });
            }
        }
        let mut keys: Vec<&ChannelKey> = self.channels.iter().map(|c| &c.key).collect();
        keys.sort();
        if let Some(pair) = keys.windows(2).find(|pair| pair[0] == pair[1]) {
            return Err(SceneError::DuplicateChannel {
                source_name: self.name.clone(),
                key: pair[0].clone(),
            });
        }
        Ok(())
    }
}
