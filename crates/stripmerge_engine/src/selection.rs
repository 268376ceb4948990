// SPDX-License-Identifier: MIT OR Apache-2.0
//! Gathering the selected clips from a host.

use crate::settings::EmptySourcePolicy;
use stripmerge_nla::{ClipInfo, HostError, NlaHost, TrackId};

/// A selected clip with its track position
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedClip {
    /// Owning track
    pub track: TrackId,
    /// Index of the owning track in evaluation order
    pub track_index: usize,
    /// Clip snapshot
    pub clip: ClipInfo,
    /// Whether the clip's source has at least one channel
    pub animated: bool,
}

/// Selected clips in scan order (track index, then clip order)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    clips: Vec<SelectedClip>,
}

impl Selection {
    /// Scan every track of the host for selected clips
    pub fn gather<H: NlaHost + ?Sized>(host: &H) -> Result<Self, HostError> {
        let mut clips = Vec::new();
        for (track_index, track) in host.list_tracks().into_iter().enumerate() {
            for clip_id in host.list_clips(track)? {
                let clip = host.clip_info(clip_id)?;
                if !clip.selected {
                    continue;
                }
                let animated = match clip.source {
                    Some(source) => match host.source_channels(source) {
                        Ok(channels) => !channels.is_empty(),
                        Err(e) => {
                            tracing::warn!("Clip '{}' has an unreadable source: {}", clip.name, e);
                            false
                        }
                    },
                    None => false,
                };
                clips.push(SelectedClip {
                    track,
                    track_index,
                    clip,
                    animated,
                });
            }
        }
        Ok(Self::from_clips(clips))
    }

    /// Build from already gathered clips
    pub fn from_clips(clips: Vec<SelectedClip>) -> Self {
        Self { clips }
    }

    /// Clips taking part in the merge under `policy`
    pub fn eligible(&self, policy: EmptySourcePolicy) -> Selection {
        let clips = self
            .clips
            .iter()
            .filter(|c| match policy {
                EmptySourcePolicy::Participate => true,
                EmptySourcePolicy::Skip => c.animated,
            })
            .cloned()
            .collect();
        Self::from_clips(clips)
    }

    /// All clips
    pub fn clips(&self) -> &[SelectedClip] {
        &self.clips
    }

    /// Clip count
    pub fn len(&self) -> usize {
        self.clips.len()
    }

    /// Whether nothing is selected
    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    /// Distinct tracks holding a selected clip, in order
    pub fn tracks(&self) -> Vec<TrackId> {
        let mut tracks: Vec<TrackId> = Vec::new();
        for clip in &self.clips {
            if !tracks.contains(&clip.track) {
                tracks.push(clip.track);
            }
        }
        tracks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stripmerge_nla::{Actor, AnimationSource, Channel, ChannelKey, Clip, Keyframe, Track};

    #[test]
    fn test_gather_in_scan_order() {
        let mut actor = Actor::new("Cube").with_property("x", &[0.0]);
        let source = actor.add_source(
            AnimationSource::new("Walk")
                .with_channel(Channel::new(ChannelKey::new("x", 0)).with_keyframe(Keyframe::new(0, 1.0))),
        );
        actor.add_track(
            Track::new("T0")
                .with_clip(Clip::new("B", 10.0, 20.0).selected())
                .unwrap()
                .with_clip(Clip::new("A", 0.0, 5.0).with_source(source).selected())
                .unwrap(),
        );
        actor.add_track(Track::new("T1").with_clip(Clip::new("C", 0.0, 5.0)).unwrap());
        actor.add_track(Track::new("T2").with_clip(Clip::new("D", 0.0, 5.0).selected()).unwrap());

        let selection = Selection::gather(&actor).unwrap();
        let names: Vec<_> = selection.clips().iter().map(|c| c.clip.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B", "D"]);
        assert_eq!(selection.clips()[2].track_index, 2);
        assert!(selection.clips()[0].animated);
        assert!(!selection.clips()[1].animated);
        assert_eq!(selection.tracks().len(), 2);

        assert_eq!(selection.eligible(EmptySourcePolicy::Participate).len(), 3);
        assert_eq!(selection.eligible(EmptySourcePolicy::Skip).len(), 1);
    }
}
