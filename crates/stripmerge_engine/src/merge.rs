// SPDX-License-Identifier: MIT OR Apache-2.0
//! The merge entry point.

use crate::catalog::ChannelCatalog;
use crate::concat::concatenate;
use crate::error::{Result, ValidationError};
use crate::isolate::IsolationGuard;
use crate::progress::{ProgressReporter, ProgressTracker};
use crate::resolve::{resolve, Resolution};
use crate::sample::sample;
use crate::selection::Selection;
use crate::settings::{MergeSettings, MergeStrategy};
use crate::synthesize::{synthesize, Installation, Synthesized};
use serde::Serialize;
use stripmerge_nla::{BlendMode, ChannelKey, ClipId, FrameRange, NlaHost, SourceId, TrackId};

/// Outcome of a successful merge
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergeResult {
    /// Strategy that produced the clip
    pub strategy: MergeStrategy,
    /// New animation source
    pub source: SourceId,
    /// New track
    pub track: TrackId,
    /// New clip
    pub clip: ClipId,
    /// Frame range of the new clip
    pub range: FrameRange,
    /// Blend mode of the new clip
    pub mode: BlendMode,
    /// Channels keyed into the new source
    pub written: Vec<ChannelKey>,
    /// Channels the host refused to create
    pub skipped_channels: Vec<ChannelKey>,
    /// Keyframes inserted
    pub keyframes: usize,
    /// Original clips, now muted
    pub muted_clips: Vec<ClipId>,
    /// Tracks muted while sampling (all restored since)
    pub suppressed_tracks: Vec<TrackId>,
}

/// Merge every selected clip of `host` into one new clip.
///
/// The selection is validated before the host is touched. With
/// [`MergeStrategy::Resample`], competing tracks are muted while the layered
/// result is sampled, and their mute flags are restored whether the merge
/// succeeds, fails or is aborted.
pub fn merge_selected<H: NlaHost + ?Sized>(
    host: &mut H,
    settings: &MergeSettings,
    reporter: &mut dyn ProgressReporter,
) -> Result<MergeResult> {
    let selection = Selection::gather(host)?.eligible(settings.empty_sources);
    let required = settings.required_clips();
    if selection.len() < required {
        return Err(ValidationError::TooFewClips {
            found: selection.len(),
            required,
        }
        .into());
    }

    let resolution = resolve(&selection)?;
    let catalog = ChannelCatalog::build(host, &selection, settings.expand_vector_components);
    let install_as = Installation {
        name: settings.output_name().to_string(),
        after: host.list_tracks().get(resolution.track_max_index).copied(),
        mode: resolution.mode,
        originals: selection.clips().iter().map(|c| c.clip.id).collect(),
    };

    tracing::info!(
        "Merging {} clips over {} ({} channels, mode {}, strategy {})",
        selection.len(),
        resolution.range,
        catalog.len(),
        resolution.mode.name(),
        settings.strategy.name()
    );

    match settings.strategy {
        MergeStrategy::Resample => resample(host, &selection, &resolution, &catalog, &install_as, reporter),
        MergeStrategy::Concatenate => {
            let mut progress = ProgressTracker::new(reporter, selection.len());
            let out = concatenate(host, &selection, &resolution, &catalog, &install_as, &mut progress)?;
            Ok(MergeResult {
                strategy: MergeStrategy::Concatenate,
                source: out.source,
                track: out.installed.track,
                clip: out.installed.clip,
                range: out.range,
                mode: resolution.mode,
                written: out.written,
                skipped_channels: out.skipped,
                keyframes: out.keyframes,
                muted_clips: install_as.originals,
                suppressed_tracks: Vec::new(),
            })
        }
    }
}

fn resample<H: NlaHost + ?Sized>(
    host: &mut H,
    selection: &Selection,
    resolution: &Resolution,
    catalog: &ChannelCatalog,
    install_as: &Installation,
    reporter: &mut dyn ProgressReporter,
) -> Result<MergeResult> {
    let original_frame = host.current_frame();
    let baked = bake(host, selection, resolution, catalog, install_as, reporter);

    // Put the host back on its frame whether or not baking succeeded
    if let Err(e) = host.evaluate(original_frame) {
        tracing::warn!("Failed to re-evaluate frame {}: {}", original_frame, e);
        if baked.is_ok() {
            return Err(e.into());
        }
    }
    let (suppressed_tracks, out) = baked?;

    Ok(MergeResult {
        strategy: MergeStrategy::Resample,
        source: out.source,
        track: out.installed.track,
        clip: out.installed.clip,
        range: resolution.range,
        mode: resolution.mode,
        written: out.written,
        skipped_channels: out.skipped,
        keyframes: out.keyframes,
        muted_clips: install_as.originals.clone(),
        suppressed_tracks,
    })
}

/// Sample under isolation and synthesize; visibility is restored on return
fn bake<H: NlaHost + ?Sized>(
    host: &mut H,
    selection: &Selection,
    resolution: &Resolution,
    catalog: &ChannelCatalog,
    install_as: &Installation,
    reporter: &mut dyn ProgressReporter,
) -> Result<(Vec<TrackId>, Synthesized)> {
    // Sampling and synthesis each take one step per frame
    let mut progress = ProgressTracker::new(reporter, resolution.range.len().saturating_mul(2));

    let mut guard = IsolationGuard::acquire(
        host,
        &selection.tracks(),
        resolution.track_min_index,
        resolution.mode,
    )?;
    let suppressed = guard
        .saved()
        .map(|saved| saved.suppressed().to_vec())
        .unwrap_or_default();

    let table = sample(&mut *guard, resolution.range, catalog, &mut progress)?;
    let out = synthesize(&mut *guard, &table, catalog, install_as, &mut progress)?;
    guard.restore()?;
    Ok((suppressed, out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MergeError;
    use crate::progress::{NoProgress, ProgressControl};
    use crate::settings::EmptySourcePolicy;
    use stripmerge_nla::{
        Actor, AnimationSource, Channel, ChannelRef, Clip, ClipInfo, Extrapolation, HostError, Keyframe,
        Track,
    };

    fn x() -> ChannelKey {
        ChannelKey::new("x", 0)
    }

    fn constant(actor: &mut Actor, name: &str, value: f32) -> SourceId {
        actor.add_source(
            AnimationSource::new(name).with_channel(Channel::new(x()).with_keyframe(Keyframe::new(0, value))),
        )
    }

    fn clip_track(name: &str, clip: Clip) -> Track {
        Track::new(name).with_clip(clip).unwrap()
    }

    /// `[0,10)` x=1 and `[5,20)` x=2, both Combine and selected
    fn overlap_actor() -> Actor {
        let mut actor = Actor::new("Cube").with_property("x", &[0.0]);
        let one = constant(&mut actor, "One", 1.0);
        let two = constant(&mut actor, "Two", 2.0);
        actor.add_track(clip_track(
            "T0",
            Clip::new("A", 0.0, 10.0).with_source(one).with_blend_mode(BlendMode::Combine).selected(),
        ));
        actor.add_track(clip_track(
            "T1",
            Clip::new("B", 5.0, 20.0).with_source(two).with_blend_mode(BlendMode::Combine).selected(),
        ));
        actor
    }

    fn muted_flags(actor: &Actor) -> Vec<bool> {
        actor.tracks().iter().map(|t| t.muted).collect()
    }

    fn pose(actor: &Actor, frames: std::ops::Range<i32>) -> Vec<Option<f32>> {
        frames.map(|frame| actor.sample(&x(), frame)).collect()
    }

    #[test]
    fn test_overlapping_combine_clips() {
        let mut actor = overlap_actor();
        actor.evaluate(7).unwrap();
        let before = pose(&actor, -2..22);
        let originals: Vec<ClipId> = actor.selected_clips().map(|c| c.id).collect();

        let mut seen = Vec::new();
        let mut reporter = |p: u8| {
            seen.push(p);
            ProgressControl::Continue
        };
        let result = merge_selected(&mut actor, &MergeSettings::default(), &mut reporter).unwrap();

        assert_eq!(result.range, FrameRange::new(0, 20));
        assert_eq!(result.mode, BlendMode::Combine);
        assert_eq!(result.written, vec![x()]);
        assert_eq!(result.keyframes, 20);
        assert_eq!(result.muted_clips, originals);

        let channel = actor.source(result.source).unwrap().channel(&x()).unwrap();
        let frames: Vec<i32> = channel.keyframes().iter().map(|k| k.frame).collect();
        assert_eq!(frames, (0..20).collect::<Vec<_>>());
        assert_eq!(channel.keyframe_at(2).map(|k| k.value), Some(1.0));
        assert_eq!(channel.keyframe_at(7).map(|k| k.value), Some(3.0));
        assert_eq!(channel.keyframe_at(15).map(|k| k.value), Some(2.0));
        assert_eq!(channel.extrapolation, Extrapolation::Linear);

        // Visibility restored, originals muted, merged clip stacked on top
        assert_eq!(muted_flags(&actor), vec![false, false, false]);
        assert!(originals.iter().all(|id| actor.clip(*id).unwrap().1.muted));
        assert_eq!(actor.track_index(result.track), Some(2));
        assert_eq!(actor.current_frame(), 7);
        assert_eq!(pose(&actor, 0..20), before[2..22].to_vec());

        assert_eq!(seen.last(), Some(&100));
        assert!(seen.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_replace_keeps_lower_tracks() {
        let mut actor = Actor::new("Cube").with_property("x", &[0.0]);
        let one = constant(&mut actor, "One", 1.0);
        let five = constant(&mut actor, "Five", 5.0);
        let three = constant(&mut actor, "Three", 3.0);
        let hundred = constant(&mut actor, "Hundred", 100.0);
        actor.add_track(clip_track(
            "T0",
            Clip::new("Base", 0.0, 10.0).with_source(one).with_blend_mode(BlendMode::Combine).selected(),
        ));
        actor.add_track(clip_track(
            "T1",
            Clip::new("Offset", 0.0, 10.0).with_source(five).with_blend_mode(BlendMode::Add),
        ));
        actor.add_track(clip_track("T2", Clip::new("Pose", 0.0, 10.0).with_source(three).selected()));
        actor.add_track(clip_track(
            "T3",
            Clip::new("Layer", 0.0, 10.0).with_source(hundred).with_blend_mode(BlendMode::Add),
        ));
        let ids = actor.list_tracks();
        let before = pose(&actor, 0..10);

        let result = merge_selected(&mut actor, &MergeSettings::default(), &mut NoProgress).unwrap();

        assert_eq!(result.mode, BlendMode::Replace);
        assert_eq!(result.suppressed_tracks, vec![ids[3]]);
        let channel = actor.source(result.source).unwrap().channel(&x()).unwrap();
        assert!(channel.keyframes().iter().all(|k| k.value == 3.0));
        assert_eq!(actor.track_index(result.track), Some(3));
        assert_eq!(muted_flags(&actor), vec![false; 5]);
        assert_eq!(pose(&actor, 0..10), before);
    }

    #[test]
    fn test_too_few_clips() {
        let mut actor = Actor::new("Cube").with_property("x", &[0.0]);
        let one = constant(&mut actor, "One", 1.0);
        actor.add_track(clip_track("T0", Clip::new("A", 0.0, 10.0).with_source(one).selected()));
        actor.add_track(clip_track("T1", Clip::new("B", 0.0, 10.0)));

        let result = merge_selected(&mut actor, &MergeSettings::default(), &mut NoProgress);
        assert!(matches!(
            result,
            Err(MergeError::Validation(ValidationError::TooFewClips { found: 1, required: 2 }))
        ));
        assert_eq!(actor.track_count(), 2);
        assert_eq!(actor.sources().count(), 1);
    }

    #[test]
    fn test_sourceless_clips() {
        let mut actor = Actor::new("Cube").with_property("x", &[0.0]);
        actor.add_track(clip_track("T0", Clip::new("A", 2.0, 6.0).selected()));
        actor.add_track(clip_track("T1", Clip::new("B", 8.0, 11.5).selected()));
        actor.set_track_muted(actor.list_tracks()[1], true).unwrap();

        let result = merge_selected(&mut actor, &MergeSettings::default(), &mut NoProgress).unwrap();

        assert_eq!(result.range, FrameRange::new(2, 12));
        assert!(result.written.is_empty());
        assert_eq!(result.keyframes, 0);
        assert!(actor.source(result.source).unwrap().is_empty());
        let (_, clip) = actor.clip(result.clip).unwrap();
        assert_eq!((clip.start, clip.end), (2.0, 12.0));
        assert_eq!(muted_flags(&actor), vec![false, true, false]);
    }

    #[test]
    fn test_empty_source_policy() {
        let mut actor = Actor::new("Cube").with_property("x", &[0.0]);
        let one = constant(&mut actor, "One", 1.0);
        actor.add_track(clip_track("T0", Clip::new("A", 0.0, 4.0).with_source(one).selected()));
        actor.add_track(clip_track("T1", Clip::new("Empty", 10.0, 12.0).selected()));

        let skip = MergeSettings {
            empty_sources: EmptySourcePolicy::Skip,
            ..MergeSettings::default()
        };
        let result = merge_selected(&mut actor, &skip, &mut NoProgress);
        assert!(matches!(
            result,
            Err(MergeError::Validation(ValidationError::TooFewClips { found: 1, .. }))
        ));

        let result = merge_selected(&mut actor, &MergeSettings::default(), &mut NoProgress).unwrap();
        assert_eq!(result.range, FrameRange::new(0, 12));
        assert_eq!(result.keyframes, 12);
    }

    #[test]
    fn test_abort_restores_visibility() {
        let mut actor = overlap_actor();
        let extra = actor.add_track(Track::new("Unrelated"));
        actor.evaluate(15).unwrap();
        let mut reporter = |p: u8| {
            if p >= 10 {
                ProgressControl::Abort
            } else {
                ProgressControl::Continue
            }
        };
        let result = merge_selected(&mut actor, &MergeSettings::default(), &mut reporter);

        assert!(matches!(result, Err(MergeError::Aborted)));
        assert!(!actor.track_muted(extra).unwrap());
        assert_eq!(actor.track_count(), 3);
        assert!(actor.selected_clips().all(|c| !c.muted));
        assert_eq!(actor.current_frame(), 15);
    }

    #[test]
    fn test_late_abort_leaves_no_partial_clip() {
        let mut actor = overlap_actor();
        let before = pose(&actor, 0..20);
        let mut reporter = |p: u8| {
            if p >= 75 {
                ProgressControl::Abort
            } else {
                ProgressControl::Continue
            }
        };
        let result = merge_selected(&mut actor, &MergeSettings::default(), &mut reporter);

        assert!(matches!(result, Err(MergeError::Aborted)));
        assert_eq!(actor.sources().count(), 2);
        assert_eq!(actor.track_count(), 2);
        assert_eq!(muted_flags(&actor), vec![false, false]);
        assert_eq!(pose(&actor, 0..20), before);
    }

    #[test]
    fn test_remerge_is_stable() {
        let mut actor = overlap_actor();
        let first = merge_selected(&mut actor, &MergeSettings::default(), &mut NoProgress).unwrap();
        let first_keys = actor.source(first.source).unwrap().channel(&x()).unwrap().keyframes().to_vec();

        for id in &first.muted_clips {
            actor.clip_mut(*id).unwrap().selected = false;
        }
        actor.clip_mut(first.clip).unwrap().selected = true;
        actor.add_track(clip_track(
            "Spacer",
            Clip::new("Spacer", 4.0, 8.0).with_blend_mode(BlendMode::Combine).selected(),
        ));

        let second = merge_selected(&mut actor, &MergeSettings::default(), &mut NoProgress).unwrap();
        let second_keys = actor.source(second.source).unwrap().channel(&x()).unwrap().keyframes().to_vec();

        assert_eq!(second.range, first.range);
        assert_eq!(second.mode, BlendMode::Combine);
        assert_eq!(second_keys, first_keys);
    }

    #[test]
    fn test_concatenate_strategy() {
        let mut actor = overlap_actor();
        let settings = MergeSettings {
            strategy: MergeStrategy::Concatenate,
            output_name: "Chain".to_string(),
            ..MergeSettings::default()
        };
        let result = merge_selected(&mut actor, &settings, &mut NoProgress).unwrap();

        assert_eq!(result.strategy, MergeStrategy::Concatenate);
        assert_eq!(result.range, FrameRange::new(0, 25));
        assert!(result.suppressed_tracks.is_empty());
        // B reads its source from frame 5, so its only key (frame 0) is dropped
        let channel = actor.source(result.source).unwrap().channel(&x()).unwrap();
        let keys: Vec<(i32, f32)> = channel.keyframes().iter().map(|k| (k.frame, k.value)).collect();
        assert_eq!(keys, vec![(0, 1.0)]);
        assert_eq!(actor.track(result.track).map(|t| t.name.as_str()), Some("Chain"));
    }

    /// Delegates to an [`Actor`] but fails to evaluate one frame
    struct FailingHost {
        inner: Actor,
        fail_at: i32,
    }

    impl NlaHost for FailingHost {
        fn list_tracks(&self) -> Vec<TrackId> {
            self.inner.list_tracks()
        }
        fn list_clips(&self, track: TrackId) -> std::result::Result<Vec<ClipId>, HostError> {
            self.inner.list_clips(track)
        }
        fn clip_info(&self, clip: ClipId) -> std::result::Result<ClipInfo, HostError> {
            self.inner.clip_info(clip)
        }
        fn track_muted(&self, track: TrackId) -> std::result::Result<bool, HostError> {
            self.inner.track_muted(track)
        }
        fn set_track_muted(&mut self, track: TrackId, muted: bool) -> std::result::Result<(), HostError> {
            self.inner.set_track_muted(track, muted)
        }
        fn source_channels(&self, source: SourceId) -> std::result::Result<Vec<ChannelKey>, HostError> {
            self.inner.source_channels(source)
        }
        fn channel_keyframes(
            &self,
            source: SourceId,
            key: &ChannelKey,
        ) -> std::result::Result<Vec<Keyframe>, HostError> {
            self.inner.channel_keyframes(source, key)
        }
        fn property_width(&self, path: &str) -> Option<usize> {
            self.inner.property_width(path)
        }
        fn current_frame(&self) -> i32 {
            self.inner.current_frame()
        }
        fn evaluate(&mut self, frame: i32) -> std::result::Result<(), HostError> {
            if frame == self.fail_at {
                return Err(HostError::NotEvaluated);
            }
            self.inner.evaluate(frame)
        }
        fn read_channel(&self, path: &str, index: usize) -> std::result::Result<f32, HostError> {
            self.inner.read_channel(path, index)
        }
        fn create_source(&mut self, name: &str) -> SourceId {
            self.inner.create_source(name)
        }
        fn add_channel(&mut self, source: SourceId, key: ChannelKey) -> std::result::Result<ChannelRef, HostError> {
            self.inner.add_channel(source, key)
        }
        fn insert_keyframe(&mut self, channel: &ChannelRef, keyframe: Keyframe) -> std::result::Result<(), HostError> {
            self.inner.insert_keyframe(channel, keyframe)
        }
        fn set_extrapolation(
            &mut self,
            channel: &ChannelRef,
            mode: Extrapolation,
        ) -> std::result::Result<(), HostError> {
            self.inner.set_extrapolation(channel, mode)
        }
        fn remove_source(&mut self, source: SourceId) -> std::result::Result<(), HostError> {
            self.inner.remove_source(source)
        }
        fn create_track(&mut self, after: Option<TrackId>, name: &str) -> std::result::Result<TrackId, HostError> {
            self.inner.create_track(after, name)
        }
        fn create_clip(
            &mut self,
            track: TrackId,
            name: &str,
            range: FrameRange,
            source: SourceId,
        ) -> std::result::Result<ClipId, HostError> {
            self.inner.create_clip(track, name, range, source)
        }
        fn remove_track(&mut self, track: TrackId) -> std::result::Result<(), HostError> {
            self.inner.remove_track(track)
        }
        fn set_blend_mode(&mut self, clip: ClipId, mode: BlendMode) -> std::result::Result<(), HostError> {
            self.inner.set_blend_mode(clip, mode)
        }
        fn set_clip_muted(&mut self, clip: ClipId, muted: bool) -> std::result::Result<(), HostError> {
            self.inner.set_clip_muted(clip, muted)
        }
    }

    #[test]
    fn test_failed_evaluation_restores_visibility() {
        let mut inner = overlap_actor();
        inner.add_track(Track::new("Unrelated"));
        let before = muted_flags(&inner);
        let mut host = FailingHost { inner, fail_at: 3 };

        let result = merge_selected(&mut host, &MergeSettings::default(), &mut NoProgress);

        assert!(matches!(result, Err(MergeError::Host(HostError::NotEvaluated))));
        assert_eq!(muted_flags(&host.inner), before);
        assert_eq!(host.inner.track_count(), 3);
        assert_eq!(host.inner.sources().count(), 2);
    }
}
