// SPDX-License-Identifier: MIT OR Apache-2.0
//! Clip synthesis: turning a sample table into a new keyed clip.

use crate::catalog::ChannelCatalog;
use crate::error::{MergeError, Result};
use crate::progress::{ProgressControl, ProgressTracker};
use crate::sample::SampleTable;
use stripmerge_nla::{
    BlendMode, ChannelKey, ChannelRef, ClipId, Extrapolation, FrameRange, InterpolationMode,
    Keyframe, NlaHost, SourceId, TrackId,
};

/// Where the merged clip goes and what it replaces
#[derive(Debug, Clone, PartialEq)]
pub struct Installation {
    /// Name of the new track and clip
    pub name: String,
    /// Track to insert after (`None` = bottom of the stack)
    pub after: Option<TrackId>,
    /// Blend mode of the new clip
    pub mode: BlendMode,
    /// Clips to mute once the new clip is in place
    pub originals: Vec<ClipId>,
}

/// The installed clip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Installed {
    /// New track
    pub track: TrackId,
    /// New clip
    pub clip: ClipId,
}

/// Result of synthesizing a clip from samples
#[derive(Debug, Clone, PartialEq)]
pub struct Synthesized {
    /// New animation source
    pub source: SourceId,
    /// New track and clip
    pub installed: Installed,
    /// Channels created, in catalog order
    pub written: Vec<ChannelKey>,
    /// Channels the host refused to create
    pub skipped: Vec<ChannelKey>,
    /// Keyframes inserted over all channels
    pub keyframes: usize,
}

/// Keyframes destined for one channel of the new source
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelKeys {
    /// Channel to create
    pub key: ChannelKey,
    /// Keyframes in frame order
    pub keyframes: Vec<Keyframe>,
}

/// Key the sampled values into a new source and install it as a clip.
///
/// Every present sample becomes a linear keyframe at its absolute frame;
/// absent samples leave a gap. Channels get linear extrapolation.
/// Installation (track, clip, blend mode, muting the originals) runs last.
pub fn synthesize<H: NlaHost + ?Sized>(
    host: &mut H,
    table: &SampleTable,
    catalog: &ChannelCatalog,
    install_as: &Installation,
    progress: &mut ProgressTracker<'_>,
) -> Result<Synthesized> {
    let channels = key_samples(table, catalog, progress)?;
    let out = commit(host, &channels, Extrapolation::Linear, table.range(), install_as)?;
    tracing::info!(
        "Synthesized '{}': {} channels, {} keyframes over {}",
        install_as.name,
        out.written.len(),
        out.keyframes,
        table.range()
    );
    Ok(out)
}

/// Turn a sample table into per-channel keyframes, one progress step per
/// row. The host is not touched, so an abort here leaves nothing behind.
pub fn key_samples(
    table: &SampleTable,
    catalog: &ChannelCatalog,
    progress: &mut ProgressTracker<'_>,
) -> Result<Vec<ChannelKeys>> {
    let mut channels: Vec<ChannelKeys> = catalog
        .entries()
        .iter()
        .map(|entry| ChannelKeys {
            key: entry.key.clone(),
            keyframes: Vec::with_capacity(table.len()),
        })
        .collect();

    for (frame, row) in table.rows() {
        for (channel, value) in channels.iter_mut().zip(row) {
            if let Some(value) = *value {
                channel
                    .keyframes
                    .push(Keyframe::new(frame, value).with_interpolation(InterpolationMode::Linear));
            }
        }
        if progress.step() == ProgressControl::Abort {
            return Err(MergeError::Aborted);
        }
    }
    Ok(channels)
}

/// Write `channels` into a new source and install it over `range`.
///
/// Either everything lands or nothing does: on a host error the new source
/// (and the new track, see [`install`]) is removed again before returning.
/// Channels the host refuses to create are skipped, not fatal.
pub fn commit<H: NlaHost + ?Sized>(
    host: &mut H,
    channels: &[ChannelKeys],
    extrapolation: Extrapolation,
    range: FrameRange,
    install_as: &Installation,
) -> Result<Synthesized> {
    let source = host.create_source(&install_as.name);

    let committed = fill(host, source, channels, extrapolation).and_then(|filled| {
        install(host, source, range, install_as).map(|installed| (filled, installed))
    });
    let ((written, skipped, keyframes), installed) = match committed {
        Ok(done) => done,
        Err(e) => {
            discard_source(host, source);
            return Err(e);
        }
    };

    Ok(Synthesized {
        source,
        installed,
        written,
        skipped,
        keyframes,
    })
}

fn fill<H: NlaHost + ?Sized>(
    host: &mut H,
    source: SourceId,
    channels: &[ChannelKeys],
    extrapolation: Extrapolation,
) -> Result<(Vec<ChannelKey>, Vec<ChannelKey>, usize)> {
    let mut written = Vec::with_capacity(channels.len());
    let mut skipped = Vec::new();
    let mut keyframes = 0;
    for channel in channels {
        let target: ChannelRef = match host.add_channel(source, channel.key.clone()) {
            Ok(target) => target,
            Err(e) => {
                tracing::warn!("Cannot create channel {}: {} - skipped", channel.key, e);
                skipped.push(channel.key.clone());
                continue;
            }
        };
        for keyframe in &channel.keyframes {
            host.insert_keyframe(&target, *keyframe)?;
            keyframes += 1;
        }
        host.set_extrapolation(&target, extrapolation)?;
        written.push(target.key);
    }
    Ok((written, skipped, keyframes))
}

fn discard_source<H: NlaHost + ?Sized>(host: &mut H, source: SourceId) {
    tracing::debug!("Discarding partial source {:?}", source);
    if let Err(e) = host.remove_source(source) {
        tracing::error!("Failed to remove partial source {:?}: {}", source, e);
    }
}

/// Place `source` as a new clip over `range` on a fresh track and mute the
/// clips it replaces. On failure the new track is removed again and any
/// original muted so far is unmuted.
pub fn install<H: NlaHost + ?Sized>(
    host: &mut H,
    source: SourceId,
    range: FrameRange,
    install_as: &Installation,
) -> Result<Installed> {
    let track = host.create_track(install_as.after, &install_as.name)?;
    match place(host, track, source, range, install_as) {
        Ok(clip) => Ok(Installed { track, clip }),
        Err(e) => {
            if let Err(remove_err) = host.remove_track(track) {
                tracing::error!("Failed to remove partial track {:?}: {}", track, remove_err);
            }
            Err(e)
        }
    }
}

fn place<H: NlaHost + ?Sized>(
    host: &mut H,
    track: TrackId,
    source: SourceId,
    range: FrameRange,
    install_as: &Installation,
) -> Result<ClipId> {
    let clip = host.create_clip(track, &install_as.name, range, source)?;
    host.set_blend_mode(clip, install_as.mode)?;
    mute_originals(host, &install_as.originals)?;
    Ok(clip)
}

fn mute_originals<H: NlaHost + ?Sized>(host: &mut H, originals: &[ClipId]) -> Result<()> {
    let mut muted = Vec::with_capacity(originals.len());
    for original in originals {
        let outcome = match host.clip_info(*original) {
            Ok(info) if info.muted => Ok(()),
            Ok(_) => host.set_clip_muted(*original, true).map(|()| muted.push(*original)),
            Err(e) => Err(e),
        };
        if let Err(e) = outcome {
            for clip in muted {
                if let Err(unmute_err) = host.set_clip_muted(clip, false) {
                    tracing::error!("Failed to unmute {:?}: {}", clip, unmute_err);
                }
            }
            return Err(e.into());
        }
    }
    Ok(())
}
