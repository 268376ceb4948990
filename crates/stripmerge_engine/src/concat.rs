// SPDX-License-Identifier: MIT OR Apache-2.0
//! Concatenate-with-offset merging.
//!
//! The non-resampling strategy: each selected clip's keyframes are copied,
//! clip after clip, behind a running cursor. Nothing is evaluated and no
//! track is muted while it runs, so layering between the clips is not
//! reproduced. This is a different merge, not a faster resample.

use crate::catalog::ChannelCatalog;
use crate::error::{MergeError, Result};
use crate::progress::{ProgressControl, ProgressTracker};
use crate::resolve::{clip_frames, Resolution};
use crate::selection::Selection;
use crate::synthesize::{commit, ChannelKeys, Installation, Installed};
use std::collections::BTreeMap;
use stripmerge_nla::{ChannelKey, Extrapolation, FrameRange, Keyframe, NlaHost, SourceId};

/// Result of a concatenation
#[derive(Debug, Clone, PartialEq)]
pub struct Concatenated {
    /// New animation source
    pub source: SourceId,
    /// New track and clip
    pub installed: Installed,
    /// Range of the new clip
    pub range: FrameRange,
    /// Channels created
    pub written: Vec<ChannelKey>,
    /// Channels the host refused to create
    pub skipped: Vec<ChannelKey>,
    /// Keyframes written
    pub keyframes: usize,
}

/// Copy the selected clips' keyframes end to end into one new clip.
///
/// Clips are laid out in scan order starting at the resolved range start;
/// each occupies `ceil(end) - floor(start)` frames. Keyframes outside a
/// clip's window are dropped; keyframes landing on the same output frame
/// overwrite earlier ones. Keys are gathered before the host is modified,
/// then written and installed in one [`commit`].
pub fn concatenate<H: NlaHost + ?Sized>(
    host: &mut H,
    selection: &Selection,
    resolution: &Resolution,
    catalog: &ChannelCatalog,
    install_as: &Installation,
    progress: &mut ProgressTracker<'_>,
) -> Result<Concatenated> {
    let mut columns: Vec<BTreeMap<i32, Keyframe>> = vec![BTreeMap::new(); catalog.len()];
    let mut cursor = resolution.range.start;
    for selected in selection.clips() {
        let clip = &selected.clip;
        let length = i32::try_from(clip_frames(clip.start, clip.end).len()).unwrap_or(i32::MAX);

        if let Some(clip_source) = clip.source {
            gather_clip_keys(&*host, clip_source, clip.source_start, length, cursor, catalog, &mut columns)?;
        }
        tracing::debug!("Placed clip '{}' at frame {} ({} frames)", clip.name, cursor, length);
        cursor = cursor.saturating_add(length);

        if progress.step() == ProgressControl::Abort {
            return Err(MergeError::Aborted);
        }
    }

    let channels: Vec<ChannelKeys> = catalog
        .entries()
        .iter()
        .zip(columns)
        .map(|(entry, keys)| ChannelKeys {
            key: entry.key.clone(),
            keyframes: keys.into_values().collect(),
        })
        .collect();

    let range = FrameRange::new(resolution.range.start, cursor);
    let out = commit(host, &channels, Extrapolation::Constant, range, install_as)?;
    tracing::info!(
        "Concatenated {} clips into '{}' over {} ({} keyframes)",
        selection.len(),
        install_as.name,
        range,
        out.keyframes
    );

    Ok(Concatenated {
        source: out.source,
        installed: out.installed,
        range,
        written: out.written,
        skipped: out.skipped,
        keyframes: out.keyframes,
    })
}

fn gather_clip_keys<H: NlaHost + ?Sized>(
    host: &H,
    clip_source: SourceId,
    source_start: f32,
    length: i32,
    cursor: i32,
    catalog: &ChannelCatalog,
    columns: &mut [BTreeMap<i32, Keyframe>],
) -> Result<()> {
    let keys = match host.source_channels(clip_source) {
        Ok(keys) => keys,
        Err(e) => {
            tracing::warn!("Cannot list channels of {:?}: {}", clip_source, e);
            return Ok(());
        }
    };

    for key in keys {
        let Some(column) = catalog.position(&key) else {
            continue;
        };
        for keyframe in host.channel_keyframes(clip_source, &key)? {
            let local = (keyframe.frame as f32 - source_start).round();
            if local < 0.0 || local > length as f32 {
                continue;
            }
            let frame = cursor.saturating_add(local as i32);
            columns[column].insert(frame, Keyframe { frame, ..keyframe });
        }
    }
    Ok(())
}
