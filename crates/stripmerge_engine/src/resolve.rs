// SPDX-License-Identifier: MIT OR Apache-2.0
//! Range and blend-mode resolution.

use crate::error::RangeError;
use crate::selection::Selection;
use stripmerge_nla::{BlendMode, FrameRange};

/// Blend mode assumed before any clip is scanned
pub const INITIAL_BLEND_MODE: BlendMode = BlendMode::Combine;

/// Covering range, output mode and track bounds of a selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    /// Union of `[floor(start), ceil(end))` over the clips
    pub range: FrameRange,
    /// Blend mode for the merged clip
    pub mode: BlendMode,
    /// Replace point: tracks below it stay visible under `Replace`
    pub track_min_index: usize,
    /// Last track holding a selected clip
    pub track_max_index: usize,
    /// Number of contributing clips
    pub clip_count: usize,
}

/// Frame span a clip covers once snapped outward to whole frames
pub fn clip_frames(start: f32, end: f32) -> FrameRange {
    FrameRange::new(start.floor() as i32, end.ceil() as i32)
}

/// Resolve the merge range and mode.
///
/// Mode precedence: `Replace` wins as soon as any clip uses it; otherwise the
/// last scanned clip decides. There is no deeper meaning to the non-`Replace`
/// tie-break.
pub fn resolve(selection: &Selection) -> Result<Resolution, RangeError> {
    let mut range: Option<FrameRange> = None;
    let mut mode = INITIAL_BLEND_MODE;
    let mut track_min_index = usize::MAX;
    let mut replace_min_index = usize::MAX;
    let mut track_max_index = 0;

    for selected in selection.clips() {
        let clip = &selected.clip;
        let span = clip_frames(clip.start, clip.end);
        range = Some(match range {
            Some(range) => range.union(&span),
            None => span,
        });

        if clip.blend_mode == BlendMode::Replace || mode != BlendMode::Replace {
            mode = clip.blend_mode;
        }
        if clip.blend_mode == BlendMode::Replace {
            replace_min_index = replace_min_index.min(selected.track_index);
        }
        track_min_index = track_min_index.min(selected.track_index);
        track_max_index = track_max_index.max(selected.track_index);
    }

    let range = range.ok_or(RangeError)?;
    if mode == BlendMode::Replace {
        track_min_index = replace_min_index;
    }

    Ok(Resolution {
        range,
        mode,
        track_min_index,
        track_max_index,
        clip_count: selection.len(),
    })
}
