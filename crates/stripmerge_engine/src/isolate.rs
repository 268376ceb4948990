// SPDX-License-Identifier: MIT OR Apache-2.0
//! Visibility isolation.
//!
//! Sampling must see only the selected clips, plus the tracks below the
//! replace point when the merged clip will replace. Competing tracks are
//! muted for the duration of the sampling and put back afterwards.
//! [`IsolationGuard`] ties the two together: whatever way the merge ends,
//! the snapshot is restored exactly once.

use std::ops::{Deref, DerefMut};
use stripmerge_nla::{BlendMode, HostError, NlaHost, TrackId};

/// Track mute flags captured before isolation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SavedState {
    snapshot: Vec<(TrackId, bool)>,
    suppressed: Vec<TrackId>,
}

impl SavedState {
    /// Tracks muted by the isolation
    pub fn suppressed(&self) -> &[TrackId] {
        &self.suppressed
    }
}

/// Whether isolation has to mute the track at `index`
pub fn should_suppress(
    index: usize,
    already_muted: bool,
    holds_selection: bool,
    track_min_index: usize,
    mode: BlendMode,
) -> bool {
    let below_replace_point = mode == BlendMode::Replace && index < track_min_index;
    !already_muted && !holds_selection && !below_replace_point
}

/// Snapshot every track and mute the competing ones.
///
/// If muting fails part-way, the tracks muted so far are restored before the
/// error is returned.
pub fn isolate<H: NlaHost + ?Sized>(
    host: &mut H,
    selected_tracks: &[TrackId],
    track_min_index: usize,
    mode: BlendMode,
) -> Result<SavedState, HostError> {
    let mut saved = SavedState::default();
    for track in host.list_tracks() {
        let muted = host.track_muted(track)?;
        saved.snapshot.push((track, muted));
    }

    for index in 0..saved.snapshot.len() {
        let (track, muted) = saved.snapshot[index];
        if !should_suppress(index, muted, selected_tracks.contains(&track), track_min_index, mode) {
            continue;
        }
        if let Err(e) = host.set_track_muted(track, true) {
            tracing::warn!("Failed to mute track {:?}: {}", track, e);
            if let Err(restore_err) = restore(host, &saved) {
                tracing::error!("Failed to roll back isolation: {}", restore_err);
            }
            return Err(e);
        }
        saved.suppressed.push(track);
    }

    tracing::debug!(
        "Isolated {} of {} tracks (mode {}, replace point {})",
        saved.suppressed.len(),
        saved.snapshot.len(),
        mode.name(),
        track_min_index
    );
    Ok(saved)
}

/// Put every snapshotted track back to its saved mute flag.
///
/// Keeps going past failures and returns the first one.
pub fn restore<H: NlaHost + ?Sized>(host: &mut H, saved: &SavedState) -> Result<(), HostError> {
    let mut first_err = None;
    for (track, muted) in &saved.snapshot {
        if let Err(e) = host.set_track_muted(*track, *muted) {
            tracing::warn!("Failed to restore track {:?}: {}", track, e);
            first_err.get_or_insert(e);
        }
    }
    match first_err {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Scoped isolation: restores the saved state on [`restore`](Self::restore)
/// or, failing that, on drop.
pub struct IsolationGuard<'h, H: NlaHost + ?Sized> {
    host: &'h mut H,
    saved: Option<SavedState>,
}

impl<'h, H: NlaHost + ?Sized> IsolationGuard<'h, H> {
    /// Isolate and keep the host borrowed until restored
    pub fn acquire(
        host: &'h mut H,
        selected_tracks: &[TrackId],
        track_min_index: usize,
        mode: BlendMode,
    ) -> Result<Self, HostError> {
        let saved = isolate(host, selected_tracks, track_min_index, mode)?;
        Ok(Self {
            host,
            saved: Some(saved),
        })
    }

    /// Saved state, `None` once restored
    pub fn saved(&self) -> Option<&SavedState> {
        self.saved.as_ref()
    }

    /// Restore now and release the host
    pub fn restore(mut self) -> Result<(), HostError> {
        match self.saved.take() {
            Some(saved) => restore(&mut *self.host, &saved),
            None => Ok(()),
        }
    }
}

impl<H: NlaHost + ?Sized> Deref for IsolationGuard<'_, H> {
    type Target = H;

    fn deref(&self) -> &H {
        self.host
    }
}

impl<H: NlaHost + ?Sized> DerefMut for IsolationGuard<'_, H> {
    fn deref_mut(&mut self) -> &mut H {
        self.host
    }
}

impl<H: NlaHost + ?Sized> Drop for IsolationGuard<'_, H> {
    fn drop(&mut self) {
        if let Some(saved) = self.saved.take() {
            if let Err(e) = restore(&mut *self.host, &saved) {
                tracing::error!("Failed to restore track visibility: {}", e);
            }
        }
    }
}
