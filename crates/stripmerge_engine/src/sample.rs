// SPDX-License-Identifier: MIT OR Apache-2.0
//! Frame sampling: reading the layered result at every frame in range.

use crate::catalog::ChannelCatalog;
use crate::error::{MergeError, Result};
use crate::progress::{ProgressControl, ProgressTracker};
use stripmerge_nla::{FrameRange, NlaHost};

/// Sampled values, one row per frame, one column per catalog entry
#[derive(Debug, Clone, PartialEq)]
pub struct SampleTable {
    range: FrameRange,
    width: usize,
    rows: Vec<Vec<Option<f32>>>,
}

impl SampleTable {
    /// Table with a row per frame and no values yet
    pub fn new(range: FrameRange, width: usize) -> Self {
        Self {
            range,
            width,
            rows: Vec::with_capacity(range.len()),
        }
    }

    /// Append the next frame's row
    pub fn push_row(&mut self, row: Vec<Option<f32>>) {
        debug_assert_eq!(row.len(), self.width);
        self.rows.push(row);
    }

    /// Sampled range
    pub fn range(&self) -> FrameRange {
        self.range
    }

    /// Values per row
    pub fn width(&self) -> usize {
        self.width
    }

    /// Number of sampled frames
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether no frame was sampled
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Row for an absolute frame
    pub fn row(&self, frame: i32) -> Option<&[Option<f32>]> {
        if !self.range.contains(frame) {
            return None;
        }
        let idx = usize::try_from(i64::from(frame) - i64::from(self.range.start)).ok()?;
        self.rows.get(idx).map(Vec::as_slice)
    }

    /// Value of one column at an absolute frame
    pub fn value(&self, frame: i32, column: usize) -> Option<f32> {
        self.row(frame)?.get(column).copied().flatten()
    }

    /// Rows with their absolute frames
    pub fn rows(&self) -> impl Iterator<Item = (i32, &[Option<f32>])> {
        self.range.frames().zip(self.rows.iter().map(Vec::as_slice))
    }
}

/// Sample every catalog entry at every frame of `range`.
///
/// A failed read is recorded as `None`; a failed evaluation ends sampling.
/// With an empty catalog the host is not evaluated at all.
pub fn sample<H: NlaHost + ?Sized>(
    host: &mut H,
    range: FrameRange,
    catalog: &ChannelCatalog,
    progress: &mut ProgressTracker<'_>,
) -> Result<SampleTable> {
    let mut table = SampleTable::new(range, catalog.len());
    if catalog.is_empty() {
        tracing::debug!("Empty channel catalog - nothing to sample over {}", range);
        for _ in range.frames() {
            table.push_row(Vec::new());
            if progress.step() == ProgressControl::Abort {
                return Err(MergeError::Aborted);
            }
        }
        return Ok(table);
    }

    let mut missing = vec![0usize; catalog.len()];
    for frame in range.frames() {
        host.evaluate(frame)?;

        let row = catalog
            .entries()
            .iter()
            .zip(missing.iter_mut())
            .map(|(entry, missing)| {
                match host.read_channel(&entry.key.path, entry.shape.component()) {
                    Ok(value) => Some(value),
                    Err(e) => {
                        tracing::debug!("Frame {}: cannot read {}: {}", frame, entry.key, e);
                        *missing += 1;
                        None
                    }
                }
            })
            .collect();
        table.push_row(row);

        if progress.step() == ProgressControl::Abort {
            return Err(MergeError::Aborted);
        }
    }

    for (entry, count) in catalog.entries().iter().zip(&missing) {
        if *count > 0 {
            tracing::warn!(
                "Channel {}: {} of {} frames could not be read",
                entry.key,
                count,
                range.len()
            );
        }
    }

    Ok(table)
}
