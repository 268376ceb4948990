// SPDX-License-Identifier: MIT OR Apache-2.0
//! Merge summaries for the terminal.

use serde::Serialize;
use std::fmt;
use std::path::Path;
use stripmerge_engine::MergeResult;
use stripmerge_nla::Actor;

/// What a merge did, ready to print
#[derive(Debug, Serialize)]
pub struct MergeSummary<'a> {
    /// Actor the clips belong to
    pub actor: &'a str,
    /// Name of the new track
    pub track_name: String,
    /// Scene file written
    pub output: &'a Path,
    /// Engine result
    #[serde(flatten)]
    pub result: &'a MergeResult,
}

impl<'a> MergeSummary<'a> {
    /// Summarize `result` against the merged actor
    pub fn new(actor: &'a Actor, result: &'a MergeResult, output: &'a Path) -> Self {
        let track_name = actor
            .track(result.track)
            .map(|t| t.name.clone())
            .unwrap_or_default();
        Self {
            actor: &actor.name,
            track_name,
            output,
            result,
        }
    }

    /// Render as pretty JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for MergeSummary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let result = self.result;
        writeln!(
            f,
            "Merged {} clips of '{}' into '{}' ({}, {})",
            result.muted_clips.len(),
            self.actor,
            self.track_name,
            result.strategy.name(),
            result.mode.name()
        )?;
        writeln!(f, "  range:     {}", result.range)?;
        writeln!(
            f,
            "  channels:  {} written, {} skipped",
            result.written.len(),
            result.skipped_channels.len()
        )?;
        for key in &result.skipped_channels {
            writeln!(f, "    skipped {key}")?;
        }
        writeln!(f, "  keyframes: {}", result.keyframes)?;
        writeln!(f, "  scene:     {}", self.output.display())
    }
}
