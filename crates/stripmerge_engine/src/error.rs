// SPDX-License-Identifier: MIT OR Apache-2.0
//! Merge errors.

use crate::settings::SettingsError;
use stripmerge_nla::HostError;
use thiserror::Error;

/// Selection rejected before anything is mutated
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Not enough clips to merge
    #[error("Need at least {required} eligible clips, found {found}")]
    TooFewClips {
        /// Eligible clips found
        found: usize,
        /// Minimum required
        required: usize,
    },
}

/// No clip contributed a frame range
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("No clip contributes to the merge range")]
pub struct RangeError;

/// Merge errors
#[derive(Debug, Error)]
pub enum MergeError {
    /// Selection rejected
    #[error("Invalid selection: {0}")]
    Validation(#[from] ValidationError),

    /// Range could not be resolved
    #[error(transparent)]
    Range(#[from] RangeError),

    /// Host call failed
    #[error("Host error: {0}")]
    Host(#[from] HostError),

    /// Progress reporter requested an abort
    #[error("Merge aborted")]
    Aborted,

    /// Settings could not be loaded
    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),
}

/// Result type for merge operations
pub type Result<T> = std::result::Result<T, MergeError>;
