// SPDX-License-Identifier: MIT OR Apache-2.0
//! Strip merging for nonlinear animation.
//!
//! Bakes the selected clips of an actor into a single new clip:
//! - [`Selection`] gathers the selected clips in scan order
//! - [`resolve`] finds the covering frame range and the output blend mode
//! - [`ChannelCatalog`] lists the channels to bake
//! - [`IsolationGuard`] mutes competing tracks while sampling
//! - [`sample`] and [`synthesize`] read the layered result and key it
//!
//! [`merge_selected`] runs the whole pipeline against any [`NlaHost`].
//!
//! [`NlaHost`]: stripmerge_nla::NlaHost

pub mod catalog;
pub mod concat;
pub mod error;
pub mod isolate;
pub mod merge;
pub mod progress;
pub mod resolve;
pub mod sample;
pub mod selection;
pub mod settings;
pub mod synthesize;

pub use catalog::{CatalogEntry, ChannelCatalog, ChannelShape};
pub use concat::{concatenate, Concatenated};
pub use error::{MergeError, RangeError, Result, ValidationError};
pub use isolate::{isolate, restore, IsolationGuard, SavedState};
pub use merge::{merge_selected, MergeResult};
pub use progress::{NoProgress, ProgressControl, ProgressReporter, ProgressTracker};
pub use resolve::{resolve, Resolution};
pub use sample::{sample, SampleTable};
pub use selection::{SelectedClip, Selection};
pub use settings::{EmptySourcePolicy, MergeSettings, MergeStrategy, SettingsError};
pub use synthesize::{commit, install, key_samples, synthesize, ChannelKeys, Installation, Installed, Synthesized};
