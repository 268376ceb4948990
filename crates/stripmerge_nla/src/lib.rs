// SPDX-License-Identifier: MIT OR Apache-2.0
//! Nonlinear animation (NLA) object model for strip merging.
//!
//! This crate provides the data the merge engine works on:
//! - Actors owning an ordered stack of tracks
//! - Tracks of non-overlapping clips with blend modes
//! - Animation sources holding keyframed channels
//! - The [`NlaHost`] collaborator interface
//!
//! ## Architecture
//!
//! The engine only talks to [`NlaHost`]. [`Actor`] implements it in memory
//! with a layered evaluator, and round-trips through RON scene files.

pub mod actor;
pub mod channel;
pub mod clip;
pub mod host;
pub mod keyframe;
pub mod source;
pub mod track;

pub use actor::{Actor, SceneError};
pub use channel::{Channel, ChannelKey};
pub use clip::{BlendMode, Clip, ClipId};
pub use host::{ChannelRef, ClipInfo, FrameRange, HostError, NlaHost};
pub use keyframe::{Extrapolation, Interpolation, InterpolationMode, Keyframe};
pub use source::{AnimationSource, SourceId};
pub use track::{Track, TrackId};
