// SPDX-License-Identifier: MIT OR Apache-2.0
//! Keyframe definitions for animation channels.

use serde::{Deserialize, Serialize};

/// Interpolation mode between a keyframe and the next one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[derive(Default)]
pub enum InterpolationMode {
    /// Constant (step)
    Constant,
    /// Linear interpolation
    #[default]
    Linear,
    /// Cubic bezier with flat handles
    Bezier,
}

/// How a channel behaves outside its first and last keyframe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[derive(Default)]
pub enum Extrapolation {
    /// Hold the first/last value
    #[default]
    Constant,
    /// Continue the slope of the first/last segment
    Linear,
}

/// A keyframe point on a channel
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
    /// Frame number
    pub frame: i32,
    /// Value at this keyframe
    pub value: f32,
    /// Interpolation mode to the next keyframe
    pub interpolation: InterpolationMode,
}

impl Keyframe {
    /// Create a new linear keyframe
    pub fn new(frame: i32, value: f32) -> Self {
        Self {
            frame,
            value,
            interpolation: InterpolationMode::Linear,
        }
    }

    /// Set interpolation mode
    pub fn with_interpolation(mut self, mode: InterpolationMode) -> Self {
        self.interpolation = mode;
        self
    }
}

/// Interpolation utilities
pub struct Interpolation;

impl Interpolation {
    /// Linear interpolation between two floats
    pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
        a + (b - a) * t
    }

    /// Cubic bezier interpolation
    pub fn bezier(p0: f32, p1: f32, p2: f32, p3: f32, t: f32) -> f32 {
        let t2 = t * t;
        let t3 = t2 * t;
        let mt = 1.0 - t;
        let mt2 = mt * mt;
        let mt3 = mt2 * mt;

        p0 * mt3 + 3.0 * p1 * mt2 * t + 3.0 * p2 * mt * t2 + p3 * t3
    }

    /// Interpolate the segment `a -> b` at normalized position `t`
    pub fn segment(a: &Keyframe, b: &Keyframe, t: f32) -> f32 {
        match a.interpolation {
            InterpolationMode::Constant => a.value,
            InterpolationMode::Linear => Self::lerp(a.value, b.value, t),
            // Flat handles: the control points sit at the segment's end values
            InterpolationMode::Bezier => Self::bezier(a.value, a.value, b.value, b.value, t),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lerp() {
        assert_eq!(Interpolation::lerp(0.0, 10.0, 0.25), 2.5);
        assert_eq!(Interpolation::lerp(4.0, 4.0, 0.7), 4.0);
    }

    #[test]
    fn test_segment_modes() {
        let a = Keyframe::new(0, 0.0);
        let b = Keyframe::new(10, 10.0);
        assert_eq!(Interpolation::segment(&a, &b, 0.5), 5.0);

        let step = a.with_interpolation(InterpolationMode::Constant);
        assert_eq!(Interpolation::segment(&step, &b, 0.9), 0.0);

        let smooth = a.with_interpolation(InterpolationMode::Bezier);
        assert_eq!(Interpolation::segment(&smooth, &b, 0.5), 5.0);
        assert!(Interpolation::segment(&smooth, &b, 0.1) < 1.0);
    }
}
