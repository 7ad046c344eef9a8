//! Fixed-rate resampling of variable tick time.
//!
//! Frames are emitted at `frame / rate` seconds regardless of how long each
//! tick took. Only the root placement (component-to-world) is blended toward
//! the exact sample time; bone poses are taken as-is from the current tick.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::transform::RigidTransform;

/// Rational frame rate (`numerator / denominator` frames per second).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameRate {
    pub numerator: u32,
    pub denominator: u32,
}

impl Default for FrameRate {
    fn default() -> Self {
        Self::fps(30)
    }
}

impl FrameRate {
    #[inline]
    pub const fn new(numerator: u32, denominator: u32) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    #[inline]
    pub const fn fps(fps: u32) -> Self {
        Self::new(fps, 1)
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.numerator > 0 && self.denominator > 0
    }

    #[inline]
    pub fn as_hz(&self) -> f64 {
        self.numerator as f64 / self.denominator as f64
    }

    /// Time of `frame` in seconds.
    #[inline]
    pub fn as_seconds(&self, frame: u32) -> f64 {
        frame as f64 * self.denominator as f64 / self.numerator as f64
    }
}

impl fmt::Display for FrameRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.denominator == 1 {
            write!(f, "{} fps", self.numerator)
        } else {
            write!(f, "{:.2} fps", self.as_hz())
        }
    }
}

/// Result of advancing the resampler by one tick.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ResampleStep {
    /// Frame index to record.
    pub frame: u32,
    /// Exact sample time of `frame`, in seconds.
    pub target_time: f64,
    /// Weight of the current tick's root placement against the previous one.
    /// Not clamped: ticks that overshoot or undershoot the sample time
    /// extrapolate.
    pub blend_alpha: f32,
}

#[derive(Clone, Debug)]
pub struct TimeResampler {
    time_passed: f64,
    previous_component_to_world: RigidTransform,
}

impl TimeResampler {
    pub fn new(initial_component_to_world: RigidTransform) -> Self {
        Self {
            time_passed: 0.0,
            previous_component_to_world: initial_component_to_world,
        }
    }

    /// Accumulate `delta_time` and compute the next frame and its root blend.
    ///
    /// A non-positive or non-finite `delta_time` leaves the running total
    /// unchanged and uses the current placement as-is (alpha 1).
    pub fn advance(&mut self, rate: FrameRate, last_frame: u32, delta_time: f32) -> ResampleStep {
        let frame = last_frame + 1;
        let target_time = rate.as_seconds(frame);
        if !(delta_time.is_finite() && delta_time > 0.0) {
            return ResampleStep {
                frame,
                target_time,
                blend_alpha: 1.0,
            };
        }
        let previous = self.time_passed;
        self.time_passed += delta_time as f64;
        let blend_alpha = ((target_time - previous) / delta_time as f64) as f32;
        ResampleStep {
            frame,
            target_time,
            blend_alpha,
        }
    }

    /// Root placement for this frame: previous tick blended toward `current`.
    #[inline]
    pub fn blend_root(&self, current: &RigidTransform, alpha: f32) -> RigidTransform {
        RigidTransform::blend(&self.previous_component_to_world, current, alpha)
    }

    /// Remember `current` as the previous tick's placement.
    #[inline]
    pub fn commit(&mut self, current: RigidTransform) {
        self.previous_component_to_world = current;
    }

    #[inline]
    pub fn time_passed(&self) -> f64 {
        self.time_passed
    }

    #[inline]
    pub fn previous_component_to_world(&self) -> &RigidTransform {
        &self.previous_component_to_world
    }
}
