//! Interpolation.
//!
//! The owner sends discrete pose samples at serialization ticks. A replica
//! renders at its own rate and eases toward the latest sample. There is no
//! history, extrapolation or snapping.

use mover_shared::math::Pose;

/// Blend factor for one frame: `1 - exp(-smoothing * dt)`.
///
/// Always in `[0, 1]` for finite non-negative input, so a step never passes
/// the target. Very long frames round up to exactly 1 and snap.
pub fn smoothing_factor(smoothing: f32, dt: f32) -> f32 {
    if !(smoothing * dt).is_finite() || smoothing <= 0.0 || dt <= 0.0 {
        return 0.0;
    }
    1.0 - (-smoothing * dt).exp()
}

/// Eases a replica toward the last received sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RemoteReplicator {
    target: Pose,
    smoothing: f32,
    samples: u64,
}

impl RemoteReplicator {
    pub fn new(initial: Pose, smoothing: f32) -> Self {
        Self {
            target: initial,
            smoothing,
            samples: 0,
        }
    }

    pub fn target(&self) -> Pose {
        self.target
    }

    /// Number of samples received so far.
    pub fn samples(&self) -> u64 {
        self.samples
    }

    /// Resets the target without counting a received sample.
    pub fn reset(&mut self, pose: Pose) {
        self.target = pose;
    }

    /// Stores a freshly received sample. The newest arrival always wins.
    pub fn set_target(&mut self, pose: Pose) {
        self.target = pose;
        self.samples += 1;
    }

    /// Moves `pose` one frame closer to the target.
    pub fn step(&self, pose: &mut Pose, dt: f32) {
        let a = smoothing_factor(self.smoothing, dt);
        pose.position = pose.position.lerp(self.target.position, a);
        pose.rotation = pose.rotation.slerp(self.target.rotation, a);
    }
}
