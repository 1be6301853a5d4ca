//! First-person camera rig.
//!
//! The camera hangs off the avatar body: yaw turns the body, pitch turns
//! only the camera.

use mover_shared::{math::Quat, scene::RenderLayers};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraRig {
    /// Only the owner's camera renders.
    pub active: bool,
    /// Rotation relative to the body.
    pub local_rotation: Quat,
    /// Accumulated pitch in degrees, positive looks down.
    pub pitch_deg: f32,
    pub culling_mask: RenderLayers,
    pitch_limit_deg: Option<f32>,
}

impl CameraRig {
    /// A negative or non-finite limit is ignored and pitch stays free.
    pub fn new(pitch_limit_deg: Option<f32>) -> Self {
        let pitch_limit_deg = pitch_limit_deg.filter(|l| l.is_finite() && *l >= 0.0);
        Self {
            active: false,
            local_rotation: Quat::IDENTITY,
            pitch_deg: 0.0,
            culling_mask: RenderLayers::first_person_mask(),
            pitch_limit_deg,
        }
    }

    /// Rotates about the local X axis by `delta_deg`. Without a limit the
    /// pitch accumulates freely and the view can flip over.
    pub fn pitch(&mut self, delta_deg: f32) {
        let target = match self.pitch_limit_deg {
            Some(limit) => (self.pitch_deg + delta_deg).clamp(-limit, limit),
            None => self.pitch_deg + delta_deg,
        };
        let applied = target - self.pitch_deg;
        self.pitch_deg = target;
        if applied != 0.0 {
            self.local_rotation =
                (self.local_rotation * Quat::from_rotation_x(applied.to_radians())).normalize();
        }
    }
}
