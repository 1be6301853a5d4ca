//! Local character controller.
//!
//! Runs once per physics step for an owned avatar: walk, jump, gravity,
//! animation parameters and look rotation.

use mover_shared::{
    config::MoverConfig,
    math::{Pose, Vec3},
    physics::CharacterMover,
};

use crate::{
    animator::{Animator, PARAM_HORIZONTAL, PARAM_RUNNING, PARAM_VERTICAL},
    camera::CameraRig,
    input::MoveInput,
};

/// Per-avatar movement state carried between steps.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalController {
    pub ground_speed: f32,
    pub air_speed: f32,
    pub jump_speed: f32,
    pub gravity: f32,
    vertical_velocity: f32,
    is_jumping: bool,
}

impl LocalController {
    pub fn new(cfg: &MoverConfig) -> Self {
        Self {
            ground_speed: cfg.ground_speed,
            air_speed: cfg.air_speed,
            jump_speed: cfg.jump_speed,
            gravity: cfg.gravity,
            vertical_velocity: 0.0,
            is_jumping: false,
        }
    }

    pub fn vertical_velocity(&self) -> f32 {
        self.vertical_velocity
    }

    pub fn is_jumping(&self) -> bool {
        self.is_jumping
    }

    /// Advances one physics step. Returns the displacement handed to the
    /// mover.
    pub fn step(
        &mut self,
        pose: &mut Pose,
        camera: &mut CameraRig,
        animator: &mut Animator,
        mover: &mut dyn CharacterMover,
        input: &MoveInput,
        dt: f32,
    ) -> Vec3 {
        let grounded = mover.is_grounded();

        let local = Vec3::new(input.horizontal, 0.0, input.vertical);
        let speed = if grounded {
            self.ground_speed
        } else {
            self.air_speed
        };
        let planar = pose.transform_direction(local) * speed;

        if grounded {
            if input.jump && !self.is_jumping {
                self.vertical_velocity = self.jump_speed;
                self.is_jumping = true;
            } else {
                self.vertical_velocity = 0.0;
            }
        } else {
            self.is_jumping = false;
            self.vertical_velocity -= self.gravity * dt;
        }

        let displacement = (planar + Vec3::new(0.0, self.vertical_velocity, 0.0)) * dt;
        mover.move_by(pose, displacement);

        animator.set_float(PARAM_HORIZONTAL, input.horizontal);
        animator.set_float(PARAM_VERTICAL, input.vertical);
        animator.set_bool(PARAM_RUNNING, input.run);

        pose.rotate_local_y(input.look.x.to_radians());
        camera.pitch(-input.look.y);

        displacement
    }
}
