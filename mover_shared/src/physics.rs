//! Physics abstraction.
//!
//! The avatar never integrates its own collisions; it hands a displacement
//! to a `CharacterMover` and asks whether it ended up on the ground.

use crate::math::{Pose, Vec3};

/// Capsule-style mover driven by per-step displacements.
pub trait CharacterMover: Send + Sync {
    /// Applies `displacement` to `pose`, resolving collisions.
    fn move_by(&mut self, pose: &mut Pose, displacement: Vec3);
    /// Whether the last move ended in contact with the ground.
    fn is_grounded(&self) -> bool;
}

/// Flat infinite ground at a fixed height.
#[derive(Debug, Clone, Copy)]
pub struct GroundPlaneMover {
    pub ground_height: f32,
    grounded: bool,
}

impl GroundPlaneMover {
    pub fn new(ground_height: f32) -> Self {
        Self {
            ground_height,
            grounded: false,
        }
    }

    /// Creates a mover that starts in contact with the ground.
    pub fn grounded_at(ground_height: f32) -> Self {
        Self {
            ground_height,
            grounded: true,
        }
    }
}

impl Default for GroundPlaneMover {
    fn default() -> Self {
        Self::grounded_at(0.0)
    }
}

impl CharacterMover for GroundPlaneMover {
    fn move_by(&mut self, pose: &mut Pose, displacement: Vec3) {
        pose.position += displacement;
        if pose.position.y <= self.ground_height {
            pose.position.y = self.ground_height;
            self.grounded = true;
        } else {
            self.grounded = false;
        }
    }

    fn is_grounded(&self) -> bool {
        self.grounded
    }
}

/// Mover without collisions; never grounded.
#[derive(Debug, Default)]
pub struct FreeMover;

impl CharacterMover for FreeMover {
    fn move_by(&mut self, pose: &mut Pose, displacement: Vec3) {
        pose.position += displacement;
    }

    fn is_grounded(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ground_plane_stops_falls() {
        let mut mover = GroundPlaneMover::new(0.0);
        let mut pose = Pose::at(Vec3::new(0.0, 1.0, 0.0));
        mover.move_by(&mut pose, Vec3::new(1.0, -3.0, 0.0));
        assert_eq!(pose.position, Vec3::new(1.0, 0.0, 0.0));
        assert!(mover.is_grounded());
    }

    #[test]
    fn leaving_the_ground_clears_grounded() {
        let mut mover = GroundPlaneMover::default();
        let mut pose = Pose::default();
        mover.move_by(&mut pose, Vec3::new(0.0, 0.1, 0.0));
        assert!(!mover.is_grounded());
    }
}
