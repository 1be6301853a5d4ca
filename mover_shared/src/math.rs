//! Math types.
//!
//! This module intentionally stays small and deterministic.
//! It avoids SIMD/unsafe and focuses on stable semantics.
//!
//! Conventions: Y is up, Z is forward, angles passed to constructors are
//! radians unless the name says `_deg`.

use std::ops::{Add, AddAssign, Mul, Sub};

use serde::{Deserialize, Serialize};

/// 2D vector, used for analog sticks and drag deltas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn len(self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    /// Returns the unit vector, or zero for a zero-length input.
    pub fn normalize_or_zero(self) -> Self {
        let len = self.len();
        if len <= f32::EPSILON {
            Self::ZERO
        } else {
            Self::new(self.x / len, self.y / len)
        }
    }
}

impl Add for Vec2 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

/// 3D vector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };
    pub const X: Self = Self::new(1.0, 0.0, 0.0);
    pub const Y: Self = Self::new(0.0, 1.0, 0.0);
    pub const Z: Self = Self::new(0.0, 0.0, 1.0);

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn dot(self, rhs: Self) -> f32 {
        self.x * rhs.x + self.y * rhs.y + self.z * rhs.z
    }

    pub fn cross(self, rhs: Self) -> Self {
        Self::new(
            self.y * rhs.z - self.z * rhs.y,
            self.z * rhs.x - self.x * rhs.z,
            self.x * rhs.y - self.y * rhs.x,
        )
    }

    pub fn len_sq(self) -> f32 {
        self.dot(self)
    }

    pub fn len(self) -> f32 {
        self.len_sq().sqrt()
    }

    pub fn distance(self, other: Self) -> f32 {
        (other - self).len()
    }

    /// Linear interpolation; `t` is clamped to `[0, 1]`.
    pub fn lerp(self, to: Self, t: f32) -> Self {
        let t = t.clamp(0.0, 1.0);
        Self::new(
            self.x + (to.x - self.x) * t,
            self.y + (to.y - self.y) * t,
            self.z + (to.z - self.z) * t,
        )
    }
}

impl Add for Vec3 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl AddAssign for Vec3 {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for Vec3 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f32> for Vec3 {
    type Output = Self;

    fn mul(self, s: f32) -> Self {
        Self::new(self.x * s, self.y * s, self.z * s)
    }
}

/// Unit quaternion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quat {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Default for Quat {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Quat {
    pub const IDENTITY: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
        w: 1.0,
    };

    pub const fn from_xyzw(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w }
    }

    /// Rotation of `angle` radians about a unit `axis`.
    pub fn from_axis_angle(axis: Vec3, angle: f32) -> Self {
        let (s, c) = (angle * 0.5).sin_cos();
        Self::from_xyzw(axis.x * s, axis.y * s, axis.z * s, c)
    }

    pub fn from_rotation_y(angle: f32) -> Self {
        Self::from_axis_angle(Vec3::Y, angle)
    }

    pub fn from_rotation_x(angle: f32) -> Self {
        Self::from_axis_angle(Vec3::X, angle)
    }

    pub fn dot(self, rhs: Self) -> f32 {
        self.x * rhs.x + self.y * rhs.y + self.z * rhs.z + self.w * rhs.w
    }

    pub fn len(self) -> f32 {
        self.dot(self).sqrt()
    }

    /// Returns a unit quaternion; degenerate input collapses to identity.
    pub fn normalize(self) -> Self {
        let len = self.len();
        if len <= f32::EPSILON || !len.is_finite() {
            return Self::IDENTITY;
        }
        Self::from_xyzw(self.x / len, self.y / len, self.z / len, self.w / len)
    }

    /// Rotates a vector by this quaternion.
    pub fn rotate(self, v: Vec3) -> Vec3 {
        let q = Vec3::new(self.x, self.y, self.z);
        let t = q.cross(v) * 2.0;
        v + t * self.w + q.cross(t)
    }

    /// Angle in radians between two orientations.
    pub fn angle_between(self, other: Self) -> f32 {
        let d = self.dot(other).abs().min(1.0);
        2.0 * d.acos()
    }

    /// Spherical linear interpolation along the shortest arc; `t` is
    /// clamped to `[0, 1]`.
    pub fn slerp(self, to: Self, t: f32) -> Self {
        let t = t.clamp(0.0, 1.0);
        let mut to = to;
        let mut cos = self.dot(to);
        if cos < 0.0 {
            to = Self::from_xyzw(-to.x, -to.y, -to.z, -to.w);
            cos = -cos;
        }

        // Nearly parallel: fall back to normalized lerp.
        if cos > 0.9995 {
            return Self::from_xyzw(
                self.x + (to.x - self.x) * t,
                self.y + (to.y - self.y) * t,
                self.z + (to.z - self.z) * t,
                self.w + (to.w - self.w) * t,
            )
            .normalize();
        }

        let theta = cos.acos();
        let sin = theta.sin();
        let a = ((1.0 - t) * theta).sin() / sin;
        let b = (t * theta).sin() / sin;
        Self::from_xyzw(
            self.x * a + to.x * b,
            self.y * a + to.y * b,
            self.z * a + to.z * b,
            self.w * a + to.w * b,
        )
        .normalize()
    }
}

impl Mul for Quat {
    type Output = Self;

    /// Hamilton product: `self * rhs` applies `rhs` first.
    fn mul(self, rhs: Self) -> Self {
        Self::from_xyzw(
            self.w * rhs.x + self.x * rhs.w + self.y * rhs.z - self.z * rhs.y,
            self.w * rhs.y - self.x * rhs.z + self.y * rhs.w + self.z * rhs.x,
            self.w * rhs.z + self.x * rhs.y - self.y * rhs.x + self.z * rhs.w,
            self.w * rhs.w - self.x * rhs.x - self.y * rhs.y - self.z * rhs.z,
        )
    }
}

impl Mul<Vec3> for Quat {
    type Output = Vec3;

    fn mul(self, v: Vec3) -> Vec3 {
        self.rotate(v)
    }
}

/// Spatial placement of an avatar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Pose {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Pose {
    pub const fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    pub const fn at(position: Vec3) -> Self {
        Self {
            position,
            rotation: Quat::IDENTITY,
        }
    }

    /// Transforms a direction from local space into world space.
    pub fn transform_direction(&self, local: Vec3) -> Vec3 {
        self.rotation.rotate(local)
    }

    /// Rotates about the local Y axis (yaw).
    pub fn rotate_local_y(&mut self, angle: f32) {
        self.rotation = (self.rotation * Quat::from_rotation_y(angle)).normalize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-5;

    fn approx(a: Vec3, b: Vec3) -> bool {
        a.distance(b) < EPS
    }

    #[test]
    fn vec3_lerp_midpoint() {
        let a = Vec3::new(0.0, 0.0, 0.0);
        let b = Vec3::new(2.0, 4.0, 6.0);
        let mid = a.lerp(b, 0.5);
        assert_eq!(mid, Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn vec3_lerp_clamps_past_target() {
        let a = Vec3::ZERO;
        let b = Vec3::new(1.0, 1.0, 1.0);
        assert_eq!(a.lerp(b, 3.0), b);
    }

    #[test]
    fn quarter_turn_about_y_maps_forward_to_right() {
        let q = Quat::from_rotation_y(std::f32::consts::FRAC_PI_2);
        assert!(approx(q * Vec3::Z, Vec3::X));
    }

    #[test]
    fn slerp_halfway_is_half_the_angle() {
        let a = Quat::IDENTITY;
        let b = Quat::from_rotation_y(std::f32::consts::FRAC_PI_2);
        let mid = a.slerp(b, 0.5);
        let expected = Quat::from_rotation_y(std::f32::consts::FRAC_PI_4);
        assert!(mid.angle_between(expected) < 1e-3);
    }

    #[test]
    fn slerp_takes_shortest_arc() {
        let a = Quat::IDENTITY;
        let b = Quat::from_rotation_y(0.2);
        let flipped = Quat::from_xyzw(-b.x, -b.y, -b.z, -b.w);
        let r = a.slerp(flipped, 1.0);
        assert!(r.angle_between(b) < 1e-3);
    }

    #[test]
    fn normalize_degenerate_is_identity() {
        assert_eq!(Quat::from_xyzw(0.0, 0.0, 0.0, 0.0).normalize(), Quat::IDENTITY);
    }

    #[test]
    fn normalize_or_zero_handles_zero() {
        assert_eq!(Vec2::ZERO.normalize_or_zero(), Vec2::ZERO);
        let n = Vec2::new(3.0, 4.0).normalize_or_zero();
        assert!((n.len() - 1.0).abs() < EPS);
    }
}
