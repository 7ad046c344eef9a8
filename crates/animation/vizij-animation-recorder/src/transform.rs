//! Rigid TRS transforms used for bone poses and component placement.
//!
//! Composition follows the glam convention: `a * b` applies `b` first, then `a`.
//! A component-space bone is therefore `parent * local`, and the parent-space
//! pose is recovered with [`RigidTransform::relative_to`].

use std::ops::Mul;

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

const SCALE_EPSILON: f32 = 1e-8;

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RigidTransform {
    pub translation: Vec3,
    /// Unit quaternion (x, y, z, w).
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for RigidTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl RigidTransform {
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    #[inline]
    pub fn new(translation: Vec3, rotation: Quat, scale: Vec3) -> Self {
        Self {
            translation,
            rotation,
            scale,
        }
    }

    #[inline]
    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Self::IDENTITY
        }
    }

    #[inline]
    pub fn from_rotation(rotation: Quat) -> Self {
        Self {
            rotation,
            ..Self::IDENTITY
        }
    }

    #[inline]
    pub fn from_translation_rotation(translation: Vec3, rotation: Quat) -> Self {
        Self {
            translation,
            rotation,
            scale: Vec3::ONE,
        }
    }

    /// Express `self` (component space) in the space of `parent`.
    ///
    /// Axes where the parent scale is (near) zero produce a zero scale and
    /// translation component instead of dividing by zero.
    pub fn relative_to(&self, parent: &RigidTransform) -> RigidTransform {
        let inv_scale = safe_reciprocal(parent.scale);
        let inv_rot = parent.rotation.inverse();
        RigidTransform {
            translation: (inv_rot * (self.translation - parent.translation)) * inv_scale,
            rotation: (inv_rot * self.rotation).normalize(),
            scale: self.scale * inv_scale,
        }
    }

    /// Inverse such that `t * t.inverse()` is the identity.
    #[inline]
    pub fn inverse(&self) -> RigidTransform {
        RigidTransform::IDENTITY.relative_to(self)
    }

    /// Blend two transforms with weight `alpha`.
    ///
    /// `alpha` is not clamped: values outside `[0, 1]` extrapolate.
    /// Rotation uses normalized shortest-path lerp.
    pub fn blend(a: &RigidTransform, b: &RigidTransform, alpha: f32) -> RigidTransform {
        RigidTransform {
            translation: a.translation + (b.translation - a.translation) * alpha,
            rotation: nlerp(a.rotation, b.rotation, alpha),
            scale: a.scale + (b.scale - a.scale) * alpha,
        }
    }

    /// Component-wise comparison; quaternions q and -q are treated as equal.
    pub fn approx_eq(&self, other: &RigidTransform, eps: f32) -> bool {
        let rot_dot = self.rotation.dot(other.rotation).abs();
        self.translation.abs_diff_eq(other.translation, eps)
            && self.scale.abs_diff_eq(other.scale, eps)
            && (1.0 - rot_dot) <= eps
    }

    #[inline]
    pub fn is_identity(&self, eps: f32) -> bool {
        self.approx_eq(&RigidTransform::IDENTITY, eps)
    }
}

impl Mul for RigidTransform {
    type Output = RigidTransform;

    fn mul(self, rhs: RigidTransform) -> RigidTransform {
        RigidTransform {
            translation: self.rotation * (self.scale * rhs.translation) + self.translation,
            rotation: (self.rotation * rhs.rotation).normalize(),
            scale: self.scale * rhs.scale,
        }
    }
}

impl Mul<&RigidTransform> for &RigidTransform {
    type Output = RigidTransform;

    #[inline]
    fn mul(self, rhs: &RigidTransform) -> RigidTransform {
        *self * *rhs
    }
}

fn nlerp(a: Quat, b: Quat, t: f32) -> Quat {
    let b = if a.dot(b) < 0.0 { -b } else { b };
    let q = a + (b - a) * t;
    let len_sq = q.length_squared();
    if len_sq <= f32::EPSILON {
        Quat::IDENTITY
    } else {
        q * len_sq.sqrt().recip()
    }
}

fn safe_reciprocal(v: Vec3) -> Vec3 {
    let r = |c: f32| if c.abs() <= SCALE_EPSILON { 0.0 } else { 1.0 / c };
    Vec3::new(r(v.x), r(v.y), r(v.z))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    fn sample() -> RigidTransform {
        RigidTransform::new(
            Vec3::new(1.0, 2.0, 3.0),
            Quat::from_rotation_y(0.7),
            Vec3::splat(2.0),
        )
    }

    #[test]
    fn compose_with_inverse_is_identity() {
        let t = sample();
        assert!((t * t.inverse()).is_identity(1e-5));
    }

    #[test]
    fn relative_to_undoes_parent() {
        let parent = sample();
        let local = RigidTransform::new(
            Vec3::new(0.0, 1.0, 0.0),
            Quat::from_rotation_x(FRAC_PI_2),
            Vec3::ONE,
        );
        let component = parent * local;
        assert!(component.relative_to(&parent).approx_eq(&local, 1e-5));
    }

    #[test]
    fn composition_applies_right_operand_first() {
        let parent = RigidTransform::from_rotation(Quat::from_rotation_z(FRAC_PI_2));
        let child = RigidTransform::from_translation(Vec3::X);
        let world = parent * child;
        assert!(world.translation.abs_diff_eq(Vec3::Y, 1e-6));
    }

    #[test]
    fn blend_extrapolates_beyond_one() {
        let a = RigidTransform::from_translation(Vec3::ZERO);
        let b = RigidTransform::from_translation(Vec3::new(2.0, 0.0, 0.0));
        let out = RigidTransform::blend(&a, &b, 1.5);
        assert!((out.translation.x - 3.0).abs() < 1e-6);
        let back = RigidTransform::blend(&a, &b, -0.5);
        assert!((back.translation.x + 1.0).abs() < 1e-6);
    }

    #[test]
    fn blend_takes_shortest_rotation_path() {
        let a = RigidTransform::from_rotation(Quat::IDENTITY);
        let b = RigidTransform::from_rotation(-Quat::from_rotation_y(0.2));
        let mid = RigidTransform::blend(&a, &b, 0.5);
        let expected = Quat::from_rotation_y(0.1);
        assert!(mid.rotation.dot(expected).abs() > 0.9999);
    }

    #[test]
    fn zero_parent_scale_does_not_produce_nan() {
        let parent = RigidTransform::new(Vec3::ZERO, Quat::IDENTITY, Vec3::new(0.0, 1.0, 1.0));
        let child = RigidTransform::from_translation(Vec3::ONE);
        let local = child.relative_to(&parent);
        assert!(local.translation.is_finite());
        assert_eq!(local.scale.x, 0.0);
    }
}
