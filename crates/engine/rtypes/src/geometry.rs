//! Geometric value types
//!
//! `Vector2` and `Vector3` are plain `glam` vectors. The types here add the
//! engine-specific shapes on top: coordinate frames, colors, UI dimensions
//! and ranges.

use crate::{Error, Result};
use glam::{Mat3, Quat, Vec3};
use std::fmt;

/// A position and rotation in 3D space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CFrame {
    pub position: Vec3,
    /// Orthonormal rotation; columns are the right, up and back vectors
    pub rotation: Mat3,
}

impl Default for CFrame {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl CFrame {
    pub const IDENTITY: CFrame = CFrame {
        position: Vec3::ZERO,
        rotation: Mat3::IDENTITY,
    };

    /// A translation with no rotation
    pub fn new(position: Vec3) -> Self {
        Self {
            position,
            rotation: Mat3::IDENTITY,
        }
    }

    /// Build from `X, Y, Z, R00, R01, R02, R10, R11, R12, R20, R21, R22`
    ///
    /// The rotation components are given row by row.
    pub fn from_components(c: [f32; 12]) -> Self {
        Self {
            position: Vec3::new(c[0], c[1], c[2]),
            rotation: Mat3::from_cols(
                Vec3::new(c[3], c[6], c[9]),
                Vec3::new(c[4], c[7], c[10]),
                Vec3::new(c[5], c[8], c[11]),
            ),
        }
    }

    /// The twelve components in the order accepted by [`CFrame::from_components`]
    pub fn components(&self) -> [f32; 12] {
        let (p, m) = (self.position, self.rotation);
        [
            p.x, p.y, p.z, m.x_axis.x, m.y_axis.x, m.z_axis.x, m.x_axis.y, m.y_axis.y,
            m.z_axis.y, m.x_axis.z, m.y_axis.z, m.z_axis.z,
        ]
    }

    /// Rotation applying X, then Y, then Z, in radians
    pub fn from_euler_xyz(rx: f32, ry: f32, rz: f32) -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Mat3::from_rotation_x(rx) * Mat3::from_rotation_y(ry) * Mat3::from_rotation_z(rz),
        }
    }

    /// A frame at `eye` facing `target`
    pub fn look_at(eye: Vec3, target: Vec3) -> Self {
        let look = (target - eye).normalize_or_zero();
        if look == Vec3::ZERO {
            return Self::new(eye);
        }
        let mut right = look.cross(Vec3::Y);
        if right.length_squared() < 1e-10 {
            right = look.cross(Vec3::Z);
        }
        let right = right.normalize();
        let up = right.cross(look);
        Self {
            position: eye,
            rotation: Mat3::from_cols(right, up, -look),
        }
    }

    pub fn right_vector(&self) -> Vec3 {
        self.rotation.x_axis
    }

    pub fn up_vector(&self) -> Vec3 {
        self.rotation.y_axis
    }

    pub fn look_vector(&self) -> Vec3 {
        -self.rotation.z_axis
    }

    pub fn inverse(&self) -> Self {
        let rotation = self.rotation.transpose();
        Self {
            position: -(rotation * self.position),
            rotation,
        }
    }

    /// Compose two frames
    pub fn mul(&self, other: &CFrame) -> Self {
        Self {
            position: self.rotation * other.position + self.position,
            rotation: self.rotation * other.rotation,
        }
    }

    /// Transform a point from object space to world space
    pub fn point_to_world(&self, point: Vec3) -> Vec3 {
        self.rotation * point + self.position
    }

    /// Transform a point from world space to object space
    pub fn point_to_object(&self, point: Vec3) -> Vec3 {
        self.inverse().point_to_world(point)
    }

    /// Interpolate position linearly and rotation spherically
    pub fn lerp(&self, goal: &CFrame, alpha: f32) -> Self {
        let from = Quat::from_mat3(&self.rotation);
        let to = Quat::from_mat3(&goal.rotation);
        Self {
            position: self.position.lerp(goal.position, alpha),
            rotation: Mat3::from_quat(from.slerp(to, alpha)),
        }
    }

    /// Component-wise comparison within `epsilon`
    pub fn fuzzy_eq(&self, other: &CFrame, epsilon: f32) -> bool {
        self.components()
            .iter()
            .zip(other.components().iter())
            .all(|(a, b)| (a - b).abs() <= epsilon)
    }
}

impl fmt::Display for CFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.components().iter().map(|c| c.to_string()).collect();
        write!(f, "{}", parts.join(", "))
    }
}

/// An RGB color with components in 0..1
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Color3 {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color3 {
    pub fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Build from 0..255 channel values
    pub fn from_rgb(r: f32, g: f32, b: f32) -> Self {
        Self::new(r / 255.0, g / 255.0, b / 255.0)
    }

    /// Build from hue, saturation and value in 0..1
    pub fn from_hsv(h: f32, s: f32, v: f32) -> Self {
        let h = (h.rem_euclid(1.0)) * 6.0;
        let sector = h.floor();
        let f = h - sector;
        let p = v * (1.0 - s);
        let q = v * (1.0 - s * f);
        let t = v * (1.0 - s * (1.0 - f));
        match sector as i32 {
            0 => Self::new(v, t, p),
            1 => Self::new(q, v, p),
            2 => Self::new(p, v, t),
            3 => Self::new(p, q, v),
            4 => Self::new(t, p, v),
            _ => Self::new(v, p, q),
        }
    }

    /// Hue, saturation and value in 0..1
    pub fn to_hsv(&self) -> (f32, f32, f32) {
        let max = self.r.max(self.g).max(self.b);
        let min = self.r.min(self.g).min(self.b);
        let delta = max - min;
        let s = if max > 0.0 { delta / max } else { 0.0 };
        if delta == 0.0 {
            return (0.0, s, max);
        }
        let h = if max == self.r {
            ((self.g - self.b) / delta).rem_euclid(6.0)
        } else if max == self.g {
            (self.b - self.r) / delta + 2.0
        } else {
            (self.r - self.g) / delta + 4.0
        };
        (h / 6.0, s, max)
    }

    pub fn lerp(&self, goal: &Color3, alpha: f32) -> Self {
        Self::new(
            self.r + (goal.r - self.r) * alpha,
            self.g + (goal.g - self.g) * alpha,
            self.b + (goal.b - self.b) * alpha,
        )
    }
}

impl fmt::Display for Color3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}, {}", self.r, self.g, self.b)
    }
}

/// One axis of a UI dimension
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct UDim {
    pub scale: f32,
    pub offset: i32,
}

impl UDim {
    pub fn new(scale: f32, offset: i32) -> Self {
        Self { scale, offset }
    }

    pub fn add(&self, other: &UDim) -> Self {
        Self::new(self.scale + other.scale, self.offset.wrapping_add(other.offset))
    }

    pub fn sub(&self, other: &UDim) -> Self {
        Self::new(self.scale - other.scale, self.offset.wrapping_sub(other.offset))
    }

    pub fn neg(&self) -> Self {
        Self::new(-self.scale, self.offset.wrapping_neg())
    }

    pub fn lerp(&self, goal: &UDim, alpha: f32) -> Self {
        Self::new(
            self.scale + (goal.scale - self.scale) * alpha,
            (self.offset as f32 + (goal.offset - self.offset) as f32 * alpha).round() as i32,
        )
    }
}

impl fmt::Display for UDim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", self.scale, self.offset)
    }
}

/// A two-axis UI dimension
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct UDim2 {
    pub x: UDim,
    pub y: UDim,
}

impl UDim2 {
    pub fn new(x: UDim, y: UDim) -> Self {
        Self { x, y }
    }

    pub fn from_scale(x: f32, y: f32) -> Self {
        Self::new(UDim::new(x, 0), UDim::new(y, 0))
    }

    pub fn from_offset(x: i32, y: i32) -> Self {
        Self::new(UDim::new(0.0, x), UDim::new(0.0, y))
    }

    pub fn add(&self, other: &UDim2) -> Self {
        Self::new(self.x.add(&other.x), self.y.add(&other.y))
    }

    pub fn sub(&self, other: &UDim2) -> Self {
        Self::new(self.x.sub(&other.x), self.y.sub(&other.y))
    }

    pub fn neg(&self) -> Self {
        Self::new(self.x.neg(), self.y.neg())
    }

    pub fn lerp(&self, goal: &UDim2, alpha: f32) -> Self {
        Self::new(self.x.lerp(&goal.x, alpha), self.y.lerp(&goal.y, alpha))
    }
}

impl fmt::Display for UDim2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}}, {{{}}}", self.x, self.y)
    }
}

/// An inclusive range of numbers
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct NumberRange {
    pub min: f32,
    pub max: f32,
}

impl NumberRange {
    /// Create a range; `min` must not exceed `max`
    pub fn new(min: f32, max: f32) -> Result<Self> {
        if min > max {
            return Err(Error::InvalidValue(format!(
                "NumberRange minimum {} is larger than maximum {}",
                min, max
            )));
        }
        Ok(Self { min, max })
    }
}

impl fmt::Display for NumberRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.min, self.max)
    }
}
