//! Scene collider snapshot.
//!
//! The solver never talks to a scene graph. Each frame it asks an injected
//! [`ColliderProvider`] for the live obstacle geometry and flattens it into
//! [`ColliderData`] descriptors consumed by the position-update pass.
//! Colliders may move, so the snapshot is rebuilt every frame.

use bytemuck::{Pod, Zeroable};
use glam::Vec2;

pub const COLLIDER_KIND_BOX: u32 = 0;
pub const COLLIDER_KIND_CIRCLE: u32 = 1;

/// Flat collider descriptor: `{position, size, rotation, kind}`.
///
/// Boxes use `size` as full extents and `rotation` in radians; circles
/// fold their radius into `size` as a diameter and ignore `rotation`.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct ColliderData {
    pub position: [f32; 2],
    pub size: [f32; 2],
    pub rotation: f32,
    pub kind: u32,
}

impl ColliderData {
    pub fn rect(centre: Vec2, size: Vec2, rotation: f32) -> Self {
        Self {
            position: centre.to_array(),
            size: size.to_array(),
            rotation,
            kind: COLLIDER_KIND_BOX,
        }
    }

    pub fn circle(centre: Vec2, radius: f32) -> Self {
        Self {
            position: centre.to_array(),
            size: [radius * 2.0, radius * 2.0],
            rotation: 0.0,
            kind: COLLIDER_KIND_CIRCLE,
        }
    }

    fn is_well_formed(&self) -> bool {
        let finite = self.position.iter().chain(&self.size).all(|v| v.is_finite())
            && self.rotation.is_finite();
        finite && self.size[0] > 0.0 && self.size[1] > 0.0
    }

    /// Signed distance from `point` to the collider surface (negative
    /// inside) and the outward surface direction. Rotated boxes project
    /// the point into the box frame, resolve against the half-extent AABB,
    /// and rotate the direction back; a point with no usable direction
    /// (circle centre) falls back to the canonical `+Y` axis.
    pub fn surface_distance(&self, point: Vec2) -> (f32, Vec2) {
        let offset = point - Vec2::from_array(self.position);

        if self.kind == COLLIDER_KIND_CIRCLE {
            let radius = self.size[0] * 0.5;
            let dst = offset.length();
            let dir = if dst > f32::EPSILON { offset / dst } else { Vec2::Y };
            return (dst - radius, dir);
        }

        let local = Vec2::from_angle(-self.rotation).rotate(offset);
        let half = Vec2::from_array(self.size) * 0.5;
        let d = local.abs() - half;

        let (dist, dir_local) = if d.x > 0.0 || d.y > 0.0 {
            // outside: direction away from the closest surface point
            let closest = local.clamp(-half, half);
            let away = local - closest;
            let dst = away.length();
            let dir = if dst > f32::EPSILON { away / dst } else { Vec2::Y };
            (dst, dir)
        } else if d.x > d.y {
            // inside: push out along the axis of least penetration
            (d.x, Vec2::new(local.x.signum(), 0.0))
        } else {
            (d.y, Vec2::new(0.0, local.y.signum()))
        };

        (dist, Vec2::from_angle(self.rotation).rotate(dir_local))
    }
}

/// Capability the host implements to feed obstacle geometry into the
/// solver. Queried exactly once per frame.
pub trait ColliderProvider {
    /// Append the currently active colliders to `out`.
    fn colliders(&self, out: &mut Vec<ColliderData>);
}

/// No scene colliders.
impl ColliderProvider for () {
    fn colliders(&self, _out: &mut Vec<ColliderData>) {}
}

impl ColliderProvider for [ColliderData] {
    fn colliders(&self, out: &mut Vec<ColliderData>) {
        out.extend_from_slice(self);
    }
}

impl ColliderProvider for Vec<ColliderData> {
    fn colliders(&self, out: &mut Vec<ColliderData>) {
        out.extend_from_slice(self);
    }
}

/// The per-frame flattened collider set. Malformed descriptors (non-finite
/// fields, non-positive size) are dropped during collection rather than
/// reaching the kernels.
#[derive(Debug, Default)]
pub struct ColliderSnapshot {
    data: Vec<ColliderData>,
}

impl ColliderSnapshot {
    pub fn refresh(&mut self, provider: &dyn ColliderProvider) {
        self.data.clear();
        provider.colliders(&mut self.data);
        self.data.retain(ColliderData::is_well_formed);
    }

    pub fn colliders(&self) -> &[ColliderData] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub(crate) fn release(&mut self) {
        self.data = Vec::new();
    }
}
