//! The per-sub-step transform pipeline.
//!
//! Each pass is a function over slices: inputs are immutable, every
//! particle writes only its own slot, and the dispatch goes through
//! [`parallel`]. Passes are strictly ordered by the caller; rayon's
//! fork-join joins are the inter-pass barriers.
//!
//! The neighbor-dense passes (density, pressure, viscosity) run in
//! sorted-slot space: the caller has already permuted the particle arrays
//! with [`ParticleBuffers::reorder`](crate::buffers::ParticleBuffers), so a
//! candidate slot indexes the arrays directly and neighbor data is
//! contiguous in memory.

use glam::Vec2;

use crate::colliders::ColliderData;
use crate::kernels::KernelScales;
use crate::parallel;
use crate::params::SimulationParameters;
use crate::spatial::SpatialHash;

/// Pointer interaction resolved for the current frame: signed strength
/// (pull positive, push negative), zero when inactive.
#[derive(Clone, Copy, Debug, Default)]
pub struct InteractionState {
    pub point: Vec2,
    pub strength: f32,
    pub radius: f32,
}

/// Gravity plus the pointer interaction, then velocity integration into
/// the predicted position used by neighbor search and pressure.
pub fn external_forces(
    positions: &[Vec2],
    velocities: &mut [Vec2],
    predicted: &mut [Vec2],
    params: &SimulationParameters,
    interaction: InteractionState,
    dt: f32,
) {
    let gravity_accel = Vec2::new(0.0, params.gravity);
    parallel::for_each_pair(velocities, predicted, |i, vel, pred| {
        let pos = positions[i];
        *vel += interaction_accel(pos, *vel, gravity_accel, interaction) * dt;
        *pred = pos + *vel * dt;
    });
}

/// Radial pull/push attenuated toward the interaction circle's edge.
/// Gravity fades and velocity is damped near the centre so grabbed fluid
/// does not slingshot.
fn interaction_accel(pos: Vec2, vel: Vec2, gravity_accel: Vec2, input: InteractionState) -> Vec2 {
    if input.strength == 0.0 {
        return gravity_accel;
    }
    let offset = input.point - pos;
    let sqr_dst = offset.length_squared();
    if sqr_dst >= input.radius * input.radius {
        return gravity_accel;
    }

    let dst = sqr_dst.sqrt();
    let edge_t = dst / input.radius;
    let centre_t = 1.0 - edge_t;
    let dir = if dst > f32::EPSILON { offset / dst } else { Vec2::ZERO };

    let gravity_weight = 1.0 - centre_t * (input.strength / 10.0).clamp(0.0, 1.0);
    gravity_accel * gravity_weight + dir * (centre_t * input.strength) - vel * centre_t
}

/// Kernel-weighted density and near-density over the neighborhood,
/// self included — an isolated particle keeps the Poly6 self floor, so
/// downstream divisions never see zero.
pub fn density(
    predicted: &[Vec2],
    densities: &mut [Vec2],
    hash: &SpatialHash,
    scales: &KernelScales,
) {
    parallel::for_each_indexed(densities, |slot, out| {
        let pos = predicted[slot];
        let mut density = 0.0;
        let mut near_density = 0.0;
        hash.for_each_candidate(pos, scales.radius, |j| {
            let sqr_dst = predicted[j].distance_squared(pos);
            if sqr_dst <= scales.sqr_radius {
                let dst = sqr_dst.sqrt();
                density += scales.poly6(dst);
                near_density += scales.spiky_pow2(dst);
            }
        });
        *out = Vec2::new(density, near_density);
    });
}

#[inline]
fn pressure_of(density: f32, params: &SimulationParameters) -> f32 {
    (density - params.target_density) * params.pressure_multiplier
}

/// Symmetric pressure-gradient force from the linear equation of state,
/// integrated into velocity. Neighbor contributions are weighted by the
/// mean of both pressures and divided by the neighbor's density.
pub fn pressure(
    predicted: &[Vec2],
    densities: &[Vec2],
    velocities: &mut [Vec2],
    hash: &SpatialHash,
    scales: &KernelScales,
    params: &SimulationParameters,
    dt: f32,
) {
    parallel::for_each_indexed(velocities, |slot, vel| {
        let pos = predicted[slot];
        let density = densities[slot].x;
        let near_density = densities[slot].y;
        let pressure = pressure_of(density, params);
        let near_pressure = params.near_pressure_multiplier * near_density;

        let mut force = Vec2::ZERO;
        hash.for_each_candidate(pos, scales.radius, |j| {
            if j == slot {
                return;
            }
            let offset = predicted[j] - pos;
            let sqr_dst = offset.length_squared();
            if sqr_dst > scales.sqr_radius {
                return;
            }

            let dst = sqr_dst.sqrt();
            // coincident pair: canonical fallback axis
            let dir = if dst > 0.0 { offset / dst } else { Vec2::Y };

            let neighbor_density = densities[j].x;
            let neighbor_near = densities[j].y;
            let shared_pressure = (pressure + pressure_of(neighbor_density, params)) * 0.5;
            let shared_near =
                (near_pressure + params.near_pressure_multiplier * neighbor_near) * 0.5;

            force += dir
                * (scales.spiky_pow3_derivative(dst) * shared_pressure / neighbor_density);
            force += dir * (scales.spiky_pow2_derivative(dst) * shared_near / neighbor_near);
        });

        *vel += force / density * dt;
    });
}

/// Velocity-difference smoothing between close particles. Reads a
/// velocity snapshot and writes `out`; the caller commits by swapping.
pub fn viscosity(
    predicted: &[Vec2],
    velocities: &[Vec2],
    out: &mut [Vec2],
    hash: &SpatialHash,
    scales: &KernelScales,
    params: &SimulationParameters,
    dt: f32,
) {
    parallel::fill_indexed(out, |slot| {
        let pos = predicted[slot];
        let vel = velocities[slot];
        let mut force = Vec2::ZERO;
        hash.for_each_candidate(pos, scales.radius, |j| {
            if j == slot {
                return;
            }
            let sqr_dst = predicted[j].distance_squared(pos);
            if sqr_dst <= scales.sqr_radius {
                force += (velocities[j] - vel) * scales.poly6(sqr_dst.sqrt());
            }
        });
        vel + force * params.viscosity_strength * dt
    });
}

/// Collider repulsion, position integration, and boundary resolution.
/// Runs in original index order, after copyback.
pub fn update_positions(
    positions: &mut [Vec2],
    velocities: &mut [Vec2],
    colliders: &[ColliderData],
    params: &SimulationParameters,
    dt: f32,
) {
    let repulsion_range = params.collider_repulsion_radius * params.smoothing_radius;
    let apply_repulsion =
        !colliders.is_empty() && params.collider_repulsion_strength != 0.0 && repulsion_range > 0.0;

    parallel::for_each_pair(positions, velocities, |_, pos, vel| {
        if apply_repulsion {
            let mut repulsion = Vec2::ZERO;
            // overlapping colliders all contribute, no early exit
            for collider in colliders {
                let (dist, dir) = collider.surface_distance(*pos);
                if dist < repulsion_range {
                    let falloff = 1.0 - dist.max(0.0) / repulsion_range;
                    repulsion += dir * (params.collider_repulsion_strength * falloff);
                }
            }
            *vel += repulsion * dt;
        }

        *pos += *vel * dt;
        resolve_bounds(pos, vel, params);
        resolve_obstacle(pos, vel, params);
    });
}

fn resolve_bounds(pos: &mut Vec2, vel: &mut Vec2, params: &SimulationParameters) {
    let half = params.bounds.half_size();
    let centre = params.bounds.centre;
    let local = *pos - centre;

    if local.x.abs() > half.x {
        pos.x = centre.x + half.x * local.x.signum();
        vel.x *= -params.collision_damping;
    }
    if local.y.abs() > half.y {
        pos.y = centre.y + half.y * local.y.signum();
        vel.y *= -params.collision_damping;
    }
}

/// Inverse collision: a particle inside the obstacle rectangle is pushed
/// out along the axis of least penetration.
fn resolve_obstacle(pos: &mut Vec2, vel: &mut Vec2, params: &SimulationParameters) {
    let half = params.obstacle.half_size();
    if half.x <= 0.0 || half.y <= 0.0 {
        return;
    }
    let centre = params.obstacle.centre;
    let local = *pos - centre;
    let edge_dst = half - local.abs();

    if edge_dst.x >= 0.0 && edge_dst.y >= 0.0 {
        if edge_dst.x < edge_dst.y {
            pos.x = centre.x + half.x * local.x.signum();
            vel.x *= -params.collision_damping;
        } else {
            pos.y = centre.y + half.y * local.y.signum();
            vel.y *= -params.collision_damping;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::BoundsData;

    fn still_params() -> SimulationParameters {
        SimulationParameters {
            gravity: 0.0,
            target_density: 0.0,
            pressure_multiplier: 0.0,
            near_pressure_multiplier: 0.0,
            viscosity_strength: 0.0,
            bounds: BoundsData::new(Vec2::splat(100.0), Vec2::ZERO),
            ..Default::default()
        }
    }

    #[test]
    fn gravity_integrates_into_velocity_and_prediction() {
        let params = SimulationParameters {
            gravity: -10.0,
            ..still_params()
        };
        let positions = vec![Vec2::ZERO];
        let mut velocities = vec![Vec2::ZERO];
        let mut predicted = vec![Vec2::ZERO];

        external_forces(
            &positions,
            &mut velocities,
            &mut predicted,
            &params,
            InteractionState::default(),
            0.1,
        );

        assert!((velocities[0].y + 1.0).abs() < 1e-6);
        assert!((predicted[0].y + 0.1).abs() < 1e-6);
    }

    #[test]
    fn pull_interaction_accelerates_toward_point() {
        let params = still_params();
        let interaction = InteractionState {
            point: Vec2::new(1.0, 0.0),
            strength: 50.0,
            radius: 3.0,
        };
        let positions = vec![Vec2::ZERO];
        let mut velocities = vec![Vec2::ZERO];
        let mut predicted = vec![Vec2::ZERO];

        external_forces(
            &positions,
            &mut velocities,
            &mut predicted,
            &params,
            interaction,
            0.01,
        );
        assert!(velocities[0].x > 0.0);
        assert_eq!(velocities[0].y, 0.0);
    }

    #[test]
    fn interaction_outside_radius_is_inert() {
        let params = still_params();
        let interaction = InteractionState {
            point: Vec2::new(10.0, 0.0),
            strength: 50.0,
            radius: 1.0,
        };
        let positions = vec![Vec2::ZERO];
        let mut velocities = vec![Vec2::ZERO];
        let mut predicted = vec![Vec2::ZERO];

        external_forces(
            &positions,
            &mut velocities,
            &mut predicted,
            &params,
            interaction,
            0.01,
        );
        assert_eq!(velocities[0], Vec2::ZERO);
    }

    #[test]
    fn coincident_pair_pressure_resolves_to_canonical_axis() {
        let params = SimulationParameters {
            pressure_multiplier: 100.0,
            target_density: 0.0,
            ..still_params()
        };
        let scales = KernelScales::new(params.smoothing_radius);
        let predicted = vec![Vec2::ZERO, Vec2::ZERO];
        let mut hash = SpatialHash::new(2);
        hash.update(&predicted, scales.radius);

        let mut densities = vec![Vec2::ZERO; 2];
        density(&predicted, &mut densities, &hash, &scales);

        let mut velocities = vec![Vec2::ZERO; 2];
        pressure(
            &predicted,
            &densities,
            &mut velocities,
            &hash,
            &scales,
            &params,
            0.01,
        );

        // finite, and pushed along ±y only
        for vel in &velocities {
            assert!(vel.is_finite());
            assert_eq!(vel.x, 0.0);
            assert_ne!(vel.y, 0.0);
        }
    }

    #[test]
    fn viscosity_contracts_relative_motion() {
        let params = SimulationParameters {
            viscosity_strength: 0.5,
            ..still_params()
        };
        let scales = KernelScales::new(1.0);
        let predicted = vec![Vec2::ZERO, Vec2::new(0.2, 0.0)];
        let mut hash = SpatialHash::new(2);
        hash.update(&predicted, scales.radius);

        let velocities = vec![Vec2::new(1.0, 0.0), Vec2::new(-1.0, 0.0)];
        let mut out = vec![Vec2::ZERO; 2];
        viscosity(&predicted, &velocities, &mut out, &hash, &scales, &params, 0.1);

        let before = (velocities[0] - velocities[1]).length();
        let after = (out[0] - out[1]).length();
        assert!(after < before);
    }

    #[test]
    fn obstacle_pushes_inside_particle_out() {
        let params = SimulationParameters {
            obstacle: BoundsData::new(Vec2::new(2.0, 2.0), Vec2::ZERO),
            ..still_params()
        };
        let mut positions = vec![Vec2::new(0.8, 0.1)];
        let mut velocities = vec![Vec2::ZERO];

        update_positions(&mut positions, &mut velocities, &[], &params, 0.0);
        // nearest face is +x
        assert!((positions[0].x - 1.0).abs() < 1e-6);
        assert!((positions[0].y - 0.1).abs() < 1e-6);
    }
}
