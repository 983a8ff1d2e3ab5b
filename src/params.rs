use bevy::prelude::Resource;
use glam::Vec2;

use crate::error::SimError;

/// An axis-aligned rectangle given by full size and centre.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundsData {
    pub size: Vec2,
    pub centre: Vec2,
}

impl BoundsData {
    pub fn new(size: Vec2, centre: Vec2) -> Self {
        Self { size, centre }
    }

    #[inline]
    pub fn half_size(&self) -> Vec2 {
        self.size * 0.5
    }
}

/// Scalar solver configuration.
///
/// Immutable within a step; the owning controller may mutate it between
/// frames. `run_frame` re-validates before stepping so a bad mutation
/// fails fast instead of corrupting a step.
#[derive(Resource, Clone, Debug)]
pub struct SimulationParameters {
    pub time_scale: f32,
    /// Frame-rate floor: if real elapsed time corresponds to a lower rate,
    /// the sub-step dt is clamped and the simulation runs slower than
    /// real time. Zero disables the clamp.
    pub max_timestep_fps: f32,
    pub iterations_per_frame: u32,

    pub gravity: f32,
    /// Velocity retained after a boundary reflection, in [0, 1].
    pub collision_damping: f32,
    pub smoothing_radius: f32,
    pub target_density: f32,
    pub pressure_multiplier: f32,
    pub near_pressure_multiplier: f32,
    pub viscosity_strength: f32,

    pub interaction_radius: f32,
    pub interaction_strength: f32,

    pub collider_repulsion_strength: f32,
    /// Repulsion range as a fraction of the smoothing radius.
    pub collider_repulsion_radius: f32,

    pub bounds: BoundsData,
    /// Static inverse-collision rectangle; zero size disables it.
    pub obstacle: BoundsData,
}

impl Default for SimulationParameters {
    fn default() -> Self {
        Self {
            time_scale: 1.0,
            max_timestep_fps: 60.0,
            iterations_per_frame: 3,
            gravity: -9.81,
            collision_damping: 0.95,
            smoothing_radius: 0.35,
            target_density: 55.0,
            pressure_multiplier: 500.0,
            near_pressure_multiplier: 18.0,
            viscosity_strength: 0.06,
            interaction_radius: 2.0,
            interaction_strength: 90.0,
            collider_repulsion_strength: 20.0,
            collider_repulsion_radius: 0.5,
            bounds: BoundsData::new(Vec2::new(17.1, 9.3), Vec2::ZERO),
            obstacle: BoundsData::new(Vec2::ZERO, Vec2::ZERO),
        }
    }
}

impl SimulationParameters {
    pub fn validate(&self) -> Result<(), SimError> {
        if !(self.smoothing_radius > 0.0 && self.smoothing_radius.is_finite()) {
            return Err(SimError::InvalidSmoothingRadius(self.smoothing_radius));
        }
        if self.iterations_per_frame == 0 {
            return Err(SimError::InvalidIterations);
        }
        Ok(())
    }
}
