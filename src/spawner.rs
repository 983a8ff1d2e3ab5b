use bevy::prelude::Resource;
use glam::{UVec2, Vec2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Initial particle placement: parallel position/velocity arrays.
#[derive(Clone, Debug, Default)]
pub struct ParticleSpawnData {
    pub positions: Vec<Vec2>,
    pub velocities: Vec<Vec2>,
}

impl ParticleSpawnData {
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Deterministic jittered-grid particle source.
///
/// Lays `grid_count.x × grid_count.y` particles over a rectangle, each
/// displaced by a random direction scaled by `position_jitter`. The rng is
/// seeded, so the same configuration always spawns the same fluid.
#[derive(Resource, Clone, Debug)]
pub struct Spawner2D {
    pub region_size: Vec2,
    pub region_centre: Vec2,
    pub grid_count: UVec2,
    pub position_jitter: f32,
    pub initial_velocity: Vec2,
    pub seed: u64,
}

impl Default for Spawner2D {
    fn default() -> Self {
        Self {
            region_size: Vec2::new(5.0, 5.0),
            region_centre: Vec2::ZERO,
            grid_count: UVec2::new(10, 10),
            position_jitter: 0.1,
            initial_velocity: Vec2::ZERO,
            seed: 42,
        }
    }
}

impl Spawner2D {
    pub fn spawn_data(&self) -> ParticleSpawnData {
        let count = (self.grid_count.x * self.grid_count.y) as usize;
        let mut positions = Vec::with_capacity(count);
        let mut velocities = Vec::with_capacity(count);
        let mut rng = StdRng::seed_from_u64(self.seed);

        for y in 0..self.grid_count.y {
            for x in 0..self.grid_count.x {
                // normalized [0,1] slot; a single row/column centres at 0.5
                let tx = if self.grid_count.x > 1 {
                    x as f32 / (self.grid_count.x - 1) as f32
                } else {
                    0.5
                };
                let ty = if self.grid_count.y > 1 {
                    y as f32 / (self.grid_count.y - 1) as f32
                } else {
                    0.5
                };

                let pos = Vec2::new(
                    (tx - 0.5) * self.region_size.x + self.region_centre.x,
                    (ty - 0.5) * self.region_size.y + self.region_centre.y,
                );

                let angle = rng.gen_range(0.0..std::f32::consts::TAU);
                let jitter =
                    Vec2::from_angle(angle) * self.position_jitter * rng.gen_range(0.0..1.0);

                positions.push(pos + jitter);
                velocities.push(self.initial_velocity);
            }
        }

        ParticleSpawnData { positions, velocities }
    }
}
