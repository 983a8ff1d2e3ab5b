//! Simulation orchestration.
//!
//! [`FluidSim2D`] owns all mutable solver state — particle buffers, the
//! spatial hash, the collider snapshot, parameters — and advances it
//! through the transform pipeline. Lifecycle:
//! `new` (validate + allocate) → `run_frame`* → `release`; stepping a
//! released simulation fails fast.

use bevy::prelude::Resource;
use glam::Vec2;
use log::{debug, info};

use crate::buffers::ParticleBuffers;
use crate::colliders::{ColliderProvider, ColliderSnapshot};
use crate::error::SimError;
use crate::kernels::KernelScales;
use crate::params::SimulationParameters;
use crate::pipeline::{self, InteractionState};
use crate::spatial::SpatialHash;
use crate::spawner::ParticleSpawnData;

/// Per-frame pointer input. `pull` attracts fluid toward the point,
/// `push` repels; push wins when both are held.
#[derive(Clone, Copy, Debug, Default)]
pub struct FrameInput {
    pub interaction_point: Vec2,
    pub pull: bool,
    pub push: bool,
}

/// Read-only observer fired once after every completed sub-step.
pub type StepObserver = Box<dyn FnMut(&ParticleBuffers) + Send + Sync>;

#[derive(Resource)]
pub struct FluidSim2D {
    params: SimulationParameters,
    buffers: ParticleBuffers,
    spatial: SpatialHash,
    colliders: ColliderSnapshot,
    scales: KernelScales,
    interaction: InteractionState,
    observers: Vec<StepObserver>,
    steps_completed: u64,
    released: bool,
}

impl FluidSim2D {
    /// Validate the configuration and allocate every buffer, sized to the
    /// spawn data. The population is fixed from here on.
    pub fn new(
        spawn: &ParticleSpawnData,
        params: SimulationParameters,
    ) -> Result<Self, SimError> {
        params.validate()?;
        if spawn.is_empty() {
            return Err(SimError::NoParticles);
        }

        let buffers = ParticleBuffers::from_spawn_data(spawn);
        let spatial = SpatialHash::new(buffers.len());
        let scales = KernelScales::new(params.smoothing_radius);
        info!("fluid sim initialized with {} particles", buffers.len());

        Ok(Self {
            params,
            buffers,
            spatial,
            colliders: ColliderSnapshot::default(),
            scales,
            interaction: InteractionState::default(),
            observers: Vec::new(),
            steps_completed: 0,
            released: false,
        })
    }

    pub fn num_particles(&self) -> usize {
        self.buffers.len()
    }

    pub fn positions(&self) -> &[Vec2] {
        &self.buffers.positions
    }

    pub fn velocities(&self) -> &[Vec2] {
        &self.buffers.velocities
    }

    /// Per-particle (density, near-density), as of the last sub-step.
    pub fn densities(&self) -> &[Vec2] {
        &self.buffers.densities
    }

    pub fn params(&self) -> &SimulationParameters {
        &self.params
    }

    /// Parameters may be mutated freely between frames; the next
    /// `run_frame` re-validates them.
    pub fn params_mut(&mut self) -> &mut SimulationParameters {
        &mut self.params
    }

    pub fn steps_completed(&self) -> u64 {
        self.steps_completed
    }

    /// Register a step-completed observer. Observers receive read-only
    /// buffer access after every sub-step; they must not assume any
    /// particular particle motion between calls.
    pub fn on_step_completed(
        &mut self,
        observer: impl FnMut(&ParticleBuffers) + Send + Sync + 'static,
    ) {
        self.observers.push(Box::new(observer));
    }

    /// Advance one rendered frame: clamp the frame time to the configured
    /// FPS floor, refresh per-frame state once, then run
    /// `iterations_per_frame` sub-steps, notifying observers after each.
    pub fn run_frame(
        &mut self,
        elapsed: f32,
        input: FrameInput,
        provider: &dyn ColliderProvider,
    ) -> Result<(), SimError> {
        if self.released {
            return Err(SimError::Released);
        }
        self.params.validate()?;

        let max_dt = if self.params.max_timestep_fps > 0.0 {
            1.0 / self.params.max_timestep_fps
        } else {
            f32::INFINITY
        };
        let frame_dt = (elapsed * self.params.time_scale).min(max_dt);
        let dt = frame_dt / self.params.iterations_per_frame as f32;

        self.refresh_frame_state(input, provider);

        for _ in 0..self.params.iterations_per_frame {
            self.step(dt);
            self.notify_step_completed();
        }
        Ok(())
    }

    fn refresh_frame_state(&mut self, input: FrameInput, provider: &dyn ColliderProvider) {
        self.scales = KernelScales::new(self.params.smoothing_radius);

        let strength = if input.push {
            -self.params.interaction_strength
        } else if input.pull {
            self.params.interaction_strength
        } else {
            0.0
        };
        self.interaction = InteractionState {
            point: input.interaction_point,
            strength,
            radius: self.params.interaction_radius,
        };

        self.colliders.refresh(provider);
    }

    /// One sub-step of the pipeline. Pass order is load-bearing: the hash
    /// must be fully built before any neighbor pass, density before
    /// pressure, and copyback before the position update so external
    /// readers and boundary resolution see original particle identity.
    fn step(&mut self, dt: f32) {
        let bufs = &mut self.buffers;

        pipeline::external_forces(
            &bufs.positions,
            &mut bufs.velocities,
            &mut bufs.predicted_positions,
            &self.params,
            self.interaction,
            dt,
        );

        self.spatial.update(&bufs.predicted_positions, self.scales.radius);
        bufs.reorder(self.spatial.sorted_indices());

        pipeline::density(
            &bufs.predicted_positions,
            &mut bufs.densities,
            &self.spatial,
            &self.scales,
        );
        pipeline::pressure(
            &bufs.predicted_positions,
            &bufs.densities,
            &mut bufs.velocities,
            &self.spatial,
            &self.scales,
            &self.params,
            dt,
        );
        pipeline::viscosity(
            &bufs.predicted_positions,
            &bufs.velocities,
            &mut bufs.scratch_velocities,
            &self.spatial,
            &self.scales,
            &self.params,
            dt,
        );
        std::mem::swap(&mut bufs.velocities, &mut bufs.scratch_velocities);

        bufs.copyback(self.spatial.slot_of());

        pipeline::update_positions(
            &mut bufs.positions,
            &mut bufs.velocities,
            self.colliders.colliders(),
            &self.params,
            dt,
        );

        self.steps_completed += 1;
    }

    fn notify_step_completed(&mut self) {
        if self.observers.is_empty() {
            return;
        }
        // observers borrow the buffers, so take the list out for the calls;
        // any observer registered from a callback lands after the existing ones
        let mut observers = std::mem::take(&mut self.observers);
        for observer in &mut observers {
            observer(&self.buffers);
        }
        observers.append(&mut self.observers);
        self.observers = observers;
    }

    /// Free all particle, spatial, and snapshot storage. Idempotent; any
    /// later `run_frame` returns [`SimError::Released`].
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.buffers.release();
        self.spatial.release();
        self.colliders.release();
        self.observers.clear();
        debug!("fluid sim released after {} steps", self.steps_completed);
    }

    pub fn is_released(&self) -> bool {
        self.released
    }
}

impl Drop for FluidSim2D {
    fn drop(&mut self) {
        if !self.released {
            self.release();
        }
    }
}
