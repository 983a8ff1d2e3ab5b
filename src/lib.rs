//! Real-time 2D smoothed-particle-hydrodynamics on the CPU.
//!
//! A fixed particle population advances each sub-step through a pipeline
//! of data-parallel transforms: external forces, spatial binning with a
//! counting-sort hash, neighbor-ordered density/pressure/viscosity, and
//! position integration with boundary and collider resolution.
//!
//! - [`params`]: solver configuration
//! - [`spawner`]: deterministic jittered-grid initial placement
//! - [`buffers`]: column-oriented particle state
//! - [`spatial`]: counting-sort spatial hash for neighbor search
//! - [`kernels`]: smoothing kernels
//! - [`colliders`]: scene collider snapshot and provider capability
//! - [`pipeline`]: the per-sub-step transform passes
//! - [`sim2d`]: the owning orchestrator
//! - [`parallel`]: fork-join pass dispatch

pub mod buffers;
pub mod colliders;
pub mod error;
pub mod kernels;
pub mod parallel;
pub mod params;
pub mod pipeline;
pub mod sim2d;
pub mod spatial;
pub mod spawner;

pub mod prelude {
    pub use crate::buffers::ParticleBuffers;
    pub use crate::colliders::{
        COLLIDER_KIND_BOX, COLLIDER_KIND_CIRCLE, ColliderData, ColliderProvider,
    };
    pub use crate::error::SimError;
    pub use crate::kernels::KernelScales;
    pub use crate::params::{BoundsData, SimulationParameters};
    pub use crate::sim2d::{FluidSim2D, FrameInput};
    pub use crate::spawner::{ParticleSpawnData, Spawner2D};
}
