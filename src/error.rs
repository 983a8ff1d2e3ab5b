use thiserror::Error;

/// Failures surfaced at the init/step boundary.
///
/// Numerical edge cases inside a pass (coincident particles, zero-length
/// directions) are recovered locally and never reach this type; a caller
/// only ever observes a fully advanced step or one of these.
#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum SimError {
    #[error("smoothing radius must be positive and finite, got {0}")]
    InvalidSmoothingRadius(f32),

    #[error("cannot simulate an empty particle set")]
    NoParticles,

    #[error("iterations per frame must be at least 1")]
    InvalidIterations,

    #[error("simulation buffers have been released")]
    Released,
}
