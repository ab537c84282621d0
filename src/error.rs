//! Error type shared by every fallible operation in the crate.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// An axis is not strictly increasing, or its bounds or length are not
    /// finite.
    #[error("invalid {axis} bounds: min {min} must be finite and strictly less than max {max}")]
    InvalidBounds { axis: char, min: f64, max: f64 },

    /// A grid dimension is zero.
    #[error("invalid resolution {cols}x{rows}: both dimensions must be at least 1")]
    InvalidResolution { cols: usize, rows: usize },

    #[error("iteration budget must be at least 1")]
    InvalidIterations,

    #[error("invalid power {0}: must be at least 2")]
    InvalidPower(u32),

    #[error("unknown set {0:?}: expected mandelbrot, julia or multibrot")]
    UnknownSet(String),

    /// `step()` was called on a session that already reached a terminal state.
    #[error("session is complete at iteration {iteration}")]
    SessionComplete { iteration: u32 },

    #[error("worker thread disconnected")]
    WorkerDisconnected,

    /// A worker panicked while solving its part; that worker has exited.
    #[error("worker thread panicked")]
    WorkerPanicked,

    /// Parts handed to a join do not belong together.
    #[error("cannot join parts: {0}")]
    JoinMismatch(String),
}

pub type Result<T> = std::result::Result<T, Error>;
