use thiserror::Error;

use crate::surface::ColorSpace;

pub type Result<T> = std::result::Result<T, EngineError>;

/// Outcome of a batcher: the number of primitives published.
pub type SubmitResult = std::result::Result<usize, PartialSubmission>;

/// Failures of the command engine.
///
/// None of these are fatal to the process. `Stalled` and `IdleTimeout` bump the sticky stall
/// counter; once it reaches the ceiling every submission fails with `Wedged` until
/// [`crate::CommandEngine::reinitialize`] is called.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("engine is wedged after {stalls} stalls; reinitialize to recover")]
    Wedged { stalls: u8 },

    #[error("fetch unit stalled (stall {stalls}): needed {needed} words, {free} free")]
    Stalled { stalls: u8, needed: u32, free: u32 },

    #[error("engine did not go idle (stall {stalls})")]
    IdleTimeout { stalls: u8 },

    #[error("reservation of {words} words exceeds ring capacity {capacity}")]
    RequestTooLarge { words: u32, capacity: u32 },

    #[error("command buffer of {words} words is smaller than the minimum {minimum}")]
    BufferTooSmall { words: u32, minimum: u32 },

    #[error("unsupported colour space {0:?}")]
    UnsupportedColorSpace(ColorSpace),
}

/// A batcher stopped part way through its primitive list.
///
/// Everything counted in `submitted` was published to the fetch unit and is not rolled back.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("submitted {submitted} primitives before aborting")]
pub struct PartialSubmission {
    pub submitted: usize,
    #[source]
    pub source: EngineError,
}

impl PartialSubmission {
    pub(crate) fn new(submitted: usize, source: EngineError) -> Self {
        Self { submitted, source }
    }
}
