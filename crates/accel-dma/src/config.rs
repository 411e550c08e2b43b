use std::time::Duration;

/// Gap, in command words, kept between the write cursor and the fetch unit's read position.
///
/// Hardware quirk: the fetch unit reads the command buffer in bursts and misbehaves when the
/// producer writes into the burst it is currently fetching. 256 words was found empirically on
/// the NV4 through NV40 generations and is not documented anywhere; re-validate it when porting
/// to a new chip generation instead of assuming it still holds.
pub const FETCH_SAFETY_MARGIN_WORDS: u32 = 256;

/// Tunables of the command engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    /// Number of register polls `reserve` and `wait_idle` make before declaring a stall.
    pub poll_limit: u32,
    /// Sleep between fetch-position polls while waiting for ring space. Zero spins instead;
    /// even 1µs sleeps cost more than the fetch unit needs to drain a burst.
    pub reserve_poll_delay: Duration,
    /// Sleep between polls in `wait_idle`.
    pub idle_poll_delay: Duration,
    /// Consecutive stalls after which the engine is considered wedged.
    pub stall_ceiling: u8,
    /// See [`FETCH_SAFETY_MARGIN_WORDS`]. Only lowered for small simulated buffers.
    pub safety_margin_words: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            poll_limit: 10_000,
            reserve_poll_delay: Duration::ZERO,
            idle_poll_delay: Duration::from_micros(100),
            stall_ceiling: 3,
            safety_margin_words: FETCH_SAFETY_MARGIN_WORDS,
        }
    }
}
