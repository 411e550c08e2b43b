//! Producer side of the DMA command buffer.
//!
//! The buffer is a plain array of command words that the fetch unit reads independently of
//! the CPU. The producer keeps three cursors:
//!
//! - `write_offset`: next word the CPU writes;
//! - `published_offset`: how far the fetch unit has been told it may read;
//! - `free_estimate`: words known to be writable at `write_offset` without polling hardware.
//!
//! `free_estimate` is a lower bound and only ever refreshed from the fetch position register,
//! so the common case (enough room left from the last poll) costs no register access at all.
//!
//! The last word of the buffer is never handed out: it is where the wrap marker goes when the
//! tail runs out, so a jump back to offset 0 always fits.

use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::hw::{AccelDevice, HardwareConsumer};
use crate::regs::WRAP_MARKER;
use crate::stats::EngineStats;

/// Producer cursors, in command words.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RingCursor {
    pub write_offset: u32,
    pub published_offset: u32,
    pub free_estimate: u32,
    pub stall_count: u8,
}

pub struct CommandRing {
    capacity: u32,
    cursor: RingCursor,
    config: EngineConfig,
    stats: Arc<EngineStats>,
}

impl CommandRing {
    /// `len_words` is the full buffer length, including the wrap marker slot.
    pub fn new(len_words: u32, config: EngineConfig, stats: Arc<EngineStats>) -> Self {
        let capacity = len_words.saturating_sub(1);
        Self {
            capacity,
            cursor: RingCursor {
                free_estimate: capacity,
                ..RingCursor::default()
            },
            config,
            stats,
        }
    }

    /// Usable words: the buffer length minus the wrap marker slot.
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn cursor(&self) -> RingCursor {
        self.cursor
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn is_wedged(&self) -> bool {
        self.cursor.stall_count >= self.config.stall_ceiling
    }

    /// Words kept between the write cursor and the fetch position.
    ///
    /// Never zero: with no gap a completely full ring has `published == fetch`, which is
    /// indistinguishable from an empty one.
    fn gap(&self) -> u32 {
        self.config.safety_margin_words.max(1)
    }

    /// Back to an empty ring with no stalls recorded.
    ///
    /// The caller must have pointed the fetch unit back at offset 0.
    pub fn reset(&mut self) {
        self.cursor = RingCursor {
            free_estimate: self.capacity,
            ..RingCursor::default()
        };
    }

    /// Make sure `words` contiguous words can be written at the write cursor.
    ///
    /// May write and publish a wrap marker, after which the cursor is back at 0. A wrap happens
    /// at most once per call: from offset 0 the whole capacity is reachable.
    pub fn reserve<D: AccelDevice + ?Sized>(&mut self, dev: &mut D, words: u32) -> Result<()> {
        if self.is_wedged() {
            return Err(EngineError::Wedged {
                stalls: self.cursor.stall_count,
            });
        }
        if words >= self.capacity {
            return Err(EngineError::RequestTooLarge {
                words,
                capacity: self.capacity,
            });
        }
        if self.cursor.free_estimate >= words {
            self.stats.inc_fast_reserves();
            return Ok(());
        }

        self.stats.inc_slow_reserves();
        let gap = self.gap();
        let mut polls = 0u32;
        while self.cursor.free_estimate < words {
            if polls == self.config.poll_limit {
                return Err(self.record_reserve_stall(words));
            }
            polls += 1;

            self.stats.inc_fetch_polls();
            let fetch = dev.read_fetch_position();
            if self.cursor.published_offset >= fetch {
                // Fetch unit is behind us in the same lap: the tail is ours.
                self.cursor.free_estimate = self.capacity - self.cursor.write_offset;
                // A wrap published while the fetch unit sits at 0 would look like an empty
                // ring to it, so wait for it to move first.
                if self.cursor.free_estimate < words && fetch != 0 {
                    self.wrap(dev);
                    self.cursor.free_estimate = fetch.saturating_sub(gap);
                }
            } else {
                // Fetch unit is still reading the previous lap ahead of us.
                self.cursor.free_estimate = fetch
                    .saturating_sub(self.cursor.write_offset)
                    .saturating_sub(gap);
            }

            if self.cursor.free_estimate < words {
                let delay = self.config.reserve_poll_delay;
                if delay.is_zero() {
                    std::hint::spin_loop();
                } else {
                    dev.snooze(delay);
                }
            }
        }
        Ok(())
    }

    fn record_reserve_stall(&mut self, needed: u32) -> EngineError {
        let stalls = self.record_stall();
        warn!(
            stalls,
            needed,
            free = self.cursor.free_estimate,
            write_offset = self.cursor.write_offset,
            published_offset = self.cursor.published_offset,
            "DMA fetch unit did not free enough command buffer space"
        );
        EngineError::Stalled {
            stalls,
            needed,
            free: self.cursor.free_estimate,
        }
    }

    fn record_stall(&mut self) -> u8 {
        let ceiling = self.config.stall_ceiling;
        self.cursor.stall_count = self.cursor.stall_count.saturating_add(1).min(ceiling);
        self.stats.inc_stalls();
        if self.is_wedged() {
            warn!(
                stalls = self.cursor.stall_count,
                "DMA engine wedged; command submission disabled until reinitialization"
            );
        }
        self.cursor.stall_count
    }

    fn wrap<D: AccelDevice + ?Sized>(&mut self, dev: &mut D) {
        debug!(at = self.cursor.write_offset, "wrapping DMA command buffer");
        dev.write_word(self.cursor.write_offset, WRAP_MARKER);
        self.cursor.write_offset = 0;
        self.stats.inc_wraps();
        self.flush(dev);
    }

    /// Write one word at the write cursor. The word must have been reserved.
    pub fn push<D: AccelDevice + ?Sized>(&mut self, dev: &mut D, word: u32) {
        debug_assert!(self.cursor.free_estimate > 0, "push without reservation");
        debug_assert!(self.cursor.write_offset < self.capacity);
        dev.write_word(self.cursor.write_offset, word);
        self.cursor.write_offset += 1;
        self.cursor.free_estimate = self.cursor.free_estimate.saturating_sub(1);
        self.stats.add_words_written(1);
    }

    pub fn push_all<D: AccelDevice + ?Sized>(&mut self, dev: &mut D, words: &[u32]) {
        for &word in words {
            self.push(dev, word);
        }
    }

    /// Publish everything written so far to the fetch unit.
    pub fn flush<D: AccelDevice + ?Sized>(&mut self, dev: &mut D) {
        if self.cursor.write_offset == self.cursor.published_offset {
            return;
        }
        dev.write_barrier();
        self.cursor.published_offset = self.cursor.write_offset;
        dev.write_fetch_limit(self.cursor.published_offset);
        self.stats.inc_flushes();
        trace!(put = self.cursor.published_offset, "published DMA commands");
    }

    /// Wait until the fetch unit has read everything published and the engine is no longer
    /// busy.
    ///
    /// A fetch unit that does not catch up within the poll limit counts as a stall.
    pub fn wait_idle<D: AccelDevice + ?Sized>(&mut self, dev: &mut D) -> Result<()> {
        if self.is_wedged() {
            return Err(EngineError::Wedged {
                stalls: self.cursor.stall_count,
            });
        }

        let delay = self.config.idle_poll_delay;
        let mut polls = 0u32;
        while dev.read_fetch_position() != self.cursor.published_offset {
            if polls == self.config.poll_limit {
                let stalls = self.record_stall();
                warn!(
                    stalls,
                    put = self.cursor.published_offset,
                    "DMA fetch unit did not drain the command buffer"
                );
                return Err(EngineError::IdleTimeout { stalls });
            }
            polls += 1;
            dev.snooze(delay);
        }

        let mut polls = 0u32;
        while dev.read_busy_status() {
            if polls == self.config.poll_limit {
                warn!("graphics engine still busy after draining the command buffer");
                return Err(EngineError::IdleTimeout {
                    stalls: self.cursor.stall_count,
                });
            }
            polls += 1;
            dev.snooze(delay);
        }
        Ok(())
    }
}
