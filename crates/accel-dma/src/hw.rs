//! Boundary between the command engine and the surrounding driver.
//!
//! The driver owns the mapped register aperture and the command buffer placement; the engine
//! only sees them through these traits. This keeps the engine free of `unsafe` and lets tests
//! substitute a simulated device (`sim::SimulatedFifo`, behind the `test-utils` feature) for
//! real hardware.

use std::time::Duration;

use crate::regs::{self, WORD_SHIFT};

/// Word-sized access to the accelerator's register aperture.
///
/// Reads take `&mut self` because device registers may have read side effects.
pub trait RegisterIo {
    fn read_u32(&mut self, offset: u32) -> u32;
    fn write_u32(&mut self, offset: u32, value: u32);
}

/// The command buffer shared with the DMA fetch unit.
pub trait CommandMemory {
    /// Total buffer length in 32-bit words, including the slot reserved for the wrap marker.
    fn len_words(&self) -> u32;

    /// Store one command word at `index` (in words).
    fn write_word(&mut self, index: u32, word: u32);

    /// Make every preceding [`CommandMemory::write_word`] visible to the fetch unit.
    ///
    /// Buffers in write-combined device memory need a flush read here; cache-coherent host
    /// memory needs only a compiler/CPU fence.
    fn write_barrier(&mut self);
}

/// Everything the engine needs from one accelerator instance.
pub trait AccelDevice: RegisterIo + CommandMemory {
    /// Pause between two polls of a device register.
    fn snooze(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// The fetch unit as seen by the producer: an independent reader of the command buffer.
///
/// All positions are in command words.
pub trait HardwareConsumer {
    /// Current read cursor of the fetch unit.
    fn read_fetch_position(&mut self) -> u32;

    /// Whether the graphics engine is still executing fetched commands.
    fn read_busy_status(&mut self) -> bool;

    /// Allow the fetch unit to read up to (excluding) `put`.
    fn write_fetch_limit(&mut self, put: u32);
}

impl<R: RegisterIo + ?Sized> HardwareConsumer for R {
    fn read_fetch_position(&mut self) -> u32 {
        self.read_u32(regs::fifo::DMA_GET) >> WORD_SHIFT
    }

    fn read_busy_status(&mut self) -> bool {
        self.read_u32(regs::ENGINE_STATUS) != 0
    }

    fn write_fetch_limit(&mut self, put: u32) {
        self.write_u32(regs::fifo::DMA_PUT, put << WORD_SHIFT);
    }
}
