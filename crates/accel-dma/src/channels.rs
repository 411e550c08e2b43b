//! FIFO channel assignment.
//!
//! Methods address an object only indirectly, through one of eight dispatch channels. A
//! channel must be bound to the object's handle before any method word sent through it is
//! fetched. Binding is rare: the whole set the batchers need fits in the eight slots, so it is
//! normally done once after setup and again only if something else took channels away.

use std::collections::HashMap;

use tracing::debug;

use crate::error::Result;
use crate::hw::AccelDevice;
use crate::objects::ObjectHandle;
use crate::regs::{self, CHANNEL_COUNT};
use crate::ring::CommandRing;
use crate::stats::EngineStats;

#[derive(Clone, Debug, Default)]
pub struct ChannelBinding {
    slots: [Option<ObjectHandle>; CHANNEL_COUNT],
    by_handle: HashMap<ObjectHandle, u8>,
}

impl ChannelBinding {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn slot(&self, channel: u8) -> Option<ObjectHandle> {
        self.slots.get(usize::from(channel)).copied().flatten()
    }

    pub fn channel_of(&self, handle: ObjectHandle) -> Option<u8> {
        self.by_handle.get(&handle).copied()
    }

    pub fn is_bound(&self, handle: ObjectHandle) -> bool {
        self.by_handle.contains_key(&handle)
    }

    /// Forget every binding (the hardware side is re-armed separately).
    pub fn clear(&mut self) {
        self.slots = Default::default();
        self.by_handle.clear();
    }

    /// Make sure every handle in `required` is bound, rebinding the whole table otherwise.
    ///
    /// `required[i]` goes to channel `i`; at most [`CHANNEL_COUNT`] handles are accepted and
    /// channels past the end of `required` are left unbound. Returns whether a rebind happened.
    /// The table is only updated once the bind methods are in the ring, so a stalled rebind
    /// leaves the old bindings in place.
    pub fn ensure_bound<D: AccelDevice + ?Sized>(
        &mut self,
        ring: &mut CommandRing,
        dev: &mut D,
        required: &[ObjectHandle],
        stats: &EngineStats,
    ) -> Result<bool> {
        if required.iter().all(|handle| self.is_bound(*handle)) {
            return Ok(false);
        }

        let required = &required[..required.len().min(CHANNEL_COUNT)];
        ring.reserve(dev, 2 * required.len() as u32)?;
        for (channel, handle) in required.iter().enumerate() {
            let channel = channel as u8;
            ring.push(dev, regs::bind_header(channel));
            ring.push(dev, regs::bind_argument(handle.0));
        }

        self.clear();
        for (channel, handle) in required.iter().enumerate() {
            self.slots[channel] = Some(*handle);
            self.by_handle.insert(*handle, channel as u8);
        }
        ring.flush(dev);

        stats.inc_channel_rebinds();
        debug!(handles = ?required, "rebound FIFO channels");
        Ok(true)
    }
}
