//! Deterministic stand-in for the accelerator: register file, command memory and a fetch unit
//! that only moves when told to.
//!
//! The fetch unit parses the stream the way the hardware does (header, then `count` argument
//! words, jumps on the wrap marker), so tests can check exactly what would have executed. It
//! advances by a configurable number of words every time the fetch position register is read,
//! or explicitly through [`SimulatedFifo::advance`] and [`SimulatedFifo::drain`].
//!
//! Contract violations by the producer (writes past the buffer, a fetch limit outside it) panic.

use std::time::Duration;

use crate::hw::{AccelDevice, CommandMemory, RegisterIo};
use crate::regs::{
    self, BIND_VALID, CHANNEL_STRIDE, METHOD_ADDR_MASK, METHOD_COUNT_MASK, METHOD_COUNT_SHIFT,
    OPCODE_MASK, WORD_SHIFT, WRAP_MARKER,
};

/// One command as the fetch unit sees it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FifoCommand {
    Method {
        channel: u8,
        offset: u16,
        args: Vec<u32>,
    },
    BindChannel {
        channel: u8,
        handle: u32,
    },
    Wrap,
}

#[derive(Debug)]
pub struct SimulatedFifo {
    words: Vec<u32>,
    /// Written by the producer and not yet read by the fetch unit.
    live: Vec<bool>,
    get: u32,
    put: u32,
    pending_args: u32,
    fetch_per_poll: u32,
    busy_polls: u32,

    recording: bool,
    consumed: Vec<(u32, u32)>,
    overwrites: usize,
    register_reads: usize,
    register_writes: Vec<(u32, u32)>,
    buffer_writes: usize,
    barriers: usize,
    snoozed: Duration,
}

impl SimulatedFifo {
    /// A buffer of `len_words` words whose fetch unit drains everything on each poll.
    pub fn new(len_words: u32) -> Self {
        let len = len_words as usize;
        Self {
            words: vec![0; len],
            live: vec![false; len],
            get: 0,
            put: 0,
            pending_args: 0,
            fetch_per_poll: u32::MAX,
            busy_polls: 0,
            recording: true,
            consumed: Vec::new(),
            overwrites: 0,
            register_reads: 0,
            register_writes: Vec::new(),
            buffer_writes: 0,
            barriers: 0,
            snoozed: Duration::ZERO,
        }
    }

    /// Words the fetch unit reads each time its position register is polled.
    pub fn set_fetch_per_poll(&mut self, words: u32) {
        self.fetch_per_poll = words;
    }

    /// Stop the fetch unit; it then only moves through [`SimulatedFifo::advance`].
    pub fn freeze(&mut self) {
        self.fetch_per_poll = 0;
    }

    /// Report the engine busy for the next `polls` status reads.
    pub fn set_busy_for(&mut self, polls: u32) {
        self.busy_polls = polls;
    }

    /// Whether consumed words and register writes are logged. On by default; long benchmark
    /// runs turn it off.
    pub fn set_recording(&mut self, recording: bool) {
        self.recording = recording;
    }

    /// Hardware reset of the fetch unit: both pointers back to 0, nothing pending.
    pub fn rearm(&mut self) {
        self.get = 0;
        self.put = 0;
        self.pending_args = 0;
        self.live.iter_mut().for_each(|live| *live = false);
    }

    /// Read one word if the fetch unit has anything left before the fetch limit.
    fn step(&mut self) -> bool {
        if self.get == self.put {
            return false;
        }
        let index = self.get;
        let word = self.words[index as usize];
        self.live[index as usize] = false;
        if self.recording {
            self.consumed.push((index, word));
        }

        if self.pending_args > 0 {
            self.pending_args -= 1;
            self.get += 1;
        } else if word & OPCODE_MASK == WRAP_MARKER {
            self.get = (word & !OPCODE_MASK) >> WORD_SHIFT;
        } else {
            self.pending_args = (word >> METHOD_COUNT_SHIFT) & METHOD_COUNT_MASK;
            self.get += 1;
        }
        assert!(
            (self.get as usize) < self.words.len(),
            "fetch unit ran off the end of the command buffer at {index}"
        );
        true
    }

    /// Let the fetch unit read up to `words` words; returns how many it read.
    pub fn advance(&mut self, words: u32) -> u32 {
        let mut read = 0;
        while read < words && self.step() {
            read += 1;
        }
        read
    }

    /// Read everything published.
    pub fn drain(&mut self) {
        let budget = self.words.len() * 2;
        let mut steps = 0;
        while self.step() {
            steps += 1;
            assert!(steps <= budget, "fetch unit is looping");
        }
    }

    pub fn get(&self) -> u32 {
        self.get
    }

    pub fn put(&self) -> u32 {
        self.put
    }

    pub fn is_drained(&self) -> bool {
        self.get == self.put
    }

    pub fn word(&self, index: u32) -> u32 {
        self.words[index as usize]
    }

    /// `(index, word)` of everything the fetch unit read, in order.
    pub fn consumed(&self) -> &[(u32, u32)] {
        &self.consumed
    }

    pub fn consumed_words(&self) -> Vec<u32> {
        self.consumed.iter().map(|&(_, word)| word).collect()
    }

    pub fn clear_consumed(&mut self) {
        self.consumed.clear();
    }

    /// Producer writes that landed on a word the fetch unit had not read yet.
    pub fn overwrites(&self) -> usize {
        self.overwrites
    }

    /// Consecutive writable words starting at `index`, stopping before the wrap marker slot.
    pub fn free_run_from(&self, index: u32) -> u32 {
        let capacity = self.words.len().saturating_sub(1);
        self.live[(index as usize).min(capacity)..capacity]
            .iter()
            .take_while(|live| !**live)
            .count() as u32
    }

    pub fn register_reads(&self) -> usize {
        self.register_reads
    }

    pub fn register_writes(&self) -> &[(u32, u32)] {
        &self.register_writes
    }

    pub fn buffer_writes(&self) -> usize {
        self.buffer_writes
    }

    pub fn barriers(&self) -> usize {
        self.barriers
    }

    pub fn snoozed(&self) -> Duration {
        self.snoozed
    }

    /// Split a word stream into commands.
    pub fn decode(words: &[u32]) -> Vec<FifoCommand> {
        let mut commands = Vec::new();
        let mut rest = words;
        while let Some((&header, tail)) = rest.split_first() {
            if header & OPCODE_MASK == WRAP_MARKER {
                commands.push(FifoCommand::Wrap);
                rest = tail;
                continue;
            }

            let count = ((header >> METHOD_COUNT_SHIFT) & METHOD_COUNT_MASK) as usize;
            let (args, tail) = tail.split_at(count.min(tail.len()));
            rest = tail;

            let addr = header & METHOD_ADDR_MASK;
            let channel = (addr / CHANNEL_STRIDE) as u8;
            let offset = (addr % CHANNEL_STRIDE) as u16;
            match args {
                [arg] if offset == 0 && arg & BIND_VALID != 0 => {
                    commands.push(FifoCommand::BindChannel {
                        channel,
                        handle: arg & !BIND_VALID,
                    });
                }
                _ => commands.push(FifoCommand::Method {
                    channel,
                    offset,
                    args: args.to_vec(),
                }),
            }
        }
        commands
    }
}

impl RegisterIo for SimulatedFifo {
    fn read_u32(&mut self, offset: u32) -> u32 {
        self.register_reads += 1;
        match offset {
            regs::fifo::DMA_GET => {
                self.advance(self.fetch_per_poll);
                self.get << WORD_SHIFT
            }
            regs::ENGINE_STATUS => {
                if self.busy_polls > 0 {
                    self.busy_polls -= 1;
                    1
                } else {
                    0
                }
            }
            _ => 0,
        }
    }

    fn write_u32(&mut self, offset: u32, value: u32) {
        if self.recording {
            self.register_writes.push((offset, value));
        }
        if offset == regs::fifo::DMA_PUT {
            let put = value >> WORD_SHIFT;
            assert!(
                (put as usize) < self.words.len(),
                "fetch limit {put} outside the command buffer"
            );
            self.put = put;
        }
    }
}

impl CommandMemory for SimulatedFifo {
    fn len_words(&self) -> u32 {
        self.words.len() as u32
    }

    fn write_word(&mut self, index: u32, word: u32) {
        let slot = index as usize;
        assert!(slot < self.words.len(), "write at {index} outside the command buffer");
        if self.live[slot] {
            self.overwrites += 1;
        }
        self.words[slot] = word;
        self.live[slot] = true;
        self.buffer_writes += 1;
    }

    fn write_barrier(&mut self) {
        self.barriers += 1;
    }
}

impl AccelDevice for SimulatedFifo {
    fn snooze(&mut self, duration: Duration) {
        self.snoozed += duration;
    }
}
