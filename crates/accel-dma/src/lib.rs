//! DMA command-queue engine for 2D display acceleration.
//!
//! The driver maps the accelerator, places a command buffer where the fetch unit can reach
//! it, and builds the object handle table. This crate takes it from there: it binds the 2D
//! objects to FIFO channels, turns primitive lists (fills, spans, inverts, blits, scaled blits)
//! into method words, and keeps the producer from ever overrunning the fetch unit.
//!
//! The entry point is [`CommandEngine`]. Hardware access goes through the [`hw`] traits. With
//! the `test-utils` feature, `sim::SimulatedFifo` implements them deterministically for tests
//! and benchmarks.
#![forbid(unsafe_code)]

pub mod channels;
pub mod config;
pub mod engine;
pub mod error;
pub mod hw;
pub mod objects;
pub mod primitives;
pub mod regs;
pub mod ring;
/// Simulated accelerator for tests.
///
/// Only compiled for this crate's own tests or with the `test-utils` feature. It panics on
/// producer contract violations and is not meant to stand in for hardware in production.
#[cfg(any(test, feature = "test-utils"))]
pub mod sim;
pub mod stats;
pub mod surface;

pub use channels::ChannelBinding;
pub use config::{EngineConfig, FETCH_SAFETY_MARGIN_WORDS};
pub use engine::{CommandEngine, MAX_RESERVATION_WORDS};
pub use error::{EngineError, PartialSubmission, Result, SubmitResult};
pub use hw::{AccelDevice, CommandMemory, HardwareConsumer, RegisterIo};
pub use objects::{EngineObject, HandleTable, ObjectHandle};
pub use primitives::{Blit, FillRect, OffscreenSource, ScaledBlit, Span};
pub use ring::{CommandRing, RingCursor};
pub use stats::{EngineStats, EngineStatsSnapshot};
pub use surface::{ColorSpace, DepthCodes, SurfaceConfig};
