#![allow(dead_code)]

use accel_dma::sim::{FifoCommand, SimulatedFifo};
use accel_dma::{ColorSpace, CommandEngine, EngineConfig, HandleTable, SurfaceConfig};

/// Words the setup sequence emits: 7 channel binds, surface, two colour formats, pattern.
pub const SETUP_WORDS: u32 = 14 + 5 + 2 + 2 + 7;

pub const ROP_CHANNEL: u8 = 0;
pub const SURFACE_CHANNEL: u8 = 3;
pub const BLIT_CHANNEL: u8 = 4;
pub const GDI_CHANNEL: u8 = 5;
pub const SCALED_CHANNEL: u8 = 6;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

pub fn surface(color_space: ColorSpace) -> SurfaceConfig {
    SurfaceConfig {
        frame_buffer_offset: 0x0010_0000,
        bytes_per_row: 0x1400,
        color_space,
    }
}

/// Small margin and poll limit so little buffers and frozen fetch units stay fast.
pub fn small_config() -> EngineConfig {
    EngineConfig {
        poll_limit: 64,
        safety_margin_words: 16,
        ..EngineConfig::default()
    }
}

pub fn engine_with(
    len_words: u32,
    config: EngineConfig,
    color_space: ColorSpace,
) -> CommandEngine<SimulatedFifo> {
    init_tracing();
    CommandEngine::new(
        SimulatedFifo::new(len_words),
        config,
        HandleTable::default(),
        surface(color_space),
    )
    .expect("engine setup")
}

/// Engine whose setup stream has already been consumed and forgotten.
pub fn settled_engine(
    len_words: u32,
    config: EngineConfig,
    color_space: ColorSpace,
) -> CommandEngine<SimulatedFifo> {
    let mut engine = engine_with(len_words, config, color_space);
    let sim = engine.device_mut();
    sim.drain();
    sim.clear_consumed();
    engine
}

/// Everything the fetch unit has read since the last `clear_consumed`, after draining.
pub fn executed(engine: &mut CommandEngine<SimulatedFifo>) -> Vec<FifoCommand> {
    let sim = engine.device_mut();
    sim.drain();
    SimulatedFifo::decode(&sim.consumed_words())
}

pub fn method(channel: u8, offset: u16, args: &[u32]) -> FifoCommand {
    FifoCommand::Method {
        channel,
        offset,
        args: args.to_vec(),
    }
}
