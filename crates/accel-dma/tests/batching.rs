mod common;

use accel_dma::sim::{FifoCommand, SimulatedFifo};
use accel_dma::{
    Blit, ColorSpace, CommandEngine, EngineConfig, EngineError, FillRect, HandleTable,
    OffscreenSource, PartialSubmission, ScaledBlit, Span,
};
use pretty_assertions::assert_eq;

use common::*;

#[test]
fn setup_programs_surface_and_pattern() {
    let mut engine = engine_with(8192, EngineConfig::default(), ColorSpace::Rgb32);
    assert_eq!(engine.cursor().write_offset, SETUP_WORDS);
    assert_eq!(engine.cursor().published_offset, SETUP_WORDS);

    let commands = executed(&mut engine);
    let handles = HandleTable::default().required();
    for (channel, handle) in handles.iter().enumerate() {
        assert_eq!(
            commands[channel],
            FifoCommand::BindChannel {
                channel: channel as u8,
                handle: handle.0
            }
        );
    }
    assert_eq!(
        commands[7..].to_vec(),
        vec![
            method(SURFACE_CHANNEL, 0x300, &[6, 0x1400_1400, 0x0010_0000, 0x0010_0000]),
            method(2, 0x300, &[3]),
            method(GDI_CHANNEL, 0x300, &[3]),
            method(2, 0x308, &[0]),
            method(2, 0x310, &[0xffff_ffff; 4]),
        ]
    );
}

#[test]
fn single_fill_advances_by_prologue_header_and_two_words() {
    let mut engine = settled_engine(8192, EngineConfig::default(), ColorSpace::Rgb32);
    let before = engine.cursor();

    let submitted = engine
        .submit_fill_rectangle(0x00ff_ffff, &[FillRect::new(0, 0, 9, 9)])
        .unwrap();

    let after = engine.cursor();
    assert_eq!(submitted, 1);
    assert_eq!(after.write_offset - before.write_offset, 4 + 1 + 2);
    assert_eq!(after.published_offset, after.write_offset);
    assert_eq!(engine.stats().snapshot().wraps, 0);
    assert!(engine.take_3d_reload());
    assert!(!engine.take_3d_reload());

    assert_eq!(
        executed(&mut engine),
        vec![
            method(ROP_CHANNEL, 0x300, &[0xcc]),
            method(GDI_CHANNEL, 0x3fc, &[0x00ff_ffff]),
            method(GDI_CHANNEL, 0x400, &[0x0000_0000, 0x000a_000a]),
        ]
    );
}

#[test]
fn seventy_rects_become_three_sublists() {
    let mut engine = settled_engine(8192, EngineConfig::default(), ColorSpace::Rgb16);
    let rects: Vec<FillRect> = (0..70u16).map(|i| FillRect::new(i, i, i + 3, i + 1)).collect();
    let before = engine.cursor();
    let flushes = engine.stats().snapshot().flushes;

    assert_eq!(engine.submit_fill_rectangle(0x1234, &rects), Ok(70));

    let written = engine.cursor().write_offset - before.write_offset;
    assert_eq!(written, 4 + (1 + 2 * 32) + (1 + 2 * 32) + (1 + 2 * 6));
    assert_eq!(engine.stats().snapshot().flushes - flushes, 3);

    let commands = executed(&mut engine);
    let sublists: Vec<usize> = commands[2..]
        .iter()
        .map(|command| match command {
            FifoCommand::Method {
                channel: GDI_CHANNEL,
                offset: 0x400,
                args,
            } => args.len() / 2,
            other => panic!("unexpected command {other:?}"),
        })
        .collect();
    assert_eq!(sublists, vec![32, 32, 6]);

    let FifoCommand::Method { args, .. } = &commands[4] else {
        panic!("expected the last sublist");
    };
    assert_eq!(&args[..2], &rects[64].words());
}

#[test]
fn spans_are_one_pixel_high_rectangles() {
    let mut engine = settled_engine(8192, EngineConfig::default(), ColorSpace::Rgb32);
    let spans = [Span::new(5, 10, 19), Span::new(6, 0, 0)];

    assert_eq!(engine.submit_fill_spans(7, &spans), Ok(2));
    assert_eq!(
        executed(&mut engine),
        vec![
            method(ROP_CHANNEL, 0x300, &[0xcc]),
            method(GDI_CHANNEL, 0x3fc, &[7]),
            method(
                GDI_CHANNEL,
                0x400,
                &[0x000a_0005, 0x000a_0001, 0x0000_0006, 0x0001_0001]
            ),
        ]
    );
}

#[test]
fn invert_uses_invert_rop_and_zero_colour() {
    let mut engine = settled_engine(8192, EngineConfig::default(), ColorSpace::Cmap8);
    assert_eq!(
        engine.submit_invert_rectangle(&[FillRect::new(1, 2, 3, 4)]),
        Ok(1)
    );
    let commands = executed(&mut engine);
    assert_eq!(commands[0], method(ROP_CHANNEL, 0x300, &[0x55]));
    assert_eq!(commands[1], method(GDI_CHANNEL, 0x3fc, &[0]));
}

#[test]
fn blits_get_one_method_each_and_flush_every_thirty_two() {
    let mut engine = settled_engine(8192, EngineConfig::default(), ColorSpace::Rgb32);
    let blits: Vec<Blit> = (0..33u16)
        .map(|i| Blit {
            src_left: i,
            src_top: 0,
            dest_left: i,
            dest_top: 100,
            width: 15,
            height: 15,
        })
        .collect();
    let flushes = engine.stats().snapshot().flushes;

    assert_eq!(engine.submit_screen_to_screen_blit(&blits), Ok(33));
    assert_eq!(engine.stats().snapshot().flushes - flushes, 2);

    let commands = executed(&mut engine);
    assert_eq!(commands.len(), 1 + 33);
    assert_eq!(commands[0], method(ROP_CHANNEL, 0x300, &[0xcc]));
    assert_eq!(
        commands[33],
        method(BLIT_CHANNEL, 0x300, &[0x0000_0020, 0x0064_0020, 0x0010_0010])
    );
}

fn doubling(count: u16) -> Vec<ScaledBlit> {
    (0..count)
        .map(|i| ScaledBlit {
            src_left: i,
            src_top: 0,
            src_width: 99,
            src_height: 49,
            dest_left: 0,
            dest_top: i,
            dest_width: 199,
            dest_height: 99,
        })
        .collect()
}

#[test]
fn scaled_blit_programs_source_format_and_two_methods_per_item() {
    let mut engine = settled_engine(8192, EngineConfig::default(), ColorSpace::Rgb16);
    let blits = doubling(17);
    let flushes = engine.stats().snapshot().flushes;

    assert_eq!(engine.submit_scaled_filtered_blit(&blits), Ok(17));
    assert_eq!(engine.stats().snapshot().flushes - flushes, 2);

    let commands = executed(&mut engine);
    assert_eq!(commands.len(), 2 + 2 * 17);
    assert_eq!(commands[0], method(SCALED_CHANNEL, 0x300, &[7, 3]));
    assert_eq!(commands[1], method(GDI_CHANNEL, 0x3fc, &[0]));
    assert_eq!(
        commands[2],
        method(
            SCALED_CHANNEL,
            0x308,
            &[0, 0x0064_00c8, 0x0000_0000, 0x0064_00c8, 1 << 19, 1 << 19]
        )
    );
    assert_eq!(
        commands[3],
        method(
            SCALED_CHANNEL,
            0x400,
            &[0x0032_0064, 0x0101_1400, 0x0010_0000, 0]
        )
    );
}

#[test]
fn rgb15_frame_buffer_switches_surface_format_around_scaled_blits() {
    let mut engine = settled_engine(8192, EngineConfig::default(), ColorSpace::Rgb15);
    assert_eq!(engine.submit_scaled_filtered_blit(&doubling(1)), Ok(1));

    let commands = executed(&mut engine);
    assert_eq!(commands.first(), Some(&method(SURFACE_CHANNEL, 0x300, &[2])));
    assert_eq!(commands[1], method(SCALED_CHANNEL, 0x300, &[2, 3]));
    assert_eq!(commands.last(), Some(&method(SURFACE_CHANNEL, 0x300, &[4])));
    assert_eq!(
        engine.cursor().published_offset,
        engine.cursor().write_offset
    );
}

#[test]
fn stalled_rgb15_scaled_blit_restores_surface_format_on_next_submission() {
    let mut engine = settled_engine(1024, small_config(), ColorSpace::Rgb15);
    engine.device_mut().freeze();
    let fills = vec![FillRect::new(0, 0, 9, 9); 32];
    while engine.cursor().free_estimate >= 200 {
        assert_eq!(engine.submit_fill_rectangle(1, &fills), Ok(32));
    }

    let err = engine
        .submit_scaled_filtered_blit(&doubling(16))
        .unwrap_err();
    assert_eq!(err.submitted, 0);
    assert!(matches!(err.source, EngineError::Stalled { stalls: 1, .. }));
    assert!(!engine.is_wedged());

    let sim = engine.device_mut();
    sim.drain();
    sim.clear_consumed();
    sim.set_fetch_per_poll(u32::MAX);

    let fill = [FillRect::new(0, 0, 9, 9)];
    assert_eq!(engine.submit_fill_rectangle(1, &fill), Ok(1));
    assert_eq!(
        executed(&mut engine),
        vec![
            method(SURFACE_CHANNEL, 0x300, &[4]),
            method(ROP_CHANNEL, 0x300, &[0xcc]),
            method(GDI_CHANNEL, 0x3fc, &[1]),
            method(GDI_CHANNEL, 0x400, &[0x0000_0000, 0x000a_000a]),
        ]
    );

    // Restored once; later submissions go straight to their prologue.
    engine.device_mut().clear_consumed();
    assert_eq!(engine.submit_fill_rectangle(1, &fill), Ok(1));
    assert_eq!(
        executed(&mut engine).first(),
        Some(&method(ROP_CHANNEL, 0x300, &[0xcc]))
    );
}

#[test]
fn offscreen_source_supplies_offset_pitch_and_format() {
    let mut engine = settled_engine(8192, EngineConfig::default(), ColorSpace::Rgb32);
    let source = OffscreenSource {
        offset: 0x0080_0000,
        bytes_per_row: 0x280,
        color_space: ColorSpace::Yuv422,
    };
    let blit = ScaledBlit {
        src_left: 4,
        src_top: 3,
        src_width: 319,
        src_height: 239,
        dest_left: 0,
        dest_top: 0,
        dest_width: 639,
        dest_height: 479,
    };

    assert_eq!(
        engine.submit_offscreen_scaled_filtered_blit(&source, &[blit]),
        Ok(1)
    );
    let commands = executed(&mut engine);
    assert_eq!(commands[0], method(SCALED_CHANNEL, 0x300, &[6, 3]));
    assert_eq!(
        commands[3],
        method(
            SCALED_CHANNEL,
            0x400,
            &[0x00f0_0140, 0x0101_0280, 0x0080_0000 + 3 * 0x280 + 4 * 2, 0]
        )
    );
}

#[test]
fn palette_frame_buffer_cannot_be_scaled() {
    let mut engine = settled_engine(8192, EngineConfig::default(), ColorSpace::Cmap8);
    let before = engine.device().buffer_writes();

    assert_eq!(
        engine.submit_scaled_filtered_blit(&doubling(2)),
        Err(PartialSubmission {
            submitted: 0,
            source: EngineError::UnsupportedColorSpace(ColorSpace::Cmap8),
        })
    );
    assert_eq!(engine.device().buffer_writes(), before);
    assert!(!engine.take_3d_reload());
}

#[test]
fn empty_lists_touch_nothing() {
    let mut engine = settled_engine(8192, EngineConfig::default(), ColorSpace::Rgb32);
    let before = engine.cursor();

    assert_eq!(engine.submit_fill_rectangle(1, &[]), Ok(0));
    assert_eq!(engine.submit_screen_to_screen_blit(&[]), Ok(0));
    assert_eq!(engine.submit_scaled_filtered_blit(&[]), Ok(0));

    assert_eq!(engine.cursor(), before);
    assert!(!engine.take_3d_reload());
}

#[test]
fn construction_rejects_bad_surfaces_and_tiny_buffers() {
    let result = CommandEngine::new(
        SimulatedFifo::new(8192),
        EngineConfig::default(),
        HandleTable::default(),
        surface(ColorSpace::YCbCr422),
    );
    assert!(matches!(
        result,
        Err(EngineError::UnsupportedColorSpace(ColorSpace::YCbCr422))
    ));

    let result = CommandEngine::new(
        SimulatedFifo::new(256),
        EngineConfig::default(),
        HandleTable::default(),
        surface(ColorSpace::Rgb32),
    );
    assert!(matches!(
        result,
        Err(EngineError::BufferTooSmall {
            words: 256,
            minimum: 450
        })
    ));
}
