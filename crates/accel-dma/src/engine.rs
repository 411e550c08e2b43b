//! The command engine: one per accelerator instance.
//!
//! [`CommandEngine`] owns the device, the ring cursors and the channel table. All entry points
//! take `&mut self`, which is the single-writer contract of the command buffer: callers that
//! share an engine between threads must wrap it in a lock.

use std::sync::Arc;

use tracing::debug;

use crate::channels::ChannelBinding;
use crate::config::EngineConfig;
use crate::error::{EngineError, PartialSubmission, Result, SubmitResult};
use crate::hw::AccelDevice;
use crate::objects::{EngineObject, HandleTable};
use crate::primitives::{Blit, FillRect, OffscreenSource, ScaledBlit, Span};
use crate::regs::{self, method, rop5};
use crate::ring::{CommandRing, RingCursor};
use crate::stats::EngineStats;
use crate::surface::{ColorSpace, DepthCodes, SurfaceConfig, SURFACE_FORMAT_X1R5G5B5};

/// Rectangles per `UCR0_LEFT_TOP` method; the GDI object has 32 entries.
const RECTS_PER_METHOD: usize = 32;
/// Blits per flush. The blit object takes one rectangle per method.
const BLITS_PER_FLUSH: usize = 32;
const BLIT_WORDS: u32 = 4;
/// Scaled blits per flush.
const SCALED_BLITS_PER_FLUSH: usize = 16;
/// Two methods per scaled blit: header + 6 words, header + 4 words.
const SCALED_BLIT_WORDS: u32 = 12;

/// Largest single reservation any entry point makes.
pub const MAX_RESERVATION_WORDS: u32 = SCALED_BLITS_PER_FLUSH as u32 * SCALED_BLIT_WORDS;

/// Scaled image operation: plain source copy.
const SCALED_OPERATION_SRCCOPY: u32 = 3;

pub struct CommandEngine<D> {
    device: D,
    ring: CommandRing,
    channels: ChannelBinding,
    handles: HandleTable,
    surface: SurfaceConfig,
    depth: DepthCodes,
    stats: Arc<EngineStats>,
    reload_3d: bool,
    /// The surface format is still x1r5g5b5 from a scaled blit that did not finish.
    surface_format_switched: bool,
}

impl<D: AccelDevice> CommandEngine<D> {
    /// Take over a freshly brought-up device: bind the channels and program the 2D surface.
    ///
    /// The fetch unit must be idle and pointed at offset 0 of the command buffer.
    pub fn new(
        device: D,
        config: EngineConfig,
        handles: HandleTable,
        surface: SurfaceConfig,
    ) -> Result<Self> {
        let depth = surface.color_space.depth_codes()?;
        let words = device.len_words();
        let minimum = MAX_RESERVATION_WORDS + config.safety_margin_words.max(1) + 2;
        if words < minimum {
            return Err(EngineError::BufferTooSmall { words, minimum });
        }

        let stats = Arc::new(EngineStats::new());
        let mut engine = Self {
            ring: CommandRing::new(words, config, stats.clone()),
            device,
            channels: ChannelBinding::new(),
            handles,
            surface,
            depth,
            stats,
            reload_3d: false,
            surface_format_switched: false,
        };
        engine.setup()?;
        Ok(engine)
    }

    /// Start over on a new surface (mode switch, or recovery from a wedged engine).
    ///
    /// Clears the stall counter, the cursors and the channel table, then re-emits the setup
    /// sequence. The caller must have reset the fetch unit to offset 0 beforehand.
    pub fn reinitialize(&mut self, surface: SurfaceConfig) -> Result<()> {
        self.depth = surface.color_space.depth_codes()?;
        self.surface = surface;
        self.ring.reset();
        self.channels.clear();
        self.surface_format_switched = false;
        self.setup()
    }

    fn setup(&mut self) -> Result<()> {
        self.assert_channel_bindings()?;

        let surface = self.channel(EngineObject::Surface2d);
        let pattern = self.channel(EngineObject::ImagePattern);
        let gdi = self.channel(EngineObject::GdiRectangleText);
        let depth = self.depth;
        let pitch = self.surface.packed_pitch();
        let offset = self.surface.frame_buffer_offset;

        self.ring.reserve(&mut self.device, 5)?;
        self.method(
            surface,
            method::surface::FORMAT,
            &[depth.surface, pitch, offset, offset],
        );

        self.ring.reserve(&mut self.device, 2)?;
        self.method(pattern, method::pattern::SET_COLOR_FORMAT, &[depth.command]);

        self.ring.reserve(&mut self.device, 2)?;
        self.method(gdi, method::gdi_rect::SET_COLOR_FORMAT, &[depth.command]);

        // 8x8 monochrome pattern, both colours and all pattern bits set.
        self.ring.reserve(&mut self.device, 7)?;
        self.method(pattern, method::pattern::SET_SHAPE, &[0]);
        self.method(pattern, method::pattern::SET_COLOR0, &[0xffff_ffff; 4]);

        self.ring.flush(&mut self.device);
        debug!(
            color_space = ?self.surface.color_space,
            bytes_per_row = self.surface.bytes_per_row,
            "DMA acceleration engine set up"
        );
        Ok(())
    }

    /// Bind every object the batchers use to a FIFO channel, unless that is already the case.
    pub fn assert_channel_bindings(&mut self) -> Result<()> {
        let required = self.handles.required();
        self.channels
            .ensure_bound(&mut self.ring, &mut self.device, &required, &self.stats)?;
        Ok(())
    }

    /// Channel of `object`. Only valid after a successful [`Self::assert_channel_bindings`].
    fn channel(&self, object: EngineObject) -> u8 {
        let channel = self.channels.channel_of(self.handles.handle(object));
        debug_assert!(channel.is_some(), "{object:?} addressed before being bound");
        channel.unwrap_or_else(|| object.default_channel())
    }

    /// Put the frame buffer's own surface format back if a scaled blit left it switched.
    fn restore_surface_format(&mut self) -> Result<()> {
        if !self.surface_format_switched {
            return Ok(());
        }
        let surface = self.channel(EngineObject::Surface2d);
        let format = self.depth.surface;
        self.ring.reserve(&mut self.device, 2)?;
        self.method(surface, method::surface::FORMAT, &[format]);
        self.surface_format_switched = false;
        debug!(format, "restored 2D surface format");
        Ok(())
    }

    /// Header plus arguments; the caller has reserved the room.
    fn method(&mut self, channel: u8, offset: u16, args: &[u32]) {
        self.ring.push(
            &mut self.device,
            regs::method_header(channel, offset, args.len() as u16),
        );
        self.ring.push_all(&mut self.device, args);
    }

    fn finish(&mut self, submitted: usize, result: Result<()>) -> SubmitResult {
        if submitted > 0 {
            self.stats.add_primitives_submitted(submitted as u64);
            self.reload_3d = true;
        }
        result
            .map(|()| submitted)
            .map_err(|source| PartialSubmission::new(submitted, source))
    }

    pub fn submit_fill_rectangle(&mut self, color: u32, rects: &[FillRect]) -> SubmitResult {
        self.submit_rectangles(rop5::COPY, color, rects, FillRect::words)
    }

    pub fn submit_fill_spans(&mut self, color: u32, spans: &[Span]) -> SubmitResult {
        self.submit_rectangles(rop5::COPY, color, spans, Span::words)
    }

    pub fn submit_invert_rectangle(&mut self, rects: &[FillRect]) -> SubmitResult {
        self.submit_rectangles(rop5::INVERT, 0, rects, FillRect::words)
    }

    fn submit_rectangles<T>(
        &mut self,
        rop: u32,
        color: u32,
        items: &[T],
        words: fn(&T) -> [u32; 2],
    ) -> SubmitResult {
        if items.is_empty() {
            return Ok(0);
        }
        let mut submitted = 0;
        let result = self.emit_rectangles(rop, color, items, words, &mut submitted);
        self.finish(submitted, result)
    }

    fn emit_rectangles<T>(
        &mut self,
        rop: u32,
        color: u32,
        items: &[T],
        words: fn(&T) -> [u32; 2],
        submitted: &mut usize,
    ) -> Result<()> {
        self.assert_channel_bindings()?;
        self.restore_surface_format()?;
        let rop_channel = self.channel(EngineObject::Rop5Solid);
        let gdi = self.channel(EngineObject::GdiRectangleText);

        self.ring.reserve(&mut self.device, 4)?;
        self.method(rop_channel, method::rop::SET_ROP5, &[rop]);
        self.method(gdi, method::gdi_rect::COLOR1A, &[color]);

        for batch in items.chunks(RECTS_PER_METHOD) {
            let arg_words = 2 * batch.len() as u32;
            self.ring.reserve(&mut self.device, 1 + arg_words)?;
            self.ring.push(
                &mut self.device,
                regs::method_header(gdi, method::gdi_rect::UCR0_LEFT_TOP, arg_words as u16),
            );
            for item in batch {
                self.ring.push_all(&mut self.device, &words(item));
            }
            self.ring.flush(&mut self.device);
            *submitted += batch.len();
        }
        Ok(())
    }

    pub fn submit_screen_to_screen_blit(&mut self, blits: &[Blit]) -> SubmitResult {
        if blits.is_empty() {
            return Ok(0);
        }
        let mut submitted = 0;
        let result = self.emit_blits(blits, &mut submitted);
        self.finish(submitted, result)
    }

    fn emit_blits(&mut self, blits: &[Blit], submitted: &mut usize) -> Result<()> {
        self.assert_channel_bindings()?;
        self.restore_surface_format()?;
        let rop_channel = self.channel(EngineObject::Rop5Solid);
        let blit_channel = self.channel(EngineObject::ImageBlit);

        self.ring.reserve(&mut self.device, 2)?;
        self.method(rop_channel, method::rop::SET_ROP5, &[rop5::COPY]);

        for batch in blits.chunks(BLITS_PER_FLUSH) {
            self.ring
                .reserve(&mut self.device, BLIT_WORDS * batch.len() as u32)?;
            for blit in batch {
                self.method(blit_channel, method::blit::SOURCE_ORG, &blit.words());
            }
            self.ring.flush(&mut self.device);
            *submitted += batch.len();
        }
        Ok(())
    }

    /// Scaled, filtered copy within the visible frame buffer.
    pub fn submit_scaled_filtered_blit(&mut self, blits: &[ScaledBlit]) -> SubmitResult {
        let source = OffscreenSource::from(&self.surface);
        self.submit_offscreen_scaled_filtered_blit(&source, blits)
    }

    /// Scaled, filtered copy from a bitmap anywhere in card memory to the frame buffer.
    pub fn submit_offscreen_scaled_filtered_blit(
        &mut self,
        source: &OffscreenSource,
        blits: &[ScaledBlit],
    ) -> SubmitResult {
        if blits.is_empty() {
            return Ok(0);
        }
        let mut submitted = 0;
        let result = self.emit_scaled(source, blits, &mut submitted);
        self.finish(submitted, result)
    }

    fn emit_scaled(
        &mut self,
        source: &OffscreenSource,
        blits: &[ScaledBlit],
        submitted: &mut usize,
    ) -> Result<()> {
        let format = source.color_space.scaled_source_format()?;
        self.assert_channel_bindings()?;
        let surface = self.channel(EngineObject::Surface2d);

        // The scaled image object only accepts 15-bit destinations with the surface set to
        // x1r5g5b5, while everything else wants r5g6b5 there. If the batches fail part way,
        // the switch stays recorded and the next submission restores it first.
        let rgb15 = self.surface.color_space == ColorSpace::Rgb15;
        if rgb15 {
            self.ring.reserve(&mut self.device, 2)?;
            self.method(surface, method::surface::FORMAT, &[SURFACE_FORMAT_X1R5G5B5]);
            self.surface_format_switched = true;
        }

        self.emit_scaled_batches(source, format, blits, submitted)?;

        if rgb15 {
            self.restore_surface_format()?;
            self.ring.flush(&mut self.device);
        }
        Ok(())
    }

    fn emit_scaled_batches(
        &mut self,
        source: &OffscreenSource,
        format: u32,
        blits: &[ScaledBlit],
        submitted: &mut usize,
    ) -> Result<()> {
        let scaled = self.channel(EngineObject::ScaledImageFromMemory);
        let gdi = self.channel(EngineObject::GdiRectangleText);

        self.ring.reserve(&mut self.device, 5)?;
        self.method(
            scaled,
            method::scaled_image::SET_COLOR_FORMAT,
            &[format, SCALED_OPERATION_SRCCOPY],
        );
        self.method(gdi, method::gdi_rect::COLOR1A, &[0]);

        for batch in blits.chunks(SCALED_BLITS_PER_FLUSH) {
            self.ring
                .reserve(&mut self.device, SCALED_BLIT_WORDS * batch.len() as u32)?;
            for blit in batch {
                self.method(
                    scaled,
                    method::scaled_image::SOURCE_ORG,
                    &blit.destination_words(),
                );
                self.method(
                    scaled,
                    method::scaled_image::SOURCE_SIZE,
                    &blit.source_words(source),
                );
            }
            self.ring.flush(&mut self.device);
            *submitted += batch.len();
        }
        Ok(())
    }

    /// Block until the fetch unit has consumed everything published and the engine is idle.
    pub fn wait_idle(&mut self) -> Result<()> {
        self.ring.wait_idle(&mut self.device)
    }

    /// Whether a co-resident 3D renderer must reload its surface state; clears the flag.
    pub fn take_3d_reload(&mut self) -> bool {
        std::mem::take(&mut self.reload_3d)
    }

    pub fn cursor(&self) -> RingCursor {
        self.ring.cursor()
    }

    pub fn capacity(&self) -> u32 {
        self.ring.capacity()
    }

    pub fn stall_count(&self) -> u8 {
        self.ring.cursor().stall_count
    }

    pub fn is_wedged(&self) -> bool {
        self.ring.is_wedged()
    }

    pub fn channels(&self) -> &ChannelBinding {
        &self.channels
    }

    pub fn surface(&self) -> &SurfaceConfig {
        &self.surface
    }

    pub fn config(&self) -> &EngineConfig {
        self.ring.config()
    }

    /// Shared handle to the submission counters.
    pub fn stats(&self) -> Arc<EngineStats> {
        self.stats.clone()
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }
}
