//! Register offsets and DMA command-word encodings for the acceleration engine.
//!
//! Offsets are absolute byte offsets into the accelerator's register aperture. The command
//! buffer itself is addressed in 32-bit words by the engine, while the fetch registers count
//! bytes; [`WORD_SHIFT`] converts between the two.

/// Command words are 32-bit; the fetch registers address bytes.
pub const WORD_SHIFT: u32 = 2;

/// FIFO front-end registers.
///
/// Every FIFO channel exposes the same DMA register set, so the engine always goes through
/// channel 0's copy.
pub mod fifo {
    /// Base of the FIFO channel register space.
    pub const BASE: u32 = 0x0080_0000;
    /// DMA put pointer (bytes). Write-only on some chips: never read it back.
    pub const DMA_PUT: u32 = BASE + 0x40;
    /// DMA get pointer (bytes): where the fetch unit is currently reading.
    pub const DMA_GET: u32 = BASE + 0x44;
}

/// Graphics engine status register; non-zero while the engine is executing commands.
pub const ENGINE_STATUS: u32 = 0x0040_0700;

/// Number of hardware dispatch channels available to the 2D engine.
pub const CHANNEL_COUNT: usize = 8;

/// Size of one channel's method window in the FIFO address space.
pub const CHANNEL_STRIDE: u32 = 0x2000;

/// Opcode word that makes the fetch unit jump back to offset 0 of the command buffer.
///
/// The last word of the buffer is kept free so this marker always fits.
pub const WRAP_MARKER: u32 = 0x2000_0000;

/// Bit position of the argument-count field in a method header.
pub const METHOD_COUNT_SHIFT: u32 = 18;
/// Width mask of the argument-count field (b18-b28).
pub const METHOD_COUNT_MASK: u32 = 0x7ff;
/// Mask for the method address field (b2-b15).
pub const METHOD_ADDR_MASK: u32 = 0x0000_fffc;
/// Mask for the opcode field (b29-b31). Zero means "incrementing method".
pub const OPCODE_MASK: u32 = 0xe000_0000;

/// Flag set on the argument of a channel-bind method.
pub const BIND_VALID: u32 = 0x8000_0000;

/// Encode a method header: `count` argument words follow, written to consecutive method
/// addresses starting at `offset` within `channel`'s window.
pub fn method_header(channel: u8, offset: u16, count: u16) -> u32 {
    let addr = (u32::from(channel) * CHANNEL_STRIDE + u32::from(offset)) & METHOD_ADDR_MASK;
    ((u32::from(count) & METHOD_COUNT_MASK) << METHOD_COUNT_SHIFT) | addr
}

/// Encode the header of a channel-bind method: one argument, written to offset 0 of the
/// channel's window.
pub fn bind_header(channel: u8) -> u32 {
    method_header(channel, 0, 1)
}

/// Encode the argument of a channel-bind method.
pub fn bind_argument(handle: u32) -> u32 {
    BIND_VALID | handle
}

/// Method offsets, grouped per engine object.
pub mod method {
    /// Raster operation object.
    pub mod rop {
        pub const SET_ROP5: u16 = 0x0300;
    }

    /// Pattern object.
    pub mod pattern {
        pub const SET_COLOR_FORMAT: u16 = 0x0300;
        pub const SET_SHAPE: u16 = 0x0308;
        /// Followed by SetColor1, SetPattern[0], SetPattern[1].
        pub const SET_COLOR0: u16 = 0x0310;
    }

    /// 2D surface object.
    pub mod surface {
        /// Followed by Pitch, OffsetSource, OffsetDest.
        pub const FORMAT: u16 = 0x0300;
    }

    /// Screen-to-screen image blit object.
    pub mod blit {
        /// Followed by DestOrg, HeightWidth.
        pub const SOURCE_ORG: u16 = 0x0300;
    }

    /// GDI rectangle/text object (solid fills).
    pub mod gdi_rect {
        pub const SET_COLOR_FORMAT: u16 = 0x0300;
        pub const COLOR1A: u16 = 0x03fc;
        /// Start of the 32-entry unclipped rectangle array (LeftTop, WidthHeight pairs).
        pub const UCR0_LEFT_TOP: u16 = 0x0400;
    }

    /// Scaled image from memory object (filtered stretch blits).
    pub mod scaled_image {
        /// Followed by SetOperation.
        pub const SET_COLOR_FORMAT: u16 = 0x0300;
        /// Clip origin; followed by clip size, dest origin, dest size and both inverse scales.
        pub const SOURCE_ORG: u16 = 0x0308;
        /// Followed by source pitch/format, source offset and source ref point.
        pub const SOURCE_SIZE: u16 = 0x0400;
    }
}

/// Raster operation codes.
pub mod rop5 {
    /// Destination = source (GXcopy).
    pub const COPY: u32 = 0xcc;
    /// Destination = NOT destination (GXinvert).
    pub const INVERT: u32 = 0x55;
}
