//! Frame-buffer surface description and the per-colour-space format codes the 2D engine uses.

use crate::error::EngineError;

/// Pixel layouts the driver may hand to the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ColorSpace {
    /// 8-bit palette indices.
    Cmap8,
    /// 15-bit RGB (x1r5g5b5).
    Rgb15,
    /// 16-bit RGB (r5g6b5).
    Rgb16,
    /// 32-bit RGB (x8r8g8b8).
    Rgb32,
    /// Packed YCbCr 4:2:2, only valid as an offscreen scaled-blit source.
    YCbCr422,
    /// Packed YUV 4:2:2 (UYVY order), only valid as an offscreen scaled-blit source.
    Yuv422,
}

/// Format codes programmed into the 2D surface and pattern/rectangle objects.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DepthCodes {
    /// Value for the surface object's `Format` method.
    pub surface: u32,
    /// Value for the pattern and GDI rectangle `SetColorFormat` methods.
    pub command: u32,
}

/// Surface format code that makes the scaled-image object accept RGB15 sources.
pub(crate) const SURFACE_FORMAT_X1R5G5B5: u32 = 2;
/// Surface format normally used for 15 and 16-bit modes.
pub(crate) const SURFACE_FORMAT_R5G6B5: u32 = 4;

impl ColorSpace {
    /// Codes used when this is the frame-buffer colour space.
    pub fn depth_codes(self) -> Result<DepthCodes, EngineError> {
        let (surface, command) = match self {
            ColorSpace::Cmap8 => (1, 3),
            ColorSpace::Rgb15 | ColorSpace::Rgb16 => (SURFACE_FORMAT_R5G6B5, 1),
            ColorSpace::Rgb32 => (6, 3),
            other => return Err(EngineError::UnsupportedColorSpace(other)),
        };
        Ok(DepthCodes { surface, command })
    }

    /// Source colour format of the scaled-image object.
    pub fn scaled_source_format(self) -> Result<u32, EngineError> {
        match self {
            ColorSpace::Rgb15 => Ok(2),
            ColorSpace::Rgb16 => Ok(7),
            ColorSpace::Rgb32 => Ok(4),
            ColorSpace::YCbCr422 => Ok(5),
            ColorSpace::Yuv422 => Ok(6),
            ColorSpace::Cmap8 => Err(EngineError::UnsupportedColorSpace(self)),
        }
    }

    pub fn bytes_per_pixel(self) -> u32 {
        match self {
            ColorSpace::Cmap8 => 1,
            ColorSpace::Rgb15 | ColorSpace::Rgb16 | ColorSpace::YCbCr422 | ColorSpace::Yuv422 => 2,
            ColorSpace::Rgb32 => 4,
        }
    }
}

/// The visible frame buffer the 2D engine draws into.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SurfaceConfig {
    /// Byte offset of the frame buffer inside card memory.
    pub frame_buffer_offset: u32,
    pub bytes_per_row: u32,
    pub color_space: ColorSpace,
}

impl SurfaceConfig {
    /// Source and destination pitch packed the way the surface object's `Pitch` method wants.
    pub fn packed_pitch(&self) -> u32 {
        (self.bytes_per_row & 0xffff) | (self.bytes_per_row << 16)
    }
}
