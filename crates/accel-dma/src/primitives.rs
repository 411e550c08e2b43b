//! Primitive descriptors handed in by the driver's dispatch table, and their argument words.
//!
//! Coordinates follow the host graphics subsystem's conventions: rectangle edges are inclusive,
//! and blit sizes are given as "extent minus one". Degenerate geometry is encoded as-is.

use crate::surface::{ColorSpace, SurfaceConfig};

/// Pack two 16-bit fields into one argument word, `hi` in the upper half.
fn pack(hi: u32, lo: u32) -> u32 {
    ((hi & 0xffff) << 16) | (lo & 0xffff)
}

/// Solid rectangle with inclusive edges.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FillRect {
    pub left: u16,
    pub top: u16,
    pub right: u16,
    pub bottom: u16,
}

impl FillRect {
    pub const fn new(left: u16, top: u16, right: u16, bottom: u16) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// `LeftTop` and `WidthHeight` words of one unclipped-rectangle entry.
    pub fn words(&self) -> [u32; 2] {
        let width = (u32::from(self.right) + 1).wrapping_sub(u32::from(self.left));
        let height = (u32::from(self.bottom) + 1).wrapping_sub(u32::from(self.top));
        [
            pack(self.left.into(), self.top.into()),
            pack(width, height),
        ]
    }
}

/// Horizontal one-pixel-high run from `left` to `right` (inclusive) on row `y`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Span {
    pub y: u16,
    pub left: u16,
    pub right: u16,
}

impl Span {
    pub const fn new(y: u16, left: u16, right: u16) -> Self {
        Self { y, left, right }
    }

    /// Spans go through the same rectangle array as fills, with a height of one.
    pub fn words(&self) -> [u32; 2] {
        let width = (u32::from(self.right) + 1).wrapping_sub(u32::from(self.left));
        [pack(self.left.into(), self.y.into()), pack(width, 1)]
    }
}

/// Screen-to-screen copy. `width` and `height` are the extent minus one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Blit {
    pub src_left: u16,
    pub src_top: u16,
    pub dest_left: u16,
    pub dest_top: u16,
    pub width: u16,
    pub height: u16,
}

impl Blit {
    /// `SourceOrg`, `DestOrg` and `HeightWidth`.
    pub fn words(&self) -> [u32; 3] {
        [
            pack(self.src_top.into(), self.src_left.into()),
            pack(self.dest_top.into(), self.dest_left.into()),
            pack(u32::from(self.height) + 1, u32::from(self.width) + 1),
        ]
    }
}

/// Stretching copy with bilinear filtering. All extents are the size minus one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScaledBlit {
    pub src_left: u16,
    pub src_top: u16,
    pub src_width: u16,
    pub src_height: u16,
    pub dest_left: u16,
    pub dest_top: u16,
    pub dest_width: u16,
    pub dest_height: u16,
}

/// Centre-of-pixel origin for the scaled image source.
const SOURCE_ORIGIN_CENTER: u32 = 1 << 16;
/// Bilinear (foh) interpolation for the scaled image source.
const SOURCE_FILTER_BILINEAR: u32 = 1 << 24;

impl ScaledBlit {
    /// Inverse scale factor in 12.20 fixed point, saturating at `u32::MAX` for shrink
    /// factors of 4096 and beyond.
    fn inverse_scale(src_extent: u16, dest_extent: u16) -> u32 {
        let src = u64::from(src_extent) + 1;
        let dest = u64::from(dest_extent) + 1;
        u32::try_from((src << 20) / dest).unwrap_or(u32::MAX)
    }

    /// Arguments of `SourceOrg`..`DeltaDyDx`: clip origin, clip size, destination origin,
    /// destination size and the two inverse scale factors.
    pub fn destination_words(&self) -> [u32; 6] {
        let dest_size = pack(
            u32::from(self.dest_height) + 1,
            u32::from(self.dest_width) + 1,
        );
        [
            0,
            dest_size,
            pack(self.dest_top.into(), self.dest_left.into()),
            dest_size,
            Self::inverse_scale(self.src_width, self.dest_width),
            Self::inverse_scale(self.src_height, self.dest_height),
        ]
    }

    /// Arguments of `SourceSize`..`SourceRef`.
    ///
    /// The engine wants an even source width.
    pub fn source_words(&self, source: &OffscreenSource) -> [u32; 4] {
        let width = (u32::from(self.src_width) + 2) & !1;
        let offset = source
            .offset
            .wrapping_add(u32::from(self.src_top).wrapping_mul(source.bytes_per_row))
            .wrapping_add(u32::from(self.src_left) * source.color_space.bytes_per_pixel());
        [
            pack(u32::from(self.src_height) + 1, width),
            (source.bytes_per_row & 0xffff) | SOURCE_ORIGIN_CENTER | SOURCE_FILTER_BILINEAR,
            offset,
            0,
        ]
    }
}

/// Source bitmap of a scaled blit that does not live in the visible frame buffer
/// (overlay and video bitmaps).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OffscreenSource {
    /// Byte offset of the bitmap inside card memory.
    pub offset: u32,
    pub bytes_per_row: u32,
    pub color_space: ColorSpace,
}

impl From<&SurfaceConfig> for OffscreenSource {
    fn from(surface: &SurfaceConfig) -> Self {
        Self {
            offset: surface.frame_buffer_offset,
            bytes_per_row: surface.bytes_per_row,
            color_space: surface.color_space,
        }
    }
}
