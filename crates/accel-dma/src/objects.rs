//! Engine objects and the handles the driver bound them to.
//!
//! The driver programs the GPU's hash table once at bring-up, linking each handle to an
//! object definition in context memory. The command engine never touches that table; it only
//! needs to know which handle to put on a FIFO channel before addressing an object.

use std::fmt;

/// Opaque identifier of an object definition in GPU context memory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectHandle(pub u32);

impl fmt::Display for ObjectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.0)
    }
}

/// The 2D engine objects the primitive batchers address.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EngineObject {
    /// Raster operation.
    Rop5Solid,
    /// Clip rectangle.
    ImageBlackRectangle,
    ImagePattern,
    /// 2D surface (pitch, offsets and pixel format of the frame buffer).
    Surface2d,
    /// Screen-to-screen blit.
    ImageBlit,
    /// Solid rectangle fills.
    GdiRectangleText,
    /// Scaled and bilinear filtered blit.
    ScaledImageFromMemory,
}

impl EngineObject {
    /// Channel assignment order used when the whole table is rebound.
    ///
    /// Slot `i` of the channel table receives `PRIORITY[i]`; slot 7 stays free.
    pub const PRIORITY: [EngineObject; 7] = [
        EngineObject::Rop5Solid,
        EngineObject::ImageBlackRectangle,
        EngineObject::ImagePattern,
        EngineObject::Surface2d,
        EngineObject::ImageBlit,
        EngineObject::GdiRectangleText,
        EngineObject::ScaledImageFromMemory,
    ];

    /// Channel this object gets when the whole table is rebound.
    pub fn default_channel(self) -> u8 {
        Self::PRIORITY
            .iter()
            .position(|object| *object == self)
            .unwrap_or_default() as u8
    }
}

/// Handle assigned to each [`EngineObject`] by the driver's one-time hash table setup.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HandleTable {
    pub rop5_solid: ObjectHandle,
    pub image_black_rectangle: ObjectHandle,
    pub image_pattern: ObjectHandle,
    pub surface_2d: ObjectHandle,
    pub image_blit: ObjectHandle,
    pub gdi_rectangle_text: ObjectHandle,
    pub scaled_image_from_memory: ObjectHandle,
}

impl Default for HandleTable {
    /// The handle numbering the bring-up script uses for the 2D object set.
    fn default() -> Self {
        Self {
            rop5_solid: ObjectHandle(0x00),
            image_black_rectangle: ObjectHandle(0x01),
            image_pattern: ObjectHandle(0x02),
            scaled_image_from_memory: ObjectHandle(0x03),
            surface_2d: ObjectHandle(0x10),
            image_blit: ObjectHandle(0x11),
            gdi_rectangle_text: ObjectHandle(0x12),
        }
    }
}

impl HandleTable {
    pub fn handle(&self, object: EngineObject) -> ObjectHandle {
        match object {
            EngineObject::Rop5Solid => self.rop5_solid,
            EngineObject::ImageBlackRectangle => self.image_black_rectangle,
            EngineObject::ImagePattern => self.image_pattern,
            EngineObject::Surface2d => self.surface_2d,
            EngineObject::ImageBlit => self.image_blit,
            EngineObject::GdiRectangleText => self.gdi_rectangle_text,
            EngineObject::ScaledImageFromMemory => self.scaled_image_from_memory,
        }
    }

    /// Handles of every object the batchers use, in channel priority order.
    pub fn required(&self) -> [ObjectHandle; 7] {
        EngineObject::PRIORITY.map(|object| self.handle(object))
    }
}
