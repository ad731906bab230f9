//! Viewport geometry shared by every renderer

/// Viewport in device-independent pixels plus the device pixel ratio
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Width in device-independent pixels
    pub width: f32,
    /// Height in device-independent pixels
    pub height: f32,
    /// Physical pixels per device-independent pixel
    pub device_pixel_ratio: f32,
}

impl Viewport {
    /// Create a viewport, sanitizing a non-positive or non-finite ratio to 1.0
    pub fn new(width: f32, height: f32, device_pixel_ratio: f32) -> Self {
        let device_pixel_ratio = if device_pixel_ratio > 0.0 && device_pixel_ratio.is_finite() {
            device_pixel_ratio
        } else {
            1.0
        };
        Self {
            width: width.max(0.0),
            height: height.max(0.0),
            device_pixel_ratio,
        }
    }

    /// True when there is nothing to draw into
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// Width in physical pixels
    pub fn physical_width(&self) -> u32 {
        (self.width * self.device_pixel_ratio).round() as u32
    }

    /// Height in physical pixels
    pub fn physical_height(&self) -> u32 {
        (self.height * self.device_pixel_ratio).round() as u32
    }

    /// Map a point in device-independent pixels to normalized device coordinates
    ///
    /// Origin is top-left, y grows downwards (matching widget coordinates).
    #[inline]
    pub fn to_ndc(&self, x: f32, y: f32) -> [f32; 2] {
        if self.is_empty() {
            return [0.0, 0.0];
        }
        [x / self.width * 2.0 - 1.0, 1.0 - y / self.height * 2.0]
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(0.0, 0.0, 1.0)
    }
}
