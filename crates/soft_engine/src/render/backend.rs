//! 2D drawing surface abstraction consumed by the renderer
//!
//! Any immediate-mode 2D API exposing these primitives is a valid backend.
//! The engine only issues calls; it never re-specifies surface behavior.

use image::RgbaImage;

/// RGB color with straight alpha, as handed to the surface
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Paint {
    /// Red, green, blue, 0-255
    pub rgb: [u8; 3],
    /// Alpha, 0-1
    pub alpha: f32,
}

impl Paint {
    /// Opaque paint from an RGB triple
    pub fn opaque(rgb: [u8; 3]) -> Self {
        Self { rgb, alpha: 1.0 }
    }

    /// Paint with explicit alpha
    pub fn with_alpha(rgb: [u8; 3], alpha: f32) -> Self {
        Self { rgb, alpha }
    }
}

/// Texture handle: a decoded RGBA image with known pixel dimensions
pub struct Texture {
    image: RgbaImage,
}

impl Texture {
    /// Wrap a decoded image
    pub fn new(image: RgbaImage) -> Self {
        Self { image }
    }

    /// Width in pixels
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Height in pixels
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Pixel data, for surfaces that blit directly
    pub fn image(&self) -> &RgbaImage {
        &self.image
    }
}

/// The 2D drawing operations the renderer issues
pub trait DrawSurface {
    /// Clear a rectangle back to the surface background
    fn clear_rect(&mut self, x: f32, y: f32, width: f32, height: f32);

    /// Push the current drawing state
    fn save(&mut self);

    /// Pop the drawing state
    fn restore(&mut self);

    /// Blend mode passthrough
    fn set_composite_operation(&mut self, op: &str);

    /// Fill color for subsequent fills
    fn set_fill_paint(&mut self, paint: Paint);

    /// Stroke color for subsequent strokes
    fn set_stroke_paint(&mut self, paint: Paint);

    /// Stroke width in pixels
    fn set_line_width(&mut self, width: f32);

    /// Start a new path
    fn begin_path(&mut self);

    /// Close the current subpath
    fn close_path(&mut self);

    /// Move the path cursor without drawing
    fn move_to(&mut self, x: f32, y: f32);

    /// Line segment from the cursor to a point
    fn line_to(&mut self, x: f32, y: f32);

    /// Circular arc around a center point
    fn arc(&mut self, x: f32, y: f32, radius: f32, start_angle: f32, end_angle: f32);

    /// Fill the current path
    fn fill(&mut self);

    /// Stroke the current path
    fn stroke(&mut self);

    /// Clip subsequent drawing to the current path
    fn clip(&mut self);

    /// Multiply the current transform by the affine matrix
    /// `[a c e; b d f; 0 0 1]`
    fn transform(&mut self, a: f32, b: f32, c: f32, d: f32, e: f32, f: f32);

    /// Blit a whole texture through the current transform and clip
    fn draw_image(&mut self, texture: &Texture, dx: f32, dy: f32, dwidth: f32, dheight: f32);
}
