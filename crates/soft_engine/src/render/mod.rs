//! Rendering: lighting math, draw-call emission against 2D surfaces and the
//! software scanline rasterizer

pub mod backend;
pub mod lighting;
pub mod raster;
pub mod renderer;

use thiserror::Error;

pub use backend::{DrawSurface, Paint, Texture};
pub use raster::{pack_rgba, Pixel, PixelBuffer, SoftwareRenderer};
pub use renderer::{sort_objects, RendererConfig, SurfaceRenderer, INFLATE_OFFSET};

/// Errors surfaced while drawing a frame.
///
/// These indicate scene-authoring mistakes and are fatal for the frame;
/// numeric degeneracies are recovered locally and never reported here.
#[derive(Error, Debug)]
pub enum RenderError {
    /// A polygon or sprite referenced a texture index that is not loaded
    #[error("texture index {index} out of range; entity has {count} textures")]
    MissingTexture {
        /// The requested texture index
        index: usize,
        /// Number of textures on the entity
        count: usize,
    },

    /// Point-sprite shading requires a default texture on the style
    #[error("sprite shademode requires style.texture to be set")]
    SpriteTextureUnset,
}
