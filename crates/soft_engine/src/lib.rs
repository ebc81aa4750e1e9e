//! # Soft Engine
//!
//! A software 3D rendering pipeline: hierarchical scene graph, camera and
//! perspective projection, visibility culling, depth sorting, per-primitive
//! lighting and rasterization onto 2D surfaces.
//!
//! ## Per-frame data flow
//!
//! [`Scene::model_view`](scene::Scene::model_view) walks the graph once,
//! transforming every entity through world, camera and clip space, culling
//! entities that fall entirely outside the frustum and collecting a
//! depth-keyed render list plus the frame's lights. A renderer then consumes
//! the scene back-to-front: [`SurfaceRenderer`](render::SurfaceRenderer)
//! emits draw calls against any 2D vector surface, while
//! [`SoftwareRenderer`](render::SoftwareRenderer) rasterizes solid geometry
//! into an owned pixel buffer.
//!
//! ## Quick start
//!
//! ```rust
//! use soft_engine::prelude::*;
//!
//! let mut scene = Scene::new();
//! // ... add geometry, lights and emitters to scene.graph ...
//! scene.model_view(1.0 / 60.0);
//!
//! let mut renderer = SoftwareRenderer::new(640, 480);
//! renderer.render(&scene);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod config;
pub mod foundation;
pub mod render;
pub mod scene;

pub use config::{ConfigError, SceneConfig};

/// Common imports for engine users
pub mod prelude {
    pub use crate::config::SceneConfig;
    pub use crate::foundation::{
        math::{Mat4, Mat4Ext, Vec2, Vec3, Vec4},
        time::FrameTimer,
    };
    pub use crate::render::{
        pack_rgba, DrawSurface, Paint, PixelBuffer, RenderError, SoftwareRenderer,
        SurfaceRenderer, Texture,
    };
    pub use crate::scene::{
        AttenuationFactor, DistantLight, DrawMode, Edge, Emitter, FillMode, Geometry,
        GeometrySortMode, Light, NodeKind, ObjectSortMode, Physics, PointLight, Polygon, Scene,
        SceneNode, ShadeMode, Style, Viewport,
    };
}
