//! Geometry entities: vertex/edge/polygon buffers and per-frame derived data

use bitflags::bitflags;
use thiserror::Error;

use crate::foundation::math::{utils, Vec2, Vec3, Vec4};
use crate::render::{DrawSurface, Texture};
use crate::scene::style::Style;

bitflags! {
    /// Frustum outcode for a transformed vertex; empty means inside
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ClipFlags: u8 {
        /// Outside the left clip plane
        const LEFT = 1 << 0;
        /// Outside the right clip plane
        const RIGHT = 1 << 1;
        /// Outside the bottom clip plane
        const BOTTOM = 1 << 2;
        /// Outside the top clip plane
        const TOP = 1 << 3;
        /// In front of the near clip plane
        const NEAR = 1 << 4;
        /// Beyond the far clip plane
        const FAR = 1 << 5;
    }
}

/// Errors detected while constructing geometry
#[derive(Error, Debug)]
pub enum GeometryError {
    /// A polygon referenced fewer than three vertices
    #[error("polygon {index} has {count} vertices; at least 3 are required")]
    DegeneratePolygon {
        /// Position of the offending polygon in the polygon list
        index: usize,
        /// Number of vertices it referenced
        count: usize,
    },

    /// A primitive referenced a vertex index outside the point list
    #[error("{primitive} {index} references vertex {vertex} but only {points} points exist")]
    VertexOutOfRange {
        /// Primitive kind, for the error message
        primitive: &'static str,
        /// Position of the offending primitive in its list
        index: usize,
        /// The out-of-range vertex index
        vertex: usize,
        /// Number of points in the entity
        points: usize,
    },

    /// A polygon's UV list does not match its vertex count
    #[error("polygon {index} has {uvs} UVs for {vertices} vertices")]
    UvCountMismatch {
        /// Position of the offending polygon in the polygon list
        index: usize,
        /// Number of UV coordinates supplied
        uvs: usize,
        /// Number of vertices the polygon references
        vertices: usize,
    },
}

/// An edge between two vertex indices
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    /// First vertex index
    pub a: usize,
    /// Second vertex index
    pub b: usize,
}

impl Edge {
    /// Create an edge between two vertex indices
    pub fn new(a: usize, b: usize) -> Self {
        Self { a, b }
    }
}

/// A polygon over three or more vertex indices with optional per-polygon
/// style overrides
#[derive(Clone)]
pub struct Polygon {
    /// Vertex indices, counter-clockwise when viewed from the front
    pub vertices: Vec<usize>,
    /// Color override, RGB 0-255
    pub color: Option<[u8; 3]>,
    /// Opacity override
    pub opacity: Option<f32>,
    /// Additive emission override
    pub emit: Option<f32>,
    /// Texture index into the owning entity's texture list
    pub texture: Option<usize>,
    /// Texture coordinates, one per vertex, normalized 0-1
    pub uvs: Option<Vec<Vec2>>,
    normal: Vec3,
    world_normal: Vec3,
}

impl Polygon {
    /// Create a polygon over the given vertex indices
    pub fn new(vertices: Vec<usize>) -> Self {
        Self {
            vertices,
            color: None,
            opacity: None,
            emit: None,
            texture: None,
            uvs: None,
            normal: Vec3::zeros(),
            world_normal: Vec3::zeros(),
        }
    }

    /// Builder: override the entity color for this polygon
    pub fn with_color(mut self, color: [u8; 3]) -> Self {
        self.color = Some(color);
        self
    }

    /// Builder: override the entity opacity for this polygon
    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = Some(opacity);
        self
    }

    /// Builder: override the entity emission for this polygon
    pub fn with_emit(mut self, emit: f32) -> Self {
        self.emit = Some(emit);
        self
    }

    /// Builder: texture-map this polygon with per-vertex UVs
    pub fn with_texture(mut self, index: usize, uvs: Vec<Vec2>) -> Self {
        self.texture = Some(index);
        self.uvs = Some(uvs);
        self
    }

    /// Object-space face normal, from the first three vertices
    pub fn normal(&self) -> Vec3 {
        self.normal
    }

    /// World-space face normal as of the most recent traversal
    pub fn world_normal(&self) -> Vec3 {
        self.world_normal
    }

    pub(crate) fn set_world_normal(&mut self, normal: Vec3) {
        self.world_normal = normal;
    }
}

/// Render hook for `ShadeMode::Callback` points: receives the surface, the
/// point's screen coordinate, its world coordinate and the scaled point size
pub type RenderHook = Box<dyn Fn(&mut dyn DrawSurface, &Vec4, &Vec4, f32)>;

/// A scene-graph entity owning renderable geometry.
///
/// The `points` index is the canonical vertex id referenced by edges and
/// polygons. Derived per-frame buffers are sized to the point count and only
/// ever grow; loops are bounded by the active point count so stale tail
/// entries are never read.
pub struct Geometry {
    /// Vertex positions
    pub points: Vec<Vec3>,
    /// Edge list for wireframe drawing
    pub edges: Vec<Edge>,
    /// Polygon list for solid drawing
    pub polygons: Vec<Polygon>,
    /// Texture images referenced by polygons and point sprites
    pub textures: Vec<Texture>,
    /// Rendering style
    pub style: Style,
    render_hooks: Vec<RenderHook>,

    pub(crate) world_coords: Vec<Vec4>,
    pub(crate) camera_coords: Vec<Vec4>,
    pub(crate) screen_coords: Vec<Vec4>,
    pub(crate) clip_flags: Vec<ClipFlags>,
    pub(crate) average_z: f32,
}

impl Geometry {
    /// Create a geometry entity, validating its topology and computing face
    /// normals.
    ///
    /// Fails fast on malformed input: polygons with fewer than three
    /// vertices, primitives referencing missing points, or UV lists that do
    /// not match their polygon's vertex count.
    pub fn new(
        points: Vec<Vec3>,
        edges: Vec<Edge>,
        polygons: Vec<Polygon>,
        style: Style,
    ) -> Result<Self, GeometryError> {
        for (index, edge) in edges.iter().enumerate() {
            for vertex in [edge.a, edge.b] {
                if vertex >= points.len() {
                    return Err(GeometryError::VertexOutOfRange {
                        primitive: "edge",
                        index,
                        vertex,
                        points: points.len(),
                    });
                }
            }
        }
        for (index, polygon) in polygons.iter().enumerate() {
            if polygon.vertices.len() < 3 {
                return Err(GeometryError::DegeneratePolygon {
                    index,
                    count: polygon.vertices.len(),
                });
            }
            for &vertex in &polygon.vertices {
                if vertex >= points.len() {
                    return Err(GeometryError::VertexOutOfRange {
                        primitive: "polygon",
                        index,
                        vertex,
                        points: points.len(),
                    });
                }
            }
            if let Some(uvs) = &polygon.uvs {
                if uvs.len() != polygon.vertices.len() {
                    return Err(GeometryError::UvCountMismatch {
                        index,
                        uvs: uvs.len(),
                        vertices: polygon.vertices.len(),
                    });
                }
            }
        }

        let mut geometry = Self {
            points,
            edges,
            polygons,
            textures: Vec::new(),
            style,
            render_hooks: Vec::new(),
            world_coords: Vec::new(),
            camera_coords: Vec::new(),
            screen_coords: Vec::new(),
            clip_flags: Vec::new(),
            average_z: 0.0,
        };
        geometry.recompute_normals();
        Ok(geometry)
    }

    /// A single-point geometry used for emitter particles
    pub(crate) fn particle(style: Style) -> Self {
        Self {
            points: vec![Vec3::zeros()],
            edges: Vec::new(),
            polygons: Vec::new(),
            textures: Vec::new(),
            style,
            render_hooks: Vec::new(),
            world_coords: Vec::new(),
            camera_coords: Vec::new(),
            screen_coords: Vec::new(),
            clip_flags: Vec::new(),
            average_z: 0.0,
        }
    }

    /// Builder: attach decoded textures
    pub fn with_textures(mut self, textures: Vec<Texture>) -> Self {
        self.textures = textures;
        self
    }

    /// Register a render hook invoked per point under `ShadeMode::Callback`
    pub fn add_render_hook(&mut self, hook: impl Fn(&mut dyn DrawSurface, &Vec4, &Vec4, f32) + 'static) {
        self.render_hooks.push(Box::new(hook));
    }

    /// Registered point render hooks
    pub fn render_hooks(&self) -> &[RenderHook] {
        &self.render_hooks
    }

    /// Recompute object-space face normals from each polygon's first three
    /// vertices. Call after mutating `points` or polygon topology.
    pub fn recompute_normals(&mut self) {
        for polygon in &mut self.polygons {
            let v0 = self.points[polygon.vertices[0]];
            let v1 = self.points[polygon.vertices[1]];
            let v2 = self.points[polygon.vertices[2]];
            polygon.normal = utils::safe_normalize((v1 - v0).cross(&(v2 - v0)));
        }
    }

    /// World-space vertex positions from the most recent traversal
    pub fn world_coords(&self) -> &[Vec4] {
        &self.world_coords
    }

    /// Camera-space vertex positions from the most recent traversal
    pub fn camera_coords(&self) -> &[Vec4] {
        &self.camera_coords
    }

    /// Screen-space vertex positions from the most recent traversal:
    /// viewport x/y, NDC depth, clip-space w
    pub fn screen_coords(&self) -> &[Vec4] {
        &self.screen_coords
    }

    /// Per-vertex frustum outcodes from the most recent traversal
    pub fn clip_flags(&self) -> &[ClipFlags] {
        &self.clip_flags
    }

    /// Mean NDC depth across the entity's vertices, from the most recent
    /// traversal
    pub fn average_depth(&self) -> f32 {
        self.average_z
    }

    /// Grow the derived buffers to cover the current point count. Buffers
    /// never shrink, so repeated frames reuse the same allocations.
    pub(crate) fn ensure_frame_buffers(&mut self) {
        let len = self.points.len();
        if self.world_coords.len() < len {
            self.world_coords.resize(len, Vec4::zeros());
            self.camera_coords.resize(len, Vec4::zeros());
            self.screen_coords.resize(len, Vec4::zeros());
            self.clip_flags.resize(len, ClipFlags::empty());
        }
    }
}
