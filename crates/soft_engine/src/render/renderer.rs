//! Surface renderer: object ordering, per-primitive lighting, hidden-surface
//! rejection and draw-call emission against a 2D surface
//!
//! Consumes the render list and lights a completed `Scene::model_view` pass
//! produced. Entities paint back-to-front (painter's algorithm); within an
//! entity, primitives were already ordered by the traversal.

use log::debug;

use crate::foundation::math::{constants, utils, Mat3, Vec2, Vec3, Vec4};
use crate::render::backend::{DrawSurface, Paint};
use crate::render::lighting::{calc_normal_brightness, calc_position_brightness};
use crate::render::RenderError;
use crate::scene::geometry::{Geometry, Polygon};
use crate::scene::node::NodeKind;
use crate::scene::style::{DrawMode, FillMode, ObjectSortMode, ShadeMode, Style};
use crate::scene::{RenderItem, Scene};

/// Pixel amount polygon outlines are inflated by to close rasterization
/// seams between adjacent fills
pub const INFLATE_OFFSET: f32 = 0.5;

/// Renderer configuration
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Clear the viewport rectangle before drawing each frame
    pub clear_surface: bool,
    /// Background color used by hiddenline fills
    pub background: [u8; 3],
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            clear_surface: true,
            background: [0, 0, 0],
        }
    }
}

/// Order the scene's visible entities back-to-front, honoring per-entity
/// `objectsortmode` overrides: `back` entities pin to the far end and paint
/// first, `front` entities pin to the near end and paint last.
pub fn sort_objects(scene: &Scene) -> Vec<RenderItem> {
    let mut items: Vec<RenderItem> = scene.render_list().to_vec();
    for item in &mut items {
        let Some(node) = scene.node_at(&item.path) else {
            continue;
        };
        if let NodeKind::Geometry(geometry) = &node.kind {
            item.average_z = match geometry.style.objectsortmode {
                ObjectSortMode::Sorted => item.average_z,
                ObjectSortMode::Back => f32::INFINITY,
                ObjectSortMode::Front => f32::NEG_INFINITY,
            };
        }
    }
    // NDC depth grows toward the far plane: descending order paints the
    // farthest entity first
    items.sort_by(|a, b| b.average_z.total_cmp(&a.average_z));
    items
}

/// Signed area of the projected polygon's first three vertices (shoelace
/// sum). Negative means back-facing under this winding; the test stays
/// correct under perspective, unlike a camera-space normal dot product.
pub(crate) fn signed_area(screen: &[Vec4], vertices: &[usize]) -> f32 {
    let a = &screen[vertices[0]];
    let b = &screen[vertices[1]];
    let c = &screen[vertices[2]];
    (b.x - a.x) * (c.y - a.y) - (c.x - a.x) * (b.y - a.y)
}

/// Mean world-space position of a polygon's vertices
pub(crate) fn polygon_centroid(world: &[Vec4], vertices: &[usize]) -> Vec3 {
    let mut sum = Vec3::zeros();
    for &v in vertices {
        sum += Vec3::new(world[v].x, world[v].y, world[v].z);
    }
    sum / vertices.len() as f32
}

/// Combine a base color with an accumulated brightness and clamp to 0-255
pub(crate) fn shade(rgb: [u8; 3], brightness: Vec3) -> [u8; 3] {
    [
        (f32::from(rgb[0]) * brightness.x).clamp(0.0, 255.0) as u8,
        (f32::from(rgb[1]) * brightness.y).clamp(0.0, 255.0) as u8,
        (f32::from(rgb[2]) * brightness.z).clamp(0.0, 255.0) as u8,
    ]
}

/// Lit color for a solid polygon under the entity style
pub(crate) fn polygon_color(polygon: &Polygon, style: &Style, world: &[Vec4], lights: &[crate::scene::Light]) -> [u8; 3] {
    let rgb = polygon.color.unwrap_or(style.color);
    match style.shademode {
        ShadeMode::Lightsource => {
            let emit = polygon.emit.unwrap_or(style.emit);
            let centroid = polygon_centroid(world, &polygon.vertices);
            let brightness = Vec3::new(emit, emit, emit)
                + calc_normal_brightness(
                    centroid,
                    polygon.world_normal(),
                    lights,
                    style.diffuse,
                    style.specular,
                );
            shade(rgb, brightness)
        }
        ShadeMode::Plain | ShadeMode::Sprite | ShadeMode::Callback => rgb,
    }
}

/// Perspective-scaled line width or point size; constant when `linescale`
/// is zero
pub(crate) fn scaled_width(style: &Style, depth_w: f32, perspective_scale: f32) -> f32 {
    if style.linescale > 0.0 {
        style.linescale * perspective_scale / utils::nonzero(depth_w)
    } else {
        style.linewidth
    }
}

/// Push each edge's endpoints outward along the edge direction. Every vertex
/// ends up displaced along both adjacent edges, widening the polygon so
/// neighboring fills leave no visible seam. Zero-length edges are guarded
/// with an epsilon instead of dividing by zero.
pub fn inflate_polygon(outline: &mut [Vec2], offset: f32) {
    let len = outline.len();
    if len < 2 {
        return;
    }
    let original = outline.to_vec();
    for i in 0..len {
        let next = (i + 1) % len;
        let edge = original[next] - original[i];
        let length = edge.norm().max(constants::EPSILON);
        let push = edge * (offset / length);
        outline[i] -= push;
        outline[next] += push;
    }
}

/// Draws a scene's render list onto a 2D surface
pub struct SurfaceRenderer<S: DrawSurface> {
    surface: S,
    config: RendererConfig,
}

impl<S: DrawSurface> SurfaceRenderer<S> {
    /// Create a renderer issuing calls to `surface`
    pub fn new(surface: S) -> Self {
        Self {
            surface,
            config: RendererConfig::default(),
        }
    }

    /// Create a renderer with explicit configuration
    pub fn with_config(surface: S, config: RendererConfig) -> Self {
        Self { surface, config }
    }

    /// Access the surface, e.g. to present it
    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Mutable access to the surface
    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    /// Render one frame. `scene.model_view` must have completed for this
    /// frame before rendering begins.
    pub fn render(&mut self, scene: &Scene) -> Result<(), RenderError> {
        if self.config.clear_surface {
            let vp = &scene.viewport;
            self.surface.clear_rect(vp.x, vp.y, vp.width, vp.height);
        }
        let items = sort_objects(scene);
        debug!("render: {} entities", items.len());
        for item in items {
            let Some(node) = scene.node_at(&item.path) else {
                continue;
            };
            let NodeKind::Geometry(geometry) = &node.kind else {
                continue;
            };
            self.render_entity(geometry, scene)?;
        }
        Ok(())
    }

    fn render_entity(&mut self, geometry: &Geometry, scene: &Scene) -> Result<(), RenderError> {
        self.surface.save();
        if let Some(op) = &geometry.style.composite_operation {
            self.surface.set_composite_operation(op);
        }
        let result = match geometry.style.drawmode {
            DrawMode::Solid => self.render_polygons(geometry, scene),
            DrawMode::Wireframe => {
                self.render_edges(geometry, scene);
                Ok(())
            }
            DrawMode::Point => self.render_points(geometry, scene),
        };
        self.surface.restore();
        result
    }

    fn render_polygons(&mut self, geometry: &Geometry, scene: &Scene) -> Result<(), RenderError> {
        let style = &geometry.style;
        let screen = geometry.screen_coords();
        let world = geometry.world_coords();
        let clip = geometry.clip_flags();

        for polygon in &geometry.polygons {
            // a polygon draws unless every vertex lies outside the frustum;
            // the surface handles any remaining per-primitive clipping
            if polygon.vertices.iter().all(|&v| !clip[v].is_empty()) {
                continue;
            }
            if !style.doublesided && signed_area(screen, &polygon.vertices) < 0.0 {
                continue;
            }

            if let Some(texture) = polygon.texture.or(style.texture) {
                self.render_textured_polygon(geometry, polygon, texture)?;
                continue;
            }

            let rgb = polygon_color(polygon, style, world, scene.lights());
            let alpha = polygon.opacity.unwrap_or(style.opacity);
            self.fill_polygon(screen, &polygon.vertices, rgb, alpha, style);
        }
        Ok(())
    }

    fn fill_polygon(
        &mut self,
        screen: &[Vec4],
        vertices: &[usize],
        rgb: [u8; 3],
        alpha: f32,
        style: &Style,
    ) {
        let mut outline: Vec<Vec2> = vertices
            .iter()
            .map(|&v| Vec2::new(screen[v].x, screen[v].y))
            .collect();
        if style.fillmode == FillMode::Inflate {
            inflate_polygon(&mut outline, INFLATE_OFFSET);
        }

        self.trace_path(&outline);
        match style.fillmode {
            FillMode::Fill | FillMode::Inflate => {
                self.surface.set_fill_paint(Paint::with_alpha(rgb, alpha));
                self.surface.fill();
            }
            FillMode::Filltwice => {
                self.surface.set_fill_paint(Paint::with_alpha(rgb, alpha));
                self.surface.fill();
                self.surface.fill();
            }
            FillMode::Fillstroke => {
                self.surface.set_fill_paint(Paint::with_alpha(rgb, alpha));
                self.surface.fill();
                self.surface.set_stroke_paint(Paint::with_alpha(rgb, alpha));
                self.surface.set_line_width(style.linewidth);
                self.surface.stroke();
            }
            FillMode::Hiddenline => {
                // occlude with the background, then draw the outline
                self.surface.set_fill_paint(Paint::opaque(self.config.background));
                self.surface.fill();
                self.surface.set_stroke_paint(Paint::with_alpha(rgb, alpha));
                self.surface.set_line_width(style.linewidth);
                self.surface.stroke();
            }
        }
    }

    fn render_textured_polygon(
        &mut self,
        geometry: &Geometry,
        polygon: &Polygon,
        texture_index: usize,
    ) -> Result<(), RenderError> {
        let texture = geometry
            .textures
            .get(texture_index)
            .ok_or(RenderError::MissingTexture {
                index: texture_index,
                count: geometry.textures.len(),
            })?;
        let Some(uvs) = polygon.uvs.as_deref() else {
            // style-level default texture without UVs on this polygon: fall
            // back to a flat fill in the polygon color
            let rgb = polygon.color.unwrap_or(geometry.style.color);
            let alpha = polygon.opacity.unwrap_or(geometry.style.opacity);
            self.fill_polygon(
                geometry.screen_coords(),
                &polygon.vertices,
                rgb,
                alpha,
                &geometry.style,
            );
            return Ok(());
        };

        let screen = geometry.screen_coords();
        let width = texture.width() as f32;
        let height = texture.height() as f32;
        let (i0, i1, i2) = (
            polygon.vertices[0],
            polygon.vertices[1],
            polygon.vertices[2],
        );

        // affine map from texture pixels to the projected triangle: solve
        // [u v 1] * [a c e]^T = sx and [u v 1] * [b d f]^T = sy
        let uv_matrix = Mat3::new(
            uvs[0].x * width, uvs[0].y * height, 1.0,
            uvs[1].x * width, uvs[1].y * height, 1.0,
            uvs[2].x * width, uvs[2].y * height, 1.0,
        );
        let Some(inverse) = uv_matrix.try_inverse() else {
            // degenerate UV triangle; nothing sensible to map
            return Ok(());
        };
        let sx = inverse * Vec3::new(screen[i0].x, screen[i1].x, screen[i2].x);
        let sy = inverse * Vec3::new(screen[i0].y, screen[i1].y, screen[i2].y);

        let mut outline: Vec<Vec2> = polygon
            .vertices
            .iter()
            .map(|&v| Vec2::new(screen[v].x, screen[v].y))
            .collect();
        inflate_polygon(&mut outline, INFLATE_OFFSET);

        self.surface.save();
        self.trace_path(&outline);
        self.surface.clip();
        self.surface
            .transform(sx.x, sy.x, sx.y, sy.y, sx.z, sy.z);
        self.surface.draw_image(texture, 0.0, 0.0, width, height);
        self.surface.restore();
        Ok(())
    }

    fn render_edges(&mut self, geometry: &Geometry, scene: &Scene) {
        let style = &geometry.style;
        let screen = geometry.screen_coords();
        let world = geometry.world_coords();
        let clip = geometry.clip_flags();

        for edge in &geometry.edges {
            if !clip[edge.a].is_empty() && !clip[edge.b].is_empty() {
                continue;
            }
            let a = &screen[edge.a];
            let b = &screen[edge.b];
            let rgb = if style.shademode == ShadeMode::Lightsource {
                let mid = (world[edge.a] + world[edge.b]) * 0.5;
                shade(
                    style.color,
                    calc_position_brightness(Vec3::new(mid.x, mid.y, mid.z), scene.lights()),
                )
            } else {
                style.color
            };

            self.surface
                .set_line_width(scaled_width(style, (a.w + b.w) * 0.5, scene.perspective_scale()));
            self.surface.set_stroke_paint(Paint::with_alpha(rgb, style.opacity));
            self.surface.begin_path();
            self.surface.move_to(a.x, a.y);
            self.surface.line_to(b.x, b.y);
            self.surface.stroke();
        }
    }

    fn render_points(&mut self, geometry: &Geometry, scene: &Scene) -> Result<(), RenderError> {
        let style = &geometry.style;
        // sprite mode needs its texture up front; a missing one is a
        // scene-authoring error, not a recoverable condition
        let sprite_texture = if style.shademode == ShadeMode::Sprite {
            let index = style.texture.ok_or(RenderError::SpriteTextureUnset)?;
            Some(
                geometry
                    .textures
                    .get(index)
                    .ok_or(RenderError::MissingTexture {
                        index,
                        count: geometry.textures.len(),
                    })?,
            )
        } else {
            None
        };

        let screen = geometry.screen_coords();
        let world = geometry.world_coords();
        let clip = geometry.clip_flags();

        for i in 0..geometry.points.len() {
            if !clip[i].is_empty() {
                continue;
            }
            let coord = &screen[i];
            let size = scaled_width(style, coord.w, scene.perspective_scale());
            match style.shademode {
                ShadeMode::Sprite => {
                    if let Some(texture) = sprite_texture {
                        self.surface.draw_image(
                            texture,
                            coord.x - size * 0.5,
                            coord.y - size * 0.5,
                            size,
                            size,
                        );
                    }
                }
                ShadeMode::Callback => {
                    let surface: &mut dyn DrawSurface = &mut self.surface;
                    for hook in geometry.render_hooks() {
                        hook(surface, coord, &world[i], size);
                    }
                }
                ShadeMode::Plain | ShadeMode::Lightsource => {
                    let rgb = if style.shademode == ShadeMode::Lightsource {
                        let position = Vec3::new(world[i].x, world[i].y, world[i].z);
                        shade(style.color, calc_position_brightness(position, scene.lights()))
                    } else {
                        style.color
                    };
                    self.surface.set_fill_paint(Paint::with_alpha(rgb, style.opacity));
                    self.surface.begin_path();
                    self.surface
                        .arc(coord.x, coord.y, size, 0.0, std::f32::consts::TAU);
                    self.surface.fill();
                }
            }
        }
        Ok(())
    }

    fn trace_path(&mut self, outline: &[Vec2]) {
        self.surface.begin_path();
        if let Some((first, rest)) = outline.split_first() {
            self.surface.move_to(first.x, first.y);
            for point in rest {
                self.surface.line_to(point.x, point.y);
            }
        }
        self.surface.close_path();
    }
}
