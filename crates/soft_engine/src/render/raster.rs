//! Fixed-point scanline triangle rasterization and the pixel-buffer renderer
//!
//! The rasterizer evaluates three edge functions in 28.4 fixed point over a
//! clamped bounding box, with top-left fill-rule correction so triangles that
//! share an edge neither gap nor double-draw. It writes flat colors only;
//! lighting happens in the caller.

use log::debug;

use crate::render::renderer::{polygon_color, signed_area, sort_objects};
use crate::scene::node::NodeKind;
use crate::scene::style::DrawMode;
use crate::scene::{Geometry, Scene};

/// Packed RGBA pixel, red in the low byte
pub type Pixel = u32;

/// Pack an RGB color and alpha into a pixel
pub fn pack_rgba(rgb: [u8; 3], alpha: u8) -> Pixel {
    u32::from(rgb[0])
        | u32::from(rgb[1]) << 8
        | u32::from(rgb[2]) << 16
        | u32::from(alpha) << 24
}

/// CPU pixel buffer the scanline rasterizer writes into
pub struct PixelBuffer {
    width: usize,
    height: usize,
    pixels: Vec<Pixel>,
}

impl PixelBuffer {
    /// Create a buffer cleared to transparent black
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width * height],
        }
    }

    /// Width in pixels
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height in pixels
    pub fn height(&self) -> usize {
        self.height
    }

    /// Fill every pixel with one value
    pub fn clear(&mut self, pixel: Pixel) {
        self.pixels.fill(pixel);
    }

    /// Read one pixel; `None` outside the buffer
    pub fn get(&self, x: usize, y: usize) -> Option<Pixel> {
        if x < self.width && y < self.height {
            Some(self.pixels[y * self.width + x])
        } else {
            None
        }
    }

    /// Write one pixel, ignoring out-of-bounds coordinates
    pub fn set(&mut self, x: usize, y: usize, pixel: Pixel) {
        if x < self.width && y < self.height {
            self.pixels[y * self.width + x] = pixel;
        }
    }

    /// Raw pixel data in row-major order
    pub fn pixels(&self) -> &[Pixel] {
        &self.pixels
    }

    /// RGBA byte view for image export
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.pixels)
    }

    /// Rasterize a flat-colored triangle with 28.4 sub-pixel precision.
    ///
    /// Vertices may arrive in either winding; the interior is kept on the
    /// positive side of all three edge functions. Top-left edges own their
    /// boundary pixels, so adjacent triangles sharing an edge cover every
    /// pixel exactly once.
    pub fn fill_triangle(
        &mut self,
        a: (f32, f32),
        b: (f32, f32),
        c: (f32, f32),
        pixel: Pixel,
    ) {
        let double_area = (b.0 - a.0) * (c.1 - a.1) - (c.0 - a.0) * (b.1 - a.1);
        if double_area == 0.0 {
            return;
        }
        // interior-positive orientation is screen counter-clockwise (y down)
        let (b, c) = if double_area > 0.0 { (c, b) } else { (b, c) };

        let x1 = to_fixed(a.0);
        let y1 = to_fixed(a.1);
        let x2 = to_fixed(b.0);
        let y2 = to_fixed(b.1);
        let x3 = to_fixed(c.0);
        let y3 = to_fixed(c.1);

        let dx12 = x1 - x2;
        let dy12 = y1 - y2;
        let dx23 = x2 - x3;
        let dy23 = y2 - y3;
        let dx31 = x3 - x1;
        let dy31 = y3 - y1;

        let min_x = ((x1.min(x2).min(x3) + 0xF) >> 4).max(0);
        let max_x = ((x1.max(x2).max(x3) + 0xF) >> 4).min(self.width as i64);
        let min_y = ((y1.min(y2).min(y3) + 0xF) >> 4).max(0);
        let max_y = ((y1.max(y2).max(y3) + 0xF) >> 4).min(self.height as i64);
        if min_x >= max_x || min_y >= max_y {
            return;
        }

        let mut c1 = dy12 * x1 - dx12 * y1;
        let mut c2 = dy23 * x2 - dx23 * y2;
        let mut c3 = dy31 * x3 - dx31 * y3;
        // top-left fill rule: top and left edges own their boundary pixels
        if dy12 < 0 || (dy12 == 0 && dx12 > 0) {
            c1 += 1;
        }
        if dy23 < 0 || (dy23 == 0 && dx23 > 0) {
            c2 += 1;
        }
        if dy31 < 0 || (dy31 == 0 && dx31 > 0) {
            c3 += 1;
        }

        let mut cy1 = c1 + dx12 * (min_y << 4) - dy12 * (min_x << 4);
        let mut cy2 = c2 + dx23 * (min_y << 4) - dy23 * (min_x << 4);
        let mut cy3 = c3 + dx31 * (min_y << 4) - dy31 * (min_x << 4);
        let fdx12 = dx12 << 4;
        let fdy12 = dy12 << 4;
        let fdx23 = dx23 << 4;
        let fdy23 = dy23 << 4;
        let fdx31 = dx31 << 4;
        let fdy31 = dy31 << 4;

        for y in min_y..max_y {
            let mut cx1 = cy1;
            let mut cx2 = cy2;
            let mut cx3 = cy3;
            let row = y as usize * self.width;
            for x in min_x..max_x {
                if cx1 > 0 && cx2 > 0 && cx3 > 0 {
                    self.pixels[row + x as usize] = pixel;
                }
                cx1 -= fdy12;
                cx2 -= fdy23;
                cx3 -= fdy31;
            }
            cy1 += fdx12;
            cy2 += fdx23;
            cy3 += fdx31;
        }
    }
}

fn to_fixed(value: f32) -> i64 {
    (value * 16.0).round() as i64
}

/// Renders a scene's solid geometry into an owned [`PixelBuffer`] with flat
/// per-polygon lighting.
///
/// Point and wireframe entities are the vector surface renderer's domain and
/// are skipped here. Colors are written with full alpha; there is no
/// per-pixel blending.
pub struct SoftwareRenderer {
    buffer: PixelBuffer,
}

impl SoftwareRenderer {
    /// Create a renderer with an owned output buffer
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            buffer: PixelBuffer::new(width, height),
        }
    }

    /// The output buffer
    pub fn buffer(&self) -> &PixelBuffer {
        &self.buffer
    }

    /// Fill the output with one color
    pub fn clear(&mut self, pixel: Pixel) {
        self.buffer.clear(pixel);
    }

    /// Render one frame of solid geometry. `scene.model_view` must have
    /// completed for this frame first.
    pub fn render(&mut self, scene: &Scene) {
        let items = sort_objects(scene);
        debug!("software render: {} entities", items.len());
        for item in items {
            let Some(node) = scene.node_at(&item.path) else {
                continue;
            };
            let NodeKind::Geometry(geometry) = &node.kind else {
                continue;
            };
            if geometry.style.drawmode != DrawMode::Solid {
                continue;
            }
            self.render_solid(geometry, scene);
        }
    }

    fn render_solid(&mut self, geometry: &Geometry, scene: &Scene) {
        let style = &geometry.style;
        let screen = geometry.screen_coords();
        let world = geometry.world_coords();
        let clip = geometry.clip_flags();

        for polygon in &geometry.polygons {
            if polygon.vertices.iter().all(|&v| !clip[v].is_empty()) {
                continue;
            }
            if !style.doublesided && signed_area(screen, &polygon.vertices) < 0.0 {
                continue;
            }

            let rgb = polygon_color(polygon, style, world, scene.lights());
            let pixel = pack_rgba(rgb, 255);

            // fan triangulation; a quad splits along its 0-2 diagonal
            let v0 = &screen[polygon.vertices[0]];
            for i in 1..polygon.vertices.len() - 1 {
                let v1 = &screen[polygon.vertices[i]];
                let v2 = &screen[polygon.vertices[i + 1]];
                self.buffer
                    .fill_triangle((v0.x, v0.y), (v1.x, v1.y), (v2.x, v2.y), pixel);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec3;
    use crate::scene::fixtures::unit_cube;
    use crate::scene::{DistantLight, SceneNode, Style, Viewport};

    const RED: Pixel = 0xFF00_00FF;
    const GREEN: Pixel = 0xFF00_FF00;

    #[test]
    fn test_pack_rgba_layout() {
        let pixel = pack_rgba([1, 2, 3], 4);
        assert_eq!(pixel & 0xFF, 1);
        assert_eq!((pixel >> 8) & 0xFF, 2);
        assert_eq!((pixel >> 16) & 0xFF, 3);
        assert_eq!((pixel >> 24) & 0xFF, 4);

        let mut buffer = PixelBuffer::new(1, 1);
        buffer.set(0, 0, pixel);
        assert_eq!(buffer.as_bytes(), &[1, 2, 3, 4]);
    }

    #[test]
    fn test_triangle_covers_interior_not_exterior() {
        let mut buffer = PixelBuffer::new(32, 32);
        buffer.fill_triangle((2.0, 2.0), (20.0, 2.0), (2.0, 20.0), RED);

        assert_eq!(buffer.get(5, 5), Some(RED));
        assert_eq!(buffer.get(3, 15), Some(RED));
        // outside the hypotenuse and outside the bounding box stay clear
        assert_eq!(buffer.get(19, 19), Some(0));
        assert_eq!(buffer.get(30, 30), Some(0));
    }

    #[test]
    fn test_winding_does_not_matter() {
        let mut forward = PixelBuffer::new(16, 16);
        forward.fill_triangle((1.0, 1.0), (12.0, 1.0), (1.0, 12.0), RED);
        let mut reversed = PixelBuffer::new(16, 16);
        reversed.fill_triangle((1.0, 1.0), (1.0, 12.0), (12.0, 1.0), RED);
        assert_eq!(forward.pixels(), reversed.pixels());
    }

    #[test]
    fn test_shared_edge_covers_every_pixel_exactly_once() {
        let mut buffer = PixelBuffer::new(16, 16);
        // a quad split along its diagonal
        buffer.fill_triangle((0.0, 0.0), (10.0, 0.0), (0.0, 10.0), RED);
        buffer.fill_triangle((10.0, 0.0), (10.0, 10.0), (0.0, 10.0), GREEN);

        let mut red = 0;
        let mut green = 0;
        for y in 0..10 {
            for x in 0..10 {
                match buffer.get(x, y) {
                    Some(RED) => red += 1,
                    Some(GREEN) => green += 1,
                    Some(0) => {}
                    other => panic!("unexpected pixel {other:?}"),
                }
            }
        }
        // the full interior is covered with no gaps and no double draw:
        // diagonal pixels belong to exactly one triangle
        assert_eq!(red + green, 100);
        assert!(red > 0 && green > 0);
    }

    #[test]
    fn test_offscreen_triangle_is_clamped_not_panicking() {
        let mut buffer = PixelBuffer::new(8, 8);
        buffer.fill_triangle((-100.0, -100.0), (200.0, -50.0), (-50.0, 200.0), RED);
        buffer.fill_triangle((100.0, 100.0), (200.0, 100.0), (100.0, 200.0), GREEN);
        assert!(buffer.pixels().iter().all(|&p| p == RED || p == 0));
    }

    #[test]
    fn test_degenerate_triangle_draws_nothing() {
        let mut buffer = PixelBuffer::new(8, 8);
        buffer.fill_triangle((1.0, 1.0), (5.0, 5.0), (3.0, 3.0), RED);
        assert!(buffer.pixels().iter().all(|&p| p == 0));
    }

    #[test]
    fn test_cube_scene_renders_to_center_of_buffer() {
        let mut scene = Scene::new();
        scene.viewport = Viewport {
            x: 0.0,
            y: 0.0,
            width: 64.0,
            height: 64.0,
        };
        scene.add_node(SceneNode::geometry(unit_cube(Style::plain_solid([
            200, 50, 50,
        ]))));
        scene.add_node(SceneNode::distant_light(DistantLight::new(
            Vec3::new(0.0, 0.0, 1.0),
            Vec3::new(1.0, 1.0, 1.0),
            1.0,
        )));
        scene.model_view(1.0 / 60.0);

        let mut renderer = SoftwareRenderer::new(64, 64);
        renderer.render(&scene);

        let expected = pack_rgba([200, 50, 50], 255);
        assert_eq!(renderer.buffer().get(32, 32), Some(expected));
        assert_eq!(renderer.buffer().get(1, 1), Some(0));
    }

    #[test]
    fn test_lit_cube_face_brightness_depends_on_light() {
        let mut scene = Scene::new();
        scene.viewport = Viewport {
            x: 0.0,
            y: 0.0,
            width: 64.0,
            height: 64.0,
        };
        scene.add_node(SceneNode::geometry(unit_cube(Style::default().with_color(
            [255, 255, 255],
        ))));
        // light shining along +z hits the camera-facing -z face head on
        scene.add_node(SceneNode::distant_light(DistantLight::new(
            Vec3::new(0.0, 0.0, 1.0),
            Vec3::new(1.0, 1.0, 1.0),
            1.0,
        )));
        scene.model_view(1.0 / 60.0);

        let mut renderer = SoftwareRenderer::new(64, 64);
        renderer.render(&scene);
        let center = renderer.buffer().get(32, 32).expect("in bounds");
        // full-intensity white light on a white face saturates the channel
        assert_eq!(center & 0xFF, 255);
    }
}
