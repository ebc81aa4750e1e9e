//! Depth sorting for primitives within one entity
//!
//! Painter's order throughout: farther primitives first, so nearer ones
//! overdraw them. Sort keys come from the camera-space coordinates the
//! traversal populates; camera space looks down -Z, so smaller z is farther.

use crate::foundation::math::Vec4;
use crate::scene::geometry::{ClipFlags, Edge, Polygon};

/// Sort polygons back-to-front by the average camera-space depth of their
/// vertices.
pub fn sort_polygons(polygons: &mut [Polygon], camera: &[Vec4]) {
    polygons.sort_by(|a, b| {
        average_depth(&a.vertices, camera).total_cmp(&average_depth(&b.vertices, camera))
    });
}

/// Sort edges back-to-front by the average depth of their two endpoints.
pub fn sort_edges(edges: &mut [Edge], camera: &[Vec4]) {
    edges.sort_by(|a, b| {
        let depth_a = (camera[a.a].z + camera[a.b].z) * 0.5;
        let depth_b = (camera[b.a].z + camera[b.b].z) * 0.5;
        depth_a.total_cmp(&depth_b)
    });
}

/// Sort the active range of the per-vertex buffers back-to-front.
///
/// One permutation is computed and applied to the screen buffer, the world
/// buffer and the clip flags together, so every index keeps describing the
/// same original vertex. Entries beyond `len` are stale and left untouched.
pub fn sort_points(screen: &mut [Vec4], world: &mut [Vec4], clip: &mut [ClipFlags], len: usize) {
    let mut order: Vec<usize> = (0..len).collect();
    // clip-space w is the view distance: larger w is farther
    order.sort_by(|&a, &b| screen[b].w.total_cmp(&screen[a].w));

    let sorted_screen: Vec<Vec4> = order.iter().map(|&i| screen[i]).collect();
    let sorted_world: Vec<Vec4> = order.iter().map(|&i| world[i]).collect();
    let sorted_clip: Vec<ClipFlags> = order.iter().map(|&i| clip[i]).collect();
    screen[..len].copy_from_slice(&sorted_screen);
    world[..len].copy_from_slice(&sorted_world);
    clip[..len].copy_from_slice(&sorted_clip);
}

fn average_depth(vertices: &[usize], camera: &[Vec4]) -> f32 {
    if vertices.is_empty() {
        return 0.0;
    }
    let sum: f32 = vertices.iter().map(|&v| camera[v].z).sum();
    sum / vertices.len() as f32
}
