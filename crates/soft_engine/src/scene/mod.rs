//! Scene graph, entities and the per-frame transform pipeline

pub mod emitter;
pub mod geometry;
pub mod light;
pub mod node;
mod scene;
pub mod sorting;
pub mod style;

pub use emitter::{Emitter, ParticleHook, Physics, FIXED_STEP};
pub use geometry::{ClipFlags, Edge, Geometry, GeometryError, Polygon, RenderHook};
pub use light::{AttenuationFactor, DistantLight, Light, PointLight};
pub use node::{BeforeHook, NodeKind, SceneNode, TransformHook};
pub use scene::{
    CameraHook, CameraSettings, NodePath, PerspectiveSettings, RenderItem, Scene, Trigger,
    Viewport,
};
pub use style::{DrawMode, FillMode, GeometrySortMode, ObjectSortMode, ShadeMode, Style};

#[cfg(test)]
pub(crate) mod fixtures {
    use super::geometry::{Edge, Geometry, Polygon};
    use super::style::Style;
    use crate::foundation::math::Vec3;

    /// Unit cube centered at the origin: 8 points, 12 edges, 6 quads wound
    /// counter-clockwise seen from outside (normals point outward).
    pub(crate) fn unit_cube(style: Style) -> Geometry {
        let points = vec![
            Vec3::new(-0.5, -0.5, -0.5),
            Vec3::new(0.5, -0.5, -0.5),
            Vec3::new(0.5, 0.5, -0.5),
            Vec3::new(-0.5, 0.5, -0.5),
            Vec3::new(-0.5, -0.5, 0.5),
            Vec3::new(0.5, -0.5, 0.5),
            Vec3::new(0.5, 0.5, 0.5),
            Vec3::new(-0.5, 0.5, 0.5),
        ];
        let edges = vec![
            Edge::new(0, 1),
            Edge::new(1, 2),
            Edge::new(2, 3),
            Edge::new(3, 0),
            Edge::new(4, 5),
            Edge::new(5, 6),
            Edge::new(6, 7),
            Edge::new(7, 4),
            Edge::new(0, 4),
            Edge::new(1, 5),
            Edge::new(2, 6),
            Edge::new(3, 7),
        ];
        let polygons = vec![
            Polygon::new(vec![0, 3, 2, 1]), // -z
            Polygon::new(vec![4, 5, 6, 7]), // +z
            Polygon::new(vec![0, 4, 7, 3]), // -x
            Polygon::new(vec![1, 2, 6, 5]), // +x
            Polygon::new(vec![0, 1, 5, 4]), // -y
            Polygon::new(vec![3, 7, 6, 2]), // +y
        ];
        Geometry::new(points, edges, polygons, style).expect("cube is valid")
    }
}
