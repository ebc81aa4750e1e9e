//! Scene graph nodes
//!
//! A node owns a local transform matrix, ordered children and lifecycle hooks
//! that run around matrix composition during traversal. Node kinds are a
//! closed set dispatched by the traversal rather than an inheritance chain.

use crate::foundation::math::{Mat4, Mat4Ext, Vec3};
use crate::scene::emitter::{Emitter, Physics};
use crate::scene::geometry::Geometry;
use crate::scene::light::{DistantLight, PointLight};

/// Hook invoked with the node and elapsed seconds, before its matrix is
/// combined with the parent's
pub type BeforeHook = Box<dyn FnMut(&mut SceneNode, f32)>;

/// Hook invoked with the node, its combined world matrix and elapsed
/// seconds, after combination
pub type TransformHook = Box<dyn FnMut(&mut SceneNode, &Mat4, f32)>;

/// The closed set of scene-graph node kinds
pub enum NodeKind {
    /// Pure transform/grouping node
    Group,
    /// Renderable geometry
    Geometry(Geometry),
    /// Directional light
    DistantLight(DistantLight),
    /// Positional light with attenuation
    PointLight(PointLight),
    /// Particle emitter
    Emitter(Emitter),
}

/// A node in the scene graph.
///
/// Parents exclusively own their children; removing a child from the list
/// destroys it. A disabled node is skipped for the frame together with its
/// whole subtree.
pub struct SceneNode {
    /// Optional identifier for per-frame lookup. Duplicate ids are
    /// last-writer-wins in traversal order.
    pub id: Option<String>,
    /// Local transform matrix
    pub matrix: Mat4,
    /// Skip this node and its subtree when set
    pub disabled: bool,
    /// What this node contributes to the frame
    pub kind: NodeKind,
    /// Owned child nodes
    pub children: Vec<SceneNode>,
    /// Physics integration, applied before the before-transform hooks
    pub physics: Option<Physics>,
    /// Absolute expiry time in scene seconds, set on emitter particles
    pub expires_at: Option<f32>,
    before_hooks: Vec<BeforeHook>,
    transform_hooks: Vec<TransformHook>,
    pub(crate) world_matrix: Mat4,
}

impl SceneNode {
    fn with_kind(kind: NodeKind) -> Self {
        Self {
            id: None,
            matrix: Mat4::identity(),
            disabled: false,
            kind,
            children: Vec::new(),
            physics: None,
            expires_at: None,
            before_hooks: Vec::new(),
            transform_hooks: Vec::new(),
            world_matrix: Mat4::identity(),
        }
    }

    /// Create a grouping node with an identity transform
    pub fn group() -> Self {
        Self::with_kind(NodeKind::Group)
    }

    /// Create a node owning geometry
    pub fn geometry(geometry: Geometry) -> Self {
        Self::with_kind(NodeKind::Geometry(geometry))
    }

    /// Create a distant light node
    pub fn distant_light(light: DistantLight) -> Self {
        Self::with_kind(NodeKind::DistantLight(light))
    }

    /// Create a point light node
    pub fn point_light(light: PointLight) -> Self {
        Self::with_kind(NodeKind::PointLight(light))
    }

    /// Create an emitter node
    pub fn emitter(emitter: Emitter) -> Self {
        Self::with_kind(NodeKind::Emitter(emitter))
    }

    /// Builder: attach an id used by `Scene::find_entity`
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Builder: attach a physics component
    pub fn with_physics(mut self, physics: Physics) -> Self {
        self.physics = Some(physics);
        self
    }

    /// Append a child, taking ownership of it
    pub fn add_child(&mut self, child: SceneNode) -> &mut Self {
        self.children.push(child);
        self
    }

    /// Register a hook to run before matrix composition
    pub fn on_before_transform(&mut self, hook: impl FnMut(&mut SceneNode, f32) + 'static) -> &mut Self {
        self.before_hooks.push(Box::new(hook));
        self
    }

    /// Register a hook to run after matrix composition
    pub fn on_transform(&mut self, hook: impl FnMut(&mut SceneNode, &Mat4, f32) + 'static) -> &mut Self {
        self.transform_hooks.push(Box::new(hook));
        self
    }

    /// Reset the local matrix to identity
    pub fn identity(&mut self) -> &mut Self {
        self.matrix = Mat4::identity();
        self
    }

    /// Translate the local matrix
    pub fn translate(&mut self, offset: Vec3) -> &mut Self {
        self.matrix *= Mat4::new_translation(&offset);
        self
    }

    /// Rotate the local matrix around the X axis
    pub fn rotate_x(&mut self, angle: f32) -> &mut Self {
        self.matrix *= Mat4::rotation_x(angle);
        self
    }

    /// Rotate the local matrix around the Y axis
    pub fn rotate_y(&mut self, angle: f32) -> &mut Self {
        self.matrix *= Mat4::rotation_y(angle);
        self
    }

    /// Rotate the local matrix around the Z axis
    pub fn rotate_z(&mut self, angle: f32) -> &mut Self {
        self.matrix *= Mat4::rotation_z(angle);
        self
    }

    /// Rotate the local matrix by Euler angles (roll applied first)
    pub fn rotate(&mut self, yaw: f32, pitch: f32, roll: f32) -> &mut Self {
        self.matrix *= Mat4::from_yaw_pitch_roll(yaw, pitch, roll);
        self
    }

    /// Scale the local matrix
    pub fn scale(&mut self, factors: Vec3) -> &mut Self {
        self.matrix *= Mat4::new_nonuniform_scaling(&factors);
        self
    }

    /// Combined world matrix computed by the most recent traversal
    pub fn world_matrix(&self) -> &Mat4 {
        &self.world_matrix
    }

    /// The node's geometry, if it is a geometry node
    pub fn as_geometry(&self) -> Option<&Geometry> {
        match &self.kind {
            NodeKind::Geometry(geometry) => Some(geometry),
            _ => None,
        }
    }

    /// Mutable access to the node's geometry, if it is a geometry node
    pub fn as_geometry_mut(&mut self) -> Option<&mut Geometry> {
        match &mut self.kind {
            NodeKind::Geometry(geometry) => Some(geometry),
            _ => None,
        }
    }

    /// Run the before-transform hooks. Hooks may register further hooks on
    /// this node; those queue behind the current list.
    pub(crate) fn run_before_hooks(&mut self, dt: f32) {
        if self.before_hooks.is_empty() {
            return;
        }
        let mut hooks = std::mem::take(&mut self.before_hooks);
        for hook in hooks.iter_mut() {
            hook(self, dt);
        }
        hooks.append(&mut self.before_hooks);
        self.before_hooks = hooks;
    }

    /// Run the on-transform hooks with the freshly combined world matrix.
    pub(crate) fn run_transform_hooks(&mut self, world: &Mat4, dt: f32) {
        if self.transform_hooks.is_empty() {
            return;
        }
        let mut hooks = std::mem::take(&mut self.transform_hooks);
        for hook in hooks.iter_mut() {
            hook(self, world, dt);
        }
        hooks.append(&mut self.transform_hooks);
        self.transform_hooks = hooks;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_chained_operations_compose_in_call_order() {
        let mut node = SceneNode::group();
        node.translate(Vec3::new(1.0, 0.0, 0.0))
            .rotate_y(std::f32::consts::FRAC_PI_2);
        let expected = Mat4::new_translation(&Vec3::new(1.0, 0.0, 0.0))
            * Mat4::rotation_y(std::f32::consts::FRAC_PI_2);
        assert_relative_eq!(node.matrix, expected, epsilon = 1e-6);
    }

    #[test]
    fn test_identity_resets_local_matrix() {
        let mut node = SceneNode::group();
        node.translate(Vec3::new(3.0, 4.0, 5.0)).scale(Vec3::new(2.0, 2.0, 2.0));
        node.identity();
        assert_eq!(node.matrix, Mat4::identity());
    }

    #[test]
    fn test_before_hooks_can_register_more_hooks() {
        let mut node = SceneNode::group();
        node.on_before_transform(|node, _dt| {
            node.translate(Vec3::new(1.0, 0.0, 0.0));
            node.on_before_transform(|node, _dt| {
                node.translate(Vec3::new(0.0, 1.0, 0.0));
            });
        });

        // first run: only the original hook fires
        node.run_before_hooks(0.016);
        assert_relative_eq!(node.matrix.m14, 1.0, epsilon = 1e-6);
        assert_relative_eq!(node.matrix.m24, 0.0, epsilon = 1e-6);

        // second run: both hooks fire in registration order
        node.run_before_hooks(0.016);
        assert_relative_eq!(node.matrix.m14, 2.0, epsilon = 1e-6);
        assert_relative_eq!(node.matrix.m24, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_add_child_takes_ownership() {
        let mut parent = SceneNode::group();
        parent.add_child(SceneNode::group().with_id("a"));
        parent.add_child(SceneNode::group().with_id("b"));
        assert_eq!(parent.children.len(), 2);
        assert_eq!(parent.children[1].id.as_deref(), Some("b"));

        parent.children.remove(0);
        assert_eq!(parent.children.len(), 1);
        assert_eq!(parent.children[0].id.as_deref(), Some("b"));
    }
}
