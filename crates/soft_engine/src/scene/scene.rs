//! Scene orchestration: graph traversal and the per-frame transform pipeline
//!
//! `Scene::model_view` is the heart of the engine. It walks the graph once
//! per frame, depth-first and parent-matrix-first, transforming geometry
//! through world, camera and clip space, flagging out-of-frustum vertices,
//! mapping survivors into the viewport and collecting a depth-keyed render
//! list plus the frame's lights. Renderers consume those outputs afterwards;
//! traversal always completes before rendering begins.

use std::collections::HashMap;
use std::mem;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::config::SceneConfig;
use crate::foundation::math::{utils, Mat4, Mat4Ext, Vec3, Vec4};
use crate::scene::emitter::Physics;
use crate::scene::geometry::{ClipFlags, Geometry};
use crate::scene::light::Light;
use crate::scene::node::{NodeKind, SceneNode};
use crate::scene::sorting;
use crate::scene::style::{DrawMode, GeometrySortMode, ShadeMode};

/// Camera placement settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    /// Eye position in world space
    pub position: Vec3,
    /// Point the camera looks at
    pub lookat: Vec3,
    /// Up vector
    pub up: Vec3,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, -10.0),
            lookat: Vec3::zeros(),
            up: Vec3::new(0.0, 1.0, 0.0),
        }
    }
}

/// Perspective projection settings
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct PerspectiveSettings {
    /// Vertical field of view in degrees
    pub fov: f32,
    /// Width over height
    pub aspect: f32,
    /// Near plane distance (positive)
    pub near: f32,
    /// Far plane distance (positive)
    pub far: f32,
}

impl Default for PerspectiveSettings {
    fn default() -> Self {
        Self {
            fov: 35.0,
            aspect: 1.0,
            near: 1.0,
            far: 10000.0,
        }
    }
}

/// Output viewport rectangle in pixels
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct Viewport {
    /// Left edge
    pub x: f32,
    /// Top edge
    pub y: f32,
    /// Width in pixels
    pub width: f32,
    /// Height in pixels
    pub height: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: 1024.0,
            height: 1024.0,
        }
    }
}

/// Path of child indices addressing a node in the graph
pub type NodePath = Vec<usize>;

/// One visible entity produced by the traversal
#[derive(Debug, Clone)]
pub struct RenderItem {
    /// Address of the geometry node in the graph
    pub path: NodePath,
    /// Mean NDC depth across the entity's vertices; larger is farther
    pub average_z: f32,
}

/// Camera hook: may mutate the camera settings before the view matrix is
/// built, taking effect the same frame
pub type CameraHook = Box<dyn FnMut(&mut CameraSettings, f32)>;

/// Frame trigger run after traversal; returning true expires the trigger
pub type Trigger = Box<dyn FnMut(&mut Scene, f32) -> bool>;

/// Pipeline orchestrator owning the graph, camera configuration and the
/// per-frame render/light outputs
pub struct Scene {
    /// Camera placement
    pub camera: CameraSettings,
    /// Projection parameters
    pub perspective: PerspectiveSettings,
    /// Output rectangle
    pub viewport: Viewport,
    /// Scene graph roots
    pub graph: Vec<SceneNode>,
    camera_hooks: Vec<CameraHook>,
    triggers: Vec<Trigger>,
    render_list: Vec<RenderItem>,
    lights: Vec<Light>,
    entity_index: HashMap<String, NodePath>,
    perspective_scale: f32,
    total_time: f32,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    /// Create an empty scene with default camera, projection and viewport
    pub fn new() -> Self {
        Self::with_config(SceneConfig::default())
    }

    /// Create a scene from a parsed configuration record
    pub fn with_config(config: SceneConfig) -> Self {
        let perspective_scale = (256.0 - config.perspective.fov) / 16.0;
        Self {
            camera: config.camera,
            perspective: config.perspective,
            viewport: config.viewport,
            graph: Vec::new(),
            camera_hooks: Vec::new(),
            triggers: Vec::new(),
            render_list: Vec::new(),
            lights: Vec::new(),
            entity_index: HashMap::new(),
            perspective_scale,
            total_time: 0.0,
        }
    }

    /// Add a root node to the graph
    pub fn add_node(&mut self, node: SceneNode) {
        self.graph.push(node);
    }

    /// Register a camera hook, run before the view matrix is built
    pub fn on_camera(&mut self, hook: impl FnMut(&mut CameraSettings, f32) + 'static) {
        self.camera_hooks.push(Box::new(hook));
    }

    /// Register a trigger handler, run once per frame after traversal until
    /// it reports completion. Triggers may mutate the graph and may register
    /// further triggers during their own pass.
    pub fn add_trigger(&mut self, trigger: impl FnMut(&mut Scene, f32) -> bool + 'static) {
        self.triggers.push(Box::new(trigger));
    }

    /// Visible entities from the most recent traversal, in traversal order
    pub fn render_list(&self) -> &[RenderItem] {
        &self.render_list
    }

    /// Lights collected by the most recent traversal
    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    /// Scene seconds accumulated across `model_view` calls
    pub fn total_time(&self) -> f32 {
        self.total_time
    }

    /// Line/point perspective scale constant for the current field of view
    pub fn perspective_scale(&self) -> f32 {
        self.perspective_scale
    }

    /// Resolve a node by child-index path
    pub fn node_at(&self, path: &[usize]) -> Option<&SceneNode> {
        let (&first, rest) = path.split_first()?;
        let mut node = self.graph.get(first)?;
        for &index in rest {
            node = node.children.get(index)?;
        }
        Some(node)
    }

    /// Mutable variant of [`Self::node_at`]
    pub fn node_at_mut(&mut self, path: &[usize]) -> Option<&mut SceneNode> {
        let (&first, rest) = path.split_first()?;
        let mut node = self.graph.get_mut(first)?;
        for &index in rest {
            node = node.children.get_mut(index)?;
        }
        Some(node)
    }

    /// Look up a node by the id registered during the most recent traversal.
    /// Duplicate ids resolve to the last node visited.
    pub fn find_entity(&self, id: &str) -> Option<&SceneNode> {
        self.entity_index.get(id).and_then(|path| self.node_at(path))
    }

    /// Run the per-frame transform pipeline. `dt` is elapsed seconds since
    /// the previous call, from any tick source; the traversal is independent
    /// of any target frame rate.
    pub fn model_view(&mut self, dt: f32) {
        self.total_time += dt;

        // camera hooks run before look_at so mutations take effect this frame
        let mut camera_hooks = mem::take(&mut self.camera_hooks);
        for hook in camera_hooks.iter_mut() {
            hook(&mut self.camera, dt);
        }
        camera_hooks.append(&mut self.camera_hooks);
        self.camera_hooks = camera_hooks;

        let camera_matrix = Mat4::look_at(self.camera.position, self.camera.lookat, self.camera.up);
        let projection = Mat4::perspective(
            utils::deg_to_rad(self.perspective.fov),
            self.perspective.aspect,
            self.perspective.near,
            self.perspective.far,
        );
        self.perspective_scale = (256.0 - self.perspective.fov) / 16.0;

        let env = TraversalEnv {
            camera: camera_matrix,
            projection,
            viewport: self.viewport,
            dt,
            now: self.total_time,
        };
        let mut frame = FrameState {
            render_list: Vec::new(),
            lights: Vec::new(),
            index: HashMap::new(),
        };
        let mut path = NodePath::new();
        for (index, node) in self.graph.iter_mut().enumerate() {
            path.push(index);
            process_node(node, None, &env, &mut frame, &mut path);
            path.pop();
        }
        debug!(
            "model_view: {} visible entities, {} lights",
            frame.render_list.len(),
            frame.lights.len()
        );
        self.render_list = frame.render_list;
        self.lights = frame.lights;
        self.entity_index = frame.index;

        // trigger pass: the list is detached while running so handlers can
        // remove themselves and register new triggers without invalidation
        let now = self.total_time;
        let mut triggers = mem::take(&mut self.triggers);
        triggers.retain_mut(|trigger| !trigger(self, now));
        let mut registered = mem::take(&mut self.triggers);
        triggers.append(&mut registered);
        self.triggers = triggers;
    }
}

struct TraversalEnv {
    camera: Mat4,
    projection: Mat4,
    viewport: Viewport,
    dt: f32,
    now: f32,
}

struct FrameState {
    render_list: Vec<RenderItem>,
    lights: Vec<Light>,
    index: HashMap<String, NodePath>,
}

fn process_node(
    node: &mut SceneNode,
    parent: Option<&Mat4>,
    env: &TraversalEnv,
    frame: &mut FrameState,
    path: &mut NodePath,
) {
    if node.disabled {
        return;
    }
    if let Some(id) = &node.id {
        // last writer wins on duplicate ids
        frame.index.insert(id.clone(), path.clone());
    }

    let step = node.physics.as_mut().map(Physics::integrate);
    if let Some(step) = step {
        node.translate(step);
    }

    node.run_before_hooks(env.dt);

    let world = match parent {
        Some(parent) => parent * node.matrix,
        None => node.matrix,
    };
    node.world_matrix = world;
    node.run_transform_hooks(&world, env.dt);

    match &mut node.kind {
        NodeKind::Group | NodeKind::Emitter(_) => {}
        NodeKind::DistantLight(light) => {
            light.update_world_direction(&world);
            frame.lights.push(light.snapshot());
        }
        NodeKind::PointLight(light) => {
            light.update_world_position(&world);
            frame.lights.push(light.snapshot());
        }
        NodeKind::Geometry(geometry) => {
            if let Some(average_z) = project_geometry(geometry, &world, env) {
                frame.render_list.push(RenderItem {
                    path: path.clone(),
                    average_z,
                });
            }
        }
    }

    // emitters mutate their child list, so they run outside the kind match
    if matches!(node.kind, NodeKind::Emitter(_)) {
        let SceneNode {
            ref mut kind,
            ref mut children,
            ref world_matrix,
            ..
        } = *node;
        if let NodeKind::Emitter(emitter) = kind {
            emitter.update(children, world_matrix, env.now);
        }
    }

    let parent_matrix = node.world_matrix;
    for (index, child) in node.children.iter_mut().enumerate() {
        path.push(index);
        process_node(child, Some(&parent_matrix), env, frame, path);
        path.pop();
    }
}

/// Transform an entity's vertices through world, camera and clip space, flag
/// frustum membership, map into the viewport and prepare primitive ordering.
/// Returns the entity's average depth, or `None` when every vertex is
/// clipped and the entity drops out of the frame.
fn project_geometry(geometry: &mut Geometry, world: &Mat4, env: &TraversalEnv) -> Option<f32> {
    let len = geometry.points.len();
    geometry.ensure_frame_buffers();

    // point primitives get clip slack so large sprites near the frustum edge
    // do not vanish before their center leaves the view
    let clip_offset = if geometry.style.drawmode == DrawMode::Point {
        if geometry.style.linescale > 0.0 {
            geometry.style.linescale * 0.5
        } else {
            geometry.style.linewidth * 0.5
        }
    } else {
        0.0
    };

    let half_width = env.viewport.width * 0.5;
    let half_height = env.viewport.height * 0.5;
    let mut clipped = 0usize;
    let mut depth_sum = 0.0f32;

    for i in 0..len {
        let p = geometry.points[i];
        let world_pos = world * Vec4::new(p.x, p.y, p.z, 1.0);
        let camera_pos = env.camera * world_pos;
        let clip_pos = env.projection * camera_pos;

        let w = clip_pos.w;
        let mut flags = ClipFlags::empty();
        if clip_pos.x < -(w + clip_offset) {
            flags |= ClipFlags::LEFT;
        }
        if clip_pos.x > w + clip_offset {
            flags |= ClipFlags::RIGHT;
        }
        if clip_pos.y < -(w + clip_offset) {
            flags |= ClipFlags::BOTTOM;
        }
        if clip_pos.y > w + clip_offset {
            flags |= ClipFlags::TOP;
        }
        // near/far use the tighter bound: no point-size slack on depth
        if clip_pos.z < -w {
            flags |= ClipFlags::NEAR;
        }
        if clip_pos.z > w {
            flags |= ClipFlags::FAR;
        }
        if !flags.is_empty() {
            clipped += 1;
        }

        let divisor = utils::nonzero(w);
        let ndc_x = clip_pos.x / divisor;
        let ndc_y = clip_pos.y / divisor;
        let ndc_z = clip_pos.z / divisor;
        depth_sum += ndc_z;

        geometry.world_coords[i] = world_pos;
        geometry.camera_coords[i] = camera_pos;
        geometry.screen_coords[i] = Vec4::new(
            half_width * ndc_x + env.viewport.x + half_width,
            half_height * ndc_y + env.viewport.y + half_height,
            ndc_z,
            w,
        );
        geometry.clip_flags[i] = flags;
    }

    geometry.average_z = if len > 1 {
        depth_sum / len as f32
    } else {
        depth_sum
    };

    // partial clip passes through; only a fully clipped entity drops out
    if len > 0 && clipped == len {
        return None;
    }

    sort_primitives(geometry);

    if geometry.style.drawmode == DrawMode::Solid
        && geometry.style.shademode == ShadeMode::Lightsource
    {
        update_world_normals(geometry, world);
    }

    Some(geometry.average_z)
}

fn sort_primitives(geometry: &mut Geometry) {
    let drawmode = geometry.style.drawmode;
    let shademode = geometry.style.shademode;
    let should_sort = match geometry.style.geometrysortmode {
        GeometrySortMode::None => false,
        GeometrySortMode::Sorted => true,
        GeometrySortMode::Automatic => {
            drawmode == DrawMode::Solid || shademode == ShadeMode::Lightsource
        }
    };
    if !should_sort {
        return;
    }
    match drawmode {
        DrawMode::Solid => sorting::sort_polygons(&mut geometry.polygons, &geometry.camera_coords),
        DrawMode::Wireframe => sorting::sort_edges(&mut geometry.edges, &geometry.camera_coords),
        DrawMode::Point => {
            let len = geometry.points.len();
            sorting::sort_points(
                &mut geometry.screen_coords,
                &mut geometry.world_coords,
                &mut geometry.clip_flags,
                len,
            );
        }
    }
}

fn update_world_normals(geometry: &mut Geometry, world: &Mat4) {
    // inverse-transpose keeps normals perpendicular under non-uniform scale
    let normal_matrix = match world.try_inverse() {
        Some(inverse) => inverse.transpose(),
        None => {
            warn!("singular world matrix; transforming normals without inverse-transpose");
            *world
        }
    };
    for polygon in &mut geometry.polygons {
        let normal = normal_matrix.transform_vector(&polygon.normal());
        polygon.set_world_normal(utils::safe_normalize(normal));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::emitter::Emitter;
    use crate::scene::fixtures::unit_cube;
    use crate::scene::light::DistantLight;
    use crate::scene::style::Style;
    use approx::assert_relative_eq;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_cube_renders_centered_with_no_clipping() {
        let mut scene = Scene::new();
        scene.add_node(SceneNode::geometry(unit_cube(Style::default())));
        scene.model_view(1.0 / 60.0);

        assert_eq!(scene.render_list().len(), 1);
        let geometry = scene.graph[0].as_geometry().expect("geometry node");
        assert!(geometry.clip_flags().iter().all(ClipFlags::is_empty));

        let (mut min_x, mut max_x) = (f32::MAX, f32::MIN);
        let (mut min_y, mut max_y) = (f32::MAX, f32::MIN);
        for coord in geometry.screen_coords() {
            min_x = min_x.min(coord.x);
            max_x = max_x.max(coord.x);
            min_y = min_y.min(coord.y);
            max_y = max_y.max(coord.y);
        }
        assert_relative_eq!((min_x + max_x) * 0.5, 512.0, epsilon = 1.0);
        assert_relative_eq!((min_y + max_y) * 0.5, 512.0, epsilon = 1.0);
    }

    #[test]
    fn test_entity_beyond_far_plane_is_dropped() {
        let mut scene = Scene::new();
        let mut node = SceneNode::geometry(unit_cube(Style::default()));
        node.translate(Vec3::new(0.0, 0.0, 50000.0));
        scene.add_node(node);
        scene.model_view(1.0 / 60.0);

        assert!(scene.render_list().is_empty());
        let geometry = scene.graph[0].as_geometry().expect("geometry node");
        assert!(geometry
            .clip_flags()
            .iter()
            .all(|flags| flags.contains(ClipFlags::FAR)));
    }

    #[test]
    fn test_partially_clipped_entity_stays_visible() {
        let mut scene = Scene::new();
        let mut node = SceneNode::geometry(unit_cube(Style::default()));
        node.translate(Vec3::new(3.0, 0.0, 0.0));
        scene.add_node(node);
        scene.model_view(1.0 / 60.0);

        assert_eq!(scene.render_list().len(), 1);
        let geometry = scene.graph[0].as_geometry().expect("geometry node");
        let clipped = geometry
            .clip_flags()
            .iter()
            .filter(|flags| !flags.is_empty())
            .count();
        assert!(clipped > 0 && clipped < geometry.points.len());
    }

    #[test]
    fn test_disabled_subtree_is_skipped() {
        let mut scene = Scene::new();
        let mut parent = SceneNode::geometry(unit_cube(Style::default())).with_id("parent");
        parent.add_child(SceneNode::geometry(unit_cube(Style::default())).with_id("child"));
        parent.disabled = true;
        scene.add_node(parent);
        scene.model_view(1.0 / 60.0);

        assert!(scene.render_list().is_empty());
        assert!(scene.find_entity("parent").is_none());
        assert!(scene.find_entity("child").is_none());
    }

    #[test]
    fn test_child_world_matrix_composes_after_parent() {
        let mut scene = Scene::new();
        let mut parent = SceneNode::group();
        parent.translate(Vec3::new(1.0, 0.0, 0.0));
        let mut child = SceneNode::group().with_id("leaf");
        child.translate(Vec3::new(0.0, 2.0, 0.0));
        parent.add_child(child);
        scene.add_node(parent);
        scene.model_view(1.0 / 60.0);

        let leaf = scene.find_entity("leaf").expect("registered");
        let world = leaf.world_matrix();
        assert_relative_eq!(world.m14, 1.0, epsilon = 1e-6);
        assert_relative_eq!(world.m24, 2.0, epsilon = 1e-6);
    }

    #[test]
    fn test_transform_hook_sees_combined_matrix() {
        let seen = Rc::new(RefCell::new(None));
        let mut scene = Scene::new();
        let mut parent = SceneNode::group();
        parent.translate(Vec3::new(5.0, 0.0, 0.0));
        let mut child = SceneNode::group();
        child.translate(Vec3::new(0.0, 3.0, 0.0));
        let record = Rc::clone(&seen);
        child.on_transform(move |_node, world, _dt| {
            *record.borrow_mut() = Some((world.m14, world.m24));
        });
        parent.add_child(child);
        scene.add_node(parent);
        scene.model_view(1.0 / 60.0);

        assert_eq!(*seen.borrow(), Some((5.0, 3.0)));
    }

    #[test]
    fn test_camera_hook_mutates_before_look_at() {
        let mut scene = Scene::new();
        scene.add_node(SceneNode::geometry(unit_cube(Style::default())));
        scene.on_camera(|camera, _dt| {
            // pull the camera close enough that the cube spills off screen
            camera.position = Vec3::new(0.0, 0.0, -0.75);
        });
        scene.model_view(1.0 / 60.0);

        let geometry = scene.graph[0].as_geometry().expect("geometry node");
        assert!(geometry.clip_flags().iter().any(|flags| !flags.is_empty()));
    }

    #[test]
    fn test_duplicate_ids_resolve_to_last_visited() {
        let mut scene = Scene::new();
        let mut first = SceneNode::group().with_id("dup");
        first.translate(Vec3::new(1.0, 0.0, 0.0));
        let mut second = SceneNode::group().with_id("dup");
        second.translate(Vec3::new(2.0, 0.0, 0.0));
        scene.add_node(first);
        scene.add_node(second);
        scene.model_view(1.0 / 60.0);

        let found = scene.find_entity("dup").expect("registered");
        assert_relative_eq!(found.matrix.m14, 2.0, epsilon = 1e-6);
    }

    #[test]
    fn test_lights_are_collected_not_rendered() {
        let mut scene = Scene::new();
        scene.add_node(SceneNode::distant_light(DistantLight::new(
            Vec3::new(0.0, 0.0, 1.0),
            Vec3::new(1.0, 1.0, 1.0),
            1.0,
        )));
        scene.model_view(1.0 / 60.0);

        assert_eq!(scene.lights().len(), 1);
        assert!(scene.render_list().is_empty());
    }

    #[test]
    fn test_solid_polygons_sort_back_to_front() {
        let mut scene = Scene::new();
        scene.add_node(SceneNode::geometry(unit_cube(Style::default())));
        scene.model_view(1.0 / 60.0);

        let geometry = scene.graph[0].as_geometry().expect("geometry node");
        // camera sits at -z: the +z face is farthest and must come first
        assert_eq!(geometry.polygons[0].vertices, vec![4, 5, 6, 7]);
        assert_eq!(geometry.polygons[5].vertices, vec![0, 3, 2, 1]);
    }

    #[test]
    fn test_world_normals_follow_rotation() {
        let mut scene = Scene::new();
        let mut node = SceneNode::geometry(unit_cube(Style::default()));
        node.rotate_y(std::f32::consts::PI);
        scene.add_node(node);
        scene.model_view(1.0 / 60.0);

        let geometry = scene.graph[0].as_geometry().expect("geometry node");
        let minus_z_face = geometry
            .polygons
            .iter()
            .find(|polygon| polygon.vertices == vec![0, 3, 2, 1])
            .expect("face present");
        // the -z face normal yawed half a turn now points along +z
        assert_relative_eq!(minus_z_face.world_normal().z, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_triggers_self_expire_and_register() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut scene = Scene::new();
        let outer_log = Rc::clone(&log);
        scene.add_trigger(move |scene, _now| {
            outer_log.borrow_mut().push("first");
            let inner_log = Rc::clone(&outer_log);
            scene.add_trigger(move |_scene, _now| {
                inner_log.borrow_mut().push("second");
                true
            });
            true
        });

        scene.model_view(1.0 / 60.0);
        assert_eq!(*log.borrow(), vec!["first"]);
        scene.model_view(1.0 / 60.0);
        assert_eq!(*log.borrow(), vec!["first", "second"]);
        scene.model_view(1.0 / 60.0);
        assert_eq!(*log.borrow(), vec!["first", "second"]);
    }

    #[test]
    fn test_emitter_population_respects_maximum() {
        let mut scene = Scene::new();
        let emitter = Emitter::new(Vec3::zeros(), 10.0, Vec3::new(0.0, 1.0, 0.0)).with_maximum(5);
        scene.add_node(SceneNode::emitter(emitter));

        for _ in 0..100 {
            scene.model_view(0.1);
            assert!(scene.graph[0].children.len() <= 5);
        }
        assert_eq!(scene.graph[0].children.len(), 5);
    }

    #[test]
    fn test_emitted_particles_render_as_points() {
        let mut scene = Scene::new();
        let emitter = Emitter::new(Vec3::zeros(), 10.0, Vec3::zeros()).with_maximum(3);
        scene.add_node(SceneNode::emitter(emitter));
        scene.model_view(0.0);
        scene.model_view(0.5);

        // particles spawned this frame were traversed and projected
        assert!(!scene.render_list().is_empty());
        for item in scene.render_list() {
            let node = scene.node_at(&item.path).expect("path resolves");
            assert!(node.as_geometry().is_some());
        }
    }

    #[test]
    fn test_total_time_accumulates_dt() {
        let mut scene = Scene::new();
        scene.model_view(0.25);
        scene.model_view(0.25);
        assert_relative_eq!(scene.total_time(), 0.5, epsilon = 1e-6);
    }
}
