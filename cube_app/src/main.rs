//! Spinning-cube demo
//!
//! Builds a cube, two lights and a spark emitter, steps the pipeline for a
//! few seconds of simulated time and writes the final software-rasterized
//! frame to `cube.png`.

use soft_engine::prelude::*;
use soft_engine::scene::{Edge, Polygon};

const WIDTH: usize = 512;
const HEIGHT: usize = 512;
const FRAMES: u32 = 120;
const STEP: f32 = 1.0 / 60.0;

fn build_cube() -> Result<Geometry, Box<dyn std::error::Error>> {
    let points = vec![
        Vec3::new(-1.0, -1.0, -1.0),
        Vec3::new(1.0, -1.0, -1.0),
        Vec3::new(1.0, 1.0, -1.0),
        Vec3::new(-1.0, 1.0, -1.0),
        Vec3::new(-1.0, -1.0, 1.0),
        Vec3::new(1.0, -1.0, 1.0),
        Vec3::new(1.0, 1.0, 1.0),
        Vec3::new(-1.0, 1.0, 1.0),
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
        Polygon::new(vec![0, 3, 2, 1]).with_color([220, 60, 60]),
        Polygon::new(vec![4, 5, 6, 7]).with_color([60, 220, 60]),
        Polygon::new(vec![0, 4, 7, 3]).with_color([60, 60, 220]),
        Polygon::new(vec![1, 2, 6, 5]).with_color([220, 220, 60]),
        Polygon::new(vec![0, 1, 5, 4]).with_color([60, 220, 220]),
        Polygon::new(vec![3, 7, 6, 2]).with_color([220, 60, 220]),
    ];
    let style = Style::default().with_specular(4.0);
    Ok(Geometry::new(points, edges, polygons, style)?)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    soft_engine::foundation::logging::init();

    let mut scene = Scene::new();
    scene.viewport = Viewport {
        x: 0.0,
        y: 0.0,
        width: WIDTH as f32,
        height: HEIGHT as f32,
    };
    scene.camera.position = Vec3::new(0.0, 2.0, -8.0);

    let mut cube = SceneNode::geometry(build_cube()?).with_id("cube");
    cube.on_before_transform(|node, dt| {
        node.rotate_y(dt * 0.9).rotate_x(dt * 0.4);
    });
    scene.add_node(cube);

    scene.add_node(SceneNode::distant_light(DistantLight::new(
        Vec3::new(0.2, -0.5, 1.0),
        Vec3::new(1.0, 1.0, 0.9),
        1.0,
    )));
    scene.add_node(SceneNode::point_light(
        PointLight::new(Vec3::new(4.0, 3.0, -4.0), Vec3::new(0.5, 0.7, 1.0), 0.9)
            .with_attenuation(0.25, AttenuationFactor::Linear),
    ));

    let sparks = Emitter::new(Vec3::new(0.0, 1.8, 0.0), 30.0, Vec3::new(0.0, 1.5, 0.0))
        .with_position_rnd(Vec3::new(0.6, 0.0, 0.6))
        .with_velocity_rnd(Vec3::new(0.8, 0.4, 0.8))
        .with_lifetime(1500.0, 500.0)
        .with_gravity()
        .with_maximum(200)
        .with_style(Style::points([255, 220, 120]).with_linewidth(2.0, 0.0));
    scene.add_node(SceneNode::emitter(sparks));

    log::info!("scene built: {} root nodes", scene.graph.len());

    let mut renderer = SoftwareRenderer::new(WIDTH, HEIGHT);
    let mut timer = FrameTimer::new();
    for _ in 0..FRAMES {
        scene.model_view(STEP);
        renderer.clear(pack_rgba([16, 16, 24], 255));
        renderer.render(&scene);
        timer.tick();
    }
    log::info!(
        "rendered {FRAMES} frames in {:.1} ms ({:.0} fps average)",
        timer.total_time() * 1000.0,
        timer.average_fps()
    );

    let buffer = renderer.buffer();
    image::save_buffer(
        "cube.png",
        buffer.as_bytes(),
        WIDTH as u32,
        HEIGHT as u32,
        image::ExtendedColorType::Rgba8,
    )?;
    log::info!("wrote cube.png");
    Ok(())
}
