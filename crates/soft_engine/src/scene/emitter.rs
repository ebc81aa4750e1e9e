//! Particle physics and emitter entities

use rand::Rng;

use crate::foundation::math::{Mat4, Vec3, Vec4};
use crate::scene::geometry::Geometry;
use crate::scene::node::SceneNode;
use crate::scene::style::{DrawMode, ShadeMode, Style};

/// Fixed physics timestep in seconds, independent of wall-clock frame time
pub const FIXED_STEP: f32 = 1.0 / 60.0;

const GRAVITY_Y: f32 = -9.8;

/// Velocity integration under a one-shot impulse, a constant force and
/// optional gravity.
///
/// Integration runs on a fixed simulated timestep once per traversal, so
/// particle motion is frame-rate independent in step count, not wall time.
#[derive(Debug, Clone, Default)]
pub struct Physics {
    /// Current velocity, units per second
    pub velocity: Vec3,
    /// One-shot impulse applied on the next step, then cleared
    pub impulse: Option<Vec3>,
    /// Persistent constant force
    pub force: Option<Vec3>,
    /// Apply constant gravity when set
    pub gravity: bool,
}

impl Physics {
    /// Create a physics component with an initial velocity
    pub fn with_velocity(velocity: Vec3) -> Self {
        Self {
            velocity,
            ..Default::default()
        }
    }

    /// Builder: queue a one-shot impulse
    pub fn with_impulse(mut self, impulse: Vec3) -> Self {
        self.impulse = Some(impulse);
        self
    }

    /// Builder: apply a persistent constant force
    pub fn with_force(mut self, force: Vec3) -> Self {
        self.force = Some(force);
        self
    }

    /// Builder: enable or disable gravity
    pub fn with_gravity(mut self, gravity: bool) -> Self {
        self.gravity = gravity;
        self
    }

    /// Advance one fixed step and return the translation to apply
    pub(crate) fn integrate(&mut self) -> Vec3 {
        if let Some(impulse) = self.impulse.take() {
            self.velocity += impulse;
        }
        if let Some(force) = self.force {
            self.velocity += force * FIXED_STEP;
        }
        if self.gravity {
            self.velocity += Vec3::new(0.0, GRAVITY_Y, 0.0) * FIXED_STEP;
        }
        self.velocity * FIXED_STEP
    }
}

/// Per-particle customization hook, run before a particle joins the graph
pub type ParticleHook = Box<dyn FnMut(&mut SceneNode)>;

/// Spawns and retires short-lived physics-driven point particles.
///
/// Particles are ordinary child nodes of the emitter: single-point geometry
/// with a physics component and an expiry stamp. Removing an expired child
/// from the list destroys it.
pub struct Emitter {
    /// Base local-space spawn position
    pub position: Vec3,
    /// Jitter range around the spawn position; uniform within ± half per axis
    pub position_rnd: Vec3,
    /// Particles emitted per second
    pub rate: f32,
    /// Base particle velocity, units per second
    pub velocity: Vec3,
    /// Jitter range around the velocity; uniform within ± half per axis
    pub velocity_rnd: Vec3,
    /// Particle lifetime in milliseconds; 0 means particles never expire
    pub lifetime: f32,
    /// Jitter range around the lifetime, milliseconds
    pub lifetime_rnd: f32,
    /// Subject particles to gravity
    pub gravity: bool,
    /// Cap on the live particle population
    pub maximum: Option<usize>,
    /// Style applied to each spawned particle
    pub style: Style,
    init_hooks: Vec<ParticleHook>,
    last_emit: Option<f32>,
    world_position: Vec3,
}

impl Emitter {
    /// Create an emitter at a local-space position
    pub fn new(position: Vec3, rate: f32, velocity: Vec3) -> Self {
        let style = Style::default()
            .with_drawmode(DrawMode::Point)
            .with_shademode(ShadeMode::Plain);
        Self {
            position,
            position_rnd: Vec3::zeros(),
            rate,
            velocity,
            velocity_rnd: Vec3::zeros(),
            lifetime: 0.0,
            lifetime_rnd: 0.0,
            gravity: false,
            maximum: None,
            style,
            init_hooks: Vec::new(),
            last_emit: None,
            world_position: position,
        }
    }

    /// Builder: jitter range for spawn positions
    pub fn with_position_rnd(mut self, range: Vec3) -> Self {
        self.position_rnd = range;
        self
    }

    /// Builder: jitter range for spawn velocities
    pub fn with_velocity_rnd(mut self, range: Vec3) -> Self {
        self.velocity_rnd = range;
        self
    }

    /// Builder: bounded particle lifetime in milliseconds, with jitter
    pub fn with_lifetime(mut self, lifetime: f32, lifetime_rnd: f32) -> Self {
        self.lifetime = lifetime;
        self.lifetime_rnd = lifetime_rnd;
        self
    }

    /// Builder: subject particles to gravity
    pub fn with_gravity(mut self) -> Self {
        self.gravity = true;
        self
    }

    /// Builder: cap the live particle population
    pub fn with_maximum(mut self, maximum: usize) -> Self {
        self.maximum = Some(maximum);
        self
    }

    /// Builder: style applied to spawned particles
    pub fn with_style(mut self, style: Style) -> Self {
        self.style = style;
        self
    }

    /// Register a per-particle customization hook
    pub fn on_particle(&mut self, hook: impl FnMut(&mut SceneNode) + 'static) {
        self.init_hooks.push(Box::new(hook));
    }

    /// Emitter world position as of the most recent traversal
    pub fn world_position(&self) -> Vec3 {
        self.world_position
    }

    /// Per-frame emitter pass: refresh the world position, retire expired
    /// particles, then emit whatever the elapsed interval is due.
    pub(crate) fn update(&mut self, children: &mut Vec<SceneNode>, world: &Mat4, now: f32) {
        let origin = world * Vec4::new(self.position.x, self.position.y, self.position.z, 1.0);
        self.world_position = Vec3::new(origin.x, origin.y, origin.z);

        children.retain(|child| child.expires_at.map_or(true, |expiry| expiry > now));

        let Some(last) = self.last_emit else {
            self.last_emit = Some(now);
            return;
        };
        let elapsed_ms = (now - last) * 1000.0;
        let due = (self.rate * elapsed_ms / 1000.0).floor() as usize;
        if due == 0 {
            // keep accumulating until a whole particle is due
            return;
        }

        let budget = self
            .maximum
            .map_or(due, |maximum| due.min(maximum.saturating_sub(children.len())));
        let mut rng = rand::thread_rng();
        for _ in 0..budget {
            let mut particle = self.spawn_particle(&mut rng, now);
            for hook in &mut self.init_hooks {
                hook(&mut particle);
            }
            children.push(particle);
        }
        self.last_emit = Some(now);
    }

    fn spawn_particle(&self, rng: &mut impl Rng, now: f32) -> SceneNode {
        let position = self.position + jitter_vec(rng, self.position_rnd);
        let velocity = self.velocity + jitter_vec(rng, self.velocity_rnd);
        let expires_at = (self.lifetime > 0.0).then(|| {
            let lifetime_ms = (self.lifetime + jitter(rng, self.lifetime_rnd)).max(0.0);
            now + lifetime_ms / 1000.0
        });

        let mut node = SceneNode::geometry(Geometry::particle(self.style.clone()));
        node.translate(position);
        node.physics = Some(Physics::with_velocity(velocity).with_gravity(self.gravity));
        node.expires_at = expires_at;
        node
    }
}

fn jitter_vec(rng: &mut impl Rng, range: Vec3) -> Vec3 {
    Vec3::new(
        jitter(rng, range.x),
        jitter(rng, range.y),
        jitter(rng, range.z),
    )
}

fn jitter(rng: &mut impl Rng, range: f32) -> f32 {
    if range > 0.0 {
        rng.gen_range(-range * 0.5..=range * 0.5)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_impulse_applies_once() {
        let mut physics = Physics::default().with_impulse(Vec3::new(6.0, 0.0, 0.0));
        let first = physics.integrate();
        assert_relative_eq!(first.x, 6.0 * FIXED_STEP, epsilon = 1e-6);
        assert!(physics.impulse.is_none());
        let second = physics.integrate();
        // no force, no gravity: velocity holds steady after the impulse
        assert_relative_eq!(second.x, first.x, epsilon = 1e-6);
    }

    #[test]
    fn test_constant_force_accumulates() {
        let mut physics = Physics::default().with_force(Vec3::new(60.0, 0.0, 0.0));
        let first = physics.integrate();
        let second = physics.integrate();
        assert!(second.x > first.x);
        assert_relative_eq!(physics.velocity.x, 2.0, epsilon = 1e-5);
    }

    #[test]
    fn test_gravity_pulls_down() {
        let mut physics = Physics::default().with_gravity(true);
        physics.integrate();
        assert!(physics.velocity.y < 0.0);
    }

    #[test]
    fn test_emission_waits_for_a_whole_particle() {
        let mut emitter = Emitter::new(Vec3::zeros(), 10.0, Vec3::zeros());
        let world = Mat4::identity();
        let mut children = Vec::new();

        // first call only arms the accumulator
        emitter.update(&mut children, &world, 0.0);
        assert!(children.is_empty());

        // 50 ms at 10/s is half a particle: nothing yet
        emitter.update(&mut children, &world, 0.05);
        assert!(children.is_empty());

        // the accumulator keeps the fractional progress
        emitter.update(&mut children, &world, 0.1);
        assert_eq!(children.len(), 1);
    }

    #[test]
    fn test_maximum_caps_population() {
        let mut emitter = Emitter::new(Vec3::zeros(), 100.0, Vec3::zeros()).with_maximum(5);
        let world = Mat4::identity();
        let mut children = Vec::new();
        for frame in 0..20 {
            emitter.update(&mut children, &world, frame as f32 * 0.1);
            assert!(children.len() <= 5);
        }
        assert_eq!(children.len(), 5);
    }

    #[test]
    fn test_expired_particles_are_swept() {
        let mut emitter = Emitter::new(Vec3::zeros(), 10.0, Vec3::zeros()).with_lifetime(500.0, 0.0);
        let world = Mat4::identity();
        let mut children = Vec::new();
        emitter.update(&mut children, &world, 0.0);
        emitter.update(&mut children, &world, 0.1);
        assert_eq!(children.len(), 1);
        assert!(children[0].expires_at.is_some());

        // well past the 500 ms lifetime and no new particles due
        emitter.update(&mut children, &world, 0.1005);
        assert_eq!(children.len(), 1);
        emitter.update(&mut children, &world, 10.0);
        // the old particle expired; the elapsed interval spawned new ones
        assert!(children.iter().all(|child| child.expires_at.map_or(true, |e| e > 10.0)));
    }

    #[test]
    fn test_particle_hook_runs_before_insertion() {
        let mut emitter = Emitter::new(Vec3::zeros(), 10.0, Vec3::zeros());
        emitter.on_particle(|particle| {
            particle.id = Some("spark".to_string());
        });
        let world = Mat4::identity();
        let mut children = Vec::new();
        emitter.update(&mut children, &world, 0.0);
        emitter.update(&mut children, &world, 0.2);
        assert!(!children.is_empty());
        assert_eq!(children[0].id.as_deref(), Some("spark"));
    }
}
