//! The falling-object simulation.
//!
//! [`Scene`] owns the active set and knows nothing about the GPU. Text sprites
//! need a rasterized texture before they may spawn, which is requested through
//! the [`SpriteTextures`] seam so the simulation can be driven headless.

use std::ops::Range;

use cgmath::{Deg, EuclideanSpace, MetricSpace, Point3, Quaternion, Rad, Rotation3, Vector3};
use rand::{Rng, SeedableRng, rngs::SmallRng};

use crate::{
    config::{Config, Rgb},
    data_structures::instance::{Instance, SpriteInstance},
};

#[derive(Clone, Debug, PartialEq)]
pub enum ObjectKind {
    Heart,
    Text { text: String },
}

#[derive(Clone, Debug, PartialEq)]
pub struct FallingObject {
    pub kind: ObjectKind,
    pub position: Vector3<f32>,
    /// Downward speed in world units per frame.
    pub velocity: f32,
    pub rotation_y: f32,
    pub scale: f32,
}

impl FallingObject {
    pub fn is_text(&self) -> bool {
        matches!(self.kind, ObjectKind::Text { .. })
    }

    pub fn text(&self) -> Option<&str> {
        match &self.kind {
            ObjectKind::Text { text } => Some(text),
            ObjectKind::Heart => None,
        }
    }

    /// Model transform of a heart: flipped about X, then spun about Y.
    pub fn heart_instance(&self) -> Instance {
        Instance {
            position: self.position,
            rotation: Quaternion::from_angle_x(Deg(180.0))
                * Quaternion::from_angle_y(Rad(self.rotation_y)),
            scale: Vector3::new(self.scale, self.scale, self.scale),
        }
    }

    pub fn sprite_instance(&self, config: &Config) -> SpriteInstance {
        SpriteInstance {
            position: self.position.into(),
            size: [config.text_scale, config.text_height_scale],
        }
    }
}

/// Provides sprite textures for text objects.
pub trait SpriteTextures {
    /// Make sure a texture for `text` exists. Returns `false` if none can be made.
    fn prepare(&mut self, text: &str) -> bool;
}

/// The shared sprite tint for a hue phase.
pub fn tint_rgb(phase: f32) -> Rgb {
    let channel = |offset: f32| ((phase + offset).sin() * 127.0 + 128.0).floor() as u8;
    Rgb::new(channel(0.0), channel(2.0), channel(4.0))
}

/// Group consecutive equal keys into instance ranges.
pub fn texture_runs<'a>(keys: impl IntoIterator<Item = &'a str>) -> Vec<(&'a str, Range<u32>)> {
    let mut runs: Vec<(&str, Range<u32>)> = Vec::new();
    for (i, key) in keys.into_iter().enumerate() {
        let i = i as u32;
        match runs.last_mut() {
            Some((last, range)) if *last == key => range.end = i + 1,
            _ => runs.push((key, i..i + 1)),
        }
    }
    runs
}

#[derive(Debug)]
pub struct Scene {
    objects: Vec<FallingObject>,
    hue_phase: f32,
    rng: SmallRng,
}

impl Scene {
    pub fn new(seed: u64) -> Self {
        Self {
            objects: Vec::new(),
            hue_phase: 0.0,
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// A scene seeded from the wall clock.
    pub fn from_clock() -> Self {
        Self::new(instant::now().to_bits())
    }

    pub fn objects(&self) -> &[FallingObject] {
        &self.objects
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn hue_phase(&self) -> f32 {
        self.hue_phase
    }

    pub fn tint(&self) -> Rgb {
        tint_rgb(self.hue_phase)
    }

    fn spawn_position(&mut self, config: &Config) -> Vector3<f32> {
        Vector3::new(
            (self.rng.random::<f32>() - 0.5) * config.spawn_width,
            config.start_height + self.rng.random::<f32>() * config.spawn_height_jitter,
            (self.rng.random::<f32>() - 0.5) * config.spawn_depth,
        )
    }

    pub fn make_heart(&mut self, config: &Config) -> FallingObject {
        FallingObject {
            kind: ObjectKind::Heart,
            position: self.spawn_position(config),
            velocity: 0.0,
            rotation_y: 0.0,
            scale: config.heart_scale,
        }
    }

    /// A text sprite, or `None` if there is nothing to show or no texture for it.
    pub fn make_text(
        &mut self,
        config: &Config,
        textures: &mut dyn SpriteTextures,
    ) -> Option<FallingObject> {
        if config.text_content.is_empty() {
            return None;
        }
        let text = config.text_content[self.rng.random_range(0..config.text_content.len())].clone();
        if !textures.prepare(&text) {
            return None;
        }
        let mut position = self.spawn_position(config);
        position.z += (self.rng.random::<f32>() - 0.5) * config.text_z_offset;
        Some(FallingObject {
            kind: ObjectKind::Text { text },
            position,
            velocity: 0.0,
            rotation_y: 0.0,
            scale: 1.0,
        })
    }

    /// Roll for a kind and add the object. Returns whether anything was added.
    pub fn spawn_one(&mut self, config: &Config, textures: &mut dyn SpriteTextures) -> bool {
        let is_text = self.rng.random::<f32>() < config.text_probability;
        let object = if is_text {
            self.make_text(config, textures)
        } else {
            Some(self.make_heart(config))
        };
        match object {
            Some(object) => {
                self.objects.push(object);
                true
            }
            None => false,
        }
    }

    /// The initial burst. Failed text spawns are not retried.
    pub fn pre_spawn(&mut self, config: &Config, textures: &mut dyn SpriteTextures) -> usize {
        (0..config.pre_spawn_count())
            .filter(|_| self.spawn_one(config, textures))
            .count()
    }

    /// One spawn-interval tick: at most one new object, never beyond capacity.
    pub fn spawn_tick(&mut self, config: &Config, textures: &mut dyn SpriteTextures) -> bool {
        self.objects.len() < config.max_objects && self.spawn_one(config, textures)
    }

    /// Advance one frame of falling and hue cycling. Returns how many objects fell out.
    pub fn advance(&mut self, config: &Config) -> usize {
        let before = self.objects.len();
        self.objects.retain_mut(|object| {
            object.velocity += config.gravity;
            object.position.y -= object.velocity;
            object.rotation_y += config.heart_rotation_speed;
            object.position.y >= config.fall_threshold
        });
        self.hue_phase += config.hue_step;
        before - self.objects.len()
    }

    pub fn clear(&mut self) {
        self.objects.clear();
    }

    pub fn hearts(&self) -> impl Iterator<Item = &FallingObject> {
        self.objects.iter().filter(|o| !o.is_text())
    }

    /// Text sprites ordered far to near from `eye`.
    pub fn sprites_back_to_front(&self, eye: Point3<f32>) -> Vec<&FallingObject> {
        let eye = eye.to_vec();
        let mut sprites: Vec<(&FallingObject, f32)> = self
            .objects
            .iter()
            .filter(|o| o.is_text())
            .map(|o| (o, o.position.distance2(eye)))
            .collect();
        sprites.sort_by(|a, b| b.1.total_cmp(&a.1));
        sprites.into_iter().map(|(o, _)| o).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeTextures {
        available: bool,
        prepared: Vec<String>,
    }

    impl FakeTextures {
        fn available() -> Self {
            Self {
                available: true,
                prepared: Vec::new(),
            }
        }

        fn missing() -> Self {
            Self {
                available: false,
                prepared: Vec::new(),
            }
        }
    }

    impl SpriteTextures for FakeTextures {
        fn prepare(&mut self, text: &str) -> bool {
            self.prepared.push(text.to_string());
            self.available
        }
    }

    fn heart_at(y: f32) -> FallingObject {
        FallingObject {
            kind: ObjectKind::Heart,
            position: Vector3::new(0.0, y, 0.0),
            velocity: 0.0,
            rotation_y: 0.0,
            scale: 1.0,
        }
    }

    fn text_at(text: &str, z: f32) -> FallingObject {
        FallingObject {
            kind: ObjectKind::Text {
                text: text.to_string(),
            },
            position: Vector3::new(0.0, 0.0, z),
            velocity: 0.0,
            rotation_y: 0.0,
            scale: 1.0,
        }
    }

    #[test]
    fn one_frame_of_motion() {
        let config = Config::base();
        let mut scene = Scene::new(1);
        scene.objects.push(heart_at(20.0));

        assert_eq!(scene.advance(&config), 0);
        let heart = &scene.objects[0];
        assert!((heart.velocity - 0.0005).abs() < 1e-9);
        assert!((heart.position.y - 19.9995).abs() < 1e-5);
        assert!((heart.rotation_y - 0.01).abs() < 1e-7);
        assert!((scene.hue_phase() - 0.01).abs() < 1e-7);
    }

    #[test]
    fn objects_below_the_threshold_are_removed() {
        let config = Config::base();
        let mut scene = Scene::new(1);
        scene.objects.push(heart_at(-29.9999));
        scene.objects.push(heart_at(0.0));
        scene.objects[0].velocity = 0.1;

        assert_eq!(scene.advance(&config), 1);
        assert_eq!(scene.len(), 1);
        assert_eq!(scene.objects[0].position.y, -0.0005);
    }

    #[test]
    fn tint_follows_the_sine_cycle() {
        assert_eq!(tint_rgb(0.0), Rgb::new(128, 243, 31));
        let quarter = tint_rgb(std::f32::consts::FRAC_PI_2);
        assert_eq!(quarter.r, 255);
    }

    #[test]
    fn spawned_hearts_land_in_the_spawn_box() {
        let config = Config::base();
        let mut scene = Scene::new(7);
        for _ in 0..200 {
            let heart = scene.make_heart(&config);
            assert!(heart.position.x >= -15.0 && heart.position.x < 15.0);
            assert!(heart.position.y >= 20.0 && heart.position.y < 25.0);
            assert!(heart.position.z >= -10.0 && heart.position.z < 10.0);
            assert_eq!(heart.velocity, 0.0);
            assert_eq!(heart.scale, config.heart_scale);
        }
    }

    #[test]
    fn text_sprites_pick_from_the_content_list() {
        let config = Config::base();
        let mut scene = Scene::new(3);
        let mut textures = FakeTextures::available();
        for _ in 0..50 {
            let sprite = scene.make_text(&config, &mut textures).unwrap();
            let text = sprite.text().unwrap();
            assert!(config.text_content.iter().any(|t| t == text));
            assert!(sprite.position.z.abs() <= 10.0 + 0.05);
        }
        assert_eq!(textures.prepared.len(), 50);
    }

    #[test]
    fn text_factory_yields_nothing_without_textures() {
        let mut config = Config::base();
        config.text_probability = 1.0;
        let mut scene = Scene::new(3);
        let mut textures = FakeTextures::missing();

        assert_eq!(scene.pre_spawn(&config, &mut textures), 0);
        assert!(scene.is_empty());
        // every attempt asked for a texture exactly once
        assert_eq!(textures.prepared.len(), 3);
    }

    #[test]
    fn pre_spawn_respects_small_capacities() {
        let mut config = Config::base();
        config.max_objects = 2;
        config.text_probability = 0.0;
        let mut scene = Scene::new(11);
        assert_eq!(scene.pre_spawn(&config, &mut FakeTextures::missing()), 2);
        assert_eq!(scene.len(), 2);
    }

    #[test]
    fn spawn_ticks_stop_at_capacity() {
        let config = Config::for_width(375.0);
        let mut scene = Scene::new(5);
        let mut textures = FakeTextures::available();
        for _ in 0..100 {
            scene.spawn_tick(&config, &mut textures);
            assert!(scene.len() <= config.max_objects);
        }
        assert_eq!(scene.len(), config.max_objects);
        assert!(!scene.spawn_tick(&config, &mut textures));
    }

    #[test]
    fn sprites_sort_far_to_near() {
        let mut scene = Scene::new(0);
        scene.objects.push(text_at("near", 5.0));
        scene.objects.push(heart_at(0.0));
        scene.objects.push(text_at("far", -5.0));
        scene.objects.push(text_at("middle", 0.0));

        let order: Vec<_> = scene
            .sprites_back_to_front(Point3::new(0.0, 0.0, 8.0))
            .into_iter()
            .filter_map(FallingObject::text)
            .collect();
        assert_eq!(order, ["far", "middle", "near"]);
        assert_eq!(scene.hearts().count(), 1);
    }

    #[test]
    fn runs_group_consecutive_textures() {
        let runs = texture_runs(["a", "a", "b", "a"]);
        assert_eq!(runs, vec![("a", 0..2), ("b", 2..3), ("a", 3..4)]);
        assert!(texture_runs([]).is_empty());
    }

    #[test]
    fn heart_instances_are_flipped() {
        let heart = heart_at(0.0);
        let matrix = heart.heart_instance().to_matrix();
        // the authored +Y of the outline points down after the flip
        assert!((matrix.y.y + 1.0).abs() < 1e-6, "{matrix:?}");
    }
}
