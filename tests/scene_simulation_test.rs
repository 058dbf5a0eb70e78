use cgmath::Point3;
use heart_fall::{
    config::{Config, ViewportClass},
    scene::{Scene, texture_runs},
};

use crate::common::test_utils::RecordingTextures;

mod common;

// frames per spawn tick at 60 fps with the default 50 ms interval
const FRAMES_PER_TICK: usize = 3;

#[test]
fn pre_spawned_objects_fall_out_of_view() {
    let config = Config::for_viewport(ViewportClass::Desktop);
    let mut scene = Scene::new(7);
    let mut textures = RecordingTextures::default();

    assert_eq!(scene.pre_spawn(&config, &mut textures), 3);
    let mut removed = 0;
    for _ in 0..1000 {
        removed += scene.advance(&config);
    }
    assert_eq!(removed, 3);
    assert!(scene.is_empty());
}

#[test]
fn population_never_exceeds_capacity() {
    for class in [ViewportClass::Mobile, ViewportClass::Desktop] {
        let config = Config::for_viewport(class);
        let mut scene = Scene::new(42);
        let mut textures = RecordingTextures::default();
        scene.pre_spawn(&config, &mut textures);

        let mut peak = scene.len();
        for frame in 0..20_000 {
            if frame % FRAMES_PER_TICK == 0 {
                scene.spawn_tick(&config, &mut textures);
            }
            scene.advance(&config);
            peak = peak.max(scene.len());
        }
        assert!(peak <= config.max_objects, "{class:?}: {peak} objects alive");
        assert!(peak > config.pre_spawn_count());
    }
}

#[test]
fn every_label_comes_from_the_text_list() {
    let config = Config::default();
    let mut scene = Scene::new(3);
    let mut textures = RecordingTextures::default();
    for _ in 0..200 {
        scene.spawn_one(&config, &mut textures);
    }

    let labels: Vec<&str> = scene.objects().iter().filter_map(|o| o.text()).collect();
    assert!(!labels.is_empty());
    assert!(labels.iter().all(|label| config.text_content.iter().any(|t| t == label)));
    assert!(labels.iter().all(|label| textures.prepared.contains(*label)));
}

#[test]
fn without_textures_only_hearts_fall() {
    let config = Config::default();
    let mut scene = Scene::new(11);
    let mut textures = RecordingTextures::disabled();
    for _ in 0..200 {
        scene.spawn_one(&config, &mut textures);
    }

    assert!(textures.requests > 0);
    assert!(scene.objects().iter().all(|o| !o.is_text()));
    assert_eq!(scene.hearts().count(), scene.len());
}

#[test]
fn sprite_batches_cover_every_sprite_once() {
    let config = Config::default();
    let mut scene = Scene::new(5);
    let mut textures = RecordingTextures::default();
    for _ in 0..100 {
        scene.spawn_one(&config, &mut textures);
    }

    let sprites = scene.sprites_back_to_front(Point3::new(0.0, 0.0, 8.0));
    let runs = texture_runs(sprites.iter().filter_map(|s| s.text()));
    let mut next = 0;
    for (_, range) in &runs {
        assert_eq!(range.start, next);
        assert!(range.end > range.start);
        next = range.end;
    }
    assert_eq!(next as usize, sprites.len());
}

#[test]
fn hue_phase_advances_once_per_frame() {
    let config = Config::default();
    let mut scene = Scene::new(1);
    for _ in 0..100 {
        scene.advance(&config);
    }
    assert!((scene.hue_phase() - 100.0 * config.hue_step).abs() < 1e-4);
}
