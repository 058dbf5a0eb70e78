//! The scene together with the configuration it runs under and the sprite
//! textures its text objects use.
//!
//! [`Stage`] owns the sequencing rules that tie the three together: text is
//! only spawned once its texture is cached, a viewport class change swaps the
//! whole configuration and starts over, and teardown leaves nothing behind.
//! It never touches the GPU; textures are produced by a caller-supplied
//! closure and handed back for release.

use crate::{
    config::{Config, ViewportClass},
    resources::cache::TextureCache,
    scene::{Scene, SpriteTextures},
};

/// Fills a [`TextureCache`] on demand through `create`.
struct CacheFill<'a, T, F> {
    cache: &'a mut TextureCache<T>,
    config: &'a Config,
    create: F,
}

impl<T, F> SpriteTextures for CacheFill<'_, T, F>
where
    F: FnMut(&str, &Config) -> anyhow::Result<T>,
{
    fn prepare(&mut self, text: &str) -> bool {
        let config = self.config;
        let create = &mut self.create;
        match self
            .cache
            .get_or_try_insert_with(text, || create(text, config))
        {
            Ok(_) => true,
            Err(e) => {
                log::warn!("cannot prepare sprite for {text:?}: {e:#}");
                false
            }
        }
    }
}

#[derive(Debug)]
pub struct Stage<T> {
    config: Config,
    class: ViewportClass,
    scene: Scene,
    textures: TextureCache<T>,
}

impl<T> Stage<T> {
    pub fn new(class: ViewportClass, scene: Scene) -> Self {
        Self {
            config: Config::for_viewport(class),
            class,
            scene,
            textures: TextureCache::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn class(&self) -> ViewportClass {
        self.class
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn textures(&self) -> &TextureCache<T> {
        &self.textures
    }

    /// Run `spawn` against the scene with a texture source backed by the cache.
    fn with_textures<R>(
        &mut self,
        create: impl FnMut(&str, &Config) -> anyhow::Result<T>,
        spawn: impl FnOnce(&mut Scene, &Config, &mut dyn SpriteTextures) -> R,
    ) -> R {
        let mut fill = CacheFill {
            cache: &mut self.textures,
            config: &self.config,
            create,
        };
        spawn(&mut self.scene, &self.config, &mut fill)
    }

    /// The initial burst of objects. Returns how many were added.
    pub fn pre_spawn(&mut self, create: impl FnMut(&str, &Config) -> anyhow::Result<T>) -> usize {
        let spawned = self.with_textures(create, |scene, config, textures| {
            scene.pre_spawn(config, textures)
        });
        log::debug!("pre-spawned {spawned} object(s)");
        spawned
    }

    pub fn spawn_tick(&mut self, create: impl FnMut(&str, &Config) -> anyhow::Result<T>) -> bool {
        self.with_textures(create, |scene, config, textures| {
            scene.spawn_tick(config, textures)
        })
    }

    /// One frame of motion. Returns how many objects fell out of view.
    pub fn advance(&mut self) -> usize {
        self.scene.advance(&self.config)
    }

    /// Drop every object and hand back every cached texture for release.
    pub fn teardown(&mut self) -> Vec<T> {
        self.scene.clear();
        self.textures.drain().map(|(_, texture)| texture).collect()
    }

    /// Switch to the configuration for `class` and pre-spawn under it.
    ///
    /// Returns `None` when `class` is already active. Otherwise returns the
    /// textures of the previous configuration, which the caller must release.
    pub fn swap(
        &mut self,
        class: ViewportClass,
        create: impl FnMut(&str, &Config) -> anyhow::Result<T>,
    ) -> Option<Vec<T>> {
        if class == self.class {
            return None;
        }
        log::info!("viewport class changed to {class:?}, swapping configuration");
        let released = self.teardown();
        self.config = Config::for_viewport(class);
        self.class = class;
        self.pre_spawn(create);
        Some(released)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Stand-in texture recording the canvas size it was made for.
    #[derive(Debug, PartialEq)]
    struct Canvas(u32);

    fn canvas(_: &str, config: &Config) -> anyhow::Result<Canvas> {
        Ok(Canvas(config.text_canvas_size))
    }

    fn all_text() -> Stage<Canvas> {
        let mut stage = Stage::new(ViewportClass::Desktop, Scene::new(9));
        stage.config.text_probability = 1.0;
        stage
    }

    fn assert_every_sprite_is_cached(stage: &Stage<Canvas>) {
        for text in stage.scene().objects().iter().filter_map(|o| o.text()) {
            assert!(stage.textures().contains(text), "{text} has no texture");
        }
    }

    #[test]
    fn spawned_text_is_cached_first() {
        let mut stage = all_text();
        assert_eq!(stage.pre_spawn(canvas), 3);
        for _ in 0..20 {
            stage.spawn_tick(canvas);
        }
        assert!(!stage.textures().is_empty());
        assert_every_sprite_is_cached(&stage);
    }

    #[test]
    fn failed_textures_spawn_nothing() {
        let mut stage = all_text();
        let spawned = stage.pre_spawn(|_, _| Err(anyhow::anyhow!("device lost")));
        assert_eq!(spawned, 0);
        assert!(stage.scene().is_empty());
        assert!(stage.textures().is_empty());
    }

    #[test]
    fn swap_replaces_the_configuration_wholesale() {
        let mut stage = all_text();
        stage.pre_spawn(canvas);
        for _ in 0..10 {
            stage.spawn_tick(canvas);
        }
        let cached = stage.textures().len();

        let released = stage.swap(ViewportClass::Mobile, canvas).unwrap();
        assert_eq!(released.len(), cached);
        assert!(released.iter().all(|c| *c == Canvas(768)));

        assert_eq!(stage.class(), ViewportClass::Mobile);
        assert_eq!(*stage.config(), Config::for_viewport(ViewportClass::Mobile));
        assert_eq!(stage.config().max_objects, 15);
        assert!(stage.scene().len() <= 3);
        assert_every_sprite_is_cached(&stage);
        assert!(stage.textures().len() <= stage.scene().len());
        assert!(
            stage
                .scene()
                .objects()
                .iter()
                .filter_map(|o| o.text())
                .all(|t| stage.textures().get(t) == Some(&Canvas(384)))
        );
    }

    #[test]
    fn same_class_is_not_a_swap() {
        let mut stage = all_text();
        stage.pre_spawn(canvas);
        let before = stage.scene().len();
        assert!(stage.swap(ViewportClass::Desktop, canvas).is_none());
        assert_eq!(stage.scene().len(), before);
        assert_eq!(stage.config().max_objects, 30);
    }

    #[test]
    fn teardown_leaves_nothing_behind() {
        let mut stage = all_text();
        stage.pre_spawn(canvas);
        let cached = stage.textures().len();
        assert!(cached > 0);

        let released = stage.teardown();
        assert_eq!(released.len(), cached);
        assert!(stage.scene().is_empty());
        assert!(stage.textures().is_empty());
    }
}
