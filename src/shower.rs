//! The falling-hearts flow.
//!
//! [`HeartShower`] connects the CPU [`Stage`] to the GPU: it owns the shared
//! heart mesh, the label font and the per-frame instance buffers, and it
//! uploads a sprite texture the first time a label is spawned.

use instant::Duration;
use winit::event::WindowEvent;

use crate::{
    config::{Config, ViewportClass},
    context::{Context, InitContext},
    data_structures::{
        instance::{InstanceBuffer, InstanceRaw, SpriteInstance},
        model::{Material, MaterialUniform, Mesh},
        texture::Texture,
    },
    flow::{FlowConstructor, GraphicsFlow, Out},
    pipelines::transparent::{Tint, mk_texture_bind_group},
    render::{Instanced, Render, Sprites},
    resources::{
        self,
        heart::heart_mesh,
        text::{NeonFont, NeonStyle},
    },
    scene::{Scene, texture_runs, tint_rgb},
    stage::Stage,
};

/// A rasterized label on the GPU.
#[derive(Debug)]
pub struct SpriteTexture {
    pub texture: Texture,
    pub bind_group: wgpu::BindGroup,
}

/// GPU handles needed to upload sprite textures.
#[derive(Clone, Copy)]
pub struct Uploader<'a> {
    pub device: &'a wgpu::Device,
    pub queue: &'a wgpu::Queue,
    pub layout: &'a wgpu::BindGroupLayout,
    pub sampler: &'a wgpu::Sampler,
}

impl<'a> From<&'a Context> for Uploader<'a> {
    fn from(ctx: &'a Context) -> Self {
        Self {
            device: &ctx.device,
            queue: &ctx.queue,
            layout: &ctx.layouts.sprite_texture,
            sampler: &ctx.sampler,
        }
    }
}

impl Uploader<'_> {
    /// Rasterize `text` in the neon style of `config` and upload it.
    pub fn upload(&self, font: &NeonFont, text: &str, config: &Config) -> anyhow::Result<SpriteTexture> {
        let style = NeonStyle::from_config(config);
        let max = self.device.limits().max_texture_dimension_2d;
        anyhow::ensure!(
            style.canvas_size > 0 && style.canvas_size <= max,
            "text canvas of {}px exceeds the device limit of {max}px",
            style.canvas_size
        );
        let image = font.rasterize(text, &style);
        let texture = Texture::from_image(self.device, self.queue, &image, Some(text));
        let bind_group = mk_texture_bind_group(self.device, &texture, self.sampler, self.layout, text);
        Ok(SpriteTexture { texture, bind_group })
    }
}

fn release(sprites: Vec<SpriteTexture>) -> usize {
    let count = sprites.len();
    sprites.iter().for_each(|sprite| sprite.texture.destroy());
    count
}

pub struct HeartShower {
    stage: Stage<SpriteTexture>,
    font: NeonFont,
    heart: Mesh,
    material: Material,
    heart_instances: InstanceBuffer,
    sprite_instances: InstanceBuffer,
    // texture key per sprite instance, in draw order
    sprite_order: Vec<String>,
    tint: Tint,
}

impl HeartShower {
    pub async fn new(init: InitContext) -> anyhow::Result<Self> {
        let class = ViewportClass::classify(init.logical_width);
        let stage = Stage::new(class, Scene::from_clock());
        let font = resources::load_font_or_fallback(&stage.config().font_path).await?;

        let config = stage.config();
        let heart = Mesh::upload(
            &init.device,
            "heart",
            &heart_mesh(config.heart_depth, config.heart_curve_segments)?,
        );
        let material = Material::new(&init.device, &init.layouts.material, MaterialUniform::heart(config));
        let tint = Tint::new(&init.device, &init.layouts.tint, tint_rgb(0.0));
        Ok(Self {
            font,
            heart,
            material,
            heart_instances: InstanceBuffer::new(&init.device, "Heart Instance Buffer"),
            sprite_instances: InstanceBuffer::new(&init.device, "Sprite Instance Buffer"),
            sprite_order: Vec::new(),
            tint,
            stage,
        })
    }

    /// Rebuild the GPU state that depends on the configuration.
    fn swap_config(&mut self, ctx: &Context, class: ViewportClass) -> anyhow::Result<()> {
        let uploader = Uploader::from(ctx);
        let font = &self.font;
        let Some(released) = self
            .stage
            .swap(class, |text, config| uploader.upload(font, text, config))
        else {
            return Ok(());
        };
        log::debug!("released {} sprite texture(s)", release(released));
        self.sprite_order.clear();

        let config = self.stage.config();
        let mesh = heart_mesh(config.heart_depth, config.heart_curve_segments)?;
        self.heart.destroy();
        self.heart = Mesh::upload(&ctx.device, "heart", &mesh);
        self.material.write(&ctx.queue, MaterialUniform::heart(config));
        Ok(())
    }

    fn write_instances(&mut self, ctx: &Context) {
        let scene = self.stage.scene();
        let hearts: Vec<InstanceRaw> = scene
            .hearts()
            .map(|heart| heart.heart_instance().to_raw())
            .collect();
        self.heart_instances.write(&ctx.device, &ctx.queue, &hearts);

        let sprites = scene.sprites_back_to_front(ctx.camera.camera.position());
        let instances: Vec<SpriteInstance> = sprites
            .iter()
            .map(|sprite| sprite.sprite_instance(self.stage.config()))
            .collect();
        self.sprite_order = sprites
            .iter()
            .filter_map(|sprite| sprite.text())
            .map(String::from)
            .collect();
        self.sprite_instances.write(&ctx.device, &ctx.queue, &instances);
        self.tint.write(&ctx.queue, scene.tint());
    }
}

impl GraphicsFlow for HeartShower {
    fn on_init(&mut self, ctx: &mut Context) -> Out {
        ctx.apply_config(self.stage.config());
        let uploader = Uploader::from(&*ctx);
        let font = &self.font;
        self.stage
            .pre_spawn(|text, config| uploader.upload(font, text, config));
        log::info!(
            "heart shower ready: {:?} layout, up to {} objects",
            self.stage.class(),
            self.stage.config().max_objects
        );
        Out::Empty
    }

    fn on_update(&mut self, ctx: &Context, _dt: Duration) -> Out {
        let removed = self.stage.advance();
        if removed > 0 {
            log::trace!("{removed} object(s) fell out of view");
        }
        self.write_instances(ctx);
        Out::Empty
    }

    fn on_tick(&mut self, ctx: &Context) -> Out {
        let uploader = Uploader::from(ctx);
        let font = &self.font;
        self.stage
            .spawn_tick(|text, config| uploader.upload(font, text, config));
        Out::Empty
    }

    fn on_window_events(&mut self, ctx: &Context, event: &WindowEvent) -> Out {
        let WindowEvent::Resized(_) = event else {
            return Out::Empty;
        };
        let class = ViewportClass::classify(ctx.logical_width());
        let swapped = class != self.stage.class();
        if let Err(e) = self.swap_config(ctx, class) {
            log::error!("failed to rebuild the scene for {class:?}: {e:#}");
        }
        let config = self.stage.config().clone();
        if swapped {
            Out::Configure(Box::new(move |ctx| ctx.apply_config(&config)))
        } else {
            Out::Configure(Box::new(move |ctx| ctx.apply_camera(&config)))
        }
    }

    fn on_render(&self) -> Render<'_> {
        if self.stage.scene().is_empty() {
            return Render::None;
        }
        let hearts = Render::Default(Instanced {
            instance: self.heart_instances.buffer(),
            mesh: &self.heart,
            material: &self.material.bind_group,
            amount: self.heart_instances.len(),
        });
        let runs = texture_runs(self.sprite_order.iter().map(String::as_str))
            .into_iter()
            .filter_map(|(text, instances)| {
                self.stage
                    .textures()
                    .get(text)
                    .map(|sprite| (&sprite.bind_group, instances))
            })
            .collect();
        let sprites = Render::Transparent(Sprites {
            instance: self.sprite_instances.buffer(),
            tint: &self.tint.bind_group,
            runs,
        });
        Render::Composed(vec![hearts, sprites])
    }

    fn on_exit(&mut self, _ctx: &Context) {
        let sprites = release(self.stage.teardown());
        self.sprite_order.clear();
        self.heart.destroy();
        self.heart_instances.destroy();
        self.sprite_instances.destroy();
        log::info!("released {sprites} sprite texture(s) and the heart mesh");
    }
}

/// Constructor for [`crate::flow::run`].
pub fn heart_shower() -> FlowConstructor {
    Box::new(|init| {
        Box::pin(async move {
            let flow = HeartShower::new(init).await?;
            Ok(Box::new(flow) as Box<dyn GraphicsFlow>)
        })
    })
}
