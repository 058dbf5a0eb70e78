//! Tuning table for the scene.
//!
//! [`Config::base`] holds the defaults. [`Config::for_viewport`] derives the
//! responsive variant that is actually used at runtime. A running scene never
//! patches individual fields: when the viewport class flips the whole table is
//! swapped and the scene is rebuilt from it.

/// Logical widths below this are treated as a phone-sized viewport.
pub const MOBILE_BREAKPOINT: f32 = 768.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViewportClass {
    Mobile,
    Desktop,
}

impl ViewportClass {
    pub fn classify(logical_width: f32) -> Self {
        if logical_width < MOBILE_BREAKPOINT {
            ViewportClass::Mobile
        } else {
            ViewportClass::Desktop
        }
    }
}

/// An 8-bit sRGB colour.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const WHITE: Rgb = Rgb::new(0xff, 0xff, 0xff);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn to_array(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }

    /// Linear-light components, which is what an sRGB surface expects from shaders.
    pub fn to_linear(self) -> [f32; 3] {
        [
            srgb_to_linear(self.r),
            srgb_to_linear(self.g),
            srgb_to_linear(self.b),
        ]
    }

    pub fn to_wgpu(self) -> wgpu::Color {
        let [r, g, b] = self.to_linear();
        wgpu::Color {
            r: r as f64,
            g: g as f64,
            b: b as f64,
            a: 1.0,
        }
    }
}

pub fn srgb_to_linear(channel: u8) -> f32 {
    let c = channel as f32 / 255.0;
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    // scene
    pub max_objects: usize,
    pub pre_spawn: usize,
    pub spawn_interval_millis: u64,
    pub spawn_width: f32,
    pub spawn_depth: f32,
    pub start_height: f32,
    pub spawn_height_jitter: f32,
    pub gravity: f32,
    pub background_color: Rgb,

    // camera
    pub camera_fov: f32,
    pub camera_z_position: f32,
    pub camera_near: f32,
    pub camera_far: f32,

    // hearts
    pub heart_scale: f32,
    pub heart_depth: f32,
    pub heart_color: Rgb,
    pub heart_emissive: Rgb,
    pub heart_emissive_intensity: f32,
    pub heart_roughness: f32,
    pub heart_metalness: f32,
    pub heart_rotation_speed: f32,
    pub heart_curve_segments: usize,

    // text
    pub text_probability: f32,
    pub text_content: Vec<String>,
    pub text_size: f32,
    pub text_scale: f32,
    pub text_height_scale: f32,
    pub text_color: Rgb,
    pub text_shadow_color: Rgb,
    pub text_shadow_blur: f32,
    pub text_canvas_size: u32,
    pub text_z_offset: f32,
    pub text_max_width_ratio: f32,
    pub font_path: String,

    // lighting
    pub ambient_light_intensity: f32,
    pub directional_light_intensity: f32,
    pub directional_light_position: [f32; 3],

    // animation
    pub fall_threshold: f32,
    pub hue_step: f32,

    // orbit controls
    pub controls_damping_factor: f32,
    pub controls_min_distance: f32,
    pub controls_max_distance: f32,
    pub controls_rotate_speed: f32,
    pub controls_zoom_speed: f32,

    // renderer
    pub max_pixel_ratio: f64,
}

impl Config {
    /// The unclassified default table.
    pub fn base() -> Self {
        Self {
            max_objects: 300,
            pre_spawn: 3,
            spawn_interval_millis: 50,
            spawn_width: 30.0,
            spawn_depth: 20.0,
            start_height: 20.0,
            spawn_height_jitter: 5.0,
            gravity: 0.0005,
            background_color: Rgb::WHITE,

            camera_fov: 60.0,
            camera_z_position: 8.0,
            camera_near: 0.1,
            camera_far: 1000.0,

            heart_scale: 0.7,
            heart_depth: 0.2,
            heart_color: Rgb::new(0xff, 0x4d, 0x6d),
            heart_emissive: Rgb::new(0xff, 0x1a, 0x4d),
            heart_emissive_intensity: 0.3,
            heart_roughness: 0.3,
            heart_metalness: 0.5,
            heart_rotation_speed: 0.01,
            heart_curve_segments: 12,

            text_probability: 0.4,
            text_content: default_text_content(),
            text_size: 280.0,
            text_scale: 5.0,
            text_height_scale: 4.0,
            text_color: Rgb::new(0x00, 0xcc, 0xff),
            text_shadow_color: Rgb::new(0x00, 0xcc, 0xff),
            text_shadow_blur: 20.0,
            text_canvas_size: 1000,
            text_z_offset: 0.1,
            text_max_width_ratio: 0.8,
            font_path: "fonts/Montserrat-Bold.ttf".to_string(),

            ambient_light_intensity: 0.3,
            directional_light_intensity: 0.5,
            directional_light_position: [0.0, 10.0, 10.0],

            fall_threshold: -30.0,
            hue_step: 0.01,

            controls_damping_factor: 0.05,
            controls_min_distance: 5.0,
            controls_max_distance: 20.0,
            controls_rotate_speed: 1.0,
            controls_zoom_speed: 1.0,

            max_pixel_ratio: 1.0,
        }
    }

    /// The responsive table for a viewport class.
    pub fn for_viewport(class: ViewportClass) -> Self {
        let mobile = class == ViewportClass::Mobile;
        Self {
            max_objects: if mobile { 15 } else { 30 },
            camera_fov: if mobile { 70.0 } else { 60.0 },
            camera_z_position: if mobile { 10.0 } else { 8.0 },
            heart_scale: if mobile { 0.4 } else { 0.7 },
            text_size: if mobile { 90.0 } else { 140.0 },
            text_scale: if mobile { 3.0 } else { 5.0 },
            text_height_scale: if mobile { 1.5 } else { 2.0 },
            text_canvas_size: if mobile { 384 } else { 768 },
            ..Self::base()
        }
    }

    pub fn for_width(logical_width: f32) -> Self {
        Self::for_viewport(ViewportClass::classify(logical_width))
    }

    /// Number of objects spawned immediately at setup.
    pub fn pre_spawn_count(&self) -> usize {
        self.pre_spawn.min(self.max_objects)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::base()
    }
}

fn default_text_content() -> Vec<String> {
    [
        "Mỗi ngày là một cơ hội mới",
        "Không sao cả, bắt đầu lại từ đầu nhé",
        "Cứ bước tiếp, dù chậm cũng được",
        "Khó khăn chỉ là tạm thời",
        "Thở sâu, rồi mình sẽ ổn thôi",
        "Từng bước nhỏ cũng là tiến bộ",
        "Lùi một bước để tiến xa hơn",
        "Hãy tử tế với chính mình",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_at_breakpoint() {
        assert_eq!(ViewportClass::classify(375.0), ViewportClass::Mobile);
        assert_eq!(ViewportClass::classify(767.9), ViewportClass::Mobile);
        assert_eq!(ViewportClass::classify(768.0), ViewportClass::Desktop);
        assert_eq!(ViewportClass::classify(1920.0), ViewportClass::Desktop);
    }

    #[test]
    fn mobile_variant_overrides_only_responsive_fields() {
        let mobile = Config::for_viewport(ViewportClass::Mobile);
        assert_eq!(mobile.max_objects, 15);
        assert_eq!(mobile.camera_fov, 70.0);
        assert_eq!(mobile.camera_z_position, 10.0);
        assert_eq!(mobile.heart_scale, 0.4);
        assert_eq!(mobile.text_canvas_size, 384);
        assert_eq!(mobile.text_height_scale, 1.5);

        let base = Config::base();
        assert_eq!(mobile.gravity, base.gravity);
        assert_eq!(mobile.spawn_interval_millis, base.spawn_interval_millis);
        assert_eq!(mobile.fall_threshold, base.fall_threshold);
        assert_eq!(mobile.text_content, base.text_content);
    }

    #[test]
    fn desktop_variant_differs_from_base() {
        let desktop = Config::for_width(1280.0);
        assert_eq!(desktop.max_objects, 30);
        assert_eq!(desktop.text_size, 140.0);
        assert_eq!(desktop.text_canvas_size, 768);
        assert_ne!(desktop, Config::base());
    }

    #[test]
    fn pre_spawn_is_capped_by_capacity() {
        let mut config = Config::base();
        assert_eq!(config.pre_spawn_count(), 3);
        config.max_objects = 2;
        assert_eq!(config.pre_spawn_count(), 2);
    }

    #[test]
    fn linear_conversion_keeps_endpoints() {
        assert_eq!(Rgb::WHITE.to_linear(), [1.0, 1.0, 1.0]);
        assert_eq!(Rgb::new(0, 0, 0).to_linear(), [0.0, 0.0, 0.0]);
        let mid = srgb_to_linear(128);
        assert!(mid > 0.2 && mid < 0.23, "{mid}");
    }
}
