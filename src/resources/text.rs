//! Neon text rasterization.
//!
//! A line of text is drawn centred on a transparent square canvas, with a
//! blurred copy of the glyph coverage underneath as the glow. The result is an
//! RGBA image with straight alpha, ready to be uploaded as a sprite texture.

use anyhow::anyhow;
use fontdue::layout::{
    CoordinateSystem, HorizontalAlign, Layout, LayoutSettings, TextStyle, VerticalAlign,
};
use image::{GrayImage, Luma, Rgba, RgbaImage};

use crate::config::{Config, Rgb};

/// How a neon label is drawn.
#[derive(Clone, Debug, PartialEq)]
pub struct NeonStyle {
    pub canvas_size: u32,
    pub font_size: f32,
    pub max_width_ratio: f32,
    pub color: Rgb,
    pub shadow_color: Rgb,
    /// Canvas-style blur radius; the gaussian sigma is half of it.
    pub shadow_blur: f32,
}

impl NeonStyle {
    pub fn from_config(config: &Config) -> Self {
        Self {
            canvas_size: config.text_canvas_size,
            font_size: config.text_size,
            max_width_ratio: config.text_max_width_ratio,
            color: config.text_color,
            shadow_color: config.text_shadow_color,
            shadow_blur: config.text_shadow_blur,
        }
    }
}

/// Shrink `font_size` so that a line measured at `measured_width` fits in `max_width`.
pub fn fit_font_size(measured_width: f32, max_width: f32, font_size: f32) -> f32 {
    if measured_width > max_width && measured_width > 0.0 {
        font_size * (max_width / measured_width)
    } else {
        font_size
    }
}

/// Draw `coverage` in `style.color` over its own blurred copy in `style.shadow_color`.
pub fn compose_neon(coverage: &GrayImage, style: &NeonStyle) -> RgbaImage {
    let sigma = style.shadow_blur / 2.0;
    let glow = if sigma > 0.0 {
        image::imageops::fast_blur(coverage, sigma)
    } else {
        coverage.clone()
    };
    let text = style.color.to_array().map(|c| c as f32);
    let shadow = style.shadow_color.to_array().map(|c| c as f32);

    RgbaImage::from_fn(coverage.width(), coverage.height(), |x, y| {
        let a_text = coverage.get_pixel(x, y)[0] as f32 / 255.0;
        let a_glow = glow.get_pixel(x, y)[0] as f32 / 255.0;
        let alpha = a_text + a_glow * (1.0 - a_text);
        if alpha <= 0.0 {
            return Rgba([0, 0, 0, 0]);
        }
        let mix = |i: usize| {
            ((text[i] * a_text + shadow[i] * a_glow * (1.0 - a_text)) / alpha)
                .round()
                .clamp(0.0, 255.0) as u8
        };
        Rgba([mix(0), mix(1), mix(2), (alpha * 255.0).round() as u8])
    })
}

/// DejaVu Sans Bold, used whenever the configured face cannot be loaded.
pub const FALLBACK_FONT: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans-Bold.ttf");

/// A parsed font able to produce neon canvases.
pub struct NeonFont {
    font: fontdue::Font,
}

impl std::fmt::Debug for NeonFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NeonFont")
            .field("name", &self.font.name())
            .finish()
    }
}

impl NeonFont {
    pub fn from_bytes(bytes: &[u8]) -> anyhow::Result<Self> {
        let font = fontdue::Font::from_bytes(bytes, fontdue::FontSettings::default())
            .map_err(|e| anyhow!("failed to parse font: {e}"))?;
        Ok(Self { font })
    }

    /// The face compiled into the binary.
    pub fn fallback() -> anyhow::Result<Self> {
        Self::from_bytes(FALLBACK_FONT)
    }

    /// Advance width of `text` as a single line at `px`.
    pub fn measure(&self, text: &str, px: f32) -> f32 {
        text.chars()
            .map(|c| self.font.metrics(c, px).advance_width)
            .sum()
    }

    /// Glyph coverage of `text` centred on a `size`×`size` canvas.
    pub fn coverage(&self, text: &str, px: f32, size: u32) -> GrayImage {
        let mut canvas = GrayImage::new(size, size);
        let mut layout: Layout<()> = Layout::new(CoordinateSystem::PositiveYDown);
        layout.reset(&LayoutSettings {
            x: 0.0,
            y: 0.0,
            max_width: Some(size as f32),
            max_height: Some(size as f32),
            horizontal_align: HorizontalAlign::Center,
            vertical_align: VerticalAlign::Middle,
            ..LayoutSettings::default()
        });
        layout.append(&[&self.font], &TextStyle::new(text, px, 0));

        for glyph in layout.glyphs() {
            if glyph.width == 0 || glyph.height == 0 {
                continue;
            }
            let (metrics, bitmap) = self.font.rasterize_config(glyph.key);
            let origin_x = glyph.x.round() as i64;
            let origin_y = glyph.y.round() as i64;
            for row in 0..metrics.height {
                for col in 0..metrics.width {
                    let x = origin_x + col as i64;
                    let y = origin_y + row as i64;
                    if x < 0 || y < 0 || x >= size as i64 || y >= size as i64 {
                        continue;
                    }
                    let value = bitmap[row * metrics.width + col];
                    let pixel = canvas.get_pixel_mut(x as u32, y as u32);
                    *pixel = Luma([pixel[0].max(value)]);
                }
            }
        }
        canvas
    }

    pub fn rasterize(&self, text: &str, style: &NeonStyle) -> RgbaImage {
        let max_width = style.canvas_size as f32 * style.max_width_ratio;
        let measured = self.measure(text, style.font_size);
        let px = fit_font_size(measured, max_width, style.font_size);
        if px != style.font_size {
            log::debug!("shrinking {text:?} from {}px to {px:.1}px", style.font_size);
        }
        compose_neon(&self.coverage(text, px, style.canvas_size), style)
    }
}
