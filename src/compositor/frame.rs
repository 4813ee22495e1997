//! Software canvas rasterizing a display list into RGBA pixels

use super::display_list::{BlendMode, Canvas};
use crate::renderer::{Color, FontDescriptor, Rect};

/// Offscreen layer opened by `save_layer`
#[derive(Debug, Clone)]
struct Layer {
    pixels: Vec<u8>,
    opacity: f32,
    blend_mode: Option<BlendMode>,
}

/// A rendered frame
#[derive(Debug, Clone)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
    layers: Vec<Layer>,
}

impl Frame {
    /// Create a transparent frame
    pub fn new(width: u32, height: u32) -> Self {
        let size = (width * height * 4) as usize; // RGBA
        Self {
            width,
            height,
            pixels: vec![0; size],
            layers: Vec::new(),
        }
    }

    /// Fill the whole frame with one color
    pub fn clear(&mut self, color: Color) {
        for pixel in self.pixels.chunks_exact_mut(4) {
            pixel.copy_from_slice(&[color.r, color.g, color.b, color.a]);
        }
    }

    /// Get pixel at (x, y)
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        let idx = self.index(x as i32, y as i32)?;
        Some([
            self.pixels[idx],
            self.pixels[idx + 1],
            self.pixels[idx + 2],
            self.pixels[idx + 3],
        ])
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x as u32 >= self.width || y as u32 >= self.height {
            return None;
        }
        Some(((y as u32 * self.width + x as u32) * 4) as usize)
    }

    /// Source-over a color onto the current target
    fn blend_pixel(&mut self, x: i32, y: i32, color: Color) {
        let Some(idx) = self.index(x, y) else {
            return;
        };
        let target = match self.layers.last_mut() {
            Some(layer) => &mut layer.pixels,
            None => &mut self.pixels,
        };
        let src = [color.r, color.g, color.b, color.a];
        let dst = [target[idx], target[idx + 1], target[idx + 2], target[idx + 3]];
        target[idx..idx + 4].copy_from_slice(&source_over(src, dst, 1.0));
    }

    /// Blend `color` over the pixels of `rect` on the frame where `inside` holds
    fn fill_where(&mut self, rect: Rect, color: Color, inside: impl Fn(i32, i32) -> bool) {
        let (width, height) = (self.width.min(i32::MAX as u32) as i32, self.height.min(i32::MAX as u32) as i32);
        for y in rect.y.max(0)..rect.bottom().min(height) {
            for x in rect.x.max(0)..rect.right().min(width) {
                if inside(x, y) {
                    self.blend_pixel(x, y, color);
                }
            }
        }
    }
}

impl Canvas for Frame {
    fn fill_rect(&mut self, rect: Rect, color: Color) {
        self.fill_where(rect, color, |_, _| true);
    }

    fn fill_rounded_rect(&mut self, rect: Rect, radius: f32, color: Color) {
        let radius = radius.min(rect.width as f32 / 2.0).min(rect.height as f32 / 2.0).max(0.0);
        self.fill_where(rect, color, |x, y| {
            let px = x as f32 + 0.5;
            let py = y as f32 + 0.5;
            let cx = px.clamp(rect.x as f32 + radius, rect.right() as f32 - radius);
            let cy = py.clamp(rect.y as f32 + radius, rect.bottom() as f32 - radius);
            (px - cx).powi(2) + (py - cy).powi(2) <= radius * radius
        });
    }

    fn stroke_rect(&mut self, rect: Rect, color: Color, thickness: i32) {
        let t = thickness.max(1);
        self.fill_where(rect, color, |x, y| {
            x < rect.x + t || x >= rect.right() - t || y < rect.y + t || y >= rect.bottom() - t
        });
    }

    fn draw_line(&mut self, from: (i32, i32), to: (i32, i32), color: Color, thickness: i32) {
        let (x0, y0) = (i64::from(from.0), i64::from(from.1));
        let (dx, dy) = (i64::from(to.0) - x0, i64::from(to.1) - y0);
        let steps = dx.abs().max(dy.abs()).max(1);
        let half = i64::from(thickness.max(1) / 2);
        let (first, last) = [
            step_range(x0, dx, steps, -half, i64::from(self.width) + half),
            step_range(y0, dy, steps, 0, i64::from(self.height)),
        ]
        .into_iter()
        .fold((0, steps), |(first, last), (lo, hi)| (first.max(lo), last.min(hi)));
        for step in first..=last {
            let x = along(x0, dx, step, steps);
            let y = along(y0, dy, step, steps);
            for offset in -half..=half {
                self.blend_pixel(to_coordinate(x + offset), to_coordinate(y), color);
            }
        }
    }

    fn draw_text(&mut self, x: i32, y: i32, text: &str, _font: &FontDescriptor, _color: Color) {
        log::trace!("no glyph rasterizer, skipping text {text:?} at ({x}, {y})");
    }

    fn save_layer(&mut self, opacity: f32, blend_mode: Option<BlendMode>, blur: f32) {
        if blur > 0.0 {
            log::trace!("blur of {blur}px is not rasterized");
        }
        self.layers.push(Layer {
            pixels: vec![0; self.pixels.len()],
            opacity,
            blend_mode,
        });
    }

    fn restore(&mut self) {
        let Some(layer) = self.layers.pop() else {
            log::warn!("restore without a matching save_layer");
            return;
        };
        let target = match self.layers.last_mut() {
            Some(parent) => &mut parent.pixels,
            None => &mut self.pixels,
        };
        for (dst, src) in target.chunks_exact_mut(4).zip(layer.pixels.chunks_exact(4)) {
            let src = [src[0], src[1], src[2], src[3]];
            let old = [dst[0], dst[1], dst[2], dst[3]];
            dst.copy_from_slice(&composite(src, old, layer.opacity, layer.blend_mode));
        }
    }
}

/// Steps of a line whose coordinate along one axis falls in `lo..hi`,
/// widened by one step on each side
fn step_range(start: i64, delta: i64, steps: i64, lo: i64, hi: i64) -> (i64, i64) {
    if delta == 0 {
        return if (lo..hi).contains(&start) { (0, steps) } else { (1, 0) };
    }
    let at = |coordinate: i64| (coordinate - start) as f64 * steps as f64 / delta as f64;
    let (a, b) = (at(lo), at(hi));
    ((a.min(b).floor() as i64 - 1).max(0), (a.max(b).ceil() as i64 + 1).min(steps))
}

fn along(start: i64, delta: i64, step: i64, steps: i64) -> i64 {
    start + (i128::from(delta) * i128::from(step) / i128::from(steps)) as i64
}

fn to_coordinate(value: i64) -> i32 {
    value.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

fn source_over(src: [u8; 4], dst: [u8; 4], opacity: f32) -> [u8; 4] {
    let sa = src[3] as f32 / 255.0 * opacity;
    let da = dst[3] as f32 / 255.0;
    let out_a = sa + da * (1.0 - sa);
    if out_a <= 0.0 {
        return [0, 0, 0, 0];
    }
    let channel = |s: u8, d: u8| ((s as f32 * sa + d as f32 * da * (1.0 - sa)) / out_a).round() as u8;
    [
        channel(src[0], dst[0]),
        channel(src[1], dst[1]),
        channel(src[2], dst[2]),
        (out_a * 255.0).round() as u8,
    ]
}

fn composite(src: [u8; 4], dst: [u8; 4], opacity: f32, blend_mode: Option<BlendMode>) -> [u8; 4] {
    let mix = |f: fn(u8, u8) -> u8| [f(src[0], dst[0]), f(src[1], dst[1]), f(src[2], dst[2]), src[3]];
    match blend_mode {
        Some(BlendMode::DestinationIn) => {
            let alpha = dst[3] as f32 * (src[3] as f32 / 255.0 * opacity);
            [dst[0], dst[1], dst[2], alpha.round() as u8]
        }
        Some(BlendMode::Multiply) if dst[3] > 0 => {
            source_over(mix(|s, d| (s as u16 * d as u16 / 255) as u8), dst, opacity)
        }
        Some(BlendMode::Difference) if dst[3] > 0 => source_over(mix(|s, d| s.abs_diff(d)), dst, opacity),
        Some(BlendMode::Screen) if dst[3] > 0 => {
            source_over(mix(|s, d| 255 - ((255 - s) as u16 * (255 - d) as u16 / 255) as u8), dst, opacity)
        }
        Some(BlendMode::Darken) if dst[3] > 0 => source_over(mix(|s, d| s.min(d)), dst, opacity),
        Some(BlendMode::Lighten) if dst[3] > 0 => source_over(mix(|s, d| s.max(d)), dst, opacity),
        _ => source_over(src, dst, opacity),
    }
}
