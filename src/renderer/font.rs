//! Fonts, metrics and the font cache
//!
//! Glyph measurement is delegated to a [`FontBackend`] so that layout can run
//! against the rasterizer's real metrics or against the approximate backend
//! used headless.

use super::style::ComputedStyle;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// Point size used when `font-size` is not a pixel length
pub const DEFAULT_FONT_SIZE: i32 = 12;

/// Pixels to font units
pub const PX_TO_FONT_SIZE: f32 = 0.75;

/// Largest size in font units a style can resolve to
pub const MAX_FONT_SIZE: i32 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FontWeight {
    Normal,
    Bold,
}

impl FontWeight {
    /// `bold`, `bolder` and numeric weights from 700 are bold
    pub fn from_css(value: &str) -> Self {
        match value {
            "bold" | "bolder" => FontWeight::Bold,
            other => match other.parse::<u32>() {
                Ok(weight) if weight >= 700 => FontWeight::Bold,
                _ => FontWeight::Normal,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FontSlant {
    Roman,
    Italic,
}

impl FontSlant {
    pub fn from_css(value: &str) -> Self {
        match value {
            "italic" | "oblique" => FontSlant::Italic,
            _ => FontSlant::Roman,
        }
    }
}

/// Font cache key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FontDescriptor {
    pub family: String,
    /// Size in font units
    pub size: i32,
    pub weight: FontWeight,
    pub slant: FontSlant,
}

impl FontDescriptor {
    pub fn new(family: impl Into<String>, size: i32, weight: FontWeight, slant: FontSlant) -> Self {
        Self {
            family: family.into(),
            size,
            weight,
            slant,
        }
    }

    /// Descriptor for a node's resolved style
    pub fn from_style(style: &ComputedStyle) -> Self {
        let size = match style.font_size_px() {
            Some(px) => (px * PX_TO_FONT_SIZE).clamp(0.0, MAX_FONT_SIZE as f32) as i32,
            None => {
                log::trace!("font-size {:?} is not a pixel size", style.get("font-size"));
                DEFAULT_FONT_SIZE
            }
        };
        Self {
            family: style.get_or("font-family", "").to_string(),
            size,
            weight: FontWeight::from_css(style.get_or("font-weight", "normal")),
            slant: FontSlant::from_css(style.get_or("font-style", "normal")),
        }
    }

    /// Same face at a scaled size, truncated
    pub fn scaled(&self, factor: f32) -> Self {
        Self {
            size: (self.size as f32 * factor) as i32,
            ..self.clone()
        }
    }
}

/// Vertical font metrics in pixels; ascent and descent are both positive
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FontMetrics {
    pub ascent: f32,
    pub descent: f32,
    pub line_gap: f32,
}

/// Glyph measurement provided by the rasterization backend
#[cfg_attr(test, mockall::automock)]
pub trait FontBackend {
    /// Vertical metrics of a face
    fn metrics(&self, font: &FontDescriptor) -> FontMetrics;

    /// Advance width of a string
    fn measure_text(&self, font: &FontDescriptor, text: &str) -> f32;
}

/// Fixed-ratio metrics for headless layout
#[derive(Debug, Clone, Copy, Default)]
pub struct ApproximateFontBackend;

impl ApproximateFontBackend {
    const ADVANCE_RATIO: f32 = 0.5;
    const BOLD_ADVANCE_RATIO: f32 = 0.55;
    const ASCENT_RATIO: f32 = 0.8;
    const DESCENT_RATIO: f32 = 0.2;
}

impl FontBackend for ApproximateFontBackend {
    fn metrics(&self, font: &FontDescriptor) -> FontMetrics {
        let size = font.size as f32;
        FontMetrics {
            ascent: size * Self::ASCENT_RATIO,
            descent: size * Self::DESCENT_RATIO,
            line_gap: 0.0,
        }
    }

    fn measure_text(&self, font: &FontDescriptor, text: &str) -> f32 {
        let ratio = match font.weight {
            FontWeight::Bold => Self::BOLD_ADVANCE_RATIO,
            FontWeight::Normal => Self::ADVANCE_RATIO,
        };
        text.chars().count() as f32 * font.size as f32 * ratio
    }
}

/// A resolved face with cached metrics
pub struct Font {
    descriptor: FontDescriptor,
    metrics: FontMetrics,
    backend: Rc<dyn FontBackend>,
}

impl Font {
    pub fn descriptor(&self) -> &FontDescriptor {
        &self.descriptor
    }

    pub fn metrics(&self) -> FontMetrics {
        self.metrics
    }

    /// Advance width in whole pixels
    pub fn measure(&self, text: &str) -> i32 {
        self.backend.measure_text(&self.descriptor, text).round() as i32
    }

    /// Ascent plus descent in whole pixels
    pub fn linespace(&self) -> i32 {
        (self.metrics.ascent + self.metrics.descent).round() as i32
    }
}

impl fmt::Debug for Font {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Font")
            .field("descriptor", &self.descriptor)
            .field("metrics", &self.metrics)
            .finish()
    }
}

/// Append-only font cache keyed by descriptor
pub struct FontCache {
    backend: Rc<dyn FontBackend>,
    fonts: RefCell<HashMap<FontDescriptor, Rc<Font>>>,
}

impl FontCache {
    pub fn new(backend: Rc<dyn FontBackend>) -> Self {
        Self {
            backend,
            fonts: RefCell::new(HashMap::new()),
        }
    }

    /// Cache backed by [`ApproximateFontBackend`]
    pub fn approximate() -> Self {
        Self::new(Rc::new(ApproximateFontBackend))
    }

    /// Get or create the font for a descriptor
    pub fn get(&self, descriptor: &FontDescriptor) -> Rc<Font> {
        if let Some(font) = self.fonts.borrow().get(descriptor) {
            return Rc::clone(font);
        }
        let font = Rc::new(Font {
            metrics: self.backend.metrics(descriptor),
            descriptor: descriptor.clone(),
            backend: Rc::clone(&self.backend),
        });
        self.fonts
            .borrow_mut()
            .insert(descriptor.clone(), Rc::clone(&font));
        font
    }

    /// Font for a node's resolved style
    pub fn for_style(&self, style: &ComputedStyle) -> Rc<Font> {
        self.get(&FontDescriptor::from_style(style))
    }

    /// Number of distinct faces created so far
    pub fn len(&self) -> usize {
        self.fonts.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.fonts.borrow().is_empty()
    }
}

impl Default for FontCache {
    fn default() -> Self {
        Self::approximate()
    }
}

impl fmt::Debug for FontCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FontCache").field("fonts", &self.len()).finish()
    }
}
