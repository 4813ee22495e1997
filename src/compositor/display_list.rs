//! Display list commands and their execution against a canvas

use crate::renderer::{Color, Font, FontDescriptor, LayoutId, Rect};

/// Layer compositing modes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendMode {
    SourceOver,
    DestinationIn,
    Multiply,
    Screen,
    Overlay,
    Darken,
    Lighten,
    ColorDodge,
    ColorBurn,
    HardLight,
    SoftLight,
    Difference,
    Exclusion,
    Hue,
    Saturation,
    Color,
    Luminosity,
}

impl BlendMode {
    /// Parse a `mix-blend-mode` value; `normal` and unknown modes are unset
    pub fn from_css(value: &str) -> Option<Self> {
        let mode = match value.trim().to_ascii_lowercase().as_str() {
            "normal" => return None,
            "source-over" => BlendMode::SourceOver,
            "destination-in" => BlendMode::DestinationIn,
            "multiply" => BlendMode::Multiply,
            "screen" => BlendMode::Screen,
            "overlay" => BlendMode::Overlay,
            "darken" => BlendMode::Darken,
            "lighten" => BlendMode::Lighten,
            "color-dodge" => BlendMode::ColorDodge,
            "color-burn" => BlendMode::ColorBurn,
            "hard-light" => BlendMode::HardLight,
            "soft-light" => BlendMode::SoftLight,
            "difference" => BlendMode::Difference,
            "exclusion" => BlendMode::Exclusion,
            "hue" => BlendMode::Hue,
            "saturation" => BlendMode::Saturation,
            "color" => BlendMode::Color,
            "luminosity" => BlendMode::Luminosity,
            other => {
                log::debug!("unknown blend mode {other:?}");
                return None;
            }
        };
        Some(mode)
    }
}

/// Drawing operation of a command
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Rect {
        color: Color,
    },
    RoundedRect {
        radius: f32,
        color: Color,
    },
    Outline {
        color: Color,
        thickness: i32,
    },
    Line {
        from: (i32, i32),
        to: (i32, i32),
        color: Color,
        thickness: i32,
    },
    /// Text drawn with its top-left corner at the command's origin
    Text {
        text: String,
        font: FontDescriptor,
        color: Color,
    },
    /// Children composited as one layer
    Blend {
        opacity: f32,
        blend_mode: Option<BlendMode>,
        blur: f32,
        children: Vec<DrawCommand>,
    },
}

/// One display list entry
#[derive(Debug, Clone, PartialEq)]
pub struct DrawCommand {
    /// Bounding rectangle in document coordinates
    pub rect: Rect,
    /// Box that produced the command
    pub layout: Option<LayoutId>,
    pub op: DrawOp,
}

impl DrawCommand {
    fn new(rect: Rect, op: DrawOp) -> Self {
        Self {
            rect,
            layout: None,
            op,
        }
    }

    pub fn rect(rect: Rect, color: Color) -> Self {
        Self::new(rect, DrawOp::Rect { color })
    }

    pub fn rounded_rect(rect: Rect, radius: f32, color: Color) -> Self {
        Self::new(rect, DrawOp::RoundedRect { radius, color })
    }

    pub fn outline(rect: Rect, color: Color, thickness: i32) -> Self {
        Self::new(rect, DrawOp::Outline { color, thickness })
    }

    pub fn line(from: (i32, i32), to: (i32, i32), color: Color, thickness: i32) -> Self {
        let rect = Rect::from_ltrb(from.0.min(to.0), from.1.min(to.1), from.0.max(to.0), from.1.max(to.1));
        Self::new(
            rect,
            DrawOp::Line {
                from,
                to,
                color,
                thickness,
            },
        )
    }

    pub fn text(x: i32, y: i32, text: impl Into<String>, font: &Font, color: Color) -> Self {
        let text = text.into();
        let rect = Rect::new(x, y, font.measure(&text), font.linespace());
        Self::new(
            rect,
            DrawOp::Text {
                text,
                font: font.descriptor().clone(),
                color,
            },
        )
    }

    /// Group covering the union of its children
    pub fn blend(opacity: f32, blend_mode: Option<BlendMode>, blur: f32, children: Vec<DrawCommand>) -> Self {
        let rect = children
            .iter()
            .map(|c| c.rect)
            .reduce(|acc, r| acc.union(&r))
            .unwrap_or_default();
        Self::new(
            rect,
            DrawOp::Blend {
                opacity,
                blend_mode,
                blur,
                children,
            },
        )
    }

    /// Tag the command with the box that produced it
    pub fn with_layout(mut self, layout: LayoutId) -> Self {
        self.layout = Some(layout);
        self
    }

    pub fn children(&self) -> &[DrawCommand] {
        match &self.op {
            DrawOp::Blend { children, .. } => children,
            _ => &[],
        }
    }

    /// Replay the command on a canvas, shifted up by `scroll`
    pub fn execute(&self, canvas: &mut dyn Canvas, scroll: i32) {
        let rect = Rect {
            y: self.rect.y.saturating_sub(scroll),
            ..self.rect
        };
        match &self.op {
            DrawOp::Rect { color } => canvas.fill_rect(rect, *color),
            DrawOp::RoundedRect { radius, color } => canvas.fill_rounded_rect(rect, *radius, *color),
            DrawOp::Outline { color, thickness } => canvas.stroke_rect(rect, *color, *thickness),
            DrawOp::Line {
                from,
                to,
                color,
                thickness,
            } => canvas.draw_line(
                (from.0, from.1.saturating_sub(scroll)),
                (to.0, to.1.saturating_sub(scroll)),
                *color,
                *thickness,
            ),
            DrawOp::Text { text, font, color } => canvas.draw_text(rect.x, rect.y, text, font, *color),
            DrawOp::Blend {
                opacity,
                blend_mode,
                blur,
                children,
            } => {
                canvas.save_layer(*opacity, *blend_mode, *blur);
                for child in children {
                    child.execute(canvas, scroll);
                }
                canvas.restore();
            }
        }
    }
}

/// Every non-group command in paint order
pub fn flatten(commands: &[DrawCommand]) -> Vec<&DrawCommand> {
    let mut out = Vec::new();
    for command in commands {
        match &command.op {
            DrawOp::Blend { children, .. } => out.extend(flatten(children)),
            _ => out.push(command),
        }
    }
    out
}

/// Rasterization backend the display list is replayed on
#[cfg_attr(test, mockall::automock)]
pub trait Canvas {
    fn fill_rect(&mut self, rect: Rect, color: Color);

    fn fill_rounded_rect(&mut self, rect: Rect, radius: f32, color: Color);

    fn stroke_rect(&mut self, rect: Rect, color: Color, thickness: i32);

    fn draw_line(&mut self, from: (i32, i32), to: (i32, i32), color: Color, thickness: i32);

    fn draw_text(&mut self, x: i32, y: i32, text: &str, font: &FontDescriptor, color: Color);

    /// Start a layer composited on `restore`
    fn save_layer(&mut self, opacity: f32, blend_mode: Option<BlendMode>, blur: f32);

    fn restore(&mut self);
}
