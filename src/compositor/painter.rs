//! Painter turning the layout tree into a display list

use super::display_list::{BlendMode, DrawCommand};
use crate::renderer::font::{DEFAULT_FONT_SIZE, FontSlant, FontWeight};
use crate::renderer::layout::{BlockSource, InputType};
use crate::renderer::{
    Color, ComputedStyle, Document, FontCache, FontDescriptor, LayoutId, LayoutKind, LayoutTree, MAX_TREE_DEPTH, NodeId,
    Rect, Viewport,
};
use cssparser::{ParseError, Parser, ParserInput, Token};

const CAPTION: &str = "Table of Contents";
const CAPTION_COLOR: Color = Color::rgb(128, 128, 128);
const LINKS_COLOR: Color = Color::rgb(211, 211, 211);
const CHECKBOX_COLOR: Color = Color::rgb(128, 128, 128);
const BULLET_SIZE: i32 = 4;
const CHECKBOX_RADIUS: f32 = 2.0;

/// Painter for rendering content
pub struct Painter {
    viewport: Viewport,
}

struct PaintContext<'a> {
    tree: &'a LayoutTree,
    document: &'a Document,
    fonts: &'a FontCache,
}

impl Painter {
    /// Create a new painter
    pub fn new(viewport: Viewport) -> Self {
        Self { viewport }
    }

    /// Set viewport size
    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    /// Paint the layout tree into a display list
    pub fn paint(&self, tree: &LayoutTree, document: &Document, fonts: &FontCache) -> Vec<DrawCommand> {
        let context = PaintContext { tree, document, fonts };
        let mut commands = Vec::new();
        self.paint_box(&context, tree.root(), &mut commands, 0);
        commands
    }

    /// Own decorations, then children, then the effects wrapper
    fn paint_box(&self, context: &PaintContext<'_>, id: LayoutId, out: &mut Vec<DrawCommand>, depth: usize) {
        let mut commands = Vec::new();
        self.paint_decorations(context, id, &mut commands);
        if depth < MAX_TREE_DEPTH {
            for &child in context.tree.children(id) {
                self.paint_box(context, child, &mut commands, depth + 1);
            }
        }

        let layout = context.tree.get(id);
        let effects_node = match &layout.kind {
            // An input alone in an anonymous run gets its effects from its own atom
            LayoutKind::Block {
                source: BlockSource::Node(node),
                ..
            } if !is_form_control(context.document, *node) => Some(*node),
            LayoutKind::Input { node, .. } => Some(*node),
            _ => None,
        };
        match effects_node.filter(|node| context.document.node(*node).is_element()) {
            Some(node) => out.extend(paint_effects(
                &context.document.node(node).style,
                layout.rect,
                id,
                commands,
            )),
            None => out.extend(commands),
        }
    }

    fn paint_decorations(&self, context: &PaintContext<'_>, id: LayoutId, out: &mut Vec<DrawCommand>) {
        let layout = context.tree.get(id);
        let rect = layout.rect;
        match &layout.kind {
            LayoutKind::Block { source, .. } => {
                if source.nodes().iter().any(|n| is_form_control(context.document, *n)) {
                    return;
                }
                if let Some(node) = source.single() {
                    self.paint_element_chrome(context, node, rect, id, out);
                }
                for &node in source.nodes() {
                    if let Some(background) = background(&context.document.node(node).style, rect) {
                        out.push(background.with_layout(id));
                    }
                }
            }
            LayoutKind::Text { node, word, font, .. } => {
                let color = text_color(&context.document.node(*node).style);
                out.push(DrawCommand::text(rect.x, rect.y, word.as_str(), font, color).with_layout(id));
            }
            LayoutKind::Input {
                node,
                input_type,
                font,
            } => {
                if *input_type == InputType::Hidden {
                    return;
                }
                let document = context.document;
                let style = &document.node(*node).style;
                if let Some(background) = background(style, rect) {
                    out.push(background.with_layout(id));
                }
                let color = text_color(style);
                let element = document.element(*node);
                match input_type {
                    InputType::Checkbox => {
                        out.push(DrawCommand::rounded_rect(rect, CHECKBOX_RADIUS, CHECKBOX_COLOR).with_layout(id));
                        out.push(DrawCommand::outline(rect, Color::BLACK, 1).with_layout(id));
                        if element.is_some_and(|e| e.attributes.contains("checked")) {
                            out.push(DrawCommand::text(rect.x, rect.y, " \u{2713}", font, color).with_layout(id));
                        }
                    }
                    InputType::Button => {
                        let label = match document.children(*node) {
                            [only] => document.node(*only).as_text().unwrap_or_default(),
                            _ => "",
                        };
                        if !label.is_empty() {
                            out.push(DrawCommand::text(rect.x, rect.y, label, font, color).with_layout(id));
                        }
                    }
                    InputType::Text | InputType::Password => {
                        let value = element.and_then(|e| e.get_attribute("value")).unwrap_or_default();
                        let text = if *input_type == InputType::Password {
                            "*".repeat(value.chars().count())
                        } else {
                            value.to_string()
                        };
                        let caret_x = rect.x.saturating_add(font.measure(&text));
                        if !text.is_empty() {
                            out.push(DrawCommand::text(rect.x, rect.y, text, font, color).with_layout(id));
                        }
                        if element.is_some_and(|e| e.is_focused) {
                            out.push(
                                DrawCommand::line((caret_x, rect.y), (caret_x, rect.bottom()), Color::BLACK, 1)
                                    .with_layout(id),
                            );
                        }
                    }
                    InputType::Hidden => {}
                }
            }
            LayoutKind::Document { .. } | LayoutKind::Line => {}
        }
    }

    /// Table-of-contents caption, link bar background and list bullets
    fn paint_element_chrome(
        &self,
        context: &PaintContext<'_>,
        node: NodeId,
        rect: Rect,
        id: LayoutId,
        out: &mut Vec<DrawCommand>,
    ) {
        let Some(element) = context.document.element(node) else {
            return;
        };
        let vstep = self.viewport.vstep;
        match element.tag_name.as_str() {
            "nav" if element.id() == Some("toc") => {
                let caption = Rect::new(rect.x, rect.y.saturating_sub(vstep), rect.width, vstep);
                let font = context.fonts.get(&FontDescriptor::new(
                    "",
                    DEFAULT_FONT_SIZE,
                    FontWeight::Normal,
                    FontSlant::Roman,
                ));
                out.push(DrawCommand::rect(caption, CAPTION_COLOR).with_layout(id));
                out.push(DrawCommand::text(caption.x, caption.y, CAPTION, &font, Color::BLACK).with_layout(id));
            }
            "nav" if element.has_class("links") => {
                out.push(DrawCommand::rect(rect, LINKS_COLOR).with_layout(id));
            }
            "li" => {
                let bullet = Rect::new(
                    rect.x - self.viewport.hstep + 2,
                    rect.y.saturating_add(rect.height / 2 - BULLET_SIZE / 2),
                    BULLET_SIZE,
                    BULLET_SIZE,
                );
                out.push(DrawCommand::rect(bullet, Color::BLACK).with_layout(id));
            }
            _ => {}
        }
    }
}

impl Default for Painter {
    fn default() -> Self {
        Self::new(Viewport::default())
    }
}

fn text_color(style: &ComputedStyle) -> Color {
    Color::parse_or(style.get_or("color", "black"), Color::BLACK)
}

/// Background fill, rounded by `border-radius`
fn background(style: &ComputedStyle, rect: Rect) -> Option<DrawCommand> {
    let color = Color::parse(style.get("background-color")?)?;
    if color.is_transparent() {
        return None;
    }
    let radius = style.px("border-radius").unwrap_or(0.0);
    Some(if radius > 0.0 {
        DrawCommand::rounded_rect(rect, radius, color)
    } else {
        DrawCommand::rect(rect, color)
    })
}

/// Wrap a box's commands in a blend group when any effect is active
fn paint_effects(style: &ComputedStyle, rect: Rect, id: LayoutId, mut commands: Vec<DrawCommand>) -> Vec<DrawCommand> {
    let opacity = style
        .get("opacity")
        .and_then(|value| value.trim().parse::<f32>().ok())
        .map_or(1.0, |value| value.clamp(0.0, 1.0));
    let mut blend_mode = style.get("mix-blend-mode").and_then(BlendMode::from_css);
    let blur = style.get("filter").and_then(blur_radius).unwrap_or(0.0);

    if style.get("overflow") == Some("clip") {
        let radius = style.px("border-radius").unwrap_or(0.0);
        blend_mode.get_or_insert(BlendMode::SourceOver);
        commands.push(
            DrawCommand::blend(
                1.0,
                Some(BlendMode::DestinationIn),
                0.0,
                vec![DrawCommand::rounded_rect(rect, radius, Color::WHITE).with_layout(id)],
            )
            .with_layout(id),
        );
    }

    if opacity < 1.0 || blend_mode.is_some() || blur > 0.0 {
        vec![DrawCommand::blend(opacity, blend_mode, blur, commands).with_layout(id)]
    } else {
        commands
    }
}

fn is_form_control(document: &Document, node: NodeId) -> bool {
    let node = document.node(node);
    node.has_tag("input") || node.has_tag("button")
}

/// Radius of a `blur(<length>)` filter
fn blur_radius(value: &str) -> Option<f32> {
    let mut input = ParserInput::new(value);
    let mut parser = Parser::new(&mut input);
    parser.expect_function_matching("blur").ok()?;
    let radius = parser.parse_nested_block(parse_blur_argument).ok()?;
    parser.expect_exhausted().ok()?;
    Some(radius.max(0.0))
}

fn parse_blur_argument<'i>(parser: &mut Parser<'i, '_>) -> Result<f32, ParseError<'i, ()>> {
    let token = parser.next()?.clone();
    let radius = match token {
        Token::Dimension { value, ref unit, .. } if unit.eq_ignore_ascii_case("px") => value,
        Token::Number { value, .. } if value == 0.0 => 0.0,
        other => return Err(parser.new_unexpected_token_error(other)),
    };
    parser.expect_exhausted()?;
    Ok(radius)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compositor::display_list::DrawOp;
    use crate::renderer::Renderer;
    use pretty_assertions::assert_eq;

    fn paint(markup: &str, css: &str) -> (LayoutTree, Vec<DrawCommand>) {
        let renderer = Renderer::default();
        let mut doc = renderer.parse_html(markup);
        renderer.compute_styles(&mut doc, &[renderer.parse_css(css)]);
        let fonts = FontCache::approximate();
        let tree = renderer.layout(&doc, &fonts);
        let commands = Painter::default().paint(&tree, &doc, &fonts);
        (tree, commands)
    }

    fn texts(commands: &[DrawCommand]) -> Vec<String> {
        crate::compositor::flatten(commands)
            .into_iter()
            .filter_map(|c| match &c.op {
                DrawOp::Text { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_text_color() {
        let (_, commands) = paint("<p>hi</p>", "p { color: red }");
        assert_eq!(commands.len(), 1);
        match &commands[0].op {
            DrawOp::Text { text, color, .. } => {
                assert_eq!(text, "hi");
                assert_eq!(*color, Color::rgb(255, 0, 0));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_background_before_text() {
        let (_, commands) = paint("<div>x</div>", "div { background-color: #00f; border-radius: 4px }");
        assert!(matches!(commands[0].op, DrawOp::RoundedRect { radius, .. } if radius == 4.0));
        assert!(matches!(commands[1].op, DrawOp::Text { .. }));
    }

    #[test]
    fn test_no_wrapper_without_effects() {
        let (_, commands) = paint("<div style=\"opacity: 1\">x</div>", "");
        assert!(commands.iter().all(|c| !matches!(c.op, DrawOp::Blend { .. })));
    }

    #[test]
    fn test_lone_input_effects_applied_once() {
        let (_, commands) = paint("<div><p>a</p><input style=\"opacity: .5\"></div>", "");
        fn opacities(commands: &[DrawCommand], out: &mut Vec<f32>) {
            for command in commands {
                if let DrawOp::Blend { opacity, children, .. } = &command.op {
                    out.push(*opacity);
                    opacities(children, out);
                }
            }
        }
        let mut blends = Vec::new();
        opacities(&commands, &mut blends);
        assert_eq!(blends, vec![0.5]);
    }

    #[test]
    fn test_opacity_wraps_subtree() {
        let (_, commands) = paint("<div style=\"opacity: 0.5\">x <b>y</b></div>", "");
        assert_eq!(commands.len(), 1);
        match &commands[0].op {
            DrawOp::Blend {
                opacity, children, ..
            } => {
                assert_eq!(*opacity, 0.5);
                assert_eq!(children.len(), 2);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_overflow_clip_adds_mask() {
        let (_, commands) = paint("<div style=\"overflow: clip; border-radius: 3px\">x</div>", "");
        let DrawOp::Blend {
            blend_mode, children, ..
        } = &commands[0].op
        else {
            panic!("expected a group");
        };
        assert_eq!(*blend_mode, Some(BlendMode::SourceOver));
        let mask = children.last().unwrap();
        assert!(matches!(
            &mask.op,
            DrawOp::Blend { blend_mode: Some(BlendMode::DestinationIn), children, .. }
                if matches!(children[0].op, DrawOp::RoundedRect { radius, .. } if radius == 3.0)
        ));
    }

    #[test]
    fn test_blur_filter() {
        assert_eq!(blur_radius("blur(4px)"), Some(4.0));
        assert_eq!(blur_radius("blur(0)"), Some(0.0));
        assert_eq!(blur_radius("blur(4em)"), None);
        assert_eq!(blur_radius("grayscale(1)"), None);
        let (_, commands) = paint("<div style=\"filter: blur(2px)\">x</div>", "");
        assert!(matches!(commands[0].op, DrawOp::Blend { blur, .. } if blur == 2.0));
    }

    #[test]
    fn test_blend_mode_wraps() {
        let (_, commands) = paint("<div style=\"mix-blend-mode: multiply\">x</div>", "");
        assert!(matches!(
            commands[0].op,
            DrawOp::Blend { blend_mode: Some(BlendMode::Multiply), opacity, .. } if opacity == 1.0
        ));
    }

    #[test]
    fn test_inputs() {
        let (_, commands) = paint(
            "<p><input value=abc><input type=password value=abc><button>Go</button><input type=checkbox checked></p>",
            "",
        );
        assert_eq!(texts(&commands), vec!["abc", "***", "Go", " \u{2713}"]);
        let outlines = commands.iter().filter(|c| matches!(c.op, DrawOp::Outline { .. })).count();
        assert_eq!(outlines, 1);
    }

    #[test]
    fn test_focused_input_has_caret() {
        let renderer = Renderer::default();
        let mut doc = renderer.parse_html("<input value=ab>");
        let input = doc.query_selector("input").unwrap().unwrap();
        doc.element_mut(input).unwrap().is_focused = true;
        renderer.compute_styles(&mut doc, &[]);
        let fonts = FontCache::approximate();
        let tree = renderer.layout(&doc, &fonts);
        let commands = Painter::default().paint(&tree, &doc, &fonts);
        assert!(commands.iter().any(|c| matches!(c.op, DrawOp::Line { .. })));
    }

    #[test]
    fn test_list_bullet_and_toc_caption() {
        let (_, commands) = paint("<nav id=toc><ul><li>one</li></ul></nav>", "");
        assert_eq!(texts(&commands), vec!["Table of Contents", "one"]);
        let rects: Vec<Rect> = commands
            .iter()
            .filter(|c| matches!(c.op, DrawOp::Rect { .. }))
            .map(|c| c.rect)
            .collect();
        assert_eq!(rects.len(), 2);
        assert_eq!((rects[1].width, rects[1].height), (BULLET_SIZE, BULLET_SIZE));
    }

    #[test]
    fn test_commands_carry_layout() {
        let (tree, commands) = paint("<p>a b</p>", "");
        for command in &commands {
            let id = command.layout.unwrap();
            assert!(matches!(tree.get(id).kind, LayoutKind::Text { .. }));
        }
    }
}
