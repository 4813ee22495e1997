//! Inline flow: word placement, line breaking and line metrics

use super::block::LayoutContext;
use super::{CHECKBOX_WIDTH_PX, INPUT_WIDTH_PX, InputType, LayoutId, LayoutKind, LayoutTree, Rect, TextAlign};
use crate::renderer::MAX_TREE_DEPTH;
use crate::renderer::dom::NodeId;
use crate::renderer::font::{DEFAULT_FONT_SIZE, Font, FontDescriptor, FontSlant, FontWeight};
use crate::renderer::html::SOFT_HYPHEN;
use std::rc::Rc;

/// Line height relative to the tallest ascent plus descent
const LINE_SPACING: f32 = 1.25;

/// Size of lowercase letters under `font-variant: small-caps`
const SMALL_CAPS_SCALE: f32 = 0.75;

/// Builds the lines of one inline-mode block
pub(super) struct InlineLayout<'c, 'a> {
    context: &'c LayoutContext<'a>,
    tree: &'c mut LayoutTree,
    block: LayoutId,
    width: i32,
    cursor_x: i32,
    line: LayoutId,
}

impl<'c, 'a> InlineLayout<'c, 'a> {
    /// Start with one empty line in `block`
    pub(super) fn new(context: &'c LayoutContext<'a>, tree: &'c mut LayoutTree, block: LayoutId) -> Self {
        let width = tree.rect(block).width;
        let line = tree.push(block, LayoutKind::Line, Rect::default());
        Self {
            context,
            tree,
            block,
            width,
            cursor_x: 0,
            line,
        }
    }

    pub(super) fn recurse(&mut self, node: NodeId, depth: usize) {
        if depth >= MAX_TREE_DEPTH {
            return;
        }
        let document = self.context.document;
        let current = document.node(node);
        if let Some(text) = current.as_text() {
            if current.style.get("white-space") == Some("pre") {
                for (i, part) in text.split('\n').enumerate() {
                    if i > 0 {
                        self.new_line();
                    }
                    self.word(node, part);
                }
            } else {
                for word in text.split_whitespace() {
                    self.word(node, word);
                }
            }
            return;
        }
        if self.context.is_hidden(node) {
            return;
        }
        match current.tag_name() {
            Some("br") => self.new_line(),
            Some("input") | Some("button") => self.input(node),
            _ => {
                for &child in document.children(node) {
                    self.recurse(child, depth + 1);
                }
            }
        }
    }

    /// Position every line and its atoms
    pub(super) fn finish(mut self, text_align: TextAlign) {
        let block = self.tree.rect(self.block);
        let mut previous: Option<LayoutId> = None;
        for line in self.tree.children(self.block).to_vec() {
            let y = previous.map_or(block.y, |p| self.tree.rect(p).bottom());
            self.layout_line(line, Rect::new(block.x, y, block.width, 0), text_align);
            previous = Some(line);
        }
    }

    fn new_line(&mut self) {
        self.cursor_x = 0;
        self.line = self.tree.push(self.block, LayoutKind::Line, Rect::default());
    }

    fn word(&mut self, node: NodeId, word: &str) {
        let document = self.context.document;
        let style = &document.node(node).style;
        let descriptor = FontDescriptor::from_style(style);
        let pre = style.get("white-space") == Some("pre");

        if style.get("font-variant") == Some("small-caps") && word.chars().any(char::is_lowercase) {
            let runs = case_runs(word);
            let last = runs.len().saturating_sub(1);
            for (i, run) in runs.into_iter().enumerate() {
                let (text, font) = if is_lowercase_word(&run) {
                    (run.to_uppercase(), descriptor.scaled(SMALL_CAPS_SCALE))
                } else {
                    (run, descriptor.clone())
                };
                self.place(node, text, &font, pre || i > 0, !pre && i == last);
            }
            return;
        }
        self.place(node, word.to_string(), &descriptor, pre, !pre);
    }

    /// Place a word, breaking lines and splitting at soft hyphens as needed
    fn place(
        &mut self,
        node: NodeId,
        mut word: String,
        descriptor: &FontDescriptor,
        no_space_before: bool,
        space_after: bool,
    ) {
        let font = self.context.fonts.get(descriptor);
        loop {
            let width = font.measure(&strip_soft_hyphens(&word));
            if self.cursor_x.saturating_add(width) <= self.width {
                break;
            }
            if let Some((head, tail)) = self.hyphen_split(&font, &word) {
                self.push_text(node, head, &font, no_space_before);
                self.new_line();
                word = tail;
                continue;
            }
            if self.cursor_x > 0 {
                self.new_line();
                continue;
            }
            break;
        }

        let width = self.push_text(node, strip_soft_hyphens(&word), &font, no_space_before);
        self.cursor_x = self.cursor_x.saturating_add(width);
        if space_after {
            self.cursor_x = self.cursor_x.saturating_add(font.measure(" "));
        }
    }

    /// Longest prefix ending at a soft hyphen that fits with a visible hyphen
    fn hyphen_split(&self, font: &Font, word: &str) -> Option<(String, String)> {
        word.char_indices()
            .filter(|&(i, c)| c == SOFT_HYPHEN && i > 0)
            .map(|(i, _)| i)
            .rev()
            .find_map(|i| {
                let head = format!("{}-", strip_soft_hyphens(&word[..i]));
                (self.cursor_x.saturating_add(font.measure(&head)) <= self.width)
                    .then(|| (head, word[i + SOFT_HYPHEN.len_utf8()..].to_string()))
            })
    }

    fn push_text(&mut self, node: NodeId, word: String, font: &Rc<Font>, no_space_before: bool) -> i32 {
        let rect = Rect::new(0, 0, font.measure(&word), font.linespace());
        self.tree.push(
            self.line,
            LayoutKind::Text {
                node,
                word,
                font: Rc::clone(font),
                no_space_before,
            },
            rect,
        );
        rect.width
    }

    fn input(&mut self, node: NodeId) {
        let document = self.context.document;
        let Some(element) = document.element(node) else {
            return;
        };
        let input_type = InputType::from_element(element);
        if input_type == InputType::Hidden {
            return;
        }
        let (width, font) = match input_type {
            InputType::Checkbox => (
                CHECKBOX_WIDTH_PX,
                self.context.fonts.get(&FontDescriptor::new(
                    "",
                    DEFAULT_FONT_SIZE,
                    FontWeight::Normal,
                    FontSlant::Roman,
                )),
            ),
            _ => (INPUT_WIDTH_PX, self.context.fonts.for_style(&document.node(node).style)),
        };
        if self.cursor_x > 0 && self.cursor_x.saturating_add(width) > self.width {
            self.new_line();
        }
        let rect = Rect::new(0, 0, width, font.linespace());
        self.cursor_x = self.cursor_x.saturating_add(width).saturating_add(font.measure(" "));
        self.tree.push(
            self.line,
            LayoutKind::Input {
                node,
                input_type,
                font,
            },
            rect,
        );
    }

    fn layout_line(&mut self, line: LayoutId, mut rect: Rect, text_align: TextAlign) {
        let atoms = self.tree.children(line).to_vec();

        let mut previous: Option<LayoutId> = None;
        for &atom in &atoms {
            let x = match previous {
                None => rect.x,
                Some(prev) => {
                    let prev = self.tree.get(prev);
                    let flush = matches!(self.tree.get(atom).kind, LayoutKind::Text { no_space_before: true, .. });
                    let gap = if flush {
                        0
                    } else {
                        prev.font().map_or(0, |font| font.measure(" "))
                    };
                    prev.rect.right().saturating_add(gap)
                }
            };
            self.tree.get_mut(atom).rect.x = x;
            previous = Some(atom);
        }

        if let Some(&last) = atoms.last() {
            let slack = rect.right().saturating_sub(self.tree.rect(last).right()).max(0);
            let offset = match text_align {
                TextAlign::Left => 0,
                TextAlign::Center => slack / 2,
                TextAlign::Right => slack,
            };
            for &atom in &atoms {
                let rect = &mut self.tree.get_mut(atom).rect;
                rect.x = rect.x.saturating_add(offset);
            }
        }

        let metrics: Vec<_> = atoms
            .iter()
            .filter_map(|atom| self.tree.get(*atom).font().map(|font| font.metrics()))
            .collect();
        let max_ascent = metrics.iter().map(|m| m.ascent).fold(0.0_f32, f32::max);
        let max_descent = metrics.iter().map(|m| m.descent).fold(0.0_f32, f32::max);
        let baseline = rect.y.saturating_add((LINE_SPACING * max_ascent) as i32);

        let document = self.context.document;
        for &atom in &atoms {
            let ascent = self.tree.get(atom).font().map_or(0.0, |font| font.metrics().ascent);
            let top = self
                .tree
                .node_of(atom)
                .is_some_and(|node| document.node(node).style.get("vertical-align") == Some("top"));
            self.tree.get_mut(atom).rect.y = if top {
                rect.y
            } else {
                (baseline as f32 - ascent) as i32
            };
        }

        rect.height = if atoms.is_empty() {
            0
        } else {
            (LINE_SPACING * (max_ascent + max_descent)) as i32
        };
        self.tree.get_mut(line).rect = rect;
    }
}

fn strip_soft_hyphens(word: &str) -> String {
    word.chars().filter(|&c| c != SOFT_HYPHEN).collect()
}

/// Has lowercase letters and no uppercase ones; caseless characters such as
/// punctuation and digits do not count either way
fn is_lowercase_word(word: &str) -> bool {
    word.chars().any(char::is_lowercase) && !word.chars().any(char::is_uppercase)
}

/// Split a word into runs of lowercase and uppercase letters; caseless
/// characters and soft hyphens stay in the current run
fn case_runs(word: &str) -> Vec<String> {
    let mut runs: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut lower = None;
    for c in word.chars() {
        if c.is_lowercase() || c.is_uppercase() {
            let is_lower = c.is_lowercase();
            if lower.is_some_and(|l| l != is_lower) {
                runs.push(std::mem::take(&mut current));
            }
            lower = Some(is_lower);
        }
        current.push(c);
    }
    if !current.is_empty() {
        runs.push(current);
    }
    runs
}
