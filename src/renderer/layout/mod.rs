//! Layout engine for computing box positions and sizes
//!
//! The layout tree is an arena parallel to the DOM. Every box keeps integer
//! geometry and a non-owning reference to the node(s) it was built from.
//! Layout always runs over the whole document.

mod block;
mod inline;

use super::dom::{Document, ElementData, NodeId};
use super::font::{Font, FontCache};
use block::LayoutContext;
use std::rc::Rc;

/// Width of text inputs and buttons
pub const INPUT_WIDTH_PX: i32 = 200;

/// Width of checkboxes
pub const CHECKBOX_WIDTH_PX: i32 = 20;

/// Largest explicit `width` or `height` honored, in pixels
pub const MAX_LENGTH_PX: i32 = 1 << 24;

/// Tags treated as block-level when no `display` was resolved
pub const BLOCK_ELEMENTS: &[&str] = &[
    "html", "body", "article", "section", "nav", "aside", "h1", "h2", "h3", "h4", "h5", "h6",
    "hgroup", "header", "footer", "address", "p", "hr", "pre", "blockquote", "ol", "ul", "menu",
    "li", "dl", "dt", "dd", "figure", "figcaption", "main", "div", "table", "form", "fieldset",
    "legend", "details", "summary",
];

/// Viewport configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    /// Viewport width in pixels
    pub width: i32,
    /// Viewport height in pixels
    pub height: i32,
    /// Horizontal page margin, also the list indent
    pub hstep: i32,
    /// Vertical page margin
    pub vstep: i32,
    /// Distance of one scroll step
    pub scroll_step: i32,
}

impl Viewport {
    /// Viewport of the given size with default steps
    pub fn new(width: i32, height: i32) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }

    /// Width available to the document
    pub fn content_width(&self) -> i32 {
        (self.width - 2 * self.hstep).max(0)
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            hstep: 13,
            vstep: 18,
            scroll_step: 100,
        }
    }
}

/// Integer rectangle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle from its edges
    pub fn from_ltrb(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self::new(left, top, right.saturating_sub(left), bottom.saturating_sub(top))
    }

    pub fn right(&self) -> i32 {
        self.x.saturating_add(self.width)
    }

    pub fn bottom(&self) -> i32 {
        self.y.saturating_add(self.height)
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    /// Half-open containment: left/top edges inside, right/bottom outside
    pub fn contains_point(&self, x: i32, y: i32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }

    /// Smallest rectangle covering both
    pub fn union(&self, other: &Rect) -> Rect {
        Rect::from_ltrb(
            self.x.min(other.x),
            self.y.min(other.y),
            self.right().max(other.right()),
            self.bottom().max(other.bottom()),
        )
    }
}

/// Handle of a box inside its layout tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayoutId(usize);

impl LayoutId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// What a block box was built from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockSource {
    /// One element or text node
    Node(NodeId),
    /// A run of consecutive inline-level siblings, or a run-in heading
    Anonymous(Vec<NodeId>),
}

impl BlockSource {
    /// Source for a run of siblings; a single node is not anonymous.
    ///
    /// # Panics
    ///
    /// Panics if `nodes` is empty.
    pub fn anonymous(mut nodes: Vec<NodeId>) -> Self {
        assert!(!nodes.is_empty(), "anonymous block needs at least one node");
        if nodes.len() == 1 {
            BlockSource::Node(nodes.remove(0))
        } else {
            BlockSource::Anonymous(nodes)
        }
    }

    pub fn nodes(&self) -> &[NodeId] {
        match self {
            BlockSource::Node(node) => std::slice::from_ref(node),
            BlockSource::Anonymous(nodes) => nodes,
        }
    }

    /// The node, when the block wraps exactly one
    pub fn single(&self) -> Option<NodeId> {
        match self {
            BlockSource::Node(node) => Some(*node),
            BlockSource::Anonymous(_) => None,
        }
    }
}

/// Horizontal alignment of line contents
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

impl TextAlign {
    pub fn from_css(value: &str) -> Self {
        match value {
            "center" => TextAlign::Center,
            "right" => TextAlign::Right,
            _ => TextAlign::Left,
        }
    }
}

/// Supported input controls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputType {
    Text,
    Password,
    Checkbox,
    Button,
    Hidden,
}

impl InputType {
    /// `<button>` is always a button; unknown input types are text
    pub fn from_element(element: &ElementData) -> Self {
        if element.tag_name == "button" {
            return InputType::Button;
        }
        match element.get_attribute("type").unwrap_or("text") {
            "password" => InputType::Password,
            "checkbox" => InputType::Checkbox,
            "hidden" => InputType::Hidden,
            _ => InputType::Text,
        }
    }
}

/// Box variants
#[derive(Debug, Clone)]
pub enum LayoutKind {
    /// Root box; has exactly one block child
    Document { node: NodeId },
    Block {
        source: BlockSource,
        text_align: TextAlign,
    },
    /// One line of an inline-mode block
    Line,
    /// One word after hyphenation and small-caps splitting
    Text {
        node: NodeId,
        word: String,
        font: Rc<Font>,
        /// Placed flush against the previous atom
        no_space_before: bool,
    },
    Input {
        node: NodeId,
        input_type: InputType,
        font: Rc<Font>,
    },
}

/// A box in the layout tree
#[derive(Debug, Clone)]
pub struct LayoutBox {
    pub kind: LayoutKind,
    pub rect: Rect,
    pub parent: Option<LayoutId>,
    pub children: Vec<LayoutId>,
}

impl LayoutBox {
    /// Font of a line atom
    pub fn font(&self) -> Option<&Rc<Font>> {
        match &self.kind {
            LayoutKind::Text { font, .. } | LayoutKind::Input { font, .. } => Some(font),
            _ => None,
        }
    }

    pub fn is_block(&self) -> bool {
        matches!(self.kind, LayoutKind::Block { .. })
    }
}

/// Arena of layout boxes rooted at the document box
#[derive(Debug, Clone)]
pub struct LayoutTree {
    boxes: Vec<LayoutBox>,
}

impl LayoutTree {
    fn new(node: NodeId, rect: Rect) -> Self {
        Self {
            boxes: vec![LayoutBox {
                kind: LayoutKind::Document { node },
                rect,
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    /// The document box
    pub fn root(&self) -> LayoutId {
        LayoutId(0)
    }

    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }

    /// Box access for ids produced by this tree.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not allocated by this tree.
    pub fn get(&self, id: LayoutId) -> &LayoutBox {
        &self.boxes[id.0]
    }

    fn get_mut(&mut self, id: LayoutId) -> &mut LayoutBox {
        &mut self.boxes[id.0]
    }

    pub fn rect(&self, id: LayoutId) -> Rect {
        self.get(id).rect
    }

    pub fn children(&self, id: LayoutId) -> &[LayoutId] {
        &self.get(id).children
    }

    pub fn parent(&self, id: LayoutId) -> Option<LayoutId> {
        self.get(id).parent
    }

    /// Number of ancestors above the box
    pub fn depth(&self, id: LayoutId) -> usize {
        std::iter::successors(self.parent(id), |p| self.parent(*p)).count()
    }

    /// Pre-order list of a subtree, the box itself first
    pub fn descendants(&self, id: LayoutId) -> Vec<LayoutId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.children(current).iter().rev().copied());
        }
        out
    }

    /// Nodes a box was built from; lines report their block's nodes
    pub fn source_nodes(&self, id: LayoutId) -> Vec<NodeId> {
        match &self.get(id).kind {
            LayoutKind::Document { node } | LayoutKind::Text { node, .. } | LayoutKind::Input { node, .. } => {
                vec![*node]
            }
            LayoutKind::Block { source, .. } => source.nodes().to_vec(),
            LayoutKind::Line => self
                .parent(id)
                .map(|block| self.source_nodes(block))
                .unwrap_or_default(),
        }
    }

    /// The node interaction resolves to: the last source node
    pub fn node_of(&self, id: LayoutId) -> Option<NodeId> {
        self.source_nodes(id).last().copied()
    }

    /// Bounds of everything laid out for `node` and its descendants
    pub fn node_rect(&self, document: &Document, node: NodeId) -> Option<Rect> {
        self.descendants(self.root())
            .into_iter()
            .filter(|id| match &self.get(*id).kind {
                LayoutKind::Text { node: source, .. }
                | LayoutKind::Input { node: source, .. }
                | LayoutKind::Block {
                    source: BlockSource::Node(source),
                    ..
                } => *source == node || document.ancestors(*source).any(|a| a == node),
                _ => false,
            })
            .map(|id| self.rect(id))
            .reduce(|acc, rect| acc.union(&rect))
    }

    fn push(&mut self, parent: LayoutId, kind: LayoutKind, rect: Rect) -> LayoutId {
        let id = LayoutId(self.boxes.len());
        self.boxes.push(LayoutBox {
            kind,
            rect,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.get_mut(parent).children.push(id);
        id
    }
}

/// Layout engine for computing the layout tree
pub struct LayoutEngine {
    viewport: Viewport,
}

impl LayoutEngine {
    /// Create a new layout engine
    pub fn new(viewport: Viewport) -> Self {
        Self { viewport }
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    /// Set viewport dimensions
    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    /// Lay out a styled document
    pub fn layout(&self, document: &Document, fonts: &FontCache) -> LayoutTree {
        let viewport = &self.viewport;
        let mut tree = LayoutTree::new(
            document.root(),
            Rect::new(viewport.hstep, viewport.vstep, viewport.content_width(), 0),
        );
        let context = LayoutContext::new(document, fonts, viewport);
        let root = tree.root();
        let child = tree.push(
            root,
            LayoutKind::Block {
                source: BlockSource::Node(document.root()),
                text_align: TextAlign::Left,
            },
            Rect::default(),
        );
        context.layout_block(&mut tree, child, None, 0);
        tree.get_mut(root).rect.height = tree.rect(child).height;
        tree
    }
}

impl Default for LayoutEngine {
    fn default() -> Self {
        Self::new(Viewport::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::css::CssParser;
    use crate::renderer::html::HtmlParser;
    use crate::renderer::style::StyleEngine;
    use pretty_assertions::assert_eq;

    /// Viewport whose document content is exactly `width` wide
    fn viewport(width: i32) -> Viewport {
        let defaults = Viewport::default();
        Viewport::new(width + 2 * defaults.hstep, 600)
    }

    fn layout(markup: &str, css: &str, width: i32) -> (Document, LayoutTree) {
        let mut doc = HtmlParser::new().parse(markup);
        StyleEngine::new().compute_styles(&mut doc, &[CssParser::new().parse(css)]);
        let tree = LayoutEngine::new(viewport(width)).layout(&doc, &FontCache::approximate());
        (doc, tree)
    }

    fn find(tree: &LayoutTree, pred: impl Fn(&LayoutBox) -> bool) -> Vec<LayoutId> {
        tree.descendants(tree.root())
            .into_iter()
            .filter(|id| pred(tree.get(*id)))
            .collect()
    }

    fn words(tree: &LayoutTree, line: LayoutId) -> Vec<String> {
        tree.children(line)
            .iter()
            .filter_map(|id| match &tree.get(*id).kind {
                LayoutKind::Text { word, .. } => Some(word.clone()),
                _ => None,
            })
            .collect()
    }

    fn lines(tree: &LayoutTree) -> Vec<LayoutId> {
        find(tree, |b| matches!(b.kind, LayoutKind::Line))
    }

    fn block_of(tree: &LayoutTree, doc: &Document, tag: &str) -> LayoutId {
        let node = doc.query_selector(tag).unwrap().unwrap();
        find(tree, |b| matches!(&b.kind, LayoutKind::Block { source: BlockSource::Node(n), .. } if *n == node))[0]
    }

    #[test]
    fn test_rect_contains_point_is_half_open() {
        let rect = Rect::new(10, 10, 5, 5);
        assert!(rect.contains_point(10, 10));
        assert!(rect.contains_point(14, 14));
        assert!(!rect.contains_point(15, 10));
        assert!(!rect.contains_point(10, 15));
        assert_eq!(rect.union(&Rect::new(0, 12, 2, 10)), Rect::new(0, 10, 15, 12));
    }

    #[test]
    fn test_document_box() {
        let (_, tree) = layout("<p>x</p>", "", 100);
        let root = tree.get(tree.root());
        assert_eq!(root.rect.x, 13);
        assert_eq!(root.rect.y, 18);
        assert_eq!(root.rect.width, 100);
        assert_eq!(root.children.len(), 1);
        assert_eq!(root.rect.height, tree.rect(root.children[0]).height);
    }

    #[test]
    fn test_end_to_end_inline_layout() {
        let (doc, tree) = layout(
            "<p>Hello <b>world</b></p>",
            "p {color: red} b {font-weight: bold}",
            100,
        );
        let p = block_of(&tree, &doc, "p");
        assert_eq!(tree.children(p).len(), 1);
        let line = tree.children(p)[0];
        assert_eq!(words(&tree, line), vec!["Hello", "world"]);

        let atoms = tree.children(line);
        let hello = tree.get(atoms[0]);
        let world = tree.get(atoms[1]);
        assert_eq!(hello.font().unwrap().descriptor().weight, crate::renderer::font::FontWeight::Normal);
        assert_eq!(world.font().unwrap().descriptor().weight, crate::renderer::font::FontWeight::Bold);
        // "Hello" is 30px plus a 6px space
        assert_eq!(world.rect.x, hello.rect.x + 36);
    }

    #[test]
    fn test_block_vs_inline_mode() {
        let (doc, tree) = layout("<div>a <p>b</p> c <span>d</span></div>", "", 100);
        let div = block_of(&tree, &doc, "div");
        let children = tree.children(div);
        assert_eq!(children.len(), 3);
        assert!(children.iter().all(|c| tree.get(*c).is_block()));
        assert!(matches!(
            &tree.get(children[2]).kind,
            LayoutKind::Block { source: BlockSource::Anonymous(nodes), .. } if nodes.len() == 2
        ));
        // Consecutive blocks stack
        assert_eq!(tree.rect(children[1]).y, tree.rect(children[0]).bottom());
        assert_eq!(
            tree.rect(div).height,
            children.iter().map(|c| tree.rect(*c).height).sum::<i32>()
        );
    }

    #[test]
    fn test_hidden_nodes_skipped() {
        let (doc, tree) = layout(
            "<title>T</title><div>a</div><div style=\"display: none\">b</div>",
            "",
            100,
        );
        let all_words: Vec<String> = lines(&tree).into_iter().flat_map(|l| words(&tree, l)).collect();
        assert_eq!(all_words, vec!["a"]);
        let head = doc.head().unwrap();
        assert!(tree.descendants(tree.root()).iter().all(|id| !tree.source_nodes(*id).contains(&head)));
    }

    #[test]
    fn test_line_breaking() {
        let (_, tree) = layout("<p>aaaaaaaaaa bbbbbbbbbb</p>", "", 100);
        let lines = lines(&tree);
        assert_eq!(lines.len(), 2);
        assert_eq!(words(&tree, lines[0]), vec!["aaaaaaaaaa"]);
        assert_eq!(words(&tree, lines[1]), vec!["bbbbbbbbbb"]);
        let first = tree.rect(lines[0]);
        assert_eq!(tree.rect(lines[1]).y, first.y + first.height);
    }

    #[test]
    fn test_soft_hyphen_fallback() {
        let (_, tree) = layout("<p>super&shy;cali&shy;fragilistic</p>", "", 100);
        let lines = lines(&tree);
        assert_eq!(lines.len(), 2);
        assert_eq!(words(&tree, lines[0]), vec!["supercali-"]);
        assert_eq!(words(&tree, lines[1]), vec!["fragilistic"]);
    }

    #[test]
    fn test_soft_hyphens_removed_when_word_fits() {
        let (_, tree) = layout("<p>hy&shy;phen</p>", "", 100);
        assert_eq!(words(&tree, lines(&tree)[0]), vec!["hyphen"]);
    }

    #[test]
    fn test_unbreakable_word_overflows_alone() {
        let (_, tree) = layout("<p>a bbbbbbbbbbbbbbbbbbbbbbbb</p>", "", 100);
        let lines = lines(&tree);
        assert_eq!(lines.len(), 2);
        assert_eq!(words(&tree, lines[1]), vec!["bbbbbbbbbbbbbbbbbbbbbbbb"]);
    }

    #[test]
    fn test_explicit_width_and_height() {
        let (doc, tree) = layout(
            "<div id=a>x</div><div id=b>y</div>",
            "#a { width: 40px; height: 50px } #b { width: 5000px }",
            100,
        );
        let a = tree.rect(block_of(&tree, &doc, "#a"));
        let b = tree.rect(block_of(&tree, &doc, "#b"));
        assert_eq!((a.width, a.height), (40, 50));
        assert_eq!(b.width, 100);
        assert_eq!(b.y, a.bottom());
    }

    #[test]
    fn test_width_containment() {
        let (_, tree) = layout(
            "<div><ul><li>one two three four five six</li></ul></div>",
            "",
            100,
        );
        for id in tree.descendants(tree.root()) {
            let b = tree.get(id);
            if let Some(parent) = b.parent {
                if b.is_block() || matches!(b.kind, LayoutKind::Line) {
                    assert!(b.rect.width <= tree.rect(parent).width);
                }
            }
        }
    }

    #[test]
    fn test_list_item_indent() {
        let (doc, tree) = layout("<ul><li>x</li></ul>", "", 100);
        let ul = tree.rect(block_of(&tree, &doc, "ul"));
        let li = tree.rect(block_of(&tree, &doc, "li"));
        assert_eq!(li.x, ul.x + 13);
    }

    #[test]
    fn test_run_in_heading() {
        let (doc, tree) = layout("<h6>Note</h6><p>text</p>", "", 100);
        let body = block_of(&tree, &doc, "body");
        let children = tree.children(body);
        assert_eq!(children.len(), 1);
        let line = lines(&tree)[0];
        assert_eq!(words(&tree, line), vec!["Note", "text"]);
        let h6 = doc.query_selector("h6").unwrap().unwrap();
        let p = doc.query_selector("p").unwrap().unwrap();
        assert_eq!(tree.source_nodes(children[0]), vec![h6, p]);
    }

    #[test]
    fn test_line_metrics() {
        let (_, tree) = layout("<p>x</p>", "", 100);
        let line = lines(&tree)[0];
        let rect = tree.rect(line);
        let atom = tree.rect(tree.children(line)[0]);
        // 12pt face: ascent 9.6, descent 2.4
        assert_eq!(rect.height, 15);
        assert_eq!(atom.y, rect.y + 2);
        assert_eq!(atom.height, 12);
    }

    #[test]
    fn test_vertical_align_top() {
        let (_, tree) = layout(
            "<p>big <span>small</span></p>",
            "p { font-size: 32px } span { font-size: 16px; vertical-align: top }",
            1000,
        );
        let line = lines(&tree)[0];
        let atoms = tree.children(line);
        assert_eq!(tree.rect(atoms[1]).y, tree.rect(line).y);
        assert!(tree.rect(atoms[0]).y > tree.rect(line).y);
    }

    #[test]
    fn test_text_align() {
        let (_, tree) = layout(
            "<p style=\"text-align: right\">ab</p><p style=\"text-align: center\">ab</p>",
            "",
            100,
        );
        let lines = lines(&tree);
        let right = tree.rect(tree.children(lines[0])[0]);
        let center = tree.rect(tree.children(lines[1])[0]);
        assert_eq!(right.right(), tree.rect(lines[0]).right());
        assert_eq!(center.x, tree.rect(lines[1]).x + (100 - 12) / 2);
    }

    #[test]
    fn test_pre_keeps_whitespace_and_newlines() {
        let (_, tree) = layout("<pre>a  b\nc</pre>", "", 100);
        let lines = lines(&tree);
        assert_eq!(lines.len(), 2);
        assert_eq!(words(&tree, lines[0]), vec!["a  b"]);
        assert_eq!(words(&tree, lines[1]), vec!["c"]);
    }

    #[test]
    fn test_br_forces_break() {
        let (_, tree) = layout("<p>a<br>b</p>", "", 100);
        let lines = lines(&tree);
        assert_eq!(lines.len(), 2);
        assert_eq!(words(&tree, lines[1]), vec!["b"]);
    }

    #[test]
    fn test_small_caps() {
        let (_, tree) = layout(
            "<p>lower MiXed</p>",
            "p { font-variant: small-caps }",
            1000,
        );
        let line = lines(&tree)[0];
        assert_eq!(words(&tree, line), vec!["LOWER", "M", "I", "X", "ED"]);
        let atoms = tree.children(line);
        let size = |id: LayoutId| tree.get(id).font().unwrap().descriptor().size;
        assert_eq!(size(atoms[0]), 9);
        assert_eq!(size(atoms[1]), 12);
        assert_eq!(size(atoms[2]), 9);
        // Segments sit flush against each other
        assert_eq!(tree.rect(atoms[2]).x, tree.rect(atoms[1]).right());
    }

    #[test]
    fn test_small_caps_keeps_punctuated_words_whole() {
        let (_, tree) = layout("<p>don't hello,</p>", "p { font-variant: small-caps }", 1000);
        let line = lines(&tree)[0];
        assert_eq!(words(&tree, line), vec!["DON'T", "HELLO,"]);
        for &atom in tree.children(line) {
            assert_eq!(tree.get(atom).font().unwrap().descriptor().size, 9);
        }
    }

    #[test]
    fn test_inputs_are_atoms() {
        let (_, tree) = layout(
            "<p><input name=q><input type=checkbox><input type=hidden><button>Go</button></p>",
            "",
            1000,
        );
        let inputs: Vec<InputType> = find(&tree, |b| matches!(b.kind, LayoutKind::Input { .. }))
            .into_iter()
            .map(|id| match tree.get(id).kind {
                LayoutKind::Input { input_type, .. } => input_type,
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(inputs, vec![InputType::Text, InputType::Checkbox, InputType::Button]);
        let atoms = find(&tree, |b| matches!(b.kind, LayoutKind::Input { .. }));
        assert_eq!(tree.rect(atoms[0]).width, INPUT_WIDTH_PX);
        assert_eq!(tree.rect(atoms[1]).width, CHECKBOX_WIDTH_PX);
    }

    #[test]
    fn test_node_rect_covers_inline_element() {
        let (doc, tree) = layout("<p>a <b>bold words</b></p>", "", 1000);
        let b = doc.query_selector("b").unwrap().unwrap();
        let rect = tree.node_rect(&doc, b).unwrap();
        let line = lines(&tree)[0];
        let atoms = tree.children(line);
        assert_eq!(rect, tree.rect(atoms[1]).union(&tree.rect(atoms[2])));
    }

    #[test]
    fn test_layout_never_fails_on_bad_values() {
        let (_, tree) = layout(
            "<p style=\"font-size: huge; width: banana; height: -\">x</p>",
            "",
            100,
        );
        assert!(tree.len() > 2);
    }

    #[test]
    fn test_huge_explicit_height_is_clamped() {
        let (doc, tree) = layout("<div style=\"height: 3000000000px\">a</div><p>b</p>", "", 100);
        let div = block_of(&tree, &doc, "div");
        let p = block_of(&tree, &doc, "p");
        assert_eq!(tree.rect(div).height, MAX_LENGTH_PX);
        assert_eq!(tree.rect(p).y, tree.rect(div).bottom());
    }

    #[test]
    fn test_huge_explicit_width_stays_inside_parent() {
        let (doc, tree) = layout("<div style=\"width: 1e30px\">a</div>", "", 100);
        let div = block_of(&tree, &doc, "div");
        assert_eq!(tree.rect(div).width, 100);
    }

    #[test]
    fn test_document_height_saturates() {
        let markup = "<div style=\"height: 3000000000px\"></div>".repeat(200);
        let (_, tree) = layout(&markup, "", 100);
        assert_eq!(tree.rect(tree.root()).height, i32::MAX);
    }

    #[test]
    fn test_huge_font_size_lays_out() {
        let (_, tree) = layout("<p style=\"font-size: 100000000000px\">a b</p>", "", 100);
        let texts = find(&tree, |b| matches!(b.kind, LayoutKind::Text { .. }));
        assert_eq!(texts.len(), 2);
        for id in texts {
            assert_eq!(tree.get(id).font().unwrap().descriptor().size, crate::renderer::font::MAX_FONT_SIZE);
        }
    }
}
