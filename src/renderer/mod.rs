//! Rendering pipeline for quire
//!
//! Handles HTML parsing, the CSS cascade and layout computation.

pub mod css;
mod dom;
pub mod font;
pub mod html;
pub mod layout;
pub mod selector;
mod style;

pub use css::{Color, CssParser, Stylesheet};
pub use dom::{Attributes, Document, ElementData, Node, NodeId, NodeType};
pub use font::{ApproximateFontBackend, Font, FontBackend, FontCache, FontDescriptor};
pub use html::HtmlParser;
pub use layout::{LayoutBox, LayoutEngine, LayoutId, LayoutKind, LayoutTree, Rect, Viewport};
pub use selector::Selector;
pub use style::{ComputedStyle, StyleEngine};

/// Deepest tree any recursive pass will descend into
pub const MAX_TREE_DEPTH: usize = 256;

/// Parsers, cascade and layout bundled into one pipeline
pub struct Renderer {
    html_parser: HtmlParser,
    css_parser: CssParser,
    style_engine: StyleEngine,
    layout_engine: LayoutEngine,
}

impl Renderer {
    /// Create a new renderer for a viewport
    pub fn new(viewport: Viewport) -> Self {
        Self {
            html_parser: HtmlParser::new(),
            css_parser: CssParser::new(),
            style_engine: StyleEngine::new(),
            layout_engine: LayoutEngine::new(viewport),
        }
    }

    /// Parse HTML content into a DOM tree
    pub fn parse_html(&self, content: &str) -> Document {
        self.html_parser.parse(content)
    }

    /// Parse a stylesheet
    pub fn parse_css(&self, content: &str) -> Stylesheet {
        self.css_parser.parse(content)
    }

    /// Resolve styles for every node against the user-agent sheet plus `stylesheets`
    pub fn compute_styles(&self, document: &mut Document, stylesheets: &[Stylesheet]) {
        self.style_engine.compute_styles(document, stylesheets);
    }

    /// Compute layout for a styled document
    pub fn layout(&self, document: &Document, fonts: &FontCache) -> LayoutTree {
        self.layout_engine.layout(document, fonts)
    }

    pub fn viewport(&self) -> &Viewport {
        self.layout_engine.viewport()
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.layout_engine.set_viewport(viewport);
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new(Viewport::default())
    }
}
