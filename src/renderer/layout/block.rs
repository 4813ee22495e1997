//! Block flow: stacking, anonymous boxes and mode selection

use super::inline::InlineLayout;
use super::{BLOCK_ELEMENTS, BlockSource, LayoutKind, LayoutId, LayoutTree, MAX_LENGTH_PX, Rect, TextAlign, Viewport};
use crate::renderer::MAX_TREE_DEPTH;
use crate::renderer::dom::{Document, NodeId};
use crate::renderer::font::FontCache;
use crate::renderer::html::HEAD_TAGS;

/// Pixel length clamped to `0..=MAX_LENGTH_PX`
fn length(px: f32) -> i32 {
    px.clamp(0.0, MAX_LENGTH_PX as f32) as i32
}

/// Shared inputs of one layout pass
pub(super) struct LayoutContext<'a> {
    pub(super) document: &'a Document,
    pub(super) fonts: &'a FontCache,
    pub(super) viewport: &'a Viewport,
}

impl<'a> LayoutContext<'a> {
    pub(super) fn new(document: &'a Document, fonts: &'a FontCache, viewport: &'a Viewport) -> Self {
        Self {
            document,
            fonts,
            viewport,
        }
    }

    /// Lay out a block whose parent is already positioned
    pub(super) fn layout_block(
        &self,
        tree: &mut LayoutTree,
        id: LayoutId,
        previous: Option<LayoutId>,
        depth: usize,
    ) {
        let Some(parent) = tree.parent(id) else {
            return;
        };
        let parent_rect = tree.rect(parent);
        let source = match &tree.get(id).kind {
            LayoutKind::Block { source, .. } => source.clone(),
            _ => return,
        };

        let mut rect = Rect {
            x: parent_rect.x,
            y: previous.map_or(parent_rect.y, |p| tree.rect(p).bottom()),
            width: parent_rect.width,
            height: 0,
        };
        let single = source.single();
        if let Some(node) = single {
            if let Some(width) = self.document.node(node).style.px("width") {
                rect.width = length(width).min(parent_rect.width.max(0));
            }
            if self.document.node(node).has_tag("li") {
                rect.x = rect.x.saturating_add(self.viewport.hstep);
            }
            if self.is_toc(node) {
                rect.y = rect.y.saturating_add(self.viewport.vstep);
            }
        }
        tree.get_mut(id).rect = rect;

        let block_parent = single.filter(|node| self.has_block_children(*node));
        if depth >= MAX_TREE_DEPTH {
            log::warn!("layout depth limit reached, skipping subtree");
        } else if let Some(node) = block_parent {
            self.layout_block_children(tree, id, node, depth);
        } else {
            let text_align = self.layout_inline(tree, id, source.nodes(), depth);
            if let LayoutKind::Block { text_align: align, .. } = &mut tree.get_mut(id).kind {
                *align = text_align;
            }
        }

        let explicit = single.and_then(|node| self.document.node(node).style.px("height"));
        tree.get_mut(id).rect.height = match explicit {
            Some(height) => length(height),
            None => tree
                .children(id)
                .iter()
                .fold(0, |total: i32, c| total.saturating_add(tree.rect(*c).height)),
        };
    }

    fn layout_block_children(&self, tree: &mut LayoutTree, id: LayoutId, node: NodeId, depth: usize) {
        let mut previous = None;
        for source in self.block_sources(node) {
            let child = tree.push(
                id,
                LayoutKind::Block {
                    source,
                    text_align: TextAlign::Left,
                },
                Rect::default(),
            );
            self.layout_block(tree, child, previous, depth + 1);
            previous = Some(child);
        }
    }

    /// Group children into block sources: block-level children stand alone,
    /// runs of inline children share an anonymous block, and a paragraph
    /// right after an `h6` is merged into it.
    fn block_sources(&self, node: NodeId) -> Vec<BlockSource> {
        let mut sources: Vec<BlockSource> = Vec::new();
        let mut pending: Vec<NodeId> = Vec::new();

        for &child in self.document.children(node) {
            if self.is_hidden(child) {
                continue;
            }
            if !self.is_block_level(child) {
                pending.push(child);
                continue;
            }
            if !pending.is_empty() {
                sources.push(BlockSource::anonymous(std::mem::take(&mut pending)));
            }
            let runs_in = self.document.node(child).has_tag("p")
                && matches!(sources.last(), Some(BlockSource::Node(prev)) if self.document.node(*prev).has_tag("h6"));
            match sources.pop() {
                Some(BlockSource::Node(heading)) if runs_in => {
                    sources.push(BlockSource::Anonymous(vec![heading, child]));
                }
                Some(last) => {
                    sources.push(last);
                    sources.push(BlockSource::Node(child));
                }
                None => sources.push(BlockSource::Node(child)),
            }
        }
        if !pending.is_empty() {
            sources.push(BlockSource::anonymous(pending));
        }
        sources
    }

    /// Lay out inline content into lines, returning the alignment used
    fn layout_inline(&self, tree: &mut LayoutTree, id: LayoutId, nodes: &[NodeId], depth: usize) -> TextAlign {
        let mut text_align = TextAlign::Left;
        let mut inline = InlineLayout::new(self, tree, id);
        for &node in nodes {
            text_align = TextAlign::from_css(self.document.node(node).style.get_or("text-align", "left"));
            inline.recurse(node, depth);
        }
        inline.finish(text_align);
        text_align
    }

    fn has_block_children(&self, node: NodeId) -> bool {
        self.document
            .children(node)
            .iter()
            .any(|&child| self.document.node(child).is_element() && !self.is_hidden(child) && self.is_block_level(child))
    }

    /// Block-level by resolved `display`, else by tag
    fn is_block_level(&self, node: NodeId) -> bool {
        let node = self.document.node(node);
        let Some(element) = node.as_element() else {
            return false;
        };
        match node.style.get("display") {
            Some(display) => display == "block",
            None => BLOCK_ELEMENTS.contains(&element.tag_name.as_str()),
        }
    }

    /// `display: none` or document metadata
    pub(super) fn is_hidden(&self, node: NodeId) -> bool {
        let node = self.document.node(node);
        match node.as_element() {
            Some(element) => {
                node.style.get("display") == Some("none")
                    || element.tag_name == "head"
                    || HEAD_TAGS.contains(&element.tag_name.as_str())
            }
            None => false,
        }
    }

    fn is_toc(&self, node: NodeId) -> bool {
        self.document
            .element(node)
            .is_some_and(|e| e.tag_name == "nav" && e.id() == Some("toc"))
    }
}
