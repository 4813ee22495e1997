//! DOM (Document Object Model) implementation
//!
//! Nodes live in an arena owned by [`Document`] and are addressed by
//! [`NodeId`]. Children are stored as ordered id lists and the parent link is
//! a plain index, so the tree never holds a second strong reference.

use super::css::CssParser;
use super::html::HtmlParser;
use super::selector::Selector;
use super::style::ComputedStyle;
use crate::utils::error::{DomError, RenderError};

/// Stable handle of a node inside its document arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Build an id from a raw arena index
    pub fn from_index(index: usize) -> Self {
        Self(index)
    }

    /// Raw arena index
    pub fn index(self) -> usize {
        self.0
    }
}

/// Attribute map that keeps insertion order; keys are case-folded
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes {
    entries: Vec<(String, String)>,
}

impl Attributes {
    /// Create an empty attribute map
    pub fn new() -> Self {
        Self::default()
    }

    /// Get an attribute value
    pub fn get(&self, name: &str) -> Option<&str> {
        let name = name.to_ascii_lowercase();
        self.entries
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Insert or replace an attribute, keeping its original position
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into().to_ascii_lowercase();
        let value = value.into();
        match self.entries.iter_mut().find(|(key, _)| *key == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Remove an attribute, returning its value
    pub fn remove(&mut self, name: &str) -> Option<String> {
        let name = name.to_ascii_lowercase();
        let pos = self.entries.iter().position(|(key, _)| *key == name)?;
        Some(self.entries.remove(pos).1)
    }

    /// Whether the attribute is present
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Iterate in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Data for element nodes
#[derive(Debug, Clone, PartialEq)]
pub struct ElementData {
    /// Tag name, lowercase (e.g., "div", "span")
    pub tag_name: String,
    /// Element attributes
    pub attributes: Attributes,
    /// Whether the element holds input focus
    pub is_focused: bool,
}

impl ElementData {
    /// Create a new element
    pub fn new(tag_name: impl Into<String>) -> Self {
        Self {
            tag_name: tag_name.into().to_ascii_lowercase(),
            attributes: Attributes::new(),
            is_focused: false,
        }
    }

    /// Get an attribute value
    pub fn get_attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name)
    }

    /// Set an attribute value
    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.attributes.set(name, value);
    }

    /// Get the ID attribute
    pub fn id(&self) -> Option<&str> {
        self.attributes.get("id")
    }

    /// Get class names
    pub fn classes(&self) -> Vec<&str> {
        self.attributes
            .get("class")
            .map(|c| c.split_whitespace().collect())
            .unwrap_or_default()
    }

    /// Check for a single class name
    pub fn has_class(&self, class: &str) -> bool {
        self.classes().contains(&class)
    }
}

/// Node types in the DOM
#[derive(Debug, Clone, PartialEq)]
pub enum NodeType {
    /// Element node (e.g., <div>)
    Element(ElementData),
    /// Text node with entities already decoded
    Text(String),
}

/// A node in the DOM arena
#[derive(Debug, Clone)]
pub struct Node {
    /// Node type and data
    pub node_type: NodeType,
    /// Owning parent, `None` for the root and detached nodes
    pub parent: Option<NodeId>,
    /// Child nodes in document order
    pub children: Vec<NodeId>,
    /// Style computed by the last cascade
    pub style: ComputedStyle,
}

impl Node {
    fn new(node_type: NodeType) -> Self {
        Self {
            node_type,
            parent: None,
            children: Vec::new(),
            style: ComputedStyle::default(),
        }
    }

    /// Check if this is an element node
    pub fn is_element(&self) -> bool {
        matches!(self.node_type, NodeType::Element(_))
    }

    /// Get element data if this is an element
    pub fn as_element(&self) -> Option<&ElementData> {
        match &self.node_type {
            NodeType::Element(data) => Some(data),
            NodeType::Text(_) => None,
        }
    }

    /// Mutable element data if this is an element
    pub fn as_element_mut(&mut self) -> Option<&mut ElementData> {
        match &mut self.node_type {
            NodeType::Element(data) => Some(data),
            NodeType::Text(_) => None,
        }
    }

    /// Text content if this is a text node
    pub fn as_text(&self) -> Option<&str> {
        match &self.node_type {
            NodeType::Text(text) => Some(text),
            NodeType::Element(_) => None,
        }
    }

    /// Tag name for elements
    pub fn tag_name(&self) -> Option<&str> {
        self.as_element().map(|e| e.tag_name.as_str())
    }

    /// Whether this is an element with the given tag
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tag_name() == Some(tag)
    }
}

/// The DOM document: an arena of nodes rooted at an `html` element
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
}

impl Document {
    /// Create a document holding only an empty `html` root
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::new(NodeType::Element(ElementData::new("html")))],
            root: NodeId(0),
        }
    }

    /// Root element
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of nodes ever allocated, detached ones included
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Look up a node
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    /// Look up a node mutably
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0)
    }

    /// Node access for ids produced by this document.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not allocated by this document.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    /// Element data of a node, if it is an element
    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        self.get(id).and_then(Node::as_element)
    }

    /// Mutable element data of a node, if it is an element
    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut ElementData> {
        self.get_mut(id).and_then(Node::as_element_mut)
    }

    /// Parent of a node
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.parent)
    }

    /// Children of a node
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// Element children only
    pub fn element_children(&self, id: NodeId) -> Vec<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .filter(|c| self.node(*c).is_element())
            .collect()
    }

    /// Strict ancestors, nearest first
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            document: self,
            next: self.parent(id),
        }
    }

    /// Number of ancestors above the node
    pub fn depth(&self, id: NodeId) -> usize {
        self.ancestors(id).count()
    }

    /// Pre-order list of a subtree, the node itself first
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.children(current).iter().rev().copied());
        }
        out
    }

    /// Concatenated text of a subtree
    pub fn text_content(&self, id: NodeId) -> String {
        self.descendants(id)
            .into_iter()
            .filter_map(|n| self.node(n).as_text())
            .collect()
    }

    /// Create a detached element
    pub fn create_element(&mut self, tag_name: &str) -> NodeId {
        self.alloc(Node::new(NodeType::Element(ElementData::new(tag_name))))
    }

    /// Create a detached text node
    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.alloc(Node::new(NodeType::Text(text.into())))
    }

    fn alloc(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    /// Append without validation; used by the tree builder on fresh nodes
    pub(crate) fn attach(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    /// Insert a fresh node at a child position without validation
    pub(crate) fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) {
        let children = &mut self.nodes[parent.0].children;
        let index = index.min(children.len());
        children.insert(index, child);
        self.nodes[child.0].parent = Some(parent);
    }

    fn check(&self, id: NodeId) -> Result<&Node, DomError> {
        self.get(id).ok_or(DomError::InvalidNode(id))
    }

    /// Reject moves that would put a node under itself
    fn check_insertion(&self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.check(child)?;
        if !self.check(parent)?.is_element() {
            return Err(DomError::NotAnElement(parent));
        }
        if child == parent || self.ancestors(parent).any(|a| a == child) {
            return Err(DomError::HierarchyRequest { parent, child });
        }
        Ok(())
    }

    fn detach(&mut self, id: NodeId) {
        if let Some(old_parent) = self.nodes[id.0].parent.take() {
            self.nodes[old_parent.0].children.retain(|c| *c != id);
        }
    }

    /// Move `child` to the end of `parent`'s children
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.check_insertion(parent, child)?;
        self.detach(child);
        self.attach(parent, child);
        Ok(())
    }

    /// Move `new_node` right before `reference` under the same parent
    pub fn insert_before(&mut self, reference: NodeId, new_node: NodeId) -> Result<(), DomError> {
        let parent = self
            .check(reference)?
            .parent
            .ok_or(DomError::Detached(reference))?;
        if new_node == reference {
            return Ok(());
        }
        self.check_insertion(parent, new_node)?;
        self.detach(new_node);
        let index = self.nodes[parent.0]
            .children
            .iter()
            .position(|c| *c == reference)
            .unwrap_or(self.nodes[parent.0].children.len());
        self.nodes[parent.0].children.insert(index, new_node);
        self.nodes[new_node.0].parent = Some(parent);
        Ok(())
    }

    /// Detach `child` from `parent`; `None` if it is not a child of `parent`
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<Option<NodeId>, DomError> {
        self.check(parent)?;
        if self.check(child)?.parent != Some(parent) {
            return Ok(None);
        }
        self.detach(child);
        Ok(Some(child))
    }

    /// Replace an element's children with a parsed markup fragment
    pub fn set_inner_html(&mut self, id: NodeId, markup: &str) -> Result<(), DomError> {
        if !self.check(id)?.is_element() {
            return Err(DomError::NotAnElement(id));
        }
        let fragment = HtmlParser::new().parse(&format!("<html><body>{markup}</body></html>"));
        let body = fragment
            .children(fragment.root())
            .iter()
            .copied()
            .find(|c| fragment.node(*c).has_tag("body"));

        for old in std::mem::take(&mut self.nodes[id.0].children) {
            self.nodes[old.0].parent = None;
        }
        if let Some(body) = body {
            for child in fragment.children(body).to_vec() {
                let copy = self.import(&fragment, child);
                self.attach(id, copy);
            }
        }
        Ok(())
    }

    /// Deep-copy a subtree of another document into this arena, detached
    pub fn import(&mut self, other: &Document, id: NodeId) -> NodeId {
        let source = other.node(id);
        let copy = self.alloc(Node::new(source.node_type.clone()));
        for child in source.children.clone() {
            let child_copy = self.import(other, child);
            self.attach(copy, child_copy);
        }
        copy
    }

    /// Read an attribute
    pub fn get_attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id).and_then(|e| e.get_attribute(name))
    }

    /// Write an attribute
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) -> Result<(), DomError> {
        self.check(id)?;
        let element = self.element_mut(id).ok_or(DomError::NotAnElement(id))?;
        element.set_attribute(name, value);
        Ok(())
    }

    /// Attached nodes matching a selector, in document order
    pub fn query_selector_all(&self, selector_text: &str) -> Result<Vec<NodeId>, RenderError> {
        let selector = CssParser::new()
            .parse_selector(selector_text)
            .ok_or_else(|| RenderError::InvalidSelector(selector_text.to_string()))?;
        Ok(self.select(&selector))
    }

    /// First attached node matching a selector
    pub fn query_selector(&self, selector_text: &str) -> Result<Option<NodeId>, RenderError> {
        Ok(self.query_selector_all(selector_text)?.into_iter().next())
    }

    /// Attached nodes matching an already-parsed selector
    pub fn select(&self, selector: &Selector) -> Vec<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .filter(|n| selector.matches(self, *n))
            .collect()
    }

    /// First child with the given tag
    pub fn find_child_by_tag(&self, parent: NodeId, tag: &str) -> Option<NodeId> {
        self.children(parent)
            .iter()
            .copied()
            .find(|c| self.node(*c).has_tag(tag))
    }

    /// The `body` element
    pub fn body(&self) -> Option<NodeId> {
        self.find_child_by_tag(self.root, "body")
    }

    /// The `head` element
    pub fn head(&self) -> Option<NodeId> {
        self.find_child_by_tag(self.root, "head")
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over strict ancestors
pub struct Ancestors<'a> {
    document: &'a Document,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.document.parent(current);
        Some(current)
    }
}
