//! Selector AST and matching

use super::dom::{Document, NodeId};
use super::MAX_TREE_DEPTH;

/// Specificity of a tag selector
pub const TAG_SPECIFICITY: u32 = 1;
/// Specificity of a class selector
pub const CLASS_SPECIFICITY: u32 = 10;
/// Specificity of an id selector
pub const ID_SPECIFICITY: u32 = 100;

/// A parsed selector
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    /// Matches elements with this (lowercase) tag name
    Tag(String),
    /// Matches elements carrying this class
    Class(String),
    /// Matches the element with this id
    Id(String),
    /// The last selector matches the node, earlier ones match strict
    /// ancestors in order, not necessarily consecutive
    Descendant(Vec<Selector>),
    /// Every selector matches the same node
    Sequence(Vec<Selector>),
    /// `subject:has(a b ...)`: the subject matches the node and some path
    /// below it matches the chain in order
    Has {
        subject: Box<Selector>,
        chain: Vec<Selector>,
    },
}

impl Selector {
    /// Build a `:has()` selector.
    ///
    /// # Panics
    ///
    /// Panics if the chain is empty or contains another `:has()`.
    pub fn has(subject: Selector, chain: Vec<Selector>) -> Self {
        assert!(!chain.is_empty(), ":has() needs at least one argument");
        assert!(
            !subject.contains_has() && !chain.iter().any(Selector::contains_has),
            ":has() cannot be nested"
        );
        Selector::Has {
            subject: Box::new(subject),
            chain,
        }
    }

    /// Collapse a list of compounds into a descendant selector
    pub fn from_compounds(mut compounds: Vec<Selector>) -> Self {
        if compounds.len() == 1 {
            compounds.remove(0)
        } else {
            Selector::Descendant(compounds)
        }
    }

    /// Whether a `:has()` appears anywhere inside
    pub fn contains_has(&self) -> bool {
        match self {
            Selector::Has { .. } => true,
            Selector::Descendant(parts) | Selector::Sequence(parts) => {
                parts.iter().any(Selector::contains_has)
            }
            _ => false,
        }
    }

    /// Cascade priority: ids outweigh classes outweigh tags, summed
    pub fn specificity(&self) -> u32 {
        match self {
            Selector::Tag(_) => TAG_SPECIFICITY,
            Selector::Class(_) => CLASS_SPECIFICITY,
            Selector::Id(_) => ID_SPECIFICITY,
            Selector::Descendant(parts) | Selector::Sequence(parts) => {
                parts.iter().map(Selector::specificity).sum()
            }
            Selector::Has { subject, chain } => {
                subject.specificity() + chain.iter().map(Selector::specificity).sum::<u32>()
            }
        }
    }

    /// Check if the selector matches a node
    pub fn matches(&self, document: &Document, node: NodeId) -> bool {
        let Some(element) = document.element(node) else {
            return false;
        };
        match self {
            Selector::Tag(tag) => element.tag_name == *tag,
            Selector::Class(class) => element.has_class(class),
            Selector::Id(id) => element.id() == Some(id.as_str()),
            Selector::Sequence(parts) => parts.iter().all(|s| s.matches(document, node)),
            Selector::Descendant(parts) => {
                let Some((last, ancestors)) = parts.split_last() else {
                    return false;
                };
                if !last.matches(document, node) {
                    return false;
                }
                let mut remaining = ancestors;
                for ancestor in document.ancestors(node) {
                    let Some((next, rest)) = remaining.split_last() else {
                        break;
                    };
                    if next.matches(document, ancestor) {
                        remaining = rest;
                    }
                }
                remaining.is_empty()
            }
            Selector::Has { subject, chain } => {
                subject.matches(document, node) && has_chain(document, node, chain, 0)
            }
        }
    }
}

/// Depth-first search below `node` for a path that matches `chain` in order
fn has_chain(document: &Document, node: NodeId, chain: &[Selector], depth: usize) -> bool {
    if depth >= MAX_TREE_DEPTH {
        return false;
    }
    document.children(node).iter().any(|child| {
        let rest = match chain.split_first() {
            Some((first, rest)) if first.matches(document, *child) => rest,
            _ => chain,
        };
        rest.is_empty() || has_chain(document, *child, rest, depth + 1)
    })
}
