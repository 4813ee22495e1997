//! Error types for quire

use thiserror::Error;

use crate::renderer::NodeId;

/// Main error type for quire operations
#[derive(Debug, Error)]
pub enum QuireError {
    /// Tree mutation errors
    #[error("DOM error: {0}")]
    Dom(#[from] DomError),
    /// Rendering pipeline errors
    #[error("Render error: {0}")]
    Render(#[from] RenderError),
    /// Page or resource URL could not be parsed
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// Generic error with message
    #[error("Error: {0}")]
    Other(String),
}

/// Errors raised by the tree-mutation entry points
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomError {
    /// The id does not name a node of this document
    #[error("no node with id {0:?}")]
    InvalidNode(NodeId),
    /// The operation would make a node its own ancestor
    #[error("cannot insert {child:?} under {parent:?}: it would create a cycle")]
    HierarchyRequest { parent: NodeId, child: NodeId },
    /// Text nodes cannot have children or attributes
    #[error("node {0:?} is not an element")]
    NotAnElement(NodeId),
    /// The reference node has no parent to insert into
    #[error("node {0:?} is detached")]
    Detached(NodeId),
}

/// Rendering-specific errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    /// Geometry or display list requested before layout ran
    #[error("layout has not been computed yet")]
    LayoutNotComputed,
    /// A selector string could not be parsed
    #[error("invalid selector: {0}")]
    InvalidSelector(String),
}

/// Convenience Result type for quire operations
pub type Result<T> = std::result::Result<T, QuireError>;
