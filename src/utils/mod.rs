//! Shared utilities

pub mod error;

pub use error::{DomError, QuireError, RenderError, Result};
