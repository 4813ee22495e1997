//! # quire - a small web document rendering engine
//!
//! quire turns HTML and CSS into positioned boxes and a display list of
//! drawing commands, and answers hit-test queries against the result.
//!
//! ## Architecture
//!
//! - **renderer**: tree building, the CSS parser and cascade, fonts and layout
//! - **compositor**: painting into a display list, hit testing and a software canvas
//! - **engine**: the page controller tying the pipeline to interaction
//! - **utils**: shared error types
//!
//! ```
//! use quire::{Page, Viewport};
//!
//! let mut page = Page::new(Viewport::default());
//! page.load_html("<p>Hello <b>world</b></p>");
//! assert_eq!(page.display_list().unwrap().len(), 2);
//! ```

pub mod compositor;
pub mod engine;
pub mod renderer;
pub mod utils;

// Re-export main types for convenience
pub use engine::{ClickOutcome, Page, Viewport};
pub use utils::error::{QuireError, Result};

/// Library version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = "quire";
