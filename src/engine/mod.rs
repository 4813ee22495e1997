//! Page controller orchestrating the rendering pipeline
//!
//! A [`Page`] runs every render through the same steps:
//! 1. Parse markup into the DOM and gather `<style>` sheets
//! 2. Cascade styles over the user-agent sheet and author sheets
//! 3. Lay out the whole document
//! 4. Paint the layout tree into a display list
//!
//! Fetching resources is left to the embedder: the page reports its
//! stylesheet links and link targets as resolved URLs.

mod page;

pub use crate::renderer::Viewport;
pub use page::{ClickOutcome, Page, SCROLLBAR_WIDTH};
