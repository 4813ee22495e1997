//! Compositor: painting, display lists and hit testing
//!
//! The painter walks the layout tree into a display list of draw commands.
//! The list is replayed on any [`Canvas`]; [`Frame`] is the built-in
//! software canvas.

mod display_list;
mod frame;
mod painter;

pub use display_list::{BlendMode, Canvas, DrawCommand, DrawOp, flatten};
pub use frame::Frame;
pub use hit_test::hit_test;
pub use painter::Painter;

use crate::renderer::{Color, Viewport};

/// Replay a display list onto a white viewport-sized frame
pub fn rasterize(commands: &[DrawCommand], viewport: &Viewport, scroll: i32) -> Frame {
    let mut frame = Frame::new(viewport.width.max(0) as u32, viewport.height.max(0) as u32);
    frame.clear(Color::WHITE);
    for command in commands {
        command.execute(&mut frame, scroll);
    }
    frame
}
