pub mod colors;
mod text;

use crate::core::state::DashboardSnapshot;
use std::io;

pub use text::{chart_lines, format_hour, TextRenderer};

/// Drawing surface for the dashboard. Called once per refresh tick with a
/// fresh snapshot; must not block on network I/O.
pub trait Renderer {
    fn render(&mut self, snapshot: &DashboardSnapshot) -> io::Result<()>;
}
