//! Debug draw hooks
//!
//! Read-only views of the collision state as line lists. Nothing here feeds
//! back into the simulation; a renderer uploads [`DebugLines::as_bytes`] as a
//! line-list vertex buffer.

pub mod lines;
pub mod vertex;

pub use lines::DebugLines;
pub use vertex::{DebugVertex, colors};
