//! Vertex type for debug line buffers

use bytemuck::{Pod, Zeroable};
use glam::Vec2;

/// Line-list vertex with position and color
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct DebugVertex {
    pub position: [f32; 2],
    pub color: [f32; 4],
}

impl DebugVertex {
    pub const fn new(x: f32, y: f32, color: [f32; 4]) -> Self {
        Self {
            position: [x, y],
            color,
        }
    }

    pub fn at(p: Vec2, color: [f32; 4]) -> Self {
        Self::new(p.x, p.y, color)
    }

    /// Size of one vertex in bytes
    pub const STRIDE: usize = std::mem::size_of::<DebugVertex>();
}

/// Colors for debug overlays
pub mod colors {
    pub const BROAD_PHASE_NODE: [f32; 4] = [0.3, 0.3, 0.4, 0.6];
    pub const BROAD_PHASE_LEAF: [f32; 4] = [0.2, 0.8, 0.4, 1.0];
    pub const ACTIVE_BODY: [f32; 4] = [1.0, 1.0, 1.0, 1.0];
    pub const FIXED_BODY: [f32; 4] = [0.4, 0.7, 1.0, 1.0];
    pub const PASSIVE_BODY: [f32; 4] = [0.9, 0.85, 0.3, 1.0];
    pub const CONTACT_POINT: [f32; 4] = [1.0, 0.4, 0.2, 1.0];
    pub const CONTACT_NORMAL: [f32; 4] = [1.0, 0.2, 0.6, 1.0];
    pub const CANCELED_CONTACT: [f32; 4] = [0.5, 0.5, 0.5, 0.5];
}
