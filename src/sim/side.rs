//! Which side of a body a collision happened on

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Side of a body, in screen convention (y grows downward)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    None,
    Top,
    Bottom,
    Left,
    Right,
}

impl Side {
    /// Side most aligned with `direction`. Ties resolve in the order
    /// left, right, top, bottom.
    pub fn from_direction(direction: Vec2) -> Side {
        if direction == Vec2::ZERO || !direction.is_finite() {
            return Side::None;
        }
        const CANDIDATES: [(Vec2, Side); 4] = [
            (Vec2::NEG_X, Side::Left),
            (Vec2::X, Side::Right),
            (Vec2::NEG_Y, Side::Top),
            (Vec2::Y, Side::Bottom),
        ];
        let mut best = Side::None;
        let mut best_dot = f32::NEG_INFINITY;
        for (dir, side) in CANDIDATES {
            let d = dir.dot(direction);
            if d > best_dot {
                best_dot = d;
                best = side;
            }
        }
        best
    }

    pub fn opposite(self) -> Side {
        match self {
            Side::None => Side::None,
            Side::Top => Side::Bottom,
            Side::Bottom => Side::Top,
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }

    /// Left/right contacts are horizontal; everything else counts as vertical
    pub fn is_horizontal(self) -> bool {
        matches!(self, Side::Left | Side::Right)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_direction() {
        assert_eq!(Side::from_direction(Vec2::new(0.0, 3.0)), Side::Bottom);
        assert_eq!(Side::from_direction(Vec2::new(0.0, -0.5)), Side::Top);
        assert_eq!(Side::from_direction(Vec2::new(-2.0, 1.0)), Side::Left);
        assert_eq!(Side::from_direction(Vec2::new(2.0, 1.0)), Side::Right);
        assert_eq!(Side::from_direction(Vec2::ZERO), Side::None);
        // Exact diagonal: left/right win
        assert_eq!(Side::from_direction(Vec2::new(1.0, 1.0)), Side::Right);
    }

    #[test]
    fn test_opposite() {
        assert_eq!(Side::Bottom.opposite(), Side::Top);
        assert_eq!(Side::Left.opposite(), Side::Right);
        assert!(Side::Right.is_horizontal());
        assert!(!Side::Top.is_horizontal());
    }
}
