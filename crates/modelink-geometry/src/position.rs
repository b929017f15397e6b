use serde::{Deserialize, Serialize};

/// A position on the canvas (can be negative for infinite canvas feel)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Create a translated copy of this position, clamped to the canvas range
    pub fn translated(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x.saturating_add(dx),
            y: self.y.saturating_add(dy),
        }
    }

    /// Euclidean distance to another position
    pub fn distance(self, other: Position) -> f64 {
        let dx = f64::from(self.x) - f64::from(other.x);
        let dy = f64::from(self.y) - f64::from(other.y);
        (dx * dx + dy * dy).sqrt()
    }

    /// Project this point onto the segment `start..end`, returning the
    /// closest point on the segment and its distance from `self`.
    pub fn project_onto(self, start: Position, end: Position) -> (Position, f64) {
        let (sx, sy) = (f64::from(start.x), f64::from(start.y));
        let (ex, ey) = (f64::from(end.x), f64::from(end.y));
        let (px, py) = (f64::from(self.x), f64::from(self.y));

        let len_sq = (ex - sx).powi(2) + (ey - sy).powi(2);
        if len_sq == 0.0 {
            return (start, self.distance(start));
        }

        let t = (((px - sx) * (ex - sx) + (py - sy) * (ey - sy)) / len_sq).clamp(0.0, 1.0);
        let projected = Position::new(
            (sx + t * (ex - sx)).round() as i32,
            (sy + t * (ey - sy)).round() as i32,
        );
        (projected, self.distance(projected))
    }
}
