//! Static track geometry: bounds, road and wall regions, ordered
//! checkpoints and the spawn point. All queries are pure.

use serde::{Deserialize, Serialize};

use crate::physics::Vector2;

/// What lies under a point of the track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Surface {
    Road,
    Grass,
    Wall,
    Checkpoint,
}

/// Axis-aligned rectangle anchored at its top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Rect {
            x,
            y,
            width,
            height,
        }
    }

    /// Half-open containment: the right and bottom edges are outside.
    pub fn contains(&self, point: Vector2) -> bool {
        point.x >= self.x
            && point.x < self.x + self.width
            && point.y >= self.y
            && point.y < self.y + self.height
    }

    pub fn center(&self) -> Vector2 {
        Vector2::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackGeometry {
    pub width: f32,
    pub height: f32,
    pub spawn: Vector2,
    /// Index 0 is the start/finish line.
    pub checkpoints: Vec<Rect>,
    pub road: Vec<Rect>,
    pub walls: Vec<Rect>,
}

impl TrackGeometry {
    /// Rectangular ring circuit driven counter-clockwise on screen (y grows
    /// downward), starting east along the bottom straight.
    pub fn default_circuit() -> Self {
        TrackGeometry {
            width: 1200.0,
            height: 800.0,
            spawn: Vector2::new(450.0, 625.0),
            checkpoints: vec![
                Rect::new(550.0, 550.0, 40.0, 150.0),
                Rect::new(950.0, 380.0, 150.0, 40.0),
                Rect::new(550.0, 100.0, 40.0, 150.0),
                Rect::new(100.0, 380.0, 150.0, 40.0),
            ],
            road: vec![
                Rect::new(100.0, 550.0, 1000.0, 150.0),
                Rect::new(950.0, 100.0, 150.0, 600.0),
                Rect::new(100.0, 100.0, 1000.0, 150.0),
                Rect::new(100.0, 100.0, 150.0, 600.0),
            ],
            walls: vec![Rect::new(400.0, 350.0, 400.0, 100.0)],
        }
    }

    fn in_bounds(&self, point: Vector2) -> bool {
        Rect::new(0.0, 0.0, self.width, self.height).contains(point)
    }

    /// Classifies a point. Out-of-bounds points are walls; checkpoints take
    /// precedence over road.
    pub fn classify(&self, point: Vector2) -> Surface {
        if !self.in_bounds(point) || self.walls.iter().any(|w| w.contains(point)) {
            Surface::Wall
        } else if self.checkpoint_index_at(point).is_some() {
            Surface::Checkpoint
        } else if self.road.iter().any(|r| r.contains(point)) {
            Surface::Road
        } else {
            Surface::Grass
        }
    }

    /// Index of the first checkpoint containing `point`.
    pub fn checkpoint_index_at(&self, point: Vector2) -> Option<usize> {
        self.checkpoints.iter().position(|c| c.contains(point))
    }
}

impl Default for TrackGeometry {
    fn default() -> Self {
        Self::default_circuit()
    }
}
