use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// Saddle-point candidate reported by the corner response.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Corner {
    pub position: Point2<f32>,
    /// Angle of the bright-square diagonal, radians modulo π. Grid axes sit at ±45° to it.
    pub orientation: f32,
    pub strength: f32,
}

/// Board label `(i, j)`: `i` counts corners along a pattern row, `j` counts rows.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct GridCoords {
    pub i: i32,
    pub j: i32,
}

/// Candidate that was assigned a place on the board.
#[derive(Clone, Debug)]
pub struct LabeledCorner {
    pub position: Point2<f32>,
    pub grid: GridCoords,
    pub strength: f32,
}
