use nalgebra::Point3;
use serde::{Deserialize, Serialize};

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    #[error("pattern must have at least 2x2 inner corners, got {width}x{height}")]
    PatternTooSmall { width: u32, height: u32 },
    #[error("square size must be finite and positive, got {0}")]
    InvalidSquareSize(f64),
}

/// Inner-corner layout and physical square size of a chessboard target.
///
/// Construct through [`PatternGeometry::new`]; deserialized values should be
/// checked with [`PatternGeometry::validate`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PatternGeometry {
    pattern_width: u32,
    pattern_height: u32,
    square_size_mm: f64,
}

impl PatternGeometry {
    pub fn new(
        pattern_width: u32,
        pattern_height: u32,
        square_size_mm: f64,
    ) -> Result<Self, GeometryError> {
        let geometry = Self {
            pattern_width,
            pattern_height,
            square_size_mm,
        };
        geometry.validate()?;
        Ok(geometry)
    }

    pub fn validate(&self) -> Result<(), GeometryError> {
        if self.pattern_width < 2 || self.pattern_height < 2 {
            return Err(GeometryError::PatternTooSmall {
                width: self.pattern_width,
                height: self.pattern_height,
            });
        }
        if !self.square_size_mm.is_finite() || self.square_size_mm <= 0.0 {
            return Err(GeometryError::InvalidSquareSize(self.square_size_mm));
        }
        Ok(())
    }

    /// Inner corners per row.
    #[inline]
    pub fn pattern_width(&self) -> u32 {
        self.pattern_width
    }

    /// Inner corners per column.
    #[inline]
    pub fn pattern_height(&self) -> u32 {
        self.pattern_height
    }

    #[inline]
    pub fn square_size_mm(&self) -> f64 {
        self.square_size_mm
    }

    #[inline]
    pub fn corner_count(&self) -> usize {
        self.pattern_width as usize * self.pattern_height as usize
    }

    /// Board-frame corner positions in millimetres, row-major:
    /// `(col * s, row * s, 0)` with `row` outer and `col` inner.
    pub fn object_points(&self) -> Vec<Point3<f64>> {
        let s = self.square_size_mm;
        (0..self.pattern_height)
            .flat_map(|row| {
                (0..self.pattern_width)
                    .map(move |col| Point3::new(col as f64 * s, row as f64 * s, 0.0))
            })
            .collect()
    }
}
