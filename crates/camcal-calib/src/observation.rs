use crate::PatternGeometry;
use nalgebra::{Point2, Point3};
use serde::{Deserialize, Serialize};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ObservationError {
    #[error("point count mismatch: {object} object points vs {image} image points")]
    LengthMismatch { object: usize, image: usize },
    #[error("image size {got:?} differs from the recorded size {expected:?}")]
    ImageSizeMismatch {
        expected: (u32, u32),
        got: (u32, u32),
    },
}

/// One view of the target: board points paired with their detections.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    object_points: Vec<Point3<f64>>,
    image_points: Vec<Point2<f64>>,
}

impl Observation {
    pub fn new(
        object_points: Vec<Point3<f64>>,
        image_points: Vec<Point2<f64>>,
    ) -> Result<Self, ObservationError> {
        if object_points.len() != image_points.len() {
            return Err(ObservationError::LengthMismatch {
                object: object_points.len(),
                image: image_points.len(),
            });
        }
        Ok(Self {
            object_points,
            image_points,
        })
    }

    /// Pair row-major detections with the geometry's object points.
    pub fn from_detection(
        geometry: &PatternGeometry,
        corners: &[Point2<f32>],
    ) -> Result<Self, ObservationError> {
        let image_points = corners
            .iter()
            .map(|p| Point2::new(p.x as f64, p.y as f64))
            .collect();
        Self::new(geometry.object_points(), image_points)
    }

    pub fn object_points(&self) -> &[Point3<f64>] {
        &self.object_points
    }

    pub fn image_points(&self) -> &[Point2<f64>] {
        &self.image_points
    }

    pub fn len(&self) -> usize {
        self.image_points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.image_points.is_empty()
    }
}

/// Observations collected from frames of a single size, in insertion order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ObservationSet {
    observations: Vec<Observation>,
    image_size: Option<(u32, u32)>,
}

impl ObservationSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a view taken from a `width x height` frame.
    ///
    /// The first push records the image size; later pushes must match it.
    pub fn push(
        &mut self,
        observation: Observation,
        width: u32,
        height: u32,
    ) -> Result<(), ObservationError> {
        self.check_size(width, height)?;
        self.image_size = Some((width, height));
        self.observations.push(observation);
        Ok(())
    }

    pub fn check_size(&self, width: u32, height: u32) -> Result<(), ObservationError> {
        match self.image_size {
            Some(expected) if expected != (width, height) => {
                Err(ObservationError::ImageSizeMismatch {
                    expected,
                    got: (width, height),
                })
            }
            _ => Ok(()),
        }
    }

    pub fn image_size(&self) -> Option<(u32, u32)> {
        self.image_size
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn into_observations(self) -> Vec<Observation> {
        self.observations
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Observation> {
        self.observations.iter()
    }
}

impl<'a> IntoIterator for &'a ObservationSet {
    type Item = &'a Observation;
    type IntoIter = std::slice::Iter<'a, Observation>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
