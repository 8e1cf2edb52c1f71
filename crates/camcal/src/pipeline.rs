use crate::calib::{
    solve, CalibrationResult, Observation, ObservationSet, PatternGeometry, SolveError,
    SolveOptions,
};
use crate::chessboard::{ChessboardDetector, ChessboardParams};
use camcal_core::Frame;
use log::{debug, warn};
use nalgebra::Point2;

/// Collects board observations from frames and calibrates from them.
#[derive(Debug)]
pub struct CalibrationPipeline {
    geometry: PatternGeometry,
    detector: ChessboardDetector,
    options: SolveOptions,
    observations: ObservationSet,
}

impl CalibrationPipeline {
    pub fn new(geometry: PatternGeometry) -> Self {
        Self::with_params(geometry, ChessboardParams::default(), SolveOptions::default())
    }

    pub fn with_params(
        geometry: PatternGeometry,
        params: ChessboardParams,
        options: SolveOptions,
    ) -> Self {
        Self {
            geometry,
            detector: ChessboardDetector::new(params),
            options,
            observations: ObservationSet::new(),
        }
    }

    pub fn geometry(&self) -> &PatternGeometry {
        &self.geometry
    }

    pub fn options(&self) -> &SolveOptions {
        &self.options
    }

    pub fn observations(&self) -> &ObservationSet {
        &self.observations
    }

    /// Number of accepted views.
    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Detect the board in `frame` and keep the refined corners as a new view.
    ///
    /// The detection overlay is drawn onto the frame either way. Frames whose
    /// size differs from earlier views are rejected.
    pub fn add_observation(&mut self, frame: &mut Frame) -> bool {
        let Some(detection) = self.detector.detect_frame(
            frame,
            self.geometry.pattern_width(),
            self.geometry.pattern_height(),
        ) else {
            return false;
        };

        let (width, height) = frame.dimensions();
        let observation = match Observation::from_detection(&self.geometry, &detection.points()) {
            Ok(observation) => observation,
            Err(err) => {
                warn!("discarding detection: {err}");
                return false;
            }
        };
        match self.observations.push(observation, width, height) {
            Ok(()) => {
                debug!(
                    "view {} accepted (frame #{})",
                    self.observations.len(),
                    frame.sequence()
                );
                true
            }
            Err(err) => {
                warn!("rejecting frame #{}: {err}", frame.sequence());
                false
            }
        }
    }

    /// Calibrate from every view collected so far.
    ///
    /// The collected views are consumed; the pipeline starts over empty.
    pub fn solve(&mut self) -> Result<CalibrationResult, SolveError> {
        let set = std::mem::take(&mut self.observations);
        let (width, height) = set.image_size().ok_or(SolveError::NoObservations)?;
        solve(set, &self.geometry, width, height, &self.options)
    }
}

/// Detect a `pattern_width x pattern_height` board with default parameters.
///
/// Returns the refined corners in row-major order and draws the overlay
/// onto `frame`.
pub fn detect_pattern(
    frame: &mut Frame,
    pattern_width: u32,
    pattern_height: u32,
) -> Option<Vec<Point2<f32>>> {
    ChessboardDetector::default()
        .detect_frame(frame, pattern_width, pattern_height)
        .map(|detection| detection.points())
}
