use serde::{Deserialize, Serialize};

/// ChESS response and candidate extraction.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ResponseParams {
    /// Keep candidates whose response exceeds this fraction of the image maximum.
    pub threshold_rel: f32,
    /// Absolute floor on the response; a blank image never yields candidates.
    pub threshold_abs: f32,
    /// Non-maximum suppression radius in pixels.
    pub nms_radius: u32,
}

impl Default for ResponseParams {
    fn default() -> Self {
        Self {
            threshold_rel: 0.2,
            threshold_abs: 64.0,
            nms_radius: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct GridGraphParams {
    /// Neighbors queried per corner in the k-d tree.
    pub k_neighbors: usize,
    /// Tolerance for orthogonality and edge-vs-diagonal checks.
    pub orientation_tolerance_deg: f32,
    /// Accepted edge length window, relative to the median nearest-neighbor distance.
    pub min_spacing_ratio: f32,
    pub max_spacing_ratio: f32,
}

impl Default for GridGraphParams {
    fn default() -> Self {
        Self {
            k_neighbors: 8,
            orientation_tolerance_deg: 22.5,
            min_spacing_ratio: 0.5,
            max_spacing_ratio: 1.8,
        }
    }
}

/// Iterative gradient-orthogonality refinement.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SubPixParams {
    /// Half size of the search window; the window is `(2 * half_window + 1)^2`.
    pub half_window: u32,
    pub max_iterations: u32,
    /// Stop once an update moves the corner less than this (pixels).
    pub epsilon: f32,
}

impl Default for SubPixParams {
    fn default() -> Self {
        Self {
            half_window: 5,
            max_iterations: 30,
            epsilon: 0.001,
        }
    }
}

/// Parameters of the chessboard detector.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ChessboardParams {
    pub response: ResponseParams,
    pub graph: GridGraphParams,
    pub subpix: SubPixParams,
}
