//! Checkerboard inner-corner detector.
//!
//! Pipeline:
//! 1. ChESS response over the grayscale image, thresholded relative to its
//!    maximum, with non-maximum suppression.
//! 2. Orientation of every candidate from the second harmonic of its ring.
//! 3. Global grid axes from the orientations and a base spacing from
//!    nearest-neighbor distances.
//! 4. A 4-connected neighbor graph (k-d tree queries filtered by spacing and
//!    orientation consistency), kept only where edges are mutual.
//! 5. BFS over each connected component, assigning integer grid coordinates.
//! 6. A component with exactly `pattern_width × pattern_height` corners is
//!    relabeled into row-major board order.
//! 7. Iterative sub-pixel refinement of every corner.

mod detector;
mod geom;
mod gridgraph;
mod overlay;
mod params;
mod response;
mod subpix;

pub use detector::{ChessboardDetection, ChessboardDetector, DetectionOutcome};
pub use gridgraph::{grid_axis_angle, nearest_spacing, Edge, GridAxes, GridGraph, Step};
pub use overlay::{draw_candidates, draw_detection};
pub use params::{ChessboardParams, GridGraphParams, ResponseParams, SubPixParams};
pub use response::{chess_response, detect_candidates, ring_orientation, ResponseMap};
pub use subpix::{refine_corner, refine_corners};
