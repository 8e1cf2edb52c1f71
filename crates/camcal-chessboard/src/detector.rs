use crate::gridgraph::{grid_axis_angle, nearest_spacing, GridAxes, GridGraph};
use crate::overlay::{draw_candidates, draw_detection};
use crate::params::ChessboardParams;
use crate::response::detect_candidates;
use crate::subpix::refine_corner;
use camcal_core::{
    Corner, Frame, GrayImageView, GridBounds, GridCoords, LabeledCorner, GRID_ROTATIONS,
};
use log::debug;
use nalgebra::{Point2, Vector2};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// A complete board: exactly `pattern_width * pattern_height` inner corners.
#[derive(Clone, Debug)]
pub struct ChessboardDetection {
    /// Inner corners per row.
    pub pattern_width: u32,
    /// Inner corners per column.
    pub pattern_height: u32,
    /// Row-major: corner `(i, j)` is at index `j * pattern_width + i`.
    pub corners: Vec<LabeledCorner>,
    /// Median distance between adjacent corners, in pixels.
    pub spacing: f32,
}

impl ChessboardDetection {
    pub fn points(&self) -> Vec<Point2<f32>> {
        self.corners.iter().map(|c| c.position).collect()
    }

    pub fn len(&self) -> usize {
        self.corners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.corners.is_empty()
    }
}

/// Everything one detection pass produced.
#[derive(Clone, Debug, Default)]
pub struct DetectionOutcome {
    /// Raw X-junction candidates.
    pub candidates: Vec<Corner>,
    pub detection: Option<ChessboardDetection>,
}

impl DetectionOutcome {
    pub fn is_found(&self) -> bool {
        self.detection.is_some()
    }
}

/// Checkerboard detector: ChESS candidates, grid graph, canonical labeling
/// and sub-pixel refinement.
///
/// Only complete boards are reported. Labels are assigned with proper
/// rotations only, so the board's handedness is preserved, and the row
/// direction is the one pointing most towards image `+x`.
#[derive(Clone, Debug, Default)]
pub struct ChessboardDetector {
    pub params: ChessboardParams,
}

impl ChessboardDetector {
    pub fn new(params: ChessboardParams) -> Self {
        Self { params }
    }

    pub fn find_candidates(&self, img: &GrayImageView<'_>) -> Vec<Corner> {
        detect_candidates(img, &self.params.response)
    }

    /// Detect a `pattern_width × pattern_height` board in a grayscale image.
    #[cfg_attr(
        feature = "tracing",
        instrument(
            level = "debug",
            skip(self, img),
            fields(width = img.width, height = img.height)
        )
    )]
    pub fn detect(
        &self,
        img: &GrayImageView<'_>,
        pattern_width: u32,
        pattern_height: u32,
    ) -> DetectionOutcome {
        let candidates = self.find_candidates(img);
        debug!("{} X-junction candidates", candidates.len());

        let detection = self
            .assemble(&candidates, pattern_width, pattern_height)
            .map(|mut detection| {
                self.refine(img, &mut detection);
                detection
            });

        DetectionOutcome {
            candidates,
            detection,
        }
    }

    /// Detect a board in `frame` and draw the overlay onto it.
    ///
    /// A found board is drawn as connected, row-colored corners; otherwise
    /// the raw candidates are marked.
    pub fn detect_frame(
        &self,
        frame: &mut Frame,
        pattern_width: u32,
        pattern_height: u32,
    ) -> Option<ChessboardDetection> {
        let gray = frame.to_gray();
        let outcome = self.detect(&gray.view(), pattern_width, pattern_height);
        match &outcome.detection {
            Some(detection) => draw_detection(frame.as_image_mut(), detection),
            None => draw_candidates(frame.as_image_mut(), &outcome.candidates),
        }
        outcome.detection
    }

    /// Assemble a complete, canonically ordered board from candidates
    /// (pixel-level positions, no refinement).
    pub fn assemble(
        &self,
        candidates: &[Corner],
        pattern_width: u32,
        pattern_height: u32,
    ) -> Option<ChessboardDetection> {
        if pattern_width < 2 || pattern_height < 2 {
            debug!("pattern {pattern_width}x{pattern_height} is too small");
            return None;
        }
        let expected = (pattern_width * pattern_height) as usize;
        if candidates.len() < expected {
            debug!(
                "{} candidates, need at least {expected}",
                candidates.len()
            );
            return None;
        }

        let theta_u = grid_axis_angle(candidates)?;
        let spacing = nearest_spacing(candidates)?;
        let graph = GridGraph::build(
            candidates,
            &self.params.graph,
            GridAxes::from_angle(theta_u),
            spacing,
        );
        debug!(
            "grid axis {:.1} deg, spacing {spacing:.1} px, {} edges",
            theta_u.to_degrees(),
            graph.edge_count()
        );

        let mut best: Option<(f32, Vec<LabeledCorner>)> = None;
        for component in graph.components() {
            if component.len() < expected {
                continue;
            }
            let Some(coords) = graph.label_component(&component) else {
                debug!("inconsistent grid labels in a {}-corner component", component.len());
                continue;
            };
            let Some(coords) = best_window(&coords, candidates, pattern_width, pattern_height)
            else {
                continue;
            };
            let Some(corners) = canonical_order(&coords, candidates, pattern_width, pattern_height)
            else {
                continue;
            };
            let strength: f32 = corners.iter().map(|c| c.strength).sum();
            if best.as_ref().map_or(true, |(s, _)| strength > *s) {
                best = Some((strength, corners));
            }
        }

        let (_, corners) = best?;
        Some(ChessboardDetection {
            pattern_width,
            pattern_height,
            corners,
            spacing,
        })
    }

    fn refine(&self, img: &GrayImageView<'_>, detection: &mut ChessboardDetection) {
        let params = &self.params.subpix;
        // Keep the window clear of the neighboring corners.
        let half_window = params
            .half_window
            .min(((detection.spacing * 0.45) as u32).max(2));
        for corner in detection.corners.iter_mut() {
            corner.position = refine_corner(img, corner.position, half_window, params);
        }
    }
}

/// Fully populated `w x h` (or `h x w`) sub-grid with the highest summed
/// strength. Stray corners along the board border can join a component.
fn best_window(
    coords: &[(usize, i32, i32)],
    corners: &[Corner],
    w: u32,
    h: u32,
) -> Option<Vec<(usize, i32, i32)>> {
    if coords.len() == (w * h) as usize {
        return Some(coords.to_vec());
    }
    let bounds = GridBounds::from_coords(coords.iter().map(|&(_, i, j)| [i, j]))?;
    let (bw, bh) = (bounds.width() as usize, bounds.height() as usize);
    let mut table = vec![None; bw * bh];
    for &(n, i, j) in coords {
        table[bounds.index(i, j)] = Some(n);
    }

    let shapes = if w == h {
        vec![(w as usize, h as usize)]
    } else {
        vec![(w as usize, h as usize), (h as usize, w as usize)]
    };
    let mut best: Option<(f32, usize, usize, usize, usize)> = None;
    for (ww, wh) in shapes {
        if ww > bw || wh > bh {
            continue;
        }
        for oj in 0..=bh - wh {
            for oi in 0..=bw - ww {
                let strength = (oj..oj + wh)
                    .flat_map(|r| (oi..oi + ww).map(move |c| r * bw + c))
                    .try_fold(0.0f32, |acc, k| table[k].map(|n| acc + corners[n].strength));
                if let Some(strength) = strength {
                    if best.map_or(true, |(s, ..)| strength > s) {
                        best = Some((strength, oi, oj, ww, wh));
                    }
                }
            }
        }
    }

    let (_, oi, oj, ww, wh) = best?;
    if coords.len() > ww * wh {
        debug!("trimmed {} stray corners", coords.len() - ww * wh);
    }
    Some(
        (oj..oj + wh)
            .flat_map(|r| (oi..oi + ww).map(move |c| (r, c)))
            .filter_map(|(r, c)| {
                table[r * bw + c].map(|n| (n, bounds.min_i + c as i32, bounds.min_j + r as i32))
            })
            .collect(),
    )
}

/// Relabel BFS coordinates into the board frame: `i` in `0..w`, `j` in `0..h`.
fn canonical_order(
    coords: &[(usize, i32, i32)],
    corners: &[Corner],
    w: u32,
    h: u32,
) -> Option<Vec<LabeledCorner>> {
    let (wu, hu) = (w as usize, h as usize);
    let mut best: Option<(f32, Vec<usize>)> = None;

    for rot in GRID_ROTATIONS {
        let mapped: Vec<(usize, [i32; 2])> = coords
            .iter()
            .map(|&(n, i, j)| (n, rot.apply(i, j)))
            .collect();
        let Some(bounds) = GridBounds::from_coords(mapped.iter().map(|(_, c)| *c)) else {
            continue;
        };
        if bounds.width() != w || bounds.height() != h {
            continue;
        }

        let mut table = vec![usize::MAX; wu * hu];
        for &(n, [i, j]) in &mapped {
            table[bounds.index(i, j)] = n;
        }
        if table.contains(&usize::MAX) {
            continue;
        }

        let mut row_dir = Vector2::<f32>::zeros();
        for row in 0..hu {
            let first = corners[table[row * wu]].position;
            let last = corners[table[row * wu + wu - 1]].position;
            row_dir += last - first;
        }
        let norm = row_dir.norm();
        if norm <= 0.0 {
            continue;
        }
        let score = row_dir.x / norm;
        if best.as_ref().map_or(true, |(s, _)| score > *s) {
            best = Some((score, table));
        }
    }

    let (_, table) = best?;
    Some(
        table
            .iter()
            .enumerate()
            .map(|(k, &n)| LabeledCorner {
                position: corners[n].position,
                grid: GridCoords {
                    i: (k % wu) as i32,
                    j: (k / wu) as i32,
                },
                strength: corners[n].strength,
            })
            .collect(),
    )
}
