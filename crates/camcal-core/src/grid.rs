//! Integer board-grid helpers used when labelling detected corners.

/// Linear map on integer grid labels, stored row-major as `[[a, b], [c, d]]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GridTransform([[i32; 2]; 2]);

impl GridTransform {
    pub const IDENTITY: GridTransform = GridTransform([[1, 0], [0, 1]]);

    pub const fn new(m: [[i32; 2]; 2]) -> Self {
        Self(m)
    }

    #[inline]
    pub fn apply(&self, i: i32, j: i32) -> [i32; 2] {
        let [[a, b], [c, d]] = self.0;
        [a * i + b * j, c * i + d * j]
    }

    /// `self` applied after `first`.
    pub fn then(&self, first: &GridTransform) -> GridTransform {
        let [r0, r1] = self.0;
        let [[a, b], [c, d]] = first.0;
        GridTransform([
            [r0[0] * a + r0[1] * c, r0[0] * b + r0[1] * d],
            [r1[0] * a + r1[1] * c, r1[0] * b + r1[1] * d],
        ])
    }
}

/// Label rotations by 0, 90, 180 and 270 degrees.
pub const GRID_ROTATIONS: [GridTransform; 4] = [
    GridTransform::IDENTITY,
    GridTransform::new([[0, -1], [1, 0]]),
    GridTransform::new([[-1, 0], [0, -1]]),
    GridTransform::new([[0, 1], [-1, 0]]),
];

/// Inclusive bounding box of a set of grid labels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GridBounds {
    pub min_i: i32,
    pub min_j: i32,
    pub max_i: i32,
    pub max_j: i32,
}

impl GridBounds {
    /// `None` for an empty set.
    pub fn from_coords<I>(coords: I) -> Option<Self>
    where
        I: IntoIterator<Item = [i32; 2]>,
    {
        coords.into_iter().fold(None, |acc: Option<Self>, [i, j]| {
            Some(match acc {
                None => Self {
                    min_i: i,
                    min_j: j,
                    max_i: i,
                    max_j: j,
                },
                Some(b) => Self {
                    min_i: b.min_i.min(i),
                    min_j: b.min_j.min(j),
                    max_i: b.max_i.max(i),
                    max_j: b.max_j.max(j),
                },
            })
        })
    }

    pub fn width(&self) -> u32 {
        self.max_i.abs_diff(self.min_i) + 1
    }

    pub fn height(&self) -> u32 {
        self.max_j.abs_diff(self.min_j) + 1
    }

    /// Row-major cell index of `(i, j)` inside the box.
    #[inline]
    pub fn index(&self, i: i32, j: i32) -> usize {
        (j - self.min_j) as usize * self.width() as usize + (i - self.min_i) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn four_quarter_turns_are_the_identity() {
        let r = GRID_ROTATIONS[1];
        assert_eq!(r.apply(1, 0), [0, 1]);
        assert_eq!(r.apply(0, 1), [-1, 0]);
        assert_eq!(r.then(&r), GRID_ROTATIONS[2]);
        assert_eq!(r.then(&GRID_ROTATIONS[3]), GridTransform::IDENTITY);
    }

    #[test]
    fn bounds_span_every_label() {
        let b = GridBounds::from_coords([[0, 0], [-2, 3], [4, 1]]).unwrap();
        assert_eq!((b.width(), b.height()), (7, 4));
        assert_eq!(b.index(-2, 0), 0);
        assert_eq!(b.index(4, 3), 27);
        assert!(GridBounds::from_coords(std::iter::empty()).is_none());
    }
}
