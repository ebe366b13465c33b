//! Iso-line extraction over regular scalar grids (marching squares).

#[cfg(feature = "parallel-contours")]
use rayon::prelude::*;

use crate::error::{ChartError, ChartResult};

/// Segment endpoints per cell configuration, as pairs of edge ids.
///
/// Corner bits: bottom-left = 1, bottom-right = 2, top-right = 4, top-left = 8.
/// Edges: 0 bottom, 1 right, 2 top, 3 left. Saddles (5, 10) emit two segments.
const EDGE_TABLE: [&[u8]; 16] = [
    &[],
    &[3, 0],
    &[0, 1],
    &[3, 1],
    &[1, 2],
    &[3, 0, 1, 2],
    &[0, 2],
    &[3, 2],
    &[2, 3],
    &[2, 0],
    &[0, 1, 2, 3],
    &[2, 1],
    &[1, 3],
    &[1, 0],
    &[0, 3],
    &[],
];

/// Floats per emitted segment: `x0, y0, x1, y1`.
pub const FLOATS_PER_SEGMENT: usize = 4;

/// Row-major grid of samples with explicit column/row coordinates.
///
/// Row 0 is the bottom row. Non-finite samples mark missing data.
#[derive(Debug, Clone, Copy)]
pub struct ScalarGrid<'a> {
    values: &'a [f32],
    rows: usize,
    cols: usize,
    x_coords: &'a [f64],
    y_coords: &'a [f64],
}

impl<'a> ScalarGrid<'a> {
    pub fn new(
        values: &'a [f32],
        rows: usize,
        cols: usize,
        x_coords: &'a [f64],
        y_coords: &'a [f64],
    ) -> ChartResult<Self> {
        if rows < 2 || cols < 2 {
            return Err(ChartError::InvalidData(format!(
                "contour grid needs at least 2x2 samples, got {rows}x{cols}"
            )));
        }
        let expected = rows.checked_mul(cols).ok_or_else(|| {
            ChartError::InvalidData("contour grid dimensions overflow".to_owned())
        })?;
        if values.len() != expected {
            return Err(ChartError::InvalidData(format!(
                "contour grid has {} values, expected {expected}",
                values.len()
            )));
        }
        if x_coords.len() != cols || y_coords.len() != rows {
            return Err(ChartError::InvalidData(format!(
                "contour coordinates must match grid: {} x coords for {cols} cols, {} y coords for {rows} rows",
                x_coords.len(),
                y_coords.len()
            )));
        }

        Ok(Self {
            values,
            rows,
            cols,
            x_coords,
            y_coords,
        })
    }

    #[must_use]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[must_use]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[must_use]
    pub fn values(&self) -> &'a [f32] {
        self.values
    }

    #[must_use]
    pub fn x_coords(&self) -> &'a [f64] {
        self.x_coords
    }

    #[must_use]
    pub fn y_coords(&self) -> &'a [f64] {
        self.y_coords
    }

    /// Upper bound of segments one threshold level can produce.
    #[must_use]
    pub fn max_segments_per_level(&self) -> usize {
        (self.rows - 1) * (self.cols - 1) * 2
    }

    #[inline]
    fn at(&self, row: usize, col: usize) -> f32 {
        self.values[row * self.cols + col]
    }
}

/// Appends the iso-line segments at `threshold` to `out` and returns the
/// number of floats written. Cells touching a non-finite sample are skipped.
pub fn extract_contour(grid: &ScalarGrid<'_>, threshold: f32, out: &mut Vec<f32>) -> usize {
    let start = out.len();
    out.reserve(grid.max_segments_per_level().min(1024) * FLOATS_PER_SEGMENT);

    for row in 0..grid.rows - 1 {
        for col in 0..grid.cols - 1 {
            let cell = Cell {
                v00: grid.at(row, col),
                v10: grid.at(row, col + 1),
                v01: grid.at(row + 1, col),
                v11: grid.at(row + 1, col + 1),
                x0: grid.x_coords[col] as f32,
                x1: grid.x_coords[col + 1] as f32,
                y0: grid.y_coords[row] as f32,
                y1: grid.y_coords[row + 1] as f32,
            };
            if !cell.is_finite() {
                continue;
            }

            let edges = EDGE_TABLE[cell.configuration(threshold)];
            for pair in edges.chunks_exact(2) {
                let (ax, ay) = cell.edge_point(pair[0], threshold);
                let (bx, by) = cell.edge_point(pair[1], threshold);
                out.extend_from_slice(&[ax, ay, bx, by]);
            }
        }
    }

    out.len() - start
}

/// Runs [`extract_contour`] for each level in order, appending into one
/// buffer. `level_floats[i]` receives the floats written for `thresholds[i]`.
pub fn extract_contours(
    grid: &ScalarGrid<'_>,
    thresholds: &[f32],
    out: &mut Vec<f32>,
    level_floats: &mut Vec<usize>,
) -> usize {
    level_floats.clear();
    let start = out.len();
    for &threshold in thresholds {
        level_floats.push(extract_contour(grid, threshold, out));
    }
    out.len() - start
}

/// Extracts each level on the rayon pool; levels are independent.
#[cfg(feature = "parallel-contours")]
#[must_use]
pub fn extract_contours_parallel(grid: &ScalarGrid<'_>, thresholds: &[f32]) -> Vec<Vec<f32>> {
    thresholds
        .par_iter()
        .map(|&threshold| {
            let mut segments = Vec::new();
            extract_contour(grid, threshold, &mut segments);
            segments
        })
        .collect()
}

/// Float capacity that holds every segment of `levels` levels.
#[must_use]
pub fn estimate_output_floats(rows: usize, cols: usize, levels: usize) -> usize {
    rows.saturating_sub(1) * cols.saturating_sub(1) * 2 * FLOATS_PER_SEGMENT * levels
}

struct Cell {
    v00: f32,
    v10: f32,
    v01: f32,
    v11: f32,
    x0: f32,
    x1: f32,
    y0: f32,
    y1: f32,
}

impl Cell {
    fn is_finite(&self) -> bool {
        self.v00.is_finite() && self.v10.is_finite() && self.v01.is_finite() && self.v11.is_finite()
    }

    fn configuration(&self, threshold: f32) -> usize {
        let mut config = 0;
        if self.v00 >= threshold {
            config |= 1;
        }
        if self.v10 >= threshold {
            config |= 2;
        }
        if self.v11 >= threshold {
            config |= 4;
        }
        if self.v01 >= threshold {
            config |= 8;
        }
        config
    }

    fn edge_point(&self, edge: u8, threshold: f32) -> (f32, f32) {
        match edge {
            0 => (
                lerp(self.x0, self.x1, crossing(self.v00, self.v10, threshold)),
                self.y0,
            ),
            1 => (
                self.x1,
                lerp(self.y0, self.y1, crossing(self.v10, self.v11, threshold)),
            ),
            2 => (
                lerp(self.x0, self.x1, crossing(self.v01, self.v11, threshold)),
                self.y1,
            ),
            _ => (
                self.x0,
                lerp(self.y0, self.y1, crossing(self.v00, self.v01, threshold)),
            ),
        }
    }
}

/// Fraction along `a -> b` where the threshold is crossed; flat edges cross
/// at their midpoint.
#[inline]
fn crossing(a: f32, b: f32, threshold: f32) -> f32 {
    let diff = b - a;
    if f64::from(diff.abs()) < 1e-10 {
        0.5
    } else {
        (threshold - a) / diff
    }
}

#[inline]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}
