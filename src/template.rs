//! The grid of complex sample points a session iterates over.

use ndarray::{Array2, ArrayView2};
use tracing::debug;

use crate::complex::C;
use crate::coord::CoordinateRange;
use crate::error::{Error, Result};

/// Immutable `rows x cols` grid of sample points, addressed `[[row, col]]`.
///
/// Row 0 lies on `y_min` and rows grow towards `y_max`; column 0 lies on
/// `x_min` and columns grow towards `x_max`. Both ends of an axis are sampled
/// exactly whenever that axis has at least two samples. No aspect-ratio
/// correction happens here.
#[derive(Clone, Debug, PartialEq)]
pub struct Template {
    range: CoordinateRange,
    points: Array2<C<f64>>,
}

impl Template {
    pub fn build(range: CoordinateRange, cols: usize, rows: usize) -> Result<Self> {
        if cols == 0 || rows == 0 {
            return Err(Error::InvalidResolution { cols, rows });
        }
        let xs = range.x().linspace(cols);
        let ys = range.y().linspace(rows);
        let points = Array2::from_shape_fn((rows, cols), |(row, col)| C::new(xs[col], ys[row]));
        debug!(cols, rows, ?range, "built template");
        Ok(Self { range, points })
    }

    /// Template holding a band of another template's rows.
    pub(crate) fn from_band(range: CoordinateRange, points: Array2<C<f64>>) -> Self {
        Self { range, points }
    }

    /// Range the points were sampled from. A row band produced by splitting a
    /// session keeps the range of the full grid.
    pub fn range(&self) -> &CoordinateRange {
        &self.range
    }

    pub fn points(&self) -> ArrayView2<'_, C<f64>> {
        self.points.view()
    }

    pub fn point(&self, row: usize, col: usize) -> Option<C<f64>> {
        self.points.get([row, col]).copied()
    }

    pub fn cols(&self) -> usize {
        self.points.ncols()
    }

    pub fn rows(&self) -> usize {
        self.points.nrows()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}
