//! Piecewise-constant 2-D lookup table.

use serde::{Deserialize, Serialize};

use crate::error::{HistError, Result};
use crate::histogram::find_bin;

/// Values tabulated on a rectangular `(x, y)` binning.
///
/// `values` is row-major over x: `values[ix * n_y + iy]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grid2D {
    x_edges: Vec<f64>,
    y_edges: Vec<f64>,
    values: Vec<f64>,
}

impl Grid2D {
    /// Build a grid, checking the shape against the two binnings.
    pub fn new(x_edges: Vec<f64>, y_edges: Vec<f64>, values: Vec<f64>) -> Result<Self> {
        for (axis, edges) in [("x", &x_edges), ("y", &y_edges)] {
            if edges.len() < 2 {
                return Err(HistError::InvalidBinning(format!(
                    "{axis} axis needs at least 2 edges (got {})",
                    edges.len()
                )));
            }
            if edges.iter().any(|e| !e.is_finite()) || edges.windows(2).any(|w| w[1] <= w[0]) {
                return Err(HistError::InvalidBinning(format!(
                    "{axis} edges must be finite and strictly increasing"
                )));
            }
        }
        let expected = (x_edges.len() - 1) * (y_edges.len() - 1);
        if values.len() != expected {
            return Err(HistError::LengthMismatch(format!(
                "grid has {} values, binning needs {expected}",
                values.len()
            )));
        }
        Ok(Self { x_edges, y_edges, values })
    }

    /// Number of bins along x.
    pub fn n_x(&self) -> usize {
        self.x_edges.len() - 1
    }

    /// Number of bins along y.
    pub fn n_y(&self) -> usize {
        self.y_edges.len() - 1
    }

    /// Value of the cell containing `(x, y)`, `None` outside the covered range.
    pub fn get(&self, x: f64, y: f64) -> Option<f64> {
        let ix = find_bin(&self.x_edges, x)?;
        let iy = find_bin(&self.y_edges, y)?;
        Some(self.values[ix * self.n_y() + iy])
    }

    /// Tabulated values, row-major over x.
    pub fn values(&self) -> &[f64] {
        &self.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> Grid2D {
        Grid2D::new(vec![0.0, 100.0, 200.0], vec![0.0, 50.0, 150.0, 500.0], vec![
            1.1, 1.2, 1.3, //
            1.4, 1.5, 1.6,
        ])
        .unwrap()
    }

    #[test]
    fn lookup_is_row_major_over_x() {
        let g = grid();
        assert_eq!(g.n_x(), 2);
        assert_eq!(g.n_y(), 3);
        assert_eq!(g.get(10.0, 10.0), Some(1.1));
        assert_eq!(g.get(10.0, 400.0), Some(1.3));
        assert_eq!(g.get(150.0, 60.0), Some(1.5));
    }

    #[test]
    fn outside_range_is_none() {
        let g = grid();
        assert_eq!(g.get(-1.0, 10.0), None);
        assert_eq!(g.get(10.0, 500.0), None);
        assert_eq!(g.get(f64::NAN, 10.0), None);
    }

    #[test]
    fn shape_mismatch_rejected() {
        let err = Grid2D::new(vec![0.0, 1.0], vec![0.0, 1.0, 2.0], vec![1.0]).unwrap_err();
        assert!(matches!(err, HistError::LengthMismatch(_)));
        assert!(Grid2D::new(vec![0.0], vec![0.0, 1.0], vec![]).is_err());
        assert!(Grid2D::new(vec![1.0, 0.0], vec![0.0, 1.0], vec![1.0]).is_err());
    }
}
