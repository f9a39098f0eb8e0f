use nalgebra::DMatrix;

/// A trait for matrix-like types that can be stored in a matrix table and read back from
/// matrix-valued results.
///
/// Implementations exist for row-major `Vec<Vec<f64>>`, nalgebra's `DMatrix<f64>` and, with
/// the `ndarray` feature, ndarray's `Array2<f64>`.
///
/// # Examples
///
/// ```rust
/// use lepton_calc::prelude::MatrixBackend;
/// use nalgebra::DMatrix;
///
/// let rows = vec![vec![1.0, 2.0], vec![3.0, 4.0]];
/// let m = rows.to_dmatrix();
/// assert_eq!(m[(1, 0)], 3.0);
/// assert_eq!(Vec::<Vec<f64>>::from_dmatrix(&m), rows);
/// ```
pub trait MatrixBackend: Sized {
    /// Converts the matrix into nalgebra's dynamic matrix type.
    fn to_dmatrix(&self) -> DMatrix<f64>;

    /// Builds the matrix from nalgebra's dynamic matrix type.
    fn from_dmatrix(matrix: &DMatrix<f64>) -> Self;

    /// Returns the dimensions of the matrix as (rows, columns).
    fn dims(&self) -> (usize, usize);
}

/// Row-major nested vectors. Ragged rows are padded with zeros.
impl MatrixBackend for Vec<Vec<f64>> {
    fn to_dmatrix(&self) -> DMatrix<f64> {
        let (rows, cols) = self.dims();
        DMatrix::from_fn(rows, cols, |i, j| self[i].get(j).copied().unwrap_or(0.0))
    }

    fn from_dmatrix(matrix: &DMatrix<f64>) -> Self {
        matrix
            .row_iter()
            .map(|row| row.iter().copied().collect())
            .collect()
    }

    fn dims(&self) -> (usize, usize) {
        let cols = self.iter().map(Vec::len).max().unwrap_or(0);
        (self.len(), cols)
    }
}

impl MatrixBackend for DMatrix<f64> {
    fn to_dmatrix(&self) -> DMatrix<f64> {
        self.clone()
    }

    fn from_dmatrix(matrix: &DMatrix<f64>) -> Self {
        matrix.clone()
    }

    fn dims(&self) -> (usize, usize) {
        self.shape()
    }
}

/// Implementation of MatrixBackend for ndarray's Array2<f64>.
///
/// # Examples
///
/// ```rust
/// use lepton_calc::prelude::MatrixBackend;
/// use ndarray::array;
///
/// let a = array![[1.0, 2.0], [3.0, 4.0]];
/// let m = a.to_dmatrix();
/// assert_eq!(m[(0, 1)], 2.0);
/// assert_eq!(ndarray::Array2::from_dmatrix(&m), a);
/// ```
#[cfg(feature = "ndarray")]
impl MatrixBackend for ndarray::Array2<f64> {
    fn to_dmatrix(&self) -> DMatrix<f64> {
        DMatrix::from_fn(self.nrows(), self.ncols(), |i, j| self[[i, j]])
    }

    fn from_dmatrix(matrix: &DMatrix<f64>) -> Self {
        ndarray::Array2::from_shape_fn(matrix.shape(), |(i, j)| matrix[(i, j)])
    }

    fn dims(&self) -> (usize, usize) {
        (self.nrows(), self.ncols())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ragged_rows_are_padded() {
        let rows = vec![vec![1.0], vec![2.0, 3.0]];
        assert_eq!(rows.dims(), (2, 2));
        let m = rows.to_dmatrix();
        assert_eq!(m[(0, 1)], 0.0);
        assert_eq!(m[(1, 1)], 3.0);
    }

    #[test]
    fn test_dmatrix_identity_conversion() {
        let m = DMatrix::from_row_slice(1, 3, &[1.0, 2.0, 3.0]);
        assert_eq!(m.dims(), (1, 3));
        assert_eq!(DMatrix::from_dmatrix(&m), m);
    }
}
