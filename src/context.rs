//! Evaluation context: variable bindings and the matrix store.
//!
//! Bindings are supplied fresh to every evaluation and never owned by a tree. Matrix
//! references such as `[A]` are resolved through a [`MatrixStore`], which the engine only
//! reads.

use std::collections::HashMap;

use nalgebra::DMatrix;

use crate::backends::matrix::MatrixBackend;
use crate::errors::EvalError;

/// Variable values for one evaluation.
pub type Bindings = HashMap<String, f64>;

/// Named matrices referenced by `[X]` tokens.
pub trait MatrixStore: Sync {
    fn get(&self, name: &str) -> Option<&DMatrix<f64>>;
}

/// A store with no matrices; every lookup fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoMatrices;

impl MatrixStore for NoMatrices {
    fn get(&self, _name: &str) -> Option<&DMatrix<f64>> {
        None
    }
}

/// In-memory matrix store keyed by reference text (`"[A]"`).
///
/// # Example
///
/// ```
/// use lepton_calc::context::{MatrixStore, MatrixTable};
///
/// let mut table = MatrixTable::new();
/// table.set("[A]", &vec![vec![1.0, 2.0], vec![3.0, 4.0]]);
/// assert_eq!(table.get("[A]").map(|m| m.shape()), Some((2, 2)));
/// table.remove("[A]");
/// assert!(table.get("[A]").is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatrixTable {
    matrices: HashMap<String, DMatrix<f64>>,
}

impl MatrixTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a matrix, replacing any previous value under `name`.
    pub fn set<M: MatrixBackend>(&mut self, name: &str, matrix: &M) {
        self.matrices.insert(name.to_string(), matrix.to_dmatrix());
    }

    pub fn remove(&mut self, name: &str) -> Option<DMatrix<f64>> {
        self.matrices.remove(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.matrices.keys().map(String::as_str)
    }
}

impl MatrixStore for MatrixTable {
    fn get(&self, name: &str) -> Option<&DMatrix<f64>> {
        self.matrices.get(name)
    }
}

/// Everything an evaluation reads besides the tree itself.
#[derive(Clone, Copy)]
pub struct EvalContext<'a> {
    pub bindings: &'a Bindings,
    pub matrices: &'a dyn MatrixStore,
}

impl<'a> EvalContext<'a> {
    /// Context without any matrices.
    pub fn new(bindings: &'a Bindings) -> Self {
        Self {
            bindings,
            matrices: &NoMatrices,
        }
    }

    pub fn with_matrices(self, matrices: &'a dyn MatrixStore) -> Self {
        Self { matrices, ..self }
    }

    /// Same matrices, different bindings.
    pub fn rebind<'b>(&self, bindings: &'b Bindings) -> EvalContext<'b>
    where
        'a: 'b,
    {
        EvalContext {
            bindings,
            matrices: self.matrices,
        }
    }

    pub(crate) fn variable(&self, name: &str) -> Result<f64, EvalError> {
        self.bindings
            .get(name)
            .copied()
            .ok_or_else(|| EvalError::UnboundVariable(name.to_string()))
    }

    pub(crate) fn matrix(&self, name: &str) -> Result<DMatrix<f64>, EvalError> {
        self.matrices
            .get(name)
            .cloned()
            .ok_or_else(|| EvalError::UndefinedMatrix(name.to_string()))
    }
}
