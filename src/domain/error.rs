//! Domain-level errors (no external dependencies)

use thiserror::Error;

use crate::domain::identity::NodeKey;

/// Domain errors represent violations of the hierarchy model or its matrix math.
///
/// Variants fall into four groups: structural validation (criteria spec and
/// construction arguments), matrix validation, lookup, and illegal operations on
/// the node data model. None of them are transient.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    // structural validation
    #[error("invalid problem argument: expected a Problem, got {0}")]
    InvalidProblem(String),

    #[error("invalid alternatives: {0}")]
    InvalidAlternatives(String),

    #[error("invalid criteria spec: {0}")]
    InvalidSpec(String),

    #[error("criteria depth is not uniform: observed depths {depths:?}")]
    DepthMismatch { depths: Vec<usize> },

    #[error("criterion appears more than once in spec: {0}")]
    DuplicateCriterion(NodeKey),

    #[error("node key is used by more than one node: {0}")]
    DuplicateKey(NodeKey),

    // matrix validation
    #[error("matrix is not square: {rows} rows, row {row} has {cols} columns")]
    NotSquare { rows: usize, row: usize, cols: usize },

    #[error("matrix must not be empty")]
    EmptyMatrix,

    #[error("diagonal element [{index}][{index}] must be 1, got {value}")]
    BadDiagonal { index: usize, value: f64 },

    #[error("matrix is not reciprocal at [{i}][{j}]: {a} * {b} != 1")]
    NotReciprocal {
        i: usize,
        j: usize,
        a: f64,
        b: f64,
    },

    #[error("comparison value must be positive and finite, got {0}")]
    InvalidComparison(f64),

    #[error("index ({i}, {j}) out of bounds for matrix of size {size}")]
    IndexOutOfBounds { i: usize, j: usize, size: usize },

    #[error("matrix of {node} has size {matrix}, but the node has {children} children")]
    SizeMismatch {
        node: NodeKey,
        matrix: usize,
        children: usize,
    },

    #[error("eigen decomposition failed: {0}")]
    Decomposition(String),

    // lookup
    #[error("node not found: {0}")]
    NotFound(NodeKey),

    #[error("bad node key {0:?}: expected (name, id)")]
    BadKey(String),

    // illegal operations
    #[error("illegal operation: {0}")]
    IllegalOperation(String),
}

impl DomainError {
    /// True for errors raised while validating the criteria spec or construction arguments.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            DomainError::InvalidProblem(_)
                | DomainError::InvalidAlternatives(_)
                | DomainError::InvalidSpec(_)
                | DomainError::DepthMismatch { .. }
                | DomainError::DuplicateCriterion(_)
                | DomainError::DuplicateKey(_)
        )
    }

    /// True for errors raised while validating or evaluating a comparison matrix.
    pub fn is_matrix(&self) -> bool {
        matches!(
            self,
            DomainError::NotSquare { .. }
                | DomainError::EmptyMatrix
                | DomainError::BadDiagonal { .. }
                | DomainError::NotReciprocal { .. }
                | DomainError::InvalidComparison(_)
                | DomainError::IndexOutOfBounds { .. }
                | DomainError::SizeMismatch { .. }
                | DomainError::Decomposition(_)
        )
    }
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
