//! Node variants and the per-node state stored in the hierarchy arena.

use std::fmt;

use generational_arena::Index;

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::identity::NodeKey;
use crate::domain::pairwise::{PairwiseComparisonMatrix, Tolerance};

/// Closed set of node variants with their structural capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Problem,
    Criterion,
    DummyCriterion,
    Alternative,
}

impl NodeKind {
    pub fn supports_children(self) -> bool {
        !matches!(self, NodeKind::Alternative)
    }

    pub fn supports_matrix(self) -> bool {
        !matches!(self, NodeKind::Alternative)
    }

    /// Everything except the Problem can hang below another node.
    pub fn may_be_child(self) -> bool {
        !matches!(self, NodeKind::Problem)
    }

    pub fn is_criterion(self) -> bool {
        matches!(self, NodeKind::Criterion | NodeKind::DummyCriterion)
    }

    pub fn label(self) -> &'static str {
        match self {
            NodeKind::Problem => "Problem",
            NodeKind::Criterion => "Criterion",
            NodeKind::DummyCriterion => "DummyCriterion",
            NodeKind::Alternative => "Alternative",
        }
    }
}

/// Node stored in the hierarchy arena.
///
/// Children are owned handles in comparison order; parents are back-references
/// kept for lookup only.
#[derive(Debug, Clone)]
pub struct HierarchyNode {
    key: NodeKey,
    kind: NodeKind,
    pub(crate) parents: Vec<Index>,
    pub(crate) children: Vec<Index>,
    pcm: Option<PairwiseComparisonMatrix>,
}

impl HierarchyNode {
    pub fn new(key: NodeKey, kind: NodeKind) -> Self {
        Self {
            key,
            kind,
            parents: Vec::new(),
            children: Vec::new(),
            pcm: None,
        }
    }

    pub fn key(&self) -> &NodeKey {
        &self.key
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn parents(&self) -> &[Index] {
        &self.parents
    }

    pub fn children(&self) -> &[Index] {
        &self.children
    }

    pub fn pcm(&self) -> Option<&PairwiseComparisonMatrix> {
        self.pcm.as_ref()
    }

    /// (Re)creates an all-ones matrix sized to the current children.
    pub fn create_pcm(&mut self, tolerance: Tolerance) -> DomainResult<()> {
        self.ensure_matrix_capable()?;
        self.pcm = Some(PairwiseComparisonMatrix::with_tolerance(
            self.children.len(),
            tolerance,
        ));
        Ok(())
    }

    pub fn set_matrix(&mut self, rows: &[Vec<f64>]) -> DomainResult<()> {
        self.pcm_mut()?.set_matrix(rows)
    }

    pub fn set_comparison(&mut self, i: usize, j: usize, value: f64) -> DomainResult<()> {
        self.pcm_mut()?.set_comparison(i, j, value)
    }

    fn pcm_mut(&mut self) -> DomainResult<&mut PairwiseComparisonMatrix> {
        self.ensure_matrix_capable()?;
        let key = self.key.clone();
        self.pcm.as_mut().ok_or_else(|| {
            DomainError::IllegalOperation(format!("{key} has no comparison matrix yet"))
        })
    }

    fn ensure_matrix_capable(&self) -> DomainResult<()> {
        if self.kind.supports_matrix() {
            Ok(())
        } else {
            Err(DomainError::IllegalOperation(format!(
                "{} {} cannot hold a comparison matrix",
                self.kind.label(),
                self.key
            )))
        }
    }
}

impl fmt::Display for HierarchyNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capabilities_per_kind() {
        assert!(NodeKind::Problem.supports_children());
        assert!(!NodeKind::Problem.may_be_child());
        assert!(NodeKind::DummyCriterion.supports_matrix());
        assert!(NodeKind::DummyCriterion.is_criterion());
        assert!(!NodeKind::Alternative.supports_children());
        assert!(!NodeKind::Alternative.supports_matrix());
        assert!(NodeKind::Alternative.may_be_child());
    }

    #[test]
    fn alternative_cannot_hold_a_matrix() {
        let mut node = HierarchyNode::new(NodeKey::new("a", 0), NodeKind::Alternative);
        assert!(matches!(
            node.create_pcm(Tolerance::default()),
            Err(DomainError::IllegalOperation(_))
        ));
        assert!(matches!(
            node.set_matrix(&[vec![1.0]]),
            Err(DomainError::IllegalOperation(_))
        ));
        assert!(node.pcm().is_none());
    }

    #[test]
    fn set_matrix_before_create_is_rejected() {
        let mut node = HierarchyNode::new(NodeKey::new("c", 0), NodeKind::Criterion);
        assert!(matches!(
            node.set_comparison(0, 1, 2.0),
            Err(DomainError::IllegalOperation(_))
        ));
    }
}
