//! Model orchestrator: owns the wired hierarchy and aggregates global priorities.

use std::collections::{HashMap, HashSet};

use generational_arena::Index;
use itertools::Itertools;
use tracing::{debug, info, instrument};

use crate::domain::arena::HierarchyArena;
use crate::domain::builder::{CriteriaBuilder, DepthPolicy};
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::identity::{Element, IdentityAllocator, NodeKey};
use crate::domain::node::{HierarchyNode, NodeKind};
use crate::domain::pairwise::{PairwiseComparisonMatrix, Tolerance};
use crate::domain::spec::{criterion_keys, CriterionBranch, RawSpec};
use crate::tree_traits::TreeNodeConvert;

/// Consistency diagnostics for one internal node.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsistencyEntry {
    pub key: NodeKey,
    pub size: usize,
    pub ratio: Option<f64>,
    pub consistent: bool,
}

/// Collects construction arguments for a [`Model`].
#[derive(Debug, Clone)]
pub struct ModelBuilder {
    problem: Element,
    criteria: RawSpec,
    alternatives: Vec<Element>,
    policy: DepthPolicy,
    tolerance: Tolerance,
}

impl ModelBuilder {
    pub fn new(problem: impl Into<Element>) -> Self {
        Self {
            problem: problem.into(),
            criteria: RawSpec::Absent,
            alternatives: Vec::new(),
            policy: DepthPolicy::default(),
            tolerance: Tolerance::default(),
        }
    }

    pub fn criteria(mut self, criteria: impl Into<RawSpec>) -> Self {
        self.criteria = criteria.into();
        self
    }

    pub fn alternatives<I, E>(mut self, alternatives: I) -> Self
    where
        I: IntoIterator<Item = E>,
        E: Into<Element>,
    {
        self.alternatives = alternatives.into_iter().map(Into::into).collect();
        self
    }

    pub fn depth_policy(mut self, policy: DepthPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn tolerance(mut self, tolerance: Tolerance) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Validates the arguments, wires the hierarchy and creates one matrix per internal node.
    #[instrument(level = "debug", skip_all, fields(problem = %self.problem.key()))]
    pub fn build(self, ids: &mut IdentityAllocator) -> DomainResult<Model> {
        let problem = match self.problem {
            Element::Problem(problem) => problem,
            other => return Err(DomainError::InvalidProblem(other.to_string())),
        };
        let alternatives = validate_alternatives(self.alternatives)?;
        let criteria = CriteriaBuilder::new(self.policy).build(self.criteria, ids)?;
        ensure_unique_keys(problem.key(), &criterion_keys(&criteria), &alternatives)?;

        let mut arena = HierarchyArena::new();
        let problem_idx = arena.insert_node(problem.key().clone(), NodeKind::Problem);
        let alternative_idxs: Vec<Index> = alternatives
            .iter()
            .map(|key| arena.insert_node(key.clone(), NodeKind::Alternative))
            .collect();

        if criteria.is_empty() {
            for &alt in &alternative_idxs {
                arena.add_child(problem_idx, alt)?;
            }
        } else {
            wire(&mut arena, problem_idx, &criteria, &alternative_idxs)?;
        }

        let internal: Vec<Index> = arena
            .iter()
            .filter(|(_, node)| node.kind().supports_matrix() && !node.children().is_empty())
            .map(|(idx, _)| idx)
            .unique()
            .collect();
        for &idx in &internal {
            arena.node_mut(idx)?.create_pcm(self.tolerance)?;
        }

        info!(
            criteria = criterion_keys(&criteria).len(),
            alternatives = alternative_idxs.len(),
            matrices = internal.len(),
            "model built"
        );
        Ok(Model {
            arena,
            problem: problem_idx,
            alternatives: alternative_idxs,
            criteria,
            policy: self.policy,
        })
    }
}

fn validate_alternatives(elements: Vec<Element>) -> DomainResult<Vec<NodeKey>> {
    if elements.is_empty() {
        return Err(DomainError::InvalidAlternatives(
            "at least one alternative is required".to_string(),
        ));
    }
    let mut seen = HashSet::new();
    let mut keys = Vec::with_capacity(elements.len());
    for element in elements {
        let alternative = match element {
            Element::Alternative(alternative) => alternative,
            other => {
                return Err(DomainError::InvalidAlternatives(format!(
                    "expected an Alternative, got {other}"
                )))
            }
        };
        if !seen.insert(alternative.key().clone()) {
            return Err(DomainError::InvalidAlternatives(format!(
                "duplicate alternative {}",
                alternative.key()
            )));
        }
        keys.push(alternative.key().clone());
    }
    Ok(keys)
}

/// Lookups go by `(name, id)`, so no two nodes of any kind may share one.
fn ensure_unique_keys(
    problem: &NodeKey,
    criteria: &[NodeKey],
    alternatives: &[NodeKey],
) -> DomainResult<()> {
    let mut seen = HashSet::new();
    for key in std::iter::once(problem).chain(criteria).chain(alternatives) {
        if !seen.insert(key) {
            return Err(DomainError::DuplicateKey(key.clone()));
        }
    }
    Ok(())
}

/// Inserts each branch below `parent`; leaf criteria receive every alternative.
fn wire(
    arena: &mut HierarchyArena,
    parent: Index,
    branches: &[CriterionBranch],
    alternatives: &[Index],
) -> DomainResult<()> {
    for branch in branches {
        let kind = if branch.criterion.is_placeholder() {
            NodeKind::DummyCriterion
        } else {
            NodeKind::Criterion
        };
        let idx = arena.insert_node(branch.criterion.key().clone(), kind);
        arena.add_child(parent, idx)?;
        match &branch.children {
            None => {
                for &alt in alternatives {
                    arena.add_child(idx, alt)?;
                }
            }
            Some(children) => wire(arena, idx, children, alternatives)?,
        }
    }
    Ok(())
}

/// A built AHP model: problem, criteria hierarchy and alternatives.
///
/// Mutation goes through `&mut self`, so a model shared across threads needs
/// external locking; concurrent reads are fine.
#[derive(Debug, Clone)]
pub struct Model {
    arena: HierarchyArena,
    problem: Index,
    alternatives: Vec<Index>,
    criteria: Vec<CriterionBranch>,
    policy: DepthPolicy,
}

impl Model {
    pub fn builder(problem: impl Into<Element>) -> ModelBuilder {
        ModelBuilder::new(problem)
    }

    /// Strict-depth shorthand for [`ModelBuilder`].
    pub fn new<I, E>(
        ids: &mut IdentityAllocator,
        problem: impl Into<Element>,
        criteria: impl Into<RawSpec>,
        alternatives: I,
    ) -> DomainResult<Self>
    where
        I: IntoIterator<Item = E>,
        E: Into<Element>,
    {
        ModelBuilder::new(problem)
            .criteria(criteria)
            .alternatives(alternatives)
            .build(ids)
    }

    pub fn arena(&self) -> &HierarchyArena {
        &self.arena
    }

    pub fn depth_policy(&self) -> DepthPolicy {
        self.policy
    }

    pub fn problem(&self) -> &HierarchyNode {
        // the problem handle is inserted at build time and never removed
        &self.arena[self.problem]
    }

    pub fn alternatives(&self) -> Vec<&NodeKey> {
        self.alternatives
            .iter()
            .map(|&idx| self.arena[idx].key())
            .collect()
    }

    /// Criteria as wired, placeholders included.
    pub fn criteria(&self) -> &[CriterionBranch] {
        &self.criteria
    }

    /// Criterion identities in pre-order.
    pub fn criteria_identities(&self) -> Vec<NodeKey> {
        criterion_keys(&self.criteria)
    }

    /// Depth-first lookup by `(name, id)`.
    pub fn find(&self, key: &NodeKey) -> DomainResult<Index> {
        self.arena
            .find(key)
            .ok_or_else(|| DomainError::NotFound(key.clone()))
    }

    /// Lookup by the `name#id` string form.
    pub fn find_str(&self, key: &str) -> DomainResult<Index> {
        self.find(&key.parse()?)
    }

    pub fn node(&self, key: &NodeKey) -> DomainResult<&HierarchyNode> {
        let idx = self.find(key)?;
        self.arena.node(idx)
    }

    pub fn comparison_matrix(&self, key: &NodeKey) -> DomainResult<&PairwiseComparisonMatrix> {
        let node = self.node(key)?;
        node.pcm().ok_or_else(|| {
            DomainError::IllegalOperation(format!(
                "{} {} has no comparison matrix",
                node.kind().label(),
                node.key()
            ))
        })
    }

    /// Replaces the comparison matrix of the node with `key`.
    #[instrument(level = "debug", skip(self, rows), fields(key = %key))]
    pub fn attach_comparison_matrix(&mut self, key: &NodeKey, rows: &[Vec<f64>]) -> DomainResult<()> {
        let idx = self.find(key)?;
        self.arena.node_mut(idx)?.set_matrix(rows)?;
        debug!(size = rows.len(), "matrix attached");
        Ok(())
    }

    pub fn set_comparison(
        &mut self,
        key: &NodeKey,
        i: usize,
        j: usize,
        value: f64,
    ) -> DomainResult<()> {
        let idx = self.find(key)?;
        self.arena.node_mut(idx)?.set_comparison(i, j, value)
    }

    pub fn priority_vector(&self, key: &NodeKey) -> DomainResult<Vec<f64>> {
        self.local_priorities(self.find(key)?)
    }

    pub fn consistency_ratio(&self, key: &NodeKey) -> DomainResult<Option<f64>> {
        self.comparison_matrix(key)?.consistency_ratio()
    }

    /// Local priorities of a node's children, in child order.
    fn local_priorities(&self, idx: Index) -> DomainResult<Vec<f64>> {
        let node = self.arena.node(idx)?;
        let pcm = node.pcm().ok_or_else(|| {
            DomainError::IllegalOperation(format!("{} has no comparison matrix", node.key()))
        })?;
        if pcm.size() != node.children().len() {
            return Err(DomainError::SizeMismatch {
                node: node.key().clone(),
                matrix: pcm.size(),
                children: node.children().len(),
            });
        }
        pcm.priority_vector()
    }

    /// Global priorities aligned with [`Model::alternatives`].
    ///
    /// Each alternative collects the product of local weights along every path
    /// from the problem; paths through different leaf criteria add up.
    #[instrument(level = "debug", skip(self))]
    pub fn solve(&self) -> DomainResult<Vec<f64>> {
        let slots: HashMap<Index, usize> = self
            .alternatives
            .iter()
            .enumerate()
            .map(|(slot, &idx)| (idx, slot))
            .collect();
        let mut global = vec![0.0; self.alternatives.len()];

        let mut stack = vec![(self.problem, 1.0)];
        while let Some((idx, weight)) = stack.pop() {
            if let Some(&slot) = slots.get(&idx) {
                global[slot] += weight;
                continue;
            }
            let local = self.local_priorities(idx)?;
            let children = self.arena.node(idx)?.children();
            for (&child, w) in children.iter().zip(local) {
                stack.push((child, weight * w));
            }
        }

        debug!(?global, "solved");
        Ok(global)
    }

    /// Alternatives with their global priority, best first.
    pub fn ranking(&self) -> DomainResult<Vec<(NodeKey, f64)>> {
        let global = self.solve()?;
        Ok(self
            .alternatives()
            .into_iter()
            .cloned()
            .zip(global)
            .sorted_by(|a, b| b.1.total_cmp(&a.1))
            .collect())
    }

    /// Hierarchy rendered as a tree, alternatives repeated under every leaf criterion.
    pub fn show(&self) -> String {
        self.arena.to_tree_string().to_string()
    }

    /// Consistency ratio of every internal node, in pre-order.
    pub fn consistency_report(&self, threshold: f64) -> DomainResult<Vec<ConsistencyEntry>> {
        let mut report = Vec::new();
        for (_, node) in self.arena.iter() {
            let Some(pcm) = node.pcm() else {
                continue;
            };
            let ratio = pcm.consistency_ratio()?;
            report.push(ConsistencyEntry {
                key: node.key().clone(),
                size: pcm.size(),
                ratio,
                consistent: ratio.map_or(true, |cr| cr <= threshold),
            });
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::spec::RawEntry;
    use crate::util::testing;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn without_criteria_the_problem_owns_the_alternatives() {
        testing::init_test_setup();
        let mut ids = IdentityAllocator::new();
        let problem = ids.problem("goal");
        let alts: Vec<_> = (0..4).map(|i| ids.alternative(format!("a{i}"))).collect();

        let model = Model::new(&mut ids, problem, RawSpec::Absent, alts).unwrap();

        assert_eq!(model.problem().children().len(), 4);
        assert_eq!(model.problem().pcm().unwrap().size(), 4);
        assert!(model.criteria_identities().is_empty());
        let global = model.solve().unwrap();
        assert!(global.iter().all(|g| close(*g, 0.25)));
    }

    #[test]
    fn dummy_criterion_forwards_full_weight() {
        let mut ids = IdentityAllocator::new();
        let problem = ids.problem("goal");
        let a = ids.criterion("a");
        let a1 = ids.criterion("a1");
        let a2 = ids.criterion("a2");
        let b = ids.criterion("b");
        let alts = vec![ids.alternative("x"), ids.alternative("y")];
        let spec = vec![
            RawEntry::branch(a, vec![RawEntry::leaf(a1.clone()), RawEntry::leaf(a2)]),
            RawEntry::leaf(b.clone()),
        ];

        let mut model = Model::builder(problem.clone())
            .criteria(spec)
            .alternatives(alts)
            .depth_policy(DepthPolicy::Normalize)
            .build(&mut ids)
            .unwrap();

        let dummy = model.criteria()[1].criterion.key().clone();
        assert_eq!(model.node(&dummy).unwrap().kind(), NodeKind::DummyCriterion);
        assert_eq!(model.priority_vector(&dummy).unwrap(), vec![1.0]);

        // only b decides: x is 3 times better than y there
        model
            .attach_comparison_matrix(problem.key(), &[vec![1.0, 1.0 / 9.0], vec![9.0, 1.0]])
            .unwrap();
        model
            .attach_comparison_matrix(b.key(), &[vec![1.0, 3.0], vec![1.0 / 3.0, 1.0]])
            .unwrap();
        let global = model.solve().unwrap();
        let expected_x = 0.1 * 0.5 + 0.9 * 0.75;
        assert!(close(global[0], expected_x), "{global:?}");
        assert!(close(global.iter().sum::<f64>(), 1.0));
        assert!(model.find(a1.key()).is_ok());
    }

    #[test]
    fn size_mismatch_is_reported_at_solve_time() {
        let mut ids = IdentityAllocator::new();
        let problem = ids.problem("goal");
        let alts = vec![ids.alternative("x"), ids.alternative("y")];
        let mut model = Model::new(&mut ids, problem.clone(), RawSpec::Absent, alts).unwrap();

        model
            .attach_comparison_matrix(problem.key(), &[vec![1.0; 3], vec![1.0; 3], vec![1.0; 3]])
            .unwrap();

        assert!(matches!(
            model.solve(),
            Err(DomainError::SizeMismatch {
                matrix: 3,
                children: 2,
                ..
            })
        ));
    }
}
