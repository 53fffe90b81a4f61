//! Criteria builder: classifies raw specs, checks depth, and pads shallow branches.

use std::collections::HashSet;

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::identity::{Criterion, Element, IdentityAllocator, NodeKey};
use crate::domain::spec::{leaf_depths, CriteriaSpec, CriterionBranch, RawEntry, RawSpec};

/// What to do with a spec whose branches end at different depths.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DepthPolicy {
    /// Reject uneven depth.
    #[default]
    Strict,
    /// Pad shallow branches with placeholder criteria.
    Normalize,
}

/// Turns a [`RawSpec`] into validated criterion branches.
pub struct CriteriaBuilder {
    policy: DepthPolicy,
    seen: HashSet<NodeKey>,
}

impl Default for CriteriaBuilder {
    fn default() -> Self {
        Self::new(DepthPolicy::default())
    }
}

impl CriteriaBuilder {
    pub fn new(policy: DepthPolicy) -> Self {
        Self {
            policy,
            seen: HashSet::new(),
        }
    }

    pub fn policy(&self) -> DepthPolicy {
        self.policy
    }

    /// Classify, then enforce (or establish) uniform depth.
    ///
    /// `ids` is only drawn from when normalizing.
    #[instrument(level = "debug", skip_all, fields(policy = ?self.policy))]
    pub fn build(
        &mut self,
        raw: RawSpec,
        ids: &mut IdentityAllocator,
    ) -> DomainResult<Vec<CriterionBranch>> {
        let branches = self.classify(raw)?.into_branches();
        if branches.is_empty() {
            debug!("no criteria, problem ties directly to alternatives");
            return Ok(branches);
        }

        let depths = leaf_depths(&branches);
        let distinct: Vec<usize> = depths.iter().copied().sorted().dedup().collect();
        if distinct.len() <= 1 {
            return Ok(branches);
        }

        match self.policy {
            DepthPolicy::Strict => Err(DomainError::DepthMismatch { depths: distinct }),
            DepthPolicy::Normalize => {
                let max_depth = distinct.last().copied().unwrap_or(1);
                debug!(?distinct, max_depth, "padding shallow branches");
                Ok(normalize_depth(branches, max_depth, ids))
            }
        }
    }

    /// Decide the spec shape once.
    #[instrument(level = "trace", skip_all)]
    pub fn classify(&mut self, raw: RawSpec) -> DomainResult<CriteriaSpec> {
        self.seen.clear();
        match raw {
            RawSpec::Absent => Ok(CriteriaSpec::Leaf),
            RawSpec::Single(element) => {
                let criterion = self.expect_criterion(element)?;
                Ok(CriteriaSpec::Uniform(vec![criterion]))
            }
            RawSpec::List(entries) if entries.is_empty() => Ok(CriteriaSpec::Leaf),
            RawSpec::List(entries) => {
                if entries.iter().all(|e| matches!(e, RawEntry::Node(_))) {
                    let mut criteria = Vec::with_capacity(entries.len());
                    for entry in entries {
                        if let RawEntry::Node(element) = entry {
                            criteria.push(self.expect_criterion(element)?);
                        }
                    }
                    Ok(CriteriaSpec::Uniform(criteria))
                } else if entries.iter().all(|e| matches!(e, RawEntry::Branch(..))) {
                    Ok(CriteriaSpec::Nested(self.classify_branches(entries)?))
                } else {
                    Err(DomainError::InvalidSpec(
                        "list mixes bare criteria and {criterion: children} mappings".to_string(),
                    ))
                }
            }
        }
    }

    fn classify_branches(&mut self, entries: Vec<RawEntry>) -> DomainResult<Vec<CriterionBranch>> {
        let mut branches = Vec::with_capacity(entries.len());
        for entry in entries {
            let (element, children) = match entry {
                RawEntry::Branch(element, children) => (element, children),
                RawEntry::Node(element) => {
                    return Err(DomainError::InvalidSpec(format!(
                        "expected a {{criterion: children}} mapping, got bare {element}"
                    )))
                }
            };
            let criterion = self.expect_criterion(element)?;
            let children = match children {
                None => None,
                Some(list) if list.is_empty() => {
                    return Err(DomainError::InvalidSpec(format!(
                        "{} has an empty children list",
                        criterion.key()
                    )))
                }
                Some(list) => Some(self.classify_branches(list)?),
            };
            branches.push(CriterionBranch {
                criterion,
                children,
            });
        }
        Ok(branches)
    }

    fn expect_criterion(&mut self, element: Element) -> DomainResult<Criterion> {
        match element {
            Element::Criterion(criterion) => {
                if !self.seen.insert(criterion.key().clone()) {
                    return Err(DomainError::DuplicateCriterion(criterion.key().clone()));
                }
                Ok(criterion)
            }
            other => Err(DomainError::InvalidSpec(format!(
                "expected a Criterion, got {other}"
            ))),
        }
    }
}

/// Wraps every leaf criterion that ends above `max_depth` in placeholder criteria.
///
/// The placeholder takes the leaf's position; the leaf moves one level down.
pub fn normalize_depth(
    branches: Vec<CriterionBranch>,
    max_depth: usize,
    ids: &mut IdentityAllocator,
) -> Vec<CriterionBranch> {
    branches
        .into_iter()
        .map(|branch| pad(branch, 1, max_depth, ids))
        .collect()
}

fn pad(
    branch: CriterionBranch,
    depth: usize,
    max_depth: usize,
    ids: &mut IdentityAllocator,
) -> CriterionBranch {
    match branch.children {
        None if depth < max_depth => {
            let placeholder = ids.placeholder_criterion();
            debug!(placeholder = %placeholder.key(), below = %branch.criterion.key(), depth, "pad");
            CriterionBranch {
                criterion: placeholder,
                children: Some(vec![pad(branch, depth + 1, max_depth, ids)]),
            }
        }
        None => branch,
        Some(children) => CriterionBranch {
            criterion: branch.criterion,
            children: Some(
                children
                    .into_iter()
                    .map(|child| pad(child, depth + 1, max_depth, ids))
                    .collect(),
            ),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::testing;
    use rstest::rstest;

    fn uneven(ids: &mut IdentityAllocator) -> RawSpec {
        // a -> a1 -> (alternatives)
        // b -> (alternatives)
        RawSpec::from(vec![
            RawEntry::branch(ids.criterion("a"), vec![RawEntry::leaf(ids.criterion("a1"))]),
            RawEntry::leaf(ids.criterion("b")),
        ])
    }

    #[test]
    fn absent_and_empty_specs_have_no_criteria() {
        let mut ids = IdentityAllocator::new();
        let mut builder = CriteriaBuilder::default();
        assert!(builder.build(RawSpec::Absent, &mut ids).unwrap().is_empty());
        assert!(builder
            .build(RawSpec::List(vec![]), &mut ids)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn single_criterion_is_a_flat_hierarchy() {
        let mut ids = IdentityAllocator::new();
        let c = ids.criterion("only");
        let spec = CriteriaBuilder::default().classify(c.clone().into()).unwrap();
        assert_eq!(spec, CriteriaSpec::Uniform(vec![c]));
    }

    #[test]
    fn flat_list_is_uniform() {
        let mut ids = IdentityAllocator::new();
        let criteria = vec![ids.criterion("x"), ids.criterion("y")];
        let branches = CriteriaBuilder::default()
            .build(criteria.into(), &mut ids)
            .unwrap();
        assert_eq!(branches.len(), 2);
        assert!(branches.iter().all(CriterionBranch::is_leaf));
    }

    #[test]
    fn nested_list_with_even_depth_is_accepted() {
        let mut ids = IdentityAllocator::new();
        let raw = RawSpec::from(vec![
            RawEntry::branch(ids.criterion("a"), vec![RawEntry::leaf(ids.criterion("a1"))]),
            RawEntry::branch(ids.criterion("b"), vec![RawEntry::leaf(ids.criterion("b1"))]),
        ]);
        let branches = CriteriaBuilder::default().build(raw, &mut ids).unwrap();
        assert_eq!(leaf_depths(&branches), vec![2, 2]);
    }

    #[test]
    fn strict_policy_rejects_uneven_depth() {
        testing::init_test_setup();
        let mut ids = IdentityAllocator::new();
        let raw = uneven(&mut ids);
        let err = CriteriaBuilder::new(DepthPolicy::Strict)
            .build(raw, &mut ids)
            .unwrap_err();
        assert_eq!(err, DomainError::DepthMismatch { depths: vec![1, 2] });
        assert!(err.is_structural());
    }

    #[test]
    fn normalize_policy_pads_with_placeholders() {
        testing::init_test_setup();
        let mut ids = IdentityAllocator::new();
        let raw = uneven(&mut ids);
        let branches = CriteriaBuilder::new(DepthPolicy::Normalize)
            .build(raw, &mut ids)
            .unwrap();

        assert_eq!(leaf_depths(&branches), vec![2, 2]);
        let padded = &branches[1];
        assert!(padded.criterion.is_placeholder());
        let inner = padded.children.as_ref().unwrap();
        assert_eq!(inner.len(), 1);
        assert_eq!(inner[0].criterion.key().name, "b");
        assert!(inner[0].is_leaf());
    }

    #[test]
    fn normalize_pads_multiple_levels() {
        let mut ids = IdentityAllocator::new();
        let raw = RawSpec::from(vec![
            RawEntry::branch(
                ids.criterion("a"),
                vec![RawEntry::branch(
                    ids.criterion("a1"),
                    vec![RawEntry::leaf(ids.criterion("a11"))],
                )],
            ),
            RawEntry::leaf(ids.criterion("b")),
        ]);
        let branches = CriteriaBuilder::new(DepthPolicy::Normalize)
            .build(raw, &mut ids)
            .unwrap();

        assert_eq!(leaf_depths(&branches), vec![3, 3]);
        let outer = &branches[1];
        let middle = &outer.children.as_ref().unwrap()[0];
        assert!(outer.criterion.is_placeholder());
        assert!(middle.criterion.is_placeholder());
        assert_eq!(middle.children.as_ref().unwrap()[0].criterion.key().name, "b");
    }

    #[rstest]
    #[case::alternative_key(true, false)]
    #[case::problem_in_flat_list(false, true)]
    fn non_criterion_elements_are_rejected(#[case] as_key: bool, #[case] use_problem: bool) {
        let mut ids = IdentityAllocator::new();
        let wrong: Element = if use_problem {
            ids.problem("p").into()
        } else {
            ids.alternative("alt").into()
        };
        let raw = if as_key {
            RawSpec::from(vec![RawEntry::branch(
                ids.criterion("a"),
                vec![RawEntry::leaf(wrong)],
            )])
        } else {
            RawSpec::from(vec![RawEntry::node(ids.criterion("a")), RawEntry::Node(wrong)])
        };

        let err = CriteriaBuilder::default().build(raw, &mut ids).unwrap_err();
        assert!(matches!(err, DomainError::InvalidSpec(_)));
    }

    #[test]
    fn single_non_criterion_is_rejected() {
        let mut ids = IdentityAllocator::new();
        let raw = RawSpec::Single(ids.alternative("a").into());
        assert!(CriteriaBuilder::default().classify(raw).is_err());
    }

    #[test]
    fn mixed_list_is_rejected() {
        let mut ids = IdentityAllocator::new();
        let raw = RawSpec::from(vec![
            RawEntry::node(ids.criterion("a")),
            RawEntry::leaf(ids.criterion("b")),
        ]);
        assert!(matches!(
            CriteriaBuilder::default().classify(raw),
            Err(DomainError::InvalidSpec(_))
        ));
    }

    #[test]
    fn empty_children_list_is_rejected() {
        let mut ids = IdentityAllocator::new();
        let raw = RawSpec::from(vec![RawEntry::branch(ids.criterion("a"), vec![])]);
        assert!(matches!(
            CriteriaBuilder::default().classify(raw),
            Err(DomainError::InvalidSpec(_))
        ));
    }

    #[test]
    fn bare_node_inside_nested_children_is_rejected() {
        let mut ids = IdentityAllocator::new();
        let raw = RawSpec::from(vec![RawEntry::branch(
            ids.criterion("a"),
            vec![RawEntry::node(ids.criterion("a1"))],
        )]);
        assert!(CriteriaBuilder::default().classify(raw).is_err());
    }

    #[test]
    fn duplicate_criterion_is_rejected() {
        let mut ids = IdentityAllocator::new();
        let c = ids.criterion("twice");
        let raw = RawSpec::from(vec![
            RawEntry::branch(ids.criterion("a"), vec![RawEntry::leaf(c.clone())]),
            RawEntry::branch(ids.criterion("b"), vec![RawEntry::leaf(c.clone())]),
        ]);
        assert_eq!(
            CriteriaBuilder::default().classify(raw).unwrap_err(),
            DomainError::DuplicateCriterion(c.key().clone())
        );
    }
}
