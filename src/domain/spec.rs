//! Criteria specifications: the untyped builder input and its classified form.

use crate::domain::identity::{Criterion, Element, NodeKey};

/// Builder input before classification.
///
/// Mirrors the accepted shapes: nothing, a single node, or a list whose entries
/// are either bare nodes (flat hierarchy) or `{node: children}` mappings where
/// `None` children means "the alternatives go here".
#[derive(Debug, Clone, Default, PartialEq)]
pub enum RawSpec {
    #[default]
    Absent,
    Single(Element),
    List(Vec<RawEntry>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum RawEntry {
    Node(Element),
    Branch(Element, Option<Vec<RawEntry>>),
}

impl RawEntry {
    pub fn node(element: impl Into<Element>) -> Self {
        RawEntry::Node(element.into())
    }

    /// `{element: null}`
    pub fn leaf(element: impl Into<Element>) -> Self {
        RawEntry::Branch(element.into(), None)
    }

    /// `{element: children}`
    pub fn branch(element: impl Into<Element>, children: Vec<RawEntry>) -> Self {
        RawEntry::Branch(element.into(), Some(children))
    }
}

impl From<Criterion> for RawSpec {
    fn from(criterion: Criterion) -> Self {
        RawSpec::Single(Element::Criterion(criterion))
    }
}

impl From<Element> for RawSpec {
    fn from(element: Element) -> Self {
        RawSpec::Single(element)
    }
}

impl From<Vec<Criterion>> for RawSpec {
    fn from(criteria: Vec<Criterion>) -> Self {
        RawSpec::List(criteria.into_iter().map(RawEntry::node).collect())
    }
}

impl From<Vec<RawEntry>> for RawSpec {
    fn from(entries: Vec<RawEntry>) -> Self {
        RawSpec::List(entries)
    }
}

impl<T: Into<RawSpec>> From<Option<T>> for RawSpec {
    fn from(spec: Option<T>) -> Self {
        spec.map_or(RawSpec::Absent, Into::into)
    }
}

/// One `{criterion: children}` pair; `children == None` means the criterion
/// sits directly above the alternatives.
#[derive(Debug, Clone, PartialEq)]
pub struct CriterionBranch {
    pub criterion: Criterion,
    pub children: Option<Vec<CriterionBranch>>,
}

impl CriterionBranch {
    pub fn leaf(criterion: Criterion) -> Self {
        Self {
            criterion,
            children: None,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }
}

/// Classified criteria spec, decided once at the builder boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum CriteriaSpec {
    /// No criteria: the problem sits directly above the alternatives.
    Leaf,
    /// One flat level of criteria.
    Uniform(Vec<Criterion>),
    /// Explicit nesting.
    Nested(Vec<CriterionBranch>),
}

impl CriteriaSpec {
    /// Flat criteria become leaf branches.
    pub fn into_branches(self) -> Vec<CriterionBranch> {
        match self {
            CriteriaSpec::Leaf => Vec::new(),
            CriteriaSpec::Uniform(criteria) => {
                criteria.into_iter().map(CriterionBranch::leaf).collect()
            }
            CriteriaSpec::Nested(branches) => branches,
        }
    }
}

/// Depth of every root-to-leaf path, counting criterion levels, in spec order.
pub fn leaf_depths(branches: &[CriterionBranch]) -> Vec<usize> {
    fn walk(branch: &CriterionBranch, depth: usize, out: &mut Vec<usize>) {
        match &branch.children {
            None => out.push(depth),
            Some(children) => children.iter().for_each(|c| walk(c, depth + 1, out)),
        }
    }

    let mut depths = Vec::new();
    for branch in branches {
        walk(branch, 1, &mut depths);
    }
    depths
}

/// Criterion keys in pre-order.
pub fn criterion_keys(branches: &[CriterionBranch]) -> Vec<NodeKey> {
    let mut keys = Vec::new();
    let mut stack: Vec<&CriterionBranch> = branches.iter().rev().collect();
    while let Some(branch) = stack.pop() {
        keys.push(branch.criterion.key().clone());
        if let Some(children) = &branch.children {
            stack.extend(children.iter().rev());
        }
    }
    keys
}
