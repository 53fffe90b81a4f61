use std::collections::{HashSet, VecDeque};

use generational_arena::{Arena, Index};
use tracing::{instrument, trace};

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::identity::NodeKey;
use crate::domain::node::{HierarchyNode, NodeKind};

/// Arena-based storage for one AHP hierarchy.
///
/// Nodes are addressed by generational indices; children lists own the links,
/// parent lists are back-references. An Alternative may have several parents
/// (one per leaf criterion), every other node has at most one.
#[derive(Debug, Default, Clone)]
pub struct HierarchyArena {
    arena: Arena<HierarchyNode>,
    root: Option<Index>,
}

impl HierarchyArena {
    pub fn new() -> Self {
        Self::default()
    }

    #[instrument(level = "trace", skip(self))]
    pub fn insert_node(&mut self, key: NodeKey, kind: NodeKind) -> Index {
        let idx = self.arena.insert(HierarchyNode::new(key, kind));
        if kind == NodeKind::Problem && self.root.is_none() {
            self.root = Some(idx);
        }
        idx
    }

    pub fn get_node(&self, idx: Index) -> Option<&HierarchyNode> {
        self.arena.get(idx)
    }

    pub fn get_node_mut(&mut self, idx: Index) -> Option<&mut HierarchyNode> {
        self.arena.get_mut(idx)
    }

    pub(crate) fn node(&self, idx: Index) -> DomainResult<&HierarchyNode> {
        self.arena
            .get(idx)
            .ok_or_else(|| DomainError::IllegalOperation(format!("stale node handle {idx:?}")))
    }

    pub(crate) fn node_mut(&mut self, idx: Index) -> DomainResult<&mut HierarchyNode> {
        self.arena
            .get_mut(idx)
            .ok_or_else(|| DomainError::IllegalOperation(format!("stale node handle {idx:?}")))
    }

    pub fn root(&self) -> Option<Index> {
        self.root
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    /// Wires `child` below `parent`, enforcing the node-kind rules and acyclicity.
    #[instrument(level = "trace", skip(self))]
    pub fn add_child(&mut self, parent: Index, child: Index) -> DomainResult<()> {
        let parent_node = self.node(parent)?;
        let child_node = self.node(child)?;

        if !parent_node.kind().supports_children() {
            return Err(DomainError::IllegalOperation(format!(
                "{} {} cannot have children",
                parent_node.kind().label(),
                parent_node.key()
            )));
        }
        if !child_node.kind().may_be_child() {
            return Err(DomainError::IllegalOperation(format!(
                "{} {} cannot be a child",
                child_node.kind().label(),
                child_node.key()
            )));
        }
        if parent_node.kind() == NodeKind::Problem {
            let mixes = parent_node.children().iter().any(|&sibling| {
                self.get_node(sibling)
                    .is_some_and(|s| s.kind().is_criterion() != child_node.kind().is_criterion())
            });
            if mixes {
                return Err(DomainError::IllegalOperation(format!(
                    "Problem {} owns either criteria or alternatives, not both",
                    parent_node.key()
                )));
            }
        }
        if parent == child || self.is_ancestor(child, parent) {
            return Err(DomainError::IllegalOperation(format!(
                "adding {} below {} would create a cycle",
                child_node.key(),
                parent_node.key()
            )));
        }
        if parent_node.children().contains(&child) {
            return Err(DomainError::IllegalOperation(format!(
                "{} is already a child of {}",
                child_node.key(),
                parent_node.key()
            )));
        }

        trace!(parent = %parent_node.key(), child = %child_node.key(), "wire");
        self.node_mut(parent)?.children.push(child);
        self.node_mut(child)?.parents.push(parent);
        Ok(())
    }

    /// True if `candidate` is reachable from `node` by following parent links.
    pub fn is_ancestor(&self, candidate: Index, node: Index) -> bool {
        let mut seen = HashSet::new();
        let mut queue: VecDeque<Index> = VecDeque::from([node]);
        while let Some(current) = queue.pop_front() {
            let Some(n) = self.get_node(current) else {
                continue;
            };
            for &parent in n.parents() {
                if parent == candidate {
                    return true;
                }
                if seen.insert(parent) {
                    queue.push_back(parent);
                }
            }
        }
        false
    }

    /// Pre-order walk from the root. Shared Alternatives are yielded once per path.
    pub fn iter(&self) -> TreeIterator<'_> {
        TreeIterator::new(self)
    }

    /// First node in pre-order whose key equals `key`.
    #[instrument(level = "debug", skip(self))]
    pub fn find(&self, key: &NodeKey) -> Option<Index> {
        self.iter()
            .find(|(_, node)| node.key() == key)
            .map(|(idx, _)| idx)
    }

    /// Number of levels from the root to the deepest leaf, root included.
    pub fn depth(&self) -> usize {
        self.root.map_or(0, |root| self.calculate_depth(root))
    }

    fn calculate_depth(&self, node_idx: Index) -> usize {
        self.get_node(node_idx).map_or(0, |node| {
            1 + node
                .children()
                .iter()
                .map(|&child| self.calculate_depth(child))
                .max()
                .unwrap_or(0)
        })
    }
}

impl std::ops::Index<Index> for HierarchyArena {
    type Output = HierarchyNode;

    fn index(&self, idx: Index) -> &Self::Output {
        &self.arena[idx]
    }
}

pub struct TreeIterator<'a> {
    arena: &'a HierarchyArena,
    stack: Vec<Index>,
}

impl<'a> TreeIterator<'a> {
    fn new(arena: &'a HierarchyArena) -> Self {
        let mut stack = Vec::new();
        if let Some(root) = arena.root() {
            stack.push(root);
        }
        Self { arena, stack }
    }
}

impl<'a> Iterator for TreeIterator<'a> {
    type Item = (Index, &'a HierarchyNode);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(current_idx) = self.stack.pop() {
            if let Some(node) = self.arena.get_node(current_idx) {
                // Push children in reverse order for left-to-right traversal
                for &child in node.children().iter().rev() {
                    self.stack.push(child);
                }
                return Some((current_idx, node));
            }
        }
        None
    }
}
