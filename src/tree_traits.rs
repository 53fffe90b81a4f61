//! termtree rendering of a hierarchy.

use generational_arena::Index;
use termtree::Tree;
use tracing::instrument;

use crate::domain::{HierarchyArena, HierarchyNode, Model, NodeKind};

pub trait TreeNodeConvert {
    fn to_tree_string(&self) -> Tree<String>;
}

fn label(node: &HierarchyNode) -> String {
    match node.kind() {
        NodeKind::Alternative => format!("{} [alternative]", node.key()),
        NodeKind::DummyCriterion => format!("{} [placeholder]", node.key()),
        _ => node.key().to_string(),
    }
}

impl TreeNodeConvert for HierarchyArena {
    #[instrument(level = "debug", skip(self))]
    fn to_tree_string(&self) -> Tree<String> {
        fn build_tree(arena: &HierarchyArena, node_idx: Index, parent_tree: &mut Tree<String>) {
            if let Some(node) = arena.get_node(node_idx) {
                for &child_idx in node.children() {
                    if let Some(child) = arena.get_node(child_idx) {
                        let mut child_tree = Tree::new(label(child));
                        build_tree(arena, child_idx, &mut child_tree);
                        parent_tree.push(child_tree);
                    }
                }
            }
        }

        match self.root().and_then(|idx| self.get_node(idx).map(|node| (idx, node))) {
            Some((root_idx, root)) => {
                let mut tree = Tree::new(label(root));
                build_tree(self, root_idx, &mut tree);
                tree
            }
            None => Tree::new("Empty hierarchy".to_string()),
        }
    }
}

impl TreeNodeConvert for Model {
    fn to_tree_string(&self) -> Tree<String> {
        self.arena().to_tree_string()
    }
}
