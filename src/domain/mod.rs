//! Domain layer: hierarchy, comparison matrices and priority synthesis
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod arena;
pub mod builder;
pub mod error;
pub mod identity;
pub mod model;
pub mod node;
pub mod pairwise;
pub mod spec;

pub use arena::HierarchyArena;
pub use builder::{CriteriaBuilder, DepthPolicy};
pub use error::{DomainError, DomainResult};
pub use identity::{Alternative, Criterion, Element, IdentityAllocator, NodeKey, Problem};
pub use model::{ConsistencyEntry, Model, ModelBuilder};
pub use node::{HierarchyNode, NodeKind};
pub use pairwise::{PairwiseComparisonMatrix, Tolerance, ACCEPTABLE_CONSISTENCY_RATIO};
pub use spec::{CriteriaSpec, CriterionBranch, RawEntry, RawSpec};
