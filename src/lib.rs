//! Analytic Hierarchy Process: build a criteria hierarchy over a set of
//! alternatives, attach pairwise comparison matrices and synthesize global
//! priorities.

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod tree_traits;
pub mod util;

pub use domain::{DepthPolicy, DomainError, DomainResult, IdentityAllocator, Model, NodeKey};
