//! Application layer: services and use cases
//!
//! This layer orchestrates domain logic and depends on I/O boundary traits.

pub mod document;
pub mod error;
pub mod error_ext;
pub mod service;

pub use document::{CriterionDoc, MatrixDoc, ModelDocument};
pub use error::{ApplicationError, ApplicationResult};
pub use error_ext::IoResultExt;
pub use service::{DecisionReport, DecisionService};
