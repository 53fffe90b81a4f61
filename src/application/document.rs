//! TOML model documents
//!
//! ```toml
//! problem = "Choose a car"
//! alternatives = ["civic", "accord"]
//!
//! [[criteria]]
//! name = "cost"
//!
//! [[criteria]]
//! name = "comfort"
//!
//! [[matrices]]
//! node = ["Choose a car", 0]
//! values = [[1, 3], [0.3333333333, 1]]
//! ```
//!
//! Identities are allocated in document order: the problem, criteria in
//! pre-order, then alternatives. Matrix nodes refer to those identities either
//! as a `["name", id]` pair or as a `"name#id"` string.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::{
    DepthPolicy, DomainError, IdentityAllocator, Model, NodeKey, RawEntry, RawSpec, Tolerance,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelDocument {
    pub problem: String,
    pub alternatives: Vec<String>,
    /// Overrides the configured depth policy for this document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth_policy: Option<DepthPolicy>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub criteria: Vec<CriterionDoc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub matrices: Vec<MatrixDoc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CriterionDoc {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<CriterionDoc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MatrixDoc {
    /// `["name", id]` or `"name#id"`
    pub node: toml::Value,
    pub values: Vec<Vec<f64>>,
}

/// Accepts `["name", id]` and `"name#id"`; every other shape is a bad key.
impl TryFrom<&toml::Value> for NodeKey {
    type Error = DomainError;

    fn try_from(value: &toml::Value) -> Result<Self, Self::Error> {
        match value {
            toml::Value::String(key) => key.parse(),
            toml::Value::Array(pair) => match pair.as_slice() {
                [toml::Value::String(name), toml::Value::Integer(id)] if !name.is_empty() => {
                    let id = u64::try_from(*id)
                        .map_err(|_| DomainError::BadKey(value.to_string()))?;
                    Ok(NodeKey::new(name.clone(), id))
                }
                _ => Err(DomainError::BadKey(value.to_string())),
            },
            other => Err(DomainError::BadKey(other.to_string())),
        }
    }
}

impl ModelDocument {
    /// Parse a document; `path` is only used for error messages.
    pub fn parse(content: &str, path: &Path) -> ApplicationResult<Self> {
        toml::from_str(content).map_err(|e| ApplicationError::Document {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    pub fn to_toml(&self) -> ApplicationResult<String> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::OperationFailed {
            context: "serialize model document".to_string(),
            source: Box::new(e),
        })
    }

    /// Builds the model and attaches every matrix in document order.
    ///
    /// `policy` applies unless the document carries its own.
    #[instrument(level = "debug", skip(self), fields(problem = %self.problem))]
    pub fn to_model(&self, policy: DepthPolicy, tolerance: Tolerance) -> ApplicationResult<Model> {
        let mut ids = IdentityAllocator::new();
        let problem = ids.problem(self.problem.clone());
        let criteria = if self.criteria.is_empty() {
            RawSpec::Absent
        } else {
            RawSpec::List(raw_entries(&self.criteria, &mut ids))
        };
        let alternatives: Vec<_> = self
            .alternatives
            .iter()
            .map(|name| ids.alternative(name.clone()))
            .collect();

        let mut model = Model::builder(problem)
            .criteria(criteria)
            .alternatives(alternatives)
            .depth_policy(self.depth_policy.unwrap_or(policy))
            .tolerance(tolerance)
            .build(&mut ids)?;

        for matrix in &self.matrices {
            let key = NodeKey::try_from(&matrix.node)?;
            model.attach_comparison_matrix(&key, &matrix.values)?;
        }
        debug!(matrices = self.matrices.len(), "document applied");
        Ok(model)
    }
}

fn raw_entries(docs: &[CriterionDoc], ids: &mut IdentityAllocator) -> Vec<RawEntry> {
    docs.iter()
        .map(|doc| {
            let criterion = ids.criterion(doc.name.clone());
            match &doc.children {
                None => RawEntry::leaf(criterion),
                Some(children) => RawEntry::branch(criterion, raw_entries(children, ids)),
            }
        })
        .collect()
}
