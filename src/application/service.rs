//! Decision service
//!
//! Loads model documents, builds models with the configured policy and
//! produces solve and consistency reports.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, instrument, warn};

use crate::application::{ApplicationResult, IoResultExt, ModelDocument};
use crate::config::Settings;
use crate::domain::{ConsistencyEntry, Model, NodeKey};
use crate::infrastructure::traits::FileSystem;

/// Everything `solve` prints for one model.
#[derive(Debug, Clone)]
pub struct DecisionReport {
    pub problem: NodeKey,
    /// Alternatives with global priority, best first.
    pub ranking: Vec<(NodeKey, f64)>,
    pub consistency: Vec<ConsistencyEntry>,
}

impl DecisionReport {
    pub fn inconsistent(&self) -> impl Iterator<Item = &ConsistencyEntry> {
        self.consistency.iter().filter(|entry| !entry.consistent)
    }
}

/// Service for evaluating AHP model documents.
pub struct DecisionService {
    fs: Arc<dyn FileSystem>,
    settings: Arc<Settings>,
}

impl DecisionService {
    pub fn new(fs: Arc<dyn FileSystem>, settings: Arc<Settings>) -> Self {
        Self { fs, settings }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn load_document(&self, path: &Path) -> ApplicationResult<ModelDocument> {
        debug!("load_document: {}", path.display());
        let content = self
            .fs
            .read_to_string(path)
            .with_path_context("read model document", path)?;
        ModelDocument::parse(&content, path)
    }

    pub fn load_model(&self, path: &Path) -> ApplicationResult<Model> {
        let document = self.load_document(path)?;
        document.to_model(self.settings.depth_policy, self.settings.tolerance)
    }

    /// Ranking plus consistency diagnostics.
    #[instrument(level = "debug", skip(self))]
    pub fn solve(&self, path: &Path) -> ApplicationResult<DecisionReport> {
        let model = self.load_model(path)?;
        let report = DecisionReport {
            problem: model.problem().key().clone(),
            ranking: model.ranking()?,
            consistency: self.consistency(&model)?,
        };
        for entry in report.inconsistent() {
            warn!(node = %entry.key, ratio = ?entry.ratio, "judgments are inconsistent");
        }
        Ok(report)
    }

    pub fn check(&self, path: &Path) -> ApplicationResult<Vec<ConsistencyEntry>> {
        let model = self.load_model(path)?;
        self.consistency(&model)
    }

    fn consistency(&self, model: &Model) -> ApplicationResult<Vec<ConsistencyEntry>> {
        Ok(model.consistency_report(self.settings.consistency_threshold)?)
    }
}
