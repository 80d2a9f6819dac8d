pub mod batch;
pub mod classify;
pub mod config;
pub mod dataset;
pub mod error;
pub mod features;
pub mod fonts;
pub mod layout;
pub mod logging;
pub mod outline;
pub mod parse;

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info_span};

use crate::classify::{classify, ClassifiedLine, ModelStore, RoleModel};
use crate::config::OutlineConfig;
use crate::features::{compute_features, FeaturedLine};
use crate::layout::reconstruct_lines;
use crate::logging::{log_role_distribution, OUTLINE_CLASSIFY};
use crate::parse::{read_document, RawDocument};

pub use crate::classify::Role;
pub use crate::error::{OutlineError, Result};
pub use crate::outline::{DocumentResult, Metadata, OutlineEntry};

/// Lines of a document with their feature records, ready for classification.
pub fn featured_lines(raw: &RawDocument, config: &OutlineConfig) -> Vec<FeaturedLine> {
    let lines = reconstruct_lines(raw, &config.layout);
    compute_features(&lines, &config.features)
}

/// Lines after both classification stages.
pub fn classified_lines(
    raw: &RawDocument,
    model: &dyn RoleModel,
    config: &OutlineConfig,
) -> Result<Vec<ClassifiedLine>> {
    let lines = featured_lines(raw, config);
    let classified = classify(lines, model, &config.heuristics)?;
    log_role_distribution(&classified);
    Ok(classified)
}

/// Recover the outline of one already-read document.
pub fn process_document(
    raw: &RawDocument,
    model: &dyn RoleModel,
    config: &OutlineConfig,
) -> Result<DocumentResult> {
    let classified = classified_lines(raw, model, config)?;
    if classified.is_empty() {
        debug!(target: OUTLINE_CLASSIFY, "No text lines survived extraction");
    }
    Ok(outline::assemble(&classified, &config.heuristics))
}

/// Holds a loaded model and config; cheap to clone and share across threads.
#[derive(Clone)]
pub struct OutlineExtractor {
    model: Arc<dyn RoleModel>,
    config: OutlineConfig,
}

impl OutlineExtractor {
    pub fn new(model: Arc<dyn RoleModel>, config: OutlineConfig) -> Self {
        OutlineExtractor { model, config }
    }

    /// Load the model artifacts from `dir`.
    pub fn from_model_dir<P: AsRef<Path>>(dir: P, config: OutlineConfig) -> Result<Self> {
        let model = ModelStore::new(dir.as_ref()).load()?;
        Ok(Self::new(Arc::new(model), config))
    }

    pub fn read(&self, pdf_bytes: &[u8]) -> Result<RawDocument> {
        read_document(pdf_bytes, &self.config.layout)
    }

    pub fn extract_bytes(&self, pdf_bytes: &[u8]) -> Result<DocumentResult> {
        let _span = info_span!("extract_outline", bytes = pdf_bytes.len()).entered();
        let raw = self.read(pdf_bytes)?;
        self.process(&raw)
    }

    pub fn extract_path<P: AsRef<Path>>(&self, path: P) -> Result<DocumentResult> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| {
            OutlineError::Extraction(format!("Failed to open PDF {}: {}", path.display(), e))
        })?;
        self.extract_bytes(&bytes)
    }

    pub fn process(&self, raw: &RawDocument) -> Result<DocumentResult> {
        process_document(raw, self.model.as_ref(), &self.config)
    }
}
