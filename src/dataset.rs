//! Labeled training samples for the offline fitting procedure.
//!
//! Extracted lines are matched to a ground-truth outline by exact trimmed
//! text. Lines with no match are labeled `Body Text`.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::classify::Role;
use crate::features::{FeatureKey, FeaturedLine, FEATURE_KEYS};
use crate::logging::OUTLINE_CLASSIFY;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GroundTruthEntry {
    pub level: Role,
    pub text: String,
    #[serde(default)]
    pub page: Option<u32>,
}

/// Expected outline of one document, in the same shape the pipeline emits.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GroundTruth {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub outline: Vec<GroundTruthEntry>,
}

impl GroundTruth {
    /// Text → role lookup. Outline entries override a title with the same text.
    pub fn lookup(&self) -> HashMap<String, Role> {
        let mut lookup = HashMap::new();
        if let Some(title) = &self.title {
            lookup.insert(title.trim().to_string(), Role::Title);
        }
        for entry in &self.outline {
            lookup.insert(entry.text.trim().to_string(), entry.level);
        }
        lookup
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabeledSample {
    pub text: String,
    pub page: u32,
    pub features: Vec<f64>,
    pub label: Role,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainingSet {
    pub feature_keys: Vec<FeatureKey>,
    pub samples: Vec<LabeledSample>,
    pub label_distribution: BTreeMap<&'static str, usize>,
}

impl TrainingSet {
    pub fn matched(&self) -> usize {
        self.samples
            .iter()
            .filter(|s| s.label != Role::BodyText)
            .count()
    }
}

pub fn build_training_set(lines: &[FeaturedLine], truth: &GroundTruth) -> TrainingSet {
    let lookup = truth.lookup();
    let samples: Vec<LabeledSample> = lines
        .iter()
        .map(|line| {
            let text = line.text().trim();
            LabeledSample {
                text: text.to_string(),
                page: line.page_number(),
                features: line.features.to_vector(&FEATURE_KEYS),
                label: lookup.get(text).copied().unwrap_or(Role::BodyText),
            }
        })
        .collect();

    let label_distribution = crate::logging::role_histogram(samples.iter().map(|s| &s.label));
    let set = TrainingSet {
        feature_keys: FEATURE_KEYS.to_vec(),
        samples,
        label_distribution,
    };

    let matched = set.matched();
    info!(
        target: OUTLINE_CLASSIFY,
        samples = set.samples.len(),
        matched,
        truth_items = lookup.len(),
        distribution = ?set.label_distribution,
        "Built training set"
    );
    if matched == 0 && !lookup.is_empty() {
        warn!(
            target: OUTLINE_CLASSIFY,
            "No extracted line matched the ground truth exactly"
        );
    }
    set
}
