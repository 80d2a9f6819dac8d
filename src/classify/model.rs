//! The learned stage and the artifacts it is loaded from.
//!
//! The classifier is opaque to the rest of the pipeline: anything that maps a
//! numeric feature vector to a [`Role`] can stand in for it. The bundled
//! implementation evaluates a random forest exported by the offline training
//! procedure as three JSON artifacts.

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::classify::Role;
use crate::error::{OutlineError, Result};
use crate::features::FeatureKey;
use crate::logging::OUTLINE_CLASSIFY;

pub const MODEL_FILE: &str = "heading_model.json";
pub const ENCODER_FILE: &str = "label_encoder.json";
pub const FEATURE_KEYS_FILE: &str = "feature_keys.json";

/// A pre-fit classifier used for read-only inference.
///
/// Implementations must be deterministic and safe to share across threads.
pub trait RoleModel: Send + Sync {
    /// Order in which the model expects feature values.
    fn feature_keys(&self) -> &[FeatureKey];

    fn predict(&self, features: &[f64]) -> Result<Role>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    /// Go `left` when `features[feature] <= threshold`, `right` otherwise.
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        class: usize,
    },
}

/// Nodes stored flat; node 0 is the root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    pub nodes: Vec<TreeNode>,
}

impl DecisionTree {
    pub fn predict(&self, features: &[f64]) -> Result<usize> {
        let mut idx = 0;
        // A well-formed tree reaches a leaf in fewer steps than it has nodes.
        for _ in 0..self.nodes.len() {
            match self.nodes.get(idx) {
                Some(TreeNode::Leaf { class }) => return Ok(*class),
                Some(TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    let value = features.get(*feature).ok_or_else(|| {
                        OutlineError::Model(format!("split on missing feature {}", feature))
                    })?;
                    idx = if *value <= *threshold { *left } else { *right };
                }
                None => {
                    return Err(OutlineError::Model(format!("tree node {} out of range", idx)));
                }
            }
        }
        Err(OutlineError::Model("tree contains a cycle".to_string()))
    }

    fn validate(&self, n_features: usize, n_classes: usize) -> Result<()> {
        if self.nodes.is_empty() {
            return Err(OutlineError::Model("empty decision tree".to_string()));
        }
        for node in &self.nodes {
            match node {
                TreeNode::Split {
                    feature,
                    left,
                    right,
                    ..
                } => {
                    if *feature >= n_features {
                        return Err(OutlineError::Model(format!(
                            "split feature {} exceeds {} features",
                            feature, n_features
                        )));
                    }
                    if *left >= self.nodes.len() || *right >= self.nodes.len() {
                        return Err(OutlineError::Model("child index out of range".to_string()));
                    }
                }
                TreeNode::Leaf { class } => {
                    if *class >= n_classes {
                        return Err(OutlineError::Model(format!(
                            "leaf class {} exceeds {} classes",
                            class, n_classes
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

/// Majority vote over decision trees; ties go to the lowest class code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    pub n_classes: usize,
    pub trees: Vec<DecisionTree>,
}

impl RandomForest {
    pub fn predict(&self, features: &[f64]) -> Result<usize> {
        let mut votes = vec![0usize; self.n_classes];
        for tree in &self.trees {
            let class = tree.predict(features)?;
            let slot = votes
                .get_mut(class)
                .ok_or_else(|| OutlineError::Model(format!("class {} out of range", class)))?;
            *slot += 1;
        }
        votes
            .iter()
            .enumerate()
            .fold(None, |best: Option<(usize, usize)>, (class, &count)| match best {
                Some((_, best_count)) if best_count >= count => best,
                _ => Some((class, count)),
            })
            .map(|(class, _)| class)
            .ok_or_else(|| OutlineError::Model("forest has no classes".to_string()))
    }
}

/// Bidirectional mapping between role labels and class codes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelEncoder {
    pub classes: Vec<String>,
}

impl LabelEncoder {
    pub fn from_roles(roles: &[Role]) -> Self {
        let mut labels: Vec<String> = roles.iter().map(|r| r.label().to_string()).collect();
        labels.sort();
        labels.dedup();
        LabelEncoder { classes: labels }
    }

    pub fn decode(&self, code: usize) -> Result<Role> {
        self.classes
            .get(code)
            .ok_or_else(|| OutlineError::Model(format!("class code {} has no label", code)))?
            .parse()
    }

    pub fn encode(&self, role: Role) -> Option<usize> {
        self.classes.iter().position(|label| {
            label
                .parse::<Role>()
                .map(|r| r == role)
                .unwrap_or(false)
        })
    }
}

/// Random forest plus its label encoder and feature order.
#[derive(Debug, Clone)]
pub struct ForestModel {
    forest: RandomForest,
    encoder: LabelEncoder,
    feature_keys: Vec<FeatureKey>,
}

impl ForestModel {
    pub fn new(
        forest: RandomForest,
        encoder: LabelEncoder,
        feature_keys: Vec<FeatureKey>,
    ) -> Result<Self> {
        if forest.trees.is_empty() {
            return Err(OutlineError::Model("forest has no trees".to_string()));
        }
        if forest.n_classes != encoder.classes.len() {
            return Err(OutlineError::Model(format!(
                "forest has {} classes but the encoder has {}",
                forest.n_classes,
                encoder.classes.len()
            )));
        }
        for label in &encoder.classes {
            label.parse::<Role>()?;
        }
        for tree in &forest.trees {
            tree.validate(feature_keys.len(), forest.n_classes)?;
        }
        Ok(ForestModel {
            forest,
            encoder,
            feature_keys,
        })
    }

    pub fn forest(&self) -> &RandomForest {
        &self.forest
    }

    pub fn encoder(&self) -> &LabelEncoder {
        &self.encoder
    }
}

impl RoleModel for ForestModel {
    fn feature_keys(&self) -> &[FeatureKey] {
        &self.feature_keys
    }

    fn predict(&self, features: &[f64]) -> Result<Role> {
        if features.len() != self.feature_keys.len() {
            return Err(OutlineError::Model(format!(
                "expected {} features, got {}",
                self.feature_keys.len(),
                features.len()
            )));
        }
        let code = self.forest.predict(features)?;
        self.encoder.decode(code)
    }
}

/// Directory holding the three model artifacts.
#[derive(Debug, Clone)]
pub struct ModelStore {
    dir: PathBuf,
}

impl ModelStore {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        ModelStore { dir: dir.into() }
    }

    fn artifact_paths(&self) -> [PathBuf; 3] {
        [
            self.dir.join(MODEL_FILE),
            self.dir.join(ENCODER_FILE),
            self.dir.join(FEATURE_KEYS_FILE),
        ]
    }

    /// First missing artifact, if any.
    pub fn missing_artifact(&self) -> Option<PathBuf> {
        self.artifact_paths().into_iter().find(|p| !p.is_file())
    }

    pub fn load(&self) -> Result<ForestModel> {
        if let Some(missing) = self.missing_artifact() {
            return Err(OutlineError::MissingModel(missing));
        }
        let [model_path, encoder_path, keys_path] = self.artifact_paths();
        let forest: RandomForest = read_artifact(&model_path)?;
        let encoder: LabelEncoder = read_artifact(&encoder_path)?;
        let feature_keys: Vec<FeatureKey> = read_artifact(&keys_path)?;

        let model = ForestModel::new(forest, encoder, feature_keys)?;
        info!(
            target: OUTLINE_CLASSIFY,
            dir = %self.dir.display(),
            trees = model.forest.trees.len(),
            classes = ?model.encoder.classes,
            "Loaded heading model"
        );
        Ok(model)
    }

    pub fn save(&self, model: &ForestModel) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let [model_path, encoder_path, keys_path] = self.artifact_paths();
        fs::write(model_path, serde_json::to_vec_pretty(&model.forest)?)?;
        fs::write(encoder_path, serde_json::to_vec_pretty(&model.encoder)?)?;
        fs::write(keys_path, serde_json::to_vec_pretty(&model.feature_keys)?)?;
        Ok(())
    }
}

fn read_artifact<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = fs::read(path)?;
    serde_json::from_slice(&raw)
        .map_err(|e| OutlineError::Model(format!("failed to load {}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FEATURE_KEYS;

    fn leaf(class: usize) -> DecisionTree {
        DecisionTree {
            nodes: vec![TreeNode::Leaf { class }],
        }
    }

    /// Bold lines (feature 1) go to class 1, everything else to class 0.
    fn bold_stump() -> DecisionTree {
        DecisionTree {
            nodes: vec![
                TreeNode::Split {
                    feature: 1,
                    threshold: 0.5,
                    left: 1,
                    right: 2,
                },
                TreeNode::Leaf { class: 0 },
                TreeNode::Leaf { class: 1 },
            ],
        }
    }

    fn encoder() -> LabelEncoder {
        LabelEncoder::from_roles(&[Role::BodyText, Role::H1])
    }

    #[test]
    fn encoder_sorts_labels() {
        let enc = LabelEncoder::from_roles(&[Role::H2, Role::BodyText, Role::Title, Role::H2]);
        assert_eq!(enc.classes, vec!["Body Text", "H2", "Title"]);
        assert_eq!(enc.encode(Role::Title), Some(2));
        assert_eq!(enc.encode(Role::H4), None);
        assert_eq!(enc.decode(1).unwrap(), Role::H2);
        assert!(enc.decode(3).is_err());
    }

    #[test]
    fn forest_majority_vote() {
        let forest = RandomForest {
            n_classes: 2,
            trees: vec![bold_stump(), bold_stump(), leaf(0)],
        };
        let model = ForestModel::new(forest, encoder(), FEATURE_KEYS.to_vec()).unwrap();
        let mut bold = vec![0.0; 13];
        bold[1] = 1.0;
        assert_eq!(model.predict(&bold).unwrap(), Role::H1);
        assert_eq!(model.predict(&[0.0; 13]).unwrap(), Role::BodyText);
    }

    #[test]
    fn ties_go_to_lowest_code() {
        let forest = RandomForest {
            n_classes: 2,
            trees: vec![leaf(1), leaf(0)],
        };
        assert_eq!(forest.predict(&[]).unwrap(), 0);
    }

    #[test]
    fn rejects_wrong_vector_length() {
        let forest = RandomForest {
            n_classes: 2,
            trees: vec![leaf(0)],
        };
        let model = ForestModel::new(forest, encoder(), FEATURE_KEYS.to_vec()).unwrap();
        assert!(matches!(model.predict(&[1.0, 2.0]), Err(OutlineError::Model(_))));
    }

    #[test]
    fn rejects_malformed_trees() {
        let bad_feature = RandomForest {
            n_classes: 2,
            trees: vec![bold_stump()],
        };
        assert!(ForestModel::new(bad_feature, encoder(), vec![FeatureKey::SizeRatio]).is_err());

        let bad_class = RandomForest {
            n_classes: 2,
            trees: vec![leaf(5)],
        };
        assert!(ForestModel::new(bad_class, encoder(), FEATURE_KEYS.to_vec()).is_err());

        let cyclic = DecisionTree {
            nodes: vec![TreeNode::Split {
                feature: 0,
                threshold: 0.0,
                left: 0,
                right: 0,
            }],
        };
        assert!(cyclic.predict(&[1.0]).is_err());
    }

    #[test]
    fn tree_nodes_deserialize_untagged() {
        let tree: DecisionTree = serde_json::from_str(
            r#"{"nodes": [
                {"feature": 0, "threshold": 1.2, "left": 1, "right": 2},
                {"class": 0},
                {"class": 1}
            ]}"#,
        )
        .unwrap();
        assert_eq!(tree.predict(&[1.5]).unwrap(), 1);
        assert_eq!(tree.predict(&[1.0]).unwrap(), 0);
    }

    #[test]
    fn store_round_trips_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let store = ModelStore::new(dir.path());
        assert!(matches!(store.load(), Err(OutlineError::MissingModel(_))));

        let forest = RandomForest {
            n_classes: 2,
            trees: vec![bold_stump()],
        };
        let model = ForestModel::new(forest, encoder(), FEATURE_KEYS.to_vec()).unwrap();
        store.save(&model).unwrap();
        assert!(store.missing_artifact().is_none());

        let loaded = store.load().unwrap();
        assert_eq!(loaded.feature_keys(), &FEATURE_KEYS[..]);
        assert_eq!(loaded.forest(), model.forest());
    }

    #[test]
    fn store_reports_corrupt_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let store = ModelStore::new(dir.path());
        fs::write(dir.path().join(MODEL_FILE), "not json").unwrap();
        fs::write(dir.path().join(ENCODER_FILE), r#"{"classes": ["Body Text"]}"#).unwrap();
        fs::write(dir.path().join(FEATURE_KEYS_FILE), r#"["size_ratio"]"#).unwrap();
        assert!(matches!(store.load(), Err(OutlineError::Model(_))));
    }
}
