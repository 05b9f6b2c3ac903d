//! Random forest model artifact and its evaluation.
//!
//! The model is a JSON document holding a forest of flat decision trees.  A
//! tree node either splits on one feature (going left if the value is at most
//! the threshold) or is a leaf with one probability per class.

use std::{io::BufReader, path::Path};

use crate::{
    common::Error,
    contexts::{
        schema::{CONTEXTS, SCHEMA_VERSION},
        ContextVector,
    },
    features::FeatureTransform,
};

use super::result::ClassProbabilities;

/// Name of the BRCA1-type class.
pub const CLASS_BRCA1: &str = "BRCA1";
/// Name of the BRCA2-type class.
pub const CLASS_BRCA2: &str = "BRCA2";

/// Aggregation of the per-tree outputs.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    serde::Deserialize,
    serde::Serialize,
    strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Voting {
    /// Fraction of trees voting for each class.
    #[default]
    Majority,
    /// Mean of the leaf probabilities.
    Average,
}

/// One node of a decision tree.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(untagged)]
pub enum Node {
    /// Inner node.
    Split {
        /// Index of the feature.
        feature: usize,
        /// Go to `left` if the feature value is `<= threshold`.
        threshold: f64,
        /// Index of the left child.
        left: usize,
        /// Index of the right child.
        right: usize,
    },
    /// Leaf node.
    Leaf {
        /// One probability per class.
        probs: Vec<f64>,
    },
}

/// A decision tree as a flat node array, rooted at the first node.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(transparent)]
pub struct Tree {
    /// The nodes; children always come after their parent.
    pub nodes: Vec<Node>,
}

impl Tree {
    /// Descend to the leaf for the given feature values.
    ///
    /// Only valid on trees that passed `Tree::validate`.
    fn leaf(&self, values: &[f64]) -> &[f64] {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if values[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
                Node::Leaf { probs } => return probs,
            }
        }
    }

    fn validate(&self, n_features: usize, n_classes: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree without nodes".to_string());
        }
        for (idx, node) in self.nodes.iter().enumerate() {
            match node {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if *feature >= n_features {
                        return Err(format!("node {} splits on unknown feature {}", idx, feature));
                    }
                    if threshold.is_nan() {
                        return Err(format!("node {} has NaN threshold", idx));
                    }
                    for child in [*left, *right] {
                        if child <= idx || child >= self.nodes.len() {
                            return Err(format!("node {} has invalid child {}", idx, child));
                        }
                    }
                }
                Node::Leaf { probs } => {
                    if probs.len() != n_classes {
                        return Err(format!(
                            "leaf {} has {} probabilities, expected {}",
                            idx,
                            probs.len(),
                            n_classes
                        ));
                    }
                }
            }
        }
        Ok(())
    }
}

/// The serialized model artifact.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Forest {
    /// Version of the trained model.
    pub version: String,
    /// Version of the context schema the model was trained on.
    pub schema_version: String,
    /// Feature names, in input order.
    pub features: Vec<String>,
    /// Class names, in leaf probability order.
    pub classes: Vec<String>,
    /// Aggregation of the tree outputs.
    #[serde(default)]
    pub voting: Voting,
    /// Transformation of the counts the model was trained on.
    #[serde(default)]
    pub transform: FeatureTransform,
    /// The trees.
    pub trees: Vec<Tree>,
}

/// Validated random forest model.
#[derive(Debug, Clone)]
pub struct Model {
    /// The underlying forest.
    forest: Forest,
    /// Index of the BRCA1 class.
    idx_brca1: usize,
    /// Index of the BRCA2 class.
    idx_brca2: usize,
}

impl Model {
    /// Validate the given forest against the context schema.
    ///
    /// # Errors
    ///
    /// `Error::SchemaMismatch` if schema version or feature names differ from
    /// the context schema, `Error::InvalidModel` on structural problems.
    pub fn from_forest(forest: Forest) -> Result<Self, Error> {
        if forest.schema_version != SCHEMA_VERSION {
            return Err(Error::SchemaMismatch(format!(
                "model was trained on schema {:?}, expected {:?}",
                &forest.schema_version, SCHEMA_VERSION
            )));
        }
        if forest.features.len() != CONTEXTS.len()
            || forest.features.iter().zip(CONTEXTS).any(|(a, b)| a != b)
        {
            return Err(Error::SchemaMismatch(
                "model features do not match the context schema".to_string(),
            ));
        }

        let class_idx = |name: &str| {
            forest
                .classes
                .iter()
                .position(|class| class == name)
                .ok_or_else(|| Error::InvalidModel(format!("missing class {}", name)))
        };
        let idx_brca1 = class_idx(CLASS_BRCA1)?;
        let idx_brca2 = class_idx(CLASS_BRCA2)?;
        if forest.classes.len() != 3 {
            return Err(Error::InvalidModel(format!(
                "expected BRCA1, BRCA2 and one proficient class, got {:?}",
                &forest.classes
            )));
        }

        if forest.trees.is_empty() {
            return Err(Error::InvalidModel("forest without trees".to_string()));
        }
        for (idx, tree) in forest.trees.iter().enumerate() {
            tree.validate(forest.features.len(), forest.classes.len())
                .map_err(|message| Error::InvalidModel(format!("tree {}: {}", idx, message)))?;
        }

        Ok(Self {
            forest,
            idx_brca1,
            idx_brca2,
        })
    }

    /// Load model from JSON file.
    ///
    /// # Errors
    ///
    /// If anything goes wrong, it returns a generic `anyhow::Error`.
    pub fn load<P>(path: P) -> Result<Self, anyhow::Error>
    where
        P: AsRef<Path>,
    {
        tracing::info!("Loading model from {}", path.as_ref().display());
        let reader = std::fs::File::open(path.as_ref())
            .map_err(|e| anyhow::anyhow!("problem opening {}: {}", path.as_ref().display(), e))
            .map(BufReader::new)?;
        let forest: Forest = serde_json::from_reader(reader).map_err(|e| {
            Error::InvalidModel(format!("cannot parse {}: {}", path.as_ref().display(), e))
        })?;
        let model = Self::from_forest(forest)?;
        tracing::info!(
            "... model version {} with {} trees, {} voting, {} transform",
            &model.forest.version,
            model.forest.trees.len(),
            model.forest.voting,
            model.forest.transform
        );
        Ok(model)
    }

    /// The underlying forest.
    pub fn forest(&self) -> &Forest {
        &self.forest
    }

    /// Class probabilities for already transformed feature values.
    ///
    /// # Returns
    ///
    /// One probability per class, in the order of `Forest::classes`.
    ///
    /// # Errors
    ///
    /// `Error::SchemaMismatch` if there is not exactly one value per feature.
    pub fn predict_proba(&self, values: &[f64]) -> Result<Vec<f64>, Error> {
        if values.len() != self.forest.features.len() {
            return Err(Error::SchemaMismatch(format!(
                "expected {} feature values, got {}",
                self.forest.features.len(),
                values.len()
            )));
        }
        Ok(self.aggregate(values))
    }

    /// Class probabilities of one sample's context counts.
    pub fn predict(&self, contexts: &ContextVector) -> ClassProbabilities {
        // Context vectors and validated models share the schema length.
        let probs = self.aggregate(&self.forest.transform.apply(contexts));
        ClassProbabilities {
            p_brca1: probs[self.idx_brca1],
            p_brca2: probs[self.idx_brca2],
        }
    }

    fn aggregate(&self, values: &[f64]) -> Vec<f64> {
        let n_classes = self.forest.classes.len();
        let n_trees = self.forest.trees.len() as f64;
        let mut result = vec![0.0; n_classes];
        for tree in &self.forest.trees {
            let probs = tree.leaf(values);
            match self.forest.voting {
                Voting::Majority => result[argmax(probs)] += 1.0,
                Voting::Average => {
                    for (acc, prob) in result.iter_mut().zip(probs) {
                        *acc += prob;
                    }
                }
            }
        }
        result.iter_mut().for_each(|value| *value /= n_trees);
        result
    }
}

/// Index of the largest value, the first one on ties.
fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (idx, value) in values.iter().enumerate() {
        if *value > values[best] {
            best = idx;
        }
    }
    best
}
