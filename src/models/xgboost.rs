//! Native evaluator for XGBoost JSON models.
//!
//! Parses the subset of the XGBoost JSON schema needed for tree prediction
//! (`gbtree` and `dart` boosters with a logistic objective) and compiles it
//! into flat node arrays that are walked without allocation.

use crate::error::{Result, RiskError};
use crate::models::RiskModel;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use serde_with::{serde_as, DisplayFromStr};
use std::path::Path;

// --- JSON schema ----------------------------------------------------------------

/// base_score can be a number, a numeric string, an array, or a bracketed
/// string such as "[5E-1]".
fn deserialize_base_score<'de, D>(deserializer: D) -> std::result::Result<f32, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    let mut current = Value::deserialize(deserializer)?;
    loop {
        match current {
            Value::Number(n) => {
                return n
                    .as_f64()
                    .map(|f| f as f32)
                    .ok_or_else(|| Error::custom("invalid base_score number"));
            }
            Value::String(s) => {
                let trimmed = s.trim();
                let inner = trimmed
                    .strip_prefix('[')
                    .and_then(|rest| rest.strip_suffix(']'))
                    .unwrap_or(trimmed);
                return inner
                    .split(',')
                    .next()
                    .and_then(|first| first.trim().parse::<f32>().ok())
                    .ok_or_else(|| Error::custom(format!("cannot parse base_score from {:?}", s)));
            }
            Value::Array(values) => {
                current = values
                    .into_iter()
                    .next()
                    .ok_or_else(|| Error::custom("empty base_score array"))?;
            }
            _ => return Err(Error::custom("base_score must be number, string, or array")),
        }
    }
}

/// default_left is written as 0/1 integers by recent releases and as
/// booleans by older ones.
fn deserialize_flags<'de, D>(deserializer: D) -> std::result::Result<Vec<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    Vec::<Value>::deserialize(deserializer)?
        .into_iter()
        .map(|value| match value {
            Value::Bool(b) => Ok(b),
            Value::Number(n) => Ok(n.as_f64().map(|f| f != 0.0).unwrap_or(false)),
            other => Err(Error::custom(format!("invalid flag {}", other))),
        })
        .collect()
}

#[serde_as]
#[derive(Debug, Clone, Deserialize)]
struct TreeParam {
    #[serde_as(as = "DisplayFromStr")]
    num_nodes: usize,
}

#[derive(Debug, Clone, Deserialize)]
struct JsonTree {
    tree_param: TreeParam,
    left_children: Vec<i32>,
    right_children: Vec<i32>,
    split_indices: Vec<i32>,
    split_conditions: Vec<f32>,
    #[serde(default, deserialize_with = "deserialize_flags")]
    default_left: Vec<bool>,
    #[serde(default)]
    split_type: Vec<i32>,
}

#[derive(Debug, Clone, Deserialize)]
struct ModelTrees {
    trees: Vec<JsonTree>,
    #[serde(default)]
    tree_info: Vec<i32>,
}

#[derive(Debug, Clone, Deserialize)]
struct GbTreeDefinition {
    model: ModelTrees,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "name", rename_all = "lowercase")]
enum GradientBooster {
    Gbtree {
        model: ModelTrees,
    },
    Gblinear {},
    Dart {
        gbtree: GbTreeDefinition,
        weight_drop: Vec<f32>,
    },
}

#[derive(Debug, Clone, Deserialize)]
struct Objective {
    name: String,
}

#[serde_as]
#[derive(Debug, Clone, Deserialize)]
struct LearnerModelParam {
    #[serde(deserialize_with = "deserialize_base_score")]
    base_score: f32,
    #[serde_as(as = "DisplayFromStr")]
    num_feature: usize,
}

#[derive(Debug, Clone, Deserialize)]
struct Learner {
    #[serde(default)]
    feature_names: Vec<String>,
    gradient_booster: GradientBooster,
    objective: Objective,
    learner_model_param: LearnerModelParam,
}

#[derive(Debug, Clone, Deserialize)]
struct XgbJson {
    learner: Learner,
}

// --- Compiled forest ------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
enum Node {
    Split {
        feature: usize,
        threshold: f32,
        default_left: bool,
        left: usize,
        right: usize,
    },
    Leaf(f32),
}

#[derive(Debug, Clone)]
struct CompiledTree {
    nodes: Vec<Node>,
}

impl CompiledTree {
    fn compile(tree: &JsonTree, tree_idx: usize, num_feature: usize) -> std::result::Result<Self, String> {
        let num_nodes = tree.tree_param.num_nodes;
        if num_nodes == 0 {
            return Err(format!("tree {} has no nodes", tree_idx));
        }
        let arrays = [
            tree.left_children.len(),
            tree.right_children.len(),
            tree.split_indices.len(),
            tree.split_conditions.len(),
        ];
        if arrays.iter().any(|len| *len != num_nodes) {
            return Err(format!(
                "tree {} declares {} nodes but node arrays have lengths {:?}",
                tree_idx, num_nodes, arrays
            ));
        }

        let mut nodes = Vec::with_capacity(num_nodes);
        for idx in 0..num_nodes {
            let left = tree.left_children[idx];
            if left == -1 {
                nodes.push(Node::Leaf(tree.split_conditions[idx]));
                continue;
            }

            if tree.split_type.get(idx).copied().unwrap_or(0) != 0 {
                return Err(format!(
                    "tree {} node {} uses a categorical split, which is not supported",
                    tree_idx, idx
                ));
            }
            let right = tree.right_children[idx];
            // Children always follow their parent, which also rules out cycles.
            for child in [left, right] {
                if child <= idx as i32 || child as usize >= num_nodes {
                    return Err(format!(
                        "tree {} node {} references child {} but tree has {} nodes",
                        tree_idx, idx, child, num_nodes
                    ));
                }
            }
            let feature = tree.split_indices[idx];
            if feature < 0 || feature as usize >= num_feature {
                return Err(format!(
                    "tree {} node {} splits on feature {} but model has {} features",
                    tree_idx, idx, feature, num_feature
                ));
            }

            nodes.push(Node::Split {
                feature: feature as usize,
                threshold: tree.split_conditions[idx],
                default_left: tree.default_left.get(idx).copied().unwrap_or(true),
                left: left as usize,
                right: right as usize,
            });
        }

        Ok(Self { nodes })
    }

    fn leaf_value(&self, features: &[f32]) -> f32 {
        let mut idx = 0;
        loop {
            match self.nodes[idx] {
                Node::Leaf(value) => return value,
                Node::Split {
                    feature,
                    threshold,
                    default_left,
                    left,
                    right,
                } => {
                    let x = features[feature];
                    let go_left = if x.is_nan() { default_left } else { x < threshold };
                    idx = if go_left { left } else { right };
                }
            }
        }
    }
}

fn sigmoid(margin: f32) -> f32 {
    1.0 / (1.0 + (-margin).exp())
}

/// Convert a probability-space base_score into margin space.
fn logit(p: f32) -> f32 {
    let p = p.clamp(1e-7, 1.0 - 1e-7);
    (p / (1.0 - p)).ln()
}

/// Binary tree ensemble loaded from an XGBoost JSON artifact
#[derive(Debug, Clone)]
pub struct XgbForest {
    name: String,
    trees: Vec<CompiledTree>,
    tree_weights: Vec<f32>,
    base_margin: f32,
    num_features: usize,
    feature_names: Option<Vec<String>>,
}

impl XgbForest {
    /// Load and compile a model file.
    ///
    /// # Errors
    /// Returns `ModelLoad` if the file is missing, is not valid XGBoost JSON,
    /// or describes a model this evaluator cannot score.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| RiskError::model_load(path, e))?;
        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "xgboost".to_string());
        Self::from_slice(&name, &bytes).map_err(|e| match e {
            RiskError::ModelLoad { reason, .. } => RiskError::model_load(path, reason),
            other => other,
        })
    }

    /// Parse and compile a model from JSON bytes.
    pub fn from_slice(name: &str, bytes: &[u8]) -> Result<Self> {
        let model: XgbJson =
            serde_json::from_slice(bytes).map_err(|e| RiskError::model_load(name, e))?;
        Self::compile(name, model.learner).map_err(|reason| RiskError::model_load(name, reason))
    }

    fn compile(name: &str, learner: Learner) -> std::result::Result<Self, String> {
        // logitraw stores base_score in margin space already
        let margin_base_score = match learner.objective.name.as_str() {
            "binary:logistic" | "reg:logistic" => false,
            "binary:logitraw" => true,
            other => {
                return Err(format!(
                    "objective {} does not produce a binary probability",
                    other
                ))
            }
        };

        let (model_trees, weight_drop) = match learner.gradient_booster {
            GradientBooster::Gbtree { model } => (model, None),
            GradientBooster::Dart {
                gbtree,
                weight_drop,
            } => (gbtree.model, Some(weight_drop)),
            GradientBooster::Gblinear {} => {
                return Err("gblinear models are not supported for tree prediction".to_string())
            }
        };

        if model_trees.tree_info.iter().any(|group| *group != 0) {
            return Err("multi-output models are not supported".to_string());
        }

        let num_features = learner.learner_model_param.num_feature;
        let trees = model_trees
            .trees
            .iter()
            .enumerate()
            .map(|(idx, tree)| CompiledTree::compile(tree, idx, num_features))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let tree_weights = match weight_drop {
            Some(weights) if weights.len() != trees.len() => {
                return Err(format!(
                    "dart model has {} trees but {} weights",
                    trees.len(),
                    weights.len()
                ))
            }
            Some(weights) => weights,
            None => vec![1.0; trees.len()],
        };

        let base_score = learner.learner_model_param.base_score;
        let feature_names = if learner.feature_names.is_empty() {
            None
        } else {
            Some(learner.feature_names)
        };

        Ok(Self {
            name: name.to_string(),
            trees,
            tree_weights,
            base_margin: if margin_base_score {
                base_score
            } else {
                logit(base_score)
            },
            num_features,
            feature_names,
        })
    }

    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }

    /// Raw margin before the logistic link; `features` must hold
    /// `num_features` values.
    fn margin(&self, features: &[f32]) -> f32 {
        self.trees
            .iter()
            .zip(&self.tree_weights)
            .fold(self.base_margin, |acc, (tree, weight)| {
                acc + tree.leaf_value(features) * weight
            })
    }
}

impl RiskModel for XgbForest {
    fn name(&self) -> &str {
        &self.name
    }

    fn num_features(&self) -> Option<usize> {
        Some(self.num_features)
    }

    fn feature_names(&self) -> Option<&[String]> {
        self.feature_names.as_deref()
    }

    fn predict_proba(&self, features: &[f32]) -> Result<f64> {
        if features.len() != self.num_features {
            return Err(RiskError::SchemaMismatch(format!(
                "model {} expects {} features, got {}",
                self.name,
                self.num_features,
                features.len()
            )));
        }
        Ok(sigmoid(self.margin(features)) as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn stump_model(objective: &str, base_score: Value) -> Value {
        json!({
            "version": [2, 0, 3],
            "learner": {
                "feature_names": ["a", "b"],
                "gradient_booster": {
                    "name": "gbtree",
                    "model": {
                        "gbtree_model_param": { "num_trees": "2", "num_parallel_tree": "1" },
                        "tree_info": [0, 0],
                        "trees": [
                            {
                                "id": 0,
                                "tree_param": { "num_nodes": "3", "num_feature": "2", "size_leaf_vector": "1", "num_deleted": "0" },
                                "left_children": [1, -1, -1],
                                "right_children": [2, -1, -1],
                                "split_indices": [0, 0, 0],
                                "split_conditions": [5.0, -0.4, 0.6],
                                "default_left": [1, 0, 0],
                                "split_type": [0, 0, 0],
                                "base_weights": [0.0, -0.8, 1.2]
                            },
                            {
                                "id": 1,
                                "tree_param": { "num_nodes": "3", "num_feature": "2", "size_leaf_vector": "1", "num_deleted": "0" },
                                "left_children": [1, -1, -1],
                                "right_children": [2, -1, -1],
                                "split_indices": [1, 0, 0],
                                "split_conditions": [1.0, 0.1, -0.2],
                                "default_left": [0, 0, 0],
                                "split_type": [0, 0, 0],
                                "base_weights": [0.0, 0.2, -0.4]
                            }
                        ]
                    }
                },
                "objective": { "name": objective, "reg_loss_param": { "scale_pos_weight": "1" } },
                "learner_model_param": {
                    "base_score": base_score,
                    "num_class": "0",
                    "num_feature": "2",
                    "num_target": "1",
                    "boost_from_average": "1"
                }
            }
        })
    }

    fn load(value: Value) -> Result<XgbForest> {
        XgbForest::from_slice("stump", &serde_json::to_vec(&value).unwrap())
    }

    #[test]
    fn test_margin_sums_leaves() {
        let forest = load(stump_model("binary:logistic", json!("5E-1"))).unwrap();
        assert_eq!(forest.num_trees(), 2);

        // a < 5 -> -0.4, b >= 1 -> -0.2
        assert!((forest.margin(&[1.0, 3.0]) - (-0.6)).abs() < 1e-6);
        // a >= 5 -> 0.6, b < 1 -> 0.1
        assert!((forest.margin(&[9.0, 0.0]) - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_split_threshold_is_strict() {
        let forest = load(stump_model("binary:logistic", json!(0.5))).unwrap();
        // a == 5 goes right
        assert!((forest.margin(&[5.0, 0.0]) - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_missing_value_follows_default_direction() {
        let forest = load(stump_model("binary:logistic", json!(0.5))).unwrap();
        // tree 0 defaults left (-0.4), tree 1 defaults right (-0.2)
        assert!((forest.margin(&[f32::NAN, f32::NAN]) - (-0.6)).abs() < 1e-6);
    }

    #[test]
    fn test_probability_applies_base_score_and_sigmoid() {
        let forest = load(stump_model("binary:logistic", json!("[5E-1]"))).unwrap();
        let p = forest.predict_proba(&[9.0, 0.0]).unwrap();
        let expected = 1.0 / (1.0 + (-0.7f64).exp());
        assert!((p - expected).abs() < 1e-5);

        let shifted = load(stump_model("binary:logistic", json!([0.75]))).unwrap();
        let p = shifted.predict_proba(&[9.0, 0.0]).unwrap();
        let expected = 1.0 / (1.0 + (-(0.7 + 3f64.ln())).exp());
        assert!((p - expected).abs() < 1e-5);
    }

    #[test]
    fn test_logitraw_base_score_is_already_a_margin() {
        let forest = load(stump_model("binary:logitraw", json!(0.5))).unwrap();
        assert!((forest.margin(&[9.0, 0.0]) - 1.2).abs() < 1e-6);
    }

    #[test]
    fn test_feature_metadata() {
        let forest = load(stump_model("binary:logistic", json!(0.5))).unwrap();
        assert_eq!(forest.num_features(), Some(2));
        assert_eq!(
            forest.feature_names(),
            Some(&["a".to_string(), "b".to_string()][..])
        );
    }

    #[test]
    fn test_wrong_feature_count_is_schema_mismatch() {
        let forest = load(stump_model("binary:logistic", json!(0.5))).unwrap();
        let err = forest.predict_proba(&[1.0]).unwrap_err();
        assert!(matches!(err, RiskError::SchemaMismatch(_)));
    }

    #[test]
    fn test_non_binary_objective_is_rejected() {
        let err = load(stump_model("multi:softprob", json!(0.5))).unwrap_err();
        assert!(matches!(err, RiskError::ModelLoad { .. }));
    }

    #[test]
    fn test_gblinear_is_rejected() {
        let mut model = stump_model("binary:logistic", json!(0.5));
        model["learner"]["gradient_booster"] = json!({
            "name": "gblinear",
            "model": { "weights": [0.1, 0.2, 0.0] }
        });
        assert!(load(model).is_err());
    }

    #[test]
    fn test_backward_child_reference_is_rejected() {
        let mut model = stump_model("binary:logistic", json!(0.5));
        model["learner"]["gradient_booster"]["model"]["trees"][0]["left_children"] =
            json!([0, -1, -1]);
        let err = load(model).unwrap_err();
        assert!(err.to_string().contains("references child"));
    }

    #[test]
    fn test_categorical_split_is_rejected() {
        let mut model = stump_model("binary:logistic", json!(0.5));
        model["learner"]["gradient_booster"]["model"]["trees"][1]["split_type"] = json!([1, 0, 0]);
        let err = load(model).unwrap_err();
        assert!(err.to_string().contains("categorical"));
    }

    #[test]
    fn test_dart_weights_scale_trees() {
        let mut model = stump_model("binary:logistic", json!(0.5));
        let trees = model["learner"]["gradient_booster"]["model"].clone();
        model["learner"]["gradient_booster"] = json!({
            "name": "dart",
            "gbtree": { "name": "gbtree", "model": trees },
            "weight_drop": [0.5, 1.0]
        });
        let forest = load(model).unwrap();
        assert!((forest.margin(&[9.0, 0.0]) - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_corrupt_json_is_model_load_error() {
        let err = XgbForest::from_slice("broken", b"{ not json").unwrap_err();
        assert!(matches!(err, RiskError::ModelLoad { .. }));
    }
}
