//! Feature vector assembly for model inference.
//!
//! Reindexes an encoded feature map onto the exact column schema the
//! tree ensemble was trained with.

use crate::encoder::EncodedFeatureMap;
use crate::error::{Result, RiskError};
use serde::Serialize;

/// Columns the model expects, in training order.
pub const MODEL_COLUMNS: [&str; 26] = [
    "Age",
    "Education Level",
    "BMI",
    "Diabetes",
    "Hypertension",
    "Cholesterol Level",
    "Family History of Alzheimer\u{2019}s",
    "Cognitive Test Score",
    "Depression Level",
    "Sleep Quality",
    "Air Pollution Exposure",
    "Genetic Risk Factor (APOE-\u{3b5}4 allele)",
    "Social Engagement Level",
    "Income Level",
    "Stress Levels",
    "Gender_Male",
    "Physical Activity Level_1",
    "Physical Activity Level_2",
    "Smoking Status_Former",
    "Smoking Status_Never",
    "Alcohol Consumption_Occasionally",
    "Alcohol Consumption_Regularly",
    "Dietary Habits_Healthy",
    "Dietary Habits_Unhealthy",
    "Employment Status_Retired",
    "Employment Status_Unemployed",
];

pub const FEATURE_COUNT: usize = MODEL_COLUMNS.len();

/// Ordered feature values paired with the column schema they follow
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelFeatureVector {
    #[serde(skip)]
    columns: &'static [&'static str],
    values: Vec<f32>,
}

impl ModelFeatureVector {
    /// Pair values with a column schema.
    ///
    /// # Errors
    /// Returns `SchemaMismatch` if the lengths disagree.
    pub fn new(columns: &'static [&'static str], values: Vec<f32>) -> Result<Self> {
        if columns.len() != values.len() {
            return Err(RiskError::SchemaMismatch(format!(
                "{} values for {} columns",
                values.len(),
                columns.len()
            )));
        }
        Ok(Self { columns, values })
    }

    pub fn columns(&self) -> &'static [&'static str] {
        self.columns
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn get(&self, column: &str) -> Option<f32> {
        self.columns
            .iter()
            .position(|name| *name == column)
            .map(|idx| self.values[idx])
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Assembles model input vectors from encoded feature maps.
#[derive(Debug, Clone)]
pub struct FeatureAssembler {
    columns: &'static [&'static str],
}

impl FeatureAssembler {
    /// Create an assembler for the deployed model schema.
    pub fn new() -> Self {
        Self {
            columns: &MODEL_COLUMNS,
        }
    }

    /// Reindex `features` onto the schema.
    ///
    /// Schema columns absent from the map become 0; map entries outside the
    /// schema are dropped.
    pub fn assemble(&self, features: &EncodedFeatureMap) -> ModelFeatureVector {
        let values = self
            .columns
            .iter()
            .map(|column| features.get(column).unwrap_or(0.0))
            .collect();

        ModelFeatureVector {
            columns: self.columns,
            values,
        }
    }

    /// Entries of `features` that will not reach the model.
    pub fn dropped_columns<'a>(&self, features: &'a EncodedFeatureMap) -> Vec<&'a str> {
        features
            .iter()
            .map(|(column, _)| column)
            .filter(|column| !self.columns.iter().any(|known| known == column))
            .collect()
    }

    /// Get the number of features produced.
    pub fn feature_count(&self) -> usize {
        self.columns.len()
    }

    /// Get feature names in model order.
    pub fn feature_names(&self) -> &'static [&'static str] {
        self.columns
    }
}

impl Default for FeatureAssembler {
    fn default() -> Self {
        Self::new()
    }
}
