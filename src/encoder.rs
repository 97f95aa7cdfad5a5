//! Categorical encoding of raw form values.
//!
//! Each field owns its encoding rule. Ordinal fields collapse to a single
//! integer column named after the field; one-hot fields project onto the
//! indicator columns the model retained, where a variant without an
//! indicator column is the baseline and encodes as all zeros.

use crate::catalog::{
    AlcoholConsumption, Category, CholesterolLevel, DietaryHabits, EmploymentStatus, Field,
    FieldKind, Gender, Level, MaritalStatus, PhysicalActivity, Residence, SleepQuality,
    SmokingStatus, YesNo,
};
use crate::error::{Result, RiskError};
use crate::types::{RawInput, RawValue};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::HashMap;

/// Category encoded as one integer column.
pub trait Ordinal: Category {
    fn code(self) -> f32;
}

/// Category encoded as binary indicator columns.
pub trait OneHot: Category {
    /// Retained indicator columns and the variant each one flags.
    const INDICATORS: &'static [(&'static str, Self)];

    /// Variant with no indicator column, if the field has one.
    fn baseline() -> Option<Self> {
        Self::LABELS
            .iter()
            .filter_map(|label| Self::parse(label))
            .find(|variant| Self::INDICATORS.iter().all(|(_, flagged)| flagged != variant))
    }

    fn project(self) -> impl Iterator<Item = (&'static str, f32)> {
        Self::INDICATORS
            .iter()
            .map(move |&(column, flagged)| (column, if flagged == self { 1.0 } else { 0.0 }))
    }
}

impl Ordinal for YesNo {
    fn code(self) -> f32 {
        match self {
            YesNo::No => 0.0,
            YesNo::Yes => 1.0,
        }
    }
}

// Two-point scale on the three-point table: there is no 1.
impl Ordinal for CholesterolLevel {
    fn code(self) -> f32 {
        match self {
            CholesterolLevel::Normal => 0.0,
            CholesterolLevel::High => 2.0,
        }
    }
}

impl Ordinal for Level {
    fn code(self) -> f32 {
        match self {
            Level::Low => 0.0,
            Level::Medium => 1.0,
            Level::High => 2.0,
        }
    }
}

impl Ordinal for SleepQuality {
    fn code(self) -> f32 {
        match self {
            SleepQuality::Poor => 0.0,
            SleepQuality::Average => 1.0,
            SleepQuality::Good => 2.0,
        }
    }
}

impl Ordinal for MaritalStatus {
    fn code(self) -> f32 {
        match self {
            MaritalStatus::Single => 0.0,
            MaritalStatus::Married => 1.0,
        }
    }
}

impl Ordinal for Residence {
    fn code(self) -> f32 {
        match self {
            Residence::Rural => 0.0,
            Residence::Urban => 1.0,
        }
    }
}

impl OneHot for Gender {
    const INDICATORS: &'static [(&'static str, Self)] = &[("Gender_Male", Gender::Male)];
}

impl OneHot for PhysicalActivity {
    const INDICATORS: &'static [(&'static str, Self)] = &[
        ("Physical Activity Level_1", PhysicalActivity::Moderate),
        ("Physical Activity Level_2", PhysicalActivity::Active),
    ];
}

impl OneHot for SmokingStatus {
    const INDICATORS: &'static [(&'static str, Self)] = &[
        ("Smoking Status_Former", SmokingStatus::Former),
        ("Smoking Status_Never", SmokingStatus::Never),
    ];
}

impl OneHot for AlcoholConsumption {
    const INDICATORS: &'static [(&'static str, Self)] = &[
        ("Alcohol Consumption_Occasionally", AlcoholConsumption::Occasionally),
        ("Alcohol Consumption_Regularly", AlcoholConsumption::Regularly),
    ];
}

impl OneHot for DietaryHabits {
    const INDICATORS: &'static [(&'static str, Self)] = &[
        ("Dietary Habits_Healthy", DietaryHabits::Healthy),
        ("Dietary Habits_Unhealthy", DietaryHabits::Unhealthy),
    ];
}

impl OneHot for EmploymentStatus {
    const INDICATORS: &'static [(&'static str, Self)] = &[
        ("Employment Status_Retired", EmploymentStatus::Retired),
        ("Employment Status_Unemployed", EmploymentStatus::Unemployed),
    ];
}

/// Feature column name to encoded value, in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EncodedFeatureMap {
    entries: Vec<(String, f32)>,
}

impl EncodedFeatureMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a column, replacing an existing value in place.
    pub fn insert(&mut self, column: impl Into<String>, value: f32) {
        let column = column.into();
        match self.entries.iter_mut().find(|(name, _)| *name == column) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((column, value)),
        }
    }

    pub fn extend(&mut self, other: EncodedFeatureMap) {
        for (column, value) in other.entries {
            self.insert(column, value);
        }
    }

    pub fn get(&self, column: &str) -> Option<f32> {
        self.entries
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| *value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f32)> {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), *value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> FromIterator<(&'a str, f32)> for EncodedFeatureMap {
    fn from_iter<I: IntoIterator<Item = (&'a str, f32)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (column, value) in iter {
            map.insert(column, value);
        }
        map
    }
}

impl Serialize for EncodedFeatureMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (column, value) in &self.entries {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}

fn ordinal<C: Ordinal>(field: Field, value: &RawValue) -> Result<EncodedFeatureMap> {
    let code = field.category::<C>(value)?.code();
    Ok(std::iter::once((field.name(), code)).collect())
}

fn one_hot<C: OneHot>(field: Field, value: &RawValue) -> Result<EncodedFeatureMap> {
    Ok(field.category::<C>(value)?.project().collect())
}

/// Encode one raw field value into its feature columns.
///
/// Unrecognized labels and out-of-range numbers fail with `InvalidInput`;
/// nothing is defaulted here.
pub fn encode(field: Field, value: &RawValue) -> Result<EncodedFeatureMap> {
    match field {
        Field::Age | Field::EducationLevel | Field::Bmi | Field::CognitiveTestScore => {
            let number = field.number(value)?;
            Ok(std::iter::once((field.name(), number as f32)).collect())
        }
        Field::Diabetes | Field::Hypertension | Field::FamilyHistory | Field::GeneticRiskFactor => {
            ordinal::<YesNo>(field, value)
        }
        Field::CholesterolLevel => ordinal::<CholesterolLevel>(field, value),
        Field::DepressionLevel
        | Field::AirPollutionExposure
        | Field::SocialEngagementLevel
        | Field::IncomeLevel
        | Field::StressLevels => ordinal::<Level>(field, value),
        Field::SleepQuality => ordinal::<SleepQuality>(field, value),
        Field::MaritalStatus => ordinal::<MaritalStatus>(field, value),
        Field::UrbanRuralLiving => ordinal::<Residence>(field, value),
        Field::Gender => one_hot::<Gender>(field, value),
        Field::PhysicalActivityLevel => one_hot::<PhysicalActivity>(field, value),
        Field::SmokingStatus => one_hot::<SmokingStatus>(field, value),
        Field::AlcoholConsumption => one_hot::<AlcoholConsumption>(field, value),
        Field::DietaryHabits => one_hot::<DietaryHabits>(field, value),
        Field::EmploymentStatus => one_hot::<EmploymentStatus>(field, value),
    }
}

/// Validate and encode a complete form.
///
/// Unknown field names, duplicate spellings of one field and missing
/// categorical fields are rejected. Missing numeric fields take the value the
/// form starts at.
pub fn encode_input(input: &RawInput) -> Result<EncodedFeatureMap> {
    let mut resolved: HashMap<Field, &RawValue> = HashMap::with_capacity(input.len());
    for (name, value) in input.iter() {
        let field = Field::from_name(name)
            .ok_or_else(|| RiskError::invalid_input(name, value, "unknown field"))?;
        if resolved.insert(field, value).is_some() {
            return Err(RiskError::invalid_input(
                field.name(),
                value,
                "field supplied more than once",
            ));
        }
    }

    let mut encoded = EncodedFeatureMap::new();
    for field in Field::ALL {
        let columns = match (resolved.get(&field), field.kind()) {
            (Some(value), _) => encode(field, value)?,
            (None, FieldKind::Numeric(range)) => encode(field, &RawValue::Number(range.default))?,
            (None, FieldKind::Categorical(_)) => {
                return Err(RiskError::invalid_input(field.name(), "", "missing value"));
            }
        };
        encoded.extend(columns);
    }
    Ok(encoded)
}
