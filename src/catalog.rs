//! Field catalog for the assessment form.
//!
//! Declares every raw input field, its kind and its closed domain: inclusive
//! bounds plus a default for numeric fields, the label set for categorical
//! fields. Labels are typed per field so that unrelated scales ("High" for
//! cholesterol vs "High" for stress) never share a value table.

use crate::error::{Result, RiskError};
use crate::types::RawValue;

/// A closed set of labels offered for one categorical field.
pub trait Category: Sized + Copy + PartialEq + 'static {
    /// Every accepted label, in the order the form offers them.
    const LABELS: &'static [&'static str];

    fn label(self) -> &'static str;

    fn parse(label: &str) -> Option<Self>;
}

macro_rules! categories {
    ($($(#[$meta:meta])* $name:ident { $($variant:ident => $label:literal),+ $(,)? })+) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
            pub enum $name {
                $($variant),+
            }

            impl Category for $name {
                const LABELS: &'static [&'static str] = &[$($label),+];

                fn label(self) -> &'static str {
                    match self {
                        $(Self::$variant => $label),+
                    }
                }

                fn parse(label: &str) -> Option<Self> {
                    match label {
                        $($label => Some(Self::$variant),)+
                        _ => None,
                    }
                }
            }
        )+
    };
}

categories! {
    /// Diabetes, Hypertension, Family History, Genetic Risk Factor
    YesNo { No => "No", Yes => "Yes" }

    /// Two-point cholesterol scale
    CholesterolLevel { Normal => "Normal", High => "High" }

    /// Depression, Air Pollution, Social Engagement, Income, Stress
    Level { Low => "Low", Medium => "Medium", High => "High" }

    SleepQuality { Good => "Good", Average => "Average", Poor => "Poor" }

    MaritalStatus { Single => "Single", Married => "Married" }

    Residence { Urban => "Urban", Rural => "Rural" }

    Gender { Male => "Male", Female => "Female" }

    PhysicalActivity { Inactive => "Inactive", Moderate => "Moderate", Active => "Active" }

    SmokingStatus { Former => "Former", Never => "Never" }

    AlcoholConsumption { Occasionally => "Occasionally", Regularly => "Regularly" }

    DietaryHabits { Healthy => "Healthy", Unhealthy => "Unhealthy" }

    EmploymentStatus { Retired => "Retired", Unemployed => "Unemployed" }
}

/// Inclusive integer bound with the value the form starts at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumericRange {
    pub min: i64,
    pub max: i64,
    pub default: i64,
}

impl NumericRange {
    pub fn contains(&self, value: i64) -> bool {
        (self.min..=self.max).contains(&value)
    }
}

/// Kind and domain of a raw field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Numeric(NumericRange),
    Categorical(&'static [&'static str]),
}

/// Every raw field collected by the assessment form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    Age,
    EducationLevel,
    Bmi,
    Diabetes,
    Hypertension,
    CholesterolLevel,
    FamilyHistory,
    CognitiveTestScore,
    DepressionLevel,
    SleepQuality,
    AirPollutionExposure,
    GeneticRiskFactor,
    SocialEngagementLevel,
    IncomeLevel,
    StressLevels,
    MaritalStatus,
    UrbanRuralLiving,
    Gender,
    PhysicalActivityLevel,
    SmokingStatus,
    AlcoholConsumption,
    DietaryHabits,
    EmploymentStatus,
}

impl Field {
    /// All fields in form order.
    pub const ALL: [Field; 23] = [
        Field::Age,
        Field::EducationLevel,
        Field::Bmi,
        Field::Diabetes,
        Field::Hypertension,
        Field::CholesterolLevel,
        Field::FamilyHistory,
        Field::CognitiveTestScore,
        Field::DepressionLevel,
        Field::SleepQuality,
        Field::AirPollutionExposure,
        Field::GeneticRiskFactor,
        Field::SocialEngagementLevel,
        Field::IncomeLevel,
        Field::StressLevels,
        Field::MaritalStatus,
        Field::UrbanRuralLiving,
        Field::Gender,
        Field::PhysicalActivityLevel,
        Field::SmokingStatus,
        Field::AlcoholConsumption,
        Field::DietaryHabits,
        Field::EmploymentStatus,
    ];

    /// Canonical field name as it appears in raw input.
    pub fn name(self) -> &'static str {
        match self {
            Field::Age => "Age",
            Field::EducationLevel => "Education Level",
            Field::Bmi => "BMI",
            Field::Diabetes => "Diabetes",
            Field::Hypertension => "Hypertension",
            Field::CholesterolLevel => "Cholesterol Level",
            Field::FamilyHistory => "Family History of Alzheimer\u{2019}s",
            Field::CognitiveTestScore => "Cognitive Test Score",
            Field::DepressionLevel => "Depression Level",
            Field::SleepQuality => "Sleep Quality",
            Field::AirPollutionExposure => "Air Pollution Exposure",
            Field::GeneticRiskFactor => "Genetic Risk Factor (APOE-\u{3b5}4 allele)",
            Field::SocialEngagementLevel => "Social Engagement Level",
            Field::IncomeLevel => "Income Level",
            Field::StressLevels => "Stress Levels",
            Field::MaritalStatus => "Marital Status",
            Field::UrbanRuralLiving => "Urban vs Rural Living",
            Field::Gender => "Gender",
            Field::PhysicalActivityLevel => "Physical Activity Level",
            Field::SmokingStatus => "Smoking Status",
            Field::AlcoholConsumption => "Alcohol Consumption",
            Field::DietaryHabits => "Dietary Habits",
            Field::EmploymentStatus => "Employment Status",
        }
    }

    /// Resolve a raw field name. The family-history field also accepts a
    /// plain ASCII apostrophe.
    pub fn from_name(name: &str) -> Option<Field> {
        if name == "Family History of Alzheimer's" {
            return Some(Field::FamilyHistory);
        }
        Field::ALL.iter().copied().find(|field| field.name() == name)
    }

    pub fn kind(self) -> FieldKind {
        let numeric = |min, max, default| FieldKind::Numeric(NumericRange { min, max, default });
        match self {
            Field::Age => numeric(0, 100, 25),
            Field::EducationLevel => numeric(0, 20, 0),
            Field::Bmi => numeric(10, 50, 22),
            Field::CognitiveTestScore => numeric(0, 100, 75),
            Field::Diabetes
            | Field::Hypertension
            | Field::FamilyHistory
            | Field::GeneticRiskFactor => FieldKind::Categorical(YesNo::LABELS),
            Field::CholesterolLevel => FieldKind::Categorical(CholesterolLevel::LABELS),
            Field::DepressionLevel
            | Field::AirPollutionExposure
            | Field::SocialEngagementLevel
            | Field::IncomeLevel
            | Field::StressLevels => FieldKind::Categorical(Level::LABELS),
            Field::SleepQuality => FieldKind::Categorical(SleepQuality::LABELS),
            Field::MaritalStatus => FieldKind::Categorical(MaritalStatus::LABELS),
            Field::UrbanRuralLiving => FieldKind::Categorical(Residence::LABELS),
            Field::Gender => FieldKind::Categorical(Gender::LABELS),
            Field::PhysicalActivityLevel => FieldKind::Categorical(PhysicalActivity::LABELS),
            Field::SmokingStatus => FieldKind::Categorical(SmokingStatus::LABELS),
            Field::AlcoholConsumption => FieldKind::Categorical(AlcoholConsumption::LABELS),
            Field::DietaryHabits => FieldKind::Categorical(DietaryHabits::LABELS),
            Field::EmploymentStatus => FieldKind::Categorical(EmploymentStatus::LABELS),
        }
    }

    /// Value the form is pre-filled with: the numeric default, or the first
    /// offered label.
    pub fn initial_value(self) -> RawValue {
        match self.kind() {
            FieldKind::Numeric(range) => RawValue::Number(range.default),
            FieldKind::Categorical(labels) => RawValue::Label(labels[0].to_string()),
        }
    }

    /// Check a raw value against this field's domain without encoding it.
    pub fn validate(self, value: &RawValue) -> Result<()> {
        match self.kind() {
            FieldKind::Numeric(_) => self.number(value).map(|_| ()),
            FieldKind::Categorical(labels) => match value {
                RawValue::Label(label) if labels.contains(&label.as_str()) => Ok(()),
                RawValue::Label(_) => Err(RiskError::invalid_input(
                    self.name(),
                    value,
                    format!("expected one of {}", labels.join(", ")),
                )),
                RawValue::Number(_) | RawValue::Other(_) => Err(RiskError::invalid_input(
                    self.name(),
                    value,
                    "expected a category label",
                )),
            },
        }
    }

    /// Read a bounded integer. Out-of-range values are rejected, never clamped.
    pub fn number(self, value: &RawValue) -> Result<i64> {
        let FieldKind::Numeric(range) = self.kind() else {
            return Err(RiskError::invalid_input(
                self.name(),
                value,
                "field is categorical",
            ));
        };
        match value {
            RawValue::Number(n) if range.contains(*n) => Ok(*n),
            RawValue::Number(_) => Err(RiskError::invalid_input(
                self.name(),
                value,
                format!("must be within [{}, {}]", range.min, range.max),
            )),
            RawValue::Label(_) | RawValue::Other(_) => Err(RiskError::invalid_input(
                self.name(),
                value,
                "expected an integer",
            )),
        }
    }

    /// Read a category label into the field's typed label set.
    pub fn category<C: Category>(self, value: &RawValue) -> Result<C> {
        self.validate(value)?;
        match value {
            RawValue::Label(label) => C::parse(label).ok_or_else(|| {
                RiskError::invalid_input(
                    self.name(),
                    value,
                    format!("expected one of {}", C::LABELS.join(", ")),
                )
            }),
            RawValue::Number(_) | RawValue::Other(_) => Err(RiskError::invalid_input(
                self.name(),
                value,
                "expected a category label",
            )),
        }
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
