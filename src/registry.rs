//! Metric registry
//!
//! Every metric the analyzer knows is described by one [`MetricConfig`]. Its
//! [`MetricSource`] says whether the daily series comes straight from one
//! export file or is derived from several component series, so the pipeline
//! dispatches once instead of checking flags at every stage.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ComputeError;
use crate::rolling::DEFAULT_ROLLING_WINDOW;
use crate::types::Aggregation;

/// Metric identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricId {
    BodyWeight,
    BodyFat,
    Bmi,
    CalorieIntake,
    Protein,
    Carbohydrates,
    ActiveCalories,
    BasalCalories,
    StepCount,
    WalkingDistance,
    SleepAnalysis,
    HeartRate,
    CalorieBalance,
    WeightPrediction,
}

impl MetricId {
    pub const ALL: [MetricId; 14] = [
        MetricId::BodyWeight,
        MetricId::BodyFat,
        MetricId::Bmi,
        MetricId::CalorieIntake,
        MetricId::Protein,
        MetricId::Carbohydrates,
        MetricId::ActiveCalories,
        MetricId::BasalCalories,
        MetricId::StepCount,
        MetricId::WalkingDistance,
        MetricId::SleepAnalysis,
        MetricId::HeartRate,
        MetricId::CalorieBalance,
        MetricId::WeightPrediction,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MetricId::BodyWeight => "body_weight",
            MetricId::BodyFat => "body_fat",
            MetricId::Bmi => "bmi",
            MetricId::CalorieIntake => "calorie_intake",
            MetricId::Protein => "protein",
            MetricId::Carbohydrates => "carbohydrates",
            MetricId::ActiveCalories => "active_calories",
            MetricId::BasalCalories => "basal_calories",
            MetricId::StepCount => "step_count",
            MetricId::WalkingDistance => "walking_distance",
            MetricId::SleepAnalysis => "sleep_analysis",
            MetricId::HeartRate => "heart_rate",
            MetricId::CalorieBalance => "calorie_balance",
            MetricId::WeightPrediction => "weight_prediction",
        }
    }

    /// Registry entry for this metric
    pub fn config(&self) -> &'static MetricConfig {
        lookup(*self)
    }
}

impl fmt::Display for MetricId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricId {
    type Err = ComputeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        MetricId::ALL
            .iter()
            .copied()
            .find(|id| id.as_str() == wanted)
            .ok_or_else(|| ComputeError::UnknownMetric(wanted.to_string()))
    }
}

/// Input series of the derived metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Component {
    Weight,
    Intake,
    Basal,
    Active,
}

impl Component {
    pub fn as_str(&self) -> &'static str {
        match self {
            Component::Weight => "weight",
            Component::Intake => "intake",
            Component::Basal => "basal",
            Component::Active => "active",
        }
    }

    /// Export file holding this component
    pub fn file_name(&self) -> &'static str {
        match self {
            Component::Weight => "BodyMass.csv",
            Component::Intake => "DietaryEnergyConsumed.csv",
            Component::Basal => "BasalEnergyBurned.csv",
            Component::Active => "ActiveEnergyBurned.csv",
        }
    }

    /// Daily reducer: body mass is averaged, energy is summed
    pub fn aggregation(&self) -> Aggregation {
        match self {
            Component::Weight => Aggregation::Mean,
            _ => Aggregation::Sum,
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a derived metric combines its components
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Combinator {
    CalorieBalance,
    WeightPrediction,
}

impl Combinator {
    pub fn components(&self) -> &'static [Component] {
        match self {
            Combinator::CalorieBalance => &[Component::Intake, Component::Basal, Component::Active],
            Combinator::WeightPrediction => &[
                Component::Weight,
                Component::Intake,
                Component::Basal,
                Component::Active,
            ],
        }
    }
}

/// Where a metric's daily series comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricSource {
    /// One export file reduced per day
    Direct {
        file: &'static str,
        aggregation: Aggregation,
    },
    /// Combination of several component series
    Derived(Combinator),
}

/// Grouping used by `trends list --categories`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    BodyComposition,
    Nutrition,
    Activity,
    SleepAndVitals,
    Energy,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::BodyComposition,
        Category::Nutrition,
        Category::Activity,
        Category::SleepAndVitals,
        Category::Energy,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Category::BodyComposition => "Body composition",
            Category::Nutrition => "Nutrition",
            Category::Activity => "Activity",
            Category::SleepAndVitals => "Sleep & vitals",
            Category::Energy => "Energy balance",
        }
    }
}

/// Static description of one metric
#[derive(Debug, Clone, PartialEq)]
pub struct MetricConfig {
    pub id: MetricId,
    pub display_name: &'static str,
    pub title: &'static str,
    pub unit: &'static str,
    pub decimal_places: usize,
    pub rolling_window: usize,
    pub category: Category,
    pub description: &'static str,
    pub source: MetricSource,
}

impl MetricConfig {
    /// Files this metric needs from the data directory
    pub fn required_files(&self) -> Vec<&'static str> {
        match self.source {
            MetricSource::Direct { file, .. } => vec![file],
            MetricSource::Derived(combinator) => combinator
                .components()
                .iter()
                .map(Component::file_name)
                .collect(),
        }
    }
}

const fn direct(
    id: MetricId,
    display_name: &'static str,
    title: &'static str,
    unit: &'static str,
    decimal_places: usize,
    category: Category,
    description: &'static str,
    file: &'static str,
    aggregation: Aggregation,
) -> MetricConfig {
    MetricConfig {
        id,
        display_name,
        title,
        unit,
        decimal_places,
        rolling_window: DEFAULT_ROLLING_WINDOW,
        category,
        description,
        source: MetricSource::Direct { file, aggregation },
    }
}

static METRICS: [MetricConfig; 14] = [
    direct(
        MetricId::BodyWeight,
        "Body weight",
        "Body weight trend",
        "kg",
        1,
        Category::BodyComposition,
        "Daily body weight and its long-term trend",
        "BodyMass.csv",
        Aggregation::Mean,
    ),
    direct(
        MetricId::BodyFat,
        "Body fat",
        "Body fat percentage trend",
        "%",
        1,
        Category::BodyComposition,
        "Body fat percentage for tracking body composition",
        "BodyFatPercentage.csv",
        Aggregation::Mean,
    ),
    direct(
        MetricId::Bmi,
        "BMI",
        "BMI trend",
        "",
        1,
        Category::BodyComposition,
        "Body mass index",
        "BodyMassIndex.csv",
        Aggregation::Mean,
    ),
    direct(
        MetricId::CalorieIntake,
        "Calorie intake",
        "Calorie intake trend",
        "kcal",
        0,
        Category::Nutrition,
        "Dietary energy consumed per day",
        "DietaryEnergyConsumed.csv",
        Aggregation::Sum,
    ),
    direct(
        MetricId::Protein,
        "Protein",
        "Protein intake trend",
        "g",
        1,
        Category::Nutrition,
        "Dietary protein per day",
        "DietaryProtein.csv",
        Aggregation::Sum,
    ),
    direct(
        MetricId::Carbohydrates,
        "Carbohydrates",
        "Carbohydrate intake trend",
        "g",
        1,
        Category::Nutrition,
        "Dietary carbohydrates per day",
        "DietaryCarbohydrates.csv",
        Aggregation::Sum,
    ),
    direct(
        MetricId::ActiveCalories,
        "Active calories",
        "Active energy burned",
        "kcal",
        0,
        Category::Activity,
        "Energy burned through exercise and movement",
        "ActiveEnergyBurned.csv",
        Aggregation::Sum,
    ),
    direct(
        MetricId::BasalCalories,
        "Basal calories",
        "Basal energy burned",
        "kcal",
        0,
        Category::Activity,
        "Resting energy expenditure",
        "BasalEnergyBurned.csv",
        Aggregation::Sum,
    ),
    direct(
        MetricId::StepCount,
        "Steps",
        "Step count trend",
        "steps",
        0,
        Category::Activity,
        "Steps per day",
        "StepCount.csv",
        Aggregation::Sum,
    ),
    direct(
        MetricId::WalkingDistance,
        "Walking distance",
        "Walking and running distance",
        "km",
        2,
        Category::Activity,
        "Walking and running distance per day",
        "DistanceWalkingRunning.csv",
        Aggregation::Sum,
    ),
    direct(
        MetricId::SleepAnalysis,
        "Sleep",
        "Sleep duration trend",
        "h",
        1,
        Category::SleepAndVitals,
        "Total sleep per day",
        "SleepAnalysis.csv",
        Aggregation::Sum,
    ),
    direct(
        MetricId::HeartRate,
        "Heart rate",
        "Heart rate trend",
        "bpm",
        0,
        Category::SleepAndVitals,
        "Average heart rate per day",
        "HeartRate.csv",
        Aggregation::Mean,
    ),
    MetricConfig {
        id: MetricId::CalorieBalance,
        display_name: "Calorie balance",
        title: "Calorie balance trend",
        unit: "kcal",
        decimal_places: 0,
        rolling_window: DEFAULT_ROLLING_WINDOW,
        category: Category::Energy,
        description: "Intake minus basal and active expenditure",
        source: MetricSource::Derived(Combinator::CalorieBalance),
    },
    MetricConfig {
        id: MetricId::WeightPrediction,
        display_name: "Weight prediction",
        title: "Actual vs theoretical weight",
        unit: "kg",
        decimal_places: 1,
        rolling_window: DEFAULT_ROLLING_WINDOW,
        category: Category::Energy,
        description: "Observed weight against the weight implied by cumulative calorie balance",
        source: MetricSource::Derived(Combinator::WeightPrediction),
    },
];

/// Resolve the configuration of a metric
pub fn lookup(id: MetricId) -> &'static MetricConfig {
    // METRICS is declared in MetricId::ALL order
    &METRICS[id as usize]
}

/// Resolve a metric by its snake_case name
pub fn lookup_by_name(name: &str) -> Result<&'static MetricConfig, ComputeError> {
    name.parse::<MetricId>().map(lookup)
}

/// All registered metrics
pub fn all_metrics() -> &'static [MetricConfig] {
    &METRICS
}

/// Metrics belonging to a category, in registry order
pub fn metrics_in(category: Category) -> impl Iterator<Item = &'static MetricConfig> {
    METRICS.iter().filter(move |m| m.category == category)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_matches_id() {
        for id in MetricId::ALL {
            assert_eq!(lookup(id).id, id);
        }
    }

    #[test]
    fn test_parse_round_trip() {
        for id in MetricId::ALL {
            assert_eq!(id.as_str().parse::<MetricId>().unwrap(), id);
        }
        assert!(matches!(
            "blood_sugar".parse::<MetricId>(),
            Err(ComputeError::UnknownMetric(name)) if name == "blood_sugar"
        ));
    }

    #[test]
    fn test_sources() {
        let weight = lookup(MetricId::BodyWeight);
        assert_eq!(
            weight.source,
            MetricSource::Direct {
                file: "BodyMass.csv",
                aggregation: Aggregation::Mean
            }
        );

        let steps = lookup_by_name("step_count").unwrap();
        assert!(matches!(
            steps.source,
            MetricSource::Direct {
                aggregation: Aggregation::Sum,
                ..
            }
        ));

        let prediction = lookup(MetricId::WeightPrediction);
        assert_eq!(
            prediction.required_files(),
            vec![
                "BodyMass.csv",
                "DietaryEnergyConsumed.csv",
                "BasalEnergyBurned.csv",
                "ActiveEnergyBurned.csv"
            ]
        );
    }

    #[test]
    fn test_component_reducers() {
        assert_eq!(Component::Weight.aggregation(), Aggregation::Mean);
        assert_eq!(Component::Intake.aggregation(), Aggregation::Sum);
        assert_eq!(Component::Active.aggregation(), Aggregation::Sum);
    }

    #[test]
    fn test_every_metric_has_a_category() {
        let total: usize = Category::ALL.iter().map(|c| metrics_in(*c).count()).sum();
        assert_eq!(total, all_metrics().len());
    }
}
