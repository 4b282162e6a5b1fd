//! Derived energy-balance metrics
//!
//! This module combines several daily component series into:
//! - Calorie balance (intake - basal - active)
//! - Theoretical weight from cumulative calorie balance
//!
//! Both require the exact same day to be present in every component. Days
//! missing from any component are dropped, never estimated.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::aggregator::aggregate_daily;
use crate::registry::Component;
use crate::types::{
    CalorieBalanceRecord, DailyPoint, PredictionSummary, Sample, WeightPredictionRecord,
};

/// Daily series per component
pub type ComponentSeries = BTreeMap<Component, Vec<DailyPoint>>;

const BALANCE_COMPONENTS: [Component; 3] = [Component::Intake, Component::Basal, Component::Active];

const PREDICTION_COMPONENTS: [Component; 4] = [
    Component::Weight,
    Component::Intake,
    Component::Basal,
    Component::Active,
];

/// Why a derived series could not be produced
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "kind", content = "details", rename_all = "snake_case")]
pub enum DerivationFailure {
    /// One or more component series has no data at all
    #[error("missing component data: {}", component_list(.0))]
    MissingComponents(Vec<Component>),

    /// Every component has data, but no day is shared by all of them
    #[error("component series have no day in common")]
    EmptyIntersection,

    /// The kcal-per-kg conversion factor is not a positive finite number
    #[error("kcal per kg must be a positive number, got {0}")]
    InvalidEnergyDensity(f64),
}

fn component_list(components: &[Component]) -> String {
    components
        .iter()
        .map(Component::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Aggregate raw component samples with each component's reducer
pub fn aggregate_components(raw: &BTreeMap<Component, Vec<Sample>>) -> ComponentSeries {
    raw.iter()
        .map(|(component, samples)| (*component, aggregate_daily(samples, component.aggregation())))
        .collect()
}

/// Per-day calorie balance over the days shared by intake, basal and active.
pub fn calorie_balance(
    components: &ComponentSeries,
) -> Result<Vec<CalorieBalanceRecord>, DerivationFailure> {
    let lookups = component_lookups(components, &BALANCE_COMPONENTS)?;
    let days = common_days(&lookups);

    if days.is_empty() {
        warn!("calorie balance: no day with intake, basal and active data");
        return Err(DerivationFailure::EmptyIntersection);
    }

    let records: Vec<CalorieBalanceRecord> = days
        .into_iter()
        .map(|date| {
            let intake = lookups[&Component::Intake][&date];
            let basal = lookups[&Component::Basal][&date];
            let active = lookups[&Component::Active][&date];
            CalorieBalanceRecord {
                date,
                intake,
                basal,
                active,
                balance: intake - basal - active,
            }
        })
        .collect();

    debug!(days = records.len(), "computed calorie balance");
    Ok(records)
}

/// Compare observed weight with the weight implied by cumulative balance.
///
/// Starting from the weight on the first common day, every day's balance is
/// added to a running deficit and converted to mass at `kcal_per_kg`.
/// The first day's own balance is included, so day-1 theoretical weight is
/// `initial + balance₁ / kcal_per_kg` rather than the observed weight.
pub fn weight_prediction(
    components: &ComponentSeries,
    kcal_per_kg: f64,
) -> Result<Vec<WeightPredictionRecord>, DerivationFailure> {
    if !kcal_per_kg.is_finite() || kcal_per_kg <= 0.0 {
        return Err(DerivationFailure::InvalidEnergyDensity(kcal_per_kg));
    }

    let lookups = component_lookups(components, &PREDICTION_COMPONENTS)?;
    let days = common_days(&lookups);

    let Some(first) = days.first() else {
        warn!("weight prediction: weight and calorie data never overlap");
        return Err(DerivationFailure::EmptyIntersection);
    };

    let weights = &lookups[&Component::Weight];
    let initial_weight = weights[first];
    let mut cumulative_deficit = 0.0;

    let records: Vec<WeightPredictionRecord> = days
        .iter()
        .map(|date| {
            let actual_weight = weights[date];
            let daily_intake = lookups[&Component::Intake][date];
            let daily_basal = lookups[&Component::Basal][date];
            let daily_active = lookups[&Component::Active][date];
            let daily_balance = daily_intake - daily_basal - daily_active;

            cumulative_deficit += daily_balance;
            let theoretical_weight = initial_weight + cumulative_deficit / kcal_per_kg;

            WeightPredictionRecord {
                date: *date,
                actual_weight,
                theoretical_weight,
                prediction_error: actual_weight - theoretical_weight,
                cumulative_deficit,
                daily_balance,
                daily_intake,
                daily_basal,
                daily_active,
            }
        })
        .collect();

    debug!(
        days = records.len(),
        initial_weight, kcal_per_kg, "computed weight prediction"
    );
    Ok(records)
}

/// Error statistics for a weight prediction run
pub fn prediction_summary(records: &[WeightPredictionRecord]) -> Option<PredictionSummary> {
    let first = records.first()?;
    let last = records.last()?;

    let errors = records.iter().map(|r| r.prediction_error);
    let mean_error = errors.clone().sum::<f64>() / records.len() as f64;
    let max_error = errors.clone().fold(f64::NEG_INFINITY, f64::max);
    let min_error = errors.fold(f64::INFINITY, f64::min);

    Some(PredictionSummary {
        days: records.len(),
        mean_error,
        max_error,
        min_error,
        actual_change: last.actual_weight - first.actual_weight,
        theoretical_change: last.theoretical_weight - first.theoretical_weight,
    })
}

/// Balance as a daily series
pub fn balance_series(records: &[CalorieBalanceRecord]) -> Vec<DailyPoint> {
    records
        .iter()
        .map(|r| DailyPoint::new(r.date, r.balance, 1))
        .collect()
}

/// Observed weights as a daily series
pub fn actual_weight_series(records: &[WeightPredictionRecord]) -> Vec<DailyPoint> {
    records
        .iter()
        .map(|r| DailyPoint::new(r.date, r.actual_weight, 1))
        .collect()
}

/// Theoretical weights as a daily series
pub fn theoretical_weight_series(records: &[WeightPredictionRecord]) -> Vec<DailyPoint> {
    records
        .iter()
        .map(|r| DailyPoint::new(r.date, r.theoretical_weight, 1))
        .collect()
}

type DayLookup = BTreeMap<NaiveDate, f64>;

/// Index each required component by date, reporting all absent ones at once
fn component_lookups(
    components: &ComponentSeries,
    required: &[Component],
) -> Result<BTreeMap<Component, DayLookup>, DerivationFailure> {
    let missing: Vec<Component> = required
        .iter()
        .copied()
        .filter(|c| components.get(c).map_or(true, |series| series.is_empty()))
        .collect();

    if !missing.is_empty() {
        warn!(missing = %component_list(&missing), "derived metric is missing components");
        return Err(DerivationFailure::MissingComponents(missing));
    }

    Ok(required
        .iter()
        .map(|c| {
            let lookup: DayLookup = components
                .get(c)
                .map(|series| series.iter().map(|p| (p.date, p.value)).collect())
                .unwrap_or_default();
            (*c, lookup)
        })
        .collect())
}

/// Days present in every lookup, ascending
fn common_days(lookups: &BTreeMap<Component, DayLookup>) -> Vec<NaiveDate> {
    let mut iter = lookups.values();
    let Some(first) = iter.next() else {
        return Vec::new();
    };

    let mut days: BTreeSet<NaiveDate> = first.keys().copied().collect();
    for lookup in iter {
        days.retain(|d| lookup.contains_key(d));
    }
    days.into_iter().collect()
}
