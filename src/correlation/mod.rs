//! Observed vs. predicted viscosity, one row per sample.

use chrono::{DateTime, Local, TimeZone, Utc};
use serde::Serialize;

use crate::ingest::Sample;

/// Exclusive band for good milk viscosity.
pub const GOOD_VISCOSITY_MIN: f64 = 1.5;
pub const GOOD_VISCOSITY_MAX: f64 = 2.0;

/// Differences above this are flagged.
pub const HIGH_DIFFERENCE: f64 = 1.0;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Quality {
    Good,
    Bad,
}

impl Quality {
    pub fn label(&self) -> &'static str {
        match self {
            Quality::Good => "Good Milk",
            Quality::Bad => "Bad Milk",
        }
    }
}

pub fn classify(viscosity: f64) -> Quality {
    if viscosity > GOOD_VISCOSITY_MIN && viscosity < GOOD_VISCOSITY_MAX {
        Quality::Good
    } else {
        Quality::Bad
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CorrelationRow {
    pub timestamp_ms: i64,
    pub actual: f64,
    pub predicted: Option<f64>,
    pub abs_error: Option<f64>,
    pub high_difference: bool,
    pub actual_label: Quality,
    /// `Bad` when no prediction is present.
    pub predicted_label: Quality,
}

impl CorrelationRow {
    pub fn from_sample(sample: &Sample) -> Self {
        let actual = sample.row.viscosity();
        let abs_error = sample
            .prediction
            .map(|predicted| (actual - predicted).abs());

        Self {
            timestamp_ms: sample.row.timestamp_ms(),
            actual,
            predicted: sample.prediction,
            abs_error,
            high_difference: abs_error.map_or(false, |diff| diff > HIGH_DIFFERENCE),
            actual_label: classify(actual),
            predicted_label: sample.prediction.map_or(Quality::Bad, classify),
        }
    }

    /// Wall-clock time of the sample, `HH:MM:SS` in local time.
    pub fn time_label(&self) -> String {
        time_label_in(&Local, self.timestamp_ms)
    }

    /// One line of the printed table.
    pub fn describe(&self) -> String {
        let prediction = match (self.predicted, self.abs_error) {
            (Some(predicted), Some(diff)) => format!(
                "predicted {:.2} diff {:.2}{}",
                predicted,
                diff,
                if self.high_difference { " (high)" } else { "" }
            ),
            _ => "no prediction".to_string(),
        };
        format!(
            "{} actual {:.2} {} | actual {} | predicted {}",
            self.time_label(),
            self.actual,
            prediction,
            self.actual_label.label(),
            self.predicted_label.label()
        )
    }
}

pub fn time_label_in<Tz: TimeZone>(tz: &Tz, timestamp_ms: i64) -> String
where
    Tz::Offset: std::fmt::Display,
{
    match DateTime::<Utc>::from_timestamp_millis(timestamp_ms) {
        Some(utc) => utc.with_timezone(tz).format("%H:%M:%S").to_string(),
        None => "--:--:--".to_string(),
    }
}

/// Builds the table in sample order.
pub fn build_table<'a>(samples: impl IntoIterator<Item = &'a Sample>) -> Vec<CorrelationRow> {
    samples.into_iter().map(CorrelationRow::from_sample).collect()
}
