use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Width of one observation tuple: ignored slot, six metrics, timestamp.
pub const ROW_WIDTH: usize = 8;

/// Offset of the first real metric inside a row.
pub const FIRST_METRIC_OFFSET: usize = 1;

/// Offset of the timestamp inside a row.
pub const TIMESTAMP_OFFSET: usize = ROW_WIDTH - 1;

pub const METRIC_COUNT: usize = 6;

/// Row offset holding the observed viscosity.
pub const VISCOSITY_OFFSET: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricDescriptor {
    pub key: &'static str,
    pub color: &'static str,
}

impl MetricDescriptor {
    pub const fn new(key: &'static str, color: &'static str) -> Self {
        Self { key, color }
    }
}

/// Ordinal position is the mapping from row offset to metric: descriptor `i`
/// reads row offset `i + 1`.
pub const METRICS: [MetricDescriptor; METRIC_COUNT] = [
    MetricDescriptor::new("Elapsed Time", "#EF4444"),
    MetricDescriptor::new("Velocity", "#3B82F6"),
    MetricDescriptor::new("Density", "#10B981"),
    MetricDescriptor::new("Viscosity", "#F59E0B"),
    MetricDescriptor::new("TDS", "#8B5CF6"),
    MetricDescriptor::new("Mass", "#6366F1"),
];

/// One observation: `[ignored, elapsed, velocity, density, viscosity, tds, mass, timestamp_ms]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row(pub [f64; ROW_WIDTH]);

impl Row {
    pub fn new(metrics: [f64; METRIC_COUNT], timestamp_ms: i64) -> Self {
        let mut values = [0.0; ROW_WIDTH];
        values[FIRST_METRIC_OFFSET..TIMESTAMP_OFFSET].copy_from_slice(&metrics);
        values[TIMESTAMP_OFFSET] = timestamp_ms as f64;
        Self(values)
    }

    /// Value for the metric at descriptor position `index`.
    pub fn metric(&self, index: usize) -> f64 {
        self.0[index + FIRST_METRIC_OFFSET]
    }

    pub fn timestamp_ms(&self) -> i64 {
        self.0[TIMESTAMP_OFFSET] as i64
    }

    pub fn viscosity(&self) -> f64 {
        self.0[VISCOSITY_OFFSET]
    }

    /// Validates an untyped JSON row. Anything that is not an array of exactly
    /// `ROW_WIDTH` finite numbers is rejected.
    pub fn from_value(value: &Value) -> Option<Self> {
        let items = value.as_array()?;
        if items.len() != ROW_WIDTH {
            return None;
        }

        let mut values = [0.0; ROW_WIDTH];
        for (slot, item) in values.iter_mut().zip(items) {
            let number = item.as_f64()?;
            if !number.is_finite() {
                return None;
            }
            *slot = number;
        }
        Some(Self(values))
    }
}

/// One `update_data` message as the consumer sees it.
///
/// Both vectors keep the producer's order (newest first). Entries that failed
/// validation are `None` so every remaining entry keeps its position.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Payload {
    #[serde(rename = "data", deserialize_with = "lenient_rows")]
    pub rows: Vec<Option<Row>>,
    #[serde(default, deserialize_with = "lenient_predictions")]
    pub predictions: Vec<Option<f64>>,
}

impl Payload {
    pub fn new(rows: Vec<Row>, predictions: Vec<f64>) -> Self {
        Self {
            rows: rows.into_iter().map(Some).collect(),
            predictions: predictions.into_iter().map(Some).collect(),
        }
    }

    pub fn malformed_rows(&self) -> usize {
        self.rows.iter().filter(|row| row.is_none()).count()
    }
}

fn lenient_rows<'de, D>(deserializer: D) -> Result<Vec<Option<Row>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Vec<Value> = Deserialize::deserialize(deserializer)?;
    Ok(raw.iter().map(Row::from_value).collect())
}

fn lenient_predictions<'de, D>(deserializer: D) -> Result<Vec<Option<f64>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<Vec<Value>> = Deserialize::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .iter()
        .map(|value| value.as_f64().filter(|number| number.is_finite()))
        .collect())
}

/// Producer-side shape of an `update_data` message, newest row first.
#[derive(Debug, Clone, Serialize)]
pub struct UpdateData<'a> {
    pub data: &'a [Row],
    pub predictions: &'a [f64],
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn row_offsets_map_to_descriptors() {
        let row = Row([0.0, 10.0, 20.0, 30.0, 1.8, 50.0, 60.0, 1_000.0]);
        assert_eq!(row.metric(0), 10.0);
        assert_eq!(row.metric(3), 1.8);
        assert_eq!(row.viscosity(), row.metric(3));
        assert_eq!(METRICS[3].key, "Viscosity");
        assert_eq!(row.metric(METRIC_COUNT - 1), 60.0);
        assert_eq!(row.timestamp_ms(), 1_000);
    }

    #[test]
    fn row_new_leaves_slot_zero_empty() {
        let row = Row::new([1.0, 2.0, 3.0, 4.0, 5.0, 6.0], 42);
        assert_eq!(row.0, [0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 42.0]);
    }

    #[test]
    fn from_value_rejects_wrong_width_and_non_numbers() {
        assert!(Row::from_value(&json!([0, 1, 2, 3, 4, 5, 6, 7])).is_some());
        assert!(Row::from_value(&json!([0, 1, 2, 3, 4, 5, 6])).is_none());
        assert!(Row::from_value(&json!([0, 1, 2, "3", 4, 5, 6, 7])).is_none());
        assert!(Row::from_value(&json!({"a": 1})).is_none());
    }

    #[test]
    fn payload_decoding_keeps_positions_of_bad_entries() {
        let payload: Payload = serde_json::from_value(json!({
            "data": [[0, 1, 2, 3, 1.8, 5, 6, 1000], [0, "x"], [0, 1, 2, 3, 1.9, 5, 6, 2000]],
            "predictions": [2.0, null, "bad"]
        }))
        .unwrap();

        assert_eq!(payload.rows.len(), 3);
        assert!(payload.rows[1].is_none());
        assert_eq!(payload.malformed_rows(), 1);
        assert_eq!(payload.predictions, vec![Some(2.0), None, None]);
    }

    #[test]
    fn predictions_are_optional_on_the_wire() {
        let payload: Payload =
            serde_json::from_value(json!({ "data": [[0, 1, 2, 3, 4, 5, 6, 7]] })).unwrap();
        assert!(payload.predictions.is_empty());
    }

    #[test]
    fn missing_data_field_is_an_error() {
        assert!(serde_json::from_value::<Payload>(json!({ "predictions": [] })).is_err());
    }
}
