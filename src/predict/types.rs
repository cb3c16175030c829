use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Body of `POST /predict`. Inputs may arrive as numbers or numeric strings,
/// since browser forms post their raw field values.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PredictionRequest {
    #[serde(deserialize_with = "number_or_numeric_string")]
    pub elapsedtime: f64,
    #[serde(deserialize_with = "number_or_numeric_string")]
    pub velocity: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PredictionResponse {
    pub prediction: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorBody {
    pub error: String,
}

fn number_or_numeric_string<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let number = match &value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    };
    number
        .filter(|number| number.is_finite())
        .ok_or_else(|| de::Error::custom(format!("expected a finite number, got {value}")))
}
