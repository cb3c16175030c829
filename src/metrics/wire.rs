use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::types::{Payload, UpdateData};

/// The only event name carried on the push channel.
pub const UPDATE_DATA_EVENT: &str = "update_data";

#[derive(Debug, Serialize, Deserialize)]
struct Envelope<T> {
    event: String,
    data: T,
}

/// Frames an `update_data` message for the websocket.
pub fn encode_update(update: &UpdateData<'_>) -> Result<String> {
    let envelope = Envelope {
        event: UPDATE_DATA_EVENT.to_string(),
        data: update,
    };
    serde_json::to_string(&envelope).context("failed to encode update_data frame")
}

/// Decodes one text frame.
///
/// Returns `Ok(None)` for events this client does not subscribe to. A frame
/// that is not an envelope, or whose `update_data` body lacks a `data` array,
/// is an error; row-level problems are handled by the lenient `Payload` decoder.
pub fn decode_frame(text: &str) -> Result<Option<Payload>> {
    let envelope: Envelope<Value> =
        serde_json::from_str(text).context("frame is not an event envelope")?;

    if envelope.event != UPDATE_DATA_EVENT {
        return Ok(None);
    }

    let payload = serde_json::from_value(envelope.data)
        .with_context(|| format!("malformed {UPDATE_DATA_EVENT} payload"))?;
    Ok(Some(payload))
}
