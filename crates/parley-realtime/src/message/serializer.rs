//! JSON serialization for WebSocket messages.

use super::types::{InboundMessage, OutboundMessage};
use super::validator::{validate_frame, validate_inbound};
use crate::error::ChatError;

/// Serialize an outbound message to JSON text.
pub fn serialize_outbound(msg: &OutboundMessage) -> Result<String, serde_json::Error> {
    serde_json::to_string(msg)
}

/// Deserialize an inbound message from JSON text.
pub fn deserialize_inbound(text: &str) -> Result<InboundMessage, serde_json::Error> {
    serde_json::from_str(text)
}

/// Validate, parse, and field-check a raw client frame.
pub fn parse_frame(
    raw: &str,
    max_bytes: usize,
    max_chars: usize,
) -> Result<InboundMessage, ChatError> {
    validate_frame(raw, max_bytes)?;
    let msg = deserialize_inbound(raw).map_err(|e| ChatError::InvalidMessage(e.to_string()))?;
    validate_inbound(&msg, max_chars)?;
    Ok(msg)
}
