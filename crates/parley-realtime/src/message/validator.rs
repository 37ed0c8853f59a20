//! Message validation rules.

use super::types::InboundMessage;
use crate::error::ChatError;

/// Checks a raw inbound frame before it is parsed.
pub fn validate_frame(raw: &str, max_bytes: usize) -> Result<(), ChatError> {
    if raw.len() > max_bytes {
        return Err(ChatError::InvalidMessage(format!(
            "frame exceeds maximum size of {max_bytes} bytes"
        )));
    }

    if raw.trim().is_empty() {
        return Err(ChatError::InvalidMessage("empty frame".to_string()));
    }

    Ok(())
}

/// Checks a chat message body.
///
/// Length is counted in characters, not bytes.
pub fn validate_text(text: &str, max_chars: usize) -> Result<(), ChatError> {
    if text.trim().is_empty() {
        return Err(ChatError::InvalidMessage(
            "message text must not be empty".to_string(),
        ));
    }

    if text.chars().count() > max_chars {
        return Err(ChatError::InvalidMessage(format!(
            "message text exceeds {max_chars} characters"
        )));
    }

    Ok(())
}

/// Field-level checks that serde cannot express.
pub fn validate_inbound(msg: &InboundMessage, max_chars: usize) -> Result<(), ChatError> {
    match msg {
        InboundMessage::SendMessage { text, .. } => validate_text(text, max_chars),
        InboundMessage::EndChat {
            session_id: Some(_),
            peer: Some(_),
        }
        | InboundMessage::JoinChat {
            session_id: Some(_),
            peer: Some(_),
        } => Err(ChatError::InvalidMessage(
            "give either session_id or peer, not both".to_string(),
        )),
        _ => Ok(()),
    }
}
