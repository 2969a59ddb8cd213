//! Framing of JSON-encoded [`NetworkMessage`]s on a logical byte stream,
//! delimited by the single byte `#` (0x23) — §4.2.
//!
//! Multiple messages may be concatenated on one send; receivers accumulate
//! bytes per sender in a buffer and split on `#`. Malformed segments are
//! logged and discarded; the receiver continues with the next segment
//! rather than failing the whole buffer.

use super::message::NetworkMessage;

pub const FRAME_DELIMITER: u8 = b'#';

/// Encode one message followed by the frame delimiter.
pub fn encode(message: &NetworkMessage) -> Result<String, crate::error::SimError> {
    let mut s = serde_json::to_string(message)?;
    s.push(FRAME_DELIMITER as char);
    Ok(s)
}

/// Append newly-arrived bytes to `buffer`, split out every complete
/// `#`-delimited segment, parse each as a [`NetworkMessage`], and return
/// the successfully-parsed messages in arrival order. Any trailing
/// incomplete segment is left in `buffer` for the next call. A segment
/// that fails to parse is logged and skipped — it does not poison the
/// segments around it.
pub fn feed(buffer: &mut String, bytes: &str) -> Vec<NetworkMessage> {
    buffer.push_str(bytes);

    let mut messages = Vec::new();
    loop {
        let Some(pos) = buffer.find(FRAME_DELIMITER as char) else {
            break;
        };
        let segment: String = buffer.drain(..=pos).collect();
        let segment = &segment[..segment.len() - 1]; // drop the delimiter itself

        if segment.is_empty() {
            continue;
        }

        match serde_json::from_str::<NetworkMessage>(segment) {
            Ok(msg) => messages.push(msg),
            Err(e) => {
                tracing::warn!(error = %e, segment, "discarding malformed protocol message");
            }
        }
    }
    messages
}
