//! Inbound payload decoding and classification.
//!
//! Every inbound payload — one UDP datagram, or one TCP read of up to 1024
//! bytes — is interpreted as UTF-8 text and classified as either a liveness
//! heartbeat or a button event.
//!
//! # Silent drop of undecodable payloads
//!
//! A payload that is not valid UTF-8 is dropped: not forwarded, not counted
//! toward the message rate.  Callers may log the drop at debug level for
//! diagnostics, but it never reaches user-visible state.
//!
//! # The heartbeat sentinel
//!
//! The reserved literal [`HEARTBEAT`] keeps a peer marked active without
//! representing a button press.  Classification is an exact match: a payload
//! of `"HEARTBEAT "` or `"heartbeat"` is an ordinary button label.

use std::net::SocketAddr;
use std::time::Instant;

/// Reserved liveness-only message literal.
pub const HEARTBEAT: &str = "HEARTBEAT";

/// Identity of a remote peer.
///
/// For the datagram transport this is the sender address of each datagram;
/// for the connection-oriented transport it is the peer address of the
/// accepted connection.  Identity is not reused across reconnects unless the
/// peer reuses the same address and port.
pub type ClientId = SocketAddr;

/// A classified inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundMessage {
    /// Keep-alive only; refreshes the peer's liveness and nothing else.
    Heartbeat,
    /// A button press, carrying the full decoded label verbatim.
    Button(String),
}

/// A decoded button event as published to the mapping/display consumer.
///
/// Transient — never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ButtonEvent {
    /// The decoded label, exactly as received (no trimming or validation).
    pub label: String,
    /// The peer that sent the message.
    pub source: ClientId,
    /// When the message was processed.
    pub received_at: Instant,
}

/// Decodes and classifies a raw payload.
///
/// Returns `None` when the payload is not valid UTF-8 (silent drop).  Any
/// decoded string other than the exact heartbeat sentinel is a button label;
/// arbitrary strings are accepted here and resolved against the mapping
/// table later, where "unmapped" is a no-op.
pub fn classify(payload: &[u8]) -> Option<InboundMessage> {
    let text = std::str::from_utf8(payload).ok()?;
    if text == HEARTBEAT {
        Some(InboundMessage::Heartbeat)
    } else {
        Some(InboundMessage::Button(text.to_string()))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_button_label() {
        assert_eq!(
            classify(b"L1"),
            Some(InboundMessage::Button("L1".to_string()))
        );
    }

    #[test]
    fn test_classify_heartbeat_exact_match() {
        assert_eq!(classify(b"HEARTBEAT"), Some(InboundMessage::Heartbeat));
    }

    #[test]
    fn test_classify_heartbeat_requires_exact_match() {
        // Trailing whitespace or different case makes it a plain label.
        assert_eq!(
            classify(b"HEARTBEAT "),
            Some(InboundMessage::Button("HEARTBEAT ".to_string()))
        );
        assert_eq!(
            classify(b"heartbeat"),
            Some(InboundMessage::Button("heartbeat".to_string()))
        );
    }

    #[test]
    fn test_classify_invalid_utf8_is_dropped() {
        // 0xFF can never appear in valid UTF-8.
        assert_eq!(classify(&[0xFF, 0xFE, 0x01]), None);
    }

    #[test]
    fn test_classify_empty_payload_is_a_button() {
        // An empty datagram decodes to the empty string; the mapping layer
        // treats it as any other (almost certainly unmapped) label.
        assert_eq!(
            classify(b""),
            Some(InboundMessage::Button(String::new()))
        );
    }

    #[test]
    fn test_classify_preserves_label_verbatim() {
        // No trimming: surrounding whitespace stays in the label.
        assert_eq!(
            classify(b"  JUMP\n"),
            Some(InboundMessage::Button("  JUMP\n".to_string()))
        );
    }
}
