//! keyrelay-server library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! # What does keyrelay-server do? (for beginners)
//!
//! The server turns a phone (or any networked device) into a remote keypad
//! for the machine it runs on.  The remote sends short UTF-8 labels such as
//! `"L1"` over UDP or TCP to port 12345.  The server:
//!
//! 1. Receives each payload on a continuous receive loop.
//! 2. Decodes it as UTF-8 and classifies it (heartbeat vs. button press).
//! 3. Refreshes the sender's entry in the client registry and the inbound
//!    message-rate counter.
//! 4. Publishes the decoded label to the UI/status layer.
//! 5. Looks the label up in the user-supplied mapping table and, on a hit,
//!    queues a down/up key-event pair on the serialized injection queue.
//!
//! Injection runs on its own queue so a burst of inbound messages is never
//! delayed behind synthetic-input system calls, and so two remotes pressing
//! buttons simultaneously get strictly ordered down/up pairs.

/// Application layer: key injection and button routing use cases.
pub mod application;

/// Infrastructure layer: network listener, injection adapters, status
/// bridge, and configuration.
pub mod infrastructure;
