//! # keyrelay-core
//!
//! Shared library for keyrelay containing the key-code table, the client
//! registry, the inbound rate meter, and message classification.
//!
//! This crate is used by the server application. It has zero dependencies on
//! OS input APIs, UI frameworks, or network sockets.
//!
//! # Architecture overview (for beginners)
//!
//! Keyrelay turns a phone (or any device that can send a UDP datagram or a
//! TCP write) into a remote keypad for the host machine.  The remote sends a
//! short UTF-8 label such as `"L1"` or `"JUMP"`; the server looks that label
//! up in a user-supplied mapping table and synthesises the mapped key press
//! on the host, as if a physical keyboard had been used.
//!
//! This crate is the pure foundation.  It defines:
//!
//! - **`keycode`** – The closed table of key identifiers a mapping entry can
//!   target, and the case-insensitive lookup from identifier string to
//!   [`KeyCode`].
//!
//! - **`registry`** – The [`ClientRegistry`]: which remote peers are
//!   currently active, based on the timestamp of their last message.
//!
//! - **`rate`** – The [`RateMeter`]: a 1-second snapshot-and-reset counter
//!   published as "messages per second".
//!
//! - **`ingest`** – UTF-8 decoding and heartbeat/button classification of a
//!   raw inbound payload.

// Declare the four top-level modules.  Rust will look for each in a file or
// subdirectory with the same name (e.g., src/keycode/mod.rs).
pub mod ingest;
pub mod keycode;
pub mod rate;
pub mod registry;

// Re-export the most-used types at the crate root so callers can write
// `keyrelay_core::KeyCode` instead of `keyrelay_core::keycode::KeyCode`.
pub use ingest::{classify, ButtonEvent, ClientId, InboundMessage, HEARTBEAT};
pub use keycode::{resolve, KeyCode};
pub use rate::RateMeter;
pub use registry::{ClientRegistry, CLIENT_TIMEOUT, SWEEP_INTERVAL};
