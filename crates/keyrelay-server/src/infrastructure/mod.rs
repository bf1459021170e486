//! Infrastructure layer for the keyrelay server.
//!
//! OS and I/O adapters behind the application-layer traits: the network
//! listener, platform key injection, the UI status bridge, and the TOML
//! configuration store.

pub mod config;
pub mod injection;
pub mod network;
pub mod status;
