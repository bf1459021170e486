//! Application layer for the keyrelay server.
//!
//! Use cases that coordinate between the network infrastructure and the
//! OS-level input adapters, with no direct socket or OS API dependencies.

pub mod inject_key;
pub mod route_button;

pub use inject_key::{InjectionError, KeyInjector, PlatformKeyInjector, KEY_EVENT_GAP};
pub use route_button::RouteButtonUseCase;
