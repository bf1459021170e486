//! Platform-specific key injection implementations.
//!
//! Production builds add an OS adapter here (`SendInput` on Windows, XTest
//! on Linux, CoreGraphics on macOS) implementing
//! [`crate::application::inject_key::PlatformKeyInjector`].  The recording
//! mock is always available and is what the default binary wires up.

pub mod mock;
