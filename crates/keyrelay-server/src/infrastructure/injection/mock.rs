//! Mock platform key injector for unit testing.
//!
//! # Why a mock injector?
//!
//! A real injector makes OS API calls that:
//!
//! - Require a desktop session and an input-synthesis permission grant.
//! - Actually press keys on the test machine.
//! - Cannot be observed directly from Rust test code.
//!
//! The `MockKeyInjector` replaces the OS calls with in-memory recording.
//! Each emitted edge is pushed into a `Mutex<Vec<...>>` so test assertions
//! can inspect exactly what was emitted and in what order — which is how
//! the down→up ordering guarantee is verified.
//!
//! # `should_fail` switch
//!
//! Flip `should_fail` to make every emit return an error, to exercise the
//! error-handling paths of the injection worker without a broken OS.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use keyrelay_core::KeyCode;

use crate::application::inject_key::{InjectionError, PlatformKeyInjector};

/// Which half of a key press an emitted event represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEdge {
    Down,
    Up,
}

/// A key injector that records all calls without touching the OS.
#[derive(Debug, Default)]
pub struct MockKeyInjector {
    /// Every emitted (edge, key) pair, in emission order.
    pub events: Mutex<Vec<(KeyEdge, KeyCode)>>,
    /// When `true`, every emit immediately returns `InjectionError::Platform`.
    should_fail: AtomicBool,
}

impl MockKeyInjector {
    /// Creates a mock with empty records that succeeds on every call.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a mock whose emits fail until [`Self::set_should_fail`] flips it.
    pub fn failing() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            should_fail: AtomicBool::new(true),
        }
    }

    pub fn set_should_fail(&self, fail: bool) {
        self.should_fail.store(fail, Ordering::Relaxed);
    }

    fn check(&self) -> Result<(), InjectionError> {
        if self.should_fail.load(Ordering::Relaxed) {
            return Err(InjectionError::Platform("injected failure".to_string()));
        }
        Ok(())
    }
}

impl PlatformKeyInjector for MockKeyInjector {
    fn emit_key_down(&self, key: KeyCode) -> Result<(), InjectionError> {
        self.check()?;
        self.events.lock().unwrap().push((KeyEdge::Down, key));
        Ok(())
    }

    fn emit_key_up(&self, key: KeyCode) -> Result<(), InjectionError> {
        self.check()?;
        self.events.lock().unwrap().push((KeyEdge::Up, key));
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_records_edges_in_order() {
        let mock = MockKeyInjector::new();
        mock.emit_key_down(KeyCode::KeyA).unwrap();
        mock.emit_key_up(KeyCode::KeyA).unwrap();

        let events = mock.events.lock().unwrap();
        assert_eq!(
            *events,
            vec![(KeyEdge::Down, KeyCode::KeyA), (KeyEdge::Up, KeyCode::KeyA)]
        );
    }

    #[test]
    fn test_failing_mock_records_nothing() {
        let mock = MockKeyInjector::failing();
        assert!(mock.emit_key_down(KeyCode::KeyA).is_err());
        assert!(mock.events.lock().unwrap().is_empty());
    }

    #[test]
    fn test_set_should_fail_toggles_behaviour() {
        let mock = MockKeyInjector::failing();
        mock.set_should_fail(false);
        assert!(mock.emit_key_down(KeyCode::KeyA).is_ok());
    }
}
