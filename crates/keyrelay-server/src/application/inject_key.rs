//! KeyInjector: the serialized key-injection queue.
//!
//! This use case sits at the application layer and delegates to a
//! [`PlatformKeyInjector`] trait object for OS-level event synthesis.  The
//! platform-specific implementations live in the infrastructure layer.
//!
//! # Why a dedicated queue? (for beginners)
//!
//! Synthetic-input system calls can be slow (they round-trip through the
//! window server).  If the network receive loop called them directly, a
//! burst of inbound messages would back up behind the OS — and two peers
//! pressing buttons at the same time could interleave their down/up pairs
//! as `down, down, up, up` instead of `down, up, down, up`.
//!
//! [`KeyInjector::spawn`] therefore starts one dedicated Tokio task that
//! owns the platform adapter.  Requests arrive on an mpsc queue and are
//! executed strictly in order: down event, a [`KEY_EVENT_GAP`] pause, up
//! event, next request.  [`KeyInjector::inject`] itself never waits.
//!
//! # Permission gate
//!
//! Synthesising input requires an OS permission grant (e.g. macOS
//! Accessibility).  That grant is polled *outside* this module; its current
//! boolean value is shared here as an `AtomicBool` and consulted at the
//! moment of injection.  When the check fails the request is dropped
//! silently — not queued, not retried.  Surfacing permission status to the
//! user is the UI layer's job, not this call's return value.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use keyrelay_core::KeyCode;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Pause between the down event and the up event of one key press.
pub const KEY_EVENT_GAP: Duration = Duration::from_millis(1);

/// Depth of the injection queue; beyond this, requests are dropped.
const QUEUE_DEPTH: usize = 256;

/// Error type for platform input synthesis.
#[derive(Debug, Error)]
pub enum InjectionError {
    /// The OS-level event synthesis call failed.
    #[error("platform error: {0}")]
    Platform(String),
}

/// Platform-agnostic key synthesis trait.
///
/// Each supported OS provides an implementation in the infrastructure layer;
/// tests use the recording mock.
pub trait PlatformKeyInjector: Send + Sync {
    /// Synthesises a key press (key-down event).
    fn emit_key_down(&self, key: KeyCode) -> Result<(), InjectionError>;

    /// Synthesises a key release (key-up event).
    fn emit_key_up(&self, key: KeyCode) -> Result<(), InjectionError>;
}

/// Handle to the serialized injection queue.
///
/// Cheap to clone; all clones feed the same queue, so requests from any
/// producer are globally ordered.
#[derive(Clone)]
pub struct KeyInjector {
    tx: mpsc::Sender<KeyCode>,
    permission_granted: Arc<AtomicBool>,
}

impl KeyInjector {
    /// Spawns the injection worker task and returns the queue handle.
    ///
    /// The worker owns `platform` and processes one request at a time:
    /// down, [`KEY_EVENT_GAP`], up.  A platform error skips the rest of
    /// that request (never the queue) and is logged.
    pub fn spawn(
        platform: Arc<dyn PlatformKeyInjector>,
        permission_granted: Arc<AtomicBool>,
    ) -> Self {
        let (tx, mut rx) = mpsc::channel::<KeyCode>(QUEUE_DEPTH);

        tokio::spawn(async move {
            while let Some(key) = rx.recv().await {
                if let Err(e) = platform.emit_key_down(key) {
                    warn!("key-down synthesis failed for {key:?}: {e}");
                    continue;
                }
                tokio::time::sleep(KEY_EVENT_GAP).await;
                if let Err(e) = platform.emit_key_up(key) {
                    warn!("key-up synthesis failed for {key:?}: {e}");
                }
            }
            debug!("injection queue closed; worker exiting");
        });

        Self {
            tx,
            permission_granted,
        }
    }

    /// Queues a down/up event pair for `key`.
    ///
    /// No-op for [`KeyCode::Unknown`].  Dropped silently when the permission
    /// flag is currently false.  Never blocks: if the queue is full the
    /// request is dropped with a debug log.
    pub fn inject(&self, key: KeyCode) {
        if key == KeyCode::Unknown {
            return;
        }
        if !self.permission_granted.load(Ordering::Relaxed) {
            debug!("dropping injection of {key:?}: input permission not granted");
            return;
        }
        if self.tx.try_send(key).is_err() {
            debug!("injection queue full; dropping {key:?}");
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::injection::mock::{KeyEdge, MockKeyInjector};

    fn granted() -> Arc<AtomicBool> {
        Arc::new(AtomicBool::new(true))
    }

    async fn drain(mock: &MockKeyInjector, expected_events: usize) {
        // The worker runs on its own task; poll until it has caught up.
        for _ in 0..200 {
            if mock.events.lock().unwrap().len() >= expected_events {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!(
            "injection worker did not emit {expected_events} events; got {:?}",
            mock.events.lock().unwrap()
        );
    }

    #[tokio::test]
    async fn test_inject_emits_down_then_up() {
        // Arrange
        let mock = Arc::new(MockKeyInjector::new());
        let injector = KeyInjector::spawn(Arc::clone(&mock) as _, granted());

        // Act
        injector.inject(KeyCode::KeyW);
        drain(&mock, 2).await;

        // Assert
        let events = mock.events.lock().unwrap();
        assert_eq!(
            *events,
            vec![(KeyEdge::Down, KeyCode::KeyW), (KeyEdge::Up, KeyCode::KeyW)]
        );
    }

    #[tokio::test]
    async fn test_back_to_back_injections_never_interleave() {
        // Arrange
        let mock = Arc::new(MockKeyInjector::new());
        let injector = KeyInjector::spawn(Arc::clone(&mock) as _, granted());

        // Act — two requests queued back-to-back
        injector.inject(KeyCode::KeyA);
        injector.inject(KeyCode::KeyB);
        drain(&mock, 4).await;

        // Assert — down→up, down→up in request order; never down,down,up,up
        let events = mock.events.lock().unwrap();
        assert_eq!(
            *events,
            vec![
                (KeyEdge::Down, KeyCode::KeyA),
                (KeyEdge::Up, KeyCode::KeyA),
                (KeyEdge::Down, KeyCode::KeyB),
                (KeyEdge::Up, KeyCode::KeyB),
            ]
        );
    }

    #[tokio::test]
    async fn test_unknown_key_is_a_no_op() {
        let mock = Arc::new(MockKeyInjector::new());
        let injector = KeyInjector::spawn(Arc::clone(&mock) as _, granted());

        injector.inject(KeyCode::Unknown);
        tokio::time::sleep(Duration::from_millis(30)).await;

        assert!(mock.events.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_permission_denied_drops_request_silently() {
        // Arrange — permission flag false at the moment of injection
        let mock = Arc::new(MockKeyInjector::new());
        let permission = Arc::new(AtomicBool::new(false));
        let injector = KeyInjector::spawn(Arc::clone(&mock) as _, Arc::clone(&permission));

        // Act
        injector.inject(KeyCode::KeyW);
        tokio::time::sleep(Duration::from_millis(30)).await;

        // Assert — not queued, not retried once permission appears later
        assert!(mock.events.lock().unwrap().is_empty());
        permission.store(true, Ordering::Relaxed);
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(mock.events.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_platform_down_failure_skips_the_up_event() {
        // Arrange
        let mock = Arc::new(MockKeyInjector::failing());
        let injector = KeyInjector::spawn(Arc::clone(&mock) as _, granted());

        // Act
        injector.inject(KeyCode::KeyW);
        tokio::time::sleep(Duration::from_millis(30)).await;

        // Assert — the failed request emitted nothing and the worker survives
        assert!(mock.events.lock().unwrap().is_empty());
        mock.set_should_fail(false);
        injector.inject(KeyCode::KeyS);
        drain(&mock, 2).await;
        assert_eq!(mock.events.lock().unwrap().len(), 2);
    }
}
