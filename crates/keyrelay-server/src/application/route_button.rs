//! RouteButtonUseCase: resolves a received button label to a key injection.
//!
//! Sits between the network listener and the [`KeyInjector`].  The listener
//! publishes every decoded label — including the heartbeat sentinel, which
//! is filtered here before anything can be injected.
//!
//! # The mapping table
//!
//! The label→key-identifier mapping is owned by the UI layer; this use case
//! holds a shared read handle and performs exactly one lookup per received
//! label (no caching of resolutions).  An unmapped label is not an error: it
//! is "no action", and the display layer shows it as unmapped.

use std::collections::HashMap;
use std::sync::Arc;

use keyrelay_core::{keycode, HEARTBEAT};
use tokio::sync::RwLock;
use tracing::debug;

use crate::application::inject_key::KeyInjector;

/// Shared label → key-identifier mapping, owned by the UI layer.
pub type SharedMapping = Arc<RwLock<HashMap<String, String>>>;

/// Routes received button labels through the mapping into the injector.
pub struct RouteButtonUseCase {
    mapping: SharedMapping,
    injector: KeyInjector,
}

impl RouteButtonUseCase {
    pub fn new(mapping: SharedMapping, injector: KeyInjector) -> Self {
        Self { mapping, injector }
    }

    /// Handles one received label.
    ///
    /// The heartbeat sentinel never triggers injection, even if `HEARTBEAT`
    /// happens to appear as a mapped key's label.  For any other label the
    /// mapping is consulted once; on a hit the key identifier is resolved
    /// and queued, on a miss nothing happens.
    pub async fn handle(&self, label: &str) {
        if label == HEARTBEAT {
            return;
        }

        let identifier = {
            let mapping = self.mapping.read().await;
            mapping.get(label).cloned()
        };

        match identifier {
            Some(identifier) => {
                let key = keycode::resolve(&identifier);
                self.injector.inject(key);
            }
            None => debug!("button {label:?} has no mapping entry; ignoring"),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::injection::mock::{KeyEdge, MockKeyInjector};
    use keyrelay_core::KeyCode;
    use std::sync::atomic::AtomicBool;
    use std::time::Duration;

    fn make_use_case(
        entries: &[(&str, &str)],
    ) -> (RouteButtonUseCase, Arc<MockKeyInjector>) {
        let mapping: HashMap<String, String> = entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let mock = Arc::new(MockKeyInjector::new());
        let injector = KeyInjector::spawn(
            Arc::clone(&mock) as _,
            Arc::new(AtomicBool::new(true)),
        );
        let uc = RouteButtonUseCase::new(Arc::new(RwLock::new(mapping)), injector);
        (uc, mock)
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    #[tokio::test]
    async fn test_mapped_label_injects_resolved_key() {
        // Arrange
        let (uc, mock) = make_use_case(&[("L1", "W")]);

        // Act
        uc.handle("L1").await;
        settle().await;

        // Assert — down/up pair for KeyW
        let events = mock.events.lock().unwrap();
        assert_eq!(
            *events,
            vec![(KeyEdge::Down, KeyCode::KeyW), (KeyEdge::Up, KeyCode::KeyW)]
        );
    }

    #[tokio::test]
    async fn test_unmapped_label_is_a_no_op() {
        let (uc, mock) = make_use_case(&[("L1", "W")]);

        uc.handle("UNKNOWN_BTN").await;
        settle().await;

        assert!(mock.events.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_heartbeat_never_injects_even_when_mapped() {
        // The sentinel is filtered before the mapping lookup.
        let (uc, mock) = make_use_case(&[(HEARTBEAT, "W")]);

        uc.handle(HEARTBEAT).await;
        settle().await;

        assert!(mock.events.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_mapping_to_unrecognised_identifier_is_a_no_op() {
        // The mapping entry exists but its key identifier is not in the table.
        let (uc, mock) = make_use_case(&[("L1", "NOT_A_KEY")]);

        uc.handle("L1").await;
        settle().await;

        assert!(mock.events.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_mapping_updates_are_seen_by_later_lookups() {
        // Arrange — start with an empty table
        let (uc, mock) = make_use_case(&[]);
        uc.handle("L1").await;
        settle().await;
        assert!(mock.events.lock().unwrap().is_empty());

        // Act — the UI layer adds an entry
        uc.mapping
            .write()
            .await
            .insert("L1".to_string(), "SPACE".to_string());
        uc.handle("L1").await;
        settle().await;

        // Assert
        let events = mock.events.lock().unwrap();
        assert_eq!(events[0], (KeyEdge::Down, KeyCode::Space));
    }
}
