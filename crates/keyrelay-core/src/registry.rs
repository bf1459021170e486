//! The client registry: which remote peers are currently active.
//!
//! The registry is the server's in-memory record of every peer that has sent
//! a message recently.  Each entry tracks only the peer's address and the
//! timestamp of its most recent message (`lastSeen`).
//!
//! # Liveness model (for beginners)
//!
//! A datagram transport has no connect/disconnect lifecycle, so "active" can
//! only mean "sent something recently".  Every inbound message — heartbeats
//! included — refreshes the sender's `lastSeen`.  A periodic sweep removes
//! peers whose last message is older than [`CLIENT_TIMEOUT`]:
//!
//! ```text
//! touch(peer, now)        on every message
//! sweep(now)              every SWEEP_INTERVAL, independent of traffic
//! reset()                 on server stop
//! ```
//!
//! Worst case, a silent peer is reported active for
//! `CLIENT_TIMEOUT + SWEEP_INTERVAL` (15s) before the next sweep evicts it.
//!
//! The connection-oriented transport does not need this: its active count is
//! the number of open connections, and teardown is explicit.
//!
//! # Invariant
//!
//! After any `touch`/`sweep`/`reset` completes, [`ClientRegistry::active_count`]
//! equals the number of tracked records.  The registry itself is not
//! thread-safe; the server wraps it in a `Mutex` because the receive path
//! and the sweep timer mutate it concurrently.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::ingest::ClientId;

/// A peer with no message for longer than this is considered gone.
pub const CLIENT_TIMEOUT: Duration = Duration::from_secs(10);

/// How often the server runs [`ClientRegistry::sweep`].
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(5);

/// In-memory registry of currently active peers.
///
/// # HashMap choice
///
/// `HashMap<ClientId, Instant>` gives O(1) upsert on the hot receive path.
/// Iteration order is irrelevant — only membership and timestamps matter.
#[derive(Debug, Default)]
pub struct ClientRegistry {
    clients: HashMap<ClientId, Instant>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or refreshes a peer, recording `now` as its last activity.
    ///
    /// Returns `true` when the peer is new — an observable transition the
    /// caller surfaces as an active-count change.
    pub fn touch(&mut self, id: ClientId, now: Instant) -> bool {
        self.clients.insert(id, now).is_none()
    }

    /// Removes every peer whose last message is older than `timeout`.
    ///
    /// Returns the number of peers removed.  Runs on a fixed period so an
    /// idle server with no inbound traffic still evicts stale peers.
    pub fn sweep(&mut self, now: Instant, timeout: Duration) -> usize {
        let before = self.clients.len();
        self.clients
            .retain(|_, last_seen| now.duration_since(*last_seen) <= timeout);
        let removed = before - self.clients.len();
        if removed > 0 {
            debug!("swept {removed} stale client(s); {} remain", self.clients.len());
        }
        removed
    }

    /// Clears all records.  Used on server stop.
    pub fn reset(&mut self) {
        self.clients.clear();
    }

    /// Number of currently tracked peers.
    pub fn active_count(&self) -> usize {
        self.clients.len()
    }

    /// The timestamp of the most recent message from `id`, if tracked.
    pub fn last_seen(&self, id: &ClientId) -> Option<Instant> {
        self.clients.get(id).copied()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn peer(n: u8) -> ClientId {
        format!("192.168.1.{n}:4000").parse().unwrap()
    }

    #[test]
    fn test_registry_starts_empty() {
        let registry = ClientRegistry::new();
        assert_eq!(registry.active_count(), 0);
    }

    #[test]
    fn test_touch_new_peer_returns_true_and_increments_count() {
        // Arrange
        let mut registry = ClientRegistry::new();

        // Act
        let is_new = registry.touch(peer(1), Instant::now());

        // Assert
        assert!(is_new);
        assert_eq!(registry.active_count(), 1);
    }

    #[test]
    fn test_touch_known_peer_returns_false_and_keeps_count() {
        let mut registry = ClientRegistry::new();
        registry.touch(peer(1), Instant::now());

        let is_new = registry.touch(peer(1), Instant::now());

        assert!(!is_new);
        assert_eq!(registry.active_count(), 1);
    }

    #[test]
    fn test_touch_refreshes_last_seen_to_latest_message() {
        // Arrange
        let mut registry = ClientRegistry::new();
        let t0 = Instant::now();
        let t1 = t0 + Duration::from_secs(3);

        // Act — two messages from the same peer
        registry.touch(peer(1), t0);
        registry.touch(peer(1), t1);

        // Assert — lastSeen equals the most recent message timestamp
        assert_eq!(registry.last_seen(&peer(1)), Some(t1));
    }

    #[test]
    fn test_sweep_removes_peer_past_timeout() {
        let mut registry = ClientRegistry::new();
        let t0 = Instant::now();
        registry.touch(peer(1), t0);

        // 11s of silence is past the 10s timeout.
        let removed = registry.sweep(t0 + Duration::from_secs(11), CLIENT_TIMEOUT);

        assert_eq!(removed, 1);
        assert_eq!(registry.active_count(), 0);
        assert!(registry.last_seen(&peer(1)).is_none());
    }

    #[test]
    fn test_sweep_keeps_peer_inside_timeout_window() {
        let mut registry = ClientRegistry::new();
        let t0 = Instant::now();
        registry.touch(peer(1), t0);

        let removed = registry.sweep(t0 + Duration::from_secs(9), CLIENT_TIMEOUT);

        assert_eq!(removed, 0);
        assert_eq!(registry.active_count(), 1);
    }

    #[test]
    fn test_sweep_is_selective_across_peers() {
        // Arrange — one stale peer, one fresh peer
        let mut registry = ClientRegistry::new();
        let t0 = Instant::now();
        registry.touch(peer(1), t0);
        registry.touch(peer(2), t0 + Duration::from_secs(8));

        // Act — sweep at t0+12: peer 1 is 12s silent, peer 2 only 4s
        let removed = registry.sweep(t0 + Duration::from_secs(12), CLIENT_TIMEOUT);

        // Assert
        assert_eq!(removed, 1);
        assert_eq!(registry.active_count(), 1);
        assert!(registry.last_seen(&peer(2)).is_some());
    }

    #[test]
    fn test_matching_traffic_keeps_peer_across_sweeps() {
        // A peer that keeps sending inside the timeout window is never evicted.
        let mut registry = ClientRegistry::new();
        let t0 = Instant::now();
        registry.touch(peer(1), t0);

        for i in 1..=4u64 {
            let now = t0 + Duration::from_secs(i * 5);
            registry.touch(peer(1), now);
            registry.sweep(now, CLIENT_TIMEOUT);
            assert_eq!(registry.active_count(), 1);
        }
    }

    #[test]
    fn test_reset_clears_all_records() {
        let mut registry = ClientRegistry::new();
        let now = Instant::now();
        registry.touch(peer(1), now);
        registry.touch(peer(2), now);

        registry.reset();

        assert_eq!(registry.active_count(), 0);
    }

    #[test]
    fn test_active_count_tracks_records_after_every_mutation() {
        let mut registry = ClientRegistry::new();
        let t0 = Instant::now();

        registry.touch(peer(1), t0);
        registry.touch(peer(2), t0);
        registry.touch(peer(3), t0 + Duration::from_secs(6));
        assert_eq!(registry.active_count(), 3);

        registry.sweep(t0 + Duration::from_secs(11), CLIENT_TIMEOUT);
        assert_eq!(registry.active_count(), 1);

        registry.reset();
        assert_eq!(registry.active_count(), 0);
    }
}
