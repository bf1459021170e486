//! Status bridge between the server core and the configuration UI.
//!
//! Exposes the status surface the UI polls (running flag, client count,
//! last received label, message rate, permission flag) and the control
//! surface it writes (the mapping table, the permission flag).  Only this
//! module references both the application layer and the UI boundary.
//!
//! # DTOs (Data Transfer Objects)
//!
//! The runtime state ([`ServerAppState`]) uses Tokio async `Mutex`es and is
//! not directly serializable.  The DTO structs are plain serializable
//! snapshots that are safe to hand across the UI boundary.
//!
//! # `CommandResult<T>`
//!
//! All commands return a unified envelope:
//! ```json
//! { "success": true,  "data": {...}, "error": null  }
//! { "success": false, "data": null,  "error": "..."  }
//! ```
//! so the UI side has a single error-handling pattern for every command.
//!
//! # Async Mutex vs std Mutex
//!
//! The command handlers are `async` functions, so the state fields use
//! `tokio::sync::Mutex`: holding a `std::sync::Mutex` guard across an
//! `.await` point would block the Tokio thread pool instead of suspending
//! the task.  The permission flag is the exception — it is an `AtomicBool`
//! because the injection path reads it synchronously at call time.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};

use crate::application::route_button::SharedMapping;

// ── Shared application state ──────────────────────────────────────────────────

/// Runtime state shared between the event dispatch loop and the UI commands.
pub struct ServerAppState {
    /// Whether the listener is currently running.
    pub running: Mutex<bool>,
    /// Active (UDP) or connected (TCP) client count.
    pub active_clients: Mutex<usize>,
    /// The most recently received button label, heartbeats excluded.
    pub last_button: Mutex<Option<String>>,
    /// The value of the last closed 1-second rate window.
    pub messages_per_second: Mutex<u32>,
    /// Synthetic-input permission, polled externally and consulted by the
    /// injector at injection time.
    pub permission_granted: Arc<AtomicBool>,
    /// The label → key-identifier mapping table, owned by the UI layer.
    pub mapping: SharedMapping,
}

impl ServerAppState {
    /// Creates a fresh state: stopped, no clients, empty mapping, and the
    /// permission flag initially false (granted only once the external
    /// poller observes it).
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            running: Mutex::new(false),
            active_clients: Mutex::new(0),
            last_button: Mutex::new(None),
            messages_per_second: Mutex::new(0),
            permission_granted: Arc::new(AtomicBool::new(false)),
            mapping: Arc::new(RwLock::new(HashMap::new())),
        })
    }
}

// ── DTOs ──────────────────────────────────────────────────────────────────────

/// Full status snapshot returned to the UI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerStatusDto {
    pub running: bool,
    pub active_clients: usize,
    pub last_button: Option<String>,
    pub messages_per_second: u32,
    pub permission_granted: bool,
}

/// Unified response wrapper for UI commands.
#[derive(Debug, Serialize, Deserialize)]
pub struct CommandResult<T: Serialize> {
    /// `true` if the command completed successfully.
    pub success: bool,
    /// The command's return value, present only on success.
    pub data: Option<T>,
    /// A human-readable error message, present only on failure.
    pub error: Option<String>,
}

impl<T: Serialize> CommandResult<T> {
    pub fn ok(data: T) -> Self {
        Self { success: true, data: Some(data), error: None }
    }

    pub fn err(msg: impl Into<String>) -> Self {
        Self { success: false, data: None, error: Some(msg.into()) }
    }
}

// ── Commands ──────────────────────────────────────────────────────────────────

/// Returns the current status snapshot.
///
/// Called periodically by the UI.  Each lock is held only while reading, so
/// contention with the dispatch loop is minimal.
pub async fn get_server_status(state: Arc<ServerAppState>) -> CommandResult<ServerStatusDto> {
    let running = state.running.lock().await;
    let clients = state.active_clients.lock().await;
    let last = state.last_button.lock().await;
    let rate = state.messages_per_second.lock().await;

    CommandResult::ok(ServerStatusDto {
        running: *running,
        active_clients: *clients,
        last_button: last.clone(),
        messages_per_second: *rate,
        permission_granted: state.permission_granted.load(Ordering::Relaxed),
    })
}

/// Returns a snapshot of the mapping table for the key-mapping editor.
pub async fn get_mapping(state: Arc<ServerAppState>) -> CommandResult<HashMap<String, String>> {
    let mapping = state.mapping.read().await;
    CommandResult::ok(mapping.clone())
}

/// Replaces the mapping table with the one submitted by the user.
///
/// Entries with a blank label could never match an inbound message in a
/// useful way, so they are rejected rather than silently kept.
pub async fn update_mapping(
    state: Arc<ServerAppState>,
    entries: HashMap<String, String>,
) -> CommandResult<()> {
    if entries.keys().any(|label| label.is_empty()) {
        return CommandResult::err("mapping labels must not be empty");
    }

    let mut mapping = state.mapping.write().await;
    *mapping = entries;
    CommandResult::ok(())
}

/// Records the result of the external synthetic-input permission poll.
pub fn set_permission_granted(state: &ServerAppState, granted: bool) {
    state.permission_granted.store(granted, Ordering::Relaxed);
}

// ── Tests ─────────────────────────────────────────────────────────────────────
