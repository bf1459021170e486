//! Keyrelay server entry point.
//!
//! Wires together the network listener, the serialized key injector, the
//! button-routing use case, and the UI status state, then runs the event
//! dispatch loop on the Tokio runtime.
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ AppConfig::load()        -- TOML settings (port, transport, timeouts)
//!  └─ ServerAppState::new()    -- status shared with the UI layer
//!  └─ KeyInjector::spawn()     -- serialized down/up queue
//!  └─ ButtonServer::start()    -- bind + receive loops + timers
//!  └─ event dispatch loop
//!       ├─ ButtonReceived  -> update last label, RouteButtonUseCase
//!       ├─ ClientCountChanged / RateUpdated -> status state
//!       └─ Started / Stopped / StartFailed  -> running flag
//! ```
//!
//! # Platform key injector
//!
//! The `MockKeyInjector` wired here records injected events rather than
//! synthesising OS input.  A production build replaces it with an adapter
//! over `SendInput` (Windows), XTest (Linux), or CoreGraphics (macOS), and
//! drives `set_permission_granted` from the OS permission poller.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use keyrelay_core::HEARTBEAT;
use keyrelay_server::application::{KeyInjector, RouteButtonUseCase};
use keyrelay_server::infrastructure::config::AppConfig;
use keyrelay_server::infrastructure::injection::mock::MockKeyInjector;
use keyrelay_server::infrastructure::network::{ButtonServer, ServerEvent};
use keyrelay_server::infrastructure::status::ServerAppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Structured logging; RUST_LOG overrides the configured default.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("keyrelay server starting");

    // ── Configuration ─────────────────────────────────────────────────────────
    let config = match AppConfig::default_path().and_then(|path| AppConfig::load(&path)) {
        Ok(config) => config,
        Err(e) => {
            warn!("could not load config ({e}); using defaults");
            AppConfig::default()
        }
    };

    // ── Shared UI state and injection pipeline ────────────────────────────────
    let app_state = ServerAppState::new();
    // Without a real permission poller, grant injection so the pipeline is
    // observable end to end with the recording injector.
    app_state.permission_granted.store(true, Ordering::Relaxed);

    let injector = KeyInjector::spawn(
        Arc::new(MockKeyInjector::new()),
        Arc::clone(&app_state.permission_granted),
    );
    let router = RouteButtonUseCase::new(Arc::clone(&app_state.mapping), injector);

    // ── Listener ──────────────────────────────────────────────────────────────
    let (server, mut events) = ButtonServer::new(config.network.to_listener_config());
    let server = Arc::new(server);
    server.start().await?;
    {
        let mut running = app_state.running.lock().await;
        *running = true;
    }

    // ── Ctrl-C handler ────────────────────────────────────────────────────────
    let shutdown_server = Arc::clone(&server);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            shutdown_server.stop().await;
        }
    });

    // ── Event dispatch loop ───────────────────────────────────────────────────
    while let Some(event) = events.recv().await {
        match event {
            ServerEvent::Started { local_addr } => {
                info!("listener running on {local_addr}");
                let mut running = app_state.running.lock().await;
                *running = true;
            }

            ServerEvent::StartFailed { error } => {
                warn!("listener failed to start: {error}");
                let mut running = app_state.running.lock().await;
                *running = false;
            }

            ServerEvent::Stopped => {
                let mut running = app_state.running.lock().await;
                *running = false;
                break;
            }

            ServerEvent::ButtonReceived(event) => {
                // Heartbeats refresh liveness upstream but are not shown as
                // received buttons and never reach the mapping.
                if event.label == HEARTBEAT {
                    continue;
                }
                {
                    let mut last = app_state.last_button.lock().await;
                    *last = Some(event.label.clone());
                }
                tracing::debug!("button {:?} from {}", event.label, event.source);
                router.handle(&event.label).await;
            }

            ServerEvent::ClientCountChanged { count } => {
                let mut clients = app_state.active_clients.lock().await;
                *clients = count;
            }

            ServerEvent::RateUpdated { messages_per_second } => {
                let mut rate = app_state.messages_per_second.lock().await;
                *rate = messages_per_second;
            }
        }
    }

    info!("keyrelay server stopped");
    Ok(())
}
