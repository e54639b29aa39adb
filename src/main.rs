//! ==============================================================================
//! main.rs - vitals hub entry point
//! ==============================================================================
//!
//! purpose:
//!     this is the hub process that keeps a bedside vitals dashboard in
//!     sync across every connected client. one canonical state document
//!     lives here; clients read it in full, submit partial updates, and
//!     every other observer is told about each accepted change.
//!
//! responsibilities:
//!     - load configuration (hub.toml + PORT/SECRET_KEY env overrides)
//!     - build the state store from the explicit initial snapshot
//!     - serve the pull surface (GET /state, POST /update)
//!     - serve the push surface (GET /ws, see ws.rs)
//!     - serve the dashboard entry page
//!
//! architecture:
//!
//!     ┌──────────────────────────────────────────────────────────┐
//!     │                   hub process (this file)                │
//!     │  ┌─────────────┐   ┌──────────────┐   ┌───────────────┐  │
//!     │  │ HTTP pull   │   │ WebSocket    │   │ session       │  │
//!     │  │ /state      │   │ push  /ws    │   │ registry      │  │
//!     │  │ /update     │   │ (ws.rs)      │   │ (session.rs)  │  │
//!     │  └──────┬──────┘   └──────┬───────┘   └───────┬───────┘  │
//!     │         │                 │                    │          │
//!     │         └────────┬────────┘                    │          │
//!     │                  ▼                             │          │
//!     │           ┌────────────┐    broadcast_except   │          │
//!     │           │ state store│◄──────────────────────┘          │
//!     │           │ (store.rs) │                                  │
//!     │           └────────────┘                                  │
//!     └──────────────────────────────────────────────────────────┘
//!
//!     both transports share the one store, so there is a single
//!     serialization point and a single per-key validation rule.
//!
//! ==============================================================================

mod config;
mod domain;
mod session;
mod store;
mod ws;

use anyhow::Result;
use axum::{
    extract::State,
    response::{Html, Json},
    routing::{get, post},
    Router,
};
use serde_json::Value;
use tower_http::cors::CorsLayer;

use crate::domain::StateDocument;
use crate::session::SessionRegistry;
use crate::store::StateStore;

// ==============================================================================
// shared context
// ==============================================================================
// one clone-able handle per connection task:
// - store: the canonical document behind its rwlock
// - sessions: the push-mode observer registry
// - log_updates: per-update logging toggle from hub.toml

#[derive(Clone)]
pub struct AppContext {
    pub store: StateStore,
    pub sessions: SessionRegistry,
    pub log_updates: bool,
}

// ==============================================================================
// main entry point
// ==============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    println!("===========================================================");
    println!("  Vitals Hub - shared dashboard state broadcaster");
    println!("===========================================================");

    let config = config::HubConfig::load_or_default();
    config.print_summary();

    let app = AppContext {
        store: StateStore::new(domain::initial_state()),
        sessions: SessionRegistry::new(),
        log_updates: config.logging.show_updates,
    };
    println!("[STARTUP] ✓ State store initialized");

    run_server(app, &config).await
}

// ==============================================================================
// web server
// ==============================================================================

async fn run_server(app: AppContext, config: &config::HubConfig) -> Result<()> {
    let addr = format!("{}:{}", config.server.bind, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    println!("[STARTUP] ✓ Dashboard live at http://{}", addr);

    axum::serve(listener, router(app)).await?;
    Ok(())
}

fn router(app: AppContext) -> Router {
    Router::new()
        .route("/", get(dashboard_handler))
        .route("/state", get(state_handler))
        .route("/update", post(update_handler))
        .route("/ws", get(ws::ws_handler))
        .layer(CorsLayer::permissive())
        .with_state(app)
}

/// dashboard entry page. rendering richness lives client-side; the page
/// just reads /state and listens on /ws.
async fn dashboard_handler() -> Html<&'static str> {
    Html(DASHBOARD_PAGE)
}

/// pull transport: full current document
async fn state_handler(State(app): State<AppContext>) -> Json<StateDocument> {
    Json(app.store.snapshot().await)
}

/// pull transport: batch update. unknown keys are dropped silently and
/// the rest of the batch still applies; the response always carries the
/// full post-update document.
async fn update_handler(
    State(app): State<AppContext>,
    Json(entries): Json<serde_json::Map<String, Value>>,
) -> Json<Value> {
    let changed = app.store.apply_batch(entries).await;
    if app.log_updates && !changed.is_empty() {
        println!("[HTTP] Applied {} field update(s)", changed.len());
    }

    let state = app.store.snapshot().await;
    Json(serde_json::json!({"status": "ok", "state": state}))
}

const DASHBOARD_PAGE: &str = r#"<!doctype html>
<html>
<head>
    <meta charset="utf-8">
    <title>Vitals Hub</title>
    <style>
        body { font-family: system-ui; padding: 2rem; background: #1a1a2e; color: #eee; }
        dt { color: #888; margin-top: 0.6rem; }
        dd { margin: 0; font-size: 1.2rem; }
        #circle { width: 24px; height: 24px; border-radius: 50%; display: inline-block;
                  border: 1px solid #444; vertical-align: middle; }
    </style>
</head>
<body>
    <h1>Vitals Hub <span id="circle"></span></h1>
    <dl id="fields"></dl>
    <script>
        const fields = document.getElementById('fields');
        const circle = document.getElementById('circle');
        function render(doc) {
            circle.style.background = doc.en_color;
            fields.innerHTML = '';
            for (const [key, value] of Object.entries(doc)) {
                if (key === 'button_state') continue;
                fields.innerHTML += `<dt>${key}</dt><dd>${value}</dd>`;
            }
            fields.innerHTML += `<dt>button</dt><dd>${doc.button_state.text}` +
                ` (${doc.button_state.is_locked_open ? 'open' : 'locked'})</dd>`;
        }
        fetch('/state').then(r => r.json()).then(render);
        const ws = new WebSocket(`ws://${location.host}/ws`);
        ws.onmessage = () => fetch('/state').then(r => r.json()).then(render);
    </script>
</body>
</html>
"#;
