//! ==============================================================================
//! ws.rs - push transport (WebSocket)
//! ==============================================================================
//!
//! purpose:
//!     the event-based surface of the hub. a connecting client is
//!     registered as an observer and immediately sent the full document
//!     as `initial_state`; afterwards its `update_data` events go through
//!     the store and come back out to every OTHER session as
//!     `data_updated` / `button_state_updated`. `key_input` events are
//!     pure pass-through echoes and never touch the store.
//!
//! connection loop:
//!     one task per client, select!-ing between inbound frames and the
//!     session's outbound queue. updates from one connection are applied
//!     and broadcast in arrival order. malformed frames are ignored;
//!     nothing here closes the connection except the peer going away.
//!
//! relationships:
//!     - used by: main.rs (GET /ws route)
//!     - uses: store.rs (apply_one), session.rs (registry, events)
//!
//! ==============================================================================

use crate::session::{ClientEvent, ServerEvent, SessionId};
use crate::store::FieldChange;
use crate::AppContext;

use anyhow::Result;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use tokio::sync::mpsc;

pub async fn ws_handler(ws: WebSocketUpgrade, State(app): State<AppContext>) -> Response {
    ws.on_upgrade(move |socket| client_session(socket, app))
}

async fn client_session(mut socket: WebSocket, app: AppContext) {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let id = app.sessions.register(tx);
    println!("[WS] Client connected: session {} ({} observing)", id, app.sessions.count());

    // sync the newcomer before anything else can reach its queue
    let snapshot = app.store.snapshot().await;
    if send_event(&mut socket, &ServerEvent::InitialState(snapshot)).await.is_err() {
        app.sessions.unregister(id);
        return;
    }

    loop {
        tokio::select! {
            outbound = rx.recv() => {
                // None cannot happen while the registry holds our sender
                let Some(event) = outbound else { break };
                if send_event(&mut socket, &event).await.is_err() {
                    break;
                }
            }
            inbound = socket.recv() => {
                match inbound {
                    Some(Ok(Message::Text(text))) => handle_client_event(&app, id, &text).await,
                    Some(Ok(Message::Close(_))) | None => break,
                    // pings are answered by axum; binary frames are not
                    // part of the protocol
                    Some(Ok(_)) => {}
                    Some(Err(_)) => break,
                }
            }
        }
    }

    app.sessions.unregister(id);
    println!("[WS] Client disconnected: session {} ({} observing)", id, app.sessions.count());
}

/// one inbound frame. invalid keys and unparseable frames are silently
/// dropped - there are no error events in this protocol.
async fn handle_client_event(app: &AppContext, id: SessionId, text: &str) {
    let Ok(event) = serde_json::from_str::<ClientEvent>(text) else {
        return;
    };

    match event {
        ClientEvent::UpdateData { key, value } => {
            if app.log_updates {
                println!("[WS] Update from session {}: {}", id, key);
            }
            match app.store.apply_one(&key, value).await {
                Some(FieldChange::Scalar { field, value }) => {
                    app.sessions.broadcast_except(
                        id,
                        ServerEvent::DataUpdated {
                            key: field.as_key().to_string(),
                            value,
                        },
                    );
                }
                Some(FieldChange::Button(button)) => {
                    app.sessions.broadcast_except(id, ServerEvent::ButtonStateUpdated(button));
                }
                None => {}
            }
        }
        ClientEvent::KeyInput { key_name } => {
            app.sessions.broadcast_except(id, ServerEvent::KeyReceived { key_name });
        }
    }
}

async fn send_event(socket: &mut WebSocket, event: &ServerEvent) -> Result<()> {
    let text = serde_json::to_string(event)?;
    socket.send(Message::Text(text)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::initial_state;
    use crate::session::SessionRegistry;
    use crate::store::StateStore;
    use serde_json::json;

    fn test_app() -> AppContext {
        AppContext {
            store: StateStore::new(initial_state()),
            sessions: SessionRegistry::new(),
            log_updates: false,
        }
    }

    /// register a bare observer queue, as if a socket task owned it
    fn observe(app: &AppContext) -> (SessionId, mpsc::UnboundedReceiver<ServerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (app.sessions.register(tx), rx)
    }

    #[tokio::test]
    async fn update_reaches_every_observer_but_the_sender() {
        let app = test_app();
        let (a, mut rx_a) = observe(&app);
        let (_b, mut rx_b) = observe(&app);

        let frame = json!({"event": "update_data", "data": {"key": "pulse", "value": "130"}});
        handle_client_event(&app, a, &frame.to_string()).await;

        assert_eq!(app.store.snapshot().await.pulse, "130");
        assert_eq!(
            rx_b.try_recv().ok(),
            Some(ServerEvent::DataUpdated {
                key: "pulse".to_string(),
                value: "130".to_string()
            })
        );
        assert!(rx_a.try_recv().is_err());
    }

    #[tokio::test]
    async fn button_updates_broadcast_the_stored_composite() {
        let app = test_app();
        let (a, _rx_a) = observe(&app);
        let (_b, mut rx_b) = observe(&app);

        let frame = json!({
            "event": "update_data",
            "data": {"key": "button_state",
                     "value": {"text": "Unlocked", "is_locked_open": true, "class": "active"}}
        });
        handle_client_event(&app, a, &frame.to_string()).await;

        // the broadcast carries the normalized composite, defaults included
        match rx_b.try_recv().ok() {
            Some(ServerEvent::ButtonStateUpdated(button)) => {
                assert!(button.is_locked_open);
                assert_eq!(button.en_color, "transparent");
            }
            other => panic!("expected button_state_updated, got {:?}", other),
        }
        assert_eq!(app.store.snapshot().await.en_color, "transparent");
    }

    #[tokio::test]
    async fn unknown_keys_are_dropped_without_a_broadcast() {
        let app = test_app();
        let (a, _rx_a) = observe(&app);
        let (_b, mut rx_b) = observe(&app);
        let before = app.store.snapshot().await;

        let frame = json!({"event": "update_data", "data": {"key": "blood_type", "value": "O"}});
        handle_client_event(&app, a, &frame.to_string()).await;

        assert_eq!(app.store.snapshot().await, before);
        assert!(rx_b.try_recv().is_err());
    }

    #[tokio::test]
    async fn key_input_echoes_without_touching_the_store() {
        let app = test_app();
        let (a, mut rx_a) = observe(&app);
        let (_b, mut rx_b) = observe(&app);
        let before = app.store.snapshot().await;

        let frame = json!({"event": "key_input", "data": {"key_name": "Enter"}});
        handle_client_event(&app, a, &frame.to_string()).await;

        assert_eq!(app.store.snapshot().await, before);
        assert_eq!(
            rx_b.try_recv().ok(),
            Some(ServerEvent::KeyReceived {
                key_name: "Enter".to_string()
            })
        );
        assert!(rx_a.try_recv().is_err());
    }

    #[tokio::test]
    async fn malformed_frames_are_ignored() {
        let app = test_app();
        let (a, _rx_a) = observe(&app);
        let before = app.store.snapshot().await;

        handle_client_event(&app, a, "not json at all").await;
        handle_client_event(&app, a, r#"{"event": "no_such_event", "data": {}}"#).await;

        assert_eq!(app.store.snapshot().await, before);
    }
}
