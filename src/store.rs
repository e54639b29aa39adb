//! ==============================================================================
//! store.rs - state store and update validation
//! ==============================================================================
//!
//! purpose:
//!     owns the canonical document behind one serialization point and
//!     applies inbound patches to it. both transports (WebSocket push and
//!     HTTP pull) go through the same per-key rule, so there is exactly
//!     one place that decides what a patch may touch.
//!
//! the per-key rule:
//!     - key in the scalar whitelist  -> overwrite that field
//!     - key == "button_state"        -> replace the composite as a unit
//!                                       and mirror its en_color to the
//!                                       top-level en_color
//!     - anything else                -> silently dropped, no error.
//!       unknown keys are accepted-and-ignored input, not a failure;
//!       the rest of a batch continues normally.
//!
//! relationships:
//!     - used by: main.rs (GET /state, POST /update), ws.rs (update_data)
//!     - uses: domain.rs (document types, whitelist)
//!
//! ==============================================================================

use crate::domain::{display_string, ButtonState, ScalarField, StateDocument, BUTTON_STATE_KEY};

use serde_json::{Map, Value};
use std::sync::Arc;
use tokio::sync::RwLock;

/// one accepted field write, as reported back to the caller.
/// push mode turns these into data_updated / button_state_updated events.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldChange {
    Scalar { field: ScalarField, value: String },
    Button(ButtonState),
}

// ==============================================================================
// state store
// ==============================================================================
// arc<rwlock<>> is the sharing pattern for the one mutable document:
// - arc: cheap clone-able handle for every connection task
// - rwlock: many snapshot readers OR one patch writer, so a button_state
//   replacement plus its en_color mirror is atomic with respect to readers

#[derive(Clone)]
pub struct StateStore {
    doc: Arc<RwLock<StateDocument>>,
}

impl StateStore {
    /// the initial snapshot is passed in explicitly - the store has no
    /// built-in default document.
    pub fn new(initial: StateDocument) -> Self {
        Self {
            doc: Arc::new(RwLock::new(initial)),
        }
    }

    /// full current document, by value. callers cannot mutate the store
    /// through the returned copy.
    pub async fn snapshot(&self) -> StateDocument {
        self.doc.read().await.clone()
    }

    /// single-field path (push transport). returns the accepted change,
    /// or None when the key was dropped.
    pub async fn apply_one(&self, key: &str, value: Value) -> Option<FieldChange> {
        let mut doc = self.doc.write().await;
        apply_entry(&mut doc, key, value)
    }

    /// batch path (pull transport). all entries are applied under one
    /// write guard, so a reader sees either none or all of the batch.
    pub async fn apply_batch(&self, entries: Map<String, Value>) -> Vec<FieldChange> {
        let mut doc = self.doc.write().await;
        entries
            .into_iter()
            .filter_map(|(key, value)| apply_entry(&mut doc, &key, value))
            .collect()
    }
}

/// the per-key rule. private - every mutation goes through the store's
/// write guard above.
fn apply_entry(doc: &mut StateDocument, key: &str, value: Value) -> Option<FieldChange> {
    if key == BUTTON_STATE_KEY {
        // missing properties are filled by serde defaults (en_color ->
        // "transparent"). a value that is not an object at all is dropped
        // like an unknown key.
        let button: ButtonState = serde_json::from_value(value).ok()?;
        doc.en_color = button.en_color.clone();
        doc.button_state = button.clone();
        return Some(FieldChange::Button(button));
    }

    let field = ScalarField::from_key(key)?;
    let text = display_string(&value);
    *doc.scalar_mut(field) = text.clone();
    Some(FieldChange::Scalar { field, value: text })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::initial_state;
    use serde_json::json;

    fn entries(value: Value) -> Map<String, Value> {
        value.as_object().expect("test body must be an object").clone()
    }

    #[tokio::test]
    async fn scalar_overwrite_is_visible_in_snapshot() {
        let store = StateStore::new(initial_state());
        let change = store.apply_one("pulse", json!("130")).await;
        assert_eq!(
            change,
            Some(FieldChange::Scalar {
                field: ScalarField::Pulse,
                value: "130".to_string()
            })
        );
        assert_eq!(store.snapshot().await.pulse, "130");
    }

    #[tokio::test]
    async fn unknown_keys_leave_the_document_unchanged() {
        let store = StateStore::new(initial_state());
        let before = store.snapshot().await;

        assert_eq!(store.apply_one("blood_type", json!("O")).await, None);
        // en_color is derived, never directly writable
        assert_eq!(store.apply_one("en_color", json!("red")).await, None);

        assert_eq!(store.snapshot().await, before);
    }

    #[tokio::test]
    async fn button_state_mirrors_en_color() {
        let store = StateStore::new(initial_state());
        let change = store
            .apply_one(
                "button_state",
                json!({"text": "Unlocked", "is_locked_open": true, "class": "active", "en_color": "red"}),
            )
            .await;

        assert!(matches!(change, Some(FieldChange::Button(_))));
        let doc = store.snapshot().await;
        assert_eq!(doc.en_color, "red");
        assert_eq!(doc.en_color, doc.button_state.en_color);
        assert!(doc.button_state.is_locked_open);
    }

    #[tokio::test]
    async fn button_state_without_en_color_defaults_to_transparent() {
        let store = StateStore::new(initial_state());
        store.apply_one("button_state", json!({"text": "Locked", "is_locked_open": false})).await;

        let doc = store.snapshot().await;
        assert_eq!(doc.en_color, "transparent");
        assert_eq!(doc.button_state.en_color, "transparent");
    }

    #[tokio::test]
    async fn non_object_button_state_is_dropped() {
        let store = StateStore::new(initial_state());
        let before = store.snapshot().await;
        assert_eq!(store.apply_one("button_state", json!("red")).await, None);
        assert_eq!(store.snapshot().await, before);
    }

    #[tokio::test]
    async fn snapshot_returns_every_field_including_untouched_ones() {
        let store = StateStore::new(initial_state());
        store.apply_one("pulse", json!("130")).await;

        let doc = store.snapshot().await;
        let initial = initial_state();
        assert_eq!(doc.pulse, "130");
        // everything not written keeps its initial value
        assert_eq!(doc.oxygen, initial.oxygen);
        assert_eq!(doc.condition, initial.condition);
        assert_eq!(doc.wake_fact, initial.wake_fact);
        assert_eq!(doc.button_state, initial.button_state);
    }

    #[tokio::test]
    async fn applying_the_same_patch_twice_is_idempotent() {
        let store = StateStore::new(initial_state());
        let patch = entries(json!({"pulse": "130", "oxygen": "97"}));

        store.apply_batch(patch.clone()).await;
        let once = store.snapshot().await;
        store.apply_batch(patch).await;
        assert_eq!(store.snapshot().await, once);
    }

    #[tokio::test]
    async fn batch_applies_known_keys_and_skips_the_rest() {
        let store = StateStore::new(initial_state());
        let changed = store
            .apply_batch(entries(json!({
                "pulse": "110",
                "no_such_field": "x",
                "condition": "Stable"
            })))
            .await;

        assert_eq!(changed.len(), 2);
        let doc = store.snapshot().await;
        assert_eq!(doc.pulse, "110");
        assert_eq!(doc.condition, "Stable");
    }

    #[tokio::test]
    async fn last_write_wins_on_the_same_key() {
        let store = StateStore::new(initial_state());
        store.apply_one("pulse", json!("130")).await;
        store.apply_one("pulse", json!("90")).await;
        assert_eq!(store.snapshot().await.pulse, "90");
    }

    #[tokio::test]
    async fn numeric_values_are_stored_as_strings() {
        let store = StateStore::new(initial_state());
        store.apply_one("pulse", json!(130)).await;
        assert_eq!(store.snapshot().await.pulse, "130");
    }

    #[tokio::test]
    async fn oxygen_is_stored_as_provided_without_unit_stripping() {
        // unit stripping is caller-owned; the store never rewrites values
        let store = StateStore::new(initial_state());
        store.apply_one("oxygen", json!("97%")).await;
        assert_eq!(store.snapshot().await.oxygen, "97%");
    }
}
