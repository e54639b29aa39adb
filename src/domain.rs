//! ==============================================================================
//! domain.rs - canonical dashboard document
//! ==============================================================================
//!
//! purpose:
//!     defines the one state document shared by every connected client:
//!     a fixed set of scalar display fields, one composite button field,
//!     and the derived `en_color` mirror.
//!
//! relationships:
//!     - used by: store.rs (holds and mutates the document)
//!     - used by: session.rs (initial_state / button_state_updated payloads)
//!     - serialized as-is for GET /state and the initial_state event
//!
//! ==============================================================================

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// the canonical document. created once at startup from `initial_state()`,
/// mutated in place for the life of the process, never deleted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StateDocument {
    /// last measurement display line
    pub last_measure: String,
    /// next scheduled measurement display line
    pub next_measure: String,
    /// pulse, numeric-as-string
    pub pulse: String,
    /// oxygen saturation, bare number string (callers strip any % suffix)
    pub oxygen: String,
    /// free-form condition text
    pub condition: String,
    pub sleep_yote: String,
    pub sleep_fact: String,
    pub wake_yote: String,
    pub wake_fact: String,
    /// status circle color. mirror of button_state.en_color, never written
    /// directly by clients.
    pub en_color: String,
    /// emergency unlock button, replaced as a whole unit
    pub button_state: ButtonState,
}

/// the composite button field. replaced atomically; its `en_color` is
/// copied to the document's top-level `en_color` on every write.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ButtonState {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub is_locked_open: bool,
    #[serde(default)]
    pub class: String,
    /// older clients omit this; absent means "transparent"
    #[serde(default = "transparent")]
    pub en_color: String,
}

fn transparent() -> String {
    "transparent".to_string()
}

/// the fixed whitelist of independently-overwritable scalar fields.
/// any inbound key that is neither one of these nor "button_state"
/// is silently dropped - the document never grows at runtime.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScalarField {
    LastMeasure,
    NextMeasure,
    Pulse,
    Oxygen,
    Condition,
    SleepYote,
    SleepFact,
    WakeYote,
    WakeFact,
}

/// wire key of the composite field
pub const BUTTON_STATE_KEY: &str = "button_state";

impl ScalarField {
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "last_measure" => Some(Self::LastMeasure),
            "next_measure" => Some(Self::NextMeasure),
            "pulse" => Some(Self::Pulse),
            "oxygen" => Some(Self::Oxygen),
            "condition" => Some(Self::Condition),
            "sleep_yote" => Some(Self::SleepYote),
            "sleep_fact" => Some(Self::SleepFact),
            "wake_yote" => Some(Self::WakeYote),
            "wake_fact" => Some(Self::WakeFact),
            _ => None,
        }
    }

    pub fn as_key(&self) -> &'static str {
        match self {
            Self::LastMeasure => "last_measure",
            Self::NextMeasure => "next_measure",
            Self::Pulse => "pulse",
            Self::Oxygen => "oxygen",
            Self::Condition => "condition",
            Self::SleepYote => "sleep_yote",
            Self::SleepFact => "sleep_fact",
            Self::WakeYote => "wake_yote",
            Self::WakeFact => "wake_fact",
        }
    }
}

impl StateDocument {
    pub fn scalar(&self, field: ScalarField) -> &str {
        match field {
            ScalarField::LastMeasure => &self.last_measure,
            ScalarField::NextMeasure => &self.next_measure,
            ScalarField::Pulse => &self.pulse,
            ScalarField::Oxygen => &self.oxygen,
            ScalarField::Condition => &self.condition,
            ScalarField::SleepYote => &self.sleep_yote,
            ScalarField::SleepFact => &self.sleep_fact,
            ScalarField::WakeYote => &self.wake_yote,
            ScalarField::WakeFact => &self.wake_fact,
        }
    }

    pub(crate) fn scalar_mut(&mut self, field: ScalarField) -> &mut String {
        match field {
            ScalarField::LastMeasure => &mut self.last_measure,
            ScalarField::NextMeasure => &mut self.next_measure,
            ScalarField::Pulse => &mut self.pulse,
            ScalarField::Oxygen => &mut self.oxygen,
            ScalarField::Condition => &mut self.condition,
            ScalarField::SleepYote => &mut self.sleep_yote,
            ScalarField::SleepFact => &mut self.sleep_fact,
            ScalarField::WakeYote => &mut self.wake_yote,
            ScalarField::WakeFact => &mut self.wake_fact,
        }
    }
}

/// startup snapshot. the dashboard's on-load display values must match
/// these, so keep them in step with the entry page.
pub fn initial_state() -> StateDocument {
    StateDocument {
        last_measure: "[Last measured] 2025-09-30 16:30".to_string(),
        next_measure: "[Next measurement] in 4 hours".to_string(),
        pulse: "125".to_string(),
        oxygen: "98".to_string(),
        condition: "Good".to_string(),
        sleep_yote: "12:30".to_string(),
        sleep_fact: "12:30".to_string(),
        wake_yote: "12:30".to_string(),
        wake_fact: "12:30".to_string(),
        en_color: "transparent".to_string(),
        button_state: ButtonState {
            text: "Emergency unlock".to_string(),
            is_locked_open: false,
            class: String::new(),
            en_color: "transparent".to_string(),
        },
    }
}

/// render an inbound JSON scalar as the stored display string.
/// strings pass through unchanged; anything else keeps its compact
/// JSON rendering so no inbound value is ever rejected.
pub fn display_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
