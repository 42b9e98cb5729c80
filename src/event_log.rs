//! Session event schema
//!
//! - Event: envelope with id + timestamp + action + optional screenshot
//! - Action: tagged variant (`type` + `details` on disk)
//! - EventType: the bare tag, used for filtering and prompting
//!
//! On disk an event is a flat object:
//! `{"id": .., "timestamp": "..", "type": "click", "details": {..}, "screenshot": ..}`

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Single recorded input event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Capture-time wall clock in ms. Not unique under bursts.
    pub id: u64,
    /// ISO-8601 local time, informational only
    pub timestamp: String,
    /// Event type and details
    #[serde(flatten)]
    pub action: Action,
    /// Screenshot taken for this event, if any
    #[serde(default)]
    pub screenshot: Option<PathBuf>,
}

impl Event {
    pub fn event_type(&self) -> EventType {
        self.action.event_type()
    }
}

/// What the user did
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "details", rename_all = "snake_case")]
pub enum Action {
    Click { x: i32, y: i32, button: String },
    Press { key: char },
    PressSpecial { key: String },
}

impl Action {
    pub fn click(x: i32, y: i32, button: impl Into<String>) -> Self {
        Self::Click {
            x,
            y,
            button: button.into(),
        }
    }

    pub fn event_type(&self) -> EventType {
        match self {
            Self::Click { .. } => EventType::Click,
            Self::Press { .. } => EventType::Press,
            Self::PressSpecial { .. } => EventType::PressSpecial,
        }
    }
}

/// Event tag without details
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Click,
    Press,
    PressSpecial,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Click => "click",
            Self::Press => "press",
            Self::PressSpecial => "press_special",
        }
    }

    /// Qualifying events get a screenshot at capture time and a step in the report
    pub fn is_qualifying(&self) -> bool {
        matches!(self, Self::Click | Self::PressSpecial)
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn click_serializes_flat_with_type_and_details() {
        let event = Event {
            id: 1_700_000_000_123,
            timestamp: "2024-05-01T10:00:00.000000".to_string(),
            action: Action::click(100, 200, "left"),
            screenshot: Some(PathBuf::from("session_data/images/screenshot_1700000000123.png")),
        };

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["id"], 1_700_000_000_123u64);
        assert_eq!(value["type"], "click");
        assert_eq!(value["details"], json!({"x": 100, "y": 200, "button": "left"}));
        assert_eq!(
            value["screenshot"],
            "session_data/images/screenshot_1700000000123.png"
        );
    }

    #[test]
    fn press_has_null_screenshot() {
        let event = Event {
            id: 5,
            timestamp: "t".to_string(),
            action: Action::Press { key: 'a' },
            screenshot: None,
        };

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "press");
        assert_eq!(value["details"]["key"], "a");
        assert!(value["screenshot"].is_null());
    }

    #[test]
    fn deserializes_recorded_log_entry() {
        let value = json!({
            "id": 42,
            "timestamp": "2024-05-01T10:00:01.500000",
            "type": "press_special",
            "details": {"key": "enter"},
            "screenshot": null
        });

        let event: Event = serde_json::from_value(value).unwrap();
        assert_eq!(event.id, 42);
        assert_eq!(
            event.action,
            Action::PressSpecial {
                key: "enter".to_string()
            }
        );
        assert_eq!(event.screenshot, None);
    }

    #[test]
    fn missing_screenshot_field_defaults_to_none() {
        let value = json!({
            "id": 7,
            "timestamp": "t",
            "type": "press",
            "details": {"key": "x"}
        });

        let event: Event = serde_json::from_value(value).unwrap();
        assert_eq!(event.screenshot, None);
        assert_eq!(event.event_type(), EventType::Press);
    }

    #[test]
    fn unknown_type_is_rejected() {
        let value = json!({
            "id": 7,
            "timestamp": "t",
            "type": "scroll",
            "details": {}
        });

        assert!(serde_json::from_value::<Event>(value).is_err());
    }

    #[test]
    fn only_click_and_press_special_qualify() {
        assert!(EventType::Click.is_qualifying());
        assert!(EventType::PressSpecial.is_qualifying());
        assert!(!EventType::Press.is_qualifying());
    }

    #[test]
    fn event_type_display_matches_tag() {
        assert_eq!(EventType::PressSpecial.to_string(), "press_special");
        assert_eq!(
            serde_json::to_value(EventType::PressSpecial).unwrap(),
            "press_special"
        );
    }
}
