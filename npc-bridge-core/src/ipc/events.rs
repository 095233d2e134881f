//! Events broadcast by the controller to UI subscribers.
//!
//! | Event | Raised by |
//! |-------|-----------|
//! | `PlayerText` | user transcript callback, text submission |
//! | `CharacterText` | audio response with new `resText` |
//! | `NarrativeSection` | narrative section callback |
//! | `ActionResponse` | action callback |
//! | `PlayerSpeaking` | recording start / stop |

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum BridgeEvent {
    /// Text the player said or typed.
    #[serde(rename_all = "camelCase")]
    PlayerText { text: String },
    /// A line of character speech.
    #[serde(rename_all = "camelCase")]
    CharacterText { character_name: String, text: String },
    /// The narrative graph moved to a new section.
    #[serde(rename_all = "camelCase")]
    NarrativeSection { section_id: String },
    /// Raw action JSON returned by the backend.
    #[serde(rename_all = "camelCase")]
    ActionResponse { payload: String },
    #[serde(rename_all = "camelCase")]
    PlayerSpeaking { speaking: bool },
}
