//! Outbound call surface into the browser runtime.
//!
//! The browser side owns the microphone, the conversational session and the
//! network transport. Everything the controller asks of it goes through
//! [`BridgeApi`]: one-way notifications with no return value. The transport
//! behind the trait is not this crate's concern:
//!
//! - [`ChannelBridge`] forwards each call as a [`BridgeCommand`] over a
//!   crossbeam channel (host glue, replay tooling, tests).
//! - [`LogOnlyBridge`] only logs, for running outside a browser.

pub mod channel;
pub mod stub;

pub use channel::ChannelBridge;
pub use stub::LogOnlyBridge;

use serde::{Deserialize, Serialize};

/// Arguments for client initialisation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientInit {
    pub api_key: String,
    pub character_id: String,
    pub enable_recorder: bool,
    pub enable_player: bool,
    /// Serialized [`ActionConfig`]; empty when the character has none.
    pub action_config_json: String,
    /// Serialized narrative template keys; empty when the character has none.
    pub template_keys_json: String,
}

/// Thumbs-up/down feedback on a character response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
    pub character_id: String,
    pub session_id: String,
    pub thumbs_up: bool,
    pub feedback_text: String,
}

/// Named narrative trigger fired at the character.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerConfig {
    pub trigger_name: String,
    pub trigger_message: String,
}

/// A scene object or character the NPC can act on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionTarget {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// Actions and scene context pushed to the backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ActionConfig {
    pub actions: Vec<String>,
    pub characters: Vec<ActionTarget>,
    pub objects: Vec<ActionTarget>,
    pub classification: String,
    pub context_level: u32,
    /// What the player is currently looking at, if anything.
    pub current_attention_object: Option<ActionTarget>,
}

/// One outbound call, as data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase")]
pub enum BridgeCommand {
    InitMicrophone,
    StartAudioChunk,
    EndAudioChunk,
    InitializeClient(ClientInit),
    SendTextRequest { text: String },
    SendFeedback(Feedback),
    SendTrigger(TriggerConfig),
    SetActionConfig { json: String },
    InterruptCharacter,
}

/// Outbound notifications the controller issues. Fire-and-forget.
pub trait BridgeApi: Send + 'static {
    fn init_microphone(&mut self);

    /// Begin streaming microphone audio to the backend.
    fn start_audio_chunk(&mut self);

    /// Stop streaming microphone audio.
    fn end_audio_chunk(&mut self);

    fn initialize_client(&mut self, init: ClientInit);

    fn send_text_request(&mut self, text: &str);

    fn send_feedback(&mut self, feedback: Feedback);

    fn send_trigger(&mut self, trigger: TriggerConfig);

    /// Push a serialized [`ActionConfig`].
    fn set_action_config(&mut self, json: &str);

    /// Cut off the character's current speech.
    fn interrupt_character(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_serializes_with_tag() {
        let json = serde_json::to_value(BridgeCommand::SendTextRequest {
            text: "hello".into(),
        })
        .expect("serialize command");
        assert_eq!(json["command"], "sendTextRequest");
        assert_eq!(json["text"], "hello");

        let json = serde_json::to_value(BridgeCommand::InterruptCharacter).unwrap();
        assert_eq!(json["command"], "interruptCharacter");
    }

    #[test]
    fn action_config_uses_camel_case_and_defaults() {
        let config: ActionConfig =
            serde_json::from_str(r#"{"actions":["Wave"],"contextLevel":2}"#).unwrap();
        assert_eq!(config.actions, vec!["Wave".to_string()]);
        assert_eq!(config.context_level, 2);
        assert!(config.current_attention_object.is_none());

        let json = serde_json::to_value(&config).unwrap();
        assert!(json.get("currentAttentionObject").is_some());
    }
}
