//! The character currently in conversation.

use crate::audio::queue::AudioQueueHandle;
use crate::bridge::ActionConfig;
use crate::viseme::timeline::TimelineHandle;

/// Conversation state for one NPC.
///
/// The audio queue and lip-sync timeline are shared handles: the host's
/// player and animator keep clones and drain them on their own schedule.
#[derive(Debug, Clone)]
pub struct ActiveCharacter {
    pub character_id: String,
    pub character_name: String,
    pub action_config: Option<ActionConfig>,
    /// Serialized narrative template keys sent at client initialisation.
    pub template_keys_json: Option<String>,
    /// Player is in range and talking to this character.
    pub is_active: bool,
    initialized: bool,
    current_section: Option<String>,
    action_responses: Vec<String>,
    lip_sync: TimelineHandle,
    audio: AudioQueueHandle,
}

impl ActiveCharacter {
    pub fn new(character_id: impl Into<String>, character_name: impl Into<String>) -> Self {
        Self {
            character_id: character_id.into(),
            character_name: character_name.into(),
            action_config: None,
            template_keys_json: None,
            is_active: true,
            initialized: false,
            current_section: None,
            action_responses: Vec::new(),
            lip_sync: TimelineHandle::new(),
            audio: AudioQueueHandle::new(),
        }
    }

    pub fn with_action_config(mut self, config: ActionConfig) -> Self {
        self.action_config = Some(config);
        self
    }

    pub fn with_template_keys(mut self, json: impl Into<String>) -> Self {
        self.template_keys_json = Some(json.into());
        self
    }

    /// Whether the browser client was already initialised for this character.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub(crate) fn mark_initialized(&mut self) {
        self.initialized = true;
    }

    pub fn lip_sync(&self) -> &TimelineHandle {
        &self.lip_sync
    }

    pub fn audio(&self) -> &AudioQueueHandle {
        &self.audio
    }

    pub fn current_section(&self) -> Option<&str> {
        self.current_section.as_deref()
    }

    pub(crate) fn set_current_section(&mut self, section_id: &str) {
        self.current_section = Some(section_id.to_string());
    }

    pub(crate) fn push_action_response(&mut self, payload: &str) {
        self.action_responses.push(payload.to_string());
    }

    pub fn action_responses(&self) -> &[String] {
        &self.action_responses
    }

    /// Hand pending action responses to the action handler.
    pub fn take_action_responses(&mut self) -> Vec<String> {
        std::mem::take(&mut self.action_responses)
    }
}
