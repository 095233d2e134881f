//! Player input routing: typed text and push-to-talk.
//!
//! Focus handling and input widgets belong to the UI; this type only gets told
//! whether a text field currently has focus.

use tracing::{debug, warn};

use super::BridgeController;
use crate::bridge::{ActionTarget, BridgeApi};

#[derive(Debug, Default)]
pub struct PlayerInteraction {
    /// Object under the player's crosshair, sent with every action config.
    attention: Option<ActionTarget>,
}

impl PlayerInteraction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_attention_object(&mut self, target: Option<ActionTarget>) {
        self.attention = target;
    }

    pub fn attention_object(&self) -> Option<&ActionTarget> {
        self.attention.as_ref()
    }

    /// Send typed text to the active character.
    ///
    /// Any speech in progress is interrupted first. Returns `false` when the
    /// text was not sent (blank input, or no character listening).
    pub fn submit_text<B: BridgeApi>(
        &self,
        controller: &mut BridgeController<B>,
        input: &str,
    ) -> bool {
        if !character_listening(controller) {
            debug!("text submitted with no active character, ignored");
            return false;
        }
        if input.trim().is_empty() {
            return false;
        }

        self.push_action_config(controller);
        controller.interrupt_speech();
        controller.send_text(input);
        controller.emit_player_text(input);
        true
    }

    /// Push-to-talk key changed state.
    ///
    /// Ignored while a text field has focus so typing the talk key does not
    /// open the microphone.
    pub fn set_talk_key<B: BridgeApi>(
        &self,
        controller: &mut BridgeController<B>,
        pressed: bool,
        input_focused: bool,
    ) {
        if input_focused || !character_listening(controller) {
            return;
        }

        if pressed {
            self.push_action_config(controller);
            controller.start_recording();
        } else {
            controller.stop_recording();
        }
    }

    /// Refresh the attention object in the character's action config and
    /// push it to the browser.
    fn push_action_config<B: BridgeApi>(&self, controller: &mut BridgeController<B>) {
        let Some(character) = controller.character_mut() else {
            return;
        };
        let Some(config) = character.action_config.as_mut() else {
            return;
        };
        config.current_attention_object = self.attention.clone();
        let config = config.clone();

        if let Err(e) = controller.update_action_config(&config) {
            warn!("failed to push action config: {e}");
        }
    }
}

fn character_listening<B: BridgeApi>(controller: &BridgeController<B>) -> bool {
    controller.character().is_some_and(|c| c.is_active)
}
