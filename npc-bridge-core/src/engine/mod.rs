//! `BridgeController` — owns everything a conversation session touches.
//!
//! ## Callback flow
//!
//! ```text
//! browser ──audio json──► on_audio_response ──► AudioResponse pool
//!                                               │ decode_pcm16 (+ resample)
//!                                               ▼
//!                                   character audio queue, CharacterText event
//!
//! browser ──"[f0..f14]"──► on_viseme_response ──► VisemeFrame pool
//!                                                  │ parse_viseme_into
//!                                                  ▼
//!                                        character lip-sync timeline
//! ```
//!
//! ## Threading
//!
//! Every method takes `&mut self` and runs to completion on the caller's
//! thread. Callbacks must be delivered in arrival order; the timeline relies
//! on a segment-start frame being seen before the frames that follow it.

pub mod character;
pub mod interaction;

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

pub use character::ActiveCharacter;
pub use interaction::PlayerInteraction;

use crate::{
    audio::{decode_pcm16, queue::ResponseAudio, resample::resample_clip},
    bridge::{ActionConfig, BridgeApi, ClientInit, Feedback, TriggerConfig},
    config::BridgeConfig,
    error::{BridgeError, Result},
    ipc::{
        events::BridgeEvent,
        payload::{AudioResponse, VisemeFrame},
    },
    pool::ObjectPool,
    viseme::timeline::AppendOutcome,
};

/// Broadcast channel capacity: 256 events buffered for slow UI consumers.
const BROADCAST_CAP: usize = 256;

/// Counters for observability.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ControllerStats {
    pub audio_responses: u64,
    pub clips_queued: u64,
    pub viseme_frames: u64,
    pub segments_started: u64,
    pub frames_dropped: u64,
    pub payload_errors: u64,
    /// Responses that arrived with no active character.
    pub unrouted: u64,
}

pub struct BridgeController<B: BridgeApi> {
    config: BridgeConfig,
    bridge: B,
    audio_pool: ObjectPool<AudioResponse>,
    viseme_pool: ObjectPool<VisemeFrame>,
    character: Option<ActiveCharacter>,
    /// Last `resText` shown, so repeated chunks of one line are shown once.
    last_character_text: Option<String>,
    events_tx: broadcast::Sender<BridgeEvent>,
    stats: ControllerStats,
}

impl<B: BridgeApi> BridgeController<B> {
    /// Create a controller. No outbound calls are made until `start()`.
    pub fn new(config: BridgeConfig, bridge: B) -> Self {
        let (events_tx, _) = broadcast::channel(BROADCAST_CAP);
        Self {
            audio_pool: ObjectPool::new(config.audio_pool_capacity),
            viseme_pool: ObjectPool::new(config.viseme_pool_capacity),
            config,
            bridge,
            character: None,
            last_character_text: None,
            events_tx,
            stats: ControllerStats::default(),
        }
    }

    /// Ask the browser to set up the microphone.
    ///
    /// A missing API key is logged, not fatal: the browser will reject the
    /// session itself once a character is initialised.
    pub fn start(&mut self) {
        if self.config.api_key.is_none() {
            error!("no API key configured, client initialisation will fail");
        }
        self.bridge.init_microphone();
        info!("bridge controller started");
    }

    /// Make `character` the conversation target, initialising the browser
    /// client for it on first activation. Returns the previous character.
    pub fn set_active_character(
        &mut self,
        mut character: ActiveCharacter,
    ) -> Result<Option<ActiveCharacter>> {
        if !character.is_initialized() {
            let action_config_json = match &character.action_config {
                Some(config) => serialize_action_config(config)?,
                None => String::new(),
            };
            let init = ClientInit {
                api_key: self.config.api_key.clone().unwrap_or_default(),
                character_id: character.character_id.clone(),
                enable_recorder: self.config.enable_recorder,
                enable_player: self.config.enable_player,
                action_config_json,
                template_keys_json: character.template_keys_json.clone().unwrap_or_default(),
            };
            info!(character_id = %character.character_id, "initialising client");
            self.bridge.initialize_client(init);
            character.mark_initialized();
        }

        self.last_character_text = None;
        Ok(self.character.replace(character))
    }

    /// Drop the conversation target. Later responses are discarded.
    pub fn clear_active_character(&mut self) -> Option<ActiveCharacter> {
        self.character.take()
    }

    // ── Inbound callbacks ────────────────────────────────────────────────────

    /// Handle one audio response payload.
    ///
    /// # Errors
    /// - `BridgeError::AudioPayload` if the JSON does not match the bridge shape.
    /// - `BridgeError::InvalidSampleRate` if audio arrives with rate 0.
    /// - `BridgeError::Resample` if playback conversion fails.
    pub fn on_audio_response(&mut self, json: &str) -> Result<()> {
        self.stats.audio_responses += 1;

        let mut record = self.audio_pool.acquire();
        let outcome = match record.fill_from_json(json) {
            Ok(()) => self.route_audio(&record),
            Err(e) => Err(e),
        };
        self.audio_pool.release(record)?;

        if let Err(e) = &outcome {
            self.stats.payload_errors += 1;
            error!("error handling audio response: {e}");
        }
        outcome
    }

    /// Handle one lip-sync frame. Returns what happened to the frame, or
    /// `None` when no character is active.
    pub fn on_viseme_response(&mut self, raw: &str) -> Result<Option<AppendOutcome>> {
        self.stats.viseme_frames += 1;

        let mut frame = self.viseme_pool.acquire();
        frame.fill_from_wire(raw);
        let outcome = self
            .character
            .as_ref()
            .map(|c| c.lip_sync().append(frame.pose));
        self.viseme_pool.release(frame)?;

        match outcome {
            Some(AppendOutcome::StartedSegment) => self.stats.segments_started += 1,
            Some(AppendOutcome::Dropped) => self.stats.frames_dropped += 1,
            Some(AppendOutcome::Appended) => {}
            None => {
                self.stats.unrouted += 1;
                warn!("viseme frame with no active character, dropped");
            }
        }
        Ok(outcome)
    }

    /// Transcript of what the player said.
    pub fn on_user_response(&mut self, text: &str) {
        if text.trim().is_empty() {
            return;
        }
        self.emit(BridgeEvent::PlayerText {
            text: text.to_string(),
        });
    }

    /// The narrative graph moved to `section_id`.
    pub fn on_narrative_section(&mut self, section_id: &str) {
        let Some(character) = self.character.as_mut() else {
            self.stats.unrouted += 1;
            warn!(section_id, "narrative section with no active character, dropped");
            return;
        };
        debug!(section_id, "narrative section");
        character.set_current_section(section_id);
        self.emit(BridgeEvent::NarrativeSection {
            section_id: section_id.to_string(),
        });
    }

    /// Raw action JSON chosen by the backend.
    pub fn on_action_response(&mut self, payload: &str) {
        let Some(character) = self.character.as_mut() else {
            self.stats.unrouted += 1;
            warn!("action response with no active character, dropped");
            return;
        };
        character.push_action_response(payload);
        self.emit(BridgeEvent::ActionResponse {
            payload: payload.to_string(),
        });
    }

    // ── Outbound ─────────────────────────────────────────────────────────────

    pub fn start_recording(&mut self) {
        self.emit(BridgeEvent::PlayerSpeaking { speaking: true });
        self.bridge.start_audio_chunk();
    }

    pub fn stop_recording(&mut self) {
        self.bridge.end_audio_chunk();
        self.emit(BridgeEvent::PlayerSpeaking { speaking: false });
    }

    pub fn send_text(&mut self, text: &str) {
        self.bridge.send_text_request(text);
    }

    pub fn send_feedback(&mut self, feedback: Feedback) {
        self.bridge.send_feedback(feedback);
    }

    pub fn send_trigger(&mut self, trigger: TriggerConfig) {
        info!(
            name = %trigger.trigger_name,
            message = %trigger.trigger_message,
            "sending trigger"
        );
        self.bridge.send_trigger(trigger);
    }

    pub fn update_action_config(&mut self, config: &ActionConfig) -> Result<()> {
        let json = serialize_action_config(config)?;
        self.bridge.set_action_config(&json);
        Ok(())
    }

    /// Cut the character off and drop any audio still queued for playback.
    pub fn interrupt_speech(&mut self) {
        self.bridge.interrupt_character();
        if let Some(character) = &self.character {
            character.audio().0.lock().clear();
        }
    }

    // ── Accessors ────────────────────────────────────────────────────────────

    /// Subscribe to UI events.
    pub fn subscribe(&self) -> broadcast::Receiver<BridgeEvent> {
        self.events_tx.subscribe()
    }

    pub fn character(&self) -> Option<&ActiveCharacter> {
        self.character.as_ref()
    }

    pub fn character_mut(&mut self) -> Option<&mut ActiveCharacter> {
        self.character.as_mut()
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn bridge(&self) -> &B {
        &self.bridge
    }

    pub fn stats(&self) -> ControllerStats {
        self.stats
    }

    /// Records currently managed by the (audio, viseme) pools.
    pub fn pool_capacities(&self) -> (usize, usize) {
        (self.audio_pool.capacity(), self.viseme_pool.capacity())
    }

    pub(crate) fn emit_player_text(&mut self, text: &str) {
        self.emit(BridgeEvent::PlayerText {
            text: text.to_string(),
        });
    }

    // ── Internal helpers ─────────────────────────────────────────────────────

    fn route_audio(&mut self, record: &AudioResponse) -> Result<()> {
        let trim = self.config.header_trim();
        let playback_rate = self.config.playback_sample_rate;

        let Some(character) = self.character.as_ref() else {
            self.stats.unrouted += 1;
            warn!("audio response with no active character, dropped");
            return Ok(());
        };

        // Text does not depend on the audio, so a bad clip still shows it.
        let character_name = character.character_name.clone();
        if !record.res_text.is_empty()
            && self.last_character_text.as_deref() != Some(record.res_text.as_str())
        {
            self.last_character_text = Some(record.res_text.clone());
            self.emit(BridgeEvent::CharacterText {
                character_name,
                text: record.res_text.clone(),
            });
        }

        // With visemes the browser plays the audio itself.
        if record.has_visemes_data {
            return Ok(());
        }
        match decode_pcm16(&record.aud_data, record.sample_rate, trim) {
            Some(clip) if clip.sample_rate == 0 => Err(BridgeError::InvalidSampleRate("0".into())),
            Some(clip) => {
                let clip = match playback_rate {
                    Some(rate) => resample_clip(&clip, rate)?,
                    None => clip,
                };
                debug!(
                    samples = clip.samples.len(),
                    sample_rate = clip.sample_rate,
                    "queueing response clip"
                );
                character.audio().0.lock().push(ResponseAudio {
                    clip,
                    text: record.res_text.clone(),
                    is_first: record.is_first,
                });
                self.stats.clips_queued += 1;
                Ok(())
            }
            None => {
                debug!("audio response carried no samples");
                Ok(())
            }
        }
    }

    fn emit(&self, event: BridgeEvent) {
        // No subscribers is fine.
        let _ = self.events_tx.send(event);
    }
}

fn serialize_action_config(config: &ActionConfig) -> Result<String> {
    serde_json::to_string(config)
        .map_err(|e| BridgeError::Other(anyhow::anyhow!("serialize action config: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::{BridgeCommand, ChannelBridge};
    use crossbeam_channel::Receiver;

    fn controller() -> (BridgeController<ChannelBridge>, Receiver<BridgeCommand>) {
        let (bridge, rx) = ChannelBridge::new();
        let config = BridgeConfig {
            api_key: Some("key".into()),
            ..Default::default()
        };
        (BridgeController::new(config, bridge), rx)
    }

    #[test]
    fn start_inits_microphone() {
        let (mut ctl, rx) = controller();
        ctl.start();
        assert_eq!(rx.try_recv().unwrap(), BridgeCommand::InitMicrophone);
    }

    #[test]
    fn first_activation_initialises_client_once() {
        let (mut ctl, rx) = controller();
        ctl.set_active_character(ActiveCharacter::new("char-1", "Ava"))
            .unwrap();
        match rx.try_recv().unwrap() {
            BridgeCommand::InitializeClient(init) => {
                assert_eq!(init.api_key, "key");
                assert_eq!(init.character_id, "char-1");
                assert!(init.enable_recorder);
                assert!(!init.enable_player);
                assert!(init.action_config_json.is_empty());
                assert!(init.template_keys_json.is_empty());
            }
            other => panic!("unexpected command {other:?}"),
        }

        let ava = ctl.clear_active_character().unwrap();
        assert!(ava.is_initialized());
        ctl.set_active_character(ava).unwrap();
        assert!(rx.try_recv().is_err(), "re-activation must not re-initialise");
    }

    #[test]
    fn init_carries_action_config_and_template_keys() {
        let (mut ctl, rx) = controller();
        let character = ActiveCharacter::new("c", "Bo")
            .with_action_config(ActionConfig {
                actions: vec!["Wave".into()],
                ..Default::default()
            })
            .with_template_keys(r#"{"name":"Sam"}"#);
        ctl.set_active_character(character).unwrap();
        let BridgeCommand::InitializeClient(init) = rx.try_recv().unwrap() else {
            panic!("expected InitializeClient");
        };
        assert!(init.action_config_json.contains("\"Wave\""));
        assert_eq!(init.template_keys_json, r#"{"name":"Sam"}"#);
    }

    #[test]
    fn recording_emits_speaking_around_bridge_calls() {
        let (mut ctl, rx) = controller();
        let mut events = ctl.subscribe();
        ctl.start_recording();
        ctl.stop_recording();

        assert_eq!(
            rx.try_iter().collect::<Vec<_>>(),
            vec![BridgeCommand::StartAudioChunk, BridgeCommand::EndAudioChunk]
        );
        assert_eq!(
            events.try_recv().unwrap(),
            BridgeEvent::PlayerSpeaking { speaking: true }
        );
        assert_eq!(
            events.try_recv().unwrap(),
            BridgeEvent::PlayerSpeaking { speaking: false }
        );
    }

    #[test]
    fn blank_user_text_is_ignored() {
        let (mut ctl, _rx) = controller();
        let mut events = ctl.subscribe();
        ctl.on_user_response("   ");
        ctl.on_user_response("hello");
        assert_eq!(
            events.try_recv().unwrap(),
            BridgeEvent::PlayerText {
                text: "hello".into()
            }
        );
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn narrative_and_action_route_to_character() {
        let (mut ctl, _rx) = controller();
        ctl.set_active_character(ActiveCharacter::new("c", "Bo"))
            .unwrap();
        ctl.on_narrative_section("section-7");
        ctl.on_action_response(r#"{"action":"Wave"}"#);

        let character = ctl.character_mut().unwrap();
        assert_eq!(character.current_section(), Some("section-7"));
        assert_eq!(character.take_action_responses().len(), 1);
        assert!(character.action_responses().is_empty());
    }

    #[test]
    fn responses_without_character_are_dropped() {
        let (mut ctl, _rx) = controller();
        ctl.on_narrative_section("s");
        ctl.on_action_response("{}");
        assert_eq!(ctl.on_viseme_response("[-2]").unwrap(), None);
        ctl.on_audio_response(r#"{"audData":[0,0],"sampleRate":16000}"#)
            .unwrap();
        assert_eq!(ctl.stats().unrouted, 4);
    }

    #[test]
    fn zero_rate_audio_still_shows_text() {
        let (mut ctl, _rx) = controller();
        ctl.set_active_character(ActiveCharacter::new("c", "Bo"))
            .unwrap();
        let mut events = ctl.subscribe();

        let err = ctl
            .on_audio_response(r#"{"audData":[1,0],"resText":"Hello","sampleRate":0}"#)
            .unwrap_err();
        assert!(matches!(err, BridgeError::InvalidSampleRate(_)));
        assert_eq!(
            events.try_recv().unwrap(),
            BridgeEvent::CharacterText {
                character_name: "Bo".into(),
                text: "Hello".into(),
            }
        );
        assert!(ctl.character().unwrap().audio().0.lock().is_empty());
        assert_eq!(ctl.stats().payload_errors, 1);
    }

    #[test]
    fn trigger_and_feedback_are_forwarded() {
        let (mut ctl, rx) = controller();
        ctl.send_trigger(TriggerConfig {
            trigger_name: "door".into(),
            trigger_message: "opened".into(),
        });
        ctl.send_feedback(Feedback {
            character_id: "c".into(),
            session_id: "s".into(),
            thumbs_up: true,
            feedback_text: "nice".into(),
        });
        let got: Vec<_> = rx.try_iter().collect();
        assert!(matches!(got[0], BridgeCommand::SendTrigger(ref t) if t.trigger_name == "door"));
        assert!(matches!(got[1], BridgeCommand::SendFeedback(ref f) if f.thumbs_up));
    }
}
