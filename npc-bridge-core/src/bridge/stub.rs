//! `LogOnlyBridge` — stand-in used when no browser runtime is attached.
//!
//! Every call is logged at `warn` once, then at `debug`, so a desktop run
//! makes it obvious that nothing reaches a backend without flooding logs.

use tracing::{debug, warn};

use super::{BridgeApi, ClientInit, Feedback, TriggerConfig};

#[derive(Debug, Default)]
pub struct LogOnlyBridge {
    warned: bool,
    calls: u64,
}

impl LogOnlyBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of outbound calls seen so far.
    pub fn calls(&self) -> u64 {
        self.calls
    }

    fn note(&mut self, call: &str) {
        self.calls += 1;
        if !self.warned {
            warn!("no browser runtime attached, outbound calls are only logged");
            self.warned = true;
        }
        debug!(call, "LogOnlyBridge");
    }
}

impl BridgeApi for LogOnlyBridge {
    fn init_microphone(&mut self) {
        self.note("init_microphone");
    }

    fn start_audio_chunk(&mut self) {
        self.note("start_audio_chunk");
    }

    fn end_audio_chunk(&mut self) {
        self.note("end_audio_chunk");
    }

    fn initialize_client(&mut self, init: ClientInit) {
        debug!(character_id = %init.character_id, "initialize_client");
        self.note("initialize_client");
    }

    fn send_text_request(&mut self, text: &str) {
        debug!(len = text.len(), "send_text_request");
        self.note("send_text_request");
    }

    fn send_feedback(&mut self, feedback: Feedback) {
        debug!(thumbs_up = feedback.thumbs_up, "send_feedback");
        self.note("send_feedback");
    }

    fn send_trigger(&mut self, trigger: TriggerConfig) {
        debug!(name = %trigger.trigger_name, "send_trigger");
        self.note("send_trigger");
    }

    fn set_action_config(&mut self, _json: &str) {
        self.note("set_action_config");
    }

    fn interrupt_character(&mut self) {
        self.note("interrupt_character");
    }
}
