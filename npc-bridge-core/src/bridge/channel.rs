//! `ChannelBridge` — forwards every outbound call as a [`BridgeCommand`].

use crossbeam_channel::{Receiver, Sender};
use tracing::warn;

use super::{BridgeApi, BridgeCommand, ClientInit, Feedback, TriggerConfig};

/// Sends outbound calls down an unbounded crossbeam channel.
///
/// A disconnected receiver is logged and otherwise ignored; outbound calls
/// never fail from the controller's point of view.
#[derive(Debug, Clone)]
pub struct ChannelBridge {
    tx: Sender<BridgeCommand>,
}

impl ChannelBridge {
    /// Create a bridge and the receiver its commands arrive on.
    pub fn new() -> (Self, Receiver<BridgeCommand>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (Self { tx }, rx)
    }

    pub fn from_sender(tx: Sender<BridgeCommand>) -> Self {
        Self { tx }
    }

    fn forward(&self, command: BridgeCommand) {
        if let Err(e) = self.tx.send(command) {
            warn!("bridge receiver gone, dropped {:?}", e.into_inner());
        }
    }
}

impl BridgeApi for ChannelBridge {
    fn init_microphone(&mut self) {
        self.forward(BridgeCommand::InitMicrophone);
    }

    fn start_audio_chunk(&mut self) {
        self.forward(BridgeCommand::StartAudioChunk);
    }

    fn end_audio_chunk(&mut self) {
        self.forward(BridgeCommand::EndAudioChunk);
    }

    fn initialize_client(&mut self, init: ClientInit) {
        self.forward(BridgeCommand::InitializeClient(init));
    }

    fn send_text_request(&mut self, text: &str) {
        self.forward(BridgeCommand::SendTextRequest { text: text.into() });
    }

    fn send_feedback(&mut self, feedback: Feedback) {
        self.forward(BridgeCommand::SendFeedback(feedback));
    }

    fn send_trigger(&mut self, trigger: TriggerConfig) {
        self.forward(BridgeCommand::SendTrigger(trigger));
    }

    fn set_action_config(&mut self, json: &str) {
        self.forward(BridgeCommand::SetActionConfig { json: json.into() });
    }

    fn interrupt_character(&mut self) {
        self.forward(BridgeCommand::InterruptCharacter);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_arrive_in_call_order() {
        let (mut bridge, rx) = ChannelBridge::new();
        bridge.start_audio_chunk();
        bridge.send_text_request("hi");
        bridge.end_audio_chunk();

        let got: Vec<_> = rx.try_iter().collect();
        assert_eq!(
            got,
            vec![
                BridgeCommand::StartAudioChunk,
                BridgeCommand::SendTextRequest { text: "hi".into() },
                BridgeCommand::EndAudioChunk,
            ]
        );
    }

    #[test]
    fn disconnected_receiver_is_not_fatal() {
        let (mut bridge, rx) = ChannelBridge::new();
        drop(rx);
        bridge.interrupt_character();
    }
}
