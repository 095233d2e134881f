//! Per-character playback queue.
//!
//! The controller pushes decoded response clips; the host player pops them
//! in arrival order.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use super::DecodedAudio;

/// One decoded response chunk awaiting playback.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseAudio {
    pub clip: DecodedAudio,
    /// Text spoken in this chunk (may be empty).
    pub text: String,
    /// First chunk of a new character response.
    pub is_first: bool,
}

/// FIFO of clips for a single character.
#[derive(Debug, Default)]
pub struct AudioQueue {
    pending: VecDeque<ResponseAudio>,
}

impl AudioQueue {
    pub fn push(&mut self, audio: ResponseAudio) {
        self.pending.push_back(audio);
    }

    pub fn pop(&mut self) -> Option<ResponseAudio> {
        self.pending.pop_front()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Drop everything queued, e.g. when speech is interrupted.
    pub fn clear(&mut self) {
        self.pending.clear();
    }

    /// Total queued playback time in seconds.
    pub fn queued_secs(&self) -> f64 {
        self.pending.iter().map(|a| a.clip.duration_secs()).sum()
    }
}

/// Shared handle to an [`AudioQueue`], held by the controller and the player.
#[derive(Debug, Clone, Default)]
pub struct AudioQueueHandle(pub Arc<Mutex<AudioQueue>>);

impl AudioQueueHandle {
    pub fn new() -> Self {
        Self::default()
    }
}
