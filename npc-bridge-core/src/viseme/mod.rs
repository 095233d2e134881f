//! Viseme frame decoding.
//!
//! ## Wire format
//!
//! ```text
//! [0.0,0.12,null,0.4,...]   up to 15 comma-separated weights
//! ```
//!
//! Each token is a float literal or `null`. Token `i` sets channel `i` of a
//! [`VisemePose`]; tokens past the fifteenth are ignored. `null` and
//! malformed tokens leave the channel at its default of `0.0`.
//!
//! Channel 0 (`sil`) doubles as a control lane: [`SILENCE_SENTINEL`] there
//! marks the start of a new utterance (see [`timeline`]).

pub mod timeline;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Number of channels in a pose.
pub const VISEME_CHANNEL_COUNT: usize = 15;

/// Value on the `sil` channel that opens a new utterance segment.
pub const SILENCE_SENTINEL: f32 = -2.0;

const CHANNEL_NAMES: [&str; VISEME_CHANNEL_COUNT] = [
    "sil", "PP", "FF", "TH", "DD", "kk", "CH", "SS", "nn", "RR", "aa", "E", "ih", "oh", "ou",
];

/// The fifteen mouth shapes, in wire order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VisemeChannel {
    Sil,
    Pp,
    Ff,
    Th,
    Dd,
    Kk,
    Ch,
    Ss,
    Nn,
    Rr,
    Aa,
    E,
    Ih,
    Oh,
    Ou,
}

impl VisemeChannel {
    pub const ALL: [VisemeChannel; VISEME_CHANNEL_COUNT] = [
        VisemeChannel::Sil,
        VisemeChannel::Pp,
        VisemeChannel::Ff,
        VisemeChannel::Th,
        VisemeChannel::Dd,
        VisemeChannel::Kk,
        VisemeChannel::Ch,
        VisemeChannel::Ss,
        VisemeChannel::Nn,
        VisemeChannel::Rr,
        VisemeChannel::Aa,
        VisemeChannel::E,
        VisemeChannel::Ih,
        VisemeChannel::Oh,
        VisemeChannel::Ou,
    ];

    /// Position of this channel in a wire frame.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Conventional viseme label (`"sil"`, `"PP"`, `"aa"`, ...).
    pub fn name(self) -> &'static str {
        CHANNEL_NAMES[self.index()]
    }
}

/// Weights for all fifteen channels of one lip-sync frame.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct VisemePose {
    weights: [f32; VISEME_CHANNEL_COUNT],
}

impl VisemePose {
    pub fn get(&self, channel: VisemeChannel) -> f32 {
        self.weights[channel.index()]
    }

    pub fn set(&mut self, channel: VisemeChannel, value: f32) {
        self.weights[channel.index()] = value;
    }

    /// Set a channel by wire index. Out-of-range indices are ignored and
    /// return `false`.
    pub fn set_index(&mut self, index: usize, value: f32) -> bool {
        match self.weights.get_mut(index) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    pub fn weights(&self) -> &[f32; VISEME_CHANNEL_COUNT] {
        &self.weights
    }

    pub fn silence(&self) -> f32 {
        self.get(VisemeChannel::Sil)
    }

    /// True when this frame opens a new utterance segment.
    pub fn is_segment_start(&self) -> bool {
        self.silence() == SILENCE_SENTINEL
    }

    /// Channel with the largest weight. Ties go to the lower index.
    pub fn dominant(&self) -> VisemeChannel {
        let mut best = 0;
        for (i, w) in self.weights.iter().enumerate().skip(1) {
            if *w > self.weights[best] {
                best = i;
            }
        }
        VisemeChannel::ALL[best]
    }
}

/// Parse one wire frame into a fresh pose.
pub fn parse_viseme(raw: &str) -> VisemePose {
    let mut pose = VisemePose::default();
    parse_viseme_into(raw, &mut pose);
    pose
}

/// Parse one wire frame into `pose`, overwriting every channel.
///
/// Channels not supplied by the frame are reset to `0.0` first, so a reused
/// pose never carries weights from an earlier frame. Returns how many
/// channels were taken from the input.
pub fn parse_viseme_into(raw: &str, pose: &mut VisemePose) -> usize {
    *pose = VisemePose::default();

    let body = raw.trim().trim_matches(|c: char| c == '[' || c == ']');
    let mut set = 0;

    for (index, token) in body.split(',').take(VISEME_CHANNEL_COUNT).enumerate() {
        let token = token.trim();
        if token == "null" {
            continue;
        }
        // Stricter than the wire producer, which accepts non-finite weights.
        // Overflowing literals parse to infinity and are dropped too.
        match token.parse::<f32>() {
            Ok(value) if value.is_finite() => {
                pose.set_index(index, value);
                set += 1;
            }
            _ => debug!(index, token, "skipping malformed viseme token"),
        }
    }

    set
}
