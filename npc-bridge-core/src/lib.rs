//! # npc-bridge-core
//!
//! Decoding and routing core for a conversational NPC driven by a
//! browser-hosted AI runtime.
//!
//! ## Architecture
//!
//! ```text
//! browser callbacks ──► BridgeController ──► pooled records (AudioResponse, VisemeFrame)
//!                              │                     │
//!                              │          decode_pcm16 / parse_viseme_into
//!                              │                     │
//!                              │       AudioQueue + FaceTimeline (per character)
//!                              │
//!                              ├──► broadcast::Sender<BridgeEvent>  (UI)
//!                              └──► BridgeApi                      (outbound)
//! ```
//!
//! All callbacks run synchronously on the caller's thread, in arrival order.

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod audio;
pub mod bridge;
pub mod config;
pub mod engine;
pub mod error;
pub mod ipc;
pub mod pool;
pub mod viseme;

// Convenience re-exports for downstream crates
pub use audio::{decode_pcm16, parse_sample_rate, DecodedAudio, WAV_HEADER_LEN};
pub use bridge::{BridgeApi, BridgeCommand, ChannelBridge, LogOnlyBridge};
pub use config::BridgeConfig;
pub use engine::{ActiveCharacter, BridgeController, ControllerStats, PlayerInteraction};
pub use error::BridgeError;
pub use ipc::events::BridgeEvent;
pub use pool::{Lease, ObjectPool, PoolError};
pub use viseme::{
    parse_viseme,
    timeline::{AppendOutcome, FaceTimeline, TimelineHandle, UtteranceSegment},
    VisemeChannel, VisemePose, SILENCE_SENTINEL,
};
