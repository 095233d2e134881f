//! Pooled inbound records.
//!
//! Both types are checked out of an [`ObjectPool`](crate::pool::ObjectPool),
//! filled from one callback, routed, and returned. Filling always overwrites
//! the whole record so nothing leaks from the previous occupant.

use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, Result};
use crate::viseme::{parse_viseme_into, VisemePose};

/// One chunk of character speech as delivered by the audio callback.
///
/// ```json
/// {"audData":[0,128,...],"hasVisemesData":false,"isFirst":true,
///  "resText":"Hello there","sampleRate":22050}
/// ```
///
/// Missing fields take their defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AudioResponse {
    /// PCM16 little-endian mono bytes, possibly WAV-framed.
    pub aud_data: Vec<u8>,
    /// Lip-sync frames travel separately; the browser plays this audio itself.
    pub has_visemes_data: bool,
    pub is_first: bool,
    pub res_text: String,
    pub sample_rate: u32,
}

impl AudioResponse {
    /// Replace every field from a JSON payload.
    ///
    /// On error the record is left untouched.
    pub fn fill_from_json(&mut self, json: &str) -> Result<()> {
        *self = serde_json::from_str(json).map_err(BridgeError::AudioPayload)?;
        Ok(())
    }
}

/// One decoded lip-sync frame.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct VisemeFrame {
    pub pose: VisemePose,
    /// Channels actually supplied by the last fill.
    pub channels_set: usize,
}

impl VisemeFrame {
    /// Replace the pose from a wire frame.
    pub fn fill_from_wire(&mut self, raw: &str) {
        self.channels_set = parse_viseme_into(raw, &mut self.pose);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::viseme::VisemeChannel;

    #[test]
    fn audio_response_parses_bridge_shape() {
        let mut record = AudioResponse::default();
        record
            .fill_from_json(
                r#"{"audData":[0,128,255,127],"hasVisemesData":true,"isFirst":true,"resText":"Hi","sampleRate":22050}"#,
            )
            .unwrap();
        assert_eq!(record.aud_data, vec![0, 128, 255, 127]);
        assert!(record.has_visemes_data);
        assert!(record.is_first);
        assert_eq!(record.res_text, "Hi");
        assert_eq!(record.sample_rate, 22_050);
    }

    #[test]
    fn refill_clears_fields_missing_from_payload() {
        let mut record = AudioResponse::default();
        record
            .fill_from_json(r#"{"audData":[1,2],"resText":"old","isFirst":true,"sampleRate":16000}"#)
            .unwrap();
        record.fill_from_json(r#"{"sampleRate":24000}"#).unwrap();
        assert!(record.aud_data.is_empty());
        assert!(record.res_text.is_empty());
        assert!(!record.is_first);
        assert_eq!(record.sample_rate, 24_000);
    }

    #[test]
    fn malformed_json_leaves_record_untouched() {
        let mut record = AudioResponse {
            res_text: "kept".into(),
            ..Default::default()
        };
        let err = record.fill_from_json("{not json").unwrap_err();
        assert!(matches!(err, BridgeError::AudioPayload(_)));
        assert_eq!(record.res_text, "kept");
    }

    #[test]
    fn viseme_frame_refill_overwrites_pose() {
        let mut frame = VisemeFrame::default();
        frame.fill_from_wire("[0.5,0.5,0.5]");
        assert_eq!(frame.channels_set, 3);
        frame.fill_from_wire("[null,null,0.2]");
        assert_eq!(frame.channels_set, 1);
        assert_eq!(frame.pose.get(VisemeChannel::Sil), 0.0);
        assert_eq!(frame.pose.get(VisemeChannel::Pp), 0.0);
        assert!((frame.pose.get(VisemeChannel::Ff) - 0.2).abs() < 1e-6);
    }
}
