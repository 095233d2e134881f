//! Sample-rate conversion for decoded response clips.
//!
//! Response audio arrives at whatever rate the backend synthesised it
//! (commonly 16 or 22.05 kHz). When the host player runs at a fixed device
//! rate, clips are converted here with a rubato `FastFixedIn` resampler.
//!
//! When source rate == target rate, `RateConverter` is a passthrough and no
//! rubato session is created.

use rubato::{FastFixedIn, PolynomialDegree, Resampler};
use tracing::error;

use super::DecodedAudio;
use crate::error::{BridgeError, Result};

/// Input block size used for whole-clip conversion.
const CLIP_CHUNK: usize = 1024;

/// Converts f32 mono audio from one fixed sample rate to another.
pub struct RateConverter {
    /// `None` in passthrough mode.
    resampler: Option<FastFixedIn<f32>>,
    /// Holds partial input blocks between calls.
    input_buf: Vec<f32>,
    chunk_size: usize,
    /// Pre-allocated `[1][output_frames_max]`.
    output_buf: Vec<Vec<f32>>,
}

impl RateConverter {
    /// # Errors
    /// Returns `BridgeError::Resample` if either rate is zero or rubato fails
    /// to initialise.
    pub fn new(source_rate: u32, target_rate: u32, chunk_size: usize) -> Result<Self> {
        if source_rate == 0 || target_rate == 0 {
            return Err(BridgeError::Resample(format!(
                "cannot convert {source_rate} Hz to {target_rate} Hz"
            )));
        }

        if source_rate == target_rate {
            return Ok(Self {
                resampler: None,
                input_buf: Vec::new(),
                chunk_size,
                output_buf: Vec::new(),
            });
        }

        let ratio = target_rate as f64 / source_rate as f64;
        let resampler = FastFixedIn::<f32>::new(ratio, 1.0, PolynomialDegree::Cubic, chunk_size, 1)
            .map_err(|e| BridgeError::Resample(format!("resampler init: {e}")))?;

        let output_buf = vec![vec![0f32; resampler.output_frames_max()]; 1];

        tracing::debug!(source_rate, target_rate, chunk_size, "resampling enabled");

        Ok(Self {
            resampler: Some(resampler),
            input_buf: Vec::new(),
            chunk_size,
            output_buf,
        })
    }

    /// Push samples, returning whatever output whole input blocks produced.
    ///
    /// A block rubato rejects is logged and skipped.
    pub fn process(&mut self, samples: &[f32]) -> Vec<f32> {
        if self.is_passthrough() {
            return samples.to_vec();
        }

        self.input_buf.extend_from_slice(samples);

        let mut result = Vec::new();
        while let Some(outcome) = self.process_block() {
            match outcome {
                Ok(produced) => result.extend_from_slice(&self.output_buf[0][..produced]),
                Err(e) => error!("resampler process error: {e}"),
            }
        }
        result
    }

    /// Like [`process`](Self::process), but stops at the first block rubato
    /// rejects.
    ///
    /// # Errors
    /// `BridgeError::Resample` with the rubato error.
    pub fn try_process(&mut self, samples: &[f32]) -> Result<Vec<f32>> {
        if self.is_passthrough() {
            return Ok(samples.to_vec());
        }

        self.input_buf.extend_from_slice(samples);

        let mut result = Vec::new();
        while let Some(outcome) = self.process_block() {
            let produced = outcome?;
            result.extend_from_slice(&self.output_buf[0][..produced]);
        }
        Ok(result)
    }

    /// Run one whole input block through rubato. `None` when less than a
    /// block is buffered. The block is consumed either way.
    fn process_block(&mut self) -> Option<Result<usize>> {
        let resampler = self.resampler.as_mut()?;
        if self.input_buf.len() < self.chunk_size {
            return None;
        }

        let input_slice = &self.input_buf[..self.chunk_size];
        let outcome = resampler
            .process_into_buffer(&[input_slice], &mut self.output_buf, None)
            .map(|(_consumed, produced)| produced)
            .map_err(|e| BridgeError::Resample(format!("resampler process: {e}")));
        self.input_buf.drain(..self.chunk_size);
        Some(outcome)
    }

    /// Output frames of latency the resampler adds at the start of a stream.
    pub fn output_delay(&self) -> usize {
        self.resampler.as_ref().map_or(0, |r| r.output_delay())
    }

    pub fn is_passthrough(&self) -> bool {
        self.resampler.is_none()
    }
}

/// Convert a whole clip to `target_rate`.
///
/// The output has `ceil(len * target / source)` samples with the resampler
/// delay removed.
pub fn resample_clip(clip: &DecodedAudio, target_rate: u32) -> Result<DecodedAudio> {
    let rc = RateConverter::new(clip.sample_rate, target_rate, CLIP_CHUNK)?;
    if rc.is_passthrough() {
        return Ok(clip.clone());
    }
    convert_clip(rc, clip, target_rate)
}

fn convert_clip(
    mut rc: RateConverter,
    clip: &DecodedAudio,
    target_rate: u32,
) -> Result<DecodedAudio> {
    let expected =
        (clip.samples.len() as u64 * target_rate as u64).div_ceil(clip.sample_rate as u64) as usize;
    let delay = rc.output_delay();

    let mut out = rc.try_process(&clip.samples)?;
    let silence = vec![0f32; CLIP_CHUNK];
    while out.len() < delay + expected {
        let tail = rc.try_process(&silence)?;
        if tail.is_empty() {
            return Err(BridgeError::Resample("resampler produced no output".into()));
        }
        out.extend_from_slice(&tail);
    }

    out.drain(..delay);
    out.truncate(expected);
    Ok(DecodedAudio::new(out, target_rate))
}
