use std::io::Cursor;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::{model::Clip, time::frames_to_duration};

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("sample {index} is outside the representable range: {value}")]
    Range { index: usize, value: f32 },
    #[error("clip declares {declared} samples but holds {actual}")]
    Format { declared: usize, actual: usize },
    #[error("clip layout is not encodable: {sample_rate} Hz, {channels} channels")]
    Layout { sample_rate: u32, channels: u16 },
    #[error("unsupported bit depth: {0}")]
    UnsupportedBitDepth(u16),
    #[error("wav container error: {0}")]
    Wav(#[from] hound::Error),
}

/// PCM sample width. Fixed per deployment through configuration.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(try_from = "u16", into = "u16")]
pub enum BitDepth {
    #[default]
    Sixteen,
    TwentyFour,
}

impl BitDepth {
    #[must_use]
    pub fn bits(self) -> u16 {
        match self {
            Self::Sixteen => 16,
            Self::TwentyFour => 24,
        }
    }

    #[must_use]
    pub fn bytes_per_sample(self) -> usize {
        usize::from(self.bits() / 8)
    }

    /// Largest positive integer sample.
    #[must_use]
    pub fn full_scale(self) -> f32 {
        ((1_i32 << (self.bits() - 1)) - 1) as f32
    }
}

impl TryFrom<u16> for BitDepth {
    type Error = EncodeError;

    fn try_from(bits: u16) -> Result<Self, Self::Error> {
        match bits {
            16 => Ok(Self::Sixteen),
            24 => Ok(Self::TwentyFour),
            other => Err(EncodeError::UnsupportedBitDepth(other)),
        }
    }
}

impl From<BitDepth> for u16 {
    fn from(value: BitDepth) -> Self {
        value.bits()
    }
}

#[must_use]
pub fn quantize(sample: f32, bit_depth: BitDepth) -> i32 {
    (sample * bit_depth.full_scale()).round() as i32
}

/// Checks a clip against the encoder contract without writing anything.
pub fn validate(clip: &Clip) -> Result<(), EncodeError> {
    if clip.sample_rate == 0 || clip.channels == 0 {
        return Err(EncodeError::Layout {
            sample_rate: clip.sample_rate,
            channels: clip.channels,
        });
    }

    let declared = clip.expected_sample_count();
    if declared != clip.samples.len() {
        return Err(EncodeError::Format {
            declared,
            actual: clip.samples.len(),
        });
    }

    if let Some((index, value)) = clip
        .samples
        .iter()
        .copied()
        .enumerate()
        .find(|(_, value)| !value.is_finite() || value.abs() > 1.0)
    {
        return Err(EncodeError::Range { index, value });
    }

    Ok(())
}

#[derive(Debug, Clone, Copy, Default)]
pub struct WavEncoder {
    bit_depth: BitDepth,
}

impl WavEncoder {
    #[must_use]
    pub fn new(bit_depth: BitDepth) -> Self {
        Self { bit_depth }
    }

    #[must_use]
    pub fn bit_depth(&self) -> BitDepth {
        self.bit_depth
    }

    /// Serialises a clip as PCM WAV. Rejects rather than wraps out-of-range
    /// samples.
    #[instrument(skip_all, fields(bits = self.bit_depth.bits(), samples = clip.samples.len()))]
    pub fn encode(&self, clip: &Clip) -> Result<Vec<u8>, EncodeError> {
        validate(clip)?;

        let spec = hound::WavSpec {
            channels: clip.channels,
            sample_rate: clip.sample_rate,
            bits_per_sample: self.bit_depth.bits(),
            sample_format: hound::SampleFormat::Int,
        };

        let capacity = 128 + clip.samples.len() * self.bit_depth.bytes_per_sample();
        let mut cursor = Cursor::new(Vec::with_capacity(capacity));
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
            for sample in &clip.samples {
                writer.write_sample(quantize(*sample, self.bit_depth))?;
            }
            writer.finalize()?;
        }

        let bytes = cursor.into_inner();
        debug!(bytes = bytes.len(), "wav encoded");
        Ok(bytes)
    }
}

pub fn encode(clip: &Clip) -> Result<Vec<u8>, EncodeError> {
    WavEncoder::default().encode(clip)
}

/// Reads integer PCM WAV bytes back into a clip scaled to [-1, 1].
pub fn decode(bytes: &[u8]) -> Result<Clip, EncodeError> {
    let reader = hound::WavReader::new(Cursor::new(bytes))?;
    let spec = reader.spec();
    if spec.sample_format != hound::SampleFormat::Int {
        return Err(EncodeError::UnsupportedBitDepth(spec.bits_per_sample));
    }
    let bit_depth = BitDepth::try_from(spec.bits_per_sample)?;
    if spec.channels == 0 {
        return Err(EncodeError::Layout {
            sample_rate: spec.sample_rate,
            channels: spec.channels,
        });
    }

    let full_scale = bit_depth.full_scale();
    let samples = reader
        .into_samples::<i32>()
        .map(|sample| sample.map(|value| value as f32 / full_scale))
        .collect::<Result<Vec<_>, _>>()?;
    let frames = samples.len() / usize::from(spec.channels);

    Ok(Clip {
        total_duration: frames_to_duration(frames, spec.sample_rate),
        sample_rate: spec.sample_rate,
        channels: spec.channels,
        samples,
    })
}
