use std::{fmt, time::Duration};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::time::duration_to_frames;

pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;
pub const DEFAULT_CHANNELS: u16 = 2;
pub const MAX_BATCH_SIZE: usize = 100;
pub const MIN_CLIP_SECONDS: f64 = 15.0;
pub const MAX_CLIP_SECONDS: f64 = 30.0;

/// One chat message as handed over by the fetching collaborator.
///
/// Only the attributes the composer needs survive: who wrote it, how long it
/// was, how shouty it was and when it was sent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub author_id: u64,
    pub text_length: u32,
    #[serde(default)]
    pub accent: u32,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    #[must_use]
    pub fn new(author_id: u64, text_length: u32, timestamp: DateTime<Utc>) -> Self {
        Self {
            author_id,
            text_length,
            accent: 0,
            timestamp,
        }
    }

    /// Builds a message from raw text. Length counts chars of the trimmed
    /// text; accent counts uppercase letters and ASCII punctuation.
    #[must_use]
    pub fn from_text(author_id: u64, text: &str, timestamp: DateTime<Utc>) -> Self {
        let trimmed = text.trim();
        let text_length = u32::try_from(trimmed.chars().count()).unwrap_or(u32::MAX);
        let accent = trimmed
            .chars()
            .filter(|c| c.is_uppercase() || c.is_ascii_punctuation())
            .count();

        Self {
            author_id,
            text_length,
            accent: u32::try_from(accent).unwrap_or(u32::MAX),
            timestamp,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct VoiceId(pub u64);

impl fmt::Display for VoiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "voice-{}", self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NoteEvent {
    pub voice_id: VoiceId,
    /// MIDI note number.
    pub pitch: u8,
    pub start_offset: Duration,
    pub duration: Duration,
    pub velocity: f32,
}

impl NoteEvent {
    #[must_use]
    pub fn end_offset(&self) -> Duration {
        self.start_offset + self.duration
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Waveform {
    Sine,
    Square,
    Saw,
    Triangle,
}

/// Palette entry. Each patch has a layered oscillator recipe and a General
/// MIDI program for SoundFont rendering.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Patch {
    Warm,
    Sine,
    Bell,
    Glow,
    Harp,
    Celesta,
    Pulse,
    Choir,
}

impl Patch {
    /// Patches handed out to authors.
    pub const AUTHOR_PALETTE: [Patch; 6] = [
        Patch::Warm,
        Patch::Sine,
        Patch::Bell,
        Patch::Glow,
        Patch::Harp,
        Patch::Celesta,
    ];

    pub const ALL: [Patch; 8] = [
        Patch::Warm,
        Patch::Sine,
        Patch::Bell,
        Patch::Glow,
        Patch::Harp,
        Patch::Celesta,
        Patch::Pulse,
        Patch::Choir,
    ];

    #[must_use]
    pub fn gm_program(self) -> u8 {
        match self {
            Patch::Sine => 0,
            Patch::Celesta => 8,
            Patch::Bell => 11,
            Patch::Pulse => 13,
            Patch::Harp => 46,
            Patch::Choir => 52,
            Patch::Warm => 88,
            Patch::Glow => 91,
        }
    }

    /// Reverse lookup used when a program timbre reaches the oscillator
    /// backend. Unknown programs play as a sine.
    #[must_use]
    pub fn for_program(program: u8) -> Patch {
        Self::ALL
            .into_iter()
            .find(|patch| patch.gm_program() == program)
            .unwrap_or(Patch::Sine)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum Timbre {
    Oscillator(Patch),
    Program(u8),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TimbreFamily {
    Oscillator,
    Program,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Voice {
    pub id: VoiceId,
    pub timbre: Timbre,
    /// Stereo position in [-1, 1]; ignored for mono clips.
    pub pan: f32,
}

impl Voice {
    #[must_use]
    pub fn patch(&self) -> Patch {
        match self.timbre {
            Timbre::Oscillator(patch) => patch,
            Timbre::Program(program) => Patch::for_program(program),
        }
    }
}

/// Mixed, fixed-length audio ready for encoding. Samples are interleaved.
#[derive(Debug, Clone, PartialEq)]
pub struct Clip {
    pub total_duration: Duration,
    pub sample_rate: u32,
    pub channels: u16,
    pub samples: Vec<f32>,
}

impl Clip {
    #[must_use]
    pub fn silent(total_duration: Duration, sample_rate: u32, channels: u16) -> Self {
        let len = duration_to_frames(total_duration, sample_rate) * usize::from(channels);
        Self {
            total_duration,
            sample_rate,
            channels,
            samples: vec![0.0; len],
        }
    }

    #[must_use]
    pub fn frame_count(&self) -> usize {
        duration_to_frames(self.total_duration, self.sample_rate)
    }

    /// Sample count implied by the declared duration, rate and channels.
    #[must_use]
    pub fn expected_sample_count(&self) -> usize {
        self.frame_count() * usize::from(self.channels)
    }

    #[must_use]
    pub fn peak(&self) -> f32 {
        self.samples
            .iter()
            .map(|sample| sample.abs())
            .fold(0.0_f32, f32::max)
    }

    #[must_use]
    pub fn is_silent(&self) -> bool {
        self.samples.iter().all(|sample| *sample == 0.0)
    }
}
