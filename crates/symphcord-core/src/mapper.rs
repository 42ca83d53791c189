use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::{
    config::CompositionConfig,
    model::{MAX_BATCH_SIZE, Message, NoteEvent, VoiceId},
};

pub const SCALE_STEPS: [u8; 6] = [0, 2, 4, 7, 9, 11];
pub const ROOT_PITCH: u8 = 62;
pub const SCALE_OCTAVES: usize = 3;
pub const SCALE_LEN: usize = SCALE_STEPS.len() * SCALE_OCTAVES;
/// Lengths beyond this all map to the lowest pitch.
pub const MAX_TEXT_LENGTH: u32 = 2_000;

const LENGTH_STRETCH_CHARS: f64 = 95.0;
const BASE_VELOCITY: f32 = 0.55;
const ACCENT_VELOCITY: f32 = 0.35;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Score {
    pub notes: Vec<NoteEvent>,
    pub total_duration: Duration,
}

impl Score {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }
}

#[must_use]
pub fn scale_pitch(index: usize) -> u8 {
    let index = index.min(SCALE_LEN - 1);
    let octave = (index / SCALE_STEPS.len()) as u8;
    ROOT_PITCH + octave * 12 + SCALE_STEPS[index % SCALE_STEPS.len()]
}

/// Scale index for a message length. Logarithmic in length, longer messages
/// sit lower; never leaves the scale.
#[must_use]
pub fn pitch_index(text_length: u32) -> usize {
    let clamped = f64::from(text_length.min(MAX_TEXT_LENGTH));
    let ratio = (clamped + 1.0).ln() / (f64::from(MAX_TEXT_LENGTH) + 1.0).ln();
    let rank = (ratio * (SCALE_LEN - 1) as f64).round() as usize;
    SCALE_LEN - 1 - rank.min(SCALE_LEN - 1)
}

/// Pulls `base` toward `previous` so successive notes move at most
/// `max_leap` scale steps. Octave-equivalent indices are preferred.
#[must_use]
pub fn smooth_pitch_index(base: usize, previous: Option<usize>, max_leap: Option<u8>) -> usize {
    let (Some(previous), Some(max_leap)) = (previous, max_leap) else {
        return base;
    };

    let total = SCALE_LEN as isize;
    let base = base as isize;
    let previous = previous as isize;
    let max_leap = isize::from(max_leap);

    let closest = [base, base + total, base - total]
        .into_iter()
        .min_by_key(|candidate| (candidate - previous).abs())
        .unwrap_or(base)
        .clamp(0, total - 1);

    let smoothed = if (closest - previous).abs() > max_leap {
        if closest > previous {
            (previous + max_leap).min(total - 1)
        } else {
            (previous - max_leap).max(0)
        }
    } else {
        closest
    };

    smoothed as usize
}

#[must_use]
pub fn note_seconds(text_length: u32, beat: f64) -> f64 {
    if text_length == 0 {
        return beat;
    }

    let stretch = (f64::from(text_length) / LENGTH_STRETCH_CHARS).min(1.0);
    beat * 1.1 + stretch * beat * 3.0
}

#[must_use]
pub fn velocity_for(message: &Message) -> f32 {
    if message.text_length == 0 {
        return BASE_VELOCITY;
    }

    let weight = (message.accent as f32 * 1.2 / message.text_length as f32).min(1.0);
    (BASE_VELOCITY + weight * ACCENT_VELOCITY).clamp(0.0, 1.0)
}

#[derive(Debug, Clone, Copy)]
struct RawNote {
    voice_id: VoiceId,
    pitch: u8,
    start: f64,
    length: f64,
    velocity: f32,
}

/// Maps a message batch onto a score whose length sits inside the configured
/// clip bounds. Offsets and durations share one scale factor.
#[instrument(skip_all, fields(messages = messages.len()))]
pub fn map_messages(messages: &[Message], config: &CompositionConfig) -> Score {
    let (min_seconds, max_seconds) = config.duration_bounds();

    let mut ordered: Vec<&Message> = messages.iter().collect();
    ordered.sort_by_key(|message| message.timestamp);
    if ordered.len() > MAX_BATCH_SIZE {
        warn!(
            supplied = ordered.len(),
            kept = MAX_BATCH_SIZE,
            "batch exceeds limit; keeping the most recent messages"
        );
        ordered.drain(..ordered.len() - MAX_BATCH_SIZE);
    }

    let Some(first) = ordered.first() else {
        debug!("empty batch; producing minimum-length silent score");
        return Score {
            notes: Vec::new(),
            total_duration: Duration::from_secs_f64(min_seconds),
        };
    };
    let first_timestamp = first.timestamp;

    let beat = config.beat_seconds.max(0.05);
    let (min_gap, max_gap) = config.gap_beats();

    let mut raw = Vec::with_capacity(ordered.len());
    let mut previous_index = None;
    let mut previous_beats: Option<f64> = None;
    for message in &ordered {
        let base = pitch_index(message.text_length);
        let index = smooth_pitch_index(base, previous_index, config.max_leap_steps);

        let delta_ms = (message.timestamp - first_timestamp)
            .num_milliseconds()
            .max(0);
        let raw_beats = (delta_ms as f64 / 1000.0 / beat).round();
        let start_beats = match previous_beats {
            None => raw_beats,
            Some(previous) => raw_beats.max(previous + min_gap).min(previous + max_gap),
        };

        raw.push(RawNote {
            voice_id: VoiceId(message.author_id),
            pitch: scale_pitch(index),
            start: start_beats * beat,
            length: note_seconds(message.text_length, beat),
            velocity: velocity_for(message),
        });
        previous_index = Some(index);
        previous_beats = Some(start_beats);
    }

    let natural = raw
        .iter()
        .map(|note| note.start + note.length)
        .fold(0.0_f64, f64::max);
    let target = if natural > 0.0 {
        natural.clamp(min_seconds, max_seconds)
    } else {
        min_seconds
    };
    let scale = if natural > 0.0 { target / natural } else { 1.0 };
    let total_duration = Duration::from_secs_f64(target);

    let mut notes = Vec::with_capacity(raw.len());
    let mut dropped = 0_usize;
    for note in raw {
        let start = (note.start * scale).min(target);
        let end = (start + note.length * scale).min(target);
        let start_offset = Duration::from_secs_f64(start);
        let duration = Duration::from_secs_f64(end).saturating_sub(start_offset);
        if duration.is_zero() {
            dropped += 1;
            continue;
        }

        notes.push(NoteEvent {
            voice_id: note.voice_id,
            pitch: note.pitch,
            start_offset,
            duration,
            velocity: note.velocity,
        });
    }
    notes.sort_by_key(|note| note.start_offset);

    debug!(
        notes = notes.len(),
        dropped,
        natural_seconds = natural,
        total_seconds = target,
        scale,
        "messages mapped to score"
    );

    Score {
        notes,
        total_duration,
    }
}

#[must_use]
pub fn notes_from_messages(messages: &[Message], config: &CompositionConfig) -> Vec<NoteEvent> {
    map_messages(messages, config).notes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scale_spans_more_than_two_octaves() {
        let lowest = scale_pitch(0);
        let highest = scale_pitch(SCALE_LEN - 1);
        assert_eq!(lowest, ROOT_PITCH);
        assert!(highest - lowest >= 24);
    }

    #[test]
    fn pitch_index_is_monotonic_in_length() {
        let mut previous = pitch_index(0);
        for length in [1, 2, 5, 10, 50, 100, 500, 2_000, 10_000, u32::MAX] {
            let index = pitch_index(length);
            assert!(index <= previous, "length {length} rose in pitch");
            previous = index;
        }
        assert_eq!(pitch_index(u32::MAX), 0);
    }

    #[test]
    fn smoothing_limits_leaps() {
        assert_eq!(smooth_pitch_index(17, Some(3), Some(2)), 1);
        assert_eq!(smooth_pitch_index(9, Some(3), Some(2)), 5);
        assert_eq!(smooth_pitch_index(9, Some(3), None), 9);
        assert_eq!(smooth_pitch_index(4, None, Some(2)), 4);
    }
}
