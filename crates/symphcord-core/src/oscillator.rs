use std::f32::consts::PI;

use crate::{
    model::{NoteEvent, Patch, Voice, Waveform},
    time::{db_to_gain, duration_to_frames, frequency_to_phase_increment, midi_to_frequency},
};

/// Shortest fade applied at both note edges.
pub const EDGE_FADE_MS: f32 = 5.0;

const MIN_LAYER_HZ: f64 = 30.0;

#[derive(Debug, Clone, Copy)]
pub struct Layer {
    pub waveform: Waveform,
    pub ratio: f64,
    pub gain_db: f32,
    /// Lower bound for the layer frequency, for sub layers on low notes.
    pub floor_hz: f64,
}

const fn layer(waveform: Waveform, ratio: f64, gain_db: f32) -> Layer {
    Layer {
        waveform,
        ratio,
        gain_db,
        floor_hz: MIN_LAYER_HZ,
    }
}

const fn sub_layer(waveform: Waveform, ratio: f64, gain_db: f32, floor_hz: f64) -> Layer {
    Layer {
        waveform,
        ratio,
        gain_db,
        floor_hz,
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Recipe {
    pub layers: &'static [Layer],
    pub attack_fraction: f32,
    pub min_attack_ms: f32,
    pub release_fraction: f32,
    pub min_release_ms: f32,
}

const WARM: &[Layer] = &[
    layer(Waveform::Sine, 1.0, 0.0),
    sub_layer(Waveform::Sine, 0.5, -12.0, 55.0),
    layer(Waveform::Triangle, 2.0, -15.0),
];
const SINE: &[Layer] = &[layer(Waveform::Sine, 1.0, 0.0)];
const BELL: &[Layer] = &[
    layer(Waveform::Sine, 1.0, 0.0),
    layer(Waveform::Sine, 2.5, -8.0),
    layer(Waveform::Triangle, 3.5, -14.0),
];
const GLOW: &[Layer] = &[
    layer(Waveform::Triangle, 1.0, 0.0),
    sub_layer(Waveform::Sine, 0.4, -18.0, 30.0),
    layer(Waveform::Triangle, 1.6, -14.0),
];
const HARP: &[Layer] = &[
    layer(Waveform::Sine, 1.0, 0.0),
    layer(Waveform::Triangle, 1.0, -8.0),
    layer(Waveform::Sine, 2.0, -12.0),
];
const CELESTA: &[Layer] = &[
    layer(Waveform::Sine, 1.0, 0.0),
    layer(Waveform::Sine, 2.8, -6.0),
    layer(Waveform::Triangle, 4.2, -15.0),
];
const PULSE: &[Layer] = &[
    layer(Waveform::Triangle, 1.0, 0.0),
    layer(Waveform::Triangle, 2.0, -10.0),
    sub_layer(Waveform::Sine, 0.5, -14.0, 40.0),
];
const CHOIR: &[Layer] = &[
    layer(Waveform::Sine, 1.0, 0.0),
    layer(Waveform::Sine, 0.5, -12.0),
    layer(Waveform::Square, 1.0, -18.0),
];

#[must_use]
pub fn recipe(patch: Patch) -> Recipe {
    let standard = |layers: &'static [Layer]| Recipe {
        layers,
        attack_fraction: 0.18,
        min_attack_ms: 15.0,
        release_fraction: 0.35,
        min_release_ms: 60.0,
    };

    match patch {
        Patch::Warm => standard(WARM),
        Patch::Sine => standard(SINE),
        Patch::Bell => standard(BELL),
        Patch::Glow => standard(GLOW),
        Patch::Pulse => standard(PULSE),
        Patch::Harp => Recipe {
            attack_fraction: 0.05,
            min_attack_ms: 5.0,
            release_fraction: 0.4,
            min_release_ms: 80.0,
            ..standard(HARP)
        },
        Patch::Celesta => Recipe {
            attack_fraction: 0.08,
            min_attack_ms: 6.0,
            release_fraction: 0.3,
            min_release_ms: 70.0,
            ..standard(CELESTA)
        },
        Patch::Choir => Recipe {
            attack_fraction: 0.25,
            min_attack_ms: 25.0,
            release_fraction: 0.45,
            min_release_ms: 120.0,
            ..standard(CHOIR)
        },
    }
}

#[must_use]
pub fn oscillator(waveform: Waveform, phase: u32) -> f32 {
    match waveform {
        Waveform::Sine => sine_osc(phase),
        Waveform::Square => square_osc(phase),
        Waveform::Saw => saw_osc(phase),
        Waveform::Triangle => triangle_osc(phase),
    }
}

fn phase_unit(phase: u32) -> f32 {
    (f64::from(phase) / (f64::from(u32::MAX) + 1.0)) as f32
}

fn sine_osc(phase: u32) -> f32 {
    (phase_unit(phase) * 2.0 * PI).sin()
}

fn square_osc(phase: u32) -> f32 {
    if phase < 0x8000_0000 { 1.0 } else { -1.0 }
}

fn saw_osc(phase: u32) -> f32 {
    phase_unit(phase) * 2.0 - 1.0
}

fn triangle_osc(phase: u32) -> f32 {
    let unit = phase_unit(phase);
    if unit < 0.5 {
        (unit * 4.0) - 1.0
    } else {
        3.0 - (unit * 4.0)
    }
}

/// Frames covered by a note: `[frames(start), frames(start + duration))`.
#[must_use]
pub fn note_frame_span(note: &NoteEvent, sample_rate: u32) -> (usize, usize) {
    let start = duration_to_frames(note.start_offset, sample_rate);
    let end = duration_to_frames(note.end_offset(), sample_rate).max(start);
    (start, end)
}

/// Raised-cosine fades with the given lengths in frames. Both are held under
/// half the buffer and the outermost samples end up at exactly zero.
pub fn apply_envelope(samples: &mut [f32], attack_frames: usize, release_frames: usize) {
    let len = samples.len();
    if len < 3 {
        samples.fill(0.0);
        return;
    }

    let half = len / 2;
    let attack = attack_frames.clamp(1, half);
    let release = release_frames.clamp(1, half);

    for (index, sample) in samples.iter_mut().take(attack).enumerate() {
        *sample *= ramp(index, attack);
    }
    for (index, sample) in samples.iter_mut().rev().take(release).enumerate() {
        *sample *= ramp(index, release);
    }
}

fn ramp(index: usize, length: usize) -> f32 {
    let position = index as f32 / length as f32;
    0.5 - 0.5 * (position * PI).cos()
}

#[must_use]
pub fn ms_to_frames(ms: f32, sample_rate: u32) -> usize {
    (ms.max(0.0) / 1000.0 * sample_rate as f32).round() as usize
}

/// Edge fade for buffers produced elsewhere, such as the SoundFont engine.
pub fn apply_edge_fade(samples: &mut [f32], sample_rate: u32) {
    let frames = ms_to_frames(EDGE_FADE_MS, sample_rate).max(1);
    apply_envelope(samples, frames, frames);
}

/// Renders one note as a mono buffer spanning exactly the note's frames.
/// Pure; safe to call from any number of threads at once.
#[must_use]
pub fn render_note(note: &NoteEvent, voice: &Voice, sample_rate: u32) -> Vec<f32> {
    let (start, end) = note_frame_span(note, sample_rate);
    let frames = end - start;
    let mut buffer = vec![0.0_f32; frames];
    if frames == 0 || note.velocity <= 0.0 {
        return buffer;
    }

    let recipe = recipe(voice.patch());
    let fundamental = midi_to_frequency(note.pitch);
    let nyquist = f64::from(sample_rate) / 2.0;
    let gain_sum: f32 = recipe
        .layers
        .iter()
        .map(|layer| db_to_gain(layer.gain_db))
        .sum();

    for layer in recipe.layers {
        let frequency = (fundamental * layer.ratio).max(layer.floor_hz);
        if frequency >= nyquist {
            continue;
        }
        let increment = frequency_to_phase_increment(frequency, sample_rate);
        let gain = db_to_gain(layer.gain_db) / gain_sum;
        let mut phase = 0_u32;
        for frame in &mut buffer {
            *frame += oscillator(layer.waveform, phase) * gain;
            phase = phase.wrapping_add(increment);
        }
    }

    let velocity = note.velocity.clamp(0.0, 1.0);
    for frame in &mut buffer {
        *frame *= velocity;
    }

    let note_ms = frames as f32 * 1000.0 / sample_rate as f32;
    let attack_ms = (note_ms * recipe.attack_fraction)
        .max(recipe.min_attack_ms)
        .max(EDGE_FADE_MS);
    let release_ms = (note_ms * recipe.release_fraction)
        .max(recipe.min_release_ms)
        .max(EDGE_FADE_MS);
    apply_envelope(
        &mut buffer,
        ms_to_frames(attack_ms, sample_rate),
        ms_to_frames(release_ms, sample_rate),
    );

    buffer
}
