use std::{f32::consts::FRAC_PI_4, time::Duration};

use tracing::{debug, instrument};

use crate::{
    backend::RenderedNote,
    config::MixConfig,
    filter::StateVariableFilter,
    model::Clip,
    oscillator::ms_to_frames,
    time::{db_to_gain, duration_to_frames},
};

/// Early reflections added to the dry mix: (delay ms, gain dB).
pub const AMBIENCE_TAPS: [(f32, f32); 4] = [
    (90.0, -9.0),
    (110.0, -12.0),
    (260.0, -17.0),
    (430.0, -22.0),
];

/// Cutoff and level of the high-passed copy of the reflections.
pub const SHIMMER_HIGHPASS_HZ: f32 = 1_800.0;
pub const SHIMMER_GAIN_DB: f32 = -12.0;

/// Constant-power gains for a pan position in [-1, 1].
#[must_use]
pub fn pan_gains(pan: f32) -> (f32, f32) {
    let angle = (pan.clamp(-1.0, 1.0) + 1.0) * FRAC_PI_4;
    (angle.cos(), angle.sin())
}

/// Scales the buffer so its peak lands on `headroom_db` below full scale.
/// Returns the applied gain, or `None` for silent or non-finite input.
pub fn normalize(samples: &mut [f32], headroom_db: f32) -> Option<f32> {
    let target_peak = db_to_gain(headroom_db.min(0.0));
    let peak = samples
        .iter()
        .map(|sample| sample.abs())
        .fold(0.0_f32, f32::max);

    if peak <= 0.0 || !peak.is_finite() {
        return None;
    }

    let gain = target_peak / peak;
    for sample in samples.iter_mut() {
        *sample *= gain;
    }
    Some(gain)
}

/// Exponential knee above `threshold`; output magnitude stays below 1.
#[inline]
#[must_use]
pub fn soft_clip(sample: f32, threshold: f32) -> f32 {
    let threshold = threshold.clamp(0.0, 1.0);
    let abs = sample.abs();
    if abs <= threshold {
        sample
    } else {
        let excess = abs - threshold;
        let compressed = threshold + (1.0 - threshold) * (1.0 - (-excess * 3.0).exp());
        sample.signum() * compressed.min(1.0)
    }
}

pub fn soft_clip_buffer(samples: &mut [f32], threshold: f32) {
    for sample in samples.iter_mut() {
        *sample = soft_clip(*sample, threshold);
    }
}

/// Low-pass then high-pass over the dry mix, trimming harsh highs and rumble.
/// A cutoff at or above Nyquist skips its stage.
pub fn apply_tone_filter(
    samples: &mut [f32],
    sample_rate: u32,
    channels: u16,
    lowpass_hz: f32,
    highpass_hz: f32,
) {
    if let Some(lowpass) = StateVariableFilter::lowpass(lowpass_hz, sample_rate) {
        lowpass.run_interleaved(samples, channels);
    }
    if let Some(highpass) = StateVariableFilter::highpass(highpass_hz, sample_rate) {
        highpass.run_interleaved(samples, channels);
    }
}

/// Adds delayed copies of the dry signal plus a high-passed shimmer of those
/// copies. Taps past the end are cut.
pub fn apply_ambience(samples: &mut [f32], sample_rate: u32, channels: u16) {
    let stride = usize::from(channels.max(1));
    let mut wet = vec![0.0_f32; samples.len()];
    for (delay_ms, gain_db) in AMBIENCE_TAPS {
        let offset = ms_to_frames(delay_ms, sample_rate) * stride;
        if offset >= samples.len() {
            continue;
        }
        let gain = db_to_gain(gain_db);
        for (tap, source) in wet[offset..].iter_mut().zip(samples.iter()) {
            *tap += source * gain;
        }
    }

    let mut shimmer = wet.clone();
    match StateVariableFilter::highpass(SHIMMER_HIGHPASS_HZ, sample_rate) {
        Some(highpass) => highpass.run_interleaved(&mut shimmer, channels),
        None => shimmer.fill(0.0),
    }

    let shimmer_gain = db_to_gain(SHIMMER_GAIN_DB);
    for ((sample, tap), bright) in samples.iter_mut().zip(&wet).zip(&shimmer) {
        *sample += tap + bright * shimmer_gain;
    }
}

/// Sums note renders into one clip, shapes its tone, then normalises and
/// soft clips it.
/// Deterministic for a given input order.
#[instrument(skip(renders, config), fields(renders = renders.len()))]
pub fn mix(
    renders: &[RenderedNote],
    total_duration: Duration,
    sample_rate: u32,
    channels: u16,
    config: &MixConfig,
) -> Clip {
    let channels = channels.clamp(1, 2);
    let stride = usize::from(channels);
    let frames = duration_to_frames(total_duration, sample_rate);
    let mut samples = vec![0.0_f32; frames * stride];

    let mut truncated = 0_usize;
    for render in renders {
        if render.start_frame >= frames {
            truncated += 1;
            continue;
        }
        let available = frames - render.start_frame;
        if render.samples.len() > available {
            truncated += 1;
        }

        let (left_gain, right_gain) = pan_gains(render.pan);
        let target = &mut samples[render.start_frame * stride..];
        for (frame, source) in target.chunks_exact_mut(stride).zip(&render.samples) {
            if stride == 1 {
                frame[0] += source;
            } else {
                frame[0] += source * left_gain;
                frame[1] += source * right_gain;
            }
        }
    }

    if config.tone_filter {
        apply_tone_filter(
            &mut samples,
            sample_rate,
            channels,
            config.lowpass_hz,
            config.highpass_hz,
        );
    }
    if config.ambience {
        apply_ambience(&mut samples, sample_rate, channels);
    }
    let gain = normalize(&mut samples, config.headroom_db);
    soft_clip_buffer(&mut samples, config.soft_clip_threshold);

    debug!(frames, channels, truncated, ?gain, "mix completed");
    Clip {
        total_duration,
        sample_rate,
        channels,
        samples,
    }
}
