use std::time::Duration;

#[must_use]
pub fn seconds_to_frames(seconds: f64, sample_rate: u32) -> usize {
    if seconds <= 0.0 || !seconds.is_finite() {
        return 0;
    }

    (seconds * f64::from(sample_rate)).round() as usize
}

#[must_use]
pub fn duration_to_frames(duration: Duration, sample_rate: u32) -> usize {
    seconds_to_frames(duration.as_secs_f64(), sample_rate)
}

#[must_use]
pub fn frames_to_duration(frames: usize, sample_rate: u32) -> Duration {
    if sample_rate == 0 {
        return Duration::ZERO;
    }

    Duration::from_secs_f64(frames as f64 / f64::from(sample_rate))
}

#[must_use]
pub fn db_to_gain(db: f32) -> f32 {
    10_f32.powf(db / 20.0)
}

#[must_use]
pub fn midi_to_frequency(pitch: u8) -> f64 {
    let semitone_offset = f64::from(i16::from(pitch) - 69);
    440.0 * 2_f64.powf(semitone_offset / 12.0)
}

#[must_use]
pub fn frequency_to_phase_increment(frequency_hz: f64, sample_rate: u32) -> u32 {
    let normalized = frequency_hz / f64::from(sample_rate.max(1));
    let increment = normalized * f64::from(u32::MAX);
    increment.clamp(1.0, f64::from(u32::MAX)) as u32
}
