use std::time::Duration;

use chrono::Duration as ChronoDuration;
use symphcord_core::{
    backend::{BackendKind, CancelToken},
    config::{AppConfig, EmptyBatchPolicy},
    encoder::decode,
    engine::{Engine, EngineError},
    fixtures::{demo_batch, fixture_epoch},
    model::{Message, VoiceId},
    report::generate_render_report,
};

fn data_chunk_len(bytes: &[u8]) -> Option<u32> {
    let mut offset = 12;
    while offset + 8 <= bytes.len() {
        let size = u32::from_le_bytes(bytes[offset + 4..offset + 8].try_into().ok()?);
        if &bytes[offset..offset + 4] == b"data" {
            return Some(size);
        }
        offset += 8 + size as usize + (size as usize & 1);
    }
    None
}

fn engine_at(sample_rate: u32, workers: usize) -> Engine {
    let mut config = AppConfig::default();
    config.audio.sample_rate = sample_rate;
    config.render.workers = workers;
    Engine::new(config)
}

fn three_message_batch() -> Vec<Message> {
    let at = |seconds| fixture_epoch() + ChronoDuration::seconds(seconds);
    vec![
        Message::new(111, 5, at(0)),
        Message::new(222, 50, at(2)),
        Message::new(111, 5, at(4)),
    ]
}

#[test]
fn three_message_batch_produces_a_fifteen_second_stereo_wav() {
    let composition = Engine::default()
        .compose(&three_message_batch())
        .expect("composition should succeed");

    assert_eq!(composition.backend, BackendKind::Oscillator);
    assert_eq!(composition.score.notes.len(), 3);
    assert_eq!(composition.voices.len(), 2);
    assert_eq!(composition.voices[0].id, VoiceId(111));
    assert_eq!(composition.voices[1].id, VoiceId(222));
    assert_eq!(composition.clip.total_duration, Duration::from_secs(15));
    assert!(!composition.clip.is_silent());
    assert!(composition.clip.peak() <= 1.0);

    assert_eq!(&composition.wav[0..4], b"RIFF");
    assert_eq!(&composition.wav[8..12], b"WAVE");
    assert_eq!(data_chunk_len(&composition.wav), Some(15 * 44_100 * 2 * 2));
}

#[test]
fn empty_batch_renders_minimum_length_silence() {
    let composition = engine_at(16_000, 2)
        .compose(&[])
        .expect("empty batch should still render");

    assert!(composition.score.is_empty());
    assert!(composition.voices.is_empty());
    assert!(composition.clip.is_silent());
    assert_eq!(composition.clip.total_duration, Duration::from_secs(15));

    let decoded = decode(&composition.wav).expect("wav should decode");
    assert_eq!(decoded.samples.len(), 15 * 16_000 * 2);
    assert!(decoded.samples.iter().all(|sample| *sample == 0.0));
}

#[test]
fn reject_policy_refuses_empty_batches() {
    let mut config = AppConfig::default();
    config.composition.empty_batch = EmptyBatchPolicy::Reject;
    let result = Engine::new(config).compose(&[]);
    assert!(matches!(result, Err(EngineError::EmptyInput)));
}

#[test]
fn cancelled_render_never_produces_output() {
    let cancel = CancelToken::new();
    cancel.cancel();

    let error = engine_at(16_000, 4)
        .compose_with_cancel(&demo_batch(), &cancel)
        .expect_err("cancelled render should fail");
    assert!(error.is_cancelled(), "unexpected error: {error}");

    let error = engine_at(16_000, 1)
        .compose_with_cancel(&[], &cancel)
        .expect_err("cancellation also applies to empty batches");
    assert!(error.is_cancelled());
}

#[test]
fn output_does_not_depend_on_worker_count() {
    let batch = demo_batch();
    let serial = engine_at(16_000, 1).compose(&batch).expect("serial render");
    let parallel = engine_at(16_000, 6).compose(&batch).expect("parallel render");

    assert_eq!(serial.score, parallel.score);
    assert_eq!(serial.voices, parallel.voices);
    assert_eq!(serial.wav, parallel.wav);
    assert_ne!(serial.render_id, parallel.render_id);
}

#[test]
fn repeated_renders_produce_identical_reports() {
    let engine = engine_at(16_000, 3);
    let first = engine.compose(&demo_batch()).expect("first render");
    let second = engine.compose(&demo_batch()).expect("second render");

    let first_report = generate_render_report(&first).expect("first report");
    let second_report = generate_render_report(&second).expect("second report");
    assert_eq!(first_report, second_report);
    assert_eq!(first_report.note_count, 12);
    assert_eq!(first_report.voice_count, 4);
    assert_eq!(first_report.wav_bytes, first.wav.len());
}

#[test]
fn twenty_four_bit_mono_output_follows_configuration() {
    let mut config = AppConfig::default();
    config.audio.sample_rate = 8_000;
    config.audio.channels = 1;
    config.audio.bit_depth = symphcord_core::encoder::BitDepth::TwentyFour;
    let composition = Engine::new(config)
        .compose(&three_message_batch())
        .expect("render should succeed");

    assert_eq!(data_chunk_len(&composition.wav), Some(15 * 8_000 * 3));
    let decoded = decode(&composition.wav).expect("wav should decode");
    assert_eq!(decoded.channels, 1);
    assert_eq!(decoded.sample_rate, 8_000);
}
