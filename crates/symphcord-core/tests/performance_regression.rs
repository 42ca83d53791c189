use std::time::Instant;

use symphcord_core::{
    config::AppConfig,
    engine::Engine,
    fixtures::synthetic_batch,
    midi::score_midi_bytes,
    model::MAX_BATCH_SIZE,
};

fn budget_ms_from_env(key: &str, fallback: u128) -> u128 {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse::<u128>().ok())
        .unwrap_or(fallback)
}

#[test]
fn full_batch_render_and_midi_export_stay_within_budget() {
    let batch = synthetic_batch(MAX_BATCH_SIZE, 9, 2);
    let max_compose_ms = budget_ms_from_env("SYMPHCORD_PERF_MAX_COMPOSE_MS", 20_000);
    let max_midi_ms = budget_ms_from_env("SYMPHCORD_PERF_MAX_MIDI_MS", 1_500);

    let compose_start = Instant::now();
    let composition = Engine::new(AppConfig::default())
        .compose(&batch)
        .expect("full batch should render");
    let compose_elapsed_ms = compose_start.elapsed().as_millis();
    assert_eq!(composition.score.notes.len(), MAX_BATCH_SIZE);
    assert!(
        compose_elapsed_ms <= max_compose_ms,
        "compose regression: {}ms exceeded budget {}ms",
        compose_elapsed_ms,
        max_compose_ms
    );

    let midi_start = Instant::now();
    let midi = score_midi_bytes(&composition.score, &composition.voices)
        .expect("midi export should succeed");
    let midi_elapsed_ms = midi_start.elapsed().as_millis();
    assert!(!midi.is_empty(), "midi bytes should not be empty");
    assert!(
        midi_elapsed_ms <= max_midi_ms,
        "midi export regression: {}ms exceeded budget {}ms",
        midi_elapsed_ms,
        max_midi_ms
    );
}
