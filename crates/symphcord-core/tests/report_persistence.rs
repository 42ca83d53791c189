use symphcord_core::{
    config::AppConfig,
    engine::Engine,
    fixtures::{demo_batch, synthetic_batch},
    persistence::{load_batch, save_batch, write_atomic},
    report::{generate_render_report, hash_hex, read_render_report, write_render_report},
};

#[test]
fn batch_files_round_trip() {
    let temp = tempfile::tempdir().expect("temp dir");
    let path = temp.path().join("nested").join("batch.json");
    let batch = synthetic_batch(25, 4, 3);

    save_batch(&path, &batch).expect("batch should save");
    let loaded = load_batch(&path).expect("batch should load");
    assert_eq!(loaded, batch);
}

#[test]
fn batch_without_accent_field_defaults_to_zero() {
    let temp = tempfile::tempdir().expect("temp dir");
    let path = temp.path().join("batch.json");
    std::fs::write(
        &path,
        r#"[{"author_id": 5, "text_length": 12, "timestamp": "2026-02-23T20:00:00Z"}]"#,
    )
    .expect("write batch");

    let loaded = load_batch(&path).expect("batch should load");
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].accent, 0);
    assert_eq!(loaded[0].text_length, 12);
}

#[test]
fn malformed_batch_is_reported_with_context() {
    let temp = tempfile::tempdir().expect("temp dir");
    let path = temp.path().join("batch.json");
    std::fs::write(&path, b"{ not json").expect("write batch");

    let error = load_batch(&path).expect_err("malformed json should fail");
    assert!(format!("{error:#}").contains("invalid message batch json"));
}

#[test]
fn atomic_write_replaces_existing_files() {
    let temp = tempfile::tempdir().expect("temp dir");
    let path = temp.path().join("out").join("clip.wav");

    write_atomic(&path, b"first").expect("first write");
    write_atomic(&path, b"second").expect("second write");
    assert_eq!(std::fs::read(&path).expect("read back"), b"second");
}

#[test]
fn render_report_round_trips_and_hashes_the_wav() {
    let mut config = AppConfig::default();
    config.audio.sample_rate = 11_025;
    let composition = Engine::new(config)
        .compose(&demo_batch())
        .expect("render should succeed");
    let report = generate_render_report(&composition).expect("report");

    assert_eq!(report.audio_hash, hash_hex(&composition.wav));
    assert_eq!(report.audio_hash.len(), 64);
    assert!((15.0..=30.0).contains(&report.duration_seconds));

    let temp = tempfile::tempdir().expect("temp dir");
    let path = temp.path().join("reports").join("render.json");
    write_render_report(&path, &report).expect("write report");
    assert_eq!(read_render_report(&path).expect("read report"), report);
}
