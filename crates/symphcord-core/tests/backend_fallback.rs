use std::{io::Write, path::Path};

use symphcord_core::{
    backend::{BackendKind, RenderError, SynthBackend},
    config::AppConfig,
    engine::Engine,
    fixtures::demo_batch,
    soundfont::SoundFontBank,
};

fn engine_with_bank(path: Option<&Path>) -> Engine {
    let mut config = AppConfig::default();
    config.audio.sample_rate = 16_000;
    config.render.workers = 2;
    config.soundfont.path = path.map(Path::to_path_buf);
    Engine::new(config)
}

fn garbage_bank(bytes: &[u8]) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".sf2")
        .tempfile()
        .expect("temp file should be created");
    file.write_all(bytes).expect("temp file should be writable");
    file.flush().expect("temp file should flush");
    file
}

#[test]
fn missing_bank_reports_an_instrument_load_error() {
    let path = Path::new("/definitely/not/here/gm.sf2");
    match SoundFontBank::load(path) {
        Err(RenderError::InstrumentLoad { path: reported, .. }) => assert_eq!(reported, path),
        other => panic!("expected instrument load error, got {other:?}"),
    }
    assert!(matches!(
        SynthBackend::soundfont(path),
        Err(RenderError::InstrumentLoad { .. })
    ));
}

#[test]
fn unusable_banks_select_the_oscillator_backend() {
    let corrupt = garbage_bank(b"this is not a soundfont, just some text on disk");
    let empty = garbage_bank(b"");

    assert_eq!(SynthBackend::select(None).kind(), BackendKind::Oscillator);
    assert_eq!(
        SynthBackend::select(Some(Path::new("/missing.sf2"))).kind(),
        BackendKind::Oscillator
    );
    assert_eq!(
        SynthBackend::select(Some(corrupt.path())).kind(),
        BackendKind::Oscillator
    );
    assert_eq!(
        SynthBackend::select(Some(empty.path())).kind(),
        BackendKind::Oscillator
    );
}

#[test]
fn fallback_output_matches_oscillator_only_output_byte_for_byte() {
    let batch = demo_batch();
    let corrupt = garbage_bank(b"RIFX0000junk");

    let reference = engine_with_bank(None)
        .compose(&batch)
        .expect("oscillator render should succeed");
    let missing = engine_with_bank(Some(Path::new("/missing/bank.sf2")))
        .compose(&batch)
        .expect("missing bank should fall back");
    let broken = engine_with_bank(Some(corrupt.path()))
        .compose(&batch)
        .expect("corrupt bank should fall back");

    assert_eq!(missing.backend, BackendKind::Oscillator);
    assert_eq!(broken.backend, BackendKind::Oscillator);
    assert_eq!(missing.voices, reference.voices);
    assert_eq!(missing.wav, reference.wav);
    assert_eq!(broken.wav, reference.wav);
}
