use std::{fs, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::instrument;

use crate::{backend::BackendKind, engine::Composition};

const REPORT_SCHEMA_VERSION: u32 = 1;

/// Fingerprint of one render. Two renders of the same batch with the same
/// configuration produce equal reports.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RenderReport {
    pub schema_version: u32,
    pub backend: BackendKind,
    pub note_count: usize,
    pub voice_count: usize,
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub channels: u16,
    pub wav_bytes: usize,
    pub score_hash: String,
    pub audio_hash: String,
}

#[instrument(skip(composition), fields(render_id = %composition.render_id))]
pub fn generate_render_report(composition: &Composition) -> Result<RenderReport> {
    let score_bytes =
        serde_json::to_vec(&composition.score).context("failed to serialize score")?;

    Ok(RenderReport {
        schema_version: REPORT_SCHEMA_VERSION,
        backend: composition.backend,
        note_count: composition.score.notes.len(),
        voice_count: composition.voices.len(),
        duration_seconds: composition.clip.total_duration.as_secs_f64(),
        sample_rate: composition.clip.sample_rate,
        channels: composition.clip.channels,
        wav_bytes: composition.wav.len(),
        score_hash: hash_hex(&score_bytes),
        audio_hash: hash_hex(&composition.wav),
    })
}

pub fn read_render_report(path: &Path) -> Result<RenderReport> {
    let bytes = fs::read(path)
        .with_context(|| format!("failed to read render report: {}", path.display()))?;
    let report: RenderReport =
        serde_json::from_slice(&bytes).context("failed to parse render report json")?;
    Ok(report)
}

pub fn write_render_report(path: &Path, report: &RenderReport) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create report directory: {}", parent.display()))?;
    }

    let json = serde_json::to_vec_pretty(report).context("failed to encode render report json")?;
    fs::write(path, json)
        .with_context(|| format!("failed to write render report: {}", path.display()))?;
    Ok(())
}

#[must_use]
pub fn hash_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    format!("{digest:x}")
}
