use std::{fs, io::Write, path::Path};

use anyhow::{Context, Result};
use tracing::{info, instrument};

use crate::model::Message;

#[instrument(fields(path = %path.display()))]
pub fn load_batch(path: &Path) -> Result<Vec<Message>> {
    let content =
        fs::read(path).with_context(|| format!("failed to read batch: {}", path.display()))?;
    let messages: Vec<Message> =
        serde_json::from_slice(&content).context("invalid message batch json")?;
    info!(messages = messages.len(), "batch loaded");
    Ok(messages)
}

#[instrument(skip(messages), fields(path = %path.display(), messages = messages.len()))]
pub fn save_batch(path: &Path, messages: &[Message]) -> Result<()> {
    let json = serde_json::to_vec_pretty(messages).context("failed to serialize batch")?;
    write_atomic(path, &json)
}

/// Writes through a temp file in the target directory and renames it into
/// place, so readers never see a half-written file.
#[instrument(skip(bytes), fields(path = %path.display(), bytes = bytes.len()))]
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let parent = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)
        .with_context(|| format!("failed to create directory: {}", parent.display()))?;

    let mut temp_file =
        tempfile::NamedTempFile::new_in(parent).context("failed to create temp output file")?;
    temp_file
        .write_all(bytes)
        .context("failed to write temp output file")?;
    temp_file
        .persist(path)
        .map_err(|error| anyhow::anyhow!(error.error))
        .with_context(|| format!("failed to persist output: {}", path.display()))?;

    info!("output written");
    Ok(())
}
