use std::{
    env, fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::{
    encoder::BitDepth,
    model::{DEFAULT_CHANNELS, DEFAULT_SAMPLE_RATE, MAX_CLIP_SECONDS, MIN_CLIP_SECONDS},
};

pub const CONFIG_FILE_NAME: &str = "symphcord.config.toml";
pub const CONFIG_PATH_ENV: &str = "SYMPHCORD_CONFIG_PATH";
pub const SOUNDFONT_PATH_ENV: &str = "SOUNDFONT_PATH";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub audio: AudioConfig,
    pub composition: CompositionConfig,
    pub mix: MixConfig,
    pub soundfont: SoundFontConfig,
    pub render: RenderConfig,
    pub diagnostics: DiagnosticsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AudioConfig {
    /// Output rate in Hz, clamped to 8 000..=192 000. The SoundFont backend
    /// needs at least 16 000; below that renders use the oscillator.
    pub sample_rate: u32,
    pub channels: u16,
    pub bit_depth: BitDepth,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EmptyBatchPolicy {
    RenderSilence,
    Reject,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CompositionConfig {
    pub min_duration_secs: f64,
    pub max_duration_secs: f64,
    pub beat_seconds: f64,
    pub min_gap_beats: f64,
    pub max_gap_beats: f64,
    /// Largest melodic step between consecutive notes, in scale degrees.
    pub max_leap_steps: Option<u8>,
    pub empty_batch: EmptyBatchPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MixConfig {
    pub headroom_db: f32,
    pub soft_clip_threshold: f32,
    pub ambience: bool,
    /// Low-pass and high-pass over the dry mix before ambience.
    pub tone_filter: bool,
    pub lowpass_hz: f32,
    pub highpass_hz: f32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SoundFontConfig {
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RenderConfig {
    /// Worker threads for note rendering; 0 picks the available parallelism.
    pub workers: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DiagnosticsConfig {
    pub rust_log_filter: String,
    pub trace_file_prefix: String,
    pub logs_dir: PathBuf,
    pub stdout: bool,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            channels: DEFAULT_CHANNELS,
            bit_depth: BitDepth::Sixteen,
        }
    }
}

impl Default for CompositionConfig {
    fn default() -> Self {
        Self {
            min_duration_secs: MIN_CLIP_SECONDS,
            max_duration_secs: MAX_CLIP_SECONDS,
            beat_seconds: 0.55,
            min_gap_beats: 1.0,
            max_gap_beats: 2.5,
            max_leap_steps: None,
            empty_batch: EmptyBatchPolicy::RenderSilence,
        }
    }
}

impl Default for MixConfig {
    fn default() -> Self {
        Self {
            headroom_db: -1.5,
            soft_clip_threshold: 0.95,
            ambience: true,
            tone_filter: true,
            lowpass_hz: 6_400.0,
            highpass_hz: 120.0,
        }
    }
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            rust_log_filter: crate::diagnostics::DEFAULT_LOG_FILTER.to_string(),
            trace_file_prefix: "symphcord".to_string(),
            logs_dir: PathBuf::from("logs"),
            stdout: true,
        }
    }
}

impl CompositionConfig {
    /// Clip bounds, always kept inside the 15..=30 second window.
    #[must_use]
    pub fn duration_bounds(&self) -> (f64, f64) {
        let min = sanitize(self.min_duration_secs, MIN_CLIP_SECONDS)
            .clamp(MIN_CLIP_SECONDS, MAX_CLIP_SECONDS);
        let max = sanitize(self.max_duration_secs, MAX_CLIP_SECONDS)
            .clamp(MIN_CLIP_SECONDS, MAX_CLIP_SECONDS);
        (min.min(max), max.max(min))
    }

    #[must_use]
    pub fn gap_beats(&self) -> (f64, f64) {
        let min = sanitize(self.min_gap_beats, 1.0).max(0.0);
        let max = sanitize(self.max_gap_beats, 2.5).max(min);
        (min, max)
    }
}

impl AudioConfig {
    #[must_use]
    pub fn effective_sample_rate(&self) -> u32 {
        self.sample_rate.clamp(8_000, 192_000)
    }

    #[must_use]
    pub fn effective_channels(&self) -> u16 {
        self.channels.clamp(1, 2)
    }
}

impl RenderConfig {
    #[must_use]
    pub fn effective_workers(&self) -> usize {
        if self.workers > 0 {
            return self.workers;
        }
        std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get)
    }
}

fn sanitize(value: f64, fallback: f64) -> f64 {
    if value.is_finite() { value } else { fallback }
}

impl AppConfig {
    /// Loads the discovered config file, or defaults when none exists, then
    /// applies environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = match discover_config_path() {
            Some(path) => Self::load_from_path(&path)?,
            None => Self::default(),
        };
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("failed to parse config TOML from {}", path.display()))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(content)?;
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) {
        if let Some(path) = env::var_os(SOUNDFONT_PATH_ENV).filter(|value| !value.is_empty()) {
            self.soundfont.path = Some(PathBuf::from(path));
        }
    }
}

fn discover_config_path() -> Option<PathBuf> {
    if let Some(path) = env::var_os(CONFIG_PATH_ENV) {
        let path = PathBuf::from(path);
        if path.is_file() {
            return Some(path);
        }
    }

    let cwd = env::current_dir().ok()?;
    [
        cwd.join(CONFIG_FILE_NAME),
        cwd.join("..").join(CONFIG_FILE_NAME),
    ]
    .into_iter()
    .find(|path| path.is_file())
}
