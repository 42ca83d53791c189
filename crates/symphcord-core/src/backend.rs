use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    thread,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::{
    model::{NoteEvent, TimbreFamily, Voice, VoiceId},
    oscillator::{self, note_frame_span},
    soundfont::SoundFontBank,
    voices::voice_for_author,
};

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("instrument bank could not be loaded from {path}: {reason}")]
    InstrumentLoad { path: PathBuf, reason: String },
    #[error("instrument bank has no program {program}")]
    ProgramUnavailable { program: u8 },
    #[error("instrument bank cannot render at {sample_rate} Hz")]
    UnsupportedSampleRate { sample_rate: u32 },
    #[error("instrument engine error: {0}")]
    Engine(String),
    #[error("render cancelled")]
    Cancelled,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    Oscillator,
    SoundFont,
}

/// Rendering strategy, picked once per render and used for every voice.
#[derive(Debug, Clone)]
pub enum SynthBackend {
    Oscillator,
    SoundFont(Arc<SoundFontBank>),
}

impl SynthBackend {
    /// SoundFont when a bank is configured and loads, oscillator otherwise.
    #[instrument(skip_all, fields(path = ?path))]
    pub fn select(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::Oscillator;
        };

        match Self::soundfont(path) {
            Ok(backend) => backend,
            Err(error) => {
                warn!(%error, "soundfont unavailable; using oscillator backend");
                Self::Oscillator
            }
        }
    }

    pub fn soundfont(path: &Path) -> Result<Self, RenderError> {
        Ok(Self::SoundFont(Arc::new(SoundFontBank::load(path)?)))
    }

    #[must_use]
    pub fn kind(&self) -> BackendKind {
        match self {
            Self::Oscillator => BackendKind::Oscillator,
            Self::SoundFont(_) => BackendKind::SoundFont,
        }
    }

    #[must_use]
    pub fn timbre_family(&self) -> TimbreFamily {
        match self {
            Self::Oscillator => TimbreFamily::Oscillator,
            Self::SoundFont(_) => TimbreFamily::Program,
        }
    }

    /// Checks up front that every voice can be played by this backend at
    /// this rate.
    pub fn prepare(&self, voices: &[Voice], sample_rate: u32) -> Result<(), RenderError> {
        match self {
            Self::Oscillator => Ok(()),
            Self::SoundFont(bank) => {
                SoundFontBank::ensure_sample_rate(sample_rate)?;
                bank.ensure_programs(voices)
            }
        }
    }

    pub fn render_note(
        &self,
        note: &NoteEvent,
        voice: &Voice,
        sample_rate: u32,
    ) -> Result<Vec<f32>, RenderError> {
        match self {
            Self::Oscillator => Ok(oscillator::render_note(note, voice, sample_rate)),
            Self::SoundFont(bank) => bank.render_note(note, voice, sample_rate),
        }
    }
}

/// Shared flag that aborts an in-flight render.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn check(&self) -> Result<(), RenderError> {
        if self.is_cancelled() {
            Err(RenderError::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedNote {
    /// Position of the note in the score.
    pub index: usize,
    pub voice_id: VoiceId,
    pub start_frame: usize,
    pub pan: f32,
    pub samples: Vec<f32>,
}

/// Renders every note on a scoped worker pool and joins before returning.
/// Results come back in score order whatever the worker count.
#[instrument(skip_all, fields(backend = ?backend.kind(), notes = notes.len(), workers = workers))]
pub fn render_notes(
    backend: &SynthBackend,
    notes: &[NoteEvent],
    voices: &[Voice],
    sample_rate: u32,
    workers: usize,
    cancel: &CancelToken,
) -> Result<Vec<RenderedNote>, RenderError> {
    cancel.check()?;
    if notes.is_empty() {
        return Ok(Vec::new());
    }

    let lookup: BTreeMap<VoiceId, Voice> = voices.iter().map(|voice| (voice.id, *voice)).collect();
    let family = backend.timbre_family();
    let workers = workers.clamp(1, notes.len());
    let next = AtomicUsize::new(0);
    let failed = AtomicBool::new(false);

    let worker = || -> Result<Vec<RenderedNote>, RenderError> {
        let mut local = Vec::new();
        loop {
            cancel.check()?;
            if failed.load(Ordering::Relaxed) {
                break;
            }
            let index = next.fetch_add(1, Ordering::Relaxed);
            let Some(note) = notes.get(index) else {
                break;
            };

            let voice = lookup
                .get(&note.voice_id)
                .copied()
                .unwrap_or_else(|| voice_for_author(note.voice_id.0, family));
            let samples = backend
                .render_note(note, &voice, sample_rate)
                .inspect_err(|_| failed.store(true, Ordering::Relaxed))?;
            let (start_frame, _) = note_frame_span(note, sample_rate);

            local.push(RenderedNote {
                index,
                voice_id: note.voice_id,
                start_frame,
                pan: voice.pan,
                samples,
            });
        }
        Ok(local)
    };

    let results: Vec<Result<Vec<RenderedNote>, RenderError>> = thread::scope(|scope| {
        let handles: Vec<_> = (0..workers).map(|_| scope.spawn(worker)).collect();
        handles
            .into_iter()
            .map(|handle| {
                handle
                    .join()
                    .unwrap_or_else(|_| Err(RenderError::Engine("render worker panicked".into())))
            })
            .collect()
    });

    let mut rendered = Vec::with_capacity(notes.len());
    for result in results {
        rendered.extend(result?);
    }
    cancel.check()?;
    rendered.sort_by_key(|note| note.index);

    debug!(rendered = rendered.len(), "note renders joined");
    Ok(rendered)
}
