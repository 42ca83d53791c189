use thiserror::Error;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::{
    backend::{BackendKind, CancelToken, RenderError, RenderedNote, SynthBackend, render_notes},
    config::{AppConfig, EmptyBatchPolicy},
    encoder::{EncodeError, WavEncoder},
    mapper::{Score, map_messages},
    mixer::mix,
    model::{Clip, Message, Voice},
    voices::VoiceAssigner,
};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no messages to compose")]
    EmptyInput,
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Encode(#[from] EncodeError),
}

impl EngineError {
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Render(RenderError::Cancelled))
    }
}

/// Everything one render produced. `wav` is what goes back to the caller.
#[derive(Debug, Clone)]
pub struct Composition {
    pub render_id: Uuid,
    pub score: Score,
    pub voices: Vec<Voice>,
    pub backend: BackendKind,
    pub clip: Clip,
    pub wav: Vec<u8>,
}

#[derive(Debug, Clone, Default)]
pub struct Engine {
    config: AppConfig,
}

impl Engine {
    #[must_use]
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn compose(&self, messages: &[Message]) -> Result<Composition, EngineError> {
        self.compose_with_cancel(messages, &CancelToken::new())
    }

    /// Full pipeline: map, assign, render, mix, encode. Nothing reaches the
    /// encoder once `cancel` has fired.
    #[instrument(skip_all, fields(render_id = tracing::field::Empty, messages = messages.len()))]
    pub fn compose_with_cancel(
        &self,
        messages: &[Message],
        cancel: &CancelToken,
    ) -> Result<Composition, EngineError> {
        let render_id = Uuid::new_v4();
        tracing::Span::current().record("render_id", tracing::field::display(render_id));

        let score = map_messages(messages, &self.config.composition);
        if score.is_empty() && self.config.composition.empty_batch == EmptyBatchPolicy::Reject {
            info!("empty batch rejected by policy");
            return Err(EngineError::EmptyInput);
        }

        let (clip, voices, backend) = self.render_score(&score, cancel)?;
        cancel.check()?;

        let wav = WavEncoder::new(self.config.audio.bit_depth).encode(&clip)?;
        info!(
            notes = score.notes.len(),
            voices = voices.len(),
            ?backend,
            seconds = score.total_duration.as_secs_f64(),
            bytes = wav.len(),
            "composition rendered"
        );

        Ok(Composition {
            render_id,
            score,
            voices,
            backend,
            clip,
            wav,
        })
    }

    /// Renders and mixes a score. A SoundFont failure of any kind reruns the
    /// whole score on the oscillator backend.
    pub fn render_score(
        &self,
        score: &Score,
        cancel: &CancelToken,
    ) -> Result<(Clip, Vec<Voice>, BackendKind), EngineError> {
        let backend = SynthBackend::select(self.config.soundfont.path.as_deref());

        let (renders, voices, backend) = match self.render_with(&backend, score, cancel) {
            Ok((renders, voices)) => (renders, voices, backend.kind()),
            Err(RenderError::Cancelled) => return Err(RenderError::Cancelled.into()),
            Err(error) if matches!(backend, SynthBackend::SoundFont(_)) => {
                warn!(%error, "soundfont render failed; falling back to oscillator backend");
                let (renders, voices) =
                    self.render_with(&SynthBackend::Oscillator, score, cancel)?;
                (renders, voices, BackendKind::Oscillator)
            }
            Err(error) => return Err(error.into()),
        };
        cancel.check()?;

        let clip = mix(
            &renders,
            score.total_duration,
            self.config.audio.effective_sample_rate(),
            self.config.audio.effective_channels(),
            &self.config.mix,
        );
        debug!(peak = clip.peak(), "score mixed");
        Ok((clip, voices, backend))
    }

    fn render_with(
        &self,
        backend: &SynthBackend,
        score: &Score,
        cancel: &CancelToken,
    ) -> Result<(Vec<RenderedNote>, Vec<Voice>), RenderError> {
        let sample_rate = self.config.audio.effective_sample_rate();
        let voices = VoiceAssigner::new(backend.timbre_family()).assign_all(&score.notes);
        backend.prepare(&voices, sample_rate)?;
        let renders = render_notes(
            backend,
            &score.notes,
            &voices,
            sample_rate,
            self.config.render.effective_workers(),
            cancel,
        )?;
        Ok((renders, voices))
    }
}
