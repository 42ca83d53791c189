use std::{
    collections::BTreeSet,
    fmt,
    fs::File,
    io::BufReader,
    ops::RangeInclusive,
    path::{Path, PathBuf},
    sync::Arc,
};

use rustysynth::{SoundFont, Synthesizer, SynthesizerSettings};
use tracing::{debug, instrument};

use crate::{
    backend::RenderError,
    model::{NoteEvent, Timbre, Voice},
    oscillator::{apply_edge_fade, note_frame_span},
};

const MASTER_VOLUME: f32 = 0.5;
const MIDI_CHANNEL: i32 = 0;
const PROGRAM_CHANGE: i32 = 0xC0;

/// Output rates the synthesizer accepts.
pub const SOUNDFONT_SAMPLE_RATES: RangeInclusive<u32> = 16_000..=192_000;

/// A SoundFont loaded once per render and shared read-only between workers.
/// Every note render builds its own synthesizer, so calls never contend.
pub struct SoundFontBank {
    path: PathBuf,
    name: String,
    font: Arc<SoundFont>,
    programs: BTreeSet<u8>,
}

impl fmt::Debug for SoundFontBank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SoundFontBank")
            .field("path", &self.path)
            .field("name", &self.name)
            .field("programs", &self.programs.len())
            .finish_non_exhaustive()
    }
}

impl SoundFontBank {
    #[instrument(fields(path = %path.display()))]
    pub fn load(path: &Path) -> Result<Self, RenderError> {
        let load_error = |reason: String| RenderError::InstrumentLoad {
            path: path.to_path_buf(),
            reason,
        };

        let file = File::open(path).map_err(|error| load_error(error.to_string()))?;
        let mut reader = BufReader::new(file);
        let font = SoundFont::new(&mut reader).map_err(|error| load_error(error.to_string()))?;

        let programs: BTreeSet<u8> = font
            .get_presets()
            .iter()
            .filter(|preset| preset.get_bank_number() == 0)
            .filter_map(|preset| u8::try_from(preset.get_patch_number()).ok())
            .collect();
        if programs.is_empty() {
            return Err(load_error("bank contains no melodic presets".to_string()));
        }

        let name = font.get_info().get_bank_name().trim().to_string();
        let name = if name.is_empty() {
            path.file_name()
                .and_then(|s| s.to_str())
                .unwrap_or("SoundFont")
                .to_string()
        } else {
            name
        };

        debug!(name = %name, programs = programs.len(), "soundfont loaded");
        Ok(Self {
            path: path.to_path_buf(),
            name,
            font: Arc::new(font),
            programs,
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn has_program(&self, program: u8) -> bool {
        self.programs.contains(&program)
    }

    pub fn ensure_programs(&self, voices: &[Voice]) -> Result<(), RenderError> {
        match voices
            .iter()
            .map(program_for)
            .find(|program| !self.has_program(*program))
        {
            Some(program) => Err(RenderError::ProgramUnavailable { program }),
            None => Ok(()),
        }
    }

    pub fn ensure_sample_rate(sample_rate: u32) -> Result<(), RenderError> {
        if SOUNDFONT_SAMPLE_RATES.contains(&sample_rate) {
            Ok(())
        } else {
            Err(RenderError::UnsupportedSampleRate { sample_rate })
        }
    }

    /// Renders one note with a fresh synthesizer and folds it to mono.
    pub fn render_note(
        &self,
        note: &NoteEvent,
        voice: &Voice,
        sample_rate: u32,
    ) -> Result<Vec<f32>, RenderError> {
        let (start, end) = note_frame_span(note, sample_rate);
        let frames = end - start;
        if frames == 0 || note.velocity <= 0.0 {
            return Ok(vec![0.0; frames]);
        }

        let program = program_for(voice);
        if !self.has_program(program) {
            return Err(RenderError::ProgramUnavailable { program });
        }

        Self::ensure_sample_rate(sample_rate)?;
        let sample_rate_hz =
            i32::try_from(sample_rate).map_err(|error| RenderError::Engine(error.to_string()))?;
        let mut settings = SynthesizerSettings::new(sample_rate_hz);
        settings.enable_reverb_and_chorus = false;
        let mut synth = Synthesizer::new(&self.font, &settings)
            .map_err(|error| RenderError::Engine(error.to_string()))?;
        synth.set_master_volume(MASTER_VOLUME);
        synth.process_midi_message(MIDI_CHANNEL, PROGRAM_CHANGE, i32::from(program), 0);

        let velocity = (note.velocity.clamp(0.0, 1.0) * 127.0).round().max(1.0) as i32;
        synth.note_on(MIDI_CHANNEL, i32::from(note.pitch.min(127)), velocity);

        let mut left = vec![0.0_f32; frames];
        let mut right = vec![0.0_f32; frames];
        synth.render(&mut left, &mut right);

        let mut mono: Vec<f32> = left
            .iter()
            .zip(&right)
            .map(|(l, r)| (l + r) * 0.5)
            .collect();
        apply_edge_fade(&mut mono, sample_rate);
        Ok(mono)
    }
}

fn program_for(voice: &Voice) -> u8 {
    match voice.timbre {
        Timbre::Program(program) => program,
        Timbre::Oscillator(patch) => patch.gm_program(),
    }
}
