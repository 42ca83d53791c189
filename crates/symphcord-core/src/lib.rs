pub mod backend;
pub mod config;
pub mod diagnostics;
pub mod encoder;
pub mod engine;
pub mod filter;
pub mod fixtures;
pub mod mapper;
pub mod midi;
pub mod mixer;
pub mod model;
pub mod oscillator;
pub mod persistence;
pub mod report;
pub mod soundfont;
pub mod time;
pub mod voices;

pub use backend::{BackendKind, CancelToken, RenderError, RenderedNote, SynthBackend, render_notes};
pub use config::{AppConfig, EmptyBatchPolicy};
pub use diagnostics::{TelemetryGuard, init_tracing, init_tracing_from_config};
pub use encoder::{BitDepth, EncodeError, WavEncoder, decode, encode};
pub use engine::{Composition, Engine, EngineError};
pub use mapper::{Score, map_messages, notes_from_messages};
pub use mixer::mix;
pub use model::{
    Clip, MAX_BATCH_SIZE, Message, NoteEvent, Patch, Timbre, TimbreFamily, Voice, VoiceId,
    Waveform,
};
pub use report::{RenderReport, generate_render_report};
pub use voices::VoiceAssigner;
