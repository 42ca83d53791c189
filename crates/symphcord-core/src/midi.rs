use anyhow::{Context, Result};
use midly::{
    Format, Header, MetaMessage, MidiMessage, Smf, Timing, TrackEvent, TrackEventKind,
    num::{u4, u7, u15, u24, u28},
};
use tracing::{debug, instrument};

use crate::{
    mapper::Score,
    model::{NoteEvent, Voice},
};

pub const MIDI_PPQ: u16 = 480;
pub const MIDI_BPM: f64 = 120.0;
const PERCUSSION_CHANNEL: u8 = 9;
const MELODIC_CHANNELS: usize = 15;

/// (absolute tick, rank, event). Rank orders events sharing a tick so that
/// releases come before new onsets.
type Timed = (u64, u8, TrackEventKind<'static>);

#[must_use]
pub fn seconds_to_ticks(seconds: f64) -> u64 {
    if seconds <= 0.0 {
        return 0;
    }
    (seconds * (MIDI_BPM / 60.0) * f64::from(MIDI_PPQ)).round() as u64
}

/// Channel for the n-th voice, skipping the General MIDI drum channel.
fn channel_for(voice_index: usize) -> u4 {
    let slot = (voice_index % MELODIC_CHANNELS) as u8;
    u4::from(if slot < PERCUSSION_CHANNEL { slot } else { slot + 1 })
}

fn on_channel(channel: u4, message: MidiMessage) -> TrackEventKind<'static> {
    TrackEventKind::Midi { channel, message }
}

/// Turns absolute events into a delta-timed track closed by end-of-track.
fn delta_track(mut timed: Vec<Timed>) -> Vec<TrackEvent<'static>> {
    timed.sort_by_key(|(tick, rank, _)| (*tick, *rank));

    let mut cursor = 0_u64;
    let mut track: Vec<TrackEvent<'static>> = timed
        .into_iter()
        .map(|(tick, _, kind)| {
            let delta = u32::try_from(tick.saturating_sub(cursor)).unwrap_or(u32::MAX);
            cursor = tick;
            TrackEvent {
                delta: u28::from(delta),
                kind,
            }
        })
        .collect();
    track.push(TrackEvent {
        delta: u28::from(0_u32),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });
    track
}

fn conductor_track() -> Vec<TrackEvent<'static>> {
    let tempo = (60_000_000.0 / MIDI_BPM).round() as u32;
    delta_track(vec![
        (0, 0, TrackEventKind::Meta(MetaMessage::Tempo(u24::from(tempo)))),
        (0, 1, TrackEventKind::Meta(MetaMessage::TimeSignature(4, 2, 24, 8))),
    ])
}

fn note_events(note: &NoteEvent, channel: u4) -> [Timed; 2] {
    let key = u7::from(note.pitch.min(127));
    let vel = u7::from((note.velocity.clamp(0.0, 1.0) * 127.0).round().clamp(1.0, 127.0) as u8);
    let on = seconds_to_ticks(note.start_offset.as_secs_f64());
    let off = seconds_to_ticks(note.end_offset().as_secs_f64()).max(on + 1);

    [
        (on, 1, on_channel(channel, MidiMessage::NoteOn { key, vel })),
        (
            off,
            0,
            on_channel(channel, MidiMessage::NoteOff { key, vel: u7::from(0) }),
        ),
    ]
}

/// Standard MIDI file of the score: a conductor track plus one track per
/// voice that has notes, opening with the voice's General MIDI program.
#[instrument(skip_all, fields(notes = score.notes.len(), voices = voices.len()))]
pub fn score_midi_bytes(score: &Score, voices: &[Voice]) -> Result<Vec<u8>> {
    let mut tracks = vec![conductor_track()];

    for (voice_index, voice) in voices.iter().enumerate() {
        let channel = channel_for(voice_index);
        let mut timed: Vec<Timed> = score
            .notes
            .iter()
            .filter(|note| note.voice_id == voice.id)
            .flat_map(|note| note_events(note, channel))
            .collect();
        if timed.is_empty() {
            continue;
        }

        let program = u7::from(voice.patch().gm_program().min(127));
        timed.push((0, 0, on_channel(channel, MidiMessage::ProgramChange { program })));
        tracks.push(delta_track(timed));
    }

    let smf = Smf {
        header: Header {
            format: Format::Parallel,
            timing: Timing::Metrical(u15::from(MIDI_PPQ)),
        },
        tracks,
    };
    let mut bytes = Vec::new();
    smf.write_std(&mut bytes)
        .context("failed to encode score as midi")?;
    debug!(tracks = smf.tracks.len(), bytes = bytes.len(), "midi exported");
    Ok(bytes)
}
