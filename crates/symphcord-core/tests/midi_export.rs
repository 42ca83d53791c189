use midly::{MidiMessage, Smf, TrackEventKind};
use symphcord_core::{
    config::CompositionConfig,
    fixtures::demo_batch,
    mapper::map_messages,
    midi::{score_midi_bytes, seconds_to_ticks},
    model::TimbreFamily,
    voices::VoiceAssigner,
};

#[test]
fn score_exports_one_track_per_voice_with_matching_notes() {
    let score = map_messages(&demo_batch(), &CompositionConfig::default());
    let voices = VoiceAssigner::new(TimbreFamily::Oscillator).assign_all(&score.notes);

    let bytes = score_midi_bytes(&score, &voices).expect("midi export should succeed");
    let smf = Smf::parse(&bytes).expect("exported midi should parse");
    assert_eq!(smf.tracks.len(), voices.len() + 1);

    let mut note_ons = 0_usize;
    let mut note_offs = 0_usize;
    for (track, voice) in smf.tracks.iter().skip(1).zip(&voices) {
        let mut programs = track.iter().filter_map(|event| match event.kind {
            TrackEventKind::Midi {
                message: MidiMessage::ProgramChange { program },
                ..
            } => Some(program.as_int()),
            _ => None,
        });
        assert_eq!(programs.next(), Some(voice.patch().gm_program()));

        for event in track {
            match event.kind {
                TrackEventKind::Midi {
                    channel,
                    message: MidiMessage::NoteOn { vel, .. },
                } => {
                    assert_ne!(channel.as_int(), 9, "drum channel must stay unused");
                    assert!(vel.as_int() > 0);
                    note_ons += 1;
                }
                TrackEventKind::Midi {
                    message: MidiMessage::NoteOff { .. },
                    ..
                } => note_offs += 1,
                _ => {}
            }
        }
    }

    assert_eq!(note_ons, score.notes.len());
    assert_eq!(note_offs, score.notes.len());
}

#[test]
fn tick_conversion_uses_fixed_tempo() {
    assert_eq!(seconds_to_ticks(0.0), 0);
    assert_eq!(seconds_to_ticks(-1.0), 0);
    assert_eq!(seconds_to_ticks(0.5), 480);
    assert_eq!(seconds_to_ticks(15.0), 14_400);
}
