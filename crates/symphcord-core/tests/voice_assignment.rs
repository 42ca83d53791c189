use std::{collections::BTreeMap, time::Duration};

use symphcord_core::{
    model::{NoteEvent, Patch, Timbre, TimbreFamily, VoiceId},
    voices::{VoiceAssigner, pan_for_author, patch_for_author, voice_for_author},
};

fn note(author_id: u64, start_ms: u64) -> NoteEvent {
    NoteEvent {
        voice_id: VoiceId(author_id),
        pitch: 66,
        start_offset: Duration::from_millis(start_ms),
        duration: Duration::from_millis(400),
        velocity: 0.7,
    }
}

#[test]
fn one_voice_per_author_in_first_appearance_order() {
    let notes = vec![note(7, 0), note(3, 500), note(7, 1_000), note(11, 1_500)];
    let voices = VoiceAssigner::new(TimbreFamily::Oscillator).assign_all(&notes);

    let ids: Vec<VoiceId> = voices.iter().map(|voice| voice.id).collect();
    assert_eq!(ids, vec![VoiceId(7), VoiceId(3), VoiceId(11)]);
}

#[test]
fn assignment_is_stable_across_assigners_and_calls() {
    let mut first = VoiceAssigner::new(TimbreFamily::Oscillator);
    let mut second = VoiceAssigner::new(TimbreFamily::Oscillator);

    for author_id in [0_u64, 1, 42, 418_240_771_203_350_529, u64::MAX] {
        let a = first.assign(author_id);
        let b = second.assign(author_id);
        assert_eq!(a, b);
        assert_eq!(first.assign(author_id), a);
        assert_eq!(voice_for_author(author_id, TimbreFamily::Oscillator), a);
    }
}

#[test]
fn program_family_uses_the_general_midi_program_of_the_same_patch() {
    for author_id in 0_u64..50 {
        let oscillator = voice_for_author(author_id, TimbreFamily::Oscillator);
        let program = voice_for_author(author_id, TimbreFamily::Program);

        assert_eq!(oscillator.pan, program.pan);
        assert_eq!(oscillator.patch(), program.patch());
        match program.timbre {
            Timbre::Program(number) => assert_eq!(number, patch_for_author(author_id).gm_program()),
            Timbre::Oscillator(_) => panic!("program family should assign a program timbre"),
        }
    }
}

#[test]
fn authors_spread_over_the_whole_palette() {
    let mut counts: BTreeMap<Patch, usize> = BTreeMap::new();
    for author_id in 0_u64..600 {
        *counts.entry(patch_for_author(author_id)).or_default() += 1;
    }

    for patch in Patch::AUTHOR_PALETTE {
        let count = counts.get(&patch).copied().unwrap_or_default();
        assert!(count >= 50, "{patch:?} assigned only {count} times");
    }
    assert!(!counts.contains_key(&Patch::Pulse));
    assert!(!counts.contains_key(&Patch::Choir));
}

#[test]
fn pan_stays_inside_the_stereo_field() {
    let mut saw_left = false;
    let mut saw_right = false;
    for author_id in 0_u64..200 {
        let pan = pan_for_author(author_id);
        assert!((-0.6..=0.6).contains(&pan), "pan {pan} out of range");
        saw_left |= pan < -0.1;
        saw_right |= pan > 0.1;
    }
    assert!(saw_left && saw_right);
}
