use std::collections::BTreeMap;

use sha2::{Digest, Sha256};
use tracing::{debug, instrument};

use crate::model::{NoteEvent, Patch, Timbre, TimbreFamily, Voice, VoiceId};

const PAN_WIDTH: f32 = 0.6;

fn author_digest(author_id: u64) -> [u8; 32] {
    let digest = Sha256::digest(author_id.to_le_bytes());
    let mut bytes = [0_u8; 32];
    bytes.copy_from_slice(&digest);
    bytes
}

/// Palette slot for an author. Stable across processes and platforms.
#[must_use]
pub fn patch_for_author(author_id: u64) -> Patch {
    let digest = author_digest(author_id);
    let mut head = [0_u8; 8];
    head.copy_from_slice(&digest[..8]);
    let slot = u64::from_le_bytes(head) % Patch::AUTHOR_PALETTE.len() as u64;
    Patch::AUTHOR_PALETTE[slot as usize]
}

#[must_use]
pub fn pan_for_author(author_id: u64) -> f32 {
    let digest = author_digest(author_id);
    let position = f32::from(u16::from_le_bytes([digest[8], digest[9]])) / f32::from(u16::MAX);
    (position * 2.0 - 1.0) * PAN_WIDTH
}

#[must_use]
pub fn voice_for_author(author_id: u64, family: TimbreFamily) -> Voice {
    let patch = patch_for_author(author_id);
    let timbre = match family {
        TimbreFamily::Oscillator => Timbre::Oscillator(patch),
        TimbreFamily::Program => Timbre::Program(patch.gm_program()),
    };

    Voice {
        id: VoiceId(author_id),
        timbre,
        pan: pan_for_author(author_id),
    }
}

/// Hands out voices for one render. The memo only saves rehashing; the
/// result is the same as calling [`voice_for_author`] directly.
#[derive(Debug, Clone)]
pub struct VoiceAssigner {
    family: TimbreFamily,
    memo: BTreeMap<VoiceId, Voice>,
}

impl VoiceAssigner {
    #[must_use]
    pub fn new(family: TimbreFamily) -> Self {
        Self {
            family,
            memo: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn family(&self) -> TimbreFamily {
        self.family
    }

    pub fn assign(&mut self, author_id: u64) -> Voice {
        let family = self.family;
        *self
            .memo
            .entry(VoiceId(author_id))
            .or_insert_with(|| voice_for_author(author_id, family))
    }

    /// One voice per distinct author, in order of first appearance.
    #[instrument(skip_all, fields(notes = notes.len(), family = ?self.family))]
    pub fn assign_all(&mut self, notes: &[NoteEvent]) -> Vec<Voice> {
        let mut voices: Vec<Voice> = Vec::new();
        for note in notes {
            if voices.iter().any(|voice| voice.id == note.voice_id) {
                continue;
            }
            voices.push(self.assign(note.voice_id.0));
        }
        debug!(voices = voices.len(), "voices assigned");
        voices
    }
}
