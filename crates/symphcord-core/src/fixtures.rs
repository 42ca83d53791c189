use chrono::{DateTime, Duration, Utc};

use crate::model::Message;

const DEMO_LINES: [(u64, i64, &str); 12] = [
    (
        418_240_771_203_350_529,
        0,
        "morning all, anyone up for the listening party later?",
    ),
    (902_117_348_556_880_641, 4, "yes!!"),
    (
        418_240_771_203_350_529,
        9,
        "cool, I'll queue up the ambient stuff first",
    ),
    (
        660_981_204_117_903_361,
        15,
        "bring the synthwave playlist, the one from last week",
    ),
    (902_117_348_556_880_641, 16, "LOL ok"),
    (
        660_981_204_117_903_361,
        31,
        "also, does anybody know if the stream key changed? OBS keeps refusing it",
    ),
    (418_240_771_203_350_529, 38, "try regenerating it from the dashboard"),
    (660_981_204_117_903_361, 52, "that worked, thanks"),
    (
        273_554_019_006_771_201,
        70,
        "late to this but count me in. what time does it start and should I bring snacks \
         or is that covered",
    ),
    (902_117_348_556_880_641, 74, "8pm"),
    (273_554_019_006_771_201, 80, "perfect"),
    (418_240_771_203_350_529, 95, "see you there :)"),
];

#[must_use]
pub fn fixture_epoch() -> DateTime<Utc> {
    // 2026-02-23T20:00:00Z
    DateTime::<Utc>::UNIX_EPOCH + Duration::seconds(1_771_876_800)
}

/// A short channel conversation between four authors with fixed timestamps.
#[must_use]
pub fn demo_batch() -> Vec<Message> {
    let epoch = fixture_epoch();
    DEMO_LINES
        .iter()
        .map(|(author_id, offset_seconds, text)| {
            Message::from_text(*author_id, text, epoch + Duration::seconds(*offset_seconds))
        })
        .collect()
}

/// `count` messages from `authors` rotating authors, `spacing_seconds` apart.
#[must_use]
pub fn synthetic_batch(count: usize, authors: u64, spacing_seconds: i64) -> Vec<Message> {
    let epoch = fixture_epoch();
    let authors = authors.max(1);
    (0..count)
        .map(|index| {
            let index_i64 = i64::try_from(index).unwrap_or(i64::MAX);
            Message {
                author_id: 1_000 + (index as u64 % authors),
                text_length: ((index * 37) % 180) as u32,
                accent: (index % 5) as u32,
                timestamp: epoch + Duration::seconds(index_i64.saturating_mul(spacing_seconds)),
            }
        })
        .collect()
}
