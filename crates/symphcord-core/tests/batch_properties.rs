use std::time::Duration;

use chrono::Duration as ChronoDuration;
use proptest::prelude::*;
use symphcord_core::{
    config::CompositionConfig,
    fixtures::fixture_epoch,
    mapper::{SCALE_LEN, map_messages, scale_pitch},
    model::Message,
};

fn batch_strategy() -> impl Strategy<Value = Vec<Message>> {
    prop::collection::vec((0_u64..12, 0_u32..4_000, 0_u32..40, 0_i64..900), 0..=100).prop_map(
        |raw| {
            let mut elapsed = 0_i64;
            raw.into_iter()
                .map(|(author_id, text_length, accent, gap)| {
                    elapsed += gap;
                    Message {
                        author_id,
                        text_length,
                        accent,
                        timestamp: fixture_epoch() + ChronoDuration::seconds(elapsed),
                    }
                })
                .collect()
        },
    )
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        .. ProptestConfig::default()
    })]

    #[test]
    fn clip_length_stays_within_bounds(batch in batch_strategy()) {
        let score = map_messages(&batch, &CompositionConfig::default());
        prop_assert!(score.total_duration >= Duration::from_secs(15));
        prop_assert!(score.total_duration <= Duration::from_secs(30));
    }

    #[test]
    fn notes_fit_inside_the_clip(batch in batch_strategy()) {
        let score = map_messages(&batch, &CompositionConfig::default());
        prop_assert_eq!(score.notes.len(), batch.len());
        for note in &score.notes {
            prop_assert!(note.end_offset() <= score.total_duration);
            prop_assert!(!note.duration.is_zero());
            prop_assert!((0.0..=1.0).contains(&note.velocity));
            prop_assert!(note.pitch >= scale_pitch(0));
            prop_assert!(note.pitch <= scale_pitch(SCALE_LEN - 1));
        }
    }

    #[test]
    fn notes_are_ordered_by_start(batch in batch_strategy()) {
        let score = map_messages(&batch, &CompositionConfig::default());
        for pair in score.notes.windows(2) {
            prop_assert!(pair[0].start_offset <= pair[1].start_offset);
        }
    }
}
