use eos_bloom_rs::{
    BloomFilter, BloomFilterConfigBuilder, Classifier, Event, Outcome,
};

const BASE_POSITION: i64 = 0x0160_0000;
const STRIDE: i64 = 56;

fn position_of(value: i64) -> i64 {
    BASE_POSITION + (value - 1) * STRIDE
}

fn sized_classifier(capacity: usize, fpr: f64) -> Classifier<BloomFilter> {
    let config = BloomFilterConfigBuilder::default()
        .capacity(capacity)
        .false_positive_rate(fpr)
        .build()
        .expect("Failed to build test config");
    Classifier::new(BloomFilter::from_config(&config).unwrap())
}

#[cfg(test)]
mod classification_tests {
    use super::*;

    #[test]
    fn test_sequential_positions_yield_bounded_false_positives() {
        const ROWS: i64 = 30_000;
        const FALSE_POSITIVE_RATE: f64 = 0.05;
        let mut classifier = sized_classifier(ROWS as usize, FALSE_POSITIVE_RATE);

        for value in 1..=ROWS {
            let outcome = classifier
                .classify(&Event::insert(value, position_of(value)))
                .unwrap();
            assert_ne!(outcome, Outcome::FalseNegative);
            assert_ne!(outcome, Outcome::Duplicate);
        }

        let counts = classifier.counters().cycle();
        assert!(counts.false_positives > 0, "No false positives: {counts}");
        assert!(
            counts.false_positives as f64 <= FALSE_POSITIVE_RATE * ROWS as f64,
            "Too many false positives: {counts}"
        );
        assert_eq!(counts.total(), ROWS as u64);
        assert_eq!(counts.duplicates, 0);
    }

    #[test]
    fn test_replayed_range_is_all_duplicates() {
        let mut classifier = sized_classifier(1_000, 0.01);
        for value in 1..=500 {
            classifier
                .classify(&Event::insert(value, position_of(value)))
                .unwrap();
        }
        let before = classifier.counters().cycle();

        // Restart from offset zero: every event is a redelivery.
        for value in 1..=500 {
            let outcome = classifier
                .classify(&Event::insert(value, position_of(value)))
                .unwrap();
            assert_eq!(outcome, Outcome::Duplicate);
        }

        let after = classifier.counters().cycle();
        assert_eq!(after.duplicates - before.duplicates, 500);
        assert_eq!(after.false_negatives, 0);
        assert_eq!(classifier.exact().len(), 500);
    }

    #[test]
    fn test_classification_is_idempotent() {
        let mut classifier = sized_classifier(100, 0.01);
        let event = Event::insert(42, position_of(42));

        let first = classifier.classify(&event).unwrap();
        assert!(matches!(first, Outcome::Unique | Outcome::FalsePositive));
        for _ in 0..10 {
            assert_eq!(classifier.classify(&event).unwrap(), Outcome::Duplicate);
        }
        assert_eq!(classifier.exact().len(), 1);
    }

    #[test]
    fn test_exact_set_tracks_range() {
        let mut classifier = sized_classifier(1_000, 0.05);
        for value in (100..=200).rev() {
            classifier
                .classify(&Event::insert(value, position_of(value)))
                .unwrap();
        }
        assert_eq!(classifier.exact().min(), Some(100));
        assert_eq!(classifier.exact().max(), Some(200));
        assert_eq!(classifier.exact().len(), 101);
    }
}
