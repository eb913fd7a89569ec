use eos_bloom_rs::{
    BloomFilter, BloomFilterConfigBuilder, FilterStats, MembershipFilter,
    double_hash_function,
};
use rand::Rng;
use std::collections::HashSet;

// Helper function to create a filter sized from capacity and error rate
fn create_sized_filter(capacity: usize, fpr: f64) -> BloomFilter {
    let config = BloomFilterConfigBuilder::default()
        .capacity(capacity)
        .false_positive_rate(fpr)
        .build()
        .expect("Failed to build test config");

    BloomFilter::from_config(&config).expect("Failed to create test filter")
}

#[cfg(test)]
mod membership_tests {
    use super::*;

    #[test]
    fn test_empty_filter_contains_nothing() {
        let filter = create_sized_filter(1_000, 0.01);
        for key in [-1_i64, 0, 1, 23_068_672, i64::MAX] {
            assert!(
                !filter.might_contain(key).unwrap(),
                "Empty filter reported key {key}"
            );
        }
    }

    #[test]
    fn test_no_missed_positives() {
        let mut filter = create_sized_filter(10_000, 0.01);
        let mut rng = rand::rng();
        let keys: Vec<i64> = (0..10_000).map(|_| rng.random()).collect();

        for &key in &keys {
            filter.insert(key).unwrap();
        }
        for &key in &keys {
            assert!(
                filter.might_contain(key).unwrap(),
                "Inserted key {key} not found"
            );
        }
        assert_eq!(filter.insert_count(), keys.len());
    }

    #[test]
    fn test_no_missed_positives_when_saturated() {
        // Far beyond capacity: error rate explodes but inserted keys stay.
        let mut filter = BloomFilter::new(1_024, 3).unwrap();
        for key in 0..5_000 {
            filter.insert(key).unwrap();
        }
        assert!((0..5_000).all(|key| filter.might_contain(key).unwrap()));
    }

    #[test]
    fn test_reinsert_is_harmless() {
        let mut filter = BloomFilter::new(4_096, 4).unwrap();
        filter.insert(99).unwrap();
        let ones = filter.ones();
        filter.insert(99).unwrap();
        assert_eq!(filter.ones(), ones);
        assert!(filter.might_contain(99).unwrap());
    }
}

#[cfg(test)]
mod false_positive_rate_tests {
    use super::*;

    #[test]
    fn test_false_positive_rate_near_target() {
        const FALSE_POSITIVE_RATE: f64 = 0.01;
        let mut filter = create_sized_filter(10_000, FALSE_POSITIVE_RATE);
        let mut rng = rand::rng();

        let inserted: HashSet<i64> = (0..10_000).map(|_| rng.random()).collect();
        for &key in &inserted {
            filter.insert(key).unwrap();
        }

        let num_tests = 20_000;
        let mut false_positives = 0;
        let mut tested = 0;
        while tested < num_tests {
            let key: i64 = rng.random();
            if inserted.contains(&key) {
                continue;
            }
            tested += 1;
            if filter.might_contain(key).unwrap() {
                false_positives += 1;
            }
        }

        let observed_fpr = false_positives as f64 / num_tests as f64;
        assert!(
            observed_fpr <= FALSE_POSITIVE_RATE * 1.5,
            "False positive rate is too high: observed {observed_fpr}, expected {FALSE_POSITIVE_RATE}"
        );
    }

    #[test]
    fn test_expected_rate_tracks_fill() {
        let mut filter = create_sized_filter(1_000, 0.05);
        assert_eq!(filter.current_false_positive_rate(), 0.0);
        for key in 0..1_000 {
            filter.insert(key).unwrap();
        }
        let rate = filter.current_false_positive_rate();
        assert!((0.04..0.06).contains(&rate), "rate = {rate}");
    }

    #[test]
    fn test_undersized_filter_yields_more_false_positives() {
        let mut filter = create_sized_filter(100, 0.1);
        for key in 0..1_000 {
            filter.insert(key * 7).unwrap();
        }
        let false_positives = (0..1_000)
            .filter(|key| filter.might_contain(key * 7 + 3).unwrap())
            .count();
        let observed_fpr = false_positives as f64 / 1_000.0;
        assert!(
            observed_fpr >= 0.1,
            "Saturated filter should exceed its target: observed {observed_fpr}"
        );
    }
}

#[cfg(test)]
mod interchangeability_tests {
    use super::*;

    #[test]
    fn test_hand_built_matches_sized() {
        let mut sized = create_sized_filter(5_000, 0.02);
        let mut hand_built =
            BloomFilter::new(sized.bit_count(), sized.hash_count()).unwrap();

        for key in (0..5_000).map(|i| 0x0160_0000 + i * 56) {
            sized.insert(key).unwrap();
            hand_built.insert(key).unwrap();
        }
        for key in 0..20_000 {
            assert_eq!(
                sized.might_contain(key).unwrap(),
                hand_built.might_contain(key).unwrap()
            );
        }
    }

    #[test]
    fn test_double_hashing_filter_keeps_guarantees() {
        let config = BloomFilterConfigBuilder::default()
            .capacity(5_000)
            .false_positive_rate(0.01)
            .hash_function(double_hash_function)
            .build()
            .unwrap();
        let mut filter = BloomFilter::from_config(&config).unwrap();

        for key in 0..5_000 {
            filter.insert(key).unwrap();
        }
        assert!((0..5_000).all(|key| filter.might_contain(key).unwrap()));
        assert_eq!(filter.hash_count(), 7);
    }
}
