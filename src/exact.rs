use std::collections::BTreeSet;

/// Ground-truth set of payload values seen during a trial. Entries are never
/// removed.
#[derive(Debug, Default, Clone)]
pub struct ExactSet {
    values: BTreeSet<i64>,
}

impl ExactSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: i64) -> bool {
        self.values.contains(&key)
    }

    /// Returns `true` if the key was not present before.
    pub fn add(&mut self, key: i64) -> bool {
        self.values.insert(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn min(&self) -> Option<i64> {
        self.values.first().copied()
    }

    pub fn max(&self) -> Option<i64> {
        self.values.last().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_is_idempotent() {
        let mut set = ExactSet::new();
        assert!(set.add(7));
        assert!(!set.add(7));
        assert_eq!(set.len(), 1);
        assert!(set.contains(7));
        assert!(!set.contains(8));
    }

    #[test]
    fn test_min_max() {
        let mut set = ExactSet::new();
        assert_eq!(set.min(), None);
        assert_eq!(set.max(), None);

        for value in [30_001, 5, 12, 60_000] {
            set.add(value);
        }
        assert_eq!(set.min(), Some(5));
        assert_eq!(set.max(), Some(60_000));
    }
}
