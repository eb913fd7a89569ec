use crate::error::Result;

/// Insert/query surface shared by every filter the classifier can run with.
pub trait MembershipFilter {
    fn insert(&mut self, key: i64) -> Result<()>;
    /// `false` means `key` was never inserted; `true` means it may have been.
    fn might_contain(&self, key: i64) -> Result<bool>;
}

pub trait FilterStats {
    fn bit_count(&self) -> usize;
    fn hash_count(&self) -> usize;
    fn insert_count(&self) -> usize;
    /// Probability that a fresh key is reported present, given the current
    /// number of insertions.
    fn current_false_positive_rate(&self) -> f64;
}
