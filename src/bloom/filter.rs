use super::{BloomFilterConfig, BloomParams, FilterStats, MembershipFilter};
use crate::error::{HarnessError, Result};
use crate::hash::{
    HashFunction, default_hash_function, expected_false_positive_rate,
    key_bytes,
};
use bitvec::{bitvec, order::Lsb0, vec::BitVec};

/// Fixed-size bit array with `k` hash functions. Bits are only ever set, so
/// a key that was inserted is always reported present.
pub struct BloomFilter {
    params: BloomParams,
    hash_function: HashFunction,
    bits: BitVec<usize, Lsb0>,
    insert_count: usize,
}

impl BloomFilter {
    /// Hand-built filter with an explicit bit count and hash count, hashing
    /// with the salted digest.
    pub fn new(bit_count: usize, hash_count: usize) -> Result<Self> {
        let params = BloomParams::explicit(bit_count, hash_count)?;
        Ok(Self::with_hash_function(params, default_hash_function))
    }

    /// Filter sized from the config's capacity and target error rate.
    pub fn from_config(config: &BloomFilterConfig) -> Result<Self> {
        config.validate()?;

        let params = BloomParams::from(config);
        params.validate()?;
        Ok(Self::with_hash_function(params, config.hash_function))
    }

    pub fn with_hash_function(
        params: BloomParams,
        hash_function: HashFunction,
    ) -> Self {
        Self {
            params,
            hash_function,
            bits: bitvec![0; params.bit_vector_size],
            insert_count: 0,
        }
    }

    pub fn params(&self) -> &BloomParams {
        &self.params
    }

    /// Number of bits currently set.
    pub fn ones(&self) -> usize {
        self.bits.count_ones()
    }

    fn indices(&self, key: i64) -> Result<Vec<usize>> {
        let indices = (self.hash_function)(
            &key_bytes(key),
            self.params.num_hashes,
            self.params.bit_vector_size,
        );

        indices
            .into_iter()
            .map(|idx| {
                let idx = idx as usize;
                if idx >= self.params.bit_vector_size {
                    return Err(HarnessError::IndexOutOfBounds {
                        index: idx,
                        capacity: self.params.bit_vector_size,
                    });
                }
                Ok(idx)
            })
            .collect()
    }
}

impl MembershipFilter for BloomFilter {
    fn insert(&mut self, key: i64) -> Result<()> {
        for idx in self.indices(key)? {
            self.bits.set(idx, true);
        }
        self.insert_count += 1;
        Ok(())
    }

    fn might_contain(&self, key: i64) -> Result<bool> {
        Ok(self.indices(key)?.into_iter().all(|idx| self.bits[idx]))
    }
}

impl FilterStats for BloomFilter {
    fn bit_count(&self) -> usize {
        self.params.bit_vector_size
    }

    fn hash_count(&self) -> usize {
        self.params.num_hashes
    }

    fn insert_count(&self) -> usize {
        self.insert_count
    }

    fn current_false_positive_rate(&self) -> f64 {
        expected_false_positive_rate(
            self.insert_count,
            self.params.bit_vector_size,
            self.params.num_hashes,
        )
    }
}

impl std::fmt::Debug for BloomFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "BloomFilter {{ bits: {}, hashes: {}, inserted: {}, ones: {} }}",
            self.params.bit_vector_size,
            self.params.num_hashes,
            self.insert_count,
            self.ones()
        )
    }
}
