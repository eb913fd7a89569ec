use crate::error::{HarnessError, Result};
use crate::hash::{
    HashFunction, default_hash_function, optimal_bit_vector_size,
    optimal_num_hashes,
};
use derive_builder::Builder;

#[derive(Clone, Debug, Builder)]
#[builder(pattern = "owned")]
pub struct BloomFilterConfig {
    /// Expected number of inserted keys
    #[builder(default = "30_000")]
    pub capacity: usize,

    /// Target false positive rate (0.0 to 1.0)
    #[builder(default = "0.05")]
    pub false_positive_rate: f64,

    /// Hash function to use
    #[builder(default = "default_hash_function")]
    pub hash_function: HashFunction,
}

impl BloomFilterConfig {
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(HarnessError::InvalidConfig(
                "Capacity must be > 0".into(),
            ));
        }
        if self.false_positive_rate <= 0.0 || self.false_positive_rate >= 1.0 {
            return Err(HarnessError::InvalidConfig(
                "FPR must be between 0 and 1".into(),
            ));
        }
        Ok(())
    }
}

/// Bit vector size and hash count of a filter, either given explicitly or
/// derived from a [`BloomFilterConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BloomParams {
    pub bit_vector_size: usize,
    pub num_hashes: usize,
}

impl BloomParams {
    pub fn explicit(bit_vector_size: usize, num_hashes: usize) -> Result<Self> {
        let params = Self {
            bit_vector_size,
            num_hashes,
        };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<()> {
        if self.bit_vector_size == 0 {
            return Err(HarnessError::InvalidConfig(
                "Bit count must be > 0".into(),
            ));
        }
        // Indices are produced as u32.
        if self.bit_vector_size > u32::MAX as usize {
            return Err(HarnessError::InvalidConfig(format!(
                "Bit count must be <= {}",
                u32::MAX
            )));
        }
        if self.num_hashes == 0 {
            return Err(HarnessError::InvalidConfig(
                "Hash count must be > 0".into(),
            ));
        }
        Ok(())
    }
}

impl From<&BloomFilterConfig> for BloomParams {
    fn from(config: &BloomFilterConfig) -> Self {
        let bit_vector_size =
            optimal_bit_vector_size(config.capacity, config.false_positive_rate);
        let num_hashes = optimal_num_hashes(config.capacity, bit_vector_size);

        Self {
            bit_vector_size,
            num_hashes,
        }
    }
}
