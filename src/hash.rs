use fnv::FnvHasher;
use murmur3::murmur3_32;
use sha2::{Digest, Sha256};
use std::hash::Hasher;
use std::io::Cursor;

/// A type alias for the hash function used in the Bloom filter.
///
/// This function takes an input item and computes multiple hash indices
/// for the Bloom filter's bit vector.
///
/// **Parameters:**
///
/// - `item: &[u8]`
///   - A byte slice representing the key to be hashed.
/// - `num_hashes: usize`
///   - The number of hash values to compute for the key.
/// - `capacity: usize`
///   - The size of the Bloom filter's bit vector. This ensures that
///     the generated hash indices are within valid bounds.
///
/// **Returns:**
///
/// - `Vec<u32>`
///   - A vector of hash indices corresponding to positions in the bit vector.
pub type HashFunction = fn(&[u8], usize, usize) -> Vec<u32>;

pub(crate) fn hash_murmur32(key: &[u8]) -> u32 {
    let mut cursor = Cursor::new(key);
    // Reading from an in-memory cursor cannot fail.
    murmur3_32(&mut cursor, 0).unwrap_or_default()
}

pub(crate) fn hash_fnv32(key: &[u8]) -> u32 {
    let mut hasher = FnvHasher::default();
    hasher.write(key);
    hasher.finish() as u32
}

/// Signed 32-bit hash of `salt(i) || item`, where the salt is the
/// little-endian encoding of the hash function index.
pub(crate) fn salted_digest32(item: &[u8], i: u32) -> i32 {
    let mut hasher = Sha256::new();
    hasher.update(i.to_le_bytes());
    hasher.update(item);
    let digest = hasher.finalize();
    i32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]])
}

/// Computes `num_hashes` independent indices by salting a cryptographic
/// digest with the hash index. Each index is `|h_i mod capacity|`.
pub fn salted_digest_hash(
    item: &[u8],
    num_hashes: usize,
    capacity: usize,
) -> Vec<u32> {
    let modulus = capacity as i64;
    (0..num_hashes as u32)
        .map(|i| {
            let h = i64::from(salted_digest32(item, i));
            (h % modulus).unsigned_abs() as u32
        })
        .collect()
}

/// Kirsch-Mitzenmacher double hashing over Murmur3 and FNV-1.
pub fn double_hash_function(
    item: &[u8],
    num_hashes: usize,
    capacity: usize,
) -> Vec<u32> {
    let h1 = hash_murmur32(item);
    let h2 = hash_fnv32(item);
    (0..num_hashes)
        .map(|i| h1.wrapping_add((i as u32).wrapping_mul(h2)) % capacity as u32)
        .collect()
}

pub fn default_hash_function(
    item: &[u8],
    num_hashes: usize,
    capacity: usize,
) -> Vec<u32> {
    salted_digest_hash(item, num_hashes, capacity)
}

/// Bytes fed to the hash functions for an integer key.
pub fn key_bytes(key: i64) -> [u8; 8] {
    key.to_be_bytes()
}

pub fn optimal_bit_vector_size(n: usize, fpr: f64) -> usize {
    let ln2 = std::f64::consts::LN_2;
    ((-(n as f64) * fpr.ln()) / (ln2 * ln2)).ceil() as usize
}

pub fn optimal_num_hashes(n: usize, m: usize) -> usize {
    (((m as f64 / n as f64) * std::f64::consts::LN_2).round() as usize).max(1)
}

/// Expected false positive probability after `n` insertions into a filter
/// of `m` bits with `k` hash functions.
pub fn expected_false_positive_rate(n: usize, m: usize, k: usize) -> f64 {
    if m == 0 {
        return 1.0;
    }
    let exponent = -(k as f64) * (n as f64) / (m as f64);
    (1.0 - exponent.exp()).powi(k as i32)
}
