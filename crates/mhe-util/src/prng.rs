//! Keccak-based pseudo-random generator.

use rand::{CryptoRng, RngCore};
use sha3::{Digest, Keccak256};

/// A deterministic pseudo-random generator built on Keccak-256, used as a
/// common random source from which every party derives the same values.
///
/// Every read starts from `iv = keccak256(seed || salt)`, where the salt is
/// encoded as a 32-byte big-endian integer, and outputs the blocks
/// `iv_{i+1} = keccak256(iv_i)` for `i >= 0`. After the read, the first bytes
/// of the seed are overwritten with the last block so that the next read
/// produces fresh bytes.
#[derive(Debug, Clone)]
pub struct KeccakPrng {
    seed: Vec<u8>,
    salt: [u8; 32],
}

impl KeccakPrng {
    /// Creates a new generator from a seed and a salt.
    pub fn new(seed: &[u8], salt: u32) -> Self {
        let mut salt_bytes = [0u8; 32];
        salt_bytes[28..].copy_from_slice(&salt.to_be_bytes());
        Self {
            seed: seed.to_vec(),
            salt: salt_bytes,
        }
    }

    /// Returns the current seed.
    pub fn seed(&self) -> &[u8] {
        &self.seed
    }
}

impl RngCore for KeccakPrng {
    fn next_u32(&mut self) -> u32 {
        let mut bytes = [0u8; 4];
        self.fill_bytes(&mut bytes);
        u32::from_le_bytes(bytes)
    }

    fn next_u64(&mut self) -> u64 {
        let mut bytes = [0u8; 8];
        self.fill_bytes(&mut bytes);
        u64::from_le_bytes(bytes)
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        let mut hasher = Keccak256::new();
        hasher.update(&self.seed);
        hasher.update(self.salt);
        let mut iv: [u8; 32] = hasher.finalize().into();

        for chunk in dest.chunks_mut(32) {
            iv = Keccak256::digest(iv).into();
            chunk.copy_from_slice(&iv[..chunk.len()]);
        }

        let n = self.seed.len().min(32);
        self.seed[..n].copy_from_slice(&iv[..n]);
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

impl CryptoRng for KeccakPrng {}
