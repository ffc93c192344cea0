#![crate_name = "mhe_util"]
#![crate_type = "lib"]
#![warn(missing_docs, unused_imports)]

//! Utilities for the mhe.rs library.

#[cfg(test)]
#[macro_use]
extern crate proptest;

mod prng;

pub use prng::KeccakPrng;

use num_bigint_dig::{prime::probably_prime, BigUint, ModInverse};
use num_traits::{PrimInt, ToPrimitive};
use rand::{CryptoRng, RngCore};
use rand_distr::{Distribution, Normal};
use std::panic::UnwindSafe;

/// Define catch_unwind to silence the panic in unit tests.
pub fn catch_unwind<F, R>(f: F) -> std::thread::Result<R>
where
    F: FnOnce() -> R + UnwindSafe,
{
    let prev_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(|_| {}));
    let r = std::panic::catch_unwind(f);
    std::panic::set_hook(prev_hook);
    r
}

/// Returns whether the modulus p is prime; this function is 100% accurate.
pub fn is_prime(p: u64) -> bool {
    probably_prime(&BigUint::from(p), 0)
}

/// Sample a vector of independent centered binomial distributions of a given
/// variance. Returns an error if the variance is strictly larger than 16.
pub fn sample_vec_cbd<R: RngCore + CryptoRng>(
    vector_size: usize,
    variance: usize,
    rng: &mut R,
) -> Result<Vec<i64>, &'static str> {
    if !(1..=16).contains(&variance) {
        return Err("The variance should be between 1 and 16");
    }

    let mut out = Vec::with_capacity(vector_size);

    let number_bits = 4 * variance;
    let mask_add = ((u64::MAX >> (64 - number_bits)) >> (2 * variance)) as u128;
    let mask_sub = mask_add << (2 * variance);

    let mut current_pool = 0u128;
    let mut current_pool_nbits = 0;

    for _ in 0..vector_size {
        if current_pool_nbits < number_bits {
            current_pool |= (rng.next_u64() as u128) << current_pool_nbits;
            current_pool_nbits += 64;
        }
        debug_assert!(current_pool_nbits >= number_bits);
        out.push(
            ((current_pool & mask_add).count_ones() as i64)
                - ((current_pool & mask_sub).count_ones() as i64),
        );
        current_pool >>= number_bits;
        current_pool_nbits -= number_bits;
    }

    Ok(out)
}

/// Sample a vector of ternary values in {-1, 0, 1}, where 0 has probability
/// 1/2 and each of -1 and 1 has probability 1/4.
///
/// The randomness is read as two byte strings of `ceil(vector_size / 8)`
/// bytes: the first one holds one "non-zero" bit per coefficient, the second
/// one holds one sign bit per coefficient. Reading from a [`KeccakPrng`]
/// therefore yields a sequence that can be recomputed by any verifier knowing
/// the seed and the salt.
pub fn sample_vec_ternary<R: RngCore>(vector_size: usize, rng: &mut R) -> Vec<i64> {
    let nbytes = div_ceil(vector_size, 8);
    let mut coeff_bits = vec![0u8; nbytes];
    let mut sign_bits = vec![0u8; nbytes];
    rng.fill_bytes(&mut coeff_bits);
    rng.fill_bytes(&mut sign_bits);

    (0..vector_size)
        .map(|i| {
            let coeff = ((coeff_bits[i >> 3] >> (i & 7)) & 1) as i64;
            let sign = ((sign_bits[i >> 3] >> (i & 7)) & 1) as i64;
            coeff * (1 - 2 * sign)
        })
        .collect()
}

/// Sample a vector of rounded Gaussian values of standard deviation `sigma`,
/// rejecting the samples whose absolute value is larger than `bound`.
///
/// Returns an error if `sigma` is not a strictly positive finite number.
pub fn sample_vec_normal<R: RngCore + CryptoRng>(
    vector_size: usize,
    sigma: f64,
    bound: u64,
    rng: &mut R,
) -> Result<Vec<i64>, &'static str> {
    if !sigma.is_finite() || sigma <= 0.0 {
        return Err("The standard deviation should be a strictly positive number");
    }
    let normal = Normal::new(0.0, sigma).map_err(|_| "Invalid normal distribution")?;

    let mut out = Vec::with_capacity(vector_size);
    while out.len() < vector_size {
        let x = normal.sample(rng).round();
        if x.abs() <= bound as f64 {
            out.push(x as i64);
        }
    }
    Ok(out)
}

/// Transcodes a vector of u64 of `nbits`-bit numbers into a vector of bytes.
pub fn transcode_to_bytes(a: &[u64], nbits: usize) -> Vec<u8> {
    assert!(0 < nbits && nbits <= 64);

    let mask = (u64::MAX >> (64 - nbits)) as u128;
    let nbytes = div_ceil(a.len() * nbits, 8);
    let mut out = Vec::with_capacity(nbytes);

    let mut current_index = 0;
    let mut current_value = 0u128;
    let mut current_value_nbits = 0;
    while current_index < a.len() {
        if current_value_nbits < 8 {
            debug_assert!(64 - a[current_index].leading_zeros() <= nbits as u32);
            current_value |= ((a[current_index] as u128) & mask) << current_value_nbits;
            current_value_nbits += nbits;
            current_index += 1;
        }
        while current_value_nbits >= 8 {
            out.push(current_value as u8);
            current_value >>= 8;
            current_value_nbits -= 8;
        }
    }
    if current_value_nbits > 0 {
        assert!(current_value_nbits < 8);
        out.push(current_value as u8)
    }
    assert_eq!(out.len(), nbytes);
    out
}

/// Transcodes a vector of u8 into a vector of u64 of `nbits`-bit numbers.
pub fn transcode_from_bytes(b: &[u8], nbits: usize) -> Vec<u64> {
    assert!(0 < nbits && nbits <= 64);
    let mask = (u64::MAX >> (64 - nbits)) as u128;

    let nelements = div_ceil(b.len() * 8, nbits);
    let mut out = Vec::with_capacity(nelements);

    let mut current_value = 0u128;
    let mut current_value_nbits = 0;
    let mut current_index = 0;
    while current_index < b.len() {
        if current_value_nbits < nbits {
            current_value |= (b[current_index] as u128) << current_value_nbits;
            current_value_nbits += 8;
            current_index += 1;
        }
        while current_value_nbits >= nbits {
            out.push((current_value & mask) as u64);
            current_value >>= nbits;
            current_value_nbits -= nbits;
        }
    }
    if current_value_nbits > 0 {
        out.push(current_value as u64);
    }
    assert_eq!(out.len(), nelements);
    out
}

/// Computes the modular multiplicative inverse of `a` modulo `p`. Returns
/// `None` if `a` is not invertible modulo `p`.
pub fn inverse(a: u64, p: u64) -> Option<u64> {
    let p = BigUint::from(p);
    let a = BigUint::from(a);
    a.mod_inverse(p)?.to_u64()
}

/// Returns the ceil of a divided by b.
/// Panics when `b` is 0.
pub fn div_ceil<T: PrimInt>(a: T, b: T) -> T {
    assert!(b > T::zero());
    (a + b - T::one()) / b
}

/// Compute the sample variance of a list of values.
/// Panics if the length of value is < 2.
pub fn variance<T: PrimInt>(values: &[T]) -> f64 {
    assert!(values.len() > 1);
    let values = values
        .iter()
        .map(|v| v.to_f64().unwrap_or_default())
        .collect::<Vec<_>>();
    let mean = values.iter().sum::<f64>() / (values.len() as f64);
    values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / ((values.len() as f64) - 1.0)
}
