//! Generation of NTT-friendly primes.

use mhe_util::is_prime;

/// Generate a `num_bits`-bit prime, congruent to 1 mod `modulo`, strictly
/// smaller than `upper_bound`. Note that `num_bits` must belong to (10..=62),
/// and upper_bound must be <= 1 << num_bits.
pub fn generate_prime(num_bits: usize, modulo: u64, upper_bound: u64) -> Option<u64> {
    if !(10..=62).contains(&num_bits) {
        None
    } else {
        debug_assert!(
            (1u64 << num_bits) >= upper_bound,
            "upper_bound larger than number of bits"
        );

        let leading_zeros = (64 - num_bits) as u32;

        let mut tentative_prime = upper_bound - 1;
        while tentative_prime % modulo != 1 && tentative_prime.leading_zeros() == leading_zeros {
            tentative_prime -= 1
        }

        while tentative_prime.leading_zeros() == leading_zeros
            && !is_prime(tentative_prime)
            && tentative_prime >= modulo
        {
            tentative_prime -= modulo
        }

        if tentative_prime.leading_zeros() == leading_zeros && is_prime(tentative_prime) {
            Some(tentative_prime)
        } else {
            None
        }
    }
}

/// Generate `count` distinct primes of `num_bits` bits supporting the NTT of
/// polynomials of degree `degree`, in decreasing order, and strictly smaller
/// than `upper_bound`.
pub fn generate_ntt_primes(
    num_bits: usize,
    degree: usize,
    count: usize,
    upper_bound: u64,
) -> Option<Vec<u64>> {
    let mut primes = Vec::with_capacity(count);
    let mut upper_bound = upper_bound;
    while primes.len() < count {
        let p = generate_prime(num_bits, 2 * degree as u64, upper_bound)?;
        primes.push(p);
        upper_bound = p;
    }
    Some(primes)
}

#[cfg(test)]
mod tests {
    use super::{generate_ntt_primes, generate_prime};
    use mhe_util::catch_unwind;

    // Verifies that the same moduli as in the NFLlib library are generated.
    // <https://github.com/quarkslab/NFLlib/blob/master/include/nfl/params.hpp>
    #[test]
    fn nfl_62bit_primes() {
        let generated = generate_ntt_primes(62, 1048576, 5, u64::MAX >> 2).unwrap();
        assert_eq!(
            generated,
            vec![
                4611686018326724609,
                4611686018309947393,
                4611686018282684417,
                4611686018257518593,
                4611686018232352769,
            ]
        )
    }

    #[test]
    fn upper_bound() {
        debug_assert!(catch_unwind(|| generate_prime(62, 2 * 1048576, (1 << 62) + 1)).is_err());
    }

    #[test]
    fn modulo_too_large() {
        assert!(generate_prime(10, 2048, 1 << 10).is_none());
    }

    #[test]
    fn not_found() {
        // 1033 is the smallest 11-bit prime congruent to 1 modulo 16, so looking for a
        // smaller one should fail.
        assert!(generate_prime(11, 16, 1033).is_none());
        assert!(generate_ntt_primes(11, 8, 100, 1 << 11).is_none());
    }
}
