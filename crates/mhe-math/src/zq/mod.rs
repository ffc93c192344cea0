//! Ring operations for moduli up to 62 bits.

pub mod primes;

use std::ops::Deref;

use crate::errors::{Error, Result};
use itertools::{izip, Itertools};
use mhe_util::{is_prime, transcode_from_bytes, transcode_to_bytes};
use num_bigint::BigUint;
use num_traits::ToPrimitive;
use rand::{distributions::Uniform, CryptoRng, Rng, RngCore};

/// cond ? on_true : on_false
const fn const_time_cond_select(on_true: u64, on_false: u64, cond: bool) -> u64 {
    let mask = -(cond as i64) as u64;
    let diff = on_true ^ on_false;
    (diff & mask) ^ on_false
}

/// Structure encapsulating an integer modulus up to 62 bits.
#[derive(Debug, Clone)]
pub struct Modulus {
    pub(crate) p: u64,
    barrett_hi: u64,
    barrett_lo: u64,
    distribution: Uniform<u64>,
}

// `Uniform` does not implement `Eq`; every other field is derived from p.
impl Eq for Modulus {}

impl PartialEq for Modulus {
    fn eq(&self, other: &Self) -> bool {
        self.p == other.p
    }
}

impl Deref for Modulus {
    type Target = u64;

    fn deref(&self) -> &Self::Target {
        &self.p
    }
}

impl Modulus {
    /// Create a modulus from an integer of at most 62 bits.
    pub fn new(p: u64) -> Result<Self> {
        if p < 2 || (p >> 62) != 0 {
            Err(Error::InvalidModulus(p))
        } else {
            let barrett = ((BigUint::from(1u64) << 128usize) / p)
                .to_u128()
                .ok_or(Error::InvalidModulus(p))?; // 2^128 / p
            Ok(Self {
                p,
                barrett_hi: (barrett >> 64) as u64,
                barrett_lo: barrett as u64,
                distribution: Uniform::new(0, p),
            })
        }
    }

    /// Returns the value of the modulus.
    pub const fn modulus(&self) -> u64 {
        self.p
    }

    /// Performs the modular addition of a and b in constant time.
    /// Aborts if a >= p or b >= p in debug mode.
    pub const fn add(&self, a: u64, b: u64) -> u64 {
        debug_assert!(a < self.p && b < self.p);
        Self::reduce1(a + b, self.p)
    }

    /// Performs the modular subtraction of a and b in constant time.
    /// Aborts if a >= p or b >= p in debug mode.
    pub const fn sub(&self, a: u64, b: u64) -> u64 {
        debug_assert!(a < self.p && b < self.p);
        Self::reduce1(a + self.p - b, self.p)
    }

    /// Performs the modular multiplication of a and b in constant time.
    /// Aborts if a >= p or b >= p in debug mode.
    pub const fn mul(&self, a: u64, b: u64) -> u64 {
        debug_assert!(a < self.p && b < self.p);
        self.reduce_u128((a as u128) * (b as u128))
    }

    /// Modular negation in constant time.
    ///
    /// Aborts if a >= p in debug mode.
    pub const fn neg(&self, a: u64) -> u64 {
        debug_assert!(a < self.p);
        Self::reduce1(self.p - a, self.p)
    }

    /// Compute the Shoup representation of a.
    ///
    /// Aborts if a >= p in debug mode.
    pub const fn shoup(&self, a: u64) -> u64 {
        debug_assert!(a < self.p);
        (((a as u128) << 64) / (self.p as u128)) as u64
    }

    /// Shoup multiplication of a and b in constant time.
    ///
    /// Aborts if b >= p or b_shoup != shoup(b) in debug mode.
    pub const fn mul_shoup(&self, a: u64, b: u64, b_shoup: u64) -> u64 {
        Self::reduce1(self.lazy_mul_shoup(a, b, b_shoup), self.p)
    }

    /// Lazy Shoup multiplication of a and b in constant time.
    /// The output is in the interval [0, 2 * p).
    ///
    /// Aborts if b >= p or b_shoup != shoup(b) in debug mode.
    pub const fn lazy_mul_shoup(&self, a: u64, b: u64, b_shoup: u64) -> u64 {
        debug_assert!(b < self.p);
        debug_assert!(b_shoup == self.shoup(b));

        let q = ((a as u128) * (b_shoup as u128)) >> 64;
        let r = ((a as u128) * (b as u128) - q * (self.p as u128)) as u64;

        debug_assert!(r < 2 * self.p);

        r
    }

    /// Modular addition of vectors in place in constant time.
    ///
    /// Aborts if a and b differ in size, and if any of their values is >= p in
    /// debug mode.
    pub fn add_vec(&self, a: &mut [u64], b: &[u64]) {
        debug_assert_eq!(a.len(), b.len());
        izip!(a.iter_mut(), b.iter()).for_each(|(ai, bi)| *ai = self.add(*ai, *bi))
    }

    /// Modular subtraction of vectors in place in constant time.
    ///
    /// Aborts if a and b differ in size, and if any of their values is >= p in
    /// debug mode.
    pub fn sub_vec(&self, a: &mut [u64], b: &[u64]) {
        debug_assert_eq!(a.len(), b.len());
        izip!(a.iter_mut(), b.iter()).for_each(|(ai, bi)| *ai = self.sub(*ai, *bi))
    }

    /// Modular multiplication of vectors in place in constant time.
    ///
    /// Aborts if a and b differ in size, and if any of their values is >= p in
    /// debug mode.
    pub fn mul_vec(&self, a: &mut [u64], b: &[u64]) {
        debug_assert_eq!(a.len(), b.len());
        izip!(a.iter_mut(), b.iter()).for_each(|(ai, bi)| *ai = self.mul(*ai, *bi))
    }

    /// Modular scalar multiplication of vectors in place in constant time.
    ///
    /// Aborts if any of the values in a is >= p in debug mode.
    pub fn scalar_mul_vec(&self, a: &mut [u64], b: u64) {
        let b_shoup = self.shoup(b);
        a.iter_mut()
            .for_each(|ai| *ai = self.mul_shoup(*ai, b, b_shoup))
    }

    /// Compute the Shoup representation of a vector.
    ///
    /// Aborts if any of the values of the vector is >= p in debug mode.
    pub fn shoup_vec(&self, a: &[u64]) -> Vec<u64> {
        a.iter().map(|ai| self.shoup(*ai)).collect_vec()
    }

    /// Modular negation of a vector in place in constant time.
    ///
    /// Aborts if any of the values in the vector is >= p in debug mode.
    pub fn neg_vec(&self, a: &mut [u64]) {
        a.iter_mut().for_each(|ai| *ai = self.neg(*ai))
    }

    /// Reduce a vector in place in constant time.
    pub fn reduce_vec(&self, a: &mut [u64]) {
        a.iter_mut().for_each(|ai| *ai = self.reduce(*ai))
    }

    /// Modular reduction of a i64 in constant time.
    pub const fn reduce_i64(&self, a: i64) -> u64 {
        self.reduce_u128((((self.p as i128) << 64) + (a as i128)) as u128)
    }

    /// Reduce a vector of i64 in constant time.
    pub fn reduce_vec_i64(&self, a: &[i64]) -> Vec<u64> {
        a.iter().map(|ai| self.reduce_i64(*ai)).collect_vec()
    }

    /// Reduce a vector in constant time.
    pub fn reduce_vec_new(&self, a: &[u64]) -> Vec<u64> {
        a.iter().map(|ai| self.reduce(*ai)).collect_vec()
    }

    /// Center a value modulo p, i.e. map it to the interval (-p/2, p/2].
    ///
    /// Aborts if a >= p in debug mode.
    pub const fn center(&self, a: u64) -> i64 {
        debug_assert!(a < self.p);
        let shifted = const_time_cond_select(a.wrapping_sub(self.p), a, a > (self.p >> 1));
        shifted as i64
    }

    /// Modular exponentiation in variable time.
    ///
    /// Aborts if a >= p or n >= p in debug mode.
    pub fn pow(&self, a: u64, n: u64) -> u64 {
        debug_assert!(a < self.p && n < self.p);

        if n == 0 {
            1
        } else if n == 1 {
            a
        } else {
            let mut r = a;
            let mut i = (62 - n.leading_zeros()) as isize;
            while i >= 0 {
                r = self.mul(r, r);
                if (n >> i) & 1 == 1 {
                    r = self.mul(r, a);
                }
                i -= 1;
            }
            r
        }
    }

    /// Modular inversion in variable time.
    ///
    /// Returns None if p is not prime or a = 0.
    /// Aborts if a >= p in debug mode.
    pub fn inv(&self, a: u64) -> Option<u64> {
        if !is_prime(self.p) || a == 0 {
            None
        } else {
            let r = self.pow(a, self.p - 2);
            debug_assert_eq!(self.mul(a, r), 1);
            Some(r)
        }
    }

    /// Modular reduction of a u128 in constant time.
    pub const fn reduce_u128(&self, a: u128) -> u64 {
        Self::reduce1(self.lazy_reduce_u128(a), self.p)
    }

    /// Modular reduction of a u64 in constant time.
    pub const fn reduce(&self, a: u64) -> u64 {
        Self::reduce1(self.lazy_reduce(a), self.p)
    }

    /// Return x mod p in constant time.
    /// Aborts if x >= 2 * p in debug mode.
    pub(crate) const fn reduce1(x: u64, p: u64) -> u64 {
        debug_assert!(p >> 63 == 0);
        debug_assert!(x < 2 * p);

        let r = const_time_cond_select(x, x.wrapping_sub(p), x < p);

        debug_assert!(r == x % p);

        r
    }

    /// Lazy modular reduction of a in constant time.
    /// The output is in the interval [0, 2 * p).
    pub const fn lazy_reduce_u128(&self, a: u128) -> u64 {
        let a_lo = a as u64;
        let a_hi = (a >> 64) as u64;
        let p_lo_lo = ((a_lo as u128) * (self.barrett_lo as u128)) >> 64;
        let p_hi_lo = (a_hi as u128) * (self.barrett_lo as u128);
        let p_lo_hi = (a_lo as u128) * (self.barrett_hi as u128);

        let q = ((p_lo_hi + p_hi_lo + p_lo_lo) >> 64) + (a_hi as u128) * (self.barrett_hi as u128);
        let r = (a - q * (self.p as u128)) as u64;

        debug_assert!((r as u128) < 2 * (self.p as u128));
        debug_assert!(r % self.p == (a % (self.p as u128)) as u64);

        r
    }

    /// Lazy modular reduction of a in constant time.
    /// The output is in the interval [0, 2 * p).
    pub const fn lazy_reduce(&self, a: u64) -> u64 {
        let p_lo_lo = ((a as u128) * (self.barrett_lo as u128)) >> 64;
        let p_lo_hi = (a as u128) * (self.barrett_hi as u128);

        let q = (p_lo_hi + p_lo_lo) >> 64;
        let r = (a as u128 - q * (self.p as u128)) as u64;

        debug_assert!((r as u128) < 2 * (self.p as u128));
        debug_assert!(r % self.p == a % self.p);

        r
    }

    /// Returns a random vector.
    pub fn random_vec<R: RngCore + CryptoRng>(&self, size: usize, rng: &mut R) -> Vec<u64> {
        rng.sample_iter(self.distribution).take(size).collect_vec()
    }

    /// Length of the serialization of a vector of size `size`.
    pub fn serialization_length(&self, size: usize) -> usize {
        mhe_util::div_ceil(self.nbits() * size, 8)
    }

    /// Serialize a vector of elements.
    pub fn serialize_vec(&self, a: &[u64]) -> Vec<u8> {
        transcode_to_bytes(a, self.nbits())
    }

    /// Deserialize a vector of bytes into a vector of elements mod p.
    ///
    /// Returns an error if one of the decoded elements is not reduced modulo p.
    pub fn deserialize_vec(&self, b: &[u8], size: usize) -> Result<Vec<u64>> {
        if b.len() != self.serialization_length(size) {
            return Err(Error::Serialization(format!(
                "Invalid length: got {} bytes, expected {}",
                b.len(),
                self.serialization_length(size)
            )));
        }
        let mut v = transcode_from_bytes(b, self.nbits());
        v.truncate(size);
        if v.iter().any(|vi| *vi >= self.p) {
            return Err(Error::Serialization(
                "Value not reduced modulo p".to_string(),
            ));
        }
        Ok(v)
    }

    fn nbits(&self) -> usize {
        64 - (self.p - 1).leading_zeros() as usize
    }
}

#[cfg(test)]
mod tests {
    use super::{primes, Modulus};
    use itertools::{izip, Itertools};
    use proptest::collection::vec as prop_vec;
    use proptest::prelude::{any, BoxedStrategy, Just, Strategy};
    use rand::thread_rng;

    fn valid_moduli() -> impl Strategy<Value = Modulus> {
        any::<u64>().prop_filter_map("filter invalid moduli", |p| Modulus::new(p).ok())
    }

    fn vecs() -> BoxedStrategy<(Vec<u64>, Vec<u64>)> {
        prop_vec(any::<u64>(), 1..100)
            .prop_flat_map(|vec| {
                let len = vec.len();
                (Just(vec), prop_vec(any::<u64>(), len))
            })
            .boxed()
    }

    proptest! {
        #[test]
        fn constructor(p: u64) {
            // 63 and 64-bit integers do not work.
            prop_assert!(Modulus::new(p | (1u64 << 62)).is_err());
            prop_assert!(Modulus::new(p | (1u64 << 63)).is_err());

            // p = 0 & 1 do not work.
            prop_assert!(Modulus::new(0u64).is_err());
            prop_assert!(Modulus::new(1u64).is_err());

            // Otherwise, all moduli should work.
            prop_assume!(p >> 2 >= 2);
            let q = Modulus::new(p >> 2);
            prop_assert!(q.is_ok());
            prop_assert_eq!(*q.unwrap(), p >> 2);
        }

        #[test]
        fn neg(p in valid_moduli(), mut a: u64) {
            a = p.reduce(a);
            prop_assert_eq!(p.neg(a), (*p - a) % *p);
        }

        #[test]
        fn add_sub(p in valid_moduli(), mut a: u64, mut b: u64) {
            a = p.reduce(a);
            b = p.reduce(b);
            prop_assert_eq!(p.add(a, b), (a + b) % *p);
            prop_assert_eq!(p.sub(a, b), (a + *p - b) % *p);
        }

        #[test]
        fn mul(p in valid_moduli(), mut a: u64, mut b: u64) {
            a = p.reduce(a);
            b = p.reduce(b);
            prop_assert_eq!(p.mul(a, b) as u128, ((a as u128) * (b as u128)) % (*p as u128));
        }

        #[test]
        fn mul_shoup(p in valid_moduli(), mut a: u64, mut b: u64) {
            a = p.reduce(a);
            b = p.reduce(b);
            let b_shoup = p.shoup(b);
            prop_assert_eq!(p.mul_shoup(a, b, b_shoup) as u128, ((a as u128) * (b as u128)) % (*p as u128));
        }

        #[test]
        fn reduce(p in valid_moduli(), a: u64) {
            prop_assert_eq!(p.reduce(a), a % *p);
        }

        #[test]
        fn reduce_i64(p in valid_moduli(), a: i64) {
            let b = if a < 0 { p.neg(p.reduce(-(a as i128) as u64)) } else { p.reduce(a as u64) };
            prop_assert_eq!(p.reduce_i64(a), b);
        }

        #[test]
        fn reduce_u128(p in valid_moduli(), a: u128) {
            prop_assert_eq!(p.reduce_u128(a) as u128, a % (*p as u128));
        }

        #[test]
        fn center(p in valid_moduli(), a: u64) {
            let a = p.reduce(a);
            let c = p.center(a);
            prop_assert!(2 * c.unsigned_abs() <= *p);
            prop_assert_eq!(p.reduce_i64(c), a);
        }

        #[test]
        fn vec_ops(p in valid_moduli(), (mut a, mut b) in vecs()) {
            p.reduce_vec(&mut a);
            b = p.reduce_vec_new(&b);

            let mut c = a.clone();
            p.add_vec(&mut c, &b);
            prop_assert_eq!(c, izip!(a.iter(), b.iter()).map(|(ai, bi)| p.add(*ai, *bi)).collect_vec());

            let mut c = a.clone();
            p.sub_vec(&mut c, &b);
            prop_assert_eq!(c, izip!(a.iter(), b.iter()).map(|(ai, bi)| p.sub(*ai, *bi)).collect_vec());

            let mut c = a.clone();
            p.mul_vec(&mut c, &b);
            prop_assert_eq!(c, izip!(a.iter(), b.iter()).map(|(ai, bi)| p.mul(*ai, *bi)).collect_vec());

            let mut c = a.clone();
            p.scalar_mul_vec(&mut c, b[0]);
            prop_assert_eq!(c, a.iter().map(|ai| p.mul(*ai, b[0])).collect_vec());

            let mut c = a.clone();
            p.neg_vec(&mut c);
            prop_assert_eq!(c, a.iter().map(|ai| p.neg(*ai)).collect_vec());
        }
    }

    #[test]
    fn pow_and_inv() {
        let ntests = 100;
        let mut rng = thread_rng();

        for p in [2u64, 3, 17, 1987, 4611686018326724609] {
            let q = Modulus::new(p).unwrap();

            assert_eq!(q.pow(p - 1, 0), 1);
            assert_eq!(q.pow(p - 1, 1), p - 1);
            assert_eq!(q.pow(p - 1, 2 % p), 1);
            assert_eq!(q.pow(1, p - 2), 1);
            assert_eq!(q.pow(1, p - 1), 1);

            assert!(q.inv(0).is_none());
            for _ in 0..ntests {
                let a = q.random_vec(1, &mut rng)[0];
                if a != 0 {
                    let b = q.inv(a).unwrap();
                    assert_eq!(q.mul(a, b), 1);
                }
            }
        }

        let q = Modulus::new(4).unwrap();
        assert!(q.inv(2).is_none());
    }

    #[test]
    fn serialize() {
        let mut rng = thread_rng();
        for p in [2u64, 3, 17, 1153, 4611686018326724609] {
            let q = Modulus::new(p).unwrap();
            for size in [1, 7, 8, 64] {
                let a = q.random_vec(size, &mut rng);
                let b = q.serialize_vec(&a);
                assert_eq!(b.len(), q.serialization_length(size));
                assert_eq!(q.deserialize_vec(&b, size).unwrap(), a);
                assert!(q.deserialize_vec(&b[1..], size).is_err());
            }
        }

        // 1153 needs 11 bits, so 2047 can be encoded but is not reduced.
        let q = Modulus::new(1153).unwrap();
        let b = mhe_util::transcode_to_bytes(&[2047; 8], 11);
        assert!(q.deserialize_vec(&b, 8).is_err());
    }

    #[test]
    fn generated_moduli_are_ntt_friendly() {
        let p = primes::generate_prime(62, 2 * 64, 1 << 62).unwrap();
        assert_eq!(p % 128, 1);
        assert!(Modulus::new(p).is_ok());
    }
}
