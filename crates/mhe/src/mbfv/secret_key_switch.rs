use std::sync::Arc;

use itertools::izip;
use mhe_math::rq::{traits::TryConvertFrom, Poly, Representation};
use mhe_traits::{DeserializeParametrized, DeserializeWithContext, FheParametrized, Serialize};
use mhe_util::sample_vec_normal;
use rand::{CryptoRng, RngCore};
use zeroize::Zeroizing;

use crate::bfv::{BfvParameters, Ciphertext, SecretKey};
use crate::{Error, ParametersError, Result};

use super::nizk::{RandomnessSlot, SmudgingRandomness};
use super::{Aggregate, CommonRandomPoly};

/// Smudging noise shared by the key switching protocols: a rounded Gaussian
/// of standard deviation `sigma`, truncated at `6 * sigma`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Smudging {
    pub(crate) sigma: f64,
    pub(crate) bound: u64,
}

impl Smudging {
    pub(crate) fn new(sigma: f64) -> Result<Self> {
        if !sigma.is_finite() || sigma <= 0.0 {
            return Err(Error::ParametersError(ParametersError::InvalidSmudging(
                sigma.to_string(),
            )));
        }
        Ok(Self {
            sigma,
            bound: (6.0 * sigma) as u64,
        })
    }

    /// Sample the signed coefficients of a smudging error.
    pub(crate) fn sample<R: RngCore + CryptoRng>(
        &self,
        degree: usize,
        rng: &mut R,
    ) -> Result<Zeroizing<Vec<i64>>> {
        Ok(Zeroizing::new(
            sample_vec_normal(degree, self.sigma, self.bound, rng)
                .map_err(|e| Error::DefaultError(e.to_string()))?,
        ))
    }
}

/// Returns an error unless the ciphertext has exactly two polynomials.
pub(crate) fn check_degree_one(ct: &Ciphertext) -> Result<()> {
    match ct.len() {
        2 => Ok(()),
        n if n < 2 => Err(Error::TooFewValues(n, 2)),
        n => Err(Error::TooManyValues(n, 2)),
    }
}

/// A party's share in the collective secret key switching protocol.
///
/// The share is a polynomial in Ntt representation defined at a level; shares
/// can only be aggregated with shares at the same level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretKeySwitchShare {
    pub(crate) par: Arc<BfvParameters>,
    pub(crate) value: Poly,
    pub(crate) level: usize,
}

impl SecretKeySwitchShare {
    /// Creates a zero share at a given level.
    pub(crate) fn zero(par: &Arc<BfvParameters>, level: usize) -> Result<Self> {
        let ctx = par.ctx_at_level(level)?;
        Ok(Self {
            par: par.clone(),
            value: Poly::zero(ctx, Representation::Ntt),
            level,
        })
    }

    /// Returns the level of the share.
    pub fn level(&self) -> usize {
        self.level
    }

    /// Sets `self` to the sum of `a` and `b`.
    ///
    /// Panics if the two shares are not at the same level.
    pub(crate) fn set_sum(&mut self, a: &Self, b: &Self) {
        assert_eq!(
            a.level, b.level,
            "Cannot aggregate shares at different levels"
        );
        self.value = &a.value + &b.value;
        self.level = a.level;
    }
}

impl FheParametrized for SecretKeySwitchShare {
    type Parameters = BfvParameters;
}

impl Serialize for SecretKeySwitchShare {
    fn to_bytes(&self) -> Vec<u8> {
        self.value.to_bytes()
    }
}

impl DeserializeParametrized for SecretKeySwitchShare {
    type Error = Error;

    /// The level of the share is inferred from the length of the bytes.
    fn from_bytes(bytes: &[u8], par: &Arc<BfvParameters>) -> Result<Self> {
        let level = (0..=par.max_level())
            .find(|level| {
                par.ctx_at_level(*level)
                    .is_ok_and(|ctx| Poly::serialization_length(ctx) == bytes.len())
            })
            .ok_or(Error::SerializationError)?;
        let value = Poly::from_bytes(bytes, par.ctx_at_level(level)?)?;
        if value.representation() != &Representation::Ntt {
            return Err(Error::SerializationError);
        }
        Ok(Self {
            par: par.clone(),
            value,
            level,
        })
    }
}

/// Shares at different levels cannot be aggregated, and aggregating them
/// panics.
impl Aggregate<SecretKeySwitchShare> for SecretKeySwitchShare {
    fn from_shares<T>(iter: T) -> Result<Self>
    where
        T: IntoIterator<Item = SecretKeySwitchShare>,
    {
        let mut shares = iter.into_iter();
        let mut acc = shares.next().ok_or(Error::TooFewValues(0, 1))?;
        for sh in shares {
            let previous = acc.clone();
            acc.set_sum(&previous, &sh);
        }
        Ok(acc)
    }
}

/// The collective secret key switching protocol.
///
/// Parties holding additive shares `s_i` of a collective key `s` and `s'_i`
/// of a collective key `s'` re-encrypt a ciphertext under `s` into a
/// ciphertext under `s'`. Each party computes `(s_i - s'_i) * c1 + e_i`, where
/// `e_i` is a smudging error; once aggregated, the shares are added to `c0`.
#[derive(Debug)]
pub struct SecretKeySwitchProtocol {
    pub(crate) par: Arc<BfvParameters>,
    pub(crate) smudging: Smudging,
    delta: Zeroizing<Vec<i64>>,
}

impl SecretKeySwitchProtocol {
    /// Creates a new protocol instance with a smudging noise of standard
    /// deviation `sigma`.
    ///
    /// Returns an error if `sigma` is not a strictly positive number.
    pub fn new(par: &Arc<BfvParameters>, sigma: f64) -> Result<Self> {
        Ok(Self {
            par: par.clone(),
            smudging: Smudging::new(sigma)?,
            delta: Zeroizing::new(vec![0i64; par.degree()]),
        })
    }

    /// Creates an instance sharing the parameters of `self`, with its own
    /// scratch buffers.
    pub fn duplicate(&self) -> Self {
        Self {
            par: self.par.clone(),
            smudging: self.smudging,
            delta: Zeroizing::new(vec![0i64; self.par.degree()]),
        }
    }

    /// Allocates a share at a given level.
    pub fn allocate_share(&self, level: usize) -> Result<SecretKeySwitchShare> {
        SecretKeySwitchShare::zero(&self.par, level)
    }

    /// Samples a common random polynomial at a given level.
    pub fn sample_crp<R: RngCore + CryptoRng>(
        &self,
        level: usize,
        rng: &mut R,
    ) -> Result<CommonRandomPoly> {
        CommonRandomPoly::new_leveled(&self.par, level, rng)
    }

    /// Generates the share of a party switching the ciphertext from `sk_in` to
    /// `sk_out`; `c0` is not used.
    ///
    /// The share is computed at the lowest level between the level of
    /// `share_out` and the level of the ciphertext; when the ciphertext is at
    /// a higher level, it is first switched down.
    pub fn gen_share<R: RngCore + CryptoRng>(
        &mut self,
        sk_in: &SecretKey,
        sk_out: &SecretKey,
        ct: &Ciphertext,
        share_out: &mut SecretKeySwitchShare,
        rng: &mut R,
    ) -> Result<()> {
        self.gen_share_with_randomness(sk_in, sk_out, ct, share_out, rng)
            .map(|_| ())
    }

    pub(crate) fn gen_share_with_randomness<R: RngCore + CryptoRng>(
        &mut self,
        sk_in: &SecretKey,
        sk_out: &SecretKey,
        ct: &Ciphertext,
        share_out: &mut SecretKeySwitchShare,
        rng: &mut R,
    ) -> Result<SmudgingRandomness> {
        if sk_in.par != self.par || sk_out.par != self.par || ct.par != self.par {
            return Err(Error::DefaultError(
                "Incompatible BFV parameters".to_string(),
            ));
        }
        check_degree_one(ct)?;

        let level = share_out.level.min(ct.level);
        if ct.level > level {
            let mut ct = ct.clone();
            ct.mod_switch_to_level(level)?;
            self.share_of_c1(sk_in, sk_out, &ct[1], share_out, rng)
        } else {
            self.share_of_c1(sk_in, sk_out, &ct[1], share_out, rng)
        }
    }

    /// Computes `(sk_in - sk_out) * c1 + e` at the level of `c1`, and returns
    /// the smudging error `e`.
    pub(crate) fn share_of_c1<R: RngCore + CryptoRng>(
        &mut self,
        sk_in: &SecretKey,
        sk_out: &SecretKey,
        c1: &Poly,
        share_out: &mut SecretKeySwitchShare,
        rng: &mut R,
    ) -> Result<SmudgingRandomness> {
        let ctx = c1.ctx();
        let level = self.par.level_of_ctx(ctx)?;

        izip!(self.delta.iter_mut(), sk_in.coeffs.iter(), sk_out.coeffs.iter())
            .for_each(|(d, si, so)| *d = si - so);
        let mut h = Poly::try_convert_from(self.delta.as_slice(), ctx, Representation::Ntt)?;
        h *= c1;
        h.change_representation(Representation::PowerBasis);

        let e_coeffs = self.smudging.sample(self.par.degree(), rng)?;
        let e = Poly::try_convert_from(e_coeffs.as_slice(), ctx, Representation::PowerBasis)?;
        h += &e;
        h.change_representation(Representation::Ntt);

        log::trace!("secret key switch share generated at level {level}");
        share_out.value = h;
        share_out.level = level;
        Ok(SmudgingRandomness { e })
    }

    /// Sets `share_out` to the sum of `share1` and `share2`.
    ///
    /// Panics if the two shares are not at the same level.
    pub fn aggregate_shares(
        &self,
        share1: &SecretKeySwitchShare,
        share2: &SecretKeySwitchShare,
        share_out: &mut SecretKeySwitchShare,
    ) {
        share_out.set_sum(share1, share2)
    }

    /// Re-encrypts `ct_in` using the aggregation of the shares of all the
    /// parties, by adding it to `c0`; `c1` is copied as is.
    ///
    /// When `ct_in` is at a higher level than the share, it is first switched
    /// down to the level of the share.
    pub fn key_switch(
        &self,
        ct_in: &Ciphertext,
        combined: &SecretKeySwitchShare,
        ct_out: &mut Ciphertext,
    ) -> Result<()> {
        if combined.par != self.par {
            return Err(Error::DefaultError(
                "Incompatible BFV parameters".to_string(),
            ));
        }
        check_degree_one(ct_in)?;
        if ct_in.level < combined.level {
            return Err(Error::InvalidLevel(combined.level, ct_in.level));
        }
        let mut ct = ct_in.clone();
        ct.mod_switch_to_level(combined.level)?;
        ct.c[0] += &combined.value;
        *ct_out = ct;
        Ok(())
    }
}

/// The collective secret key switching protocol, retaining the smudging error
/// sampled by the last share generation.
#[derive(Debug)]
pub struct NizkSecretKeySwitchProtocol {
    protocol: SecretKeySwitchProtocol,
    randomness: RandomnessSlot<SmudgingRandomness>,
}

impl NizkSecretKeySwitchProtocol {
    /// Creates a new protocol instance with a smudging noise of standard
    /// deviation `sigma`.
    pub fn new(par: &Arc<BfvParameters>, sigma: f64) -> Result<Self> {
        Ok(Self {
            protocol: SecretKeySwitchProtocol::new(par, sigma)?,
            randomness: RandomnessSlot::default(),
        })
    }

    /// Creates an instance sharing the parameters of `self`, with its own
    /// scratch buffers and a deep copy of the captured randomness.
    pub fn duplicate(&self) -> Self {
        Self {
            protocol: self.protocol.duplicate(),
            randomness: self.randomness.clone(),
        }
    }

    /// Allocates a share at a given level.
    pub fn allocate_share(&self, level: usize) -> Result<SecretKeySwitchShare> {
        self.protocol.allocate_share(level)
    }

    /// Samples a common random polynomial at a given level.
    pub fn sample_crp<R: RngCore + CryptoRng>(
        &self,
        level: usize,
        rng: &mut R,
    ) -> Result<CommonRandomPoly> {
        self.protocol.sample_crp(level, rng)
    }

    /// See [`SecretKeySwitchProtocol::gen_share`]; the smudging error is
    /// captured.
    pub fn gen_share<R: RngCore + CryptoRng>(
        &mut self,
        sk_in: &SecretKey,
        sk_out: &SecretKey,
        ct: &Ciphertext,
        share_out: &mut SecretKeySwitchShare,
        rng: &mut R,
    ) -> Result<()> {
        let randomness = self
            .protocol
            .gen_share_with_randomness(sk_in, sk_out, ct, share_out, rng)?;
        self.randomness.capture(randomness);
        Ok(())
    }

    /// See [`SecretKeySwitchProtocol::aggregate_shares`].
    pub fn aggregate_shares(
        &self,
        share1: &SecretKeySwitchShare,
        share2: &SecretKeySwitchShare,
        share_out: &mut SecretKeySwitchShare,
    ) {
        self.protocol.aggregate_shares(share1, share2, share_out)
    }

    /// See [`SecretKeySwitchProtocol::key_switch`].
    pub fn key_switch(
        &self,
        ct_in: &Ciphertext,
        combined: &SecretKeySwitchShare,
        ct_out: &mut Ciphertext,
    ) -> Result<()> {
        self.protocol.key_switch(ct_in, combined, ct_out)
    }

    /// Returns the smudging error sampled by the last share generation.
    pub fn randomness(&self) -> Result<&SmudgingRandomness> {
        self.randomness.get()
    }

    /// Returns the serialization of the smudging error sampled by the last
    /// share generation.
    pub fn export_randomness(&self) -> Result<Vec<u8>> {
        Ok(self.randomness.get()?.to_bytes())
    }
}

#[cfg(test)]
mod tests {
    use mhe_math::rq::{Poly, Representation};
    use mhe_traits::{
        DeserializeParametrized, FheDecoder, FheDecrypter, FheEncoder, FheEncrypter, Serialize,
    };
    use rand::thread_rng;

    use crate::bfv::{BfvParameters, Ciphertext, Encoding, Plaintext, SecretKey};
    use crate::mbfv::{Aggregate, AggregateIter};
    use crate::{Error, ParametersError};

    use super::{NizkSecretKeySwitchProtocol, SecretKeySwitchProtocol, SecretKeySwitchShare};

    const NUM_PARTIES: usize = 11;
    const SIGMA: f64 = 3.2;

    fn sum_keys(keys: &[SecretKey], par: &std::sync::Arc<BfvParameters>) -> SecretKey {
        let mut coeffs = vec![0i64; par.degree()];
        keys.iter().for_each(|k| {
            coeffs
                .iter_mut()
                .zip(k.coeffs.iter())
                .for_each(|(c, ki)| *c += ki)
        });
        SecretKey::new(coeffs, par).unwrap()
    }

    #[test]
    fn invalid_smudging() {
        let par = BfvParameters::default_arc(1, 16);
        for sigma in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                SecretKeySwitchProtocol::new(&par, sigma),
                Err(Error::ParametersError(ParametersError::InvalidSmudging(_)))
            ));
        }
    }

    #[test]
    fn encrypt_keyswitch_decrypt() -> Result<(), Box<dyn std::error::Error>> {
        let mut rng = thread_rng();
        for par in [
            BfvParameters::default_arc(1, 16),
            BfvParameters::default_arc(6, 32),
        ] {
            for level in 0..=par.max_level() {
                let sks_in = (0..NUM_PARTIES)
                    .map(|_| SecretKey::random(&par, &mut rng))
                    .collect::<crate::Result<Vec<_>>>()?;
                let sks_out = (0..NUM_PARTIES)
                    .map(|_| SecretKey::random(&par, &mut rng))
                    .collect::<crate::Result<Vec<_>>>()?;
                let sk_in = sum_keys(&sks_in, &par);
                let sk_out = sum_keys(&sks_out, &par);

                let v = par.plaintext.random_vec(par.degree(), &mut rng);
                let pt = Plaintext::try_encode(&v, Encoding::poly_at_level(level), &par)?;
                let ct = sk_in.try_encrypt(&pt, &mut rng)?;

                let mut protocol = SecretKeySwitchProtocol::new(&par, SIGMA)?;
                let shares = sks_in
                    .iter()
                    .zip(sks_out.iter())
                    .map(|(ski, sko)| {
                        let mut share = protocol.allocate_share(level)?;
                        protocol.gen_share(ski, sko, &ct, &mut share, &mut rng)?;
                        Ok(share)
                    })
                    .collect::<crate::Result<Vec<_>>>()?;

                let mut combined = protocol.allocate_share(level)?;
                for share in &shares {
                    let previous = combined.clone();
                    protocol.aggregate_shares(&previous, share, &mut combined);
                }
                assert_eq!(
                    combined,
                    shares.clone().into_iter().aggregate::<SecretKeySwitchShare>()?
                );

                let mut ct_out = Ciphertext::zero(&par, level)?;
                protocol.key_switch(&ct, &combined, &mut ct_out)?;
                assert_eq!(ct_out[1], ct[1]);

                let pt_out = sk_out.try_decrypt(&ct_out)?;
                assert_eq!(
                    Vec::<u64>::try_decode(&pt_out, Encoding::poly_at_level(level))?,
                    v
                );
            }
        }
        Ok(())
    }

    #[test]
    fn share_level_is_minimum() -> Result<(), Box<dyn std::error::Error>> {
        let mut rng = thread_rng();
        let par = BfvParameters::default_arc(6, 32);
        let sk_in = SecretKey::random(&par, &mut rng)?;
        let sk_out = SecretKey::random(&par, &mut rng)?;
        let v = par.plaintext.random_vec(par.degree(), &mut rng);
        let pt = Plaintext::try_encode(&v, Encoding::poly_at_level(4), &par)?;
        let ct = sk_in.try_encrypt(&pt, &mut rng)?;

        let mut protocol = SecretKeySwitchProtocol::new(&par, SIGMA)?;

        // The ciphertext is switched down to the level of the share.
        let mut share = protocol.allocate_share(2)?;
        protocol.gen_share(&sk_in, &sk_out, &ct, &mut share, &mut rng)?;
        assert_eq!(share.level(), 2);
        let mut ct_out = Ciphertext::zero(&par, 2)?;
        protocol.key_switch(&ct, &share, &mut ct_out)?;
        assert_eq!(ct_out.level(), 2);
        let pt_out = sk_out.try_decrypt(&ct_out)?;
        assert_eq!(Vec::<u64>::try_decode(&pt_out, Encoding::poly_at_level(2))?, v);

        // The share cannot be higher than the ciphertext.
        let mut share = protocol.allocate_share(5)?;
        protocol.gen_share(&sk_in, &sk_out, &ct, &mut share, &mut rng)?;
        assert_eq!(share.level(), 4);
        Ok(())
    }

    #[test]
    fn aggregation_is_commutative_and_associative() -> Result<(), Box<dyn std::error::Error>> {
        let mut rng = thread_rng();
        let par = BfvParameters::default_arc(2, 16);
        let mut protocol = SecretKeySwitchProtocol::new(&par, SIGMA)?;
        let sk = SecretKey::random(&par, &mut rng)?;
        let zero = SecretKey::new(vec![], &par)?;
        let pt = Plaintext::try_encode(&[1u64], Encoding::poly_at_level(1), &par)?;
        let ct = sk.try_encrypt(&pt, &mut rng)?;

        let mut shares = vec![];
        for _ in 0..3 {
            let mut share = protocol.allocate_share(1)?;
            protocol.gen_share(&sk, &zero, &ct, &mut share, &mut rng)?;
            shares.push(share);
        }
        let (a, b, c) = (&shares[0], &shares[1], &shares[2]);

        let mut ab = protocol.allocate_share(1)?;
        let mut bc = protocol.allocate_share(1)?;
        let mut ac = protocol.allocate_share(1)?;
        protocol.aggregate_shares(a, b, &mut ab);
        protocol.aggregate_shares(b, c, &mut bc);
        protocol.aggregate_shares(a, c, &mut ac);

        let mut ab_c = protocol.allocate_share(1)?;
        let mut a_bc = protocol.allocate_share(1)?;
        let mut b_ac = protocol.allocate_share(1)?;
        protocol.aggregate_shares(&ab, c, &mut ab_c);
        protocol.aggregate_shares(a, &bc, &mut a_bc);
        protocol.aggregate_shares(b, &ac, &mut b_ac);

        assert_eq!(ab_c, a_bc);
        assert_eq!(a_bc, b_ac);
        Ok(())
    }

    #[test]
    #[should_panic(expected = "Cannot aggregate shares at different levels")]
    fn aggregation_at_different_levels_panics() {
        let par = BfvParameters::default_arc(6, 16);
        let protocol = SecretKeySwitchProtocol::new(&par, SIGMA).unwrap();
        let a = protocol.allocate_share(3).unwrap();
        let b = protocol.allocate_share(5).unwrap();
        let mut out = protocol.allocate_share(5).unwrap();
        protocol.aggregate_shares(&a, &b, &mut out);
    }

    #[test]
    fn ciphertext_degree_is_checked() -> Result<(), Box<dyn std::error::Error>> {
        let mut rng = thread_rng();
        let par = BfvParameters::default_arc(1, 16);
        let sk = SecretKey::random(&par, &mut rng)?;
        let zero = Poly::zero(par.ctx_at_level(0)?, Representation::Ntt);
        let ct_three = Ciphertext::new(vec![zero.clone(), zero.clone(), zero.clone()], &par)?;
        let ct_one = Ciphertext {
            par: par.clone(),
            c: vec![zero],
            level: 0,
        };

        let mut protocol = SecretKeySwitchProtocol::new(&par, SIGMA)?;
        let mut share = protocol.allocate_share(0)?;
        assert_eq!(
            protocol
                .gen_share(&sk, &sk, &ct_one, &mut share, &mut rng)
                .err(),
            Some(Error::TooFewValues(1, 2))
        );
        assert_eq!(
            protocol
                .gen_share(&sk, &sk, &ct_three, &mut share, &mut rng)
                .err(),
            Some(Error::TooManyValues(3, 2))
        );

        let mut ct_out = Ciphertext::zero(&par, 0)?;
        assert_eq!(
            protocol.key_switch(&ct_one, &share, &mut ct_out).err(),
            Some(Error::TooFewValues(1, 2))
        );
        assert_eq!(
            protocol.key_switch(&ct_three, &share, &mut ct_out).err(),
            Some(Error::TooManyValues(3, 2))
        );
        Ok(())
    }

    #[test]
    fn serialize() -> Result<(), Box<dyn std::error::Error>> {
        let mut rng = thread_rng();
        let par = BfvParameters::default_arc(6, 16);
        let mut protocol = SecretKeySwitchProtocol::new(&par, SIGMA)?;
        let sk = SecretKey::random(&par, &mut rng)?;
        let zero = SecretKey::new(vec![], &par)?;
        for level in 0..=par.max_level() {
            let pt = Plaintext::try_encode(&[1u64], Encoding::poly_at_level(level), &par)?;
            let ct = sk.try_encrypt(&pt, &mut rng)?;
            let mut share = protocol.allocate_share(level)?;
            protocol.gen_share(&sk, &zero, &ct, &mut share, &mut rng)?;

            let bytes = share.to_bytes();
            assert_eq!(SecretKeySwitchShare::from_bytes(&bytes, &par)?, share);
        }
        assert!(SecretKeySwitchShare::from_bytes(&[0u8; 3], &par).is_err());
        Ok(())
    }

    #[test]
    fn nizk_captures_smudging_error() -> Result<(), Box<dyn std::error::Error>> {
        let mut rng = thread_rng();
        let par = BfvParameters::default_arc(2, 16);
        let sk = SecretKey::random(&par, &mut rng)?;
        let zero = SecretKey::new(vec![], &par)?;
        let pt = Plaintext::try_encode(&[1u64, 2, 3], Encoding::poly_at_level(1), &par)?;
        let ct = sk.try_encrypt(&pt, &mut rng)?;

        let mut protocol = NizkSecretKeySwitchProtocol::new(&par, SIGMA)?;
        assert_eq!(
            protocol.export_randomness().err(),
            Some(Error::RandomnessNotCaptured)
        );

        let mut share = protocol.allocate_share(1)?;
        protocol.gen_share(&sk, &zero, &ct, &mut share, &mut rng)?;
        let e = protocol.randomness()?.e.clone();
        assert_eq!(e.representation(), &Representation::PowerBasis);
        assert_eq!(protocol.export_randomness()?, e.to_bytes());

        // share = s * c1 + e
        let mut expected = sk.poly_in(ct[1].ctx())?.as_ref() * &ct[1];
        expected.change_representation(Representation::PowerBasis);
        expected += &e;
        expected.change_representation(Representation::Ntt);
        assert_eq!(share.value, expected);

        // The duplicate owns a copy of the randomness.
        let duplicate = protocol.duplicate();
        protocol.gen_share(&sk, &zero, &ct, &mut share, &mut rng)?;
        assert_eq!(duplicate.randomness()?.e, e);
        assert_ne!(protocol.randomness()?.e, e);
        Ok(())
    }

    #[test]
    fn aggregate_trait_requires_shares() {
        assert_eq!(
            SecretKeySwitchShare::from_shares(Vec::<SecretKeySwitchShare>::new()).err(),
            Some(Error::TooFewValues(0, 1))
        );
    }
}
