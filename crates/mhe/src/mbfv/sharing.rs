//! Conversions between a ciphertext and an additive sharing of its plaintext.

use std::sync::Arc;

use mhe_math::rq::Representation;
use mhe_traits::{DeserializeParametrized, FheParametrized, Serialize};
use rand::{CryptoRng, RngCore};
use zeroize::Zeroizing;
use zeroize_derive::{Zeroize, ZeroizeOnDrop};

use crate::bfv::{BfvParameters, Ciphertext, SecretKey};
use crate::{Error, Result};

use super::nizk::{RandomnessSlot, SmudgingRandomness};
use super::secret_key_switch::{SecretKeySwitchProtocol, SecretKeySwitchShare};
use super::{Aggregate, CommonRandomPoly};

/// A party's additive share of a plaintext, i.e. a polynomial modulo the
/// plaintext modulus.
///
/// The shares of all the parties sum to the plaintext modulo `t`.
#[derive(Debug, Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct AdditiveShare {
    #[zeroize(skip)]
    pub(crate) par: Arc<BfvParameters>,
    pub(crate) coeffs: Box<[u64]>,
}

impl AdditiveShare {
    /// Creates a zero share.
    pub fn zero(par: &Arc<BfvParameters>) -> Self {
        Self {
            par: par.clone(),
            coeffs: vec![0u64; par.degree()].into_boxed_slice(),
        }
    }

    /// Creates a share from its coefficients, which are reduced modulo the
    /// plaintext modulus; missing coefficients are set to zero.
    pub fn new(coeffs: &[u64], par: &Arc<BfvParameters>) -> Result<Self> {
        if coeffs.len() > par.degree() {
            return Err(Error::TooManyValues(coeffs.len(), par.degree()));
        }
        let mut share = Self::zero(par);
        share.coeffs[..coeffs.len()].copy_from_slice(&par.plaintext.reduce_vec_new(coeffs));
        Ok(share)
    }

    /// Returns the coefficients of the share.
    pub fn coefficients(&self) -> &[u64] {
        &self.coeffs
    }

    /// Adds `other` to `self` modulo the plaintext modulus.
    pub(crate) fn add_assign(&mut self, other: &[u64]) {
        self.par.plaintext.add_vec(&mut self.coeffs, other)
    }
}

impl FheParametrized for AdditiveShare {
    type Parameters = BfvParameters;
}

impl Serialize for AdditiveShare {
    fn to_bytes(&self) -> Vec<u8> {
        self.par.plaintext.serialize_vec(&self.coeffs)
    }
}

impl DeserializeParametrized for AdditiveShare {
    type Error = Error;

    fn from_bytes(bytes: &[u8], par: &Arc<BfvParameters>) -> Result<Self> {
        let coeffs = par.plaintext.deserialize_vec(bytes, par.degree())?;
        if coeffs.iter().any(|c| *c >= par.plaintext()) {
            return Err(Error::SerializationError);
        }
        Ok(Self {
            par: par.clone(),
            coeffs: coeffs.into_boxed_slice(),
        })
    }
}

impl Aggregate<AdditiveShare> for AdditiveShare {
    fn from_shares<T>(iter: T) -> Result<Self>
    where
        T: IntoIterator<Item = AdditiveShare>,
    {
        let mut shares = iter.into_iter();
        let mut acc = shares.next().ok_or(Error::TooFewValues(0, 1))?;
        for sh in shares {
            acc.add_assign(&sh.coeffs);
        }
        Ok(acc)
    }
}

/// The aggregation of the public shares of all the parties in the
/// encryption-to-shares protocol.
///
/// Only the party finalizing the protocol holds this value, and finalizing
/// consumes it, so that the masked plaintext is recovered exactly once.
#[derive(Debug, PartialEq, Eq)]
pub struct AggregatedPublicShare(SecretKeySwitchShare);

impl AggregatedPublicShare {
    /// Wraps the aggregation of all the public shares, computed with
    /// [`EncryptionToSharesProtocol::aggregate_shares`].
    pub fn new(aggregated: SecretKeySwitchShare) -> Self {
        Self(aggregated)
    }
}

impl Aggregate<SecretKeySwitchShare> for AggregatedPublicShare {
    fn from_shares<T>(iter: T) -> Result<Self>
    where
        T: IntoIterator<Item = SecretKeySwitchShare>,
    {
        Ok(Self(SecretKeySwitchShare::from_shares(iter)?))
    }
}

/// The encryption-to-shares protocol.
///
/// Each party masks its decryption share of the ciphertext with a uniformly
/// random additive share. The party that finalizes the protocol recovers the
/// plaintext minus the sum of the masks, which is its own additive share.
#[derive(Debug)]
pub struct EncryptionToSharesProtocol {
    pub(crate) cks: SecretKeySwitchProtocol,
    zero: SecretKey,
}

impl EncryptionToSharesProtocol {
    /// Creates a new protocol instance with a smudging noise of standard
    /// deviation `sigma`.
    pub fn new(par: &Arc<BfvParameters>, sigma: f64) -> Result<Self> {
        Ok(Self {
            cks: SecretKeySwitchProtocol::new(par, sigma)?,
            zero: SecretKey::zero(par),
        })
    }

    /// Creates an instance sharing the parameters of `self`, with its own
    /// scratch buffers.
    pub fn duplicate(&self) -> Self {
        Self {
            cks: self.cks.duplicate(),
            zero: SecretKey::zero(&self.cks.par),
        }
    }

    /// Allocates a public share at a given level.
    pub fn allocate_share(&self, level: usize) -> Result<SecretKeySwitchShare> {
        self.cks.allocate_share(level)
    }

    /// Generates the share of a party: the additive share `secret_share_out`
    /// is kept by the party, and `public_share_out` is sent to the party
    /// finalizing the protocol.
    pub fn gen_share<R: RngCore + CryptoRng>(
        &mut self,
        sk: &SecretKey,
        ct: &Ciphertext,
        secret_share_out: &mut AdditiveShare,
        public_share_out: &mut SecretKeySwitchShare,
        rng: &mut R,
    ) -> Result<()> {
        self.gen_share_with_randomness(sk, ct, secret_share_out, public_share_out, rng)
            .map(|_| ())
    }

    pub(crate) fn gen_share_with_randomness<R: RngCore + CryptoRng>(
        &mut self,
        sk: &SecretKey,
        ct: &Ciphertext,
        secret_share_out: &mut AdditiveShare,
        public_share_out: &mut SecretKeySwitchShare,
        rng: &mut R,
    ) -> Result<SmudgingRandomness> {
        if secret_share_out.par != self.cks.par {
            return Err(Error::DefaultError(
                "Incompatible BFV parameters".to_string(),
            ));
        }
        let randomness =
            self.cks
                .gen_share_with_randomness(sk, &self.zero, ct, public_share_out, rng)?;

        let par = &self.cks.par;
        let mask = Zeroizing::new(par.plaintext.random_vec(par.degree(), rng));
        let mut scaled_mask = Zeroizing::new(par.scale_up(&mask, public_share_out.level)?);
        scaled_mask.change_representation(Representation::Ntt);
        public_share_out.value -= scaled_mask.as_ref();

        secret_share_out.coeffs.copy_from_slice(&mask);
        Ok(randomness)
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
        self.cks.aggregate_shares(share1, share2, share_out)
    }

    /// Finalizes the protocol, setting `secret_share_out` to the plaintext
    /// minus the masks of all the parties, plus `own_share` when the
    /// finalizing party also generated a share.
    pub fn get_share(
        &self,
        own_share: Option<&AdditiveShare>,
        aggregated: AggregatedPublicShare,
        ct: &Ciphertext,
        secret_share_out: &mut AdditiveShare,
    ) -> Result<()> {
        if own_share.is_some_and(|share| share.par != self.cks.par) {
            return Err(Error::DefaultError(
                "Incompatible BFV parameters".to_string(),
            ));
        }
        self.masked_plaintext(&aggregated.0, ct, secret_share_out)?;
        if let Some(own_share) = own_share {
            secret_share_out.add_assign(&own_share.coeffs);
        }
        Ok(())
    }

    /// Sets `out` to the scaled down value of `c0 + aggregated`.
    pub(crate) fn masked_plaintext(
        &self,
        aggregated: &SecretKeySwitchShare,
        ct: &Ciphertext,
        out: &mut AdditiveShare,
    ) -> Result<()> {
        if ct.par != self.cks.par
            || aggregated.par != self.cks.par
            || out.par != self.cks.par
        {
            return Err(Error::DefaultError(
                "Incompatible BFV parameters".to_string(),
            ));
        }
        let mut c0 = if ct.level > aggregated.level {
            let mut ct = ct.clone();
            ct.mod_switch_to_level(aggregated.level)?;
            ct.c[0].clone()
        } else if ct.level == aggregated.level {
            ct.c[0].clone()
        } else {
            return Err(Error::InvalidLevel(aggregated.level, ct.level));
        };
        c0 += &aggregated.value;
        c0.change_representation(Representation::PowerBasis);
        let w = Zeroizing::new(self.cks.par.scale_down(&c0)?);
        out.coeffs.copy_from_slice(&w);
        Ok(())
    }
}

/// The shares-to-encryption protocol.
///
/// Each party encrypts its additive share under its share of the output key,
/// using a common random polynomial as the second component of the
/// ciphertext; the aggregation of the encryptions is an encryption of the sum
/// of the shares.
#[derive(Debug)]
pub struct SharesToEncryptionProtocol {
    pub(crate) cks: SecretKeySwitchProtocol,
    zero: SecretKey,
}

impl SharesToEncryptionProtocol {
    /// Creates a new protocol instance with a smudging noise of standard
    /// deviation `sigma`.
    pub fn new(par: &Arc<BfvParameters>, sigma: f64) -> Result<Self> {
        Ok(Self {
            cks: SecretKeySwitchProtocol::new(par, sigma)?,
            zero: SecretKey::zero(par),
        })
    }

    /// Creates an instance sharing the parameters of `self`, with its own
    /// scratch buffers.
    pub fn duplicate(&self) -> Self {
        Self {
            cks: self.cks.duplicate(),
            zero: SecretKey::zero(&self.cks.par),
        }
    }

    /// Allocates a share at a given level.
    pub fn allocate_share(&self, level: usize) -> Result<SecretKeySwitchShare> {
        self.cks.allocate_share(level)
    }

    /// Generates the share of a party, at the level of `c0_share_out`.
    ///
    /// The common random polynomial must be at a level larger or equal to
    /// the level of the share.
    pub fn gen_share<R: RngCore + CryptoRng>(
        &mut self,
        sk: &SecretKey,
        crp: &CommonRandomPoly,
        secret_share: &AdditiveShare,
        c0_share_out: &mut SecretKeySwitchShare,
        rng: &mut R,
    ) -> Result<()> {
        self.gen_share_with_randomness(sk, crp, secret_share, c0_share_out, rng)
            .map(|_| ())
    }

    pub(crate) fn gen_share_with_randomness<R: RngCore + CryptoRng>(
        &mut self,
        sk: &SecretKey,
        crp: &CommonRandomPoly,
        secret_share: &AdditiveShare,
        c0_share_out: &mut SecretKeySwitchShare,
        rng: &mut R,
    ) -> Result<SmudgingRandomness> {
        let par = self.cks.par.clone();
        if sk.par != par || secret_share.par != par {
            return Err(Error::DefaultError(
                "Incompatible BFV parameters".to_string(),
            ));
        }
        let level = c0_share_out.level;
        if crp.level < level {
            return Err(Error::InvalidLevel(level, crp.level));
        }

        let c1 = crp.poly_at_level(&par, level)?;
        let randomness = self
            .cks
            .share_of_c1(&self.zero, sk, &c1, c0_share_out, rng)?;

        let mut scaled = Zeroizing::new(par.scale_up(&secret_share.coeffs, level)?);
        scaled.change_representation(Representation::Ntt);
        c0_share_out.value += scaled.as_ref();
        Ok(randomness)
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
        self.cks.aggregate_shares(share1, share2, share_out)
    }

    /// Sets `ct_out` to the encryption `(c0_agg, crp)` at the level of the
    /// aggregated share.
    ///
    /// Panics if `ct_out` does not have exactly two polynomials.
    pub fn get_encryption(
        &self,
        c0_agg: &SecretKeySwitchShare,
        crp: &CommonRandomPoly,
        ct_out: &mut Ciphertext,
    ) -> Result<()> {
        assert_eq!(ct_out.len(), 2, "The output ciphertext must have degree 1");
        if ct_out.par != self.cks.par || c0_agg.par != self.cks.par {
            return Err(Error::DefaultError(
                "Incompatible BFV parameters".to_string(),
            ));
        }
        let c1 = crp.poly_at_level(&self.cks.par, c0_agg.level)?;
        ct_out.c = vec![c0_agg.value.clone(), c1];
        ct_out.level = c0_agg.level;
        Ok(())
    }
}

/// The encryption-to-shares protocol, retaining the smudging error sampled by
/// the last share generation.
#[derive(Debug)]
pub struct NizkEncryptionToSharesProtocol {
    protocol: EncryptionToSharesProtocol,
    randomness: RandomnessSlot<SmudgingRandomness>,
}

impl NizkEncryptionToSharesProtocol {
    /// Creates a new protocol instance with a smudging noise of standard
    /// deviation `sigma`.
    pub fn new(par: &Arc<BfvParameters>, sigma: f64) -> Result<Self> {
        Ok(Self {
            protocol: EncryptionToSharesProtocol::new(par, sigma)?,
            randomness: RandomnessSlot::default(),
        })
    }

    /// Creates an instance sharing the parameters of `self`, with a deep copy
    /// of the captured randomness.
    pub fn duplicate(&self) -> Self {
        Self {
            protocol: self.protocol.duplicate(),
            randomness: self.randomness.clone(),
        }
    }

    /// Allocates a public share at a given level.
    pub fn allocate_share(&self, level: usize) -> Result<SecretKeySwitchShare> {
        self.protocol.allocate_share(level)
    }

    /// See [`EncryptionToSharesProtocol::gen_share`]; the smudging error is
    /// captured.
    pub fn gen_share<R: RngCore + CryptoRng>(
        &mut self,
        sk: &SecretKey,
        ct: &Ciphertext,
        secret_share_out: &mut AdditiveShare,
        public_share_out: &mut SecretKeySwitchShare,
        rng: &mut R,
    ) -> Result<()> {
        let randomness = self.protocol.gen_share_with_randomness(
            sk,
            ct,
            secret_share_out,
            public_share_out,
            rng,
        )?;
        self.randomness.capture(randomness);
        Ok(())
    }

    /// See [`EncryptionToSharesProtocol::aggregate_shares`].
    pub fn aggregate_shares(
        &self,
        share1: &SecretKeySwitchShare,
        share2: &SecretKeySwitchShare,
        share_out: &mut SecretKeySwitchShare,
    ) {
        self.protocol.aggregate_shares(share1, share2, share_out)
    }

    /// See [`EncryptionToSharesProtocol::get_share`].
    pub fn get_share(
        &self,
        own_share: Option<&AdditiveShare>,
        aggregated: AggregatedPublicShare,
        ct: &Ciphertext,
        secret_share_out: &mut AdditiveShare,
    ) -> Result<()> {
        self.protocol
            .get_share(own_share, aggregated, ct, secret_share_out)
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

/// The shares-to-encryption protocol, retaining the smudging error sampled by
/// the last share generation.
#[derive(Debug)]
pub struct NizkSharesToEncryptionProtocol {
    protocol: SharesToEncryptionProtocol,
    randomness: RandomnessSlot<SmudgingRandomness>,
}

impl NizkSharesToEncryptionProtocol {
    /// Creates a new protocol instance with a smudging noise of standard
    /// deviation `sigma`.
    pub fn new(par: &Arc<BfvParameters>, sigma: f64) -> Result<Self> {
        Ok(Self {
            protocol: SharesToEncryptionProtocol::new(par, sigma)?,
            randomness: RandomnessSlot::default(),
        })
    }

    /// Creates an instance sharing the parameters of `self`, with a deep copy
    /// of the captured randomness.
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

    /// See [`SharesToEncryptionProtocol::gen_share`]; the smudging error is
    /// captured.
    pub fn gen_share<R: RngCore + CryptoRng>(
        &mut self,
        sk: &SecretKey,
        crp: &CommonRandomPoly,
        secret_share: &AdditiveShare,
        c0_share_out: &mut SecretKeySwitchShare,
        rng: &mut R,
    ) -> Result<()> {
        let randomness =
            self.protocol
                .gen_share_with_randomness(sk, crp, secret_share, c0_share_out, rng)?;
        self.randomness.capture(randomness);
        Ok(())
    }

    /// See [`SharesToEncryptionProtocol::aggregate_shares`].
    pub fn aggregate_shares(
        &self,
        share1: &SecretKeySwitchShare,
        share2: &SecretKeySwitchShare,
        share_out: &mut SecretKeySwitchShare,
    ) {
        self.protocol.aggregate_shares(share1, share2, share_out)
    }

    /// See [`SharesToEncryptionProtocol::get_encryption`].
    pub fn get_encryption(
        &self,
        c0_agg: &SecretKeySwitchShare,
        crp: &CommonRandomPoly,
        ct_out: &mut Ciphertext,
    ) -> Result<()> {
        self.protocol.get_encryption(c0_agg, crp, ct_out)
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
