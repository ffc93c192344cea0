use std::fmt::Debug;
use std::sync::Arc;

use mhe_math::rq::Representation;
use mhe_traits::{DeserializeParametrized, FheParametrized, Serialize};
use rand::{CryptoRng, RngCore};
use zeroize::Zeroizing;

use crate::bfv::{BfvParameters, Ciphertext, SecretKey};
use crate::{Error, ParametersError, Result};

use super::nizk::{MaskedTransformRandomness, RandomnessSlot};
use super::secret_key_switch::SecretKeySwitchShare;
use super::sharing::{AdditiveShare, EncryptionToSharesProtocol, SharesToEncryptionProtocol};
use super::{Aggregate, CommonRandomPoly};

/// A linear function applied to the coefficients of the masked plaintext.
///
/// When `decode` is set, the function receives the SIMD slots of the mask
/// instead of its coefficients; when `encode` is set, its output is encoded
/// in the SIMD slots.
pub struct MaskedTransformFunc {
    decode: bool,
    func: Box<dyn Fn(&mut [u64]) + Send + Sync>,
    encode: bool,
}

impl MaskedTransformFunc {
    /// Creates a new transformation.
    pub fn new<F>(decode: bool, func: F, encode: bool) -> Self
    where
        F: Fn(&mut [u64]) + Send + Sync + 'static,
    {
        Self {
            decode,
            func: Box::new(func),
            encode,
        }
    }

    fn apply(&self, par: &BfvParameters, values: &[u64]) -> Result<Zeroizing<Vec<u64>>> {
        let mut coeffs = Zeroizing::new(if self.decode {
            par.simd_decode(values)?
        } else {
            values.to_vec()
        });
        (self.func)(coeffs.as_mut_slice());
        Ok(Zeroizing::new(if self.encode {
            par.simd_encode(&coeffs)?
        } else {
            par.plaintext.reduce_vec_new(&coeffs)
        }))
    }
}

impl Debug for MaskedTransformFunc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MaskedTransformFunc")
            .field("decode", &self.decode)
            .field("encode", &self.encode)
            .finish_non_exhaustive()
    }
}

/// A party's share in the masked transform protocol, made of a share of the
/// conversion to shares and a share of the conversion to an encryption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskedTransformShare {
    pub(crate) e2s_share: SecretKeySwitchShare,
    pub(crate) s2e_share: SecretKeySwitchShare,
}

impl MaskedTransformShare {
    /// The share of the conversion to shares, at the input level.
    pub fn e2s_share(&self) -> &SecretKeySwitchShare {
        &self.e2s_share
    }

    /// The share of the conversion to an encryption, at the output level.
    pub fn s2e_share(&self) -> &SecretKeySwitchShare {
        &self.s2e_share
    }

    /// Deserialize a share whose two components are defined with different
    /// parameters.
    ///
    /// The bytes are split in two halves, so the two components must have
    /// serializations of equal length.
    pub fn from_bytes_with_parameters(
        bytes: &[u8],
        par_in: &Arc<BfvParameters>,
        par_out: &Arc<BfvParameters>,
    ) -> Result<Self> {
        if bytes.len() % 2 != 0 {
            return Err(Error::SerializationError);
        }
        let (e2s_bytes, s2e_bytes) = bytes.split_at(bytes.len() / 2);
        Ok(Self {
            e2s_share: SecretKeySwitchShare::from_bytes(e2s_bytes, par_in)?,
            s2e_share: SecretKeySwitchShare::from_bytes(s2e_bytes, par_out)?,
        })
    }

    fn set_sum(&mut self, a: &Self, b: &Self) {
        self.e2s_share.set_sum(&a.e2s_share, &b.e2s_share);
        self.s2e_share.set_sum(&a.s2e_share, &b.s2e_share);
    }
}

impl FheParametrized for MaskedTransformShare {
    type Parameters = BfvParameters;
}

/// The share is serialized as the concatenation of its two components.
impl Serialize for MaskedTransformShare {
    fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = self.e2s_share.to_bytes();
        bytes.extend(self.s2e_share.to_bytes());
        bytes
    }
}

impl DeserializeParametrized for MaskedTransformShare {
    type Error = Error;

    fn from_bytes(bytes: &[u8], par: &Arc<BfvParameters>) -> Result<Self> {
        Self::from_bytes_with_parameters(bytes, par, par)
    }
}

/// Shares at different levels cannot be aggregated, and aggregating them
/// panics.
impl Aggregate<MaskedTransformShare> for MaskedTransformShare {
    fn from_shares<T>(iter: T) -> Result<Self>
    where
        T: IntoIterator<Item = MaskedTransformShare>,
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

/// The masked transform protocol.
///
/// The parties convert a ciphertext into additive shares of its plaintext,
/// apply a linear function to their shares, and convert the shares back into
/// an encryption under an output key, possibly with different parameters.
/// All of this happens in a single round, since the shares of both
/// conversions are generated at once.
#[derive(Debug)]
pub struct MaskedTransformProtocol {
    e2s: EncryptionToSharesProtocol,
    s2e: SharesToEncryptionProtocol,
}

impl MaskedTransformProtocol {
    /// Creates a new protocol instance converting ciphertexts with parameters
    /// `par_in` into ciphertexts with parameters `par_out`, with a smudging
    /// noise of standard deviation `sigma`.
    ///
    /// Returns an error if the degree of `par_in` is larger than the degree of
    /// `par_out`, or if the plaintext moduli differ.
    pub fn new(
        par_in: &Arc<BfvParameters>,
        par_out: &Arc<BfvParameters>,
        sigma: f64,
    ) -> Result<Self> {
        if par_in.degree() > par_out.degree() {
            return Err(Error::ParametersError(ParametersError::Incompatible(
                format!(
                    "The input degree {} is larger than the output degree {}",
                    par_in.degree(),
                    par_out.degree()
                ),
            )));
        }
        if par_in.plaintext() != par_out.plaintext() {
            return Err(Error::ParametersError(ParametersError::Incompatible(
                format!(
                    "The input plaintext modulus {} differs from the output plaintext modulus {}",
                    par_in.plaintext(),
                    par_out.plaintext()
                ),
            )));
        }
        Ok(Self {
            e2s: EncryptionToSharesProtocol::new(par_in, sigma)?,
            s2e: SharesToEncryptionProtocol::new(par_out, sigma)?,
        })
    }

    /// Creates an instance sharing the parameters of `self`, with its own
    /// scratch buffers.
    pub fn duplicate(&self) -> Self {
        Self {
            e2s: self.e2s.duplicate(),
            s2e: self.s2e.duplicate(),
        }
    }

    fn par_in(&self) -> &Arc<BfvParameters> {
        &self.e2s.cks.par
    }

    fn par_out(&self) -> &Arc<BfvParameters> {
        &self.s2e.cks.par
    }

    /// Samples a common random polynomial at a given output level.
    pub fn sample_crp<R: RngCore + CryptoRng>(
        &self,
        level: usize,
        rng: &mut R,
    ) -> Result<CommonRandomPoly> {
        CommonRandomPoly::new_leveled(self.par_out(), level, rng)
    }

    /// Allocates a share, whose components are at the input and output levels.
    pub fn allocate_share(&self, level_in: usize, level_out: usize) -> Result<MaskedTransformShare> {
        Ok(MaskedTransformShare {
            e2s_share: self.e2s.allocate_share(level_in)?,
            s2e_share: self.s2e.allocate_share(level_out)?,
        })
    }

    /// Applies the transformation to a share modulo the input plaintext
    /// modulus, and pads it to an additive share with the output parameters.
    fn transform_mask(
        &self,
        mask: &AdditiveShare,
        transform: Option<&MaskedTransformFunc>,
    ) -> Result<AdditiveShare> {
        let mut out = AdditiveShare::zero(self.par_out());
        let degree = self.par_in().degree();
        match transform {
            Some(transform) => {
                let values = transform.apply(self.par_in(), &mask.coeffs)?;
                out.coeffs[..degree].copy_from_slice(&values);
            }
            None => out.coeffs[..degree].copy_from_slice(&mask.coeffs),
        }
        Ok(out)
    }

    /// Generates the share of a party, switching the ciphertext from `sk_in`
    /// to `sk_out` while applying the transformation to the plaintext.
    #[allow(clippy::too_many_arguments)]
    pub fn gen_share<R: RngCore + CryptoRng>(
        &mut self,
        sk_in: &SecretKey,
        sk_out: &SecretKey,
        ct: &Ciphertext,
        crp: &CommonRandomPoly,
        transform: Option<&MaskedTransformFunc>,
        share_out: &mut MaskedTransformShare,
        rng: &mut R,
    ) -> Result<()> {
        self.gen_share_with_randomness(sk_in, sk_out, ct, crp, transform, share_out, rng)
            .map(|_| ())
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn gen_share_with_randomness<R: RngCore + CryptoRng>(
        &mut self,
        sk_in: &SecretKey,
        sk_out: &SecretKey,
        ct: &Ciphertext,
        crp: &CommonRandomPoly,
        transform: Option<&MaskedTransformFunc>,
        share_out: &mut MaskedTransformShare,
        rng: &mut R,
    ) -> Result<MaskedTransformRandomness> {
        let mut mask = AdditiveShare::zero(self.par_in());
        let e2s_randomness = self.e2s.gen_share_with_randomness(
            sk_in,
            ct,
            &mut mask,
            &mut share_out.e2s_share,
            rng,
        )?;

        let mask = self.transform_mask(&mask, transform)?;
        let s2e_randomness =
            self.s2e
                .gen_share_with_randomness(sk_out, crp, &mask, &mut share_out.s2e_share, rng)?;

        Ok(MaskedTransformRandomness {
            mask,
            e0: e2s_randomness.e.clone(),
            e1: s2e_randomness.e.clone(),
        })
    }

    /// Sets `share_out` to the sum of `share1` and `share2`.
    ///
    /// Panics if the shares are not at the same levels.
    pub fn aggregate_shares(
        &self,
        share1: &MaskedTransformShare,
        share2: &MaskedTransformShare,
        share_out: &mut MaskedTransformShare,
    ) {
        share_out.set_sum(share1, share2)
    }

    /// Computes the transformed encryption `ct_out` of the plaintext of `ct`,
    /// at the output level of the aggregated share.
    pub fn transform(
        &self,
        ct: &Ciphertext,
        transform: Option<&MaskedTransformFunc>,
        crp: &CommonRandomPoly,
        aggregated: &MaskedTransformShare,
        ct_out: &mut Ciphertext,
    ) -> Result<()> {
        let mut masked = AdditiveShare::zero(self.par_in());
        self.e2s
            .masked_plaintext(&aggregated.e2s_share, ct, &mut masked)?;
        let masked = self.transform_mask(&masked, transform)?;

        let level = aggregated.s2e_share.level;
        let mut c0 = self.par_out().scale_up(&masked.coeffs, level)?;
        c0.change_representation(Representation::Ntt);
        c0 += &aggregated.s2e_share.value;

        let c0_agg = SecretKeySwitchShare {
            par: self.par_out().clone(),
            value: c0,
            level,
        };
        self.s2e.get_encryption(&c0_agg, crp, ct_out)?;
        log::debug!("masked transform output at level {level}");
        Ok(())
    }
}

/// The masked transform protocol, retaining the transformed mask and the
/// smudging errors sampled by the last share generation.
#[derive(Debug)]
pub struct NizkMaskedTransformProtocol {
    protocol: MaskedTransformProtocol,
    randomness: RandomnessSlot<MaskedTransformRandomness>,
}

impl NizkMaskedTransformProtocol {
    /// See [`MaskedTransformProtocol::new`].
    pub fn new(
        par_in: &Arc<BfvParameters>,
        par_out: &Arc<BfvParameters>,
        sigma: f64,
    ) -> Result<Self> {
        Ok(Self {
            protocol: MaskedTransformProtocol::new(par_in, par_out, sigma)?,
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

    /// See [`MaskedTransformProtocol::sample_crp`].
    pub fn sample_crp<R: RngCore + CryptoRng>(
        &self,
        level: usize,
        rng: &mut R,
    ) -> Result<CommonRandomPoly> {
        self.protocol.sample_crp(level, rng)
    }

    /// See [`MaskedTransformProtocol::allocate_share`].
    pub fn allocate_share(&self, level_in: usize, level_out: usize) -> Result<MaskedTransformShare> {
        self.protocol.allocate_share(level_in, level_out)
    }

    /// See [`MaskedTransformProtocol::gen_share`]; the randomness is captured.
    #[allow(clippy::too_many_arguments)]
    pub fn gen_share<R: RngCore + CryptoRng>(
        &mut self,
        sk_in: &SecretKey,
        sk_out: &SecretKey,
        ct: &Ciphertext,
        crp: &CommonRandomPoly,
        transform: Option<&MaskedTransformFunc>,
        share_out: &mut MaskedTransformShare,
        rng: &mut R,
    ) -> Result<()> {
        let randomness = self.protocol.gen_share_with_randomness(
            sk_in, sk_out, ct, crp, transform, share_out, rng,
        )?;
        self.randomness.capture(randomness);
        Ok(())
    }

    /// See [`MaskedTransformProtocol::aggregate_shares`].
    pub fn aggregate_shares(
        &self,
        share1: &MaskedTransformShare,
        share2: &MaskedTransformShare,
        share_out: &mut MaskedTransformShare,
    ) {
        self.protocol.aggregate_shares(share1, share2, share_out)
    }

    /// See [`MaskedTransformProtocol::transform`].
    pub fn transform(
        &self,
        ct: &Ciphertext,
        transform: Option<&MaskedTransformFunc>,
        crp: &CommonRandomPoly,
        aggregated: &MaskedTransformShare,
        ct_out: &mut Ciphertext,
    ) -> Result<()> {
        self.protocol
            .transform(ct, transform, crp, aggregated, ct_out)
    }

    /// Returns the randomness sampled by the last share generation.
    pub fn randomness(&self) -> Result<&MaskedTransformRandomness> {
        self.randomness.get()
    }

    /// Returns the serialization of `(mask, e0, e1)` sampled by the last share
    /// generation; see [`MaskedTransformRandomness::to_bytes`] for the
    /// encoding of each component.
    pub fn export_randomness(&self) -> Result<(Vec<u8>, Vec<u8>, Vec<u8>)> {
        Ok(self.randomness.get()?.to_bytes())
    }
}
