use std::sync::Arc;

use mhe_math::rq::{traits::TryConvertFrom, Poly, Representation};
use mhe_traits::{DeserializeParametrized, DeserializeWithContext, FheParametrized, Serialize};
use mhe_util::sample_vec_ternary;
use rand::{CryptoRng, RngCore};
use zeroize::Zeroizing;

use crate::bfv::{BfvParameters, Ciphertext, PublicKey, SecretKey};
use crate::{Error, Result};

use super::nizk::{PublicKeySwitchRandomness, RandomnessSlot};
use super::secret_key_switch::{check_degree_one, Smudging};
use super::Aggregate;

/// A party's share in the collective public key switching protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKeySwitchShare {
    pub(crate) par: Arc<BfvParameters>,
    pub(crate) h0: Poly,
    pub(crate) h1: Poly,
    pub(crate) level: usize,
}

impl PublicKeySwitchShare {
    fn zero(par: &Arc<BfvParameters>, level: usize) -> Result<Self> {
        let ctx = par.ctx_at_level(level)?;
        Ok(Self {
            par: par.clone(),
            h0: Poly::zero(ctx, Representation::Ntt),
            h1: Poly::zero(ctx, Representation::Ntt),
            level,
        })
    }

    /// Returns the level of the share.
    pub fn level(&self) -> usize {
        self.level
    }

    fn set_sum(&mut self, a: &Self, b: &Self) {
        assert_eq!(
            a.level, b.level,
            "Cannot aggregate shares at different levels"
        );
        self.h0 = &a.h0 + &b.h0;
        self.h1 = &a.h1 + &b.h1;
        self.level = a.level;
    }
}

impl FheParametrized for PublicKeySwitchShare {
    type Parameters = BfvParameters;
}

/// The share is serialized as the concatenation of its two polynomials.
impl Serialize for PublicKeySwitchShare {
    fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = self.h0.to_bytes();
        bytes.extend(self.h1.to_bytes());
        bytes
    }
}

impl DeserializeParametrized for PublicKeySwitchShare {
    type Error = Error;

    /// Both polynomials are assumed to be at the same level, which is
    /// inferred from the length of the bytes.
    fn from_bytes(bytes: &[u8], par: &Arc<BfvParameters>) -> Result<Self> {
        if bytes.len() % 2 != 0 {
            return Err(Error::SerializationError);
        }
        let (b0, b1) = bytes.split_at(bytes.len() / 2);
        let level = (0..=par.max_level())
            .find(|level| {
                par.ctx_at_level(*level)
                    .is_ok_and(|ctx| Poly::serialization_length(ctx) == b0.len())
            })
            .ok_or(Error::SerializationError)?;
        let ctx = par.ctx_at_level(level)?;
        let h0 = Poly::from_bytes(b0, ctx)?;
        let h1 = Poly::from_bytes(b1, ctx)?;
        if h0.representation() != &Representation::Ntt
            || h1.representation() != &Representation::Ntt
        {
            return Err(Error::SerializationError);
        }
        Ok(Self {
            par: par.clone(),
            h0,
            h1,
            level,
        })
    }
}

/// Shares at different levels cannot be aggregated, and aggregating them
/// panics.
impl Aggregate<PublicKeySwitchShare> for PublicKeySwitchShare {
    fn from_shares<T>(iter: T) -> Result<Self>
    where
        T: IntoIterator<Item = PublicKeySwitchShare>,
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

/// The collective public key switching protocol.
///
/// Parties holding additive shares `s_i` of a collective key `s` re-encrypt a
/// ciphertext under `s` into a ciphertext under the secret key associated to
/// a public key `pk`. Each party computes the encryption of zero
/// `(u_i * pk0 + e0_i, u_i * pk1 + e1_i)`, and adds `s_i * c1` to its first
/// component; when the parameters have auxiliary moduli, `u_i * pk` is
/// computed modulo `q * p` and divided by `p` to reduce its noise.
#[derive(Debug)]
pub struct PublicKeySwitchProtocol {
    pub(crate) par: Arc<BfvParameters>,
    smudging: Smudging,
}

impl PublicKeySwitchProtocol {
    /// Creates a new protocol instance with a smudging noise of standard
    /// deviation `sigma`.
    ///
    /// Returns an error if `sigma` is not a strictly positive number.
    pub fn new(par: &Arc<BfvParameters>, sigma: f64) -> Result<Self> {
        Ok(Self {
            par: par.clone(),
            smudging: Smudging::new(sigma)?,
        })
    }

    /// Creates an instance sharing the parameters of `self`.
    pub fn duplicate(&self) -> Self {
        Self {
            par: self.par.clone(),
            smudging: self.smudging,
        }
    }

    /// Allocates a share at a given level.
    pub fn allocate_share(&self, level: usize) -> Result<PublicKeySwitchShare> {
        PublicKeySwitchShare::zero(&self.par, level)
    }

    /// Generates the share of a party switching the ciphertext from
    /// `sk` to the public key `pk`.
    ///
    /// The share is computed at the lowest level between the level of
    /// `share_out` and the level of the ciphertext.
    pub fn gen_share<R: RngCore + CryptoRng>(
        &self,
        sk: &SecretKey,
        pk: &PublicKey,
        ct: &Ciphertext,
        share_out: &mut PublicKeySwitchShare,
        rng: &mut R,
    ) -> Result<()> {
        self.gen_share_with_randomness(sk, pk, ct, share_out, rng)
            .map(|_| ())
    }

    pub(crate) fn gen_share_with_randomness<R: RngCore + CryptoRng>(
        &self,
        sk: &SecretKey,
        pk: &PublicKey,
        ct: &Ciphertext,
        share_out: &mut PublicKeySwitchShare,
        rng: &mut R,
    ) -> Result<PublicKeySwitchRandomness> {
        if sk.par != self.par || pk.par != self.par || ct.par != self.par {
            return Err(Error::DefaultError(
                "Incompatible BFV parameters".to_string(),
            ));
        }
        check_degree_one(ct)?;
        if self.par.extender.is_some() && pk.c_p.is_none() {
            return Err(Error::UnspecifiedInput(
                "The public key is not defined modulo the auxiliary moduli".to_string(),
            ));
        }

        let level = share_out.level.min(ct.level);
        let ctx = self.par.ctx_at_level(level)?;
        let c1 = if ct.level > level {
            let mut ct = ct.clone();
            ct.mod_switch_to_level(level)?;
            ct.c[1].clone()
        } else {
            ct.c[1].clone()
        };

        let u_coeffs = Zeroizing::new(sample_vec_ternary(self.par.degree(), rng));
        let u = Zeroizing::new(Poly::try_convert_from(
            u_coeffs.as_slice(),
            ctx,
            Representation::Ntt,
        )?);

        // h_j = u * pk_j modulo q_l, divided by p when the key is also
        // defined modulo p.
        let mut h = Vec::with_capacity(2);
        for j in 0..2 {
            let mut pk_j = pk.c[j].clone();
            pk_j.truncate_to(ctx)?;
            let mut h_j = u.as_ref() * &pk_j;
            h_j.change_representation(Representation::PowerBasis);
            if let (Some(extender), Some(c_p)) = (&self.par.extender, &pk.c_p) {
                let u_p = Zeroizing::new(Poly::try_convert_from(
                    u_coeffs.as_slice(),
                    extender.ctx_p(),
                    Representation::Ntt,
                )?);
                let mut h_j_p = u_p.as_ref() * &c_p[j];
                h_j_p.change_representation(Representation::PowerBasis);
                extender.mod_down(&mut h_j, &h_j_p)?;
            }
            h.push(h_j);
        }
        let mut h1 = h.pop().ok_or(Error::TooFewValues(0, 2))?;
        let mut h0 = h.pop().ok_or(Error::TooFewValues(1, 2))?;

        let e0_coeffs = self.smudging.sample(self.par.degree(), rng)?;
        let e1_coeffs = self.smudging.sample(self.par.degree(), rng)?;
        let e0 = Poly::try_convert_from(e0_coeffs.as_slice(), ctx, Representation::PowerBasis)?;
        let e1 = Poly::try_convert_from(e1_coeffs.as_slice(), ctx, Representation::PowerBasis)?;
        h0 += &e0;
        h1 += &e1;
        h0.change_representation(Representation::Ntt);
        h1.change_representation(Representation::Ntt);

        // h0 += s * c1
        let s = sk.poly_in(ctx)?;
        h0 += &(s.as_ref() * &c1);

        log::trace!("public key switch share generated at level {level}");
        share_out.h0 = h0;
        share_out.h1 = h1;
        share_out.level = level;

        Ok(PublicKeySwitchRandomness {
            u: u.as_ref().clone(),
            e0,
            e1,
        })
    }

    /// Sets `share_out` to the sum of `share1` and `share2`.
    ///
    /// Panics if the two shares are not at the same level.
    pub fn aggregate_shares(
        &self,
        share1: &PublicKeySwitchShare,
        share2: &PublicKeySwitchShare,
        share_out: &mut PublicKeySwitchShare,
    ) {
        share_out.set_sum(share1, share2)
    }

    /// Re-encrypts `ct_in` under the public key using the aggregation of the
    /// shares of all the parties: `(c0 + h0, h1)`.
    ///
    /// When `ct_in` is at a higher level than the share, it is first switched
    /// down to the level of the share.
    pub fn key_switch(
        &self,
        ct_in: &Ciphertext,
        combined: &PublicKeySwitchShare,
        ct_out: &mut Ciphertext,
    ) -> Result<()> {
        if combined.par != self.par {
            return Err(Error::DefaultError(
                "Incompatible BFV parameters".to_string(),
            ));
        }
        check_degree_one(ct_in)?;
        let mut ct = ct_in.clone();
        ct.mod_switch_to_level(combined.level)?;
        ct.c[0] += &combined.h0;
        ct.c[1].clone_from(&combined.h1);
        *ct_out = ct;
        Ok(())
    }
}

/// The collective public key switching protocol, retaining the ephemeral
/// secret and the smudging errors sampled by the last share generation.
#[derive(Debug)]
pub struct NizkPublicKeySwitchProtocol {
    protocol: PublicKeySwitchProtocol,
    randomness: RandomnessSlot<PublicKeySwitchRandomness>,
}

impl NizkPublicKeySwitchProtocol {
    /// Creates a new protocol instance with a smudging noise of standard
    /// deviation `sigma`.
    pub fn new(par: &Arc<BfvParameters>, sigma: f64) -> Result<Self> {
        Ok(Self {
            protocol: PublicKeySwitchProtocol::new(par, sigma)?,
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
    pub fn allocate_share(&self, level: usize) -> Result<PublicKeySwitchShare> {
        self.protocol.allocate_share(level)
    }

    /// See [`PublicKeySwitchProtocol::gen_share`]; the randomness is captured.
    pub fn gen_share<R: RngCore + CryptoRng>(
        &mut self,
        sk: &SecretKey,
        pk: &PublicKey,
        ct: &Ciphertext,
        share_out: &mut PublicKeySwitchShare,
        rng: &mut R,
    ) -> Result<()> {
        let randomness = self
            .protocol
            .gen_share_with_randomness(sk, pk, ct, share_out, rng)?;
        self.randomness.capture(randomness);
        Ok(())
    }

    /// See [`PublicKeySwitchProtocol::aggregate_shares`].
    pub fn aggregate_shares(
        &self,
        share1: &PublicKeySwitchShare,
        share2: &PublicKeySwitchShare,
        share_out: &mut PublicKeySwitchShare,
    ) {
        self.protocol.aggregate_shares(share1, share2, share_out)
    }

    /// See [`PublicKeySwitchProtocol::key_switch`].
    pub fn key_switch(
        &self,
        ct_in: &Ciphertext,
        combined: &PublicKeySwitchShare,
        ct_out: &mut Ciphertext,
    ) -> Result<()> {
        self.protocol.key_switch(ct_in, combined, ct_out)
    }

    /// Returns the randomness sampled by the last share generation.
    pub fn randomness(&self) -> Result<&PublicKeySwitchRandomness> {
        self.randomness.get()
    }

    /// Returns the serialization of `(u, e0, e1)` sampled by the last share
    /// generation.
    pub fn export_randomness(&self) -> Result<(Vec<u8>, Vec<u8>, Vec<u8>)> {
        Ok(self.randomness.get()?.to_bytes())
    }
}
