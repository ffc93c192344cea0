use std::sync::Arc;

use rand::{CryptoRng, RngCore};

use crate::bfv::{BfvParameters, Ciphertext, SecretKey};
use crate::Result;

use super::masked_transform::{
    MaskedTransformProtocol, MaskedTransformShare, NizkMaskedTransformProtocol,
};
use super::nizk::MaskedTransformRandomness;
use super::CommonRandomPoly;

/// A party's share in the refresh protocol.
pub type RefreshShare = MaskedTransformShare;

/// The refresh protocol.
///
/// The parties collectively re-encrypt a ciphertext under the same key and
/// with the same parameters, resetting its noise, without learning its
/// plaintext. This is the masked transform protocol with the identity as
/// transformation.
#[derive(Debug)]
pub struct RefreshProtocol {
    protocol: MaskedTransformProtocol,
}

impl RefreshProtocol {
    /// Creates a new protocol instance with a smudging noise of standard
    /// deviation `sigma`.
    pub fn new(par: &Arc<BfvParameters>, sigma: f64) -> Result<Self> {
        Ok(Self {
            protocol: MaskedTransformProtocol::new(par, par, sigma)?,
        })
    }

    /// Creates an instance sharing the parameters of `self`, with its own
    /// scratch buffers.
    pub fn duplicate(&self) -> Self {
        Self {
            protocol: self.protocol.duplicate(),
        }
    }

    /// Samples a common random polynomial at a given output level.
    pub fn sample_crp<R: RngCore + CryptoRng>(
        &self,
        level: usize,
        rng: &mut R,
    ) -> Result<CommonRandomPoly> {
        self.protocol.sample_crp(level, rng)
    }

    /// Allocates a share, whose components are at the input and output levels.
    pub fn allocate_share(&self, level_in: usize, level_out: usize) -> Result<RefreshShare> {
        self.protocol.allocate_share(level_in, level_out)
    }

    /// Generates the share of a party.
    pub fn gen_share<R: RngCore + CryptoRng>(
        &mut self,
        sk: &SecretKey,
        ct: &Ciphertext,
        crp: &CommonRandomPoly,
        share_out: &mut RefreshShare,
        rng: &mut R,
    ) -> Result<()> {
        self.protocol
            .gen_share(sk, sk, ct, crp, None, share_out, rng)
    }

    /// Sets `share_out` to the sum of `share1` and `share2`.
    ///
    /// Panics if the shares are not at the same levels.
    pub fn aggregate_shares(
        &self,
        share1: &RefreshShare,
        share2: &RefreshShare,
        share_out: &mut RefreshShare,
    ) {
        self.protocol.aggregate_shares(share1, share2, share_out)
    }

    /// Computes the refreshed encryption `ct_out` of the plaintext of `ct`.
    pub fn finalize(
        &self,
        ct: &Ciphertext,
        crp: &CommonRandomPoly,
        aggregated: &RefreshShare,
        ct_out: &mut Ciphertext,
    ) -> Result<()> {
        self.protocol.transform(ct, None, crp, aggregated, ct_out)
    }
}

/// The refresh protocol, retaining the mask and the smudging errors sampled by
/// the last share generation.
#[derive(Debug)]
pub struct NizkRefreshProtocol {
    protocol: NizkMaskedTransformProtocol,
}

impl NizkRefreshProtocol {
    /// See [`RefreshProtocol::new`].
    pub fn new(par: &Arc<BfvParameters>, sigma: f64) -> Result<Self> {
        Ok(Self {
            protocol: NizkMaskedTransformProtocol::new(par, par, sigma)?,
        })
    }

    /// Creates an instance sharing the parameters of `self`, with a deep copy
    /// of the captured randomness.
    pub fn duplicate(&self) -> Self {
        Self {
            protocol: self.protocol.duplicate(),
        }
    }

    /// See [`RefreshProtocol::sample_crp`].
    pub fn sample_crp<R: RngCore + CryptoRng>(
        &self,
        level: usize,
        rng: &mut R,
    ) -> Result<CommonRandomPoly> {
        self.protocol.sample_crp(level, rng)
    }

    /// See [`RefreshProtocol::allocate_share`].
    pub fn allocate_share(&self, level_in: usize, level_out: usize) -> Result<RefreshShare> {
        self.protocol.allocate_share(level_in, level_out)
    }

    /// See [`RefreshProtocol::gen_share`]; the randomness is captured.
    pub fn gen_share<R: RngCore + CryptoRng>(
        &mut self,
        sk: &SecretKey,
        ct: &Ciphertext,
        crp: &CommonRandomPoly,
        share_out: &mut RefreshShare,
        rng: &mut R,
    ) -> Result<()> {
        self.protocol
            .gen_share(sk, sk, ct, crp, None, share_out, rng)
    }

    /// See [`RefreshProtocol::aggregate_shares`].
    pub fn aggregate_shares(
        &self,
        share1: &RefreshShare,
        share2: &RefreshShare,
        share_out: &mut RefreshShare,
    ) {
        self.protocol.aggregate_shares(share1, share2, share_out)
    }

    /// See [`RefreshProtocol::finalize`].
    pub fn finalize(
        &self,
        ct: &Ciphertext,
        crp: &CommonRandomPoly,
        aggregated: &RefreshShare,
        ct_out: &mut Ciphertext,
    ) -> Result<()> {
        self.protocol.transform(ct, None, crp, aggregated, ct_out)
    }

    /// Returns the randomness sampled by the last share generation.
    pub fn randomness(&self) -> Result<&MaskedTransformRandomness> {
        self.protocol.randomness()
    }

    /// Returns the serialization of `(mask, e0, e1)` sampled by the last share
    /// generation; see [`MaskedTransformRandomness::to_bytes`] for the
    /// encoding of each component.
    pub fn export_randomness(&self) -> Result<(Vec<u8>, Vec<u8>, Vec<u8>)> {
        self.protocol.export_randomness()
    }
}
