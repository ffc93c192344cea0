use std::sync::Arc;

use crate::bfv::BfvParameters;
use crate::Result;
use mhe_math::rq::{Poly, Representation};
use rand::{CryptoRng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sha2::{Digest, Sha256};

/// A polynomial sampled from a random _common reference string_.
///
/// Every party must derive the same polynomial for a given round, either by
/// reading a common reference string in the same order, or by deriving it
/// from a common seed with [`CommonRandomPoly::from_seed`].
///
/// The polynomial is defined modulo the ciphertext moduli of a level and, for
/// the collective public key generation, also modulo the auxiliary moduli.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct CommonRandomPoly {
    pub(crate) poly: Poly,
    pub(crate) poly_p: Option<Poly>,
    pub(crate) level: usize,
}

impl CommonRandomPoly {
    /// Generate a new random CRP at the maximum level, extended to the
    /// auxiliary moduli when the parameters have some. This is the CRP used
    /// by the collective public key generation.
    pub fn new<R: RngCore + CryptoRng>(par: &Arc<BfvParameters>, rng: &mut R) -> Result<Self> {
        let mut crp = Self::new_leveled(par, par.max_level(), rng)?;
        crp.poly_p = par
            .extender
            .as_ref()
            .map(|extender| Poly::random(extender.ctx_p(), Representation::Ntt, rng));
        Ok(crp)
    }

    /// Generate a new random CRP at a given level, defined only modulo the
    /// ciphertext moduli. This is the CRP used by the conversion from shares
    /// to an encryption.
    pub fn new_leveled<R: RngCore + CryptoRng>(
        par: &Arc<BfvParameters>,
        level: usize,
        rng: &mut R,
    ) -> Result<Self> {
        let ctx = par.ctx_at_level(level)?;
        let poly = Poly::random(ctx, Representation::Ntt, rng);
        Ok(Self {
            poly,
            poly_p: None,
            level,
        })
    }

    /// Derive a CRP at a given level from a common seed of arbitrary length.
    pub fn from_seed(par: &Arc<BfvParameters>, level: usize, seed: &[u8]) -> Result<Self> {
        let mut rng = ChaCha8Rng::from_seed(Sha256::digest(seed).into());
        Self::new_leveled(par, level, &mut rng)
    }

    /// Returns the level of the CRP.
    pub fn level(&self) -> usize {
        self.level
    }

    /// The CRP reduced modulo the ciphertext moduli of a lower level.
    pub(crate) fn poly_at_level(&self, par: &BfvParameters, level: usize) -> Result<Poly> {
        let mut poly = self.poly.clone();
        poly.truncate_to(par.ctx_at_level(level)?)?;
        Ok(poly)
    }
}

#[cfg(test)]
mod tests {
    use super::CommonRandomPoly;
    use crate::bfv::BfvParameters;
    use rand::thread_rng;
    use std::error::Error;

    #[test]
    fn levels() -> Result<(), Box<dyn Error>> {
        let mut rng = thread_rng();
        let par = BfvParameters::default_arc(3, 16);
        let crp = CommonRandomPoly::new(&par, &mut rng)?;
        assert_eq!(crp.level(), par.max_level());
        assert!(crp.poly_p.is_some());

        for level in 0..=par.max_level() {
            let crp = CommonRandomPoly::new_leveled(&par, level, &mut rng)?;
            assert_eq!(crp.level(), level);
            assert_eq!(par.level_of_ctx(crp.poly.ctx())?, level);
            assert!(crp.poly_p.is_none());
        }
        assert!(CommonRandomPoly::new_leveled(&par, 3, &mut rng).is_err());
        Ok(())
    }

    #[test]
    fn from_seed_is_deterministic() -> Result<(), Box<dyn Error>> {
        let par = BfvParameters::default_arc(2, 16);
        let a = CommonRandomPoly::from_seed(&par, 1, b"round 1")?;
        let b = CommonRandomPoly::from_seed(&par, 1, b"round 1")?;
        let c = CommonRandomPoly::from_seed(&par, 1, b"round 2")?;
        assert_eq!(a, b);
        assert_ne!(a, c);
        Ok(())
    }

    #[test]
    fn from_hex_seed() -> Result<(), Box<dyn Error>> {
        let par = BfvParameters::default_arc(1, 16);
        let seed = hex::decode("6d756c7469706172747920726f756e642030")?;
        assert_eq!(
            CommonRandomPoly::from_seed(&par, 0, &seed)?,
            CommonRandomPoly::from_seed(&par, 0, b"multiparty round 0")?
        );
        Ok(())
    }

    #[test]
    fn truncation() -> Result<(), Box<dyn Error>> {
        let par = BfvParameters::default_arc(3, 16);
        let crp = CommonRandomPoly::from_seed(&par, 2, b"seed")?;
        let low = crp.poly_at_level(&par, 0)?;
        assert_eq!(par.level_of_ctx(low.ctx())?, 0);
        assert_eq!(
            low.coefficients().row(0),
            crp.poly.coefficients().row(0)
        );
        assert!(crp.poly_at_level(&par, 3).is_err());
        Ok(())
    }
}
