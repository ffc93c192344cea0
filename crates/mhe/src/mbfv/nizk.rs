//! Retention of the ephemeral randomness sampled during share generation.
//!
//! The `Nizk` variants of the protocols behave exactly as the base protocols,
//! but keep the randomness sampled by the last share generation so that a
//! proof system can later attest that the share was honestly computed.

use super::AdditiveShare;
use crate::{Error, Result};
use mhe_math::rq::Poly;
use mhe_traits::Serialize;
use zeroize::Zeroize;
use zeroize_derive::{Zeroize, ZeroizeOnDrop};

/// Slot holding the randomness of the last share generation, if any.
///
/// The slot is overwritten by each share generation, and cloning the slot
/// deep-copies the randomness.
#[derive(Debug, Clone)]
pub(crate) struct RandomnessSlot<T: Zeroize>(Option<T>);

impl<T: Zeroize> Default for RandomnessSlot<T> {
    fn default() -> Self {
        Self(None)
    }
}

impl<T: Zeroize> RandomnessSlot<T> {
    /// Replace the captured randomness, erasing the previous one.
    pub(crate) fn capture(&mut self, randomness: T) {
        if let Some(previous) = self.0.as_mut() {
            previous.zeroize()
        }
        self.0 = Some(randomness)
    }

    /// Returns the captured randomness, or an error if no share was generated.
    pub(crate) fn get(&self) -> Result<&T> {
        self.0.as_ref().ok_or(Error::RandomnessNotCaptured)
    }
}

/// The smudging error sampled by a key switching share generation, in
/// PowerBasis representation.
#[derive(Debug, Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SmudgingRandomness {
    /// The smudging error.
    pub e: Poly,
}

impl SmudgingRandomness {
    /// Serialize the smudging error.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.e.to_bytes()
    }
}

/// The randomness sampled by a public key switching share generation.
#[derive(Debug, Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct PublicKeySwitchRandomness {
    /// The ephemeral ternary secret, in Ntt representation.
    pub u: Poly,
    /// The error added to the first component, in PowerBasis representation.
    pub e0: Poly,
    /// The error added to the second component, in PowerBasis representation.
    pub e1: Poly,
}

impl PublicKeySwitchRandomness {
    /// Serialize the randomness as `(u, e0, e1)`.
    pub fn to_bytes(&self) -> (Vec<u8>, Vec<u8>, Vec<u8>) {
        (self.u.to_bytes(), self.e0.to_bytes(), self.e1.to_bytes())
    }
}

/// The randomness sampled by a masked transform share generation.
#[derive(Debug, Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct MaskedTransformRandomness {
    /// The additive share used as a mask, after the transformation.
    pub mask: AdditiveShare,
    /// The smudging error of the conversion to shares, in PowerBasis
    /// representation.
    pub e0: Poly,
    /// The smudging error of the conversion to an encryption, in PowerBasis
    /// representation.
    pub e1: Poly,
}

impl MaskedTransformRandomness {
    /// Serialize the randomness as `(mask, e0, e1)`.
    ///
    /// The mask is a polynomial modulo the plaintext modulus, and is
    /// serialized as an [`AdditiveShare`], with its coefficients packed on
    /// the bit size of the plaintext modulus. The errors use the polynomial
    /// serialization over the ciphertext moduli.
    pub fn to_bytes(&self) -> (Vec<u8>, Vec<u8>, Vec<u8>) {
        (self.mask.to_bytes(), self.e0.to_bytes(), self.e1.to_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::{RandomnessSlot, SmudgingRandomness};
    use crate::bfv::BfvParameters;
    use crate::Error;
    use mhe_math::rq::{Poly, Representation};
    use rand::thread_rng;

    #[test]
    fn slot() -> Result<(), Box<dyn std::error::Error>> {
        let mut rng = thread_rng();
        let par = BfvParameters::default_arc(1, 16);
        let ctx = par.ctx_at_level(0)?;

        let mut slot = RandomnessSlot::<SmudgingRandomness>::default();
        assert_eq!(slot.get().err(), Some(Error::RandomnessNotCaptured));

        let e = Poly::random(ctx, Representation::PowerBasis, &mut rng);
        slot.capture(SmudgingRandomness { e: e.clone() });
        assert_eq!(slot.get()?.e, e);

        // Clones do not alias the captured randomness.
        let copy = slot.clone();
        let other = Poly::random(ctx, Representation::PowerBasis, &mut rng);
        slot.capture(SmudgingRandomness { e: other.clone() });
        assert_eq!(copy.get()?.e, e);
        assert_eq!(slot.get()?.e, other);
        Ok(())
    }
}
