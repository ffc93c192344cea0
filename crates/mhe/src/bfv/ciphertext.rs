//! Ciphertext type in the BFV encryption scheme.

use crate::bfv::BfvParameters;
use crate::{Error, Result};
use mhe_math::rq::{Poly, Representation};
use mhe_traits::{
    DeserializeParametrized, DeserializeWithContext, FheCiphertext, FheParametrized, Serialize,
};
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

/// A ciphertext encrypting a plaintext.
///
/// The polynomials are kept in Ntt representation, and are all defined over
/// the context of the ciphertext level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ciphertext {
    /// The parameters of the underlying BFV encryption scheme.
    pub(crate) par: Arc<BfvParameters>,

    /// The ciphertext elements.
    pub(crate) c: Vec<Poly>,

    /// The ciphertext level
    pub(crate) level: usize,
}

impl Deref for Ciphertext {
    type Target = [Poly];

    fn deref(&self) -> &Self::Target {
        &self.c
    }
}

impl DerefMut for Ciphertext {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.c
    }
}

impl Ciphertext {
    /// Create a ciphertext from a vector of polynomials.
    /// A ciphertext must contain at least two polynomials, and all polynomials
    /// must be in Ntt representation and with the same context.
    pub fn new(c: Vec<Poly>, par: &Arc<BfvParameters>) -> Result<Self> {
        if c.len() < 2 {
            return Err(Error::TooFewValues(c.len(), 2));
        }

        let ctx = c[0].ctx();
        let level = par.level_of_ctx(ctx)?;

        // Check that all polynomials have the expected representation and context.
        for ci in c.iter() {
            if ci.representation() != &Representation::Ntt {
                return Err(Error::MathError(mhe_math::Error::IncorrectRepresentation(
                    *ci.representation(),
                    Representation::Ntt,
                )));
            }
            if ci.ctx() != ctx {
                return Err(Error::MathError(mhe_math::Error::InvalidContext));
            }
        }

        Ok(Self {
            par: par.clone(),
            c,
            level,
        })
    }

    /// Generate the zero ciphertext of degree 1 at a given level, which can
    /// be used as an output buffer.
    pub fn zero(par: &Arc<BfvParameters>, level: usize) -> Result<Self> {
        let ctx = par.ctx_at_level(level)?;
        Ok(Self {
            par: par.clone(),
            c: vec![Poly::zero(ctx, Representation::Ntt); 2],
            level,
        })
    }

    /// Returns the level of the ciphertext.
    pub fn level(&self) -> usize {
        self.level
    }

    /// Returns the parameters of the ciphertext.
    pub fn parameters(&self) -> &Arc<BfvParameters> {
        &self.par
    }

    /// Modulus switch the ciphertext down to a lower level, by dividing and
    /// rounding each polynomial by the moduli that are dropped.
    ///
    /// Returns an error if the target level is above the current level.
    pub fn mod_switch_to_level(&mut self, level: usize) -> Result<()> {
        if level > self.level {
            return Err(Error::InvalidLevel(level, self.level));
        }
        let ctx = self.par.ctx_at_level(level)?;
        for ci in self.c.iter_mut() {
            ci.change_representation(Representation::PowerBasis);
            ci.switch_down_to(ctx)?;
            ci.change_representation(Representation::Ntt);
        }
        self.level = level;
        Ok(())
    }
}

impl FheCiphertext for Ciphertext {}

impl FheParametrized for Ciphertext {
    type Parameters = BfvParameters;
}

/// A ciphertext is serialized as its level, its number of polynomials, and
/// then the serialization of each polynomial.
impl Serialize for Ciphertext {
    fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = vec![self.level as u8, self.c.len() as u8];
        self.c.iter().for_each(|ci| bytes.extend(ci.to_bytes()));
        bytes
    }
}

impl DeserializeParametrized for Ciphertext {
    type Error = Error;

    fn from_bytes(bytes: &[u8], par: &Arc<BfvParameters>) -> Result<Self> {
        if bytes.len() < 2 {
            return Err(Error::SerializationError);
        }
        let level = bytes[0] as usize;
        let n = bytes[1] as usize;
        let ctx = par.ctx_at_level(level)?;
        let poly_length = Poly::serialization_length(ctx);
        if bytes.len() != 2 + n * poly_length {
            return Err(Error::SerializationError);
        }
        let c = bytes[2..]
            .chunks(poly_length)
            .map(|chunk| Poly::from_bytes(chunk, ctx))
            .collect::<mhe_math::Result<Vec<_>>>()?;
        Ciphertext::new(c, par)
    }
}
