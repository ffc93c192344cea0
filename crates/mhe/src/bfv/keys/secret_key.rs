//! Secret keys for the BFV encryption scheme

use crate::bfv::{BfvParameters, Ciphertext, Plaintext};
use crate::{Error, Result};
use mhe_math::rq::{traits::TryConvertFrom, Context, Poly, Representation};
use mhe_traits::{FheDecrypter, FheEncrypter, FheParametrized};
use mhe_util::sample_vec_cbd;
use num_bigint::BigUint;
use rand::{CryptoRng, RngCore};
use std::sync::Arc;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Secret key for the BFV encryption scheme.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct SecretKey {
    pub(crate) par: Arc<BfvParameters>,
    pub(crate) coeffs: Box<[i64]>,
}

impl Zeroize for SecretKey {
    fn zeroize(&mut self) {
        self.coeffs.zeroize();
    }
}

impl ZeroizeOnDrop for SecretKey {}

impl SecretKey {
    /// Generate a random [`SecretKey`].
    pub fn random<R: RngCore + CryptoRng>(par: &Arc<BfvParameters>, rng: &mut R) -> Result<Self> {
        let s_coefficients = sample_vec_cbd(par.degree(), par.variance, rng)
            .map_err(|e| Error::DefaultError(e.to_string()))?;
        Self::new(s_coefficients, par)
    }

    /// Generate a [`SecretKey`] from its signed coefficients.
    ///
    /// Returns an error if there are more coefficients than the degree.
    pub fn new(coeffs: Vec<i64>, par: &Arc<BfvParameters>) -> Result<Self> {
        if coeffs.len() > par.degree() {
            return Err(Error::TooManyValues(coeffs.len(), par.degree()));
        }
        let mut coeffs = coeffs;
        coeffs.resize(par.degree(), 0);
        Ok(Self {
            par: par.clone(),
            coeffs: coeffs.into_boxed_slice(),
        })
    }

    /// The zero secret key, which is used as the input or output key of a
    /// key switching when encrypting or decrypting with a collective key.
    pub(crate) fn zero(par: &Arc<BfvParameters>) -> Self {
        Self {
            par: par.clone(),
            coeffs: vec![0i64; par.degree()].into_boxed_slice(),
        }
    }

    /// Returns the parameters of the secret key.
    pub fn parameters(&self) -> &Arc<BfvParameters> {
        &self.par
    }

    /// The secret key as a polynomial in Ntt representation in `ctx`.
    pub(crate) fn poly_in(&self, ctx: &Arc<Context>) -> Result<Zeroizing<Poly>> {
        Ok(Zeroizing::new(Poly::try_convert_from(
            self.coeffs.as_ref(),
            ctx,
            Representation::Ntt,
        )?))
    }

    /// Computes c0 + c1 * s + ... + c_k * s^k in PowerBasis representation.
    fn phase(&self, ct: &Ciphertext) -> Result<Zeroizing<Poly>> {
        let s = self.poly_in(ct.c[0].ctx())?;
        let mut si = s.clone();

        let mut c = Zeroizing::new(ct.c[0].clone());
        for ci in ct.c.iter().skip(1) {
            let mut cis = Zeroizing::new(ci.clone());
            *cis.as_mut() *= si.as_ref();
            *c.as_mut() += &cis;
            *si.as_mut() *= s.as_ref();
        }
        c.change_representation(Representation::PowerBasis);
        Ok(c)
    }

    /// Measure the noise in a [`Ciphertext`], as the number of bits of the
    /// largest centered coefficient of the error.
    pub fn measure_noise(&self, ct: &Ciphertext) -> Result<usize> {
        let plaintext = Zeroizing::new(self.try_decrypt(ct)?);
        let mut m = Zeroizing::new(plaintext.poly_ntt.clone());
        m.change_representation(Representation::PowerBasis);

        let mut c = self.phase(ct)?;
        *c.as_mut() -= &m;

        let ciphertext_modulus = ct.c[0].ctx().modulus();
        let mut noise = 0usize;
        for coeff in Vec::<BigUint>::from(c.as_ref()) {
            noise = std::cmp::max(
                noise,
                std::cmp::min(coeff.bits(), (ciphertext_modulus - &coeff).bits()) as usize,
            )
        }

        Ok(noise)
    }

    /// Encrypts a polynomial in Ntt representation, already scaled by q / t.
    pub(crate) fn encrypt_poly<R: RngCore + CryptoRng>(
        &self,
        p: &Poly,
        rng: &mut R,
    ) -> Result<Ciphertext> {
        if p.representation() != &Representation::Ntt {
            return Err(Error::MathError(mhe_math::Error::IncorrectRepresentation(
                *p.representation(),
                Representation::Ntt,
            )));
        }
        let level = self.par.level_of_ctx(p.ctx())?;

        let s = self.poly_in(p.ctx())?;
        let a = Poly::random(p.ctx(), Representation::Ntt, rng);
        let a_s = Zeroizing::new(&a * s.as_ref());

        let mut b = Poly::small(p.ctx(), Representation::Ntt, self.par.variance, rng)?;
        b -= &a_s;
        b += p;

        Ok(Ciphertext {
            par: self.par.clone(),
            c: vec![b, a],
            level,
        })
    }
}

impl FheParametrized for SecretKey {
    type Parameters = BfvParameters;
}

impl FheEncrypter<Plaintext, Ciphertext> for SecretKey {
    type Error = Error;

    fn try_encrypt<R: RngCore + CryptoRng>(
        &self,
        pt: &Plaintext,
        rng: &mut R,
    ) -> Result<Ciphertext> {
        if self.par != pt.par {
            return Err(Error::DefaultError(
                "Incompatible BFV parameters".to_string(),
            ));
        }
        self.encrypt_poly(&pt.poly_ntt, rng)
    }
}

impl FheDecrypter<Plaintext, Ciphertext> for SecretKey {
    type Error = Error;

    fn try_decrypt(&self, ct: &Ciphertext) -> Result<Plaintext> {
        if self.par != ct.par {
            return Err(Error::DefaultError(
                "Incompatible BFV parameters".to_string(),
            ));
        }
        let c = self.phase(ct)?;
        let w = self.par.scale_down(c.as_ref())?;
        Plaintext::from_coefficients(w, None, ct.level, &self.par)
    }
}
