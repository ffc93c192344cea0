//! Public keys for the BFV encryption scheme

use crate::bfv::{BfvParameters, Ciphertext, Plaintext};
use crate::{Error, Result};
use mhe_math::rq::{traits::TryConvertFrom, Context, Poly, Representation};
use mhe_traits::{
    DeserializeParametrized, DeserializeWithContext, FheEncrypter, FheParametrized, Serialize,
};
use rand::{CryptoRng, RngCore};
use std::sync::Arc;
use zeroize::Zeroizing;

use super::SecretKey;

/// Public key for the BFV encryption scheme.
///
/// The key is an encryption of zero `(-a * s + e, a)` at the maximum level.
/// When the parameters have auxiliary moduli, the key also holds the same
/// encryption modulo `p`, with the same error, so that it is defined over
/// the extended basis `q * p`.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct PublicKey {
    pub(crate) par: Arc<BfvParameters>,
    pub(crate) c: Ciphertext,
    pub(crate) c_p: Option<Vec<Poly>>,
}

impl PublicKey {
    /// Generate a new [`PublicKey`] from a [`SecretKey`].
    pub fn new<R: RngCore + CryptoRng>(sk: &SecretKey, rng: &mut R) -> Result<Self> {
        let par = &sk.par;
        let ctx = par.ctx_at_level(par.max_level())?;
        let e = Zeroizing::new(
            mhe_util::sample_vec_cbd(par.degree(), par.variance, rng)
                .map_err(|e| Error::DefaultError(e.to_string()))?,
        );

        let encrypt_zero = |ctx: &Arc<Context>, rng: &mut R| -> Result<Vec<Poly>> {
            let s = sk.poly_in(ctx)?;
            let a = Poly::random(ctx, Representation::Ntt, rng);
            let mut b = Poly::try_convert_from(e.as_slice(), ctx, Representation::Ntt)?;
            b -= &(&a * s.as_ref());
            Ok(vec![b, a])
        };

        let c = Ciphertext::new(encrypt_zero(ctx, rng)?, par)?;
        let c_p = par
            .extender
            .as_ref()
            .map(|extender| encrypt_zero(extender.ctx_p(), rng))
            .transpose()?;

        Ok(Self {
            par: par.clone(),
            c,
            c_p,
        })
    }

    /// Returns the parameters of the public key.
    pub fn parameters(&self) -> &Arc<BfvParameters> {
        &self.par
    }
}

impl FheParametrized for PublicKey {
    type Parameters = BfvParameters;
}

impl FheEncrypter<Plaintext, Ciphertext> for PublicKey {
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
        let ctx = self.par.ctx_at_level(pt.level)?;

        // The key modulo q_l is still an encryption of zero.
        let mut pk = self.c.c.clone();
        for pki in pk.iter_mut() {
            pki.truncate_to(ctx)?;
        }

        let u = Zeroizing::new(Poly::small(
            ctx,
            Representation::Ntt,
            self.par.variance,
            rng,
        )?);
        let e1 = Zeroizing::new(Poly::small(
            ctx,
            Representation::Ntt,
            self.par.variance,
            rng,
        )?);
        let e2 = Zeroizing::new(Poly::small(
            ctx,
            Representation::Ntt,
            self.par.variance,
            rng,
        )?);

        let mut c0 = u.as_ref() * &pk[0];
        c0 += &e1;
        c0 += &pt.poly_ntt;
        let mut c1 = u.as_ref() * &pk[1];
        c1 += &e2;

        Ciphertext::new(vec![c0, c1], &self.par)
    }
}

/// A public key is serialized as its ciphertext, followed by the two
/// polynomials modulo `p` when the parameters have auxiliary moduli.
impl Serialize for PublicKey {
    fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = self.c.to_bytes();
        if let Some(c_p) = &self.c_p {
            c_p.iter().for_each(|ci| bytes.extend(ci.to_bytes()));
        }
        bytes
    }
}

impl DeserializeParametrized for PublicKey {
    type Error = Error;

    fn from_bytes(bytes: &[u8], par: &Arc<Self::Parameters>) -> Result<Self> {
        let ctx = par.ctx_at_level(par.max_level())?;
        let ct_length = 2 + 2 * Poly::serialization_length(ctx);
        if bytes.len() < ct_length {
            return Err(Error::SerializationError);
        }
        let c = Ciphertext::from_bytes(&bytes[..ct_length], par)?;
        if c.level != par.max_level() || c.len() != 2 {
            return Err(Error::SerializationError);
        }

        let c_p = match &par.extender {
            Some(extender) => {
                let poly_length = Poly::serialization_length(extender.ctx_p());
                if bytes.len() != ct_length + 2 * poly_length {
                    return Err(Error::SerializationError);
                }
                Some(
                    bytes[ct_length..]
                        .chunks(poly_length)
                        .map(|chunk| Poly::from_bytes(chunk, extender.ctx_p()))
                        .collect::<mhe_math::Result<Vec<_>>>()?,
                )
            }
            None if bytes.len() == ct_length => None,
            None => return Err(Error::SerializationError),
        };

        Ok(Self {
            par: par.clone(),
            c,
            c_p,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::PublicKey;
    use crate::bfv::{parameters::BfvParameters, BfvParametersBuilder, Encoding, Plaintext, SecretKey};
    use mhe_traits::{DeserializeParametrized, FheDecrypter, FheEncoder, FheEncrypter, Serialize};
    use rand::thread_rng;
    use std::error::Error;

    #[test]
    fn keygen() -> Result<(), Box<dyn Error>> {
        let mut rng = thread_rng();
        let params = BfvParameters::default_arc(1, 16);
        let sk = SecretKey::random(&params, &mut rng)?;
        let pk = PublicKey::new(&sk, &mut rng)?;
        assert_eq!(pk.par, params);
        assert_eq!(pk.c.level(), params.max_level());
        assert!(pk.c_p.is_some());
        assert_eq!(
            sk.try_decrypt(&pk.c)?,
            Plaintext::zero(Encoding::poly(), &params)?
        );
        Ok(())
    }

    #[test]
    fn encrypt_decrypt() -> Result<(), Box<dyn Error>> {
        let mut rng = thread_rng();
        for params in [
            BfvParameters::default_arc(1, 16),
            BfvParameters::default_arc(6, 32),
        ] {
            for level in 0..=params.max_level() {
                for _ in 0..20 {
                    let sk = SecretKey::random(&params, &mut rng)?;
                    let pk = PublicKey::new(&sk, &mut rng)?;

                    let pt = Plaintext::try_encode(
                        &params.plaintext.random_vec(params.degree(), &mut rng),
                        Encoding::poly_at_level(level),
                        &params,
                    )?;
                    let ct = pk.try_encrypt(&pt, &mut rng)?;
                    assert_eq!(ct.level(), level);
                    let pt2 = sk.try_decrypt(&ct)?;
                    assert_eq!(pt2, pt);
                }
            }
        }

        Ok(())
    }

    #[test]
    fn test_serialize() -> Result<(), Box<dyn Error>> {
        let mut rng = thread_rng();
        let without_p = BfvParametersBuilder::new()
            .set_degree(16)
            .set_plaintext_modulus(1153)
            .set_moduli_sizes(&[62, 62])
            .build_arc()?;
        for params in [
            BfvParameters::default_arc(1, 16),
            BfvParameters::default_arc(6, 32),
            without_p,
        ] {
            let sk = SecretKey::random(&params, &mut rng)?;
            let pk = PublicKey::new(&sk, &mut rng)?;
            let bytes = pk.to_bytes();
            assert_eq!(pk, PublicKey::from_bytes(&bytes, &params)?);
            assert!(PublicKey::from_bytes(&bytes[..bytes.len() - 1], &params).is_err());
        }
        Ok(())
    }
}
