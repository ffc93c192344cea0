//! Plaintext type in the BFV encryption scheme.
use crate::{
    bfv::{encoding::EncodingEnum, BfvParameters, Encoding},
    Error, Result,
};
use mhe_math::rq::{Poly, Representation};
use mhe_traits::{FheDecoder, FheEncoder, FheParametrized, FhePlaintext};
use std::sync::Arc;
use zeroize::Zeroizing;
use zeroize_derive::{Zeroize, ZeroizeOnDrop};

/// A plaintext object, that encodes a vector according to a specific encoding.
#[derive(Debug, Clone, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Plaintext {
    /// The parameters of the underlying BFV encryption scheme.
    #[zeroize(skip)]
    pub(crate) par: Arc<BfvParameters>,
    /// The coefficients modulo t after encoding.
    pub(crate) value: Box<[u64]>,
    /// The encoding of the plaintext, if known
    #[zeroize(skip)]
    pub(crate) encoding: Option<Encoding>,
    /// The plaintext scaled by q_l / t, in Ntt representation.
    pub(crate) poly_ntt: Poly,
    /// The level of the plaintext
    #[zeroize(skip)]
    pub(crate) level: usize,
}

impl FheParametrized for Plaintext {
    type Parameters = BfvParameters;
}

impl FhePlaintext for Plaintext {
    type Encoding = Encoding;
}

impl Plaintext {
    /// Creates a plaintext from coefficients modulo t at a given level.
    pub(crate) fn from_coefficients(
        value: Vec<u64>,
        encoding: Option<Encoding>,
        level: usize,
        par: &Arc<BfvParameters>,
    ) -> Result<Self> {
        let mut poly_ntt = par.scale_up(&value, level)?;
        poly_ntt.change_representation(Representation::Ntt);
        let mut value = value;
        value.resize(par.degree(), 0);
        Ok(Self {
            par: par.clone(),
            value: value.into_boxed_slice(),
            encoding,
            poly_ntt,
            level,
        })
    }

    /// Generate a zero plaintext.
    pub fn zero(encoding: Encoding, par: &Arc<BfvParameters>) -> Result<Self> {
        let level = encoding.level;
        let ctx = par.ctx_at_level(level)?;
        Ok(Self {
            par: par.clone(),
            value: vec![0u64; par.degree()].into_boxed_slice(),
            encoding: Some(encoding),
            poly_ntt: Poly::zero(ctx, Representation::Ntt),
            level,
        })
    }

    /// Returns the level of this plaintext.
    pub fn level(&self) -> usize {
        self.level
    }

    /// Returns the coefficients of the plaintext polynomial modulo t.
    pub fn coefficients(&self) -> &[u64] {
        &self.value
    }
}

// Two plaintexts are equal even if only one of them stores its encoding.
impl PartialEq for Plaintext {
    fn eq(&self, other: &Self) -> bool {
        let mut eq = self.par == other.par && self.value == other.value;
        if let (Some(e1), Some(e2)) = (&self.encoding, &other.encoding) {
            eq &= e1 == e2
        }
        eq
    }
}

// Encoding and decoding.

impl<'a, const N: usize, T> FheEncoder<&'a [T; N]> for Plaintext
where
    Plaintext: FheEncoder<&'a [T], Error = Error>,
{
    type Error = Error;
    fn try_encode(value: &'a [T; N], encoding: Encoding, par: &Arc<BfvParameters>) -> Result<Self> {
        Plaintext::try_encode(value.as_ref(), encoding, par)
    }
}

impl<'a, T> FheEncoder<&'a Vec<T>> for Plaintext
where
    Plaintext: FheEncoder<&'a [T], Error = Error>,
{
    type Error = Error;
    fn try_encode(value: &'a Vec<T>, encoding: Encoding, par: &Arc<BfvParameters>) -> Result<Self> {
        Plaintext::try_encode(value.as_ref(), encoding, par)
    }
}

impl<'a> FheEncoder<&'a [u64]> for Plaintext {
    type Error = Error;
    fn try_encode(value: &'a [u64], encoding: Encoding, par: &Arc<BfvParameters>) -> Result<Self> {
        if value.len() > par.degree() {
            return Err(Error::TooManyValues(value.len(), par.degree()));
        }
        let coefficients = match encoding.encoding {
            EncodingEnum::Poly => par.plaintext.reduce_vec_new(value),
            EncodingEnum::Simd => par.simd_encode(value)?,
        };
        let level = encoding.level;
        Plaintext::from_coefficients(coefficients, Some(encoding), level, par)
    }
}

impl<'a> FheEncoder<&'a [i64]> for Plaintext {
    type Error = Error;
    fn try_encode(value: &'a [i64], encoding: Encoding, par: &Arc<BfvParameters>) -> Result<Self> {
        let w = Zeroizing::new(par.plaintext.reduce_vec_i64(value));
        Plaintext::try_encode(w.as_ref() as &[u64], encoding, par)
    }
}

impl FheDecoder<Plaintext> for Vec<u64> {
    type Error = Error;

    fn try_decode<O>(pt: &Plaintext, encoding: O) -> Result<Vec<u64>>
    where
        O: Into<Option<Encoding>>,
    {
        let enc = match (encoding.into(), pt.encoding.as_ref()) {
            (None, None) => {
                return Err(Error::UnspecifiedInput("No encoding specified".to_string()))
            }
            (Some(arg_enc), Some(pt_enc)) if &arg_enc != pt_enc => {
                return Err(Error::EncodingMismatch(arg_enc.into(), pt_enc.into()))
            }
            (Some(arg_enc), _) => arg_enc,
            (None, Some(pt_enc)) => pt_enc.clone(),
        };

        match enc.encoding {
            EncodingEnum::Poly => Ok(pt.value.to_vec()),
            EncodingEnum::Simd => pt.par.simd_decode(&pt.value),
        }
    }
}

impl FheDecoder<Plaintext> for Vec<i64> {
    type Error = Error;

    fn try_decode<E>(pt: &Plaintext, encoding: E) -> Result<Vec<i64>>
    where
        E: Into<Option<Encoding>>,
    {
        let v = Zeroizing::new(Vec::<u64>::try_decode(pt, encoding)?);
        Ok(v.iter().map(|vi| pt.par.plaintext.center(*vi)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::{Encoding, Plaintext};
    use crate::bfv::parameters::{BfvParameters, BfvParametersBuilder};
    use crate::Error;
    use mhe_math::rq::{Poly, Representation};
    use mhe_traits::{FheDecoder, FheEncoder};
    use rand::thread_rng;
    use std::error::Error as StdError;

    #[test]
    fn try_encode() -> Result<(), Box<dyn StdError>> {
        let mut rng = thread_rng();
        // The default test parameters support both Poly and Simd encodings
        let params = BfvParameters::default_arc(1, 16);
        let a = params.plaintext.random_vec(params.degree(), &mut rng);

        assert!(Plaintext::try_encode(&[0u64; 17], Encoding::poly(), &params).is_err());
        assert!(Plaintext::try_encode(&a, Encoding::poly(), &params).is_ok());
        assert!(Plaintext::try_encode(&a, Encoding::simd(), &params).is_ok());
        assert!(Plaintext::try_encode(&[1u64], Encoding::poly(), &params).is_ok());
        assert_eq!(
            Plaintext::try_encode(&a, Encoding::poly_at_level(1), &params).err(),
            Some(Error::InvalidLevel(1, 0))
        );

        // The following parameters do not allow for Simd encoding
        let params = BfvParametersBuilder::new()
            .set_degree(16)
            .set_plaintext_modulus(2)
            .set_moduli(&[4611686018326724609])
            .build_arc()?;

        let a = params.plaintext.random_vec(params.degree(), &mut rng);
        assert!(Plaintext::try_encode(&a, Encoding::poly(), &params).is_ok());
        assert!(Plaintext::try_encode(&a, Encoding::simd(), &params).is_err());

        Ok(())
    }

    #[test]
    fn encode_decode() -> Result<(), Box<dyn StdError>> {
        let mut rng = thread_rng();
        let params = BfvParameters::default_arc(2, 16);
        let a = params.plaintext.random_vec(params.degree(), &mut rng);

        for level in 0..=params.max_level() {
            let plaintext = Plaintext::try_encode(&a, Encoding::simd_at_level(level), &params)?;
            assert_eq!(plaintext.level(), level);
            let b = Vec::<u64>::try_decode(&plaintext, Encoding::simd_at_level(level))?;
            assert_eq!(b, a);
        }

        let a = a
            .iter()
            .map(|ai| params.plaintext.center(*ai))
            .collect::<Vec<_>>();
        let plaintext = Plaintext::try_encode(&a, Encoding::poly(), &params)?;
        assert_eq!(Vec::<i64>::try_decode(&plaintext, None)?, a);

        let plaintext = Plaintext::try_encode(&a, Encoding::simd(), &params)?;
        assert_eq!(Vec::<i64>::try_decode(&plaintext, Encoding::simd())?, a);
        assert!(Vec::<u64>::try_decode(&plaintext, Encoding::poly()).is_err());

        Ok(())
    }

    #[test]
    fn scaled_polynomial() -> Result<(), Box<dyn StdError>> {
        let params = BfvParameters::default_arc(2, 16);
        let pt = Plaintext::try_encode(&[0u64; 16], Encoding::poly_at_level(1), &params)?;
        assert_eq!(
            pt.poly_ntt,
            Poly::zero(params.ctx_at_level(1)?, Representation::Ntt)
        );
        assert_eq!(pt, Plaintext::zero(Encoding::poly_at_level(1), &params)?);
        Ok(())
    }

    #[test]
    fn partial_eq() -> Result<(), Box<dyn StdError>> {
        let mut rng = thread_rng();
        let params = BfvParameters::default_arc(1, 16);
        let a = params.plaintext.random_vec(params.degree(), &mut rng);

        let plaintext = Plaintext::try_encode(&a, Encoding::poly(), &params)?;
        let mut same_plaintext = plaintext.clone();
        assert_eq!(plaintext, same_plaintext);

        // Equality also holds when there is no encoding specified.
        same_plaintext.encoding = None;
        assert_eq!(plaintext, same_plaintext);

        Ok(())
    }
}
