//! The encoding type for BFV.

use mhe_traits::FhePlaintextEncoding;
use std::fmt::Display;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub(crate) enum EncodingEnum {
    Poly,
    Simd,
}

impl Display for EncodingEnum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

/// An encoding for the plaintext, together with the level at which the
/// plaintext is defined.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Encoding {
    pub(crate) encoding: EncodingEnum,
    pub(crate) level: usize,
}

impl Encoding {
    /// A Poly encoding encodes a vector as coefficients of a polynomial.
    pub fn poly() -> Self {
        Self::poly_at_level(0)
    }

    /// A Simd encoding encodes a vector in the evaluation slots of the
    /// polynomial, so that polynomial products act component-wise. It
    /// requires the plaintext modulus to be congruent to 1 modulo twice the
    /// degree.
    pub fn simd() -> Self {
        Self::simd_at_level(0)
    }

    /// A poly encoding at a given level.
    pub fn poly_at_level(level: usize) -> Self {
        Self {
            encoding: EncodingEnum::Poly,
            level,
        }
    }

    /// A simd encoding at a given level.
    pub fn simd_at_level(level: usize) -> Self {
        Self {
            encoding: EncodingEnum::Simd,
            level,
        }
    }

    /// Returns the level of the encoding.
    pub fn level(&self) -> usize {
        self.level
    }
}

impl From<Encoding> for String {
    fn from(e: Encoding) -> Self {
        String::from(&e)
    }
}

impl From<&Encoding> for String {
    fn from(e: &Encoding) -> Self {
        format!("{}@{}", e.encoding, e.level)
    }
}

impl FhePlaintextEncoding for Encoding {}
