//! Create parameters for the BFV encryption scheme

use crate::{Error, ParametersError, Result};
use itertools::{izip, Itertools};
use mhe_math::{
    ntt::NttOperator,
    rns::{RnsContext, RnsScaler, ScalingFactor},
    rq::{traits::TryConvertFrom, BasisExtender, Context, Poly, Representation},
    zq::{primes::generate_prime, Modulus},
};
use mhe_traits::FheParameters;
use ndarray::{Array2, ArrayView1, Axis};
use std::fmt::Debug;
use std::sync::Arc;

/// Parameters for the BFV encryption scheme.
///
/// The ciphertext modulus `q` is the product of a chain of moduli; a ciphertext
/// at level `l` is defined modulo the first `l + 1` moduli of the chain. The
/// optional auxiliary moduli, whose product is `p`, are only used by the
/// multiparty protocols to extend the basis to `q * p` before dividing by `p`.
#[derive(PartialEq, Eq)]
pub struct BfvParameters {
    /// Number of coefficients in a polynomial.
    polynomial_degree: usize,

    /// Modulus of the plaintext.
    plaintext_modulus: u64,

    /// Vector of coprime moduli q_i for the ciphertext.
    pub(crate) moduli: Box<[u64]>,

    /// Vector of the sized of the coprime moduli q_i for the ciphertext.
    moduli_sizes: Box<[usize]>,

    /// Vector of auxiliary moduli p_i.
    pub(crate) auxiliary_moduli: Box<[u64]>,

    /// Error variance
    pub(crate) variance: usize,

    /// Contexts for the underlying polynomials, indexed by level.
    pub(crate) ctx: Vec<Arc<Context>>,

    /// Extender between the largest context and the auxiliary moduli.
    pub(crate) extender: Option<BasisExtender>,

    /// Ntt operator for the SIMD plaintext, if possible.
    pub(crate) op: Option<Arc<NttOperator>>,

    /// Plaintext Modulus
    pub(crate) plaintext: Modulus,

    /// Scalers from the ciphertext moduli to the plaintext modulus, indexed
    /// by level.
    pub(crate) scalers_down: Box<[RnsScaler]>,

    /// Scalers from the plaintext modulus to the ciphertext moduli, indexed
    /// by level.
    pub(crate) scalers_up: Box<[RnsScaler]>,

    pub(crate) matrix_reps_index_map: Box<[usize]>,
}

impl Debug for BfvParameters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BfvParameters")
            .field("polynomial_degree", &self.polynomial_degree)
            .field("plaintext_modulus", &self.plaintext_modulus)
            .field("moduli", &self.moduli)
            .field("auxiliary_moduli", &self.auxiliary_moduli)
            .finish()
    }
}

impl FheParameters for BfvParameters {}

impl BfvParameters {
    /// Returns the underlying polynomial degree
    pub const fn degree(&self) -> usize {
        self.polynomial_degree
    }

    /// Returns a reference to the ciphertext moduli
    pub fn moduli(&self) -> &[u64] {
        &self.moduli
    }

    /// Returns a reference to the ciphertext moduli
    pub fn moduli_sizes(&self) -> &[usize] {
        &self.moduli_sizes
    }

    /// Returns a reference to the auxiliary moduli; it is empty when no
    /// auxiliary modulus was configured.
    pub fn auxiliary_moduli(&self) -> &[u64] {
        &self.auxiliary_moduli
    }

    /// Returns the plaintext modulus
    pub const fn plaintext(&self) -> u64 {
        self.plaintext_modulus
    }

    /// Returns the maximum level allowed by these parameters.
    pub fn max_level(&self) -> usize {
        self.moduli.len() - 1
    }

    /// Returns the context corresponding to the level.
    pub(crate) fn ctx_at_level(&self, level: usize) -> Result<&Arc<Context>> {
        self.ctx
            .get(level)
            .ok_or(Error::InvalidLevel(level, self.max_level()))
    }

    /// Returns the level of a given context
    pub(crate) fn level_of_ctx(&self, ctx: &Arc<Context>) -> Result<usize> {
        let niterations = self.ctx[self.max_level()].niterations_to(ctx)?;
        Ok(self.max_level() - niterations)
    }

    /// Scale values modulo the plaintext modulus up to the ciphertext moduli at
    /// a given level, i.e. compute round(v * q_l / t). The polynomial is
    /// returned in PowerBasis representation.
    ///
    /// Missing coefficients are set to zero.
    pub(crate) fn scale_up(&self, values: &[u64], level: usize) -> Result<Poly> {
        if values.len() > self.degree() {
            return Err(Error::TooManyValues(values.len(), self.degree()));
        }
        let ctx = self.ctx_at_level(level)?;
        let scaler = &self.scalers_up[level];

        let mut coefficients = Array2::zeros((ctx.moduli().len(), self.degree()));
        izip!(coefficients.axis_iter_mut(Axis(1)), values).for_each(|(column, vi)| {
            let v = [self.plaintext.reduce(*vi)];
            scaler.scale(ArrayView1::from(&v), column);
        });
        Ok(Poly::try_convert_from(
            coefficients,
            ctx,
            Representation::PowerBasis,
        )?)
    }

    /// Scale a polynomial defined modulo the ciphertext moduli down to the
    /// plaintext modulus, i.e. compute round(x * t / q_l) mod t for each
    /// coefficient x of `poly`.
    ///
    /// Returns an error if `poly` is not in PowerBasis representation.
    pub(crate) fn scale_down(&self, poly: &Poly) -> Result<Vec<u64>> {
        if poly.representation() != &Representation::PowerBasis {
            return Err(Error::MathError(mhe_math::Error::IncorrectRepresentation(
                *poly.representation(),
                Representation::PowerBasis,
            )));
        }
        let level = self.level_of_ctx(poly.ctx())?;
        let scaler = &self.scalers_down[level];
        Ok(poly
            .coefficients()
            .axis_iter(Axis(1))
            .map(|column| scaler.scale_new(column)[0])
            .collect_vec())
    }

    /// Encode values in the SIMD slots: the output are the coefficients of
    /// the polynomial modulo t whose evaluations are the values.
    pub(crate) fn simd_encode(&self, values: &[u64]) -> Result<Vec<u64>> {
        let op = self
            .op
            .as_ref()
            .ok_or_else(|| Error::EncodingNotSupported("Simd".to_string()))?;
        if values.len() > self.degree() {
            return Err(Error::TooManyValues(values.len(), self.degree()));
        }
        let mut w = vec![0u64; self.degree()];
        izip!(values, self.matrix_reps_index_map.iter())
            .for_each(|(vi, index)| w[*index] = self.plaintext.reduce(*vi));
        op.backward(&mut w);
        Ok(w)
    }

    /// Decode the SIMD slots of the polynomial modulo t whose coefficients are
    /// given.
    pub(crate) fn simd_decode(&self, coefficients: &[u64]) -> Result<Vec<u64>> {
        let op = self
            .op
            .as_ref()
            .ok_or_else(|| Error::EncodingNotSupported("Simd".to_string()))?;
        if coefficients.len() != self.degree() {
            return Err(Error::UnspecifiedInput(format!(
                "Expected {} coefficients, got {}",
                self.degree(),
                coefficients.len()
            )));
        }
        let mut w = coefficients.to_vec();
        op.forward(&mut w);
        Ok(self
            .matrix_reps_index_map
            .iter()
            .map(|index| w[*index])
            .collect_vec())
    }

    #[cfg(test)]
    /// Returns default parameters for tests, with one auxiliary modulus.
    pub fn default_arc(num_moduli: usize, degree: usize) -> Arc<Self> {
        if !degree.is_power_of_two() || degree < 8 {
            panic!("Invalid degree");
        }
        BfvParametersBuilder::new()
            .set_degree(degree)
            .set_plaintext_modulus(1153)
            .set_moduli_sizes(&vec![62usize; num_moduli])
            .set_auxiliary_moduli_sizes(&[62])
            .build_arc()
            .unwrap()
    }
}

/// Builder for parameters for the Bfv encryption scheme.
#[derive(Debug)]
pub struct BfvParametersBuilder {
    degree: usize,
    plaintext: u64,
    variance: usize,
    ciphertext_moduli: Vec<u64>,
    ciphertext_moduli_sizes: Vec<usize>,
    auxiliary_moduli: Vec<u64>,
    auxiliary_moduli_sizes: Vec<usize>,
}

impl BfvParametersBuilder {
    /// Creates a new instance of the builder
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self {
            degree: Default::default(),
            plaintext: Default::default(),
            variance: 10,
            ciphertext_moduli: Default::default(),
            ciphertext_moduli_sizes: Default::default(),
            auxiliary_moduli: Default::default(),
            auxiliary_moduli_sizes: Default::default(),
        }
    }

    /// Sets the polynomial degree. Returns an error if the degree is not
    /// a power of two larger or equal to 8.
    pub fn set_degree(&mut self, degree: usize) -> &mut Self {
        self.degree = degree;
        self
    }

    /// Sets the plaintext modulus. Returns an error if the plaintext is not
    /// between 2 and 2^62 - 1.
    pub fn set_plaintext_modulus(&mut self, plaintext: u64) -> &mut Self {
        self.plaintext = plaintext;
        self
    }

    /// Sets the sizes of the ciphertext moduli.
    /// Only one of `set_moduli_sizes` and `set_moduli`
    /// can be specified.
    pub fn set_moduli_sizes(&mut self, sizes: &[usize]) -> &mut Self {
        sizes.clone_into(&mut self.ciphertext_moduli_sizes);
        self
    }

    /// Sets the ciphertext moduli to use.
    /// Only one of `set_moduli_sizes` and `set_moduli`
    /// can be specified.
    pub fn set_moduli(&mut self, moduli: &[u64]) -> &mut Self {
        moduli.clone_into(&mut self.ciphertext_moduli);
        self
    }

    /// Sets the sizes of the auxiliary moduli.
    /// Only one of `set_auxiliary_moduli_sizes` and `set_auxiliary_moduli`
    /// can be specified.
    pub fn set_auxiliary_moduli_sizes(&mut self, sizes: &[usize]) -> &mut Self {
        sizes.clone_into(&mut self.auxiliary_moduli_sizes);
        self
    }

    /// Sets the auxiliary moduli to use.
    /// Only one of `set_auxiliary_moduli_sizes` and `set_auxiliary_moduli`
    /// can be specified.
    pub fn set_auxiliary_moduli(&mut self, moduli: &[u64]) -> &mut Self {
        moduli.clone_into(&mut self.auxiliary_moduli);
        self
    }

    /// Sets the error variance. Returns an error if the variance is not between
    /// one and sixteen.
    pub fn set_variance(&mut self, variance: usize) -> &mut Self {
        self.variance = variance;
        self
    }

    /// Generate moduli with the specified sizes, distinct from the moduli in
    /// `exclude`.
    fn generate_moduli(moduli_sizes: &[usize], degree: usize, exclude: &[u64]) -> Result<Vec<u64>> {
        let mut moduli = vec![];
        for size in moduli_sizes {
            if *size > 62 || *size < 10 {
                return Err(Error::ParametersError(ParametersError::InvalidModulusSize(
                    *size, 10, 62,
                )));
            }

            let mut upper_bound = 1 << size;
            loop {
                if let Some(prime) = generate_prime(*size, 2 * degree as u64, upper_bound) {
                    if !moduli.contains(&prime) && !exclude.contains(&prime) {
                        moduli.push(prime);
                        break;
                    } else {
                        upper_bound = prime;
                    }
                } else {
                    return Err(Error::ParametersError(ParametersError::NotEnoughPrimes(
                        *size, degree,
                    )));
                }
            }
        }

        Ok(moduli)
    }

    /// Returns the moduli either specified explicitly or generated from their
    /// sizes.
    fn moduli_or_sizes(
        moduli: &[u64],
        sizes: &[usize],
        degree: usize,
        exclude: &[u64],
        name: &str,
    ) -> Result<Vec<u64>> {
        if !moduli.is_empty() && !sizes.is_empty() {
            Err(Error::ParametersError(ParametersError::TooManySpecified(
                format!("Only one of `{name}` and `{name}_sizes` can be specified"),
            )))
        } else if !sizes.is_empty() {
            Self::generate_moduli(sizes, degree, exclude)
        } else {
            Ok(moduli.to_vec())
        }
    }

    /// Build a new `BfvParameters` inside an `Arc`.
    pub fn build_arc(&self) -> Result<Arc<BfvParameters>> {
        self.build().map(Arc::new)
    }

    /// Build a new `BfvParameters`.
    pub fn build(&self) -> Result<BfvParameters> {
        // Check that the degree is a power of 2 (and large enough).
        if self.degree < 8 || !self.degree.is_power_of_two() {
            return Err(Error::ParametersError(ParametersError::InvalidDegree(
                self.degree,
            )));
        }

        // This checks that the plaintext modulus is valid.
        let plaintext_modulus = Modulus::new(self.plaintext).map_err(|e| {
            Error::ParametersError(ParametersError::InvalidPlaintext(e.to_string()))
        })?;

        if self.ciphertext_moduli.is_empty() && self.ciphertext_moduli_sizes.is_empty() {
            return Err(Error::ParametersError(ParametersError::TooFewSpecified(
                "One of `ciphertext_moduli` and `ciphertext_moduli_sizes` must be specified"
                    .to_string(),
            )));
        }
        let moduli = Self::moduli_or_sizes(
            &self.ciphertext_moduli,
            &self.ciphertext_moduli_sizes,
            self.degree,
            &[],
            "moduli",
        )?;
        let auxiliary_moduli = Self::moduli_or_sizes(
            &self.auxiliary_moduli,
            &self.auxiliary_moduli_sizes,
            self.degree,
            &moduli,
            "auxiliary_moduli",
        )?;

        // Recomputes the moduli sizes
        let moduli_sizes = moduli
            .iter()
            .map(|m| 64 - m.leading_zeros() as usize)
            .collect_vec();

        for modulus in moduli.iter() {
            if *modulus <= self.plaintext {
                return Err(Error::ParametersError(ParametersError::InvalidPlaintext(
                    "The plaintext modulus must be smaller than the ciphertext moduli"
                        .to_string(),
                )));
            }
        }

        // Compute the contexts, from the smallest to the largest.
        let ctx_max = Context::new_arc(&moduli, self.degree)?;
        let ctx = (0..moduli.len())
            .rev()
            .map(|i| ctx_max.context_at_level(i))
            .collect::<mhe_math::Result<Vec<_>>>()?;

        let extender = if auxiliary_moduli.is_empty() {
            None
        } else {
            let ctx_p = Context::new_arc(&auxiliary_moduli, self.degree)?;
            Some(BasisExtender::new(&ctx_max, &ctx_p)?)
        };

        let plaintext_rns = Arc::new(RnsContext::new(&[self.plaintext])?);
        let plaintext_big = plaintext_rns.modulus();
        let (scalers_down, scalers_up): (Vec<RnsScaler>, Vec<RnsScaler>) = ctx
            .iter()
            .map(|ctx_i| {
                (
                    RnsScaler::new(
                        ctx_i.rns(),
                        &plaintext_rns,
                        ScalingFactor::new(plaintext_big, ctx_i.modulus()),
                    ),
                    RnsScaler::new(
                        &plaintext_rns,
                        ctx_i.rns(),
                        ScalingFactor::new(ctx_i.modulus(), plaintext_big),
                    ),
                )
            })
            .unzip();

        let op = NttOperator::new(&plaintext_modulus, self.degree).map(Arc::new);

        // We use the same code as SEAL
        // https://github.com/microsoft/SEAL/blob/82b07db635132e297282649e2ab5908999089ad2/native/src/seal/batchencoder.cpp
        let row_size = self.degree >> 1;
        let m = self.degree << 1;
        let generator = 3;
        let mut pos = 1;
        let mut matrix_reps_index_map = vec![0usize; self.degree];
        for i in 0..row_size {
            let index1 = (pos - 1) >> 1;
            let index2 = (m - pos - 1) >> 1;
            matrix_reps_index_map[i] = index1.reverse_bits() >> (self.degree.leading_zeros() + 1);
            matrix_reps_index_map[row_size | i] =
                index2.reverse_bits() >> (self.degree.leading_zeros() + 1);
            pos *= generator;
            pos &= m - 1;
        }

        log::debug!(
            "BFV parameters: degree {}, plaintext modulus {}, {} moduli, {} auxiliary moduli",
            self.degree,
            self.plaintext,
            moduli.len(),
            auxiliary_moduli.len()
        );

        Ok(BfvParameters {
            polynomial_degree: self.degree,
            plaintext_modulus: self.plaintext,
            moduli: moduli.into_boxed_slice(),
            moduli_sizes: moduli_sizes.into_boxed_slice(),
            auxiliary_moduli: auxiliary_moduli.into_boxed_slice(),
            variance: self.variance,
            ctx,
            extender,
            op,
            plaintext: plaintext_modulus,
            scalers_down: scalers_down.into_boxed_slice(),
            scalers_up: scalers_up.into_boxed_slice(),
            matrix_reps_index_map: matrix_reps_index_map.into_boxed_slice(),
        })
    }
}
