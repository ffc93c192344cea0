#![allow(clippy::indexing_slicing)]

//! Polynomials in R_q\[x\] = (ZZ_q1 x ... x ZZ_qn)\[x\] where the qi's are
//! prime moduli in zq.

mod context;
mod convert;
mod extender;
mod ops;
mod serialize;

pub mod traits;

use self::traits::TryConvertFrom;
use crate::{Error, Result};
pub use context::Context;
pub use extender::BasisExtender;
use itertools::izip;
use mhe_util::sample_vec_cbd;
use ndarray::{s, Array2, ArrayView2, Axis};
use rand::{CryptoRng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;
use zeroize::{Zeroize, Zeroizing};

/// Possible representations of the underlying polynomial.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Representation {
    /// This is the list of coefficients ci, such that the polynomial is c0 + c1
    /// * x + ... + c_(degree - 1) * x^(degree - 1)
    #[default]
    PowerBasis,
    /// This is the NTT representation of the PowerBasis representation.
    Ntt,
}

/// Struct that holds a polynomial for a specific context.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct Poly {
    ctx: Arc<Context>,
    representation: Representation,
    coefficients: Array2<u64>,
}

impl Zeroize for Poly {
    fn zeroize(&mut self) {
        if let Some(coeffs) = self.coefficients.as_slice_mut() {
            coeffs.zeroize()
        }
    }
}

impl AsRef<Poly> for Poly {
    fn as_ref(&self) -> &Poly {
        self
    }
}

impl AsMut<Poly> for Poly {
    fn as_mut(&mut self) -> &mut Poly {
        self
    }
}

impl Poly {
    /// Creates a polynomial holding the constant 0.
    pub fn zero(ctx: &Arc<Context>, representation: Representation) -> Self {
        Self {
            ctx: ctx.clone(),
            representation,
            coefficients: Array2::zeros((ctx.q.len(), ctx.degree)),
        }
    }

    /// Current representation of the polynomial.
    pub const fn representation(&self) -> &Representation {
        &self.representation
    }

    /// Change the representation of the underlying polynomial.
    pub fn change_representation(&mut self, to: Representation) {
        match (self.representation, to) {
            (Representation::PowerBasis, Representation::Ntt) => self.ntt_forward(),
            (Representation::Ntt, Representation::PowerBasis) => self.ntt_backward(),
            _ => {}
        }
        self.representation = to;
    }

    /// Generate a random polynomial.
    pub fn random<R: RngCore + CryptoRng>(
        ctx: &Arc<Context>,
        representation: Representation,
        rng: &mut R,
    ) -> Self {
        let mut p = Poly::zero(ctx, representation);
        izip!(p.coefficients.outer_iter_mut(), ctx.q.iter()).for_each(|(mut v, qi)| {
            v.iter_mut()
                .zip(qi.random_vec(ctx.degree, rng))
                .for_each(|(vi, ri)| *vi = ri)
        });
        p
    }

    /// Generate a random polynomial deterministically from a seed.
    pub fn random_from_seed(
        ctx: &Arc<Context>,
        representation: Representation,
        seed: <ChaCha8Rng as SeedableRng>::Seed,
    ) -> Self {
        let mut prng = ChaCha8Rng::from_seed(seed);
        Self::random(ctx, representation, &mut prng)
    }

    /// Generate a small polynomial and convert into the specified
    /// representation.
    ///
    /// Returns an error if the variance does not belong to [1, ..., 16].
    pub fn small<T: RngCore + CryptoRng>(
        ctx: &Arc<Context>,
        representation: Representation,
        variance: usize,
        rng: &mut T,
    ) -> Result<Self> {
        let coeffs = Zeroizing::new(
            sample_vec_cbd(ctx.degree, variance, rng).map_err(|e| Error::Default(e.to_string()))?,
        );
        Poly::try_convert_from(coeffs.as_slice(), ctx, representation)
    }

    /// Access the polynomial coefficients in RNS representation.
    pub fn coefficients(&self) -> ArrayView2<'_, u64> {
        self.coefficients.view()
    }

    /// Computes the forward Ntt on the coefficients
    fn ntt_forward(&mut self) {
        izip!(self.coefficients.outer_iter_mut(), self.ctx.ops.iter()).for_each(|(mut v, op)| {
            if let Some(v) = v.as_slice_mut() {
                op.forward(v)
            }
        });
    }

    /// Computes the backward Ntt on the coefficients
    fn ntt_backward(&mut self) {
        izip!(self.coefficients.outer_iter_mut(), self.ctx.ops.iter()).for_each(|(mut v, op)| {
            if let Some(v) = v.as_slice_mut() {
                op.backward(v)
            }
        });
    }

    /// Modulus switch down the polynomial by dividing and rounding each
    /// coefficient by the last modulus in the chain, then drops the last
    /// modulus, as described in Algorithm 2 of <https://eprint.iacr.org/2018/931.pdf>.
    ///
    /// Returns an error if there is no next context or if the representation
    /// is not PowerBasis.
    pub fn switch_down(&mut self) -> Result<()> {
        let next_context = self.ctx.next_context.clone().ok_or(Error::NoMoreContext)?;

        if self.representation != Representation::PowerBasis {
            return Err(Error::IncorrectRepresentation(
                self.representation,
                Representation::PowerBasis,
            ));
        }

        let q_len = self.ctx.q.len();
        let q_last = &self.ctx.q[q_len - 1];
        let q_last_div_2 = (**q_last) / 2;

        // Add (q_last - 1) / 2 to change from flooring to rounding
        let (mut q_new_polys, mut q_last_poly) =
            self.coefficients.view_mut().split_at(Axis(0), q_len - 1);

        q_last_poly
            .iter_mut()
            .for_each(|coeff| *coeff = q_last.add(*coeff, q_last_div_2));
        izip!(
            q_new_polys.outer_iter_mut(),
            self.ctx.q.iter(),
            self.ctx.inv_last_qi_mod_qj.iter(),
            self.ctx.inv_last_qi_mod_qj_shoup.iter(),
        )
        .for_each(|(coeffs, qi, inv, inv_shoup)| {
            let q_last_div_2_mod_qi = **qi - qi.reduce(q_last_div_2); // Up to qi.modulus()
            for (coeff, q_last_coeff) in izip!(coeffs, q_last_poly.iter()) {
                // (x mod q_last - q_L/2) mod q_i
                let tmp = qi.lazy_reduce(*q_last_coeff) + q_last_div_2_mod_qi; // Up to 3 * qi.modulus()

                // ((x mod q_i) - (x mod q_last) + (q_L/2 mod q_i)) mod q_i
                // = (x - x mod q_last + q_L/2) mod q_i
                *coeff += 3 * (**qi) - tmp; // Up to 4 * qi.modulus()

                // q_last^{-1} * (x - x mod q_last) mod q_i
                *coeff = qi.mul_shoup(*coeff, *inv, *inv_shoup);
            }
        });

        q_last_poly.iter_mut().for_each(|coeff| coeff.zeroize());
        self.coefficients.remove_index(Axis(0), q_len - 1);
        self.ctx = next_context;

        Ok(())
    }

    /// Modulo switch down to a smaller context.
    ///
    /// Returns an error if there is the provided context is not a child of the
    /// current context, or if the polynomial is not in PowerBasis
    /// representation.
    pub fn switch_down_to(&mut self, context: &Arc<Context>) -> Result<()> {
        let niterations = self.ctx.niterations_to(context)?;
        for _ in 0..niterations {
            self.switch_down()?;
        }
        Ok(())
    }

    /// Reduce the polynomial modulo the moduli of a smaller context, by
    /// dropping the residues modulo the moduli that are not in `context`.
    ///
    /// Contrary to [`Poly::switch_down_to`], this does not divide the
    /// polynomial, and works in any representation.
    ///
    /// Returns an error if the moduli of `context` are not a prefix of the
    /// moduli of the current context.
    pub fn truncate_to(&mut self, context: &Arc<Context>) -> Result<()> {
        if !context.is_prefix_of(&self.ctx) {
            return Err(Error::InvalidContext);
        }
        let rows = context.q.len();
        if rows < self.ctx.q.len() {
            self.coefficients
                .slice_mut(s![rows.., ..])
                .iter_mut()
                .for_each(|c| c.zeroize());
            self.coefficients = self.coefficients.slice(s![..rows, ..]).to_owned();
        }
        self.ctx = context.clone();
        Ok(())
    }

    /// Returns the context of the underlying polynomial
    pub fn ctx(&self) -> &Arc<Context> {
        &self.ctx
    }
}
