#![allow(clippy::indexing_slicing)]

//! Residue-Number System operations.

use crate::{zq::Modulus, Error, Result};
use itertools::{izip, Itertools};
use ndarray::ArrayView1;
use num_bigint::BigUint;
use num_bigint_dig::{BigUint as BigUintDig, ModInverse};
use num_traits::{One, ToPrimitive, Zero};
use std::fmt::Debug;

mod scaler;

pub use scaler::{RnsScaler, ScalingFactor};

/// Context for a Residue Number System.
#[derive(Default, Clone, PartialEq, Eq)]
pub struct RnsContext {
    moduli_u64: Vec<u64>,
    q_tilde: Vec<u64>,
    q_star: Vec<BigUint>,
    garner: Vec<BigUint>,
    product: BigUint,
}

impl Debug for RnsContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RnsContext")
            .field("moduli_u64", &self.moduli_u64)
            .field("product", &self.product)
            .finish()
    }
}

impl RnsContext {
    /// Create a RNS context from a list of moduli.
    ///
    /// Returns an error if the list is empty, or if the moduli are no coprime.
    pub fn new(moduli_u64: &[u64]) -> Result<Self> {
        if moduli_u64.is_empty() {
            return Err(Error::Default("The list of moduli is empty".to_string()));
        }

        let product = moduli_u64
            .iter()
            .fold(BigUint::one(), |acc, qi| acc * BigUint::from(*qi));
        let product_dig = moduli_u64
            .iter()
            .fold(BigUintDig::one(), |acc, qi| acc * BigUintDig::from(*qi));

        let mut q_tilde = Vec::with_capacity(moduli_u64.len());
        let mut q_star = Vec::with_capacity(moduli_u64.len());
        let mut garner = Vec::with_capacity(moduli_u64.len());
        for modulus in moduli_u64 {
            Modulus::new(*modulus)?;
            // q_tilde_i = (q / q_i)^(-1) mod q_i exists iff q_i is coprime with
            // the other moduli.
            let q_tilde_i = (&product_dig / modulus)
                .mod_inverse(&BigUintDig::from(*modulus))
                .and_then(|inv| inv.to_u64())
                .ok_or_else(|| Error::Default("The moduli are not coprime".to_string()))?;
            let q_star_i = &product / modulus;
            garner.push(&q_star_i * q_tilde_i);
            q_star.push(q_star_i);
            q_tilde.push(q_tilde_i);
        }

        Ok(Self {
            moduli_u64: moduli_u64.to_owned(),
            q_tilde,
            q_star,
            garner,
            product,
        })
    }

    /// Returns the product of the moduli used when creating the RNS context.
    pub const fn modulus(&self) -> &BigUint {
        &self.product
    }

    /// Returns the moduli of the RNS context.
    pub fn moduli(&self) -> &[u64] {
        &self.moduli_u64
    }

    /// Project a BigUint into its rests.
    pub fn project(&self, a: &BigUint) -> Vec<u64> {
        self.moduli_u64
            .iter()
            .map(|modulus| (a % modulus).to_u64().unwrap_or_default())
            .collect_vec()
    }

    /// Lift rests into a BigUint.
    ///
    /// Aborts if the number of rests is different than the number of moduli in
    /// debug mode.
    pub fn lift(&self, rests: ArrayView1<u64>) -> BigUint {
        debug_assert_eq!(rests.len(), self.moduli_u64.len());
        let mut result = BigUint::zero();
        izip!(rests.iter(), self.garner.iter())
            .for_each(|(r_i, garner_i)| result += garner_i * *r_i);
        result % &self.product
    }

    /// Lift rests into their centered representative, i.e. the integer in
    /// (-q/2, q/2] congruent to the rests, returned as a sign and a magnitude.
    pub fn lift_centered(&self, rests: ArrayView1<u64>) -> (bool, BigUint) {
        let x = self.lift(rests);
        if &x << 1 > self.product {
            (true, &self.product - x)
        } else {
            (false, x)
        }
    }

    /// Getter for the i-th garner coefficient.
    pub fn get_garner(&self, i: usize) -> Option<&BigUint> {
        self.garner.get(i)
    }
}
