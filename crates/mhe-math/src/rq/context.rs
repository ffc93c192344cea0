use num_bigint::BigUint;
use std::{fmt::Debug, sync::Arc};

use crate::{ntt::NttOperator, rns::RnsContext, zq::Modulus, Error, Result};

/// Struct that holds the context associated with elements in rq.
#[derive(Default, Clone, PartialEq, Eq)]
pub struct Context {
    pub(crate) moduli: Box<[u64]>,
    pub(crate) q: Box<[Modulus]>,
    pub(crate) rns: Arc<RnsContext>,
    pub(crate) ops: Box<[NttOperator]>,
    pub(crate) degree: usize,
    pub(crate) inv_last_qi_mod_qj: Box<[u64]>,
    pub(crate) inv_last_qi_mod_qj_shoup: Box<[u64]>,
    pub(crate) next_context: Option<Arc<Context>>,
}

impl Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("moduli", &self.moduli)
            .field("degree", &self.degree)
            .finish()
    }
}

impl Context {
    /// Creates a context from a list of moduli and a polynomial degree.
    ///
    /// Returns an error if the moduli are not primes less than 62 bits which
    /// supports the NTT of size `degree`.
    pub fn new(moduli: &[u64], degree: usize) -> Result<Self> {
        if !degree.is_power_of_two() || degree < 8 {
            return Err(Error::Default(
                "The degree is not a power of two larger or equal to 8".to_string(),
            ));
        }

        let rns = Arc::new(RnsContext::new(moduli)?);
        let mut q = Vec::with_capacity(moduli.len());
        let mut ops = Vec::with_capacity(moduli.len());
        for modulus in moduli {
            let qi = Modulus::new(*modulus)?;
            let op = NttOperator::new(&qi, degree).ok_or_else(|| {
                Error::Default("Impossible to construct a Ntt operator".to_string())
            })?;
            q.push(qi);
            ops.push(op);
        }

        let mut inv_last_qi_mod_qj = Vec::with_capacity(moduli.len().saturating_sub(1));
        let mut inv_last_qi_mod_qj_shoup = Vec::with_capacity(moduli.len().saturating_sub(1));
        if let Some((q_last, q_others)) = moduli.split_last() {
            for qi in &q[..q_others.len()] {
                let inv = qi
                    .inv(qi.reduce(*q_last))
                    .ok_or_else(|| Error::Default("The moduli are not coprime".to_string()))?;
                inv_last_qi_mod_qj.push(inv);
                inv_last_qi_mod_qj_shoup.push(qi.shoup(inv));
            }
        }

        let next_context = if moduli.len() >= 2 {
            Some(Arc::new(Context::new(&moduli[..moduli.len() - 1], degree)?))
        } else {
            None
        };

        Ok(Self {
            moduli: moduli.to_owned().into_boxed_slice(),
            q: q.into_boxed_slice(),
            rns,
            ops: ops.into_boxed_slice(),
            degree,
            inv_last_qi_mod_qj: inv_last_qi_mod_qj.into_boxed_slice(),
            inv_last_qi_mod_qj_shoup: inv_last_qi_mod_qj_shoup.into_boxed_slice(),
            next_context,
        })
    }

    /// Creates a context in an `Arc`.
    pub fn new_arc(moduli: &[u64], degree: usize) -> Result<Arc<Self>> {
        Self::new(moduli, degree).map(Arc::new)
    }

    /// Returns the modulus as a BigUint.
    pub fn modulus(&self) -> &BigUint {
        self.rns.modulus()
    }

    /// Returns a reference to the moduli in this context.
    pub fn moduli(&self) -> &[u64] {
        &self.moduli
    }

    /// Returns a reference to the moduli as Modulus in this context.
    pub fn moduli_operators(&self) -> &[Modulus] {
        &self.q
    }

    /// Returns the RNS context.
    pub fn rns(&self) -> &Arc<RnsContext> {
        &self.rns
    }

    /// Returns the degree of the polynomials.
    pub fn degree(&self) -> usize {
        self.degree
    }

    /// Returns the context obtained by dropping the last modulus, if any.
    pub fn next_context(&self) -> Option<&Arc<Context>> {
        self.next_context.as_ref()
    }

    /// Returns whether the moduli of `other` are a prefix of the moduli of
    /// `self`, for the same degree.
    pub fn is_prefix_of(&self, other: &Context) -> bool {
        self.degree == other.degree && other.moduli.starts_with(&self.moduli)
    }

    /// Returns the number of iterations to switch to a children context.
    /// Returns an error if the context provided is not a child context.
    pub fn niterations_to(&self, context: &Arc<Context>) -> Result<usize> {
        if context.is_prefix_of(self) {
            Ok(self.moduli.len() - context.moduli.len())
        } else {
            Err(Error::InvalidContext)
        }
    }

    /// Returns the context after `i` iterations.
    pub fn context_at_level(self: &Arc<Self>, i: usize) -> Result<Arc<Self>> {
        let mut current_ctx = self.clone();
        for _ in 0..i {
            current_ctx = current_ctx
                .next_context
                .clone()
                .ok_or_else(|| Error::Default("No context at the specified level".to_string()))?;
        }
        Ok(current_ctx)
    }
}
