//! Basis extension between R_q\[x\] and R_q\[x\] x R_p\[x\], where `p` is the
//! product of auxiliary moduli disjoint from the moduli of `q`.

use super::{Context, Poly, Representation};
use crate::{Error, Result};
use itertools::izip;
use ndarray::Axis;
use num_bigint::BigUint;
use std::sync::Arc;

/// Divides polynomials given over the extended basis `q * p` by `p`.
///
/// An element of R_qp is represented by a pair of polynomials, one over the
/// moduli of `q` and one over the moduli of `p`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasisExtender {
    ctx_q: Arc<Context>,
    ctx_p: Arc<Context>,
    p_inv_mod_qi: Box<[u64]>,
    p_inv_mod_qi_shoup: Box<[u64]>,
}

impl BasisExtender {
    /// Creates a basis extender from the largest context of `q` and the
    /// context of `p`.
    ///
    /// Returns an error if the degrees differ or if `p` is not invertible
    /// modulo one of the moduli of `q`.
    pub fn new(ctx_q: &Arc<Context>, ctx_p: &Arc<Context>) -> Result<Self> {
        if ctx_q.degree != ctx_p.degree {
            return Err(Error::Default(
                "The contexts should be for polynomials of the same degree".to_string(),
            ));
        }

        let p_mod_qi = ctx_q.rns.project(ctx_p.modulus());
        let mut p_inv_mod_qi = Vec::with_capacity(ctx_q.q.len());
        let mut p_inv_mod_qi_shoup = Vec::with_capacity(ctx_q.q.len());
        for (qi, pi) in izip!(ctx_q.q.iter(), p_mod_qi.iter()) {
            let inv = qi.inv(*pi).ok_or_else(|| {
                Error::Default("The auxiliary moduli must be distinct from the moduli".to_string())
            })?;
            p_inv_mod_qi.push(inv);
            p_inv_mod_qi_shoup.push(qi.shoup(inv));
        }

        Ok(Self {
            ctx_q: ctx_q.clone(),
            ctx_p: ctx_p.clone(),
            p_inv_mod_qi: p_inv_mod_qi.into_boxed_slice(),
            p_inv_mod_qi_shoup: p_inv_mod_qi_shoup.into_boxed_slice(),
        })
    }

    /// Returns the product of the auxiliary moduli.
    pub fn p(&self) -> &BigUint {
        self.ctx_p.modulus()
    }

    /// Returns the context of the auxiliary moduli.
    pub fn ctx_p(&self) -> &Arc<Context> {
        &self.ctx_p
    }

    /// Computes round(x / p) for the element x of R_qp given by `q_part` and
    /// `p_part`, and stores the result in `q_part`.
    ///
    /// Both polynomials must be in PowerBasis representation; `q_part` may be
    /// defined over any prefix of the moduli of `q`.
    pub fn mod_down(&self, q_part: &mut Poly, p_part: &Poly) -> Result<()> {
        if q_part.representation != Representation::PowerBasis {
            return Err(Error::IncorrectRepresentation(
                q_part.representation,
                Representation::PowerBasis,
            ));
        }
        if p_part.representation != Representation::PowerBasis {
            return Err(Error::IncorrectRepresentation(
                p_part.representation,
                Representation::PowerBasis,
            ));
        }
        if p_part.ctx != self.ctx_p || !q_part.ctx.is_prefix_of(&self.ctx_q) {
            return Err(Error::InvalidContext);
        }

        let ctx = q_part.ctx.clone();
        izip!(
            q_part.coefficients.axis_iter_mut(Axis(1)),
            p_part.coefficients.axis_iter(Axis(1))
        )
        .for_each(|(mut x_q, x_p)| {
            // Centered representative of x mod p, projected onto q.
            let (negative, magnitude) = self.ctx_p.rns.lift_centered(x_p);
            let rests = ctx.rns.project(&magnitude);
            izip!(
                x_q.iter_mut(),
                rests.iter(),
                ctx.q.iter(),
                self.p_inv_mod_qi.iter(),
                self.p_inv_mod_qi_shoup.iter()
            )
            .for_each(|(xi, ri, qi, inv, inv_shoup)| {
                let diff = if negative {
                    qi.add(*xi, *ri)
                } else {
                    qi.sub(*xi, *ri)
                };
                *xi = qi.mul_shoup(diff, *inv, *inv_shoup);
            });
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::BasisExtender;
    use crate::rq::{traits::TryConvertFrom, Context, Poly, Representation};
    use num_bigint::{BigInt, BigUint, Sign};
    use num_traits::Zero;
    use rand::{thread_rng, Rng};
    use std::{error::Error, sync::Arc};

    static Q: &[u64; 3] = &[
        4611686018282684417,
        4611686018326724609,
        4611686018309947393,
    ];
    static P: &[u64; 2] = &[4611686018232352769, 4611686018171535361];

    #[test]
    fn constructor() -> Result<(), Box<dyn Error>> {
        let ctx_q = Arc::new(Context::new(Q, 16)?);
        let ctx_p = Arc::new(Context::new(P, 16)?);
        assert!(BasisExtender::new(&ctx_q, &ctx_p).is_ok());

        // The auxiliary moduli must be distinct from the moduli.
        let ctx_p = Arc::new(Context::new(&Q[..1], 16)?);
        assert!(BasisExtender::new(&ctx_q, &ctx_p).is_err());

        // The degrees must match.
        let ctx_p = Arc::new(Context::new(P, 32)?);
        assert!(BasisExtender::new(&ctx_q, &ctx_p).is_err());
        Ok(())
    }

    #[test]
    fn mod_down_of_multiple_of_p() -> Result<(), Box<dyn Error>> {
        let mut rng = thread_rng();
        let ctx_q = Arc::new(Context::new(Q, 16)?);
        let ctx_p = Arc::new(Context::new(P, 16)?);
        let extender = BasisExtender::new(&ctx_q, &ctx_p)?;

        for ctx in [ctx_q.clone(), ctx_q.context_at_level(1)?] {
            // (a * p + e) / p rounds to a for small e.
            let a = Poly::random(&ctx, Representation::PowerBasis, &mut rng);
            let e = (0..16)
                .map(|_| rng.gen_range(-1000i64..=1000))
                .collect::<Vec<_>>();
            let mut x_q = &a * extender.p();
            x_q += &Poly::try_convert_from(e.as_slice(), &ctx, Representation::PowerBasis)?;
            let x_p = Poly::try_convert_from(e.as_slice(), &ctx_p, Representation::PowerBasis)?;

            extender.mod_down(&mut x_q, &x_p)?;
            assert_eq!(x_q, a);
        }
        Ok(())
    }

    #[test]
    fn mod_down_rounds() -> Result<(), Box<dyn Error>> {
        let mut rng = thread_rng();
        let ctx_q = Arc::new(Context::new(Q, 16)?);
        let ctx_p = Arc::new(Context::new(P, 16)?);
        let extender = BasisExtender::new(&ctx_q, &ctx_p)?;

        let x_q = Poly::random(&ctx_q, Representation::PowerBasis, &mut rng);
        let x_p = Poly::random(&ctx_p, Representation::PowerBasis, &mut rng);
        let mut out = x_q.clone();
        extender.mod_down(&mut out, &x_p)?;

        // out * p = x - [x]_p mod q, where [x]_p is the centered rest modulo p.
        let p = extender.p();
        let q = ctx_q.modulus();
        let expected = Vec::<BigUint>::from(&x_q)
            .iter()
            .zip(Vec::<BigUint>::from(&x_p))
            .map(|(xq, xp)| {
                let centered = if &xp << 1 > *p {
                    BigInt::from_biguint(Sign::Minus, p - &xp)
                } else {
                    BigInt::from_biguint(Sign::Plus, xp)
                };
                let q_int = BigInt::from_biguint(Sign::Plus, q.clone());
                let mut d = (BigInt::from_biguint(Sign::Plus, xq.clone()) - centered) % &q_int;
                if d < BigInt::zero() {
                    d += &q_int;
                }
                d.to_biguint().unwrap_or_default()
            })
            .collect::<Vec<_>>();
        let got = Vec::<BigUint>::from(&(&out * p));
        assert_eq!(got, expected);
        Ok(())
    }

    #[test]
    fn mod_down_errors() -> Result<(), Box<dyn Error>> {
        let mut rng = thread_rng();
        let ctx_q = Arc::new(Context::new(Q, 16)?);
        let ctx_p = Arc::new(Context::new(P, 16)?);
        let extender = BasisExtender::new(&ctx_q, &ctx_p)?;

        let mut x_q = Poly::random(&ctx_q, Representation::Ntt, &mut rng);
        let x_p = Poly::random(&ctx_p, Representation::PowerBasis, &mut rng);
        assert!(extender.mod_down(&mut x_q, &x_p).is_err());

        let mut x_q = Poly::random(&ctx_q, Representation::PowerBasis, &mut rng);
        let x_q_copy = x_q.clone();
        assert!(extender.mod_down(&mut x_q, &x_q_copy).is_err());
        Ok(())
    }
}
