//! Implementation of conversions from and to polynomials.

use super::{traits::TryConvertFrom, Context, Poly, Representation};
use crate::{Error, Result};
use itertools::{izip, Itertools};
use ndarray::{Array2, ArrayView, Axis};
use num_bigint::BigUint;
use std::sync::Arc;
use zeroize::{Zeroize, Zeroizing};

impl TryConvertFrom<Vec<u64>> for Poly {
    fn try_convert_from<R>(mut v: Vec<u64>, ctx: &Arc<Context>, representation: R) -> Result<Self>
    where
        R: Into<Option<Representation>>,
    {
        let repr = representation.into().ok_or_else(|| {
            Error::Default(
                "When converting from a vector, the representation needs to be specified"
                    .to_string(),
            )
        })?;

        if v.len() == ctx.q.len() * ctx.degree {
            let coefficients = Array2::from_shape_vec((ctx.q.len(), ctx.degree), v)
                .map_err(|e| Error::Default(e.to_string()))?;
            Poly::try_convert_from(coefficients, ctx, repr)
        } else if repr == Representation::PowerBasis && v.len() <= ctx.degree {
            let mut out = Self::zero(ctx, repr);
            izip!(out.coefficients.outer_iter_mut(), ctx.q.iter()).for_each(|(mut w, qi)| {
                w.iter_mut()
                    .zip(v.iter())
                    .for_each(|(wi, vi)| *wi = qi.reduce(*vi));
            });
            v.zeroize();
            Ok(out)
        } else if repr == Representation::PowerBasis {
            Err(Error::Default("In PowerBasis representation, either all coefficients must be specified, or only coefficients up to the degree".to_string()))
        } else {
            Err(Error::Default(
                "In Ntt representation, all coefficients must be specified".to_string(),
            ))
        }
    }
}

impl TryConvertFrom<Array2<u64>> for Poly {
    fn try_convert_from<R>(a: Array2<u64>, ctx: &Arc<Context>, representation: R) -> Result<Self>
    where
        R: Into<Option<Representation>>,
    {
        if a.shape() != [ctx.q.len(), ctx.degree] {
            Err(Error::Default(
                "The array of coefficient does not have the correct shape".to_string(),
            ))
        } else if let Some(repr) = representation.into() {
            if izip!(a.outer_iter(), ctx.moduli.iter()).any(|(row, qi)| row.iter().any(|c| c >= qi))
            {
                return Err(Error::Default(
                    "The coefficients are not reduced modulo the moduli".to_string(),
                ));
            }
            Ok(Self {
                ctx: ctx.clone(),
                representation: repr,
                coefficients: a,
            })
        } else {
            Err(Error::Default("When converting from a 2-dimensional array, the representation needs to be specified".to_string()))
        }
    }
}

impl<'a> TryConvertFrom<&'a [u64]> for Poly {
    fn try_convert_from<R>(v: &'a [u64], ctx: &Arc<Context>, representation: R) -> Result<Self>
    where
        R: Into<Option<Representation>>,
    {
        Poly::try_convert_from(v.to_vec(), ctx, representation)
    }
}

impl<'a> TryConvertFrom<&'a Vec<u64>> for Poly {
    fn try_convert_from<R>(v: &'a Vec<u64>, ctx: &Arc<Context>, representation: R) -> Result<Self>
    where
        R: Into<Option<Representation>>,
    {
        Poly::try_convert_from(v.to_vec(), ctx, representation)
    }
}

/// Signed coefficients are always interpreted in power basis; the polynomial
/// is then converted to the requested representation.
impl<'a> TryConvertFrom<&'a [i64]> for Poly {
    fn try_convert_from<R>(v: &'a [i64], ctx: &Arc<Context>, representation: R) -> Result<Self>
    where
        R: Into<Option<Representation>>,
    {
        let repr = representation.into().unwrap_or_default();
        if v.len() > ctx.degree {
            return Err(Error::Default("In PowerBasis representation with signed integers, only `degree` coefficients can be specified".to_string()));
        }

        let mut out = Self::zero(ctx, Representation::PowerBasis);
        izip!(out.coefficients.outer_iter_mut(), ctx.q.iter()).for_each(|(mut w, qi)| {
            let reduced = Zeroizing::new(qi.reduce_vec_i64(v));
            w.iter_mut()
                .zip(reduced.iter())
                .for_each(|(wi, ri)| *wi = *ri);
        });
        out.change_representation(repr);
        Ok(out)
    }
}

impl<'a> TryConvertFrom<&'a Vec<i64>> for Poly {
    fn try_convert_from<R>(v: &'a Vec<i64>, ctx: &Arc<Context>, representation: R) -> Result<Self>
    where
        R: Into<Option<Representation>>,
    {
        Poly::try_convert_from(v.as_slice(), ctx, representation)
    }
}

impl<'a> TryConvertFrom<&'a [BigUint]> for Poly {
    fn try_convert_from<R>(v: &'a [BigUint], ctx: &Arc<Context>, representation: R) -> Result<Self>
    where
        R: Into<Option<Representation>>,
    {
        let repr = representation.into().ok_or_else(|| {
            Error::Default(
                "When converting from a vector, the representation needs to be specified"
                    .to_string(),
            )
        })?;

        if v.len() > ctx.degree {
            return Err(Error::Default(
                "The slice contains too many big integers compared to the polynomial degree"
                    .to_string(),
            ));
        }

        let mut coefficients = Array2::zeros((ctx.q.len(), ctx.degree));
        izip!(coefficients.axis_iter_mut(Axis(1)), v).for_each(|(mut c, vi)| {
            c.assign(&ArrayView::from(&ctx.rns.project(vi)));
        });

        Ok(Self {
            ctx: ctx.clone(),
            representation: repr,
            coefficients,
        })
    }
}

impl From<&Poly> for Vec<u64> {
    fn from(p: &Poly) -> Self {
        p.coefficients.iter().copied().collect_vec()
    }
}

impl From<&Poly> for Vec<BigUint> {
    fn from(p: &Poly) -> Self {
        p.coefficients
            .axis_iter(Axis(1))
            .map(|c| p.ctx.rns.lift(c))
            .collect_vec()
    }
}
