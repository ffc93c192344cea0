use std::sync::Arc;

use crate::bfv::{BfvParameters, Ciphertext, PublicKey, SecretKey};
use crate::{Error, Result};
use mhe_math::rq::{traits::TryConvertFrom, Context, Poly, Representation};
use mhe_util::sample_vec_cbd;
use rand::{CryptoRng, RngCore};
use zeroize::Zeroizing;

use super::{Aggregate, CommonRandomPoly};

/// A party's share in the collective public key generation protocol.
///
/// Each party computes `-a * s_i + e_i`, where `a` is the common random
/// polynomial, both modulo `q` and modulo the auxiliary moduli `p` when the
/// parameters have some. Use the [`Aggregate`] impl to combine the shares
/// into a [`PublicKey`].
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct PublicKeyShare {
    pub(crate) par: Arc<BfvParameters>,
    pub(crate) crp: CommonRandomPoly,
    pub(crate) p0_share: Poly,
    pub(crate) p0_share_p: Option<Poly>,
}

impl PublicKeyShare {
    /// Participate in a new collective public key generation.
    ///
    /// 1. *Private input*: BFV secret key share
    /// 2. *Public input*: common random polynomial, generated with
    ///    [`CommonRandomPoly::new`]
    pub fn new<R: RngCore + CryptoRng>(
        sk_share: &SecretKey,
        crp: CommonRandomPoly,
        rng: &mut R,
    ) -> Result<Self> {
        let par = sk_share.par.clone();
        if crp.level != par.max_level() || crp.poly_p.is_some() != par.extender.is_some() {
            return Err(Error::UnspecifiedInput(
                "The CRP of the public key generation must be sampled with `CommonRandomPoly::new`"
                    .to_string(),
            ));
        }

        let e = Zeroizing::new(
            sample_vec_cbd(par.degree(), par.variance, rng)
                .map_err(|e| Error::DefaultError(e.to_string()))?,
        );
        let share = |a: &Poly, ctx: &Arc<Context>| -> Result<Poly> {
            let s = sk_share.poly_in(ctx)?;
            let mut p0 = Poly::try_convert_from(e.as_slice(), ctx, Representation::Ntt)?;
            p0 -= &(a * s.as_ref());
            Ok(p0)
        };

        let p0_share = share(&crp.poly, crp.poly.ctx())?;
        let p0_share_p = match (&crp.poly_p, &par.extender) {
            (Some(a_p), Some(extender)) => Some(share(a_p, extender.ctx_p())?),
            _ => None,
        };

        Ok(Self {
            par,
            crp,
            p0_share,
            p0_share_p,
        })
    }
}

impl Aggregate<PublicKeyShare> for PublicKey {
    fn from_shares<T>(iter: T) -> Result<Self>
    where
        T: IntoIterator<Item = PublicKeyShare>,
    {
        let mut shares = iter.into_iter();
        let share = shares.next().ok_or(Error::TooFewValues(0, 1))?;
        let mut p0 = share.p0_share.clone();
        let mut p0_p = share.p0_share_p.clone();
        for sh in shares {
            if sh.crp != share.crp {
                return Err(Error::UnspecifiedInput(
                    "The shares were generated with different CRPs".to_string(),
                ));
            }
            p0 += &sh.p0_share;
            if let (Some(p0_p), Some(sh_p)) = (p0_p.as_mut(), sh.p0_share_p.as_ref()) {
                *p0_p += sh_p;
            }
        }

        let c_p = match (p0_p, share.crp.poly_p.clone()) {
            (Some(p0_p), Some(a_p)) => Some(vec![p0_p, a_p]),
            _ => None,
        };

        Ok(PublicKey {
            c: Ciphertext::new(vec![p0, share.crp.poly.clone()], &share.par)?,
            c_p,
            par: share.par.clone(),
        })
    }
}
