//! Exact RNS scaling, i.e. computing round(x * numerator / denominator) from
//! the rests of x in one RNS basis to the rests of the result in another one.

use super::RnsContext;
use itertools::izip;
use ndarray::{ArrayView1, ArrayViewMut1};
use num_bigint::BigUint;
use num_traits::{One, ToPrimitive, Zero};
use std::sync::Arc;

/// Scaling factor when performing a RNS scaling.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct ScalingFactor {
    numerator: BigUint,
    denominator: BigUint,
    pub(crate) is_one: bool,
}

impl ScalingFactor {
    /// Create a new scaling factor. Aborts if the denominator is 0.
    pub fn new(numerator: &BigUint, denominator: &BigUint) -> Self {
        assert_ne!(denominator, &BigUint::zero());
        Self {
            numerator: numerator.clone(),
            denominator: denominator.clone(),
            is_one: numerator == denominator,
        }
    }

    /// Returns the identity element of `Self`.
    pub fn one() -> Self {
        Self {
            numerator: BigUint::one(),
            denominator: BigUint::one(),
            is_one: true,
        }
    }
}

/// Scaler in RNS basis.
///
/// The input is interpreted as an integer in [0, from.modulus()), so that
/// scaling by t / q implements the BFV decoding and scaling by q / t the BFV
/// encoding of values in [0, t).
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct RnsScaler {
    from: Arc<RnsContext>,
    to: Arc<RnsContext>,
    scaling_factor: ScalingFactor,
    half_denominator: BigUint,
}

impl RnsScaler {
    /// Create a RNS scaler by numerator / denominator.
    pub fn new(
        from: &Arc<RnsContext>,
        to: &Arc<RnsContext>,
        scaling_factor: ScalingFactor,
    ) -> Self {
        let half_denominator = &scaling_factor.denominator >> 1usize;
        Self {
            from: from.clone(),
            to: to.clone(),
            scaling_factor,
            half_denominator,
        }
    }

    /// Returns the RNS context of the input.
    pub fn from(&self) -> &Arc<RnsContext> {
        &self.from
    }

    /// Returns the RNS context of the output.
    pub fn to(&self) -> &Arc<RnsContext> {
        &self.to
    }

    /// Compute the RNS representation of the rests scaled by numerator /
    /// denominator, and store the result in `dst`.
    ///
    /// Aborts if the number of rests is different than the number of moduli
    /// of `from`, or if the size of `dst` is different than the number of
    /// moduli of `to`, in debug mode.
    pub fn scale(&self, rests: ArrayView1<u64>, mut dst: ArrayViewMut1<u64>) {
        debug_assert_eq!(rests.len(), self.from.moduli().len());
        debug_assert_eq!(dst.len(), self.to.moduli().len());

        let x = self.from.lift(rests);
        let y = if self.scaling_factor.is_one {
            x
        } else {
            (x * &self.scaling_factor.numerator + &self.half_denominator)
                / &self.scaling_factor.denominator
        };

        izip!(dst.iter_mut(), self.to.moduli()).for_each(|(di, qi)| {
            *di = (&y % *qi).to_u64().unwrap_or_default();
        });
    }

    /// Compute the RNS representation of the rests scaled by numerator /
    /// denominator.
    pub fn scale_new(&self, rests: ArrayView1<u64>) -> Vec<u64> {
        let mut out = vec![0u64; self.to.moduli().len()];
        self.scale(rests, ArrayViewMut1::from(&mut out));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::{RnsScaler, ScalingFactor};
    use crate::rns::RnsContext;
    use ndarray::ArrayView1;
    use num_bigint::BigUint;
    use rand::{thread_rng, RngCore};
    use std::{error::Error, sync::Arc};

    #[test]
    fn scaler() -> Result<(), Box<dyn Error>> {
        let ntests = 100;
        let q = Arc::new(RnsContext::new(&[4u64, 4611686018326724609, 1153])?);
        let t = Arc::new(RnsContext::new(&[1153u64])?);
        let mut rng = thread_rng();

        // Scaling by t / q.
        let down = RnsScaler::new(&q, &t, ScalingFactor::new(t.modulus(), q.modulus()));
        // Scaling by q / t.
        let up = RnsScaler::new(&t, &q, ScalingFactor::new(q.modulus(), t.modulus()));

        for _ in 0..ntests {
            let m = rng.next_u64() % 1153;
            let x = up.scale_new(ArrayView1::from(&[m]));
            // round(m * q / t) is within 1/2 of m * q / t, so scaling back down
            // recovers m.
            let y = down.scale_new(ArrayView1::from(&x));
            assert_eq!(y, vec![m]);

            let expected = (BigUint::from(m) * q.modulus() + BigUint::from(576u64))
                / BigUint::from(1153u64);
            assert_eq!(x, q.project(&expected));
        }

        // Identity scaling projects the value.
        let id = RnsScaler::new(&q, &t, ScalingFactor::one());
        let rests = q.project(&BigUint::from(2000u64));
        assert_eq!(id.scale_new(ArrayView1::from(&rests)), vec![2000 % 1153]);

        Ok(())
    }
}
