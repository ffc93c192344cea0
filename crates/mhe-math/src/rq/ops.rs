//! Implementation of operations over polynomials.

use super::{Poly, Representation};
use itertools::izip;
use num_bigint::BigUint;
use std::ops::{Add, AddAssign, Mul, MulAssign, Neg, Sub, SubAssign};

impl AddAssign<&Poly> for Poly {
    fn add_assign(&mut self, p: &Poly) {
        assert_eq!(
            self.representation, p.representation,
            "Incompatible representations"
        );
        debug_assert_eq!(self.ctx, p.ctx, "Incompatible contexts");
        izip!(
            self.coefficients.outer_iter_mut(),
            p.coefficients.outer_iter(),
            self.ctx.q.iter()
        )
        .for_each(|(mut v1, v2, qi)| {
            izip!(v1.iter_mut(), v2.iter()).for_each(|(a, b)| *a = qi.add(*a, *b))
        });
    }
}

impl Add<&Poly> for &Poly {
    type Output = Poly;
    fn add(self, p: &Poly) -> Poly {
        let mut q = self.clone();
        q += p;
        q
    }
}

impl Add for Poly {
    type Output = Poly;
    fn add(self, mut p: Poly) -> Poly {
        p += &self;
        p
    }
}

impl SubAssign<&Poly> for Poly {
    fn sub_assign(&mut self, p: &Poly) {
        assert_eq!(
            self.representation, p.representation,
            "Incompatible representations"
        );
        debug_assert_eq!(self.ctx, p.ctx, "Incompatible contexts");
        izip!(
            self.coefficients.outer_iter_mut(),
            p.coefficients.outer_iter(),
            self.ctx.q.iter()
        )
        .for_each(|(mut v1, v2, qi)| {
            izip!(v1.iter_mut(), v2.iter()).for_each(|(a, b)| *a = qi.sub(*a, *b))
        });
    }
}

impl Sub<&Poly> for &Poly {
    type Output = Poly;
    fn sub(self, p: &Poly) -> Poly {
        let mut q = self.clone();
        q -= p;
        q
    }
}

impl MulAssign<&Poly> for Poly {
    fn mul_assign(&mut self, p: &Poly) {
        assert_eq!(
            self.representation,
            Representation::Ntt,
            "Multiplication requires an Ntt representation."
        );
        assert_eq!(
            p.representation,
            Representation::Ntt,
            "Multiplication requires an Ntt representation."
        );
        debug_assert_eq!(self.ctx, p.ctx, "Incompatible contexts");
        izip!(
            self.coefficients.outer_iter_mut(),
            p.coefficients.outer_iter(),
            self.ctx.q.iter()
        )
        .for_each(|(mut v1, v2, qi)| {
            izip!(v1.iter_mut(), v2.iter()).for_each(|(a, b)| *a = qi.mul(*a, *b))
        });
    }
}

impl Mul<&Poly> for &Poly {
    type Output = Poly;
    fn mul(self, p: &Poly) -> Poly {
        let mut q = self.clone();
        q *= p;
        q
    }
}

impl MulAssign<&BigUint> for Poly {
    fn mul_assign(&mut self, p: &BigUint) {
        // Project the scalar into its CRT representation (reduced modulo each prime)
        let scalar_crt = self.ctx.rns.project(p);
        izip!(
            self.coefficients.outer_iter_mut(),
            scalar_crt.iter(),
            self.ctx.q.iter()
        )
        .for_each(|(mut v1, scalar_qi, qi)| {
            v1.iter_mut().for_each(|a| *a = qi.mul(*a, *scalar_qi))
        });
    }
}

impl Mul<&BigUint> for &Poly {
    type Output = Poly;
    fn mul(self, p: &BigUint) -> Poly {
        let mut q = self.clone();
        q *= p;
        q
    }
}

impl Mul<&Poly> for &BigUint {
    type Output = Poly;
    fn mul(self, p: &Poly) -> Poly {
        p * self
    }
}

impl Neg for &Poly {
    type Output = Poly;

    fn neg(self) -> Poly {
        -self.clone()
    }
}

impl Neg for Poly {
    type Output = Poly;

    fn neg(mut self) -> Poly {
        izip!(self.coefficients.outer_iter_mut(), self.ctx.q.iter())
            .for_each(|(mut v1, qi)| v1.iter_mut().for_each(|a| *a = qi.neg(*a)));
        self
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        rq::{traits::TryConvertFrom, Context, Poly, Representation},
        zq::Modulus,
    };
    use num_bigint::BigUint;
    use rand::thread_rng;
    use std::{error::Error, sync::Arc};

    static MODULI: &[u64; 3] = &[1153, 4611686018326724609, 4611686018309947393];

    #[test]
    fn add() -> Result<(), Box<dyn Error>> {
        let mut rng = thread_rng();
        for _ in 0..50 {
            for modulus in MODULI {
                let ctx = Arc::new(Context::new(&[*modulus], 16)?);
                let m = Modulus::new(*modulus)?;

                for representation in [Representation::PowerBasis, Representation::Ntt] {
                    let p = Poly::random(&ctx, representation, &mut rng);
                    let q = Poly::random(&ctx, representation, &mut rng);
                    let r = &p + &q;
                    assert_eq!(r.representation(), &representation);
                    let mut a = Vec::<u64>::from(&p);
                    m.add_vec(&mut a, &Vec::<u64>::from(&q));
                    assert_eq!(Vec::<u64>::from(&r), a);
                }
            }

            let ctx = Arc::new(Context::new(MODULI, 16)?);
            let p = Poly::random(&ctx, Representation::PowerBasis, &mut rng);
            let q = Poly::random(&ctx, Representation::PowerBasis, &mut rng);
            let mut a = Vec::<BigUint>::from(&p);
            let b = Vec::<BigUint>::from(&q);
            a.iter_mut()
                .zip(b.iter())
                .for_each(|(ai, bi)| *ai = (&*ai + bi) % ctx.modulus());
            assert_eq!(Vec::<BigUint>::from(&(p.clone() + q.clone())), a);
            assert_eq!(p.clone() + q.clone(), q + p);
        }
        Ok(())
    }

    #[test]
    fn sub() -> Result<(), Box<dyn Error>> {
        let mut rng = thread_rng();
        for _ in 0..50 {
            for modulus in MODULI {
                let ctx = Arc::new(Context::new(&[*modulus], 16)?);
                let m = Modulus::new(*modulus)?;

                for representation in [Representation::PowerBasis, Representation::Ntt] {
                    let p = Poly::random(&ctx, representation, &mut rng);
                    let q = Poly::random(&ctx, representation, &mut rng);
                    let r = &p - &q;
                    let mut a = Vec::<u64>::from(&p);
                    m.sub_vec(&mut a, &Vec::<u64>::from(&q));
                    assert_eq!(Vec::<u64>::from(&r), a);
                    assert_eq!(&r + &q, p);
                }
            }
        }
        Ok(())
    }

    #[test]
    fn mul() -> Result<(), Box<dyn Error>> {
        let mut rng = thread_rng();
        for _ in 0..50 {
            for modulus in MODULI {
                let ctx = Arc::new(Context::new(&[*modulus], 16)?);
                let m = Modulus::new(*modulus)?;

                let p = Poly::random(&ctx, Representation::Ntt, &mut rng);
                let q = Poly::random(&ctx, Representation::Ntt, &mut rng);
                let r = &p * &q;
                assert_eq!(r.representation(), &Representation::Ntt);
                let mut a = Vec::<u64>::from(&p);
                m.mul_vec(&mut a, &Vec::<u64>::from(&q));
                assert_eq!(Vec::<u64>::from(&r), a);
            }
        }
        Ok(())
    }

    #[test]
    fn mul_is_negacyclic() -> Result<(), Box<dyn Error>> {
        let ctx = Arc::new(Context::new(MODULI, 16)?);
        // x^15 * x = x^16 = -1.
        let mut x15 = vec![0u64; 16];
        x15[15] = 1;
        let mut p = Poly::try_convert_from(&x15, &ctx, Representation::PowerBasis)?;
        let mut q = Poly::try_convert_from(&[0u64, 1][..], &ctx, Representation::PowerBasis)?;
        p.change_representation(Representation::Ntt);
        q.change_representation(Representation::Ntt);
        let mut r = &p * &q;
        r.change_representation(Representation::PowerBasis);
        assert_eq!(
            r,
            Poly::try_convert_from(&[-1i64][..], &ctx, Representation::PowerBasis)?
        );
        Ok(())
    }

    #[test]
    #[should_panic(expected = "Multiplication requires an Ntt representation.")]
    fn mul_power_basis_panics() {
        let ctx = Arc::new(Context::new(MODULI, 16).unwrap());
        let p = Poly::random(&ctx, Representation::PowerBasis, &mut thread_rng());
        let _ = &p * &p;
    }

    #[test]
    fn scalar_mul() -> Result<(), Box<dyn Error>> {
        let mut rng = thread_rng();
        let ctx = Arc::new(Context::new(MODULI, 16)?);
        let p = Poly::random(&ctx, Representation::PowerBasis, &mut rng);
        let scalar = BigUint::from(1u64 << 40) * BigUint::from(1u64 << 40);
        let r = &p * &scalar;
        let expected = Vec::<BigUint>::from(&p)
            .iter()
            .map(|c| (c * &scalar) % ctx.modulus())
            .collect::<Vec<_>>();
        assert_eq!(Vec::<BigUint>::from(&r), expected);
        assert_eq!(&scalar * &p, r);
        Ok(())
    }

    #[test]
    fn neg() -> Result<(), Box<dyn Error>> {
        let mut rng = thread_rng();
        let ctx = Arc::new(Context::new(MODULI, 16)?);
        for representation in [Representation::PowerBasis, Representation::Ntt] {
            let p = Poly::random(&ctx, representation, &mut rng);
            let q = -&p;
            assert_eq!(&p + &q, Poly::zero(&ctx, representation));
            assert_eq!(-q, p);
        }
        Ok(())
    }
}
