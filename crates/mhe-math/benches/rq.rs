#![allow(missing_docs)]

use criterion::measurement::WallTime;
use criterion::{criterion_group, criterion_main, BenchmarkGroup, BenchmarkId, Criterion};
use mhe_math::rq::{traits::TryConvertFrom, BasisExtender, Context, Poly, Representation};
use rand::thread_rng;
use std::{sync::Arc, time::Duration};

static MODULI: &[u64; 3] = &[
    4611686018326724609,
    4611686018309947393,
    4611686018282684417,
];

static P: &[u64; 1] = &[4611686018232352769];

static DEGREE: &[usize] = &[1024, 2048, 4096];

fn create_group(c: &mut Criterion, name: String) -> BenchmarkGroup<'_, WallTime> {
    let mut group = c.benchmark_group(name);
    group.warm_up_time(Duration::from_millis(100));
    group.measurement_time(Duration::from_secs(1));
    group
}

pub fn rq_benchmark(c: &mut Criterion) {
    let mut rng = thread_rng();

    let mut group = create_group(c, "rq_mul".to_string());
    for degree in DEGREE {
        let ctx = Arc::new(Context::new(MODULI, *degree).unwrap());
        let p = Poly::random(&ctx, Representation::Ntt, &mut rng);
        let q = Poly::random(&ctx, Representation::Ntt, &mut rng);
        group.bench_function(
            BenchmarkId::from_parameter(format!("{}/{}", degree, ctx.modulus().bits())),
            |b| b.iter(|| &p * &q),
        );
    }
    group.finish();

    let mut group = create_group(c, "rq_change_representation".to_string());
    for degree in DEGREE {
        let ctx = Arc::new(Context::new(MODULI, *degree).unwrap());
        let mut p = Poly::random(&ctx, Representation::PowerBasis, &mut rng);
        group.bench_function(
            BenchmarkId::from_parameter(format!("{}/{}", degree, ctx.modulus().bits())),
            |b| {
                b.iter(|| {
                    p.change_representation(Representation::Ntt);
                    p.change_representation(Representation::PowerBasis);
                })
            },
        );
    }
    group.finish();

    let mut group = create_group(c, "rq_switch_down".to_string());
    for degree in DEGREE {
        let ctx = Arc::new(Context::new(MODULI, *degree).unwrap());
        let p = Poly::random(&ctx, Representation::PowerBasis, &mut rng);
        group.bench_function(
            BenchmarkId::from_parameter(format!("{}/{}", degree, ctx.modulus().bits())),
            |b| {
                b.iter(|| {
                    let mut q = p.clone();
                    q.switch_down().unwrap();
                })
            },
        );
    }
    group.finish();

    let mut group = create_group(c, "rq_mod_down".to_string());
    for degree in DEGREE {
        let ctx = Arc::new(Context::new(MODULI, *degree).unwrap());
        let ctx_p = Arc::new(Context::new(P, *degree).unwrap());
        let extender = BasisExtender::new(&ctx, &ctx_p).unwrap();
        let x_q = Poly::random(&ctx, Representation::PowerBasis, &mut rng);
        let x_p = Poly::try_convert_from(&[-1i64, 2, 3][..], &ctx_p, Representation::PowerBasis)
            .unwrap();
        group.bench_function(
            BenchmarkId::from_parameter(format!("{}/{}", degree, ctx.modulus().bits())),
            |b| {
                b.iter(|| {
                    let mut q = x_q.clone();
                    extender.mod_down(&mut q, &x_p).unwrap();
                })
            },
        );
    }
    group.finish();
}

criterion_group!(rq, rq_benchmark);
criterion_main!(rq);
