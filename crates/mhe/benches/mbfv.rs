use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use mhe::bfv::{BfvParametersBuilder, Encoding, Plaintext, PublicKey, SecretKey};
use mhe::mbfv::{
    AdditiveShare, CommonRandomPoly, EncryptionToSharesProtocol, PublicKeySwitchProtocol,
    RefreshProtocol, SecretKeySwitchProtocol, SharesToEncryptionProtocol,
};
use mhe_traits::{FheEncoder, FheEncrypter};
use rand::thread_rng;
use std::time::Duration;

const SIGMA: f64 = 3.2;

pub fn mbfv_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("mbfv");
    group.sample_size(10);
    group.warm_up_time(Duration::from_millis(600));
    group.measurement_time(Duration::from_millis(1000));

    let mut rng = thread_rng();
    for (degree, moduli_sizes) in [(2048, vec![62]), (4096, vec![62, 62]), (8192, vec![62; 3])] {
        let par = BfvParametersBuilder::new()
            .set_degree(degree)
            .set_plaintext_modulus(1153)
            .set_moduli_sizes(&moduli_sizes)
            .set_auxiliary_moduli_sizes(&[62])
            .build_arc()
            .unwrap();
        let level = par.max_level();
        let q = par.moduli_sizes().iter().sum::<usize>();
        let name = format!("n={}/log(q)={}", par.degree(), q);

        let sk = SecretKey::random(&par, &mut rng).unwrap();
        let sk_out = SecretKey::random(&par, &mut rng).unwrap();
        let pk_out = PublicKey::new(&sk_out, &mut rng).unwrap();
        let pt = Plaintext::try_encode(
            &(0..par.degree() as u64).collect::<Vec<_>>(),
            Encoding::poly_at_level(level),
            &par,
        )
        .unwrap();
        let ct = sk.try_encrypt(&pt, &mut rng).unwrap();

        let mut cks = SecretKeySwitchProtocol::new(&par, SIGMA).unwrap();
        let mut cks_share = cks.allocate_share(level).unwrap();
        group.bench_function(BenchmarkId::new("cks_gen_share", &name), |b| {
            b.iter(|| {
                cks.gen_share(&sk, &sk_out, &ct, &mut cks_share, &mut rng)
                    .unwrap()
            });
        });

        let pcks = PublicKeySwitchProtocol::new(&par, SIGMA).unwrap();
        let mut pcks_share = pcks.allocate_share(level).unwrap();
        group.bench_function(BenchmarkId::new("pcks_gen_share", &name), |b| {
            b.iter(|| {
                pcks.gen_share(&sk, &pk_out, &ct, &mut pcks_share, &mut rng)
                    .unwrap()
            });
        });

        let mut e2s = EncryptionToSharesProtocol::new(&par, SIGMA).unwrap();
        let mut secret_share = AdditiveShare::zero(&par);
        let mut public_share = e2s.allocate_share(level).unwrap();
        group.bench_function(BenchmarkId::new("e2s_gen_share", &name), |b| {
            b.iter(|| {
                e2s.gen_share(&sk, &ct, &mut secret_share, &mut public_share, &mut rng)
                    .unwrap()
            });
        });

        let mut s2e = SharesToEncryptionProtocol::new(&par, SIGMA).unwrap();
        let crp = CommonRandomPoly::new_leveled(&par, level, &mut rng).unwrap();
        let mut c0_share = s2e.allocate_share(level).unwrap();
        group.bench_function(BenchmarkId::new("s2e_gen_share", &name), |b| {
            b.iter(|| {
                s2e.gen_share(&sk, &crp, &secret_share, &mut c0_share, &mut rng)
                    .unwrap()
            });
        });

        let mut refresh = RefreshProtocol::new(&par, SIGMA).unwrap();
        let mut refresh_share = refresh.allocate_share(level, level).unwrap();
        group.bench_function(BenchmarkId::new("refresh_gen_share", &name), |b| {
            b.iter(|| {
                refresh
                    .gen_share(&sk, &ct, &crp, &mut refresh_share, &mut rng)
                    .unwrap()
            });
        });
    }

    group.finish();
}

criterion_group!(mbfv, mbfv_benchmark);
criterion_main!(mbfv);
