use diol::prelude::*;
use rand::prelude::*;
use tilework::{drivers, Config, Context, Transpose};

fn random(n: usize) -> Vec<f64> {
    let rng = &mut StdRng::seed_from_u64(0);
    (0..n * n).map(|_| rng.gen::<f64>() - 0.5).collect()
}

fn context(tile_size: usize) -> Context {
    Context::new(
        Config::default()
            .with_tile_size(tile_size)
            .with_inner_block(Ord::min(32, tile_size)),
    )
    .unwrap()
}

fn gemm(bencher: Bencher, PlotArg(n): PlotArg) {
    let ctx = context(128);
    let a = random(n);
    let b = random(n);
    let mut c = vec![0.0f64; n * n];

    bencher.bench(|| {
        drivers::gemm(
            &ctx,
            Transpose::NoTrans,
            Transpose::NoTrans,
            n,
            n,
            n,
            1.0,
            &a,
            n,
            &b,
            n,
            0.0,
            &mut c,
            n,
        )
        .unwrap();
    })
}

fn factor_tiles_qr(bencher: Bencher, PlotArg(n): PlotArg) {
    let ctx = context(128);
    let a = random(n);

    bencher.bench(|| {
        drivers::factor_tiles_qr(&ctx, n, n, &a, n).unwrap();
    })
}

fn symmetric_norm(bencher: Bencher, PlotArg(n): PlotArg) {
    let ctx = context(256);
    let a = random(n);

    bencher.bench(|| {
        drivers::lansy_frobenius(&ctx, tilework::Uplo::Lower, n, &a, n).unwrap();
    })
}

fn main() -> std::io::Result<()> {
    let mut bench = Bench::new(BenchConfig::from_args()?);
    let args = [64, 128, 256, 512, 1024].map(PlotArg);
    bench.register_many(list![gemm, factor_tiles_qr, symmetric_norm], args);
    bench.run()?;

    Ok(())
}
