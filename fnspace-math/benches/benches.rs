use criterion::{black_box, criterion_group, criterion_main, Bencher, Criterion};
use fnspace_sys::device::Device;

use fnspace_math::{kernels::InnerProduct, FnSpace, RnSpace, Vector};

const DIM: usize = 1 << 16;

/// Performs 100 linear combinations and inner products on vectors of length 2^16
pub fn lincomb_inner_100<D: Device>(space: &FnSpace<f32, D>, init: &[f32]) -> f32
where
    f32: InnerProduct<D>,
{
    let x = space.element_from(init).unwrap();
    let y = x.try_clone().unwrap();
    let mut z: Vector<f32, D> = space.element().unwrap();

    let mut acc = 0.0;
    for _ in 0..100 {
        space.lincomb(&mut z, 0.5, &x, -0.25, &y).unwrap();
        acc += space.inner(&z, &x).unwrap();
    }
    acc
}

pub fn lincomb(c: &mut Criterion) {
    let mut group = c.benchmark_group("lincomb");

    let init: Vec<f32> = (0..DIM).map(|i| (i % 17) as f32 * 0.125).collect();

    let space = RnSpace::new(DIM).unwrap();
    let cpu = |b: &mut Bencher| {
        b.iter(|| black_box(lincomb_inner_100(&space, &init)));
    };

    #[cfg(feature = "openblas")]
    group.bench_function("openblas", cpu);

    #[cfg(feature = "blis")]
    group.bench_function("blis", cpu);

    #[cfg(feature = "netlib")]
    group.bench_function("netlib", cpu);

    #[cfg(feature = "accelerate")]
    group.bench_function("accelerate", cpu);

    #[cfg(feature = "intel-mkl")]
    group.bench_function("intel-mkl", cpu);

    #[cfg(not(feature = "blas-sys"))]
    group.bench_function("cpu", cpu);

    #[cfg(feature = "cuda")]
    {
        use fnspace_sys::device::cuda::Cuda;

        match FnSpace::<f32, Cuda>::on_default_device(DIM) {
            Ok(space) => {
                group.bench_function("cuda", |b| {
                    // includes the host to device copy of the input
                    b.iter(|| black_box(lincomb_inner_100(&space, &init)));
                });
            }
            Err(err) => eprintln!("skipping cuda benchmark: {err}"),
        }
    }

    group.finish();
}

pub fn norm(c: &mut Criterion) {
    let mut group = c.benchmark_group("norm");

    let space = FnSpace::<f64>::new(DIM).unwrap();
    let x = space.full(0.5).unwrap();
    group.bench_function("cpu", |b| {
        b.iter(|| black_box(space.norm(&x).unwrap()));
    });

    group.finish();
}

criterion_group!(benches, lincomb, norm);
criterion_main!(benches);
