use fnspace_math::{ops, sys::device::cuda::Cuda, sys::Backend, FnSpace};

fn main() {
    let backend = Backend::from_env();
    if backend != Backend::Cuda {
        eprintln!(
            "cuda is not available, set {}=cuda on a machine with a gpu",
            Backend::ENV_VAR
        );
        return;
    }

    run()
}

fn run() {
    let space = FnSpace::<f32, Cuda>::on_default_device(1 << 20).unwrap();
    println!("running on {space}");

    let x = space.full(3.).unwrap();
    let y = space.full(4.).unwrap();

    let mut z = space.element().unwrap();
    space.lincomb(&mut z, 1., &x, 1., &y).unwrap();
    assert_eq!(z.get(-1).unwrap(), 7.);

    let mut m = space.element().unwrap();
    ops::max_vector_scalar(&x, 3.5, &mut m).unwrap();
    assert_eq!(ops::sum(&m).unwrap(), 3.5 * (1 << 20) as f32);

    let x = space.element_from_cast(&[3u8, 4].repeat(1 << 19)).unwrap();
    println!("|x| = {}", space.norm(&x).unwrap());
}
