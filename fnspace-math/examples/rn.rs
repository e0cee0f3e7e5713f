use fnspace_math::{
    normalize::{normalized_index_expression, normalized_scalar_param_list},
    ops,
    slice::Slice,
    RnSpace,
};

fn main() {
    let space = RnSpace::new(5).unwrap();

    let x = space.element_from(&[1., -2., 3., -4., 5.]).unwrap();
    let y = space.full(2.).unwrap();

    // z = 2x - y
    let mut z = space.element().unwrap();
    space.lincomb(&mut z, 2., &x, -1., &y).unwrap();
    assert_eq!(z.to_vec().unwrap(), [0., -6., 4., -10., 8.]);

    let mut abs = space.element().unwrap();
    ops::abs(&x, &mut abs).unwrap();
    assert_eq!(ops::sum(&abs).unwrap(), 15.);

    println!("{space:?}: <x, y> = {}", space.inner(&x, &y).unwrap());
    println!("|x| = {}", space.norm(&x).unwrap());
    println!("z = {z:?}");

    z.set(-1, 1.).unwrap();
    // every 2nd entry, counting from the back
    let back = z.get_slice(Slice::FULL.with_step(-2)).unwrap();
    assert_eq!(back, [1., 4., 0.]);

    let sizes = normalized_scalar_param_list(4usize, 3).unwrap();
    println!("sizes = {sizes:?}");

    let index = normalized_index_expression(1isize, &[3, 4, 5], false).unwrap();
    println!("index = {index:?}");
}
