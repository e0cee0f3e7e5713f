//! Evaluation of point functions on point arrays and meshgrids.
//!
//! A point array of `d`-dimensional points has shape `(d, n)` (or `(n,)`
//! for `d == 1`), one point per column. A meshgrid is a list of `d` arrays
//! with `d` axes each that broadcast to the shape of the sampling grid.

use std::fmt;

use ndarray::{
    Array, Array1, ArrayBase, ArrayD, ArrayViewMut1, ArrayViewMutD, Axis, Data, Dimension, IxDyn,
    ShapeBuilder,
};

/// Memory and axis order of a meshgrid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MeshOrder {
    /// Row major arrays, listed in axis order.
    #[default]
    C,
    /// Column major arrays, listed in reversed axis order.
    F,
}

impl fmt::Display for MeshOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MeshOrder::C => "C",
            MeshOrder::F => "F",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VectorizationError {
    #[error("array of shape {shape:?} is not a valid input for {d}-dimensional points")]
    InvalidArray { shape: Vec<usize>, d: usize },
    #[error("input is not a valid {d}-dimensional meshgrid")]
    InvalidMeshgrid { d: usize },
    #[error("unable to determine meshgrid ordering")]
    UnknownOrder,
    #[error("meshgrid arrays cannot be broadcast together")]
    Broadcast,
    #[error("output has shape {found:?}, expected {expected:?}")]
    OutShape {
        expected: Vec<usize>,
        found: Vec<usize>,
    },
}

type Result<T, E = VectorizationError> = std::result::Result<T, E>;

/// The sparse meshgrid of `vecs`: array `i` holds `vecs[i]` along axis `i`
/// and has extent 1 along every other axis.
pub fn sparse_meshgrid<T: Clone>(vecs: &[&[T]], order: MeshOrder) -> Vec<ArrayD<T>> {
    let d = vecs.len();
    let mut mesh: Vec<ArrayD<T>> = vecs
        .iter()
        .enumerate()
        .map(|(ax, xi)| {
            let mut shape = vec![1; d];
            shape[ax] = xi.len();
            let shape = match order {
                MeshOrder::C => IxDyn(&shape).into_shape(),
                MeshOrder::F => IxDyn(&shape).f(),
            };
            // only one axis is longer than 1, so the element order is the same for both layouts
            Array::from_shape_fn(shape, |idx| xi[idx[ax]].clone())
        })
        .collect();
    if order == MeshOrder::F {
        mesh.reverse();
    }
    mesh
}

pub fn is_valid_input_array<S: Data, Dm: Dimension>(x: &ArrayBase<S, Dm>, d: usize) -> bool {
    match (d, x.shape()) {
        (1, [_]) | (1, [1, _]) => true,
        (_, [rows, _]) => *rows == d,
        _ => false,
    }
}

pub fn is_valid_input_meshgrid<S: Data, Dm: Dimension>(
    x: &[ArrayBase<S, Dm>],
    d: usize,
) -> bool {
    if d > 1 && broadcast_shape(x).is_none() {
        return false;
    }
    x.len() == d && x.iter().all(|xi| xi.ndim() == d)
}

fn broadcast_shape<S: Data, Dm: Dimension>(x: &[ArrayBase<S, Dm>]) -> Option<Vec<usize>> {
    let ndim = x.iter().map(|xi| xi.ndim()).max().unwrap_or(0);
    let mut shape = vec![1; ndim];
    for xi in x {
        let offset = ndim - xi.ndim();
        for (out, &n) in shape[offset..].iter_mut().zip(xi.shape()) {
            if *out == 1 {
                *out = n;
            } else if n != 1 && n != *out {
                return None;
            }
        }
    }
    Some(shape)
}

/// Infers the order a meshgrid was created with.
///
/// Full meshgrids are judged by contiguity, arrays that are both C and F
/// contiguous count as C. Sparse meshgrids are judged by the order of the
/// axes their members extend along.
pub fn meshgrid_input_order<S: Data, Dm: Dimension>(
    x: &[ArrayBase<S, Dm>],
) -> Result<MeshOrder> {
    let first = x.first().ok_or(VectorizationError::UnknownOrder)?;
    if x.iter().all(|xi| xi.shape() == first.shape()) {
        if x.iter().all(|xi| xi.is_standard_layout()) {
            return Ok(MeshOrder::C);
        }
        if x.iter().all(|xi| xi.t().is_standard_layout()) {
            return Ok(MeshOrder::F);
        }
        return Err(VectorizationError::UnknownOrder);
    }

    let mut axes = Vec::with_capacity(x.len());
    for xi in x {
        let mut extended = xi.shape().iter().enumerate().filter(|&(_, &n)| n != 1);
        match (extended.next(), extended.next()) {
            (Some((ax, _)), None) => axes.push(ax),
            (None, _) => {}
            (Some(_), Some(_)) => return Err(VectorizationError::UnknownOrder),
        }
    }
    if axes.windows(2).all(|w| w[0] < w[1]) {
        Ok(MeshOrder::C)
    } else if axes.windows(2).all(|w| w[0] > w[1]) {
        Ok(MeshOrder::F)
    } else {
        Err(VectorizationError::UnknownOrder)
    }
}

/// Recovers the coordinate vectors a meshgrid was built from.
pub fn vecs_from_meshgrid<T: Clone, S: Data<Elem = T>, Dm: Dimension>(
    mesh: &[ArrayBase<S, Dm>],
    order: MeshOrder,
) -> Result<Vec<Array1<T>>> {
    let d = mesh.len();
    if !mesh.iter().all(|xi| xi.ndim() == d) {
        return Err(VectorizationError::InvalidMeshgrid { d });
    }
    let seq: Vec<&ArrayBase<S, Dm>> = match order {
        MeshOrder::C => mesh.iter().collect(),
        MeshOrder::F => mesh.iter().rev().collect(),
    };
    Ok(seq
        .into_iter()
        .enumerate()
        .map(|(ax, xi)| {
            let mut lane = xi.view().into_dyn();
            // a zero length axis leaves no lane to read the coordinates from
            if (0..d).any(|other| other != ax && lane.len_of(Axis(other)) == 0) {
                return Array1::from(Vec::new());
            }
            for other in (0..d).rev().filter(|&other| other != ax) {
                lane.collapse_axis(Axis(other), 0);
            }
            lane.iter().cloned().collect()
        })
        .collect())
}

pub fn out_shape_from_meshgrid<S: Data, Dm: Dimension>(
    mesh: &[ArrayBase<S, Dm>],
) -> Result<Vec<usize>> {
    match mesh {
        [x] => Ok(vec![x.len()]),
        _ => broadcast_shape(mesh).ok_or(VectorizationError::Broadcast),
    }
}

pub fn out_shape_from_array<S: Data, Dm: Dimension>(
    arr: &ArrayBase<S, Dm>,
) -> Result<Vec<usize>> {
    match arr.shape() {
        [n] => Ok(vec![*n]),
        [_, n, ..] => Ok(vec![*n]),
        shape => Err(VectorizationError::InvalidArray {
            shape: shape.to_vec(),
            d: 0,
        }),
    }
}

/// A point function lifted to point arrays and meshgrids, see [`vectorize`].
#[derive(Clone, Copy)]
pub struct Vectorized<F> {
    func: F,
}

/// Lifts `func`, which evaluates a single point given as a coordinate slice,
/// to arrays of points and to meshgrids.
///
/// ```
/// # use fnspace_math::vectorization::{sparse_meshgrid, vectorize, MeshOrder};
/// let f = vectorize(|x: &[f64]| x[0] * x[1]);
/// let mesh = sparse_meshgrid(&[&[1.0, 2.0][..], &[3.0, 4.0, 5.0]], MeshOrder::C);
/// let out = f.on_meshgrid(&mesh)?;
/// assert_eq!(out.shape(), [2, 3]);
/// assert_eq!(out[[1, 2]], 10.0);
/// # Ok::<(), fnspace_math::vectorization::VectorizationError>(())
/// ```
pub fn vectorize<T, U, F: Fn(&[T]) -> U>(func: F) -> Vectorized<F> {
    Vectorized { func }
}

impl<F> Vectorized<F> {
    pub fn point<T, U>(&self, x: &[T]) -> U
    where
        F: Fn(&[T]) -> U,
    {
        (self.func)(x)
    }

    /// Evaluates every column of a point array.
    pub fn on_array<T, U, S, Dm>(&self, arr: &ArrayBase<S, Dm>) -> Result<Array1<U>>
    where
        F: Fn(&[T]) -> U,
        T: Clone,
        S: Data<Elem = T>,
        Dm: Dimension,
    {
        let d = point_dim(arr)?;
        let n = out_shape_from_array(arr)?[0];
        let arr = arr.view().into_dyn();
        let mut point = Vec::with_capacity(d);
        Ok((0..n)
            .map(|i| {
                point.clear();
                match arr.ndim() {
                    1 => point.push(arr[&[i][..]].clone()),
                    _ => point.extend(arr.index_axis(Axis(1), i).iter().cloned()),
                }
                (self.func)(&point)
            })
            .collect())
    }

    /// Like [`Vectorized::on_array`], writing into `out`.
    pub fn on_array_into<T, U, S, Dm>(
        &self,
        arr: &ArrayBase<S, Dm>,
        mut out: ArrayViewMut1<'_, U>,
    ) -> Result<()>
    where
        F: Fn(&[T]) -> U,
        T: Clone,
        S: Data<Elem = T>,
        Dm: Dimension,
    {
        let expected = out_shape_from_array(arr)?;
        if out.shape() != expected.as_slice() {
            return Err(VectorizationError::OutShape {
                expected,
                found: out.shape().to_vec(),
            });
        }
        let values = self.on_array(arr)?;
        for (o, v) in out.iter_mut().zip(values) {
            *o = v;
        }
        Ok(())
    }

    /// Evaluates the function on every point of the grid spanned by `mesh`.
    pub fn on_meshgrid<T, U, S, Dm>(&self, mesh: &[ArrayBase<S, Dm>]) -> Result<ArrayD<U>>
    where
        F: Fn(&[T]) -> U,
        T: Clone,
        S: Data<Elem = T>,
        Dm: Dimension,
    {
        let d = mesh.len();
        if !is_valid_input_meshgrid(mesh, d) {
            return Err(VectorizationError::InvalidMeshgrid { d });
        }
        let shape = out_shape_from_meshgrid(mesh)?;
        let order = meshgrid_input_order(mesh)?;

        let coords = match order {
            MeshOrder::C => mesh.iter().collect::<Vec<_>>(),
            MeshOrder::F => mesh.iter().rev().collect(),
        };
        let coords = coords
            .into_iter()
            .map(|xi| {
                xi.broadcast(IxDyn(&shape))
                    .ok_or(VectorizationError::Broadcast)
            })
            .collect::<Result<Vec<_>>>()?;

        let mut point = Vec::with_capacity(d);
        Ok(Array::from_shape_fn(IxDyn(&shape), |idx| {
            point.clear();
            point.extend(coords.iter().map(|c| c[idx.slice()].clone()));
            (self.func)(&point)
        }))
    }

    /// Like [`Vectorized::on_meshgrid`], writing into `out`.
    pub fn on_meshgrid_into<T, U, S, Dm>(
        &self,
        mesh: &[ArrayBase<S, Dm>],
        mut out: ArrayViewMutD<'_, U>,
    ) -> Result<()>
    where
        F: Fn(&[T]) -> U,
        T: Clone,
        S: Data<Elem = T>,
        Dm: Dimension,
    {
        let values = self.on_meshgrid(mesh)?;
        if out.shape() != values.shape() {
            return Err(VectorizationError::OutShape {
                expected: values.shape().to_vec(),
                found: out.shape().to_vec(),
            });
        }
        for (o, v) in out.iter_mut().zip(values) {
            *o = v;
        }
        Ok(())
    }
}

fn point_dim<S: Data, Dm: Dimension>(arr: &ArrayBase<S, Dm>) -> Result<usize> {
    let d = match arr.shape() {
        [_] => 1,
        [d, _] => *d,
        _ => 0,
    };
    if d > 0 && is_valid_input_array(arr, d) {
        Ok(d)
    } else {
        Err(VectorizationError::InvalidArray {
            shape: arr.shape().to_vec(),
            d,
        })
    }
}

#[cfg(test)]
mod tests {
    use ndarray::{arr1, Array, Array2, ArrayD, IxDyn, ShapeBuilder};

    use super::*;

    fn full_meshgrid(shape: &[usize], f_order: bool) -> Vec<ArrayD<f64>> {
        (0..shape.len())
            .map(|ax| {
                let sh = if f_order {
                    IxDyn(shape).f()
                } else {
                    IxDyn(shape).into_shape()
                };
                Array::from_shape_fn(sh, |idx| idx[ax] as f64)
            })
            .collect()
    }

    #[test]
    fn valid_input_array() {
        for shape in [&[1usize, 1][..], &[1, 2], &[1, 20], &[1], &[20]] {
            assert!(is_valid_input_array(&ArrayD::<f64>::zeros(shape), 1));
        }
        for shape in [&[2usize, 1][..], &[1, 1, 1], &[]] {
            assert!(!is_valid_input_array(&ArrayD::<f64>::zeros(shape), 1));
        }
        for shape in [&[3usize, 1][..], &[3, 2], &[3, 20]] {
            assert!(is_valid_input_array(&ArrayD::<f64>::zeros(shape), 3));
        }
        for shape in [&[3usize][..], &[20], &[4, 1], &[3, 1, 1], &[]] {
            assert!(!is_valid_input_array(&ArrayD::<f64>::zeros(shape), 3));
        }
    }

    #[test]
    fn valid_input_meshgrid() {
        let x = [0.0; 2];
        assert!(is_valid_input_meshgrid(&sparse_meshgrid(&[&x[..]], MeshOrder::C), 1));
        assert!(!is_valid_input_meshgrid(&sparse_meshgrid(&[&x[..], &x], MeshOrder::C), 1));

        let (x, y, z) = ([0.0; 2], [0.0; 3], [0.0; 4]);
        for order in [MeshOrder::C, MeshOrder::F] {
            let mesh = sparse_meshgrid(&[&x[..], &y, &z], order);
            assert!(is_valid_input_meshgrid(&mesh, 3));
        }
        let mesh = sparse_meshgrid(&[&x[..], &x, &y, &z], MeshOrder::C);
        assert!(!is_valid_input_meshgrid(&mesh, 3));

        let square = [ArrayD::<f64>::zeros(IxDyn(&[2, 2]))];
        assert!(!is_valid_input_meshgrid(&square, 1));
        assert!(!is_valid_input_meshgrid(&square, 2));
    }

    #[test]
    fn input_order() {
        let x = [0.0; 2];
        assert_eq!(meshgrid_input_order(&sparse_meshgrid(&[&x[..]], MeshOrder::C)), Ok(MeshOrder::C));
        // both C and F contiguous
        assert_eq!(meshgrid_input_order(&sparse_meshgrid(&[&x[..]], MeshOrder::F)), Ok(MeshOrder::C));

        let (x, y, z) = ([0.0; 2], [0.0; 3], [0.0; 4]);
        let c = sparse_meshgrid(&[&x[..], &y, &z], MeshOrder::C);
        assert_eq!(meshgrid_input_order(&c), Ok(MeshOrder::C));
        let f = sparse_meshgrid(&[&x[..], &y, &z], MeshOrder::F);
        assert_eq!(meshgrid_input_order(&f), Ok(MeshOrder::F));

        assert_eq!(meshgrid_input_order(&full_meshgrid(&[2, 3, 4], false)), Ok(MeshOrder::C));
        assert_eq!(meshgrid_input_order(&full_meshgrid(&[2, 3, 4], true)), Ok(MeshOrder::F));

        let views: Vec<_> = c.iter().map(|xi| xi.broadcast(IxDyn(&[2, 3, 4])).unwrap()).collect();
        assert_eq!(meshgrid_input_order(&views), Err(VectorizationError::UnknownOrder));

        let mut messed = c.clone();
        messed[1] = messed[0].clone();
        assert_eq!(meshgrid_input_order(&messed), Err(VectorizationError::UnknownOrder));
    }

    #[test]
    fn vecs_round_trip() {
        let (x, y, z) = ([1.0, 2.0], [3.0, 4.0, 5.0], [6.0, 7.0, 8.0, 9.0]);
        for order in [MeshOrder::C, MeshOrder::F] {
            let mesh = sparse_meshgrid(&[&x[..], &y, &z], order);
            let vecs = vecs_from_meshgrid(&mesh, order).unwrap();
            assert_eq!(vecs, [arr1(&x), arr1(&y), arr1(&z)]);
        }

        let full = full_meshgrid(&[2, 3, 4], false);
        let vecs = vecs_from_meshgrid(&full, MeshOrder::C).unwrap();
        assert_eq!(vecs[1], arr1(&[0.0, 1.0, 2.0]));

        let mut full = full_meshgrid(&[2, 3, 4], true);
        full.reverse();
        let vecs = vecs_from_meshgrid(&full, MeshOrder::F).unwrap();
        assert_eq!(vecs[2], arr1(&[0.0, 1.0, 2.0, 3.0]));
    }

    #[test]
    fn vecs_from_empty_meshgrid() {
        let mesh = [Array2::<f64>::zeros((0, 3)), Array2::<f64>::zeros((0, 3))];
        let vecs = vecs_from_meshgrid(&mesh, MeshOrder::C).unwrap();
        assert_eq!(vecs.len(), 2);
        assert!(vecs.iter().all(|v| v.is_empty()));

        let (x, y) = ([0.0; 0], [1.0, 2.0, 3.0]);
        let sparse = sparse_meshgrid(&[&x[..], &y], MeshOrder::C);
        let vecs = vecs_from_meshgrid(&sparse, MeshOrder::C).unwrap();
        assert!(vecs[0].is_empty());
        assert_eq!(vecs[1], arr1(&y));
    }

    #[test]
    fn out_shapes() {
        assert_eq!(out_shape_from_array(&Array2::<f64>::zeros((1, 1))), Ok(vec![1]));
        assert_eq!(out_shape_from_array(&Array2::<f64>::zeros((1, 2))), Ok(vec![2]));
        assert_eq!(out_shape_from_array(&arr1(&[0.0; 20])), Ok(vec![20]));
        assert_eq!(out_shape_from_array(&Array2::<f64>::zeros((3, 20))), Ok(vec![20]));

        let x = [0.0; 2];
        for order in [MeshOrder::C, MeshOrder::F] {
            assert_eq!(out_shape_from_meshgrid(&sparse_meshgrid(&[&x[..]], order)), Ok(vec![2]));
        }
        let (x, y, z) = ([0.0; 2], [0.0; 3], [0.0; 4]);
        for order in [MeshOrder::C, MeshOrder::F] {
            let mesh = sparse_meshgrid(&[&x[..], &y, &z], order);
            assert_eq!(out_shape_from_meshgrid(&mesh), Ok(vec![2, 3, 4]));
        }
        let mut full = full_meshgrid(&[2, 3, 4], true);
        full.reverse();
        assert_eq!(out_shape_from_meshgrid(&full), Ok(vec![2, 3, 4]));
    }

    #[test]
    fn vectorize_1d() {
        let f = vectorize(|x: &[i64]| i32::from(x[0] >= 0));
        let arr = Array2::from_shape_vec((1, 5), vec![-2, -1, 0, 1, 2]).unwrap();
        assert_eq!(f.on_array(&arr).unwrap().to_vec(), [0, 0, 1, 1, 1]);

        let grid = [-3, -2, -1, 0, 1];
        let mesh = sparse_meshgrid(&[&grid[..]], MeshOrder::C);
        let out = f.on_meshgrid(&mesh).unwrap();
        assert_eq!(out.shape(), [5]);
        assert_eq!(out.iter().copied().collect::<Vec<_>>(), [0, 0, 0, 1, 1]);

        assert_eq!(f.point(&[-1]), 0);
        assert_eq!(f.point(&[2]), 1);

        let mut out = Array1::zeros(5);
        f.on_array_into(&arr, out.view_mut()).unwrap();
        assert_eq!(out.to_vec(), [0, 0, 1, 1, 1]);

        let mut out = ArrayD::zeros(IxDyn(&[5]));
        f.on_meshgrid_into(&mesh, out.view_mut()).unwrap();
        assert_eq!(out.iter().copied().collect::<Vec<_>>(), [0, 0, 0, 1, 1]);
    }

    #[test]
    fn vectorize_2d() {
        let f = vectorize(|x: &[i64]| i32::from(!(x[0] < 0 && x[1] > 0)));
        let arr = Array2::from_shape_vec((2, 5), vec![-3, -2, -1, 0, 1, -1, 0, 1, 2, 3]).unwrap();
        assert_eq!(f.on_array(&arr).unwrap().to_vec(), [1, 1, 0, 1, 1]);

        let mesh = sparse_meshgrid(&[&[-3, -2, -1, 0, 1][..], &[-1, 0, 1, 2, 3]], MeshOrder::C);
        let out = f.on_meshgrid(&mesh).unwrap();
        let expected = Array2::from_shape_vec(
            (5, 5),
            vec![
                1, 1, 0, 0, 0, //
                1, 1, 0, 0, 0, //
                1, 1, 0, 0, 0, //
                1, 1, 1, 1, 1, //
                1, 1, 1, 1, 1,
            ],
        )
        .unwrap()
        .into_dyn();
        assert_eq!(out, expected);
        assert_eq!(f.point(&[-1, 1]), 0);
        assert_eq!(f.point(&[2, 1]), 1);

        let mut wrong = Array1::zeros(4);
        assert!(matches!(
            f.on_array_into(&arr, wrong.view_mut()),
            Err(VectorizationError::OutShape { .. })
        ));
    }

    #[test]
    fn vectorize_f_order_meshgrid() {
        let f = vectorize(|x: &[f64]| 10.0 * x[0] + x[1]);
        let mesh = sparse_meshgrid(&[&[1.0, 2.0][..], &[3.0, 4.0, 5.0]], MeshOrder::F);
        let out = f.on_meshgrid(&mesh).unwrap();
        assert_eq!(out.shape(), [2, 3]);
        assert_eq!(out[[1, 0]], 23.0);
    }

    #[test]
    fn invalid_inputs() {
        let f = vectorize(|x: &[f64]| x[0]);
        let cube = ArrayD::<f64>::zeros(IxDyn(&[1, 1, 1]));
        assert!(matches!(f.on_array(&cube), Err(VectorizationError::InvalidArray { .. })));
        let mesh = [ArrayD::<f64>::zeros(IxDyn(&[2, 2]))];
        assert_eq!(
            f.on_meshgrid(&mesh),
            Err(VectorizationError::InvalidMeshgrid { d: 1 })
        );
    }
}
