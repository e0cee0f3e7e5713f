//! Free elementwise operations.
//!
//! Unlike the [`FnSpace`](crate::space::FnSpace) methods these do not require the
//! operands to share a space, only a length and a device.

use fnspace_sys::device::Device;

use crate::{
    error::{Error, Result},
    kernels::VectorKernels,
    vector::Vector,
};

fn check_operand<T: VectorKernels<D>, D: Device>(
    out: &Vector<T, D>,
    inp: &Vector<T, D>,
) -> Result<()> {
    if inp.len() != out.len() {
        return Err(Error::LengthMismatch {
            expected: out.len(),
            found: inp.len(),
        });
    }
    if inp.space().device() != out.space().device() {
        return Err(Error::DeviceMismatch);
    }
    Ok(())
}

/// `outp[i] := |inp[i]|`
pub fn abs<T: VectorKernels<D>, D: Device>(
    inp: &Vector<T, D>,
    outp: &mut Vector<T, D>,
) -> Result<()> {
    check_operand(outp, inp)?;
    let n = outp.len();
    let z = outp.data_mut_ptr();
    unsafe { T::abs(outp.space().device(), n, inp.data_ptr(), z) }.map_err(Error::device)
}

/// `outp[i] := sign(inp[i])`
pub fn sign<T: VectorKernels<D>, D: Device>(
    inp: &Vector<T, D>,
    outp: &mut Vector<T, D>,
) -> Result<()> {
    check_operand(outp, inp)?;
    let n = outp.len();
    let z = outp.data_mut_ptr();
    unsafe { T::sign(outp.space().device(), n, inp.data_ptr(), z) }.map_err(Error::device)
}

/// `outp[i] := inp[i] + scal`
pub fn add_scalar<T: VectorKernels<D>, D: Device>(
    inp: &Vector<T, D>,
    scal: T,
    outp: &mut Vector<T, D>,
) -> Result<()> {
    check_operand(outp, inp)?;
    let n = outp.len();
    let z = outp.data_mut_ptr();
    unsafe { T::add_scalar(outp.space().device(), n, inp.data_ptr(), scal, z) }
        .map_err(Error::device)
}

/// `outp[i] := max(inp[i], scal)`
pub fn max_vector_scalar<T: VectorKernels<D>, D: Device>(
    inp: &Vector<T, D>,
    scal: T,
    outp: &mut Vector<T, D>,
) -> Result<()> {
    check_operand(outp, inp)?;
    let n = outp.len();
    let z = outp.data_mut_ptr();
    unsafe { T::max_scalar(outp.space().device(), n, inp.data_ptr(), scal, z) }
        .map_err(Error::device)
}

/// `outp[i] := max(inp1[i], inp2[i])`
pub fn max_vector_vector<T: VectorKernels<D>, D: Device>(
    inp1: &Vector<T, D>,
    inp2: &Vector<T, D>,
    outp: &mut Vector<T, D>,
) -> Result<()> {
    check_operand(outp, inp1)?;
    check_operand(outp, inp2)?;
    let n = outp.len();
    let z = outp.data_mut_ptr();
    unsafe { T::max_vector(outp.space().device(), n, inp1.data_ptr(), inp2.data_ptr(), z) }
        .map_err(Error::device)
}

/// Sum of all elements. Integer sums wrap on overflow.
pub fn sum<T: VectorKernels<D>, D: Device>(inp: &Vector<T, D>) -> Result<T> {
    unsafe { T::sum(inp.space().device(), inp.len(), inp.data_ptr()) }.map_err(Error::device)
}
