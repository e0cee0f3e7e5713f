use std::fmt::{Debug, Display};

use num_traits::{Num, NumCast};

use crate::dtype::DType;

/// A scalar type that can be stored in a device [`Buffer`](crate::Buffer).
///
/// The `elem_*` operations define the reference semantics every device
/// kernel follows: integer arithmetic wraps on overflow, `elem_abs` is the
/// identity and `elem_sign` is `0` or `1` for unsigned types.
///
/// # Safety
/// The set of zero bytes the size of Self should be a valid value equal to zero,
/// since device buffers are handed out zero-initialised.
pub unsafe trait Element:
    Copy + Num + NumCast + PartialOrd + Debug + Display + Send + Sync + 'static
{
    const DTYPE: DType;

    fn elem_add(self, rhs: Self) -> Self;
    fn elem_mul(self, rhs: Self) -> Self;
    fn elem_abs(self) -> Self;
    fn elem_sign(self) -> Self;

    fn elem_max(self, rhs: Self) -> Self {
        if self > rhs {
            self
        } else {
            rhs
        }
    }
}

macro_rules! impl_float {
    ($float:ident => $dtype:ident) => {
        unsafe impl Element for $float {
            const DTYPE: DType = DType::$dtype;

            fn elem_add(self, rhs: Self) -> Self {
                self + rhs
            }
            fn elem_mul(self, rhs: Self) -> Self {
                self * rhs
            }
            fn elem_abs(self) -> Self {
                self.abs()
            }
            fn elem_sign(self) -> Self {
                if self > 0.0 {
                    1.0
                } else if self < 0.0 {
                    -1.0
                } else {
                    0.0
                }
            }
        }
    };
}

macro_rules! impl_signed {
    ($int:ident => $dtype:ident) => {
        unsafe impl Element for $int {
            const DTYPE: DType = DType::$dtype;

            fn elem_add(self, rhs: Self) -> Self {
                self.wrapping_add(rhs)
            }
            fn elem_mul(self, rhs: Self) -> Self {
                self.wrapping_mul(rhs)
            }
            fn elem_abs(self) -> Self {
                self.wrapping_abs()
            }
            fn elem_sign(self) -> Self {
                self.signum()
            }
        }
    };
}

macro_rules! impl_unsigned {
    ($uint:ident => $dtype:ident) => {
        unsafe impl Element for $uint {
            const DTYPE: DType = DType::$dtype;

            fn elem_add(self, rhs: Self) -> Self {
                self.wrapping_add(rhs)
            }
            fn elem_mul(self, rhs: Self) -> Self {
                self.wrapping_mul(rhs)
            }
            fn elem_abs(self) -> Self {
                self
            }
            fn elem_sign(self) -> Self {
                <Self as From<bool>>::from(self != 0)
            }
        }
    };
}

impl_float!(f32 => Float32);
impl_float!(f64 => Float64);

impl_signed!(i8 => Int8);
impl_signed!(i16 => Int16);
impl_signed!(i32 => Int32);
impl_signed!(i64 => Int64);

impl_unsigned!(u8 => UInt8);
impl_unsigned!(u16 => UInt16);
impl_unsigned!(u32 => UInt32);
impl_unsigned!(u64 => UInt64);
