//! Generic numeric operations for the VM dispatch loop.
//!
//! Integers use two's-complement wrapping; floats follow IEEE with the
//! remainder adjusted to be non-negative. Division and remainder by an
//! integer zero report `None` so the dispatcher can fault.

pub(crate) trait Numeric: Copy + PartialEq + PartialOrd {
    const SIZE: usize;

    fn from_bytes(bytes: &[u8]) -> Self;
    fn write_bytes(self, out: &mut [u8]);

    fn add(self, rhs: Self) -> Self;
    fn sub(self, rhs: Self) -> Self;
    fn mul(self, rhs: Self) -> Self;
    fn div(self, rhs: Self) -> Option<Self>;
    fn rem(self, rhs: Self) -> Option<Self>;
    fn neg(self) -> Self;
}

macro_rules! impl_numeric_int {
    ($($ty:ty),*) => {$(
        impl Numeric for $ty {
            const SIZE: usize = size_of::<$ty>();

            fn from_bytes(bytes: &[u8]) -> Self {
                let mut buf = [0u8; size_of::<$ty>()];
                buf.copy_from_slice(bytes);
                <$ty>::from_ne_bytes(buf)
            }

            fn write_bytes(self, out: &mut [u8]) {
                out.copy_from_slice(&self.to_ne_bytes());
            }

            fn add(self, rhs: Self) -> Self {
                self.wrapping_add(rhs)
            }

            fn sub(self, rhs: Self) -> Self {
                self.wrapping_sub(rhs)
            }

            fn mul(self, rhs: Self) -> Self {
                self.wrapping_mul(rhs)
            }

            fn div(self, rhs: Self) -> Option<Self> {
                if rhs == 0 {
                    None
                } else {
                    Some(self.wrapping_div(rhs))
                }
            }

            fn rem(self, rhs: Self) -> Option<Self> {
                if rhs == 0 {
                    None
                } else {
                    Some(self.wrapping_rem(rhs))
                }
            }

            fn neg(self) -> Self {
                self.wrapping_neg()
            }
        }
    )*};
}

impl_numeric_int!(i8, i16, i32, i64, u8, u16, u32, u64);

macro_rules! impl_numeric_float {
    ($($ty:ty),*) => {$(
        impl Numeric for $ty {
            const SIZE: usize = size_of::<$ty>();

            fn from_bytes(bytes: &[u8]) -> Self {
                let mut buf = [0u8; size_of::<$ty>()];
                buf.copy_from_slice(bytes);
                <$ty>::from_ne_bytes(buf)
            }

            fn write_bytes(self, out: &mut [u8]) {
                out.copy_from_slice(&self.to_ne_bytes());
            }

            fn add(self, rhs: Self) -> Self {
                self + rhs
            }

            fn sub(self, rhs: Self) -> Self {
                self - rhs
            }

            fn mul(self, rhs: Self) -> Self {
                self * rhs
            }

            fn div(self, rhs: Self) -> Option<Self> {
                Some(self / rhs)
            }

            // IEEE remainder shifted into [0, |rhs|).
            fn rem(self, rhs: Self) -> Option<Self> {
                let mut r = self % rhs;
                if r < 0.0 {
                    r += rhs.abs();
                }
                Some(r)
            }

            fn neg(self) -> Self {
                -self
            }
        }
    )*};
}

impl_numeric_float!(f32, f64);

/// Expand `$body` with `$ty` aliased to the primitive type selected by the
/// scalar tag.
macro_rules! dispatch_scalar {
    ($scalar:expr, $ty:ident, $body:block) => {
        match $scalar {
            $crate::vm::opcode::Scalar::I8 => {
                type $ty = i8;
                $body
            }
            $crate::vm::opcode::Scalar::I16 => {
                type $ty = i16;
                $body
            }
            $crate::vm::opcode::Scalar::I32 => {
                type $ty = i32;
                $body
            }
            $crate::vm::opcode::Scalar::I64 => {
                type $ty = i64;
                $body
            }
            $crate::vm::opcode::Scalar::U8 => {
                type $ty = u8;
                $body
            }
            $crate::vm::opcode::Scalar::U16 => {
                type $ty = u16;
                $body
            }
            $crate::vm::opcode::Scalar::U32 => {
                type $ty = u32;
                $body
            }
            $crate::vm::opcode::Scalar::U64 => {
                type $ty = u64;
                $body
            }
            $crate::vm::opcode::Scalar::F32 => {
                type $ty = f32;
                $body
            }
            $crate::vm::opcode::Scalar::F64 => {
                type $ty = f64;
                $body
            }
        }
    };
}

pub(crate) use dispatch_scalar;
