use std::fmt;

use faer_core::{Entity, Mat, MatRef};

/// Scalar type a field can be made of.
///
/// Arithmetic goes through named methods rather than operator traits so that
/// every backend spells the recurrence with the same sequence of operations.
pub trait SimpleFloat:
    Entity + bytemuck::Pod + PartialOrd + fmt::Debug + fmt::Display + fmt::LowerExp + Send + Sync
{
    fn zero() -> Self;
    fn one() -> Self;
    fn from_f64(x: f64) -> Self;
    fn to_f64(self) -> f64;

    fn add(self, rhs: Self) -> Self;
    fn sub(self, rhs: Self) -> Self;
    fn mul(self, rhs: Self) -> Self;
    fn div(self, rhs: Self) -> Self;
    fn abs(self) -> Self;
    fn is_finite(self) -> bool;
}

macro_rules! impl_simple_float {
    ($($t:ty),*) => {$(
        impl SimpleFloat for $t {
            #[inline]
            fn zero() -> Self {
                0.0
            }

            #[inline]
            fn one() -> Self {
                1.0
            }

            #[inline]
            fn from_f64(x: f64) -> Self {
                x as $t
            }

            #[inline]
            fn to_f64(self) -> f64 {
                self as f64
            }

            #[inline]
            fn add(self, rhs: Self) -> Self {
                self + rhs
            }

            #[inline]
            fn sub(self, rhs: Self) -> Self {
                self - rhs
            }

            #[inline]
            fn mul(self, rhs: Self) -> Self {
                self * rhs
            }

            #[inline]
            fn div(self, rhs: Self) -> Self {
                self / rhs
            }

            #[inline]
            fn abs(self) -> Self {
                <$t>::abs(self)
            }

            #[inline]
            fn is_finite(self) -> bool {
                <$t>::is_finite(self)
            }
        }
    )*};
}

impl_simple_float!(f32, f64);

/// Column vector of `size` values `f(0), f(1), ...`.
pub fn column<F: SimpleFloat>(size: usize, f: impl Fn(usize) -> F) -> Mat<F> {
    Mat::from_fn(size, 1, |i, _| f(i))
}

/// Owned copy of the first column of `m`.
pub fn to_column<F: SimpleFloat>(m: MatRef<'_, F>) -> Mat<F> {
    column(m.nrows(), |i| m.read(i, 0))
}

pub fn to_vec<F: SimpleFloat>(m: MatRef<'_, F>) -> Vec<F> {
    (0..m.nrows()).map(|i| m.read(i, 0)).collect()
}

/// `true` when both columns hold exactly the same bit patterns.
pub fn bitwise_eq<F: SimpleFloat>(a: MatRef<'_, F>, b: MatRef<'_, F>) -> bool {
    a.nrows() == b.nrows()
        && (0..a.nrows()).all(|i| {
            bytemuck::bytes_of(&a.read(i, 0)) == bytemuck::bytes_of(&b.read(i, 0))
        })
}

/// First index where `a` and `b` differ by more than `rel_tol` relative to
/// the larger magnitude of the pair. Identical bit patterns (including
/// matching non-finite values) always agree. Columns of different lengths
/// diverge at index 0.
pub fn first_divergence<F: SimpleFloat>(
    a: MatRef<'_, F>,
    b: MatRef<'_, F>,
    rel_tol: f64,
) -> Option<usize> {
    if a.nrows() != b.nrows() {
        return Some(0);
    }

    (0..a.nrows()).find(|&i| {
        let (x, y) = (a.read(i, 0), b.read(i, 0));
        if bytemuck::bytes_of(&x) == bytemuck::bytes_of(&y) {
            return false;
        }

        let (x, y) = (x.to_f64(), y.to_f64());
        let scale = x.abs().max(y.abs());
        !((x - y).abs() <= rel_tol * scale)
    })
}
