use faer_core::Mat;

use crate::{faer_add::column, mesh::Params, SimpleFloat};

pub const HAT_LOWER: f64 = 0.5;
pub const HAT_UPPER: f64 = 1.0;

/// Hat initial condition: `2` on `0.5 <= x <= 1.0`, `1` everywhere else.
///
/// The plateau covers the indices `round(0.5 / dx)` through `round(1 / dx)`
/// inclusive. Only the upper end is clamped to the last grid point: a domain
/// that ends before `x = 0.5` has no plateau at all.
pub fn hat<F: SimpleFloat>(params: &Params<F>) -> Mat<F> {
    let space = params.space();
    // lower may lie past the grid, leaving the range empty
    let (lower, upper) = (space.nearest_index(HAT_LOWER), space.index_of(HAT_UPPER));
    let (low, high) = (F::one(), F::from_f64(2.0));

    column(params.nx(), |i| {
        if (lower..=upper).contains(&i) {
            high
        } else {
            low
        }
    })
}
