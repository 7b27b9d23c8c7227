use std::fmt;

use faer_core::{zipped, MatMut, MatRef};
use reborrow::*;

use crate::{kernel::upwind, mesh::Params, SimError, SimpleFloat};

mod data_parallel;

pub use data_parallel::{global_index, DataParallel, LaunchConfig, ThreadOrder};

/// Advance the field by one time step.
///
/// `u` is the field at step `n`, `v` receives step `n + 1`. Implementations
/// read `u` only and write the rows `1..nx` of `v` only: row 0 is the
/// left boundary and stays untouched.
pub trait StepFunction<F: SimpleFloat> {
    /// Called once before the first step of a run.
    fn init(&mut self, _params: &Params<F>) -> Result<(), SimError> {
        Ok(())
    }

    fn apply(&mut self, params: &Params<F>, u: MatRef<'_, F>, v: MatMut<'_, F>);
    fn backend(&self) -> Backend;

    fn name(&self) -> &'static str {
        self.backend().name()
    }
}

impl<F: SimpleFloat, S: StepFunction<F> + ?Sized> StepFunction<F> for Box<S> {
    fn init(&mut self, params: &Params<F>) -> Result<(), SimError> {
        (**self).init(params)
    }

    fn apply(&mut self, params: &Params<F>, u: MatRef<'_, F>, v: MatMut<'_, F>) {
        (**self).apply(params, u, v)
    }

    fn backend(&self) -> Backend {
        (**self).backend()
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    Vectorized,
    ScalarLoop,
    DataParallel,
}

impl Backend {
    pub const ALL: [Backend; 3] = [
        Backend::Vectorized,
        Backend::ScalarLoop,
        Backend::DataParallel,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Backend::Vectorized => "vectorized",
            Backend::ScalarLoop => "scalar loop",
            Backend::DataParallel => "data parallel",
        }
    }

    /// Step function of this backend, with the default launch
    /// configuration for [`Backend::DataParallel`].
    pub fn step_function<F: SimpleFloat>(self) -> Box<dyn StepFunction<F>> {
        match self {
            Backend::Vectorized => Box::new(Vectorized),
            Backend::ScalarLoop => Box::new(ScalarLoop),
            Backend::DataParallel => Box::new(DataParallel::default()),
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Whole-array update: one elementwise operation over the interior rows,
/// pairing `u[1..]` with its upstream neighbours `u[..nx - 1]`.
#[derive(Debug, Default, Clone, Copy)]
pub struct Vectorized;

impl<F: SimpleFloat> StepFunction<F> for Vectorized {
    fn apply(&mut self, params: &Params<F>, u: MatRef<'_, F>, mut v: MatMut<'_, F>) {
        let interior = u.nrows() - 1;
        let r = params.ratio();

        zipped!(
            v.rb_mut().subrows(1, interior),
            u.subrows(1, interior),
            u.subrows(0, interior)
        )
        .for_each(|mut v, u, um| v.write(upwind(u.read(), um.read(), r)));
    }

    fn backend(&self) -> Backend {
        Backend::Vectorized
    }
}

/// Explicit loop over the interior indices in increasing order.
#[derive(Debug, Default, Clone, Copy)]
pub struct ScalarLoop;

impl<F: SimpleFloat> StepFunction<F> for ScalarLoop {
    fn apply(&mut self, params: &Params<F>, u: MatRef<'_, F>, mut v: MatMut<'_, F>) {
        let r = params.ratio();

        for i in 1..u.nrows() {
            v.write(i, 0, upwind(u.read(i, 0), u.read(i - 1, 0), r));
        }
    }

    fn backend(&self) -> Backend {
        Backend::ScalarLoop
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        faer_add::{column, to_vec},
        Config,
    };
    use faer_core::Mat;

    fn one_step<S: StepFunction<f64>>(mut step: S, u: &Mat<f64>) -> Vec<f64> {
        let params = Config::new(u.nrows(), 1, 15.0, 0.25)
            .params::<f64>()
            .unwrap();
        let mut v = column(u.nrows(), |_| -7.0);
        step.apply(&params, u.as_ref(), v.as_mut());
        to_vec(v.as_ref())
    }

    #[test]
    fn single_step_on_a_step_profile() {
        let u = column(5, |i| if i == 1 || i == 2 { 2.0 } else { 1.0 });
        let r = 0.25;
        let expected = vec![
            -7.0,
            upwind(2.0, 1.0, r),
            upwind(2.0, 2.0, r),
            upwind(1.0, 2.0, r),
            upwind(1.0, 1.0, r),
        ];

        assert_eq!(one_step(Vectorized, &u), expected);
        assert_eq!(one_step(ScalarLoop, &u), expected);
        assert_eq!(one_step(DataParallel::default(), &u), expected);
    }

    #[test]
    fn reads_only_the_previous_step() {
        // an in-place sweep would feed the freshly written u[i - 1] into
        // u[i]; here every point must see its pre-step neighbour
        let u = column(4, |i| if i == 0 { 2.0 } else { 1.0 });
        let out = one_step(ScalarLoop, &u);

        assert_eq!(out[1], 1.25);
        assert_eq!(out[2], 1.0);
        assert_eq!(out[3], 1.0);
    }

    #[test]
    fn smallest_grid_updates_its_single_interior_point() {
        let u = column(2, |i| if i == 0 { 2.0 } else { 1.0 });

        for backend in Backend::ALL {
            assert_eq!(
                one_step(backend.step_function::<f64>(), &u),
                vec![-7.0, 1.25],
                "{backend}"
            );
        }
    }

    #[test]
    fn backend_names() {
        let step: Box<dyn StepFunction<f32>> = Backend::DataParallel.step_function();
        assert_eq!(step.backend(), Backend::DataParallel);
        assert_eq!(step.name(), "data parallel");
        assert_eq!(Backend::ScalarLoop.to_string(), "scalar loop");
    }
}
