use std::fmt;

use faer_core::{Mat, MatRef};
use thiserror::Error;

use crate::{
    mesh::Params,
    methods::{Backend, StepFunction},
    state::GridState,
    SimpleFloat,
};

#[derive(Error, Debug)]
pub enum SimError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error(
        "`{left}` and `{right}` backends diverge at index {index} ({left_value:e} vs {right_value:e})"
    )]
    BackendMismatch {
        left: Backend,
        right: Backend,
        index: usize,
        left_value: f64,
        right_value: f64,
    },
    #[error("non-finite value at index {index} after step {step}")]
    NumericOverflow { step: usize, index: usize },
    #[error("simulation already completed")]
    AlreadyCompleted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Initialized,
    Running { step: usize },
    Completed,
}

#[derive(Clone, Copy)]
pub struct ObsCtx<'ctx, F: SimpleFloat> {
    // Meta
    params: &'ctx Params<F>,
    backend: Backend,
    method: &'static str,
    time_sampling: usize,

    // Iteration info
    iter: usize,
    time: F,
    solution: MatRef<'ctx, F>,
}

impl<'ctx, F: SimpleFloat> ObsCtx<'ctx, F> {
    pub fn params(&self) -> &Params<F> {
        self.params
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    pub fn method(&self) -> &'static str {
        self.method
    }

    pub fn iter(&self) -> usize {
        self.iter
    }

    pub fn time(&self) -> F {
        self.time
    }

    pub fn solution(&self) -> MatRef<'ctx, F> {
        self.solution
    }

    pub fn sampling_period(&self) -> usize {
        self.time_sampling
    }
}

#[allow(unused_variables)]
pub trait Observer<F: SimpleFloat> {
    fn at_startup(&mut self, ctx: ObsCtx<F>) -> Result<(), SimError> {
        Ok(())
    }

    fn at_each_iteration(&mut self, ctx: ObsCtx<F>) -> Result<(), SimError> {
        Ok(())
    }

    fn at_cleanup(&mut self, ctx: ObsCtx<F>) -> Result<(), SimError> {
        Ok(())
    }
}

impl<F: SimpleFloat, O: Observer<F> + ?Sized> Observer<F> for &mut O {
    fn at_startup(&mut self, ctx: ObsCtx<F>) -> Result<(), SimError> {
        (**self).at_startup(ctx)
    }

    fn at_each_iteration(&mut self, ctx: ObsCtx<F>) -> Result<(), SimError> {
        (**self).at_each_iteration(ctx)
    }

    fn at_cleanup(&mut self, ctx: ObsCtx<F>) -> Result<(), SimError> {
        (**self).at_cleanup(ctx)
    }
}

#[derive(Clone, Copy)]
enum Hook {
    Startup,
    Iteration,
    Cleanup,
}

/// Runs one step function over a field for `nt` steps.
///
/// `Initialized` becomes `Running` on the first call to [`Driver::step`]
/// and `Completed` once `nt` steps have been taken; a completed driver
/// refuses to step again.
pub struct Driver<'d, F: SimpleFloat, S> {
    params: Params<F>,
    method: S,
    grid: GridState<F>,
    state: State,
    observers: Vec<Box<dyn Observer<F> + 'd>>,
    time_sampling: usize,
}

impl<'d, F: SimpleFloat, S: StepFunction<F>> Driver<'d, F, S> {
    pub fn new(params: Params<F>, method: S, u0: MatRef<'_, F>) -> Result<Self, SimError> {
        if u0.nrows() != params.nx() || u0.ncols() != 1 {
            return Err(SimError::InvalidConfiguration(format!(
                "initial condition is {}x{}, expected a column of {} points",
                u0.nrows(),
                u0.ncols(),
                params.nx()
            )));
        }

        Ok(Self {
            time_sampling: 1 + params.nt() / 10,
            params,
            method,
            grid: GridState::new(u0),
            state: State::Initialized,
            observers: Vec::new(),
        })
    }

    /// Observers see every `sampling_period`-th step (0 is read as 1).
    pub fn with_time_sampling(mut self, sampling_period: usize) -> Self {
        self.time_sampling = sampling_period.max(1);
        self
    }

    pub fn with_observer(mut self, observer: impl Observer<F> + 'd) -> Self {
        self.observers.push(Box::new(observer));
        self
    }

    pub fn params(&self) -> &Params<F> {
        &self.params
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn steps_taken(&self) -> usize {
        match self.state {
            State::Initialized => 0,
            State::Running { step } => step,
            State::Completed => self.params.nt(),
        }
    }

    pub fn solution(&self) -> MatRef<'_, F> {
        self.grid.current()
    }

    pub fn into_solution(self) -> Mat<F> {
        self.grid.to_field()
    }

    /// Take one step and return the state reached.
    ///
    /// The first call initializes the step function and notifies observers;
    /// the call that takes step `nt` (or the first one, when `nt == 0`) also
    /// completes the run.
    pub fn step(&mut self) -> Result<State, SimError> {
        let n = match self.state {
            State::Completed => return Err(SimError::AlreadyCompleted),
            State::Initialized => {
                self.method.init(&self.params)?;
                self.state = State::Running { step: 0 };
                self.notify(Hook::Startup, 0)?;
                0
            }
            State::Running { step } => step,
        };

        if n < self.params.nt() {
            let (params, method) = (&self.params, &mut self.method);
            self.grid.advance(|u, v| method.apply(params, u, v));

            let n = n + 1;
            self.state = State::Running { step: n };
            if n % self.time_sampling == 0 {
                self.notify(Hook::Iteration, n)?;
            }
        }

        if self.steps_taken() == self.params.nt() {
            self.notify(Hook::Cleanup, self.params.nt())?;
            self.state = State::Completed;
        }

        Ok(self.state)
    }

    pub fn run(&mut self) -> Result<(), SimError> {
        while self.step()? != State::Completed {}
        Ok(())
    }

    fn notify(&mut self, hook: Hook, iter: usize) -> Result<(), SimError> {
        let ctx = ObsCtx {
            params: &self.params,
            backend: self.method.backend(),
            method: self.method.name(),
            time_sampling: self.time_sampling,
            iter,
            time: self.params.dt().mul(F::from_f64(iter as f64)),
            solution: self.grid.current(),
        };

        for o in self.observers.iter_mut() {
            match hook {
                Hook::Startup => o.at_startup(ctx)?,
                Hook::Iteration => o.at_each_iteration(ctx)?,
                Hook::Cleanup => o.at_cleanup(ctx)?,
            }
        }

        Ok(())
    }
}

impl<F: SimpleFloat, S: StepFunction<F>> fmt::Display for Driver<'_, F, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "`{}` backend, Δx={:e} ({} points), Δt={:e} ({} steps) ({:?})",
            self.method.name(),
            self.params.dx(),
            self.params.nx(),
            self.params.dt(),
            self.params.nt(),
            self.state,
        )
    }
}

pub struct Logger;

impl<F: SimpleFloat> Observer<F> for Logger {
    fn at_startup(&mut self, ctx: ObsCtx<F>) -> Result<(), SimError> {
        tracing::event!(
            tracing::Level::INFO,
            "start of simulation (`{}` backend, Δx={:e} ({} points), Δt={:e} ({} steps))",
            ctx.method(),
            ctx.params().dx(),
            ctx.params().nx(),
            ctx.params().dt(),
            ctx.params().nt(),
        );
        Ok(())
    }

    fn at_each_iteration(&mut self, ctx: ObsCtx<F>) -> Result<(), SimError> {
        tracing::event!(
            tracing::Level::TRACE,
            "`{}` backend: step {} (t={:e})",
            ctx.method(),
            ctx.iter(),
            ctx.time()
        );
        Ok(())
    }

    fn at_cleanup(&mut self, ctx: ObsCtx<F>) -> Result<(), SimError> {
        tracing::event!(
            tracing::Level::INFO,
            "finished simulation (`{}` backend, {} steps)",
            ctx.method(),
            ctx.iter()
        );
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct Snapshot<F: SimpleFloat> {
    pub iter: usize,
    pub time: F,
    pub field: Mat<F>,
}

/// Keeps a copy of every field it is shown, including the initial and the
/// final one.
#[derive(Debug, Clone, Default)]
pub struct Recorder<F: SimpleFloat> {
    snapshots: Vec<Snapshot<F>>,
}

impl<F: SimpleFloat> Recorder<F> {
    pub fn new() -> Self {
        Self {
            snapshots: Vec::new(),
        }
    }

    pub fn snapshots(&self) -> &[Snapshot<F>] {
        &self.snapshots
    }

    fn record(&mut self, ctx: ObsCtx<F>) {
        if self.snapshots.last().map(|s| s.iter) == Some(ctx.iter()) {
            return;
        }

        self.snapshots.push(Snapshot {
            iter: ctx.iter(),
            time: ctx.time(),
            field: crate::faer_add::to_column(ctx.solution()),
        });
    }
}

impl<F: SimpleFloat> Observer<F> for Recorder<F> {
    fn at_startup(&mut self, ctx: ObsCtx<F>) -> Result<(), SimError> {
        self.snapshots.clear();
        self.record(ctx);
        Ok(())
    }

    fn at_each_iteration(&mut self, ctx: ObsCtx<F>) -> Result<(), SimError> {
        self.record(ctx);
        Ok(())
    }

    fn at_cleanup(&mut self, ctx: ObsCtx<F>) -> Result<(), SimError> {
        self.record(ctx);
        Ok(())
    }
}

/// Fails the run with [`SimError::NumericOverflow`] as soon as a sampled
/// field holds a non-finite value. The update itself never checks.
#[derive(Debug, Clone, Copy, Default)]
pub struct FiniteCheck;

impl FiniteCheck {
    fn check<F: SimpleFloat>(ctx: ObsCtx<F>) -> Result<(), SimError> {
        let u = ctx.solution();
        match (0..u.nrows()).find(|&i| !u.read(i, 0).is_finite()) {
            Some(index) => Err(SimError::NumericOverflow {
                step: ctx.iter(),
                index,
            }),
            None => Ok(()),
        }
    }
}

impl<F: SimpleFloat> Observer<F> for FiniteCheck {
    fn at_startup(&mut self, ctx: ObsCtx<F>) -> Result<(), SimError> {
        Self::check(ctx)
    }

    fn at_each_iteration(&mut self, ctx: ObsCtx<F>) -> Result<(), SimError> {
        Self::check(ctx)
    }

    fn at_cleanup(&mut self, ctx: ObsCtx<F>) -> Result<(), SimError> {
        Self::check(ctx)
    }
}
