use std::{
    fmt,
    time::{Duration, Instant},
};

use faer_core::{Mat, MatRef};
use tracing::{debug, info, warn};

use crate::{
    faer_add::first_divergence,
    initial::hat,
    mesh::{Grid, Params},
    methods::{Backend, DataParallel, LaunchConfig, StepFunction},
    Config, Driver, SimError, SimpleFloat,
};

/// Relative tolerance under which two backends are considered to agree.
pub const DEFAULT_TOLERANCE: f64 = 1e-9;

/// Outcome of one backend run: wall-clock time of the `nt` steps and the
/// field they produced.
#[derive(Debug, Clone)]
pub struct BenchmarkResult<F: SimpleFloat> {
    backend: Backend,
    elapsed: Duration,
    space: Grid<F>,
    field: Mat<F>,
}

impl<F: SimpleFloat> BenchmarkResult<F> {
    pub fn backend(&self) -> Backend {
        self.backend
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn seconds(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }

    pub fn field(&self) -> MatRef<'_, F> {
        self.field.as_ref()
    }

    /// Positions of the field samples, for plotting.
    pub fn positions(&self) -> impl Iterator<Item = F> {
        self.space.iter()
    }

    pub fn into_field(self) -> Mat<F> {
        self.field
    }
}

#[derive(Debug, Clone)]
pub struct Report<F: SimpleFloat> {
    params: Params<F>,
    results: Vec<BenchmarkResult<F>>,
}

impl<F: SimpleFloat> Report<F> {
    pub fn params(&self) -> &Params<F> {
        &self.params
    }

    pub fn results(&self) -> &[BenchmarkResult<F>] {
        &self.results
    }

    pub fn get(&self, backend: Backend) -> Option<&BenchmarkResult<F>> {
        self.results.iter().find(|r| r.backend == backend)
    }

    pub fn fastest(&self) -> Option<&BenchmarkResult<F>> {
        self.results.iter().min_by_key(|r| r.elapsed)
    }

    /// Time of the first backend run divided by the time of `backend`.
    pub fn speedup(&self, backend: Backend) -> Option<f64> {
        let reference = self.results.first()?;
        let result = self.get(backend)?;
        Some(reference.seconds() / result.seconds())
    }

    /// Check every field against the first one.
    pub fn compare(&self, rel_tol: f64) -> Result<(), SimError> {
        let Some((reference, others)) = self.results.split_first() else {
            return Ok(());
        };

        for other in others {
            debug!(
                "comparing `{}` against `{}` (tolerance {:e})",
                other.backend, reference.backend, rel_tol
            );

            if let Some(index) = first_divergence(reference.field(), other.field(), rel_tol) {
                let err = SimError::BackendMismatch {
                    left: reference.backend,
                    right: other.backend,
                    index,
                    left_value: reference.field().read(index, 0).to_f64(),
                    right_value: other.field().read(index, 0).to_f64(),
                };
                warn!("{err}");
                return Err(err);
            }
        }

        Ok(())
    }
}

impl<F: SimpleFloat> fmt::Display for Report<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "nx = {}, nt = {}", self.params.nx(), self.params.nt())?;
        writeln!(f, "{:<14} {:>12} {:>9}", "backend", "seconds", "speedup")?;
        for result in &self.results {
            writeln!(
                f,
                "{:<14} {:>12.6} {:>8.2}x",
                result.backend.name(),
                result.seconds(),
                self.speedup(result.backend).unwrap_or(f64::NAN)
            )?;
        }
        Ok(())
    }
}

/// Runs several backends, one after the other, over the same hat initial
/// condition and times each full run.
#[derive(Debug, Clone)]
pub struct Harness {
    config: Config,
    backends: Vec<Backend>,
    launch: LaunchConfig,
    tolerance: Option<f64>,
}

impl Harness {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            backends: Backend::ALL.to_vec(),
            launch: LaunchConfig::default(),
            tolerance: Some(DEFAULT_TOLERANCE),
        }
    }

    /// Backends to run, in this order. The first one is the reference for
    /// comparisons and speedups.
    pub fn with_backends(mut self, backends: impl IntoIterator<Item = Backend>) -> Self {
        self.backends = backends.into_iter().collect();
        self
    }

    pub fn with_launch(mut self, launch: LaunchConfig) -> Self {
        self.launch = launch;
        self
    }

    pub fn with_tolerance(mut self, rel_tol: f64) -> Self {
        self.tolerance = Some(rel_tol);
        self
    }

    /// Skip the cross-backend comparison after the runs.
    pub fn without_verification(mut self) -> Self {
        self.tolerance = None;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn step_function<F: SimpleFloat>(
        &self,
        backend: Backend,
    ) -> Result<Box<dyn StepFunction<F>>, SimError> {
        Ok(match backend {
            Backend::DataParallel => Box::new(DataParallel::new(self.launch)?),
            backend => backend.step_function(),
        })
    }

    pub fn run<F: SimpleFloat>(&self) -> Result<Report<F>, SimError> {
        let params = self.config.params::<F>()?;
        // generated once so that every backend starts from the same bits
        let u0 = hat(&params);

        info!(
            "benchmarking {} backends: {} points, {} steps ({} point updates each)",
            self.backends.len(),
            params.nx(),
            params.nt(),
            params.workload()
        );

        let mut results = Vec::with_capacity(self.backends.len());
        for &backend in &self.backends {
            let mut driver = Driver::new(params, self.step_function(backend)?, u0.as_ref())?;

            let start = Instant::now();
            driver.run()?;
            let elapsed = start.elapsed();

            info!(
                "`{}` backend took: {:.6} seconds",
                backend,
                elapsed.as_secs_f64()
            );

            results.push(BenchmarkResult {
                backend,
                elapsed,
                space: params.space(),
                field: driver.into_solution(),
            });
        }

        let report = Report { params, results };
        if let Some(rel_tol) = self.tolerance {
            report.compare(rel_tol)?;
        }

        Ok(report)
    }

    /// Run the benchmark once per grid size, everything else unchanged.
    pub fn sweep<F: SimpleFloat>(
        &self,
        sizes: impl IntoIterator<Item = usize>,
    ) -> Result<Vec<Report<F>>, SimError> {
        sizes
            .into_iter()
            .map(|nx| {
                Harness {
                    config: self.config.with_nx(nx),
                    ..self.clone()
                }
                .run::<F>()
            })
            .collect()
    }
}
