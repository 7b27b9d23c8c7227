//! Explicit upwind solver for the 1-D inviscid Burgers equation
//! `u_t + u u_x = 0`, with interchangeable backends for the per-step update
//! and a harness timing them against each other.
//!
//! ```no_run
//! use upwind1d::{Config, Harness};
//!
//! let report = Harness::new(Config::default()).run::<f64>()?;
//! println!("{report}");
//! # Ok::<(), upwind1d::SimError>(())
//! ```

pub mod faer_add;

pub mod config;
pub mod driver;
pub mod harness;
pub mod initial;
pub mod kernel;
pub mod mesh;
pub mod methods;
pub mod state;

pub use config::Config;
pub use driver::{
    Driver, FiniteCheck, Logger, ObsCtx, Observer, Recorder, SimError, Snapshot, State,
};
pub use faer_add::SimpleFloat;
pub use harness::{BenchmarkResult, Harness, Report, DEFAULT_TOLERANCE};
pub use mesh::{Grid, Params};
pub use methods::{
    Backend, DataParallel, LaunchConfig, ScalarLoop, StepFunction, ThreadOrder, Vectorized,
};
pub use state::GridState;
