use std::fmt;

use crate::{
    mesh::{Grid, Params},
    SimError, SimpleFloat,
};

/// The four inputs of a run: grid points, time steps, domain length and
/// Courant number. `dx` and `dt` are derived from them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Config {
    pub(crate) nx: usize,
    pub(crate) nt: usize,
    pub(crate) xmax: f64,
    pub(crate) sigma: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            nx: 8192,
            nt: 300,
            xmax: 15.0,
            sigma: 0.25,
        }
    }
}

impl Config {
    pub fn new(nx: usize, nt: usize, xmax: f64, sigma: f64) -> Self {
        Self {
            nx,
            nt,
            xmax,
            sigma,
        }
    }

    pub fn with_nx(mut self, nx: usize) -> Self {
        self.nx = nx;
        self
    }

    pub fn with_nt(mut self, nt: usize) -> Self {
        self.nt = nt;
        self
    }

    pub fn with_xmax(mut self, xmax: f64) -> Self {
        self.xmax = xmax;
        self
    }

    pub fn with_sigma(mut self, sigma: f64) -> Self {
        self.sigma = sigma;
        self
    }

    pub fn nx(&self) -> usize {
        self.nx
    }

    pub fn nt(&self) -> usize {
        self.nt
    }

    pub fn xmax(&self) -> f64 {
        self.xmax
    }

    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    /// Derive `dx = xmax / (nx - 1)` and `dt = sigma * dx` in precision `F`.
    ///
    /// Stability (`sigma < 1`) is not checked: an unstable Courant number is
    /// the caller's business and simply yields a diverging field.
    pub fn params<F: SimpleFloat>(&self) -> Result<Params<F>, SimError> {
        if self.nx < 2 {
            return Err(SimError::InvalidConfiguration(format!(
                "need at least 2 grid points, got nx = {}",
                self.nx
            )));
        }

        let space = Grid::from_points(F::zero(), F::from_f64(self.xmax), self.nx);
        let dx = space.delta();
        if !dx.is_finite() || dx <= F::zero() {
            return Err(SimError::InvalidConfiguration(format!(
                "dx must be positive, got {dx} (xmax = {})",
                self.xmax
            )));
        }

        let sigma = F::from_f64(self.sigma);
        let dt = sigma.mul(dx);
        if !dt.is_finite() || dt <= F::zero() {
            return Err(SimError::InvalidConfiguration(format!(
                "dt must be positive, got {dt} (sigma = {})",
                self.sigma
            )));
        }

        Ok(Params {
            space,
            nt: self.nt,
            dt,
            sigma,
        })
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "nonlinear upwind advection:\n\t- x ∈ [0, {}] ({} points)\n\t- σ = {} ({} steps)",
            self.xmax, self.nx, self.sigma, self.nt
        )
    }
}
