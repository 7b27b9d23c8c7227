use crate::SimpleFloat;

// grid[0] <-> lower
// grid[i] <-> lower + i * delta forall i
// grid[steps] <-> upper
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Grid<F> {
    pub(crate) lower: F,
    pub(crate) upper: F,
    pub(crate) delta: F,
    pub(crate) steps: usize,
}

impl<F: SimpleFloat> Grid<F> {
    pub fn from_steps(lower: F, upper: F, steps: usize) -> Self {
        let delta = upper.sub(lower).div(F::from_f64(steps as f64));
        Self {
            lower,
            upper,
            delta,
            steps,
        }
    }

    /// Grid of `points` samples spanning `[lower, upper]` end to end.
    pub fn from_points(lower: F, upper: F, points: usize) -> Self {
        Self::from_steps(lower, upper, points.saturating_sub(1))
    }

    pub fn lower(&self) -> F {
        self.lower
    }

    pub fn upper(&self) -> F {
        self.upper
    }

    pub fn delta(&self) -> F {
        self.delta
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn points(&self) -> usize {
        self.steps + 1
    }

    pub fn position(&self, i: usize) -> F {
        self.lower.add(self.delta.mul(F::from_f64(i as f64)))
    }

    /// Index `round((x - lower) / delta)`, floored at 0 but not bounded by the
    /// last sample, so it may lie past the end of the grid.
    pub fn nearest_index(&self, x: f64) -> usize {
        let i = ((x - self.lower.to_f64()) / self.delta.to_f64()).round();
        if i <= 0.0 {
            0
        } else {
            i as usize
        }
    }

    /// Nearest sample index to `x`, clamped to the grid.
    pub fn index_of(&self, x: f64) -> usize {
        self.nearest_index(x).min(self.steps)
    }

    pub fn iter(self) -> impl Iterator<Item = F> {
        (0..self.points()).map(move |i| self.position(i))
    }
}

/// Everything a backend needs to advance the field by one step.
///
/// Built through [`crate::Config::params`], which rejects degenerate inputs,
/// so `nx >= 2`, `dx > 0` and `dt > 0` hold for every value of this type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Params<F> {
    pub(crate) space: Grid<F>,
    pub(crate) nt: usize,
    pub(crate) dt: F,
    pub(crate) sigma: F,
}

impl<F: SimpleFloat> Params<F> {
    pub fn space(&self) -> Grid<F> {
        self.space
    }

    pub fn nx(&self) -> usize {
        self.space.points()
    }

    pub fn nt(&self) -> usize {
        self.nt
    }

    pub fn dx(&self) -> F {
        self.space.delta
    }

    pub fn dt(&self) -> F {
        self.dt
    }

    pub fn sigma(&self) -> F {
        self.sigma
    }

    /// `dt / dx`, the factor in front of the upwind difference.
    pub fn ratio(&self) -> F {
        self.dt.div(self.space.delta)
    }

    /// Total number of point updates of a full run.
    pub fn workload(&self) -> usize {
        (self.nx() - 1) * self.nt
    }
}
