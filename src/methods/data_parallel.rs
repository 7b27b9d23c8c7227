use std::ops::Range;

use faer_core::{MatMut, MatRef};

use super::{Backend, StepFunction};
use crate::{kernel::upwind, mesh::Params, SimError, SimpleFloat};

pub const DEFAULT_BLOCK_DIM: usize = 768;

/// Grid index handled by `thread` of `block`, for blocks of `block_dim`
/// workers laid out back to back.
#[inline]
pub fn global_index(block: usize, thread: usize, block_dim: usize) -> usize {
    block * block_dim + thread
}

fn covering_blocks(nx: usize, block_dim: usize) -> usize {
    match block_dim {
        0 => 0,
        b => (nx + b - 1) / b,
    }
}

/// Order in which the workers of one block are visited.
///
/// Workers never read what another worker writes, so any order yields the
/// same field; the variants exist to exercise exactly that.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThreadOrder {
    #[default]
    Forward,
    Reverse,
    /// Threads `0, k, 2k, ...` first, then `1, k + 1, ...` and so on.
    /// A stride of 0 is treated as 1.
    Strided(usize),
}

impl ThreadOrder {
    fn for_each_thread(self, block_dim: usize, mut f: impl FnMut(usize)) {
        match self {
            ThreadOrder::Forward => (0..block_dim).for_each(f),
            ThreadOrder::Reverse => (0..block_dim).rev().for_each(f),
            ThreadOrder::Strided(k) => {
                let k = k.max(1);
                for first in 0..k.min(block_dim) {
                    (first..block_dim).step_by(k).for_each(&mut f);
                }
            }
        }
    }
}

/// Launch shape of the data-parallel backend: `grid_dim` blocks of
/// `block_dim` workers, one worker per grid index.
///
/// Only scheduling depends on it, never the computed field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaunchConfig {
    pub(crate) block_dim: usize,
    pub(crate) grid_dim: Option<usize>,
    pub(crate) order: ThreadOrder,
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            block_dim: DEFAULT_BLOCK_DIM,
            grid_dim: None,
            order: ThreadOrder::Forward,
        }
    }
}

impl LaunchConfig {
    pub fn with_block_dim(mut self, block_dim: usize) -> Self {
        self.block_dim = block_dim;
        self
    }

    /// Fixed number of blocks. Without one, just enough blocks to cover the
    /// grid are launched.
    pub fn with_grid_dim(mut self, grid_dim: usize) -> Self {
        self.grid_dim = Some(grid_dim);
        self
    }

    pub fn with_order(mut self, order: ThreadOrder) -> Self {
        self.order = order;
        self
    }

    pub fn block_dim(&self) -> usize {
        self.block_dim
    }

    pub fn order(&self) -> ThreadOrder {
        self.order
    }

    /// Number of blocks requested for `nx` points. A block size of 0 gives no
    /// blocks, which `validate` then rejects.
    pub fn grid_dim(&self, nx: usize) -> usize {
        self.grid_dim.unwrap_or_else(|| covering_blocks(nx, self.block_dim))
    }

    // never fewer blocks than needed to reach every point
    fn launched_blocks(&self, nx: usize) -> usize {
        self.grid_dim(nx).max(covering_blocks(nx, self.block_dim))
    }

    fn validate(&self, nx: usize) -> Result<(), SimError> {
        let workers = self.grid_dim(nx).saturating_mul(self.block_dim);
        if workers < nx {
            return Err(SimError::InvalidConfiguration(format!(
                "{} blocks of {} workers cannot cover {} grid points",
                self.grid_dim(nx),
                self.block_dim,
                nx
            )));
        }

        Ok(())
    }
}

/// One worker per grid index, scheduled in blocks over the rayon pool.
///
/// Each worker reads `u[i]` and `u[i - 1]` from the previous step and
/// writes `v[i]` only. Blocks receive disjoint row ranges of `v`, so no
/// synchronisation is needed inside a step.
#[derive(Debug, Clone, Copy, Default)]
pub struct DataParallel {
    launch: LaunchConfig,
}

impl DataParallel {
    pub fn new(launch: LaunchConfig) -> Result<Self, SimError> {
        if launch.block_dim == 0 {
            return Err(SimError::InvalidConfiguration(
                "block size must be positive".to_string(),
            ));
        }
        Ok(Self { launch })
    }

    pub fn launch(&self) -> LaunchConfig {
        self.launch
    }
}

impl<F: SimpleFloat> StepFunction<F> for DataParallel {
    fn init(&mut self, params: &Params<F>) -> Result<(), SimError> {
        self.launch.validate(params.nx())?;

        tracing::debug!(
            block_dim = self.launch.block_dim,
            grid_dim = self.launch.grid_dim(params.nx()),
            order = ?self.launch.order,
            "data parallel launch configuration"
        );
        Ok(())
    }

    fn apply(&mut self, params: &Params<F>, u: MatRef<'_, F>, v: MatMut<'_, F>) {
        let launch = Launch {
            u,
            ratio: params.ratio(),
            config: self.launch,
        };

        launch.run_blocks(0..self.launch.launched_blocks(u.nrows()), 0, v);
    }

    fn backend(&self) -> Backend {
        Backend::DataParallel
    }
}

// shared, read-only view of one launch
struct Launch<'a, F: SimpleFloat> {
    u: MatRef<'a, F>,
    ratio: F,
    config: LaunchConfig,
}

impl<F: SimpleFloat> Launch<'_, F> {
    // `v` holds rows `row0..row0 + v.nrows()` of the output column, which are
    // exactly the rows owned by `blocks`
    fn run_blocks(&self, blocks: Range<usize>, row0: usize, v: MatMut<'_, F>) {
        if blocks.len() <= 1 {
            if !blocks.is_empty() {
                self.run_block(blocks.start, row0, v);
            }
            return;
        }

        let mid = blocks.start + blocks.len() / 2;
        let split = (mid * self.config.block_dim).clamp(row0, row0 + v.nrows()) - row0;
        let [left, right] = v.split_at_row(split);

        rayon::join(
            || self.run_blocks(blocks.start..mid, row0, left),
            || self.run_blocks(mid..blocks.end, row0 + split, right),
        );
    }

    fn run_block(&self, block: usize, row0: usize, mut v: MatMut<'_, F>) {
        let nx = self.u.nrows();
        let (u, r) = (self.u, self.ratio);

        let block_dim = self.config.block_dim;

        self.config.order.for_each_thread(block_dim, |thread| {
            let i = global_index(block, thread, block_dim);
            // row 0 is the boundary, rows past nx belong to no one
            if i == 0 || i >= nx {
                return;
            }
            v.write(i - row0, 0, upwind(u.read(i, 0), u.read(i - 1, 0), r));
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::faer_add::{column, to_vec};
    use crate::{methods::ScalarLoop, Config};

    fn visit(order: ThreadOrder, block_dim: usize) -> Vec<usize> {
        let mut seen = Vec::new();
        order.for_each_thread(block_dim, |t| seen.push(t));
        seen
    }

    #[test]
    fn thread_orders_are_permutations() {
        assert_eq!(visit(ThreadOrder::Forward, 4), vec![0, 1, 2, 3]);
        assert_eq!(visit(ThreadOrder::Reverse, 4), vec![3, 2, 1, 0]);
        assert_eq!(visit(ThreadOrder::Strided(3), 7), vec![0, 3, 6, 1, 4, 2, 5]);
        assert_eq!(visit(ThreadOrder::Strided(0), 3), vec![0, 1, 2]);
        assert_eq!(visit(ThreadOrder::Strided(10), 3), vec![0, 1, 2]);
    }

    #[test]
    fn global_index_is_block_major() {
        assert_eq!(global_index(0, 5, 768), 5);
        assert_eq!(global_index(3, 2, 4), 14);
    }

    #[test]
    fn automatic_grid_covers_the_field() {
        let launch = LaunchConfig::default().with_block_dim(4);

        assert_eq!(launch.grid_dim(8), 2);
        assert_eq!(launch.grid_dim(9), 3);
        assert!(launch.validate(9).is_ok());
    }

    #[test]
    fn zero_block_size_launches_nothing() {
        let launch = LaunchConfig::default().with_block_dim(0);

        assert_eq!(launch.grid_dim(10), 0);
        assert!(matches!(
            launch.validate(10),
            Err(SimError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn undersized_grid_still_updates_every_point() {
        // init is skipped, so nothing rejects 2 blocks of 8 for 100 points
        let params = Config::new(100, 1, 15.0, 0.25).params::<f64>().unwrap();
        let u = column(100, |i| 1.0 + (i % 5) as f64 / 5.0);

        let mut expected = column(100, |_| 0.0);
        ScalarLoop.apply(&params, u.as_ref(), expected.as_mut());

        let mut step =
            DataParallel::new(LaunchConfig::default().with_block_dim(8).with_grid_dim(2))
                .unwrap();
        let mut v = column(100, |_| 0.0);
        step.apply(&params, u.as_ref(), v.as_mut());

        assert_eq!(to_vec(v.as_ref()), to_vec(expected.as_ref()));
    }

    #[test]
    fn rejects_launches_that_miss_points() {
        assert!(DataParallel::new(LaunchConfig::default().with_block_dim(0)).is_err());

        let params = Config::new(100, 1, 15.0, 0.25).params::<f64>().unwrap();
        let mut step =
            DataParallel::new(LaunchConfig::default().with_block_dim(8).with_grid_dim(12))
                .unwrap();
        assert!(matches!(
            StepFunction::<f64>::init(&mut step, &params),
            Err(SimError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn oversized_grid_matches_scalar_loop() {
        // a fixed launch of 320 blocks of 768 workers, far more than points
        let params = Config::new(1000, 1, 15.0, 0.25).params::<f64>().unwrap();
        let u = column(1000, |i| 1.0 + (i % 7) as f64 / 7.0);

        let mut expected = column(1000, |_| 0.0);
        ScalarLoop.apply(&params, u.as_ref(), expected.as_mut());

        let mut step = DataParallel::new(
            LaunchConfig::default()
                .with_block_dim(768)
                .with_grid_dim(320),
        )
        .unwrap();
        step.init(&params).unwrap();
        let mut v = column(1000, |_| 0.0);
        step.apply(&params, u.as_ref(), v.as_mut());

        assert_eq!(to_vec(v.as_ref()), to_vec(expected.as_ref()));
    }
}
