use faer_core::{Mat, MatMut, MatRef};
use reborrow::*;

use crate::{faer_add::to_column, SimpleFloat};

/// Field storage of a run: two columns of `nx` samples used in ping-pong
/// fashion. One column holds the field at the current step, the other
/// receives the next one.
#[derive(Debug, Clone)]
pub struct GridState<F: SimpleFloat> {
    inner: Mat<F>,
    current: usize,
}

impl<F: SimpleFloat> GridState<F> {
    /// Both columns start as a copy of `initial`, so that points no backend
    /// ever writes (the left boundary) keep their initial value whichever
    /// column is current.
    pub fn new(initial: MatRef<'_, F>) -> Self {
        assert!(initial.ncols() == 1);
        Self {
            inner: Mat::from_fn(initial.nrows(), 2, |i, _| initial.read(i, 0)),
            current: 0,
        }
    }

    pub fn nx(&self) -> usize {
        self.inner.nrows()
    }

    pub fn current(&self) -> MatRef<'_, F> {
        self.inner.as_ref().col(self.current)
    }

    /// Hand the current column (read-only) and the other column (writable)
    /// to `f`, then make the written column current.
    ///
    /// The roles only flip once `f` has returned, so no update ever observes
    /// a half-swapped pair.
    pub fn advance<R>(&mut self, f: impl FnOnce(MatRef<'_, F>, MatMut<'_, F>) -> R) -> R {
        let [first, second] = self.inner.as_mut().split_at_col(1);

        let out = if self.current == 0 {
            f(first.rb(), second)
        } else {
            f(second.rb(), first)
        };

        self.current = 1 - self.current;
        out
    }

    pub fn to_field(&self) -> Mat<F> {
        to_column(self.current())
    }
}
