use crate::SimpleFloat;

/// First-order upwind update of the inviscid Burgers equation at one point:
///
/// `u_next[i] = u[i] - (u[i] * dt / dx) * (u[i] - u[i - 1])`
///
/// with `u = u[i]`, `um = u[i - 1]` and `ratio = dt / dx`. The local wave
/// speed is the field value itself, which is what steepens the hat into a
/// shock. Every backend calls this function so that they all perform the
/// exact same floating-point operations.
#[inline(always)]
pub fn upwind<F: SimpleFloat>(u: F, um: F, ratio: F) -> F {
    u.sub(u.mul(ratio).mul(u.sub(um)))
}
