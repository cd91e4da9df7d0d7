//! One-dimensional finite-difference stencils.
//!
//! Each stencil is a list of `(offset, weight)` pairs; the derivative at a
//! cell is `sum(weight * q[cell + offset]) / divisor`. Offsets are in cells
//! along a single axis.

use parareal_core::Halo;
use smallvec::SmallVec;

/// Sparse 1-D stencil. At most six taps for the orders provided here.
pub(crate) type Taps = SmallVec<[(isize, f64); 6]>;

/// Order of the upwind first-derivative approximation used for advection.
///
/// Forward Euler is only stable with [`Upwind1`](Self::Upwind1); pair the
/// higher orders with [`TimeIntegrator::Rk3Ssp`](crate::TimeIntegrator::Rk3Ssp).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum AdvectionOrder {
    /// First-order upwind (two-point).
    Upwind1,
    /// Third-order upwind-biased (four-point).
    #[default]
    Upwind3,
    /// Fifth-order upwind-biased (six-point).
    Upwind5,
}

impl AdvectionOrder {
    /// Formal order of accuracy.
    pub fn order(&self) -> u32 {
        match self {
            Self::Upwind1 => 1,
            Self::Upwind3 => 3,
            Self::Upwind5 => 5,
        }
    }

    /// First-derivative taps for a positive advection velocity, already
    /// divided by their common denominator (spacing not applied).
    fn positive_taps(&self) -> Taps {
        let (raw, divisor): (&[(isize, f64)], f64) = match self {
            Self::Upwind1 => (&[(-1, -1.0), (0, 1.0)], 1.0),
            Self::Upwind3 => (&[(-2, 1.0), (-1, -6.0), (0, 3.0), (1, 2.0)], 6.0),
            Self::Upwind5 => (
                &[
                    (-3, -2.0),
                    (-2, 15.0),
                    (-1, -60.0),
                    (0, 20.0),
                    (1, 30.0),
                    (2, -3.0),
                ],
                60.0,
            ),
        };
        raw.iter().map(|&(o, w)| (o, w / divisor)).collect()
    }

    /// First-derivative taps biased against the flow for `velocity`.
    ///
    /// Negative velocities use the mirror image of the positive stencil:
    /// offsets and weights both change sign.
    pub(crate) fn taps(&self, velocity: f64) -> Taps {
        let taps = self.positive_taps();
        if velocity >= 0.0 {
            taps
        } else {
            taps.into_iter().map(|(o, w)| (-o, -w)).collect()
        }
    }

    /// Ghost cells this stencil reads on each side for `velocity`.
    pub fn required_halo(&self, velocity: f64) -> Halo {
        halo_of(&self.taps(velocity))
    }
}

/// Second-order centred second derivative `(q[-1] - 2 q[0] + q[1])`.
pub(crate) fn laplacian_taps() -> Taps {
    [(-1, 1.0), (0, -2.0), (1, 1.0)].into_iter().collect()
}

/// Smallest halo that covers every offset in `taps`.
pub(crate) fn halo_of(taps: &Taps) -> Halo {
    let low = taps.iter().map(|&(o, _)| (-o).max(0)).max().unwrap_or(0);
    let high = taps.iter().map(|&(o, _)| o.max(0)).max().unwrap_or(0);
    Halo::new(low as usize, high as usize)
}

/// Component-wise maximum of two halos.
pub(crate) fn union(a: Halo, b: Halo) -> Halo {
    Halo::new(a.low.max(b.low), a.high.max(b.high))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(taps: &Taps, f: impl Fn(f64) -> f64, x: f64, h: f64) -> f64 {
        taps.iter().map(|&(o, w)| w * f(x + o as f64 * h)).sum::<f64>() / h
    }

    #[test]
    fn upwind_stencils_differentiate_polynomials_exactly() {
        let h = 0.1;
        for order in [AdvectionOrder::Upwind1, AdvectionOrder::Upwind3, AdvectionOrder::Upwind5] {
            let p = order.order() as i32;
            for velocity in [1.0, -1.0] {
                let taps = order.taps(velocity);
                // Exact for x^p, derivative p x^(p-1).
                let got = apply(&taps, |x| x.powi(p), 0.3, h);
                let want = f64::from(p) * 0.3f64.powi(p - 1);
                assert!((got - want).abs() < 1e-9, "{order:?} v={velocity}: {got} vs {want}");
            }
        }
    }

    #[test]
    fn weights_sum_to_zero() {
        for order in [AdvectionOrder::Upwind1, AdvectionOrder::Upwind3, AdvectionOrder::Upwind5] {
            let sum: f64 = order.taps(1.0).iter().map(|&(_, w)| w).sum();
            assert!(sum.abs() < 1e-15);
        }
        let sum: f64 = laplacian_taps().iter().map(|&(_, w)| w).sum();
        assert_eq!(sum, 0.0);
    }

    #[test]
    fn required_halo_follows_velocity_sign() {
        assert_eq!(AdvectionOrder::Upwind1.required_halo(1.0), Halo::new(1, 0));
        assert_eq!(AdvectionOrder::Upwind1.required_halo(-1.0), Halo::new(0, 1));
        assert_eq!(AdvectionOrder::Upwind3.required_halo(1.0), Halo::new(2, 1));
        assert_eq!(AdvectionOrder::Upwind3.required_halo(-1.0), Halo::new(1, 2));
        assert_eq!(AdvectionOrder::Upwind5.required_halo(1.0), Halo::new(3, 2));
        assert_eq!(AdvectionOrder::Upwind5.required_halo(-1.0), Halo::new(2, 3));
        assert_eq!(halo_of(&laplacian_taps()), Halo::new(1, 1));
    }

    #[test]
    fn union_takes_widest_side() {
        assert_eq!(union(Halo::new(3, 0), Halo::new(1, 2)), Halo::new(3, 2));
    }
}
