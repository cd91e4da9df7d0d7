//! Engine and run configuration.
//!
//! [`EngineConfig`] fixes everything that lives as long as the engine:
//! worker count, grid layout, viscosity. [`RunParameters`] and
//! [`RunOptions`] describe a single `run()` and are validated before the
//! engine touches any buffer.

use parareal_arena::PoolConfig;
use parareal_core::{GridExtents, GridShape, GridSpacing, Halo, RunId};
use parareal_propagator::DiscretizationConfig;

use crate::error::EngineError;

// ── EngineConfig ───────────────────────────────────────────────────

/// Construction-time configuration for a [`PararealEngine`](crate::PararealEngine).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EngineConfig {
    /// Number of workers, which is also the number of time slices.
    /// Fixed for the engine's lifetime.
    pub worker_count: usize,
    /// Grid extents and halo of every field buffer.
    pub shape: GridShape,
    /// Diffusion coefficient handed to both propagators at setup.
    pub viscosity: f64,
    /// Check every propagated buffer for NaN/infinity. Default: on.
    pub nan_sentinel: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            worker_count: 1,
            shape: GridShape::new(GridExtents::new(1, 1, 1)),
            viscosity: 0.0,
            nan_sentinel: true,
        }
    }
}

impl EngineConfig {
    /// `worker_count` workers over `extents` with the default halo.
    pub fn new(worker_count: usize, extents: GridExtents) -> Self {
        Self {
            worker_count,
            shape: GridShape::new(extents),
            ..Self::default()
        }
    }

    /// Replace the halo.
    pub fn with_halo(mut self, halo: Halo) -> Self {
        self.shape.halo = halo;
        self
    }

    /// Set the viscosity passed to propagator setup.
    pub fn with_viscosity(mut self, viscosity: f64) -> Self {
        self.viscosity = viscosity;
        self
    }

    /// Enable or disable the finite-value sentinel.
    pub fn with_nan_sentinel(mut self, enabled: bool) -> Self {
        self.nan_sentinel = enabled;
        self
    }

    /// Check structural invariants.
    ///
    /// # Errors
    ///
    /// [`EngineError::InvalidDimension`] for a zero worker count or
    /// extent, [`EngineError::InvalidParameter`] for a negative or
    /// non-finite viscosity, and [`EngineError::AllocationFailure`] if the
    /// pool size overflows.
    pub fn validate(&self) -> Result<(), EngineError> {
        require_positive("worker_count", self.worker_count)?;
        let GridExtents { nx, ny, nz } = self.shape.extents;
        require_positive("nx", nx)?;
        require_positive("ny", ny)?;
        require_positive("nz", nz)?;
        if !self.viscosity.is_finite() || self.viscosity < 0.0 {
            return Err(EngineError::InvalidParameter {
                what: "viscosity",
                value: self.viscosity,
            });
        }
        self.pool_config().validate()?;
        Ok(())
    }

    /// Sizing for the slice buffer pool.
    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig::new(self.worker_count, self.shape)
    }

    /// Parameters handed to `Propagator::setup`.
    pub fn discretization(&self) -> DiscretizationConfig {
        DiscretizationConfig::new(self.viscosity, self.shape, self.worker_count)
    }
}

// ── RunParameters ──────────────────────────────────────────────────

/// Numerical parameters of one run. Immutable for the run's duration.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RunParameters {
    /// End of the simulated interval `[0, t_end]`.
    pub t_end: f64,
    /// Fine steps per slice.
    pub fine_steps: u32,
    /// Coarse steps per slice.
    pub coarse_steps: u32,
    /// Number of correction passes. Zero yields the coarse trajectory.
    pub iterations: u32,
    /// Physical grid spacing handed to the propagators.
    pub spacing: GridSpacing,
    /// Worker count the caller expects; must match the engine's.
    pub worker_count: usize,
}

impl RunParameters {
    /// Parameters with unit grid spacing.
    pub fn new(t_end: f64, fine_steps: u32, coarse_steps: u32, iterations: u32, worker_count: usize) -> Self {
        Self {
            t_end,
            fine_steps,
            coarse_steps,
            iterations,
            spacing: GridSpacing::default(),
            worker_count,
        }
    }

    /// Replace the grid spacing.
    pub fn with_spacing(mut self, spacing: GridSpacing) -> Self {
        self.spacing = spacing;
        self
    }

    /// Total fine steps across the whole interval, `worker_count * fine_steps`.
    pub fn total_fine_steps(&self) -> u64 {
        self.worker_count as u64 * u64::from(self.fine_steps)
    }

    /// Check value ranges. The worker-count match is checked by the engine.
    ///
    /// # Errors
    ///
    /// [`EngineError::InvalidParameter`] for a non-positive or non-finite
    /// `t_end` or spacing, [`EngineError::InvalidDimension`] for zero step
    /// or worker counts.
    pub fn validate(&self) -> Result<(), EngineError> {
        if !self.t_end.is_finite() || self.t_end <= 0.0 {
            return Err(EngineError::InvalidParameter {
                what: "t_end",
                value: self.t_end,
            });
        }
        require_positive("fine_steps", self.fine_steps as usize)?;
        require_positive("coarse_steps", self.coarse_steps as usize)?;
        require_positive("worker_count", self.worker_count)?;
        if let Some(h) = self
            .spacing
            .as_array()
            .into_iter()
            .find(|h| !h.is_finite() || *h <= 0.0)
        {
            return Err(EngineError::InvalidParameter {
                what: "grid spacing",
                value: h,
            });
        }
        Ok(())
    }
}

// ── RunOptions ─────────────────────────────────────────────────────

/// Side-channel switches for one run; they never change the result.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Write per-worker field and timing snapshots to the installed sink.
    pub emit_output: bool,
    /// Log per-iteration progress at `info` instead of `debug`.
    pub verbose: bool,
    /// Identifier for logs and persisted output. `None` allocates a fresh one.
    pub run_id: Option<RunId>,
}

impl RunOptions {
    /// Emit diagnostics output.
    pub fn emitting(mut self) -> Self {
        self.emit_output = true;
        self
    }

    /// Log iterations at `info`.
    pub fn verbose(mut self) -> Self {
        self.verbose = true;
        self
    }

    /// Use a fixed run identifier.
    pub fn with_run_id(mut self, id: RunId) -> Self {
        self.run_id = Some(id);
        self
    }
}

fn require_positive(what: &'static str, value: usize) -> Result<(), EngineError> {
    if value == 0 {
        return Err(EngineError::InvalidDimension { what, value });
    }
    Ok(())
}
