//! Grid geometry: interior extents, halo margins, and spacing.
//!
//! A [`GridShape`] combines the interior extents `(Nx, Ny, Nz)` with the
//! ghost-cell [`Halo`] required by stencil propagators. All buffers are
//! stored x-fastest (`x + px * (y + py * z)` over padded dimensions).

/// Interior extents of a 3-D grid, excluding halo cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GridExtents {
    /// Number of interior cells along x.
    pub nx: usize,
    /// Number of interior cells along y.
    pub ny: usize,
    /// Number of interior cells along z.
    pub nz: usize,
}

impl GridExtents {
    /// Create extents from the three axis lengths.
    pub fn new(nx: usize, ny: usize, nz: usize) -> Self {
        Self { nx, ny, nz }
    }

    /// Number of interior cells.
    pub fn cell_count(&self) -> usize {
        self.nx * self.ny * self.nz
    }

    /// Returns `true` if any axis has zero cells.
    pub fn is_empty(&self) -> bool {
        self.nx == 0 || self.ny == 0 || self.nz == 0
    }

    /// Extents as an `[nx, ny, nz]` array.
    pub fn as_array(&self) -> [usize; 3] {
        [self.nx, self.ny, self.nz]
    }
}

/// Ghost-cell margins on the low and high side of every axis.
///
/// The defaults (2 low, 3 high) fit the third-order upwind stencils used
/// by the reference advection propagator; wider stencils need a wider
/// halo, which propagators check in their `setup`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Halo {
    /// Cells before the first interior cell on each axis.
    pub low: usize,
    /// Cells after the last interior cell on each axis.
    pub high: usize,
}

impl Halo {
    /// Default low-side margin.
    pub const DEFAULT_LOW: usize = 2;

    /// Default high-side margin.
    pub const DEFAULT_HIGH: usize = 3;

    /// A halo with no ghost cells, for pointwise (ODE-style) propagators.
    pub const NONE: Halo = Halo { low: 0, high: 0 };

    /// Create a halo with the given margins.
    pub fn new(low: usize, high: usize) -> Self {
        Self { low, high }
    }

    /// Total margin added to each axis.
    pub fn width(&self) -> usize {
        self.low + self.high
    }
}

impl Default for Halo {
    fn default() -> Self {
        Self {
            low: Self::DEFAULT_LOW,
            high: Self::DEFAULT_HIGH,
        }
    }
}

/// Interior extents plus halo: the full layout of a padded field buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GridShape {
    /// Interior extents.
    pub extents: GridExtents,
    /// Ghost-cell margins.
    pub halo: Halo,
}

impl GridShape {
    /// Create a shape with the default halo.
    pub fn new(extents: GridExtents) -> Self {
        Self {
            extents,
            halo: Halo::default(),
        }
    }

    /// Create a shape with an explicit halo.
    pub fn with_halo(extents: GridExtents, halo: Halo) -> Self {
        Self { extents, halo }
    }

    /// Padded dimensions `[px, py, pz]`.
    pub fn padded(&self) -> [usize; 3] {
        let w = self.halo.width();
        [
            self.extents.nx + w,
            self.extents.ny + w,
            self.extents.nz + w,
        ]
    }

    /// Total number of values in a padded buffer, or `None` on overflow.
    pub fn checked_len(&self) -> Option<usize> {
        let [px, py, pz] = self.padded();
        px.checked_mul(py)?.checked_mul(pz)
    }

    /// Total number of values in a padded buffer.
    ///
    /// Callers that accept untrusted extents should use
    /// [`checked_len`](Self::checked_len) instead.
    pub fn padded_len(&self) -> usize {
        let [px, py, pz] = self.padded();
        px * py * pz
    }

    /// Flat buffer index of the cell at interior coordinates `(i, j, k)`.
    ///
    /// Coordinates are relative to the first interior cell and may reach
    /// into the halo: `-halo.low <= i < nx + halo.high`.
    #[inline]
    pub fn index(&self, i: isize, j: isize, k: isize) -> usize {
        let [px, py, _] = self.padded();
        let low = self.halo.low as isize;
        let x = (i + low) as usize;
        let y = (j + low) as usize;
        let z = (k + low) as usize;
        x + px * (y + py * z)
    }

    /// Flat-index distance between neighbouring cells along each axis.
    pub fn strides(&self) -> [usize; 3] {
        let [px, py, _] = self.padded();
        [1, px, px * py]
    }
}

/// Physical spacing between grid points along each axis.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridSpacing {
    /// Spacing along x.
    pub dx: f64,
    /// Spacing along y.
    pub dy: f64,
    /// Spacing along z.
    pub dz: f64,
}

impl GridSpacing {
    /// Create a spacing from the three axis values.
    pub fn new(dx: f64, dy: f64, dz: f64) -> Self {
        Self { dx, dy, dz }
    }

    /// Uniform spacing `h` on all axes.
    pub fn uniform(h: f64) -> Self {
        Self::new(h, h, h)
    }

    /// Spacing that maps `extents` onto the unit cube.
    pub fn unit_cube(extents: GridExtents) -> Self {
        Self::new(
            1.0 / extents.nx as f64,
            1.0 / extents.ny as f64,
            1.0 / extents.nz as f64,
        )
    }

    /// Spacing as a `[dx, dy, dz]` array.
    pub fn as_array(&self) -> [f64; 3] {
        [self.dx, self.dy, self.dz]
    }

    /// Returns `true` if every component is finite and strictly positive.
    pub fn is_valid(&self) -> bool {
        self.as_array().iter().all(|h| h.is_finite() && *h > 0.0)
    }
}

impl Default for GridSpacing {
    fn default() -> Self {
        Self::uniform(1.0)
    }
}
