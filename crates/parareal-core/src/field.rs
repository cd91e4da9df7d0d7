//! The halo-padded field buffer moved between time slices.
//!
//! [`FieldState`] is the unit of state the iteration engine copies,
//! subtracts, and adds. The engine treats the whole padded buffer as an
//! opaque vector; only propagators interpret the halo.

use crate::grid::GridShape;

/// A 3-D scalar field stored with its halo margins.
///
/// The buffer length always equals `shape.padded_len()`. Arithmetic
/// helpers operate element-wise over the full padded buffer, halo
/// included, so that Parareal updates never need to know the layout.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldState {
    shape: GridShape,
    data: Vec<f64>,
}

impl FieldState {
    /// Allocate a zero-filled field for `shape`.
    pub fn zeroed(shape: GridShape) -> Self {
        Self {
            shape,
            data: vec![0.0; shape.padded_len()],
        }
    }

    /// Wrap an existing padded buffer.
    ///
    /// Returns `None` if `data.len()` does not match `shape.padded_len()`.
    pub fn from_vec(shape: GridShape, data: Vec<f64>) -> Option<Self> {
        if shape.checked_len() != Some(data.len()) {
            return None;
        }
        Some(Self { shape, data })
    }

    /// Build a field by evaluating `f(i, j, k)` at every interior cell.
    ///
    /// Halo cells are left at zero.
    pub fn from_interior_fn(shape: GridShape, mut f: impl FnMut(usize, usize, usize) -> f64) -> Self {
        let mut state = Self::zeroed(shape);
        let e = shape.extents;
        for k in 0..e.nz {
            for j in 0..e.ny {
                for i in 0..e.nx {
                    let idx = shape.index(i as isize, j as isize, k as isize);
                    state.data[idx] = f(i, j, k);
                }
            }
        }
        state
    }

    /// Fill every interior cell with `value`, leaving the halo untouched.
    pub fn fill_interior(&mut self, value: f64) {
        let shape = self.shape;
        let e = shape.extents;
        for k in 0..e.nz {
            for j in 0..e.ny {
                let row = shape.index(0, j as isize, k as isize);
                self.data[row..row + e.nx].fill(value);
            }
        }
    }

    /// Layout of this buffer.
    pub fn shape(&self) -> GridShape {
        self.shape
    }

    /// Full padded buffer.
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Full padded buffer, mutably.
    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.data
    }

    /// Number of values in the padded buffer.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the buffer holds no values.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Value at interior coordinates (may reach into the halo).
    pub fn get(&self, i: isize, j: isize, k: isize) -> f64 {
        self.data[self.shape.index(i, j, k)]
    }

    /// Set the value at interior coordinates (may reach into the halo).
    pub fn set(&mut self, i: isize, j: isize, k: isize, value: f64) {
        let idx = self.shape.index(i, j, k);
        self.data[idx] = value;
    }

    /// Copy the interior cells, x-fastest, into a fresh vector.
    pub fn interior(&self) -> Vec<f64> {
        let e = self.shape.extents;
        let mut out = Vec::with_capacity(e.cell_count());
        for k in 0..e.nz {
            for j in 0..e.ny {
                let row = self.shape.index(0, j as isize, k as isize);
                out.extend_from_slice(&self.data[row..row + e.nx]);
            }
        }
        out
    }

    /// Returns `true` if `other` has the same layout.
    pub fn same_shape(&self, other: &FieldState) -> bool {
        self.shape == other.shape
    }

    /// Overwrite this buffer with the contents of `src`.
    ///
    /// # Panics
    ///
    /// Panics if the shapes differ.
    pub fn copy_from(&mut self, src: &FieldState) {
        assert!(self.same_shape(src), "copy_from: shape mismatch");
        self.data.copy_from_slice(&src.data);
    }

    /// Set `self = a - b`, element-wise.
    ///
    /// # Panics
    ///
    /// Panics if the shapes differ.
    pub fn assign_difference(&mut self, a: &FieldState, b: &FieldState) {
        assert!(
            self.same_shape(a) && self.same_shape(b),
            "assign_difference: shape mismatch"
        );
        for ((out, &x), &y) in self.data.iter_mut().zip(&a.data).zip(&b.data) {
            *out = x - y;
        }
    }

    /// Set `self = a + self`, element-wise.
    ///
    /// The addition order matches the Parareal update `G(y) + (F - G)`,
    /// with `a` the fresh coarse value and `self` the stored correction.
    ///
    /// # Panics
    ///
    /// Panics if the shapes differ.
    pub fn add_onto(&mut self, a: &FieldState) {
        assert!(self.same_shape(a), "add_onto: shape mismatch");
        for (out, &x) in self.data.iter_mut().zip(&a.data) {
            *out = x + *out;
        }
    }

    /// Index of the first non-finite value in the padded buffer, if any.
    pub fn first_non_finite(&self) -> Option<usize> {
        self.data.iter().position(|v| !v.is_finite())
    }

    /// Largest absolute element-wise difference from `other`.
    ///
    /// Returns `f64::INFINITY` if the shapes differ.
    pub fn max_abs_diff(&self, other: &FieldState) -> f64 {
        if !self.same_shape(other) {
            return f64::INFINITY;
        }
        self.data
            .iter()
            .zip(&other.data)
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max)
    }

    /// Largest absolute difference over interior cells only.
    ///
    /// Returns `f64::INFINITY` if the shapes differ.
    pub fn max_interior_diff(&self, other: &FieldState) -> f64 {
        if !self.same_shape(other) {
            return f64::INFINITY;
        }
        self.interior()
            .iter()
            .zip(other.interior().iter())
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max)
    }

    /// Memory used by the buffer in bytes.
    pub fn memory_bytes(&self) -> usize {
        self.data.len() * std::mem::size_of::<f64>()
    }
}
