//! Halo maintenance for periodic grids.

use parareal_core::FieldState;

/// Wrap `val` into `0..len`.
#[inline]
pub(crate) fn wrap_axis(val: isize, len: usize) -> isize {
    let len = len as isize;
    ((val % len) + len) % len
}

/// Overwrite every halo cell with the periodic image of an interior cell.
///
/// Corner and edge ghosts are wrapped on every axis at once, so a single
/// pass leaves the whole halo consistent.
pub(crate) fn fill_periodic_halo(state: &mut FieldState) {
    let shape = state.shape();
    if shape.halo.width() == 0 {
        return;
    }
    let [nx, ny, nz] = shape.extents.as_array();
    let low = shape.halo.low as isize;
    let high = shape.halo.high as isize;
    let (nxi, nyi, nzi) = (nx as isize, ny as isize, nz as isize);
    let data = state.as_mut_slice();

    for k in -low..nzi + high {
        let kk = wrap_axis(k, nz);
        let k_in = k == kk;
        for j in -low..nyi + high {
            let jj = wrap_axis(j, ny);
            let j_in = j == jj;
            for i in -low..nxi + high {
                let ii = wrap_axis(i, nx);
                if k_in && j_in && i == ii {
                    continue;
                }
                data[shape.index(i, j, k)] = data[shape.index(ii, jj, kk)];
            }
        }
    }
}
