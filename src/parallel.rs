//! Fork-join dispatch for the per-particle passes.
//!
//! Each simulation pass is one logical thread per particle; on the CPU
//! that becomes a parallel-for over the particle range. Small populations
//! run serially: below the threshold the rayon overhead outweighs the
//! per-particle work.

use rayon::prelude::*;

const PAR_THRESHOLD: usize = 4096;
const PAR_MIN_WORK_PER_THREAD: usize = 512;

fn should_parallelize(len: usize) -> bool {
    if len < PAR_THRESHOLD {
        return false;
    }
    let threads = rayon::current_num_threads().max(1);
    len / threads >= PAR_MIN_WORK_PER_THREAD
}

/// Write every slot of `out` from its index. Each slot is written exactly
/// once, so the parallel path is race-free by construction.
pub fn fill_indexed<T, F>(out: &mut [T], op: F)
where
    T: Send,
    F: Fn(usize) -> T + Sync + Send,
{
    if should_parallelize(out.len()) {
        out.par_iter_mut().enumerate().for_each(|(i, slot)| *slot = op(i));
    } else {
        for (i, slot) in out.iter_mut().enumerate() {
            *slot = op(i);
        }
    }
}

/// Mutate every slot of `items` in place.
pub fn for_each_indexed<T, F>(items: &mut [T], op: F)
where
    T: Send,
    F: Fn(usize, &mut T) + Sync + Send,
{
    if should_parallelize(items.len()) {
        items.par_iter_mut().enumerate().for_each(|(i, item)| op(i, item));
    } else {
        for (i, item) in items.iter_mut().enumerate() {
            op(i, item);
        }
    }
}

/// Mutate matching slots of two equal-length arrays together; for passes
/// that update two particle attributes in one sweep.
pub fn for_each_pair<A, B, F>(a: &mut [A], b: &mut [B], op: F)
where
    A: Send,
    B: Send,
    F: Fn(usize, &mut A, &mut B) + Sync + Send,
{
    debug_assert_eq!(a.len(), b.len());
    if should_parallelize(a.len()) {
        a.par_iter_mut()
            .zip(b.par_iter_mut())
            .enumerate()
            .for_each(|(i, (x, y))| op(i, x, y));
    } else {
        for (i, (x, y)) in a.iter_mut().zip(b.iter_mut()).enumerate() {
            op(i, x, y);
        }
    }
}
