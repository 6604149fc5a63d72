//! Row-parallel loops.
//!
//! Every unit of work owns exactly one row of the output buffer, so no
//! locking is needed. Whether rows run concurrently, and on which pool, is
//! decided by the [`ExecutionContext`].

use rayon::prelude::*;

use crate::context::ExecutionContext;

/// Runs `f(i, row)` for every row `i` of the row-major buffer `data`.
///
/// `data` is split into rows of `row_len` elements; each row is handed out as
/// a disjoint `&mut` slice. A trailing partial row is never produced because
/// callers pass buffers whose length is a multiple of `row_len`. Empty
/// buffers and zero-length rows are no-ops.
pub fn for_each_row<T, F>(ctx: &ExecutionContext, data: &mut [T], row_len: usize, f: F)
where
    T: Send,
    F: Fn(usize, &mut [T]) + Send + Sync,
{
    if row_len == 0 || data.is_empty() {
        return;
    }
    debug_assert_eq!(data.len() % row_len, 0, "buffer is not a whole number of rows");

    if !ctx.parallel() || data.len() / row_len < 2 {
        data.chunks_mut(row_len)
            .enumerate()
            .for_each(|(i, row)| f(i, row));
        return;
    }

    let min_len = ctx.min_rows_per_task();
    ctx.install(|| {
        data.par_chunks_mut(row_len)
            .with_min_len(min_len)
            .enumerate()
            .for_each(|(i, row)| f(i, row));
    });
}
