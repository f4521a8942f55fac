//! Single-tile numeric kernels.
//!
//! Every kernel takes its shape through the views it receives, reads only its inputs, writes
//! only its outputs, and returns `Ok(())` or a [`TileError`](crate::TileError). Illegal
//! arguments are reported as [`TileError::KernelArgument`](crate::TileError::KernelArgument)
//! carrying the one-based position of the offending argument. Kernels never allocate: scratch
//! space is passed in by the caller.
//!
//! Kernels can run concurrently on disjoint views.

mod cholesky;
mod copy;
mod gemm;
mod householder;
mod norm;
mod panel;
mod syr2k;
mod trmm;

pub use cholesky::potrf;
pub use copy::{lacpy, lacpy_band_to_tile, lacpy_tile_to_band, laset};
pub use gemm::gemm;
pub use norm::{gessq, ssq_combine, syssq, SumSquares};
pub use panel::{gelqt, gelqt_work_len, geqrt, geqrt_work_len};
pub use syr2k::syr2k;
pub use trmm::trmm;

pub(crate) use gemm::matmul;

use crate::TileError;

#[inline]
pub(crate) fn illegal(index: usize) -> TileError {
    TileError::KernelArgument { index }
}
