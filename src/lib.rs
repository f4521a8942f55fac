//! `tilework` computes blocked dense matrix factorizations and updates on tiled storage.
//!
//! Matrices are split into fixed-size tiles described by a [`Descriptor`]. Every operation on a
//! tile is submitted as a task to a scheduling [`Region`](sched::Region), together with the
//! memory it reads and writes. The scheduler derives the execution order and the available
//! parallelism from those declarations alone.
//!
//! Failures inside a region are cooperative: every task checks the [`Sequence`] it belongs to
//! before doing any work, and records its own failure there. The caller observes the status
//! once the region has joined.
//!
//! # Example
//!
//! ```
//! use tilework::{drivers, Config, Context};
//!
//! let ctx = Context::new(Config::default().with_tile_size(2).with_inner_block(1)).unwrap();
//!
//! let a: Vec<f64> = (1..=16).map(|x| x as f64).collect();
//! let b: Vec<f64> = (0..16).map(|i| if i % 5 == 0 { 1.0 } else { 0.0 }).collect();
//! let mut c = vec![0.0f64; 16];
//!
//! drivers::gemm(
//!     &ctx,
//!     tilework::Transpose::NoTrans,
//!     tilework::Transpose::NoTrans,
//!     4,
//!     4,
//!     4,
//!     1.0,
//!     &a,
//!     4,
//!     &b,
//!     4,
//!     0.0,
//!     &mut c,
//!     4,
//! )
//! .unwrap();
//! assert_eq!(a, c);
//! ```

#![allow(clippy::too_many_arguments)]
#![allow(clippy::type_complexity)]

use equator::assert;

pub mod compute;
pub mod config;
pub mod desc;
pub mod drivers;
pub mod error;
pub mod kernel;
pub mod scalar;
pub mod sched;
pub mod sequence;
pub mod storage;
pub mod tasks;
pub mod tile;
pub mod translate;

pub use dyn_stack;
pub use reborrow;

pub use config::{Config, Context};
pub use desc::{Descriptor, StorageKind, TileLayout};
pub use error::{Result, TileError};
pub use scalar::{Precision, RealScalar, TileScalar};
pub use sequence::{Request, Sequence};
pub use storage::{NaturalBand, NaturalMatrix, TileMatrix};
pub use tile::{TileMut, TileRef};

/// 32-bit complex floating point type.
#[allow(non_camel_case_types)]
pub type c32 = num_complex::Complex<f32>;
/// 64-bit complex floating point type.
#[allow(non_camel_case_types)]
pub type c64 = num_complex::Complex<f64>;

/// Which part of a matrix an operation accesses.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Uplo {
    /// The whole matrix.
    General,
    /// The upper triangle, diagonal included.
    Upper,
    /// The lower triangle, diagonal included.
    Lower,
}

/// Operation applied to a matrix operand before it is used.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Transpose {
    NoTrans,
    Trans,
    ConjTrans,
}

/// Side on which a triangular operand multiplies the other one.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Side {
    Left,
    Right,
}

/// Whether the diagonal of a triangular operand is read or taken to be one.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Diag {
    NonUnit,
    Unit,
}

#[cfg(feature = "perf-warn")]
#[doc(hidden)]
macro_rules! __perf_warn {
    ($name: ident) => {{
        #[inline(always)]
        #[allow(non_snake_case)]
        fn $name() -> &'static ::core::sync::atomic::AtomicBool {
            static $name: ::core::sync::atomic::AtomicBool =
                ::core::sync::atomic::AtomicBool::new(false);
            &$name
        }
        ::core::matches!(
            $name().compare_exchange(
                false,
                true,
                ::core::sync::atomic::Ordering::Relaxed,
                ::core::sync::atomic::Ordering::Relaxed,
            ),
            Ok(_)
        )
    }};
}
#[cfg(feature = "perf-warn")]
pub(crate) use __perf_warn;
