//! Strided views over one tile.
//!
//! The kernels operate on [`TileRef`] and [`TileMut`], which carry a pointer, a shape and two
//! strides. Views are created from the tiled buffers, from natural column-major matrices, or
//! directly from slices.

use crate::{assert, sched::MemRange};
use core::marker::PhantomData;
use core::mem::size_of;
use reborrow::*;

/// Immutable view over a strided tile.
pub struct TileRef<'a, E> {
    ptr: *const E,
    nrows: usize,
    ncols: usize,
    row_stride: isize,
    col_stride: isize,
    __marker: PhantomData<&'a E>,
}

/// Mutable view over a strided tile.
pub struct TileMut<'a, E> {
    ptr: *mut E,
    nrows: usize,
    ncols: usize,
    row_stride: isize,
    col_stride: isize,
    __marker: PhantomData<&'a mut E>,
}

unsafe impl<E: Sync> Send for TileRef<'_, E> {}
unsafe impl<E: Sync> Sync for TileRef<'_, E> {}
unsafe impl<E: Send> Send for TileMut<'_, E> {}
unsafe impl<E: Sync> Sync for TileMut<'_, E> {}

impl<E> Copy for TileRef<'_, E> {}
impl<E> Clone for TileRef<'_, E> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

impl<E> core::fmt::Debug for TileRef<'_, E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TileRef")
            .field("nrows", &self.nrows)
            .field("ncols", &self.ncols)
            .field("row_stride", &self.row_stride)
            .field("col_stride", &self.col_stride)
            .finish()
    }
}

impl<E> core::fmt::Debug for TileMut<'_, E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Debug::fmt(&self.rb(), f)
    }
}

#[inline]
fn elem_offset(i: usize, j: usize, row_stride: isize, col_stride: isize) -> isize {
    (i as isize)
        .wrapping_mul(row_stride)
        .wrapping_add((j as isize).wrapping_mul(col_stride))
}

fn check_col_major(len: usize, nrows: usize, ncols: usize, ld: usize) {
    assert!(ld >= nrows);
    if nrows > 0 && ncols > 0 {
        assert!((ncols - 1) * ld + nrows <= len);
    }
}

/// Byte ranges covered by a strided view.
fn strided_footprint<E>(
    ptr: *const E,
    nrows: usize,
    ncols: usize,
    row_stride: isize,
    col_stride: isize,
) -> Vec<MemRange> {
    if nrows == 0 || ncols == 0 {
        return Vec::new();
    }
    let size = size_of::<E>();
    let base = ptr as usize;

    let contiguous_runs = |run: usize, count: usize, stride: isize| {
        if count == 1 || stride == run as isize {
            return vec![MemRange::new(base, base + run * count * size)];
        }
        (0..count)
            .map(|k| {
                let start = base.wrapping_add((k as isize * stride) as usize * size);
                MemRange::new(start, start + run * size)
            })
            .collect()
    };

    if row_stride == 1 && col_stride >= nrows as isize {
        contiguous_runs(nrows, ncols, col_stride)
    } else if col_stride == 1 && row_stride >= ncols as isize {
        contiguous_runs(ncols, nrows, row_stride)
    } else {
        let corners = [
            0,
            elem_offset(nrows - 1, 0, row_stride, col_stride),
            elem_offset(0, ncols - 1, row_stride, col_stride),
            elem_offset(nrows - 1, ncols - 1, row_stride, col_stride),
        ];
        let min = corners.iter().copied().min().unwrap_or(0);
        let max = corners.iter().copied().max().unwrap_or(0);
        let start = base.wrapping_add((min * size as isize) as usize);
        let end = base.wrapping_add(((max + 1) * size as isize) as usize);
        vec![MemRange::new(start, end)]
    }
}

impl<'a, E> TileRef<'a, E> {
    /// # Safety
    ///
    /// For every `i < nrows` and `j < ncols`, `ptr + i * row_stride + j * col_stride` must be
    /// valid for reads for the lifetime `'a`, and must not be written through any other view
    /// during that lifetime.
    #[inline]
    pub unsafe fn from_raw_parts(
        ptr: *const E,
        nrows: usize,
        ncols: usize,
        row_stride: isize,
        col_stride: isize,
    ) -> Self {
        Self {
            ptr,
            nrows,
            ncols,
            row_stride,
            col_stride,
            __marker: PhantomData,
        }
    }

    /// Column-major view over `slice` with leading dimension `ld`.
    #[track_caller]
    pub fn from_col_major(slice: &'a [E], nrows: usize, ncols: usize, ld: usize) -> Self {
        check_col_major(slice.len(), nrows, ncols, ld);
        unsafe { Self::from_raw_parts(slice.as_ptr(), nrows, ncols, 1, ld as isize) }
    }

    #[inline]
    pub fn nrows(&self) -> usize {
        self.nrows
    }
    #[inline]
    pub fn ncols(&self) -> usize {
        self.ncols
    }
    #[inline]
    pub fn row_stride(&self) -> isize {
        self.row_stride
    }
    #[inline]
    pub fn col_stride(&self) -> isize {
        self.col_stride
    }
    #[inline]
    pub fn as_ptr(&self) -> *const E {
        self.ptr
    }

    #[inline]
    pub(crate) fn ptr_at(&self, i: usize, j: usize) -> *const E {
        self.ptr
            .wrapping_offset(elem_offset(i, j, self.row_stride, self.col_stride))
    }

    #[inline]
    #[track_caller]
    pub fn read(&self, i: usize, j: usize) -> E
    where
        E: Copy,
    {
        assert!(all(i < self.nrows, j < self.ncols));
        unsafe { *self.ptr_at(i, j) }
    }

    #[inline]
    #[track_caller]
    pub fn submatrix(self, i: usize, j: usize, nrows: usize, ncols: usize) -> Self {
        assert!(all(i <= self.nrows, j <= self.ncols));
        assert!(all(nrows <= self.nrows - i, ncols <= self.ncols - j));
        unsafe {
            Self::from_raw_parts(
                self.ptr_at(i, j),
                nrows,
                ncols,
                self.row_stride,
                self.col_stride,
            )
        }
    }

    #[inline]
    pub fn transpose(self) -> Self {
        unsafe {
            Self::from_raw_parts(
                self.ptr,
                self.ncols,
                self.nrows,
                self.col_stride,
                self.row_stride,
            )
        }
    }

    /// Whether the view is column-major, so that whole columns are contiguous.
    #[inline]
    pub fn is_col_major(&self) -> bool {
        self.row_stride == 1 || self.nrows <= 1
    }

    /// Byte ranges read through this view.
    pub fn footprint(&self) -> Vec<MemRange> {
        strided_footprint(
            self.ptr,
            self.nrows,
            self.ncols,
            self.row_stride,
            self.col_stride,
        )
    }

    /// Copies the view into a column-major vector.
    pub fn to_col_major_vec(&self) -> Vec<E>
    where
        E: Copy,
    {
        let mut out = Vec::with_capacity(self.nrows * self.ncols);
        for j in 0..self.ncols {
            for i in 0..self.nrows {
                out.push(self.read(i, j));
            }
        }
        out
    }
}

impl<'a, E> TileMut<'a, E> {
    /// # Safety
    ///
    /// For every `i < nrows` and `j < ncols`, `ptr + i * row_stride + j * col_stride` must be
    /// valid for reads and writes for the lifetime `'a`, must not be accessed through any other
    /// view during that lifetime, and distinct indices must map to distinct elements.
    #[inline]
    pub unsafe fn from_raw_parts(
        ptr: *mut E,
        nrows: usize,
        ncols: usize,
        row_stride: isize,
        col_stride: isize,
    ) -> Self {
        Self {
            ptr,
            nrows,
            ncols,
            row_stride,
            col_stride,
            __marker: PhantomData,
        }
    }

    /// Column-major view over `slice` with leading dimension `ld`.
    #[track_caller]
    pub fn from_col_major(slice: &'a mut [E], nrows: usize, ncols: usize, ld: usize) -> Self {
        check_col_major(slice.len(), nrows, ncols, ld);
        unsafe { Self::from_raw_parts(slice.as_mut_ptr(), nrows, ncols, 1, ld as isize) }
    }

    #[inline]
    pub fn nrows(&self) -> usize {
        self.nrows
    }
    #[inline]
    pub fn ncols(&self) -> usize {
        self.ncols
    }
    #[inline]
    pub fn row_stride(&self) -> isize {
        self.row_stride
    }
    #[inline]
    pub fn col_stride(&self) -> isize {
        self.col_stride
    }
    #[inline]
    pub fn as_ptr_mut(&mut self) -> *mut E {
        self.ptr
    }

    #[inline]
    pub fn into_const(self) -> TileRef<'a, E> {
        unsafe {
            TileRef::from_raw_parts(
                self.ptr,
                self.nrows,
                self.ncols,
                self.row_stride,
                self.col_stride,
            )
        }
    }

    #[inline]
    #[track_caller]
    pub fn read(&self, i: usize, j: usize) -> E
    where
        E: Copy,
    {
        self.rb().read(i, j)
    }

    #[inline]
    #[track_caller]
    pub fn write(&mut self, i: usize, j: usize, value: E) {
        assert!(all(i < self.nrows, j < self.ncols));
        unsafe {
            *self
                .ptr
                .wrapping_offset(elem_offset(i, j, self.row_stride, self.col_stride)) = value
        };
    }

    #[inline]
    #[track_caller]
    pub fn submatrix_mut(self, i: usize, j: usize, nrows: usize, ncols: usize) -> Self {
        let (rs, cs) = (self.row_stride, self.col_stride);
        let sub = self.into_const().submatrix(i, j, nrows, ncols);
        unsafe { Self::from_raw_parts(sub.ptr as *mut E, nrows, ncols, rs, cs) }
    }

    /// Splits the rows into `0..k` and `k..nrows`.
    #[inline]
    #[track_caller]
    pub fn split_at_row_mut(self, k: usize) -> (Self, Self) {
        assert!(k <= self.nrows);
        let (m, n) = (self.nrows, self.ncols);
        let ptr = self.ptr;
        let (rs, cs) = (self.row_stride, self.col_stride);
        unsafe {
            (
                Self::from_raw_parts(ptr, k, n, rs, cs),
                Self::from_raw_parts(ptr.wrapping_offset(elem_offset(k, 0, rs, cs)), m - k, n, rs, cs),
            )
        }
    }

    /// Splits the columns into `0..k` and `k..ncols`.
    #[inline]
    #[track_caller]
    pub fn split_at_col_mut(self, k: usize) -> (Self, Self) {
        assert!(k <= self.ncols);
        let (m, n) = (self.nrows, self.ncols);
        let ptr = self.ptr;
        let (rs, cs) = (self.row_stride, self.col_stride);
        unsafe {
            (
                Self::from_raw_parts(ptr, m, k, rs, cs),
                Self::from_raw_parts(ptr.wrapping_offset(elem_offset(0, k, rs, cs)), m, n - k, rs, cs),
            )
        }
    }

    #[inline]
    pub fn transpose_mut(self) -> Self {
        unsafe {
            Self::from_raw_parts(
                self.ptr,
                self.ncols,
                self.nrows,
                self.col_stride,
                self.row_stride,
            )
        }
    }

    pub fn fill(&mut self, value: E)
    where
        E: Copy,
    {
        for j in 0..self.ncols {
            for i in 0..self.nrows {
                self.write(i, j, value);
            }
        }
    }

    #[track_caller]
    pub fn copy_from(&mut self, src: TileRef<'_, E>)
    where
        E: Copy,
    {
        assert!(all(src.nrows() == self.nrows, src.ncols() == self.ncols));
        for j in 0..self.ncols {
            for i in 0..self.nrows {
                self.write(i, j, src.read(i, j));
            }
        }
    }

    /// Byte ranges written through this view.
    pub fn footprint(&self) -> Vec<MemRange> {
        self.rb().footprint()
    }
}

impl<'short, E> Reborrow<'short> for TileRef<'_, E> {
    type Target = TileRef<'short, E>;

    #[inline]
    fn rb(&'short self) -> Self::Target {
        *self
    }
}

impl<'short, E> ReborrowMut<'short> for TileRef<'_, E> {
    type Target = TileRef<'short, E>;

    #[inline]
    fn rb_mut(&'short mut self) -> Self::Target {
        *self
    }
}

impl<'short, E> Reborrow<'short> for TileMut<'_, E> {
    type Target = TileRef<'short, E>;

    #[inline]
    fn rb(&'short self) -> Self::Target {
        unsafe {
            TileRef::from_raw_parts(
                self.ptr,
                self.nrows,
                self.ncols,
                self.row_stride,
                self.col_stride,
            )
        }
    }
}

impl<'short, E> ReborrowMut<'short> for TileMut<'_, E> {
    type Target = TileMut<'short, E>;

    #[inline]
    fn rb_mut(&'short mut self) -> Self::Target {
        unsafe {
            TileMut::from_raw_parts(
                self.ptr,
                self.nrows,
                self.ncols,
                self.row_stride,
                self.col_stride,
            )
        }
    }
}

impl<'a, E> IntoConst for TileMut<'a, E> {
    type Target = TileRef<'a, E>;

    #[inline]
    fn into_const(self) -> Self::Target {
        TileMut::into_const(self)
    }
}

/// Logs a performance warning, once, when a kernel receives a tile that is not column-major.
#[inline]
pub(crate) fn warn_if_strided<E>(kernel: &str, tile: TileRef<'_, E>) {
    #[cfg(feature = "perf-warn")]
    if !tile.is_col_major() && crate::__perf_warn!(STRIDED_TILE_WARNED) {
        log::warn!(
            target: "tilework_perf",
            "{kernel} received a tile with row stride {}, expected 1",
            tile.row_stride(),
        );
    }
    #[cfg(not(feature = "perf-warn"))]
    let _ = (kernel, tile);
}
