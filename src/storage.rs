//! Buffers bound to their layouts.
//!
//! Caller-owned buffers are borrowed for the lifetime of a handle: [`TileMatrix`] for tiled
//! storage described by a [`Descriptor`], [`NaturalMatrix`] for column-major storage and
//! [`NaturalBand`] for LAPACK-style band storage.
//!
//! Scheduled operations borrow a handle by shared reference for the lifetime of the region, and
//! their tasks access disjoint or ordered parts of it through the footprints they declare. Element
//! accessors take `&mut self`, so they cannot run while such a borrow is alive.

use crate::{
    assert,
    desc::{Descriptor, TileLayout},
    sched::MemRange,
    tile::{TileMut, TileRef},
    Result, TileError, TileScalar, Uplo,
};
use core::marker::PhantomData;
use core::mem::size_of;

/// Tiled buffer.
pub struct TileMatrix<'a, E> {
    desc: Descriptor,
    ptr: *mut E,
    len: usize,
    __marker: PhantomData<&'a mut [E]>,
}

unsafe impl<E: Send> Send for TileMatrix<'_, E> {}
unsafe impl<E: Sync> Sync for TileMatrix<'_, E> {}

impl<E> core::fmt::Debug for TileMatrix<'_, E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TileMatrix")
            .field("desc", &self.desc)
            .field("len", &self.len)
            .finish()
    }
}

impl<'a, E: TileScalar> TileMatrix<'a, E> {
    /// Binds `data` to `desc`. The buffer must hold at least `desc.storage_len()` elements of
    /// the descriptor's precision.
    pub fn new(desc: Descriptor, data: &'a mut [E]) -> Result<Self> {
        desc.check()?;
        if desc.precision() != E::PRECISION {
            return Err(TileError::config(format!(
                "descriptor precision {:?} does not match the buffer element type {:?}",
                desc.precision(),
                E::PRECISION
            )));
        }
        if data.len() < desc.storage_len() {
            return Err(TileError::config(format!(
                "tiled buffer holds {} elements, descriptor needs {}",
                data.len(),
                desc.storage_len()
            )));
        }
        Ok(Self {
            desc,
            ptr: data.as_mut_ptr(),
            len: data.len(),
            __marker: PhantomData,
        })
    }

    #[inline]
    pub fn desc(&self) -> &Descriptor {
        &self.desc
    }

    /// Restriction to the `m×n` view at `(i, j)`, relative to the current view.
    pub fn view(&mut self, i: usize, j: usize, m: usize, n: usize) -> Result<TileMatrix<'_, E>> {
        Ok(TileMatrix {
            desc: self.desc.view(i, j, m, n)?,
            ptr: self.ptr,
            len: self.len,
            __marker: PhantomData,
        })
    }

    /// Part of tile `(m, n)` covered by the view.
    pub fn tile(&mut self, m: usize, n: usize) -> TileRef<'_, E> {
        unsafe { self.view_tile_raw(m, n).into_const() }
    }

    /// Part of tile `(m, n)` covered by the view.
    pub fn tile_mut(&mut self, m: usize, n: usize) -> TileMut<'_, E> {
        unsafe { self.view_tile_raw(m, n) }
    }

    unsafe fn layout_raw(&self, layout: TileLayout) -> TileMut<'a, E> {
        if layout.nrows > 0 && layout.ncols > 0 {
            assert!(layout.offset + (layout.ncols - 1) * layout.ld + layout.nrows <= self.len);
        }
        TileMut::from_raw_parts(
            self.ptr.wrapping_add(layout.offset),
            layout.nrows,
            layout.ncols,
            1,
            layout.ld as isize,
        )
    }

    /// Full physical tile `(m, n)`.
    ///
    /// # Safety
    ///
    /// The returned view aliases every other view of the same tile. Accesses must be ordered,
    /// for instance by the footprints declared to a scheduler.
    pub(crate) unsafe fn tile_raw(&self, m: usize, n: usize) -> TileMut<'a, E> {
        self.layout_raw(self.desc.tile_layout(m, n))
    }

    /// Part of tile `(m, n)` covered by the view.
    ///
    /// # Safety
    ///
    /// See [`TileMatrix::tile_raw`].
    pub(crate) unsafe fn view_tile_raw(&self, m: usize, n: usize) -> TileMut<'a, E> {
        self.layout_raw(self.desc.tile_view_layout(m, n))
    }
}

/// Column-major matrix with leading dimension `ld`.
pub struct NaturalMatrix<'a, E> {
    ptr: *mut E,
    nrows: usize,
    ncols: usize,
    ld: usize,
    __marker: PhantomData<&'a mut [E]>,
}

unsafe impl<E: Send> Send for NaturalMatrix<'_, E> {}
unsafe impl<E: Sync> Sync for NaturalMatrix<'_, E> {}

impl<'a, E: TileScalar> NaturalMatrix<'a, E> {
    pub fn new(data: &'a mut [E], nrows: usize, ncols: usize, ld: usize) -> Result<Self> {
        if ld < Ord::max(1, nrows) {
            return Err(TileError::config(format!(
                "leading dimension {ld} is smaller than the row count {nrows}"
            )));
        }
        if nrows > 0 && ncols > 0 && data.len() < (ncols - 1) * ld + nrows {
            return Err(TileError::config(format!(
                "natural buffer of {} elements cannot hold a {nrows}×{ncols} matrix with leading dimension {ld}",
                data.len()
            )));
        }
        Ok(Self {
            ptr: data.as_mut_ptr(),
            nrows,
            ncols,
            ld,
            __marker: PhantomData,
        })
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
    pub fn ld(&self) -> usize {
        self.ld
    }

    pub fn as_tile(&mut self) -> TileRef<'_, E> {
        unsafe { self.block_raw(0, 0, self.nrows, self.ncols).into_const() }
    }

    pub fn as_tile_mut(&mut self) -> TileMut<'_, E> {
        unsafe { self.block_raw(0, 0, self.nrows, self.ncols) }
    }

    /// The `m×n` block at `(i, j)`.
    ///
    /// # Safety
    ///
    /// The returned view aliases the rest of the matrix. Accesses must be ordered.
    pub(crate) unsafe fn block_raw(&self, i: usize, j: usize, m: usize, n: usize) -> TileMut<'a, E> {
        assert!(all(i + m <= self.nrows, j + n <= self.ncols));
        TileMut::from_raw_parts(
            self.ptr.wrapping_add(i + j * self.ld),
            m,
            n,
            1,
            self.ld as isize,
        )
    }
}

/// Band matrix in LAPACK band layout.
///
/// Element `(r, c)` with `c - upper <= r <= c + lower` is stored at `ab[upper + r - c + ldab * c]`,
/// where `upper` is `ku` for upper band storage, `0` for lower band storage and `kl + ku` for
/// general band storage, whose first `kl` rows leave room for fill-in.
pub struct NaturalBand<'a, E> {
    ptr: *mut E,
    uplo: Uplo,
    nrows: usize,
    ncols: usize,
    kl: usize,
    ku: usize,
    ldab: usize,
    __marker: PhantomData<&'a mut [E]>,
}

unsafe impl<E: Send> Send for NaturalBand<'_, E> {}
unsafe impl<E: Sync> Sync for NaturalBand<'_, E> {}

impl<'a, E: TileScalar> NaturalBand<'a, E> {
    pub fn new(
        data: &'a mut [E],
        uplo: Uplo,
        nrows: usize,
        ncols: usize,
        kl: usize,
        ku: usize,
        ldab: usize,
    ) -> Result<Self> {
        let (kl, ku) = match uplo {
            Uplo::Upper if kl != 0 => {
                return Err(TileError::config("upper band storage has no subdiagonals"))
            }
            Uplo::Lower if ku != 0 => {
                return Err(TileError::config("lower band storage has no superdiagonals"))
            }
            _ => (kl, ku),
        };
        let band = Self {
            ptr: data.as_mut_ptr(),
            uplo,
            nrows,
            ncols,
            kl,
            ku,
            ldab,
            __marker: PhantomData,
        };
        let rows = band.upper() + band.lower() + 1;
        if ldab < rows {
            return Err(TileError::config(format!(
                "band leading dimension {ldab} is smaller than the {rows} stored diagonals"
            )));
        }
        if ncols > 0 && data.len() < ldab * ncols {
            return Err(TileError::config(format!(
                "band buffer of {} elements cannot hold {ncols} columns of {ldab}",
                data.len()
            )));
        }
        Ok(band)
    }

    #[inline]
    pub fn uplo(&self) -> Uplo {
        self.uplo
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
    pub fn kl(&self) -> usize {
        self.kl
    }
    #[inline]
    pub fn ku(&self) -> usize {
        self.ku
    }
    #[inline]
    pub fn ldab(&self) -> usize {
        self.ldab
    }

    /// Stored superdiagonals, fill-in included.
    #[inline]
    fn upper(&self) -> usize {
        match self.uplo {
            Uplo::General => self.kl + self.ku,
            Uplo::Upper => self.ku,
            Uplo::Lower => 0,
        }
    }

    #[inline]
    fn lower(&self) -> usize {
        self.kl
    }

    #[inline]
    pub fn in_band(&self, r: usize, c: usize) -> bool {
        r < self.nrows && c < self.ncols && r + self.upper() >= c && r <= c + self.lower()
    }

    /// Element `(r, c)`, zero outside the stored band.
    pub fn read(&mut self, r: usize, c: usize) -> E {
        assert!(all(r < self.nrows, c < self.ncols));
        if self.in_band(r, c) {
            unsafe { *self.ptr.add(self.index(r, c)) }
        } else {
            E::zero()
        }
    }

    /// Writes element `(r, c)`, which must lie in the stored band.
    pub fn write(&mut self, r: usize, c: usize, value: E) {
        assert!(self.in_band(r, c));
        unsafe { *self.ptr.add(self.index(r, c)) = value };
    }

    #[inline]
    fn index(&self, r: usize, c: usize) -> usize {
        self.upper() + r - c + self.ldab * c
    }

    /// The `m×n` block of the logical matrix at `(i, j)`.
    ///
    /// # Safety
    ///
    /// The returned block aliases the rest of the band. Accesses must be ordered.
    pub(crate) unsafe fn block_raw(&self, i: usize, j: usize, m: usize, n: usize) -> BandBlock<'a, E> {
        assert!(all(i + m <= self.nrows, j + n <= self.ncols));
        BandBlock {
            base: self.ptr,
            row0: i,
            col0: j,
            nrows: m,
            ncols: n,
            total_rows: self.nrows,
            upper: self.upper(),
            lower: self.lower(),
            ldab: self.ldab,
            __marker: PhantomData,
        }
    }
}

/// Rectangular block of a [`NaturalBand`]. Only the entries inside the band are accessible.
pub struct BandBlock<'a, E> {
    base: *mut E,
    row0: usize,
    col0: usize,
    nrows: usize,
    ncols: usize,
    total_rows: usize,
    upper: usize,
    lower: usize,
    ldab: usize,
    __marker: PhantomData<&'a mut E>,
}

unsafe impl<E: Send> Send for BandBlock<'_, E> {}
unsafe impl<E: Sync> Sync for BandBlock<'_, E> {}

impl<E: Copy> BandBlock<'_, E> {
    #[inline]
    pub fn nrows(&self) -> usize {
        self.nrows
    }
    #[inline]
    pub fn ncols(&self) -> usize {
        self.ncols
    }

    #[inline]
    pub fn in_band(&self, r: usize, c: usize) -> bool {
        let (gr, gc) = (self.row0 + r, self.col0 + c);
        gr + self.upper >= gc && gr <= gc + self.lower
    }

    #[inline]
    fn index(&self, r: usize, c: usize) -> usize {
        let (gr, gc) = (self.row0 + r, self.col0 + c);
        self.upper + gr - gc + self.ldab * gc
    }

    #[inline]
    #[track_caller]
    pub fn read(&self, r: usize, c: usize) -> E {
        assert!(all(r < self.nrows, c < self.ncols, self.in_band(r, c)));
        unsafe { *self.base.add(self.index(r, c)) }
    }

    #[inline]
    #[track_caller]
    pub fn write(&mut self, r: usize, c: usize, value: E) {
        assert!(all(r < self.nrows, c < self.ncols, self.in_band(r, c)));
        unsafe { *self.base.add(self.index(r, c)) = value };
    }

    /// Rows of local column `c` lying inside the band.
    pub fn band_rows(&self, c: usize) -> core::ops::Range<usize> {
        let gc = self.col0 + c;
        let lo = Ord::max(gc.saturating_sub(self.upper), self.row0);
        let hi = Ord::min(
            Ord::min(gc + self.lower + 1, self.total_rows),
            self.row0 + self.nrows,
        );
        if lo >= hi {
            0..0
        } else {
            lo - self.row0..hi - self.row0
        }
    }

    /// Byte ranges of the in-band entries.
    pub fn footprint(&self) -> Vec<MemRange> {
        let size = size_of::<E>();
        (0..self.ncols)
            .filter_map(|c| {
                let rows = self.band_rows(c);
                if rows.is_empty() {
                    return None;
                }
                let start = self.base as usize + self.index(rows.start, c) * size;
                Some(MemRange::new(start, start + rows.len() * size))
            })
            .collect()
    }
}
