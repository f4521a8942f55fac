//! Tile descriptors.
//!
//! A [`Descriptor`] maps a matrix, or a rectangular view of it, onto a grid of `mb×nb` tiles
//! stored contiguously one after another. It holds no pointer: every tile address is computed
//! from its fields, so a descriptor never goes stale and can be copied freely.
//!
//! Dense storage splits the full `lm×ln` matrix into four regions, stored in this order:
//!
//! ```text
//! ┌───────────────────┬────┐
//! │ aligned tiles     │ A12│  A12: right column of partial-width tiles
//! │ (mb×nb each)      │    │
//! ├───────────────────┼────┤
//! │ A21               │ A22│  A21: bottom row of partial-height tiles
//! └───────────────────┴────┘  A22: corner tile
//! ```
//!
//! Banded storage keeps only the tiles intersecting the band, folded into a window of
//! `kut + klt + 1` tile rows per tile column: tile `(m, n)` lives at the dense position
//! `(kut + m - n, n)`.

use crate::{assert, scalar::Precision, Result, TileError, Uplo};
use core::ops::Range;

/// Storage scheme of a descriptor.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum StorageKind {
    /// Every tile of the matrix is stored.
    General,
    /// Only tiles intersecting the band are stored.
    Band(Uplo),
}

/// Location and shape of one tile inside a tiled buffer, in elements.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TileLayout {
    pub offset: usize,
    pub nrows: usize,
    pub ncols: usize,
    /// Leading dimension, always the physical tile height.
    pub ld: usize,
}

/// Geometry of a matrix stored as a grid of tiles.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Descriptor {
    precision: Precision,
    kind: StorageKind,

    a21: usize,
    a12: usize,
    a22: usize,

    mb: usize,
    nb: usize,
    lm: usize,
    ln: usize,
    lmt: usize,
    lnt: usize,

    i: usize,
    j: usize,
    m: usize,
    n: usize,
    mt: usize,
    nt: usize,

    kl: usize,
    ku: usize,
    klt: usize,
    kut: usize,
}

#[inline]
fn div_ceil(a: usize, b: usize) -> usize {
    (a + b - 1) / b
}

#[inline]
fn grid_extent(origin: usize, len: usize, block: usize) -> usize {
    if len == 0 {
        0
    } else {
        (origin + len - 1) / block - origin / block + 1
    }
}

fn fits(origin: usize, len: usize, full: usize) -> bool {
    origin.checked_add(len).map_or(false, |end| end <= full)
}

impl Descriptor {
    /// Creates a dense descriptor for the `m×n` view at `(i, j)` of an `lm×ln` matrix stored in
    /// `mb×nb` tiles.
    pub fn general(
        precision: Precision,
        mb: usize,
        nb: usize,
        lm: usize,
        ln: usize,
        i: usize,
        j: usize,
        m: usize,
        n: usize,
    ) -> Result<Self> {
        let desc = Self::from_parts(
            precision,
            StorageKind::General,
            mb,
            nb,
            lm,
            ln,
            i,
            j,
            m,
            n,
            0,
            0,
        )?;
        desc.check()?;
        Ok(desc)
    }

    /// Creates a banded descriptor for an `m×n` band matrix with `kl` subdiagonals and `ku`
    /// superdiagonals, stored in `nb×nb` tiles.
    ///
    /// `lm` is the height of the folded storage and must be at least
    /// [`Descriptor::band_storage_rows`]. The view origin must lie on the diagonal and be tile
    /// aligned.
    pub fn general_band(
        precision: Precision,
        uplo: Uplo,
        mb: usize,
        nb: usize,
        lm: usize,
        ln: usize,
        i: usize,
        j: usize,
        m: usize,
        n: usize,
        kl: usize,
        ku: usize,
    ) -> Result<Self> {
        let desc = Self::from_parts(
            precision,
            StorageKind::Band(uplo),
            mb,
            nb,
            lm,
            ln,
            i,
            j,
            m,
            n,
            kl,
            ku,
        )?;
        desc.check()?;
        Ok(desc)
    }

    /// Creates the descriptor holding the `ib×nb` block reflector factors of an `mt×nt` tile
    /// grid.
    pub fn householder_factor(
        precision: Precision,
        ib: usize,
        nb: usize,
        mt: usize,
        nt: usize,
    ) -> Result<Self> {
        let lm = ib
            .checked_mul(mt)
            .ok_or_else(|| TileError::config("factor descriptor too large"))?;
        let ln = nb
            .checked_mul(nt)
            .ok_or_else(|| TileError::config("factor descriptor too large"))?;
        Self::general(precision, ib, nb, lm, ln, 0, 0, lm, ln)
    }

    /// Height of the folded storage needed by a band matrix.
    pub fn band_storage_rows(uplo: Uplo, nb: usize, kl: usize, ku: usize) -> usize {
        let (klt, kut) = band_tile_extents(uplo, nb, kl, ku);
        (klt + kut + 1) * nb
    }

    fn from_parts(
        precision: Precision,
        kind: StorageKind,
        mb: usize,
        nb: usize,
        lm: usize,
        ln: usize,
        i: usize,
        j: usize,
        m: usize,
        n: usize,
        kl: usize,
        ku: usize,
    ) -> Result<Self> {
        if mb == 0 || nb == 0 {
            return Err(TileError::config(format!(
                "tile size must be positive, got {mb}×{nb}"
            )));
        }
        if lm.checked_mul(ln).is_none() {
            return Err(TileError::config("matrix extents overflow"));
        }

        let (klt, kut) = match kind {
            StorageKind::General => (0, 0),
            StorageKind::Band(uplo) => band_tile_extents(uplo, nb, kl, ku),
        };

        let a21 = (lm - lm % mb) * (ln - ln % nb);
        let a12 = (lm % mb) * (ln - ln % nb) + a21;
        let a22 = (lm - lm % mb) * (ln % nb) + a12;

        Ok(Self {
            precision,
            kind,
            a21,
            a12,
            a22,
            mb,
            nb,
            lm,
            ln,
            lmt: div_ceil(lm, mb),
            lnt: div_ceil(ln, nb),
            i,
            j,
            m,
            n,
            mt: grid_extent(i, m, mb),
            nt: grid_extent(j, n, nb),
            kl,
            ku,
            klt,
            kut,
        })
    }

    /// Checks the internal consistency of the descriptor.
    pub fn check(&self) -> Result<()> {
        if self.mb == 0 || self.nb == 0 {
            return Err(TileError::config("tile size must be positive"));
        }
        if !fits(self.j, self.n, self.ln) {
            return Err(TileError::config(format!(
                "columns {}..{} exceed the matrix width {}",
                self.j,
                self.j.saturating_add(self.n),
                self.ln
            )));
        }

        match self.kind {
            StorageKind::General => {
                if !fits(self.i, self.m, self.lm) {
                    return Err(TileError::config(format!(
                        "rows {}..{} exceed the matrix height {}",
                        self.i,
                        self.i.saturating_add(self.m),
                        self.lm
                    )));
                }
            }
            StorageKind::Band(uplo) => {
                if self.mb != self.nb {
                    return Err(TileError::config("band storage needs square tiles"));
                }
                if self.i != self.j || self.i % self.nb != 0 {
                    return Err(TileError::config(
                        "band view origin must be a tile-aligned diagonal position",
                    ));
                }
                match uplo {
                    Uplo::Upper if self.kl != 0 => {
                        return Err(TileError::config("upper band storage has no subdiagonals"))
                    }
                    Uplo::Lower if self.ku != 0 => {
                        return Err(TileError::config(
                            "lower band storage has no superdiagonals",
                        ))
                    }
                    _ => {}
                }
                let rows = Self::band_storage_rows(uplo, self.nb, self.kl, self.ku);
                if self.lm < rows || self.lm % self.mb != 0 {
                    return Err(TileError::config(format!(
                        "band storage height {} must be a multiple of {} and at least {}",
                        self.lm, self.mb, rows
                    )));
                }
            }
        }
        Ok(())
    }

    /// Restricts the descriptor to the `m×n` view whose origin is `(i, j)` relative to the
    /// current view. The buffer is shared with the parent.
    pub fn view(&self, i: usize, j: usize, m: usize, n: usize) -> Result<Self> {
        if !fits(i, m, self.m) || !fits(j, n, self.n) {
            return Err(TileError::config(format!(
                "view {m}×{n} at ({i}, {j}) leaves the {}×{} parent view",
                self.m, self.n
            )));
        }
        let desc = Self {
            i: self.i + i,
            j: self.j + j,
            m,
            n,
            mt: grid_extent(self.i + i, m, self.mb),
            nt: grid_extent(self.j + j, n, self.nb),
            ..*self
        };
        desc.check()?;
        Ok(desc)
    }

    /// Offset in elements of the physical tile `(m, n)` of the view.
    ///
    /// # Panics
    ///
    /// Panics if the tile is outside the tile grid, or outside the stored window of a band
    /// matrix.
    pub fn tile_offset(&self, m: usize, n: usize) -> usize {
        match self.kind {
            StorageKind::General => {
                let mm = m + self.i / self.mb;
                let nn = n + self.j / self.nb;
                assert!(all(mm < self.lmt, nn < self.lnt));
                self.dense_offset(mm, nn)
            }
            StorageKind::Band(_) => {
                let folded = self.band_folded_row(m, n);
                let nn = n + self.j / self.nb;
                assert!(nn < self.lnt);
                self.dense_offset(folded, nn)
            }
        }
    }

    #[inline]
    pub fn tile_byte_offset(&self, m: usize, n: usize) -> usize {
        self.tile_offset(m, n) * self.precision.element_size()
    }

    fn band_folded_row(&self, m: usize, n: usize) -> usize {
        let folded = (self.kut + m).checked_sub(n);
        assert!(all(
            folded.is_some(),
            folded.unwrap_or(usize::MAX) <= self.kut + self.klt,
        ));
        self.kut + m - n
    }

    fn dense_offset(&self, mm: usize, nn: usize) -> usize {
        let lm1 = self.lm / self.mb;
        let ln1 = self.ln / self.nb;

        match (mm < lm1, nn < ln1) {
            (true, true) => self.mb * self.nb * (mm + lm1 * nn),
            (true, false) => self.a12 + self.mb * (self.ln % self.nb) * mm,
            (false, true) => self.a21 + self.nb * (self.lm % self.mb) * nn,
            (false, false) => self.a22,
        }
    }

    #[inline]
    fn row_main(&self, mm: usize) -> usize {
        if mm < self.lm / self.mb {
            self.mb
        } else {
            self.lm % self.mb
        }
    }

    #[inline]
    fn col_main(&self, nn: usize) -> usize {
        if nn < self.ln / self.nb {
            self.nb
        } else {
            self.ln % self.nb
        }
    }

    /// Physical height of the tiles in tile row `k` of the view.
    #[inline]
    pub fn tile_mmain(&self, k: usize) -> usize {
        match self.kind {
            StorageKind::General => self.row_main(self.i / self.mb + k),
            StorageKind::Band(_) => self.mb,
        }
    }

    /// Physical width of the tiles in tile column `k` of the view.
    #[inline]
    pub fn tile_nmain(&self, k: usize) -> usize {
        self.col_main(self.j / self.nb + k)
    }

    fn row_span(&self, k: usize) -> Range<usize> {
        assert!(k < self.mt);
        let tile = self.i / self.mb + k;
        let start = Ord::max(self.i, tile * self.mb);
        let end = Ord::min(self.i + self.m, (tile + 1) * self.mb);
        start..end
    }

    fn col_span(&self, k: usize) -> Range<usize> {
        assert!(k < self.nt);
        let tile = self.j / self.nb + k;
        let start = Ord::max(self.j, tile * self.nb);
        let end = Ord::min(self.j + self.n, (tile + 1) * self.nb);
        start..end
    }

    /// Number of rows of the view lying in tile row `k`.
    #[inline]
    pub fn tile_mview(&self, k: usize) -> usize {
        self.row_span(k).len()
    }

    /// Number of columns of the view lying in tile column `k`.
    #[inline]
    pub fn tile_nview(&self, k: usize) -> usize {
        self.col_span(k).len()
    }

    /// Row inside the physical tile where the view starts, for tile row `k`.
    #[inline]
    pub fn tile_row_offset(&self, k: usize) -> usize {
        self.row_span(k).start % self.mb
    }

    /// Column inside the physical tile where the view starts, for tile column `k`.
    #[inline]
    pub fn tile_col_offset(&self, k: usize) -> usize {
        self.col_span(k).start % self.nb
    }

    /// First view row covered by tile row `k`.
    #[inline]
    pub fn view_row_start(&self, k: usize) -> usize {
        self.row_span(k).start - self.i
    }

    /// First view column covered by tile column `k`.
    #[inline]
    pub fn view_col_start(&self, k: usize) -> usize {
        self.col_span(k).start - self.j
    }

    /// Leading dimension of the band tile `(m, n)`.
    #[inline]
    pub fn band_tile_ld(&self, m: usize, n: usize) -> usize {
        self.row_main(self.band_folded_row(m, n))
    }

    /// Tile rows of tile column `n` that intersect the band.
    ///
    /// Every tile of a dense descriptor intersects the band.
    pub fn band_tile_rows(&self, n: usize) -> Range<usize> {
        if self.m == 0 {
            return 0..0;
        }
        let nb = self.nb;
        let last = self.m - 1;
        let (start, end) = match self.kind {
            StorageKind::General => return 0..self.mt,
            StorageKind::Band(Uplo::General) => (
                (n * nb).saturating_sub(self.ku + self.kl) / nb,
                Ord::min(last, (n + 1) * nb + self.kl - 1) / nb,
            ),
            StorageKind::Band(Uplo::Upper) => (
                (n * nb).saturating_sub(self.ku) / nb,
                Ord::min(last, (n + 1) * nb - 1) / nb,
            ),
            StorageKind::Band(Uplo::Lower) => (n, Ord::min(last, (n + 1) * nb + self.kl - 1) / nb),
        };
        start..Ord::max(start, end + 1)
    }

    /// Physical tile `(m, n)`.
    pub fn tile_layout(&self, m: usize, n: usize) -> TileLayout {
        let offset = self.tile_offset(m, n);
        let (nrows, ld) = match self.kind {
            StorageKind::General => (self.tile_mmain(m), self.tile_mmain(m)),
            StorageKind::Band(_) => (self.mb, self.band_tile_ld(m, n)),
        };
        TileLayout {
            offset,
            nrows,
            ncols: self.tile_nmain(n),
            ld,
        }
    }

    /// Part of tile `(m, n)` covered by the view. The leading dimension stays physical.
    pub fn tile_view_layout(&self, m: usize, n: usize) -> TileLayout {
        let physical = self.tile_layout(m, n);
        let row = self.tile_row_offset(m);
        let col = self.tile_col_offset(n);
        TileLayout {
            offset: physical.offset + row + col * physical.ld,
            nrows: self.tile_mview(m),
            ncols: self.tile_nview(n),
            ld: physical.ld,
        }
    }

    /// Number of elements of the buffer described by the descriptor.
    #[inline]
    pub fn storage_len(&self) -> usize {
        self.lm * self.ln
    }

    #[inline]
    pub fn precision(&self) -> Precision {
        self.precision
    }
    #[inline]
    pub fn kind(&self) -> StorageKind {
        self.kind
    }
    #[inline]
    pub fn mb(&self) -> usize {
        self.mb
    }
    #[inline]
    pub fn nb(&self) -> usize {
        self.nb
    }
    #[inline]
    pub fn lm(&self) -> usize {
        self.lm
    }
    #[inline]
    pub fn ln(&self) -> usize {
        self.ln
    }
    #[inline]
    pub fn lmt(&self) -> usize {
        self.lmt
    }
    #[inline]
    pub fn lnt(&self) -> usize {
        self.lnt
    }
    #[inline]
    pub fn i(&self) -> usize {
        self.i
    }
    #[inline]
    pub fn j(&self) -> usize {
        self.j
    }
    #[inline]
    pub fn m(&self) -> usize {
        self.m
    }
    #[inline]
    pub fn n(&self) -> usize {
        self.n
    }
    #[inline]
    pub fn mt(&self) -> usize {
        self.mt
    }
    #[inline]
    pub fn nt(&self) -> usize {
        self.nt
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
    pub fn klt(&self) -> usize {
        self.klt
    }
    #[inline]
    pub fn kut(&self) -> usize {
        self.kut
    }
    #[inline]
    pub fn a21(&self) -> usize {
        self.a21
    }
    #[inline]
    pub fn a12(&self) -> usize {
        self.a12
    }
    #[inline]
    pub fn a22(&self) -> usize {
        self.a22
    }
}

/// Tile rows stored below and above the diagonal tile.
fn band_tile_extents(uplo: Uplo, nb: usize, kl: usize, ku: usize) -> (usize, usize) {
    match uplo {
        // room for the fill-in of a pivoted factorization
        Uplo::General => (div_ceil(kl, nb), div_ceil(kl + ku, nb)),
        Uplo::Upper => (0, div_ceil(ku, nb)),
        Uplo::Lower => (div_ceil(kl, nb), 0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assert;

    fn dense(mb: usize, nb: usize, lm: usize, ln: usize) -> Descriptor {
        Descriptor::general(Precision::Double, mb, nb, lm, ln, 0, 0, lm, ln).unwrap()
    }

    fn assert_disjoint(mut spans: Vec<Range<usize>>, len: usize) {
        spans.retain(|span| !span.is_empty());
        spans.sort_by_key(|span| span.start);
        for pair in spans.windows(2) {
            assert!(pair[0].end <= pair[1].start);
        }
        if let Some(last) = spans.last() {
            assert!(last.end <= len);
        }
    }

    #[test]
    fn dense_offsets() {
        let desc = dense(2, 2, 5, 5);
        assert_eq!((desc.a21(), desc.a12(), desc.a22()), (16, 20, 24));
        assert_eq!((desc.lmt(), desc.lnt()), (3, 3));

        let expected = [
            ((0, 0), 0),
            ((1, 0), 4),
            ((0, 1), 8),
            ((1, 1), 12),
            ((2, 0), 16),
            ((2, 1), 18),
            ((0, 2), 20),
            ((1, 2), 22),
            ((2, 2), 24),
        ];
        for ((m, n), offset) in expected {
            assert_eq!(desc.tile_offset(m, n), offset);
        }
        assert_eq!(desc.tile_byte_offset(1, 1), 12 * 8);
    }

    #[test]
    fn dense_tiles_cover_storage_without_overlap() {
        for (mb, nb, lm, ln) in [(2, 2, 8, 8), (3, 2, 10, 7), (4, 5, 4, 5), (5, 3, 1, 11)] {
            let desc = dense(mb, nb, lm, ln);
            let mut spans = Vec::new();
            for n in 0..desc.nt() {
                for m in 0..desc.mt() {
                    let tile = desc.tile_layout(m, n);
                    assert_eq!(tile.ld, tile.nrows);
                    spans.push(tile.offset..tile.offset + tile.nrows * tile.ncols);
                }
            }
            let total: usize = spans.iter().map(|span| span.len()).sum();
            assert_eq!(total, desc.storage_len());
            assert_disjoint(spans, desc.storage_len());
        }
    }

    #[test]
    fn band_tiles_do_not_overlap() {
        let nb = 3;
        let n = 14;
        for (uplo, kl, ku) in [
            (Uplo::General, 2, 4),
            (Uplo::General, 0, 0),
            (Uplo::Upper, 0, 5),
            (Uplo::Lower, 7, 0),
        ] {
            let lm = Descriptor::band_storage_rows(uplo, nb, kl, ku);
            let desc = Descriptor::general_band(
                Precision::ComplexDouble,
                uplo,
                nb,
                nb,
                lm,
                n,
                0,
                0,
                n,
                n,
                kl,
                ku,
            )
            .unwrap();

            let mut spans = Vec::new();
            for tn in 0..desc.nt() {
                for tm in desc.band_tile_rows(tn) {
                    let tile = desc.tile_layout(tm, tn);
                    assert_eq!(tile.ld, nb);
                    spans.push(tile.offset..tile.offset + tile.ld * tile.ncols);
                }
            }
            assert!(!spans.is_empty());
            assert_disjoint(spans, desc.storage_len());
        }
    }

    #[test]
    fn band_rows_follow_bandwidth() {
        let nb = 4;
        let lm = Descriptor::band_storage_rows(Uplo::Lower, nb, 5, 0);
        assert_eq!(lm, 3 * nb);
        let desc = Descriptor::general_band(
            Precision::Double,
            Uplo::Lower,
            nb,
            nb,
            lm,
            16,
            0,
            0,
            16,
            16,
            5,
            0,
        )
        .unwrap();
        assert_eq!(desc.band_tile_rows(0), 0..3);
        assert_eq!(desc.band_tile_rows(2), 2..4);
        assert_eq!(desc.band_tile_rows(3), 3..4);

        let lm = Descriptor::band_storage_rows(Uplo::Upper, nb, 0, 4);
        let desc = Descriptor::general_band(
            Precision::Double,
            Uplo::Upper,
            nb,
            nb,
            lm,
            16,
            0,
            0,
            16,
            16,
            0,
            4,
        )
        .unwrap();
        assert_eq!(desc.band_tile_rows(0), 0..1);
        assert_eq!(desc.band_tile_rows(3), 2..4);
    }

    #[test]
    fn boundary_view_sizes() {
        let desc = Descriptor::general(Precision::Single, 4, 4, 10, 10, 1, 2, 7, 5).unwrap();
        assert_eq!((desc.mt(), desc.nt()), (2, 2));
        assert_eq!((desc.tile_mview(0), desc.tile_mview(1)), (3, 4));
        assert_eq!((desc.tile_nview(0), desc.tile_nview(1)), (2, 3));
        assert_eq!((desc.tile_row_offset(0), desc.tile_row_offset(1)), (1, 0));
        assert_eq!((desc.tile_col_offset(0), desc.tile_col_offset(1)), (2, 0));
        assert_eq!((desc.view_row_start(1), desc.view_col_start(1)), (3, 2));

        let tile = desc.tile_view_layout(0, 0);
        assert_eq!(tile.offset, 1 + 2 * 4);
        assert_eq!((tile.nrows, tile.ncols, tile.ld), (3, 2, 4));

        // last tile row and column of the full matrix are partial
        let desc = dense(4, 4, 10, 9);
        assert_eq!((desc.tile_mmain(2), desc.tile_nmain(2)), (2, 1));
        assert_eq!((desc.tile_mview(2), desc.tile_nview(2)), (2, 1));
        let inner = desc.view(0, 0, 9, 9).unwrap();
        assert_eq!((inner.tile_mmain(2), inner.tile_mview(2)), (2, 1));
    }

    #[test]
    fn views_compose() {
        let desc = dense(3, 3, 12, 12);
        let outer = desc.view(2, 4, 9, 6).unwrap();
        let inner = outer.view(1, 2, 5, 3).unwrap();
        assert_eq!((inner.i(), inner.j(), inner.m(), inner.n()), (3, 6, 5, 3));
        assert_eq!(inner.tile_offset(0, 0), desc.tile_offset(1, 2));
        assert!(outer.view(5, 0, 5, 1).is_err());

        let empty = desc.view(12, 12, 0, 0).unwrap();
        assert_eq!((empty.mt(), empty.nt()), (0, 0));
    }

    #[test]
    fn rejects_invalid_parameters() {
        let p = Precision::Double;
        assert!(Descriptor::general(p, 0, 2, 4, 4, 0, 0, 4, 4).is_err());
        assert!(Descriptor::general(p, 2, 2, 4, 4, 1, 0, 4, 4).is_err());
        assert!(Descriptor::general(p, 2, 2, 4, 4, 0, 3, 0, 2).is_err());
        assert!(Descriptor::general_band(p, Uplo::General, 2, 3, 12, 6, 0, 0, 6, 6, 1, 1).is_err());
        assert!(Descriptor::general_band(p, Uplo::Upper, 2, 2, 4, 6, 0, 0, 6, 6, 1, 1).is_err());
        assert!(Descriptor::general_band(p, Uplo::Lower, 2, 2, 2, 6, 0, 0, 6, 6, 1, 0).is_err());
        assert!(Descriptor::general_band(p, Uplo::Lower, 2, 2, 4, 6, 1, 1, 4, 4, 1, 0).is_err());
        assert!(Descriptor::general_band(p, Uplo::Lower, 2, 2, 4, 6, 2, 2, 4, 4, 1, 0).is_ok());
    }

    #[test]
    fn end_to_end_grid() {
        let desc = dense(2, 2, 8, 8);
        assert_eq!((desc.mt(), desc.nt()), (4, 4));
        assert_eq!(desc.tile_offset(1, 0), 4);
        assert_eq!(desc.tile_offset(0, 1), 16);
    }

    #[test]
    fn householder_factor_shape() {
        let t = Descriptor::householder_factor(Precision::Double, 2, 4, 3, 5).unwrap();
        assert_eq!((t.m(), t.n(), t.mt(), t.nt()), (6, 20, 3, 5));
        assert_eq!(t.tile_layout(2, 4).nrows, 2);
    }

    #[test]
    #[should_panic]
    fn band_tile_outside_window_panics() {
        let lm = Descriptor::band_storage_rows(Uplo::Lower, 2, 1, 0);
        let desc = Descriptor::general_band(
            Precision::Double,
            Uplo::Lower,
            2,
            2,
            lm,
            8,
            0,
            0,
            8,
            8,
            1,
            0,
        )
        .unwrap();
        desc.tile_offset(0, 1);
    }
}
