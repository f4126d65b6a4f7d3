//! Sparse term-document count storage.
//!
//! `SparseCounts` wraps a `sprs` compressed matrix of non-negative counts.
//! Construction goes through `CountsBuilder`, a triplet accumulator that is
//! cheap to assign into, and ends in the column-compressed layout that the
//! cooccurrence computation walks document by document. Every operation that
//! changes the shape returns a fresh matrix; nothing is edited in place.

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use sprs::{CsMat, TriMat};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Layout {
    /// compressed by column (one outer vector per document)
    Csc,
    /// compressed by row (one outer vector per word)
    Csr,
}

/// Accumulates `(row, col, count)` entries before compressing them.
///
/// Repeated entries for the same cell are summed, zero counts are dropped.
pub struct CountsBuilder {
    tri: TriMat<usize>,
}

impl CountsBuilder {
    pub fn new(shape: (usize, usize)) -> Self {
        Self {
            tri: TriMat::new(shape),
        }
    }

    pub fn add(&mut self, row: usize, col: usize, count: usize) {
        let (rows, cols) = self.tri.shape();
        assert!(
            row < rows && col < cols,
            "entry ({}, {}) is outside a {}x{} matrix",
            row,
            col,
            rows,
            cols
        );
        if count > 0 {
            self.tri.add_triplet(row, col, count);
        }
    }

    pub fn build(self) -> SparseCounts {
        self.build_as(Layout::Csc)
    }

    pub fn build_as(self, layout: Layout) -> SparseCounts {
        let mat: CsMat<usize> = match layout {
            Layout::Csc => self.tri.to_csc(),
            Layout::Csr => self.tri.to_csr(),
        };
        SparseCounts { mat }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SparseCounts {
    mat: CsMat<usize>,
}

impl SparseCounts {
    /// An all-zero matrix of the given shape.
    pub fn zeros(shape: (usize, usize)) -> Self {
        CountsBuilder::new(shape).build()
    }

    pub fn from_triplets<I>(shape: (usize, usize), triplets: I) -> Self
    where
        I: IntoIterator<Item = (usize, usize, usize)>,
    {
        let mut builder = CountsBuilder::new(shape);
        for (row, col, count) in triplets {
            builder.add(row, col, count);
        }
        builder.build()
    }

    /// Builds a matrix from row-major dense data, mostly useful for small fixtures.
    pub fn from_dense(rows: &[Vec<usize>]) -> Self {
        let cols = rows.first().map_or(0, Vec::len);
        let mut builder = CountsBuilder::new((rows.len(), cols));
        for (r, row) in rows.iter().enumerate() {
            assert_eq!(row.len(), cols, "ragged dense input at row {}", r);
            for (c, &count) in row.iter().enumerate() {
                builder.add(r, c, count);
            }
        }
        builder.build()
    }

    pub fn rows(&self) -> usize {
        self.mat.rows()
    }

    pub fn cols(&self) -> usize {
        self.mat.cols()
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.mat.rows(), self.mat.cols())
    }

    pub fn nnz(&self) -> usize {
        self.mat.nnz()
    }

    pub fn layout(&self) -> Layout {
        if self.mat.is_csc() {
            Layout::Csc
        } else {
            Layout::Csr
        }
    }

    pub fn get(&self, row: usize, col: usize) -> usize {
        self.mat.get(row, col).copied().unwrap_or(0)
    }

    /// Non-zero entries as `(row, col, count)`, in storage order.
    pub fn triplets(&self) -> impl Iterator<Item = (usize, usize, usize)> + '_ {
        self.mat.iter().map(|(&count, (row, col))| (row, col, count))
    }

    /// Non-zero `(row, count)` entries of one column, sorted by row.
    pub fn column(&self, col: usize) -> Vec<(usize, usize)> {
        if col >= self.cols() {
            return Vec::new();
        }
        match self.layout() {
            Layout::Csc => self
                .mat
                .outer_view(col)
                .map(|v| v.iter().map(|(row, &count)| (row, count)).collect())
                .unwrap_or_default(),
            // one lookup per row, rows come out in order
            Layout::Csr => self
                .mat
                .outer_iterator()
                .enumerate()
                .filter_map(|(row, v)| v.get(col).map(|&count| (row, count)))
                .collect(),
        }
    }

    /// Non-zero `(col, count)` entries of one row, sorted by column.
    pub fn row(&self, row: usize) -> Vec<(usize, usize)> {
        if row >= self.rows() {
            return Vec::new();
        }
        match self.layout() {
            Layout::Csr => self
                .mat
                .outer_view(row)
                .map(|v| v.iter().map(|(col, &count)| (col, count)).collect())
                .unwrap_or_default(),
            Layout::Csc => self
                .mat
                .outer_iterator()
                .enumerate()
                .filter_map(|(col, v)| v.get(row).map(|&count| (col, count)))
                .collect(),
        }
    }

    /// Number of non-zero columns in each row (document frequency per word).
    pub fn row_nnz(&self) -> Vec<usize> {
        let mut nnz = vec![0; self.rows()];
        for (row, _, _) in self.triplets() {
            nnz[row] += 1;
        }
        nnz
    }

    /// Total count in each column (token count per document).
    pub fn col_sums(&self) -> Vec<usize> {
        let mut sums = vec![0; self.cols()];
        for (_, col, count) in self.triplets() {
            sums[col] += count;
        }
        sums
    }

    /// Element-wise sum of the given rows, one value per column.
    pub fn sum_rows(&self, rows: &[usize]) -> Vec<usize> {
        let wanted = renumbering(rows, self.rows());
        let mut sums = vec![0; self.cols()];
        for (row, col, count) in self.triplets() {
            if wanted[row].is_some() {
                sums[col] += count;
            }
        }
        sums
    }

    /// Keeps the listed rows, in the listed order.
    pub fn select_rows(&self, rows: &[usize]) -> SparseCounts {
        let new_row = renumbering(rows, self.rows());
        let mut builder = CountsBuilder::new((rows.len(), self.cols()));
        for (row, col, count) in self.triplets() {
            if let Some(r) = new_row[row] {
                builder.add(r, col, count);
            }
        }
        builder.build_as(self.layout())
    }

    /// Keeps the listed columns, in the listed order.
    pub fn select_cols(&self, cols: &[usize]) -> SparseCounts {
        let new_col = renumbering(cols, self.cols());
        let mut builder = CountsBuilder::new((self.rows(), cols.len()));
        for (row, col, count) in self.triplets() {
            if let Some(c) = new_col[col] {
                builder.add(row, c, count);
            }
        }
        builder.build_as(self.layout())
    }

    pub fn delete_rows(&self, rows: &[usize]) -> SparseCounts {
        self.select_rows(&complement(rows, self.rows()))
    }

    pub fn delete_cols(&self, cols: &[usize]) -> SparseCounts {
        self.select_cols(&complement(cols, self.cols()))
    }

    /// Copy of this matrix with one row replaced by dense `values`.
    pub fn with_row(&self, row: usize, values: &[usize]) -> SparseCounts {
        assert!(row < self.rows(), "row {} out of range", row);
        assert_eq!(values.len(), self.cols(), "replacement row has the wrong length");
        let mut builder = CountsBuilder::new(self.shape());
        for (r, col, count) in self.triplets() {
            if r != row {
                builder.add(r, col, count);
            }
        }
        for (col, &count) in values.iter().enumerate() {
            builder.add(row, col, count);
        }
        builder.build_as(self.layout())
    }

    pub fn to_layout(&self, layout: Layout) -> SparseCounts {
        if self.layout() == layout {
            return self.clone();
        }
        let mut builder = CountsBuilder::new(self.shape());
        for (row, col, count) in self.triplets() {
            builder.add(row, col, count);
        }
        builder.build_as(layout)
    }

    pub fn to_csc(&self) -> SparseCounts {
        self.to_layout(Layout::Csc)
    }

    pub fn to_csr(&self) -> SparseCounts {
        self.to_layout(Layout::Csr)
    }

    pub fn to_dense(&self) -> Array2<usize> {
        let mut dense = Array2::zeros(self.shape());
        for (row, col, count) in self.triplets() {
            dense[[row, col]] += count;
        }
        dense
    }
}

/// Maps old indices to their position in `keep`.
///
/// `result[old] == Some(new)` when `keep[new] == old`. Panics on an index that
/// is out of range or listed twice.
pub fn renumbering(keep: &[usize], len: usize) -> Vec<Option<usize>> {
    let mut map = vec![None; len];
    for (new, &old) in keep.iter().enumerate() {
        assert!(old < len, "index {} out of range for length {}", old, len);
        assert!(map[old].is_none(), "index {} selected twice", old);
        map[old] = Some(new);
    }
    map
}

/// Ascending indices in `0..len` that are not in `drop`.
pub fn complement(drop: &[usize], len: usize) -> Vec<usize> {
    let mut dropped = vec![false; len];
    for &i in drop {
        assert!(i < len, "index {} out of range for length {}", i, len);
        dropped[i] = true;
    }
    (0..len).filter(|&i| !dropped[i]).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn fixture() -> SparseCounts {
        SparseCounts::from_dense(&[vec![2, 0, 1], vec![1, 1, 0], vec![0, 0, 3]])
    }

    #[test]
    fn builder_sums_duplicates_and_drops_zeros() {
        let mut builder = CountsBuilder::new((2, 2));
        builder.add(0, 1, 2);
        builder.add(0, 1, 3);
        builder.add(1, 0, 0);
        let m = builder.build();
        assert_eq!(m.layout(), Layout::Csc);
        assert_eq!(m.get(0, 1), 5);
        assert_eq!(m.nnz(), 1);
    }

    #[test]
    fn select_keeps_requested_order() {
        let m = fixture();
        let picked = m.select_rows(&[2, 0]);
        assert_eq!(picked.to_dense(), array![[0, 0, 3], [2, 0, 1]]);
        let picked = m.select_cols(&[1, 2]);
        assert_eq!(picked.to_dense(), array![[0, 1], [1, 0], [0, 3]]);
    }

    #[test]
    fn delete_is_select_of_complement() {
        let m = fixture();
        assert_eq!(m.delete_rows(&[1]), m.select_rows(&[0, 2]));
        assert_eq!(m.delete_cols(&[0, 2]).to_dense(), array![[0], [1], [0]]);
    }

    #[test]
    fn sums_and_document_frequencies() {
        let m = fixture();
        assert_eq!(m.row_nnz(), vec![2, 2, 1]);
        assert_eq!(m.col_sums(), vec![3, 1, 4]);
        assert_eq!(m.sum_rows(&[0, 2]), vec![2, 0, 4]);
    }

    #[test]
    fn rows_and_columns_in_both_layouts() {
        let csc = fixture();
        let csr = csc.to_csr();
        assert_eq!(csr.layout(), Layout::Csr);
        for layout in [&csc, &csr] {
            assert_eq!(layout.column(0), vec![(0, 2), (1, 1)]);
            assert_eq!(layout.row(2), vec![(2, 3)]);
            assert!(layout.column(9).is_empty());
        }
        assert_eq!(csr.to_csc(), csc);
    }

    #[test]
    fn with_row_replaces_only_that_row() {
        let m = fixture().with_row(1, &[0, 4, 4]);
        assert_eq!(m.to_dense(), array![[2, 0, 1], [0, 4, 4], [0, 0, 3]]);
    }

    #[test]
    fn empty_shapes_are_well_formed() {
        let m = SparseCounts::zeros((0, 0));
        assert_eq!(m.shape(), (0, 0));
        let m = fixture().select_rows(&[]);
        assert_eq!(m.shape(), (0, 3));
        assert_eq!(m.col_sums(), vec![0, 0, 0]);
    }

    #[test]
    fn renumbering_is_explicit() {
        assert_eq!(renumbering(&[3, 1], 4), vec![None, Some(1), None, Some(0)]);
        assert_eq!(complement(&[1, 3], 5), vec![0, 2, 4]);
    }

    #[test]
    #[should_panic(expected = "selected twice")]
    fn duplicate_selection_panics() {
        fixture().select_rows(&[0, 0]);
    }
}
