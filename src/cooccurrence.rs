// imports
use crate::sparse::{Layout, SparseCounts};

use log::debug;
use ndarray::{Array1, Array2};
use std::borrow::Cow;

/// Derives the word-by-word cooccurrence matrix `Q` from a `[vocab x docs]` count matrix.
///
/// Each document with `n >= 2` tokens contributes the probability of drawing an
/// ordered pair of distinct token occurrences, `(h h^T - diag(h)) / (n (n - 1))`.
/// The contributions are averaged over all documents, so `Q` sums to the share of
/// documents that have at least two tokens. Documents with fewer tokens are skipped
/// but still counted in the average.
pub fn compute_cooccurrences(docwords: &SparseCounts) -> Array2<f64> {
    // this walks one document column at a time, so work on the column compressed form
    let docwords: Cow<SparseCounts> = match docwords.layout() {
        Layout::Csc => Cow::Borrowed(docwords),
        Layout::Csr => Cow::Owned(docwords.to_csc()),
    };

    let (vocab_size, num_docs) = docwords.shape();
    let mut q: Array2<f64> = Array2::zeros((vocab_size, vocab_size));
    if num_docs == 0 {
        return q;
    }
    let mut h_hat: Array1<f64> = Array1::zeros(vocab_size);

    let mut skipped = 0;
    for doc in 0..num_docs {
        let column = docwords.column(doc);
        let count: usize = column.iter().map(|&(_, c)| c).sum();
        if count < 2 {
            skipped += 1;
            continue;
        }
        let norm = count as f64 * (count - 1) as f64;

        for &(word, c) in &column {
            h_hat[word] += c as f64 / norm;
        }

        // the outer product only over the nonzero entries, each unordered pair computed
        // once and written to both halves so the result is exactly symmetric
        for (k, &(wi, ci)) in column.iter().enumerate() {
            for &(wj, cj) in &column[k..] {
                let value = ci as f64 * cj as f64 / norm;
                q[[wi, wj]] += value;
                if wi != wj {
                    q[[wj, wi]] += value;
                }
            }
        }
    }

    let mut diagonal = q.diag_mut();
    diagonal -= &h_hat;
    q /= num_docs as f64;

    debug!("cooccurrences over {} words, {} of {} documents too short to contribute", vocab_size, skipped, num_docs);
    q
}
