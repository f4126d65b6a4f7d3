//! Dataset-to-dataset transformations.
//!
//! An import is a read followed by a chain of these functions, for example:
//!
//! ```no_run
//! # use bow_pipeline::{read, transform};
//! # fn main() -> bow_pipeline::Result<()> {
//! let dataset = read::read_glob("newsgroups/*/*", &read::SimpleTokenizer, &read::WholeFile, None)?;
//! let stopwords = read::read_wordlist("stopwords/english.txt", None)?;
//! let dataset = transform::filter_stopwords(&dataset, &stopwords);
//! let dataset = transform::filter_rarewords(&dataset, 20);
//! # Ok(())
//! # }
//! ```
//!
//! Every function leaves its input untouched and returns a new [`Dataset`] with its
//! own empty caches. Filters renumber word and document ids by explicit selection:
//! the kept ids, in ascending order, become `0..kept`.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use log::{debug, info};
use rand::seq::SliceRandom;
use rand::Rng;
use rayon::prelude::*;
use regex::Regex;

use crate::dataset::Dataset;
use crate::error::Result;
use crate::sparse::{CountsBuilder, SparseCounts};

/// Keeps the words for which `keep(word_id, token)` holds.
pub fn filter_vocab<F>(dataset: &Dataset, keep: F) -> Dataset
where
    F: Fn(usize, &str) -> bool,
{
    let keep_index: Vec<usize> = dataset
        .vocab()
        .iter()
        .enumerate()
        .filter(|(i, token)| keep(*i, token.as_str()))
        .map(|(i, _)| i)
        .collect();
    select_vocab(dataset, &keep_index)
}

/// Keeps exactly the listed word ids; word `keep_index[k]` becomes word `k`.
pub fn select_vocab(dataset: &Dataset, keep_index: &[usize]) -> Dataset {
    let docwords = dataset.docwords().select_rows(keep_index);
    let vocab: Vec<String> = keep_index
        .iter()
        .map(|&i| dataset.vocab()[i].clone())
        .collect();
    debug!("kept {} of {} words", vocab.len(), dataset.vocab_size());
    Dataset::from_shared(
        Arc::new(docwords),
        Arc::new(vocab),
        dataset.shared_titles(),
        dataset.shared_metadata(),
    )
}

pub fn filter_stopwords(dataset: &Dataset, stopwords: &HashSet<String>) -> Dataset {
    filter_vocab(dataset, |_, token| !stopwords.contains(token))
}

/// Drops words that appear in fewer than `doc_threshold` documents.
pub fn filter_rarewords(dataset: &Dataset, doc_threshold: usize) -> Dataset {
    let doc_freq = dataset.docwords().row_nnz();
    filter_vocab(dataset, |i, _| doc_freq[i] >= doc_threshold)
}

/// Drops words that appear in more than `doc_threshold` documents.
pub fn filter_commonwords(dataset: &Dataset, doc_threshold: usize) -> Dataset {
    let doc_freq = dataset.docwords().row_nnz();
    filter_vocab(dataset, |i, _| doc_freq[i] <= doc_threshold)
}

/// Drops words that appear in no document at all.
pub fn filter_empty_words(dataset: &Dataset) -> Dataset {
    filter_rarewords(dataset, 1)
}

/// Merges every word in `words` into a single word named `replace`.
///
/// The merged row is the sum of the matched rows and takes the place of the
/// matched word with the lowest id; the other matched words are dropped. Words
/// of the set missing from the vocabulary are ignored.
pub fn combine_words(dataset: &Dataset, words: &HashSet<String>, replace: &str) -> Dataset {
    let reverse: HashMap<&str, usize> = dataset
        .vocab()
        .iter()
        .enumerate()
        .map(|(i, token)| (token.as_str(), i))
        .collect();
    let mut index: Vec<usize> = words
        .iter()
        .filter_map(|word| reverse.get(word.as_str()).copied())
        .collect();
    index.sort_unstable();

    let Some((&first, rest)) = index.split_first() else {
        return filter_vocab(dataset, |_, _| true);
    };

    let sums = dataset.docwords().sum_rows(&index);
    let merged = dataset.docwords().with_row(first, &sums);
    let dropped: HashSet<usize> = rest.iter().copied().collect();
    let keep_index: Vec<usize> = (0..dataset.vocab_size())
        .filter(|i| !dropped.contains(i))
        .collect();

    // every dropped id is above `first`, so its position does not move
    let mut vocab: Vec<String> = keep_index
        .iter()
        .map(|&i| dataset.vocab()[i].clone())
        .collect();
    vocab[first] = replace.to_owned();

    debug!("combined {} words into '{}'", index.len(), replace);
    Dataset::from_shared(
        Arc::new(merged.select_rows(&keep_index)),
        Arc::new(vocab),
        dataset.shared_titles(),
        dataset.shared_metadata(),
    )
}

/// Merges every word fully matching `pattern` into `replace`.
pub fn combine_regex(dataset: &Dataset, pattern: &str, replace: &str) -> Result<Dataset> {
    let regex = Regex::new(&format!("^(?:{})$", pattern))?;
    let words: HashSet<String> = dataset
        .vocab()
        .iter()
        .filter(|token| regex.is_match(token))
        .cloned()
        .collect();
    Ok(combine_words(dataset, &words, replace))
}

/// Drops documents with fewer than `token_threshold` tokens.
///
/// With `prune_vocab` the words left without any document are dropped too.
pub fn filter_smalldocs(dataset: &Dataset, token_threshold: usize, prune_vocab: bool) -> Dataset {
    let keep_index: Vec<usize> = dataset
        .docwords()
        .col_sums()
        .into_iter()
        .enumerate()
        .filter(|&(_, count)| count >= token_threshold)
        .map(|(doc, _)| doc)
        .collect();
    debug!("kept {} of {} documents", keep_index.len(), dataset.num_docs());

    let filtered = prepare_split(dataset, &keep_index);
    if prune_vocab {
        filter_empty_words(&filtered)
    } else {
        filtered
    }
}

/// Replaces words by word pairs, counting each pair as the smaller of the two counts.
///
/// Pair `(i, j)` with `i < j` is named `"{vocab[i]}-{vocab[j]}"`; pairs are ordered by
/// `i` then `j`, and pairs that never occur together are dropped. A vocabulary of
/// fewer than two words gives the empty dataset.
pub fn convert_cooccurrences(dataset: &Dataset) -> Dataset {
    let vocab_size = dataset.vocab_size();
    if vocab_size <= 1 {
        return Dataset::empty();
    }

    let csr = dataset.docwords().to_csr();
    let rows: Vec<Vec<(usize, usize)>> = (0..vocab_size).map(|w| csr.row(w)).collect();

    // one task per first word, collected back in order, pairs never seen together left out
    let pair_rows: Vec<Vec<(usize, Vec<(usize, usize)>)>> = (0..vocab_size)
        .into_par_iter()
        .map(|i| {
            (i + 1..vocab_size)
                .filter_map(|j| {
                    let counts = min_counts(&rows[i], &rows[j]);
                    (!counts.is_empty()).then_some((j, counts))
                })
                .collect()
        })
        .collect();

    let num_pairs: usize = pair_rows.iter().map(Vec::len).sum();
    let vocab = dataset.vocab();
    let mut builder = CountsBuilder::new((num_pairs, dataset.num_docs()));
    let mut pairs = Vec::with_capacity(num_pairs);
    for (i, row) in pair_rows.iter().enumerate() {
        for (j, counts) in row {
            for &(doc, count) in counts {
                builder.add(pairs.len(), doc, count);
            }
            pairs.push(format!("{}-{}", vocab[i], vocab[*j]));
        }
    }

    info!("converted {} words into {} word pairs", vocab_size, num_pairs);
    Dataset::from_shared(
        Arc::new(builder.build()),
        Arc::new(pairs),
        dataset.shared_titles(),
        dataset.shared_metadata(),
    )
}

// element-wise minimum of two sorted sparse rows, non-zero only where both are
fn min_counts(a: &[(usize, usize)], b: &[(usize, usize)]) -> Vec<(usize, usize)> {
    let mut out = Vec::new();
    let (mut x, mut y) = (0, 0);
    while x < a.len() && y < b.len() {
        let (doc_a, count_a) = a[x];
        let (doc_b, count_b) = b[y];
        if doc_a < doc_b {
            x += 1;
        } else if doc_b < doc_a {
            y += 1;
        } else {
            out.push((doc_a, count_a.min(count_b)));
            x += 1;
            y += 1;
        }
    }
    out
}

/// Applies `conversion` to the count matrix, typically to change its sparse layout.
///
/// The result shares the vocabulary, titles and metadata of `dataset` instead of
/// copying them; none of them is ever written to, so the sharing is not observable.
/// Panics if the conversion changes the shape of the matrix.
pub fn convert_format<F>(dataset: &Dataset, conversion: F) -> Dataset
where
    F: FnOnce(&SparseCounts) -> SparseCounts,
{
    let docwords = conversion(dataset.docwords());
    assert_eq!(
        docwords.shape(),
        dataset.docwords().shape(),
        "a format conversion must not change the matrix shape"
    );
    Dataset::from_shared(
        Arc::new(docwords),
        dataset.shared_vocab(),
        dataset.shared_titles(),
        dataset.shared_metadata(),
    )
}

/// Builds the token cache of every document and hands the same dataset back.
pub fn pregenerate_doc_tokens<R: Rng + ?Sized>(dataset: Dataset, rng: &mut R) -> Dataset {
    for doc in 0..dataset.num_docs() {
        dataset.doc_tokens(doc, rng);
    }
    dataset
}

/// Computes the cooccurrence matrix and hands the same dataset back.
pub fn pregenerate_q(dataset: Dataset) -> Dataset {
    dataset.cooccurrences();
    dataset
}

/// The listed documents, in the listed order, over the full vocabulary.
pub fn prepare_split(dataset: &Dataset, indices: &[usize]) -> Dataset {
    let docwords = dataset.docwords().select_cols(indices);
    let titles: Vec<String> = indices
        .iter()
        .map(|&i| dataset.titles()[i].clone())
        .collect();
    let metadata = dataset
        .metadata()
        .map(|metadata| indices.iter().map(|&i| metadata[i].clone()).collect());
    Dataset::from_shared(
        Arc::new(docwords),
        dataset.shared_vocab(),
        Arc::new(titles),
        metadata.map(Arc::new),
    )
}

/// Splits the documents at random into a train and a test dataset.
///
/// The first `floor(num_docs * train_percent)` shuffled documents go to train, the
/// rest to test. Both halves keep the same vocabulary: the words of the original
/// that occur in at least one train document.
pub fn train_test_split<R: Rng + ?Sized>(
    dataset: &Dataset,
    train_percent: f64,
    rng: &mut R,
) -> (Dataset, Dataset) {
    assert!(
        (0.0..=1.0).contains(&train_percent),
        "train_percent must be within [0, 1], got {}",
        train_percent
    );

    let mut shuffled: Vec<usize> = (0..dataset.num_docs()).collect();
    shuffled.shuffle(rng);
    let split = ((shuffled.len() as f64 * train_percent).floor() as usize).min(shuffled.len());
    let (train_docs, test_docs) = shuffled.split_at(split);

    let train = prepare_split(dataset, train_docs);
    let test = prepare_split(dataset, test_docs);

    let keep_index: Vec<usize> = train
        .docwords()
        .row_nnz()
        .into_iter()
        .enumerate()
        .filter(|&(_, nnz)| nnz > 0)
        .map(|(i, _)| i)
        .collect();

    info!(
        "split {} documents into {} train and {} test, {} shared words",
        dataset.num_docs(),
        train_docs.len(),
        test_docs.len(),
        keep_index.len()
    );
    (select_vocab(&train, &keep_index), select_vocab(&test, &keep_index))
}
