//! The immutable bag-of-words dataset.
//!
//! A [`Dataset`] owns a `[vocab x docs]` count matrix together with the vocabulary,
//! the document titles and optional per-document metadata. Two views are derived
//! lazily and cached for the lifetime of the instance: the shuffled token sequence
//! of each document and the word cooccurrence matrix. Transformations never touch
//! an existing dataset, they build a new one (see [`crate::transform`]).

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, OnceLock};

use ndarray::Array2;
use parking_lot::Mutex;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::cooccurrence::compute_cooccurrences;
use crate::sparse::{Layout, SparseCounts};

/// Key-value labels attached to one document.
///
/// A dataset without metadata stores `None`, which is not the same thing as a
/// dataset whose documents all carry an empty map.
pub type Metadata = BTreeMap<String, String>;

pub struct Dataset {
    docwords: Arc<SparseCounts>,
    vocab: Arc<Vec<String>>,
    titles: Arc<Vec<String>>,
    metadata: Option<Arc<Vec<Metadata>>>,
    cooccurrences: OnceLock<Array2<f64>>,
    by_doc: OnceLock<SparseCounts>,
    tokens: Mutex<HashMap<usize, Arc<[usize]>>>,
}

impl Dataset {
    /// Panics if the parts disagree on the number of words or documents.
    pub fn new(
        docwords: SparseCounts,
        vocab: Vec<String>,
        titles: Vec<String>,
        metadata: Option<Vec<Metadata>>,
    ) -> Dataset {
        Dataset::from_shared(
            Arc::new(docwords),
            Arc::new(vocab),
            Arc::new(titles),
            metadata.map(Arc::new),
        )
    }

    /// Builds a dataset around storage that may also back other datasets.
    ///
    /// The shared parts are never written to after construction.
    pub(crate) fn from_shared(
        docwords: Arc<SparseCounts>,
        vocab: Arc<Vec<String>>,
        titles: Arc<Vec<String>>,
        metadata: Option<Arc<Vec<Metadata>>>,
    ) -> Dataset {
        assert_eq!(
            docwords.rows(),
            vocab.len(),
            "docwords has {} rows but the vocabulary has {} words",
            docwords.rows(),
            vocab.len()
        );
        assert_eq!(
            docwords.cols(),
            titles.len(),
            "docwords has {} columns but there are {} titles",
            docwords.cols(),
            titles.len()
        );
        if let Some(metadata) = &metadata {
            assert_eq!(
                metadata.len(),
                titles.len(),
                "metadata has {} entries but there are {} titles",
                metadata.len(),
                titles.len()
            );
        }
        Dataset {
            docwords,
            vocab,
            titles,
            metadata,
            cooccurrences: OnceLock::new(),
            by_doc: OnceLock::new(),
            tokens: Mutex::new(HashMap::new()),
        }
    }

    /// A dataset with no words and no documents.
    pub fn empty() -> Dataset {
        Dataset::new(SparseCounts::zeros((0, 0)), Vec::new(), Vec::new(), None)
    }

    pub fn docwords(&self) -> &SparseCounts {
        &self.docwords
    }

    pub fn vocab(&self) -> &[String] {
        &self.vocab
    }

    pub fn titles(&self) -> &[String] {
        &self.titles
    }

    pub fn metadata(&self) -> Option<&[Metadata]> {
        self.metadata.as_deref().map(Vec::as_slice)
    }

    pub(crate) fn shared_docwords(&self) -> Arc<SparseCounts> {
        Arc::clone(&self.docwords)
    }

    pub(crate) fn shared_vocab(&self) -> Arc<Vec<String>> {
        Arc::clone(&self.vocab)
    }

    pub(crate) fn shared_titles(&self) -> Arc<Vec<String>> {
        Arc::clone(&self.titles)
    }

    pub(crate) fn shared_metadata(&self) -> Option<Arc<Vec<Metadata>>> {
        self.metadata.clone()
    }

    pub fn vocab_size(&self) -> usize {
        self.docwords.rows()
    }

    pub fn num_docs(&self) -> usize {
        self.docwords.cols()
    }

    /// The word cooccurrence matrix, computed on first use.
    pub fn cooccurrences(&self) -> &Array2<f64> {
        self.cooccurrences
            .get_or_init(|| compute_cooccurrences(&self.docwords))
    }

    /// Short name for [`Dataset::cooccurrences`].
    pub fn q(&self) -> &Array2<f64> {
        self.cooccurrences()
    }

    pub fn has_cooccurrences(&self) -> bool {
        self.cooccurrences.get().is_some()
    }

    /// The document as a shuffled sequence of word ids, one per occurrence.
    ///
    /// The sequence is built and shuffled with `rng` the first time a document is
    /// asked for; later calls return the cached sequence whatever `rng` is passed.
    /// Returns `None` for a document id past the end.
    pub fn doc_tokens<R: Rng + ?Sized>(&self, doc_id: usize, rng: &mut R) -> Option<Arc<[usize]>> {
        if doc_id >= self.num_docs() {
            return None;
        }
        let mut cache = self.tokens.lock();
        let tokens = cache.entry(doc_id).or_insert_with(|| {
            let mut tokens: Vec<usize> = self
                .columns()
                .column(doc_id)
                .into_iter()
                .flat_map(|(word, count)| std::iter::repeat(word).take(count))
                .collect();
            tokens.shuffle(rng);
            tokens.into()
        });
        Some(Arc::clone(tokens))
    }

    // the counts compressed by document, converted once when stored by word
    fn columns(&self) -> &SparseCounts {
        match self.docwords.layout() {
            Layout::Csc => &self.docwords,
            Layout::Csr => self.by_doc.get_or_init(|| self.docwords.to_csc()),
        }
    }

    /// Number of documents whose token sequence is already cached.
    pub fn cached_doc_tokens(&self) -> usize {
        self.tokens.lock().len()
    }

    /// All metadata of one document, `None` when there is none to give.
    pub fn doc_metadata(&self, doc_id: usize) -> Option<&Metadata> {
        self.metadata.as_ref()?.get(doc_id)
    }

    pub fn doc_metadata_value(&self, doc_id: usize, key: &str) -> Option<&str> {
        self.doc_metadata(doc_id)?.get(key).map(String::as_str)
    }

    /// The value of `key` for every document, in document order.
    pub fn get_metadata(&self, key: &str) -> Vec<Option<&str>> {
        (0..self.num_docs())
            .map(|doc| self.doc_metadata_value(doc, key))
            .collect()
    }

    /// Ids of the documents whose `key` equals `value`.
    pub fn metadata_query(&self, key: &str, value: &str) -> Vec<usize> {
        self.get_metadata(key)
            .into_iter()
            .enumerate()
            .filter(|(_, v)| *v == Some(value))
            .map(|(doc, _)| doc)
            .collect()
    }
}

impl fmt::Debug for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dataset")
            .field("vocab_size", &self.vocab_size())
            .field("num_docs", &self.num_docs())
            .field("nnz", &self.docwords.nnz())
            .field("has_metadata", &self.metadata.is_some())
            .finish()
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} documents, {} words, {} non-zero counts",
            self.num_docs(),
            self.vocab_size(),
            self.docwords.nnz()
        )
    }
}
