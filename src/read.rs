// imports
use crate::dataset::{Dataset, Metadata};
use crate::error::{PipelineError, Result};
use crate::sparse::CountsBuilder;

use flate2::read::GzDecoder;
use log::{debug, info};
use std::collections::{HashMap, HashSet};
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::Path;

// defines the behavior needed for tokenizing a document
pub trait Tokenizer {
    fn tokenize(&self, text: &str) -> Vec<String>;
}

/// Splits on whitespace.
pub struct SimpleTokenizer;

impl Tokenizer for SimpleTokenizer {
    fn tokenize(&self, text: &str) -> Vec<String> {
        text.split_whitespace().map(|x| x.to_string()).collect()
    }
}

/// Splits on whitespace and lower cases every token.
pub struct LowercaseTokenizer;

impl Tokenizer for LowercaseTokenizer {
    fn tokenize(&self, text: &str) -> Vec<String> {
        text.split_whitespace().map(|x| x.to_lowercase()).collect()
    }
}

impl<F> Tokenizer for F
where
    F: Fn(&str) -> Vec<String>,
{
    fn tokenize(&self, text: &str) -> Vec<String> {
        self(text)
    }
}

// splits the contents of one file into (title, text) documents
pub trait Segmenter {
    fn segment(&self, name: &str, contents: &str) -> Vec<(String, String)>;
}

/// The whole file is one document, titled with the file name.
pub struct WholeFile;

impl Segmenter for WholeFile {
    fn segment(&self, name: &str, contents: &str) -> Vec<(String, String)> {
        vec![(name.to_string(), contents.to_string())]
    }
}

/// One document per non-blank line; the first field is the title, the rest the text.
pub struct Lines;

impl Segmenter for Lines {
    fn segment(&self, _name: &str, contents: &str) -> Vec<(String, String)> {
        contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| match line.split_once(char::is_whitespace) {
                Some((title, text)) => (title.to_string(), text.trim_start().to_string()),
                None => (line.to_string(), String::new()),
            })
            .collect()
    }
}

// produces the metadata of a document from its title and text
pub trait Labeler {
    fn label(&self, title: &str, text: &str) -> Metadata;
}

impl<F> Labeler for F
where
    F: Fn(&str, &str) -> Metadata,
{
    fn label(&self, title: &str, text: &str) -> Metadata {
        self(title, text)
    }
}

/// Stores the document title under `key`.
pub struct TitleLabeler {
    pub key: String,
}

impl Labeler for TitleLabeler {
    fn label(&self, title: &str, _text: &str) -> Metadata {
        Metadata::from([(self.key.clone(), title.to_string())])
    }
}

/// Stores the name of the directory holding the document (e.g. a newsgroup) under `key`.
pub struct DirectoryLabeler {
    pub key: String,
}

impl Labeler for DirectoryLabeler {
    fn label(&self, title: &str, _text: &str) -> Metadata {
        let mut metadata = Metadata::new();
        let parent = Path::new(title)
            .parent()
            .and_then(Path::file_name)
            .map(|name| name.to_string_lossy().into_owned());
        if let Some(parent) = parent {
            metadata.insert(self.key.clone(), parent);
        }
        metadata
    }
}

/// Runs several labelers and merges their output, later labelers winning on shared keys.
pub struct Aggregate {
    labelers: Vec<Box<dyn Labeler>>,
}

pub fn aggregate(labelers: Vec<Box<dyn Labeler>>) -> Aggregate {
    Aggregate { labelers }
}

impl Labeler for Aggregate {
    fn label(&self, title: &str, text: &str) -> Metadata {
        let mut metadata = Metadata::new();
        for labeler in &self.labelers {
            metadata.extend(labeler.label(title, text));
        }
        metadata
    }
}

/// Builds a dataset from `(title, text)` documents.
///
/// Word ids are given in order of first appearance. Metadata is only stored when a
/// labeler is given.
pub fn build_dataset<I>(docdata: I, tokenizer: &dyn Tokenizer, labeler: Option<&dyn Labeler>) -> Dataset
where
    I: IntoIterator<Item = (String, String)>,
{
    // read each document, tracking vocab and word counts
    let mut t2i: HashMap<String, usize> = HashMap::new();
    let mut docs: Vec<HashMap<usize, usize>> = Vec::new();
    let mut titles: Vec<String> = Vec::new();
    let mut metadata: Option<Vec<Metadata>> = labeler.map(|_| Vec::new());

    for (title, text) in docdata {
        let mut doc: HashMap<usize, usize> = HashMap::new();
        for token in tokenizer.tokenize(&text) {
            let next_id = t2i.len();
            let token_id = *t2i.entry(token).or_insert(next_id);
            *doc.entry(token_id).or_insert(0) += 1;
        }
        if let (Some(labeler), Some(metadata)) = (labeler, metadata.as_mut()) {
            metadata.push(labeler.label(&title, &text));
        }
        docs.push(doc);
        titles.push(title);
    }

    // construct the docwords matrix using the vocab map
    let mut builder = CountsBuilder::new((t2i.len(), docs.len()));
    for (doc_id, counts) in docs.iter().enumerate() {
        for (&token_id, &count) in counts {
            builder.add(token_id, doc_id, count);
        }
    }

    // turn the token to index map into a list of tokens
    let mut vocab = vec![String::new(); t2i.len()];
    for (token, token_id) in t2i {
        vocab[token_id] = token;
    }

    info!("built {} documents over {} distinct tokens", titles.len(), vocab.len());
    Dataset::new(builder.build(), vocab, titles, metadata)
}

fn read_lossy(path: &Path) -> Result<String> {
    let bytes = fs::read(path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Reads a single file, segmented into documents by `segmenter`.
pub fn read_file(
    path: impl AsRef<Path>,
    tokenizer: &dyn Tokenizer,
    segmenter: &dyn Segmenter,
    labeler: Option<&dyn Labeler>,
) -> Result<Dataset> {
    let path = path.as_ref();
    let contents = read_lossy(path)?;
    let docdata = segmenter.segment(&path.display().to_string(), &contents);
    Ok(build_dataset(docdata, tokenizer, labeler))
}

/// Reads every file matching a glob pattern, in path order.
pub fn read_glob(
    pattern: &str,
    tokenizer: &dyn Tokenizer,
    segmenter: &dyn Segmenter,
    labeler: Option<&dyn Labeler>,
) -> Result<Dataset> {
    let mut paths = Vec::new();
    for entry in glob::glob(pattern)? {
        let path = entry.map_err(|e| PipelineError::Io(e.into_error()))?;
        if path.is_file() {
            paths.push(path);
        }
    }
    paths.sort();
    info!("reading {} files matching {}", paths.len(), pattern);

    let mut docdata = Vec::new();
    for path in &paths {
        let contents = read_lossy(path)?;
        docdata.extend(segmenter.segment(&path.display().to_string(), &contents));
    }
    Ok(build_dataset(docdata, tokenizer, labeler))
}

/// Reads a word list, one word per line, or every token of the file when a tokenizer is given.
pub fn read_wordlist(path: impl AsRef<Path>, tokenizer: Option<&dyn Tokenizer>) -> Result<HashSet<String>> {
    let contents = read_lossy(path.as_ref())?;
    let words = match tokenizer {
        Some(tokenizer) => tokenizer.tokenize(&contents).into_iter().collect(),
        None => contents
            .lines()
            .map(str::trim)
            .filter(|word| !word.is_empty())
            .map(str::to_string)
            .collect(),
    };
    Ok(words)
}

// opens a text file, decompressing it when the name ends in .gz
fn open_text(path: &Path) -> Result<Box<dyn BufRead>> {
    let f = File::open(path)?;
    if path.extension().map_or(false, |ext| ext == "gz") {
        Ok(Box::new(BufReader::new(GzDecoder::new(f))))
    } else {
        Ok(Box::new(BufReader::new(f)))
    }
}

fn parse_header(
    lines: &mut impl Iterator<Item = std::io::Result<String>>,
    path: &str,
    line_no: usize,
    name: &str,
) -> Result<usize> {
    let line = lines
        .next()
        .ok_or_else(|| PipelineError::format(path, line_no, format!("missing {} in header", name)))??;
    line.trim()
        .parse()
        .map_err(|_| PipelineError::format(path, line_no, format!("{} is not a number: '{}'", name, line.trim())))
}

/// Reads a dataset in the UCI bag-of-words format.
///
/// The docwords file holds the number of documents, the number of words and the
/// number of non-zero counts on three lines, followed by one `doc word count`
/// triple per line with one-based ids. The vocab file has one token per line, the
/// line number being the word id. Titles are the zero-based document ids.
pub fn read_uci(docwords_path: impl AsRef<Path>, vocab_path: impl AsRef<Path>) -> Result<Dataset> {
    let docwords_path = docwords_path.as_ref();
    let vocab_path = vocab_path.as_ref();
    let name = docwords_path.display().to_string();

    // read in the vocab file
    let mut vocab = Vec::new();
    for line in open_text(vocab_path)?.lines() {
        vocab.push(line?.trim().to_string());
    }

    // read in the docwords file
    let mut lines = open_text(docwords_path)?.lines();
    let num_docs = parse_header(&mut lines, &name, 1, "document count")?;
    let num_words = parse_header(&mut lines, &name, 2, "word count")?;
    let nnz = parse_header(&mut lines, &name, 3, "non-zero count")?;

    if num_words != vocab.len() {
        return Err(PipelineError::format(
            &name,
            2,
            format!("header declares {} words but {} has {}", num_words, vocab_path.display(), vocab.len()),
        ));
    }

    let mut builder = CountsBuilder::new((num_words, num_docs));
    let mut seen = HashSet::new();
    for (i, line) in lines.enumerate() {
        let line_no = i + 4;
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<usize> = line
            .split_whitespace()
            .map(|x| x.parse::<usize>())
            .collect::<std::result::Result<_, _>>()
            .map_err(|_| PipelineError::format(&name, line_no, format!("expected three integers, got '{}'", line)))?;
        let [doc, word, count] = fields[..] else {
            return Err(PipelineError::format(&name, line_no, format!("expected three integers, got '{}'", line)));
        };
        if doc == 0 || doc > num_docs {
            return Err(PipelineError::format(&name, line_no, format!("document id {} outside 1..={}", doc, num_docs)));
        }
        if word == 0 || word > num_words {
            return Err(PipelineError::format(&name, line_no, format!("word id {} outside 1..={}", word, num_words)));
        }
        if !seen.insert((doc, word)) {
            return Err(PipelineError::format(&name, line_no, format!("word {} listed twice for document {}", word, doc)));
        }
        builder.add(word - 1, doc - 1, count);
    }
    let triples = seen.len();

    if triples != nnz {
        return Err(PipelineError::format(
            &name,
            3,
            format!("header declares {} non-zero counts but found {}", nnz, triples),
        ));
    }

    debug!("read {} triples from {}", triples, name);
    let titles = (0..num_docs).map(|i| i.to_string()).collect();
    Ok(Dataset::new(builder.build(), vocab, titles, None))
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use ndarray::array;
    use std::io::Write;
    use tempfile::TempDir;

    fn docs(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs.iter().map(|(t, d)| (t.to_string(), d.to_string())).collect()
    }

    #[test]
    fn build_assigns_ids_in_first_seen_order() {
        let d = build_dataset(docs(&[("a", "the cat the"), ("b", "dog cat")]), &SimpleTokenizer, None);
        assert_eq!(d.vocab(), ["the", "cat", "dog"]);
        assert_eq!(d.titles(), ["a", "b"]);
        assert_eq!(d.docwords().to_dense(), array![[2, 0], [1, 1], [0, 1]]);
        assert!(d.metadata().is_none());
    }

    #[test]
    fn build_with_labeler_and_closure_tokenizer() {
        let tokenizer = |text: &str| text.split(',').map(|x| x.to_string()).collect::<Vec<String>>();
        let labeler = |title: &str, text: &str| {
            Metadata::from([("first".to_string(), title.to_string()), ("len".to_string(), text.len().to_string())])
        };
        let d = build_dataset(docs(&[("x", "a,b"), ("y", "b")]), &tokenizer, Some(&labeler));
        assert_eq!(d.vocab(), ["a", "b"]);
        assert_eq!(d.doc_metadata_value(1, "first"), Some("y"));
        assert_eq!(d.doc_metadata_value(0, "len"), Some("3"));
    }

    #[test]
    fn segmenters_and_labelers() {
        let lines = Lines.segment("ignored", "doc1 hello world\n\n  doc2   bye\nlonely\n");
        assert_eq!(lines, docs(&[("doc1", "hello world"), ("doc2", "bye"), ("lonely", "")]));
        assert_eq!(WholeFile.segment("f.txt", "a b"), docs(&[("f.txt", "a b")]));

        let labeler = aggregate(vec![
            Box::new(TitleLabeler { key: "title".to_string() }),
            Box::new(DirectoryLabeler { key: "group".to_string() }),
        ]);
        let metadata = labeler.label("news/sci.space/123", "");
        assert_eq!(metadata.get("group").map(String::as_str), Some("sci.space"));
        assert_eq!(metadata.get("title").map(String::as_str), Some("news/sci.space/123"));
        assert!(DirectoryLabeler { key: "g".to_string() }.label("plain", "").is_empty());
        assert_eq!(LowercaseTokenizer.tokenize("The CAT"), vec!["the", "cat"]);
    }

    #[test]
    fn read_file_and_glob() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("pets")).unwrap();
        fs::write(dir.path().join("pets/b.txt"), "dog dog cat").unwrap();
        fs::write(dir.path().join("pets/a.txt"), "cat").unwrap();
        fs::write(dir.path().join("lines.txt"), "t1 x y\nt2 y\n").unwrap();

        let d = read_file(dir.path().join("lines.txt"), &SimpleTokenizer, &Lines, None).unwrap();
        assert_eq!(d.titles(), ["t1", "t2"]);
        assert_eq!(d.vocab(), ["x", "y"]);

        let pattern = format!("{}/pets/*.txt", dir.path().display());
        let labeler = DirectoryLabeler { key: "group".to_string() };
        let d = read_glob(&pattern, &SimpleTokenizer, &WholeFile, Some(&labeler)).unwrap();
        assert_eq!(d.num_docs(), 2);
        assert!(d.titles()[0].ends_with("a.txt"));
        assert_eq!(d.vocab(), ["cat", "dog"]);
        assert_eq!(d.metadata_query("group", "pets"), vec![0, 1]);
    }

    #[test]
    fn wordlists() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("stop.txt");
        fs::write(&path, " the \nand\n\n").unwrap();
        let words = read_wordlist(&path, None).unwrap();
        assert_eq!(words.len(), 2);
        assert!(words.contains("the"));
        let words = read_wordlist(&path, Some(&SimpleTokenizer)).unwrap();
        assert_eq!(words.len(), 2);
    }

    fn write_uci_files(dir: &TempDir, docwords: &str, vocab: &str) -> (std::path::PathBuf, std::path::PathBuf) {
        let d = dir.path().join("docword.txt");
        let v = dir.path().join("vocab.txt");
        fs::write(&d, docwords).unwrap();
        fs::write(&v, vocab).unwrap();
        (d, v)
    }

    #[test]
    fn uci_reads_one_based_triples() {
        let dir = TempDir::new().unwrap();
        let (d, v) = write_uci_files(&dir, "3\n2\n3\n1 1 2\n2 2 1\n3 1 1\n", "cat\ndog\n");
        let dataset = read_uci(&d, &v).unwrap();
        assert_eq!(dataset.titles(), ["0", "1", "2"]);
        assert_eq!(dataset.vocab(), ["cat", "dog"]);
        assert_eq!(dataset.docwords().to_dense(), array![[2, 0, 1], [0, 1, 0]]);
    }

    #[test]
    fn uci_reads_gzip() {
        let dir = TempDir::new().unwrap();
        let d = dir.path().join("docword.txt.gz");
        let mut encoder = GzEncoder::new(File::create(&d).unwrap(), Compression::default());
        encoder.write_all(b"1\n1\n1\n1 1 5\n").unwrap();
        encoder.finish().unwrap();
        let v = dir.path().join("vocab.txt");
        fs::write(&v, "word\n").unwrap();
        let dataset = read_uci(&d, &v).unwrap();
        assert_eq!(dataset.docwords().get(0, 0), 5);
    }

    #[test]
    fn uci_rejects_malformed_input() {
        let dir = TempDir::new().unwrap();
        let cases = [
            ("2\n2\n2\n1 1 1\n", "nnz mismatch"),
            ("2\n2\n1\n3 1 1\n", "doc out of range"),
            ("2\n2\n1\n1 0 1\n", "word out of range"),
            ("2\n2\n1\n1 1\n", "short triple"),
            ("2\n2\n2\n1 2 1\n1 2 4\n", "repeated triple"),
            ("two\n2\n0\n", "bad header"),
            ("2\n3\n0\n", "vocab mismatch"),
            ("2\n", "truncated header"),
        ];
        for (docwords, case) in cases {
            let (d, v) = write_uci_files(&dir, docwords, "a\nb\n");
            assert!(
                matches!(read_uci(&d, &v), Err(PipelineError::Format { .. })),
                "{} should be a format error",
                case
            );
        }
        assert!(matches!(read_uci(dir.path().join("nope"), dir.path().join("vocab.txt")), Err(PipelineError::Io(_))));
    }
}
