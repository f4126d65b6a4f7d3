// imports
use crate::dataset::{Dataset, Metadata};
use crate::error::Result;
use crate::sparse::SparseCounts;

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use ndarray::Array2;
use ndarray_npy::{read_npy, write_npy};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

pub fn read_input<R: ReadFile>(file_path: &str) -> Result<R> {
    R::read_file(file_path)
}

pub fn save_output<S: SaveFile + ?Sized>(output_dir: &str, file_name: &str, item: &S) -> Result<PathBuf> {
    // create output folder
    fs::create_dir_all(output_dir)?;
    item.save_file(output_dir, file_name)
}

/// Something that can be stored under `<output_dir>/<file_name>.<ext>`.
pub trait SaveFile {
    fn save_file(&self, output_dir: &str, file_name: &str) -> Result<PathBuf>;
}

/// Something that can be loaded back from a path written by [`SaveFile`], extension included.
pub trait ReadFile: Sized {
    fn read_file(file_path: &str) -> Result<Self>;
}

/// The persisted form of a dataset; the lazily computed caches are not part of it.
#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct DatasetSnapshot {
    pub shape: (usize, usize),
    pub triplets: Vec<(usize, usize, usize)>,
    pub vocab: Vec<String>,
    pub titles: Vec<String>,
    pub metadata: Option<Vec<Metadata>>,
}

impl From<&Dataset> for DatasetSnapshot {
    fn from(dataset: &Dataset) -> Self {
        Self {
            shape: dataset.docwords().shape(),
            triplets: dataset.docwords().triplets().collect(),
            vocab: dataset.vocab().to_vec(),
            titles: dataset.titles().to_vec(),
            metadata: dataset.metadata().map(<[Metadata]>::to_vec),
        }
    }
}

impl From<DatasetSnapshot> for Dataset {
    fn from(snapshot: DatasetSnapshot) -> Self {
        let docwords = SparseCounts::from_triplets(snapshot.shape, snapshot.triplets);
        Dataset::new(docwords, snapshot.vocab, snapshot.titles, snapshot.metadata)
    }
}

// datasets are bincode encoded, then gzipped
impl SaveFile for Dataset {
    fn save_file(&self, output_dir: &str, file_name: &str) -> Result<PathBuf> {
        let out = Path::new(output_dir).join(format!("{}.bin.gz", file_name));
        let f = BufWriter::new(File::create(&out)?);
        let mut writer = GzEncoder::new(f, Compression::default());
        bincode::serialize_into(&mut writer, &DatasetSnapshot::from(self))?;
        writer.finish()?.flush()?;
        Ok(out)
    }
}

impl ReadFile for Dataset {
    fn read_file(file_path: &str) -> Result<Self> {
        let f = BufReader::new(File::open(file_path)?);
        let reader = GzDecoder::new(f);
        let snapshot: DatasetSnapshot = bincode::deserialize_from(reader)?;
        Ok(snapshot.into())
    }
}

// the cooccurrence matrix goes to npy so it can be opened from numpy as well
impl SaveFile for Array2<f64> {
    fn save_file(&self, output_dir: &str, file_name: &str) -> Result<PathBuf> {
        let out = Path::new(output_dir).join(format!("{}.npy", file_name));
        write_npy(&out, self)?;
        Ok(out)
    }
}

impl ReadFile for Array2<f64> {
    fn read_file(file_path: &str) -> Result<Self> {
        Ok(read_npy(file_path)?)
    }
}

impl SaveFile for [String] {
    fn save_file(&self, output_dir: &str, file_name: &str) -> Result<PathBuf> {
        let out = Path::new(output_dir).join(format!("{}.json", file_name));
        let f = BufWriter::new(File::create(&out)?);
        serde_json::to_writer(f, self)?;
        Ok(out)
    }
}

impl ReadFile for Vec<String> {
    fn read_file(file_path: &str) -> Result<Self> {
        let f = BufReader::new(File::open(file_path)?);
        Ok(serde_json::from_reader(f)?)
    }
}

/// Writes `docword.<name>.txt` and `vocab.<name>.txt` in the UCI bag-of-words format.
///
/// Triples are written document by document with one-based ids, so the files can be
/// read back with [`crate::read::read_uci`]. Titles and metadata are not part of the
/// format.
pub fn write_uci(dataset: &Dataset, output_dir: &str, name: &str) -> Result<(PathBuf, PathBuf)> {
    fs::create_dir_all(output_dir)?;
    let docwords_path = Path::new(output_dir).join(format!("docword.{}.txt", name));
    let vocab_path = Path::new(output_dir).join(format!("vocab.{}.txt", name));

    let docwords = dataset.docwords().to_csc();
    let mut f = BufWriter::new(File::create(&docwords_path)?);
    writeln!(f, "{}", dataset.num_docs())?;
    writeln!(f, "{}", dataset.vocab_size())?;
    writeln!(f, "{}", docwords.nnz())?;
    for doc in 0..docwords.cols() {
        for (word, count) in docwords.column(doc) {
            writeln!(f, "{} {} {}", doc + 1, word + 1, count)?;
        }
    }
    f.flush()?;

    let mut f = BufWriter::new(File::create(&vocab_path)?);
    for token in dataset.vocab() {
        writeln!(f, "{}", token)?;
    }
    f.flush()?;

    Ok((docwords_path, vocab_path))
}
