use std::{env, process};
extern crate bow_pipeline;
use bow_pipeline::storage::read_input;
use bow_pipeline::{Dataset, PipelineError, Result};
use log::error;
use ndarray::Axis;
use ndarray_stats::QuantileExt;

// checks on a saved dataset, treated as a binary executable so it can be ran
// independently from the import:
// summary of the shapes and the most frequent words,
// the K words that cooccur the most with a given word,
// the documents matching a metadata value.
// example: ... Output/train.bin.gz cooc space

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = env::args().collect();
    if let Err(e) = run(&args) {
        error!("{}", e);
        process::exit(1);
    }
}

fn run(args: &[String]) -> Result<()> {
    if args.len() < 3 {
        return Err(PipelineError::config("usage: bow_inspect <dataset.bin.gz> summary | cooc <word> | meta <key> <value>"));
    }
    let dataset: Dataset = read_input(&args[1])?;

    match (args[2].as_str(), &args[3..]) {
        ("summary", []) => run_summary(&dataset, 10),
        ("cooc", [word]) => run_cooc(&dataset, word, 10),
        ("meta", [key, value]) => {
            let docs = dataset.metadata_query(key, value);
            println!("{} documents with {} = {}", docs.len(), key, value);
            for doc in docs {
                println!("{} : {}", doc, dataset.titles()[doc]);
            }
            Ok(())
        }
        (selector, _) => Err(PipelineError::config(format!("unrecognized command {}", selector))),
    }
}

fn run_summary(dataset: &Dataset, k: usize) -> Result<()> {
    println!("{}", dataset);

    // most frequent words by document frequency
    let doc_freq = dataset.docwords().row_nnz();
    let mut order: Vec<usize> = (0..dataset.vocab_size()).collect();
    order.sort_by(|&a, &b| doc_freq[b].cmp(&doc_freq[a]));
    for (i, word) in order.iter().take(k).enumerate() {
        println!("{} : {} in {} documents", i, dataset.vocab()[*word], doc_freq[*word]);
    }

    Ok(())
}

fn run_cooc(dataset: &Dataset, word: &str, k: usize) -> Result<()> {
    let Some(word_id) = dataset.vocab().iter().position(|w| w == word) else {
        return Err(PipelineError::config(format!("{} is not in the vocabulary", word)));
    };

    println!("searching {} words cooccurring the most with {}", k, word);
    let row = dataset.cooccurrences().index_axis(Axis(0), word_id);

    // the strongest partner, the word itself left out
    let mut others = row.to_owned();
    others[word_id] = f64::NEG_INFINITY;
    match others.argmax() {
        Ok(best) if others[best].is_finite() => println!("strongest: {} = {}", dataset.vocab()[best], row[best]),
        _ => println!("{} cooccurs with no other word", word),
    }

    let mut order: Vec<usize> = (0..row.len()).filter(|&j| j != word_id).collect();
    order.sort_by(|&a, &b| row[b].total_cmp(&row[a]));
    for (i, other) in order.iter().take(k).enumerate() {
        println!("{} : {} ? {} = {}", i, word, dataset.vocab()[*other], row[*other]);
    }
    Ok(())
}
