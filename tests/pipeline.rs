use std::collections::HashSet;
use std::fs;

use bow_pipeline::read::{self, SimpleTokenizer};
use bow_pipeline::storage::read_input;
use bow_pipeline::transform::*;
use bow_pipeline::{Dataset, Pipeline, SparseCounts};
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tempfile::TempDir;

fn corpus() -> Dataset {
    let docs = vec![
        ("space/1", "the shuttle launch was delayed the crew waited"),
        ("space/2", "orbit launch crew shuttle orbit"),
        ("autos/1", "the engine of the car was loud"),
        ("autos/2", "car engine oil car"),
        ("autos/3", "the"),
        ("misc/1", "a unique token appears once"),
    ];
    let labeler = read::DirectoryLabeler { key: "group".to_string() };
    read::build_dataset(
        docs.into_iter().map(|(t, d)| (t.to_string(), d.to_string())),
        &SimpleTokenizer,
        Some(&labeler),
    )
}

fn assert_consistent(d: &Dataset) {
    assert_eq!(d.docwords().rows(), d.vocab().len());
    assert_eq!(d.docwords().cols(), d.titles().len());
    if let Some(metadata) = d.metadata() {
        assert_eq!(metadata.len(), d.titles().len());
    }
}

#[test]
fn every_transform_keeps_shapes_consistent() {
    let d = corpus();
    let stopwords: HashSet<String> = ["the", "was", "of", "a"].iter().map(|s| s.to_string()).collect();
    let chain = [
        filter_stopwords(&d, &stopwords),
        filter_rarewords(&d, 2),
        filter_commonwords(&d, 2),
        filter_empty_words(&d),
        filter_smalldocs(&d, 3, true),
        filter_smalldocs(&d, 3, false),
        combine_words(&d, &["car", "engine"].iter().map(|s| s.to_string()).collect(), "vehicle"),
        combine_regex(&d, "or.*", "or*").unwrap(),
        convert_cooccurrences(&filter_rarewords(&d, 2)),
        convert_format(&d, SparseCounts::to_csr),
        prepare_split(&d, &[5, 0]),
    ];
    for transformed in &chain {
        assert_consistent(transformed);
    }
    let (train, test) = train_test_split(&d, 0.5, &mut StdRng::seed_from_u64(0));
    assert_consistent(&train);
    assert_consistent(&test);
    // the input was never modified
    assert_eq!(d.num_docs(), 6);
    assert_eq!(d.vocab(), corpus().vocab());
}

#[test]
fn combining_words_sums_their_rows() {
    let d = corpus();
    let car = d.vocab().iter().position(|w| w == "car").unwrap();
    let engine = d.vocab().iter().position(|w| w == "engine").unwrap();
    let words: HashSet<String> = ["car", "engine"].iter().map(|s| s.to_string()).collect();
    let combined = combine_words(&d, &words, "vehicle");

    assert_eq!(combined.vocab_size(), d.vocab_size() - 1);
    let vehicle = combined.vocab().iter().position(|w| w == "vehicle").unwrap();
    assert_eq!(vehicle, car.min(engine));
    for doc in 0..d.num_docs() {
        assert_eq!(
            combined.docwords().get(vehicle, doc),
            d.docwords().get(car, doc) + d.docwords().get(engine, doc)
        );
    }
    // the other words keep their counts
    for (new_id, word) in combined.vocab().iter().enumerate() {
        if word == "vehicle" {
            continue;
        }
        let old_id = d.vocab().iter().position(|w| w == word).unwrap();
        for doc in 0..d.num_docs() {
            assert_eq!(combined.docwords().get(new_id, doc), d.docwords().get(old_id, doc));
        }
    }
}

#[test]
fn split_partitions_documents_and_shares_vocabulary() {
    let d = corpus();
    for seed in 0..5 {
        let (train, test) = train_test_split(&d, 0.75, &mut StdRng::seed_from_u64(seed));
        assert_eq!(train.num_docs(), 4);
        assert_eq!(test.num_docs(), 2);

        let train_titles: HashSet<&String> = train.titles().iter().collect();
        let test_titles: HashSet<&String> = test.titles().iter().collect();
        assert!(train_titles.is_disjoint(&test_titles));
        let all: HashSet<&String> = train_titles.union(&test_titles).copied().collect();
        let expected: HashSet<&String> = d.titles().iter().collect();
        assert_eq!(all, expected);

        assert_eq!(train.vocab(), test.vocab());
        assert!(train.docwords().row_nnz().iter().all(|&n| n >= 1));
    }
}

#[test]
fn cooccurrences_of_a_corpus_are_symmetric() {
    let d = filter_rarewords(&corpus(), 2);
    let q = d.cooccurrences();
    let n = d.vocab_size();
    for i in 0..n {
        for j in 0..n {
            assert_eq!(q[[i, j]], q[[j, i]]);
        }
    }
    // every document is averaged in, the ones with fewer than two tokens contribute nothing
    let long_docs = d.docwords().col_sums().iter().filter(|&&c| c >= 2).count();
    assert!((q.sum() - long_docs as f64 / d.num_docs() as f64).abs() < 1e-9);
}

#[test]
fn doc_tokens_follow_counts() {
    let docwords = SparseCounts::from_dense(&[vec![2], vec![1]]);
    let d = Dataset::new(docwords, vec!["w0".into(), "w1".into()], vec!["doc".into()], None);
    let mut rng = StdRng::seed_from_u64(2024);
    let tokens = d.doc_tokens(0, &mut rng).unwrap();
    assert_eq!(tokens.len(), 3);
    assert_eq!(tokens.iter().filter(|&&t| t == 0).count(), 2);
    assert_eq!(tokens.iter().filter(|&&t| t == 1).count(), 1);
    assert_eq!(d.doc_tokens(0, &mut rng).unwrap(), tokens);
}

#[test]
fn pipeline_runs_from_a_config_file() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    for (group, name, text) in [
        ("space", "1", "The shuttle launch was delayed, the crew waited"),
        ("space", "2", "orbit launch crew shuttle orbit 2024"),
        ("space", "3", "launch window 1999 shuttle crew"),
        ("autos", "1", "the engine of the car was loud"),
        ("autos", "2", "car engine oil car 1998"),
        ("autos", "3", "engine car crew"),
    ] {
        fs::create_dir_all(root.join(group)).unwrap();
        fs::write(root.join(group).join(name), text).unwrap();
    }
    fs::write(root.join("stopwords.txt"), "the\nwas\nof\n").unwrap();

    let output_dir = root.join("out");
    let config = serde_json::json!({
        "input": {"kind": "glob", "pattern": format!("{}/*/*", root.display())},
        "output_dir": output_dir.display().to_string(),
        "lowercase": true,
        "labeler": "directory",
        "steps": [
            {"op": "filter_stopwords", "file": root.join("stopwords.txt").display().to_string()},
            {"op": "combine_regex", "regex": "\\d+", "replace": "<year>"},
            {"op": "filter_rarewords", "doc_threshold": 2},
            {"op": "filter_smalldocs", "token_threshold": 2},
            {"op": "pregenerate_q"}
        ],
        "train_percent": 0.5,
        "seed": 7,
        "save_cooccurrences": true
    });
    let config_path = root.join("config.json");
    fs::write(&config_path, config.to_string()).unwrap();

    let args = vec!["bow_pipeline".to_string(), config_path.display().to_string()];
    Pipeline::run(&args).unwrap();

    let train: Dataset = read_input(&output_dir.join("train.bin.gz").display().to_string()).unwrap();
    let test: Dataset = read_input(&output_dir.join("test.bin.gz").display().to_string()).unwrap();
    assert_eq!(train.vocab(), test.vocab());
    assert!(!train.vocab().iter().any(|w| w == "the"));
    assert!(train.vocab().iter().all(|w| w.chars().all(|c| !c.is_uppercase())));
    assert_eq!(train.num_docs() + test.num_docs(), 6);
    assert!(train.metadata().is_some());

    let q: Array2<f64> = read_input(&output_dir.join("cooc.train.npy").display().to_string()).unwrap();
    assert_eq!(q.dim(), (train.vocab_size(), train.vocab_size()));

    let uci = read::read_uci(output_dir.join("docword.test.txt"), output_dir.join("vocab.test.txt")).unwrap();
    assert_eq!(uci.docwords().to_dense(), test.docwords().to_dense());
    assert!(output_dir.join("titles.train.json").exists());
}

#[test]
fn pipeline_reports_bad_arguments() {
    assert!(Pipeline::run(&["bow_pipeline".to_string()]).is_err());
    let missing = vec!["bow_pipeline".to_string(), "/no/such/config.json".to_string()];
    assert!(Pipeline::run(&missing).is_err());
}
