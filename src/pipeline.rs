// imports
use crate::config::{Config, InputSpec, LabelerKind, PipelineParams, SegmenterKind, Step};
use crate::dataset::Dataset;
use crate::error::Result;
use crate::read::{self, Labeler, Segmenter, Tokenizer};
use crate::storage::{save_output, write_uci};
use crate::transform;

use log::info;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::time::Instant;

pub struct Pipeline {}

impl Pipeline {
    // runs the import in 3 steps -
    // -> configuration of arguments
    // -> reading the input and applying the transformation chain
    // -> optional train/test split, then saving every resulting dataset

    pub fn run(args: &[String]) -> Result<()> {
        info!("building parameters...");
        let params = Config::new(args)?.get_params();
        info!("{}", params);

        let timer = Instant::now();
        let mut rng = StdRng::seed_from_u64(params.seed);
        let dataset = Pipeline::import(&params, &mut rng)?;
        info!("finished import, took {} seconds ...", timer.elapsed().as_secs());

        // split if asked to, and save
        match params.train_percent {
            Some(train_percent) => {
                let (train, test) = transform::train_test_split(&dataset, train_percent, &mut rng);
                Pipeline::save(&train, &params, "train")?;
                Pipeline::save(&test, &params, "test")?;
            }
            None => Pipeline::save(&dataset, &params, "dataset")?,
        }

        info!("finished, outputs in {}. Took {} seconds ...", params.output_dir, timer.elapsed().as_secs());
        Ok(())
    }

    /// Reads the configured input and applies every step to it.
    pub fn import(params: &PipelineParams, rng: &mut StdRng) -> Result<Dataset> {
        let mut dataset = Pipeline::read(params)?;
        info!("read {}", dataset);

        for step in &params.steps {
            let timer = Instant::now();
            dataset = Pipeline::apply(dataset, step, params, rng)?;
            info!("{}: {} ({} ms)", step, dataset, timer.elapsed().as_millis());
        }
        Ok(dataset)
    }

    fn read(params: &PipelineParams) -> Result<Dataset> {
        let tokenizer = Pipeline::tokenizer(params);
        let labeler: Option<Box<dyn Labeler>> = params.labeler.map(|kind| -> Box<dyn Labeler> {
            match kind {
                LabelerKind::Title => Box::new(read::TitleLabeler { key: "title".to_string() }),
                LabelerKind::Directory => Box::new(read::DirectoryLabeler { key: "directory".to_string() }),
            }
        });
        let labeler = labeler.as_deref();

        match &params.input {
            InputSpec::Uci { docwords, vocab } => read::read_uci(docwords, vocab),
            InputSpec::File { path, segmenter } => {
                let segmenter = Pipeline::segmenter(segmenter.unwrap_or(SegmenterKind::Lines));
                read::read_file(path, tokenizer.as_ref(), segmenter.as_ref(), labeler)
            }
            InputSpec::Glob { pattern, segmenter } => {
                let segmenter = Pipeline::segmenter(segmenter.unwrap_or(SegmenterKind::WholeFile));
                read::read_glob(pattern, tokenizer.as_ref(), segmenter.as_ref(), labeler)
            }
        }
    }

    fn tokenizer(params: &PipelineParams) -> Box<dyn Tokenizer> {
        if params.lowercase {
            Box::new(read::LowercaseTokenizer)
        } else {
            Box::new(read::SimpleTokenizer)
        }
    }

    fn segmenter(kind: SegmenterKind) -> Box<dyn Segmenter> {
        match kind {
            SegmenterKind::WholeFile => Box::new(read::WholeFile),
            SegmenterKind::Lines => Box::new(read::Lines),
        }
    }

    fn apply(dataset: Dataset, step: &Step, params: &PipelineParams, rng: &mut StdRng) -> Result<Dataset> {
        // word files are tokenized the same way as the documents
        let tokenizer = Pipeline::tokenizer(params);
        let dataset = match step {
            Step::FilterStopwords { file } => {
                let stopwords = read::read_wordlist(file, Some(tokenizer.as_ref()))?;
                transform::filter_stopwords(&dataset, &stopwords)
            }
            Step::FilterRarewords { doc_threshold } => transform::filter_rarewords(&dataset, *doc_threshold),
            Step::FilterCommonwords { doc_threshold } => transform::filter_commonwords(&dataset, *doc_threshold),
            Step::FilterEmptyWords => transform::filter_empty_words(&dataset),
            Step::FilterSmalldocs { token_threshold, prune_vocab } => {
                transform::filter_smalldocs(&dataset, *token_threshold, *prune_vocab)
            }
            Step::CombineWords { file, replace } => {
                let words = read::read_wordlist(file, Some(tokenizer.as_ref()))?;
                transform::combine_words(&dataset, &words, replace)
            }
            Step::CombineRegex { regex, replace } => transform::combine_regex(&dataset, regex, replace)?,
            Step::ConvertCooccurrences => transform::convert_cooccurrences(&dataset),
            Step::PregenerateDocTokens => transform::pregenerate_doc_tokens(dataset, rng),
            Step::PregenerateQ => transform::pregenerate_q(dataset),
        };
        Ok(dataset)
    }

    fn save(dataset: &Dataset, params: &PipelineParams, name: &str) -> Result<()> {
        let output_dir = &params.output_dir;
        let snapshot = save_output(output_dir, name, dataset)?;
        let (docwords, vocab) = write_uci(dataset, output_dir, name)?;
        let titles = save_output(output_dir, &format!("titles.{}", name), dataset.titles())?;
        info!("saved {} to {}, {}, {} and {}", name, snapshot.display(), docwords.display(), vocab.display(), titles.display());

        if params.save_cooccurrences {
            let q = save_output(output_dir, &format!("cooc.{}", name), dataset.cooccurrences())?;
            info!("saved {} cooccurrences to {}", name, q.display());
        }
        Ok(())
    }
}
