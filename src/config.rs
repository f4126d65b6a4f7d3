use serde::Deserialize;
use std::{fmt::Display, fs::File, io::BufReader};

use crate::error::{PipelineError, Result};

#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmenterKind {
    WholeFile,
    Lines,
}

#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelerKind {
    Title,
    Directory,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InputSpec {
    Uci {
        docwords: String,
        vocab: String,
    },
    File {
        path: String,
        segmenter: Option<SegmenterKind>,
    },
    Glob {
        pattern: String,
        segmenter: Option<SegmenterKind>,
    },
}

impl Display for InputSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InputSpec::Uci { docwords, vocab } => write!(f, "uci docwords {} vocab {}", docwords, vocab),
            InputSpec::File { path, segmenter } => write!(f, "file {} segmenter {:?}", path, segmenter),
            InputSpec::Glob { pattern, segmenter } => write!(f, "glob {} segmenter {:?}", pattern, segmenter),
        }
    }
}

fn default_true() -> bool {
    true
}

/// One transformation of the chain, applied in the order given.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    FilterStopwords { file: String },
    FilterRarewords { doc_threshold: usize },
    FilterCommonwords { doc_threshold: usize },
    FilterEmptyWords,
    FilterSmalldocs {
        token_threshold: usize,
        #[serde(default = "default_true")]
        prune_vocab: bool,
    },
    CombineWords { file: String, replace: String },
    CombineRegex { regex: String, replace: String },
    ConvertCooccurrences,
    PregenerateDocTokens,
    PregenerateQ,
}

impl Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Step::FilterStopwords { file } => write!(f, "filter_stopwords({})", file),
            Step::FilterRarewords { doc_threshold } => write!(f, "filter_rarewords({})", doc_threshold),
            Step::FilterCommonwords { doc_threshold } => write!(f, "filter_commonwords({})", doc_threshold),
            Step::FilterEmptyWords => write!(f, "filter_empty_words"),
            Step::FilterSmalldocs { token_threshold, prune_vocab } => {
                write!(f, "filter_smalldocs({}, prune_vocab: {})", token_threshold, prune_vocab)
            }
            Step::CombineWords { file, replace } => write!(f, "combine_words({} -> {})", file, replace),
            Step::CombineRegex { regex, replace } => write!(f, "combine_regex({} -> {})", regex, replace),
            Step::ConvertCooccurrences => write!(f, "convert_cooccurrences"),
            Step::PregenerateDocTokens => write!(f, "pregenerate_doc_tokens"),
            Step::PregenerateQ => write!(f, "pregenerate_q"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct PipelineParams {
    pub input: InputSpec,
    pub output_dir: String,
    #[serde(default)]
    pub lowercase: bool,
    #[serde(default)]
    pub labeler: Option<LabelerKind>,
    #[serde(default)]
    pub steps: Vec<Step>,
    #[serde(default)]
    pub train_percent: Option<f64>,
    #[serde(default)]
    pub seed: u64,
    #[serde(default)]
    pub save_cooccurrences: bool,
}

impl Display for PipelineParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let steps: Vec<String> = self.steps.iter().map(|s| s.to_string()).collect();
        write!(f, "using pipeline params:
        input: {}
        output_dir: {}
        lowercase: {}
        labeler: {:?}
        steps: [{}]
        train_percent: {:?}
        seed: {}
        save_cooccurrences: {}",
        self.input, self.output_dir, self.lowercase, self.labeler, steps.join(", "),
        self.train_percent, self.seed, self.save_cooccurrences)
    }
}

pub struct Config {
    params: PipelineParams
}

impl Config {
    pub fn get_params(&self) -> PipelineParams {
        self.params.clone()
    }

    pub fn new(args: &[String]) -> Result<Config> {
        if args.len() != 2 {
            return Err(PipelineError::config("input should be a path to json file only"));
        }

        // parse input json
        let f = BufReader::new(File::open(&args[1])?);
        let params: PipelineParams = serde_json::from_reader(f)?;
        Config::validate(params)
    }

    pub fn from_json_str(json: &str) -> Result<Config> {
        let params: PipelineParams = serde_json::from_str(json)?;
        Config::validate(params)
    }

    fn validate(params: PipelineParams) -> Result<Config> {
        if let Some(train_percent) = params.train_percent {
            if !(0.0..=1.0).contains(&train_percent) {
                return Err(PipelineError::config(format!(
                    "train_percent should be within [0, 1], got {}",
                    train_percent
                )));
            }
        }
        if params.output_dir.trim().is_empty() {
            return Err(PipelineError::config("output_dir is empty"));
        }
        Ok(Self { params })
    }
}
