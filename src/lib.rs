pub mod sparse;
pub mod dataset;
pub mod cooccurrence;
pub mod transform;
pub mod read;
pub mod storage;
pub mod config;
pub mod error;
mod pipeline;

pub use dataset::{Dataset, Metadata};
pub use error::{PipelineError, Result};
pub use pipeline::Pipeline;
pub use sparse::SparseCounts;
