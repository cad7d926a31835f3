//! Expression-prioritized CRISPR guide selection over the exons of a gene.

pub mod assembly;
pub mod config;
pub mod data_handling;
pub mod error;
pub mod helper_functions;
pub mod models;
pub mod prediction_tools;
pub mod ranker;
pub mod scanning;
pub mod top_k;

pub use config::{Orientation, QuotaScope, RankerConfig, RunConfig, ScoringAlgorithm};
pub use error::{RankerError, RankerResult};
pub use models::{GeneExonView, GuideCandidate, GuideDisplay};
pub use ranker::ExonRanker;
