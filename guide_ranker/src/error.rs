use polars::error::PolarsError;
use thiserror::Error;

pub type RankerResult<T> = Result<T, RankerError>;

#[derive(Debug, Error)]
pub enum RankerError {
    #[error("invalid PAM pattern `{0}`: only IUPAC nucleotide codes are allowed")]
    InvalidPam(String),

    #[error("invalid exon key `{0}`: expected `<gene id>_<exon number>`")]
    InvalidExonKey(String),

    #[error("gene `{0}` is unknown to the sequence provider")]
    UnknownGene(String),

    #[error("no sequence available for exon `{0}`")]
    MissingSequence(String),

    #[error("tissue column `{0}` is not present in the expression table")]
    UnknownTissue(String),

    #[error("guide points at exon {exon} but gene `{gene}` only has {exon_count} exons")]
    ExonOutOfRange {
        gene: String,
        exon: usize,
        exon_count: usize,
    },

    #[error("gene info for `{0}` lists fewer exon coordinates than its exon count")]
    InconsistentGeneInfo(String),

    #[error("Ensembl request failed: {0}")]
    Ensembl(String),

    #[error(transparent)]
    Polars(#[from] PolarsError),

    #[error(transparent)]
    Regex(#[from] regex::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}
