pub mod ensembl;
pub mod gtex_expression;
pub mod in_memory;

use polars::error::PolarsResult;
use polars::frame::DataFrame;

use crate::error::RankerResult;
use crate::models::{ExpressionRow, GeneInfo};

/// A tabular source that can be loaded into a DataFrame.
pub trait Dataset {
    fn load(&self) -> PolarsResult<DataFrame>;
}

/// Pre-normalized per-exon, per-tissue expression values.
pub trait ExpressionTable {
    /// One row per exon of `gene_id`, keyed `<gene id>_<exon number>`.
    fn rows_for_gene(&self, gene_id: &str) -> RankerResult<Vec<ExpressionRow>>;
}

/// Nucleotide sequences and exon structure of genes.
pub trait SequenceProvider {
    fn sequence_for_exon(&self, exon_key: &str) -> RankerResult<String>;
    fn gene_info(&self, gene_id: &str) -> RankerResult<GeneInfo>;
}
