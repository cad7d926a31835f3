//! HashMap-backed collaborators for tests and embedding callers.

use std::collections::{BTreeMap, HashMap};

use crate::data_handling::{ExpressionTable, SequenceProvider};
use crate::error::{RankerError, RankerResult};
use crate::models::{ExonKey, ExpressionRow, GeneInfo};

#[derive(Default)]
pub struct InMemorySequenceProvider {
    sequences: HashMap<String, String>,
    genes: HashMap<String, GeneInfo>,
}

impl InMemorySequenceProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_exon(mut self, gene_id: &str, exon_number: usize, sequence: &str) -> Self {
        self.sequences
            .insert(ExonKey::new(gene_id, exon_number).to_string(), sequence.to_string());
        self
    }

    pub fn with_gene(mut self, gene_id: &str, info: GeneInfo) -> Self {
        self.genes.insert(gene_id.to_string(), info);
        self
    }
}

impl SequenceProvider for InMemorySequenceProvider {
    fn sequence_for_exon(&self, exon_key: &str) -> RankerResult<String> {
        self.sequences
            .get(exon_key)
            .cloned()
            .ok_or_else(|| RankerError::MissingSequence(exon_key.to_string()))
    }

    fn gene_info(&self, gene_id: &str) -> RankerResult<GeneInfo> {
        self.genes
            .get(gene_id)
            .cloned()
            .ok_or_else(|| RankerError::UnknownGene(gene_id.to_string()))
    }
}

#[derive(Default)]
pub struct InMemoryExpressionTable {
    rows: Vec<ExpressionRow>,
}

impl InMemoryExpressionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_exon(mut self, gene_id: &str, exon_number: usize, tissues: &[(&str, f64)]) -> Self {
        self.rows.push(ExpressionRow {
            exon_key: ExonKey::new(gene_id, exon_number).to_string(),
            tissues: tissues
                .iter()
                .map(|(t, v)| (t.to_string(), *v))
                .collect::<BTreeMap<_, _>>(),
        });
        self
    }

    pub fn with_row(mut self, row: ExpressionRow) -> Self {
        self.rows.push(row);
        self
    }
}

impl ExpressionTable for InMemoryExpressionTable {
    fn rows_for_gene(&self, gene_id: &str) -> RankerResult<Vec<ExpressionRow>> {
        let prefix = format!("{gene_id}_");
        Ok(self
            .rows
            .iter()
            .filter(|r| r.exon_key.starts_with(&prefix))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_lookup_by_exon_key() {
        let provider = InMemorySequenceProvider::new().with_exon("ENSG1", 2, "ACGT");
        assert_eq!(provider.sequence_for_exon("ENSG1_2").unwrap(), "ACGT");
        assert!(matches!(
            provider.sequence_for_exon("ENSG1_3"),
            Err(RankerError::MissingSequence(_))
        ));
        assert!(matches!(provider.gene_info("ENSG1"), Err(RankerError::UnknownGene(_))));
    }

    #[test]
    fn expression_rows_do_not_leak_across_prefixes() {
        let table = InMemoryExpressionTable::new()
            .with_exon("ENSG1", 0, &[("Brain", 1.0)])
            .with_exon("ENSG10", 0, &[("Brain", 2.0)]);
        let rows = table.rows_for_gene("ENSG1").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].exon_key, "ENSG1_0");
    }
}
