use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::error::{RankerError, RankerResult};
use crate::helper_functions::median;

const UID_PREFIX: &str = "customLibrary_guide";

/// A scored, positioned guide site inside one exon of one gene.
#[derive(Debug, Clone, PartialEq)]
pub struct GuideCandidate {
    pub id: u64,
    /// Protospacer start within the (strand-relative) exon sequence.
    pub start: i64,
    pub protospacer: String,
    pub pam: String,
    pub score: f64,
    /// Position of the exon in the gene's genomic exon list.
    pub exon_rank: usize,
    pub gene_id: String,
    pub gene_name: String,
    /// Produced by the deep (top-K) pass rather than the shallow minimum pass.
    pub selected: bool,
}

impl GuideCandidate {
    pub fn uid(&self) -> String {
        format!("{UID_PREFIX}{:04}", self.id)
    }

    pub fn serialize_for_display(&self) -> GuideDisplay {
        GuideDisplay {
            score: self.score,
            start: self.start,
            seq: self.protospacer.clone(),
            pam: self.pam.clone(),
            selected: self.selected,
            uid: self.uid(),
        }
    }
}

/// The only guide fields exposed to consumers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GuideDisplay {
    pub score: f64,
    pub start: i64,
    pub seq: String,
    #[serde(rename = "PAM")]
    pub pam: String,
    pub selected: bool,
    pub uid: String,
}

/// Hands out guide ids for one ranking run. Ids are never reused.
#[derive(Debug, Default)]
pub struct GuideIdGenerator {
    next: u64,
}

impl GuideIdGenerator {
    pub fn next_id(&mut self) -> u64 {
        let id = self.next;
        self.next += 1;
        id
    }
}

/// `<gene id>_<exon number>`, e.g. `ENSG00000000971.11_21`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExonKey {
    pub gene_id: String,
    pub exon_number: usize,
}

impl ExonKey {
    pub fn new(gene_id: &str, exon_number: usize) -> Self {
        Self {
            gene_id: gene_id.to_string(),
            exon_number,
        }
    }

    pub fn parse(key: &str) -> RankerResult<Self> {
        let (gene_id, exon) = key
            .rsplit_once('_')
            .ok_or_else(|| RankerError::InvalidExonKey(key.to_string()))?;
        let exon_number = exon
            .parse::<usize>()
            .map_err(|_| RankerError::InvalidExonKey(key.to_string()))?;
        if gene_id.is_empty() {
            return Err(RankerError::InvalidExonKey(key.to_string()));
        }
        Ok(Self::new(gene_id, exon_number))
    }
}

impl fmt::Display for ExonKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.gene_id, self.exon_number)
    }
}

/// One exon row of the expression table.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpressionRow {
    pub exon_key: String,
    pub tissues: BTreeMap<String, f64>,
}

/// Per-exon expression values plus the two derived medians.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpressionSnapshot {
    pub tissues: BTreeMap<String, f64>,
    /// Median across the selected tissue subset.
    pub median: f64,
    /// Median across every tissue.
    pub overall: f64,
}

impl ExpressionSnapshot {
    /// An empty `selected_tissues` selects every tissue.
    pub fn from_row(row: &ExpressionRow, selected_tissues: &[String]) -> Self {
        let all: Vec<f64> = row.tissues.values().copied().collect();
        let overall = median(&all);
        let subset_median = if selected_tissues.is_empty() {
            overall
        } else {
            let selected: Vec<f64> = selected_tissues
                .iter()
                .filter_map(|t| row.tissues.get(t).copied())
                .collect();
            median(&selected)
        };
        Self {
            tissues: row.tissues.clone(),
            median: subset_median,
            overall,
        }
    }

    /// Flat map for the display layer. Tissue names are lower-cased.
    pub fn display_values(&self, display_tissues: &[String], include_median: bool) -> BTreeMap<String, f64> {
        let mut values = BTreeMap::new();
        values.insert("overall".to_string(), self.overall);
        if include_median {
            values.insert("median".to_string(), self.median);
        }
        for tissue in display_tissues {
            if let Some(value) = self.tissues.get(tissue) {
                values.insert(tissue.to_lowercase(), *value);
            }
        }
        values
    }
}

/// Structural metadata for a gene. Coordinates are 0-based genomic positions.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneInfo {
    pub tx_start: i64,
    pub tx_end: i64,
    pub exon_count: usize,
    pub exon_starts: Vec<i64>,
    pub exon_ends: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneExonView {
    pub name: String,
    #[serde(rename = "ensemblId")]
    pub ensembl_id: String,
    pub length: i64,
    pub start: i64,
    pub end: i64,
    pub exons: Vec<ExonView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExonView {
    /// Relative to the transcript start.
    pub start: i64,
    pub end: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expression: Option<BTreeMap<String, f64>>,
    pub guides: Vec<GuideDisplay>,
}
