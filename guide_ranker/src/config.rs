use std::collections::BTreeSet;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::RankerResult;

/// Length of the window handed to the scoring oracles (4 + 20-mer + PAM + 3).
pub const SCORING_WINDOW_LEN: usize = 30;

/// Upper bound on exons analyzed deeply when expression prioritization is on.
pub const MAX_PRIORITIZED_EXONS: usize = 4;

/// Genes with more exons than this lose their first and last exon before ranking.
pub const BOUNDARY_TRIM_THRESHOLD: usize = 4;

/// Guides kept per exon during the shallow pass.
pub const MIN_GUIDES_PER_EXON: usize = 10;

/// Where the protospacer sits relative to the PAM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    /// Protospacer upstream of the PAM (SpCas9 style).
    #[default]
    Prime5,
    /// Protospacer downstream of the PAM (Cas12a style).
    Prime3,
}

/// How the deep-analysis `quantity` is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuotaScope {
    /// Every deep exon gets its own top-`quantity` selector, drained right after the scan.
    #[default]
    PerExon,
    /// One top-`quantity` selector is shared by all deep exons of a gene and drained
    /// once the deep pass is over.
    PerGene,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ScoringAlgorithm {
    Doench,
    TkoPssm,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankerConfig {
    pub pam: String,
    pub orientation: Orientation,
    pub protospacer_len: usize,
    pub scoring_algorithms: BTreeSet<ScoringAlgorithm>,
    /// Tissues whose median drives exon prioritization.
    pub tissues: Vec<String>,
    pub expression_prioritization: bool,
    /// When off, the cross-tissue `median` is left out of the display output.
    pub tissue_weighting: bool,
    pub quota_scope: QuotaScope,
    pub display_tissues: Vec<String>,
}

impl Default for RankerConfig {
    fn default() -> Self {
        Self {
            pam: "NGG".to_string(),
            orientation: Orientation::Prime5,
            protospacer_len: 20,
            scoring_algorithms: BTreeSet::from([ScoringAlgorithm::Doench]),
            tissues: Vec::new(),
            expression_prioritization: true,
            tissue_weighting: true,
            quota_scope: QuotaScope::PerExon,
            display_tissues: ["Brain", "Heart", "Kidney", "Liver", "Skin"]
                .iter()
                .map(|t| t.to_string())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneRequest {
    pub ensembl_gene: String,
    pub name: String,
}

/// Everything the binary needs for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub expression_path: String,
    pub genes: Vec<GeneRequest>,
    /// Total guide budget, split evenly across `genes`.
    #[serde(default = "default_quantity")]
    pub quantity: usize,
    #[serde(default = "default_output_path")]
    pub output_path: String,
    #[serde(default)]
    pub guides_csv_path: Option<String>,
    #[serde(default = "default_ensembl_base_url")]
    pub ensembl_base_url: String,
    #[serde(default)]
    pub ranker: RankerConfig,
}

fn default_quantity() -> usize {
    60
}

fn default_output_path() -> String {
    "./guides_by_exon.json".to_string()
}

fn default_ensembl_base_url() -> String {
    "https://rest.ensembl.org".to_string()
}

impl RunConfig {
    pub fn from_path(path: &Path) -> RankerResult<Self> {
        info!("Reading run configuration from {}", path.display());
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn quantity_per_gene(&self) -> usize {
        if self.genes.is_empty() {
            return 0;
        }
        self.quantity / self.genes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn ranker_defaults_match_cas9_setup() {
        let config = RankerConfig::default();
        assert_eq!(config.pam, "NGG");
        assert_eq!(config.orientation, Orientation::Prime5);
        assert_eq!(config.protospacer_len, 20);
        assert!(config.scoring_algorithms.contains(&ScoringAlgorithm::Doench));
        assert_eq!(config.quota_scope, QuotaScope::PerExon);
    }

    #[test]
    fn run_config_fills_missing_fields() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "expression_path": "expr.csv",
                "genes": [
                    {{"ensembl_gene": "ENSG00000115977.14", "name": "AAK1"}},
                    {{"ensembl_gene": "ENSG00000142168.10", "name": "SOD1"}}
                ],
                "ranker": {{"tissues": ["Muscle", "Heart"], "orientation": "prime3"}}
            }}"#
        )
        .unwrap();

        let config = RunConfig::from_path(file.path()).unwrap();
        assert_eq!(config.quantity, 60);
        assert_eq!(config.quantity_per_gene(), 30);
        assert_eq!(config.ensembl_base_url, "https://rest.ensembl.org");
        assert_eq!(config.ranker.orientation, Orientation::Prime3);
        assert_eq!(config.ranker.tissues, vec!["Muscle", "Heart"]);
        assert_eq!(config.ranker.pam, "NGG");
    }
}
