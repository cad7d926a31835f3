use std::collections::HashMap;
use std::path::Path;

use tracing::{debug, info};

use crate::data_handling::{ExpressionTable, SequenceProvider};
use crate::error::{RankerError, RankerResult};
use crate::models::{ExonView, GeneExonView};
use crate::ranker::ExonRanker;

impl<S: SequenceProvider, E: ExpressionTable> ExonRanker<S, E> {
    /// Groups every accumulated guide under its gene and exon.
    ///
    /// Exons are listed in genomic order, each with its expression snapshot.
    /// Within an exon, guides keep the order in which the ranker produced them.
    /// The order of genes in the result is unspecified.
    pub fn assemble_by_exon(&self) -> RankerResult<Vec<GeneExonView>> {
        let config = self.config();
        let mut gene_to_exon: HashMap<String, GeneExonView> = HashMap::new();

        for gene in self.genes() {
            let info = self.sequences().gene_info(&gene.gene_id)?;
            if info.exon_starts.len() < info.exon_count || info.exon_ends.len() < info.exon_count {
                return Err(RankerError::InconsistentGeneInfo(gene.gene_id.clone()));
            }

            let exons = (0..info.exon_count)
                .map(|i| ExonView {
                    start: info.exon_starts[i] - info.tx_start,
                    end: info.exon_ends[i] - info.tx_start,
                    expression: self
                        .snapshot(&gene.gene_name, i)
                        .map(|s| s.display_values(&config.display_tissues, config.tissue_weighting)),
                    guides: Vec::new(),
                })
                .collect();

            gene_to_exon.insert(
                gene.gene_name.clone(),
                GeneExonView {
                    name: gene.gene_name.clone(),
                    ensembl_id: gene.gene_id.clone(),
                    length: info.tx_end - info.tx_start,
                    start: info.tx_start,
                    end: info.tx_end,
                    exons,
                },
            );
        }

        for guide in self.guides() {
            let Some(view) = gene_to_exon.get_mut(&guide.gene_name) else {
                continue;
            };
            let exon_count = view.exons.len();
            let exon = view
                .exons
                .get_mut(guide.exon_rank)
                .ok_or_else(|| RankerError::ExonOutOfRange {
                    gene: guide.gene_name.clone(),
                    exon: guide.exon_rank,
                    exon_count,
                })?;
            exon.guides.push(guide.serialize_for_display());
        }

        debug!("Assembled {} genes", gene_to_exon.len());
        Ok(gene_to_exon.into_values().collect())
    }

    /// Writes every accumulated guide as one CSV row.
    pub fn write_guides_csv(&self, path: &Path) -> RankerResult<()> {
        let mut wtr = csv::Writer::from_path(path)?;
        wtr.write_record([
            "uid", "gene_id", "gene_name", "exon", "start", "protospacer", "pam", "score", "selected",
        ])?;
        for guide in self.guides() {
            wtr.write_record([
                guide.uid(),
                guide.gene_id.clone(),
                guide.gene_name.clone(),
                guide.exon_rank.to_string(),
                guide.start.to_string(),
                guide.protospacer.clone(),
                guide.pam.clone(),
                guide.score.to_string(),
                guide.selected.to_string(),
            ])?;
        }
        wtr.flush()?;
        info!("Wrote {} guides to {}", self.guides().len(), path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::config::RankerConfig;
    use crate::error::RankerError;
    use crate::models::GeneInfo;
    use crate::prediction_tools::GuideScorer;
    use crate::ranker::tests::{config, fixtures, GcContent};
    use crate::ranker::ExonRanker;

    fn gene_info(exon_count: usize) -> GeneInfo {
        GeneInfo {
            tx_start: 1000,
            tx_end: 1000 + 300 * exon_count as i64,
            exon_count,
            exon_starts: (0..exon_count).map(|i| 1000 + 300 * i as i64).collect(),
            exon_ends: (0..exon_count).map(|i| 1200 + 300 * i as i64).collect(),
        }
    }

    fn ranked(config: RankerConfig, medians: &[f64], info: GeneInfo) -> ExonRanker<
        crate::data_handling::in_memory::InMemorySequenceProvider,
        crate::data_handling::in_memory::InMemoryExpressionTable,
    > {
        let (sequences, expression) = fixtures("ENSG6.1", medians, &[]);
        let sequences = sequences.with_gene("ENSG6.1", info);
        let mut ranker =
            ExonRanker::with_scorer(config, sequences, expression, GuideScorer::with_oracle(Box::new(GcContent)))
                .unwrap();
        ranker.rank("ENSG6.1", "SIX", 10).unwrap();
        ranker
    }

    #[test]
    fn guides_land_in_their_exon_slot() {
        let medians = [50.0, 1.0, 4.0, 2.0, 3.0, 60.0];
        let ranker = ranked(config(), &medians, gene_info(6));
        let genes = ranker.assemble_by_exon().unwrap();
        assert_eq!(genes.len(), 1);

        let gene = &genes[0];
        assert_eq!(gene.name, "SIX");
        assert_eq!(gene.ensembl_id, "ENSG6.1");
        assert_eq!((gene.start, gene.end, gene.length), (1000, 2800, 1800));
        assert_eq!(gene.exons.len(), 6);
        assert_eq!((gene.exons[2].start, gene.exons[2].end), (600, 800));

        // Boundary exons get no guides but keep their expression.
        assert!(gene.exons[0].guides.is_empty());
        assert!(gene.exons[5].guides.is_empty());
        assert!(gene.exons[0].expression.is_some());
        for exon in &gene.exons[1..5] {
            assert_eq!(exon.guides.len(), 10);
            assert!(exon.guides.iter().all(|g| g.selected));
        }
        let total: usize = gene.exons.iter().map(|e| e.guides.len()).sum();
        assert_eq!(total, ranker.guides().len());
    }

    #[test]
    fn expression_block_respects_tissue_weighting() {
        let medians = [1.0, 2.0];
        let with = ranked(config(), &medians, gene_info(2)).assemble_by_exon().unwrap();
        let expr = with[0].exons[1].expression.as_ref().unwrap();
        assert_eq!(expr.get("median"), Some(&2.0));
        assert_eq!(expr.get("heart"), Some(&2.0));
        assert_eq!(expr.get("skin"), Some(&0.0));
        assert!(expr.contains_key("overall"));
        assert!(!expr.contains_key("Heart"));

        let unweighted = RankerConfig {
            tissue_weighting: false,
            ..config()
        };
        let without = ranked(unweighted, &medians, gene_info(2)).assemble_by_exon().unwrap();
        assert!(!without[0].exons[1].expression.as_ref().unwrap().contains_key("median"));
    }

    #[test]
    fn exons_without_expression_rows_have_no_block() {
        let ranker = ranked(config(), &[1.0, 2.0], gene_info(3));
        let genes = ranker.assemble_by_exon().unwrap();
        assert!(genes[0].exons[2].expression.is_none());

        let json = serde_json::to_value(&genes[0]).unwrap();
        assert!(json["exons"][2].get("expression").is_none());
        assert!(json.get("ensemblId").is_some());
        assert_eq!(json["exons"][0]["guides"][0]["PAM"], "AGG");
    }

    #[test]
    fn guides_outside_the_gene_layout_are_an_error() {
        let ranker = ranked(config(), &[1.0, 2.0, 3.0], gene_info(2));
        assert!(matches!(
            ranker.assemble_by_exon(),
            Err(RankerError::ExonOutOfRange { exon: 2, .. })
        ));
    }

    #[test]
    fn short_coordinate_lists_are_rejected() {
        let mut info = gene_info(3);
        info.exon_ends.pop();
        let ranker = ranked(config(), &[1.0, 2.0, 3.0], info);
        assert!(matches!(
            ranker.assemble_by_exon(),
            Err(RankerError::InconsistentGeneInfo(_))
        ));
    }

    #[test]
    fn csv_export_has_one_row_per_guide() {
        let ranker = ranked(config(), &[1.0, 2.0], gene_info(2));
        let file = tempfile::NamedTempFile::new().unwrap();
        ranker.write_guides_csv(file.path()).unwrap();

        let mut rdr = csv::Reader::from_path(file.path()).unwrap();
        let headers = rdr.headers().unwrap().clone();
        assert_eq!(headers.get(0), Some("uid"));
        let rows: Vec<csv::StringRecord> = rdr.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), ranker.guides().len());
        assert_eq!(rows[0].get(0), Some("customLibrary_guide0000"));
        assert_eq!(rows[0].get(2), Some("SIX"));
        assert_eq!(rows[0].get(8), Some("true"));
    }
}
