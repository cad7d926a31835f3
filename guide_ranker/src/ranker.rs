//! Exon prioritization and bounded top-K guide selection for a gene.
//!
//! For each gene the ranker orders its inner exons by expression in the
//! configured tissues, runs a deep top-`quantity` selection over the leading
//! exons and then a shallow pass that keeps up to
//! [`MIN_GUIDES_PER_EXON`](crate::config::MIN_GUIDES_PER_EXON) guides from every
//! remaining exon. Guides from all genes accumulate in the ranker until
//! [`assemble_by_exon`](ExonRanker::assemble_by_exon) groups them for display.

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, info, warn};

use crate::config::{
    QuotaScope, RankerConfig, BOUNDARY_TRIM_THRESHOLD, MAX_PRIORITIZED_EXONS, MIN_GUIDES_PER_EXON,
    SCORING_WINDOW_LEN,
};
use crate::data_handling::{ExpressionTable, SequenceProvider};
use crate::error::RankerResult;
use crate::models::{ExonKey, ExpressionSnapshot, GuideCandidate, GuideIdGenerator};
use crate::prediction_tools::GuideScorer;
use crate::scanning::{scan_exon, site_selector, SiteHit, SiteLayout, SiteSelector};

/// A gene handed to [`ExonRanker::rank`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedGene {
    pub gene_id: String,
    pub gene_name: String,
}

/// An exon eligible for guide generation.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct CandidateExon {
    pub key: String,
    pub exon_number: usize,
    pub median: f64,
}

/// Drops the first and last exon (genomic order) of genes with more than
/// [`BOUNDARY_TRIM_THRESHOLD`] exons, then orders the rest by median
/// expression, highest first. Equal medians keep genomic order.
pub(crate) fn prioritize_exons(mut exons: Vec<CandidateExon>) -> Vec<CandidateExon> {
    exons.sort_by_key(|e| e.exon_number);
    if exons.len() > BOUNDARY_TRIM_THRESHOLD {
        exons.pop();
        exons.remove(0);
    }
    let key = |m: f64| if m.is_nan() { f64::NEG_INFINITY } else { m };
    exons.sort_by(|a, b| key(b.median).total_cmp(&key(a.median)));
    exons
}

pub struct ExonRanker<S, E> {
    config: RankerConfig,
    layout: SiteLayout,
    scorer: GuideScorer,
    sequences: S,
    expression: E,
    ids: GuideIdGenerator,
    genes: Vec<TrackedGene>,
    guides: Vec<GuideCandidate>,
    selected_count: usize,
    /// gene name -> exon number -> snapshot
    expression_snapshots: HashMap<String, BTreeMap<usize, ExpressionSnapshot>>,
}

impl<S: SequenceProvider, E: ExpressionTable> ExonRanker<S, E> {
    /// Builds a ranker scoring with the algorithms named in `config`.
    pub fn new(config: RankerConfig, sequences: S, expression: E) -> RankerResult<Self> {
        let scorer = GuideScorer::from_algorithms(&config.scoring_algorithms);
        Self::with_scorer(config, sequences, expression, scorer)
    }

    pub fn with_scorer(
        config: RankerConfig,
        sequences: S,
        expression: E,
        scorer: GuideScorer,
    ) -> RankerResult<Self> {
        let layout = SiteLayout::from_config(&config)?;
        info!(
            "Ranker ready: PAM {} ({:?}), protospacer {}nt, scoring {:?}",
            layout.pam.motif(),
            layout.orientation,
            layout.protospacer_len,
            scorer.names()
        );
        Ok(Self {
            config,
            layout,
            scorer,
            sequences,
            expression,
            ids: GuideIdGenerator::default(),
            genes: Vec::new(),
            guides: Vec::new(),
            selected_count: 0,
            expression_snapshots: HashMap::new(),
        })
    }

    pub fn config(&self) -> &RankerConfig {
        &self.config
    }

    pub fn genes(&self) -> &[TrackedGene] {
        &self.genes
    }

    pub fn guides(&self) -> &[GuideCandidate] {
        &self.guides
    }

    pub fn count_selected_guides(&self) -> usize {
        self.selected_count
    }

    pub(crate) fn sequences(&self) -> &S {
        &self.sequences
    }

    pub(crate) fn snapshot(&self, gene_name: &str, exon: usize) -> Option<&ExpressionSnapshot> {
        self.expression_snapshots.get(gene_name)?.get(&exon)
    }

    /// Finds and ranks guides for one gene, adding them to the ranker's state.
    ///
    /// Not idempotent: ranking the same gene twice duplicates its guides.
    /// On error nothing about the gene is kept.
    pub fn rank(&mut self, gene_id: &str, gene_name: &str, quantity: usize) -> RankerResult<()> {
        info!("Ranking guides for {} ({}), quantity {}", gene_name, gene_id, quantity);

        let (exons, snapshots) = self.snapshot_expression(gene_id, gene_name)?;
        let ranked = prioritize_exons(exons);
        let total_exons = ranked.len();
        let exons_to_analyze = if self.config.expression_prioritization {
            MAX_PRIORITIZED_EXONS.min(total_exons)
        } else {
            total_exons
        };
        debug!(
            "{}: {} candidate exons, {} prioritized",
            gene_name, total_exons, exons_to_analyze
        );

        // (hit, selected) in the order they will be appended
        let mut pending: Vec<(SiteHit, bool)> = Vec::new();

        // Deep pass
        let mut gene_selector = match self.config.quota_scope {
            QuotaScope::PerGene => Some(site_selector(quantity)),
            QuotaScope::PerExon => None,
        };
        let mut deep_retained = 0;
        let mut i = 0;
        while i < total_exons {
            let pool = gene_selector.as_ref().map_or(deep_retained, |s| s.len());
            if i >= exons_to_analyze && pool >= quantity {
                break;
            }
            let exon = &ranked[i];
            i += 1;
            let Some(sequence) = self.exon_sequence(exon)? else {
                continue;
            };
            match gene_selector.as_mut() {
                Some(selector) => {
                    scan_exon(&sequence, exon.exon_number, &self.layout, &self.scorer, selector);
                }
                None => {
                    let mut selector = site_selector(quantity);
                    scan_exon(&sequence, exon.exon_number, &self.layout, &self.scorer, &mut selector);
                    deep_retained += drain_into(&mut selector, &mut pending, true);
                }
            }
        }
        if let Some(mut selector) = gene_selector {
            deep_retained += drain_into(&mut selector, &mut pending, true);
        }

        // Shallow pass
        let mut shallow_retained = 0;
        for exon in &ranked[i..] {
            let Some(sequence) = self.exon_sequence(exon)? else {
                continue;
            };
            let mut selector = site_selector(MIN_GUIDES_PER_EXON);
            scan_exon(&sequence, exon.exon_number, &self.layout, &self.scorer, &mut selector);
            shallow_retained += drain_into(&mut selector, &mut pending, false);
        }

        info!("{}: {} guides selected from {} deep exons", gene_name, deep_retained, i);
        if i < total_exons {
            info!(
                "{}: {} fallback guides from {} remaining exons",
                gene_name,
                shallow_retained,
                total_exons - i
            );
        }

        self.genes.push(TrackedGene {
            gene_id: gene_id.to_string(),
            gene_name: gene_name.to_string(),
        });
        self.expression_snapshots.insert(gene_name.to_string(), snapshots);
        self.selected_count += deep_retained;
        for (hit, selected) in pending {
            self.guides.push(GuideCandidate {
                id: self.ids.next_id(),
                start: hit.start,
                protospacer: hit.protospacer,
                pam: hit.pam,
                score: hit.score,
                exon_rank: hit.exon_rank,
                gene_id: gene_id.to_string(),
                gene_name: gene_name.to_string(),
                selected,
            });
        }
        Ok(())
    }

    /// Builds an expression snapshot for every exon of the gene along with the
    /// exons as ranking candidates.
    fn snapshot_expression(
        &self,
        gene_id: &str,
        gene_name: &str,
    ) -> RankerResult<(Vec<CandidateExon>, BTreeMap<usize, ExpressionSnapshot>)> {
        let rows = self.expression.rows_for_gene(gene_id)?;
        if rows.is_empty() {
            warn!("No expression rows for {} ({})", gene_name, gene_id);
        }

        let mut snapshots = BTreeMap::new();
        let mut exons = Vec::with_capacity(rows.len());
        for row in &rows {
            let key = ExonKey::parse(&row.exon_key)?;
            let snapshot = ExpressionSnapshot::from_row(row, &self.config.tissues);
            exons.push(CandidateExon {
                key: row.exon_key.clone(),
                exon_number: key.exon_number,
                median: snapshot.median,
            });
            snapshots.insert(key.exon_number, snapshot);
        }
        Ok((exons, snapshots))
    }

    /// The exon's sequence, or `None` when it is too short to score.
    fn exon_sequence(&self, exon: &CandidateExon) -> RankerResult<Option<String>> {
        let sequence = self.sequences.sequence_for_exon(&exon.key)?;
        if self.scorer.is_enabled() && sequence.len() < SCORING_WINDOW_LEN {
            debug!(
                "Skipping exon {}: {}nt is shorter than the scoring window",
                exon.key,
                sequence.len()
            );
            return Ok(None);
        }
        Ok(Some(sequence))
    }
}

/// Moves the selector's hits to the end of `pending`, lowest score first.
fn drain_into(selector: &mut SiteSelector, pending: &mut Vec<(SiteHit, bool)>, selected: bool) -> usize {
    let hits = selector.drain_ascending();
    let retained = hits.len();
    pending.extend(hits.into_iter().map(|hit| (hit, selected)));
    retained
}
