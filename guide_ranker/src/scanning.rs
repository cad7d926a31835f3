//! PAM discovery and candidate extraction on both strands of an exon.

use std::cmp::Ordering;

use regex::bytes::Regex;
use tracing::debug;

use crate::config::{Orientation, RankerConfig, SCORING_WINDOW_LEN};
use crate::error::{RankerError, RankerResult};
use crate::helper_functions::reverse_complement;
use crate::prediction_tools::GuideScorer;
use crate::top_k::BoundedTopK;

/// A fixed-length PAM motif written in IUPAC codes, e.g. `NGG` or `TTTV`.
#[derive(Debug, Clone)]
pub struct PamPattern {
    motif: String,
    regex: Regex,
}

fn iupac_class(code: char) -> Option<&'static str> {
    let class = match code {
        'A' => "A",
        'C' => "C",
        'G' => "G",
        'T' => "T",
        'N' => "[ACGT]",
        'R' => "[AG]",
        'Y' => "[CT]",
        'S' => "[CG]",
        'W' => "[AT]",
        'K' => "[GT]",
        'M' => "[AC]",
        'B' => "[CGT]",
        'D' => "[AGT]",
        'H' => "[ACT]",
        'V' => "[ACG]",
        _ => return None,
    };
    Some(class)
}

impl PamPattern {
    pub fn new(motif: &str) -> RankerResult<Self> {
        let motif = motif.trim().to_uppercase();
        if motif.is_empty() {
            return Err(RankerError::InvalidPam(motif));
        }
        let mut pattern = String::from("^");
        for code in motif.chars() {
            let class = iupac_class(code).ok_or_else(|| RankerError::InvalidPam(motif.clone()))?;
            pattern.push_str(class);
        }
        let regex = Regex::new(&pattern)?;
        Ok(Self { motif, regex })
    }

    pub fn motif(&self) -> &str {
        &self.motif
    }

    pub fn len(&self) -> usize {
        self.motif.len()
    }

    pub fn is_empty(&self) -> bool {
        self.motif.is_empty()
    }

    /// Every PAM start in `seq`, overlapping matches included.
    pub fn find_all(&self, seq: &[u8]) -> Vec<usize> {
        let pam_len = self.len();
        if seq.len() < pam_len {
            return Vec::new();
        }
        (0..=seq.len() - pam_len)
            .filter(|&i| self.regex.is_match(&seq[i..i + pam_len]))
            .collect()
    }
}

/// PAM motif plus where the protospacer sits relative to it.
#[derive(Debug, Clone)]
pub struct SiteLayout {
    pub pam: PamPattern,
    pub orientation: Orientation,
    pub protospacer_len: usize,
}

impl SiteLayout {
    pub fn from_config(config: &RankerConfig) -> RankerResult<Self> {
        Ok(Self {
            pam: PamPattern::new(&config.pam)?,
            orientation: config.orientation,
            protospacer_len: config.protospacer_len,
        })
    }

    /// Protospacer start, protospacer and PAM for a PAM found at `pam_start`,
    /// or `None` when the site runs off either end of the sequence.
    fn extract(&self, seq: &[u8], pam_start: usize) -> Option<(i64, String, String)> {
        let pam_len = self.pam.len();
        let proto_len = self.protospacer_len;
        let pam_end = pam_start + pam_len;

        let protospacer = match self.orientation {
            Orientation::Prime5 => {
                if pam_start < proto_len || pam_end > seq.len() {
                    return None;
                }
                &seq[pam_start - proto_len..pam_start]
            }
            Orientation::Prime3 => {
                if pam_end + proto_len > seq.len() {
                    return None;
                }
                &seq[pam_end..pam_end + proto_len]
            }
        };
        let pam = &seq[pam_start..pam_end];
        Some((
            pam_start as i64 - proto_len as i64,
            String::from_utf8_lossy(protospacer).into_owned(),
            String::from_utf8_lossy(pam).into_owned(),
        ))
    }

    /// The 30-mer around the PAM (4 upstream of the protospacer, 3 past the PAM).
    /// Truncated windows yield `None`.
    fn scoring_window<'a>(&self, seq: &'a [u8], pam_start: usize) -> Option<&'a [u8]> {
        let lead = self.protospacer_len + 4;
        let end = pam_start + self.pam.len() + 3;
        if pam_start < lead || end > seq.len() {
            return None;
        }
        let window = &seq[pam_start - lead..end];
        (window.len() == SCORING_WINDOW_LEN).then_some(window)
    }
}

/// One candidate site before it becomes a [`crate::models::GuideCandidate`].
#[derive(Debug, Clone, PartialEq)]
pub struct SiteHit {
    pub exon_rank: usize,
    pub start: i64,
    pub protospacer: String,
    pub pam: String,
    pub score: f64,
}

pub fn by_score(a: &SiteHit, b: &SiteHit) -> Ordering {
    a.score.total_cmp(&b.score)
}

pub type SiteSelector = BoundedTopK<SiteHit, fn(&SiteHit, &SiteHit) -> Ordering>;

pub fn site_selector(capacity: usize) -> SiteSelector {
    BoundedTopK::new(capacity, by_score as fn(&SiteHit, &SiteHit) -> Ordering)
}

fn scan_strand(
    seq: &[u8],
    exon_rank: usize,
    layout: &SiteLayout,
    scorer: &GuideScorer,
    selector: &mut SiteSelector,
) -> usize {
    let mut found = 0;
    for pam_start in layout.pam.find_all(seq) {
        let Some((start, protospacer, pam)) = layout.extract(seq, pam_start) else {
            continue;
        };
        let score = match layout.scoring_window(seq, pam_start) {
            Some(window) if scorer.is_enabled() => scorer.score(&String::from_utf8_lossy(window)),
            _ => 0.0,
        };
        found += 1;
        selector.push(SiteHit {
            exon_rank,
            start,
            protospacer,
            pam,
            score,
        });
    }
    found
}

/// Scans `sequence` and its reverse complement, offering every valid site to `selector`.
///
/// Returns the number of sites offered. Which of them survive is up to the
/// selector's capacity.
pub fn scan_exon(
    sequence: &str,
    exon_rank: usize,
    layout: &SiteLayout,
    scorer: &GuideScorer,
    selector: &mut SiteSelector,
) -> usize {
    let forward = sequence.to_ascii_uppercase();
    let reverse = reverse_complement(&forward);

    let on_forward = scan_strand(forward.as_bytes(), exon_rank, layout, scorer, selector);
    let on_reverse = scan_strand(reverse.as_bytes(), exon_rank, layout, scorer, selector);
    debug!(
        "Exon {}: {} sites on forward strand, {} on reverse, {} retained",
        exon_rank,
        on_forward,
        on_reverse,
        selector.len()
    );
    on_forward + on_reverse
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prediction_tools::ScoringOracle;

    fn layout(pam: &str, orientation: Orientation, protospacer_len: usize) -> SiteLayout {
        SiteLayout {
            pam: PamPattern::new(pam).unwrap(),
            orientation,
            protospacer_len,
        }
    }

    struct GcContent;

    impl ScoringOracle for GcContent {
        fn name(&self) -> &'static str {
            "gc"
        }
        fn score(&self, window: &str) -> f64 {
            window.chars().filter(|c| matches!(c, 'G' | 'C')).count() as f64 / window.len() as f64
        }
    }

    #[test]
    fn pam_matches_overlap() {
        let pam = PamPattern::new("ngg").unwrap();
        assert_eq!(pam.motif(), "NGG");
        assert_eq!(pam.find_all(b"AGGGG"), vec![0, 1, 2]);
        assert!(pam.find_all(b"GG").is_empty());
    }

    #[test]
    fn iupac_codes_expand() {
        let pam = PamPattern::new("TTTV").unwrap();
        assert_eq!(pam.find_all(b"TTTATTTTTTTG"), vec![0, 8]);
    }

    #[test]
    fn bad_pam_is_rejected() {
        assert!(matches!(PamPattern::new("NGX"), Err(RankerError::InvalidPam(_))));
        assert!(matches!(PamPattern::new(""), Err(RankerError::InvalidPam(_))));
    }

    #[test]
    fn prime5_sites_need_a_full_protospacer_upstream() {
        let layout = layout("NGG", Orientation::Prime5, 5);
        // PAM hits at 1 (too close to the start) and 8.
        let seq = b"AAGGTTTCAGGTT";
        assert_eq!(layout.pam.find_all(seq), vec![1, 8]);
        assert_eq!(layout.extract(seq, 1), None);
        assert_eq!(
            layout.extract(seq, 8),
            Some((3, "GTTTC".to_string(), "AGG".to_string()))
        );
    }

    #[test]
    fn prime3_sites_need_a_full_protospacer_downstream() {
        let layout = layout("TTTV", Orientation::Prime3, 4);
        let seq = b"TTTACGTAATTTG";
        assert_eq!(layout.pam.find_all(seq), vec![0, 9]);
        assert_eq!(
            layout.extract(seq, 0),
            Some((-4, "CGTA".to_string(), "TTTA".to_string()))
        );
        assert_eq!(layout.extract(seq, 9), None);
    }

    #[test]
    fn scoring_window_requires_thirty_bases() {
        let layout = layout("NGG", Orientation::Prime5, 20);
        let seq = format!("{}AGG{}", "C".repeat(24), "TTT");
        assert_eq!(layout.scoring_window(seq.as_bytes(), 24).map(|w| w.len()), Some(30));
        let short = format!("{}AGG{}", "C".repeat(23), "TTT");
        assert_eq!(layout.scoring_window(short.as_bytes(), 23), None);
    }

    #[test]
    fn both_strands_are_scanned_and_all_sites_are_well_formed() {
        let layout = layout("NGG", Orientation::Prime5, 20);
        let scorer = GuideScorer::with_oracle(Box::new(GcContent));
        // Forward strand carries AGG sites; CCT on the forward strand gives AGG on the reverse.
        let seq = format!("{}{}", "ACGTAGGCTA".repeat(6), "TTCCTACGTA".repeat(6));
        let mut selector = site_selector(1000);
        let offered = scan_exon(&seq, 3, &layout, &scorer, &mut selector);
        let hits = selector.drain_ascending();
        assert_eq!(hits.len(), offered);
        assert!(hits.len() > 4);
        for hit in &hits {
            assert_eq!(hit.protospacer.len(), 20);
            assert_eq!(hit.pam.len(), 3);
            assert_eq!(&hit.pam[1..], "GG");
            assert_eq!(hit.exon_rank, 3);
        }
        assert!(hits.windows(2).all(|w| w[0].score <= w[1].score));
    }

    #[test]
    fn unscored_sites_default_to_zero() {
        let layout = layout("NGG", Orientation::Prime5, 20);
        let seq = "ACGTAGGCTA".repeat(6);
        let mut selector = site_selector(1000);
        scan_exon(&seq, 0, &layout, &GuideScorer::disabled(), &mut selector);
        assert!(!selector.is_empty());
        assert!(selector.drain_ascending().iter().all(|h| h.score == 0.0));
    }

    #[test]
    fn selector_caps_the_scan() {
        let layout = layout("NGG", Orientation::Prime5, 20);
        let scorer = GuideScorer::with_oracle(Box::new(GcContent));
        let seq = "ACGTAGGCTA".repeat(20);
        let mut selector = site_selector(10);
        let offered = scan_exon(&seq, 0, &layout, &scorer, &mut selector);
        assert!(offered > 10);
        assert_eq!(selector.len(), 10);
    }
}
