//! PSSM (Position-Specific Scoring Matrix) based gRNA prediction from the TKO library design.

use tracing::debug;

use crate::prediction_tools::ScoringOracle;

/// Scoring matrix for nucleotides at each position (1-indexed)
/// Format: [nucleotide][position] where nucleotide: 0=A, 1=C, 2=G, 3=T
pub const NUCLEOTIDE_SCORES: [[f64; 21]; 4] = [
    // A (position 1-20, plus a dummy 0 index since we're 1-indexed)
    [0.0, 0.322, 0.409, 0.324, 0.072, 0.039, 0.143, 0.178, -0.013, 0.439, 0.458, 0.318, 0.254, -0.242, 0.291, 0.106, 0.151, -0.191, -0.673, -0.523, 0.048],
    // C
    [0.0, -0.776, -0.131, -0.5, -0.143, -0.059, -0.079, 0.017, 0.03, -0.245, -0.092, -0.107, 0.174, 0.509, -0.163, -0.108, 0.366, 0.177, 1.0, 0.075, -0.631],
    // G
    [0.0, 0.281, -0.103, 0.088, 0.437, 0.11, 0.344, 0.169, 0.003, 0.013, 0.103, 0.052, -0.431, -0.056, -0.585, -0.223, -0.377, 0.012, -0.326, 0.442, 0.584],
    // T
    [0.0, 0.172, -0.174, 0.087, -0.367, -0.207, -0.402, -0.365, -0.014, -0.206, -0.468, -0.258, 0.006, -0.209, 0.461, 0.227, -0.144, -1.0, -1.0, -1.0, -1.0],
];

// Sums of the worst/best entry at each position.
const MIN_POSSIBLE_SCORE: f64 = -6.798;
const MAX_POSSIBLE_SCORE: f64 = 6.534;

/// Protospacer bases inside the 30-mer scoring window.
const PROTOSPACER_IN_WINDOW: std::ops::Range<usize> = 4..24;

pub struct TkoPssm;

/// Maps nucleotide characters to their index in the NUCLEOTIDE_SCORES array
pub fn get_nucleotide_index(nucleotide: char) -> Option<usize> {
    match nucleotide {
        'A' | 'a' => Some(0),
        'C' | 'c' => Some(1),
        'G' | 'g' => Some(2),
        'T' | 't' => Some(3),
        _ => None,
    }
}

/// Raw PSSM score of a 20nt protospacer, `None` for a wrong length or a non-ACGT base.
pub fn calculate_pssm_score(guide_sequence: &str) -> Option<f64> {
    if guide_sequence.len() != 20 {
        debug!("Guide sequence must be 20nt long, got {}nt", guide_sequence.len());
        return None;
    }

    let mut score = 0.0;
    for (pos, nucleotide) in guide_sequence.chars().enumerate() {
        let position = pos + 1;
        let nucleotide_idx = get_nucleotide_index(nucleotide)?;
        score += NUCLEOTIDE_SCORES[nucleotide_idx][position];
    }

    Some(score)
}

/// Normalize a raw PSSM score to the 0-100 range
pub fn normalize_score(raw_score: f64) -> f64 {
    let normalized = (raw_score - MIN_POSSIBLE_SCORE) / (MAX_POSSIBLE_SCORE - MIN_POSSIBLE_SCORE) * 100.0;
    normalized.clamp(0.0, 100.0)
}

impl ScoringOracle for TkoPssm {
    fn name(&self) -> &'static str {
        "TkoPssm"
    }

    /// Normalized PSSM score of the window's 20-mer, on the same 0-1 scale as Doench.
    fn score(&self, window: &str) -> f64 {
        window
            .get(PROTOSPACER_IN_WINDOW)
            .and_then(calculate_pssm_score)
            .map(|raw| normalize_score(raw) / 100.0)
            .unwrap_or(0.0)
    }
}
