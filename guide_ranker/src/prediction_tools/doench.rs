use crate::prediction_tools::ScoringOracle;

/// Doench et al. 2014 ("Rule Set 1") on-target model for SpCas9.
///
/// Logistic regression over the 30-mer: position-specific single and
/// di-nucleotide weights plus a penalty on the GC count of the 20-mer.
pub struct DoenchRuleSet1;

const INTERCEPT: f64 = 0.597636154;
const GC_LOW: f64 = -0.202625894;
const GC_HIGH: f64 = -0.166587752;

/// (0-based position, nucleotide, weight)
const SINGLE_WEIGHTS: [(usize, u8, f64); 39] = [
    (1, b'G', -0.275377128),
    (2, b'A', -0.323887456),
    (2, b'C', 0.172128871),
    (3, b'C', -0.100666209),
    (4, b'C', -0.20180294),
    (4, b'G', 0.245956633),
    (5, b'A', 0.036440041),
    (5, b'C', 0.098376835),
    (6, b'C', -0.741181291),
    (6, b'G', -0.393264397),
    (11, b'A', -0.466099015),
    (14, b'A', 0.085376945),
    (14, b'C', -0.013813972),
    (15, b'A', 0.272620512),
    (15, b'C', -0.119022648),
    (15, b'T', -0.285944222),
    (16, b'A', 0.097454592),
    (16, b'G', -0.17554617),
    (17, b'C', -0.345795451),
    (17, b'G', -0.678096426),
    (18, b'A', 0.22508903),
    (18, b'C', -0.507794051),
    (19, b'G', -0.417373597),
    (19, b'T', -0.054306959),
    (20, b'G', 0.379899366),
    (20, b'T', -0.090712644),
    (21, b'C', 0.057823319),
    (21, b'T', -0.530567296),
    (22, b'T', -0.877007428),
    (23, b'C', -0.876235846),
    (23, b'G', 0.278916259),
    (23, b'T', -0.403102218),
    (24, b'A', -0.077300704),
    (24, b'C', 0.287935617),
    (24, b'T', -0.221637217),
    (27, b'G', -0.689016682),
    (27, b'T', 0.117877577),
    (28, b'C', -0.160445304),
    (29, b'G', 0.386342585),
];

/// (0-based position of the first base, di-nucleotide, weight)
const DINUC_WEIGHTS: [(usize, &[u8; 2], f64); 31] = [
    (1, b"GT", -0.625778696),
    (4, b"GC", 0.300043317),
    (5, b"AA", -0.834836245),
    (5, b"TA", 0.760627772),
    (6, b"GG", -0.490816749),
    (11, b"GG", -1.516907439),
    (11, b"TA", 0.7092612),
    (11, b"TC", 0.496298609),
    (11, b"TT", -0.586873894),
    (12, b"GG", -0.334563735),
    (13, b"GA", 0.76384993),
    (13, b"GC", -0.53702517),
    (16, b"TG", -0.798146133),
    (18, b"GG", -0.66680873),
    (18, b"TC", 0.353183252),
    (19, b"CC", 0.748072092),
    (19, b"TG", -0.367266772),
    (20, b"AC", 0.568209132),
    (20, b"CG", 0.329072074),
    (20, b"GA", -0.836456755),
    (20, b"GG", -0.782207584),
    (21, b"TC", -1.029692957),
    (22, b"CG", 0.856197823),
    (22, b"CT", -0.463207679),
    (23, b"AA", -0.579492389),
    (23, b"AG", 0.649075537),
    (24, b"AG", -0.077300704),
    (24, b"CG", 0.287935617),
    (24, b"TG", -0.221637217),
    (26, b"GT", 0.117877577),
    (28, b"GG", -0.697740024),
];

impl DoenchRuleSet1 {
    fn logit(window: &[u8]) -> f64 {
        let mut score = INTERCEPT;

        let gc = window[4..24]
            .iter()
            .filter(|b| matches!(b, b'G' | b'C'))
            .count() as f64;
        if gc < 10.0 {
            score += (10.0 - gc) * GC_LOW;
        } else if gc > 10.0 {
            score += (gc - 10.0) * GC_HIGH;
        }

        for &(pos, nuc, weight) in SINGLE_WEIGHTS.iter() {
            if window[pos] == nuc {
                score += weight;
            }
        }
        for &(pos, dinuc, weight) in DINUC_WEIGHTS.iter() {
            if &window[pos..pos + 2] == dinuc {
                score += weight;
            }
        }
        score
    }
}

impl ScoringOracle for DoenchRuleSet1 {
    fn name(&self) -> &'static str {
        "Doench"
    }

    fn score(&self, window: &str) -> f64 {
        if window.len() != 30 {
            return 0.0;
        }
        let upper = window.to_ascii_uppercase();
        let logit = Self::logit(upper.as_bytes());
        1.0 / (1.0 + (-logit).exp())
    }
}
