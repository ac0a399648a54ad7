//! A tiny implementation of a finite-context model over the DNA alphabet.
//! A model of order `k` is trained once on a reference sequence and is
//! immutable afterwards; it exposes only the [constructor](FiniteContextModel::new),
//! [the bit estimate](FiniteContextModel::estimate_bits) -- the number of bits an
//! arithmetic coder driven by this model would spend on a query -- and the
//! normalized score [nrc](FiniteContextModel::nrc). As a shorthand for the long
//! name, I also supply [FCM] as an alias for [FiniteContextModel].
#[macro_use]
extern crate log;
pub mod table;
pub use table::ContextTable;

/// The four-symbol alphabet every model is defined over.
pub const ALPHABET: [u8; 4] = *b"ACGT";

pub type FCM = FiniteContextModel;

/// A k-order Markov model: for each length-k context seen in the
/// reference, the counts of the bases that followed it.
#[derive(Debug, Clone)]
pub struct FiniteContextModel {
    table: ContextTable,
    k: usize,
    alpha: f64,
}

impl FiniteContextModel {
    /// Train a model of order `k` on `text` with smoothing constant
    /// `alpha`. A reference shorter than `k + 1` bases yields an empty
    /// model, which is a valid state: it scores every query as degenerate.
    pub fn new(text: &[u8], k: usize, alpha: f64) -> Self {
        Self::with_table(ContextTable::new(k), text, alpha)
    }
    /// Same, but with an explicit initial table capacity.
    pub fn with_capacity(text: &[u8], k: usize, alpha: f64, capacity: usize) -> Self {
        Self::with_table(ContextTable::with_capacity(k, capacity), text, alpha)
    }
    fn with_table(mut table: ContextTable, text: &[u8], alpha: f64) -> Self {
        assert!(alpha > 0., "alpha must be positive");
        let k = table.context_length();
        for window in text.windows(k + 1) {
            table.increment(&window[..k], window[k]);
        }
        debug!(
            "Model trained. {} contexts from {} windows.",
            table.len(),
            text.len().saturating_sub(k)
        );
        Self { table, k, alpha }
    }
    pub fn order(&self) -> usize {
        self.k
    }
    pub fn table(&self) -> &ContextTable {
        &self.table
    }
    /// Total bits to encode `text` with this model: the sum of
    /// -log2 p(base|context) over every window, where p is the count
    /// ratio under additive smoothing. Unseen contexts fall back to the
    /// uniform `alpha / (4 alpha)`, so the estimate is always finite.
    pub fn estimate_bits(&self, text: &[u8]) -> f64 {
        let const_term = self.alpha * ALPHABET.len() as f64;
        let mut sum = 0.;
        for window in text.windows(self.k + 1) {
            let (count, total) = self.table.get(&window[..self.k], window[self.k]);
            sum += ((f64::from(count) + self.alpha) / (f64::from(total) + const_term)).ln();
        }
        -sum / std::f64::consts::LN_2
    }
    /// Normalized relative compression of `text` against this model:
    /// the bit estimate divided by `len * log2(4)`, the cost of storing
    /// the sequence raw. Lower means more similar to the reference. The
    /// alphabet term is the model's, never the query's, so scores are
    /// comparable across queries. A query with `len <= k` has no window
    /// to score, and an untrained model ranks nothing; both degenerate
    /// to 0.
    pub fn nrc(&self, text: &[u8]) -> f64 {
        if text.len() <= self.k || self.table.is_empty() {
            return 0.;
        }
        self.estimate_bits(text) / (text.len() as f64 * (ALPHABET.len() as f64).log2())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::seq::SliceRandom;
    use rand::{rngs::StdRng, Rng, SeedableRng};
    #[test]
    fn trained_counts() {
        // "ACGTACGTACGT", k=2: AC is followed by G three times, CG by T
        // three times, GT by A twice, TA by C twice.
        let model = FiniteContextModel::new(b"ACGTACGTACGT", 2, 1.);
        assert_eq!(model.table().len(), 4);
        assert_eq!(model.table().get(b"AC", b'G'), (3, 3));
        assert_eq!(model.table().get(b"CG", b'T'), (3, 3));
        assert_eq!(model.table().get(b"GT", b'A'), (2, 2));
        assert_eq!(model.table().get(b"TA", b'C'), (2, 2));
        assert_eq!(model.table().get(b"AC", b'A'), (0, 3));
        assert_eq!(model.table().get(b"AA", b'A'), (0, 0));
    }
    #[test]
    fn short_reference_gives_empty_model() {
        for k in 0..5 {
            let reference = &b"ACGT"[..k.min(4)];
            let model = FiniteContextModel::new(reference, k, 1.);
            assert!(model.table().is_empty());
            assert_eq!(model.nrc(b"ACG"), 0.);
            assert_eq!(model.nrc(b"ACGTACGTACGT"), 0.);
        }
    }
    #[test]
    fn short_query_degenerates() {
        let model = FiniteContextModel::new(b"ACGTACGTACGT", 4, 1.);
        assert_eq!(model.nrc(b"ACGT"), 0.);
        assert_eq!(model.nrc(b""), 0.);
    }
    #[test]
    fn self_similarity_beats_dissimilarity() {
        let model = FiniteContextModel::new(b"ACGTACGTACGT", 2, 1.);
        let own = model.nrc(b"ACGTACGTACGT");
        let far = model.nrc(b"TTTTTTTTTTTT");
        assert!(own < far, "{},{}", own, far);
        assert!(own >= 0.);
    }
    #[test]
    fn estimate_matches_hand_computation() {
        // k=0 keeps the arithmetic small: one context, p(base) =
        // (count + 1) / (total + 4).
        let model = FiniteContextModel::new(b"AACG", 0, 1.);
        let expected: f64 = -(3f64 / 8.).log2() * 4.;
        let bits = model.estimate_bits(b"AAAA");
        assert!((bits - expected).abs() < 1e-9, "{},{}", bits, expected);
    }
    #[test]
    fn resize_does_not_change_scores() {
        let mut rng: StdRng = SeedableRng::seed_from_u64(43930);
        let reference: Vec<_> = (0..2000)
            .filter_map(|_| ALPHABET.choose(&mut rng))
            .copied()
            .collect();
        let query: Vec<_> = (0..300)
            .filter_map(|_| ALPHABET.choose(&mut rng))
            .copied()
            .collect();
        let roomy = FiniteContextModel::with_capacity(&reference, 5, 1., 4096);
        let cramped = FiniteContextModel::with_capacity(&reference, 5, 1., 4);
        assert_eq!(roomy.table().len(), cramped.table().len());
        assert_eq!(roomy.estimate_bits(&query), cramped.estimate_bits(&query));
        assert_eq!(roomy.nrc(&query), cramped.nrc(&query));
    }
    #[test]
    fn related_scores_below_random() {
        let _ = env_logger::Builder::from_env(
            env_logger::Env::default().default_filter_or("debug"),
        )
        .try_init();
        let mut rng: StdRng = SeedableRng::seed_from_u64(1212132);
        let reference: Vec<_> = (0..500)
            .filter_map(|_| ALPHABET.choose(&mut rng))
            .copied()
            .collect();
        let related = mutate(&reference, &mut rng, 0.05);
        let unrelated: Vec<_> = (0..500)
            .filter_map(|_| ALPHABET.choose(&mut rng))
            .copied()
            .collect();
        let model = FiniteContextModel::new(&reference, 8, 1.);
        let related = model.nrc(&related);
        let unrelated = model.nrc(&unrelated);
        assert!(related < unrelated, "{},{}", related, unrelated);
    }
    #[test]
    #[should_panic]
    fn zero_alpha() {
        FiniteContextModel::new(b"ACGT", 2, 0.);
    }
    fn mutate<T: Rng>(seq: &[u8], rng: &mut T, rate: f64) -> Vec<u8> {
        seq.iter()
            .map(|&base| {
                if rng.gen_bool(rate) {
                    *ALPHABET.choose(rng).unwrap()
                } else {
                    base
                }
            })
            .collect()
    }
}
