//! Filtered-ranking evaluation for link prediction.
//!
//! # The protocol
//!
//! For every test triple (s, r, o) the model scores *all* entities as
//! candidate objects for (s, r, ?). Under the open-world assumption a
//! candidate that happens to be another known-true object for (s, r) is not
//! a mistake, so the known-true set is removed from the candidate pool
//! before ranking ("filtered" setting):
//!
//! 1. `negatives = all entities \ known_objects(s, r)` — ascending order,
//!    which keeps runs reproducible.
//! 2. `rank = |{ n ∈ negatives : score[n] >= score[o] }| + 1`. A negative
//!    that *ties* the true object counts against it — the pessimistic
//!    convention, preserved exactly for reproducibility.
//! 3. Ranks aggregate into MRR and Hits@k.
//!
//! | Metric | Range | Description |
//! |--------|-------|-------------|
//! | MRR | (0, 1] | Mean Reciprocal Rank: average of 1/rank |
//! | Hits@k | [0, 1] | Fraction of test triples with rank <= k |
//!
//! The per-triple filtering is the dominant evaluation cost: O(num_entities)
//! per triple, O(batch × num_entities) per scored batch. The rank loop below
//! walks each score row once against the sorted filter set, with no
//! per-triple allocation.
//!
//! The model is switched to [`Mode::Eval`] for the whole pass through an
//! [`EvalGuard`], and restored to training mode on every exit path,
//! including errors.
//!
//! # References
//!
//! - Bordes et al. (2013): original TransE evaluation protocol
//! - Dettmers et al. (2018): 1-N scoring and filtered ranking at scale
//! - Ruffinelli et al. (2020): "You CAN Teach an Old Dog New Tricks"
//!   (analysis of evaluation pitfalls, including tie handling)
//!
//! [`Mode::Eval`]: crate::models::Mode::Eval
//! [`EvalGuard`]: crate::models::EvalGuard

use std::collections::BTreeMap;

use candle_core::Tensor;
use candle_nn::ops;
use serde::{Deserialize, Serialize};

use crate::dataset::{PairIndex, Split, TripleDataset};
use crate::error::Result;
use crate::models::{EvalGuard, ScoringModel};

/// Default ranking cutoffs.
pub const DEFAULT_KS: [usize; 3] = [1, 3, 10];

/// Default number of test triples scored per forward pass.
pub const DEFAULT_EVAL_BATCH: usize = 100;

/// Candidate objects for (subject, relation) that are *not* known to be
/// true, in ascending index order.
///
/// The complement is taken against `index.objects_for(subject, relation)`,
/// so together the two sets partition the full entity universe. The result
/// is pre-sized; no per-element growth.
pub fn negatives_for(
    index: &PairIndex,
    subject: u32,
    relation: u32,
    num_entities: usize,
) -> Vec<u32> {
    let known = index.objects_for(subject, relation);
    let mut negatives = Vec::with_capacity(num_entities - known.len());
    let mut next_known = 0usize;
    for entity in 0..num_entities as u32 {
        if next_known < known.len() && known[next_known] == entity {
            next_known += 1;
            continue;
        }
        negatives.push(entity);
    }
    negatives
}

/// Filtered rank of the true object within one score row.
///
/// `filtered` is the sorted set of known-true objects for the row's
/// (subject, relation) pair; it must contain `true_object`. Ties with a
/// negative count against the true object.
pub fn filtered_rank(scores: &[f32], filtered: &[u32], true_object: u32) -> usize {
    let true_score = scores[true_object as usize];
    let mut rank = 1usize;
    let mut next_filtered = 0usize;
    for (entity, &score) in scores.iter().enumerate() {
        if next_filtered < filtered.len() && filtered[next_filtered] as usize == entity {
            next_filtered += 1;
            continue;
        }
        if score >= true_score {
            rank += 1;
        }
    }
    rank
}

/// Rank-based evaluation results.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RankMetrics {
    /// Mean Reciprocal Rank: E\[1/rank\].
    pub mrr: f64,
    /// Hits@k per configured cutoff: P(rank <= k).
    pub hits_at_k: BTreeMap<usize, f64>,
    /// Number of test triples evaluated.
    pub num_triples: usize,
}

impl RankMetrics {
    /// Aggregate metrics from a list of 1-based ranks.
    pub fn from_ranks(ranks: &[usize], ks: &[usize]) -> Self {
        if ranks.is_empty() {
            return Self {
                hits_at_k: ks.iter().map(|&k| (k, 0.0)).collect(),
                ..Self::default()
            };
        }

        let n = ranks.len() as f64;
        let mrr = ranks.iter().map(|&r| 1.0 / r as f64).sum::<f64>() / n;
        let hits_at_k = ks
            .iter()
            .map(|&k| (k, ranks.iter().filter(|&&r| r <= k).count() as f64 / n))
            .collect();

        Self {
            mrr,
            hits_at_k,
            num_triples: ranks.len(),
        }
    }

    /// Format as a one-line summary.
    pub fn summary(&self) -> String {
        let hits = self
            .hits_at_k
            .iter()
            .map(|(k, v)| format!("H@{}: {:.3}", k, v))
            .collect::<Vec<_>>()
            .join(" | ");
        format!("MRR: {:.4} | {} (n={})", self.mrr, hits, self.num_triples)
    }
}

/// Link prediction evaluator.
///
/// # Example
///
/// ```rust,ignore
/// use kyanite_kge::{Evaluator, Split};
///
/// let evaluator = Evaluator::default();
/// let metrics = evaluator.evaluate(&mut model, &dataset, Split::Test)?;
/// println!("{}", metrics.summary());
/// ```
#[derive(Debug, Clone)]
pub struct Evaluator {
    ks: Vec<usize>,
    batch_size: usize,
}

impl Evaluator {
    /// Evaluator with the given Hits@k cutoffs.
    pub fn new(ks: Vec<usize>) -> Self {
        Self {
            ks,
            batch_size: DEFAULT_EVAL_BATCH,
        }
    }

    /// Override the scoring batch size.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Evaluate a split under the filtered protocol.
    ///
    /// Scores each batch in one forward pass, then reduces ranks
    /// sequentially into the aggregate metrics. The model runs in eval mode
    /// for the whole pass and is back in training mode when this returns,
    /// whether it succeeds or fails.
    pub fn evaluate(
        &self,
        model: &mut dyn ScoringModel,
        data: &TripleDataset,
        split: Split,
    ) -> Result<RankMetrics> {
        let guard = EvalGuard::new(model);
        let triples = data.triples(split);
        let mut ranks = Vec::with_capacity(triples.len());

        for batch in triples.chunks(self.batch_size) {
            let device = guard.model().device();
            let subjects: Vec<u32> = batch.iter().map(|t| t.subject).collect();
            let relations: Vec<u32> = batch.iter().map(|t| t.relation).collect();
            let subjects = Tensor::from_vec(subjects, batch.len(), device)?;
            let relations = Tensor::from_vec(relations, batch.len(), device)?;

            let logits = guard.model().score_batch(&subjects, &relations)?;
            let scores: Vec<Vec<f32>> = ops::sigmoid(&logits)?.to_vec2()?;

            for (row, triple) in scores.iter().zip(batch) {
                let filtered = data.filter_index().objects_for(triple.subject, triple.relation);
                ranks.push(filtered_rank(row, filtered, triple.object));
            }
        }

        Ok(RankMetrics::from_ranks(&ranks, &self.ks))
    }
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new(DEFAULT_KS.to_vec())
    }
}
