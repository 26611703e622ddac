//! Knowledge-graph embedding training and link-prediction evaluation.
//!
//! Knowledge graphs store facts as (subject, relation, object) triples:
//! `(Einstein, won, NobelPrize)`, `(Paris, capitalOf, France)`. A
//! tensor-factorization model learns dense vector representations under
//! which a scoring function predicts missing links. This crate provides the
//! machinery *around* such a model:
//!
//! - [`TripleDataset`]: split loading, vocabulary interning, and the
//!   (subject, relation) → objects pair index used both for 1-to-n training
//!   targets and for filtering negatives at evaluation time;
//! - [`Trainer`]: label-smoothed multi-label binary cross-entropy training
//!   with AdamW and an exponential learning-rate schedule;
//! - [`Evaluator`]: the filtered-ranking protocol — exhaustive negatives,
//!   pessimistic tie handling, MRR and Hits@k aggregation;
//! - [`TuckEr`]: a Tucker-decomposition scorer satisfying the
//!   [`ScoringModel`] contract.
//!
//! ## The evaluation protocol
//!
//! Link prediction is measured by ranking the true object of each held-out
//! triple against every entity not already known to be a correct answer for
//! its (subject, relation) pair:
//!
//! | Setting | Candidate pool | Use |
//! |---------|----------------|-----|
//! | Raw | all entities | pessimistic estimate |
//! | Filtered | all entities minus known-true | standard benchmark |
//!
//! Filtered is the standard: raw ranking penalizes a model for placing a
//! *different correct answer* above the test answer.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use kyanite_kge::{
//!     DeviceConfig, Trainer, TrainingConfig, TripleDataset, TuckEr, TuckErConfig,
//! };
//!
//! let data = TripleDataset::from_dir("data/FB15k")?;
//! let mut model = TuckEr::new(
//!     data.num_entities(),
//!     data.num_relations(),
//!     TuckErConfig::default(),
//!     DeviceConfig::Cpu,
//! )?;
//!
//! let trainer = Trainer::new(TrainingConfig::default().with_epochs(500))?;
//! let report = trainer.fit(&mut model, &data)?;
//! if let Some(metrics) = report.final_metrics() {
//!     println!("{}", metrics.summary());
//! }
//! ```
//!
//! ## References
//!
//! - Balažević et al. (2019). "TuckER: Tensor Factorization for Knowledge
//!   Graph Completion." EMNLP.
//! - Dettmers et al. (2018). "Convolutional 2D Knowledge Graph Embeddings."
//!   AAAI. (1-to-n scoring and label smoothing.)
//! - Bordes et al. (2013). "Translating Embeddings for Modeling
//!   Multi-relational Data." NIPS. (Ranking evaluation protocol.)

pub mod dataset;
pub mod error;
pub mod evaluation;
pub mod models;
pub mod training;

pub use dataset::{PairIndex, Split, Triple, TripleDataset, Vocab};
pub use error::{Error, Result};
pub use evaluation::{
    filtered_rank, negatives_for, Evaluator, RankMetrics, DEFAULT_EVAL_BATCH, DEFAULT_KS,
};
pub use models::{DeviceConfig, EvalGuard, Mode, ScoringModel, TuckEr, TuckErConfig};
pub use training::{
    smooth_targets, EpochCallback, EpochReport, Trainer, TrainingConfig, TrainingReport,
};
