//! 1-to-n training loop for knowledge-graph embedding models.
//!
//! Training follows the 1-to-n scheme of Dettmers et al. (2018): instead of
//! sampling negatives per triple, each distinct training (subject, relation)
//! pair is scored against *every* entity in one forward pass, with a dense
//! multi-hot target row marking the objects observed for that pair. The
//! objective is multi-label binary cross-entropy over the smoothed targets:
//!
//! ```text
//! target' = (1 - ε)·target + ε/num_entities
//! ```
//!
//! The smoothing mass is spread uniformly over every entity, true objects
//! included — a regularization choice, not target leakage.
//!
//! [`Trainer::fit`] drives the whole run: AdamW over the model's trainable
//! parameters, an exponential learning-rate schedule (`lr · decay^epoch`),
//! and a periodic filtered-ranking evaluation on the test split. A batch
//! that produces a non-finite loss aborts the epoch *before* the optimizer
//! step, so model parameters are never updated from a poisoned gradient.

use candle_core::Tensor;
use candle_nn::{loss, AdamW, Optimizer, ParamsAdamW};
use serde::{Deserialize, Serialize};

use crate::dataset::{Split, TripleDataset};
use crate::error::{Error, Result};
use crate::evaluation::{Evaluator, RankMetrics, DEFAULT_KS};
use crate::models::{DeviceConfig, ScoringModel};

/// Training hyperparameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Number of epochs (default: 100).
    pub epochs: usize,
    /// Initial learning rate (default: 1e-4).
    pub learning_rate: f64,
    /// Multiplicative learning-rate decay per epoch (default: 0.99).
    pub lr_decay: f64,
    /// (subject, relation) pairs per batch (default: 128).
    pub batch_size: usize,
    /// Label smoothing rate ε in [0, 1] (default: 0.1).
    pub label_smoothing: f32,
    /// AdamW decoupled weight decay (default: 0.0).
    pub weight_decay: f64,
    /// Run evaluation every n-th epoch, 1-indexed (default: 10).
    pub eval_every: usize,
    /// Hits@k cutoffs (default: [1, 3, 10]).
    pub ks: Vec<usize>,
    /// Compute device (default: CPU).
    pub device: DeviceConfig,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            epochs: 100,
            learning_rate: 1e-4,
            lr_decay: 0.99,
            batch_size: 128,
            label_smoothing: 0.1,
            weight_decay: 0.0,
            eval_every: 10,
            ks: DEFAULT_KS.to_vec(),
            device: DeviceConfig::Cpu,
        }
    }
}

impl TrainingConfig {
    pub fn with_epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs;
        self
    }

    pub fn with_learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = lr;
        self
    }

    pub fn with_lr_decay(mut self, decay: f64) -> Self {
        self.lr_decay = decay;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_label_smoothing(mut self, rate: f32) -> Self {
        self.label_smoothing = rate;
        self
    }

    pub fn with_weight_decay(mut self, weight_decay: f64) -> Self {
        self.weight_decay = weight_decay;
        self
    }

    pub fn with_eval_every(mut self, eval_every: usize) -> Self {
        self.eval_every = eval_every;
        self
    }

    pub fn with_device(mut self, device: DeviceConfig) -> Self {
        self.device = device;
        self
    }

    /// Check hyperparameter ranges.
    pub fn validate(&self) -> Result<()> {
        if self.epochs == 0 {
            return Err(Error::Config("epochs must be positive".into()));
        }
        if self.batch_size == 0 {
            return Err(Error::Config("batch size must be positive".into()));
        }
        if self.eval_every == 0 {
            return Err(Error::Config("evaluation cadence must be positive".into()));
        }
        if self.learning_rate <= 0.0 {
            return Err(Error::Config(format!(
                "learning rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if self.lr_decay <= 0.0 {
            return Err(Error::Config(format!(
                "lr decay must be positive, got {}",
                self.lr_decay
            )));
        }
        if !(0.0..=1.0).contains(&self.label_smoothing) {
            return Err(Error::Config(format!(
                "label smoothing must be in [0, 1], got {}",
                self.label_smoothing
            )));
        }
        if self.ks.is_empty() {
            return Err(Error::Config("at least one Hits@k cutoff required".into()));
        }
        Ok(())
    }
}

/// What happened during one epoch.
#[derive(Debug, Clone)]
pub struct EpochReport {
    /// Epoch index (0-based).
    pub epoch: usize,
    /// Sum of per-batch loss values over the epoch.
    pub loss: f32,
    /// Learning rate the epoch ran at.
    pub learning_rate: f64,
    /// Filtered-ranking metrics, when the epoch hit the evaluation cadence.
    pub metrics: Option<RankMetrics>,
}

/// Callback invoked after every epoch.
pub type EpochCallback = Box<dyn Fn(&EpochReport) + Send + Sync>;

/// Full training run results.
#[derive(Debug, Clone, Default)]
pub struct TrainingReport {
    /// Per-epoch summed batch losses.
    pub loss_history: Vec<f32>,
    /// (epoch, metrics) for every evaluation pass that ran.
    pub eval_history: Vec<(usize, RankMetrics)>,
}

impl TrainingReport {
    /// Metrics of the last evaluation pass, if any ran.
    pub fn final_metrics(&self) -> Option<&RankMetrics> {
        self.eval_history.last().map(|(_, m)| m)
    }
}

/// Apply uniform label smoothing: `(1 - ε)·target + ε/num_entities`.
///
/// At ε = 0 targets pass through unchanged; at ε = 1 every row becomes the
/// uniform distribution 1/num_entities regardless of the true labels.
pub fn smooth_targets(targets: &Tensor, rate: f32, num_entities: usize) -> Result<Tensor> {
    Ok(targets.affine(
        1.0 - rate as f64,
        rate as f64 / num_entities as f64,
    )?)
}

/// Epoch/evaluation orchestration over a [`ScoringModel`].
#[derive(Debug)]
pub struct Trainer {
    config: TrainingConfig,
}

impl Trainer {
    /// Create a trainer, validating the configuration.
    pub fn new(config: TrainingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Training configuration.
    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Train for the configured number of epochs.
    ///
    /// Every `eval_every`-th epoch (1-indexed) runs a filtered-ranking
    /// evaluation on the test split and records the metrics.
    pub fn fit(
        &self,
        model: &mut dyn ScoringModel,
        data: &TripleDataset,
    ) -> Result<TrainingReport> {
        self.fit_with_callback(model, data, Box::new(|_| {}))
    }

    /// Train with a per-epoch progress callback.
    pub fn fit_with_callback(
        &self,
        model: &mut dyn ScoringModel,
        data: &TripleDataset,
        callback: EpochCallback,
    ) -> Result<TrainingReport> {
        let mut optimizer = AdamW::new(
            model.trainable_vars(),
            ParamsAdamW {
                lr: self.config.learning_rate,
                weight_decay: self.config.weight_decay,
                ..ParamsAdamW::default()
            },
        )?;

        let evaluator = Evaluator::new(self.config.ks.clone());
        let mut report = TrainingReport::default();

        for epoch in 0..self.config.epochs {
            // Exponential schedule: epoch e runs at lr · decay^e.
            let lr = self.config.learning_rate * self.config.lr_decay.powi(epoch as i32);
            optimizer.set_learning_rate(lr);

            let loss = self.train_epoch(model, data, &mut optimizer, epoch)?;
            eprintln!("Epoch {}: loss = {:.4}", epoch, loss);
            report.loss_history.push(loss);

            let metrics = if (epoch + 1) % self.config.eval_every == 0 {
                let metrics = evaluator.evaluate(model, data, Split::Test)?;
                eprintln!("{}", metrics.summary());
                report.eval_history.push((epoch, metrics.clone()));
                Some(metrics)
            } else {
                None
            };

            callback(&EpochReport {
                epoch,
                loss,
                learning_rate: lr,
                metrics,
            });
        }

        Ok(report)
    }

    /// One pass over the distinct training (subject, relation) pairs.
    ///
    /// Returns the sum of per-batch loss values. Errors out on the first
    /// non-finite loss, before the optimizer step for that batch.
    fn train_epoch(
        &self,
        model: &mut dyn ScoringModel,
        data: &TripleDataset,
        optimizer: &mut AdamW,
        epoch: usize,
    ) -> Result<f32> {
        let num_entities = data.num_entities();
        let pairs = data.train_index().pairs();
        let mut epoch_loss = 0.0f32;

        for batch in pairs.chunks(self.config.batch_size) {
            let device = model.device().clone();
            let subjects: Vec<u32> = batch.iter().map(|p| p.0).collect();
            let relations: Vec<u32> = batch.iter().map(|p| p.1).collect();
            let subjects = Tensor::from_vec(subjects, batch.len(), &device)?;
            let relations = Tensor::from_vec(relations, batch.len(), &device)?;

            let targets = data.train_index().one_hot_targets(batch, num_entities);
            let targets = Tensor::from_vec(targets, (batch.len(), num_entities), &device)?;
            let targets = smooth_targets(&targets, self.config.label_smoothing, num_entities)?;

            let logits = model.score_batch(&subjects, &relations)?;
            // Mean over batch and entity dimensions, the BCELoss convention.
            let batch_loss = loss::binary_cross_entropy_with_logit(&logits, &targets)?;

            let loss_value = batch_loss.to_scalar::<f32>()?;
            if !loss_value.is_finite() {
                return Err(Error::Numerical(format!(
                    "non-finite loss {} in epoch {}; aborting before parameter update",
                    loss_value, epoch
                )));
            }

            optimizer.backward_step(&batch_loss)?;
            epoch_loss += loss_value;
        }

        Ok(epoch_loss)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::Device;

    #[test]
    fn test_config_validation() {
        assert!(TrainingConfig::default().validate().is_ok());
        assert!(TrainingConfig::default().with_epochs(0).validate().is_err());
        assert!(TrainingConfig::default()
            .with_batch_size(0)
            .validate()
            .is_err());
        assert!(TrainingConfig::default()
            .with_eval_every(0)
            .validate()
            .is_err());
        assert!(TrainingConfig::default()
            .with_learning_rate(0.0)
            .validate()
            .is_err());
        assert!(TrainingConfig::default()
            .with_label_smoothing(1.5)
            .validate()
            .is_err());
        assert!(TrainingConfig::default()
            .with_label_smoothing(-0.1)
            .validate()
            .is_err());
    }

    #[test]
    fn test_trainer_rejects_invalid_config() {
        let err = Trainer::new(TrainingConfig::default().with_epochs(0)).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_smoothing_zero_is_identity() {
        let targets = Tensor::from_vec(vec![1.0f32, 0.0, 0.0, 1.0], (2, 2), &Device::Cpu).unwrap();
        let smoothed = smooth_targets(&targets, 0.0, 2).unwrap();
        let rows: Vec<Vec<f32>> = smoothed.to_vec2().unwrap();
        assert_eq!(rows, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[test]
    fn test_smoothing_one_is_uniform() {
        let targets =
            Tensor::from_vec(vec![1.0f32, 0.0, 0.0, 0.0, 1.0, 1.0], (2, 3), &Device::Cpu).unwrap();
        let smoothed = smooth_targets(&targets, 1.0, 3).unwrap();
        let rows: Vec<Vec<f32>> = smoothed.to_vec2().unwrap();
        for row in rows {
            for v in row {
                assert!((v - 1.0 / 3.0).abs() < 1e-7);
            }
        }
    }

    #[test]
    fn test_smoothing_blends_towards_uniform() {
        let targets = Tensor::from_vec(vec![1.0f32, 0.0], (1, 2), &Device::Cpu).unwrap();
        let smoothed = smooth_targets(&targets, 0.1, 2).unwrap();
        let rows: Vec<Vec<f32>> = smoothed.to_vec2().unwrap();
        assert!((rows[0][0] - 0.95).abs() < 1e-7); // 0.9·1 + 0.1/2
        assert!((rows[0][1] - 0.05).abs() < 1e-7); // 0.9·0 + 0.1/2
    }
}
