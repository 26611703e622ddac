//! Scoring model abstraction.
//!
//! Following the backend-agnostic pattern used across the codebase, the
//! abstraction sits at the *model* level, not the tensor level: a scoring
//! model takes a batch of (subject, relation) index tensors and produces one
//! logit per candidate object. Trainer and evaluator only ever talk to
//! [`ScoringModel`]; the tensor algebra inside a model is its own business.
//!
//! | Method | Used by |
//! |--------|---------|
//! | `score_batch` | trainer (loss) and evaluator (ranking) |
//! | `trainable_vars` | trainer, to drive the external optimizer |
//! | `mode` / `set_mode` | evaluator, via [`EvalGuard`] |

pub mod tucker;

pub use tucker::{TuckEr, TuckErConfig};

use std::fmt;
use std::str::FromStr;

use candle_core::{Device, Tensor, Var};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Model mode: a two-state machine toggled around evaluation passes.
///
/// `Train` enables stochastic layers (dropout); `Eval` runs the model
/// deterministically for ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Gradient-training mode.
    #[default]
    Train,
    /// Deterministic inference mode.
    Eval,
}

/// Compute device selection, threaded through model construction as an
/// explicit configuration value rather than ambient global state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DeviceConfig {
    /// Host CPU.
    #[default]
    Cpu,
    /// CUDA device by ordinal.
    Cuda(usize),
    /// Metal device by ordinal.
    Metal(usize),
}

impl DeviceConfig {
    /// Resolve to a candle device.
    pub fn device(&self) -> Result<Device> {
        match self {
            DeviceConfig::Cpu => Ok(Device::Cpu),
            DeviceConfig::Cuda(ordinal) => Ok(Device::new_cuda(*ordinal)?),
            DeviceConfig::Metal(ordinal) => Ok(Device::new_metal(*ordinal)?),
        }
    }
}

impl fmt::Display for DeviceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceConfig::Cpu => write!(f, "cpu"),
            DeviceConfig::Cuda(ordinal) => write!(f, "cuda:{}", ordinal),
            DeviceConfig::Metal(ordinal) => write!(f, "metal:{}", ordinal),
        }
    }
}

impl FromStr for DeviceConfig {
    type Err = Error;

    /// Parse `cpu`, `cuda[:N]` or `metal[:N]`.
    fn from_str(s: &str) -> Result<Self> {
        let (kind, ordinal) = match s.split_once(':') {
            Some((kind, ordinal)) => {
                let ordinal: usize = ordinal
                    .parse()
                    .map_err(|_| Error::Config(format!("invalid device ordinal: {}", s)))?;
                (kind, ordinal)
            }
            None => (s, 0),
        };
        match kind {
            "cpu" => Ok(DeviceConfig::Cpu),
            "cuda" => Ok(DeviceConfig::Cuda(ordinal)),
            "metal" => Ok(DeviceConfig::Metal(ordinal)),
            _ => Err(Error::Config(format!("unknown device: {}", s))),
        }
    }
}

/// A model that scores every entity as candidate object for a batch of
/// (subject, relation) pairs.
pub trait ScoringModel {
    /// Score a batch.
    ///
    /// `subjects` and `relations` are index tensors of shape `[batch]`;
    /// the result has shape `[batch, num_entities]` and holds raw logits
    /// (higher = more plausible). Callers apply a sigmoid when they need
    /// probabilities.
    fn score_batch(&self, subjects: &Tensor, relations: &Tensor) -> Result<Tensor>;

    /// Number of candidate entities (the width of a score row).
    fn num_entities(&self) -> usize;

    /// Number of relations.
    fn num_relations(&self) -> usize;

    /// Device the model's parameters live on.
    fn device(&self) -> &Device;

    /// Current mode.
    fn mode(&self) -> Mode;

    /// Switch between training and inference behavior.
    fn set_mode(&mut self, mode: Mode);

    /// Trainable parameters, exposed to an external optimizer.
    fn trainable_vars(&self) -> Vec<Var>;

    /// Model name (e.g. "TuckER").
    fn name(&self) -> &'static str;
}

/// Scoped eval-mode acquisition.
///
/// Construction switches the model to [`Mode::Eval`]; dropping the guard
/// restores [`Mode::Train`] on every exit path, so an evaluation pass that
/// errors out cannot leave the model stuck in inference mode.
pub struct EvalGuard<'a> {
    model: &'a mut dyn ScoringModel,
}

impl<'a> EvalGuard<'a> {
    /// Enter eval mode.
    pub fn new(model: &'a mut dyn ScoringModel) -> Self {
        model.set_mode(Mode::Eval);
        Self { model }
    }

    /// The guarded model.
    pub fn model(&self) -> &dyn ScoringModel {
        &*self.model
    }
}

impl Drop for EvalGuard<'_> {
    fn drop(&mut self) {
        self.model.set_mode(Mode::Train);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct DummyModel {
        mode: Mode,
        device: Device,
    }

    impl ScoringModel for DummyModel {
        fn score_batch(&self, _subjects: &Tensor, _relations: &Tensor) -> Result<Tensor> {
            Err(Error::Numerical("dummy model cannot score".into()))
        }
        fn num_entities(&self) -> usize {
            0
        }
        fn num_relations(&self) -> usize {
            0
        }
        fn device(&self) -> &Device {
            &self.device
        }
        fn mode(&self) -> Mode {
            self.mode
        }
        fn set_mode(&mut self, mode: Mode) {
            self.mode = mode;
        }
        fn trainable_vars(&self) -> Vec<Var> {
            Vec::new()
        }
        fn name(&self) -> &'static str {
            "Dummy"
        }
    }

    #[test]
    fn test_eval_guard_restores_mode() {
        let mut model = DummyModel {
            mode: Mode::Train,
            device: Device::Cpu,
        };
        {
            let guard = EvalGuard::new(&mut model);
            assert_eq!(guard.model().mode(), Mode::Eval);
        }
        assert_eq!(model.mode(), Mode::Train);
    }

    #[test]
    fn test_eval_guard_restores_mode_on_early_return() {
        fn failing_pass(model: &mut dyn ScoringModel) -> Result<()> {
            let guard = EvalGuard::new(model);
            let ids = Tensor::from_vec(vec![0u32], 1, &Device::Cpu)?;
            guard.model().score_batch(&ids, &ids)?;
            Ok(())
        }

        let mut model = DummyModel {
            mode: Mode::Train,
            device: Device::Cpu,
        };
        assert!(failing_pass(&mut model).is_err());
        assert_eq!(model.mode(), Mode::Train);
    }

    #[test]
    fn test_device_config_parse() {
        assert_eq!("cpu".parse::<DeviceConfig>().unwrap(), DeviceConfig::Cpu);
        assert_eq!(
            "cuda".parse::<DeviceConfig>().unwrap(),
            DeviceConfig::Cuda(0)
        );
        assert_eq!(
            "cuda:1".parse::<DeviceConfig>().unwrap(),
            DeviceConfig::Cuda(1)
        );
        assert_eq!(
            "metal:2".parse::<DeviceConfig>().unwrap(),
            DeviceConfig::Metal(2)
        );
        assert!("tpu".parse::<DeviceConfig>().is_err());
        assert!("cuda:x".parse::<DeviceConfig>().is_err());
    }

    #[test]
    fn test_device_config_display_roundtrip() {
        for cfg in [
            DeviceConfig::Cpu,
            DeviceConfig::Cuda(3),
            DeviceConfig::Metal(1),
        ] {
            assert_eq!(cfg.to_string().parse::<DeviceConfig>().unwrap(), cfg);
        }
    }
}
