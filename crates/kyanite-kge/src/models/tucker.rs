//! TuckER: tensor-decomposition scoring.
//!
//! TuckER ([Balažević et al. 2019](https://arxiv.org/abs/1901.09590)) scores
//! triples through a Tucker decomposition of the binary knowledge-graph
//! tensor: a shared core tensor `W ∈ R^{dr×de×de}` interacts subject and
//! relation embeddings, and the result is matched against every entity
//! embedding at once:
//!
//! ```text
//! score(s, r, ·) = (e_s · (w_r)) · Eᵀ      where w_r = r · reshape(W)
//! ```
//!
//! One forward pass therefore produces a full `[batch, num_entities]` logit
//! matrix — exactly the shape the 1-to-n multi-label objective and the
//! filtered-ranking evaluator consume.
//!
//! Dropout on the subject embedding and on the hidden product is active in
//! [`Mode::Train`] only.

use candle_core::{Device, Tensor, Var};
use candle_nn::Dropout;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::Result;
use crate::models::{DeviceConfig, Mode, ScoringModel};

/// TuckER hyperparameters.
#[derive(Debug, Clone)]
pub struct TuckErConfig {
    /// Entity embedding dimension (default: 200).
    pub entity_dim: usize,
    /// Relation embedding dimension (default: 30).
    pub relation_dim: usize,
    /// Dropout on the subject embedding (default: 0.2).
    pub input_dropout: f32,
    /// Dropout on the subject–core product (default: 0.3).
    pub hidden_dropout: f32,
    /// Seed for parameter initialization (default: 42).
    pub seed: u64,
}

impl Default for TuckErConfig {
    fn default() -> Self {
        Self {
            entity_dim: 200,
            relation_dim: 30,
            input_dropout: 0.2,
            hidden_dropout: 0.3,
            seed: 42,
        }
    }
}

impl TuckErConfig {
    pub fn with_entity_dim(mut self, dim: usize) -> Self {
        self.entity_dim = dim;
        self
    }

    pub fn with_relation_dim(mut self, dim: usize) -> Self {
        self.relation_dim = dim;
        self
    }

    pub fn with_input_dropout(mut self, p: f32) -> Self {
        self.input_dropout = p;
        self
    }

    pub fn with_hidden_dropout(mut self, p: f32) -> Self {
        self.hidden_dropout = p;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// TuckER model state: entity embeddings `[N, de]`, relation embeddings
/// `[R, dr]` and the core tensor `[dr, de, de]`.
pub struct TuckEr {
    entities: Var,
    relations: Var,
    core: Var,
    input_dropout: Dropout,
    hidden_dropout: Dropout,
    entity_dim: usize,
    relation_dim: usize,
    num_entities: usize,
    num_relations: usize,
    mode: Mode,
    device: Device,
}

impl TuckEr {
    /// Create a model with seeded random parameters on the given device.
    pub fn new(
        num_entities: usize,
        num_relations: usize,
        config: TuckErConfig,
        device_config: DeviceConfig,
    ) -> Result<Self> {
        let device = device_config.device()?;
        let mut rng = StdRng::seed_from_u64(config.seed);

        // Embeddings start uniform in ±6/sqrt(dim); the core starts uniform
        // in ±1 as in the reference decomposition.
        let de = config.entity_dim;
        let dr = config.relation_dim;
        let entities = init_uniform(&mut rng, num_entities, de, 6.0 / (de as f32).sqrt());
        let relations = init_uniform(&mut rng, num_relations, dr, 6.0 / (dr as f32).sqrt());
        let core = init_uniform(&mut rng, dr, de * de, 1.0);

        let entities = Var::from_tensor(&Tensor::from_vec(entities, (num_entities, de), &device)?)?;
        let relations =
            Var::from_tensor(&Tensor::from_vec(relations, (num_relations, dr), &device)?)?;
        let core = Var::from_tensor(&Tensor::from_vec(core, (dr, de, de), &device)?)?;

        Ok(Self {
            entities,
            relations,
            core,
            input_dropout: Dropout::new(config.input_dropout),
            hidden_dropout: Dropout::new(config.hidden_dropout),
            entity_dim: de,
            relation_dim: dr,
            num_entities,
            num_relations,
            mode: Mode::Train,
            device,
        })
    }

    /// Entity embedding matrix `[num_entities, entity_dim]`.
    pub fn entity_embeddings(&self) -> &Tensor {
        self.entities.as_tensor()
    }

    /// Relation embedding matrix `[num_relations, relation_dim]`.
    pub fn relation_embeddings(&self) -> &Tensor {
        self.relations.as_tensor()
    }

    /// Embedding dimension of entities.
    pub fn entity_dim(&self) -> usize {
        self.entity_dim
    }

    /// Embedding dimension of relations.
    pub fn relation_dim(&self) -> usize {
        self.relation_dim
    }
}

impl ScoringModel for TuckEr {
    fn score_batch(&self, subjects: &Tensor, relations: &Tensor) -> Result<Tensor> {
        let train = self.mode == Mode::Train;
        let batch = subjects.dim(0)?;

        let s = self.entities.as_tensor().index_select(subjects, 0)?; // [B, de]
        let r = self.relations.as_tensor().index_select(relations, 0)?; // [B, dr]
        let s = self.input_dropout.forward(&s, train)?;

        // w_r = r · reshape(W, [dr, de*de]), one de×de matrix per row.
        let w = self
            .core
            .as_tensor()
            .reshape((self.relation_dim, self.entity_dim * self.entity_dim))?;
        let w_r = r
            .matmul(&w)?
            .reshape((batch, self.entity_dim, self.entity_dim))?;

        let x = s.unsqueeze(1)?.matmul(&w_r)?.squeeze(1)?; // [B, de]
        let x = self.hidden_dropout.forward(&x, train)?;

        let logits = x.matmul(&self.entities.as_tensor().t()?)?; // [B, N]
        Ok(logits)
    }

    fn num_entities(&self) -> usize {
        self.num_entities
    }

    fn num_relations(&self) -> usize {
        self.num_relations
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
        vec![
            self.entities.clone(),
            self.relations.clone(),
            self.core.clone(),
        ]
    }

    fn name(&self) -> &'static str {
        "TuckER"
    }
}

fn init_uniform(rng: &mut StdRng, rows: usize, cols: usize, range: f32) -> Vec<f32> {
    (0..rows * cols)
        .map(|_| rng.random_range(-range..range))
        .collect()
}
