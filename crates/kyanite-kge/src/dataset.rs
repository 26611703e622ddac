//! Triple datasets and the (subject, relation) pair index.
//!
//! Link-prediction benchmarks (FB15k, WN18, and friends) ship as a directory
//! of three tab-separated files, one triple per line:
//!
//! ```text
//! data/FB15k/
//!   train.txt    subject<TAB>relation<TAB>object
//!   valid.txt
//!   test.txt
//! ```
//!
//! [`TripleDataset`] loads the splits, interns entity and relation labels
//! into dense indices, and builds two [`PairIndex`] structures:
//!
//! - the **train index** maps each training (s, r) pair to the set of
//!   objects observed for it — the 1-to-n multi-label targets used by the
//!   trainer (one forward pass scores a pair against every entity);
//! - the **filter index** does the same over train ∪ valid ∪ test — the
//!   known-true universe used to filter negatives at evaluation time, so a
//!   model is never penalized for ranking a different correct answer above
//!   the test answer.
//!
//! Both indexes are built once and never mutated afterwards; they are safe
//! to share read-only across a whole training run.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A triple with vocabulary indices instead of labels.
///
/// Indices are dense in `[0, num_entities)` / `[0, num_relations)` and are
/// used directly as embedding row indices. Immutable once loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Triple {
    /// Subject entity index.
    pub subject: u32,
    /// Relation index.
    pub relation: u32,
    /// Object entity index.
    pub object: u32,
}

impl Triple {
    /// Create a new index triple.
    pub fn new(subject: u32, relation: u32, object: u32) -> Self {
        Self {
            subject,
            relation,
            object,
        }
    }
}

impl fmt::Display for Triple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.subject, self.relation, self.object)
    }
}

/// Dataset split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Split {
    /// Training split.
    Train,
    /// Validation split.
    Valid,
    /// Test split.
    Test,
}

/// Bijective label ↔ dense-index mapping, stable for the lifetime of a run.
///
/// Indices are assigned in first-seen order, so a vocabulary built from the
/// same files always produces the same mapping.
#[derive(Debug, Clone, Default)]
pub struct Vocab {
    labels: Vec<String>,
    indices: HashMap<String, u32>,
}

impl Vocab {
    /// Intern a label, returning its index.
    pub fn intern(&mut self, label: &str) -> u32 {
        if let Some(&idx) = self.indices.get(label) {
            return idx;
        }
        let idx = self.labels.len() as u32;
        self.labels.push(label.to_string());
        self.indices.insert(label.to_string(), idx);
        idx
    }

    /// Look up a label's index.
    pub fn index_of(&self, label: &str) -> Option<u32> {
        self.indices.get(label).copied()
    }

    /// Look up the label at an index.
    pub fn label_of(&self, idx: u32) -> Option<&str> {
        self.labels.get(idx as usize).map(|s| s.as_str())
    }

    /// Number of interned labels.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Whether the vocabulary is empty.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Mapping from (subject, relation) to the sorted set of true objects.
///
/// This is the 1-to-n structure at the heart of both training (dense
/// multi-label targets) and evaluation (negative filtering). Built once,
/// read-only thereafter.
#[derive(Debug, Clone, Default)]
pub struct PairIndex {
    objects: HashMap<(u32, u32), Vec<u32>>,
    pairs: Vec<(u32, u32)>,
}

impl PairIndex {
    /// Build the index from a set of triples.
    ///
    /// Pairs are recorded in first-seen order; object sets are sorted
    /// ascending and deduplicated.
    pub fn build(triples: &[Triple]) -> Self {
        let mut objects: HashMap<(u32, u32), Vec<u32>> = HashMap::new();
        let mut pairs = Vec::new();

        for t in triples {
            let key = (t.subject, t.relation);
            let objs = objects.entry(key).or_insert_with(|| {
                pairs.push(key);
                Vec::new()
            });
            objs.push(t.object);
        }

        for objs in objects.values_mut() {
            objs.sort_unstable();
            objs.dedup();
        }

        Self { objects, pairs }
    }

    /// True object indices for a pair, sorted ascending.
    ///
    /// Returns an empty slice for a pair never seen in the indexed data.
    pub fn objects_for(&self, subject: u32, relation: u32) -> &[u32] {
        self.objects
            .get(&(subject, relation))
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Distinct (subject, relation) pairs in first-seen order.
    pub fn pairs(&self) -> &[(u32, u32)] {
        &self.pairs
    }

    /// Number of distinct pairs.
    pub fn num_pairs(&self) -> usize {
        self.pairs.len()
    }

    /// Materialize dense row-major multi-label targets for a batch of pairs.
    ///
    /// Each row has length `num_entities` with 1.0 at the true-object
    /// columns and 0.0 elsewhere (hard targets, prior to label smoothing).
    pub fn one_hot_targets(&self, batch: &[(u32, u32)], num_entities: usize) -> Vec<f32> {
        let mut targets = vec![0.0f32; batch.len() * num_entities];
        for (row, &(s, r)) in batch.iter().enumerate() {
            let base = row * num_entities;
            for &o in self.objects_for(s, r) {
                targets[base + o as usize] = 1.0;
            }
        }
        targets
    }
}

/// A loaded link-prediction dataset: vocabularies, splits, and pair indexes.
#[derive(Debug, Clone)]
pub struct TripleDataset {
    entities: Vocab,
    relations: Vocab,
    train: Vec<Triple>,
    valid: Vec<Triple>,
    test: Vec<Triple>,
    train_index: PairIndex,
    filter_index: PairIndex,
}

impl TripleDataset {
    /// Load a dataset from a directory holding `train.txt`, `valid.txt` and
    /// `test.txt` in tab-separated `subject relation object` form.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let train = read_split(&dir.join("train.txt"))?;
        let valid = read_split(&dir.join("valid.txt"))?;
        let test = read_split(&dir.join("test.txt"))?;
        Self::from_labeled(train, valid, test)
    }

    /// Build a dataset from in-memory label triples.
    pub fn from_labeled(
        train: Vec<(String, String, String)>,
        valid: Vec<(String, String, String)>,
        test: Vec<(String, String, String)>,
    ) -> Result<Self> {
        // Vocabularies cover the union of all splits, so every entity is a
        // ranking candidate even if it only appears in valid/test.
        let mut entities = Vocab::default();
        let mut relations = Vocab::default();
        for (s, r, o) in train.iter().chain(valid.iter()).chain(test.iter()) {
            entities.intern(s);
            relations.intern(r);
            entities.intern(o);
        }

        let train = index_split(&entities, &relations, &train)?;
        let valid = index_split(&entities, &relations, &valid)?;
        let test = index_split(&entities, &relations, &test)?;

        let train_index = PairIndex::build(&train);
        let mut known = train.clone();
        known.extend_from_slice(&valid);
        known.extend_from_slice(&test);
        let filter_index = PairIndex::build(&known);

        Ok(Self {
            entities,
            relations,
            train,
            valid,
            test,
            train_index,
            filter_index,
        })
    }

    /// Number of entities.
    pub fn num_entities(&self) -> usize {
        self.entities.len()
    }

    /// Number of relations.
    pub fn num_relations(&self) -> usize {
        self.relations.len()
    }

    /// Entity vocabulary.
    pub fn entities(&self) -> &Vocab {
        &self.entities
    }

    /// Relation vocabulary.
    pub fn relations(&self) -> &Vocab {
        &self.relations
    }

    /// Triples of a split.
    pub fn triples(&self, split: Split) -> &[Triple] {
        match split {
            Split::Train => &self.train,
            Split::Valid => &self.valid,
            Split::Test => &self.test,
        }
    }

    /// Pair index over the training split (multi-label targets).
    pub fn train_index(&self) -> &PairIndex {
        &self.train_index
    }

    /// Pair index over train ∪ valid ∪ test (evaluation filtering).
    pub fn filter_index(&self) -> &PairIndex {
        &self.filter_index
    }

    /// All entity indices, ascending.
    pub fn all_entity_indices(&self) -> impl Iterator<Item = u32> {
        0..self.entities.len() as u32
    }
}

fn read_split(path: &Path) -> Result<Vec<(String, String, String)>> {
    let content = fs::read_to_string(path)
        .map_err(|e| Error::Data(format!("failed to read {}: {}", path.display(), e)))?;

    let mut triples = Vec::new();
    for (lineno, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let mut fields = line.split('\t');
        match (fields.next(), fields.next(), fields.next(), fields.next()) {
            (Some(s), Some(r), Some(o), None) => {
                triples.push((s.to_string(), r.to_string(), o.to_string()));
            }
            _ => {
                return Err(Error::Data(format!(
                    "{}:{}: expected 3 tab-separated fields, got {:?}",
                    path.display(),
                    lineno + 1,
                    line
                )));
            }
        }
    }
    Ok(triples)
}

fn index_split(
    entities: &Vocab,
    relations: &Vocab,
    triples: &[(String, String, String)],
) -> Result<Vec<Triple>> {
    triples
        .iter()
        .map(|(s, r, o)| {
            let subject = entities
                .index_of(s)
                .ok_or_else(|| Error::Data(format!("unknown entity: {}", s)))?;
            let relation = relations
                .index_of(r)
                .ok_or_else(|| Error::Data(format!("unknown relation: {}", r)))?;
            let object = entities
                .index_of(o)
                .ok_or_else(|| Error::Data(format!("unknown entity: {}", o)))?;
            Ok(Triple::new(subject, relation, object))
        })
        .collect()
}
