//! Skip-gram embeddings over walk corpora
//!
//! Word2vec-style skip-gram with negative sampling. Nodes play the role of
//! words and walks the role of sentences.

use crate::config::EmbeddingConfig;
use crate::graph::InteractionGraph;
use crate::predictor::CancelToken;
use crate::walks::Walk;
use crate::Seed;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Size of the negative-sampling table
const UNIGRAM_TABLE_SIZE: usize = 100_000;

/// Sigmoid input is clamped to this magnitude
const MAX_EXP: f32 = 6.0;

/// Learning rate never decays below this fraction of the initial rate
const MIN_LR_FRACTION: f64 = 1e-4;

/// Cosine similarity of two real vectors, in [-1, 1]
///
/// Zero-norm input yields 0.0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    debug_assert_eq!(a.len(), b.len(), "Vectors must have same length");

    let (mut dot, mut norm_a, mut norm_b) = (0.0f64, 0.0f64, 0.0f64);
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (*x as f64, *y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(-1.0, 1.0)
}

/// Cosine similarity rescaled to [0, 1]
#[inline]
pub fn normalized_cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    (cosine_similarity(a, b) + 1.0) / 2.0
}

/// Trained node vectors keyed by drug token
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Embeddings {
    dimensions: usize,
    vectors: HashMap<String, Vec<f32>>,
}

impl Embeddings {
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn get(&self, drug: &str) -> Option<&[f32]> {
        self.vectors.get(drug).map(Vec::as_slice)
    }

    pub fn contains(&self, drug: &str) -> bool {
        self.vectors.contains_key(drug)
    }

    /// Normalized cosine similarity, if both drugs are embedded
    pub fn similarity(&self, a: &str, b: &str) -> Option<f64> {
        Some(normalized_cosine_similarity(self.get(a)?, self.get(b)?))
    }
}

/// Fits skip-gram vectors to a walk corpus
pub struct SkipGramTrainer<'c> {
    config: &'c EmbeddingConfig,
    seed: Seed,
}

impl<'c> SkipGramTrainer<'c> {
    pub fn new(config: &'c EmbeddingConfig) -> Self {
        SkipGramTrainer {
            config,
            seed: Seed::from_string(&config.seed),
        }
    }

    /// Train on `walks` over `graph`'s nodes, or `None` if cancelled
    ///
    /// Only nodes that occur in at least one walk receive a vector.
    pub fn fit(&self, graph: &InteractionGraph, walks: &[Walk], cancel: &CancelToken) -> Option<Embeddings> {
        let dim = self.config.dimensions;
        let node_count = graph.node_count();

        let mut counts = vec![0u64; node_count];
        for walk in walks {
            for &node in walk {
                counts[node] += 1;
            }
        }
        let total_tokens: u64 = counts.iter().sum();
        if total_tokens == 0 {
            return Some(Embeddings {
                dimensions: dim,
                vectors: HashMap::new(),
            });
        }

        let table = unigram_table(&counts);
        let mut rng = ChaCha8Rng::from_seed(*self.seed.derive("skip-gram", 0).as_bytes());

        let bound = 0.5 / dim as f32;
        let mut input: Vec<f32> = (0..node_count * dim)
            .map(|_| rng.gen_range(-bound..bound))
            .collect();
        let mut output = vec![0.0f32; node_count * dim];
        let mut gradient = vec![0.0f32; dim];

        let epochs = self.config.epochs.max(1);
        let planned = (total_tokens * epochs as u64) as f64;
        let mut processed = 0u64;

        for _ in 0..epochs {
            for walk in walks {
                if cancel.is_cancelled() {
                    return None;
                }
                let progress = processed as f64 / planned;
                let lr = (self.config.learning_rate * (1.0 - progress))
                    .max(self.config.learning_rate * MIN_LR_FRACTION) as f32;

                for (i, &center) in walk.iter().enumerate() {
                    let span = self.config.window - rng.gen_range(0..self.config.window);
                    let lo = i.saturating_sub(span);
                    let hi = (i + span).min(walk.len() - 1);

                    for j in lo..=hi {
                        if j == i {
                            continue;
                        }
                        let context = walk[j];
                        gradient.iter_mut().for_each(|g| *g = 0.0);
                        let center_vec = &input[center * dim..(center + 1) * dim];

                        for k in 0..=self.config.negative_samples {
                            let (target, label) = if k == 0 {
                                (context, 1.0f32)
                            } else {
                                let sampled = table[rng.gen_range(0..table.len())];
                                if sampled == context {
                                    continue;
                                }
                                (sampled, 0.0f32)
                            };

                            let target_vec = &mut output[target * dim..(target + 1) * dim];
                            let f: f32 = center_vec.iter().zip(target_vec.iter()).map(|(a, b)| a * b).sum();
                            let g = (label - sigmoid(f)) * lr;

                            for d in 0..dim {
                                gradient[d] += g * target_vec[d];
                                target_vec[d] += g * center_vec[d];
                            }
                        }

                        let center_vec = &mut input[center * dim..(center + 1) * dim];
                        for d in 0..dim {
                            center_vec[d] += gradient[d];
                        }
                    }
                    processed += 1;
                }
            }
        }

        let vectors = (0..node_count)
            .filter(|&n| counts[n] > 0)
            .filter_map(|n| {
                let name = graph.node_name(n)?;
                Some((name.to_string(), input[n * dim..(n + 1) * dim].to_vec()))
            })
            .collect();

        Some(Embeddings {
            dimensions: dim,
            vectors,
        })
    }
}

fn sigmoid(x: f32) -> f32 {
    let x = x.clamp(-MAX_EXP, MAX_EXP);
    1.0 / (1.0 + (-x).exp())
}

/// Negative-sampling table with node frequency raised to 0.75
fn unigram_table(counts: &[u64]) -> Vec<usize> {
    let weights: Vec<f64> = counts.iter().map(|&c| (c as f64).powf(0.75)).collect();
    let total: f64 = weights.iter().sum();

    let mut table = Vec::with_capacity(UNIGRAM_TABLE_SIZE);
    for (node, &w) in weights.iter().enumerate() {
        if w == 0.0 {
            continue;
        }
        let slots = ((w / total) * UNIGRAM_TABLE_SIZE as f64).round().max(1.0) as usize;
        table.extend(std::iter::repeat(node).take(slots));
    }
    table
}
