//! Interaction Predictor
//!
//! Estimates interaction likelihood for drug pairs with no documented edge,
//! from node2vec embeddings of the interaction graph.
//!
//! State machine: `Untrained → Trained`. Re-training replaces the embeddings
//! in place. Training is skipped, leaving the predictor untouched, when the
//! graph has fewer than `min_nodes` nodes.
//!
//! Only one training runs at a time per predictor. A caller that arrives while
//! another training is in progress waits for it and reuses its result.

use crate::config::EmbeddingConfig;
use crate::embedding::{Embeddings, SkipGramTrainer};
use crate::graph::InteractionGraph;
use crate::walks::WalkGenerator;
use crate::{NexusError, Result};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

pub const KNOWN_COMMENT: &str = "Known interaction found in database.";
pub const INSUFFICIENT_DATA_COMMENT: &str = "Insufficient data for prediction.";
pub const HIGH_RISK_COMMENT: &str = "High similarity to interacting pairs. Potential risk.";
pub const MODERATE_RISK_COMMENT: &str = "Moderate similarity. Monitor closely.";
pub const LOW_RISK_COMMENT: &str = "Low risk predicted.";

// ============================================================================
// Cancellation
// ============================================================================

/// Best-effort cancellation for training, with an optional deadline
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Token that also trips once `timeout` has elapsed
    pub fn with_timeout(timeout: Duration) -> Self {
        CancelToken {
            flag: Arc::new(AtomicBool::new(false)),
            deadline: Some(Instant::now() + timeout),
        }
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire) || self.deadline.map_or(false, |d| Instant::now() >= d)
    }
}

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictorStatus {
    Untrained,
    Trained,
}

/// Result of one `train` call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum TrainOutcome {
    /// Embeddings were (re)built
    Trained { embedded_nodes: usize },
    /// Graph below `min_nodes`; state unchanged
    SkippedTooSmall { nodes: usize, min_nodes: usize },
    /// Parameters unusable; state unchanged
    InvalidConfig { reason: String },
    /// Cancelled or timed out; state unchanged
    Cancelled,
    /// A concurrent training finished while this call waited
    Reused,
}

/// Interaction estimate for one pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub known: bool,
    /// In [0, 1]
    pub score: f64,
    pub comment: String,
}

impl Prediction {
    fn known() -> Self {
        Prediction {
            known: true,
            score: 1.0,
            comment: KNOWN_COMMENT.to_string(),
        }
    }

    fn insufficient() -> Self {
        Prediction {
            known: false,
            score: 0.0,
            comment: INSUFFICIENT_DATA_COMMENT.to_string(),
        }
    }

    fn estimated(score: f64) -> Self {
        let score = score.clamp(0.0, 1.0);
        let comment = if score > 0.7 {
            HIGH_RISK_COMMENT
        } else if score > 0.4 {
            MODERATE_RISK_COMMENT
        } else {
            LOW_RISK_COMMENT
        };
        Prediction {
            known: false,
            score,
            comment: comment.to_string(),
        }
    }
}

// ============================================================================
// Predictor
// ============================================================================

pub struct InteractionPredictor {
    graph: Arc<InteractionGraph>,
    config: EmbeddingConfig,
    embeddings: RwLock<Option<Arc<Embeddings>>>,
    training: Mutex<()>,
    /// Incremented after every successful training
    generation: AtomicU64,
}

impl InteractionPredictor {
    pub fn new(graph: Arc<InteractionGraph>, config: EmbeddingConfig) -> Self {
        InteractionPredictor {
            graph,
            config,
            embeddings: RwLock::new(None),
            training: Mutex::new(()),
            generation: AtomicU64::new(0),
        }
    }

    pub fn graph(&self) -> &InteractionGraph {
        &self.graph
    }

    pub fn status(&self) -> PredictorStatus {
        if self.snapshot().is_some() {
            PredictorStatus::Trained
        } else {
            PredictorStatus::Untrained
        }
    }

    pub fn is_trained(&self) -> bool {
        self.status() == PredictorStatus::Trained
    }

    /// Current embeddings, if trained
    pub fn snapshot(&self) -> Option<Arc<Embeddings>> {
        self.embeddings
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Train until done; blocks the calling thread
    pub fn train(&self) -> TrainOutcome {
        self.train_with(&CancelToken::new())
    }

    /// Train with cancellation; blocks the calling thread
    pub fn train_with(&self, cancel: &CancelToken) -> TrainOutcome {
        let observed = self.generation.load(Ordering::Acquire);
        let _guard = self.training.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if self.generation.load(Ordering::Acquire) != observed {
            log::debug!("Concurrent training completed while waiting; reusing embeddings");
            return TrainOutcome::Reused;
        }

        let nodes = self.graph.node_count();
        if nodes < self.config.min_nodes {
            log::info!(
                "Graph too small for meaningful training ({} < {} nodes). Skipping.",
                nodes,
                self.config.min_nodes
            );
            return TrainOutcome::SkippedTooSmall {
                nodes,
                min_nodes: self.config.min_nodes,
            };
        }
        if let Err(e) = self.config.validate() {
            log::warn!("Training skipped: {}", e);
            return TrainOutcome::InvalidConfig { reason: e.to_string() };
        }

        log::info!(
            "Training node2vec embeddings: {} nodes, {} edges, dim={}, walks={}x{}",
            nodes,
            self.graph.edge_count(),
            self.config.dimensions,
            self.config.num_walks,
            self.config.walk_length
        );
        let started = Instant::now();

        let Some(walks) = WalkGenerator::new(&self.graph, &self.config).generate(cancel) else {
            log::info!("Training cancelled during walk generation");
            return TrainOutcome::Cancelled;
        };
        let Some(embeddings) = SkipGramTrainer::new(&self.config).fit(&self.graph, &walks, cancel) else {
            log::info!("Training cancelled during embedding fit");
            return TrainOutcome::Cancelled;
        };

        let embedded_nodes = embeddings.len();
        *self
            .embeddings
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(Arc::new(embeddings));
        self.generation.fetch_add(1, Ordering::AcqRel);

        log::info!(
            "Node2vec training complete: {} walks, {} nodes embedded in {:?}",
            walks.len(),
            embedded_nodes,
            started.elapsed()
        );
        TrainOutcome::Trained { embedded_nodes }
    }

    /// Train on a dedicated named thread
    pub fn train_in_background(self: &Arc<Self>, cancel: CancelToken) -> Result<JoinHandle<TrainOutcome>> {
        let predictor = Arc::clone(self);
        std::thread::Builder::new()
            .name("nexus-train".into())
            .spawn(move || predictor.train_with(&cancel))
            .map_err(NexusError::Thread)
    }

    /// Interaction estimate for a pair of canonical tokens
    pub fn predict(&self, drug_a: &str, drug_b: &str) -> Prediction {
        let a = drug_a.trim().to_lowercase();
        let b = drug_b.trim().to_lowercase();

        if self.graph.is_known(&a, &b) {
            return Prediction::known();
        }
        let Some(embeddings) = self.snapshot() else {
            return Prediction::insufficient();
        };
        match embeddings.similarity(&a, &b) {
            Some(score) => Prediction::estimated(score),
            None => Prediction::insufficient(),
        }
    }
}

impl std::fmt::Debug for InteractionPredictor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InteractionPredictor")
            .field("status", &self.status())
            .field("nodes", &self.graph.node_count())
            .finish()
    }
}
