//! Engine context
//!
//! [`NexusEngine`] is built once at startup from a [`NexusConfig`], shared by
//! reference with request handlers, and shut down explicitly to flush the
//! ledger.
//!
//! ```rust
//! use nexus_core::{InteractionGraph, NexusConfig, NexusEngine, Seed};
//!
//! let graph = InteractionGraph::demo(&Seed::from_string("doc"));
//! let engine = NexusEngine::ephemeral(NexusConfig::default(), graph);
//!
//! let outcome = engine.check_interactions(&["Coumadin", "Aspirin 81mg"]).unwrap();
//! assert_eq!(outcome.assessment.drugs, vec!["warfarin", "aspirin"]);
//! assert!(engine.verify_ledger());
//! ```

use crate::assessment::RiskAssessment;
use crate::config::NexusConfig;
use crate::graph::{InteractionEdge, InteractionGraph};
use crate::knowledge::KnowledgeBase;
use crate::ledger::{AuditBlock, AuditLedger};
use crate::predictor::{CancelToken, InteractionPredictor, Prediction, PredictorStatus, TrainOutcome};
use crate::resolver::{DrugResolver, Resolution};
use crate::scorer::{RegionScorer, SeverityBand};
use crate::{Result, Seed};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::thread::JoinHandle;

/// Documented pairs listed in the analytics summary
const TOP_RISKY_PAIRS: usize = 5;

/// Result of `check_interactions`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckOutcome {
    /// One per input name, in input order
    pub resolutions: Vec<Resolution>,
    pub assessment: RiskAssessment,
    /// Hash of the ledger block recording this assessment
    pub receipt: String,
}

/// Graph and ledger overview for dashboards
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsSummary {
    pub drugs: usize,
    pub interactions: usize,
    pub severity_distribution: BTreeMap<SeverityBand, usize>,
    pub top_risky_pairs: Vec<InteractionEdge>,
    pub predictor: PredictorStatus,
    pub ledger_blocks: usize,
}

pub struct NexusEngine {
    config: NexusConfig,
    resolver: Arc<DrugResolver>,
    scorer: RegionScorer,
    graph: Arc<InteractionGraph>,
    predictor: Arc<InteractionPredictor>,
    ledger: AuditLedger,
}

impl NexusEngine {
    /// Build from configuration: load the catalog (or demo graph) and open the ledger
    pub fn new(config: NexusConfig) -> Result<Self> {
        config.validate()?;
        let graph = Self::load_graph(&config);
        let ledger = AuditLedger::open(config.audit_chain_path())?;
        Ok(Self::assemble(config, graph, ledger))
    }

    /// Engine over a given graph with an in-memory ledger
    pub fn ephemeral(config: NexusConfig, graph: InteractionGraph) -> Self {
        Self::assemble(config, graph, AuditLedger::in_memory())
    }

    fn assemble(config: NexusConfig, graph: InteractionGraph, ledger: AuditLedger) -> Self {
        let knowledge = Arc::new(KnowledgeBase::builtin());
        let resolver = Arc::new(DrugResolver::new(knowledge.clone(), config.cache_capacity));
        let scorer = RegionScorer::new(knowledge, resolver.clone(), config.cache_capacity);
        let graph = Arc::new(graph);
        let predictor = Arc::new(InteractionPredictor::new(graph.clone(), config.embedding.clone()));

        log::info!(
            "Engine ready: {} drugs / {} interactions in graph, {} ledger blocks",
            graph.node_count(),
            graph.edge_count(),
            ledger.len()
        );

        NexusEngine {
            config,
            resolver,
            scorer,
            graph,
            predictor,
            ledger,
        }
    }

    fn load_graph(config: &NexusConfig) -> InteractionGraph {
        let catalog = config.catalog_path();
        if catalog.exists() {
            InteractionGraph::load_catalog(&catalog)
        } else if config.bootstrap_demo_graph {
            log::info!("No catalog at {}; using demonstration graph", catalog.display());
            InteractionGraph::demo(&Seed::from_string(&config.embedding.seed))
        } else {
            log::info!("No catalog at {}; graph is empty", catalog.display());
            InteractionGraph::new()
        }
    }

    pub fn config(&self) -> &NexusConfig {
        &self.config
    }

    pub fn resolver(&self) -> &DrugResolver {
        &self.resolver
    }

    pub fn scorer(&self) -> &RegionScorer {
        &self.scorer
    }

    pub fn graph(&self) -> &InteractionGraph {
        &self.graph
    }

    pub fn predictor(&self) -> &Arc<InteractionPredictor> {
        &self.predictor
    }

    pub fn ledger(&self) -> &AuditLedger {
        &self.ledger
    }

    pub fn resolve(&self, raw: &str) -> Resolution {
        self.resolver.resolve(raw)
    }

    /// Resolve, score and record a drug list
    ///
    /// Fails only if the ledger cannot be persisted.
    pub fn check_interactions<S: AsRef<str>>(&self, drugs: &[S]) -> Result<CheckOutcome> {
        let resolutions = self.resolver.resolve_all(drugs);
        let canonical: Vec<&str> = resolutions.iter().map(|r| r.canonical.as_str()).collect();
        let assessment = RiskAssessment::assess(&self.scorer, &canonical);
        let receipt = self.ledger.append_record(&assessment.ledger_summary())?;

        log::debug!(
            "Checked {} drugs: global risk {:.2}, {} interactions, receipt {}",
            assessment.drugs.len(),
            assessment.global_risk,
            assessment.interactions.len(),
            receipt
        );

        Ok(CheckOutcome {
            resolutions,
            assessment,
            receipt,
        })
    }

    /// Resolve both names, then predict
    pub fn predict_interaction(&self, drug_a: &str, drug_b: &str) -> Prediction {
        let a = self.resolver.canonical(drug_a);
        let b = self.resolver.canonical(drug_b);
        self.predictor.predict(&a, &b)
    }

    pub fn predictor_status(&self) -> PredictorStatus {
        self.predictor.status()
    }

    /// Train on the calling thread
    pub fn train_predictor(&self) -> TrainOutcome {
        self.predictor.train()
    }

    pub fn train_predictor_with(&self, cancel: &CancelToken) -> TrainOutcome {
        self.predictor.train_with(cancel)
    }

    /// Train on a dedicated thread; join the handle to await completion
    pub fn train_predictor_in_background(&self, cancel: CancelToken) -> Result<JoinHandle<TrainOutcome>> {
        self.predictor.train_in_background(cancel)
    }

    pub fn verify_ledger(&self) -> bool {
        let valid = self.ledger.verify();
        if !valid {
            log::warn!("Audit chain failed verification");
        }
        valid
    }

    pub fn audit_chain(&self) -> Vec<AuditBlock> {
        self.ledger.all()
    }

    pub fn analytics_summary(&self) -> AnalyticsSummary {
        AnalyticsSummary {
            drugs: self.graph.node_count(),
            interactions: self.graph.edge_count(),
            severity_distribution: self.graph.severity_distribution(),
            top_risky_pairs: self
                .graph
                .top_risky_pairs(TOP_RISKY_PAIRS)
                .into_iter()
                .cloned()
                .collect(),
            predictor: self.predictor.status(),
            ledger_blocks: self.ledger.len(),
        }
    }

    /// Flush the ledger and release the engine
    pub fn shutdown(self) -> Result<()> {
        self.ledger.flush()?;
        log::info!("Engine shut down; audit chain holds {} blocks", self.ledger.len());
        Ok(())
    }
}

impl std::fmt::Debug for NexusEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NexusEngine")
            .field("graph_nodes", &self.graph.node_count())
            .field("predictor", &self.predictor.status())
            .field("ledger_blocks", &self.ledger.len())
            .finish()
    }
}
