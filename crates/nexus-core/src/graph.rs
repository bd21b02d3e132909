//! Known-Interaction Graph
//!
//! Undirected graph whose nodes are canonical drug tokens and whose edges are
//! documented (`catalog`) or synthetic (`inferred`) interactions. Edges are
//! symmetric: `(a, b)` and `(b, a)` are the same edge.

use crate::scorer::SeverityBand;
use crate::{NexusError, Result, Seed};
use rand::seq::index;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::io::Read;
use std::path::Path;

/// Where an edge came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeSource {
    /// Documented interaction from the catalog
    Catalog,
    /// Synthetic edge added for graph density
    Inferred,
}

/// One undirected interaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionEdge {
    pub drug_a: String,
    pub drug_b: String,
    pub severity: SeverityBand,
    pub source: EdgeSource,
}

/// Node/link listing for visualization consumers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphView {
    pub nodes: Vec<GraphNode>,
    pub links: Vec<InteractionEdge>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    pub degree: usize,
}

/// Drugs used to bootstrap the demonstration graph
const DEMO_DRUGS: &[&str] = &[
    "aspirin", "warfarin", "ibuprofen", "acetaminophen", "lisinopril",
    "simvastatin", "metformin", "amoxicillin", "omeprazole", "losartan",
    "atorvastatin", "levothyroxine", "amlodipine", "metoprolol", "gabapentin",
    "ciprofloxacin", "azithromycin", "sertraline", "fluoxetine", "alprazolam",
    "cefotaxime", "erythromycin", "doxycycline", "tramadol", "naproxen",
    "prednisone", "furosemide", "clopidogrel",
];

/// Documented risky pairs seeded into the demonstration graph
const DEMO_INTERACTIONS: &[(&str, &str, SeverityBand)] = &[
    ("warfarin", "aspirin", SeverityBand::Major),
    ("warfarin", "ibuprofen", SeverityBand::Major),
    ("lisinopril", "losartan", SeverityBand::Moderate),
    ("simvastatin", "amlodipine", SeverityBand::Moderate),
    ("metformin", "lisinopril", SeverityBand::Minor),
    ("aspirin", "acetaminophen", SeverityBand::Moderate),
    ("metformin", "acetaminophen", SeverityBand::Minor),
    ("cefotaxime", "aspirin", SeverityBand::Moderate),
    ("erythromycin", "aspirin", SeverityBand::Moderate),
    ("cefotaxime", "erythromycin", SeverityBand::Minor),
    ("erythromycin", "warfarin", SeverityBand::Major),
    ("ciprofloxacin", "warfarin", SeverityBand::Major),
    ("tramadol", "sertraline", SeverityBand::Major),
];

/// Random inferred edges attempted when bootstrapping
const DEMO_INFERRED_ATTEMPTS: usize = 20;

/// Undirected interaction graph
#[derive(Debug, Clone, Default)]
pub struct InteractionGraph {
    nodes: Vec<String>,
    index: HashMap<String, usize>,
    adjacency: Vec<BTreeSet<usize>>,
    edges: BTreeMap<(usize, usize), InteractionEdge>,
}

fn node_key(name: &str) -> String {
    name.trim().to_lowercase()
}

fn edge_key(a: usize, b: usize) -> (usize, usize) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

impl InteractionGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node if absent and return its index
    pub fn add_node(&mut self, name: &str) -> usize {
        let key = node_key(name);
        if let Some(&idx) = self.index.get(&key) {
            return idx;
        }
        let idx = self.nodes.len();
        self.nodes.push(key.clone());
        self.index.insert(key, idx);
        self.adjacency.push(BTreeSet::new());
        idx
    }

    /// Insert or update an edge; returns true if the pair was new
    ///
    /// Self-pairs and empty names are ignored. An inferred edge never replaces
    /// an existing edge; a catalog edge replaces whatever was there.
    pub fn add_edge(&mut self, drug_a: &str, drug_b: &str, severity: SeverityBand, source: EdgeSource) -> bool {
        let a_key = node_key(drug_a);
        let b_key = node_key(drug_b);
        if a_key.is_empty() || b_key.is_empty() || a_key == b_key {
            return false;
        }
        let a = self.add_node(&a_key);
        let b = self.add_node(&b_key);
        let key = edge_key(a, b);

        let existed = self.edges.contains_key(&key);
        if existed && source == EdgeSource::Inferred {
            return false;
        }
        self.edges.insert(
            key,
            InteractionEdge {
                drug_a: a_key,
                drug_b: b_key,
                severity,
                source,
            },
        );
        self.adjacency[a].insert(b);
        self.adjacency[b].insert(a);
        !existed
    }

    /// Parse a DDInter-style CSV catalog
    ///
    /// Drug columns are found by header (`Drug_A`/`Drug_B`, `drug1`/`drug2`),
    /// falling back to the first two columns; severity comes from a
    /// `level`/`severity` column when present.
    pub fn from_catalog_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers: Vec<String> = csv_reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_lowercase())
            .collect();
        if headers.len() < 2 {
            return Err(NexusError::MalformedCatalog(format!(
                "expected at least two columns, found {}",
                headers.len()
            )));
        }

        let col_a = find_drug_column(&headers, "a", '1').unwrap_or(0);
        let col_b = find_drug_column(&headers, "b", '2')
            .filter(|&c| c != col_a)
            .unwrap_or(if col_a == 1 { 0 } else { 1 });
        let level_col = headers
            .iter()
            .position(|h| h.contains("level") || h.contains("severity"));

        let mut graph = InteractionGraph::new();
        for record in csv_reader.records() {
            let record = record?;
            let (Some(a), Some(b)) = (record.get(col_a), record.get(col_b)) else {
                continue;
            };
            let severity = level_col
                .and_then(|c| record.get(c))
                .map(SeverityBand::from_label)
                .unwrap_or(SeverityBand::Unknown);
            graph.add_edge(a, b, severity, EdgeSource::Catalog);
        }

        log::info!(
            "Loaded {} drugs and {} interactions from catalog",
            graph.node_count(),
            graph.edge_count()
        );
        Ok(graph)
    }

    /// Parse a catalog file
    pub fn from_catalog_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|e| NexusError::io(path, e))?;
        Self::from_catalog_reader(std::io::BufReader::new(file))
    }

    /// Load a catalog, logging and returning an empty graph on failure
    pub fn load_catalog<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match Self::from_catalog_csv(path) {
            Ok(graph) => graph,
            Err(e) => {
                log::error!("Failed to load catalog {}: {}", path.display(), e);
                InteractionGraph::new()
            }
        }
    }

    /// Demonstration graph: documented risky pairs plus seeded random edges
    pub fn demo(seed: &Seed) -> Self {
        let mut graph = InteractionGraph::new();
        for drug in DEMO_DRUGS {
            graph.add_node(drug);
        }
        for (a, b, severity) in DEMO_INTERACTIONS {
            graph.add_edge(a, b, *severity, EdgeSource::Catalog);
        }

        let mut rng = ChaCha20Rng::from_seed(*seed.derive("demo-graph", 0).as_bytes());
        let mut inferred = 0;
        for _ in 0..DEMO_INFERRED_ATTEMPTS {
            let pick = index::sample(&mut rng, DEMO_DRUGS.len(), 2);
            let (a, b) = (DEMO_DRUGS[pick.index(0)], DEMO_DRUGS[pick.index(1)]);
            if graph.add_edge(a, b, SeverityBand::Unknown, EdgeSource::Inferred) {
                inferred += 1;
            }
        }

        log::info!(
            "Bootstrapped demonstration graph: {} drugs, {} documented and {} inferred interactions",
            graph.node_count(),
            DEMO_INTERACTIONS.len(),
            inferred
        );
        graph
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[String] {
        &self.nodes
    }

    pub fn node_name(&self, idx: usize) -> Option<&str> {
        self.nodes.get(idx).map(String::as_str)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(&node_key(name)).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index_of(name).is_some()
    }

    /// Neighbour indices of a node, in index order
    pub fn neighbors(&self, idx: usize) -> &BTreeSet<usize> {
        &self.adjacency[idx]
    }

    pub fn has_neighbor(&self, idx: usize, other: usize) -> bool {
        self.adjacency[idx].contains(&other)
    }

    pub fn degree(&self, idx: usize) -> usize {
        self.adjacency.get(idx).map_or(0, BTreeSet::len)
    }

    pub fn edges(&self) -> impl Iterator<Item = &InteractionEdge> {
        self.edges.values()
    }

    /// Edge between two drugs, if any
    pub fn check_interaction(&self, drug_a: &str, drug_b: &str) -> Option<&InteractionEdge> {
        let a = self.index_of(drug_a)?;
        let b = self.index_of(drug_b)?;
        self.edges.get(&edge_key(a, b))
    }

    /// Whether a documented (catalog) edge links the pair
    pub fn is_known(&self, drug_a: &str, drug_b: &str) -> bool {
        self.check_interaction(drug_a, drug_b)
            .map_or(false, |e| e.source == EdgeSource::Catalog)
    }

    /// Induced subgraph over the drugs present in this graph
    pub fn subgraph<S: AsRef<str>>(&self, drugs: &[S]) -> InteractionGraph {
        let wanted: BTreeSet<usize> = drugs
            .iter()
            .filter_map(|d| self.index_of(d.as_ref()))
            .collect();

        let mut sub = InteractionGraph::new();
        for &idx in &wanted {
            sub.add_node(&self.nodes[idx]);
        }
        for (&(a, b), edge) in &self.edges {
            if wanted.contains(&a) && wanted.contains(&b) {
                sub.add_edge(&edge.drug_a, &edge.drug_b, edge.severity, edge.source);
            }
        }
        sub
    }

    /// Count of edges per severity label
    pub fn severity_distribution(&self) -> BTreeMap<SeverityBand, usize> {
        let mut counts = BTreeMap::new();
        for edge in self.edges.values() {
            *counts.entry(edge.severity).or_insert(0) += 1;
        }
        counts
    }

    /// Documented edges, most severe first, then by name
    pub fn top_risky_pairs(&self, limit: usize) -> Vec<&InteractionEdge> {
        let mut catalog: Vec<&InteractionEdge> = self
            .edges
            .values()
            .filter(|e| e.source == EdgeSource::Catalog)
            .collect();
        catalog.sort_by(|x, y| {
            y.severity
                .cmp(&x.severity)
                .then_with(|| x.drug_a.cmp(&y.drug_a))
                .then_with(|| x.drug_b.cmp(&y.drug_b))
        });
        catalog.truncate(limit);
        catalog
    }

    pub fn to_view(&self) -> GraphView {
        GraphView {
            nodes: self
                .nodes
                .iter()
                .enumerate()
                .map(|(idx, id)| GraphNode {
                    id: id.clone(),
                    degree: self.degree(idx),
                })
                .collect(),
            links: self.edges.values().cloned().collect(),
        }
    }
}

/// Header position for one side of the drug pair
///
/// Matches a header mentioning "drug" and either the side letter as its own
/// token (`drug_a`, `Drug A`) or the side digit (`drug1`).
fn find_drug_column(headers: &[String], letter: &str, digit: char) -> Option<usize> {
    headers.iter().position(|h| {
        h.contains("drug")
            && (h.contains(digit) || h.split(|c: char| !c.is_alphanumeric()).any(|t| t == letter))
    })
}
