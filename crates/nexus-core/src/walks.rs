//! Biased random walks (node2vec)
//!
//! Second-order walks over the interaction graph. From `cur`, having arrived
//! from `prev`, the unnormalized weight of stepping to neighbour `x` is:
//!
//! - `1/p` if `x == prev` (return)
//! - `1` if `x` is also a neighbour of `prev`
//! - `1/q` otherwise (move outward)
//!
//! Every (node, walk number) draws from its own RNG derived from the seed, so
//! the corpus is identical whether generated sequentially or with rayon
//! (`parallel` feature).

use crate::config::EmbeddingConfig;
use crate::graph::InteractionGraph;
use crate::predictor::CancelToken;
use crate::Seed;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// A walk as a sequence of node indices
pub type Walk = Vec<usize>;

/// Walk generator bound to a graph and its parameters
pub struct WalkGenerator<'g> {
    graph: &'g InteractionGraph,
    walk_length: usize,
    num_walks: usize,
    inv_p: f64,
    inv_q: f64,
    seed: Seed,
}

impl<'g> WalkGenerator<'g> {
    pub fn new(graph: &'g InteractionGraph, config: &EmbeddingConfig) -> Self {
        WalkGenerator {
            graph,
            walk_length: config.walk_length,
            num_walks: config.num_walks,
            inv_p: 1.0 / config.return_param,
            inv_q: 1.0 / config.in_out_param,
            seed: Seed::from_string(&config.seed),
        }
    }

    /// (walk number, start node) pairs; isolated nodes never start a walk
    fn jobs(&self) -> Vec<(usize, usize)> {
        let starts: Vec<usize> = (0..self.graph.node_count())
            .filter(|&n| self.graph.degree(n) > 0)
            .collect();
        (0..self.num_walks)
            .flat_map(|w| starts.iter().map(move |&n| (w, n)))
            .collect()
    }

    /// Generate the full corpus, or `None` if cancelled
    pub fn generate(&self, cancel: &CancelToken) -> Option<Vec<Walk>> {
        #[cfg(feature = "parallel")]
        {
            self.generate_parallel(cancel)
        }
        #[cfg(not(feature = "parallel"))]
        {
            self.generate_sequential(cancel)
        }
    }

    pub fn generate_sequential(&self, cancel: &CancelToken) -> Option<Vec<Walk>> {
        let jobs = self.jobs();
        let mut walks = Vec::with_capacity(jobs.len());
        for (walk_no, start) in jobs {
            if cancel.is_cancelled() {
                return None;
            }
            walks.push(self.walk_from(start, walk_no));
        }
        Some(walks)
    }

    #[cfg(feature = "parallel")]
    pub fn generate_parallel(&self, cancel: &CancelToken) -> Option<Vec<Walk>> {
        use rayon::prelude::*;

        self.jobs()
            .into_par_iter()
            .map(|(walk_no, start)| {
                if cancel.is_cancelled() {
                    None
                } else {
                    Some(self.walk_from(start, walk_no))
                }
            })
            .collect()
    }

    /// One walk from `start`, deterministic in (seed, start, walk_no)
    pub fn walk_from(&self, start: usize, walk_no: usize) -> Walk {
        let label = self.graph.node_name(start).unwrap_or_default();
        let mut rng = ChaCha8Rng::from_seed(*self.seed.derive(label, walk_no as u64).as_bytes());

        let mut walk = Vec::with_capacity(self.walk_length);
        walk.push(start);

        while walk.len() < self.walk_length {
            let cur = walk[walk.len() - 1];
            let neighbors: Vec<usize> = self.graph.neighbors(cur).iter().copied().collect();
            if neighbors.is_empty() {
                break;
            }
            let next = if walk.len() == 1 {
                neighbors[rng.gen_range(0..neighbors.len())]
            } else {
                let prev = walk[walk.len() - 2];
                self.biased_step(&neighbors, prev, &mut rng)
            };
            walk.push(next);
        }
        walk
    }

    fn biased_step(&self, neighbors: &[usize], prev: usize, rng: &mut impl Rng) -> usize {
        let weights: Vec<f64> = neighbors
            .iter()
            .map(|&x| {
                if x == prev {
                    self.inv_p
                } else if self.graph.has_neighbor(prev, x) {
                    1.0
                } else {
                    self.inv_q
                }
            })
            .collect();

        let total: f64 = weights.iter().sum();
        let mut target = rng.gen::<f64>() * total;
        for (&x, &w) in neighbors.iter().zip(&weights) {
            if target < w {
                return x;
            }
            target -= w;
        }
        neighbors[neighbors.len() - 1]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::EdgeSource;
    use crate::scorer::SeverityBand;

    fn path_graph() -> InteractionGraph {
        let mut g = InteractionGraph::new();
        g.add_edge("a", "b", SeverityBand::Major, EdgeSource::Catalog);
        g.add_edge("b", "c", SeverityBand::Minor, EdgeSource::Catalog);
        g.add_edge("c", "d", SeverityBand::Minor, EdgeSource::Catalog);
        g.add_node("isolated");
        g
    }

    fn config() -> EmbeddingConfig {
        EmbeddingConfig::default().with_walk_length(8).with_num_walks(4)
    }

    #[test]
    fn test_walks_follow_edges() {
        let g = path_graph();
        let walks = WalkGenerator::new(&g, &config())
            .generate_sequential(&CancelToken::new())
            .unwrap();

        // 4 connected nodes x 4 walks
        assert_eq!(walks.len(), 16);
        for walk in &walks {
            assert_eq!(walk.len(), 8);
            for step in walk.windows(2) {
                assert!(g.has_neighbor(step[0], step[1]));
            }
        }
    }

    #[test]
    fn test_isolated_nodes_do_not_walk() {
        let g = path_graph();
        let isolated = g.index_of("isolated").unwrap();
        let walks = WalkGenerator::new(&g, &config())
            .generate_sequential(&CancelToken::new())
            .unwrap();
        assert!(walks.iter().all(|w| !w.contains(&isolated)));
    }

    #[test]
    fn test_walks_are_reproducible() {
        let g = path_graph();
        let gen = WalkGenerator::new(&g, &config());
        assert_eq!(gen.walk_from(0, 3), gen.walk_from(0, 3));

        let other = WalkGenerator::new(&g, &config().with_seed("another"));
        let a: Vec<Walk> = (0..10).map(|w| gen.walk_from(1, w)).collect();
        let b: Vec<Walk> = (0..10).map(|w| other.walk_from(1, w)).collect();
        assert_ne!(a, b);
    }

    #[test]
    fn test_low_p_favours_return() {
        // star: hub b with leaves; tiny p makes returning to the previous node dominant
        let mut g = InteractionGraph::new();
        for leaf in ["a", "c", "d", "e", "f"] {
            g.add_edge("b", leaf, SeverityBand::Minor, EdgeSource::Catalog);
        }
        let cfg = config().with_bias(0.01, 1.0).with_walk_length(3);
        let gen = WalkGenerator::new(&g, &cfg);
        let a = g.index_of("a").unwrap();

        let returns = (0..50)
            .map(|w| gen.walk_from(a, w))
            .filter(|walk| walk[2] == a)
            .count();
        assert!(returns > 40, "returns = {}", returns);
    }

    #[test]
    fn test_cancelled_generation_returns_none() {
        let g = path_graph();
        let cancel = CancelToken::new();
        cancel.cancel();
        assert!(WalkGenerator::new(&g, &config()).generate(&cancel).is_none());
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn test_parallel_matches_sequential() {
        let g = path_graph();
        let gen = WalkGenerator::new(&g, &config());
        let cancel = CancelToken::new();
        assert_eq!(gen.generate_parallel(&cancel), gen.generate_sequential(&cancel));
    }
}
