//! Node2Vec second-order biased random walks
//!
//! Transition weight from `cur` (arrived from `prev`) to candidate `x`:
//!
//! - `w / p` if `x == prev` (return)
//! - `w`     if `x` is adjacent to `prev` (stay close)
//! - `w / q` otherwise (move outward)
//!
//! The first step of a walk is proportional to edge weight alone. Every walk
//! draws from its own rng seeded by `(seed, round, start node)`, so walks are
//! identical no matter how rayon schedules them.

use super::FeatureError;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

#[derive(Debug, Clone)]
pub struct WalkParams {
    pub walk_length: usize,
    pub num_walks: usize,
    pub p: f64,
    pub q: f64,
    pub workers: usize,
    pub seed: u64,
}

fn splitmix64(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Draw an index from a cumulative weight table
fn sample_cumulative<R: Rng>(cumulative: &[f64], rng: &mut R) -> usize {
    let total = cumulative[cumulative.len() - 1];
    let r = rng.gen::<f64>() * total;
    cumulative.partition_point(|&c| c <= r).min(cumulative.len() - 1)
}

pub struct Node2VecWalker<'a> {
    adj: &'a [Vec<(usize, f64)>],
    /// Per-node cumulative edge weights for first-order steps
    cumulative: Vec<Vec<f64>>,
    params: WalkParams,
}

impl<'a> Node2VecWalker<'a> {
    /// `adj` must have sorted neighbour lists (see `AddressGraph::adjacency`)
    pub fn new(adj: &'a [Vec<(usize, f64)>], params: WalkParams) -> Self {
        let cumulative = adj
            .iter()
            .map(|row| {
                let mut acc = 0.0;
                row.iter()
                    .map(|&(_, w)| {
                        acc += w;
                        acc
                    })
                    .collect()
            })
            .collect();

        Self {
            adj,
            cumulative,
            params,
        }
    }

    fn is_first_order(&self) -> bool {
        self.params.p == 1.0 && self.params.q == 1.0
    }

    fn adjacent(&self, a: usize, b: usize) -> bool {
        self.adj[a].binary_search_by_key(&b, |&(n, _)| n).is_ok()
    }

    fn next_step<R: Rng>(
        &self,
        prev: Option<usize>,
        cur: usize,
        rng: &mut R,
        scratch: &mut Vec<f64>,
    ) -> Option<usize> {
        let row = &self.adj[cur];
        if row.is_empty() {
            return None;
        }

        let prev = match prev {
            Some(prev) if !self.is_first_order() => prev,
            _ => return Some(row[sample_cumulative(&self.cumulative[cur], rng)].0),
        };

        scratch.clear();
        let mut acc = 0.0;
        for &(x, w) in row {
            let bias = if x == prev {
                1.0 / self.params.p
            } else if self.adjacent(x, prev) {
                1.0
            } else {
                1.0 / self.params.q
            };
            acc += w * bias;
            scratch.push(acc);
        }
        Some(row[sample_cumulative(scratch, rng)].0)
    }

    /// One walk of at most `walk_length` nodes, starting at `start`
    pub fn walk(&self, start: usize, round: usize) -> Vec<u32> {
        let seed = splitmix64(self.params.seed ^ splitmix64(((round as u64) << 32) | start as u64));
        let mut rng = StdRng::seed_from_u64(seed);
        let mut scratch = Vec::new();

        let mut walk = Vec::with_capacity(self.params.walk_length);
        walk.push(start as u32);
        let mut prev = None;
        let mut cur = start;

        while walk.len() < self.params.walk_length {
            match self.next_step(prev, cur, &mut rng, &mut scratch) {
                Some(next) => {
                    walk.push(next as u32);
                    prev = Some(cur);
                    cur = next;
                }
                None => break,
            }
        }
        walk
    }

    /// `num_walks` rounds; each round starts one walk from every node in a
    /// shuffled order
    pub fn simulate_walks(&self) -> Result<Vec<Vec<u32>>, FeatureError> {
        let n = self.adj.len();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.params.workers.max(1))
            .build()
            .map_err(|e| FeatureError::ThreadPool(e.to_string()))?;

        let mut order: Vec<usize> = (0..n).collect();
        let mut order_rng = StdRng::seed_from_u64(self.params.seed);
        let mut walks = Vec::with_capacity(n * self.params.num_walks);

        for round in 0..self.params.num_walks {
            order.shuffle(&mut order_rng);
            let batch: Vec<Vec<u32>> =
                pool.install(|| order.par_iter().map(|&node| self.walk(node, round)).collect());
            walks.extend(batch);
            log::debug!("Node2Vec walk round {}/{} done", round + 1, self.params.num_walks);
        }

        Ok(walks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(p: f64, q: f64) -> WalkParams {
        WalkParams {
            walk_length: 20,
            num_walks: 3,
            p,
            q,
            workers: 2,
            seed: 7,
        }
    }

    // 0 - 1 - 2 path plus 3 - 4 pair
    fn adjacency() -> Vec<Vec<(usize, f64)>> {
        vec![
            vec![(1, 3.0)],
            vec![(0, 3.0), (2, 3.0)],
            vec![(1, 3.0)],
            vec![(4, 5.0)],
            vec![(3, 5.0)],
        ]
    }

    #[test]
    fn test_walks_follow_edges() {
        let adj = adjacency();
        let walker = Node2VecWalker::new(&adj, params(0.5, 2.0));
        let walks = walker.simulate_walks().unwrap();

        assert_eq!(walks.len(), 5 * 3);
        for walk in &walks {
            assert_eq!(walk.len(), 20);
            for pair in walk.windows(2) {
                let (a, b) = (pair[0] as usize, pair[1] as usize);
                assert!(adj[a].iter().any(|&(n, _)| n == b), "{} -> {} is not an edge", a, b);
            }
        }
    }

    #[test]
    fn test_walks_are_reproducible() {
        let adj = adjacency();
        let first = Node2VecWalker::new(&adj, params(1.0, 1.0)).simulate_walks().unwrap();

        let mut more_workers = params(1.0, 1.0);
        more_workers.workers = 4;
        let second = Node2VecWalker::new(&adj, more_workers).simulate_walks().unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_dead_end_stops_walk() {
        let adj = vec![vec![], vec![]];
        let walker = Node2VecWalker::new(&adj, params(1.0, 1.0));
        assert_eq!(walker.walk(1, 0), vec![1]);
    }

    #[test]
    fn test_weighted_first_step() {
        // node 0 has a heavy edge to 1 and a light edge to 2
        let adj = vec![vec![(1, 99.0), (2, 1.0)], vec![(0, 99.0)], vec![(0, 1.0)]];
        let walker = Node2VecWalker::new(&adj, WalkParams { walk_length: 2, ..params(1.0, 1.0) });

        let heavy = (0..200).filter(|&round| walker.walk(0, round)[1] == 1).count();
        assert!(heavy > 170, "heavy edge taken only {} / 200 times", heavy);
    }

    #[test]
    fn test_low_p_favours_return() {
        // star: from a leaf through the hub, p ≪ 1 makes returning dominant
        let adj = vec![
            vec![(1, 1.0), (2, 1.0), (3, 1.0), (4, 1.0)],
            vec![(0, 1.0)],
            vec![(0, 1.0)],
            vec![(0, 1.0)],
            vec![(0, 1.0)],
        ];
        let walker = Node2VecWalker::new(&adj, WalkParams { walk_length: 3, ..params(0.01, 1.0) });

        let returned = (0..200).filter(|&round| {
            let walk = walker.walk(1, round);
            walk[2] == walk[0]
        });
        assert!(returned.count() > 180);
    }

    // triangle 0-1-2 with a tail 3 hanging off node 1
    fn triangle_with_tail() -> Vec<Vec<(usize, f64)>> {
        vec![
            vec![(1, 1.0), (2, 1.0)],
            vec![(0, 1.0), (2, 1.0), (3, 1.0)],
            vec![(0, 1.0), (1, 1.0)],
            vec![(1, 1.0)],
        ]
    }

    fn outward_steps(q: f64) -> usize {
        let adj = triangle_with_tail();
        let walker = Node2VecWalker::new(&adj, params(1.0, q));
        let mut rng = StdRng::seed_from_u64(11);
        let mut scratch = Vec::new();
        (0..200)
            .filter(|_| walker.next_step(Some(0), 1, &mut rng, &mut scratch) == Some(3))
            .count()
    }

    #[test]
    fn test_high_q_stays_close() {
        // arriving at 1 from 0: node 2 neighbours 0, the tail does not
        let outward = outward_steps(100.0);
        assert!(outward < 20, "tail taken {} / 200 times", outward);
    }

    #[test]
    fn test_low_q_moves_outward() {
        let outward = outward_steps(0.01);
        assert!(outward > 180, "tail taken only {} / 200 times", outward);
    }
}
