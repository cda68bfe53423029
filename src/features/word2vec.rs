//! Skip-gram with negative sampling over integer token corpora
//!
//! Tokens are dense ids `0..vocab_size`. Training follows the classic
//! word2vec recipe: frequent-token downsampling, a unigram^0.75 noise table,
//! a randomly reduced window per centre token, and a learning rate decaying
//! linearly from `alpha` to `min_alpha` across all epochs.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const MAX_EXP: f32 = 6.0;
const NOISE_POWER: f64 = 0.75;

#[derive(Debug, Clone)]
pub struct SkipGramConfig {
    pub dimensions: usize,
    pub window: usize,
    pub negative: usize,
    pub epochs: usize,
    pub alpha: f32,
    pub min_alpha: f32,
    /// Downsampling threshold; 0 disables it
    pub sample: f64,
    pub seed: u64,
}

impl Default for SkipGramConfig {
    fn default() -> Self {
        Self {
            dimensions: 64,
            window: 10,
            negative: 5,
            epochs: 3,
            alpha: 0.025,
            min_alpha: 0.0001,
            sample: 1e-3,
            seed: 42,
        }
    }
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x.clamp(-MAX_EXP, MAX_EXP)).exp())
}

/// Trained input vectors, `vocab_size × dimensions`, row-major
pub struct Embeddings {
    dimensions: usize,
    data: Vec<f32>,
}

impl Embeddings {
    pub fn len(&self) -> usize {
        if self.dimensions == 0 {
            0
        } else {
            self.data.len() / self.dimensions
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn vector(&self, token: usize) -> &[f32] {
        &self.data[token * self.dimensions..(token + 1) * self.dimensions]
    }

    pub fn into_rows(self) -> Vec<Vec<f32>> {
        if self.dimensions == 0 {
            return Vec::new();
        }
        self.data.chunks(self.dimensions).map(|c| c.to_vec()).collect()
    }

    pub fn cosine(&self, a: usize, b: usize) -> f32 {
        let (va, vb) = (self.vector(a), self.vector(b));
        let dot: f32 = va.iter().zip(vb).map(|(x, y)| x * y).sum();
        let na = va.iter().map(|x| x * x).sum::<f32>().sqrt();
        let nb = vb.iter().map(|x| x * x).sum::<f32>().sqrt();
        if na == 0.0 || nb == 0.0 {
            0.0
        } else {
            dot / (na * nb)
        }
    }
}

pub struct SkipGram {
    config: SkipGramConfig,
}

impl SkipGram {
    pub fn new(config: SkipGramConfig) -> Self {
        Self { config }
    }

    /// Per-token keep probability (word2vec downsampling formula)
    fn keep_probabilities(&self, counts: &[u64], total: u64) -> Vec<f64> {
        if self.config.sample <= 0.0 || total == 0 {
            return vec![1.0; counts.len()];
        }
        let threshold = self.config.sample * total as f64;
        counts
            .iter()
            .map(|&c| {
                if c == 0 {
                    return 1.0;
                }
                let c = c as f64;
                (((c / threshold).sqrt() + 1.0) * (threshold / c)).min(1.0)
            })
            .collect()
    }

    fn noise_table(counts: &[u64]) -> Vec<f64> {
        let mut acc = 0.0;
        counts
            .iter()
            .map(|&c| {
                acc += (c as f64).powf(NOISE_POWER);
                acc
            })
            .collect()
    }

    pub fn train(&self, corpus: &[Vec<u32>], vocab_size: usize) -> Embeddings {
        let dim = self.config.dimensions;
        let mut rng = StdRng::seed_from_u64(self.config.seed);

        let mut counts = vec![0u64; vocab_size];
        for sentence in corpus {
            for &token in sentence {
                counts[token as usize] += 1;
            }
        }
        let total_words: u64 = counts.iter().sum();

        let mut syn0: Vec<f32> = (0..vocab_size * dim)
            .map(|_| (rng.gen::<f32>() - 0.5) / dim as f32)
            .collect();
        let mut syn1neg = vec![0.0f32; vocab_size * dim];

        if total_words == 0 || dim == 0 {
            return Embeddings { dimensions: dim, data: syn0 };
        }

        let keep = self.keep_probabilities(&counts, total_words);
        let noise = Self::noise_table(&counts);
        let noise_total = noise[noise.len() - 1];

        let planned = (self.config.epochs as u64 * total_words).max(1) as f64;
        let mut processed = 0u64;
        let mut neu1e = vec![0.0f32; dim];
        let mut kept = Vec::new();

        for epoch in 0..self.config.epochs {
            for sentence in corpus {
                let progress = processed as f64 / planned;
                let alpha = (self.config.alpha
                    - (self.config.alpha - self.config.min_alpha) * progress as f32)
                    .max(self.config.min_alpha);
                processed += sentence.len() as u64;

                kept.clear();
                kept.extend(
                    sentence
                        .iter()
                        .copied()
                        .filter(|&t| keep[t as usize] >= 1.0 || rng.gen::<f64>() < keep[t as usize]),
                );

                for pos in 0..kept.len() {
                    let reduced = if self.config.window > 0 {
                        rng.gen_range(0..self.config.window)
                    } else {
                        0
                    };
                    let span = self.config.window - reduced;
                    let start = pos.saturating_sub(span);
                    let end = (pos + span + 1).min(kept.len());

                    for ctx in start..end {
                        if ctx == pos {
                            continue;
                        }
                        let target = kept[pos] as usize;
                        let input = kept[ctx] as usize;

                        neu1e.iter_mut().for_each(|v| *v = 0.0);
                        let l1 = &syn0[input * dim..(input + 1) * dim];

                        for d in 0..=self.config.negative {
                            let (sample, label) = if d == 0 {
                                (target, 1.0)
                            } else {
                                let r = rng.gen::<f64>() * noise_total;
                                let s = noise.partition_point(|&c| c <= r).min(vocab_size - 1);
                                if s == target {
                                    continue;
                                }
                                (s, 0.0)
                            };

                            let l2 = &mut syn1neg[sample * dim..(sample + 1) * dim];
                            let f: f32 = l1.iter().zip(l2.iter()).map(|(a, b)| a * b).sum();
                            let g = (label - sigmoid(f)) * alpha;

                            for k in 0..dim {
                                neu1e[k] += g * l2[k];
                                l2[k] += g * l1[k];
                            }
                        }

                        let l1 = &mut syn0[input * dim..(input + 1) * dim];
                        for k in 0..dim {
                            l1[k] += neu1e[k];
                        }
                    }
                }
            }
            log::debug!("Skip-gram epoch {}/{} done", epoch + 1, self.config.epochs);
        }

        Embeddings { dimensions: dim, data: syn0 }
    }
}
