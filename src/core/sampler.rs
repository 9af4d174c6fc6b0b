/// Injectable randomness for every choice the engine makes.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;

/// A source of uniform draws.
pub trait Sampler {
    /// Pick an index in `0..len`. `len` is never zero.
    fn pick(&mut self, len: usize) -> usize;
}

/// Seeded pseudo-random sampler.
#[derive(Debug, Clone)]
pub struct SeededSampler {
    rng: StdRng,
}

impl SeededSampler {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Sampler for SeededSampler {
    fn pick(&mut self, len: usize) -> usize {
        self.rng.gen_range(0..len)
    }
}

/// Replays a fixed sequence of draws, each reduced modulo the requested
/// length. Once exhausted it always picks the first candidate.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSampler {
    draws: VecDeque<usize>,
}

impl ScriptedSampler {
    pub fn new(draws: impl IntoIterator<Item = usize>) -> Self {
        Self {
            draws: draws.into_iter().collect(),
        }
    }

    /// A sampler that always picks the first candidate.
    pub fn first() -> Self {
        Self::default()
    }
}

impl Sampler for ScriptedSampler {
    fn pick(&mut self, len: usize) -> usize {
        self.draws.pop_front().map_or(0, |draw| draw % len)
    }
}

/// Pick one element of a non-empty slice.
pub fn choose<'a, T>(sampler: &mut dyn Sampler, items: &'a [T]) -> Option<&'a T> {
    if items.is_empty() {
        return None;
    }
    items.get(sampler.pick(items.len()))
}
