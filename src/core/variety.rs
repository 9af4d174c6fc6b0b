/// Synonym rotation, the one resource shared by every report generation.
///
/// Usage is tracked per word across all reports until it is reset, which
/// happens when any report stops. Generating reports concurrently therefore
/// has to go through [`SynonymHandle::lock`] for the whole generation.

use rustc_hash::{FxHashMap, FxHashSet};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tracing::debug;

use crate::core::sampler::{choose, Sampler};

#[derive(Debug, Error)]
pub enum SynonymError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
}

/// Synonym dictionary with usage tracking.
#[derive(Debug, Clone, Default)]
pub struct SynonymRegistry {
    words: FxHashMap<String, Vec<String>>,
    used: FxHashMap<String, FxHashSet<usize>>,
}

impl SynonymRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load_from_ron(path: &Path) -> Result<SynonymRegistry, SynonymError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    /// Parse a `{ "word": ["synonym", ...] }` dictionary.
    pub fn parse_ron(input: &str) -> Result<SynonymRegistry, SynonymError> {
        let raw: FxHashMap<String, Vec<String>> = ron::from_str(input)?;
        let mut registry = SynonymRegistry::new();
        for (word, synonyms) in raw {
            registry.insert(&word, synonyms);
        }
        Ok(registry)
    }

    /// Register synonyms for `word`. The word itself is always a candidate.
    pub fn insert(&mut self, word: &str, synonyms: Vec<String>) {
        let mut candidates = vec![word.to_string()];
        for synonym in synonyms {
            if !candidates.contains(&synonym) {
                candidates.push(synonym);
            }
        }
        self.words.insert(word.to_string(), candidates);
        self.used.remove(word);
    }

    pub fn merge(&mut self, other: SynonymRegistry) {
        for (word, candidates) in other.words {
            self.used.remove(&word);
            self.words.insert(word, candidates);
        }
    }

    pub fn candidates(&self, word: &str) -> Option<&[String]> {
        self.words.get(word).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// A synonym of `word`, preferring ones not used since the last reset.
    /// Unknown words are returned unchanged.
    pub fn pick(&mut self, word: &str, sampler: &mut dyn Sampler) -> String {
        let Some(candidates) = self.words.get(word) else {
            return word.to_string();
        };
        let used = self.used.entry(word.to_string()).or_default();
        let mut fresh: Vec<usize> = (0..candidates.len()).filter(|i| !used.contains(i)).collect();
        if fresh.is_empty() {
            fresh = (0..candidates.len()).collect();
        }
        let Some(&index) = choose(sampler, &fresh) else {
            return word.to_string();
        };
        used.insert(index);
        candidates
            .get(index)
            .cloned()
            .unwrap_or_else(|| word.to_string())
    }

    /// Number of distinct synonyms of `word` used since the last reset.
    pub fn used_count(&self, word: &str) -> usize {
        self.used.get(word).map_or(0, FxHashSet::len)
    }

    /// Forget usage of every word.
    pub fn reset_usage(&mut self) {
        debug!(words = self.used.len(), "synonym usage reset");
        self.used.clear();
    }
}

/// Shared, lock-guarded access to the synonym registry.
#[derive(Debug, Clone, Default)]
pub struct SynonymHandle {
    inner: Arc<Mutex<SynonymRegistry>>,
}

impl SynonymHandle {
    pub fn new(registry: SynonymRegistry) -> Self {
        Self {
            inner: Arc::new(Mutex::new(registry)),
        }
    }

    /// Exclusive access. A poisoned lock still yields the registry: its
    /// state is at worst a stale usage set.
    pub fn lock(&self) -> MutexGuard<'_, SynonymRegistry> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn reset_usage(&self) {
        self.lock().reset_usage();
    }
}
