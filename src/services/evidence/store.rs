//! Evidence Store
//!
//! Append-only accumulator of retrieved fragments for one session.
//!
//! - Insertion order is retrieval order.
//! - A locator is accepted at most once per session, even after its fragment
//!   has been evicted.
//! - Fragment count and content bytes never exceed the configured caps;
//!   overflow evicts the lowest-relevance fragment first, oldest first on ties.
//!
//! Every operation is total: capacity pressure is resolved by eviction.

use std::collections::HashSet;

use tracing::debug;

use oncall_rca_core::{EvidenceFragment, EvidenceLocator, EvidenceSnapshot, SessionConfig};

/// Bounded, de-duplicating evidence accumulator owned by one session.
#[derive(Debug)]
pub struct EvidenceStore {
    /// Stored fragments in retrieval order
    fragments: Vec<EvidenceFragment>,
    /// Every locator ever accepted or offered
    seen: HashSet<EvidenceLocator>,
    /// Fragment count cap
    max_fragments: usize,
    /// Content byte cap
    max_bytes: usize,
    /// Current content bytes
    total_bytes: usize,
    /// Bytes ever inserted, including later-evicted fragments
    ingested_bytes: u64,
    /// Fragments evicted so far
    evicted: usize,
}

impl EvidenceStore {
    /// Create a store with explicit caps.
    pub fn new(max_fragments: usize, max_bytes: usize) -> Self {
        Self {
            fragments: Vec::new(),
            seen: HashSet::new(),
            max_fragments,
            max_bytes,
            total_bytes: 0,
            ingested_bytes: 0,
            evicted: 0,
        }
    }

    /// Create a store with the caps from a session configuration.
    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(config.store_max_fragments, config.store_max_bytes)
    }

    /// Insert fragments whose locator has not been seen, then enforce the caps.
    ///
    /// Returns how many of the offered fragments are still stored afterwards.
    /// A fragment larger than the byte cap on its own is dropped.
    pub fn add(&mut self, fragments: impl IntoIterator<Item = EvidenceFragment>) -> usize {
        let mut inserted: HashSet<EvidenceLocator> = HashSet::new();

        for fragment in fragments {
            if !self.seen.insert(fragment.locator.clone()) {
                debug!(locator = %fragment.locator, "dropping duplicate evidence");
                continue;
            }
            if fragment.size() > self.max_bytes {
                debug!(
                    locator = %fragment.locator,
                    size = fragment.size(),
                    max_bytes = self.max_bytes,
                    "dropping evidence larger than the store"
                );
                continue;
            }

            self.total_bytes += fragment.size();
            self.ingested_bytes += fragment.size() as u64;
            inserted.insert(fragment.locator.clone());
            self.fragments.push(fragment);

            while self.over_capacity() {
                match self.evict_one() {
                    Some(evicted) => {
                        inserted.remove(&evicted.locator);
                    }
                    None => break,
                }
            }
        }

        inserted.len()
    }

    /// Read-only ordered view.
    pub fn snapshot(&self) -> EvidenceSnapshot {
        EvidenceSnapshot::new(self.fragments.clone())
    }

    /// Consume the store, keeping only the final view.
    pub fn into_snapshot(self) -> EvidenceSnapshot {
        EvidenceSnapshot::new(self.fragments)
    }

    /// Whether a locator has ever been offered to this store.
    pub fn contains(&self, locator: &EvidenceLocator) -> bool {
        self.seen.contains(locator)
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// Current content bytes.
    pub fn total_bytes(&self) -> usize {
        self.total_bytes
    }

    /// Monotonic count of bytes inserted over the store's lifetime.
    pub fn ingested_bytes(&self) -> u64 {
        self.ingested_bytes
    }

    /// Fragments evicted so far.
    pub fn evicted_count(&self) -> usize {
        self.evicted
    }

    fn over_capacity(&self) -> bool {
        self.fragments.len() > self.max_fragments || self.total_bytes > self.max_bytes
    }

    /// Remove the lowest-relevance fragment; `min_by` keeps the first of equal
    /// minima, which is the oldest.
    fn evict_one(&mut self) -> Option<EvidenceFragment> {
        let index = self
            .fragments
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| a.rank_score().total_cmp(&b.rank_score()))
            .map(|(i, _)| i)?;

        let evicted = self.fragments.remove(index);
        self.total_bytes -= evicted.size();
        self.evicted += 1;
        debug!(
            locator = %evicted.locator,
            relevance = evicted.relevance,
            "evicted evidence"
        );
        Some(evicted)
    }
}
