//! Concurrent fan-out aggregation of category fetches.
//!
//! One load operation queries up to [`FANOUT_LIMIT`] categories in parallel
//! and merges every arriving batch into a single deduplicated, time-sorted
//! result set. Merges are published immediately through a watch channel, so
//! subscribers see papers from fast categories before slow ones finish.
//! A later load supersedes the previous one: the set is reset and stale
//! batches are discarded on arrival.
//!
//! Failure policy: per-category errors never cancel sibling fetches. The
//! operation as a whole fails only when every category failed, in which case
//! the first encountered error is reported.

use crate::client::PaperSource;
use crate::error::NetworkError;
use crate::paper::Paper;
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Maximum number of categories queried concurrently in one load.
///
/// Deliberate latency/completeness trade-off: more parallel queries slow the
/// worst-case response without materially improving typical relevance.
pub const FANOUT_LIMIT: usize = 3;

/// Result cap requested per category
pub const PER_CATEGORY_LIMIT: usize = 10;

/// Lifecycle phase of the current load operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPhase {
    Idle,
    Loading,
}

/// Immutable view of the aggregated result set at one point in time.
///
/// `papers` is always fully sorted by publication date descending; readers
/// never observe a partially-sorted set.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub papers: Arc<Vec<Paper>>,
    pub phase: LoadPhase,
    /// Per-category failures of the finished load, for diagnostics
    pub errors: Arc<Vec<String>>,
}

impl Snapshot {
    fn empty(phase: LoadPhase) -> Self {
        Self {
            papers: Arc::new(Vec::new()),
            phase,
            errors: Arc::new(Vec::new()),
        }
    }
}

#[derive(Default)]
struct ResultSet {
    papers: Vec<Paper>,
    ids: HashSet<String>,
    /// Bumped by every load; merges carrying an older generation are stale
    generation: u64,
}

/// Merges concurrent category fetches into one observable result set.
pub struct Aggregator {
    source: Arc<dyn PaperSource>,
    state: Mutex<ResultSet>,
    updates: watch::Sender<Snapshot>,
}

impl Aggregator {
    pub fn new(source: Arc<dyn PaperSource>) -> Self {
        let (updates, _) = watch::channel(Snapshot::empty(LoadPhase::Idle));
        Self {
            source,
            state: Mutex::new(ResultSet::default()),
            updates,
        }
    }

    /// Watch the result set; a new snapshot is published after every merge.
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.updates.subscribe()
    }

    /// Current result set, sorted by publication date descending.
    pub fn papers(&self) -> Arc<Vec<Paper>> {
        self.updates.borrow().papers.clone()
    }

    /// Load the newest papers for the given categories.
    ///
    /// Resets the result set, fans out one fetch per category (capped at
    /// [`FANOUT_LIMIT`], input order preserved) and merges batches as they
    /// arrive. Returns `Ok` when at least one category succeeded (partial
    /// results are better than none) and the first encountered error when
    /// every category failed.
    pub async fn load(&self, categories: &[String]) -> Result<(), NetworkError> {
        if categories.len() > FANOUT_LIMIT {
            debug!(
                requested = categories.len(),
                cap = FANOUT_LIMIT,
                "Truncating category fan-out"
            );
        }
        let selected: Vec<String> = categories.iter().take(FANOUT_LIMIT).cloned().collect();

        let generation = {
            let mut state = self.state.lock().expect("result set lock poisoned");
            state.generation += 1;
            state.papers.clear();
            state.ids.clear();
            self.updates.send_replace(Snapshot::empty(LoadPhase::Loading));
            state.generation
        };

        info!(categories = ?selected, "Loading papers");

        let fetches = selected.into_iter().map(|category| {
            let source = Arc::clone(&self.source);
            async move {
                let batch = source
                    .fetch(std::slice::from_ref(&category), PER_CATEGORY_LIMIT)
                    .await;
                (category, batch)
            }
        });
        let mut completions = stream::iter(fetches).buffer_unordered(FANOUT_LIMIT);

        let mut successes = 0usize;
        let mut failures: Vec<(String, NetworkError)> = Vec::new();

        while let Some((category, outcome)) = completions.next().await {
            match outcome {
                Ok(batch) => {
                    successes += 1;
                    self.merge(generation, &category, batch);
                }
                Err(err) => {
                    warn!(category = %category, error = %err, "Category fetch failed");
                    failures.push((category, err));
                }
            }
        }

        let superseded = {
            let state = self.state.lock().expect("result set lock poisoned");
            if state.generation == generation {
                self.updates.send_replace(Snapshot {
                    papers: Arc::new(state.papers.clone()),
                    phase: LoadPhase::Idle,
                    errors: Arc::new(
                        failures
                            .iter()
                            .map(|(category, err)| format!("{category}: {err}"))
                            .collect(),
                    ),
                });
                false
            } else {
                true
            }
        };

        if superseded {
            debug!("Load superseded by a newer operation");
            return Ok(());
        }

        if successes == 0 && !failures.is_empty() {
            return Err(failures.remove(0).1);
        }

        info!(
            total = self.papers().len(),
            failed = failures.len(),
            "Load complete"
        );
        Ok(())
    }

    /// Merge one category batch into the result set and republish.
    ///
    /// The membership check and insert happen atomically under the state
    /// lock, so concurrent batch arrivals cannot lose updates.
    fn merge(&self, generation: u64, category: &str, batch: Vec<Paper>) {
        let mut state = self.state.lock().expect("result set lock poisoned");
        if state.generation != generation {
            debug!(category, "Discarding batch from superseded load");
            return;
        }

        let mut added = 0usize;
        for paper in batch {
            if state.ids.insert(paper.id.clone()) {
                state.papers.push(paper);
                added += 1;
            }
        }
        // Stable sort: equal timestamps keep their existing relative order.
        state.papers.sort_by(|a, b| b.published.cmp(&a.published));

        info!(category, added, total = state.papers.len(), "Merged category batch");

        self.updates.send_replace(Snapshot {
            papers: Arc::new(state.papers.clone()),
            phase: LoadPhase::Loading,
            errors: Arc::new(Vec::new()),
        });
    }
}
