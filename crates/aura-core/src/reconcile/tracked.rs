//! Reconciliation of tracked records.
//!
//! A [`Reconciler`] merges server snapshots of one record with at most one
//! outstanding optimistic mutation. Snapshots are applied in arrival order;
//! their version makes a late, stale response detectable so it can be
//! dropped instead of regressing what is on screen.

use std::collections::HashMap;
use std::fmt::Debug;

/// Consecutive malformed snapshots tolerated before an error is surfaced.
pub const DEFAULT_MALFORMED_THRESHOLD: u32 = 3;

/// A server snapshot that can be reconciled.
pub trait TrackedSnapshot: Clone {
    /// Comparable server version (timestamp, status rank, ...).
    type Version: Ord + Clone + Debug;
    /// A local optimistic change to this record.
    type Mutation: Clone + Debug;

    /// Identifier of the tracked record.
    fn id(&self) -> &str;

    fn version(&self) -> Self::Version;

    /// True when this server state already contains `mutation`.
    fn reflects(&self, mutation: &Self::Mutation) -> bool;

    /// Renders `mutation` on top of this server state.
    fn apply(&self, mutation: &Self::Mutation) -> Self;

    /// Version the mutation itself would carry on the server.
    ///
    /// Used as the baseline when a mutation is made before any snapshot
    /// arrived, so a strictly newer server change can still supersede it.
    fn mutation_version(_mutation: &Self::Mutation) -> Option<Self::Version> {
        None
    }

    /// Once true, polling this record is pointless.
    fn is_terminal(&self) -> bool {
        false
    }

    /// Shape check run before a snapshot is accepted.
    fn validate(&self) -> Result<(), String> {
        if self.id().is_empty() {
            return Err("missing id".to_string());
        }
        Ok(())
    }
}

/// What a call to [`Reconciler::observe`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observation {
    /// No mutation pending; the snapshot is rendered as is.
    Applied,
    /// The snapshot contains the pending mutation, which is now cleared.
    Confirmed,
    /// A newer independent change replaced the pending mutation.
    Superseded,
    /// The snapshot was recorded but the pending mutation still renders on top.
    EchoSuppressed,
    /// Older than what is already applied; ignored.
    Stale,
    /// Failed validation; previous render state retained.
    Discarded { surface: bool },
}

#[derive(Debug, Clone)]
struct PendingMutation<S: TrackedSnapshot> {
    mutation: S::Mutation,
    /// Version of the server state the mutation was made against.
    anticipated: Option<S::Version>,
}

/// Counts consecutive malformed snapshots.
///
/// A single glitch stays silent; the error is only surfaced once `threshold`
/// snapshots in a row were bad. Any good snapshot resets the streak.
#[derive(Debug, Clone)]
pub struct MalformedStreak {
    label: String,
    count: u32,
    threshold: u32,
    last: Option<String>,
}

impl MalformedStreak {
    pub fn new(label: impl Into<String>, threshold: u32) -> Self {
        Self {
            label: label.into(),
            count: 0,
            threshold: threshold.max(1),
            last: None,
        }
    }

    /// Records a bad snapshot. Returns true once the error should be shown.
    pub fn record(&mut self, reason: impl Into<String>) -> bool {
        let reason = reason.into();
        self.count += 1;
        tracing::warn!(
            "[Reconciler] {} discarded malformed snapshot ({} in a row): {}",
            self.label,
            self.count,
            reason
        );
        self.last = Some(reason);
        self.is_surfaced()
    }

    pub fn reset(&mut self) {
        self.count = 0;
        self.last = None;
    }

    pub fn is_surfaced(&self) -> bool {
        self.count >= self.threshold
    }

    /// The last reason, once the streak reached the threshold.
    pub fn error(&self) -> Option<&str> {
        if self.is_surfaced() {
            self.last.as_deref()
        } else {
            None
        }
    }
}

/// Per-record reconciliation state.
#[derive(Debug, Clone)]
pub struct Reconciler<S: TrackedSnapshot> {
    id: String,
    applied: Option<S>,
    pending: Option<PendingMutation<S>>,
    malformed: MalformedStreak,
}

impl<S: TrackedSnapshot> Reconciler<S> {
    pub fn new(id: impl Into<String>) -> Self {
        Self::with_threshold(id, DEFAULT_MALFORMED_THRESHOLD)
    }

    pub fn with_threshold(id: impl Into<String>, malformed_threshold: u32) -> Self {
        let id = id.into();
        Self {
            malformed: MalformedStreak::new(id.clone(), malformed_threshold),
            id,
            applied: None,
            pending: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Records a local optimistic mutation and returns the new render value.
    ///
    /// A second mutation before the first is confirmed replaces it.
    pub fn mutate(&mut self, mutation: S::Mutation) -> Option<S> {
        let anticipated = match &self.applied {
            Some(applied) => Some(applied.version()),
            None => S::mutation_version(&mutation),
        };
        tracing::debug!(
            "[Reconciler] {} mutate: {:?} (anticipated version {:?})",
            self.id,
            mutation,
            anticipated
        );
        self.pending = Some(PendingMutation {
            mutation,
            anticipated,
        });
        self.render()
    }

    /// Merges a newly arrived server snapshot.
    pub fn observe(&mut self, snapshot: S) -> Observation {
        if let Err(reason) = snapshot.validate() {
            let surface = self.record_malformed(reason);
            return Observation::Discarded { surface };
        }
        self.malformed.reset();

        let version = snapshot.version();
        if let Some(applied) = &self.applied {
            let late_completion = snapshot.is_terminal() && !applied.is_terminal();
            if version < applied.version() && !late_completion {
                tracing::debug!(
                    "[Reconciler] {} stale snapshot {:?} < {:?}, ignored",
                    self.id,
                    version,
                    applied.version()
                );
                return Observation::Stale;
            }
        }

        let outcome = match &self.pending {
            None => Observation::Applied,
            Some(pending) if snapshot.reflects(&pending.mutation) => Observation::Confirmed,
            Some(pending) => match &pending.anticipated {
                Some(anticipated) if version > *anticipated => Observation::Superseded,
                _ => Observation::EchoSuppressed,
            },
        };

        if matches!(outcome, Observation::Confirmed | Observation::Superseded) {
            tracing::debug!("[Reconciler] {} pending mutation {:?}", self.id, outcome);
            self.pending = None;
        }
        self.applied = Some(snapshot);
        outcome
    }

    /// Counts a snapshot that could not be decoded or validated.
    ///
    /// Returns true once the streak reaches the threshold and the view
    /// should show an error indicator.
    pub fn record_malformed(&mut self, reason: impl Into<String>) -> bool {
        self.malformed.record(reason)
    }

    /// The persistent malformed-data error, if the streak reached the threshold.
    pub fn malformed_error(&self) -> Option<&str> {
        self.malformed.error()
    }

    /// Drops the pending mutation and returns the last server snapshot.
    pub fn rollback(&mut self) -> Option<S> {
        if let Some(pending) = self.pending.take() {
            tracing::debug!(
                "[Reconciler] {} rolled back {:?}",
                self.id,
                pending.mutation
            );
        }
        self.applied.clone()
    }

    /// The value to render: the last server snapshot with any pending
    /// mutation applied on top.
    pub fn render(&self) -> Option<S> {
        let applied = self.applied.as_ref()?;
        Some(match &self.pending {
            Some(pending) => applied.apply(&pending.mutation),
            None => applied.clone(),
        })
    }

    /// Last accepted server snapshot, without local overrides.
    pub fn server_snapshot(&self) -> Option<&S> {
        self.applied.as_ref()
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn is_terminal(&self) -> bool {
        self.applied.as_ref().is_some_and(|s| s.is_terminal())
    }
}

/// Reconcilers for a collection of records, keyed by id.
///
/// Keeps the order of the most recent list snapshot. Records missing from a
/// later snapshot keep their last rendered value.
#[derive(Debug, Clone)]
pub struct ReconcilerMap<S: TrackedSnapshot> {
    entries: HashMap<String, Reconciler<S>>,
    order: Vec<String>,
    malformed_threshold: u32,
    /// Whole-list decode failures.
    list_malformed: MalformedStreak,
}

impl<S: TrackedSnapshot> ReconcilerMap<S> {
    pub fn new() -> Self {
        Self::with_threshold(DEFAULT_MALFORMED_THRESHOLD)
    }

    pub fn with_threshold(malformed_threshold: u32) -> Self {
        Self {
            entries: HashMap::new(),
            order: Vec::new(),
            malformed_threshold,
            list_malformed: MalformedStreak::new("list", malformed_threshold),
        }
    }

    fn entry(&mut self, id: &str) -> &mut Reconciler<S> {
        if !self.entries.contains_key(id) {
            self.order.push(id.to_string());
        }
        let threshold = self.malformed_threshold;
        self.entries
            .entry(id.to_string())
            .or_insert_with(|| Reconciler::with_threshold(id, threshold))
    }

    /// Merges one snapshot into the reconciler for its id.
    pub fn observe(&mut self, snapshot: S) -> Observation {
        let id = snapshot.id().to_string();
        if let Err(reason) = snapshot.validate() {
            tracing::warn!("[ReconcilerMap] discarded malformed item: {}", reason);
            return Observation::Discarded { surface: false };
        }
        self.entry(&id).observe(snapshot)
    }

    /// Merges a full list snapshot and adopts its ordering.
    pub fn observe_all(&mut self, snapshots: Vec<S>) -> Vec<(String, Observation)> {
        self.list_malformed.reset();
        let mut seen = Vec::with_capacity(snapshots.len());
        let mut outcomes = Vec::with_capacity(snapshots.len());
        for snapshot in snapshots {
            let id = snapshot.id().to_string();
            let outcome = self.observe(snapshot);
            if !matches!(outcome, Observation::Discarded { .. }) && !seen.contains(&id) {
                seen.push(id.clone());
            }
            outcomes.push((id, outcome));
        }
        let missing: Vec<String> = self
            .order
            .iter()
            .filter(|id| !seen.contains(id))
            .cloned()
            .collect();
        seen.extend(missing);
        self.order = seen;
        outcomes
    }

    pub fn mutate(&mut self, id: &str, mutation: S::Mutation) -> Option<S> {
        self.entry(id).mutate(mutation)
    }

    /// Counts a list snapshot that could not be decoded at all.
    pub fn record_malformed(&mut self, reason: impl Into<String>) -> bool {
        self.list_malformed.record(reason)
    }

    pub fn malformed_error(&self) -> Option<&str> {
        self.list_malformed.error()
    }

    pub fn rollback(&mut self, id: &str) -> Option<S> {
        self.entries.get_mut(id).and_then(|r| r.rollback())
    }

    pub fn render(&self, id: &str) -> Option<S> {
        self.entries.get(id).and_then(|r| r.render())
    }

    pub fn get(&self, id: &str) -> Option<&Reconciler<S>> {
        self.entries.get(id)
    }

    /// Rendered values in list order.
    pub fn render_all(&self) -> Vec<S> {
        self.order
            .iter()
            .filter_map(|id| self.entries.get(id))
            .filter_map(|r| r.render())
            .collect()
    }

    /// True when every tracked record is terminal (and there is at least one).
    pub fn all_terminal(&self) -> bool {
        !self.entries.is_empty() && self.entries.values().all(|r| r.is_terminal())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<S: TrackedSnapshot> Default for ReconcilerMap<S> {
    fn default() -> Self {
        Self::new()
    }
}
