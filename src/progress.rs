//! Initiative progress derived from story closure.
//!
//! `reconcile` is the pure rule. `ProgressReconciler` runs it for a batch of
//! initiatives, one concurrent story fetch each, and hands changed results to
//! the write-back sink without waiting on it.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::backend::{ProgressSink, StorySource};
use crate::models::{Initiative, Story};

/// Story states that count as done.
pub const CLOSED_STORY_STATES: [&str; 4] = ["cerrada", "finalizada", "completada", "hecha"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProgressState {
    #[serde(rename = "Abierta")]
    Open,
    #[serde(rename = "Cerrada")]
    Closed,
}

impl ProgressState {
    pub fn label(self) -> &'static str {
        match self {
            ProgressState::Open => "Abierta",
            ProgressState::Closed => "Cerrada",
        }
    }

    fn matches(self, text: &str) -> bool {
        text.trim().to_lowercase() == self.label().to_lowercase()
    }
}

/// Partial update sent back to the initiatives backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressPatch {
    #[serde(rename = "estado_iniciativa")]
    pub state: ProgressState,
    #[serde(rename = "avance")]
    pub progress: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciliation {
    /// No stories: progress reads 0 locally and nothing is written.
    NoStories,
    Unchanged(ProgressPatch),
    Changed(ProgressPatch),
}

pub fn is_closed_story(state: &str) -> bool {
    let state = state.trim().to_lowercase();
    CLOSED_STORY_STATES.contains(&state.as_str())
}

/// Percentage of closed stories, `None` when there are none.
pub fn closure_progress(stories: &[Story]) -> Option<u8> {
    if stories.is_empty() {
        return None;
    }
    let closed = stories.iter().filter(|s| is_closed_story(&s.state)).count();
    let pct = (closed as f64 * 100.0 / stories.len() as f64).round();
    Some(pct.clamp(0.0, 100.0) as u8)
}

pub fn reconcile(initiative: &Initiative, stories: &[Story]) -> Reconciliation {
    let Some(progress) = closure_progress(stories) else {
        return Reconciliation::NoStories;
    };
    let state = if progress >= 100 {
        ProgressState::Closed
    } else {
        ProgressState::Open
    };
    let patch = ProgressPatch { state, progress };

    if state.matches(&initiative.state) && initiative.progress == progress {
        Reconciliation::Unchanged(patch)
    } else {
        Reconciliation::Changed(patch)
    }
}

impl Initiative {
    /// Folds a reconciliation result into the local snapshot.
    pub fn apply_progress(&mut self, result: &Reconciliation) {
        match result {
            Reconciliation::NoStories => self.progress = 0,
            Reconciliation::Unchanged(patch) | Reconciliation::Changed(patch) => {
                self.progress = patch.progress;
                self.state = patch.state.label().to_string();
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReconcileOutcome {
    NoStories {
        initiative_id: i64,
    },
    Unchanged {
        initiative_id: i64,
        patch: ProgressPatch,
    },
    /// A write-back was queued on the scope.
    Updated {
        initiative_id: i64,
        patch: ProgressPatch,
    },
    /// Stories could not be fetched; last known values stay.
    FetchFailed {
        initiative_id: i64,
        error: String,
    },
}

impl ReconcileOutcome {
    pub fn initiative_id(&self) -> i64 {
        match self {
            ReconcileOutcome::NoStories { initiative_id }
            | ReconcileOutcome::Unchanged { initiative_id, .. }
            | ReconcileOutcome::Updated { initiative_id, .. }
            | ReconcileOutcome::FetchFailed { initiative_id, .. } => *initiative_id,
        }
    }

    fn reconciliation(&self) -> Option<Reconciliation> {
        match self {
            ReconcileOutcome::NoStories { .. } => Some(Reconciliation::NoStories),
            ReconcileOutcome::Unchanged { patch, .. } => Some(Reconciliation::Unchanged(*patch)),
            ReconcileOutcome::Updated { patch, .. } => Some(Reconciliation::Changed(*patch)),
            ReconcileOutcome::FetchFailed { .. } => None,
        }
    }
}

/// Applies outcomes to the matching initiatives; failed fetches are skipped.
pub fn apply_outcomes(initiatives: &mut [Initiative], outcomes: &[ReconcileOutcome]) {
    for outcome in outcomes {
        let Some(result) = outcome.reconciliation() else {
            continue;
        };
        if let Some(ini) = initiatives
            .iter_mut()
            .find(|i| i.id == outcome.initiative_id())
        {
            ini.apply_progress(&result);
        }
    }
}

/// Owns write-backs queued by reconciliation passes.
///
/// Dropping the scope aborts every write still in flight, so a torn-down
/// view cannot land stale updates.
#[derive(Default)]
pub struct ReconcileScope {
    writes: JoinSet<()>,
}

impl ReconcileScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending_writes(&self) -> usize {
        self.writes.len()
    }

    /// Waits for queued write-backs to finish.
    pub async fn settle(&mut self) {
        while let Some(joined) = self.writes.join_next().await {
            if let Err(e) = joined {
                if !e.is_cancelled() {
                    warn!(error = %e, "write-back task failed");
                }
            }
        }
    }
}

pub struct ProgressReconciler<S, W> {
    stories: Arc<S>,
    sink: Arc<W>,
}

impl<S, W> ProgressReconciler<S, W>
where
    S: StorySource + 'static,
    W: ProgressSink + 'static,
{
    pub fn new(stories: Arc<S>, sink: Arc<W>) -> Self {
        Self { stories, sink }
    }

    /// Reconciles every initiative with a positive id.
    ///
    /// Outcomes arrive in completion order. Fetches are aborted if this
    /// future is dropped; write-backs live on `scope`.
    pub async fn reconcile_all(
        &self,
        initiatives: &[Initiative],
        scope: &mut ReconcileScope,
    ) -> Vec<ReconcileOutcome> {
        let pass = Uuid::new_v4();
        info!(%pass, initiatives = initiatives.len(), "reconciling initiative progress");

        let mut fetches = JoinSet::new();
        for initiative in initiatives.iter().filter(|i| i.id > 0) {
            let stories = Arc::clone(&self.stories);
            let initiative = initiative.clone();
            fetches.spawn(async move {
                let fetched = stories.stories_for(initiative.id).await;
                (initiative, fetched)
            });
        }

        let mut outcomes = Vec::with_capacity(fetches.len());
        while let Some(joined) = fetches.join_next().await {
            let (initiative, fetched) = match joined {
                Ok(done) => done,
                Err(e) => {
                    warn!(%pass, error = %e, "story fetch task failed");
                    continue;
                }
            };
            let initiative_id = initiative.id;

            let stories = match fetched {
                Ok(stories) => stories,
                Err(e) => {
                    warn!(%pass, initiative_id, error = %e, "story fetch failed, keeping last known progress");
                    outcomes.push(ReconcileOutcome::FetchFailed {
                        initiative_id,
                        error: e.to_string(),
                    });
                    continue;
                }
            };

            let outcome = match reconcile(&initiative, &stories) {
                Reconciliation::NoStories => ReconcileOutcome::NoStories { initiative_id },
                Reconciliation::Unchanged(patch) => {
                    ReconcileOutcome::Unchanged { initiative_id, patch }
                }
                Reconciliation::Changed(patch) => {
                    debug!(%pass, initiative_id, progress = patch.progress, state = patch.state.label(), "queueing write-back");
                    let sink = Arc::clone(&self.sink);
                    scope.writes.spawn(async move {
                        if let Err(e) = sink.write_progress(initiative_id, &patch).await {
                            warn!(initiative_id, error = %e, "progress write-back failed");
                        }
                    });
                    ReconcileOutcome::Updated { initiative_id, patch }
                }
            };
            outcomes.push(outcome);
        }

        outcomes
    }
}
