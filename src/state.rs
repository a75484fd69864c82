// src/state.rs

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use axum::extract::FromRef;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::config::{ATTEMPT_RETENTION_SECONDS, Config};
use crate::session::{AssessmentSession, Completion, Phase};

/// One student's live quiz attempt, held in memory only. Nothing here is
/// persisted until the session completes; abandoning the attempt (or losing
/// the process) discards partial progress, which is the intended lifecycle.
#[derive(Debug)]
pub struct ActiveAttempt {
    /// The student who opened the attempt; nobody else may touch it.
    pub student_id: i64,
    pub session: AssessmentSession,
    /// Wall-clock anchor set when the session enters Running.
    pub started_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl ActiveAttempt {
    pub fn new(student_id: i64, session: AssessmentSession, now: DateTime<Utc>) -> Self {
        ActiveAttempt {
            student_id,
            session,
            started_at: None,
            created_at: now,
        }
    }

    /// Folds wall-clock time into the countdown as whole ticks. Returns a
    /// completion when the clock ran out since the last touch — the forced
    /// submission path. Must be called before acting on the session.
    pub fn sync_clock(&mut self, now: DateTime<Utc>) -> Option<Completion> {
        if self.session.phase() != Phase::Running {
            return None;
        }
        let started = self.started_at?;
        let elapsed_total = (now - started).num_seconds().clamp(0, u32::MAX as i64) as u32;
        let pending = elapsed_total.saturating_sub(self.session.seconds_elapsed());
        self.session.elapse(pending)
    }

    /// The instant a completion actually happened: the start anchor plus
    /// the seconds the session consumed. For a timer expiry noticed late,
    /// this backdates correctly to the moment the clock hit zero.
    pub fn completed_at(&self, completion: &Completion, now: DateTime<Utc>) -> DateTime<Utc> {
        match self.started_at {
            Some(started) => started + chrono::Duration::seconds(completion.time_taken_seconds as i64),
            None => now,
        }
    }

    /// An attempt nobody has touched past the retention horizon is garbage.
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        (now - self.created_at).num_seconds() > ATTEMPT_RETENTION_SECONDS
    }
}

/// Registry of live attempts, keyed by an opaque attempt id.
pub type AttemptRegistry = Arc<RwLock<HashMap<Uuid, ActiveAttempt>>>;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    pub attempts: AttemptRegistry,
}

impl AppState {
    pub fn new(pool: PgPool, config: Config) -> Self {
        AppState {
            pool,
            config,
            attempts: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl FromRef<AppState> for PgPool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for AttemptRegistry {
    fn from_ref(state: &AppState) -> Self {
        state.attempts.clone()
    }
}
