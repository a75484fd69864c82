// src/handlers/attempt.rs

use std::collections::HashMap;

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Value, json};
use sqlx::{PgPool, types::Json as SqlJson};
use uuid::Uuid;

use crate::{
    error::AppError,
    handlers::quiz::fetch_quiz,
    models::quiz::PublicQuestion,
    session::{AssessmentSession, Completion},
    state::{ActiveAttempt, AppState, AttemptRegistry},
    utils::jwt::Claims,
};

#[derive(Debug, Deserialize)]
pub struct CreateAttemptRequest {
    pub quiz_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct AnswerRequest {
    pub question_index: usize,
    pub option_index: usize,
}

#[derive(Debug, Deserialize)]
pub struct PositionRequest {
    pub question_index: usize,
}

/// Everything needed to persist and report a completed attempt, captured
/// while the registry lock is held so the database write can happen after
/// it is released.
struct FinishedAttempt {
    student_id: i64,
    quiz_id: i64,
    quiz_title: String,
    subject: String,
    completion: Completion,
    completed_at: DateTime<Utc>,
}

impl FinishedAttempt {
    fn capture(attempt: ActiveAttempt, completion: Completion, now: DateTime<Utc>) -> Self {
        let completed_at = attempt.completed_at(&completion, now);
        let quiz = attempt.session.quiz();
        FinishedAttempt {
            student_id: attempt.student_id,
            quiz_id: quiz.id,
            quiz_title: quiz.title.clone(),
            subject: quiz.subject.clone(),
            completion,
            completed_at,
        }
    }
}

/// A touched attempt is either still live (with its current view) or just
/// finished, via explicit submit or the clock running out.
enum AttemptOutcome {
    Live(Value),
    Finished(FinishedAttempt),
}

/// Opens a new attempt on a quiz: loads the definition, validates it, and
/// registers a NotStarted session owned by the caller. Returns the
/// instructions-screen view.
pub async fn create_attempt(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateAttemptRequest>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = fetch_quiz(&state.pool, payload.quiz_id).await?;
    let session = AssessmentSession::new(quiz)?;

    let now = Utc::now();
    let id = Uuid::new_v4();
    let view = {
        let mut attempts = lock_registry(&state.attempts)?;
        // Opportunistic cleanup of attempts nobody ever came back for.
        attempts.retain(|_, attempt| !attempt.is_stale(now));

        let attempt = ActiveAttempt::new(claims.user_id(), session, now);
        let view = attempt_view(id, &attempt);
        attempts.insert(id, attempt);
        view
    };

    Ok((StatusCode::CREATED, Json(view)))
}

/// Starts the countdown: NotStarted -> Running, anchored to the current
/// wall clock. A second start on the same attempt is rejected.
pub async fn start_attempt(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let now = Utc::now();
    let outcome = touch_attempt(&state.attempts, id, &claims, now, |attempt| {
        attempt.session.start()?;
        attempt.started_at = Some(now);
        Ok(())
    })?;

    respond(outcome, &state.pool).await
}

/// Returns the live view of an attempt: phase, clock, cursor, the current
/// question (without its answer key) and the answers chosen so far.
pub async fn get_attempt(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let now = Utc::now();
    let outcome = touch_attempt(&state.attempts, id, &claims, now, |_| Ok(()))?;

    respond(outcome, &state.pool).await
}

/// Records (or overwrites) an answer. Arrives too late once the clock has
/// run out, in which case the response is the forced-submission result and
/// the answer is not recorded.
pub async fn record_answer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<AnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    let now = Utc::now();
    let outcome = touch_attempt(&state.attempts, id, &claims, now, |attempt| {
        attempt
            .session
            .select_answer(payload.question_index, payload.option_index)?;
        Ok(())
    })?;

    respond(outcome, &state.pool).await
}

/// Moves the question cursor: Next, Previous and direct jumps all land
/// here. Navigation never changes recorded answers.
pub async fn navigate(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<PositionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let now = Utc::now();
    let outcome = touch_attempt(&state.attempts, id, &claims, now, |attempt| {
        attempt.session.go_to(payload.question_index)?;
        Ok(())
    })?;

    respond(outcome, &state.pool).await
}

/// Explicit submission. If the clock expired between the student's last
/// touch and this request, the expiry submission wins and this call simply
/// reports it — either way exactly one result row is attempted.
pub async fn submit_attempt(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let now = Utc::now();
    let outcome = {
        let mut attempts = lock_registry(&state.attempts)?;
        let mut attempt = take_owned(&mut attempts, id, &claims)?;

        if let Some(completion) = attempt.sync_clock(now) {
            AttemptOutcome::Finished(FinishedAttempt::capture(attempt, completion, now))
        } else {
            match attempt.session.submit() {
                Some(completion) => {
                    AttemptOutcome::Finished(FinishedAttempt::capture(attempt, completion, now))
                }
                None => {
                    // Only a NotStarted session can refuse here; a completed
                    // one never makes it back into the registry.
                    attempts.insert(id, attempt);
                    return Err(AppError::Conflict("Attempt was never started".to_string()));
                }
            }
        }
    };

    respond(outcome, &state.pool).await
}

/// Abandons an attempt: the session is discarded and nothing is persisted,
/// the same as navigating away mid-quiz.
pub async fn discard_attempt(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let mut attempts = lock_registry(&state.attempts)?;
    take_owned(&mut attempts, id, &claims)?;

    Ok(StatusCode::NO_CONTENT)
}

/// Shared touch path: take the caller's attempt out of the registry, fold
/// elapsed wall time in, and either report the forced completion or apply
/// `action` and put the attempt back. The registry lock spans the whole
/// mutation, so a timer expiry and a user action can never both finish the
/// same session.
fn touch_attempt<F>(
    registry: &AttemptRegistry,
    id: Uuid,
    claims: &Claims,
    now: DateTime<Utc>,
    action: F,
) -> Result<AttemptOutcome, AppError>
where
    F: FnOnce(&mut ActiveAttempt) -> Result<(), AppError>,
{
    let mut attempts = lock_registry(registry)?;
    let mut attempt = take_owned(&mut attempts, id, claims)?;

    if let Some(completion) = attempt.sync_clock(now) {
        return Ok(AttemptOutcome::Finished(FinishedAttempt::capture(
            attempt, completion, now,
        )));
    }

    match action(&mut attempt) {
        Ok(()) => {
            let view = attempt_view(id, &attempt);
            attempts.insert(id, attempt);
            Ok(AttemptOutcome::Live(view))
        }
        Err(e) => {
            attempts.insert(id, attempt);
            Err(e)
        }
    }
}

/// Removes the attempt from the registry if it exists and belongs to the
/// caller. A foreign attempt id reads as NotFound rather than Forbidden so
/// ids cannot be probed.
fn take_owned(
    attempts: &mut HashMap<Uuid, ActiveAttempt>,
    id: Uuid,
    claims: &Claims,
) -> Result<ActiveAttempt, AppError> {
    let attempt = attempts
        .remove(&id)
        .ok_or(AppError::NotFound("Attempt not found".to_string()))?;

    if attempt.student_id != claims.user_id() {
        attempts.insert(id, attempt);
        return Err(AppError::NotFound("Attempt not found".to_string()));
    }

    Ok(attempt)
}

fn lock_registry(
    registry: &AttemptRegistry,
) -> Result<std::sync::RwLockWriteGuard<'_, HashMap<Uuid, ActiveAttempt>>, AppError> {
    registry
        .write()
        .map_err(|_| AppError::InternalServerError("Attempt registry poisoned".to_string()))
}

async fn respond(outcome: AttemptOutcome, pool: &PgPool) -> Result<Json<Value>, AppError> {
    match outcome {
        AttemptOutcome::Live(view) => Ok(Json(view)),
        AttemptOutcome::Finished(finished) => {
            let view = completion_view(&finished);
            save_result(pool, &finished).await;
            Ok(Json(view))
        }
    }
}

/// Persists the result row. Failure is logged and swallowed: the computed
/// score is never withheld from the student because a write failed, and no
/// retry is attempted.
async fn save_result(pool: &PgPool, finished: &FinishedAttempt) {
    let completion = &finished.completion;
    let insert = sqlx::query(
        r#"
        INSERT INTO quiz_results
            (student_id, quiz_id, quiz_title, subject, score, answers,
             total_questions, completed_at, time_taken_seconds)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        "#,
    )
    .bind(finished.student_id)
    .bind(finished.quiz_id)
    .bind(&finished.quiz_title)
    .bind(&finished.subject)
    .bind(completion.score)
    .bind(SqlJson(&completion.answers))
    .bind(completion.total_questions as i32)
    .bind(finished.completed_at)
    .bind(completion.time_taken_seconds as i32)
    .execute(pool)
    .await;

    if let Err(e) = insert {
        tracing::error!(
            "Failed to save quiz result (student {}, quiz {}): {:?}",
            finished.student_id,
            finished.quiz_id,
            e
        );
    }
}

fn attempt_view(id: Uuid, attempt: &ActiveAttempt) -> Value {
    let session = &attempt.session;
    let quiz = session.quiz();
    let index = session.current_question();
    let current: Option<PublicQuestion> = quiz.questions.get(index).map(PublicQuestion::from);

    json!({
        "attempt_id": id,
        "quiz_id": quiz.id,
        "quiz_title": quiz.title,
        "subject": quiz.subject,
        "class_level": quiz.class_level,
        "duration_minutes": quiz.duration_minutes,
        "phase": session.phase(),
        "total_questions": quiz.questions.len(),
        "remaining_seconds": session.remaining_seconds(),
        "current_question_index": index,
        "current_question": current,
        "answers": session.answers(),
        "answered_count": session.answers().len(),
    })
}

fn completion_view(finished: &FinishedAttempt) -> Value {
    let completion = &finished.completion;
    json!({
        "quiz_id": finished.quiz_id,
        "quiz_title": finished.quiz_title,
        "subject": finished.subject,
        "phase": "completed",
        "score": completion.score,
        "correct_count": completion.correct_count,
        "total_questions": completion.total_questions,
        "time_taken_seconds": completion.time_taken_seconds,
        "completed_at": finished.completed_at,
    })
}
