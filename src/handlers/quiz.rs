// src/handlers/quiz.rs

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::{PgPool, types::Json as SqlJson};
use validator::Validate;

use crate::{
    catalog::{self, CatalogQuery},
    error::AppError,
    models::quiz::{CreateQuizRequest, Question, Quiz, QuizSummary},
    session::validate_quiz_shape,
    utils::jwt::Claims,
};

/// Loads the quiz catalog, newest first. Answer keys stay inside the row
/// structs and are stripped before anything leaves the handler.
async fn load_quizzes(pool: &PgPool) -> Result<Vec<Quiz>, AppError> {
    let quizzes = sqlx::query_as::<_, Quiz>(
        r#"
        SELECT id, title, subject, class_level, duration_minutes,
               questions, created_by, uploaded_at
        FROM quizzes
        ORDER BY uploaded_at DESC
        "#,
    )
    .fetch_all(pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list quizzes: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(quizzes)
}

/// Lists quiz summaries, optionally narrowed by free text, subject and
/// class. No question bodies and no correct answers in the response.
pub async fn list_quizzes(
    State(pool): State<PgPool>,
    Query(query): Query<CatalogQuery>,
) -> Result<impl IntoResponse, AppError> {
    let quizzes = load_quizzes(&pool).await?;
    let summaries: Vec<QuizSummary> = catalog::apply_query(&quizzes, &query)
        .into_iter()
        .map(QuizSummary::from)
        .collect();

    Ok(Json(summaries))
}

/// Distinct subjects and classes of the quiz catalog, first-seen order.
pub async fn quiz_facets(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let quizzes = load_quizzes(&pool).await?;

    Ok(Json(serde_json::json!({
        "subjects": catalog::distinct_subjects(&quizzes),
        "classes": catalog::distinct_class_levels(&quizzes),
    })))
}

/// Retrieves the start-screen metadata for one quiz: title, subject, class,
/// duration and question count. An unknown id is a terminal NotFound — the
/// client navigates away rather than retrying.
pub async fn get_quiz(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = fetch_quiz(&pool, id).await?;
    Ok(Json(QuizSummary::from(&quiz)))
}

/// Creates a new quiz. Teacher only.
///
/// Request validation covers the field shapes; the assembled quiz then
/// passes the same well-formedness check a session performs at load time,
/// so nothing that cannot be taken is ever stored.
pub async fn create_quiz(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let questions: Vec<Question> = payload
        .questions
        .into_iter()
        .map(|q| Question {
            text: q.text,
            options: q.options,
            correct_option_index: q.correct_option_index,
        })
        .collect();

    validate_quiz_shape(payload.duration_minutes, &questions)?;

    let quiz = sqlx::query_as::<_, Quiz>(
        r#"
        INSERT INTO quizzes (title, subject, class_level, duration_minutes, questions, created_by)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id, title, subject, class_level, duration_minutes,
                  questions, created_by, uploaded_at
        "#,
    )
    .bind(&payload.title)
    .bind(&payload.subject)
    .bind(&payload.class_level)
    .bind(payload.duration_minutes)
    .bind(SqlJson(&questions))
    .bind(claims.user_id())
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create quiz: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok((StatusCode::CREATED, Json(QuizSummary::from(&quiz))))
}

/// Deletes a quiz. Only the authoring teacher may delete; past results
/// keep their denormalized title and survive.
pub async fn delete_quiz(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = fetch_quiz(&pool, id).await?;
    if quiz.created_by != claims.user_id() {
        return Err(AppError::Forbidden(
            "Only the authoring teacher can delete this quiz".to_string(),
        ));
    }

    sqlx::query("DELETE FROM quizzes WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete quiz {}: {:?}", id, e);
            AppError::InternalServerError(e.to_string())
        })?;

    Ok(StatusCode::NO_CONTENT)
}

/// Fetches one quiz row or NotFound.
pub async fn fetch_quiz(pool: &PgPool, id: i64) -> Result<Quiz, AppError> {
    sqlx::query_as::<_, Quiz>(
        r#"
        SELECT id, title, subject, class_level, duration_minutes,
               questions, created_by, uploaded_at
        FROM quizzes
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("Quiz not found".to_string()))
}
