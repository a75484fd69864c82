// src/handlers/report.rs

use axum::{Extension, Json, extract::State, response::IntoResponse};
use sqlx::PgPool;

use crate::{
    error::AppError,
    models::result::{QuizResult, ReportSummary},
    utils::jwt::Claims,
};

/// Lists the current student's quiz results, newest first.
pub async fn list_my_results(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let results = fetch_results(&pool, claims.user_id()).await?;
    Ok(Json(results))
}

/// Aggregate performance statistics for the current student: quizzes
/// taken, rounded average score, highest score, total time spent.
pub async fn my_summary(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let results = fetch_results(&pool, claims.user_id()).await?;
    Ok(Json(summarize(&results)))
}

async fn fetch_results(pool: &PgPool, student_id: i64) -> Result<Vec<QuizResult>, AppError> {
    sqlx::query_as::<_, QuizResult>(
        r#"
        SELECT id, student_id, quiz_id, quiz_title, subject, score, answers,
               total_questions, completed_at, time_taken_seconds
        FROM quiz_results
        WHERE student_id = $1
        ORDER BY completed_at DESC
        "#,
    )
    .bind(student_id)
    .fetch_all(pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch quiz results for {}: {:?}", student_id, e);
        AppError::InternalServerError(e.to_string())
    })
}

/// Folds a result list into report statistics. An empty history is all
/// zeros, not an error.
fn summarize(results: &[QuizResult]) -> ReportSummary {
    if results.is_empty() {
        return ReportSummary {
            total_quizzes: 0,
            average_score: 0,
            highest_score: 0,
            total_time_seconds: 0,
        };
    }

    let total_score: i64 = results.iter().map(|r| r.score as i64).sum();
    let average_score = (total_score as f64 / results.len() as f64).round() as i32;
    let highest_score = results.iter().map(|r| r.score).max().unwrap_or(0);
    let total_time_seconds = results.iter().map(|r| r.time_taken_seconds as i64).sum();

    ReportSummary {
        total_quizzes: results.len(),
        average_score,
        highest_score,
        total_time_seconds,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::types::Json;
    use std::collections::HashMap;

    fn result(score: i32, time_taken_seconds: i32) -> QuizResult {
        QuizResult {
            id: 1,
            student_id: 7,
            quiz_id: 3,
            quiz_title: "Fractions".to_string(),
            subject: "Maths".to_string(),
            score,
            answers: Json(HashMap::new()),
            total_questions: 10,
            completed_at: chrono::Utc::now(),
            time_taken_seconds,
        }
    }

    #[test]
    fn empty_history_summarizes_to_zeros() {
        let summary = summarize(&[]);
        assert_eq!(
            summary,
            ReportSummary {
                total_quizzes: 0,
                average_score: 0,
                highest_score: 0,
                total_time_seconds: 0,
            }
        );
    }

    #[test]
    fn summary_rounds_the_average_and_totals_time() {
        let results = vec![result(67, 120), result(50, 90), result(90, 300)];
        let summary = summarize(&results);
        assert_eq!(summary.total_quizzes, 3);
        // (67 + 50 + 90) / 3 = 69
        assert_eq!(summary.average_score, 69);
        assert_eq!(summary.highest_score, 90);
        assert_eq!(summary.total_time_seconds, 510);
    }
}
