// src/models/result.rs

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};

/// Represents the 'quiz_results' table in the database.
/// The persisted outcome of one completed assessment session. Written
/// exactly once per completion; never updated or deleted.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct QuizResult {
    pub id: i64,

    pub student_id: i64,

    pub quiz_id: i64,

    /// Denormalized so the report survives quiz deletion.
    pub quiz_title: String,

    pub subject: String,

    /// Integer percentage in [0, 100].
    pub score: i32,

    /// Copy of the session's answer map: question index -> chosen option.
    /// Unanswered questions are absent.
    pub answers: Json<HashMap<usize, usize>>,

    pub total_questions: i32,

    pub completed_at: chrono::DateTime<chrono::Utc>,

    pub time_taken_seconds: i32,
}

/// Aggregate statistics for the student performance report.
#[derive(Debug, PartialEq, Serialize)]
pub struct ReportSummary {
    pub total_quizzes: usize,
    /// Rounded mean of all scores; 0 when no quizzes were taken.
    pub average_score: i32,
    pub highest_score: i32,
    pub total_time_seconds: i64,
}
