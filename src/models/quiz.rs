// src/models/quiz.rs

use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};
use validator::Validate;

use crate::catalog::CatalogEntry;

/// One multiple-choice question. Lives inside the quiz row as part of an
/// ordered JSON array; the position in that array is the question index
/// students answer against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    /// The question text shown to the student.
    pub text: String,

    /// Ordered answer options. At least two.
    pub options: Vec<String>,

    /// 0-based index of the single correct option.
    pub correct_option_index: usize,
}

/// Represents the 'quizzes' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Quiz {
    pub id: i64,

    pub title: String,

    pub subject: String,

    pub class_level: String,

    /// Time limit for one attempt. Positive; enforced on create and
    /// re-checked when a session loads the quiz.
    pub duration_minutes: i32,

    /// Ordered question list, stored as a JSON array in the database.
    pub questions: Json<Vec<Question>>,

    /// Id of the authoring teacher.
    pub created_by: i64,

    pub uploaded_at: chrono::DateTime<chrono::Utc>,
}

impl CatalogEntry for Quiz {
    fn title(&self) -> &str {
        &self.title
    }

    fn subject(&self) -> &str {
        &self.subject
    }

    fn class_level(&self) -> &str {
        &self.class_level
    }
}

/// DTO for a question as students see it (excludes the correct index).
#[derive(Debug, Clone, Serialize)]
pub struct PublicQuestion {
    pub text: String,
    pub options: Vec<String>,
}

impl From<&Question> for PublicQuestion {
    fn from(q: &Question) -> Self {
        PublicQuestion {
            text: q.text.clone(),
            options: q.options.clone(),
        }
    }
}

/// Catalog entry for the quiz listing: metadata only, no question bodies.
#[derive(Debug, Serialize)]
pub struct QuizSummary {
    pub id: i64,
    pub title: String,
    pub subject: String,
    pub class_level: String,
    pub duration_minutes: i32,
    pub question_count: usize,
    pub uploaded_at: chrono::DateTime<chrono::Utc>,
}

impl From<&Quiz> for QuizSummary {
    fn from(quiz: &Quiz) -> Self {
        QuizSummary {
            id: quiz.id,
            title: quiz.title.clone(),
            subject: quiz.subject.clone(),
            class_level: quiz.class_level.clone(),
            duration_minutes: quiz.duration_minutes,
            question_count: quiz.questions.len(),
            uploaded_at: quiz.uploaded_at,
        }
    }
}

/// DTO for one question in a quiz creation request.
#[derive(Debug, Deserialize)]
pub struct QuestionInput {
    pub text: String,
    pub options: Vec<String>,
    pub correct_option_index: usize,
}

/// DTO for a teacher creating a new quiz.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuizRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(min = 1, max = 100))]
    pub subject: String,
    #[validate(length(min = 1, max = 20))]
    pub class_level: String,
    #[validate(range(min = 1, max = 600))]
    pub duration_minutes: i32,
    #[validate(custom(function = validate_questions))]
    pub questions: Vec<QuestionInput>,
}

/// Validates the question list shape: non-empty, every question has text,
/// at least two options, and a correct index that points into its options.
fn validate_questions(questions: &[QuestionInput]) -> Result<(), validator::ValidationError> {
    if questions.is_empty() {
        return Err(validator::ValidationError::new("questions_cannot_be_empty"));
    }
    for q in questions {
        if q.text.trim().is_empty() {
            return Err(validator::ValidationError::new("question_text_empty"));
        }
        if q.options.len() < 2 {
            return Err(validator::ValidationError::new("too_few_options"));
        }
        if q.options.iter().any(|opt| opt.len() > 500) {
            return Err(validator::ValidationError::new("option_too_long"));
        }
        if q.correct_option_index >= q.options.len() {
            return Err(validator::ValidationError::new("correct_index_out_of_range"));
        }
    }
    Ok(())
}
