// src/session.rs

//! The quiz-taking state machine.
//!
//! One `AssessmentSession` tracks a single student's in-progress attempt:
//! `NotStarted -> Running -> Completed`, with no way back. The machine is a
//! plain serializable value driven by pure transition methods; it never
//! reads a clock. Callers feed elapsed whole seconds through [`AssessmentSession::elapse`],
//! which makes the countdown deterministic under test and leaves scheduling
//! to the service layer.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::quiz::{Question, Quiz};

/// Rejection reasons for a malformed quiz at session load time.
///
/// A quiz that fails these checks never becomes a session: scoring a
/// zero-question quiz would divide by zero, and an out-of-range correct
/// index could never be answered right.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuizValidationError {
    NoQuestions,
    TooFewOptions { question: usize },
    CorrectIndexOutOfRange { question: usize },
    NonPositiveDuration,
}

impl fmt::Display for QuizValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuizValidationError::NoQuestions => write!(f, "Quiz has no questions"),
            QuizValidationError::TooFewOptions { question } => {
                write!(f, "Question {} has fewer than two options", question + 1)
            }
            QuizValidationError::CorrectIndexOutOfRange { question } => {
                write!(f, "Question {} has an out-of-range correct option", question + 1)
            }
            QuizValidationError::NonPositiveDuration => {
                write!(f, "Quiz duration must be at least one minute")
            }
        }
    }
}

impl std::error::Error for QuizValidationError {}

/// Checks a quiz definition is well-formed enough to run a session.
pub fn validate_quiz(quiz: &Quiz) -> Result<(), QuizValidationError> {
    validate_quiz_shape(quiz.duration_minutes, &quiz.questions)
}

/// Shape check on the raw parts, usable before a row exists.
pub fn validate_quiz_shape(
    duration_minutes: i32,
    questions: &[Question],
) -> Result<(), QuizValidationError> {
    if duration_minutes <= 0 {
        return Err(QuizValidationError::NonPositiveDuration);
    }
    if questions.is_empty() {
        return Err(QuizValidationError::NoQuestions);
    }
    for (index, question) in questions.iter().enumerate() {
        if question.options.len() < 2 {
            return Err(QuizValidationError::TooFewOptions { question: index });
        }
        if question.correct_option_index >= question.options.len() {
            return Err(QuizValidationError::CorrectIndexOutOfRange { question: index });
        }
    }
    Ok(())
}

/// Rejected session transitions. None of these are fatal; the session
/// stays in its current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionError {
    AlreadyStarted,
    NotRunning,
    QuestionOutOfRange,
    OptionOutOfRange,
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::AlreadyStarted => write!(f, "Attempt was already started"),
            SessionError::NotRunning => write!(f, "Attempt is not running"),
            SessionError::QuestionOutOfRange => write!(f, "Question index out of range"),
            SessionError::OptionOutOfRange => write!(f, "Option index out of range"),
        }
    }
}

impl std::error::Error for SessionError {}

/// Session lifecycle phase. `Running` is entered exactly once; there is no
/// pause and no way out of `Completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    NotStarted,
    Running,
    Completed,
}

/// Data produced by the `Running -> Completed` transition. The service
/// layer combines it with student identity into a persisted result row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    /// Integer percentage in [0, 100], rounded half-up.
    pub score: i32,
    pub correct_count: usize,
    pub total_questions: usize,
    /// Full duration minus whatever was left on the clock at submission.
    pub time_taken_seconds: u32,
    /// Copy of the answer map at submission.
    pub answers: HashMap<usize, usize>,
}

/// A student's transient attempt at one quiz. Exists only in memory until
/// completion; abandoning it loses nothing but the attempt itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentSession {
    quiz: Quiz,
    phase: Phase,
    current_question: usize,
    /// Sparse map: question index -> selected option index.
    answers: HashMap<usize, usize>,
    remaining_seconds: u32,
}

impl AssessmentSession {
    /// Creates a session over a validated quiz. Malformed quizzes are
    /// rejected here rather than misbehaving later.
    pub fn new(quiz: Quiz) -> Result<Self, QuizValidationError> {
        validate_quiz(&quiz)?;
        let remaining_seconds = quiz.duration_minutes as u32 * 60;
        Ok(AssessmentSession {
            quiz,
            phase: Phase::NotStarted,
            current_question: 0,
            answers: HashMap::new(),
            remaining_seconds,
        })
    }

    pub fn quiz(&self) -> &Quiz {
        &self.quiz
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn current_question(&self) -> usize {
        self.current_question
    }

    pub fn answers(&self) -> &HashMap<usize, usize> {
        &self.answers
    }

    pub fn remaining_seconds(&self) -> u32 {
        self.remaining_seconds
    }

    pub fn total_seconds(&self) -> u32 {
        self.quiz.duration_minutes as u32 * 60
    }

    /// Whole seconds already consumed by the countdown.
    pub fn seconds_elapsed(&self) -> u32 {
        self.total_seconds() - self.remaining_seconds
    }

    /// `NotStarted -> Running`. Resets the clock, the cursor and the
    /// answer map; can only happen once.
    pub fn start(&mut self) -> Result<(), SessionError> {
        if self.phase != Phase::NotStarted {
            return Err(SessionError::AlreadyStarted);
        }
        self.phase = Phase::Running;
        self.remaining_seconds = self.total_seconds();
        self.current_question = 0;
        self.answers.clear();
        Ok(())
    }

    /// Advances the countdown by one second.
    pub fn tick(&mut self) -> Option<Completion> {
        self.elapse(1)
    }

    /// Advances the countdown by `seconds`. When the clock reaches zero
    /// while running, the session is force-submitted with whatever answers
    /// it holds; the returned completion must be treated exactly like an
    /// explicit submit.
    pub fn elapse(&mut self, seconds: u32) -> Option<Completion> {
        if self.phase != Phase::Running || seconds == 0 {
            return None;
        }
        self.remaining_seconds = self.remaining_seconds.saturating_sub(seconds);
        if self.remaining_seconds == 0 {
            return Some(self.finalize());
        }
        None
    }

    /// Records (or overwrites) the answer for a question. Any question may
    /// be answered in any order, and re-answering is always allowed.
    pub fn select_answer(&mut self, question: usize, option: usize) -> Result<(), SessionError> {
        if self.phase != Phase::Running {
            return Err(SessionError::NotRunning);
        }
        let Some(q) = self.quiz.questions.get(question) else {
            return Err(SessionError::QuestionOutOfRange);
        };
        if option >= q.options.len() {
            return Err(SessionError::OptionOutOfRange);
        }
        self.answers.insert(question, option);
        Ok(())
    }

    /// Moves the cursor to any valid question index, forward or backward.
    /// Never touches the answer map.
    pub fn go_to(&mut self, index: usize) -> Result<(), SessionError> {
        if self.phase != Phase::Running {
            return Err(SessionError::NotRunning);
        }
        if index >= self.quiz.questions.len() {
            return Err(SessionError::QuestionOutOfRange);
        }
        self.current_question = index;
        Ok(())
    }

    /// `Running -> Completed`, explicitly. Returns `None` if the session is
    /// not running — in particular if it already completed, which is what
    /// guards the timer-expiry path and a user click racing each other into
    /// a double submission. Exactly one `Some` is ever produced.
    pub fn submit(&mut self) -> Option<Completion> {
        if self.phase != Phase::Running {
            return None;
        }
        Some(self.finalize())
    }

    fn finalize(&mut self) -> Completion {
        let (correct_count, score) = score_answers(&self.answers, &self.quiz.questions);
        self.phase = Phase::Completed;
        Completion {
            score,
            correct_count,
            total_questions: self.quiz.questions.len(),
            time_taken_seconds: self.total_seconds() - self.remaining_seconds,
            answers: self.answers.clone(),
        }
    }
}

/// Scores an answer map against the full question list. Unanswered
/// questions count as wrong; the percentage is rounded half-up.
/// Returns (correct_count, score).
pub fn score_answers(answers: &HashMap<usize, usize>, questions: &[Question]) -> (usize, i32) {
    if questions.is_empty() {
        return (0, 0);
    }
    let correct_count = questions
        .iter()
        .enumerate()
        .filter(|(index, question)| answers.get(index) == Some(&question.correct_option_index))
        .count();
    let score = (correct_count as f64 / questions.len() as f64 * 100.0).round() as i32;
    (correct_count, score)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::types::Json;

    fn question(correct: usize) -> Question {
        Question {
            text: "Pick one".to_string(),
            options: vec!["A".into(), "B".into(), "C".into(), "D".into()],
            correct_option_index: correct,
        }
    }

    fn quiz(questions: Vec<Question>, duration_minutes: i32) -> Quiz {
        Quiz {
            id: 1,
            title: "Fractions".to_string(),
            subject: "Maths".to_string(),
            class_level: "7".to_string(),
            duration_minutes,
            questions: Json(questions),
            created_by: 1,
            uploaded_at: chrono::Utc::now(),
        }
    }

    fn running_session(questions: Vec<Question>, duration_minutes: i32) -> AssessmentSession {
        let mut session = AssessmentSession::new(quiz(questions, duration_minutes)).unwrap();
        session.start().unwrap();
        session
    }

    #[test]
    fn rejects_quiz_with_no_questions() {
        let err = AssessmentSession::new(quiz(vec![], 10)).unwrap_err();
        assert_eq!(err, QuizValidationError::NoQuestions);
    }

    #[test]
    fn rejects_out_of_range_correct_index() {
        let err = AssessmentSession::new(quiz(vec![question(4)], 10)).unwrap_err();
        assert_eq!(err, QuizValidationError::CorrectIndexOutOfRange { question: 0 });
    }

    #[test]
    fn rejects_single_option_question() {
        let bad = Question {
            text: "Only one way".to_string(),
            options: vec!["A".into()],
            correct_option_index: 0,
        };
        let err = AssessmentSession::new(quiz(vec![bad], 10)).unwrap_err();
        assert_eq!(err, QuizValidationError::TooFewOptions { question: 0 });
    }

    #[test]
    fn rejects_non_positive_duration() {
        let err = AssessmentSession::new(quiz(vec![question(0)], 0)).unwrap_err();
        assert_eq!(err, QuizValidationError::NonPositiveDuration);
    }

    #[test]
    fn start_initializes_clock_and_cursor() {
        let mut session = AssessmentSession::new(quiz(vec![question(0)], 10)).unwrap();
        assert_eq!(session.phase(), Phase::NotStarted);
        session.start().unwrap();
        assert_eq!(session.phase(), Phase::Running);
        assert_eq!(session.remaining_seconds(), 600);
        assert_eq!(session.current_question(), 0);
        assert!(session.answers().is_empty());
        // Running is entered exactly once.
        assert_eq!(session.start(), Err(SessionError::AlreadyStarted));
    }

    #[test]
    fn answering_requires_running_phase() {
        let mut session = AssessmentSession::new(quiz(vec![question(0)], 10)).unwrap();
        assert_eq!(session.select_answer(0, 1), Err(SessionError::NotRunning));
    }

    #[test]
    fn answers_can_be_written_out_of_order_and_overwritten() {
        let mut session = running_session(vec![question(0), question(1), question(2)], 10);
        session.select_answer(2, 3).unwrap();
        session.select_answer(0, 1).unwrap();
        session.select_answer(0, 0).unwrap();
        assert_eq!(session.answers().get(&0), Some(&0));
        assert_eq!(session.answers().get(&2), Some(&3));
        assert_eq!(session.answers().len(), 2);
    }

    #[test]
    fn out_of_range_answer_indices_are_rejected() {
        let mut session = running_session(vec![question(0)], 10);
        assert_eq!(session.select_answer(5, 0), Err(SessionError::QuestionOutOfRange));
        assert_eq!(session.select_answer(0, 4), Err(SessionError::OptionOutOfRange));
        assert!(session.answers().is_empty());
    }

    #[test]
    fn navigation_jumps_anywhere_valid_and_never_mutates_answers() {
        let mut session = running_session(vec![question(0), question(1), question(2)], 10);
        session.select_answer(1, 1).unwrap();
        let before = session.answers().clone();

        session.go_to(2).unwrap();
        session.go_to(0).unwrap();
        session.go_to(1).unwrap();
        assert_eq!(session.current_question(), 1);
        assert_eq!(session.go_to(3), Err(SessionError::QuestionOutOfRange));
        assert_eq!(session.current_question(), 1);

        assert_eq!(session.answers(), &before);
    }

    #[test]
    fn scoring_is_deterministic() {
        let questions = vec![question(0), question(2), question(1)];
        let mut answers = HashMap::new();
        answers.insert(0, 0);
        answers.insert(2, 1);
        let first = score_answers(&answers, &questions);
        let second = score_answers(&answers, &questions);
        assert_eq!(first, second);
    }

    #[test]
    fn scoring_boundaries() {
        let questions = vec![question(0), question(1), question(2), question(3)];

        let all_correct: HashMap<usize, usize> =
            (0..4).map(|i| (i, questions[i].correct_option_index)).collect();
        assert_eq!(score_answers(&all_correct, &questions), (4, 100));

        assert_eq!(score_answers(&HashMap::new(), &questions), (0, 0));

        let half: HashMap<usize, usize> = vec![(0, 0), (1, 1), (2, 0), (3, 0)].into_iter().collect();
        assert_eq!(score_answers(&half, &questions), (2, 50));
    }

    #[test]
    fn score_rounds_half_up() {
        // 1 of 8 correct = 12.5% -> 13.
        let questions: Vec<Question> = (0..8).map(|_| question(0)).collect();
        let mut answers = HashMap::new();
        answers.insert(0, 0);
        assert_eq!(score_answers(&answers, &questions), (1, 13));
    }

    #[test]
    fn example_scenario_two_of_three() {
        // Correct options 0, 2, 1; student answers 0, 1, 1.
        let mut session = running_session(vec![question(0), question(2), question(1)], 10);
        session.select_answer(0, 0).unwrap();
        session.select_answer(1, 1).unwrap();
        session.select_answer(2, 1).unwrap();

        let completion = session.submit().unwrap();
        assert_eq!(completion.correct_count, 2);
        assert_eq!(completion.score, 67);
        assert_eq!(completion.total_questions, 3);
    }

    #[test]
    fn submit_is_guarded_against_double_fire() {
        let mut session = running_session(vec![question(0)], 10);
        session.select_answer(0, 0).unwrap();

        let first = session.submit();
        assert!(first.is_some());
        assert_eq!(session.phase(), Phase::Completed);
        // Timer expiry racing a user click: both resolve through the same
        // guard, so the second path produces nothing to persist.
        assert_eq!(session.submit(), None);
        assert_eq!(session.tick(), None);
    }

    #[test]
    fn timer_expiry_forces_submission_with_partial_answers() {
        let questions = vec![question(0), question(0), question(0), question(0), question(0)];
        let mut session = running_session(questions, 1);
        session.select_answer(0, 0).unwrap();
        session.select_answer(1, 0).unwrap();
        session.select_answer(2, 0).unwrap();

        let completion = session.elapse(60).expect("expiry must force submission");
        assert_eq!(session.phase(), Phase::Completed);
        assert_eq!(completion.correct_count, 3);
        assert_eq!(completion.score, 60);
        assert_eq!(completion.time_taken_seconds, 60);
    }

    #[test]
    fn partial_elapse_keeps_running_and_tracks_time_taken() {
        let mut session = running_session(vec![question(0)], 1);
        assert_eq!(session.elapse(30), None);
        assert_eq!(session.remaining_seconds(), 30);
        assert_eq!(session.seconds_elapsed(), 30);

        let completion = session.submit().unwrap();
        assert_eq!(completion.time_taken_seconds, 30);
    }

    #[test]
    fn tick_counts_single_seconds() {
        let mut session = running_session(vec![question(0)], 1);
        assert_eq!(session.tick(), None);
        assert_eq!(session.remaining_seconds(), 59);
    }

    #[test]
    fn completion_carries_answer_map_copy() {
        let mut session = running_session(vec![question(0), question(1)], 10);
        session.select_answer(0, 3).unwrap();
        let completion = session.submit().unwrap();
        assert_eq!(completion.answers.get(&0), Some(&3));
        assert_eq!(completion.answers.len(), 1);
    }
}
