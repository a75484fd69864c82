// tests/api_tests.rs

use vidyasetu::{config::Config, routes, state::AppState};

use sqlx::postgres::PgPoolOptions;

/// Helper function to spawn the app on a random port for testing.
/// Returns the base URL (e.g., "http://127.0.0.1:12345"), or `None` when no
/// test database is configured, in which case the caller skips the test.
async fn spawn_app() -> Option<String> {
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set; skipping integration test");
        return None;
    };

    // 1. Create a pool
    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&database_url)
        .await
        .expect("Failed to connect to Postgres for testing.");

    // 2. Run migrations
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    // 3. Create test configuration and state
    let config = Config {
        database_url: database_url.clone(),
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        jwt_expiration: 600, // 10 minutes for tests
        rust_log: "error".to_string(),
        bootstrap_teacher_username: None,
        bootstrap_teacher_password: None,
    };

    let state = AppState::new(pool, config);

    // 4. Create the router with the app state
    let app = routes::create_router(state);

    // 5. Bind to port 0 to get a random available port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");

    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    // 6. Spawn the server in the background
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    Some(address)
}

fn unique_name(prefix: &str) -> String {
    format!("{}_{}", prefix, &uuid::Uuid::new_v4().to_string()[..8])
}

/// Registers an account and returns a bearer token for it.
async fn register_and_login(
    client: &reqwest::Client,
    address: &str,
    register_path: &str,
    username: &str,
) -> String {
    let response = client
        .post(format!("{}{}", address, register_path))
        .json(&serde_json::json!({
            "username": username,
            "password": "password123"
        }))
        .send()
        .await
        .expect("Register failed");
    assert_eq!(response.status().as_u16(), 201);

    let login = client
        .post(format!("{}/api/auth/login", address))
        .json(&serde_json::json!({
            "username": username,
            "password": "password123"
        }))
        .send()
        .await
        .expect("Login failed")
        .json::<serde_json::Value>()
        .await
        .expect("Failed to parse login json");

    login["token"].as_str().expect("Token not found").to_string()
}

#[tokio::test]
async fn health_check_404() {
    // Arrange
    let Some(address) = spawn_app().await else { return };
    let client = reqwest::Client::new();

    // Act
    let response = client
        .get(format!("{}/random_path_that_does_not_exist", address))
        .send()
        .await
        .expect("Failed to execute request");

    // Assert
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn register_fails_validation() {
    // Arrange
    let Some(address) = spawn_app().await else { return };
    let client = reqwest::Client::new();

    // Act: Send a username that is too short
    let response = client
        .post(format!("{}/api/auth/register", address))
        .json(&serde_json::json!({
            "username": "yo",
            "password": "password123"
        }))
        .send()
        .await
        .expect("Failed to execute request");

    // Assert
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn login_reports_role() {
    let Some(address) = spawn_app().await else { return };
    let client = reqwest::Client::new();

    let username = unique_name("t");
    register_and_login(&client, &address, "/api/auth/register/teacher", &username).await;

    let login = client
        .post(format!("{}/api/auth/login", address))
        .json(&serde_json::json!({ "username": username, "password": "password123" }))
        .send()
        .await
        .unwrap()
        .json::<serde_json::Value>()
        .await
        .unwrap();

    assert_eq!(login["role"], "teacher");
}

#[tokio::test]
async fn students_cannot_publish_content() {
    let Some(address) = spawn_app().await else { return };
    let client = reqwest::Client::new();

    let token =
        register_and_login(&client, &address, "/api/auth/register", &unique_name("s")).await;

    let response = client
        .post(format!("{}/api/content/notes", address))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({
            "title": "Algebra basics",
            "subject": "Maths",
            "class_level": "7",
            "resource_url": "https://files.example.com/algebra.pdf"
        }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 403);
}

#[tokio::test]
async fn content_listing_filters_and_facets() {
    let Some(address) = spawn_app().await else { return };
    let client = reqwest::Client::new();

    let token =
        register_and_login(&client, &address, "/api/auth/register/teacher", &unique_name("t"))
            .await;

    // Unique marker so the assertions are immune to rows left behind by
    // other test runs against the same database.
    let marker = unique_name("topic");
    let uploads = [
        ("Maths", "7", format!("Algebra {}", marker)),
        ("Science", "7", format!("Plants {}", marker)),
        ("Maths", "8", format!("Geometry {}", marker)),
    ];

    for (subject, class_level, title) in &uploads {
        let response = client
            .post(format!("{}/api/content/notes", address))
            .header("Authorization", format!("Bearer {}", token))
            .json(&serde_json::json!({
                "title": title,
                "description": "<p>Chapter summary</p><script>alert(1)</script>",
                "subject": subject,
                "class_level": class_level,
                "resource_url": "https://files.example.com/notes.pdf"
            }))
            .send()
            .await
            .expect("Upload failed");
        assert_eq!(response.status().as_u16(), 201);
    }

    // Free-text search narrows to the three fresh uploads, newest first.
    let listed: Vec<serde_json::Value> = client
        .get(format!("{}/api/content/notes?q={}", address, marker))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listed.len(), 3);
    assert!(listed[0]["title"].as_str().unwrap().contains("Geometry"));

    // Descriptions were sanitized on the way in.
    for record in &listed {
        let description = record["description"].as_str().unwrap();
        assert!(!description.contains("script"));
    }

    // Combined criteria are conjunctive.
    let filtered: Vec<serde_json::Value> = client
        .get(format!(
            "{}/api/content/notes?q={}&subject=Maths&class=7",
            address, marker
        ))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(filtered.len(), 1);
    assert!(filtered[0]["title"].as_str().unwrap().contains("Algebra"));

    // Facets include the subjects and classes just uploaded.
    let facets: serde_json::Value = client
        .get(format!("{}/api/content/notes/facets", address))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let subjects: Vec<&str> = facets["subjects"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s.as_str().unwrap())
        .collect();
    assert!(subjects.contains(&"Maths"));
    assert!(subjects.contains(&"Science"));
}

#[tokio::test]
async fn malformed_quizzes_are_rejected_at_creation() {
    let Some(address) = spawn_app().await else { return };
    let client = reqwest::Client::new();

    let token =
        register_and_login(&client, &address, "/api/auth/register/teacher", &unique_name("t"))
            .await;

    // No questions at all.
    let response = client
        .post(format!("{}/api/quizzes", address))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({
            "title": "Empty quiz",
            "subject": "Maths",
            "class_level": "7",
            "duration_minutes": 10,
            "questions": []
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);

    // Correct option index outside the options list.
    let response = client
        .post(format!("{}/api/quizzes", address))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({
            "title": "Broken key",
            "subject": "Maths",
            "class_level": "7",
            "duration_minutes": 10,
            "questions": [
                { "text": "2+2?", "options": ["3", "4"], "correct_option_index": 5 }
            ]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn full_quiz_attempt_flow() {
    let Some(address) = spawn_app().await else { return };
    let client = reqwest::Client::new();

    let teacher_token =
        register_and_login(&client, &address, "/api/auth/register/teacher", &unique_name("t"))
            .await;
    let student_token =
        register_and_login(&client, &address, "/api/auth/register", &unique_name("s")).await;

    // 1. Teacher publishes a three-question quiz.
    let quiz: serde_json::Value = client
        .post(format!("{}/api/quizzes", address))
        .header("Authorization", format!("Bearer {}", teacher_token))
        .json(&serde_json::json!({
            "title": unique_name("Fractions"),
            "subject": "Maths",
            "class_level": "7",
            "duration_minutes": 10,
            "questions": [
                { "text": "1/2 + 1/2?", "options": ["1", "2", "3", "4"], "correct_option_index": 0 },
                { "text": "1/4 of 8?", "options": ["1", "4", "2", "8"], "correct_option_index": 2 },
                { "text": "3/3 equals?", "options": ["0", "1", "3", "9"], "correct_option_index": 1 }
            ]
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let quiz_id = quiz["id"].as_i64().expect("quiz id");
    assert_eq!(quiz["question_count"], 3);

    // 2. The start screen shows metadata but no answer keys.
    let detail: serde_json::Value = client
        .get(format!("{}/api/quizzes/{}", address, quiz_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(detail["duration_minutes"], 10);
    assert!(detail.get("questions").is_none());

    // 3. Student opens and starts an attempt.
    let attempt: serde_json::Value = client
        .post(format!("{}/api/attempts", address))
        .header("Authorization", format!("Bearer {}", student_token))
        .json(&serde_json::json!({ "quiz_id": quiz_id }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let attempt_id = attempt["attempt_id"].as_str().expect("attempt id").to_string();
    assert_eq!(attempt["phase"], "not_started");

    let started: serde_json::Value = client
        .post(format!("{}/api/attempts/{}/start", address, attempt_id))
        .header("Authorization", format!("Bearer {}", student_token))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(started["phase"], "running");
    assert_eq!(started["remaining_seconds"], 600);
    // Students see the question text and options, never the correct index.
    assert!(started["current_question"]["text"].is_string());
    assert!(started["current_question"].get("correct_option_index").is_none());

    // 4. Answer out of order, navigate back and forth, re-answer.
    for (question_index, option_index) in [(2usize, 1usize), (0, 0), (1, 3), (1, 2)] {
        let response = client
            .post(format!("{}/api/attempts/{}/answers", address, attempt_id))
            .header("Authorization", format!("Bearer {}", student_token))
            .json(&serde_json::json!({
                "question_index": question_index,
                "option_index": option_index
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 200);
    }

    let moved: serde_json::Value = client
        .post(format!("{}/api/attempts/{}/position", address, attempt_id))
        .header("Authorization", format!("Bearer {}", student_token))
        .json(&serde_json::json!({ "question_index": 2 }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(moved["current_question_index"], 2);
    assert_eq!(moved["answered_count"], 3);

    // Out-of-range navigation is rejected without disturbing the attempt.
    let bad_jump = client
        .post(format!("{}/api/attempts/{}/position", address, attempt_id))
        .header("Authorization", format!("Bearer {}", student_token))
        .json(&serde_json::json!({ "question_index": 9 }))
        .send()
        .await
        .unwrap();
    assert_eq!(bad_jump.status().as_u16(), 400);

    // 5. Submit: all three answers correct.
    let result: serde_json::Value = client
        .post(format!("{}/api/attempts/{}/submit", address, attempt_id))
        .header("Authorization", format!("Bearer {}", student_token))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(result["phase"], "completed");
    assert_eq!(result["score"], 100);
    assert_eq!(result["correct_count"], 3);
    assert_eq!(result["total_questions"], 3);

    // A second submit cannot produce a second result row: the attempt is
    // gone from the registry.
    let resubmit = client
        .post(format!("{}/api/attempts/{}/submit", address, attempt_id))
        .header("Authorization", format!("Bearer {}", student_token))
        .send()
        .await
        .unwrap();
    assert_eq!(resubmit.status().as_u16(), 404);

    // 6. The result shows up in the student's report.
    let results: Vec<serde_json::Value> = client
        .get(format!("{}/api/reports/results", address))
        .header("Authorization", format!("Bearer {}", student_token))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let persisted = results
        .iter()
        .find(|r| r["quiz_id"].as_i64() == Some(quiz_id))
        .expect("result row persisted");
    assert_eq!(persisted["score"], 100);

    let summary: serde_json::Value = client
        .get(format!("{}/api/reports/summary", address))
        .header("Authorization", format!("Bearer {}", student_token))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(summary["total_quizzes"], 1);
    assert_eq!(summary["highest_score"], 100);
}

#[tokio::test]
async fn abandoning_an_attempt_persists_nothing() {
    let Some(address) = spawn_app().await else { return };
    let client = reqwest::Client::new();

    let teacher_token =
        register_and_login(&client, &address, "/api/auth/register/teacher", &unique_name("t"))
            .await;
    let student_token =
        register_and_login(&client, &address, "/api/auth/register", &unique_name("s")).await;

    let quiz: serde_json::Value = client
        .post(format!("{}/api/quizzes", address))
        .header("Authorization", format!("Bearer {}", teacher_token))
        .json(&serde_json::json!({
            "title": unique_name("Shapes"),
            "subject": "Maths",
            "class_level": "6",
            "duration_minutes": 5,
            "questions": [
                { "text": "Sides of a square?", "options": ["3", "4"], "correct_option_index": 1 }
            ]
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let quiz_id = quiz["id"].as_i64().unwrap();

    let attempt: serde_json::Value = client
        .post(format!("{}/api/attempts", address))
        .header("Authorization", format!("Bearer {}", student_token))
        .json(&serde_json::json!({ "quiz_id": quiz_id }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let attempt_id = attempt["attempt_id"].as_str().unwrap().to_string();

    client
        .post(format!("{}/api/attempts/{}/start", address, attempt_id))
        .header("Authorization", format!("Bearer {}", student_token))
        .send()
        .await
        .unwrap();

    // Walk away mid-quiz.
    let discarded = client
        .delete(format!("{}/api/attempts/{}", address, attempt_id))
        .header("Authorization", format!("Bearer {}", student_token))
        .send()
        .await
        .unwrap();
    assert_eq!(discarded.status().as_u16(), 204);

    // No partial result was saved.
    let results: Vec<serde_json::Value> = client
        .get(format!("{}/api/reports/results", address))
        .header("Authorization", format!("Bearer {}", student_token))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(results.iter().all(|r| r["quiz_id"].as_i64() != Some(quiz_id)));
}
