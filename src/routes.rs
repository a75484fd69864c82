// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method},
    middleware,
    routing::{delete, get, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{attempt, auth, content, quiz, report},
    state::AppState,
    utils::jwt::{auth_middleware, teacher_middleware},
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (auth, content, quizzes, attempts, reports).
/// * Teacher-only sub-routers stack the role gate on top of authentication.
/// * Applies global middleware (Trace, CORS).
pub fn create_router(state: AppState) -> Router {
    let origins: [HeaderValue; 2] = [
        "http://localhost:5173".parse().expect("valid origin"),
        "http://localhost:3000".parse().expect("valid origin"),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    let auth_routes = Router::new()
        .route("/register", post(auth::register_student))
        .route("/register/teacher", post(auth::register_teacher))
        .route("/login", post(auth::login));

    // Browsing is public; publishing and editing require a teacher.
    let content_routes = Router::new()
        .route("/{kind}", get(content::list_content))
        .route("/{kind}/facets", get(content::content_facets))
        .route("/{kind}/{id}", get(content::get_content))
        .merge(
            Router::new()
                .route("/{kind}", post(content::create_content))
                .route(
                    "/{kind}/{id}",
                    put(content::update_content).delete(content::delete_content),
                )
                .layer(middleware::from_fn(teacher_middleware))
                .layer(middleware::from_fn_with_state(state.clone(), auth_middleware)),
        );

    let quiz_routes = Router::new()
        .route("/", get(quiz::list_quizzes))
        .route("/facets", get(quiz::quiz_facets))
        .route("/{id}", get(quiz::get_quiz))
        .merge(
            Router::new()
                .route("/", post(quiz::create_quiz))
                .route("/{id}", delete(quiz::delete_quiz))
                .layer(middleware::from_fn(teacher_middleware))
                .layer(middleware::from_fn_with_state(state.clone(), auth_middleware)),
        );

    // Quiz taking and reports are per-user; everything below requires a
    // valid token.
    let attempt_routes = Router::new()
        .route("/", post(attempt::create_attempt))
        .route(
            "/{id}",
            get(attempt::get_attempt).delete(attempt::discard_attempt),
        )
        .route("/{id}/start", post(attempt::start_attempt))
        .route("/{id}/answers", post(attempt::record_answer))
        .route("/{id}/position", post(attempt::navigate))
        .route("/{id}/submit", post(attempt::submit_attempt))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let report_routes = Router::new()
        .route("/results", get(report::list_my_results))
        .route("/summary", get(report::my_summary))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/content", content_routes)
        .nest("/api/quizzes", quiz_routes)
        .nest("/api/attempts", attempt_routes)
        .nest("/api/reports", report_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
