// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, post, put},
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    handlers::{answer_sheet, questions, quizzes},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware},
};

/// Assembles the main application router.
///
/// * Public quiz routes are reached through an access token only.
/// * Member routes need a valid JWT; admin routes also need the admin role.
/// * Applies global middleware (Trace, CORS).
pub fn create_router(state: AppState) -> Router {
    let origins: Vec<HeaderValue> = [
        state.config.base_url.trim_end_matches('/'),
        "http://127.0.0.1:3000",
    ]
    .into_iter()
    .filter_map(|origin| origin.parse().ok())
    .collect();

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let quiz_routes = Router::new()
        .route("/", get(answer_sheet::open_sheet))
        .route("/submit", post(answer_sheet::submit_answers));

    let member_routes = Router::new()
        .route("/sheets", get(answer_sheet::list_my_sheets))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let admin_routes = Router::new()
        .route(
            "/questions",
            get(questions::list_questions).post(questions::create_question),
        )
        .route("/questions/count", get(questions::count_questions))
        .route("/questions/import", post(questions::import_questions))
        .route(
            "/questions/{id}",
            put(questions::update_question).delete(questions::delete_question),
        )
        .route(
            "/quizzes",
            get(quizzes::list_quizzes).post(quizzes::create_quiz),
        )
        .route(
            "/quizzes/{id}",
            get(quizzes::get_quiz).delete(quizzes::delete_quiz),
        )
        .route("/quizzes/{id}/sheets", get(quizzes::list_answer_sheets))
        .route("/quizzes/{id}/stats", get(quizzes::quiz_stats))
        .route("/quizzes/{id}/link", get(quizzes::issue_link))
        // Auth first, then Admin check
        .layer(middleware::from_fn(admin_middleware))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .nest("/api/quiz", quiz_routes)
        .nest("/api", member_routes)
        .nest("/api/admin", admin_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
