// src/routes.rs

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    middleware,
    routing::{delete, get, post, put},
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::{
    handlers::{auth, documents, health, lookup, manage, papers, uploads, users, wizard},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware, staff_middleware},
};

/// Largest accepted image upload.
const UPLOAD_LIMIT_BYTES: usize = 10 * 1024 * 1024;

/// Assembles the main application router.
///
/// * Public: login and health.
/// * Staff: wizard, papers, documents, lookups, uploads and management.
/// * Admin: user accounts.
/// * Uploaded media is served read-only under `/media`.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin([
            HeaderValue::from_static("http://localhost:3000"),
            HeaderValue::from_static("http://127.0.0.1:3000"),
        ])
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    let public_routes = Router::new()
        .route("/auth/login", post(auth::login))
        .route("/health", get(health::health_check));

    let wizard_routes = Router::new()
        .route("/", post(wizard::start))
        .route("/{token}", get(wizard::get_wizard))
        .route("/{token}/heading", post(wizard::submit_heading))
        .route("/{token}/sections/{part}/counts", post(wizard::submit_counts))
        .route("/{token}/sections/{part}/questions", post(wizard::submit_questions));

    let paper_routes = Router::new()
        .route("/", get(papers::list_papers))
        .route("/{id}", delete(papers::delete_paper))
        .route("/{id}/resume", post(papers::resume))
        .route("/{id}/review", get(papers::review))
        .route("/{id}/heading", put(papers::update_heading))
        .route(
            "/{id}/sections/{part}",
            get(papers::get_section).put(papers::update_section),
        )
        .route("/{id}/downloads", get(papers::downloads))
        .route("/{id}/blueprint", get(papers::get_blueprint))
        .route("/{id}/pdf/{kind}", get(documents::download));

    let lookup_routes = Router::new()
        .route("/parent-questions/{part}/{paper_id}", get(lookup::parent_questions))
        .route("/subject-details", get(lookup::subject_details));

    let user_routes = Router::new()
        .route("/", get(users::list_users).post(users::create_user))
        .route("/{id}", delete(users::delete_user))
        // Runs inside the staff gate below, so claims are already present
        .layer(middleware::from_fn(admin_middleware));

    let manage_routes = Router::new()
        .route("/dashboard", get(manage::dashboard))
        .route(
            "/revisions",
            get(manage::list_revisions).post(manage::create_revision),
        )
        .route(
            "/revisions/{id}",
            put(manage::update_revision).delete(manage::delete_revision),
        )
        .route(
            "/exam-names",
            get(manage::list_exam_names).post(manage::create_exam_name),
        )
        .route(
            "/exam-names/{id}",
            put(manage::update_exam_name).delete(manage::delete_exam_name),
        )
        .route(
            "/subject-codes",
            get(manage::list_subject_codes).post(manage::create_subject_code),
        )
        .route(
            "/subject-codes/{id}",
            put(manage::update_subject_code).delete(manage::delete_subject_code),
        )
        .route("/modules", get(manage::list_modules).post(manage::create_module))
        .route(
            "/modules/{id}",
            put(manage::update_module).delete(manage::delete_module),
        )
        .route("/outcomes", get(manage::list_outcomes).post(manage::create_outcome))
        .route(
            "/outcomes/{id}",
            put(manage::update_outcome).delete(manage::delete_outcome),
        )
        .route(
            "/instructions",
            get(manage::list_instructions).post(manage::create_instruction),
        )
        .route(
            "/instructions/{id}",
            put(manage::update_instruction).delete(manage::delete_instruction),
        )
        .route(
            "/system-config",
            get(manage::get_system_config).put(manage::update_system_config),
        )
        .nest("/users", user_routes);

    let upload_routes = Router::new()
        .route("/", post(uploads::upload_image))
        .layer(DefaultBodyLimit::max(UPLOAD_LIMIT_BYTES));

    // Double middleware protection: Auth first, then Staff check
    let protected_routes = Router::new()
        .nest("/wizard", wizard_routes)
        .nest("/papers", paper_routes)
        .nest("/lookup", lookup_routes)
        .nest("/uploads", upload_routes)
        .nest("/manage", manage_routes)
        .layer(middleware::from_fn(staff_middleware))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .nest("/api", public_routes.merge(protected_routes))
        .nest_service("/media", ServeDir::new(&state.config.media_root))
        // Global Middleware (applied from top to bottom)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
