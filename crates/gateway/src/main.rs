//! Rollcall API Gateway
//!
//! The entry point for all external API requests.
//! Handles:
//! - Authentication and role-based authorization
//! - Admin, teacher, and student endpoints
//! - The session/attendance verification workflow
//! - Observability (logging, metrics, tracing)

mod handlers;

use axum::{
    extract::FromRef,
    routing::{delete, get, post, put},
    Router,
};
use rollcall_common::{
    auth::JwtManager,
    config::AppConfig,
    db::{bootstrap, DbPool},
    face::{self, FaceEngine},
    metrics,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{info, warn, Level};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: DbPool,
    pub jwt: Arc<JwtManager>,
    pub faces: Arc<dyn FaceEngine>,
}

impl FromRef<AppState> for Arc<JwtManager> {
    fn from_ref(state: &AppState) -> Self {
        state.jwt.clone()
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .with_target(true)
        .json()
        .init();

    info!("Starting Rollcall API Gateway v{}", rollcall_common::VERSION);

    // Load configuration
    let config = AppConfig::load().map_err(|e| {
        tracing::error!(error = %e, "Failed to load configuration");
        e
    })?;

    if config.auth.jwt_secret == "change-me-in-production" {
        warn!("Using the default JWT secret; set APP__AUTH__JWT_SECRET");
    }

    let config = Arc::new(config);

    // Initialize metrics
    metrics::register_metrics();

    // Initialize database connection and schema
    info!("Connecting to database...");
    let db = DbPool::new(&config.database).await?;
    bootstrap::initialize(&db, &config.auth).await?;

    // Token manager and face engine
    let jwt = Arc::new(JwtManager::new(
        &config.auth.jwt_secret,
        config.auth.token_ttl_secs,
    ));
    let faces = face::create_face_engine(&config.face);

    // Create app state
    let state = AppState {
        config: config.clone(),
        db,
        jwt,
        faces,
    };

    // Build the router
    let app = create_router(state);

    // Start the server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Create the main application router
fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    // API routes
    let api_routes = Router::new()
        // Login (no token required)
        .route("/login", post(handlers::auth::login))
        // Admin endpoints
        .route("/admin/stats", get(handlers::admin::stats))
        .route(
            "/admin/classes",
            get(handlers::admin::list_classes).post(handlers::admin::create_class),
        )
        .route(
            "/admin/classes/{id}",
            put(handlers::admin::update_class).delete(handlers::admin::delete_class),
        )
        .route(
            "/admin/classes/{id}/subjects",
            get(handlers::admin::list_subjects).post(handlers::admin::create_subject),
        )
        .route("/admin/subjects/{id}", delete(handlers::admin::delete_subject))
        .route(
            "/admin/classes/{id}/teachers",
            get(handlers::admin::list_teachers).post(handlers::admin::create_teacher),
        )
        .route(
            "/admin/teachers/{id}",
            put(handlers::admin::update_teacher).delete(handlers::admin::delete_teacher),
        )
        .route(
            "/admin/teachers/{id}/class/{class_id}/subjects",
            get(handlers::admin::teacher_class_subjects),
        )
        .route(
            "/admin/classes/{id}/students",
            get(handlers::admin::list_students).post(handlers::admin::create_student),
        )
        .route(
            "/admin/students/{id}",
            put(handlers::admin::update_student).delete(handlers::admin::delete_student),
        )
        // Teacher endpoints
        .route("/teacher/profile", get(handlers::teacher::profile))
        .route(
            "/teacher/classes-subjects",
            get(handlers::teacher::classes_subjects),
        )
        .route("/teacher/start-session", post(handlers::teacher::start_session))
        .route(
            "/teacher/session/{id}/attendance",
            get(handlers::teacher::session_attendance),
        )
        .route("/teacher/session/{id}/end", post(handlers::teacher::end_session))
        .route("/teacher/report", get(handlers::teacher::report))
        // Student endpoints
        .route("/student/profile", get(handlers::student::profile))
        .route("/student/register-face", post(handlers::student::register_face))
        .route("/student/verify-code", post(handlers::student::verify_code))
        .route(
            "/student/mark-attendance",
            post(handlers::student::mark_attendance),
        )
        .route(
            "/student/attendance-report",
            get(handlers::student::attendance_report),
        );

    // Compose the app
    Router::new()
        // Health endpoints (no auth)
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(request_id)
        .layer(propagate_id)
        .with_state(state)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}
