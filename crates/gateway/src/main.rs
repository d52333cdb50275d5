//! LearnTrack API Gateway
//!
//! The main entry point for all external API requests.
//! Handles:
//! - Authentication and authorization
//! - Rate limiting
//! - Request routing
//! - Observability (logging, metrics, tracing)

mod handlers;
mod middleware;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
    Router,
};
use learntrack_common::{
    auth::JwtManager,
    config::AppConfig,
    db::DbPool,
    errors::AppError,
    metrics,
    storage::LocalFileStore,
};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{info, Level};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: DbPool,
    pub jwt: Arc<JwtManager>,
    pub files: Arc<LocalFileStore>,
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

    info!("Starting LearnTrack API Gateway v{}", learntrack_common::VERSION);

    // Load configuration
    let config = AppConfig::load().map_err(|e| {
        tracing::error!(error = %e, "Failed to load configuration");
        e
    })?;

    let config = Arc::new(config);

    // Initialize metrics
    if config.observability.metrics_port > 0 {
        let metrics_addr = SocketAddr::from(([0, 0, 0, 0], config.observability.metrics_port));
        PrometheusBuilder::new()
            .with_http_listener(metrics_addr)
            .install()?;
        info!("Metrics exporter listening on {}", metrics_addr);
    }
    metrics::register_metrics();

    // Initialize database connection
    info!("Connecting to database...");
    let db = DbPool::new(&config.database).await?;
    db.run_migrations().await?;

    // JWT manager
    let jwt_secret = config
        .auth
        .jwt_secret
        .clone()
        .ok_or_else(|| AppError::Configuration {
            message: "auth.jwt_secret must be set".to_string(),
        })?;
    let jwt = Arc::new(JwtManager::new(&jwt_secret, config.auth.jwt_expiration_secs));

    // File store
    let files = Arc::new(LocalFileStore::new(&config.uploads));
    files.ensure_dir().await?;

    // Create app state
    let state = AppState {
        config: config.clone(),
        db,
        jwt,
        files,
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

    // Rate limiter shared across requests
    let limiter = middleware::rate_limit::create_rate_limiter(
        state.config.rate_limit.requests_per_second,
        state.config.rate_limit.burst,
    );
    let rate_limiting = state.config.rate_limit.enabled;

    // Uploads carry the multipart framing on top of the payload cap
    let upload_body_limit = state.config.uploads.max_bytes + 1024 * 1024;

    // Routes reachable without a token
    let public_routes = Router::new()
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
        .route("/auth/register", post(handlers::auth::register))
        .route("/auth/login", post(handlers::auth::login))
        .route("/courses", get(handlers::courses::list_courses));

    // Routes behind bearer authentication
    let protected_routes = Router::new()
        // Classes and enrollment
        .route(
            "/classes",
            post(handlers::classes::create_class).get(handlers::classes::list_classes),
        )
        .route(
            "/classes/{id}/enrollments",
            post(handlers::classes::enroll_student),
        )
        // Assignments and submissions
        .route(
            "/assignments",
            post(handlers::assignments::create_assignment)
                .get(handlers::assignments::list_assignments),
        )
        .route(
            "/assignments/{id}/submissions",
            post(handlers::assignments::submit_assignment)
                .get(handlers::assignments::list_submissions),
        )
        .route(
            "/submissions/{id}/grade",
            post(handlers::assignments::grade_submission),
        )
        .route("/performance", get(handlers::assignments::performance))
        // Notifications
        .route(
            "/notifications",
            get(handlers::notifications::list_notifications),
        )
        .route(
            "/notifications/{id}/read",
            post(handlers::notifications::mark_read),
        )
        // Messaging
        .route("/messages", post(handlers::messages::send_message))
        .route("/messages/partners", get(handlers::messages::chat_partners))
        .route("/messages/{user_id}", get(handlers::messages::conversation))
        .route(
            "/messages/{user_id}/read",
            post(handlers::messages::mark_read),
        )
        // Files
        .route(
            "/files",
            post(handlers::files::upload).layer(DefaultBodyLimit::max(upload_body_limit)),
        )
        .route("/files/{reference}", get(handlers::files::download))
        // Admin
        .route("/admin/users", get(handlers::admin::list_users))
        .route("/admin/users/{id}", delete(handlers::admin::delete_user))
        .route("/admin/courses", post(handlers::admin::create_course))
        .route(
            "/admin/courses/{id}",
            put(handlers::admin::rename_course).delete(handlers::admin::delete_course),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_auth,
        ));

    let api_routes = public_routes.merge(protected_routes);

    // Compose the app
    let mut app = Router::new()
        .nest("/v1", api_routes)
        .layer(TimeoutLayer::new(state.config.request_timeout()))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(request_id)
        .layer(propagate_id);

    if rate_limiting {
        app = app.layer(axum::middleware::from_fn(
            move |request: axum::extract::Request, next: axum::middleware::Next| {
                let limiter = limiter.clone();
                async move {
                    middleware::rate_limit::rate_limit_middleware(request, next, limiter).await
                }
            },
        ));
    }

    app.with_state(state)
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
