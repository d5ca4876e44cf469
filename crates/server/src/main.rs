//! Photoboard server entry point.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{Router, middleware};
use photoboard_api::{middleware::AppState, router as api_router};
use photoboard_common::{Config, LocalStorage, StorageBackend};
use photoboard_core::{
    AuthorizationService, BrowseService, CommentService, MailService, PhotoService,
    ProfileService, ReactionService, RoleService, TagService, UserService,
};
use photoboard_db::repositories::{
    CommentRepository, PhotoRepository, ReactionRepository, RoleRepository, TagRepository,
    UserProfileRepository, UserRepository,
};
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Waits for a shutdown signal (SIGINT or SIGTERM).
///
/// On Unix systems, this listens for both SIGINT (Ctrl+C) and SIGTERM.
/// On Windows, this only listens for Ctrl+C.
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
        () = ctrl_c => {
            info!("Received SIGINT, initiating graceful shutdown...");
        },
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "photoboard=debug,tower_http=debug".into()),
        )
        .init();

    info!("Starting photoboard server...");

    // Load configuration
    let config = Config::load()?;

    // Connect to database and run migrations
    let db = photoboard_db::init(&config).await?;
    info!("Connected to database");

    info!("Running database migrations...");
    photoboard_db::migrate(&db).await?;
    info!("Migrations completed");

    // File storage
    let storage: Arc<dyn StorageBackend> = Arc::new(LocalStorage::new(
        PathBuf::from(&config.storage.base_path),
        config.storage.base_url.clone(),
    ));

    // Outgoing mail
    let mail = MailService::from_config(&config.mail)?;

    // Initialize repositories
    let db = Arc::new(db);
    let user_repo = UserRepository::new(Arc::clone(&db));
    let profile_repo = UserProfileRepository::new(Arc::clone(&db));
    let photo_repo = PhotoRepository::new(Arc::clone(&db));
    let tag_repo = TagRepository::new(Arc::clone(&db));
    let comment_repo = CommentRepository::new(Arc::clone(&db));
    let reaction_repo = ReactionRepository::new(Arc::clone(&db));
    let role_repo = RoleRepository::new(Arc::clone(&db));

    // Initialize services
    let authorization_service = AuthorizationService::new(role_repo.clone());
    let role_service = RoleService::new(role_repo);
    let profile_service = ProfileService::new(
        profile_repo,
        user_repo.clone(),
        authorization_service.clone(),
        Arc::clone(&storage),
        config.uploads.max_avatar_size,
    );
    let user_service = UserService::new(user_repo, profile_service.clone(), mail);
    let tag_service = TagService::new(tag_repo.clone());
    let photo_service = PhotoService::new(
        photo_repo.clone(),
        tag_service.clone(),
        authorization_service.clone(),
        Arc::clone(&storage),
        config.uploads.max_photo_size,
        config.uploads.quota,
    );
    let browse_service = BrowseService::new(photo_repo.clone(), tag_repo);
    let comment_service = CommentService::new(
        comment_repo,
        photo_repo.clone(),
        authorization_service.clone(),
        config.uploads.comment_denylist.clone(),
    );
    let reaction_service = ReactionService::new(reaction_repo, photo_repo);

    // Seed roles and permission codes (idempotent)
    role_service.seed_defaults().await?;

    let state = AppState {
        user_service,
        profile_service,
        authorization_service,
        role_service,
        photo_service,
        browse_service,
        tag_service,
        comment_service,
        reaction_service,
    };

    // Build the router
    let app = Router::new()
        .nest("/api", api_router())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            photoboard_api::middleware::auth_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state);

    // Serve
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!(%addr, "Listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}
