//! inkpost server entry point.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use inkpost_api::AppState;
use inkpost_common::{Config, config::LogFormat};
use inkpost_core::{
    AdminService, AnalyticsService, AuthService, BlogService, CategoryService, CommentService,
    ReconcileService, SearchService, TagService, TokenIdentityResolver,
};
use inkpost_db::repositories::{
    AnalyticsRepository, BlogRepository, CategoryRepository, CommentRepository,
    ReconcileRepository, TagRepository, UserRepository,
};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_LOG_FILTER: &str = "inkpost=info,tower_http=info";

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
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

/// Install the global subscriber. `RUST_LOG` wins over the configured filter.
fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(
            config
                .log
                .filter
                .as_deref()
                .unwrap_or(DEFAULT_LOG_FILTER),
        )
    });

    let fmt_layer = match config.log.format {
        LogFormat::Json => tracing_subscriber::fmt::layer().json().boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer().boxed(),
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(filter)
        .init();
}

/// Run the counter repair pass every `interval`, skipping the immediate first tick.
fn spawn_reconcile_job(service: ReconcileService, interval: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await;

        loop {
            ticker.tick().await;
            if let Err(e) = service.run().await {
                error!(error = %e, "Scheduled reconciliation failed");
            }
        }
    });
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("failed to load configuration")?;
    init_tracing(&config);

    info!("Starting inkpost server...");

    let db = Arc::new(
        inkpost_db::init(&config)
            .await
            .context("failed to connect to database")?,
    );
    info!("Connected to database");

    info!("Running database migrations...");
    inkpost_db::migrate(&db).await?;
    info!("Migrations completed");

    // Initialize repositories
    let user_repo = UserRepository::new(Arc::clone(&db));
    let blog_repo = BlogRepository::new(Arc::clone(&db));
    let category_repo = CategoryRepository::new(Arc::clone(&db));
    let tag_repo = TagRepository::new(Arc::clone(&db));
    let comment_repo = CommentRepository::new(Arc::clone(&db));
    let analytics_repo = AnalyticsRepository::new(Arc::clone(&db));
    let reconcile_repo = ReconcileRepository::new(Arc::clone(&db));

    // Initialize services
    let blog_service = BlogService::new(
        blog_repo.clone(),
        user_repo.clone(),
        category_repo.clone(),
        tag_repo.clone(),
        comment_repo.clone(),
    );
    let analytics_service = AnalyticsService::new(
        analytics_repo.clone(),
        user_repo.clone(),
        category_repo.clone(),
        tag_repo.clone(),
        comment_repo.clone(),
    );
    let reconcile_service = ReconcileService::new(reconcile_repo);
    let admin_service = AdminService::new(
        analytics_repo,
        user_repo.clone(),
        category_repo.clone(),
        blog_service.clone(),
        analytics_service,
        reconcile_service.clone(),
    );

    if config.reconcile.interval_secs > 0 {
        spawn_reconcile_job(
            reconcile_service,
            Duration::from_secs(config.reconcile.interval_secs),
        );
        info!(
            interval_secs = config.reconcile.interval_secs,
            "Scheduled counter reconciliation"
        );
    }

    let state = AppState {
        auth_service: AuthService::new(user_repo.clone()),
        comment_service: CommentService::new(comment_repo, blog_repo.clone(), user_repo.clone()),
        category_service: CategoryService::new(category_repo),
        tag_service: TagService::new(tag_repo),
        search_service: SearchService::new(blog_repo, blog_service.clone()),
        blog_service,
        admin_service,
        identity: Arc::new(TokenIdentityResolver::new(user_repo)),
    };

    let app = inkpost_api::app(state);

    // Start server with graceful shutdown
    let host: std::net::IpAddr = config
        .server
        .host
        .parse()
        .with_context(|| format!("invalid server host: {}", config.server.host))?;
    let addr = SocketAddr::new(host, config.server.port);
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}
