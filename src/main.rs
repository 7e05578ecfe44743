use library_circulation::{
    adapters::{
        memory::{
            InMemoryLibrary, LoggingNotificationService, in_memory_dependencies, seed_demo_data,
        },
        postgres::{PostgresLibrary, postgres_dependencies},
    },
    api::{handlers::AppState, router::create_router},
    application::{ServiceDependencies, expire_reservations},
    config::AppConfig,
};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "library_circulation=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;
    let notifications = Arc::new(LoggingNotificationService::new());

    let service_deps = match &config.database_url {
        Some(database_url) => {
            tracing::info!("Using PostgreSQL store");
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(config.db_max_connections)
                .connect(database_url)
                .await?;
            sqlx::migrate!("./migrations").run(&pool).await?;
            postgres_dependencies(Arc::new(PostgresLibrary::new(pool)), notifications)
        }
        None => {
            tracing::warn!("DATABASE_URL is not set; using in-memory store with demo data");
            let library = Arc::new(InMemoryLibrary::new());
            seed_demo_data(&library)?;
            in_memory_dependencies(library, notifications)
        }
    };

    tokio::spawn(run_expiry_sweep(
        service_deps.clone(),
        config.expiry_sweep_interval,
    ));

    // Create application state
    let app_state = Arc::new(AppState { service_deps });

    // Create router
    let app = create_router(app_state);

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);

    // Start server
    axum::serve(listener, app).await?;
    Ok(())
}

/// 取り置き期限切れの予約を定期的に Expired にする
async fn run_expiry_sweep(deps: ServiceDependencies, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        ticker.tick().await;
        if let Err(e) = expire_reservations(&deps, chrono::Utc::now()).await {
            tracing::error!(error = %e, "Reservation expiry sweep failed");
        }
    }
}
