use std::{process, sync::Arc};

use social::{
    application::{
        error::AppError,
        rate_limit::{FixedWindowLimiter, RateLimiter},
    },
    cache::{CacheBackend, CacheBackendKind, CacheConfig, EntityCache, MemoryBackend, RedisBackend},
    config,
    infra::{
        db::PostgresRepositories,
        error::InfraError,
        http::{self, HttpState},
        memory::InMemoryStore,
        telemetry,
    },
};
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Migrate(_) => run_migrate(settings).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let cache = init_cache(&settings).await?;

    let (rate_limiter, sweeper) = if settings.rate_limit.enabled {
        let limiter = Arc::new(FixedWindowLimiter::new(
            settings.rate_limit.max_requests.get(),
            settings.rate_limit.window,
        ));
        let sweeper = FixedWindowLimiter::spawn_sweeper(
            limiter.clone(),
            settings.rate_limit.sweep_interval,
            settings.rate_limit.idle_ttl,
        );
        let limiter: Arc<dyn RateLimiter> = limiter;
        (Some(limiter), Some(sweeper))
    } else {
        (None, None)
    };

    let state = match settings.database.url.as_deref() {
        Some(url) => {
            let repositories = init_repositories(url, &settings).await?;
            HttpState::assemble(
                repositories.clone(),
                cache,
                settings.concurrency.conflict_policy,
                rate_limiter,
                Some(repositories),
            )
        }
        None => {
            warn!("database url is not configured; serving from an in-memory store");
            HttpState::assemble(
                Arc::new(InMemoryStore::new()),
                cache,
                settings.concurrency.conflict_policy,
                rate_limiter,
                None,
            )
        }
    };

    let router = http::build_router(state);
    let result = http::serve(
        settings.server.addr,
        router,
        settings.server.graceful_shutdown,
    )
    .await
    .map_err(AppError::from);

    if let Some(handle) = sweeper {
        handle.abort();
        let _ = handle.await;
    }

    info!("Server stopped");
    result
}

async fn run_migrate(settings: config::Settings) -> Result<(), AppError> {
    let url = settings
        .database
        .url
        .as_deref()
        .ok_or_else(|| InfraError::configuration("database url is not configured"))?;

    let pool = PostgresRepositories::connect(url, settings.database.max_connections.get())
        .await
        .map_err(|err| InfraError::database(err.to_string()))?;
    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| InfraError::database(err.to_string()))?;

    info!("Migrations applied");
    Ok(())
}

async fn init_repositories(
    url: &str,
    settings: &config::Settings,
) -> Result<Arc<PostgresRepositories>, AppError> {
    let pool = PostgresRepositories::connect(url, settings.database.max_connections.get())
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    Ok(Arc::new(
        PostgresRepositories::new(pool).with_query_timeout(settings.database.query_timeout),
    ))
}

async fn init_cache(settings: &config::Settings) -> Result<Option<Arc<EntityCache>>, AppError> {
    let cache_config = CacheConfig::from(&settings.cache);
    if !cache_config.enabled {
        info!("Entity cache disabled");
        return Ok(None);
    }

    let backend: Arc<dyn CacheBackend> = match cache_config.backend {
        CacheBackendKind::Redis => Arc::new(
            RedisBackend::connect(&cache_config.redis_url)
                .await
                .map_err(|err| AppError::from(InfraError::cache(err.to_string())))?,
        ),
        CacheBackendKind::Memory => {
            Arc::new(MemoryBackend::new(cache_config.memory_capacity_non_zero()))
        }
    };

    info!(
        backend = ?cache_config.backend,
        ttl_secs = cache_config.ttl.as_secs(),
        "Entity cache enabled"
    );
    Ok(Some(Arc::new(EntityCache::new(backend, &cache_config))))
}
