//! HTTP surface: `/v1` routes over the post and user services.

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod state;

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    middleware as axum_middleware,
    routing::{get, post, put},
};
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tracing::{info, warn};

use crate::infra::error::InfraError;

pub use state::{HealthState, HttpState};

pub fn build_router(state: HttpState) -> Router {
    let v1 = Router::new()
        .route("/health", get(handlers::health))
        .route("/posts", post(handlers::create_post))
        .route(
            "/posts/{id}",
            get(handlers::get_post)
                .patch(handlers::update_post)
                .delete(handlers::delete_post),
        )
        .route(
            "/posts/{id}/comments",
            get(handlers::list_comments).post(handlers::create_comment),
        )
        .route("/users/{id}", get(handlers::get_user))
        .route("/users/{id}/follow", put(handlers::follow_user))
        .route("/users/{id}/unfollow", put(handlers::unfollow_user))
        .route("/users/{id}/feed", get(handlers::user_feed))
        .route("/users/activate/{token}", put(handlers::activate_user))
        .route("/authentication/user", post(handlers::register_user));

    let mut router = Router::new().nest("/v1", v1).with_state(state.clone());

    if let Some(limiter) = state.rate_limiter {
        router = router.layer(axum_middleware::from_fn_with_state(
            limiter,
            middleware::rate_limit,
        ));
    }

    router
        .layer(axum_middleware::from_fn(middleware::log_responses))
        .layer(axum_middleware::from_fn(middleware::set_request_context))
}

/// Serve until SIGINT/SIGTERM, then drain in-flight requests for at most
/// `grace` before giving up.
pub async fn serve(addr: SocketAddr, router: Router, grace: Duration) -> Result<(), InfraError> {
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "Listening");

    let shutdown = Arc::new(Notify::new());
    let server = {
        let shutdown = shutdown.clone();
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move { shutdown.notified().await })
        .into_future()
    };
    tokio::pin!(server);

    tokio::select! {
        result = &mut server => return result.map_err(InfraError::from),
        _ = wait_for_shutdown_signal() => {}
    }

    shutdown.notify_one();
    match tokio::time::timeout(grace, server).await {
        Ok(result) => result.map_err(InfraError::from),
        Err(_) => {
            warn!(grace_ms = grace.as_millis() as u64, "Graceful shutdown timed out");
            Ok(())
        }
    }
}

async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match (
            signal(SignalKind::terminate()),
            signal(SignalKind::interrupt()),
        ) {
            (Ok(mut term), Ok(mut int)) => {
                tokio::select! {
                    _ = term.recv() => {}
                    _ = int.recv() => {}
                }
            }
            _ => {
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }

    info!("Shutdown signal received");
}
