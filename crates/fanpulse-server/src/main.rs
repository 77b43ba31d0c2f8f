mod api;
mod live;
mod middleware;
mod scheduler;
#[cfg(test)]
mod test_support;

use std::{sync::Arc, time::Duration};

use fanpulse_analytics::{IngestPipeline, IngestionGate, PgRecordStore, RecordStore, TrendBucketer};
use fanpulse_sentiment::{EntityAttributor, RedditClient, SentimentResolver};
use tracing_subscriber::EnvFilter;

use crate::{
    api::{build_app, default_rate_limit_state, AppState},
    live::{LiveDefaults, LivePoller},
    middleware::AuthState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = fanpulse_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let teams = Arc::new(fanpulse_core::load_teams(&config.teams_path)?);
    tracing::info!(
        teams = teams.teams.len(),
        path = %config.teams_path.display(),
        "loaded team table"
    );

    let pool_config = fanpulse_db::PoolConfig::from_app_config(&config);
    let pool = fanpulse_db::connect_pool(&config.database_url, pool_config).await?;
    fanpulse_db::run_migrations(&pool).await?;

    let store: Arc<dyn RecordStore> = Arc::new(PgRecordStore::new(
        pool,
        Duration::from_secs(config.store_timeout_secs),
    ));

    let resolver = Arc::new(SentimentResolver::from_config(&config)?);
    let pipeline = Arc::new(IngestPipeline::new(
        Arc::new(EntityAttributor::new(&teams.teams)),
        resolver,
        IngestionGate::new(Arc::clone(&store)),
        config.store_unassigned,
    ));

    let reddit = RedditClient::new(
        config.reddit_user_agent.clone(),
        Duration::from_secs(config.backend_timeout_secs),
    )?;
    let live = LivePoller::new(
        Arc::clone(&pipeline),
        Arc::new(reddit),
        LiveDefaults::from_config(&config, &teams.teams),
    );

    let _scheduler = scheduler::build_scheduler(Arc::clone(&store)).await?;

    let auth = AuthState::from_env(matches!(
        config.env,
        fanpulse_core::Environment::Development
    ))?;
    let state = AppState {
        bucketer: TrendBucketer::new(Arc::clone(&store)),
        store,
        pipeline,
        teams,
        live: live.clone(),
    };
    let app = build_app(state, auth, default_rate_limit_state());

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, env = %config.env, "fanpulse-server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    live.stop().await;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
