use std::time::Duration;

use chrono::Utc;
use migration::{Migrator, MigratorTrait};
use settings::Database;

mod settings;

const INVITATION_SWEEP_INTERVAL: Duration = Duration::from_secs(3600);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let settings = settings::Settings::new()?;
    let mut tasks = tokio::task::JoinSet::new();

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "chaipaani={level},server={level},engine={level}",
            level = settings.app.level
        ))
        .init();

    if let Some(server) = settings.server {
        let settings::Server {
            bind,
            port,
            database,
            mail_relay_url,
            invitation_ttl_days,
        } = server;

        let db = match parse_database(&database).await {
            Ok(db) => db,
            Err(err) => {
                tracing::error!("failed to initialize database: {err}");
                return Err(err);
            }
        };

        // The expiry sweep keeps its own engine handle over the shared
        // connection; it only touches invitations.
        let sweep_engine = build_engine(db.clone(), invitation_ttl_days).await?;
        tasks.spawn(async move {
            let mut interval = tokio::time::interval(INVITATION_SWEEP_INTERVAL);
            loop {
                interval.tick().await;
                match sweep_engine.expire_stale_invitations(Utc::now()).await {
                    Ok(0) => {}
                    Ok(expired) => tracing::info!("expired {expired} stale invitations"),
                    Err(err) => tracing::error!("invitation sweep failed: {err}"),
                }
            }
        });

        let engine = build_engine(db, invitation_ttl_days).await?;
        let mailer = match mail_relay_url {
            Some(url) => server::Mailer::relay(url),
            None => server::Mailer::noop(),
        };
        tasks.spawn(async move {
            let bind = bind.unwrap_or_else(|| "127.0.0.1".to_string());
            let addr = format!("{}:{}", bind, port);
            let listener = match tokio::net::TcpListener::bind(addr).await {
                Ok(listener) => listener,
                Err(err) => {
                    tracing::error!("failed to bind server listener: {err}");
                    return;
                }
            };
            if let Err(err) = server::run_with_listener(engine, mailer, listener).await {
                tracing::error!("server failed: {err}");
            }
        });
    }

    while tasks.join_next().await.is_some() {
        tasks.shutdown().await;
    }

    Ok(())
}

async fn build_engine(
    db: sea_orm::DatabaseConnection,
    invitation_ttl_days: Option<i64>,
) -> Result<engine::Engine, Box<dyn std::error::Error + Send + Sync>> {
    let mut builder = engine::Engine::builder().database(db);
    if let Some(days) = invitation_ttl_days {
        builder = builder.invitation_ttl(chrono::Duration::days(days));
    }
    Ok(builder.build().await?)
}

async fn parse_database(
    config: &settings::Database,
) -> Result<sea_orm::DatabaseConnection, Box<dyn std::error::Error + Send + Sync>> {
    let url = match config {
        Database::Memory => String::from("sqlite::memory:"),
        Database::Sqlite(path) => format!("sqlite:{}?mode=rwc", path),
    };

    let database = sea_orm::Database::connect(url).await?;
    Migrator::up(&database, None).await?;
    Ok(database)
}
