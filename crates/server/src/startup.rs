use std::{net::SocketAddr, sync::Arc};

use dotenvy::dotenv;
use tracing::info;

use configs::AppConfig;
use migration::{Migrator, MigratorTrait};
use service::account::repo::seaorm::SeaOrmAccountRepository;
use service::auth::repo::seaorm::SeaOrmUserRepository;
use service::auth::AuthSettings;

use crate::errors::StartupError;
use crate::routes::build_router;
use crate::state::ServerState;

fn bind_addr(cfg: &AppConfig) -> Result<SocketAddr, StartupError> {
    let raw = format!("{}:{}", cfg.server.host, cfg.server.port);
    raw.parse().map_err(|_| StartupError::BindAddr(raw))
}

/// Build the app from configuration and run the HTTP server.
pub async fn run() -> anyhow::Result<()> {
    dotenv().ok();
    let cfg = AppConfig::load_or_env()?;

    let db = models::db::connect_with_config(&cfg.database).await?;
    if cfg.database.run_migrations {
        Migrator::up(&db, None).await?;
        info!("migrations applied");
    }

    let state = ServerState::new(
        Arc::new(SeaOrmAccountRepository::new(db.clone())),
        Arc::new(SeaOrmUserRepository::new(db)),
        AuthSettings { jwt_secret: cfg.auth.jwt_secret.clone(), token_ttl_hours: cfg.auth.token_ttl_hours },
    );

    if let Some(admin) = &cfg.auth.bootstrap_admin {
        state
            .auth
            .ensure_staff_user(&admin.username, &admin.password, &admin.email)
            .await
            .map_err(StartupError::from)?;
    }

    let app = build_router(state);
    let addr = bind_addr(&cfg)?;
    info!(%addr, "starting crm accounts server");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
