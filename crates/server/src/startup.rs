use std::{net::SocketAddr, path::PathBuf, sync::Arc, time::Duration};

use axum::Router;
use common::env::ensure_env;
use configs::{AppConfig, PaymentProvider};
use migration::MigratorTrait;
use sea_orm::DatabaseConnection;
use tower_http::cors::CorsLayer;
use tracing::info;

use service::auth::repo::seaorm::SeaOrmAuthRepository;
use service::auth::{AuthConfig, AuthService};
use service::mail::LogMailer;
use service::orders::Checkout;
use service::payment::{HttpGateway, PaymentGateway, TestGateway};

use crate::errors::StartupError;
use crate::rate_limit::RateLimiter;
use crate::routes;

/// Shared handler state.
#[derive(Clone)]
pub struct ServerState {
    pub db: DatabaseConnection,
    pub config: Arc<AppConfig>,
    pub auth: Arc<AuthService<SeaOrmAuthRepository>>,
    pub checkout: Checkout,
    pub images_dir: PathBuf,
    pub limiter: RateLimiter,
}

fn auth_config(cfg: &AppConfig) -> AuthConfig {
    let mut auth = AuthConfig::new(cfg.auth.jwt_secret.clone());
    auth.access_token_ttl = chrono::Duration::minutes(cfg.auth.access_token_minutes);
    auth.refresh_token_ttl = chrono::Duration::days(cfg.auth.refresh_token_days);
    auth.confirmation_ttl_secs = cfg.auth.confirmation_ttl_secs;
    auth.max_active_tokens = cfg.auth.max_active_tokens;
    auth.bootstrap_admin_email = cfg.auth.bootstrap_admin_email.clone();
    auth.public_url = cfg.server.public_url.clone();
    auth
}

fn build_gateway(cfg: &AppConfig) -> Result<Arc<dyn PaymentGateway>, StartupError> {
    let p = &cfg.payment;
    let gateway: Arc<dyn PaymentGateway> = match p.provider {
        PaymentProvider::Test => Arc::new(TestGateway),
        PaymentProvider::Http => Arc::new(
            HttpGateway::new(&p.api_base, &p.api_key, Duration::from_secs(p.timeout_secs))
                .map_err(|e| StartupError::InvalidConfig(format!("payment gateway: {}", e.body)))?,
        ),
    };
    info!(gateway = gateway.name(), currency = %p.currency, test_mode = p.allow_test_mode, "payment gateway ready");
    Ok(gateway)
}

/// Assemble handler state from validated config and an open connection.
pub fn build_state(cfg: AppConfig, db: DatabaseConnection) -> Result<ServerState, StartupError> {
    let mailer = Arc::new(LogMailer::new(cfg.mail.sender.clone(), cfg.mail.enabled));
    let repo = Arc::new(SeaOrmAuthRepository { db: db.clone() });
    let auth = Arc::new(AuthService::new(repo, mailer, auth_config(&cfg)));
    let checkout = Checkout::new(build_gateway(&cfg)?, cfg.payment.currency.clone(), cfg.payment.allow_test_mode);
    let limiter = RateLimiter::from_config(&cfg.rate_limit);
    Ok(ServerState {
        db,
        images_dir: PathBuf::from(&cfg.server.images_dir),
        config: Arc::new(cfg),
        auth,
        checkout,
        limiter,
    })
}

fn build_cors() -> CorsLayer {
    CorsLayer::very_permissive()
}

/// Router with state, CORS and tracing layers applied.
pub fn build_app(state: ServerState) -> Router {
    routes::build_router(state, build_cors())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl+c");
    }
    info!("shutdown signal received");
}

/// Public entry: prepare the database and run the HTTP server until Ctrl+C.
/// Logging is expected to be initialized by the caller.
pub async fn run(cfg: AppConfig) -> anyhow::Result<()> {
    ensure_env(&cfg.server.images_dir).await?;

    let db = models::db::connect_with_config(&cfg.database).await?;
    migration::Migrator::up(&db, None).await?;
    service::roles::ensure_default_roles(&db).await?;

    let addr: SocketAddr = format!("{}:{}", cfg.server.host, cfg.server.port)
        .parse()
        .map_err(|e| StartupError::InvalidConfig(format!("bind address: {e}")))?;

    let state = build_state(cfg, db)?;
    state.limiter.spawn_sweeper(Duration::from_secs(600));
    let app = build_app(state);

    info!(%addr, "starting storefront server");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("server stopped");
    Ok(())
}
