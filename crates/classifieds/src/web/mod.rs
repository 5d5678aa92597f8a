use crate::prelude::{eprintln, *};
use axum::{http::HeaderName, routing::get, Router};
use classifieds_core::locale::{Locale, Messages};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tower_http::services::ServeDir;

use crate::auth::{self, Authenticator, UserStoreAuthenticator, DEFAULT_ADMIN_PASSWORD};
use crate::pipeline::{ListingPipeline, PipelineSettings};
use crate::session::{SessionStore, DEFAULT_MAX_ANONYMOUS_SESSIONS};
use crate::store::sqlite::{SqliteStore, DEFAULT_POOL_SIZE};

mod error;
mod extract;
mod handlers;
mod views;

pub use error::AppError;

const DEFAULT_PORT: u16 = 5000;
const SESSION_PURGE_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, clap::Args)]
pub struct ServeOptions {
    /// Port to listen on
    #[arg(short, long, env = "PORT")]
    pub port: Option<u16>,

    /// Host to bind to. Defaults to 0.0.0.0 when PORT is set, 127.0.0.1 otherwise
    #[arg(long, env = "CLASSIFIEDS_HOST")]
    pub host: Option<String>,

    /// Directory served under /static
    #[arg(long, env = "CLASSIFIEDS_STATIC_DIR", default_value = "static")]
    pub static_dir: PathBuf,

    /// Time limit for dashboard queries, in milliseconds
    #[arg(long, env = "CLASSIFIEDS_QUERY_TIMEOUT_MS", default_value = "10000")]
    pub query_timeout_ms: u64,

    /// Time limit for detail lookups, in milliseconds
    #[arg(long, env = "CLASSIFIEDS_DETAIL_TIMEOUT_MS", default_value = "5000")]
    pub detail_timeout_ms: u64,

    /// Idle session lifetime, in seconds
    #[arg(long, env = "CLASSIFIEDS_SESSION_TTL", default_value = "1800")]
    pub session_ttl: u64,

    /// Sessions without a login kept before the oldest are evicted
    #[arg(long, env = "CLASSIFIEDS_MAX_ANONYMOUS_SESSIONS", default_value_t = DEFAULT_MAX_ANONYMOUS_SESSIONS)]
    pub max_anonymous_sessions: usize,

    /// Language for labels and notices (en, es)
    #[arg(long, env = "CLASSIFIEDS_LOCALE", default_value = "en")]
    pub locale: Locale,

    /// Deployment environment. `development` creates the admin account
    #[arg(long, env = "CLASSIFIEDS_ENV", default_value = "production")]
    pub environment: String,

    /// Password for the development admin account
    #[arg(long, env = "CLASSIFIEDS_ADMIN_PASSWORD", default_value = DEFAULT_ADMIN_PASSWORD, hide_env_values = true)]
    pub admin_password: String,

    /// Header carrying the email asserted by a single sign-on proxy
    #[arg(long, env = "CLASSIFIEDS_SSO_HEADER")]
    pub sso_header: Option<String>,

    /// Number of pooled database connections
    #[arg(long, env = "CLASSIFIEDS_POOL_SIZE", default_value_t = DEFAULT_POOL_SIZE)]
    pub pool_size: usize,
}

impl ServeOptions {
    /// Address to bind, following the PORT convention of hosting platforms
    pub fn address(&self) -> String {
        let host = self.host.clone().unwrap_or_else(|| {
            if self.port.is_some() {
                "0.0.0.0".to_string()
            } else {
                "127.0.0.1".to_string()
            }
        });

        f!("{}:{}", host, self.port.unwrap_or(DEFAULT_PORT))
    }
}

/// Shared request state
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<ListingPipeline>,
    pub sessions: Arc<SessionStore>,
    pub auth: Arc<dyn Authenticator>,
    pub messages: Messages,
    pub static_dir: PathBuf,
    pub sso_header: Option<HeaderName>,
}

pub fn router(state: AppState) -> Router {
    let static_files = ServeDir::new(&state.static_dir);

    Router::new()
        .route("/", get(handlers::index))
        .route("/login", get(handlers::login_page).post(handlers::login_submit))
        .route("/login/sso", get(handlers::login_sso))
        .route("/logout", get(handlers::logout))
        .route("/dashboard", get(handlers::dashboard))
        .route("/detail/{id}", get(handlers::detail))
        .nest_service("/static", static_files)
        .fallback(handlers::not_found)
        .with_state(state)
}

pub async fn run(options: ServeOptions, global: crate::Global) -> Result<()> {
    let database = global.database_path()?;
    let store = Arc::new(
        SqliteStore::open(&database, options.pool_size)
            .map_err(|e| eyre!("Failed to open database {}: {}", database.display(), e))?,
    );
    log::info!("Using database {}", store.path().display());

    if options.environment == "development" {
        let created = auth::ensure_admin(store.as_ref(), &options.admin_password)
            .map_err(|e| eyre!("Failed to create admin account: {e}"))?;
        if created {
            log::info!("Created development account {}", auth::ADMIN_USERNAME);
        }
    }

    let sso_header = options
        .sso_header
        .as_deref()
        .map(HeaderName::try_from)
        .transpose()
        .map_err(|e| eyre!("Invalid SSO header name: {e}"))?;

    let pipeline = ListingPipeline::new(
        store.clone(),
        PipelineSettings {
            query_timeout: Duration::from_millis(options.query_timeout_ms),
            detail_timeout: Duration::from_millis(options.detail_timeout_ms),
            labels: options.locale.labels(),
        },
    );

    let sessions = Arc::new(
        SessionStore::new(Duration::from_secs(options.session_ttl))
            .with_anonymous_limit(options.max_anonymous_sessions),
    );
    spawn_session_purge(sessions.clone());

    let state = AppState {
        pipeline: Arc::new(pipeline),
        sessions,
        auth: Arc::new(UserStoreAuthenticator::new(store)),
        messages: options.locale.messages(),
        static_dir: options.static_dir.clone(),
        sso_header,
    };

    let addr = options.address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| eyre!("Failed to bind to {}: {}", addr, e))?;

    log::info!("Listening on http://{addr}");
    if global.verbose {
        eprintln!("Serving static files from {}", options.static_dir.display());
    }

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| eyre!("Server error: {e}"))?;

    log::info!("Server shut down");
    Ok(())
}

fn spawn_session_purge(sessions: Arc<SessionStore>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SESSION_PURGE_INTERVAL);
        loop {
            interval.tick().await;
            let purged = sessions.purge_expired();
            if purged > 0 {
                log::debug!("Purged {purged} expired sessions");
            }
        }
    });
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            log::error!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
        log::info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                log::info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                log::error!("Failed to install terminate handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
