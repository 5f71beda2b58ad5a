//! `NoteShare` Server
//!
//! HTTP backend for OTP signup, note uploads, counters and purchases.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{info, warn};

use noteshare_core::config::{self, Config};
use noteshare_core::tracing_init::init_tracing;
use noteshare_server::auth::JwtManager;
use noteshare_server::blob::DiskBlobStore;
use noteshare_server::delivery::{
    EmailSender, HttpMailSender, LogSender, OtpDispatcher, SmsSender, TwilioSmsSender,
};
use noteshare_server::http::{AppState, Components, build_router};
use noteshare_server::presence::InMemoryPresence;
use noteshare_server::service::{PurchaseService, ServiceError};
use noteshare_server::storage::NoteshareDatabase;
use noteshare_server::sweep::spawn_pending_sweep;

const DEV_JWT_SECRET: &str = "dev-secret-change-me";

#[derive(Parser, Debug)]
#[command(name = "noteshare-server")]
#[command(version, about = "NoteShare server - notes marketplace HTTP backend")]
struct Args {
    /// Address to listen on.
    #[arg(long)]
    addr: Option<SocketAddr>,

    /// Path to SQLite database file.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// JWT secret key.
    #[arg(long, env = "NOTESHARE_JWT_SECRET", hide_env_values = true)]
    jwt_secret: Option<String>,

    /// Login token TTL in seconds.
    #[arg(long)]
    token_ttl: Option<i64>,

    /// Directory uploaded files are written to and served from.
    #[arg(long)]
    uploads_dir: Option<PathBuf>,

    /// Project directory holding `.noteshare/settings.json`.
    #[arg(long)]
    project_dir: Option<PathBuf>,

    /// Username granted the platform role that receives purchase commission.
    #[arg(long, env = "NOTESHARE_ADMIN_USERNAME")]
    admin_username: Option<String>,

    /// Output logs as JSON (for structured log aggregation).
    #[arg(long)]
    log_json: bool,
}

impl Args {
    fn apply(self, config: &mut Config) {
        if let Some(addr) = self.addr {
            config.server.addr = addr;
        }
        if let Some(path) = self.db_path {
            config.server.database_path = Some(path);
        }
        if let Some(secret) = self.jwt_secret {
            config.auth.jwt_secret = Some(secret);
        }
        if let Some(ttl) = self.token_ttl {
            config.auth.token_ttl_secs = ttl;
        }
        if let Some(dir) = self.uploads_dir {
            config.server.uploads_dir = dir;
        }
        if self.log_json {
            config.server.log_json = true;
        }
    }
}

fn build_senders(config: &Config) -> (Arc<dyn EmailSender>, Arc<dyn SmsSender>) {
    let http = reqwest::Client::new();
    let d = &config.delivery;
    info!(
        mail = d.mail_configured(),
        sms = d.sms_configured(),
        "Delivery providers resolved"
    );

    let email: Arc<dyn EmailSender> = match (&d.mail_api_url, &d.mail_api_key, &d.mail_from) {
        (Some(url), Some(key), Some(from)) => {
            Arc::new(HttpMailSender::new(http.clone(), url, key, from))
        }
        _ => {
            warn!("Mail provider not configured; codes will only be logged");
            Arc::new(LogSender)
        }
    };

    let sms: Arc<dyn SmsSender> =
        match (&d.twilio_account_sid, &d.twilio_auth_token, &d.twilio_from) {
            (Some(sid), Some(token), Some(from)) => {
                Arc::new(TwilioSmsSender::new(http, sid, token, from))
            }
            _ => {
                warn!("Twilio not configured; SMS codes will only be logged");
                Arc::new(LogSender)
            }
        };

    (email, sms)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let project_dir = args.project_dir.clone();
    let admin_username = args.admin_username.clone();
    let mut config = config::load_config(project_dir.as_deref())?;
    args.apply(&mut config);

    init_tracing(&config.server.log_filter, config.server.log_json)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        addr = %config.server.addr,
        "Starting noteshare-server"
    );

    let db_path = match config.server.database_path.clone() {
        Some(path) => path,
        None => config::default_database_path()
            .ok_or_else(|| anyhow::anyhow!("Cannot determine config directory"))?,
    };
    info!(path = %db_path.display(), "Opening database");
    let db = NoteshareDatabase::open(&db_path).await?;

    if let Some(username) = admin_username {
        match PurchaseService::new(db.clone())
            .grant_platform_role(&username)
            .await
        {
            Ok(_) => info!(%username, "Platform account set"),
            Err(ServiceError::NotFound(_)) => {
                warn!(%username, "Platform account not registered yet; purchases stay disabled");
            }
            Err(e) => return Err(e.into()),
        }
    }

    let secret = config.auth.jwt_secret.clone().unwrap_or_else(|| {
        warn!("No JWT secret configured; using the development default");
        DEV_JWT_SECRET.to_string()
    });
    let jwt = Arc::new(JwtManager::new(secret.as_bytes(), config.auth.token_ttl_secs));

    let (email, sms) = build_senders(&config);
    let uploads_dir = config.server.uploads_dir.clone();
    tokio::fs::create_dir_all(&uploads_dir).await?;

    let state = AppState::new(Components {
        db: db.clone(),
        jwt,
        dispatcher: OtpDispatcher::new(email, sms),
        blobs: Arc::new(DiskBlobStore::new(&uploads_dir)),
        presence: Arc::new(InMemoryPresence::new(config.auth.token_ttl_secs)),
        otp_ttl_secs: config.auth.otp_ttl_secs,
        uploads_dir,
        max_upload_bytes: config.server.max_upload_bytes,
    });

    let sweep = spawn_pending_sweep(
        db,
        Duration::from_secs(config.auth.otp_sweep_interval_secs.max(1)),
    );

    let listener = tokio::net::TcpListener::bind(config.server.addr).await?;
    info!(addr = %config.server.addr, "Listening");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Received shutdown signal");
        })
        .await?;

    sweep.abort();
    info!("Server stopped");
    Ok(())
}
