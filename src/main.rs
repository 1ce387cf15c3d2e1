use std::sync::Arc;

use anyhow::{Context, Result};
use edulink_lib::api::profile::get_my_profile;
use edulink_lib::error::config_missing;
use edulink_lib::{ApiConfig, ApiGateway, AuthService, FileStorage, LogRedirect, TokenStore};
use tracing::{debug, error, info};
use tracing_subscriber::{filter::EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const STORE_PATH_ENV: &str = "EDULINK_STORE_PATH";
const EMAIL_ENV: &str = "EDULINK_EMAIL";
const PASSWORD_ENV: &str = "EDULINK_PASSWORD";
const DEFAULT_STORE_PATH: &str = "edulink.store.json";

#[tokio::main]
async fn main() {
    // Load environment variables from .env file if it exists
    let env_file_path = dotenvy::dotenv().ok();

    // Initialize the tracing subscriber for structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            if cfg!(debug_assertions) {
                "edulink_lib=debug,edulink=debug,warn".into()
            } else {
                "edulink_lib=info,edulink=info,warn".into()
            }
        }))
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();

    match env_file_path {
        Some(path) => info!("Loaded environment variables from {}", path.display()),
        None => debug!("No .env file found. Using existing environment variables."),
    };

    if let Err(e) = run().await {
        error!(error = %e, "edulink failed");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let config = ApiConfig::from_env()?;
    info!(base_url = %config.api_base_url(), "Using backend");

    let store_path =
        std::env::var(STORE_PATH_ENV).unwrap_or_else(|_| DEFAULT_STORE_PATH.to_string());
    let storage = FileStorage::open(&store_path)
        .await
        .with_context(|| format!("opening credential store {}", store_path))?;
    let tokens = Arc::new(TokenStore::load(Arc::new(storage)).await);

    let gateway = Arc::new(ApiGateway::with_reqwest(
        config,
        tokens.clone(),
        Arc::new(LogRedirect),
    )?);
    let auth = AuthService::new(gateway.clone());

    if !tokens.current().await.is_authenticated() {
        let email = std::env::var(EMAIL_ENV).map_err(|_| config_missing(EMAIL_ENV))?;
        let password = std::env::var(PASSWORD_ENV).map_err(|_| config_missing(PASSWORD_ENV))?;
        let user = auth.login(&email, &password, true).await?;
        info!(user_id = %user.user_id, role = ?user.role, "Signed in");
    } else {
        debug!("Reusing stored session");
    }

    let profile = get_my_profile(&gateway).await?;
    println!(
        "{} <{}> role={} status={}",
        profile.display_name(),
        profile.email,
        profile.role,
        profile.status
    );

    Ok(())
}
