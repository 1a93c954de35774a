//! Review moderation service: binary entrypoint.
//! Boots the Axum HTTP server with the moderation routes and `/metrics`.

use review_moderator::{api, metrics::Metrics, policy};
use shuttle_axum::ShuttleAxum;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Compact tracing logs. `MODERATOR_DEV_LOG=1` in a dev environment
/// (debug build OR SHUTTLE_ENV in {local, development, dev}) raises the
/// default filter so per-review decisions are logged (anonymized).
fn init_tracing() {
    let dev_flag = std::env::var("MODERATOR_DEV_LOG")
        .ok()
        .is_some_and(|v| v == "1");

    let is_dev_env = cfg!(debug_assertions)
        || matches!(
            std::env::var("SHUTTLE_ENV")
                .unwrap_or_default()
                .to_ascii_lowercase()
                .as_str(),
            "local" | "development" | "dev"
        );

    let default_filter = if dev_flag && is_dev_env {
        "moderator=debug,review_moderator=debug,info"
    } else {
        "review_moderator=info,warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    // Shuttle may already have installed a global subscriber; keep theirs then.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .try_init();
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    init_tracing();

    // Fail fast on a malformed policy file; the handle re-reads it on change.
    let startup_policy = policy::Policy::from_toml()?;
    info!(path = %policy::policy_path().display(), ?startup_policy, "policy loaded");

    let metrics = Metrics::init()?;
    let router = api::create_router(api::AppState::from_env()).merge(metrics.router());

    Ok(router.into())
}
