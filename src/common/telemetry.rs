// src/common/telemetry.rs
//! Tracing subscriber and Sentry error reporting

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize Sentry when a DSN is configured
///
/// The returned guard flushes pending events on drop and must live as long
/// as the process.
pub fn init_sentry(dsn: Option<&str>) -> Option<sentry::ClientInitGuard> {
    let dsn = dsn.map(str::trim).filter(|d| !d.is_empty())?;

    let guard = sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: Some(
                std::env::var("ENVIRONMENT")
                    .unwrap_or_else(|_| "development".to_string())
                    .into(),
            ),
            traces_sample_rate: 0.0,
            ..Default::default()
        },
    ));

    Some(guard)
}

/// Install the global subscriber: `RUST_LOG` filter (default `info`), fmt
/// output, and the Sentry layer which is inert when Sentry is not initialized
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(sentry_tracing::layer())
        .init();

    info!("Tracing initialized");
}
