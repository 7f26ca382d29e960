//! Structured logging for hosts that embed the bridge.

const DEFAULT_FILTER: &str = "consent_service=info,consent_core=info";

/// Install a fmt subscriber filtered by `RUST_LOG`. A host that already
/// installed its own subscriber keeps it.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| DEFAULT_FILTER.into());
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
