//! One-time transport selection for a page session.
//!
//! The choice is made once at startup from the hosting environment and never
//! revisited: a failing relay retries its own connection rather than falling
//! back to the hosted transport mid-session.

use crate::hosted::{HostedTransport, RestSnapshotSource, DEFAULT_POLL_INTERVAL};
use crate::relay::RelayTransport;
use crate::transport::ChatTransport;
use std::sync::Arc;

/// Hostname suffixes that mean the site is statically hosted and no relay
/// server process exists.
const STATIC_HOST_SUFFIXES: &[&str] = &[".github.io", ".pages.dev", ".netlify.app"];

/// Where this page session is running.
#[derive(Debug, Clone)]
pub struct DeploymentEnv {
    /// Statically hosted: no server process, use the hosted fallback.
    pub static_hosting: bool,
    /// Relay socket URL, e.g. `ws://localhost:8080/api/chat/ws`.
    pub relay_ws_url: String,
    /// Base URL of the hosted realtime database, when configured.
    pub hosted_base_url: Option<String>,
}

impl DeploymentEnv {
    /// Detect the environment from the page's hostname.
    pub fn detect(
        hostname: &str,
        relay_ws_url: impl Into<String>,
        hosted_base_url: Option<String>,
    ) -> Self {
        let static_hosting = STATIC_HOST_SUFFIXES
            .iter()
            .any(|suffix| hostname.ends_with(suffix));
        Self {
            static_hosting,
            relay_ws_url: relay_ws_url.into(),
            hosted_base_url,
        }
    }
}

/// Choose the transport for this session. Called exactly once.
pub fn select_transport(env: &DeploymentEnv) -> anyhow::Result<Arc<dyn ChatTransport>> {
    if env.static_hosting {
        let base_url = env
            .hosted_base_url
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("static hosting requires a hosted database URL"))?;
        let source = Arc::new(RestSnapshotSource::new(base_url));
        Ok(Arc::new(HostedTransport::start(
            source,
            DEFAULT_POLL_INTERVAL,
        )))
    } else {
        Ok(Arc::new(RelayTransport::connect(env.relay_ws_url.clone())))
    }
}
