//! Shared HTTP transport construction.
//!
//! One [`Client`] is built per process and handed to every loader and client
//! that needs it; nothing in the workspace keeps a global instance.

use std::time::Duration;

use reqwest::Client;

use crate::config::HttpConfig;
use crate::error::{CampusError, Result};

/// Maximum number of redirects to follow.
const MAX_REDIRECTS: usize = 3;

/// User-Agent string for all outgoing requests.
const USER_AGENT: &str = concat!("campus/", env!("CARGO_PKG_VERSION"));

/// Build a reqwest client with the configured timeout.
pub fn build_client(config: &HttpConfig) -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()
        .map_err(|e| CampusError::config(format!("failed to build HTTP client: {e}")))
}

/// Map a transport-level reqwest failure to a fetch error for `url`.
pub fn fetch_error(url: &str, err: reqwest::Error) -> CampusError {
    CampusError::fetch(url, err.to_string())
}

/// Fail with a fetch error unless `response` carries a 2xx status.
pub fn ensure_success(url: &str, response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if !status.is_success() {
        return Err(CampusError::fetch(url, format!("HTTP {status}")));
    }
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_builds_from_default_config() {
        assert!(build_client(&HttpConfig::default()).is_ok());
    }

    #[test]
    fn user_agent_carries_version() {
        assert!(USER_AGENT.starts_with("campus/"));
    }
}
