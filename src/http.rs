//! Shared HTTP plumbing for the external providers
//!
//! One retrying client is built from configuration and cloned into every
//! provider. Each call, retries included, is bounded by the configured total
//! timeout. Responses are mapped onto the provider error taxonomy here so
//! each client only deals with its own payload shape.

use std::time::{Duration, Instant};

use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::config::ProviderConfig;
use crate::{AgriError, Result};

const SLOW_RESPONSE: Duration = Duration::from_secs(5);

/// Retrying client plus the deadline for a whole call
#[derive(Clone)]
pub struct ProviderClient {
    client: ClientWithMiddleware,
    deadline: Duration,
}

/// Build the retrying client used by all providers
pub fn build_client(config: &ProviderConfig) -> Result<ProviderClient> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_seconds.into()))
        .user_agent(concat!("AgriSense/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| AgriError::config(format!("Failed to create HTTP client: {e}")))?;

    let retry_policy = ExponentialBackoff::builder().build_with_max_retries(config.max_retries);

    Ok(ProviderClient {
        client: ClientBuilder::new(client)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build(),
        deadline: Duration::from_secs(config.total_timeout_seconds.into()),
    })
}

/// GET `url` and decode the JSON body.
///
/// Transport failures, non-success statuses and an exceeded deadline become
/// `ProviderUnreachable`. Undecodable bodies become `MalformedResponse`.
pub async fn get_json<T: DeserializeOwned>(
    client: &ProviderClient,
    provider: &str,
    url: &str,
) -> Result<T> {
    let deadline = client.deadline;
    tokio::time::timeout(deadline, fetch_json(&client.client, provider, url))
        .await
        .unwrap_or_else(|_| {
            warn!("{provider} request exceeded {}s", deadline.as_secs());
            Err(AgriError::provider_unreachable(format!(
                "{provider} did not answer within {}s",
                deadline.as_secs()
            )))
        })
}

async fn fetch_json<T: DeserializeOwned>(
    client: &ClientWithMiddleware,
    provider: &str,
    url: &str,
) -> Result<T> {
    debug!("{provider} request URL: {url}");
    let start_time = Instant::now();

    let response = client.get(url).send().await.map_err(|e| {
        warn!("{provider} request failed: {e}");
        AgriError::provider_unreachable(format!("{provider} request failed: {e}"))
    })?;

    let status = response.status();
    if !status.is_success() {
        warn!("{provider} answered with HTTP {status}");
        return Err(AgriError::provider_unreachable(format!(
            "{provider} request failed with status: {} - {}",
            status,
            status.canonical_reason().unwrap_or("Unknown error")
        )));
    }

    let body = response.json::<T>().await.map_err(|e| {
        if e.is_decode() {
            warn!("{provider} returned an undecodable body: {e}");
            AgriError::malformed_response(format!("Invalid {provider} response: {e}"))
        } else {
            warn!("{provider} body could not be read: {e}");
            AgriError::provider_unreachable(format!("{provider} response interrupted: {e}"))
        }
    })?;

    let total_duration = start_time.elapsed();
    info!(
        "{provider} request succeeded in {:.3}s",
        total_duration.as_secs_f64()
    );
    if total_duration > SLOW_RESPONSE {
        warn!(
            "Slow {provider} response detected: {:.3}s",
            total_duration.as_secs_f64()
        );
    }

    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_client_from_default_config() {
        assert!(build_client(&ProviderConfig::default()).is_ok());
    }

    #[tokio::test]
    async fn test_unreachable_host_maps_to_provider_unreachable() {
        let config = ProviderConfig {
            timeout_seconds: 1,
            max_retries: 0,
            ..ProviderConfig::default()
        };
        let client = build_client(&config).unwrap();
        // Port 9 (discard) on localhost is closed on test machines.
        let result: Result<serde_json::Value> =
            get_json(&client, "test", "http://127.0.0.1:9/nothing").await;
        assert!(matches!(
            result.unwrap_err(),
            AgriError::ProviderUnreachable { .. }
        ));
    }

    #[tokio::test]
    async fn test_silent_server_is_cut_off_at_total_timeout() {
        // Accepts connections but never answers.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let mut open = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                open.push(socket);
            }
        });

        let config = ProviderConfig {
            timeout_seconds: 60,
            total_timeout_seconds: 1,
            max_retries: 3,
            ..ProviderConfig::default()
        };
        let client = build_client(&config).unwrap();
        let started = Instant::now();
        let result: Result<serde_json::Value> =
            get_json(&client, "test", &format!("http://{addr}/slow")).await;

        let err = result.unwrap_err();
        assert!(matches!(err, AgriError::ProviderUnreachable { .. }));
        assert!(err.to_string().contains("within 1s"));
        assert!(started.elapsed() < Duration::from_secs(5));
        server.abort();
    }
}
