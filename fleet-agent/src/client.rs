//! HTTP client for the fleet kernel.

use fleet_sim::DataCenter;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request to kernel failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("kernel answered {0}")]
    Status(reqwest::StatusCode),
}

#[derive(Debug, Clone)]
pub struct KernelClient {
    http: reqwest::Client,
    base_url: String,
}

impl KernelClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("fleet-agent/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { http, base_url: base_url.trim_end_matches('/').to_string() })
    }

    pub fn datacenters_url(&self) -> String {
        format!("{}/api/datacenters", self.base_url)
    }

    pub async fn fetch_data_centers(&self) -> Result<Vec<DataCenter>, ClientError> {
        let response = self.http.get(self.datacenters_url()).send().await?;
        if !response.status().is_success() {
            return Err(ClientError::Status(response.status()));
        }
        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_normalization() {
        let client = KernelClient::new("http://127.0.0.1:3001/", Duration::from_secs(1)).unwrap();
        assert_eq!(client.datacenters_url(), "http://127.0.0.1:3001/api/datacenters");
    }

    #[tokio::test]
    async fn test_unreachable_kernel_is_an_error() {
        // Port 1 is never served in test environments.
        let client = KernelClient::new("http://127.0.0.1:1", Duration::from_millis(500)).unwrap();
        let err = client.fetch_data_centers().await.unwrap_err();
        assert!(matches!(err, ClientError::Http(_)));
    }
}
